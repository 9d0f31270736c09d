use anyhow::Result;

/// JS that counts the elements matching a CSS selector.
pub fn count_js(selector: &str) -> Result<String> {
    Ok(format!(
        "document.querySelectorAll({sel}).length",
        sel = serde_json::to_string(selector)?
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_js_escapes_quotes() {
        let js = count_js(r#"input[name="q"]"#).unwrap();
        assert_eq!(js, r#"document.querySelectorAll("input[name=\"q\"]").length"#);
    }
}
