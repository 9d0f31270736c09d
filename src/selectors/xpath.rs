use anyhow::Result;

/// JS that counts the element nodes selected by an XPath expression.
pub fn count_js(xpath: &str) -> Result<String> {
    Ok(format!(
        r#"(() => {{
            const snapshot = document.evaluate(
                {xpath},
                document,
                null,
                XPathResult.ORDERED_NODE_SNAPSHOT_TYPE,
                null
            );
            let count = 0;
            for (let i = 0; i < snapshot.snapshotLength; i++) {{
                if (snapshot.snapshotItem(i).nodeType === Node.ELEMENT_NODE) count++;
            }}
            return count;
        }})()"#,
        xpath = serde_json::to_string(xpath)?
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_js_skips_non_elements() {
        let js = count_js("//div[@class='ready']").unwrap();
        assert!(js.contains(r#""//div[@class='ready']""#));
        assert!(js.contains("Node.ELEMENT_NODE"));
    }
}
