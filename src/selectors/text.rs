use anyhow::Result;

/// JS that counts the distinct elements whose own text nodes contain `text`.
///
/// Matching is case-insensitive on trimmed text, and an element with several
/// matching text nodes counts once.
pub fn count_js(text: &str) -> Result<String> {
    Ok(format!(
        r#"(() => {{
            const target = {text}.toLowerCase();
            if (!document.body) return 0;
            const walker = document.createTreeWalker(
                document.body,
                NodeFilter.SHOW_TEXT,
                null
            );
            const seen = new Set();
            while (walker.nextNode()) {{
                const node = walker.currentNode;
                if (node.textContent.trim().toLowerCase().includes(target)) {{
                    const el = node.parentElement;
                    if (el) seen.add(el);
                }}
            }}
            return seen.size;
        }})()"#,
        text = serde_json::to_string(text)?
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_js_embeds_json_string() {
        let js = count_js("It's \"done\"").unwrap();
        assert!(js.contains(r#"const target = "It's \"done\"".toLowerCase();"#));
        assert!(js.contains("return seen.size;"));
    }
}
