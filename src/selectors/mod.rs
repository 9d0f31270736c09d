pub mod css;
pub mod text;
pub mod xpath;

use anyhow::{Context, Result};
use chromiumoxide::page::Page;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The type of selector to use for element matching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SelectorType {
    #[default]
    Css,
    Text,
    Xpath,
}

impl fmt::Display for SelectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SelectorType::Css => "css",
            SelectorType::Text => "text",
            SelectorType::Xpath => "xpath",
        })
    }
}

impl std::str::FromStr for SelectorType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "css" => Ok(SelectorType::Css),
            "text" => Ok(SelectorType::Text),
            "xpath" => Ok(SelectorType::Xpath),
            other => anyhow::bail!("Unknown selector type: {} (expected css, text, or xpath)", other),
        }
    }
}

/// A selector string paired with how it should be interpreted.
///
/// The string itself is never validated here; a malformed selector fails
/// however the page's query function fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selector {
    pub value: String,
    pub kind: SelectorType,
}

impl Selector {
    /// Build a selector, rewriting Playwright-style `:has-text("...")` CSS into a text selector.
    pub fn new(value: impl Into<String>, kind: SelectorType) -> Self {
        let (value, kind) = normalize_selector_type(&value.into(), kind);
        Self { value, kind }
    }

    pub fn css(value: impl Into<String>) -> Self {
        Self::new(value, SelectorType::Css)
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::new(value, SelectorType::Text)
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Self::new(value, SelectorType::Xpath)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            SelectorType::Css => f.write_str(&self.value),
            kind => write!(f, "{}={}", kind, self.value),
        }
    }
}

/// Build a JS expression that evaluates to the number of elements matching `selector`.
pub fn count_js(selector: &Selector) -> Result<String> {
    match selector.kind {
        SelectorType::Css => css::count_js(&selector.value),
        SelectorType::Text => text::count_js(&selector.value),
        SelectorType::Xpath => xpath::count_js(&selector.value),
    }
}

/// Count the elements matching `selector` in the page's live document.
pub async fn count_elements(page: &Page, selector: &Selector) -> Result<usize> {
    let js = count_js(selector)?;
    let count: u64 = page
        .evaluate(js)
        .await
        .with_context(|| format!("Failed to evaluate {} selector: {}", selector.kind, selector.value))?
        .into_value()
        .context("Failed to parse match count")?;
    Ok(count as usize)
}

/// Detect Playwright-style :has-text("...") and convert to text selector.
pub fn normalize_selector_type(selector: &str, selector_type: SelectorType) -> (String, SelectorType) {
    if selector_type == SelectorType::Css {
        if let Some(start) = selector.find(":has-text(") {
            let after = &selector[start + ":has-text(".len()..];
            let (quote, rest) = if let Some(stripped) = after.strip_prefix('"') {
                ('"', stripped)
            } else if let Some(stripped) = after.strip_prefix('\'') {
                ('\'', stripped)
            } else {
                return (selector.to_string(), selector_type);
            };
            if let Some(end) = rest.find(quote) {
                return (rest[..end].to_string(), SelectorType::Text);
            }
        }
    }
    (selector.to_string(), selector_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_text_becomes_text_selector() {
        let sel = Selector::css(r#"button:has-text("Submit")"#);
        assert_eq!(sel.value, "Submit");
        assert_eq!(sel.kind, SelectorType::Text);

        let sel = Selector::css("div:has-text('Ready now')");
        assert_eq!(sel, Selector::text("Ready now"));
    }

    #[test]
    fn test_plain_css_unchanged() {
        let sel = Selector::css(".ready");
        assert_eq!(sel.value, ".ready");
        assert_eq!(sel.kind, SelectorType::Css);
    }

    #[test]
    fn test_unquoted_has_text_left_alone() {
        let sel = Selector::css("p:has-text(Ready)");
        assert_eq!(sel.value, "p:has-text(Ready)");
        assert_eq!(sel.kind, SelectorType::Css);
    }

    #[test]
    fn test_text_type_not_normalized() {
        let sel = Selector::text(r#"button:has-text("Submit")"#);
        assert_eq!(sel.value, r#"button:has-text("Submit")"#);
    }

    #[test]
    fn test_selector_type_parse_and_display() {
        assert_eq!("XPath".parse::<SelectorType>().unwrap(), SelectorType::Xpath);
        assert_eq!("css".parse::<SelectorType>().unwrap(), SelectorType::Css);
        assert!("jquery".parse::<SelectorType>().is_err());
        assert_eq!(SelectorType::Text.to_string(), "text");
    }

    #[test]
    fn test_selector_display() {
        assert_eq!(Selector::css("#main .ready").to_string(), "#main .ready");
        assert_eq!(Selector::xpath("//div").to_string(), "xpath=//div");
    }

    #[test]
    fn test_count_js_dispatches_by_kind() {
        assert!(count_js(&Selector::css(".ready")).unwrap().contains("querySelectorAll"));
        assert!(count_js(&Selector::text("Ready")).unwrap().contains("createTreeWalker"));
        assert!(count_js(&Selector::xpath("//p")).unwrap().contains("ORDERED_NODE_SNAPSHOT_TYPE"));
    }

    #[test]
    fn test_selector_type_serde_lowercase() {
        let json = serde_json::to_string(&SelectorType::Xpath).unwrap();
        assert_eq!(json, r#""xpath""#);
        let parsed: SelectorType = serde_json::from_str(r#""text""#).unwrap();
        assert_eq!(parsed, SelectorType::Text);
    }
}
