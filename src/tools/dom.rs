use anyhow::Result;
use chromiumoxide::page::Page;
use serde::{Deserialize, Serialize};

use crate::selectors::{self, Selector, SelectorType};

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CountElementsParams {
    #[schemars(description = "Selector to count matches for")]
    pub selector: String,
    #[schemars(description = "Type of selector: css, text, or xpath")]
    pub selector_type: Option<SelectorType>,
}

pub async fn count_elements(page: &Page, params: &CountElementsParams) -> Result<usize> {
    let selector = Selector::new(&params.selector, params.selector_type.unwrap_or_default());
    selectors::count_elements(page, &selector).await
}
