use anyhow::Result;
use chromiumoxide::page::Page;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::Settings;
use crate::selectors::{Selector, SelectorType};
use crate::watch::{self, ElementQuery, WatchError, WatchId, WatchRegistry, WatchSummary};

/// Timeout for `wait_for_element` when the caller gives none.
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct WatchElementParams {
    #[schemars(description = "Selector to watch for")]
    pub selector: String,
    #[schemars(description = "Type of selector: css, text, or xpath")]
    pub selector_type: Option<SelectorType>,
    #[schemars(description = "Milliseconds between checks (default: 100)")]
    pub interval_ms: Option<u64>,
    #[schemars(description = "JavaScript to run in the page once the element appears")]
    pub on_found_js: Option<String>,
}

/// Start a background watch and register it.
///
/// Watches that already stopped are dropped from the registry first, so the
/// table only grows with watches that are still polling.
pub async fn watch_element<Q, F>(
    query: Q,
    on_found: F,
    registry: &WatchRegistry,
    settings: &Settings,
    params: &WatchElementParams,
) -> Result<WatchSummary>
where
    Q: ElementQuery + 'static,
    F: FnOnce() + Send + 'static,
{
    let selector = Selector::new(&params.selector, params.selector_type.unwrap_or_default());
    let interval = settings.interval_or_default(params.interval_ms);

    let pruned = registry.prune().await;
    if pruned > 0 {
        tracing::debug!("Pruned {} stopped watches", pruned);
    }

    let handle = watch::watch_for_element(query, selector, on_found, interval);
    registry.insert(handle.clone()).await;
    Ok(WatchSummary::from(&handle))
}

/// Callback that evaluates `script` in `page`, if there is one.
pub fn run_on_found(page: Page, script: Option<String>) -> impl FnOnce() + Send + 'static {
    move || {
        if let Some(script) = script {
            tokio::spawn(async move {
                match page.evaluate(script.as_str()).await {
                    Ok(_) => tracing::debug!("Ran on-found script ({} bytes)", script.len()),
                    Err(e) => tracing::warn!("On-found script failed: {}", e),
                }
            });
        }
    }
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ListWatchesParams {
    #[schemars(description = "Drop watches that have already stopped before listing")]
    pub prune: Option<bool>,
}

pub async fn list_watches(registry: &WatchRegistry, params: &ListWatchesParams) -> Vec<WatchSummary> {
    if params.prune.unwrap_or(false) {
        let pruned = registry.prune().await;
        tracing::debug!("Pruned {} stopped watches", pruned);
    }
    registry.list().await
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CancelWatchParams {
    #[schemars(description = "ID of the watch to cancel")]
    pub id: u64,
}

pub async fn cancel_watch(registry: &WatchRegistry, params: &CancelWatchParams) -> Result<bool> {
    match registry.cancel(WatchId(params.id)).await {
        Some(cancelled) => Ok(cancelled),
        None => anyhow::bail!("No watch with id {}", params.id),
    }
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct WaitForElementParams {
    #[schemars(description = "Selector to wait for")]
    pub selector: String,
    #[schemars(description = "Type of selector: css, text, or xpath")]
    pub selector_type: Option<SelectorType>,
    #[schemars(description = "Milliseconds between checks (default: 100)")]
    pub interval_ms: Option<u64>,
    #[schemars(description = "Timeout in milliseconds (default: 5000)")]
    pub timeout_ms: Option<u64>,
}

/// Block until the element appears, times out, or the watch is cancelled by id.
///
/// The watch is registered only while it runs so `cancel_watch` can stop it.
pub async fn wait_for_element<Q>(
    query: Q,
    registry: &WatchRegistry,
    settings: &Settings,
    params: &WaitForElementParams,
) -> std::result::Result<u64, WatchError>
where
    Q: ElementQuery + 'static,
{
    let selector = Selector::new(&params.selector, params.selector_type.unwrap_or_default());
    let interval = settings.interval_or_default(params.interval_ms);
    let timeout = Duration::from_millis(params.timeout_ms.unwrap_or(DEFAULT_WAIT_TIMEOUT_MS));

    let handle = watch::watch_for_element(query, selector, || {}, interval);
    let id = registry.insert(handle.clone()).await;
    let result = watch::wait_for_watch(&handle, Some(timeout)).await;
    registry.remove(id).await;
    result
}
