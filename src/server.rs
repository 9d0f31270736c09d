use rmcp::model::*;
use rmcp::tool;
use rmcp::{Error as McpError, ServerHandler};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::browser::BrowserSession;
use crate::config::Settings;
use crate::tools::{dom, navigation, watch};
use crate::watch::{WatchError, WatchRegistry};

/// The MCP server that routes tool calls to the browser page and its watches.
#[derive(Clone)]
pub struct ElementWatchServer {
    session: Arc<Mutex<Option<BrowserSession>>>,
    registry: WatchRegistry,
    settings: Settings,
}

impl ElementWatchServer {
    pub fn new(settings: Settings) -> Self {
        Self {
            session: Arc::new(Mutex::new(None)),
            registry: WatchRegistry::new(),
            settings,
        }
    }

    pub fn registry(&self) -> &WatchRegistry {
        &self.registry
    }

    /// Launch the browser on first use and hand back its page.
    async fn page(&self) -> Result<chromiumoxide::page::Page, McpError> {
        let mut session = self.session.lock().await;
        if let Some(s) = session.as_ref() {
            return Ok(s.page());
        }
        tracing::info!("Launching browser (headless: {})", self.settings.headless);
        let s = BrowserSession::launch(&self.settings).await.map_err(|e| {
            McpError::internal_error(format!("Failed to launch browser: {:#}", e), None)
        })?;
        let page = s.page();
        *session = Some(s);
        Ok(page)
    }

    async fn with_page<F, Fut, T>(&self, f: F) -> Result<T, McpError>
    where
        F: FnOnce(chromiumoxide::page::Page) -> Fut,
        Fut: std::future::Future<Output = anyhow::Result<T>>,
    {
        // Session lock is released before `f` runs so watches and waits proceed concurrently.
        let page = self.page().await?;
        f(page).await.map_err(|e| McpError::internal_error(format!("{:#}", e), None))
    }

    /// Cancel every watch and close the browser, if one was launched.
    pub async fn shutdown(&self) {
        let cancelled = self.registry.cancel_all().await;
        if cancelled > 0 {
            tracing::info!("Cancelled {} active watches", cancelled);
        }
        if let Some(session) = self.session.lock().await.take() {
            if let Err(e) = session.close().await {
                tracing::warn!("Error closing browser: {:#}", e);
            }
        }
    }

    fn text_result(msg: impl Into<String>) -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::success(vec![Content::text(msg)]))
    }

    /// A find is a success; a timeout or cancel is a tool error the client can tell apart.
    fn wait_result(result: Result<u64, WatchError>) -> Result<CallToolResult, McpError> {
        match result {
            Ok(tick) => Self::text_result(format!("Element found on tick {}", tick)),
            Err(e @ WatchError::TimedOut { .. }) => Ok(CallToolResult::error(vec![Content::text(
                format!("Element not found ({})", e),
            )])),
            Err(e @ WatchError::Cancelled { .. }) => {
                Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
            }
        }
    }

    fn json_result(value: impl serde::Serialize) -> Result<CallToolResult, McpError> {
        let text = serde_json::to_string_pretty(&value)
            .map_err(|e| McpError::internal_error(format!("JSON error: {}", e), None))?;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

#[tool(tool_box)]
impl ServerHandler for ElementWatchServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "element-watch: wait for elements to appear in a headless Chrome page. \
                 Start with `navigate`, then `watch_element` to react when a selector \
                 first matches, or `wait_for_element` to block until it does."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[tool(tool_box)]
impl ElementWatchServer {
    #[tool(description = "Navigate to a URL. Returns the page URL and title.")]
    async fn navigate(
        &self,
        #[tool(aggr)] params: navigation::NavigateParams,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .with_page(|page| async move { navigation::navigate(&page, &params).await })
            .await?;
        Self::text_result(format!("Navigated to {} — {}", result.title, result.url))
    }

    #[tool(description = "Count elements currently matching a selector.")]
    async fn count_elements(
        &self,
        #[tool(aggr)] params: dom::CountElementsParams,
    ) -> Result<CallToolResult, McpError> {
        let count = self
            .with_page(|page| async move { dom::count_elements(&page, &params).await })
            .await?;
        Self::text_result(count.to_string())
    }

    #[tool(description = "Start polling for a selector in the background. Runs optional JavaScript once, the first time it matches, then stops. Returns the watch id.")]
    async fn watch_element(
        &self,
        #[tool(aggr)] params: watch::WatchElementParams,
    ) -> Result<CallToolResult, McpError> {
        let registry = self.registry.clone();
        let settings = self.settings.clone();
        let summary = self
            .with_page(|page| async move {
                let on_found = watch::run_on_found(page.clone(), params.on_found_js.clone());
                watch::watch_element(page, on_found, &registry, &settings, &params).await
            })
            .await?;
        Self::json_result(summary)
    }

    #[tool(description = "List watches with their state and tick counts.")]
    async fn list_watches(
        &self,
        #[tool(aggr)] params: watch::ListWatchesParams,
    ) -> Result<CallToolResult, McpError> {
        let summaries = watch::list_watches(&self.registry, &params).await;
        Self::json_result(summaries)
    }

    #[tool(description = "Cancel a running watch by id.")]
    async fn cancel_watch(
        &self,
        #[tool(aggr)] params: watch::CancelWatchParams,
    ) -> Result<CallToolResult, McpError> {
        let cancelled = watch::cancel_watch(&self.registry, &params)
            .await
            .map_err(|e| McpError::invalid_params(format!("{}", e), None))?;
        if cancelled {
            Self::text_result(format!("Cancelled watch {}", params.id))
        } else {
            Self::text_result(format!("Watch {} had already stopped", params.id))
        }
    }

    #[tool(description = "Wait for an element to appear. Polls until the selector matches or the timeout passes.")]
    async fn wait_for_element(
        &self,
        #[tool(aggr)] params: watch::WaitForElementParams,
    ) -> Result<CallToolResult, McpError> {
        let page = self.page().await?;
        let result = watch::wait_for_element(page, &self.registry, &self.settings, &params).await;
        Self::wait_result(result)
    }
}
