use anyhow::{Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tempfile::TempDir;

use super::launcher;
use crate::config::Settings;

/// Owns the Chrome process, its CDP event loop, and the single page watches run against.
pub struct BrowserSession {
    browser: Browser,
    _handler_task: tokio::task::JoinHandle<()>,
    _profile_dir: TempDir,
    page: Page,
}

impl BrowserSession {
    /// Launch Chrome with a throwaway profile and open a blank page.
    pub async fn launch(settings: &Settings) -> Result<Self> {
        let chrome = launcher::find_chrome_binary(settings.chrome_path.as_deref())?;
        let profile_dir = tempfile::tempdir().context("Failed to create Chrome profile directory")?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome)
            .user_data_dir(profile_dir.path())
            .window_size(1280, 720);
        builder = if settings.headless {
            builder.new_headless_mode()
        } else {
            builder.with_head()
        };
        for arg in launcher::default_chrome_args() {
            builder = builder.arg(arg);
        }

        let config = builder.build().map_err(|e| anyhow::anyhow!("{}", e))?;

        let (browser, mut handler) =
            Browser::launch(config).await.context("Failed to launch Chrome")?;

        let handler_task = tokio::spawn(async move {
            while let Some(_event) = handler.next().await {}
        });

        let page = browser
            .new_page("about:blank")
            .await
            .context("Failed to create initial page")?;

        tracing::info!("Browser session started (headless: {})", settings.headless);

        Ok(Self {
            browser,
            _handler_task: handler_task,
            _profile_dir: profile_dir,
            page,
        })
    }

    /// The page watches query. Cheap to clone; clones address the same tab.
    pub fn page(&self) -> Page {
        self.page.clone()
    }

    pub async fn close(mut self) -> Result<()> {
        self.browser.close().await.context("Failed to close browser")?;
        if let Err(e) = self.browser.wait().await {
            tracing::warn!("Chrome did not exit cleanly: {}", e);
        }
        Ok(())
    }
}
