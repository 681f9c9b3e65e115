//! Headless Chromium backend for the render tier
//!
//! The browser process is launched lazily on the first session request and
//! lives until `shutdown`. Every session is a tab in that one process.

use crate::crawler::fetcher::FetchError;
use crate::crawler::pool::{BrowserBackend, RenderSession};
use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// A running browser and the task driving its CDP connection
struct BrowserProcess {
    browser: Browser,
    handler: JoinHandle<()>,
}

/// Owns the single browser process of a run
pub struct ChromiumBackend {
    user_agent: String,
    process: Mutex<Option<BrowserProcess>>,
}

impl ChromiumBackend {
    /// Creates a backend whose sessions identify with `user_agent`
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            process: Mutex::new(None),
        }
    }

    async fn launch(&self) -> Result<BrowserProcess, FetchError> {
        let config = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg(format!("--user-agent={}", self.user_agent))
            .build()
            .map_err(FetchError::BrowserUnavailable)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| FetchError::BrowserUnavailable(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        tracing::info!("Launched headless browser for render fallback");
        Ok(BrowserProcess { browser, handler })
    }
}

#[async_trait]
impl BrowserBackend for ChromiumBackend {
    type Session = ChromiumSession;

    async fn new_session(&self) -> Result<ChromiumSession, FetchError> {
        let mut process = self.process.lock().await;
        if process.is_none() {
            *process = Some(self.launch().await?);
        }
        let Some(running) = process.as_ref() else {
            return Err(FetchError::BrowserUnavailable(
                "browser process missing".to_string(),
            ));
        };

        let page = running
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| FetchError::Render(e.to_string()))?;

        Ok(ChromiumSession { page })
    }

    async fn shutdown(&self) {
        let Some(mut process) = self.process.lock().await.take() else {
            return;
        };

        if let Err(e) = process.browser.close().await {
            tracing::warn!("Failed to close headless browser: {}", e);
        }
        if let Err(e) = process.browser.wait().await {
            tracing::warn!("Failed to reap headless browser: {}", e);
        }
        process.handler.abort();
        tracing::info!("Headless browser stopped");
    }
}

/// One browser tab
pub struct ChromiumSession {
    page: Page,
}

#[async_trait]
impl RenderSession for ChromiumSession {
    async fn render(&mut self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        let navigation = async {
            self.page.goto(url).await?;
            self.page.wait_for_navigation().await?;
            self.page.content().await
        };

        match tokio::time::timeout(timeout, navigation).await {
            Ok(Ok(html)) => Ok(html),
            Ok(Err(e)) => Err(FetchError::Render(e.to_string())),
            Err(_) => Err(FetchError::Render(format!(
                "navigation timed out after {}s",
                timeout.as_secs()
            ))),
        }
    }

    async fn close(self) {
        if let Err(e) = self.page.close().await {
            tracing::debug!("Failed to close render session: {}", e);
        }
    }
}
