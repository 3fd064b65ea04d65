//! Browser automation behind a small trait seam.
//!
//! [`Browser`] opens tabs; [`BrowserTab`] exposes the handful of operations
//! the collector needs (markup, readiness check, scrolling, screenshot).
//! [`ChromiumBrowser`] drives headless Chromium through `chromiumoxide`.
//! The process is launched on the first tab request and reused for the rest
//! of the run; [`Browser::shutdown`] closes it.

use crate::config::FetchSettings;
use crate::error::FetchError;
use crate::selectors::SelectorRule;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser as CdpBrowser, BrowserConfig, Page};
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Something that can open rendered pages.
pub trait Browser {
    type Tab: BrowserTab;

    /// Open a tab and navigate to `url`, failing if navigation exceeds `timeout`.
    async fn open(&self, url: &Url, timeout: Duration) -> Result<Self::Tab, FetchError>;

    /// Release the browser process, if one was started.
    async fn shutdown(self) -> Result<(), FetchError>
    where
        Self: Sized;
}

/// One open tab. Must be closed with [`BrowserTab::close`].
pub trait BrowserTab {
    /// Current rendered markup.
    async fn html(&self) -> Result<String, FetchError>;

    /// URL after redirects, if the page knows it.
    async fn current_url(&self) -> Result<Option<String>, FetchError>;

    /// Whether any candidate of `rule` currently matches an element.
    async fn has_any(&self, rule: &SelectorRule) -> Result<bool, FetchError>;

    async fn scroll_to_bottom(&self) -> Result<(), FetchError>;

    async fn scroll_height(&self) -> Result<u64, FetchError>;

    /// Full-page PNG.
    async fn screenshot(&self) -> Result<Vec<u8>, FetchError>;

    async fn close(self) -> Result<(), FetchError>
    where
        Self: Sized;
}

/// Headless Chromium, launched lazily.
pub struct ChromiumBrowser {
    settings: FetchSettings,
    session: OnceCell<Session>,
}

struct Session {
    browser: CdpBrowser,
    handler: JoinHandle<()>,
}

impl ChromiumBrowser {
    pub fn new(settings: &FetchSettings) -> Self {
        Self {
            settings: settings.clone(),
            session: OnceCell::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.session.initialized()
    }

    async fn session(&self) -> Result<&Session, FetchError> {
        self.session
            .get_or_try_init(|| launch(&self.settings))
            .await
    }
}

#[instrument(level = "info", skip_all)]
async fn launch(settings: &FetchSettings) -> Result<Session, FetchError> {
    let mut builder = BrowserConfig::builder()
        .window_size(settings.window_width, settings.window_height)
        .request_timeout(settings.page_load_timeout())
        .arg("--headless=new")
        .arg("--disable-gpu")
        .arg("--no-sandbox")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-notifications")
        .arg("--disable-extensions")
        .arg("--disable-infobars")
        .arg(format!("--user-agent={}", settings.user_agent));
    if let Some(path) = &settings.chrome_path {
        builder = builder.chrome_executable(path);
    }
    let config = builder
        .build()
        .map_err(|e| FetchError::Render(format!("invalid browser config: {e}")))?;

    let (browser, mut handler) = CdpBrowser::launch(config)
        .await
        .map_err(|e| FetchError::Render(format!("failed to launch Chromium: {e}")))?;

    let handler = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                debug!(error = %e, "CDP handler event error");
            }
        }
    });

    info!("Chromium launched");
    Ok(Session { browser, handler })
}

impl Browser for ChromiumBrowser {
    type Tab = ChromiumTab;

    #[instrument(level = "info", skip_all, fields(%url))]
    async fn open(&self, url: &Url, timeout: Duration) -> Result<ChromiumTab, FetchError> {
        let session = self.session().await?;
        let page = session
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| FetchError::Render(format!("failed to open tab: {e}")))?;

        let navigation = tokio::time::timeout(timeout, page.goto(url.as_str()))
            .await
            .map(|result| result.map(|_| ()));

        match navigation {
            Ok(Ok(())) => Ok(ChromiumTab { page }),
            Ok(Err(e)) => {
                close_quietly(page).await;
                Err(FetchError::Render(format!("navigation to {url} failed: {e}")))
            }
            Err(_) => {
                close_quietly(page).await;
                Err(FetchError::Timeout {
                    url: url.to_string(),
                    secs: timeout.as_secs(),
                })
            }
        }
    }

    async fn shutdown(self) -> Result<(), FetchError> {
        let Some(mut session) = self.session.into_inner() else {
            debug!("Browser never launched; nothing to close");
            return Ok(());
        };

        let closed = session.browser.close().await;
        if let Err(e) = session.browser.wait().await {
            warn!(error = %e, "Waiting for Chromium to exit failed");
        }
        session.handler.abort();

        match closed {
            Ok(_) => {
                info!("Chromium closed");
                Ok(())
            }
            Err(e) => Err(FetchError::Render(format!("failed to close Chromium: {e}"))),
        }
    }
}

async fn close_quietly(page: Page) {
    if let Err(e) = page.close().await {
        warn!(error = %e, "Failed to close tab");
    }
}

/// A Chromium tab.
pub struct ChromiumTab {
    page: Page,
}

impl BrowserTab for ChromiumTab {
    async fn html(&self) -> Result<String, FetchError> {
        self.page
            .content()
            .await
            .map_err(|e| FetchError::Render(format!("failed to read page markup: {e}")))
    }

    async fn current_url(&self) -> Result<Option<String>, FetchError> {
        self.page
            .url()
            .await
            .map_err(|e| FetchError::Render(format!("failed to read page URL: {e}")))
    }

    async fn has_any(&self, rule: &SelectorRule) -> Result<bool, FetchError> {
        for (selector, _) in rule.candidates() {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn scroll_to_bottom(&self) -> Result<(), FetchError> {
        self.page
            .evaluate("window.scrollTo(0, document.body.scrollHeight)")
            .await
            .map(|_| ())
            .map_err(|e| FetchError::Render(format!("scroll failed: {e}")))
    }

    async fn scroll_height(&self) -> Result<u64, FetchError> {
        let height: f64 = self
            .page
            .evaluate("document.body.scrollHeight")
            .await
            .map_err(|e| FetchError::Render(format!("failed to read scroll height: {e}")))?
            .into_value()
            .map_err(|e| FetchError::Render(format!("unexpected scroll height value: {e}")))?;
        Ok(height.max(0.0) as u64)
    }

    async fn screenshot(&self) -> Result<Vec<u8>, FetchError> {
        self.page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
            .map_err(|e| FetchError::Render(format!("screenshot failed: {e}")))
    }

    async fn close(self) -> Result<(), FetchError> {
        self.page
            .close()
            .await
            .map_err(|e| FetchError::Render(format!("failed to close tab: {e}")))
    }
}
