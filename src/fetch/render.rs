//! Tier-2 rendered fetch.
//!
//! [`render`] opens one tab, drives it through the requested steps and always
//! closes it before returning, whether the steps succeeded, failed, or ran
//! out of time.

use super::browser::{Browser, BrowserTab};
use crate::config::{FetchSettings, ScrollPlan};
use crate::error::FetchError;
use crate::models::{RawDocument, Tier};
use crate::selectors::SelectorRule;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Interval between readiness checks.
const READY_POLL: Duration = Duration::from_millis(500);

/// What to do with a tab between navigation and capture.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderRequest<'a> {
    /// Wait (bounded) until any of these selectors matches.
    pub wait_for: Option<(&'a SelectorRule, Duration)>,
    /// Scroll to trigger lazy-loaded content before capturing.
    pub scroll: Option<ScrollPlan>,
    /// Capture a full-page screenshot.
    pub screenshot: bool,
}

/// Rendered markup and what it took to get it.
#[derive(Debug)]
pub struct RenderedPage {
    pub document: RawDocument,
    /// Markup captured just before the first scroll.
    pub before_scroll: Option<String>,
    pub scrolls: u32,
    /// False when readiness selectors never appeared within their wait.
    pub ready: bool,
    pub screenshot: Option<Vec<u8>>,
}

/// Render `url` in a fresh tab of `browser`.
///
/// The whole operation, scrolling included, is bounded by
/// [`FetchSettings::render_timeout`]. The tab is closed on every path.
///
/// # Arguments
///
/// * `browser` - Browser the tab is opened in, launched on first use
/// * `url` - The page to load
/// * `request` - Readiness selectors, settle delay, scroll plan and screenshot flag
/// * `settings` - Page-load and render timeouts
///
/// # Returns
///
/// The final markup as a Tier-2 document, plus a screenshot when requested.
/// A render that overruns its budget yields [`FetchError::Timeout`].
#[instrument(level = "info", skip_all, fields(%url))]
pub async fn render<B: Browser>(
    browser: &B,
    url: &Url,
    request: &RenderRequest<'_>,
    settings: &FetchSettings,
) -> Result<RenderedPage, FetchError> {
    let t0 = Instant::now();
    let tab = browser.open(url, settings.page_load_timeout()).await?;

    let driven = tokio::time::timeout(
        settings.render_timeout(),
        drive(&tab, url, request, settings),
    )
    .await;

    if let Err(e) = tab.close().await {
        warn!(error = %e, "Failed to close tab");
    }

    let page = match driven {
        Ok(result) => result?,
        Err(_) => {
            return Err(FetchError::Timeout {
                url: url.to_string(),
                secs: settings.render_timeout_secs,
            });
        }
    };

    info!(
        bytes = page.document.html.len(),
        scrolls = page.scrolls,
        ready = page.ready,
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "Rendered page"
    );
    Ok(page)
}

async fn drive<T: BrowserTab>(
    tab: &T,
    url: &Url,
    request: &RenderRequest<'_>,
    settings: &FetchSettings,
) -> Result<RenderedPage, FetchError> {
    let ready = match request.wait_for {
        Some((rule, limit)) => wait_for_any(tab, rule, limit).await?,
        None => true,
    };
    if !ready {
        warn!("Timed out waiting for content; proceeding with what rendered");
    }

    sleep(settings.settle()).await;

    let (before_scroll, scrolls) = match request.scroll {
        Some(plan) => {
            let before = tab.html().await?;
            let scrolls = scroll(tab, plan).await?;
            (Some(before), scrolls)
        }
        None => (None, 0),
    };

    let html = tab.html().await?;
    let final_url = tab
        .current_url()
        .await
        .ok()
        .flatten()
        .and_then(|u| Url::parse(&u).ok())
        .unwrap_or_else(|| url.clone());

    // a page that never became ready is always worth a look
    let screenshot = if request.screenshot || !ready {
        match tab.screenshot().await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(error = %e, "Screenshot failed");
                None
            }
        }
    } else {
        None
    };

    Ok(RenderedPage {
        document: RawDocument {
            url: final_url,
            html,
            tier: Tier::Rendered,
        },
        before_scroll,
        scrolls,
        ready,
        screenshot,
    })
}

async fn wait_for_any<T: BrowserTab>(
    tab: &T,
    rule: &SelectorRule,
    limit: Duration,
) -> Result<bool, FetchError> {
    let deadline = Instant::now() + limit;
    loop {
        if tab.has_any(rule).await? {
            debug!("Content selectors present");
            return Ok(true);
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(false);
        }
        sleep(READY_POLL.min(deadline - now)).await;
    }
}

/// Scroll until the page stops growing or the plan runs out. Returns scrolls performed.
async fn scroll<T: BrowserTab>(tab: &T, plan: ScrollPlan) -> Result<u32, FetchError> {
    let mut last_height = tab.scroll_height().await?;
    let mut performed = 0;

    while performed < plan.max_scrolls {
        tab.scroll_to_bottom().await?;
        sleep(plan.delay()).await;
        performed += 1;

        let height = tab.scroll_height().await?;
        info!(
            scroll = performed,
            max = plan.max_scrolls,
            height,
            "Scrolled"
        );
        if height == last_height {
            debug!("Reached bottom of page");
            break;
        }
        last_height = height;
    }
    Ok(performed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::browser::fake::FakeBrowser;

    fn quick() -> FetchSettings {
        FetchSettings {
            settle_ms: 0,
            ..FetchSettings::default()
        }
    }

    const URL: &str = "https://www.gramedia.com/promo/international-book";

    #[tokio::test]
    async fn test_render_closes_tab_on_success() {
        let browser = FakeBrowser::new().page(URL, "<h1>ok</h1>");
        let url = Url::parse(URL).unwrap();
        let page = render(&browser, &url, &RenderRequest::default(), &quick())
            .await
            .unwrap();
        assert_eq!(page.document.tier, Tier::Rendered);
        assert!(page.screenshot.is_none());
        assert_eq!(browser.closed_tabs(), 1);
    }

    #[tokio::test]
    async fn test_failed_navigation_opens_nothing_to_close() {
        let browser = FakeBrowser::new().failing(URL, "net::ERR_NAME_NOT_RESOLVED");
        let url = Url::parse(URL).unwrap();
        let err = render(&browser, &url, &RenderRequest::default(), &quick())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Render(_)));
        assert_eq!(browser.total_opens(), 1);
        assert_eq!(browser.closed_tabs(), 0);
    }

    #[tokio::test]
    async fn test_render_timeout_still_closes_tab() {
        let browser = FakeBrowser::new().hanging(URL);
        let url = Url::parse(URL).unwrap();
        let settings = FetchSettings {
            render_timeout_secs: 1,
            ..quick()
        };
        let err = render(&browser, &url, &RenderRequest::default(), &settings)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout { secs: 1, .. }), "got {err:?}");
        assert_eq!(browser.total_opens(), 1);
        assert_eq!(browser.closed_tabs(), 1);
    }

    #[tokio::test]
    async fn test_capture_error_still_closes_tab() {
        let browser = FakeBrowser::new().broken(URL, "Target closed");
        let url = Url::parse(URL).unwrap();
        let err = render(&browser, &url, &RenderRequest::default(), &quick())
            .await
            .unwrap_err();
        match err {
            FetchError::Render(message) => assert_eq!(message, "Target closed"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(browser.closed_tabs(), 1);
    }

    #[tokio::test]
    async fn test_scroll_stops_when_height_stops_growing() {
        let frames = vec![
            "<div class='c'></div>".to_string(),
            "<div class='c'></div><div class='c'></div>".to_string(),
            "<div class='c'></div><div class='c'></div><div class='c'></div>".to_string(),
        ];
        let browser = FakeBrowser::new().frames(URL, frames);
        let url = Url::parse(URL).unwrap();
        let request = RenderRequest {
            scroll: Some(ScrollPlan {
                max_scrolls: 20,
                delay_ms: 0,
            }),
            ..RenderRequest::default()
        };
        let page = render(&browser, &url, &request, &quick()).await.unwrap();
        // two growing scrolls, then one that finds the bottom
        assert_eq!(page.scrolls, 3);
        assert_eq!(page.before_scroll.as_deref(), Some("<div class='c'></div>"));
        assert_eq!(page.document.html.matches("class='c'").count(), 3);
        assert_eq!(browser.closed_tabs(), 1);
    }

    #[tokio::test]
    async fn test_scroll_respects_max() {
        let frames = (1..=10).map(|n| "<p></p>".repeat(n)).collect();
        let browser = FakeBrowser::new().frames(URL, frames);
        let url = Url::parse(URL).unwrap();
        let request = RenderRequest {
            scroll: Some(ScrollPlan {
                max_scrolls: 4,
                delay_ms: 0,
            }),
            ..RenderRequest::default()
        };
        let page = render(&browser, &url, &request, &quick()).await.unwrap();
        assert_eq!(page.scrolls, 4);
    }

    #[tokio::test]
    async fn test_readiness_timeout_forces_screenshot() {
        let browser = FakeBrowser::new().page(URL, "<p>loading…</p>");
        let url = Url::parse(URL).unwrap();
        let rule = SelectorRule::parse(&["div.product-card"]).unwrap();
        let request = RenderRequest {
            wait_for: Some((&rule, Duration::from_millis(10))),
            ..RenderRequest::default()
        };
        let page = render(&browser, &url, &request, &quick()).await.unwrap();
        assert!(!page.ready);
        assert!(page.screenshot.is_some());
    }
}
