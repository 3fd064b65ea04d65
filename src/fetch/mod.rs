//! Two-tier page acquisition.
//!
//! - **Tier 1** ([`HttpFetcher`]): plain GET with browser-like headers and a
//!   bounded timeout. Cheap, but blind to client-rendered content.
//! - **Tier 2** ([`render`]): a headless browser tab that runs the page's
//!   scripts, optionally scrolls to trigger lazy loading, and hands back the
//!   rendered markup.
//!
//! Tier 1 reports an explicit [`Attempt`] so callers choose the next stage
//! from the variant instead of unwinding through errors.

pub mod browser;
pub mod render;

use crate::config::FetchSettings;
use crate::error::{ConfigError, FetchError};
use crate::models::{RawDocument, Tier};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
use std::time::Instant;
use tracing::{debug, instrument, warn};
use url::Url;

pub use browser::{Browser, ChromiumBrowser};
pub use render::{RenderRequest, RenderedPage, render};

/// Outcome of a Tier-1 fetch.
#[derive(Debug)]
pub enum Attempt {
    /// 2xx response and the acceptance check passed.
    Hit(RawDocument),
    /// 2xx response, but a required field had no selector match.
    Miss {
        document: RawDocument,
        reason: FetchError,
    },
    /// The request exceeded its time budget.
    TimedOut(FetchError),
    /// Transport failure, non-2xx status, or unreadable body.
    Failed(FetchError),
}

impl Attempt {
    pub fn label(&self) -> &'static str {
        match self {
            Attempt::Hit(_) => "hit",
            Attempt::Miss { .. } => "miss",
            Attempt::TimedOut(_) => "timeout",
            Attempt::Failed(_) => "failed",
        }
    }
}

/// Tier-1 client. One instance is shared by every plain HTTP request of a run.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value("user_agent", &settings.user_agent)?);
        headers.insert(ACCEPT, header_value("accept", &settings.accept)?);
        headers.insert(
            ACCEPT_LANGUAGE,
            header_value("accept_language", &settings.accept_language)?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(settings.http_timeout())
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("could not build HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout_secs: settings.http_timeout_secs,
        })
    }

    /// The underlying client, for non-HTML requests such as the GraphQL query.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// GET `url` and return the body as a Tier-1 document.
    #[instrument(level = "debug", skip_all, fields(%url))]
    pub async fn get_document(&self, url: &Url) -> Result<RawDocument, FetchError> {
        let t0 = Instant::now();
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url.as_str(), e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let html = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url.as_str(), e, self.timeout_secs))?;

        debug!(
            bytes = html.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            %final_url,
            "Fetched page"
        );
        Ok(RawDocument {
            url: final_url,
            html,
            tier: Tier::Http,
        })
    }

    /// Tier-1 attempt: fetch `url`, then run `accept` to decide whether the
    /// document is good enough or the caller should escalate to Tier 2.
    ///
    /// # Arguments
    ///
    /// * `url` - The page to fetch
    /// * `accept` - Check run on a 2xx document; its error becomes the miss reason
    ///
    /// # Returns
    ///
    /// [`Attempt::Hit`] when the check passes, [`Attempt::Miss`] with the
    /// document when it does not, and [`Attempt::TimedOut`] or
    /// [`Attempt::Failed`] when no usable response arrived.
    #[instrument(level = "info", skip_all, fields(%url))]
    pub async fn attempt<P>(&self, url: &Url, accept: P) -> Attempt
    where
        P: FnOnce(&RawDocument) -> Result<(), FetchError>,
    {
        match self.get_document(url).await {
            Ok(document) => match accept(&document) {
                Ok(()) => Attempt::Hit(document),
                Err(reason) => Attempt::Miss { document, reason },
            },
            Err(e) if e.is_timeout() => {
                warn!(error = %e, "Plain HTTP fetch timed out");
                Attempt::TimedOut(e)
            }
            Err(e) => {
                warn!(error = %e, "Plain HTTP fetch failed");
                Attempt::Failed(e)
            }
        }
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, ConfigError> {
    HeaderValue::from_str(value)
        .map_err(|e| ConfigError::Invalid(format!("fetch.{name} is not a valid header: {e}")))
}
