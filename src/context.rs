//! Per-run execution context.
//!
//! Owns the shared Tier-1 client, the browser, the configuration and the
//! artifact sink. Created once at startup and torn down with
//! [`RunContext::shutdown`] after the last adapter returns.

use crate::config::Config;
use crate::error::{ConfigError, FetchError};
use crate::fetch::{self, Browser, HttpFetcher, RenderRequest, RenderedPage};
use crate::outputs::artifacts::ArtifactSink;
use tracing::{info, warn};
use url::Url;

pub struct RunContext<B> {
    pub config: Config,
    pub http: HttpFetcher,
    pub browser: B,
    pub artifacts: ArtifactSink,
}

impl<B: Browser> RunContext<B> {
    pub fn new(config: Config, browser: B, artifacts: ArtifactSink) -> Result<Self, ConfigError> {
        let http = HttpFetcher::new(&config.fetch)?;
        Ok(Self {
            config,
            http,
            browser,
            artifacts,
        })
    }

    /// Tier-2 fetch of `url` with the run's fetch settings.
    pub async fn render(
        &self,
        url: &Url,
        request: &RenderRequest<'_>,
    ) -> Result<RenderedPage, FetchError> {
        fetch::render(&self.browser, url, request, &self.config.fetch).await
    }

    /// Release the browser. Errors are logged; the run's data is already collected.
    pub async fn shutdown(self) {
        match self.browser.shutdown().await {
            Ok(()) => info!("Run context released"),
            Err(e) => warn!(error = %e, "Browser shutdown failed"),
        }
    }
}
