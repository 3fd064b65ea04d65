//! Run configuration: targets, selector rules, and timing knobs.
//!
//! Everything here can be overridden from a YAML file passed with
//! `--config`. Every key has a default, so a config file only needs the
//! keys it changes:
//!
//! ```yaml
//! fetch:
//!   http_timeout_secs: 15
//! news:
//!   sources:
//!     - { name: kompas, url: "https://www.kompas.com/" }
//!   selectors:
//!     sites:
//!       kompas:
//!         headline: [".read__title", ".headline__title"]
//!         image: [".photo__wrap img"]
//! books:
//!   scroll: { max_scrolls: 5, delay_ms: 1500 }
//! ```

use crate::error::ConfigError;
use crate::models::FetchTarget;
use crate::selectors::{SelectorRegistry, SelectorRule};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

/// Largest page size the AniList API accepts.
const ANILIST_MAX_PER_PAGE: u32 = 50;

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub fetch: FetchSettings,
    pub news: NewsConfig,
    pub books: BooksConfig,
    pub anime: AnimeConfig,
    pub debug: DebugConfig,
}

/// Timeouts, headers and browser settings shared by both fetch tiers.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct FetchSettings {
    pub http_timeout_secs: u64,
    pub page_load_timeout_secs: u64,
    /// Time given to client-side scripts after navigation.
    pub settle_ms: u64,
    /// Upper bound for a whole rendered fetch, scrolling included.
    pub render_timeout_secs: u64,
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    /// Explicit Chromium binary. When unset the browser is auto-detected.
    pub chrome_path: Option<PathBuf>,
    pub window_width: u32,
    pub window_height: u32,
}

impl FetchSettings {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            http_timeout_secs: 10,
            page_load_timeout_secs: 30,
            settle_ms: 5_000,
            render_timeout_secs: 120,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36"
                .to_string(),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"
                .to_string(),
            accept_language: "id-ID,id;q=0.9,en-US;q=0.8,en;q=0.7".to_string(),
            chrome_path: None,
            window_width: 1920,
            window_height: 1080,
        }
    }
}

/// A news source as written in the config file.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct SourceEntry {
    pub name: String,
    pub url: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct NewsConfig {
    pub sources: Vec<SourceEntry>,
    /// When true, a plain HTTP fetch is only accepted if the image was found too.
    pub require_image: bool,
    pub selectors: SelectorRegistry,
    /// Applied to rendered pages when a site's own rules found nothing.
    pub last_resort_headline: SelectorRule,
    pub last_resort_image_extensions: Vec<String>,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            sources: vec![
                SourceEntry {
                    name: "kompas".to_string(),
                    url: "https://www.kompas.com/".to_string(),
                },
                SourceEntry {
                    name: "detik".to_string(),
                    url: "https://www.detik.com/".to_string(),
                },
                SourceEntry {
                    name: "tribun".to_string(),
                    url: "https://www.tribunnews.com/".to_string(),
                },
            ],
            require_image: true,
            selectors: SelectorRegistry::default(),
            last_resort_headline: SelectorRule::builtin(&["h1", "h2", ".title"]),
            last_resort_image_extensions: vec![
                ".jpg".to_string(),
                ".jpeg".to_string(),
                ".png".to_string(),
                ".webp".to_string(),
            ],
        }
    }
}

/// Lazy-load scrolling: scroll to the bottom up to `max_scrolls` times,
/// waiting `delay_ms` after each, stopping early once the page stops growing.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ScrollPlan {
    pub max_scrolls: u32,
    pub delay_ms: u64,
}

impl ScrollPlan {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for ScrollPlan {
    fn default() -> Self {
        Self {
            max_scrolls: 20,
            delay_ms: 3_000,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BooksConfig {
    pub source: String,
    pub url: String,
    pub wait_timeout_secs: u64,
    pub scroll: ScrollPlan,
    pub card: SelectorRule,
    pub title: SelectorRule,
    pub publisher: SelectorRule,
    pub price: SelectorRule,
    pub image: SelectorRule,
    pub link: SelectorRule,
}

impl BooksConfig {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }
}

impl Default for BooksConfig {
    fn default() -> Self {
        Self {
            source: "gramedia".to_string(),
            url: "https://www.gramedia.com/promo/international-book".to_string(),
            wait_timeout_secs: 30,
            scroll: ScrollPlan::default(),
            card: SelectorRule::builtin(&[
                "div.ProductCard_cardContent__fawWr",
                "div.product-card",
                "div[data-testid='productCard']",
                "div.product-item",
            ]),
            title: SelectorRule::builtin(&[
                "h2.text-neutral-700",
                "h2.product-title",
                "div.product-name",
                "[data-testid='productTitle']",
            ]),
            publisher: SelectorRule::builtin(&[
                "div.text-neutral-500",
                "div.publisher",
                "div.product-publisher",
                "[data-testid='productPublisher']",
            ]),
            price: SelectorRule::builtin(&[
                "div.text-s-extrabold",
                "div.product-price",
                "div.price",
                "[data-testid='productPrice']",
            ]),
            image: SelectorRule::builtin(&[
                "img.object-contain",
                "img.product-image",
                "img[data-testid='productImage']",
            ]),
            link: SelectorRule::builtin(&["a[href]"]),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AnimeConfig {
    pub source: String,
    /// Query the GraphQL API first; the HTML listing is used when this is off or the API fails.
    pub prefer_api: bool,
    pub api_url: String,
    pub listing_url: String,
    pub page: u32,
    pub per_page: u32,
    pub card: SelectorRule,
    pub title: SelectorRule,
    pub image: SelectorRule,
    pub link: SelectorRule,
}

impl Default for AnimeConfig {
    fn default() -> Self {
        Self {
            source: "anilist".to_string(),
            prefer_api: true,
            api_url: "https://graphql.anilist.co".to_string(),
            listing_url: "https://anilist.co/search/anime/trending".to_string(),
            page: 1,
            per_page: ANILIST_MAX_PER_PAGE,
            card: SelectorRule::builtin(&["div.media-card"]),
            title: SelectorRule::builtin(&["div.title", "a.title"]),
            image: SelectorRule::builtin(&["img.image", "img"]),
            link: SelectorRule::builtin(&["a.cover[href]", "a[href]"]),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Save raw markup and screenshots under `debug/`.
    pub artifacts: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self { artifacts: true }
    }
}

impl Config {
    /// Load configuration from `path`, or the built-in defaults when `None`.
    ///
    /// # Arguments
    ///
    /// * `path` - Optional YAML file; missing keys fall back to the defaults
    ///
    /// # Returns
    ///
    /// The validated configuration, or a [`ConfigError`] when the file cannot
    /// be read, does not parse, or fails validation.
    #[instrument(level = "info", skip_all, fields(path = ?path))]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                let config: Config =
                    serde_yaml::from_str(&raw).map_err(|source| ConfigError::Yaml {
                        path: path.to_path_buf(),
                        source,
                    })?;
                info!("Loaded configuration file");
                config
            }
            None => {
                debug!("No config file given; using built-in defaults");
                Config::default()
            }
        };
        config.validate()?;
        debug!(
            news_sources = config.news.sources.len(),
            book_card_rules = config.books.card.len(),
            anime_card_rules = config.anime.card.len(),
            "Configuration validated"
        );
        Ok(config)
    }

    /// Reject configurations that would fail every run the same way.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = BTreeSet::new();
        for source in &self.news.sources {
            if source.name.trim().is_empty() {
                return Err(ConfigError::Invalid("news source with empty name".to_string()));
            }
            if !seen.insert(source.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate news source `{}`",
                    source.name
                )));
            }
            parse_url(&source.name, &source.url)?;
        }
        parse_url(&self.books.source, &self.books.url)?;
        parse_url("anime.api_url", &self.anime.api_url)?;
        parse_url("anime.listing_url", &self.anime.listing_url)?;

        if self.books.card.is_empty() {
            return Err(ConfigError::Invalid(
                "books.card needs at least one selector".to_string(),
            ));
        }
        if self.anime.card.is_empty() {
            return Err(ConfigError::Invalid(
                "anime.card needs at least one selector".to_string(),
            ));
        }
        if self.anime.per_page == 0 || self.anime.per_page > ANILIST_MAX_PER_PAGE {
            return Err(ConfigError::Invalid(format!(
                "anime.per_page must be between 1 and {ANILIST_MAX_PER_PAGE}"
            )));
        }
        if self.anime.page == 0 {
            return Err(ConfigError::Invalid("anime.page starts at 1".to_string()));
        }
        if self.fetch.http_timeout_secs == 0
            || self.fetch.page_load_timeout_secs == 0
            || self.fetch.render_timeout_secs == 0
        {
            return Err(ConfigError::Invalid("timeouts must be non-zero".to_string()));
        }

        // a catalog render that cannot finish its waits and scrolls loses every card
        let catalog_ms = self.catalog_render_ms();
        let budget_ms = self.fetch.render_timeout_secs.saturating_mul(1_000);
        if catalog_ms > budget_ms {
            return Err(ConfigError::Invalid(format!(
                "books need up to {catalog_ms} ms (settle + wait + scrolls) but \
                 fetch.render_timeout_secs allows {budget_ms} ms"
            )));
        }
        Ok(())
    }

    /// Worst-case time a catalog render spends waiting, settling and scrolling.
    pub fn catalog_render_ms(&self) -> u64 {
        let scroll = &self.books.scroll;
        self.fetch
            .settle_ms
            .saturating_add(self.books.wait_timeout_secs.saturating_mul(1_000))
            .saturating_add(u64::from(scroll.max_scrolls).saturating_mul(scroll.delay_ms))
    }

    /// One fetch target per configured news source, with its selector policy attached.
    pub fn news_targets(&self) -> Result<Vec<FetchTarget>, ConfigError> {
        self.news
            .sources
            .iter()
            .map(|entry| {
                Ok(FetchTarget {
                    source: entry.name.clone(),
                    url: parse_url(&entry.name, &entry.url)?,
                    selectors: self.news.selectors.for_source(&entry.name).clone(),
                })
            })
            .collect()
    }
}

fn parse_url(name: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|source| ConfigError::Url {
        name: name.to_string(),
        url: raw.to_string(),
        source,
    })
}
