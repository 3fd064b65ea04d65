//! Records produced by the collector.
//!
//! - [`FetchTarget`]: one configured news site, built at startup
//! - [`RawDocument`]: markup produced by one fetch tier, consumed by extraction
//! - [`Headline`], [`Book`], [`Anime`]: the persisted records
//!
//! Every record carries a `source` and a `captured_at` timestamp, and every
//! field is an `Option` so that a partially failed extraction still emits
//! the full set of keys.

use crate::selectors::SiteSelectors;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// One configured news site: identifier, landing page, selector policy.
#[derive(Clone, Debug)]
pub struct FetchTarget {
    pub source: String,
    pub url: Url,
    pub selectors: SiteSelectors,
}

/// Which fetch tier produced a document.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Plain HTTP GET plus HTML parse.
    Http,
    /// Headless browser render.
    Rendered,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Http => "http",
            Tier::Rendered => "rendered",
        }
    }
}

/// Markup fetched from `url` by one tier. Parsed only during extraction.
#[derive(Clone, Debug)]
pub struct RawDocument {
    /// Final URL, used as the base for resolving relative links.
    pub url: Url,
    pub html: String,
    pub tier: Tier,
}

/// Snapshot of a news site's current top headline.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Headline {
    pub source: String,
    pub url: String,
    pub captured_at: DateTime<Utc>,
    pub headline: Option<String>,
    pub image: Option<String>,
    /// Tier that produced the extracted fields, absent when both failed.
    pub tier: Option<Tier>,
    /// Why fields are missing, when the fetch failed.
    pub error: Option<String>,
}

impl Headline {
    /// A record with every field absent.
    pub fn empty(target: &FetchTarget) -> Self {
        Self {
            source: target.source.clone(),
            url: target.url.to_string(),
            captured_at: Utc::now(),
            headline: None,
            image: None,
            tier: None,
            error: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.headline.is_some() && self.image.is_some()
    }
}

/// One listing from the book catalog.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Book {
    pub source: String,
    pub captured_at: DateTime<Utc>,
    pub title: Option<String>,
    pub publisher: Option<String>,
    /// Price as displayed, e.g. `Rp 150.000`.
    pub price: Option<String>,
    /// Price in whole rupiah, when the displayed price could be read.
    pub price_value: Option<u64>,
    pub image: Option<String>,
    pub link: Option<String>,
}

/// How an anime record was acquired.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Api,
    Html,
}

impl Origin {
    pub fn as_str(self) -> &'static str {
        match self {
            Origin::Api => "api",
            Origin::Html => "html",
        }
    }
}

/// One trending anime entry.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Anime {
    pub source: String,
    pub captured_at: DateTime<Utc>,
    pub origin: Origin,
    pub title: Option<String>,
    /// Average score out of 100.
    pub score: Option<u32>,
    pub episodes: Option<u32>,
    pub image: Option<String>,
    pub site_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selectors::SelectorRegistry;

    fn target() -> FetchTarget {
        FetchTarget {
            source: "tribun".to_string(),
            url: Url::parse("https://www.tribunnews.com/").unwrap(),
            selectors: SelectorRegistry::default().for_source("tribun").clone(),
        }
    }

    #[test]
    fn test_empty_headline_serializes_every_key() {
        let record = Headline::empty(&target());
        let value = serde_json::to_value(&record).unwrap();
        let object = value.as_object().unwrap();
        for key in ["source", "url", "captured_at", "headline", "image", "tier", "error"] {
            assert!(object.contains_key(key), "missing key {key}");
        }
        assert!(object["headline"].is_null());
        assert_eq!(object["source"], "tribun");
    }

    #[test]
    fn test_book_serializes_every_key() {
        let book = Book {
            source: "gramedia".to_string(),
            captured_at: Utc::now(),
            title: Some("Atomic Habits".to_string()),
            publisher: None,
            price: None,
            price_value: None,
            image: None,
            link: None,
        };
        let value = serde_json::to_value(&book).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 8);
        assert!(object["publisher"].is_null());
    }

    #[test]
    fn test_tier_and_origin_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&Tier::Rendered).unwrap(), "\"rendered\"");
        assert_eq!(serde_json::to_string(&Origin::Api).unwrap(), "\"api\"");
        assert_eq!(Tier::Http.as_str(), "http");
        assert_eq!(Origin::Html.as_str(), "html");
    }

    #[test]
    fn test_is_complete() {
        let mut record = Headline::empty(&target());
        assert!(!record.is_complete());
        record.headline = Some("Banjir Jakarta".to_string());
        record.image = Some("https://img.example/a.jpg".to_string());
        assert!(record.is_complete());
    }
}
