//! Selector rules and the per-site registry.
//!
//! A [`SelectorRule`] is an ordered list of CSS selectors. Candidates are
//! compiled once when configuration loads, so a typo in a config file fails
//! the run at startup rather than silently matching nothing later.
//!
//! The [`SelectorRegistry`] maps a news source identifier to its
//! [`SiteSelectors`] policy. Unknown sources get the registry's generic
//! fallback set.

use crate::error::ConfigError;
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// An ordered list of candidate CSS selectors. First non-empty match wins.
#[derive(Clone, Deserialize, Serialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct SelectorRule {
    sources: Vec<String>,
    compiled: Vec<Selector>,
}

impl SelectorRule {
    /// Compile an ordered list of selectors.
    pub fn parse<S: AsRef<str>>(selectors: &[S]) -> Result<Self, ConfigError> {
        let mut sources = Vec::with_capacity(selectors.len());
        let mut compiled = Vec::with_capacity(selectors.len());
        for raw in selectors {
            let raw = raw.as_ref().trim();
            let selector = Selector::parse(raw).map_err(|e| ConfigError::Selector {
                selector: raw.to_string(),
                message: format!("{e:?}"),
            })?;
            sources.push(raw.to_string());
            compiled.push(selector);
        }
        Ok(Self { sources, compiled })
    }

    /// Build a rule from selectors known to be valid at compile time.
    ///
    /// # Panics
    ///
    /// Panics if any selector is invalid. Only used for built-in defaults,
    /// which are covered by tests.
    pub(crate) fn builtin(selectors: &[&str]) -> Self {
        Self::parse(selectors).expect("built-in selector must be valid")
    }

    /// Candidates in declared order, paired with their source text.
    pub fn candidates(&self) -> impl Iterator<Item = (&str, &Selector)> {
        self.sources
            .iter()
            .map(String::as_str)
            .zip(self.compiled.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }
}

impl TryFrom<Vec<String>> for SelectorRule {
    type Error = ConfigError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SelectorRule> for Vec<String> {
    fn from(rule: SelectorRule) -> Self {
        rule.sources
    }
}

impl fmt::Debug for SelectorRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.sources).finish()
    }
}

impl PartialEq for SelectorRule {
    fn eq(&self, other: &Self) -> bool {
        self.sources == other.sources
    }
}

/// Headline and image rules for one news site.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct SiteSelectors {
    pub headline: SelectorRule,
    pub image: SelectorRule,
}

/// Per-source selector policies plus the generic set for unknown sources.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SelectorRegistry {
    pub sites: BTreeMap<String, SiteSelectors>,
    pub fallback: SiteSelectors,
}

impl SelectorRegistry {
    /// Selector policy for a source, or the generic fallback when unknown.
    pub fn for_source(&self, source: &str) -> &SiteSelectors {
        self.sites.get(source).unwrap_or(&self.fallback)
    }

    pub fn knows(&self, source: &str) -> bool {
        self.sites.contains_key(source)
    }
}

impl Default for SelectorRegistry {
    fn default() -> Self {
        let mut sites = BTreeMap::new();
        sites.insert(
            "kompas".to_string(),
            SiteSelectors {
                headline: SelectorRule::builtin(&[
                    ".read__title",
                    ".headline__title",
                    ".most__title",
                    ".trending__title",
                ]),
                image: SelectorRule::builtin(&[
                    ".photo__wrap img",
                    ".headline__thumb img",
                    "img.lozad",
                ]),
            },
        );
        sites.insert(
            "detik".to_string(),
            SiteSelectors {
                headline: SelectorRule::builtin(&[
                    ".detail__title",
                    ".media__title",
                    ".title",
                    "h1.title",
                    "h2.title",
                ]),
                image: SelectorRule::builtin(&[
                    ".detail__img-wrap img",
                    ".headline__img img",
                    "picture img",
                ]),
            },
        );
        sites.insert(
            "tribun".to_string(),
            SiteSelectors {
                headline: SelectorRule::builtin(&[
                    ".hltitle",
                    ".headline-caption",
                    ".newslist-title",
                    "h1.f50",
                ]),
                image: SelectorRule::builtin(&[
                    ".imgpreview img",
                    ".headline-img img",
                    ".news-image img",
                ]),
            },
        );

        Self {
            sites,
            fallback: SiteSelectors {
                headline: SelectorRule::builtin(&["h1", "h2.title", ".headline", ".title"]),
                image: SelectorRule::builtin(&["img"]),
            },
        }
    }
}
