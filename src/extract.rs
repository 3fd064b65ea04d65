//! Ordered-selector extraction over parsed HTML.
//!
//! Every function takes a scope (the document root or a card element) and a
//! [`SelectorRule`]. Candidates are tried in declared order; within one
//! candidate, matching elements are tried in document order. The first
//! element yielding a non-empty value wins. There is no scoring and no
//! combination across candidates.
//!
//! Extraction is pure: the same scope and rule always give the same result.

use crate::selectors::SelectorRule;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Attributes read, in order, when an image's `src` is empty or a placeholder.
const LAZY_SOURCE_ATTRS: &[&str] = &["data-src", "data-original", "data-lazy-src"];

/// A successful extraction and the candidate selector that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Match {
    pub selector: String,
    pub value: String,
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized text content of an element.
///
/// Text nodes are concatenated as-is, so inline markup such as
/// `Ja<b>karta</b>` reads `Jakarta`; only whitespace present in the source
/// separates words.
pub fn element_text(element: ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<String>())
}

/// Parse a whole document and return its root element's tree.
pub fn parse_document(html: &str) -> Html {
    Html::parse_document(html)
}

/// First non-empty text match.
pub fn first_text(scope: ElementRef<'_>, rule: &SelectorRule) -> Option<Match> {
    first_value(scope, rule, |element| non_empty(element_text(element)))
}

/// First match preferring the element's `title` attribute over its text.
///
/// Catalog cards often truncate visible text and keep the full value in `title`.
pub fn first_text_or_title(scope: ElementRef<'_>, rule: &SelectorRule) -> Option<Match> {
    first_value(scope, rule, |element| {
        element
            .value()
            .attr("title")
            .map(normalize_whitespace)
            .and_then(non_empty)
            .or_else(|| non_empty(element_text(element)))
    })
}

/// First image URL, resolved against `base`.
///
/// Reads `src` first, then the lazy-load attributes when `src` is empty or an
/// inline `data:` placeholder.
pub fn first_image(scope: ElementRef<'_>, rule: &SelectorRule, base: &Url) -> Option<Match> {
    first_value(scope, rule, |element| image_source(element, base))
}

/// First link target, resolved against `base`.
pub fn first_link(scope: ElementRef<'_>, rule: &SelectorRule, base: &Url) -> Option<Match> {
    first_value(scope, rule, |element| {
        element
            .value()
            .attr("href")
            .and_then(|href| resolve(base, href))
    })
}

/// Scan every `img` for a URL ending in one of `extensions` (case-insensitive,
/// query string ignored). Last-resort image lookup for rendered pages.
pub fn first_image_with_extension(
    scope: ElementRef<'_>,
    base: &Url,
    extensions: &[String],
) -> Option<String> {
    let img = Selector::parse("img").ok()?;
    scope
        .select(&img)
        .filter_map(|element| image_source(element, base))
        .find(|src| has_extension(src, extensions))
}

/// Resolve `raw` against `base`. Handles relative and protocol-relative URLs.
pub fn resolve(base: &Url, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with("javascript:") || raw.starts_with('#') {
        return None;
    }
    base.join(raw).ok().map(|u| u.to_string())
}

fn first_value<F>(scope: ElementRef<'_>, rule: &SelectorRule, mut read: F) -> Option<Match>
where
    F: FnMut(ElementRef<'_>) -> Option<String>,
{
    for (source, selector) in rule.candidates() {
        if let Some(value) = scope.select(selector).find_map(&mut read) {
            return Some(Match {
                selector: source.to_string(),
                value,
            });
        }
    }
    None
}

fn image_source(element: ElementRef<'_>, base: &Url) -> Option<String> {
    let attrs = element.value();
    let primary = attrs
        .attr("src")
        .map(str::trim)
        .filter(|src| !src.is_empty() && !src.starts_with("data:"));

    primary
        .or_else(|| {
            LAZY_SOURCE_ATTRS
                .iter()
                .filter_map(|name| attrs.attr(name))
                .map(str::trim)
                .find(|src| !src.is_empty())
        })
        .and_then(|src| resolve(base, src))
}

fn has_extension(src: &str, extensions: &[String]) -> bool {
    let path = src.split(['?', '#']).next().unwrap_or(src).to_ascii_lowercase();
    extensions
        .iter()
        .any(|ext| path.ends_with(&ext.to_ascii_lowercase()))
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}
