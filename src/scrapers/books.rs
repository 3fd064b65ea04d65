//! Book catalog adapter.
//!
//! The catalog renders its product grid client-side and loads more cards as
//! the page is scrolled, so this adapter always goes through the browser.

use crate::config::BooksConfig;
use crate::context::RunContext;
use crate::extract;
use crate::fetch::{Browser, RenderRequest};
use crate::models::{Book, RawDocument};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;
use tracing::{error, info, instrument, warn};
use url::Url;

/// First run of digits in a displayed price, with thousands separators.
static PRICE_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d[\d.,]*").unwrap());

/// Render the catalog, scroll through it and extract every card.
///
/// Never fails: a catalog that cannot be rendered or shows no cards yields
/// an empty list.
#[instrument(level = "info", skip_all, fields(url = %ctx.config.books.url))]
pub async fn collect<B: Browser>(ctx: &RunContext<B>) -> Vec<Book> {
    let config = &ctx.config.books;
    let url = match Url::parse(&config.url) {
        Ok(url) => url,
        Err(e) => {
            error!(error = %e, "Invalid catalog URL");
            return Vec::new();
        }
    };

    let request = RenderRequest {
        wait_for: Some((&config.card, config.wait_timeout())),
        scroll: Some(config.scroll),
        screenshot: ctx.artifacts.enabled(),
    };
    let page = match ctx.render(&url, &request).await {
        Ok(page) => page,
        Err(e) => {
            warn!(error = %e, "Could not render book catalog");
            return Vec::new();
        }
    };

    if let Some(png) = &page.screenshot {
        let name = if page.ready {
            format!("{}_screenshot", config.source)
        } else {
            "books_timeout".to_string()
        };
        ctx.artifacts.save_screenshot(&name, png).await;
    }

    if let Some(before) = &page.before_scroll {
        info!(visible = count_cards(before, config), "Cards before scrolling");
    }
    let books = extract_books(&page.document, config);
    info!(
        visible = books.len(),
        scrolls = page.scrolls,
        "Cards after scrolling"
    );

    if books.is_empty() {
        error!("No book cards found with any card selector");
        ctx.artifacts
            .save_html("books_page_source", &page.document.html)
            .await;
    }
    books
}

/// One record per card, using the first card selector that matches anything.
pub fn extract_books(document: &RawDocument, config: &BooksConfig) -> Vec<Book> {
    let html = extract::parse_document(&document.html);
    let captured_at = Utc::now();

    let Some((card_selector, selector)) = config
        .card
        .candidates()
        .find(|(_, selector)| html.select(selector).next().is_some())
    else {
        return Vec::new();
    };
    info!(selector = card_selector, "Using card selector");

    html.select(selector)
        .map(|card| {
            let price = extract::first_text(card, &config.price).map(|m| m.value);
            Book {
                source: config.source.clone(),
                captured_at,
                title: extract::first_text_or_title(card, &config.title).map(|m| m.value),
                publisher: extract::first_text_or_title(card, &config.publisher).map(|m| m.value),
                price_value: price.as_deref().and_then(parse_price),
                price,
                image: extract::first_image(card, &config.image, &document.url).map(|m| m.value),
                link: card_link(card, config, &document.url),
            }
        })
        .collect()
}

/// Number of cards the first matching card selector finds in `html`.
fn count_cards(html: &str, config: &BooksConfig) -> usize {
    let html = extract::parse_document(html);
    config
        .card
        .candidates()
        .map(|(_, selector)| html.select(selector).count())
        .find(|&n| n > 0)
        .unwrap_or(0)
}

/// A link inside the card, else the anchor wrapping it.
fn card_link(card: ElementRef<'_>, config: &BooksConfig, base: &Url) -> Option<String> {
    extract::first_link(card, &config.link, base)
        .map(|m| m.value)
        .or_else(|| {
            card.ancestors()
                .filter_map(ElementRef::wrap)
                .find(|el| el.value().name() == "a")
                .and_then(|a| a.value().attr("href"))
                .and_then(|href| extract::resolve(base, href))
        })
}

/// Whole rupiah from a displayed price: `Rp 150.000` -> `150000`.
///
/// `.` groups thousands and `,` starts the decimals, which are dropped.
///
/// # Returns
///
/// `None` when the text holds no digits.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(parse_price("Rp 150.000"), Some(150_000));
/// assert_eq!(parse_price("Rp 99.500,50"), Some(99_500));
/// assert_eq!(parse_price("Habis"), None);
/// ```
pub fn parse_price(text: &str) -> Option<u64> {
    let digits = PRICE_DIGITS.find(text)?.as_str();
    let whole = digits.split(',').next().unwrap_or(digits);
    whole.replace('.', "").parse().ok()
}
