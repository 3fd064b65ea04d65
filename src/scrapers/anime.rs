//! Trending-anime adapter.
//!
//! Prefers the public GraphQL API and falls back to scraping the trending
//! listing page. Both paths use the Tier-1 client; the listing is served
//! with its cards in the initial markup.

use crate::config::AnimeConfig;
use crate::error::FetchError;
use crate::extract;
use crate::fetch::HttpFetcher;
use crate::models::{Anime, Origin};
use crate::utils::truncate_for_log;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

const TRENDING_QUERY: &str = r#"
query ($page: Int, $perPage: Int) {
  Page(page: $page, perPage: $perPage) {
    media(sort: TRENDING_DESC, type: ANIME) {
      id
      siteUrl
      title { romaji english native }
      coverImage { extraLarge large medium }
      averageScore
      episodes
    }
  }
}
"#;

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: Variables,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Variables {
    page: u32,
    per_page: u32,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<PageData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct PageData {
    #[serde(rename = "Page")]
    page: Option<MediaPage>,
}

#[derive(Debug, Deserialize)]
struct MediaPage {
    #[serde(default)]
    media: Vec<Media>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Media {
    site_url: Option<String>,
    title: Option<MediaTitle>,
    cover_image: Option<CoverImage>,
    average_score: Option<u32>,
    episodes: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct MediaTitle {
    romaji: Option<String>,
    english: Option<String>,
    native: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoverImage {
    extra_large: Option<String>,
    large: Option<String>,
    medium: Option<String>,
}

/// Collect trending anime. Never fails; when both paths fail the list is empty.
#[instrument(level = "info", skip_all, fields(prefer_api = prefer_api))]
pub async fn collect(http: &HttpFetcher, config: &AnimeConfig, prefer_api: bool) -> Vec<Anime> {
    if prefer_api {
        match fetch_from_api(http, config).await {
            Ok(anime) => {
                info!(count = anime.len(), "Trending anime from API");
                return anime;
            }
            Err(e) => warn!(error = %e, "Anime API failed; falling back to listing page"),
        }
    } else {
        debug!("API disabled; using listing page");
    }

    match fetch_from_html(http, config).await {
        Ok(anime) => {
            info!(count = anime.len(), "Trending anime from listing page");
            anime
        }
        Err(e) => {
            error!(error = %e, "No trending anime collected");
            Vec::new()
        }
    }
}

#[instrument(level = "debug", skip_all, fields(url = %config.api_url))]
async fn fetch_from_api(http: &HttpFetcher, config: &AnimeConfig) -> Result<Vec<Anime>, FetchError> {
    let url = config.api_url.as_str();
    let request = GraphQlRequest {
        query: TRENDING_QUERY,
        variables: Variables {
            page: config.page,
            per_page: config.per_page,
        },
    };

    let response = http
        .client()
        .post(url)
        .json(&request)
        .send()
        .await
        .map_err(|e| FetchError::from_reqwest(url, e, http.timeout_secs()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| FetchError::from_reqwest(url, e, http.timeout_secs()))?;
    let parsed: GraphQlResponse = serde_json::from_str(&body).map_err(|e| FetchError::Parse {
        url: url.to_string(),
        message: format!("{e}; body: {}", truncate_for_log(&body, 200)),
    })?;

    let media = match parsed.data.and_then(|d| d.page) {
        Some(page) => page.media,
        None => {
            let messages: Vec<String> = parsed.errors.into_iter().map(|e| e.message).collect();
            return Err(FetchError::Parse {
                url: url.to_string(),
                message: if messages.is_empty() {
                    "response carried no data".to_string()
                } else {
                    messages.join("; ")
                },
            });
        }
    };
    if media.is_empty() {
        return Err(FetchError::Parse {
            url: url.to_string(),
            message: "media list is empty".to_string(),
        });
    }

    let captured_at = Utc::now();
    Ok(media
        .into_iter()
        .map(|m| {
            let title = m.title.unwrap_or_default();
            let cover = m.cover_image.unwrap_or_default();
            Anime {
                source: config.source.clone(),
                captured_at,
                origin: Origin::Api,
                title: first_present([title.romaji, title.english, title.native]),
                score: m.average_score,
                episodes: m.episodes,
                image: first_present([cover.extra_large, cover.large, cover.medium]),
                site_url: m.site_url,
            }
        })
        .collect())
}

#[instrument(level = "debug", skip_all, fields(url = %config.listing_url))]
async fn fetch_from_html(http: &HttpFetcher, config: &AnimeConfig) -> Result<Vec<Anime>, FetchError> {
    let url = Url::parse(&config.listing_url).map_err(|e| FetchError::Parse {
        url: config.listing_url.clone(),
        message: e.to_string(),
    })?;
    let document = http.get_document(&url).await?;
    let html = extract::parse_document(&document.html);
    let captured_at = Utc::now();

    let Some((_, selector)) = config
        .card
        .candidates()
        .find(|(_, selector)| html.select(selector).next().is_some())
    else {
        return Err(FetchError::NoSelectorMatch { field: "card" });
    };

    Ok(html
        .select(selector)
        .map(|card| Anime {
            source: config.source.clone(),
            captured_at,
            origin: Origin::Html,
            title: extract::first_text(card, &config.title).map(|m| m.value),
            score: None,
            episodes: None,
            image: extract::first_image(card, &config.image, &document.url).map(|m| m.value),
            site_url: extract::first_link(card, &config.link, &document.url).map(|m| m.value),
        })
        .collect())
}

fn first_present<const N: usize>(values: [Option<String>; N]) -> Option<String> {
    values
        .into_iter()
        .flatten()
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}
