//! Current-headline snapshot of each configured news portal.
//!
//! Each source gets exactly one [`Headline`] per run. The plain HTTP fetch is
//! tried first and accepted only when the source's rules find the required
//! fields; otherwise the page is rendered in the browser. A source whose both
//! tiers fail still yields a record, with absent fields and the reason.

use crate::config::NewsConfig;
use crate::context::RunContext;
use crate::error::FetchError;
use crate::extract::{self, Match};
use crate::fetch::{Attempt, Browser, RenderRequest};
use crate::models::{FetchTarget, Headline, RawDocument, Tier};
use crate::utils::truncate_for_log;
use tracing::{debug, info, instrument, warn};

/// Headline and image found in one document.
#[derive(Debug, Default, Clone, PartialEq)]
struct Fields {
    headline: Option<Match>,
    image: Option<Match>,
}

/// Fetch every target in order. Never fails; failures are recorded per source.
#[instrument(level = "info", skip_all, fields(sources = targets.len()))]
pub async fn collect<B: Browser>(ctx: &RunContext<B>, targets: &[FetchTarget]) -> Vec<Headline> {
    let mut headlines = Vec::with_capacity(targets.len());
    for target in targets {
        let record = fetch_headline(ctx, target).await;
        match &record.headline {
            Some(text) => info!(
                source = %record.source,
                headline = %truncate_for_log(text, 80),
                tier = ?record.tier,
                "Scraped headline"
            ),
            None => warn!(
                source = %record.source,
                error = ?record.error,
                "No headline for source"
            ),
        }
        headlines.push(record);
    }
    let complete = headlines.iter().filter(|h| h.is_complete()).count();
    info!(total = headlines.len(), complete, "News collection finished");
    headlines
}

/// Snapshot one news site.
#[instrument(level = "info", skip_all, fields(source = %target.source, url = %target.url))]
pub async fn fetch_headline<B: Browser>(ctx: &RunContext<B>, target: &FetchTarget) -> Headline {
    let news = &ctx.config.news;
    let attempt = ctx
        .http
        .attempt(&target.url, |doc| accept(doc, target, news.require_image))
        .await;
    debug!(attempt = attempt.label(), "Plain fetch finished");

    let (partial, plain_error) = match attempt {
        Attempt::Hit(document) => {
            ctx.artifacts.save_html(&target.source, &document.html).await;
            let fields = site_fields(target, &document);
            return to_record(target, fields, Tier::Http);
        }
        Attempt::Miss { document, reason } => {
            info!(%reason, "Plain fetch incomplete; rendering in browser");
            ctx.artifacts.save_html(&target.source, &document.html).await;
            (Some(site_fields(target, &document)), reason)
        }
        Attempt::TimedOut(e) | Attempt::Failed(e) => {
            info!(error = %e, "Plain fetch failed; rendering in browser");
            (None, e)
        }
    };

    let request = RenderRequest {
        screenshot: ctx.artifacts.enabled(),
        ..RenderRequest::default()
    };
    match ctx.render(&target.url, &request).await {
        Ok(page) => {
            if let Some(png) = &page.screenshot {
                ctx.artifacts
                    .save_screenshot(&format!("{}_screenshot", target.source), png)
                    .await;
            }
            ctx.artifacts
                .save_html(&format!("{}_rendered", target.source), &page.document.html)
                .await;

            let (fields, tier) = rendered_fields(target, news, &page.document, partial);
            to_record(target, fields, tier)
        }
        Err(render_error) => {
            warn!(error = %render_error, "Rendered fetch failed");
            let mut record = match partial {
                Some(fields) if fields.headline.is_some() || fields.image.is_some() => {
                    to_record(target, fields, Tier::Http)
                }
                _ => Headline::empty(target),
            };
            record.error = Some(format!(
                "plain fetch: {plain_error}; rendered fetch: {render_error}"
            ));
            record
        }
    }
}

/// Tier-1 acceptance: the headline, and the image unless not required, must match.
fn accept(document: &RawDocument, target: &FetchTarget, require_image: bool) -> Result<(), FetchError> {
    let fields = site_fields(target, document);
    if fields.headline.is_none() {
        return Err(FetchError::NoSelectorMatch { field: "headline" });
    }
    if require_image && fields.image.is_none() {
        return Err(FetchError::NoSelectorMatch { field: "image" });
    }
    Ok(())
}

fn site_fields(target: &FetchTarget, document: &RawDocument) -> Fields {
    let html = extract::parse_document(&document.html);
    let root = html.root_element();
    Fields {
        headline: extract::first_text(root, &target.selectors.headline),
        image: extract::first_image(root, &target.selectors.image, &document.url),
    }
}

/// Fields for a rendered page, in priority order: the site rules on the
/// rendered markup, the site-rule fields Tier 1 already found, then the
/// generic last-resort rules on the rendered markup for anything still
/// missing.
///
/// # Returns
///
/// The merged fields and the tier they are credited to: `Rendered` when the
/// rendered markup contributed any field, `Http` when every field came from
/// the plain fetch.
fn rendered_fields(
    target: &FetchTarget,
    news: &NewsConfig,
    document: &RawDocument,
    plain: Option<Fields>,
) -> (Fields, Tier) {
    let rendered = site_fields(target, document);
    let plain = plain.unwrap_or_default();
    let mut from_render = rendered.headline.is_some() || rendered.image.is_some();
    let mut fields = Fields {
        headline: rendered.headline.or(plain.headline),
        image: rendered.image.or(plain.image),
    };
    if fields.headline.is_some() && fields.image.is_some() {
        return (fields, tier_for(from_render));
    }

    let html = extract::parse_document(&document.html);
    let root = html.root_element();
    if fields.headline.is_none() {
        fields.headline = extract::first_text(root, &news.last_resort_headline);
        if fields.headline.is_some() {
            debug!("Headline found by last-resort rules");
            from_render = true;
        }
    }
    if fields.image.is_none() {
        fields.image = extract::first_image_with_extension(
            root,
            &document.url,
            &news.last_resort_image_extensions,
        )
        .map(|value| Match {
            selector: "img".to_string(),
            value,
        });
        if fields.image.is_some() {
            debug!("Image found by last-resort scan");
            from_render = true;
        }
    }
    (fields, tier_for(from_render))
}

fn tier_for(from_render: bool) -> Tier {
    if from_render { Tier::Rendered } else { Tier::Http }
}

fn to_record(target: &FetchTarget, fields: Fields, tier: Tier) -> Headline {
    if let Some(hit) = &fields.headline {
        debug!(selector = %hit.selector, "Headline selector matched");
    }
    if let Some(hit) = &fields.image {
        debug!(selector = %hit.selector, "Image selector matched");
    }

    let mut record = Headline::empty(target);
    record.tier = Some(tier);
    if fields.headline.is_none() {
        record.error = Some(FetchError::NoSelectorMatch { field: "headline" }.to_string());
    }
    record.headline = fields.headline.map(|m| m.value);
    record.image = fields.image.map(|m| m.value);
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, SourceEntry};
    use crate::fetch::browser::fake::FakeBrowser;
    use crate::outputs::artifacts::ArtifactSink;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const KOMPAS_PAGE: &str = r#"<html><body>
        <h1 class="read__title"></h1>
        <div class="headline">
          <h2 class="headline__title"> Banjir  Jakarta </h2>
          <div class="headline__thumb"><img src="/photo/banjir.jpg"></div>
        </div>
    </body></html>"#;

    const DETIK_PAGE: &str = r#"<html><body>
        <h2 class="media__title">Harga Beras Naik</h2>
        <div class="headline__img"><img data-src="https://cdn.detik.net/beras.jpg"></div>
    </body></html>"#;

    fn config_for(server: &MockServer) -> Config {
        let mut config = Config::default();
        config.fetch.http_timeout_secs = 2;
        config.fetch.settle_ms = 0;
        config.news.sources = ["kompas", "detik", "tribun"]
            .iter()
            .map(|name| SourceEntry {
                name: name.to_string(),
                url: format!("{}/{name}/", server.uri()),
            })
            .collect();
        config
    }

    fn context(config: Config, browser: FakeBrowser) -> RunContext<FakeBrowser> {
        RunContext::new(config, browser, ArtifactSink::disabled()).unwrap()
    }

    async fn serve(server: &MockServer, route: &str, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_kompas_empty_first_selector_falls_through() {
        let server = MockServer::start().await;
        serve(&server, "/kompas/", 200, KOMPAS_PAGE).await;
        let config = config_for(&server);
        let targets = config.news_targets().unwrap();
        let ctx = context(config, FakeBrowser::new());

        let record = fetch_headline(&ctx, &targets[0]).await;
        assert_eq!(record.headline.as_deref(), Some("Banjir Jakarta"));
        assert_eq!(
            record.image,
            Some(format!("{}/photo/banjir.jpg", server.uri()))
        );
        assert_eq!(record.tier, Some(Tier::Http));
        assert!(record.error.is_none());
        assert_eq!(ctx.browser.total_opens(), 0);
    }

    #[tokio::test]
    async fn test_network_failure_renders_exactly_once() {
        let server = MockServer::start().await;
        serve(&server, "/detik/", 500, "oops").await;
        let config = config_for(&server);
        let targets = config.news_targets().unwrap();
        let detik_url = targets[1].url.to_string();
        let browser = FakeBrowser::new().page(&detik_url, DETIK_PAGE);
        let ctx = context(config, browser);

        let record = fetch_headline(&ctx, &targets[1]).await;
        assert_eq!(record.headline.as_deref(), Some("Harga Beras Naik"));
        assert_eq!(record.image.as_deref(), Some("https://cdn.detik.net/beras.jpg"));
        assert_eq!(record.tier, Some(Tier::Rendered));
        assert_eq!(ctx.browser.opens_for(&detik_url), 1);
        assert_eq!(ctx.browser.closed_tabs(), 1);
    }

    #[tokio::test]
    async fn test_selector_miss_triggers_render() {
        let server = MockServer::start().await;
        // headline present but no image: rejected while images are required
        serve(
            &server,
            "/kompas/",
            200,
            r#"<h2 class="headline__title">Banjir Jakarta</h2>"#,
        )
        .await;
        let config = config_for(&server);
        let targets = config.news_targets().unwrap();
        let kompas_url = targets[0].url.to_string();
        let browser = FakeBrowser::new().page(&kompas_url, KOMPAS_PAGE);
        let ctx = context(config, browser);

        let record = fetch_headline(&ctx, &targets[0]).await;
        assert_eq!(ctx.browser.opens_for(&kompas_url), 1);
        assert_eq!(record.tier, Some(Tier::Rendered));
        assert!(record.is_complete());
    }

    #[tokio::test]
    async fn test_image_optional_accepts_plain_fetch() {
        let server = MockServer::start().await;
        serve(
            &server,
            "/kompas/",
            200,
            r#"<h2 class="headline__title">Banjir Jakarta</h2>"#,
        )
        .await;
        let mut config = config_for(&server);
        config.news.require_image = false;
        let targets = config.news_targets().unwrap();
        let ctx = context(config, FakeBrowser::new());

        let record = fetch_headline(&ctx, &targets[0]).await;
        assert_eq!(record.tier, Some(Tier::Http));
        assert!(record.image.is_none());
        assert_eq!(ctx.browser.total_opens(), 0);
    }

    #[tokio::test]
    async fn test_plain_timeout_renders_exactly_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/detik/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(DETIK_PAGE)
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;
        let config = config_for(&server);
        let targets = config.news_targets().unwrap();
        let detik_url = targets[1].url.to_string();
        let browser = FakeBrowser::new().page(&detik_url, DETIK_PAGE);
        let ctx = context(config, browser);

        let record = fetch_headline(&ctx, &targets[1]).await;
        assert_eq!(ctx.browser.opens_for(&detik_url), 1);
        assert_eq!(ctx.browser.closed_tabs(), 1);
        assert_eq!(record.tier, Some(Tier::Rendered));
        assert_eq!(record.headline.as_deref(), Some("Harga Beras Naik"));
    }

    #[tokio::test]
    async fn test_plain_site_headline_beats_generic_rendered_heading() {
        let server = MockServer::start().await;
        serve(
            &server,
            "/kompas/",
            200,
            r#"<h2 class="headline__title">Banjir Jakarta</h2>"#,
        )
        .await;
        let config = config_for(&server);
        let targets = config.news_targets().unwrap();
        let kompas_url = targets[0].url.to_string();
        // consent wall: no site-rule match, only generic markup
        let browser = FakeBrowser::new().page(
            &kompas_url,
            r#"<h1>Setujui Cookie</h1><img src="/static/banner.jpg">"#,
        );
        let ctx = context(config, browser);

        let record = fetch_headline(&ctx, &targets[0]).await;
        assert_eq!(record.headline.as_deref(), Some("Banjir Jakarta"));
        assert_eq!(
            record.image,
            Some(format!("{}/static/banner.jpg", server.uri()))
        );
        assert_eq!(record.tier, Some(Tier::Rendered));
    }

    #[tokio::test]
    async fn test_fields_only_from_plain_fetch_keep_http_tier() {
        let server = MockServer::start().await;
        serve(
            &server,
            "/kompas/",
            200,
            r#"<h2 class="headline__title">Banjir Jakarta</h2>"#,
        )
        .await;
        let config = config_for(&server);
        let targets = config.news_targets().unwrap();
        let kompas_url = targets[0].url.to_string();
        let browser = FakeBrowser::new().page(&kompas_url, "<p>Memuat...</p>");
        let ctx = context(config, browser);

        let record = fetch_headline(&ctx, &targets[0]).await;
        assert_eq!(record.headline.as_deref(), Some("Banjir Jakarta"));
        assert!(record.image.is_none());
        assert_eq!(record.tier, Some(Tier::Http));
        assert!(record.error.is_none());
    }

    #[tokio::test]
    async fn test_miss_then_render_failure_keeps_partial_fields() {
        let server = MockServer::start().await;
        serve(
            &server,
            "/kompas/",
            200,
            r#"<h2 class="headline__title">Banjir Jakarta</h2>"#,
        )
        .await;
        let config = config_for(&server);
        let targets = config.news_targets().unwrap();
        let browser = FakeBrowser::new().failing(targets[0].url.as_str(), "Chromium crashed");
        let ctx = context(config, browser);

        let record = fetch_headline(&ctx, &targets[0]).await;
        assert_eq!(record.headline.as_deref(), Some("Banjir Jakarta"));
        assert!(record.image.is_none());
        assert_eq!(record.tier, Some(Tier::Http));
        let error = record.error.unwrap();
        assert!(error.contains("image"));
        assert!(error.contains("Chromium crashed"));
    }

    #[tokio::test]
    async fn test_rendered_page_uses_last_resort_rules() {
        let server = MockServer::start().await;
        let config = config_for(&server);
        let targets = config.news_targets().unwrap();
        let tribun_url = targets[2].url.to_string();
        let browser = FakeBrowser::new().page(
            &tribun_url,
            r#"<h1>Timnas Menang</h1><img src="/logo.svg"><img src="/foto/timnas.png">"#,
        );
        let ctx = context(config, browser);

        let record = fetch_headline(&ctx, &targets[2]).await;
        assert_eq!(record.headline.as_deref(), Some("Timnas Menang"));
        assert_eq!(
            record.image,
            Some(format!("{}/foto/timnas.png", server.uri()))
        );
    }

    #[tokio::test]
    async fn test_tribun_total_failure_does_not_stop_the_run() {
        let server = MockServer::start().await;
        serve(&server, "/kompas/", 200, KOMPAS_PAGE).await;
        serve(&server, "/detik/", 200, DETIK_PAGE).await;
        serve(&server, "/tribun/", 502, "bad gateway").await;
        let config = config_for(&server);
        let targets = config.news_targets().unwrap();
        let browser = FakeBrowser::new().failing(targets[2].url.as_str(), "net::ERR_TIMED_OUT");
        let ctx = context(config, browser);

        let records = collect(&ctx, &targets).await;
        assert_eq!(records.len(), 3);

        let sources: Vec<&str> = records.iter().map(|r| r.source.as_str()).collect();
        assert_eq!(sources, vec!["kompas", "detik", "tribun"]);

        assert_eq!(records[0].headline.as_deref(), Some("Banjir Jakarta"));
        assert_eq!(records[1].headline.as_deref(), Some("Harga Beras Naik"));

        let tribun = &records[2];
        assert!(tribun.headline.is_none());
        assert!(tribun.image.is_none());
        assert!(tribun.tier.is_none());
        assert!(tribun.error.as_deref().unwrap().contains("502"));

        let json = serde_json::to_value(tribun).unwrap();
        assert!(json.as_object().unwrap().contains_key("headline"));
        assert!(json["headline"].is_null());
    }

    #[test]
    fn test_acceptance_names_missing_field() {
        let target = Config::default().news_targets().unwrap().remove(0);
        let doc = RawDocument {
            url: target.url.clone(),
            html: "<p>maintenance</p>".to_string(),
            tier: Tier::Http,
        };
        match accept(&doc, &target, true) {
            Err(FetchError::NoSelectorMatch { field }) => assert_eq!(field, "headline"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
