//! # Warta Collector
//!
//! A one-shot collector that snapshots Indonesian web content into
//! spreadsheet, JSON and CSV files.
//!
//! ## Features
//!
//! - Current top headline and lead image of each configured news portal
//!   (Kompas, Detik and Tribun by default)
//! - Book listings from the Gramedia international-book catalog, including
//!   lazily loaded cards
//! - Trending anime from AniList, through its GraphQL API or the listing page
//! - Selector rules, timeouts and targets configurable from YAML
//! - Raw markup and screenshots saved for debugging selector drift
//!
//! ## Usage
//!
//! ```sh
//! warta_collector --output-root ./out
//! ```
//!
//! ## Architecture
//!
//! Every page goes through a two-tier fetch:
//! 1. **Plain HTTP**: one GET with browser-like headers, accepted only when
//!    the site's selector rules find the required fields
//! 2. **Rendered**: a headless Chromium tab, used when the plain fetch fails
//!    or comes back incomplete, and always for the book catalog
//!
//! Adapters run sequentially against a shared [`context::RunContext`]; the
//! results are written once every selected adapter has finished.

use clap::Parser;
use std::error::Error;
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, error, info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod context;
mod error;
mod extract;
mod fetch;
mod models;
mod outputs;
mod scrapers;
mod selectors;
mod utils;

use cli::Cli;
use config::Config;
use context::RunContext;
use fetch::ChromiumBrowser;
use outputs::artifacts::ArtifactSink;
use outputs::{Collected, ResultSink};
use utils::{OutputLayout, run_stamp};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::parse();

    if args.print_config {
        let config = Config::load(args.config.as_deref())?;
        print!("{}", serde_yaml::to_string(&config)?);
        return Ok(());
    }

    // --- Output directories, then tracing into logs/ ---
    let stamp = run_stamp();
    let layout = OutputLayout::new(&args.output_root);
    if let Err(e) = layout.prepare().await {
        eprintln!("Output directories are not usable: {e}");
        return Err(e.into());
    }
    let log_path = layout.log_file(&stamp);
    init_tracing(&log_path)?;

    let start_time = std::time::Instant::now();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        %stamp,
        log = %log_path.display(),
        "warta_collector starting up"
    );

    let selection = args.selection();
    debug!(?selection, output_root = %args.output_root.display(), "Parsed CLI arguments");

    // --- Configuration ---
    let config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };
    let targets = config.news_targets()?;
    for target in &targets {
        if !config.news.selectors.knows(&target.source) {
            warn!(source = %target.source, "No selector rules for source; using generic rules");
        }
    }

    let artifacts = ArtifactSink::new(
        &layout,
        &stamp,
        config.debug.artifacts && !args.no_debug_artifacts,
    );
    let prefer_api = config.anime.prefer_api && !args.no_api;
    let browser = ChromiumBrowser::new(&config.fetch);
    let ctx = RunContext::new(config, browser, artifacts)?;

    // --- Collect ---
    let mut collected = Collected::default();
    if selection.news {
        collected.news = Some(scrapers::news::collect(&ctx, &targets).await);
    }
    if selection.books {
        collected.books = Some(scrapers::books::collect(&ctx).await);
    }
    if selection.anime {
        collected.anime =
            Some(scrapers::anime::collect(&ctx.http, &ctx.config.anime, prefer_api).await);
    }

    if ctx.browser.is_running() {
        debug!("Closing browser");
    }
    ctx.shutdown().await;

    // --- Results ---
    let sink = ResultSink::new(&layout, &stamp);
    let written = match sink.write_all(&collected).await {
        Ok(paths) => paths,
        Err(e) => {
            error!(error = %e, "Failed to write results");
            return Err(e.into());
        }
    };
    for path in &written {
        info!(path = %path.display(), "Result file");
    }

    let elapsed = start_time.elapsed();
    info!(
        news = ?collected.news.as_ref().map(Vec::len),
        complete_headlines = ?collected
            .news
            .as_ref()
            .map(|n| n.iter().filter(|h| h.is_complete()).count()),
        books = ?collected.books.as_ref().map(Vec::len),
        anime = ?collected.anime.as_ref().map(Vec::len),
        files = written.len(),
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}

/// Stdout plus a plain-text copy of every event in `log_path`.
fn init_tracing(log_path: &Path) -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file = File::create(log_path)?;

    let stdout_layer = tfmt::layer()
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(UtcTime::rfc_3339());
    let file_layer = tfmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_timer(UtcTime::rfc_3339())
        .with_writer(Mutex::new(file));

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();
    Ok(())
}
