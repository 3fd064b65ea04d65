//! Command-line interface definitions for Warta Collector.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! The config file path can also come from the environment.

use clap::{ArgGroup, Parser};
use std::path::PathBuf;

/// Command-line arguments for Warta Collector.
///
/// With no domain flag every domain runs: news headlines, books and
/// trending anime.
///
/// # Examples
///
/// ```sh
/// # Everything, results under ./results
/// warta_collector
///
/// # Only the anime list, straight from the listing page
/// warta_collector --anime-only --no-api
///
/// # Custom selectors and output location
/// warta_collector --config warta.yaml --output-root /var/lib/warta
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
#[command(group(ArgGroup::new("domain").args(["news_only", "books_only", "anime_only"])))]
pub struct Cli {
    /// Only collect news headlines
    #[arg(long)]
    pub news_only: bool,

    /// Only collect the book catalog
    #[arg(long)]
    pub books_only: bool,

    /// Only collect trending anime
    #[arg(long)]
    pub anime_only: bool,

    /// Skip the anime API and read the listing page directly
    #[arg(long)]
    pub no_api: bool,

    /// Do not save raw HTML or screenshots under debug/
    #[arg(long)]
    pub no_debug_artifacts: bool,

    /// Directory that receives results/, logs/ and debug/
    #[arg(short, long, default_value = ".")]
    pub output_root: PathBuf,

    /// Optional path to a YAML config file
    #[arg(short, long, env = "WARTA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print the effective configuration as YAML and exit
    #[arg(long)]
    pub print_config: bool,
}

/// Which domains a run collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub news: bool,
    pub books: bool,
    pub anime: bool,
}

impl Cli {
    pub fn selection(&self) -> Selection {
        let all = !(self.news_only || self.books_only || self.anime_only);
        Selection {
            news: all || self.news_only,
            books: all || self.books_only,
            anime: all || self.anime_only,
        }
    }
}
