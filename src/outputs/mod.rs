//! Result and artifact writers.
//!
//! # Submodules
//!
//! - [`json`]: pretty-printed JSON arrays
//! - [`tabular`]: the row view of records plus the CSV writer
//! - [`spreadsheet`]: one `.xlsx` workbook per run
//! - [`artifacts`]: best-effort debug snapshots
//!
//! # Output Structure
//!
//! ```text
//! results/
//! ├── web_scraping_results_20250506_203000.xlsx
//! ├── news_20250506_203000.json
//! ├── news_20250506_203000.csv
//! ├── books_20250506_203000.json
//! ├── books_20250506_203000.csv
//! ├── anime_20250506_203000.json
//! └── anime_20250506_203000.csv
//! ```
//!
//! Only domains that ran are written. Failure to write any of these files is
//! fatal for the run, unlike debug artifacts.

pub mod artifacts;
pub mod json;
pub mod spreadsheet;
pub mod tabular;

use crate::error::SinkError;
use crate::models::{Anime, Book, Headline};
use crate::utils::OutputLayout;
use serde::Serialize;
use spreadsheet::Spreadsheet;
use std::path::PathBuf;
use tabular::Tabular;
use tracing::{debug, info, instrument};

/// Everything one run collected. `None` means the domain was not selected.
#[derive(Debug, Default)]
pub struct Collected {
    pub news: Option<Vec<Headline>>,
    pub books: Option<Vec<Book>>,
    pub anime: Option<Vec<Anime>>,
}

impl Collected {
    pub fn is_empty(&self) -> bool {
        self.news.is_none() && self.books.is_none() && self.anime.is_none()
    }
}

/// Writes the final result files of a run.
#[derive(Debug, Clone)]
pub struct ResultSink {
    dir: PathBuf,
    stamp: String,
}

impl ResultSink {
    pub fn new(layout: &OutputLayout, stamp: &str) -> Self {
        Self {
            dir: layout.results.clone(),
            stamp: stamp.to_string(),
        }
    }

    pub fn spreadsheet_path(&self) -> PathBuf {
        self.dir
            .join(format!("web_scraping_results_{}.xlsx", self.stamp))
    }

    /// Write JSON and CSV for each collected domain plus the combined workbook.
    /// Returns every path written.
    #[instrument(level = "info", skip_all, fields(dir = %self.dir.display()))]
    pub async fn write_all(&self, collected: &Collected) -> Result<Vec<PathBuf>, SinkError> {
        let mut written = Vec::new();
        if collected.is_empty() {
            return Ok(written);
        }

        let mut workbook = Spreadsheet::new();
        if let Some(news) = &collected.news {
            written.extend(self.write_domain("news", news).await?);
            workbook.add_sheet(news)?;
        }
        if let Some(books) = &collected.books {
            written.extend(self.write_domain("books", books).await?);
            workbook.add_sheet(books)?;
        }
        if let Some(anime) = &collected.anime {
            written.extend(self.write_domain("anime", anime).await?);
            workbook.add_sheet(anime)?;
        }

        let xlsx = self.spreadsheet_path();
        debug!(sheets = workbook.sheet_count(), "Saving workbook");
        workbook.save(&xlsx)?;
        written.push(xlsx);

        info!(files = written.len(), "All results written");
        Ok(written)
    }

    async fn write_domain<T>(&self, name: &str, records: &[T]) -> Result<[PathBuf; 2], SinkError>
    where
        T: Tabular + Serialize,
    {
        let json_path = self.dir.join(format!("{name}_{}.json", self.stamp));
        let csv_path = self.dir.join(format!("{name}_{}.csv", self.stamp));
        json::write_records(&json_path, records).await?;
        tabular::write_csv(&csv_path, records)?;
        Ok([json_path, csv_path])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_write_all_only_selected_domains() {
        let root = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(root.path());
        layout.prepare().await.unwrap();
        let sink = ResultSink::new(&layout, "20250506_203000");

        let collected = Collected {
            news: None,
            books: None,
            anime: Some(vec![Anime {
                source: "anilist".to_string(),
                captured_at: Utc::now(),
                origin: crate::models::Origin::Html,
                title: Some("Dandadan".to_string()),
                score: None,
                episodes: None,
                image: None,
                site_url: None,
            }]),
        };

        let written = sink.write_all(&collected).await.unwrap();
        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "anime_20250506_203000.json",
                "anime_20250506_203000.csv",
                "web_scraping_results_20250506_203000.xlsx",
            ]
        );
        assert!(!layout.results.join("news_20250506_203000.json").exists());
    }

    #[tokio::test]
    async fn test_nothing_selected_writes_nothing() {
        let root = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(root.path());
        let sink = ResultSink::new(&layout, "x");
        assert!(sink.write_all(&Collected::default()).await.unwrap().is_empty());
    }
}
