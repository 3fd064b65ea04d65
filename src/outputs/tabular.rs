//! Row/column view of the records, shared by the CSV and spreadsheet writers.
//!
//! Absent fields stay `None` here; each writer decides how to show them
//! (empty CSV cell, `N/A` in the spreadsheet) so every column is always present.

use crate::error::SinkError;
use crate::models::{Anime, Book, Headline};
use crate::utils::upcase;
use chrono::SecondsFormat;
use std::path::Path;
use tracing::{info, instrument};

/// A record that can be laid out as one table row.
pub trait Tabular {
    /// Worksheet name.
    const SHEET: &'static str;
    const HEADERS: &'static [&'static str];

    /// One cell per header, in header order.
    fn row(&self) -> Vec<Option<String>>;
}

impl Tabular for Headline {
    const SHEET: &'static str = "News Headlines";
    const HEADERS: &'static [&'static str] = &[
        "Media",
        "Headline",
        "Image",
        "URL",
        "Tier",
        "Captured At",
        "Error",
    ];

    fn row(&self) -> Vec<Option<String>> {
        vec![
            Some(upcase(&self.source)),
            self.headline.clone(),
            self.image.clone(),
            Some(self.url.clone()),
            self.tier.map(|t| t.as_str().to_string()),
            Some(self.captured_at.to_rfc3339_opts(SecondsFormat::Secs, true)),
            self.error.clone(),
        ]
    }
}

impl Tabular for Book {
    const SHEET: &'static str = "Books";
    const HEADERS: &'static [&'static str] = &[
        "Title",
        "Publisher",
        "Price",
        "Price (IDR)",
        "Image URL",
        "Link",
        "Source",
        "Captured At",
    ];

    fn row(&self) -> Vec<Option<String>> {
        vec![
            self.title.clone(),
            self.publisher.clone(),
            self.price.clone(),
            self.price_value.map(|v| v.to_string()),
            self.image.clone(),
            self.link.clone(),
            Some(self.source.clone()),
            Some(self.captured_at.to_rfc3339_opts(SecondsFormat::Secs, true)),
        ]
    }
}

impl Tabular for Anime {
    const SHEET: &'static str = "Trending Anime";
    const HEADERS: &'static [&'static str] = &[
        "Title",
        "Score",
        "Episodes",
        "Image",
        "Link",
        "Origin",
        "Source",
        "Captured At",
    ];

    fn row(&self) -> Vec<Option<String>> {
        vec![
            self.title.clone(),
            self.score.map(|v| v.to_string()),
            self.episodes.map(|v| v.to_string()),
            self.image.clone(),
            self.site_url.clone(),
            Some(self.origin.as_str().to_string()),
            Some(self.source.clone()),
            Some(self.captured_at.to_rfc3339_opts(SecondsFormat::Secs, true)),
        ]
    }
}

/// Write `rows` as CSV with a header line. Absent cells are empty.
#[instrument(level = "info", skip_all, fields(path = %path.display(), rows = rows.len()))]
pub fn write_csv<T: Tabular>(path: &Path, rows: &[T]) -> Result<(), SinkError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(T::HEADERS)?;
    for record in rows {
        let row = record.row();
        writer.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
    }
    writer.flush().map_err(|source| SinkError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Wrote CSV");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Origin, Tier};
    use chrono::Utc;

    fn headline(source: &str, text: Option<&str>) -> Headline {
        Headline {
            source: source.to_string(),
            url: format!("https://www.{source}.com/"),
            captured_at: Utc::now(),
            headline: text.map(str::to_string),
            image: None,
            tier: text.map(|_| Tier::Http),
            error: None,
        }
    }

    #[test]
    fn test_rows_match_header_width() {
        let h = headline("kompas", Some("Banjir Jakarta"));
        assert_eq!(h.row().len(), Headline::HEADERS.len());

        let book = Book {
            source: "gramedia".to_string(),
            captured_at: Utc::now(),
            title: None,
            publisher: None,
            price: None,
            price_value: None,
            image: None,
            link: None,
        };
        assert_eq!(book.row().len(), Book::HEADERS.len());

        let anime = Anime {
            source: "anilist".to_string(),
            captured_at: Utc::now(),
            origin: Origin::Html,
            title: Some("Frieren".to_string()),
            score: None,
            episodes: None,
            image: None,
            site_url: None,
        };
        assert_eq!(anime.row().len(), Anime::HEADERS.len());
    }

    #[test]
    fn test_csv_keeps_columns_for_absent_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("news.csv");
        let rows = vec![
            headline("kompas", Some("Banjir Jakarta")),
            headline("tribun", None),
        ];
        write_csv(&path, &rows).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), Headline::HEADERS.len());
        let records: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][0], "Kompas");
        assert_eq!(&records[0][1], "Banjir Jakarta");
        assert_eq!(&records[1][0], "Tribun");
        assert_eq!(&records[1][1], "");
        assert_eq!(records[1].len(), Headline::HEADERS.len());
    }
}
