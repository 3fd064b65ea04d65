//! Helpers for run stamps, log-friendly strings, file names and the output
//! directory layout.

use crate::error::SinkError;
use chrono::Local;
use std::fs as stdfs;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

/// Local timestamp used in every file name of a run, e.g. `20250506_203000`.
pub fn run_stamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut after `max` characters and get an ellipsis plus the
/// number of bytes dropped. Cuts on a character boundary.
///
/// # Arguments
///
/// * `s` - The string to potentially truncate
/// * `max` - Maximum number of characters to keep
///
/// # Returns
///
/// `s` unchanged when it has at most `max` characters, otherwise the first
/// `max` characters followed by `"…(+N bytes)"`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Turn a source or artifact name into a safe file-name fragment.
///
/// Lowercases, keeps alphanumerics, and maps everything else to `_`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(slugify("Kompas"), "kompas");
/// assert_eq!(slugify("books page/source"), "books_page_source");
/// ```
pub fn slugify(name: &str) -> String {
    let slug: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    if slug.is_empty() {
        "unnamed".to_string()
    } else {
        slug
    }
}

/// Capitalize the first character, e.g. `kompas` -> `Kompas`.
pub fn upcase(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().collect::<String>() + c.as_str(),
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if missing, then creates and deletes a scratch file.
///
/// # Arguments
///
/// * `path` - The directory to create and check
///
/// # Errors
///
/// [`SinkError::Io`] carrying `path` when the directory cannot be created or
/// written to.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), SinkError> {
    let io_err = |source| SinkError::Io {
        path: path.to_path_buf(),
        source,
    };
    fs::create_dir_all(path).await.map_err(io_err)?;

    let scratch_path = path.join("..__write_check__");
    stdfs::File::create(&scratch_path).map_err(io_err)?;
    let _ = stdfs::remove_file(&scratch_path);
    info!("Output directory is writable");
    Ok(())
}

/// Directories a run writes into, all under one root.
///
/// ```text
/// <root>/
/// ├── results/            spreadsheet, JSON and CSV output
/// ├── logs/               one log file per run
/// └── debug/
///     ├── screenshots/    rendered-page PNGs
///     └── html/           raw markup snapshots
/// ```
#[derive(Debug, Clone)]
pub struct OutputLayout {
    pub results: PathBuf,
    pub logs: PathBuf,
    pub screenshots: PathBuf,
    pub html: PathBuf,
}

impl OutputLayout {
    pub fn new(root: &Path) -> Self {
        Self {
            results: root.join("results"),
            logs: root.join("logs"),
            screenshots: root.join("debug").join("screenshots"),
            html: root.join("debug").join("html"),
        }
    }

    /// Create every directory and check it is writable. Failure is fatal for the run.
    pub async fn prepare(&self) -> Result<(), SinkError> {
        for dir in [&self.results, &self.logs, &self.screenshots, &self.html] {
            ensure_writable_dir(dir).await?;
        }
        Ok(())
    }

    pub fn log_file(&self, stamp: &str) -> PathBuf {
        self.logs.join(format!("scraper_{stamp}.log"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_multibyte() {
        let s = "Gempa “besar” di Cianjur";
        let result = truncate_for_log(s, 7);
        assert!(result.starts_with("Gempa “"));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Kompas"), "kompas");
        assert_eq!(slugify("books page/source"), "books_page_source");
        assert_eq!(slugify("   "), "unnamed");
    }

    #[test]
    fn test_upcase() {
        assert_eq!(upcase("detik"), "Detik");
        assert_eq!(upcase(""), "");
        assert_eq!(upcase("a"), "A");
    }

    #[test]
    fn test_run_stamp_shape() {
        let stamp = run_stamp();
        assert_eq!(stamp.len(), 15);
        assert_eq!(&stamp[8..9], "_");
    }

    #[tokio::test]
    async fn test_layout_prepare_creates_tree() {
        let root = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(root.path());
        layout.prepare().await.unwrap();
        assert!(layout.results.is_dir());
        assert!(layout.logs.is_dir());
        assert!(layout.screenshots.is_dir());
        assert!(layout.html.is_dir());
        assert!(
            layout
                .log_file("20250506_203000")
                .ends_with("logs/scraper_20250506_203000.log")
        );
    }

    #[tokio::test]
    async fn test_prepare_fails_under_a_file() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("blocked");
        std::fs::write(&blocker, b"not a dir").unwrap();
        let layout = OutputLayout::new(&blocker);
        assert!(matches!(layout.prepare().await, Err(SinkError::Io { .. })));
    }
}
