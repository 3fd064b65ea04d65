//! Best-effort debug artifacts: raw markup and rendered screenshots.
//!
//! Nothing here can fail a run. Write errors are logged at `warn` and the
//! caller carries on with its data.

use crate::utils::{OutputLayout, slugify};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct ArtifactSink {
    html_dir: PathBuf,
    screenshots_dir: PathBuf,
    stamp: String,
    enabled: bool,
}

impl ArtifactSink {
    pub fn new(layout: &OutputLayout, stamp: &str, enabled: bool) -> Self {
        Self {
            html_dir: layout.html.clone(),
            screenshots_dir: layout.screenshots.clone(),
            stamp: stamp.to_string(),
            enabled,
        }
    }

    /// A sink that writes nothing.
    pub fn disabled() -> Self {
        Self {
            html_dir: PathBuf::new(),
            screenshots_dir: PathBuf::new(),
            stamp: String::new(),
            enabled: false,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Save raw markup as `debug/html/<name>_<stamp>.html`.
    pub async fn save_html(&self, name: &str, html: &str) -> Option<PathBuf> {
        let path = self.path_for(&self.html_dir, name, "html");
        self.write(path, html.as_bytes()).await
    }

    /// Save a PNG as `debug/screenshots/<name>_<stamp>.png`.
    pub async fn save_screenshot(&self, name: &str, png: &[u8]) -> Option<PathBuf> {
        let path = self.path_for(&self.screenshots_dir, name, "png");
        self.write(path, png).await
    }

    fn path_for(&self, dir: &Path, name: &str, ext: &str) -> PathBuf {
        dir.join(format!("{}_{}.{ext}", slugify(name), self.stamp))
    }

    async fn write(&self, path: PathBuf, bytes: &[u8]) -> Option<PathBuf> {
        if !self.enabled {
            return None;
        }
        match fs::write(&path, bytes).await {
            Ok(()) => {
                debug!(path = %path.display(), bytes = bytes.len(), "Saved debug artifact");
                Some(path)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not save debug artifact");
                None
            }
        }
    }
}
