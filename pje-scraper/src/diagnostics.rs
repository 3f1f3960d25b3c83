//! Failure screenshots.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::driver::UiDriver;

/// Captures a PNG of the browser viewport when an operation fails. Capture
/// itself must never fail the operation it documents, so every error here
/// is logged and swallowed.
#[derive(Clone)]
pub struct Diagnostics {
    driver: Arc<dyn UiDriver>,
    dir: PathBuf,
}

impl Diagnostics {
    pub fn new(driver: Arc<dyn UiDriver>, dir: impl Into<PathBuf>) -> Self {
        Self {
            driver,
            dir: dir.into(),
        }
    }

    /// Save a screenshot named after the failing operation, e.g.
    /// `login_exception.png`.
    pub async fn capture(&self, operation: &str) {
        let name: String = operation
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let path = self.dir.join(format!("{name}_exception.png"));
        let png = match self.driver.screenshot_png().await {
            Ok(png) => png,
            Err(err) => {
                warn!(operation, %err, "screenshot capture failed");
                return;
            }
        };
        if let Err(err) = std::fs::create_dir_all(&self.dir) {
            warn!(operation, %err, "could not create diagnostics directory");
            return;
        }
        match std::fs::write(&path, png) {
            Ok(()) => info!(operation, path = %path.display(), "saved diagnostic screenshot"),
            Err(err) => warn!(operation, %err, "could not write screenshot"),
        }
    }
}

impl std::fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagnostics")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}
