//! Frame and window context tracking.
//!
//! The PJE portal nests its UI in iframes and opens case detail views in
//! separate windows. [`NavigationContext`] owns all frame/window switching
//! so the rest of the crate never calls the driver's context methods
//! directly, and always knows which frames the session is inside.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::driver::{UiDriver, WindowHandle};
use crate::errors::AutomationError;
use crate::selector::Selector;

pub struct NavigationContext {
    driver: Arc<dyn UiDriver>,
    original: WindowHandle,
    frame_path: Vec<Selector>,
    poll: Duration,
}

impl NavigationContext {
    /// Record the current window as the session's original window.
    pub async fn new(driver: Arc<dyn UiDriver>) -> Result<Self, AutomationError> {
        let original = driver.active_window().await?;
        Ok(Self {
            driver,
            original,
            frame_path: Vec::new(),
            poll: Duration::from_millis(500),
        })
    }

    pub fn original_window(&self) -> &WindowHandle {
        &self.original
    }

    /// Frame selectors entered since the last root reset, outermost first.
    pub fn frame_path(&self) -> &[Selector] {
        &self.frame_path
    }

    /// Enter a child frame of the current context, polling until the frame
    /// exists or the deadline passes. Frame entry is relative: entering `a`
    /// then `b` lands inside `a/b`.
    #[instrument(level = "debug", skip(self), fields(frame = %selector))]
    pub async fn enter_frame(
        &mut self,
        selector: &Selector,
        timeout: Duration,
    ) -> Result<(), AutomationError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.driver.enter_frame(selector).await {
                Ok(()) => {
                    self.frame_path.push(selector.clone());
                    return Ok(());
                }
                Err(AutomationError::ElementNotFound(_))
                | Err(AutomationError::StaleReference(_)) => {}
                Err(other) => return Err(other),
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(AutomationError::Timeout(format!(
                    "frame '{selector}' not available within {timeout:?}"
                )));
            }
            tokio::time::sleep(self.poll).await;
        }
    }

    /// Return to the top-level document of the current window.
    pub async fn reset_to_root(&mut self) -> Result<(), AutomationError> {
        self.driver.reset_to_root().await?;
        self.frame_path.clear();
        Ok(())
    }

    /// Reset to the root document and enter the given frames in order.
    /// Paths are absolute, never appended to the current position.
    pub async fn enter_frame_path(
        &mut self,
        path: &[Selector],
        timeout: Duration,
    ) -> Result<(), AutomationError> {
        self.reset_to_root().await?;
        for frame in path {
            self.enter_frame(frame, timeout).await?;
        }
        Ok(())
    }

    /// Snapshot of the currently open window handles.
    pub async fn snapshot_handles(&self) -> Result<BTreeSet<WindowHandle>, AutomationError> {
        Ok(self.driver.window_handles().await?.into_iter().collect())
    }

    /// Wait for a window not in `known` to appear, then switch to it.
    ///
    /// New windows are detected by set difference against the snapshot taken
    /// before the triggering action. If several show up in one poll the
    /// lowest handle in sort order wins, so repeated runs pick the same one.
    #[instrument(level = "debug", skip(self, known))]
    pub async fn switch_to_new_window(
        &mut self,
        known: &BTreeSet<WindowHandle>,
        timeout: Duration,
    ) -> Result<WindowHandle, AutomationError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let current = self.snapshot_handles().await?;
            let mut fresh: Vec<&WindowHandle> = current.difference(known).collect();
            if !fresh.is_empty() {
                fresh.sort();
                if fresh.len() > 1 {
                    warn!(count = fresh.len(), "multiple new windows, picking lowest handle");
                }
                let target = fresh[0].clone();
                self.driver.switch_to_window(&target).await?;
                // A new window starts at its own root document.
                self.frame_path.clear();
                debug!(window = %target, "switched to new window");
                return Ok(target);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(AutomationError::NoNewWindow(format!(
                    "no new window appeared within {timeout:?}"
                )));
            }
            tokio::time::sleep(self.poll).await;
        }
    }

    /// Switch to a known window. Frame state is per window, so the tracked
    /// path is discarded.
    pub async fn switch_to(&mut self, handle: &WindowHandle) -> Result<(), AutomationError> {
        self.driver.switch_to_window(handle).await?;
        self.frame_path.clear();
        Ok(())
    }

    /// Close the active window and return to `to`, typically the window the
    /// caller came from.
    #[instrument(level = "debug", skip(self), fields(to = %to))]
    pub async fn close_current_and_return(
        &mut self,
        to: &WindowHandle,
    ) -> Result<(), AutomationError> {
        self.driver.close_window().await?;
        self.switch_to(to).await
    }
}

impl std::fmt::Debug for NavigationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationContext")
            .field("original", &self.original)
            .field("frame_path", &self.frame_path)
            .finish_non_exhaustive()
    }
}
