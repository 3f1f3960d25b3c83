use std::fmt;

use crate::element::Element;
use crate::errors::AutomationError;
use crate::selector::Selector;

pub mod webdriver;

pub use webdriver::WebDriverSession;

/// Opaque identifier for one browser window or tab.
///
/// Handles are ordered so that "pick the lowest-sorted new handle" is a
/// deterministic tie-break when more than one window appears at once.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowHandle(pub String);

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for WindowHandle {
    fn from(s: &str) -> Self {
        WindowHandle(s.to_string())
    }
}

/// The common trait every browser-session backend implements.
///
/// This is the single explicit session object threaded through all
/// components; nothing in the crate holds driver state globally. Lookups are
/// immediate, without polling; waiting lives in [`crate::locator::Locator`].
#[async_trait::async_trait]
pub trait UiDriver: Send + Sync {
    /// Navigate the current window to a URL.
    async fn goto(&self, url: &str) -> Result<(), AutomationError>;

    async fn current_url(&self) -> Result<String, AutomationError>;

    /// Resolve a selector to a single element, or `ElementNotFound`.
    async fn find(&self, selector: &Selector) -> Result<Element, AutomationError>;

    /// Resolve a selector to all matching elements (possibly empty).
    async fn find_all(&self, selector: &Selector) -> Result<Vec<Element>, AutomationError>;

    /// Switch the driver context into the frame matched by `selector`.
    /// Fails with `ElementNotFound` while the frame is not yet available.
    async fn enter_frame(&self, selector: &Selector) -> Result<(), AutomationError>;

    /// Return to the top-level document of the current window.
    async fn reset_to_root(&self) -> Result<(), AutomationError>;

    async fn window_handles(&self) -> Result<Vec<WindowHandle>, AutomationError>;

    async fn active_window(&self) -> Result<WindowHandle, AutomationError>;

    async fn switch_to_window(&self, handle: &WindowHandle) -> Result<(), AutomationError>;

    /// Close the currently active window. The caller is responsible for
    /// switching to a surviving handle afterwards.
    async fn close_window(&self) -> Result<(), AutomationError>;

    /// PNG snapshot of the current window, for failure diagnostics.
    async fn screenshot_png(&self) -> Result<Vec<u8>, AutomationError>;

    /// Terminate the browser session. Must be safe to call on every exit
    /// path, including after earlier failures.
    async fn quit(&self) -> Result<(), AutomationError>;
}
