//! Resilient session automation for the PJE court portal (TJBA).
//!
//! The crate drives an interactive web session through login, profile
//! selection, case search and paginated result collection, built to survive
//! the portal's slow frames, busy overlays and detached windows:
//!
//! - [`Locator`] waits for elements to become present, visible or clickable.
//! - [`Actuator`] clicks with a JS fallback when the native click is rejected.
//! - [`RetryPolicy`] re-runs operations that failed transiently, at most once.
//! - [`NavigationContext`] tracks the frame path and window handles.
//! - [`PaginatedCollector`] walks the results table page by page.
//! - [`Session`] ties it all together and always quits the browser.
//!
//! All components talk to the browser through the [`UiDriver`] trait; the
//! [`WebDriverSession`] backend implements it over the WebDriver protocol.

pub mod actuator;
pub mod collector;
pub mod config;
pub mod diagnostics;
pub mod driver;
pub mod element;
pub mod errors;
pub mod export;
pub mod locator;
pub mod navigation;
pub mod record;
pub mod retry;
pub mod selector;
pub mod session;

pub use actuator::Actuator;
pub use collector::{CollectorConfig, PageEndPolicy, PageOutcome, PaginatedCollector};
pub use config::{Credentials, OabFilter, SearchConfig};
pub use diagnostics::Diagnostics;
pub use driver::{UiDriver, WebDriverSession, WindowHandle};
pub use element::{Element, ElementImpl};
pub use errors::AutomationError;
pub use locator::{Locator, ReadyCondition};
pub use navigation::NavigationContext;
pub use record::{PartyDetails, ProcessRecord};
pub use retry::RetryPolicy;
pub use selector::Selector;
pub use session::{ExportPlan, Session, SessionState};

#[cfg(test)]
mod tests;
