use std::fmt::Debug;
use std::sync::Arc;

use crate::errors::AutomationError;

/// Interface for driver-specific element implementations.
///
/// Implementations are handles to live remote nodes; any call may fail with
/// `StaleReference` once the underlying DOM node has been replaced.
#[async_trait::async_trait]
pub trait ElementImpl: Send + Sync + Debug {
    /// Native click, as the remote user agent would perform it.
    async fn click(&self) -> Result<(), AutomationError>;
    /// Programmatic click dispatched directly on the node, bypassing
    /// occlusion and animation issues.
    async fn js_click(&self) -> Result<(), AutomationError>;
    async fn scroll_into_view(&self) -> Result<(), AutomationError>;
    async fn send_keys(&self, text: &str) -> Result<(), AutomationError>;
    async fn clear(&self) -> Result<(), AutomationError>;
    async fn text(&self) -> Result<String, AutomationError>;
    async fn attr(&self, name: &str) -> Result<Option<String>, AutomationError>;
    /// Select an option of a `<select>` element by its value attribute.
    async fn select_by_value(&self, value: &str) -> Result<(), AutomationError>;
    async fn is_displayed(&self) -> Result<bool, AutomationError>;
    async fn is_enabled(&self) -> Result<bool, AutomationError>;
}

/// A live reference to an element on the remote page.
#[derive(Debug, Clone)]
pub struct Element {
    inner: Arc<dyn ElementImpl>,
}

impl Element {
    pub fn new(inner: Arc<dyn ElementImpl>) -> Self {
        Self { inner }
    }

    pub async fn click(&self) -> Result<(), AutomationError> {
        self.inner.click().await
    }

    pub async fn js_click(&self) -> Result<(), AutomationError> {
        self.inner.js_click().await
    }

    pub async fn scroll_into_view(&self) -> Result<(), AutomationError> {
        self.inner.scroll_into_view().await
    }

    pub async fn send_keys(&self, text: &str) -> Result<(), AutomationError> {
        self.inner.send_keys(text).await
    }

    pub async fn clear(&self) -> Result<(), AutomationError> {
        self.inner.clear().await
    }

    pub async fn text(&self) -> Result<String, AutomationError> {
        self.inner.text().await
    }

    pub async fn attr(&self, name: &str) -> Result<Option<String>, AutomationError> {
        self.inner.attr(name).await
    }

    pub async fn select_by_value(&self, value: &str) -> Result<(), AutomationError> {
        self.inner.select_by_value(value).await
    }

    pub async fn is_displayed(&self) -> Result<bool, AutomationError> {
        self.inner.is_displayed().await
    }

    pub async fn is_enabled(&self) -> Result<bool, AutomationError> {
        self.inner.is_enabled().await
    }

    /// Probe whether this reference went stale. Any attribute lookup on the
    /// node answers the question; a `StaleReference` failure means the DOM
    /// replaced it.
    pub async fn is_stale(&self) -> bool {
        matches!(
            self.inner.attr("id").await,
            Err(AutomationError::StaleReference(_))
        )
    }
}
