//! Polling element locator.
//!
//! A [`Locator`] pairs a selector with a driver handle and waits for the
//! target to reach a readiness condition, polling at a fixed interval until
//! a deadline. All waits funnel through here so timeout behavior is uniform.

use std::sync::Arc;
use std::time::Duration;

use tracing::instrument;

use crate::driver::UiDriver;
use crate::element::Element;
use crate::errors::AutomationError;
use crate::selector::Selector;

/// Default deadline for any single wait.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
/// Default pause between condition probes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// What "ready" means for a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyCondition {
    /// Attached to the document.
    Present,
    /// Attached and rendered.
    Visible,
    /// Attached, rendered and enabled.
    Clickable,
}

#[derive(Clone)]
pub struct Locator {
    driver: Arc<dyn UiDriver>,
    selector: Selector,
    timeout: Duration,
    poll: Duration,
}

impl Locator {
    pub fn new(driver: Arc<dyn UiDriver>, selector: impl Into<Selector>) -> Self {
        Self {
            driver,
            selector: selector.into(),
            timeout: DEFAULT_TIMEOUT,
            poll: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set a default timeout, overriding the global default.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Wait until the element satisfies `condition`, returning it.
    ///
    /// Absence and staleness during the wait are expected and keep the poll
    /// going; only the deadline turns them into a [`AutomationError::Timeout`]
    /// naming the selector.
    #[instrument(level = "debug", skip(self), fields(selector = %self.selector))]
    pub async fn wait(
        &self,
        condition: ReadyCondition,
        timeout: Option<Duration>,
    ) -> Result<Element, AutomationError> {
        let timeout = timeout.unwrap_or(self.timeout);
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.probe(condition).await {
                Ok(Some(elem)) => return Ok(elem),
                Ok(None) => {}
                Err(AutomationError::ElementNotFound(_))
                | Err(AutomationError::StaleReference(_)) => {}
                Err(other) => return Err(other),
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(AutomationError::Timeout(format!(
                    "element '{}' did not become {:?} within {:?}",
                    self.selector, condition, timeout
                )));
            }
            tokio::time::sleep(self.poll).await;
        }
    }

    /// One non-blocking readiness check.
    async fn probe(&self, condition: ReadyCondition) -> Result<Option<Element>, AutomationError> {
        let elem = self.driver.find(&self.selector).await?;
        let ready = match condition {
            ReadyCondition::Present => true,
            ReadyCondition::Visible => elem.is_displayed().await?,
            ReadyCondition::Clickable => elem.is_displayed().await? && elem.is_enabled().await?,
        };
        Ok(ready.then_some(elem))
    }

    /// Wait until at least one visible match exists, then return all of them.
    pub async fn all_visible(
        &self,
        timeout: Option<Duration>,
    ) -> Result<Vec<Element>, AutomationError> {
        self.wait(ReadyCondition::Visible, timeout).await?;
        self.driver.find_all(&self.selector).await
    }

    /// Wait until the element is gone or hidden. Used for busy overlays
    /// that block interaction while displayed.
    #[instrument(level = "debug", skip(self), fields(selector = %self.selector))]
    pub async fn wait_invisible(&self, timeout: Option<Duration>) -> Result<(), AutomationError> {
        let timeout = timeout.unwrap_or(self.timeout);
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.driver.find(&self.selector).await {
                Err(AutomationError::ElementNotFound(_))
                | Err(AutomationError::StaleReference(_)) => return Ok(()),
                Err(other) => return Err(other),
                Ok(elem) => match elem.is_displayed().await {
                    Ok(false) => return Ok(()),
                    Ok(true) => {}
                    Err(AutomationError::StaleReference(_)) => return Ok(()),
                    Err(other) => return Err(other),
                },
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(AutomationError::Timeout(format!(
                    "element '{}' still visible after {:?}",
                    self.selector, timeout
                )));
            }
            tokio::time::sleep(self.poll).await;
        }
    }
}

impl std::fmt::Debug for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Locator")
            .field("selector", &self.selector)
            .field("timeout", &self.timeout)
            .field("poll", &self.poll)
            .finish_non_exhaustive()
    }
}

/// Wait until a previously fetched element goes stale, i.e. the DOM node it
/// points at has been replaced. Signals that a page transition finished.
pub async fn wait_for_staleness(
    element: &Element,
    timeout: Duration,
    poll: Duration,
) -> Result<(), AutomationError> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if element.is_stale().await {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(AutomationError::Timeout(format!(
                "element not stale after {timeout:?}"
            )));
        }
        tokio::time::sleep(poll).await;
    }
}
