//! Resilient element interaction.
//!
//! Clicks go through a two-step ladder: one native WebDriver click, then one
//! JavaScript click on the same node. The JS path bypasses the overlay and
//! interception checks that make native clicks flaky on pages with modal
//! spinners. After both steps fail the actuator captures a diagnostic
//! screenshot and reports [`AutomationError::ClickFailed`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::diagnostics::Diagnostics;
use crate::driver::UiDriver;
use crate::element::Element;
use crate::errors::AutomationError;
use crate::locator::{Locator, ReadyCondition};
use crate::selector::Selector;

#[derive(Clone)]
pub struct Actuator {
    driver: Arc<dyn UiDriver>,
    timeout: Duration,
    diagnostics: Option<Diagnostics>,
}

impl Actuator {
    pub fn new(driver: Arc<dyn UiDriver>, timeout: Duration) -> Self {
        Self {
            driver,
            timeout,
            diagnostics: None,
        }
    }

    /// Attach a screenshot sink for click failures.
    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    fn locator(&self, selector: &Selector) -> Locator {
        Locator::new(self.driver.clone(), selector.clone()).with_timeout(self.timeout)
    }

    /// Wait for the target to be clickable, scroll it into view and click it,
    /// falling back to a JS click if the native one is rejected.
    #[instrument(level = "debug", skip(self), fields(selector = %selector))]
    pub async fn click(&self, selector: &Selector) -> Result<(), AutomationError> {
        let elem = self.locator(selector).wait(ReadyCondition::Clickable, None).await?;
        self.click_element(&elem, selector).await
    }

    /// Same ladder for an already-located element.
    pub async fn click_element(
        &self,
        elem: &Element,
        selector: &Selector,
    ) -> Result<(), AutomationError> {
        if let Err(err) = elem.scroll_into_view().await {
            // Scrolling is best effort; the click itself decides success.
            warn!(%selector, %err, "scroll into view failed, clicking anyway");
        }
        let native_err = match elem.click().await {
            Ok(()) => return Ok(()),
            Err(err) => err,
        };
        debug!(%selector, %native_err, "native click rejected, trying JS click");
        match elem.js_click().await {
            Ok(()) => Ok(()),
            Err(js_err) => {
                if let Some(diag) = &self.diagnostics {
                    diag.capture("click_failed").await;
                }
                Err(AutomationError::ClickFailed(format!(
                    "'{selector}': native click failed ({native_err}), JS click failed ({js_err})"
                )))
            }
        }
    }

    /// Clear a field and type into it. Clearing first makes the operation
    /// idempotent under retry.
    #[instrument(level = "debug", skip(self, text), fields(selector = %selector))]
    pub async fn type_text(&self, selector: &Selector, text: &str) -> Result<(), AutomationError> {
        let elem = self.locator(selector).wait(ReadyCondition::Visible, None).await?;
        elem.clear().await?;
        elem.send_keys(text).await?;
        Ok(())
    }

    /// Select an option of a `<select>` element by its value attribute.
    #[instrument(level = "debug", skip(self), fields(selector = %selector, value))]
    pub async fn select_value(
        &self,
        selector: &Selector,
        value: &str,
    ) -> Result<(), AutomationError> {
        let elem = self.locator(selector).wait(ReadyCondition::Visible, None).await?;
        elem.select_by_value(value).await
    }
}

impl std::fmt::Debug for Actuator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Actuator")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
