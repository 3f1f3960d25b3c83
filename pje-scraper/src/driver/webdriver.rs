//! `thirtyfour`-backed [`UiDriver`] implementation.
//!
//! Everything WebDriver-specific lives here; the rest of the crate only sees
//! the `UiDriver`/`ElementImpl` traits.

use std::fmt;
use std::sync::Arc;

use thirtyfour::components::SelectElement;
use thirtyfour::error::WebDriverError;
use thirtyfour::{By, ChromiumLikeCapabilities, DesiredCapabilities, WebDriver, WebElement};
use tracing::instrument;

use crate::element::{Element, ElementImpl};
use crate::errors::AutomationError;
use crate::selector::Selector;

use super::{UiDriver, WindowHandle};

/// One live browser session speaking the WebDriver protocol.
pub struct WebDriverSession {
    driver: WebDriver,
}

impl WebDriverSession {
    /// Connect to a running WebDriver server (e.g. chromedriver on
    /// `http://localhost:9515`) and start a Chrome session.
    #[instrument(skip(server_url))]
    pub async fn connect(server_url: &str, headless: bool) -> Result<Self, AutomationError> {
        let mut caps = DesiredCapabilities::chrome();
        if headless {
            caps.set_headless().map_err(classify)?;
        }
        let driver = WebDriver::new(server_url, caps).await.map_err(classify)?;
        Ok(Self { driver })
    }

    pub fn into_shared(self) -> Arc<dyn UiDriver> {
        Arc::new(self)
    }

    fn wrap(&self, elem: WebElement) -> Element {
        Element::new(Arc::new(WdElement {
            driver: self.driver.clone(),
            elem,
        }))
    }
}

/// Map a WebDriver failure onto the crate taxonomy. The protocol reports
/// error kinds in the message text, so classification keys off that.
fn classify(err: WebDriverError) -> AutomationError {
    let msg = err.to_string();
    let lower = msg.to_lowercase();
    if lower.contains("stale element") {
        AutomationError::StaleReference(msg)
    } else if lower.contains("no such element") || lower.contains("unable to locate element") {
        AutomationError::ElementNotFound(msg)
    } else if lower.contains("timed out") || lower.contains("timeout") {
        AutomationError::Timeout(msg)
    } else {
        AutomationError::WebDriver(msg)
    }
}

fn to_by(selector: &Selector) -> By {
    match selector {
        Selector::Id(v) => By::Id(v.as_str()),
        Selector::Css(v) => By::Css(v.as_str()),
        Selector::XPath(v) => By::XPath(v.as_str()),
        Selector::ClassName(v) => By::ClassName(v.as_str()),
        Selector::Tag(v) => By::Tag(v.as_str()),
        Selector::LinkTextContains(v) => By::XPath(format!("//a[contains(text(), '{v}')]")),
    }
}

#[async_trait::async_trait]
impl UiDriver for WebDriverSession {
    async fn goto(&self, url: &str) -> Result<(), AutomationError> {
        self.driver.goto(url).await.map_err(classify)
    }

    async fn current_url(&self) -> Result<String, AutomationError> {
        Ok(self.driver.current_url().await.map_err(classify)?.to_string())
    }

    async fn find(&self, selector: &Selector) -> Result<Element, AutomationError> {
        let elem = self.driver.find(to_by(selector)).await.map_err(classify)?;
        Ok(self.wrap(elem))
    }

    async fn find_all(&self, selector: &Selector) -> Result<Vec<Element>, AutomationError> {
        let elems = self
            .driver
            .find_all(to_by(selector))
            .await
            .map_err(classify)?;
        Ok(elems.into_iter().map(|e| self.wrap(e)).collect())
    }

    async fn enter_frame(&self, selector: &Selector) -> Result<(), AutomationError> {
        let frame = self.driver.find(to_by(selector)).await.map_err(classify)?;
        frame.enter_frame().await.map_err(classify)
    }

    async fn reset_to_root(&self) -> Result<(), AutomationError> {
        self.driver.enter_default_frame().await.map_err(classify)
    }

    async fn window_handles(&self) -> Result<Vec<WindowHandle>, AutomationError> {
        let handles = self.driver.windows().await.map_err(classify)?;
        Ok(handles
            .into_iter()
            .map(|h| WindowHandle(h.to_string()))
            .collect())
    }

    async fn active_window(&self) -> Result<WindowHandle, AutomationError> {
        let handle = self.driver.window().await.map_err(classify)?;
        Ok(WindowHandle(handle.to_string()))
    }

    async fn switch_to_window(&self, handle: &WindowHandle) -> Result<(), AutomationError> {
        self.driver
            .switch_to_window(thirtyfour::WindowHandle::from(handle.0.clone()))
            .await
            .map_err(classify)
    }

    async fn close_window(&self) -> Result<(), AutomationError> {
        self.driver.close_window().await.map_err(classify)
    }

    async fn screenshot_png(&self) -> Result<Vec<u8>, AutomationError> {
        self.driver.screenshot_as_png().await.map_err(classify)
    }

    async fn quit(&self) -> Result<(), AutomationError> {
        // WebDriver is a cloneable handle; quit() consumes one clone and
        // ends the remote session for all of them.
        self.driver.clone().quit().await.map_err(classify)
    }
}

impl fmt::Debug for WebDriverSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebDriverSession").finish_non_exhaustive()
    }
}

struct WdElement {
    driver: WebDriver,
    elem: WebElement,
}

impl fmt::Debug for WdElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WdElement").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl ElementImpl for WdElement {
    async fn click(&self) -> Result<(), AutomationError> {
        self.elem.click().await.map_err(classify)
    }

    async fn js_click(&self) -> Result<(), AutomationError> {
        let arg = self.elem.to_json().map_err(classify)?;
        self.driver
            .execute("arguments[0].click();", vec![arg])
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn scroll_into_view(&self) -> Result<(), AutomationError> {
        self.elem.scroll_into_view().await.map_err(classify)
    }

    async fn send_keys(&self, text: &str) -> Result<(), AutomationError> {
        self.elem.send_keys(text).await.map_err(classify)
    }

    async fn clear(&self) -> Result<(), AutomationError> {
        self.elem.clear().await.map_err(classify)
    }

    async fn text(&self) -> Result<String, AutomationError> {
        self.elem.text().await.map_err(classify)
    }

    async fn attr(&self, name: &str) -> Result<Option<String>, AutomationError> {
        self.elem.attr(name).await.map_err(classify)
    }

    async fn select_by_value(&self, value: &str) -> Result<(), AutomationError> {
        let select = SelectElement::new(&self.elem).await.map_err(classify)?;
        select.select_by_value(value).await.map_err(classify)
    }

    async fn is_displayed(&self) -> Result<bool, AutomationError> {
        self.elem.is_displayed().await.map_err(classify)
    }

    async fn is_enabled(&self) -> Result<bool, AutomationError> {
        self.elem.is_enabled().await.map_err(classify)
    }
}
