use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Stale element reference: {0}")]
    StaleReference(String),

    #[error("Click failed after native and scripted attempts: {0}")]
    ClickFailed(String),

    #[error("No new window appeared: {0}")]
    NoNewWindow(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error("Operation '{operation}' exhausted its retry budget after {attempts} attempts")]
    RetryExhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<AutomationError>,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("WebDriver error: {0}")]
    WebDriver(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AutomationError {
    /// Transient failure kinds that the retry policy may re-execute.
    /// Everything else indicates a logic or navigation error and
    /// propagates on first occurrence.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            AutomationError::Timeout(_) | AutomationError::StaleReference(_)
        )
    }
}
