use crate::core::SelectorStrategy;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Could not load element with given {}: {locator} ({reason})", .strategy.criterion())]
    ElementNotFound {
        strategy: SelectorStrategy,
        locator: String,
        reason: String,
    },

    #[error("Could not load element with given selector: {selector} (invalid selector syntax: {reason})")]
    SelectorSyntax { selector: String, reason: String },

    #[error("Element not visible and enabled within {timeout_ms} ms ({strategy}: {locator})")]
    NotReady {
        strategy: SelectorStrategy,
        locator: String,
        timeout_ms: u64,
    },

    #[error("Element {strategy} : {locator} rejected {action}: {reason}")]
    ActionFailed {
        action: String,
        strategy: SelectorStrategy,
        locator: String,
        reason: String,
    },

    #[error("Unsupported selector type: {0}")]
    InvalidSelector(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("JavaScript execution failed: {0}")]
    JavaScriptFailed(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),

    #[error("Error {operation}: {source}")]
    Operation {
        operation: String,
        #[source]
        source: Box<BrowserError>,
    },

    #[error("Element {strategy} : {locator} {message}: {source}")]
    Component {
        strategy: SelectorStrategy,
        locator: String,
        message: String,
        #[source]
        source: Box<BrowserError>,
    },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Anyhow error: {0}")]
    AnyhowError(String),
}

pub type Result<T> = std::result::Result<T, BrowserError>;

/// Failure classes callers branch on, independent of how much context
/// has been layered onto an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    NotReady,
    ActionFailed,
    Configuration,
    Navigation,
    Script,
    Browser,
    Io,
}

// headless_chrome reports everything as anyhow::Error
impl From<anyhow::Error> for BrowserError {
    fn from(err: anyhow::Error) -> Self {
        BrowserError::AnyhowError(err.to_string())
    }
}

impl BrowserError {
    /// Wraps the error with the name of the operation that was running.
    pub fn during(self, operation: impl Into<String>) -> Self {
        BrowserError::Operation {
            operation: operation.into(),
            source: Box::new(self),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BrowserError::ElementNotFound { .. } | BrowserError::SelectorSyntax { .. } => {
                ErrorKind::NotFound
            }
            BrowserError::NotReady { .. } => ErrorKind::NotReady,
            BrowserError::ActionFailed { .. } => ErrorKind::ActionFailed,
            BrowserError::InvalidSelector(_) | BrowserError::ConfigurationError(_) => {
                ErrorKind::Configuration
            }
            BrowserError::NavigationFailed(_) => ErrorKind::Navigation,
            BrowserError::JavaScriptFailed(_) | BrowserError::SerializationError(_) => {
                ErrorKind::Script
            }
            BrowserError::LaunchFailed(_)
            | BrowserError::TimeoutError(_)
            | BrowserError::AnyhowError(_) => ErrorKind::Browser,
            BrowserError::IoError(_) => ErrorKind::Io,
            BrowserError::Operation { source, .. } | BrowserError::Component { source, .. } => {
                source.kind()
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_not_ready(&self) -> bool {
        self.kind() == ErrorKind::NotReady
    }

    /// Configuration errors are never retried.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }

    pub fn is_selector_syntax(&self) -> bool {
        match self {
            BrowserError::SelectorSyntax { .. } => true,
            BrowserError::Operation { source, .. } | BrowserError::Component { source, .. } => {
                source.is_selector_syntax()
            }
            _ => false,
        }
    }

    /// Errors that no amount of waiting will clear.
    pub fn is_permanent(&self) -> bool {
        self.is_fatal() || self.is_selector_syntax()
    }
}

pub trait OperationContext<T> {
    fn during(self, operation: &str) -> Result<T>;
}

impl<T> OperationContext<T> for Result<T> {
    fn during(self, operation: &str) -> Result<T> {
        self.map_err(|err| err.during(operation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn not_found() -> BrowserError {
        BrowserError::ElementNotFound {
            strategy: SelectorStrategy::Structural,
            locator: "#missing".to_string(),
            reason: "timed out after 30000 ms".to_string(),
        }
    }

    #[test]
    fn kind_sees_through_operation_and_component_wrappers() {
        let wrapped = BrowserError::Component {
            strategy: SelectorStrategy::Structural,
            locator: "#missing".to_string(),
            message: "is not visible yet".to_string(),
            source: Box::new(not_found().during("clicking element")),
        };

        assert_eq!(wrapped.kind(), ErrorKind::NotFound);
        assert!(wrapped.is_not_found());
        assert!(!wrapped.is_fatal());
    }

    #[test]
    fn message_names_operation_strategy_and_locator() {
        let err = BrowserError::NotReady {
            strategy: SelectorStrategy::VisibleText,
            locator: "Submit".to_string(),
            timeout_ms: 2000,
        }
        .during("clicking element");

        let message = err.to_string();
        assert!(message.starts_with("Error clicking element"));
        assert!(message.contains("within 2000 ms"));
        assert!(message.contains("text: Submit"));
    }

    #[test]
    fn not_found_uses_strategy_criterion() {
        let err = BrowserError::ElementNotFound {
            strategy: SelectorStrategy::AlternateText,
            locator: "logo".to_string(),
            reason: "no match".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Could not load element with given Alt Text: logo (no match)"
        );
    }

    #[test]
    fn unsupported_selector_is_fatal() {
        assert!(BrowserError::InvalidSelector("shadow".into()).is_fatal());
        assert!(BrowserError::ConfigurationError("no browser".into()).is_fatal());
    }

    #[test]
    fn malformed_selector_is_a_permanent_miss() {
        let err = BrowserError::SelectorSyntax {
            selector: "button[".to_string(),
            reason: "unexpected end of input".to_string(),
        }
        .during("clicking element");

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!err.is_fatal());
        assert!(err.is_permanent());
        assert!(err
            .to_string()
            .contains("Could not load element with given selector: button[ (invalid selector syntax"));
        assert!(!not_found().is_permanent());
    }

    #[test]
    fn result_context_wraps_errors_only() {
        let ok: Result<u8> = Ok(3);
        assert_eq!(ok.during("reading").unwrap(), 3);

        let err: Result<u8> = Err(not_found());
        let err = err.during("reading text").unwrap_err();
        assert!(matches!(err, BrowserError::Operation { .. }));
    }
}
