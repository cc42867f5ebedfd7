use crate::browser::ChromePage;
use crate::core::{BrowserConfig, BrowserType};
use crate::errors::{BrowserError, Result};
use tracing::error;

pub struct BrowserFactory;

impl BrowserFactory {
    /// Launches the configured browser and opens one page in it.
    pub async fn create_page(config: &BrowserConfig) -> Result<ChromePage> {
        match config.browser_type {
            Some(BrowserType::Chromium) => ChromePage::launch(config).await,
            Some(other) => Err(BrowserError::ConfigurationError(format!(
                "{:?} cannot be driven over the Chrome DevTools protocol",
                other
            ))),
            None => {
                error!("No browser selected");
                Err(BrowserError::ConfigurationError(
                    "User has not selected any browser to run automation tests upon!".to_string(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_selection_is_a_configuration_error() {
        let config = BrowserConfig {
            browser_type: None,
            ..Default::default()
        };

        let err = BrowserFactory::create_page(&config).await.err().unwrap();
        assert!(err.is_fatal());
        assert_eq!(
            err.to_string(),
            "Configuration error: User has not selected any browser to run automation tests upon!"
        );
    }

    #[tokio::test]
    async fn non_chromium_engines_are_rejected() {
        for browser_type in [BrowserType::Firefox, BrowserType::Webkit] {
            let config = BrowserConfig {
                browser_type: Some(browser_type),
                ..Default::default()
            };
            let err = BrowserFactory::create_page(&config).await.err().unwrap();
            assert!(err.is_fatal());
        }
    }
}
