use crate::browser::InteractionDriver;
use crate::core::PageDriver;
use crate::errors::{BrowserError, Result};
use std::sync::Arc;
use url::Url;

/// Shared base for page objects: a driver plus the page's default URL.
pub struct BasePage<P: PageDriver> {
    driver: Arc<InteractionDriver<P>>,
    url: String,
}

impl<P: PageDriver> BasePage<P> {
    pub fn new(driver: Arc<InteractionDriver<P>>, url: &str) -> Self {
        Self {
            driver,
            url: url.to_string(),
        }
    }

    pub fn driver(&self) -> &Arc<InteractionDriver<P>> {
        &self.driver
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Navigates to `path` (absolute, or relative to the default URL), or to
    /// the default URL itself when `path` is `None`.
    pub async fn goto(&self, path: Option<&str>) -> Result<()> {
        let target = self.resolve(path)?;
        self.driver.navigate(&target).await
    }

    pub async fn navigate_back(&self) -> Result<()> {
        self.driver.navigate_back().await
    }

    pub async fn current_url(&self) -> Result<String> {
        self.driver.current_url().await
    }

    fn resolve(&self, path: Option<&str>) -> Result<String> {
        let path = match path {
            Some(path) if !path.is_empty() => path,
            _ if self.url.is_empty() => {
                return Err(BrowserError::ConfigurationError(
                    "page has no default URL".to_string(),
                ))
            }
            _ => return Ok(self.url.clone()),
        };

        if let Ok(absolute) = Url::parse(path) {
            return Ok(absolute.to_string());
        }

        let base = Url::parse(&self.url).map_err(|e| {
            BrowserError::ConfigurationError(format!("invalid base URL '{}': {}", self.url, e))
        })?;
        let joined = base.join(path).map_err(|e| {
            BrowserError::ConfigurationError(format!("cannot resolve '{}': {}", path, e))
        })?;
        Ok(joined.to_string())
    }
}
