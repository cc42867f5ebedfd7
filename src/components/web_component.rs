use crate::browser::InteractionDriver;
use crate::core::{PageDriver, PollOptions, SelectorStrategy};
use crate::errors::{BrowserError, Result};
use crate::types::ElementHandle;
use crate::utils::javascript;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// The recipe for one logical element: resolved afresh on every call.
pub struct WebComponent<P: PageDriver> {
    driver: Arc<InteractionDriver<P>>,
    strategy: SelectorStrategy,
    locator: String,
}

impl<P: PageDriver> Clone for WebComponent<P> {
    fn clone(&self) -> Self {
        Self {
            driver: Arc::clone(&self.driver),
            strategy: self.strategy,
            locator: self.locator.clone(),
        }
    }
}

impl<P: PageDriver> WebComponent<P> {
    pub fn new(driver: Arc<InteractionDriver<P>>, strategy: SelectorStrategy, locator: &str) -> Self {
        Self {
            driver,
            strategy,
            locator: locator.to_string(),
        }
    }

    pub fn strategy(&self) -> SelectorStrategy {
        self.strategy
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn driver(&self) -> &InteractionDriver<P> {
        &self.driver
    }

    /// Scrolls into view and clicks natively. Any failure falls back to a
    /// single script click without another readiness wait; if that fails
    /// too, the error is returned.
    pub async fn click(&self) -> Result<()> {
        let native: Result<()> = async {
            self.driver
                .scroll_into_view(self.strategy, &self.locator)
                .await?;
            self.driver.click(self.strategy, &self.locator).await
        }
        .await;

        if let Err(err) = native {
            warn!(
                "Native click on {} : {} failed, clicking via script: {}",
                self.strategy, self.locator, err
            );
            let fallback: Result<()> = async {
                let element = self.driver.find(self.strategy, &self.locator).await?;
                self.driver
                    .execute_script(javascript::CLICK_SCRIPT, Some(&element))
                    .await?;
                Ok::<_, BrowserError>(())
            }
            .await;
            fallback.map_err(|e| self.component_error("could not be clicked", e))?;
        }
        Ok(())
    }

    pub async fn find_multiple_elements(&self) -> Result<Vec<ElementHandle>> {
        self.driver.find_all(self.strategy, &self.locator).await
    }

    pub async fn find_element_or_fail(&self) -> Result<ElementHandle> {
        match self.driver.find(self.strategy, &self.locator).await {
            Ok(element) => Ok(element),
            Err(err) => {
                error!("Element {} : {} not found: {}", self.strategy, self.locator, err);
                Err(err)
            }
        }
    }

    pub async fn get_attribute(&self, name: &str) -> Result<Option<String>> {
        self.driver
            .get_attribute_value(self.strategy, &self.locator, name)
            .await
    }

    pub async fn hover(&self) -> Result<()> {
        self.driver.hover(self.strategy, &self.locator).await
    }

    /// Never fails: any error, including a malformed locator, reads as `false`.
    pub async fn is_available_and_displayed(&self) -> bool {
        let options = self.driver.config().ready_poll();
        self.is_available_and_displayed_within(&options).await
    }

    pub async fn is_available_and_displayed_within(&self, options: &PollOptions) -> bool {
        match self
            .driver
            .wait_until_visible_and_enabled_with(self.strategy, &self.locator, options)
            .await
        {
            Ok(()) => true,
            Err(err) => {
                debug!("{} : {} is not available: {}", self.strategy, self.locator, err);
                false
            }
        }
    }

    pub async fn wait_until_element_visible(&self) -> Result<()> {
        self.driver
            .wait_until_visible_and_enabled(self.strategy, &self.locator)
            .await
            .map_err(|e| self.component_error("is not visible yet", e))
    }

    pub async fn slow_type(&self, text: &str) -> Result<()> {
        self.driver
            .slow_type(self.strategy, &self.locator, text)
            .await?;
        Ok(())
    }

    pub(crate) fn component_error(&self, message: &str, source: BrowserError) -> BrowserError {
        BrowserError::Component {
            strategy: self.strategy,
            locator: self.locator.clone(),
            message: message.to_string(),
            source: Box::new(source),
        }
    }
}
