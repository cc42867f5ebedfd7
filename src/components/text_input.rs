use super::{Locatable, Typeable, WebComponent};
use crate::browser::InteractionDriver;
use crate::core::{PageDriver, SelectorStrategy};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::error;

pub struct TextInput<P: PageDriver> {
    component: WebComponent<P>,
}

impl<P: PageDriver> TextInput<P> {
    pub fn new(driver: Arc<InteractionDriver<P>>, strategy: SelectorStrategy, locator: &str) -> Self {
        Self {
            component: WebComponent::new(driver, strategy, locator),
        }
    }
}

impl<P: PageDriver> Locatable for TextInput<P> {
    type Page = P;

    fn component(&self) -> &WebComponent<P> {
        &self.component
    }
}

#[async_trait]
impl<P: PageDriver> Typeable for TextInput<P> {
    async fn slow_type(&self, text: &str) {
        if let Err(err) = self.component.slow_type(text).await {
            error!("Error in slow typing into {} : {}: {}", self.strategy(), self.locator(), err);
        }
    }

    async fn fast_type(&self, text: &str) {
        if let Err(err) = self
            .driver()
            .send_keys(self.strategy(), self.locator(), text, true)
            .await
        {
            error!("Error in fast typing into {} : {}: {}", self.strategy(), self.locator(), err);
        }
    }

    async fn script_type(&self, text: &str) {
        if let Err(err) = self
            .driver()
            .send_keys_via_script(self.strategy(), self.locator(), text)
            .await
        {
            error!(
                "Error in typing via script into {} : {}: {}",
                self.strategy(),
                self.locator(),
                err
            );
        }
    }
}
