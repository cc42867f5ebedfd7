use super::{Clickable, Locatable, WebComponent};
use crate::browser::InteractionDriver;
use crate::core::{PageDriver, SelectorStrategy};
use crate::errors::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub struct Button<P: PageDriver> {
    component: WebComponent<P>,
}

impl<P: PageDriver> Button<P> {
    pub fn new(driver: Arc<InteractionDriver<P>>, strategy: SelectorStrategy, locator: &str) -> Self {
        Self {
            component: WebComponent::new(driver, strategy, locator),
        }
    }

    async fn settle(&self) {
        let delay = self.driver().config().post_click_delay_ms;
        self.driver().delay(delay).await;
    }
}

impl<P: PageDriver> Locatable for Button<P> {
    type Page = P;

    fn component(&self) -> &WebComponent<P> {
        &self.component
    }
}

#[async_trait]
impl<P: PageDriver> Clickable for Button<P> {
    async fn click(&self) -> Result<()> {
        self.component.click().await?;
        self.settle().await;
        Ok(())
    }

    async fn click_via_script(&self) -> Result<()> {
        self.driver()
            .click_via_script(self.strategy(), self.locator())
            .await?;
        self.settle().await;
        Ok(())
    }
}
