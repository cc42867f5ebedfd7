use super::{Locatable, WebComponent};
use crate::browser::InteractionDriver;
use crate::core::{PageDriver, SelectorStrategy};
use crate::errors::Result;
use std::sync::Arc;

pub struct CheckBox<P: PageDriver> {
    component: WebComponent<P>,
}

impl<P: PageDriver> CheckBox<P> {
    pub fn new(driver: Arc<InteractionDriver<P>>, strategy: SelectorStrategy, locator: &str) -> Self {
        Self {
            component: WebComponent::new(driver, strategy, locator),
        }
    }

    /// Clicks the box once. This toggles; calling it twice unchecks.
    pub async fn select(&self) -> Result<()> {
        self.driver().click(self.strategy(), self.locator()).await
    }
}

impl<P: PageDriver> Locatable for CheckBox<P> {
    type Page = P;

    fn component(&self) -> &WebComponent<P> {
        &self.component
    }
}
