use super::{Locatable, Readable, WebComponent};
use crate::browser::InteractionDriver;
use crate::core::{PageDriver, SelectorStrategy};
use crate::errors::{BrowserError, OperationContext, Result};
use crate::utils::javascript;
use async_trait::async_trait;
use std::sync::Arc;

pub struct TextView<P: PageDriver> {
    component: WebComponent<P>,
}

impl<P: PageDriver> TextView<P> {
    pub fn new(driver: Arc<InteractionDriver<P>>, strategy: SelectorStrategy, locator: &str) -> Self {
        Self {
            component: WebComponent::new(driver, strategy, locator),
        }
    }

    /// URL of the page this view lives on, once it has loaded.
    pub async fn get_current_url(&self) -> Result<String> {
        self.driver().current_url().await
    }
}

impl<P: PageDriver> Locatable for TextView<P> {
    type Page = P;

    fn component(&self) -> &WebComponent<P> {
        &self.component
    }
}

#[async_trait]
impl<P: PageDriver> Readable for TextView<P> {
    async fn get_text(&self) -> Result<String> {
        self.driver().get_text(self.strategy(), self.locator()).await
    }

    async fn get_text_via_script(&self) -> Result<String> {
        let result: Result<String> = async {
            let element = self.component.find_element_or_fail().await?;
            let text = self
                .driver()
                .execute_script(javascript::INNER_TEXT_SCRIPT, Some(&element))
                .await?;
            Ok::<_, BrowserError>(text.as_str().unwrap_or_default().to_string())
        }
        .await;
        result.during("getting inner text of element using JavaScript")
    }

    async fn get_attribute(&self, name: &str) -> Result<Option<String>> {
        self.component.get_attribute(name).await
    }
}
