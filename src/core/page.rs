use crate::core::ElementQuery;
use crate::errors::Result;
use crate::types::{ElementAction, ElementHandle};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Capabilities the interaction layer needs from a live page.
///
/// One implementation wraps exactly one page/document. It is not meant to be
/// driven by two flows at once; callers sequence their operations.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Block until a CSS or XPath selector matches at least one node.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Number of nodes matching the query right now.
    async fn count(&self, query: &ElementQuery) -> Result<usize>;

    async fn is_visible(&self, element: &ElementHandle) -> Result<bool>;

    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool>;

    /// Perform an action on a resolved element. Reads return `Some`.
    async fn perform(&self, element: &ElementHandle, action: ElementAction)
        -> Result<Option<String>>;

    /// Run script in the page.
    ///
    /// With a target, `script` is a function body and `arguments[0]` is the
    /// element. Without one, it is evaluated as a page-level expression.
    async fn evaluate(&self, script: &str, target: Option<&ElementHandle>) -> Result<Value>;

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()>;

    async fn go_back(&self) -> Result<()>;

    async fn reload(&self) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    /// Press a key on whatever currently has focus.
    async fn press_key(&self, key: &str) -> Result<()>;

    async fn delay(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
