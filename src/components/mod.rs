//! Reusable handles to logical page elements.
//!
//! Every widget wraps a [`WebComponent`] (strategy + locator + driver) and
//! exposes its behaviour through the capability traits below.

pub mod button;
pub mod checkbox;
pub mod text_input;
pub mod text_view;
pub mod web_component;

pub use button::Button;
pub use checkbox::CheckBox;
pub use text_input::TextInput;
pub use text_view::TextView;
pub use web_component::WebComponent;

use crate::browser::InteractionDriver;
use crate::core::{PageDriver, SelectorStrategy};
use crate::errors::Result;
use async_trait::async_trait;

pub trait Locatable: Send + Sync {
    type Page: PageDriver;

    fn component(&self) -> &WebComponent<Self::Page>;

    fn strategy(&self) -> SelectorStrategy {
        self.component().strategy()
    }

    fn locator(&self) -> &str {
        self.component().locator()
    }

    fn driver(&self) -> &InteractionDriver<Self::Page> {
        self.component().driver()
    }
}

#[async_trait]
pub trait Clickable: Locatable {
    async fn click(&self) -> Result<()>;

    async fn click_via_script(&self) -> Result<()>;
}

/// Typing entry points. Failures are logged, not returned.
#[async_trait]
pub trait Typeable: Locatable {
    /// One key at a time with human-like pauses.
    async fn slow_type(&self, text: &str);

    /// Native fill after clearing the field.
    async fn fast_type(&self, text: &str);

    /// Value assignment through script.
    async fn script_type(&self, text: &str);
}

#[async_trait]
pub trait Readable: Locatable {
    async fn get_text(&self) -> Result<String>;

    async fn get_text_via_script(&self) -> Result<String>;

    async fn get_attribute(&self, name: &str) -> Result<Option<String>>;
}
