use crate::core::{ElementQuery, SelectorStrategy};
use serde::{Deserialize, Serialize};

/// A live reference to the `index`-th node matching a query.
///
/// Handles are recipes, not node pointers: the page re-resolves them on
/// every action, so a handle whose node has gone away fails as not found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    pub strategy: SelectorStrategy,
    pub locator: String,
    pub query: ElementQuery,
    pub index: usize,
}

impl ElementHandle {
    pub fn new(strategy: SelectorStrategy, locator: &str, index: usize) -> Self {
        Self {
            strategy,
            locator: locator.to_string(),
            query: strategy.query(locator),
            index,
        }
    }

    pub fn describe(&self) -> String {
        format!("{} : {} [{}]", self.strategy, self.locator, self.index)
    }
}

/// Low-level actions a page performs against a resolved element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementAction {
    Click,
    Hover,
    Focus,
    ScrollIntoView,
    Clear,
    Fill(String),
    PressKey(String),
    ReadText,
    ReadAttribute(String),
}

impl ElementAction {
    pub fn name(&self) -> &'static str {
        match self {
            ElementAction::Click => "click",
            ElementAction::Hover => "hover",
            ElementAction::Focus => "focus",
            ElementAction::ScrollIntoView => "scroll into view",
            ElementAction::Clear => "clear",
            ElementAction::Fill(_) => "fill",
            ElementAction::PressKey(_) => "key press",
            ElementAction::ReadText => "read text",
            ElementAction::ReadAttribute(_) => "read attribute",
        }
    }
}

/// Visibility and enabled state observed in one poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ElementState {
    pub visible: bool,
    pub enabled: bool,
}

impl ElementState {
    pub fn is_ready(&self) -> bool {
        self.visible && self.enabled
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ElementRect {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}
