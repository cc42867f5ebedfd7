use crate::errors::{BrowserError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ways of addressing an element on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorStrategy {
    /// CSS selector
    #[serde(alias = "css")]
    Structural,
    /// XPath expression
    #[serde(alias = "xpath")]
    PathQuery,
    #[serde(alias = "text")]
    VisibleText,
    #[serde(alias = "label")]
    AccessibleLabel,
    #[serde(alias = "placeholder")]
    PlaceholderText,
    #[serde(alias = "alt_text", alias = "alttext")]
    AlternateText,
    #[serde(alias = "title")]
    TitleAttribute,
    #[serde(alias = "test_id", alias = "testid")]
    TestIdentifier,
}

/// Whether a lookup wants the first match or every match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Multiplicity {
    #[default]
    Single,
    All,
}

/// Strategy-independent lookup primitive handed to the page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ElementQuery {
    Selector(String),
    Text(String),
    Label(String),
    Placeholder(String),
    AltText(String),
    Title(String),
    TestId(String),
}

impl SelectorStrategy {
    pub const ALL: [SelectorStrategy; 8] = [
        SelectorStrategy::Structural,
        SelectorStrategy::PathQuery,
        SelectorStrategy::VisibleText,
        SelectorStrategy::AccessibleLabel,
        SelectorStrategy::PlaceholderText,
        SelectorStrategy::AlternateText,
        SelectorStrategy::TitleAttribute,
        SelectorStrategy::TestIdentifier,
    ];

    /// Short name used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            SelectorStrategy::Structural => "css",
            SelectorStrategy::PathQuery => "xpath",
            SelectorStrategy::VisibleText => "text",
            SelectorStrategy::AccessibleLabel => "label",
            SelectorStrategy::PlaceholderText => "placeholder",
            SelectorStrategy::AlternateText => "alt text",
            SelectorStrategy::TitleAttribute => "title",
            SelectorStrategy::TestIdentifier => "test id",
        }
    }

    /// What the locator string is, as worded in "could not load element with given ..." errors.
    pub fn criterion(&self) -> &'static str {
        match self {
            SelectorStrategy::Structural | SelectorStrategy::PathQuery => "selector",
            SelectorStrategy::VisibleText => "text",
            SelectorStrategy::AccessibleLabel => "label",
            SelectorStrategy::PlaceholderText => "placeholder",
            SelectorStrategy::AlternateText => "Alt Text",
            SelectorStrategy::TitleAttribute => "title",
            SelectorStrategy::TestIdentifier => "test id",
        }
    }

    /// Structural and path strategies wait for the node to be attached;
    /// the others match synchronously.
    pub fn waits_for_attachment(&self) -> bool {
        matches!(
            self,
            SelectorStrategy::Structural | SelectorStrategy::PathQuery
        )
    }

    pub fn query(&self, locator: &str) -> ElementQuery {
        let value = locator.to_string();
        match self {
            SelectorStrategy::Structural | SelectorStrategy::PathQuery => {
                ElementQuery::Selector(value)
            }
            SelectorStrategy::VisibleText => ElementQuery::Text(value),
            SelectorStrategy::AccessibleLabel => ElementQuery::Label(value),
            SelectorStrategy::PlaceholderText => ElementQuery::Placeholder(value),
            SelectorStrategy::AlternateText => ElementQuery::AltText(value),
            SelectorStrategy::TitleAttribute => ElementQuery::Title(value),
            SelectorStrategy::TestIdentifier => ElementQuery::TestId(value),
        }
    }
}

impl fmt::Display for SelectorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SelectorStrategy {
    type Err = BrowserError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "css" | "structural" => Ok(SelectorStrategy::Structural),
            "xpath" | "pathquery" => Ok(SelectorStrategy::PathQuery),
            "text" | "visibletext" => Ok(SelectorStrategy::VisibleText),
            "label" | "accessiblelabel" => Ok(SelectorStrategy::AccessibleLabel),
            "placeholder" | "placeholdertext" => Ok(SelectorStrategy::PlaceholderText),
            "alt" | "alttext" | "alternatetext" => Ok(SelectorStrategy::AlternateText),
            "title" | "titleattribute" => Ok(SelectorStrategy::TitleAttribute),
            "testid" | "testidentifier" => Ok(SelectorStrategy::TestIdentifier),
            _ => Err(BrowserError::InvalidSelector(s.to_string())),
        }
    }
}

impl ElementQuery {
    /// Tag understood by the injected resolver script.
    pub fn kind(&self) -> &'static str {
        match self {
            ElementQuery::Selector(_) => "selector",
            ElementQuery::Text(_) => "text",
            ElementQuery::Label(_) => "label",
            ElementQuery::Placeholder(_) => "placeholder",
            ElementQuery::AltText(_) => "alt",
            ElementQuery::Title(_) => "title",
            ElementQuery::TestId(_) => "testid",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            ElementQuery::Selector(v)
            | ElementQuery::Text(v)
            | ElementQuery::Label(v)
            | ElementQuery::Placeholder(v)
            | ElementQuery::AltText(v)
            | ElementQuery::Title(v)
            | ElementQuery::TestId(v) => v,
        }
    }
}

/// Splits a selector into its XPath expression, if it is one.
pub fn xpath_expression(selector: &str) -> Option<&str> {
    if let Some(expr) = selector.strip_prefix("xpath=") {
        return Some(expr);
    }
    if selector.starts_with('/') || selector.starts_with('(') || selector.starts_with("..") {
        return Some(selector);
    }
    None
}
