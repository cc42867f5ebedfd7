pub mod browser;
pub mod components;
pub mod core;
pub mod errors;
pub mod pages;
pub mod testing;
pub mod types;
pub mod utils;

pub use browser::{BrowserFactory, ChromePage, InteractionDriver};
pub use components::{Button, CheckBox, TextInput, TextView, WebComponent};
pub use core::{
    BrowserConfig, BrowserType, Config, InteractionConfig, Multiplicity, PageDriver, PollOptions,
    SelectorStrategy,
};
pub use errors::{BrowserError, ErrorKind, Result};
pub use pages::BasePage;
pub use types::*;
