pub mod config;
pub mod page;
pub mod poll;
pub mod selector;

pub use config::{BrowserConfig, BrowserType, Config, InteractionConfig, TypingConfig};
pub use page::PageDriver;
pub use poll::{poll_until, PollBudget, PollOptions, Polled};
pub use selector::{ElementQuery, Multiplicity, SelectorStrategy};
