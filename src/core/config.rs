use crate::errors::{BrowserError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use super::poll::PollOptions;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub browser: BrowserConfig,
    pub interaction: InteractionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub browser_type: Option<BrowserType>,
    pub headless: bool,
    pub base_url: Option<String>,
    /// Extra Chromium command-line switches.
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Attachment wait for structural/path selectors.
    pub selector_timeout_ms: u64,
    pub ready_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub navigation_timeout_ms: u64,
    pub page_load_timeout_ms: u64,
    /// Pause after button clicks.
    pub post_click_delay_ms: u64,
    /// Pause around each step of script typing.
    pub script_settle_ms: u64,
    pub typing: TypingConfig,
}

/// Cadence of simulated typing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TypingConfig {
    pub initial_delay_ms: u64,
    pub fast_key_delay_ms: u64,
    pub slow_key_delay_ms: u64,
    /// Keys within this many characters of the end use the slow delay.
    pub slow_tail_chars: usize,
    pub jitter_max_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserType {
    #[serde(alias = "chrome")]
    Chromium,
    Firefox,
    Webkit,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            browser_type: Some(BrowserType::Chromium),
            headless: true,
            base_url: None,
            args: vec![],
        }
    }
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            selector_timeout_ms: 30000,
            ready_timeout_ms: super::poll::DEFAULT_READY_TIMEOUT_MS,
            poll_interval_ms: super::poll::DEFAULT_POLL_INTERVAL_MS,
            navigation_timeout_ms: 60000,
            page_load_timeout_ms: 60000,
            post_click_delay_ms: 1000,
            script_settle_ms: 200,
            typing: TypingConfig::default(),
        }
    }
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 2000,
            fast_key_delay_ms: 25,
            slow_key_delay_ms: 75,
            slow_tail_chars: 4,
            jitter_max_ms: 50,
        }
    }
}

impl InteractionConfig {
    pub fn ready_poll(&self) -> PollOptions {
        PollOptions::new(self.ready_timeout_ms, self.poll_interval_ms)
    }

    pub fn selector_timeout(&self) -> Duration {
        Duration::from_millis(self.selector_timeout_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }
}

impl TypingConfig {
    /// Scheduled pause after typing character `index` of a `len`-character string.
    pub fn key_delay(&self, index: usize, len: usize) -> Duration {
        if index + 1 >= len {
            return Duration::ZERO;
        }
        let ms = if len - index > self.slow_tail_chars {
            self.fast_key_delay_ms
        } else {
            self.slow_key_delay_ms
        };
        Duration::from_millis(ms)
    }
}

impl FromStr for BrowserType {
    type Err = BrowserError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(BrowserType::Chromium),
            "firefox" => Ok(BrowserType::Firefox),
            "webkit" => Ok(BrowserType::Webkit),
            other => Err(BrowserError::ConfigurationError(format!(
                "unknown browser type '{}'",
                other
            ))),
        }
    }
}

impl Config {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Apply `BROWSER`, `HEADLESS` and `BASE_URL` overrides from `lookup`.
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(browser) = lookup("BROWSER") {
            self.browser.browser_type = if browser.trim().is_empty() {
                None
            } else {
                Some(browser.parse()?)
            };
        }

        if let Some(headless) = lookup("HEADLESS") {
            self.browser.headless = match headless.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => {
                    return Err(BrowserError::ConfigurationError(format!(
                        "HEADLESS must be true or false, got '{}'",
                        other
                    )))
                }
            };
        }

        if let Some(base_url) = lookup("BASE_URL") {
            self.browser.base_url = Some(base_url);
        }

        Ok(self)
    }

    pub fn apply_process_env(self) -> Result<Self> {
        self.apply_env(|key| std::env::var(key).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_interaction_constants() {
        let config = Config::default();
        assert_eq!(config.interaction.selector_timeout_ms, 30000);
        assert_eq!(config.interaction.ready_timeout_ms, 60000);
        assert_eq!(config.interaction.poll_interval_ms, 500);
        assert_eq!(config.interaction.navigation_timeout_ms, 60000);
        assert_eq!(config.browser.browser_type, Some(BrowserType::Chromium));
        assert!(config.browser.headless);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: Config = serde_json::from_str(
            r#"{ "browser": { "browser_type": "chrome", "headless": false },
                 "interaction": { "poll_interval_ms": 250, "typing": { "jitter_max_ms": 0 } } }"#,
        )
        .unwrap();

        assert_eq!(config.browser.browser_type, Some(BrowserType::Chromium));
        assert!(!config.browser.headless);
        assert_eq!(config.interaction.poll_interval_ms, 250);
        assert_eq!(config.interaction.ready_timeout_ms, 60000);
        assert_eq!(config.interaction.typing.jitter_max_ms, 0);
        assert_eq!(config.interaction.typing.fast_key_delay_ms, 25);
    }

    #[test]
    fn env_overrides_browser_selection() {
        let env: HashMap<&str, &str> = [("BROWSER", "firefox"), ("HEADLESS", "no")]
            .into_iter()
            .collect();
        let config = Config::default()
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.browser.browser_type, Some(BrowserType::Firefox));
        assert!(!config.browser.headless);
    }

    #[test]
    fn empty_browser_env_clears_selection() {
        let config = Config::default()
            .apply_env(|key| (key == "BROWSER").then(String::new))
            .unwrap();
        assert_eq!(config.browser.browser_type, None);
    }

    #[test]
    fn bad_env_values_are_configuration_errors() {
        let err = Config::default()
            .apply_env(|key| (key == "BROWSER").then(|| "netscape".to_string()))
            .unwrap_err();
        assert!(err.is_fatal());

        let err = Config::default()
            .apply_env(|key| (key == "HEADLESS").then(|| "maybe".to_string()))
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn typing_cadence_slows_near_the_end() {
        let typing = TypingConfig::default();
        let delays: Vec<u64> = (0..10)
            .map(|i| typing.key_delay(i, 10).as_millis() as u64)
            .collect();

        assert_eq!(delays, vec![25, 25, 25, 25, 25, 25, 75, 75, 75, 0]);
    }

    #[test]
    fn single_character_has_no_scheduled_delay() {
        assert_eq!(TypingConfig::default().key_delay(0, 1), Duration::ZERO);
    }
}
