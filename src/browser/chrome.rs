use crate::core::selector::xpath_expression;
use crate::core::{BrowserConfig, ElementQuery, PageDriver};
use crate::errors::{BrowserError, Result};
use crate::types::{ElementAction, ElementHandle, ElementRect};
use crate::utils::javascript::{self, ScriptOutcome};
use async_trait::async_trait;
use headless_chrome::browser::tab::point::Point;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde::Deserialize;
use serde_json::Value;
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// A single Chromium tab driven over the DevTools protocol.
pub struct ChromePage {
    // Owns the process; dropping it closes the browser.
    _browser: Browser,
    tab: Arc<Tab>,
}

#[derive(Debug, Deserialize)]
struct ClickTarget {
    #[serde(flatten)]
    rect: ElementRect,
    hit: Option<String>,
    receives: bool,
}

impl ChromePage {
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let mut args = vec![
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new("--start-maximized"),
        ];

        for arg in &config.args {
            args.push(OsStr::new(arg));
        }

        let launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .args(args)
            .build()
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        let browser =
            Browser::new(launch_options).map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        let tab = browser
            .new_tab()
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        info!("Launched Chromium (headless: {})", config.headless);
        Ok(Self {
            _browser: browser,
            tab,
        })
    }

    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }

    /// `selector` names the locator the script resolves, if any, so syntax
    /// failures can be reported against it.
    fn run(&self, script: &str, selector: Option<&str>) -> Result<Value> {
        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|e| BrowserError::JavaScriptFailed(e.to_string()))?;

        let outcome = ScriptOutcome::parse(result.value)?;
        if outcome.ok {
            Ok(outcome.value)
        } else {
            Err(script_failure(outcome.error, selector))
        }
    }

    fn run_on(&self, element: &ElementHandle, body: &str) -> Result<Value> {
        let result = self
            .tab
            .evaluate(&javascript::element_script(element, body), false)
            .map_err(|e| BrowserError::JavaScriptFailed(e.to_string()))?;

        let outcome = ScriptOutcome::parse(result.value)?;
        if outcome.missing {
            return Err(BrowserError::ElementNotFound {
                strategy: element.strategy,
                locator: element.locator.clone(),
                reason: "element is not attached to the document".to_string(),
            });
        }
        if !outcome.ok {
            return Err(script_failure(outcome.error, Some(&element.locator)));
        }
        Ok(outcome.value)
    }

    fn click_target(&self, element: &ElementHandle) -> Result<ClickTarget> {
        let value = self.run_on(element, javascript::CLICK_TARGET_BODY)?;
        Ok(serde_json::from_value(value)?)
    }

    // press_key only knows the US layout; anything else is inserted as text.
    fn type_key(&self, key: &str) -> Result<()> {
        if let Err(err) = self.tab.press_key(key) {
            debug!("press_key({}) failed, inserting as text: {}", key, err);
            self.tab.send_character(key)?;
        }
        Ok(())
    }
}

const SYNTAX_MARKERS: [&str; 3] = [
    "is not a valid selector",
    "is not a valid XPath",
    "is not a node set",
];

fn script_failure(error: Option<String>, selector: Option<&str>) -> BrowserError {
    let message = error.unwrap_or_else(|| "script reported failure".to_string());
    match selector {
        Some(selector) if SYNTAX_MARKERS.iter().any(|m| message.contains(m)) => {
            BrowserError::SelectorSyntax {
                selector: selector.to_string(),
                reason: message,
            }
        }
        _ => BrowserError::JavaScriptFailed(message),
    }
}

#[async_trait]
impl PageDriver for ChromePage {
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        // Surfaces syntax errors before the wait turns them into timeouts.
        self.count(&ElementQuery::Selector(selector.to_string()))
            .await?;

        let waited = match xpath_expression(selector) {
            Some(expr) => self
                .tab
                .wait_for_xpath_with_custom_timeout(expr, timeout)
                .map(|_| ()),
            None => self
                .tab
                .wait_for_element_with_custom_timeout(selector, timeout)
                .map(|_| ()),
        };

        waited.map_err(|e| {
            BrowserError::TimeoutError(format!("waiting for selector '{}': {}", selector, e))
        })
    }

    async fn count(&self, query: &ElementQuery) -> Result<usize> {
        let value = self.run(&javascript::count_script(query), Some(query.value()))?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    async fn is_visible(&self, element: &ElementHandle) -> Result<bool> {
        let value = self.run_on(element, javascript::VISIBILITY_BODY)?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool> {
        let value = self.run_on(element, javascript::ENABLED_BODY)?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn perform(
        &self,
        element: &ElementHandle,
        action: ElementAction,
    ) -> Result<Option<String>> {
        match action {
            ElementAction::Click => {
                let target = self.click_target(element)?;
                if !target.receives {
                    return Err(BrowserError::ActionFailed {
                        action: action.name().to_string(),
                        strategy: element.strategy,
                        locator: element.locator.clone(),
                        reason: format!(
                            "click intercepted by {}",
                            target.hit.as_deref().unwrap_or("nothing")
                        ),
                    });
                }
                let (x, y) = target.rect.center();
                self.tab.click_point(Point { x, y })?;
            }
            ElementAction::Hover => {
                let (x, y) = self.click_target(element)?.rect.center();
                self.tab.move_mouse_to_point(Point { x, y })?;
            }
            ElementAction::Focus => {
                self.run_on(element, javascript::FOCUS_BODY)?;
            }
            ElementAction::ScrollIntoView => {
                self.run_on(element, javascript::SCROLL_BODY)?;
            }
            ElementAction::Clear => {
                self.run_on(element, javascript::CLEAR_BODY)?;
            }
            ElementAction::Fill(text) => {
                self.run_on(element, javascript::CLEAR_BODY)?;
                if !text.is_empty() {
                    self.tab.send_character(&text)?;
                }
            }
            ElementAction::PressKey(key) => {
                self.run_on(element, javascript::FOCUS_BODY)?;
                self.type_key(&key)?;
            }
            ElementAction::ReadText => {
                let text = self.run_on(element, javascript::INNER_TEXT_SCRIPT)?;
                return Ok(text.as_str().map(str::to_string));
            }
            ElementAction::ReadAttribute(name) => {
                let value = self.run_on(element, &javascript::read_attribute_body(&name))?;
                return Ok(value.as_str().map(str::to_string));
            }
        }
        Ok(None)
    }

    async fn evaluate(&self, script: &str, target: Option<&ElementHandle>) -> Result<Value> {
        match target {
            Some(element) => self.run_on(element, script),
            None => self.run(&javascript::page_script(script), None),
        }
    }

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        self.tab.set_default_timeout(timeout);

        self.tab
            .navigate_to(url)
            .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;

        Ok(())
    }

    async fn go_back(&self) -> Result<()> {
        self.run(&javascript::page_script("history.back()"), None)?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        self.tab
            .reload(false, None)
            .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.tab.get_url())
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        self.type_key(key)
    }
}
