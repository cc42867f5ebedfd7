use crate::core::selector::xpath_expression;
use crate::core::{
    poll_until, InteractionConfig, Multiplicity, PageDriver, PollOptions, Polled, SelectorStrategy,
};
use crate::errors::{BrowserError, OperationContext, Result};
use crate::types::{ElementAction, ElementHandle, ElementState};
use crate::utils::javascript;
use rand::Rng;
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Resolves (strategy, locator) pairs against one page and performs
/// readiness-gated actions on the result.
pub struct InteractionDriver<P: PageDriver> {
    page: P,
    config: InteractionConfig,
}

impl<P: PageDriver> InteractionDriver<P> {
    pub fn new(page: P) -> Self {
        Self::with_config(page, InteractionConfig::default())
    }

    pub fn with_config(page: P, config: InteractionConfig) -> Self {
        Self { page, config }
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    /// Finds elements based on the provided strategy and locator.
    pub async fn find_by_strategy(
        &self,
        strategy: SelectorStrategy,
        locator: &str,
        multiplicity: Multiplicity,
    ) -> Result<Vec<ElementHandle>> {
        self.resolve(strategy, locator, multiplicity, None).await
    }

    /// Like [`find_by_strategy`](Self::find_by_strategy), with the strategy
    /// given by name. Unknown names fail before anything is looked up.
    pub async fn resolve_named(
        &self,
        strategy: &str,
        locator: &str,
        multiplicity: Multiplicity,
    ) -> Result<Vec<ElementHandle>> {
        let strategy: SelectorStrategy = strategy.parse()?;
        self.find_by_strategy(strategy, locator, multiplicity).await
    }

    pub async fn find(&self, strategy: SelectorStrategy, locator: &str) -> Result<ElementHandle> {
        self.find_by_strategy(strategy, locator, Multiplicity::Single)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| not_found(strategy, locator, "no element matched"))
    }

    pub async fn find_all(
        &self,
        strategy: SelectorStrategy,
        locator: &str,
    ) -> Result<Vec<ElementHandle>> {
        self.find_by_strategy(strategy, locator, Multiplicity::All)
            .await
    }

    /// Waits for a CSS or XPath selector to attach, then returns its matches.
    /// `timeout` defaults to the configured selector timeout.
    pub async fn find_by_selector(
        &self,
        selector: &str,
        multiplicity: Multiplicity,
        timeout: Option<Duration>,
    ) -> Result<Vec<ElementHandle>> {
        let strategy = if xpath_expression(selector).is_some() {
            SelectorStrategy::PathQuery
        } else {
            SelectorStrategy::Structural
        };
        self.resolve_selector(strategy, selector, multiplicity, timeout)
            .await
    }

    async fn resolve(
        &self,
        strategy: SelectorStrategy,
        locator: &str,
        multiplicity: Multiplicity,
        timeout: Option<Duration>,
    ) -> Result<Vec<ElementHandle>> {
        if strategy.waits_for_attachment() {
            self.resolve_selector(strategy, locator, multiplicity, timeout)
                .await
        } else {
            self.resolve_content(strategy, locator, multiplicity).await
        }
    }

    async fn resolve_selector(
        &self,
        strategy: SelectorStrategy,
        selector: &str,
        multiplicity: Multiplicity,
        timeout: Option<Duration>,
    ) -> Result<Vec<ElementHandle>> {
        let timeout = timeout.unwrap_or_else(|| self.config.selector_timeout());

        self.page
            .wait_for_selector(selector, timeout)
            .await
            .map_err(|e| lookup_failure(strategy, selector, e))?;

        let count = self
            .page
            .count(&strategy.query(selector))
            .await
            .map_err(|e| lookup_failure(strategy, selector, e))?;

        handles_for(strategy, selector, count, multiplicity)
            .ok_or_else(|| not_found(strategy, selector, "element detached after it was attached"))
    }

    async fn resolve_content(
        &self,
        strategy: SelectorStrategy,
        locator: &str,
        multiplicity: Multiplicity,
    ) -> Result<Vec<ElementHandle>> {
        let count = self
            .page
            .count(&strategy.query(locator))
            .await
            .map_err(|e| lookup_failure(strategy, locator, e))?;

        handles_for(strategy, locator, count, multiplicity)
            .ok_or_else(|| not_found(strategy, locator, "no element matched"))
    }

    /// Visibility and enabled state, queried concurrently.
    pub async fn element_state(&self, element: &ElementHandle) -> Result<ElementState> {
        let (visible, enabled) = tokio::join!(
            self.page.is_visible(element),
            self.page.is_enabled(element)
        );
        Ok(ElementState {
            visible: visible?,
            enabled: enabled?,
        })
    }

    /// Waits until the element is both visible and enabled, using the
    /// configured timeout and polling interval.
    pub async fn wait_until_visible_and_enabled(
        &self,
        strategy: SelectorStrategy,
        locator: &str,
    ) -> Result<()> {
        let options = self.config.ready_poll();
        self.wait_until_visible_and_enabled_with(strategy, locator, &options)
            .await
    }

    pub async fn wait_until_visible_and_enabled_with(
        &self,
        strategy: SelectorStrategy,
        locator: &str,
        options: &PollOptions,
    ) -> Result<()> {
        let deadline = Instant::now() + options.timeout;
        let selector_timeout = self.config.selector_timeout();

        let polled = poll_until(options, || async move {
            // Attachment waits never outlive the readiness deadline.
            let remaining = deadline.saturating_duration_since(Instant::now());
            let element = self
                .resolve(
                    strategy,
                    locator,
                    Multiplicity::Single,
                    Some(remaining.min(selector_timeout)),
                )
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| not_found(strategy, locator, "no element matched"))?;

            let state = self.element_state(&element).await?;
            Ok::<_, BrowserError>(state.is_ready().then_some(()))
        })
        .await?;

        match polled {
            Polled::Ready {
                attempts, elapsed, ..
            } => {
                debug!(
                    "{} : {} ready after {} attempt(s) in {:?}",
                    strategy, locator, attempts, elapsed
                );
                Ok(())
            }
            Polled::Exhausted { last_error, .. } => {
                if let Some(err) = last_error {
                    warn!("Element is not visible: {}", err);
                }
                Err(BrowserError::NotReady {
                    strategy,
                    locator: locator.to_string(),
                    timeout_ms: options.timeout_ms(),
                })
            }
        }
    }

    /// Polls visibility alone on a decrementing budget. Running out of
    /// budget is not an error; callers check visibility afterwards.
    pub async fn dynamic_wait_for_element(
        &self,
        strategy: SelectorStrategy,
        locator: &str,
        budget_ms: u64,
        interval_ms: u64,
    ) -> Result<()> {
        let options = PollOptions::decrementing(budget_ms, interval_ms);
        let polled = poll_until(&options, || async {
            let element = self.find(strategy, locator).await?;
            let visible = self.page.is_visible(&element).await?;
            Ok::<_, BrowserError>(visible.then_some(()))
        })
        .await
        .during("dynamically waiting for element")?;

        if !polled.is_ready() {
            debug!(
                "{} : {} still not visible after {} ms budget",
                strategy, locator, budget_ms
            );
        }
        Ok(())
    }

    /// Delays execution for the given number of milliseconds.
    pub async fn delay(&self, ms: u64) {
        self.page.delay(Duration::from_millis(ms)).await;
    }

    /// Sleeps for a random 1..=`max_ms` milliseconds and returns how long.
    pub async fn random_delay(&self, max_ms: u64) -> Duration {
        if max_ms == 0 {
            return Duration::ZERO;
        }
        let ms = rand::thread_rng().gen_range(1..=max_ms);
        self.delay(ms).await;
        Duration::from_millis(ms)
    }

    pub async fn scroll_into_view(&self, strategy: SelectorStrategy, locator: &str) -> Result<()> {
        let result: Result<()> = async {
            let element = self.find(strategy, locator).await?;
            self.page
                .perform(&element, ElementAction::ScrollIntoView)
                .await?;
            Ok::<_, BrowserError>(())
        }
        .await;
        result.during("scrolling element into view")
    }

    /// Natively fills the field once it is ready, optionally clearing it first.
    pub async fn send_keys(
        &self,
        strategy: SelectorStrategy,
        locator: &str,
        text: &str,
        clear: bool,
    ) -> Result<ElementHandle> {
        let result: Result<ElementHandle> = async {
            let element = self.find(strategy, locator).await?;
            self.wait_until_visible_and_enabled(strategy, locator)
                .await?;

            if clear {
                self.page.perform(&element, ElementAction::Clear).await?;
            }
            self.page
                .perform(&element, ElementAction::Fill(text.to_string()))
                .await?;
            Ok::<_, BrowserError>(element)
        }
        .await;
        result.during("sending keys to element")
    }

    /// Sets the field value through script, with settle pauses between steps.
    pub async fn send_keys_via_script(
        &self,
        strategy: SelectorStrategy,
        locator: &str,
        text: &str,
    ) -> Result<ElementHandle> {
        let result: Result<ElementHandle> = async {
            let element = self.find(strategy, locator).await?;
            self.wait_until_visible_and_enabled(strategy, locator)
                .await?;

            self.delay(self.config.script_settle_ms).await;
            self.page
                .evaluate(&javascript::set_value_script(""), Some(&element))
                .await?;
            self.delay(self.config.script_settle_ms).await;
            self.page
                .evaluate(&javascript::set_value_script(text), Some(&element))
                .await?;
            Ok::<_, BrowserError>(element)
        }
        .await;
        result.during("sending keys to element using JavaScript")
    }

    /// Types one key at a time with a human-like cadence. The element is
    /// re-resolved before every key.
    pub async fn slow_type(
        &self,
        strategy: SelectorStrategy,
        locator: &str,
        text: &str,
    ) -> Result<ElementHandle> {
        let typing = &self.config.typing;
        let result: Result<ElementHandle> = async {
            self.delay(typing.initial_delay_ms).await;
            let element = self.find(strategy, locator).await?;
            self.page
                .perform(&element, ElementAction::Fill(String::new()))
                .await?;

            let chars: Vec<char> = text.chars().collect();
            let mut typed = String::with_capacity(text.len());
            for (index, ch) in chars.iter().enumerate() {
                let current = self.find(strategy, locator).await?;
                typed.push(*ch);
                self.page
                    .perform(&current, ElementAction::PressKey(ch.to_string()))
                    .await?;
                self.page
                    .delay(typing.key_delay(index, chars.len()))
                    .await;
                self.random_delay(typing.jitter_max_ms).await;
            }

            info!("slow typed text is: {}", typed);
            Ok::<_, BrowserError>(element)
        }
        .await;
        result.during("typing text slowly")
    }

    /// Runs script in the page, optionally against an element
    /// (available to the script as `arguments[0]`).
    pub async fn execute_script(
        &self,
        script: &str,
        target: Option<&ElementHandle>,
    ) -> Result<Value> {
        self.page
            .evaluate(script, target)
            .await
            .during("executing JavaScript")
    }

    pub async fn get_text(&self, strategy: SelectorStrategy, locator: &str) -> Result<String> {
        let result: Result<String> = async {
            let element = self.find(strategy, locator).await?;
            let text = self.page.perform(&element, ElementAction::ReadText).await?;
            Ok::<_, BrowserError>(text.unwrap_or_default())
        }
        .await;
        result.during("getting inner text of element")
    }

    /// Native click, gated on readiness.
    pub async fn click(&self, strategy: SelectorStrategy, locator: &str) -> Result<()> {
        let result: Result<()> = async {
            self.wait_until_visible_and_enabled(strategy, locator)
                .await?;
            let element = self.find(strategy, locator).await?;
            self.page.perform(&element, ElementAction::Click).await?;
            Ok::<_, BrowserError>(())
        }
        .await;
        result.during("clicking element")
    }

    /// Script-dispatched click, gated on readiness.
    pub async fn click_via_script(&self, strategy: SelectorStrategy, locator: &str) -> Result<()> {
        let result: Result<()> = async {
            let element = self.find(strategy, locator).await?;
            self.wait_until_visible_and_enabled(strategy, locator)
                .await?;
            self.page
                .evaluate(javascript::CLICK_SCRIPT, Some(&element))
                .await?;
            Ok::<_, BrowserError>(())
        }
        .await;
        result.during("clicking element using JavaScript")
    }

    pub async fn hover(&self, strategy: SelectorStrategy, locator: &str) -> Result<()> {
        let result: Result<()> = async {
            let element = self.find(strategy, locator).await?;
            self.page.perform(&element, ElementAction::Hover).await?;
            Ok::<_, BrowserError>(())
        }
        .await;
        result.during("performing hover action")
    }

    pub async fn get_attribute_value(
        &self,
        strategy: SelectorStrategy,
        locator: &str,
        attribute: &str,
    ) -> Result<Option<String>> {
        let result: Result<Option<String>> = async {
            let element = self.find(strategy, locator).await?;
            self.page
                .perform(&element, ElementAction::ReadAttribute(attribute.to_string()))
                .await
        }
        .await;
        result.during("getting an attribute value")
    }

    /// Waits for readiness, then reports visibility.
    pub async fn is_element_visible(
        &self,
        strategy: SelectorStrategy,
        locator: &str,
    ) -> Result<bool> {
        let result: Result<bool> = async {
            self.wait_until_visible_and_enabled(strategy, locator)
                .await?;
            let element = self.find(strategy, locator).await?;
            self.page.is_visible(&element).await
        }
        .await;
        result.during("checking element visibility")
    }

    pub async fn refresh(&self) -> Result<()> {
        self.page.reload().await.during("refreshing page")
    }

    pub async fn navigate(&self, url: &str) -> Result<()> {
        info!("Navigating to {}", url);
        self.page
            .navigate(url, self.config.navigation_timeout())
            .await
            .map_err(|e| e.during(format!("navigating to {}", url)))
    }

    pub async fn navigate_back(&self) -> Result<()> {
        self.page.go_back().await.during("navigating back")
    }

    /// Presses a key on the focused element, e.g. `Enter`.
    pub async fn press_key(&self, key: &str) -> Result<()> {
        self.page.press_key(key).await.during("pressing key")
    }

    /// Waits for `body` to attach and become visible.
    pub async fn wait_for_page_load(&self, timeout: Duration) -> Result<()> {
        let result: Result<()> = async {
            let body = self
                .resolve_selector(
                    SelectorStrategy::Structural,
                    "body",
                    Multiplicity::Single,
                    Some(timeout),
                )
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| not_found(SelectorStrategy::Structural, "body", "no body"))?;

            let options = PollOptions::new(timeout.as_millis() as u64, self.config.poll_interval_ms);
            let polled = poll_until(&options, || async {
                Ok::<_, BrowserError>(self.page.is_visible(&body).await?.then_some(()))
            })
            .await?;

            if polled.is_ready() {
                Ok(())
            } else {
                Err(BrowserError::NavigationFailed(format!(
                    "page body not visible within {} ms",
                    timeout.as_millis()
                )))
            }
        }
        .await;
        result.during("waiting for page to load")
    }

    pub async fn current_url(&self) -> Result<String> {
        let result: Result<String> = async {
            self.wait_for_page_load(Duration::from_millis(self.config.page_load_timeout_ms))
                .await?;
            self.page.current_url().await
        }
        .await;
        result.during("getting current URL")
    }
}

fn not_found(strategy: SelectorStrategy, locator: &str, reason: impl ToString) -> BrowserError {
    BrowserError::ElementNotFound {
        strategy,
        locator: locator.to_string(),
        reason: reason.to_string(),
    }
}

/// Malformed locators keep their own error so polling gives up on them.
fn lookup_failure(strategy: SelectorStrategy, locator: &str, err: BrowserError) -> BrowserError {
    if err.is_permanent() {
        err
    } else {
        not_found(strategy, locator, err)
    }
}

fn handles_for(
    strategy: SelectorStrategy,
    locator: &str,
    count: usize,
    multiplicity: Multiplicity,
) -> Option<Vec<ElementHandle>> {
    if count == 0 {
        return None;
    }
    let wanted = match multiplicity {
        Multiplicity::Single => 1,
        Multiplicity::All => count,
    };
    Some(
        (0..wanted)
            .map(|index| ElementHandle::new(strategy, locator, index))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::testing::{ActionKind, MockPage};
    use tokio_test::{assert_err, assert_ok};

    const FIXTURE: &str = r#"
        <html><body>
          <form id="signup">
            <label for="email">Email address</label>
            <input id="email" placeholder="you@example.com" data-testid="email-input">
            <input id="search" aria-label="Search" placeholder="Search the blog">
            <button id="submit" hidden>Submit</button>
            <button id="cancel" disabled>Cancel</button>
            <img id="logo" alt="Company logo" src="logo.png">
            <a id="docs" href="/docs" title="Documentation">Docs</a>
          </form>
          <ul><li class="item">One</li><li class="item">Two</li><li class="item">Three</li></ul>
        </body></html>
    "#;

    fn driver(page: MockPage) -> InteractionDriver<MockPage> {
        InteractionDriver::new(page)
    }

    #[tokio::test(start_paused = true)]
    async fn structural_miss_fails_after_selector_timeout() {
        let driver = driver(MockPage::from_html(FIXTURE));
        let started = Instant::now();

        let err = driver
            .find(SelectorStrategy::Structural, "#missing")
            .await
            .unwrap_err();

        let elapsed = started.elapsed();
        assert!(err.is_not_found());
        assert!(elapsed >= Duration::from_millis(30_000), "{:?}", elapsed);
        assert!(elapsed < Duration::from_millis(30_100), "{:?}", elapsed);
        assert!(err
            .to_string()
            .starts_with("Could not load element with given selector: #missing"));
    }

    #[tokio::test(start_paused = true)]
    async fn selector_timeout_can_be_overridden() {
        let driver = driver(MockPage::from_html(FIXTURE));
        let started = Instant::now();

        let err = driver
            .find_by_selector("#missing", Multiplicity::Single, Some(Duration::from_millis(1_500)))
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(started.elapsed(), Duration::from_millis(1_500));
    }

    #[tokio::test(start_paused = true)]
    async fn path_queries_resolve_against_the_document() {
        let driver = driver(MockPage::from_html(FIXTURE));

        let items = driver
            .find_all(SelectorStrategy::PathQuery, "//li[@class='item']")
            .await
            .unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(
            driver
                .get_text(SelectorStrategy::PathQuery, "(//li[@class='item'])[2]")
                .await
                .unwrap(),
            "Two"
        );

        driver
            .click(SelectorStrategy::PathQuery, "//input[@aria-label='Search']")
            .await
            .unwrap();
        assert_eq!(driver.page().click_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn path_query_miss_fails_after_selector_timeout() {
        let driver = driver(MockPage::from_html(FIXTURE));
        let started = Instant::now();

        let err = driver
            .find(SelectorStrategy::PathQuery, "//button[@id='go']")
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(started.elapsed(), Duration::from_millis(30_000));
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_locators_are_not_found_without_waiting() {
        let driver = driver(MockPage::from_html(FIXTURE));

        for (strategy, locator) in [
            (SelectorStrategy::Structural, "button["),
            (SelectorStrategy::PathQuery, "//button[@id="),
        ] {
            let started = Instant::now();
            let err = driver.find(strategy, locator).await.unwrap_err();

            assert_eq!(err.kind(), ErrorKind::NotFound, "{}", err);
            assert!(err.to_string().contains("invalid selector syntax"));
            assert_eq!(started.elapsed(), Duration::ZERO);

            let err = driver.click(strategy, locator).await.unwrap_err();
            assert!(err.is_not_found());
            assert_eq!(started.elapsed(), Duration::ZERO);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn content_strategies_fail_without_waiting() {
        let driver = driver(MockPage::from_html(FIXTURE));

        for strategy in SelectorStrategy::ALL
            .into_iter()
            .filter(|s| !s.waits_for_attachment())
        {
            let started = Instant::now();
            let err = driver.find(strategy, "nothing like this").await.unwrap_err();
            assert!(err.is_not_found(), "{} -> {}", strategy, err);
            assert_eq!(started.elapsed(), Duration::ZERO);
            assert!(err
                .to_string()
                .contains(&format!("with given {}", strategy.criterion())));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_strategy_name_fails_immediately() {
        let driver = driver(MockPage::from_html(FIXTURE));
        let started = Instant::now();

        let err = driver
            .resolve_named("shadow", "#email", Multiplicity::Single)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(started.elapsed(), Duration::ZERO);

        let found = driver
            .resolve_named("placeholder", "you@example", Multiplicity::Single)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn multiplicity_controls_handle_count() {
        let driver = driver(MockPage::from_html(FIXTURE));

        let all = driver
            .find_all(SelectorStrategy::Structural, "li.item")
            .await
            .unwrap();
        assert_eq!(all.iter().map(|h| h.index).collect::<Vec<_>>(), vec![0, 1, 2]);

        let single = driver
            .find_by_strategy(SelectorStrategy::Structural, "li.item", Multiplicity::Single)
            .await
            .unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(
            driver.get_text(SelectorStrategy::Structural, "li.item").await.unwrap(),
            "One"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn every_content_strategy_resolves_its_target() {
        let driver = driver(MockPage::from_html(FIXTURE));
        let cases = [
            (SelectorStrategy::VisibleText, "Docs", "docs"),
            (SelectorStrategy::AccessibleLabel, "Email address", "email"),
            (SelectorStrategy::AccessibleLabel, "search", "search"),
            (SelectorStrategy::PlaceholderText, "Search the blog", "search"),
            (SelectorStrategy::AlternateText, "company logo", "logo"),
            (SelectorStrategy::TitleAttribute, "Documentation", "docs"),
            (SelectorStrategy::TestIdentifier, "email-input", "email"),
        ];

        for (strategy, locator, id) in cases {
            let found = driver
                .get_attribute_value(strategy, locator, "id")
                .await
                .unwrap();
            assert_eq!(found.as_deref(), Some(id), "{} : {}", strategy, locator);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ready_element_passes_on_first_cycle() {
        let driver = driver(MockPage::from_html(FIXTURE));
        let started = Instant::now();

        assert_ok!(
            driver
                .wait_until_visible_and_enabled(SelectorStrategy::Structural, "#email")
                .await
        );
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn hidden_text_element_becomes_ready_once_revealed() {
        let page = MockPage::from_html(FIXTURE).reveal_after("#submit", 800);
        let driver = driver(page);
        let started = Instant::now();

        driver
            .wait_until_visible_and_enabled_with(
                SelectorStrategy::VisibleText,
                "Submit",
                &PollOptions::new(2_000, 500),
            )
            .await
            .unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(1_000), "{:?}", elapsed);
        assert!(elapsed <= Duration::from_millis(1_500), "{:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_element_times_out_as_not_ready() {
        let driver = driver(MockPage::from_html(FIXTURE));

        let err = driver
            .wait_until_visible_and_enabled_with(
                SelectorStrategy::VisibleText,
                "Cancel",
                &PollOptions::new(2_000, 500),
            )
            .await
            .unwrap_err();

        assert!(err.is_not_ready());
        assert!(err
            .to_string()
            .starts_with("Element not visible and enabled within 2000 ms"));
    }

    #[tokio::test(start_paused = true)]
    async fn readiness_for_missing_selector_respects_its_own_deadline() {
        let driver = driver(MockPage::from_html(FIXTURE));
        let started = Instant::now();

        let err = driver
            .wait_until_visible_and_enabled_with(
                SelectorStrategy::Structural,
                "#missing",
                &PollOptions::new(3_000, 500),
            )
            .await
            .unwrap_err();

        assert!(err.is_not_ready());
        assert!(started.elapsed() <= Duration::from_millis(3_500));
    }

    #[tokio::test(start_paused = true)]
    async fn click_waits_until_enabled() {
        let page = MockPage::from_html(FIXTURE).enable_after("#cancel", 1_200);
        let driver = driver(page);

        driver
            .click(SelectorStrategy::Structural, "#cancel")
            .await
            .unwrap();

        let clicks = driver.page().actions_of(|k| *k == ActionKind::NativeClick).await;
        assert_eq!(clicks.len(), 1);
        assert!(clicks[0].at >= Duration::from_millis(1_200));
    }

    #[tokio::test(start_paused = true)]
    async fn native_click_failure_is_reported_as_action_failed() {
        let page = MockPage::from_html(FIXTURE).obscure("#email");
        let driver = driver(page);

        let err = driver
            .click(SelectorStrategy::Structural, "#email")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ActionFailed);
        assert!(err.to_string().starts_with("Error clicking element"));
        assert_eq!(driver.page().click_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn send_keys_clears_then_fills() {
        let driver = driver(MockPage::from_html(FIXTURE));

        let handle = driver
            .send_keys(SelectorStrategy::PlaceholderText, "you@example.com", "ada@example.com", true)
            .await
            .unwrap();

        assert_eq!(handle.strategy, SelectorStrategy::PlaceholderText);
        assert_eq!(driver.page().value_of("#email").await.as_deref(), Some("ada@example.com"));
        let kinds: Vec<ActionKind> = driver.page().actions().await.into_iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            vec![ActionKind::Clear, ActionKind::Fill("ada@example.com".into())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn send_keys_without_clear_only_fills() {
        let driver = driver(MockPage::from_html(FIXTURE));

        driver
            .send_keys(SelectorStrategy::Structural, "#email", "x", false)
            .await
            .unwrap();

        let clears = driver.page().actions_of(|k| *k == ActionKind::Clear).await;
        assert!(clears.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn script_typing_escapes_text_and_settles_between_steps() {
        let driver = driver(MockPage::from_html(FIXTURE));
        let text = r#"it's "quoted" \ text"#;
        let started = Instant::now();

        driver
            .send_keys_via_script(SelectorStrategy::Structural, "#search", text)
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_millis(400));
        assert_eq!(driver.page().value_of("#search").await.as_deref(), Some(text));
        let writes: Vec<ActionKind> = driver
            .page()
            .actions_of(|k| matches!(k, ActionKind::ScriptValue(_)))
            .await
            .into_iter()
            .map(|a| a.kind)
            .collect();
        assert_eq!(
            writes,
            vec![
                ActionKind::ScriptValue(String::new()),
                ActionKind::ScriptValue(text.to_string())
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn slow_type_presses_each_key_with_cadence() {
        let driver = driver(MockPage::from_html(FIXTURE));
        let text = "abcdefghij";

        driver
            .slow_type(SelectorStrategy::AccessibleLabel, "Search", text)
            .await
            .unwrap();

        let presses = driver.page().key_presses().await;
        assert_eq!(presses.len(), 10);
        assert!(presses[0].0 >= Duration::from_millis(2_000));

        let typing = &driver.config().typing;
        for (index, pair) in presses.windows(2).enumerate() {
            let gap = pair[1].0 - pair[0].0;
            let scheduled = typing.key_delay(index, text.len());
            assert!(scheduled > Duration::ZERO);
            assert!(gap > scheduled, "gap {:?} at {}", gap, index);
            assert!(gap <= scheduled + Duration::from_millis(typing.jitter_max_ms));
        }
        assert_eq!(typing.key_delay(9, 10), Duration::ZERO);
        assert_eq!(driver.page().value_of("#search").await.as_deref(), Some(text));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_type_on_missing_element_propagates() {
        let driver = driver(MockPage::from_html(FIXTURE));

        let err = assert_err!(
            driver
                .slow_type(SelectorStrategy::TestIdentifier, "nope", "abc")
                .await
        );
        assert!(err.is_not_found());
        assert!(err.to_string().starts_with("Error typing text slowly"));
    }

    #[tokio::test(start_paused = true)]
    async fn random_delay_stays_within_bounds() {
        let driver = driver(MockPage::from_html(FIXTURE));

        assert_eq!(driver.random_delay(0).await, Duration::ZERO);
        for _ in 0..20 {
            let slept = driver.random_delay(50).await;
            assert!(slept >= Duration::from_millis(1));
            assert!(slept <= Duration::from_millis(50));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn dynamic_wait_exits_once_visible() {
        let page = MockPage::from_html(FIXTURE).reveal_after("#submit", 700);
        let driver = driver(page);
        let started = Instant::now();

        driver
            .dynamic_wait_for_element(SelectorStrategy::Structural, "#submit", 3_000, 250)
            .await
            .unwrap();

        assert_eq!(started.elapsed(), Duration::from_millis(750));
    }

    #[tokio::test(start_paused = true)]
    async fn dynamic_wait_runs_out_of_budget_silently() {
        let driver = driver(MockPage::from_html(FIXTURE));
        let started = Instant::now();

        driver
            .dynamic_wait_for_element(SelectorStrategy::VisibleText, "Submit", 1_000, 250)
            .await
            .unwrap();

        assert_eq!(started.elapsed(), Duration::from_millis(1_000));
        let element = driver.find(SelectorStrategy::VisibleText, "Submit").await.unwrap();
        assert!(!driver.page().is_visible(&element).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn dynamic_wait_rejects_a_zero_interval() {
        let driver = driver(MockPage::from_html(FIXTURE));

        let outcome = tokio::time::timeout(
            Duration::from_secs(2),
            driver.dynamic_wait_for_element(SelectorStrategy::Structural, "#late", 100, 0),
        )
        .await;

        let err = outcome.expect("zero interval must not spin").unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("poll interval must be greater than zero"));
    }

    #[tokio::test(start_paused = true)]
    async fn navigation_history_and_current_url() {
        let driver = driver(MockPage::from_html(FIXTURE));

        driver.navigate("https://example.com/a").await.unwrap();
        driver.navigate("https://example.com/b").await.unwrap();
        assert_eq!(driver.current_url().await.unwrap(), "https://example.com/b");

        driver.navigate_back().await.unwrap();
        assert_eq!(driver.current_url().await.unwrap(), "https://example.com/a");

        driver.refresh().await.unwrap();
        let reloads = driver.page().actions_of(|k| *k == ActionKind::Reload).await;
        assert_eq!(reloads.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn execute_script_returns_page_value() {
        let page = MockPage::from_html(FIXTURE)
            .with_script_result("document.title", Value::String("Blog".into()));
        let driver = driver(page);

        let title = driver.execute_script("document.title", None).await.unwrap();
        assert_eq!(title, Value::String("Blog".into()));

        let element = driver.find(SelectorStrategy::Structural, "#docs").await.unwrap();
        let text = driver
            .execute_script(javascript::INNER_TEXT_SCRIPT, Some(&element))
            .await
            .unwrap();
        assert_eq!(text, Value::String("Docs".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn failures_name_the_operation() {
        let driver = driver(MockPage::from_html(FIXTURE));

        let err = driver
            .hover(SelectorStrategy::TitleAttribute, "No such title")
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Error performing hover action"));
        assert!(err.to_string().contains("No such title"));

        let err = driver
            .get_attribute_value(SelectorStrategy::AlternateText, "missing", "src")
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Error getting an attribute value"));
    }

    #[tokio::test(start_paused = true)]
    async fn hover_and_scroll_reach_the_page() {
        let driver = driver(MockPage::from_html(FIXTURE));

        driver.hover(SelectorStrategy::VisibleText, "Docs").await.unwrap();
        driver
            .scroll_into_view(SelectorStrategy::VisibleText, "Docs")
            .await
            .unwrap();

        let kinds: Vec<ActionKind> = driver.page().actions().await.into_iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![ActionKind::Hover, ActionKind::ScrollIntoView]);
    }

    #[tokio::test(start_paused = true)]
    async fn is_element_visible_waits_for_readiness() {
        let page = MockPage::from_html(FIXTURE).reveal_after("#submit", 1_000);
        let driver = driver(page);

        assert!(driver
            .is_element_visible(SelectorStrategy::Structural, "#submit")
            .await
            .unwrap());
    }
}
