//! In-memory page for exercising the interaction layer without a browser.
//!
//! The document is parsed once with `scraper`. Timed behaviours (late
//! attachment, delayed visibility, delayed enabling) are measured on the
//! tokio clock from construction, so tests run under paused time.

use crate::core::selector::xpath_expression;
use crate::core::{ElementQuery, PageDriver};
use crate::errors::{BrowserError, Result};
use crate::types::{ElementAction, ElementHandle};
use crate::utils::javascript;
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use sxd_document::Package;
use sxd_xpath::nodeset::Node as XPathNode;
use sxd_xpath::Value as XPathValue;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::warn;

const SELECTOR_POLL_STEP: Duration = Duration::from_millis(100);

const NON_RENDERED: [&str; 7] = ["head", "script", "style", "title", "meta", "link", "noscript"];

const LABELABLE: [&str; 7] = [
    "input", "select", "textarea", "button", "meter", "output", "progress",
];

/// Something the page was asked to do, stamped with time since construction.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedAction {
    pub at: Duration,
    /// Document-order index of the target node, if there was one.
    pub node: Option<usize>,
    pub kind: ActionKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionKind {
    NativeClick,
    ScriptClick,
    Hover,
    Focus,
    ScrollIntoView,
    Clear,
    Fill(String),
    KeyPress(String),
    ScriptValue(String),
    Script(String),
    Navigate(String),
    Back,
    Reload,
}

#[derive(Debug, Clone)]
struct MockNode {
    tag: String,
    attributes: HashMap<String, String>,
    /// Whitespace-collapsed text content.
    text: String,
    ancestors: Vec<usize>,
}

impl MockNode {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    fn attr_contains(&self, name: &str, needle: &str) -> bool {
        self.attr(name)
            .map_or(false, |value| normalize(value).contains(needle))
    }

    fn statically_hidden(&self) -> bool {
        if self.attributes.contains_key("hidden") {
            return true;
        }
        let style: String = self
            .attr("style")
            .unwrap_or_default()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        style.contains("display:none") || style.contains("visibility:hidden")
    }
}

#[derive(Debug, Clone, Default)]
struct Behavior {
    appears_at: Option<Duration>,
    visible_at: Option<Duration>,
    enabled_at: Option<Duration>,
    obscured: bool,
    rejects_script_click: bool,
}

#[derive(Debug, Default)]
struct MockState {
    url: String,
    history: Vec<String>,
    behaviors: HashMap<usize, Behavior>,
    values: HashMap<usize, String>,
    focused: Option<usize>,
    actions: Vec<RecordedAction>,
    script_results: HashMap<String, Value>,
}

pub struct MockPage {
    html: String,
    nodes: Vec<MockNode>,
    started: Instant,
    state: RwLock<MockState>,
}

impl MockPage {
    pub fn from_html(html: &str) -> Self {
        let document = Html::parse_document(html);
        let elements: Vec<ElementRef> = document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .collect();
        let positions: HashMap<_, usize> = elements
            .iter()
            .enumerate()
            .map(|(index, element)| (element.id(), index))
            .collect();

        let nodes: Vec<MockNode> = elements
            .iter()
            .map(|element| MockNode {
                tag: element.value().name().to_string(),
                attributes: element
                    .value()
                    .attrs()
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect(),
                text: collapse_whitespace(&element.text().collect::<String>()),
                ancestors: element
                    .ancestors()
                    .filter_map(|node| positions.get(&node.id()).copied())
                    .collect(),
            })
            .collect();

        let values = nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.tag == "input")
            .filter_map(|(index, node)| node.attr("value").map(|v| (index, v.to_string())))
            .collect();

        Self {
            html: html.to_string(),
            nodes,
            started: Instant::now(),
            state: RwLock::new(MockState {
                url: "about:blank".to_string(),
                values,
                ..Default::default()
            }),
        }
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.state.get_mut().url = url.to_string();
        self
    }

    /// Nodes matching `css` are detached until `ms` after construction.
    pub fn appear_after(self, css: &str, ms: u64) -> Self {
        self.configure(css, |b| b.appears_at = Some(Duration::from_millis(ms)))
    }

    /// Nodes matching `css` are hidden until `ms`, then shown even if their
    /// markup hides them.
    pub fn reveal_after(self, css: &str, ms: u64) -> Self {
        self.configure(css, |b| b.visible_at = Some(Duration::from_millis(ms)))
    }

    /// Nodes matching `css` are disabled until `ms`, then enabled.
    pub fn enable_after(self, css: &str, ms: u64) -> Self {
        self.configure(css, |b| b.enabled_at = Some(Duration::from_millis(ms)))
    }

    /// Native clicks on matching nodes are intercepted by an overlay.
    pub fn obscure(self, css: &str) -> Self {
        self.configure(css, |b| b.obscured = true)
    }

    pub fn reject_script_clicks(self, css: &str) -> Self {
        self.configure(css, |b| b.rejects_script_click = true)
    }

    pub fn with_script_result(mut self, script: &str, value: Value) -> Self {
        self.state
            .get_mut()
            .script_results
            .insert(script.trim().to_string(), value);
        self
    }

    fn configure(mut self, css: &str, apply: impl Fn(&mut Behavior)) -> Self {
        match css_matches(&self.html, css) {
            Ok(indices) => {
                let state = self.state.get_mut();
                for index in indices {
                    apply(state.behaviors.entry(index).or_default());
                }
            }
            Err(err) => warn!("Ignoring behaviour for '{}': {}", css, err),
        }
        self
    }

    pub async fn actions(&self) -> Vec<RecordedAction> {
        self.state.read().await.actions.clone()
    }

    pub async fn actions_of(&self, filter: impl Fn(&ActionKind) -> bool) -> Vec<RecordedAction> {
        self.state
            .read()
            .await
            .actions
            .iter()
            .filter(|action| filter(&action.kind))
            .cloned()
            .collect()
    }

    /// Native and script clicks combined.
    pub async fn click_count(&self) -> usize {
        self.actions_of(|k| matches!(k, ActionKind::NativeClick | ActionKind::ScriptClick))
            .await
            .len()
    }

    pub async fn key_presses(&self) -> Vec<(Duration, String)> {
        self.state
            .read()
            .await
            .actions
            .iter()
            .filter_map(|action| match &action.kind {
                ActionKind::KeyPress(key) => Some((action.at, key.clone())),
                _ => None,
            })
            .collect()
    }

    /// Current value of the first node matching `css`.
    pub async fn value_of(&self, css: &str) -> Option<String> {
        let index = *css_matches(&self.html, css).ok()?.first()?;
        self.state.read().await.values.get(&index).cloned()
    }

    pub async fn url(&self) -> String {
        self.state.read().await.url.clone()
    }

    pub async fn clear_actions(&self) {
        self.state.write().await.actions.clear();
    }

    fn now(&self) -> Duration {
        self.started.elapsed()
    }

    fn matches(&self, query: &ElementQuery, state: &MockState, now: Duration) -> Result<Vec<usize>> {
        let attached = |index: &usize| self.attached(*index, state, now);

        let matched: Vec<usize> = match query {
            ElementQuery::Selector(selector) => {
                let hits = match xpath_expression(selector) {
                    Some(expr) => xpath_matches(&self.html, selector, expr)?,
                    None => css_matches(&self.html, selector)?,
                };
                hits.into_iter().filter(attached).collect()
            }
            ElementQuery::Text(text) => {
                let needle = normalize(text);
                let hits: Vec<usize> = (0..self.nodes.len())
                    .filter(attached)
                    .filter(|&i| {
                        let node = &self.nodes[i];
                        !matches!(node.tag.as_str(), "html" | "head" | "script" | "style" | "title" | "noscript")
                            && normalize(&node.text).contains(&needle)
                    })
                    .collect();
                // Deepest matches only
                hits.iter()
                    .copied()
                    .filter(|&i| !hits.iter().any(|&other| self.nodes[other].ancestors.contains(&i)))
                    .collect()
            }
            ElementQuery::Label(label) => self
                .label_matches(&normalize(label))
                .into_iter()
                .filter(attached)
                .collect(),
            ElementQuery::Placeholder(value) => self.attr_matches("placeholder", value, attached),
            ElementQuery::AltText(value) => self.attr_matches("alt", value, attached),
            ElementQuery::Title(value) => self.attr_matches("title", value, attached),
            ElementQuery::TestId(value) => (0..self.nodes.len())
                .filter(attached)
                .filter(|&i| self.nodes[i].attr("data-testid") == Some(value.as_str()))
                .collect(),
        };
        Ok(matched)
    }

    fn attr_matches(&self, attr: &str, value: &str, attached: impl Fn(&usize) -> bool) -> Vec<usize> {
        let needle = normalize(value);
        (0..self.nodes.len())
            .filter(|i| attached(i))
            .filter(|&i| self.nodes[i].attr_contains(attr, &needle))
            .collect()
    }

    fn label_matches(&self, needle: &str) -> Vec<usize> {
        let mut found = HashSet::new();
        for (index, node) in self.nodes.iter().enumerate() {
            if node.attr_contains("aria-label", needle) {
                found.insert(index);
            }
            if let Some(ids) = node.attr("aria-labelledby") {
                let labelled = ids.split_whitespace().any(|id| {
                    self.by_id(id)
                        .map_or(false, |r| normalize(&self.nodes[r].text).contains(needle))
                });
                if labelled {
                    found.insert(index);
                }
            }
            if node.tag == "label" && normalize(&node.text).contains(needle) {
                if let Some(control) = self.label_control(index) {
                    found.insert(control);
                }
            }
        }
        let mut found: Vec<usize> = found.into_iter().collect();
        found.sort_unstable();
        found
    }

    fn label_control(&self, label: usize) -> Option<usize> {
        let is_labelable = |i: &usize| LABELABLE.contains(&self.nodes[*i].tag.as_str());
        match self.nodes[label].attr("for") {
            Some(target) => self.by_id(target).filter(is_labelable),
            None => (label + 1..self.nodes.len())
                .filter(|&i| self.nodes[i].ancestors.contains(&label))
                .find(is_labelable),
        }
    }

    fn by_id(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.attr("id") == Some(id))
    }

    fn attached(&self, index: usize, state: &MockState, now: Duration) -> bool {
        self.lineage(index).all(|i| {
            state
                .behaviors
                .get(&i)
                .and_then(|b| b.appears_at)
                .map_or(true, |at| now >= at)
        })
    }

    fn shown(&self, index: usize, state: &MockState, now: Duration) -> bool {
        if NON_RENDERED.contains(&self.nodes[index].tag.as_str()) {
            return false;
        }
        self.attached(index, state, now)
            && self.lineage(index).all(|i| {
                match state.behaviors.get(&i).and_then(|b| b.visible_at) {
                    Some(at) => now >= at,
                    None => !self.nodes[i].statically_hidden(),
                }
            })
    }

    fn enabled(&self, index: usize, state: &MockState, now: Duration) -> bool {
        match state.behaviors.get(&index).and_then(|b| b.enabled_at) {
            Some(at) => now >= at,
            None => {
                let node = &self.nodes[index];
                !node.attributes.contains_key("disabled") && node.attr("aria-disabled") != Some("true")
            }
        }
    }

    /// The node followed by its ancestors.
    fn lineage(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::once(index).chain(self.nodes[index].ancestors.iter().copied())
    }

    fn resolve(&self, element: &ElementHandle, state: &MockState, now: Duration) -> Result<usize> {
        self.matches(&element.query, state, now)?
            .get(element.index)
            .copied()
            .ok_or_else(|| BrowserError::ElementNotFound {
                strategy: element.strategy,
                locator: element.locator.clone(),
                reason: "element is not attached to the document".to_string(),
            })
    }

    fn record(&self, state: &mut MockState, node: Option<usize>, kind: ActionKind) {
        state.actions.push(RecordedAction {
            at: self.now(),
            node,
            kind,
        });
    }
}

#[async_trait]
impl PageDriver for MockPage {
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        let query = ElementQuery::Selector(selector.to_string());
        let deadline = Instant::now() + timeout;

        loop {
            let found = {
                let state = self.state.read().await;
                !self.matches(&query, &state, self.now())?.is_empty()
            };
            if found {
                return Ok(());
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(BrowserError::TimeoutError(format!(
                    "waiting for selector '{}' exceeded {} ms",
                    selector,
                    timeout.as_millis()
                )));
            }
            tokio::time::sleep(SELECTOR_POLL_STEP.min(deadline - now)).await;
        }
    }

    async fn count(&self, query: &ElementQuery) -> Result<usize> {
        let state = self.state.read().await;
        Ok(self.matches(query, &state, self.now())?.len())
    }

    async fn is_visible(&self, element: &ElementHandle) -> Result<bool> {
        let state = self.state.read().await;
        let now = self.now();
        let index = self.resolve(element, &state, now)?;
        Ok(self.shown(index, &state, now))
    }

    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool> {
        let state = self.state.read().await;
        let now = self.now();
        let index = self.resolve(element, &state, now)?;
        Ok(self.enabled(index, &state, now))
    }

    async fn perform(
        &self,
        element: &ElementHandle,
        action: ElementAction,
    ) -> Result<Option<String>> {
        let mut state = self.state.write().await;
        let now = self.now();
        let index = self.resolve(element, &state, now)?;
        let rejected = |reason: &str| BrowserError::ActionFailed {
            action: action.name().to_string(),
            strategy: element.strategy,
            locator: element.locator.clone(),
            reason: reason.to_string(),
        };

        match &action {
            ElementAction::Click => {
                if !self.shown(index, &state, now) {
                    return Err(rejected("element is not visible"));
                }
                if !self.enabled(index, &state, now) {
                    return Err(rejected("element is disabled"));
                }
                if state.behaviors.get(&index).map_or(false, |b| b.obscured) {
                    return Err(rejected("click intercepted by div"));
                }
                state.focused = Some(index);
                self.record(&mut state, Some(index), ActionKind::NativeClick);
            }
            ElementAction::Hover => {
                if !self.shown(index, &state, now) {
                    return Err(rejected("element is not visible"));
                }
                self.record(&mut state, Some(index), ActionKind::Hover);
            }
            ElementAction::Focus => {
                state.focused = Some(index);
                self.record(&mut state, Some(index), ActionKind::Focus);
            }
            ElementAction::ScrollIntoView => {
                self.record(&mut state, Some(index), ActionKind::ScrollIntoView);
            }
            ElementAction::Clear => {
                state.values.insert(index, String::new());
                state.focused = Some(index);
                self.record(&mut state, Some(index), ActionKind::Clear);
            }
            ElementAction::Fill(text) => {
                if !self.enabled(index, &state, now) {
                    return Err(rejected("element is disabled"));
                }
                state.values.insert(index, text.clone());
                state.focused = Some(index);
                self.record(&mut state, Some(index), ActionKind::Fill(text.clone()));
            }
            ElementAction::PressKey(key) => {
                state.focused = Some(index);
                apply_key(state.values.entry(index).or_default(), key);
                self.record(&mut state, Some(index), ActionKind::KeyPress(key.clone()));
            }
            ElementAction::ReadText => return Ok(Some(self.nodes[index].text.clone())),
            ElementAction::ReadAttribute(name) => {
                if name == "value" {
                    if let Some(value) = state.values.get(&index) {
                        return Ok(Some(value.clone()));
                    }
                }
                return Ok(self.nodes[index].attributes.get(name).cloned());
            }
        }
        Ok(None)
    }

    async fn evaluate(&self, script: &str, target: Option<&ElementHandle>) -> Result<Value> {
        let mut state = self.state.write().await;
        let now = self.now();
        let script = script.trim();
        let index = match target {
            Some(element) => Some(self.resolve(element, &state, now)?),
            None => None,
        };

        if let Some(index) = index {
            if script == javascript::CLICK_SCRIPT {
                if state
                    .behaviors
                    .get(&index)
                    .map_or(false, |b| b.rejects_script_click)
                {
                    return Err(BrowserError::JavaScriptFailed(
                        "click handler threw".to_string(),
                    ));
                }
                state.focused = Some(index);
                self.record(&mut state, Some(index), ActionKind::ScriptClick);
                return Ok(Value::Null);
            }
            if let Some(literal) = script.strip_prefix(javascript::SET_VALUE_PREFIX) {
                let value: String = serde_json::from_str(literal)?;
                state.values.insert(index, value.clone());
                self.record(&mut state, Some(index), ActionKind::ScriptValue(value));
                return Ok(Value::Null);
            }
            if script == javascript::INNER_TEXT_SCRIPT {
                return Ok(Value::String(self.nodes[index].text.clone()));
            }
        }

        self.record(&mut state, index, ActionKind::Script(script.to_string()));
        Ok(state
            .script_results
            .get(script)
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<()> {
        let mut state = self.state.write().await;
        let previous = std::mem::replace(&mut state.url, url.to_string());
        state.history.push(previous);
        self.record(&mut state, None, ActionKind::Navigate(url.to_string()));
        Ok(())
    }

    async fn go_back(&self) -> Result<()> {
        let mut state = self.state.write().await;
        let previous = state
            .history
            .pop()
            .ok_or_else(|| BrowserError::NavigationFailed("no previous page".to_string()))?;
        state.url = previous;
        self.record(&mut state, None, ActionKind::Back);
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        let mut state = self.state.write().await;
        self.record(&mut state, None, ActionKind::Reload);
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.state.read().await.url.clone())
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let focused = state.focused;
        if let Some(index) = focused {
            apply_key(state.values.entry(index).or_default(), key);
        }
        self.record(&mut state, focused, ActionKind::KeyPress(key.to_string()));
        Ok(())
    }
}

fn selector_syntax(selector: &str, reason: impl ToString) -> BrowserError {
    BrowserError::SelectorSyntax {
        selector: selector.to_string(),
        reason: reason.to_string(),
    }
}

fn css_matches(html: &str, css: &str) -> Result<Vec<usize>> {
    let selector = Selector::parse(css).map_err(|e| selector_syntax(css, format!("{:?}", e)))?;
    let document = Html::parse_document(html);
    let positions: HashMap<_, usize> = document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .enumerate()
        .map(|(index, element)| (element.id(), index))
        .collect();

    Ok(document
        .select(&selector)
        .filter_map(|element| positions.get(&element.id()).copied())
        .collect())
}

/// Evaluates XPath over an XML mirror of the document. Element order in
/// the mirror matches the node indices used everywhere else.
fn xpath_matches(html: &str, selector: &str, expr: &str) -> Result<Vec<usize>> {
    let document = Html::parse_document(html);
    let package = Package::new();
    let mirror = package.as_document();
    let mut elements = Vec::new();
    let root = mirror_element(&mirror, document.root_element(), &mut elements);
    mirror.root().append_child(root);

    match sxd_xpath::evaluate_xpath(&mirror, expr) {
        Ok(XPathValue::Nodeset(nodes)) => Ok(nodes
            .document_order()
            .into_iter()
            .filter_map(|node| match node {
                XPathNode::Element(element) => elements.iter().position(|e| *e == element),
                _ => None,
            })
            .collect()),
        Ok(_) => Err(selector_syntax(selector, "expression does not select elements")),
        Err(err) => Err(selector_syntax(selector, format!("{:?}", err))),
    }
}

fn mirror_element<'d>(
    mirror: &sxd_document::dom::Document<'d>,
    source: ElementRef,
    elements: &mut Vec<sxd_document::dom::Element<'d>>,
) -> sxd_document::dom::Element<'d> {
    let element = mirror.create_element(source.value().name());
    for (name, value) in source.value().attrs() {
        element.set_attribute_value(name, value);
    }
    elements.push(element);

    for child in source.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            let mirrored = mirror_element(mirror, child_element, elements);
            element.append_child(mirrored);
        } else if let Some(text) = child.value().as_text() {
            element.append_child(mirror.create_text(&**text));
        }
    }
    element
}

fn apply_key(value: &mut String, key: &str) {
    match key {
        "Backspace" => {
            value.pop();
        }
        key if key.chars().count() == 1 => value.push_str(key),
        _ => {}
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn normalize(text: &str) -> String {
    collapse_whitespace(text).to_lowercase()
}
