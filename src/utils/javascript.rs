//! Scripts evaluated inside the page.
//!
//! Inputs are embedded as JSON literals and every wrapper returns a JSON
//! string, so nothing the caller passes can break out of the script and
//! results come back from `Runtime.evaluate` without remote-object handling.

use crate::core::ElementQuery;
use crate::errors::{BrowserError, Result};
use crate::types::ElementHandle;
use serde::Deserialize;
use serde_json::Value;

pub const CLICK_SCRIPT: &str = "arguments[0].click()";

pub const SET_VALUE_PREFIX: &str = "arguments[0].value = ";

pub const INNER_TEXT_SCRIPT: &str = "return arguments[0].innerText";

pub const VISIBILITY_BODY: &str = r#"
    const el = arguments[0];
    const rect = el.getBoundingClientRect();
    const style = window.getComputedStyle(el);
    return rect.width > 0 && rect.height > 0
        && style.visibility !== 'hidden'
        && style.display !== 'none';
"#;

pub const ENABLED_BODY: &str = r#"
    const el = arguments[0];
    const disabled = typeof el.matches === 'function' && el.matches(':disabled');
    return !disabled && el.getAttribute('aria-disabled') !== 'true';
"#;

/// Scrolls the element to the viewport centre and reports what a click
/// at its centre point would land on.
pub const CLICK_TARGET_BODY: &str = r#"
    const el = arguments[0];
    el.scrollIntoView({ block: 'center', inline: 'center' });
    const rect = el.getBoundingClientRect();
    const hit = document.elementFromPoint(rect.left + rect.width / 2, rect.top + rect.height / 2);
    return {
        x: rect.left,
        y: rect.top,
        width: rect.width,
        height: rect.height,
        hit: hit ? hit.tagName.toLowerCase() : null,
        receives: !!hit && (hit === el || el.contains(hit))
    };
"#;

pub const SCROLL_BODY: &str = "arguments[0].scrollIntoView({ block: 'center', inline: 'center' });";

pub const FOCUS_BODY: &str = "arguments[0].focus();";

pub const CLEAR_BODY: &str = r#"
    const el = arguments[0];
    el.focus();
    if ('value' in el) {
        el.value = '';
    } else if (el.isContentEditable) {
        el.textContent = '';
    }
    el.dispatchEvent(new Event('input', { bubbles: true }));
    el.dispatchEvent(new Event('change', { bubbles: true }));
"#;

const RESOLVER: &str = r#"
    const __normalize = (s) => (s || '').replace(/\s+/g, ' ').trim().toLowerCase();
    const __resolve = (kind, value) => {
        const all = Array.from(document.querySelectorAll('*'));
        const needle = __normalize(value);
        const attrContains = (attr) =>
            all.filter((el) => el.hasAttribute(attr) && __normalize(el.getAttribute(attr)).includes(needle));
        switch (kind) {
            case 'selector': {
                const isPath = value.startsWith('xpath=') || value.startsWith('/') || value.startsWith('(') || value.startsWith('..');
                if (!isPath) {
                    return Array.from(document.querySelectorAll(value));
                }
                const expr = value.startsWith('xpath=') ? value.slice(6) : value;
                const snap = document.evaluate(expr, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
                const out = [];
                for (let i = 0; i < snap.snapshotLength; i++) {
                    const node = snap.snapshotItem(i);
                    if (node.nodeType === Node.ELEMENT_NODE) out.push(node);
                }
                return out;
            }
            case 'text': {
                const skip = new Set(['HTML', 'HEAD', 'SCRIPT', 'STYLE', 'TITLE', 'NOSCRIPT']);
                const hits = all.filter((el) => !skip.has(el.tagName) && __normalize(el.textContent).includes(needle));
                return hits.filter((el) => !hits.some((other) => other !== el && el.contains(other)));
            }
            case 'label': {
                const found = new Set();
                all.forEach((el) => {
                    if (__normalize(el.getAttribute('aria-label')).includes(needle) && el.hasAttribute('aria-label')) {
                        found.add(el);
                    }
                    const ids = (el.getAttribute('aria-labelledby') || '').split(/\s+/).filter(Boolean);
                    if (ids.some((id) => {
                        const ref = document.getElementById(id);
                        return ref && __normalize(ref.textContent).includes(needle);
                    })) {
                        found.add(el);
                    }
                });
                document.querySelectorAll('label').forEach((label) => {
                    if (label.control && __normalize(label.textContent).includes(needle)) {
                        found.add(label.control);
                    }
                });
                return all.filter((el) => found.has(el));
            }
            case 'placeholder': return attrContains('placeholder');
            case 'alt': return attrContains('alt');
            case 'title': return attrContains('title');
            case 'testid': return all.filter((el) => el.getAttribute('data-testid') === value);
            default: throw new Error('unknown query kind: ' + kind);
        }
    };
"#;

/// What every wrapped script returns.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptOutcome {
    pub ok: bool,
    #[serde(default)]
    pub value: Value,
    /// The targeted element no longer resolves.
    #[serde(default)]
    pub missing: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl ScriptOutcome {
    pub fn parse(raw: Option<Value>) -> Result<Self> {
        match raw {
            Some(Value::String(json)) => Ok(serde_json::from_str(&json)?),
            other => Err(BrowserError::JavaScriptFailed(format!(
                "unexpected script result: {:?}",
                other
            ))),
        }
    }
}

/// Quoted JS string literal for `text`.
pub fn json_literal(text: &str) -> String {
    Value::String(text.to_string()).to_string()
}

pub fn set_value_script(text: &str) -> String {
    format!("{}{}", SET_VALUE_PREFIX, json_literal(text))
}

pub fn read_attribute_body(name: &str) -> String {
    format!(
        r#"
    const el = arguments[0];
    const name = {};
    if (name === 'value' && 'value' in el) return el.value;
    return el.getAttribute(name);
"#,
        json_literal(name)
    )
}

pub fn count_script(query: &ElementQuery) -> String {
    format!(
        r#"(() => {{
    {resolver}
    try {{
        return JSON.stringify({{ ok: true, value: __resolve({kind}, {value}).length }});
    }} catch (e) {{
        return JSON.stringify({{ ok: false, error: String((e && e.message) || e) }});
    }}
}})()"#,
        resolver = RESOLVER,
        kind = json_literal(query.kind()),
        value = json_literal(query.value()),
    )
}

/// Runs `body` as a function with the resolved element as `arguments[0]`.
pub fn element_script(element: &ElementHandle, body: &str) -> String {
    format!(
        r#"(() => {{
    {resolver}
    try {{
        const el = __resolve({kind}, {value})[{index}];
        if (!el) return JSON.stringify({{ ok: false, missing: true }});
        const result = (function () {{ {body} }}).apply(el, [el]);
        return JSON.stringify({{ ok: true, value: result === undefined ? null : result }});
    }} catch (e) {{
        return JSON.stringify({{ ok: false, error: String((e && e.message) || e) }});
    }}
}})()"#,
        resolver = RESOLVER,
        kind = json_literal(element.query.kind()),
        value = json_literal(element.query.value()),
        index = element.index,
        body = body,
    )
}

/// Evaluates arbitrary page-level script; the value of its last statement
/// is returned.
pub fn page_script(script: &str) -> String {
    format!(
        r#"(() => {{
    try {{
        const result = (0, eval)({script});
        return JSON.stringify({{ ok: true, value: result === undefined ? null : result }});
    }} catch (e) {{
        return JSON.stringify({{ ok: false, error: String((e && e.message) || e) }});
    }}
}})()"#,
        script = json_literal(script),
    )
}
