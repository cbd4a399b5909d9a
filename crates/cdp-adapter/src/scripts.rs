//! Page scripts evaluated through `Runtime.evaluate`
//!
//! Selectors and values are embedded as JSON string literals. Mutating scripts return a
//! status string: `ok`, `missing` (no element) or a short failure reason.

use serde_json::Value;

pub(crate) const STATUS_OK: &str = "ok";
pub(crate) const STATUS_MISSING: &str = "missing";

pub(crate) const READY_STATE: &str = "document.readyState";
pub(crate) const RESOURCE_COUNT: &str = "performance.getEntriesByType('resource').length";

/// Quote `raw` as a JavaScript string literal.
pub(crate) fn js_string(raw: &str) -> String {
    Value::String(raw.to_string()).to_string()
}

pub(crate) fn count(selector: &str) -> String {
    format!(
        "document.querySelectorAll({}).length",
        js_string(selector)
    )
}

pub(crate) fn is_visible(selector: &str) -> String {
    format!(
        r#"(() => {{
  const el = document.querySelector({sel});
  if (!el) return false;
  const style = window.getComputedStyle(el);
  const rect = el.getBoundingClientRect();
  return style.visibility !== 'hidden' && style.display !== 'none' && rect.width > 0 && rect.height > 0;
}})()"#,
        sel = js_string(selector)
    )
}

pub(crate) fn is_enabled(selector: &str) -> String {
    format!(
        r#"(() => {{
  const el = document.querySelector({sel});
  if (!el) return false;
  if (el.disabled) return false;
  const fieldset = el.closest('fieldset[disabled]');
  return !fieldset;
}})()"#,
        sel = js_string(selector)
    )
}

/// Clear and set the value with the native setter so framework listeners see it.
pub(crate) fn fill(selector: &str, value: &str) -> String {
    format!(
        r#"(() => {{
  const el = document.querySelector({sel});
  if (!el) return '{missing}';
  el.focus();
  const value = {val};
  if (el instanceof HTMLInputElement || el instanceof HTMLTextAreaElement) {{
    const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
    const descriptor = Object.getOwnPropertyDescriptor(proto, 'value');
    descriptor.set.call(el, '');
    el.dispatchEvent(new Event('input', {{ bubbles: true }}));
    descriptor.set.call(el, value);
  }} else if (el.isContentEditable) {{
    el.textContent = value;
  }} else {{
    return 'not-fillable';
  }}
  el.dispatchEvent(new Event('input', {{ bubbles: true }}));
  el.dispatchEvent(new Event('change', {{ bubbles: true }}));
  return '{ok}';
}})()"#,
        sel = js_string(selector),
        val = js_string(value),
        missing = STATUS_MISSING,
        ok = STATUS_OK,
    )
}

/// Select the option whose value, or failing that whose label, equals `value`.
pub(crate) fn select_option(selector: &str, value: &str) -> String {
    format!(
        r#"(() => {{
  const el = document.querySelector({sel});
  if (!el) return '{missing}';
  if (!(el instanceof HTMLSelectElement)) return 'not-a-select';
  const wanted = {val};
  const options = Array.from(el.options);
  const option = options.find(o => o.value === wanted) || options.find(o => o.label === wanted);
  if (!option) return 'no-such-option';
  el.value = option.value;
  option.selected = true;
  el.dispatchEvent(new Event('input', {{ bubbles: true }}));
  el.dispatchEvent(new Event('change', {{ bubbles: true }}));
  return '{ok}';
}})()"#,
        sel = js_string(selector),
        val = js_string(value),
        missing = STATUS_MISSING,
        ok = STATUS_OK,
    )
}

/// Toggle a checkbox or radio until `checked` holds, clicking like a user would.
pub(crate) fn set_checked(selector: &str, checked: bool) -> String {
    format!(
        r#"(() => {{
  const el = document.querySelector({sel});
  if (!el) return '{missing}';
  if (el.checked !== {want}) el.click();
  return el.checked === {want} ? '{ok}' : 'state-unchanged';
}})()"#,
        sel = js_string(selector),
        want = checked,
        missing = STATUS_MISSING,
        ok = STATUS_OK,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_are_quoted_as_literals() {
        let script = count(r#"input[name="q"]"#);
        assert_eq!(
            script,
            r#"document.querySelectorAll("input[name=\"q\"]").length"#
        );
    }

    #[test]
    fn values_cannot_break_out_of_the_literal() {
        let script = fill("#bio", "'); alert(1); ('\n");
        assert!(script.contains(r#"const value = "'); alert(1); ('\n";"#));
    }

    #[test]
    fn checked_state_is_inlined() {
        let script = set_checked("#terms", false);
        assert!(script.contains("el.checked !== false"));
        assert!(script.contains("document.querySelector(\"#terms\")"));
    }
}
