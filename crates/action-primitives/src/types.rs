//! Value types shared by drivers and the interpreter

use serde::{Deserialize, Serialize};
use std::fmt;

/// Page readiness condition awaited after navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitUntil {
    /// The `load` event fired
    #[default]
    Load,
    /// The `DOMContentLoaded` event fired
    DomContentLoaded,
    /// No network activity for a quiet window
    NetworkIdle,
}

impl WaitUntil {
    /// Parse the DSL spelling; anything unrecognised falls back to `Load`.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw {
            "load" => WaitUntil::Load,
            "domcontentloaded" => WaitUntil::DomContentLoaded,
            "networkidle" => WaitUntil::NetworkIdle,
            _ => WaitUntil::Load,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WaitUntil::Load => "load",
            WaitUntil::DomContentLoaded => "domcontentloaded",
            WaitUntil::NetworkIdle => "networkidle",
        }
    }
}

impl fmt::Display for WaitUntil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persisted browser cookie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    /// Seconds since the Unix epoch; absent for session cookies
    #[serde(default)]
    pub expires: Option<f64>,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub same_site: Option<String>,
}

impl StoredCookie {
    /// Whether the cookie is past its expiry at `now` (seconds since the Unix epoch).
    /// Session cookies never are.
    pub fn expired_at(&self, now: f64) -> bool {
        self.expires.is_some_and(|at| at > 0.0 && at <= now)
    }
}

/// Cookie jar captured from (or restored into) a browser session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CookieState {
    #[serde(default)]
    pub cookies: Vec<StoredCookie>,
}

impl CookieState {
    pub fn new(cookies: Vec<StoredCookie>) -> Self {
        Self { cookies }
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_until_falls_back_to_load() {
        assert_eq!(WaitUntil::parse_lenient("load"), WaitUntil::Load);
        assert_eq!(
            WaitUntil::parse_lenient("domcontentloaded"),
            WaitUntil::DomContentLoaded
        );
        assert_eq!(WaitUntil::parse_lenient("networkidle"), WaitUntil::NetworkIdle);
        assert_eq!(WaitUntil::parse_lenient("commit"), WaitUntil::Load);
        assert_eq!(WaitUntil::parse_lenient("NETWORKIDLE"), WaitUntil::Load);
    }

    #[test]
    fn cookie_state_reads_partial_documents() {
        let state: CookieState =
            serde_json::from_str(r#"{"cookies":[{"name":"sid","value":"abc","httpOnly":true}]}"#)
                .unwrap();
        assert_eq!(state.len(), 1);
        assert!(state.cookies[0].http_only);
        assert!(state.cookies[0].domain.is_none());
    }
}
