//! Conversion between DevTools cookies and the persisted cookie model

use action_primitives::{CookieState, StoredCookie};
use chromiumoxide::cdp::browser_protocol::network::{
    Cookie, CookieParam, CookieSameSite, TimeSinceEpoch,
};
use tracing::warn;

pub(crate) fn export(cookies: Vec<Cookie>) -> CookieState {
    CookieState::new(cookies.into_iter().map(stored_from_cdp).collect())
}

fn stored_from_cdp(cookie: Cookie) -> StoredCookie {
    let expires = (!cookie.session && cookie.expires >= 0.0).then_some(cookie.expires);
    StoredCookie {
        name: cookie.name,
        value: cookie.value,
        domain: Some(cookie.domain).filter(|d| !d.is_empty()),
        path: Some(cookie.path).filter(|p| !p.is_empty()),
        expires,
        http_only: cookie.http_only,
        secure: cookie.secure,
        same_site: cookie.same_site.map(|s| same_site_name(&s).to_string()),
    }
}

/// Build `Network.setCookies` parameters. Cookies without a domain cannot be restored
/// into a blank page and are dropped.
pub(crate) fn restore_params(state: &CookieState) -> Vec<CookieParam> {
    state
        .cookies
        .iter()
        .filter_map(|cookie| {
            let Some(domain) = cookie.domain.clone() else {
                warn!(cookie = %cookie.name, "skipping stored cookie without domain");
                return None;
            };
            let mut param = CookieParam::new(cookie.name.clone(), cookie.value.clone());
            param.domain = Some(domain);
            param.path = cookie.path.clone();
            param.secure = Some(cookie.secure);
            param.http_only = Some(cookie.http_only);
            param.same_site = cookie.same_site.as_deref().and_then(parse_same_site);
            param.expires = cookie.expires.map(TimeSinceEpoch::new);
            Some(param)
        })
        .collect()
}

fn same_site_name(value: &CookieSameSite) -> &'static str {
    match value {
        CookieSameSite::Strict => "Strict",
        CookieSameSite::Lax => "Lax",
        CookieSameSite::None => "None",
    }
}

fn parse_same_site(raw: &str) -> Option<CookieSameSite> {
    match raw.to_ascii_lowercase().as_str() {
        "strict" => Some(CookieSameSite::Strict),
        "lax" => Some(CookieSameSite::Lax),
        "none" => Some(CookieSameSite::None),
        _ => None,
    }
}
