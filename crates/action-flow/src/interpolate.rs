//! `${Name}` substitution

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;

use crate::context::ExecutionContext;

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("token regex"));

/// Replace every `${Name}` whose variable is bound to a non-empty string.
///
/// Single pass: substituted text is not scanned again. Tokens that are unbound, empty or
/// bound to a non-string value stay verbatim.
pub fn interpolate<'a>(input: &'a str, ctx: &ExecutionContext) -> Cow<'a, str> {
    TOKEN.replace_all(input, |caps: &Captures| {
        let name = &caps[1];
        match ctx.get_str(name) {
            Some(value) if !value.is_empty() => value.to_string(),
            _ => caps[0].to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ExecutionContext {
        let mut ctx = ExecutionContext::new();
        ctx.set("JobId", "42");
        ctx.set("Empty", "");
        ctx.set("Nested", "${JobId}");
        ctx.set("Flag", true);
        ctx
    }

    #[test]
    fn substitutes_bound_tokens() {
        assert_eq!(interpolate("logs/${JobId}/", &ctx()), "logs/42/");
        assert_eq!(interpolate("${JobId}-${JobId}", &ctx()), "42-42");
    }

    #[test]
    fn leaves_missing_and_empty_tokens() {
        assert_eq!(interpolate("${Missing}", &ctx()), "${Missing}");
        assert_eq!(interpolate("a${Empty}b", &ctx()), "a${Empty}b");
        assert_eq!(interpolate("${Flag}", &ctx()), "${Flag}");
        let once = interpolate("${Missing}/${JobId}", &ctx()).into_owned();
        assert_eq!(interpolate(&once, &ctx()), once);
    }

    #[test]
    fn is_single_pass() {
        assert_eq!(interpolate("${Nested}", &ctx()), "${JobId}");
    }

    #[test]
    fn plain_text_is_borrowed() {
        assert!(matches!(interpolate("#apply", &ctx()), Cow::Borrowed(_)));
    }
}
