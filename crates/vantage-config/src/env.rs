//! Minimal environment-variable loading helpers shared by every per-concern
//! config struct. Each concern owns its own `Config` type and `from_env()`
//! constructor; this module only carries the parsing boilerplate.

use std::env;
use std::str::FromStr;

/// Read `var`, falling back to `default` when unset or empty.
pub fn var_or(var: &str, default: &str) -> String {
    env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Read `var` as an optional string, `None` when unset or empty.
pub fn var_opt(var: &str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.is_empty())
}

/// Parse `var` as `T`, falling back to `default` when unset or unparseable.
pub fn parse_or<T: FromStr>(var: &str, default: T) -> T {
    env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
