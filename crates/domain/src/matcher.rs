//! Denylist pattern matching.
//!
//! Three rules, first match wins:
//! 1. exact equality,
//! 2. `*.`-prefixed wildcard covering subdomains (not the bare root),
//! 3. parent-domain coverage: a bare entry also covers all its subdomains.
//!
//! Rule 3 makes a bare `example.com` behave like an implicit wildcard over
//! its subtree; bare and wildcard entries differ only in whether the root
//! itself matches.

use std::collections::HashSet;

/// Lowercases and trims a domain or pattern for comparison.
pub fn normalize_domain(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

/// Returns `true` when `domain` is covered by any pattern in `patterns`.
/// Patterns are expected pre-normalized (see [`crate::DenylistCache`]);
/// the domain side is normalized here.
pub fn matches_denylist(domain: &str, patterns: &HashSet<String>) -> bool {
    let domain = normalize_domain(domain);
    if domain.is_empty() || patterns.is_empty() {
        return false;
    }

    if patterns.contains(domain.as_str()) {
        return true;
    }

    for pattern in patterns {
        if let Some(suffix) = pattern.strip_prefix("*.") {
            // Only `.`-anchored: the wildcard does not cover the bare root.
            if domain.len() > suffix.len()
                && domain.ends_with(suffix)
                && domain.as_bytes()[domain.len() - suffix.len() - 1] == b'.'
            {
                return true;
            }
        }
    }

    // Walk label suffixes: sub.evil.com -> evil.com -> com.
    let mut part = domain.as_str();
    while let Some(idx) = part.find('.') {
        part = &part[idx + 1..];
        if part.is_empty() {
            break;
        }
        if patterns.contains(part) {
            return true;
        }
    }

    false
}
