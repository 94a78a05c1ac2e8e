//! Lenient version comparison
//!
//! Database servers and the software report versions such as `1.2`,
//! `v3.1.0` or `10.4.12-MariaDB` that are not all valid Semantic Versioning
//! strings. Missing minor/patch components are padded with zero before
//! parsing with `semver`; anything that still fails to parse is compared
//! component by component.

use semver::Version;
use std::cmp::Ordering;

/// Compare two version strings
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (parse_lenient(a), parse_lenient(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => compare_components(a, b),
    }
}

/// Whether `version` is at least `minimum`
pub fn version_at_least(version: &str, minimum: &str) -> bool {
    compare_versions(version, minimum) != Ordering::Less
}

fn parse_lenient(version: &str) -> Option<Version> {
    let version = version.trim().trim_start_matches('v');

    let (core, suffix) = match version.find(|c: char| c == '-' || c == '+') {
        Some(idx) => version.split_at(idx),
        None => (version, ""),
    };

    let mut parts: Vec<&str> = core.split('.').collect();
    if parts.len() > 3 {
        return None;
    }
    while parts.len() < 3 {
        parts.push("0");
    }

    Version::parse(&format!("{}{}", parts.join("."), suffix)).ok()
}

fn compare_components(a: &str, b: &str) -> Ordering {
    let components = |v: &str| -> Vec<u64> {
        v.trim()
            .trim_start_matches('v')
            .split(|c: char| c == '.' || c == '-' || c == '+')
            .map(|part| part.parse().unwrap_or(0))
            .collect()
    };

    let (a, b) = (components(a), components(b));
    let len = a.len().max(b.len());

    (0..len)
        .map(|i| {
            let x = a.get(i).copied().unwrap_or(0);
            let y = b.get(i).copied().unwrap_or(0);
            x.cmp(&y)
        })
        .find(|ordering| *ordering != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}
