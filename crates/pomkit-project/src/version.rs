//! Lenient ordering of Maven version strings on top of `semver`.
//!
//! Maven versions are rarely valid semver: `1.2`, `2.0-SNAPSHOT`,
//! `5.3.0.RELEASE`, `31.1-jre`. Missing minor/patch components are padded
//! with zeros; well-known qualifiers become pre-release identifiers whose
//! lexical order matches Maven's (`alpha < beta < milestone < rc < snapshot`);
//! anything else is kept as build metadata.

use std::cmp::Ordering;

use semver::{BuildMetadata, Prerelease, Version};

pub fn parse_lenient(raw: &str) -> Option<Version> {
    let raw = raw.trim();
    let raw = raw.strip_prefix(['v', 'V']).unwrap_or(raw);

    let split = raw
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(raw.len());
    let (numeric, qualifier) = raw.split_at(split);
    let numeric = numeric.trim_end_matches('.');
    if numeric.is_empty() {
        return None;
    }

    let parts = numeric
        .split('.')
        .map(|part| part.parse::<u64>().ok())
        .collect::<Option<Vec<_>>>()?;
    let mut version = Version::new(
        parts[0],
        parts.get(1).copied().unwrap_or(0),
        parts.get(2).copied().unwrap_or(0),
    );

    let mut build: Vec<String> = parts.iter().skip(3).map(u64::to_string).collect();
    let qualifier = qualifier
        .trim_start_matches(['-', '.', '_'])
        .to_ascii_lowercase();
    match classify(&qualifier) {
        Qualifier::Release => {}
        Qualifier::Pre(pre) => version.pre = Prerelease::new(&pre).ok()?,
        Qualifier::Other(other) => build.push(other),
    }
    if !build.is_empty() {
        version.build = BuildMetadata::new(&build.join(".")).ok()?;
    }
    Some(version)
}

/// Whether `requested` orders strictly after `current`; `None` when either
/// side is not a recognizable version.
pub fn is_newer(requested: &str, current: &str) -> Option<bool> {
    let requested = parse_lenient(requested)?;
    let current = parse_lenient(current)?;
    Some(requested.cmp(&current) == Ordering::Greater)
}

enum Qualifier {
    Release,
    Pre(String),
    Other(String),
}

fn classify(qualifier: &str) -> Qualifier {
    if matches!(qualifier, "" | "ga" | "final" | "release") {
        return Qualifier::Release;
    }

    const KNOWN: &[(&str, &str)] = &[
        ("alpha", "alpha"),
        ("beta", "beta"),
        ("milestone", "milestone"),
        ("snapshot", "snapshot"),
        ("rc", "rc"),
        ("cr", "rc"),
        ("a", "alpha"),
        ("b", "beta"),
        ("m", "milestone"),
    ];
    for (prefix, label) in KNOWN {
        let Some(rest) = qualifier.strip_prefix(prefix) else {
            continue;
        };
        let rest = rest.trim_start_matches(['-', '.', '_']);
        if rest.is_empty() {
            return Qualifier::Pre((*label).to_string());
        }
        if let Ok(number) = rest.parse::<u64>() {
            return Qualifier::Pre(format!("{label}.{number}"));
        }
    }

    let sanitized: String = qualifier
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' { c } else { '-' })
        .collect();
    let sanitized = sanitized
        .split('.')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(".");
    Qualifier::Other(sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_missing_components() {
        assert_eq!(parse_lenient("1").unwrap(), Version::new(1, 0, 0));
        assert_eq!(parse_lenient("1.2").unwrap(), Version::new(1, 2, 0));
        assert_eq!(parse_lenient("v2.0.3").unwrap(), Version::new(2, 0, 3));
    }

    #[test]
    fn patch_upgrade_is_newer_and_downgrade_is_not() {
        assert_eq!(is_newer("2.0.3", "2.0.2"), Some(true));
        assert_eq!(is_newer("2.0.2", "2.0.3"), Some(false));
        assert_eq!(is_newer("2.0.3", "2.0.3"), Some(false));
        assert_eq!(is_newer("1.10", "1.9"), Some(true));
    }

    #[test]
    fn qualifiers_follow_maven_order() {
        let ordered = ["1.0-alpha1", "1.0-beta-2", "1.0-M3", "1.0-RC1", "1.0-SNAPSHOT", "1.0"];
        for pair in ordered.windows(2) {
            assert_eq!(is_newer(pair[1], pair[0]), Some(true), "{} > {}", pair[1], pair[0]);
        }
        assert_eq!(is_newer("1.0.Final", "1.0"), Some(false));
    }

    #[test]
    fn unknown_qualifiers_are_kept_as_build_metadata() {
        let v = parse_lenient("31.1-jre").unwrap();
        assert_eq!((v.major, v.minor, v.patch), (31, 1, 0));
        assert!(v.pre.is_empty());
        assert_eq!(is_newer("32.0-jre", "31.1-jre"), Some(true));
        assert!(parse_lenient("5.3.0.RELEASE").unwrap().build.is_empty());
    }

    #[test]
    fn garbage_is_not_a_version() {
        assert_eq!(parse_lenient("${lib.version}"), None);
        assert_eq!(is_newer("1.0", "latest"), None);
    }
}
