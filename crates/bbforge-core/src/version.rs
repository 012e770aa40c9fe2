//! Lenient release-version parsing and stable-version selection.
//!
//! Upstream release strings are not always strict semver: `v5.2`, `24.08.1`
//! and `6` all appear in AppStream files. They are normalized before being
//! handed to `semver`, and the original string is what gets reported.

use semver::Version;
use tracing::{trace, warn};

/// Parse a release string, accepting a leading `v`, missing minor/patch
/// components and leading zeros in numeric components.
pub fn parse_lenient(raw: &str) -> Result<Version, semver::Error> {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);

    let (core, suffix) = match trimmed.find(['-', '+']) {
        Some(idx) => trimmed.split_at(idx),
        None => (trimmed, ""),
    };

    let mut parts: Vec<String> = core.split('.').map(normalize_component).collect();
    // Only pad; a fourth component is left for semver to reject.
    while parts.len() < 3 {
        parts.push("0".to_string());
    }

    Version::parse(&format!("{}{}", parts.join("."), suffix))
}

fn normalize_component(part: &str) -> String {
    if !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()) {
        let stripped = part.trim_start_matches('0');
        if stripped.is_empty() {
            "0".to_string()
        } else {
            stripped.to_string()
        }
    } else {
        part.to_string()
    }
}

/// Pick the highest release that parses and carries no prerelease tag.
///
/// Returns the original string of the winner, or `None` when nothing
/// qualifies. Unparseable candidates are skipped with a warning.
pub fn latest_stable<'a, I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(Version, &str)> = None;

    for raw in candidates {
        let version = match parse_lenient(raw) {
            Ok(v) => v,
            Err(e) => {
                warn!(version = raw, error = %e, "Skipping unparseable release version");
                continue;
            }
        };

        if !version.pre.is_empty() {
            trace!(version = raw, "Skipping prerelease");
            continue;
        }

        match &best {
            Some((current, _)) if *current >= version => {}
            _ => best = Some((version, raw)),
        }
    }

    best.map(|(_, raw)| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lenient_forms() {
        assert_eq!(parse_lenient("5.2.0").unwrap(), Version::new(5, 2, 0));
        assert_eq!(parse_lenient("v5.2").unwrap(), Version::new(5, 2, 0));
        assert_eq!(parse_lenient("6").unwrap(), Version::new(6, 0, 0));
        assert_eq!(parse_lenient("24.08.1").unwrap(), Version::new(24, 8, 1));
        assert_eq!(parse_lenient(" 1.00.0 ").unwrap(), Version::new(1, 0, 0));
    }

    #[test]
    fn test_parse_lenient_keeps_prerelease() {
        let version = parse_lenient("5.3.0-beta1").unwrap();
        assert_eq!(version.pre.as_str(), "beta1");
    }

    #[test]
    fn test_parse_lenient_rejects_garbage() {
        assert!(parse_lenient("").is_err());
        assert!(parse_lenient("latest").is_err());
        assert!(parse_lenient("1.2.3.4").is_err());
        assert!(parse_lenient("1..2").is_err());
    }

    #[test]
    fn test_latest_stable_skips_prerelease() {
        let latest = latest_stable(["5.2.0", "5.3.0-beta1", "5.1.0"]);
        assert_eq!(latest.as_deref(), Some("5.2.0"));
    }

    #[test]
    fn test_latest_stable_reports_original_string() {
        let latest = latest_stable(["24.05.2", "24.08.1", "garbage"]);
        assert_eq!(latest.as_deref(), Some("24.08.1"));
    }

    #[test]
    fn test_latest_stable_none_qualifying() {
        assert_eq!(latest_stable(["1.0.0-rc1", "nope"]), None);
        assert_eq!(latest_stable(Vec::<&str>::new()), None);
    }
}
