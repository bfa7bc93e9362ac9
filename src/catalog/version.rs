//! Version string helpers for runtime catalogs.
//!
//! Release notes describe environments loosely ("Ubuntu 22.04.3 LTS",
//! "3.11.0"); image tags and directory names need the compact `major.minor`
//! forms, and the build matrix needs runtime labels ordered newest first.

use std::cmp::Ordering;
use std::sync::OnceLock;

use regex::Regex;

fn os_version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{2})\.(\d{1,2})").expect("valid OS version pattern"))
}

fn python_version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)\.(\d+)").expect("valid Python version pattern"))
}

fn strict_os_version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{2}\.\d{2}$").expect("valid strict OS pattern"))
}

/// Extracts an Ubuntu `major.minor` version from free-form text.
///
/// `"Ubuntu 22.04.3 LTS"` and `"22.04"` both yield `"22.04"`; the minor part is
/// zero-padded to two digits.
pub fn normalize_os_version(raw: &str) -> Option<String> {
    let caps = os_version_regex().captures(raw)?;
    let major: u32 = caps[1].parse().ok()?;
    let minor: u32 = caps[2].parse().ok()?;
    Some(format!("{major}.{minor:02}"))
}

/// Extracts a Python `major.minor` version, e.g. `"3.11.0"` becomes `"3.11"`.
pub fn normalize_python_version(raw: &str) -> Option<String> {
    let caps = python_version_regex().captures(raw)?;
    let major: u32 = caps[1].parse().ok()?;
    let minor: u32 = caps[2].parse().ok()?;
    Some(format!("{major}.{minor}"))
}

/// Returns true when `value` is an exact `NN.NN` OS version.
pub fn is_os_version(value: &str) -> bool {
    strict_os_version_regex().is_match(value)
}

/// Drops the dots from a version: `"24.04"` becomes `"2404"`.
pub fn compact(version: &str) -> String {
    version.replace('.', "")
}

/// Makes a runtime label safe for directory names: `"15.4 LTS"` becomes `"15.4-LTS"`.
pub fn sanitize_runtime_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .replace(['(', ')'], "")
}

/// Returns true when the sanitized label is usable as a directory name and
/// inside an image tag: ASCII letters, digits, `.`, `-` and `_`, with no `..`
/// and no leading `.` or `-`.
pub fn is_safe_runtime_label(label: &str) -> bool {
    let sanitized = sanitize_runtime_label(label);
    !sanitized.is_empty()
        && !sanitized.contains("..")
        && !sanitized.starts_with(['.', '-'])
        && sanitized
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}

/// Lowercased, tag-safe form of a runtime label: `"15.4 LTS"` becomes `"15.4-lts"`.
pub fn tag_runtime_label(label: &str) -> String {
    sanitize_runtime_label(label).to_lowercase()
}

/// Leading numeric components of a runtime label (`"15.4 LTS"` -> `[15, 4]`).
fn numeric_parts(label: &str) -> Vec<u64> {
    label
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .split('.')
        .map_while(|part| part.parse::<u64>().ok())
        .collect()
}

/// Orders runtime labels newest first; labels without numbers sort last.
pub fn compare_runtime_labels_desc(a: &str, b: &str) -> Ordering {
    let (pa, pb) = (numeric_parts(a), numeric_parts(b));
    match (pa.is_empty(), pb.is_empty()) {
        (true, true) => a.cmp(b),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => pb.cmp(&pa).then_with(|| a.cmp(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_os_version() {
        assert_eq!(
            normalize_os_version("Ubuntu 22.04.3 LTS").as_deref(),
            Some("22.04")
        );
        assert_eq!(normalize_os_version("24.04").as_deref(), Some("24.04"));
        assert_eq!(normalize_os_version("ubuntu 20.4").as_deref(), Some("20.04"));
        assert_eq!(normalize_os_version("Debian bookworm"), None);
    }

    #[test]
    fn test_normalize_python_version() {
        assert_eq!(normalize_python_version("3.11.0").as_deref(), Some("3.11"));
        assert_eq!(normalize_python_version("3.12").as_deref(), Some("3.12"));
        assert_eq!(normalize_python_version("Python 3.10.12").as_deref(), Some("3.10"));
        assert_eq!(normalize_python_version("three"), None);
    }

    #[test]
    fn test_is_os_version() {
        assert!(is_os_version("22.04"));
        assert!(!is_os_version("22.4"));
        assert!(!is_os_version("jammy"));
        assert!(!is_os_version("22.04.3"));
    }

    #[test]
    fn test_sanitize_runtime_label() {
        assert_eq!(sanitize_runtime_label("15.4 LTS"), "15.4-LTS");
        assert_eq!(sanitize_runtime_label("16.4 LTS (Beta)"), "16.4-LTS-Beta");
        assert_eq!(tag_runtime_label("15.4 LTS"), "15.4-lts");
        assert_eq!(compact("24.04"), "2404");
    }

    #[test]
    fn test_is_safe_runtime_label() {
        assert!(is_safe_runtime_label("15.4 LTS"));
        assert!(is_safe_runtime_label("16.4 LTS (Beta)"));
        assert!(is_safe_runtime_label("17.x-snapshot_1"));

        assert!(!is_safe_runtime_label("17.3/../../../etc"));
        assert!(!is_safe_runtime_label("17.3\\windows"));
        assert!(!is_safe_runtime_label(".."));
        assert!(!is_safe_runtime_label(".hidden"));
        assert!(!is_safe_runtime_label("15.4 \"LTS\""));
        assert!(!is_safe_runtime_label("15.4 $HOME"));
        assert!(!is_safe_runtime_label("()"));
    }

    #[test]
    fn test_compare_runtime_labels_desc() {
        let mut labels = vec!["14.3 LTS", "17.3 LTS", "9.1 LTS", "15.4 LTS", "nightly"];
        labels.sort_by(|a, b| compare_runtime_labels_desc(a, b));
        assert_eq!(labels, vec!["17.3 LTS", "15.4 LTS", "14.3 LTS", "9.1 LTS", "nightly"]);
    }
}
