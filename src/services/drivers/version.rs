//! Lenient driver version handling.
//!
//! Repository version strings are not reliably semantic versions
//! (`8.0.33`, `1.0.0-beta`, `2.1.0RC1`, `42.7.2-SNAPSHOT`), so ordering is
//! segment-wise rather than semver-based.

use std::cmp::Ordering;

/// Compare two version strings.
///
/// Both are split on `.` and `-`; corresponding segments are compared by
/// their leading digits as integers, falling back to a deterministic string
/// hash for segments without leading digits. Missing trailing segments count
/// as 0. Equal segment values are broken by plain lexicographic order.
pub fn compare_versions(v1: &str, v2: &str) -> Ordering {
    let parts1: Vec<&str> = v1.split(['.', '-']).collect();
    let parts2: Vec<&str> = v2.split(['.', '-']).collect();

    let max_len = parts1.len().max(parts2.len());
    for i in 0..max_len {
        let a = parts1.get(i).map(|p| segment_value(p)).unwrap_or(0);
        let b = parts2.get(i).map(|p| segment_value(p)).unwrap_or(0);
        if a != b {
            return a.cmp(&b);
        }
    }

    v1.cmp(v2)
}

/// Sort versions newest first.
pub fn sort_newest_first(versions: &mut [String]) {
    versions.sort_by(|a, b| compare_versions(b, a));
}

fn segment_value(part: &str) -> i64 {
    let digits: &str = {
        let end = part
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(part.len());
        &part[..end]
    };

    if !digits.is_empty() {
        if let Ok(n) = digits.parse::<i32>() {
            return n as i64;
        }
    }
    string_hash(part) as i64
}

// 31-multiplier rolling hash over UTF-16 units; stable across runs.
fn string_hash(s: &str) -> i32 {
    s.encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as i32))
}

/// Interpret the leading numeric segments of a version as a semantic version.
///
/// `8.0.33-SNAPSHOT` → `8.0.33`, `2.1.0RC1` → `2.1.0`, `8.0` → `8.0.0`.
/// Returns `None` when the version does not start with a number.
pub fn lenient_version(version: &str) -> Option<semver::Version> {
    let mut numbers = Vec::with_capacity(3);
    for part in version.trim().split(['.', '-']).take(3) {
        let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            break;
        }
        numbers.push(digits.parse::<u64>().ok()?);
        if digits.len() != part.len() {
            break;
        }
    }

    match numbers.as_slice() {
        [] => None,
        [major] => Some(semver::Version::new(*major, 0, 0)),
        [major, minor] => Some(semver::Version::new(*major, *minor, 0)),
        [major, minor, patch, ..] => Some(semver::Version::new(*major, *minor, *patch)),
    }
}

/// Extract the version from a driver file name such as
/// `mysql-connector-j-8.0.33.jar`.
///
/// The version starts at the first `-` followed by a digit and keeps only
/// the dotted numeric part, so qualifiers (`-beta`, `RC1`, `-SNAPSHOT`) are
/// dropped. Returns `None` for names without a version or without a `.jar`
/// extension.
pub fn extract_version_from_file_name(file_name: &str) -> Option<String> {
    let stem = file_name.strip_suffix(".jar")?;
    let bytes = stem.as_bytes();

    let start = (1..bytes.len()).find(|&i| bytes[i - 1] == b'-' && bytes[i].is_ascii_digit())?;

    let version: String = stem[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let version = version.trim_end_matches('.');

    if version.is_empty() {
        None
    } else {
        Some(version.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_segments_compare_as_integers() {
        assert_eq!(compare_versions("8.0.33", "8.0.9"), Ordering::Greater);
        assert_eq!(compare_versions("8.0.9", "8.0.33"), Ordering::Less);
        assert_eq!(compare_versions("10.0", "9.9.9"), Ordering::Greater);
    }

    #[test]
    fn test_missing_segments_pad_with_zero() {
        // equal numerically, tie broken lexicographically
        assert_eq!(compare_versions("8.0", "8.0.0"), Ordering::Less);
        assert_eq!(compare_versions("8.1", "8.0.5"), Ordering::Greater);
    }

    #[test]
    fn test_qualified_versions() {
        assert_eq!(compare_versions("2.1.0RC1", "2.1.0RC1"), Ordering::Equal);
        assert_eq!(compare_versions("42.7.2-SNAPSHOT", "42.7.1"), Ordering::Greater);
        assert_eq!(compare_versions("1.0.1", "1.0.0-beta"), Ordering::Greater);
    }

    #[test]
    fn test_comparison_is_deterministic() {
        let a = compare_versions("1.0.0-alpha", "1.0.0-beta");
        for _ in 0..10 {
            assert_eq!(compare_versions("1.0.0-alpha", "1.0.0-beta"), a);
        }
        assert_eq!(compare_versions("1.0.0-beta", "1.0.0-alpha"), a.reverse());
    }

    #[test]
    fn test_sort_newest_first() {
        let mut versions: Vec<String> = ["8.0.9", "8.0.33", "5.1.49", "8.0.31", "8.2.0"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        sort_newest_first(&mut versions);
        assert_eq!(versions, vec!["8.2.0", "8.0.33", "8.0.31", "8.0.9", "5.1.49"]);

        for pair in versions.windows(2) {
            assert_eq!(compare_versions(&pair[0], &pair[1]), Ordering::Greater);
        }
    }

    #[test]
    fn test_lenient_version() {
        assert_eq!(lenient_version("8.0.33"), Some(semver::Version::new(8, 0, 33)));
        assert_eq!(
            lenient_version("42.7.2-SNAPSHOT"),
            Some(semver::Version::new(42, 7, 2))
        );
        assert_eq!(lenient_version("2.1.0RC1"), Some(semver::Version::new(2, 1, 0)));
        assert_eq!(lenient_version("8.0"), Some(semver::Version::new(8, 0, 0)));
        assert_eq!(lenient_version("3.0.0.1"), Some(semver::Version::new(3, 0, 0)));
        assert_eq!(lenient_version("latest"), None);
        assert_eq!(lenient_version(""), None);
    }

    #[test]
    fn test_extract_version_standard_names() {
        assert_eq!(
            extract_version_from_file_name("mysql-connector-j-8.0.33.jar").as_deref(),
            Some("8.0.33")
        );
        assert_eq!(
            extract_version_from_file_name("postgresql-42.7.2.jar").as_deref(),
            Some("42.7.2")
        );
        assert_eq!(
            extract_version_from_file_name("some-driver-1.jar").as_deref(),
            Some("1")
        );
        assert_eq!(
            extract_version_from_file_name("driver-1.2.3.4.jar").as_deref(),
            Some("1.2.3.4")
        );
    }

    #[test]
    fn test_extract_version_drops_qualifiers() {
        for (name, expected) in [
            ("mysql-connector-j-8.0.33-beta.jar", "8.0.33"),
            ("postgresql-42.7.2-SNAPSHOT.jar", "42.7.2"),
            ("driver-1.0.0-alpha.jar", "1.0.0"),
            ("driver-2.1.0-RC1.jar", "2.1.0"),
            ("driver-3.0.0-M1.jar", "3.0.0"),
            ("driver-2.1.0RC1.jar", "2.1.0"),
            ("driver-1.0.0SNAPSHOT.jar", "1.0.0"),
            ("mysql-connector-j-8.0.33beta.jar", "8.0.33"),
        ] {
            assert_eq!(
                extract_version_from_file_name(name).as_deref(),
                Some(expected),
                "{}",
                name
            );
        }
    }

    #[test]
    fn test_extract_version_unknown() {
        assert_eq!(extract_version_from_file_name("driver.jar"), None);
        assert_eq!(extract_version_from_file_name(""), None);
        assert_eq!(extract_version_from_file_name("driver-8.0.33.zip"), None);
    }
}
