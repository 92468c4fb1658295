use once_cell::sync::Lazy;
use regex::Regex;

#[allow(clippy::expect_used)]
static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)(?:\.(\d+))?(?:\.(\d+))?").expect("Invalid regex"));

/// Parse a server version string into `major * 10000 + minor * 100 + patch`.
///
/// e.g. "10.5.8-MariaDB-log" -> `100_508`, "8.0" -> `80_000`.
/// Returns 0 if the string does not start with a number.
#[must_use]
pub fn parse_version(version: &str) -> u64 {
    VERSION_RE.captures(version.trim()).map_or(0, |caps| {
        let part = |i| {
            caps.get(i)
                .map_or(0, |m| m.as_str().parse::<u64>().unwrap_or(0))
        };
        part(1) * 10_000 + part(2) * 100 + part(3)
    })
}

/// Render a version number back into dotted form for logs.
#[must_use]
pub fn format_version(version: u64) -> String {
    format!(
        "{}.{}.{}",
        version / 10_000,
        (version / 100) % 100,
        version % 100
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("10.5.8-MariaDB"), 100_508);
        assert_eq!(parse_version("10.11.2-MariaDB-1:10.11.2+maria~ubu2204"), 101_102);
        assert_eq!(parse_version("5.0.1"), 50_001);
        assert_eq!(parse_version("8.0.36-0ubuntu0.22.04.1"), 80_036);
        assert_eq!(parse_version("11.4"), 110_400);
        assert_eq!(parse_version("12"), 120_000);
        assert_eq!(parse_version(" 5.6.51 "), 50_651);
        assert_eq!(parse_version("invalid"), 0);
        assert_eq!(parse_version(""), 0);
    }

    #[test]
    fn test_format_version() {
        assert_eq!(format_version(100_508), "10.5.8");
        assert_eq!(format_version(50_002), "5.0.2");
        assert_eq!(format_version(0), "0.0.0");
    }
}
