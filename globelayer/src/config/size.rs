//! Human-readable byte sizes.

const UNITS: [(&str, u64); 4] = [
    ("TB", 1024 * 1024 * 1024 * 1024),
    ("GB", 1024 * 1024 * 1024),
    ("MB", 1024 * 1024),
    ("KB", 1024),
];

/// Formats a byte count with the largest unit that keeps it above one.
///
/// ```
/// use globelayer::config::format_size;
///
/// assert_eq!(format_size(512), "512 B");
/// assert_eq!(format_size(3 * 1024 * 1024 / 2), "1.5 MB");
/// ```
pub fn format_size(bytes: u64) -> String {
    for (unit, scale) in UNITS {
        if bytes >= scale {
            return format!("{:.1} {}", bytes as f64 / scale as f64, unit);
        }
    }
    format!("{} B", bytes)
}

/// Parses sizes like `512MB`, `2 GB`, `1.5gb` or a plain byte count.
pub fn parse_size(text: &str) -> Option<u64> {
    let text = text.trim();
    let upper = text.to_ascii_uppercase();
    for (unit, scale) in UNITS {
        if let Some(number) = upper.strip_suffix(unit) {
            let value: f64 = number.trim().parse().ok()?;
            if !value.is_finite() || value < 0.0 {
                return None;
            }
            return Some((value * scale as f64) as u64);
        }
    }
    upper.strip_suffix('B').unwrap_or(&upper).trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_units() {
        assert_eq!(parse_size("512MB"), Some(512 * 1024 * 1024));
        assert_eq!(parse_size("2 gb"), Some(2 * 1024 * 1024 * 1024));
        assert_eq!(parse_size("1.5KB"), Some(1536));
        assert_eq!(parse_size("4096"), Some(4096));
        assert_eq!(parse_size("10 B"), Some(10));
    }

    #[test]
    fn test_parse_size_rejects_garbage() {
        assert_eq!(parse_size("lots"), None);
        assert_eq!(parse_size("-1MB"), None);
        assert_eq!(parse_size(""), None);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024 * 1024), "5.0 GB");
    }
}
