//! Pickup-path date templating.
//!
//! Pickup paths may embed a literal placeholder token (default `YYYYMMDD`)
//! that expands to a concrete date at sweep time. No I/O happens here.

use chrono::NaiveDate;

/// Whether the path carries the date placeholder.
pub fn is_templated(path: &str, placeholder: &str) -> bool {
    path.contains(placeholder)
}

/// Expand the placeholder to `date` formatted as `yyyyMMdd`; paths without
/// the placeholder pass through unchanged.
pub fn resolve_pickup(path: &str, placeholder: &str, date: NaiveDate) -> String {
    if path.contains(placeholder) {
        path.replace(placeholder, &date.format("%Y%m%d").to_string())
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_placeholder_expands() {
        let resolved = resolve_pickup("/imports/YYYYMMDD/incoming", "YYYYMMDD", date(2024, 3, 7));
        assert_eq!(resolved, "/imports/20240307/incoming");
    }

    #[test]
    fn test_plain_path_unchanged() {
        let resolved = resolve_pickup("/imports/incoming", "YYYYMMDD", date(2024, 3, 7));
        assert_eq!(resolved, "/imports/incoming");
    }

    #[test]
    fn test_every_occurrence_replaced() {
        let resolved = resolve_pickup("/YYYYMMDD/a/YYYYMMDD", "YYYYMMDD", date(2024, 12, 31));
        assert_eq!(resolved, "/20241231/a/20241231");
    }

    #[test]
    fn test_is_templated() {
        assert!(is_templated("/imports/YYYYMMDD", "YYYYMMDD"));
        assert!(!is_templated("/imports/incoming", "YYYYMMDD"));
    }
}
