/// Markers treated as a missing cell, alongside the empty string.
const NA_MARKERS: &[&str] = &[
    "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "#N/A",
];

/// 1) Trim surrounding whitespace. The CSV reader has already unquoted the
///    field, so any remaining quotes belong to the value.
pub fn clean_str(raw: &str) -> &str {
    raw.trim()
}

/// 2) Cleaned cell, or `None` when the cell is missing.
pub fn present(raw: &str) -> Option<&str> {
    let cleaned = clean_str(raw);
    if cleaned.is_empty() || NA_MARKERS.contains(&cleaned) {
        None
    } else {
        Some(cleaned)
    }
}

/// 3) Parse a present cell as a finite number.
pub fn parse_number(raw: &str) -> Option<f64> {
    present(raw)?
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// 4) Coerce into the INTEGER range. Exact integers parse directly; decimals
///    round half away from zero. Anything else is `None`.
pub fn coerce_integer(raw: &str) -> Option<i32> {
    let cell = present(raw)?;
    if let Ok(v) = cell.parse::<i64>() {
        return i32::try_from(v).ok();
    }
    let v = cell.parse::<f64>().ok().filter(|v| v.is_finite())?.round();
    if v >= i32::MIN as f64 && v <= i32::MAX as f64 {
        Some(v as i32)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleaning_only_trims() {
        assert_eq!(clean_str("  AB  "), "AB");
        assert_eq!(clean_str(" \"Flight\" "), "\"Flight\"");
        assert_eq!(clean_str("\""), "\"");
    }

    #[test]
    fn na_markers_are_missing() {
        for raw in ["", "   ", "NA", "NaN", "null", "#N/A", "None"] {
            assert_eq!(present(raw), None, "{:?}", raw);
        }
        assert_eq!(present(" Ship "), Some("Ship"));
        assert_eq!(present("0"), Some("0"));
    }

    #[test]
    fn integer_coercion() {
        assert_eq!(coerce_integer("42"), Some(42));
        assert_eq!(coerce_integer(" -7 "), Some(-7));
        assert_eq!(coerce_integer("12.5"), Some(13));
        assert_eq!(coerce_integer("-2.5"), Some(-3));
        assert_eq!(coerce_integer("1e3"), Some(1000));
        assert_eq!(coerce_integer("abc"), None);
        assert_eq!(coerce_integer(""), None);
        assert_eq!(coerce_integer("inf"), None);
        assert_eq!(coerce_integer("3000000000"), None);
    }

    #[test]
    fn number_parsing_rejects_non_finite() {
        assert_eq!(parse_number("4.0"), Some(4.0));
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("infinity"), None);
        assert_eq!(parse_number("five"), None);
    }
}
