//! Shared utilities for the report generator.
//!
//! Small helpers used by the loader, the aggregator and the composer to keep
//! the notion of "missing" and "numeric" consistent everywhere.

// =============================================================================
// Missing-value Utilities
// =============================================================================

/// Return the cell text when it is present and not an empty string.
#[inline]
pub fn present(value: &Option<String>) -> Option<&str> {
    match value.as_deref() {
        Some(s) if !s.is_empty() => Some(s),
        _ => None,
    }
}

/// Count the cells of a column that are present.
pub fn count_present(values: &[Option<String>]) -> usize {
    values.iter().filter(|v| present(v).is_some()).count()
}

// =============================================================================
// Numeric Utilities
// =============================================================================

/// Try to parse a cell as a number.
///
/// Accepts surrounding whitespace and a decimal comma ("7,5"). Infinite and
/// NaN values are not numbers for reporting purposes.
///
/// # Example
///
/// ```rust,ignore
/// use eval_report::utils::parse_numeric_string;
///
/// assert_eq!(parse_numeric_string(" 8 "), Some(8.0));
/// assert_eq!(parse_numeric_string("7,5"), Some(7.5));
/// assert_eq!(parse_numeric_string("n/a"), None);
/// ```
pub fn parse_numeric_string(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    let parsed = match trimmed.parse::<f64>() {
        Ok(v) => v,
        Err(_) if trimmed.contains(',') && !trimmed.contains('.') => {
            trimmed.replace(',', ".").parse::<f64>().ok()?
        }
        Err(_) => return None,
    };
    parsed.is_finite().then_some(parsed)
}

/// Map a numeric value onto an integer grade in `1..=10`.
///
/// "7" and "7.0" are grade 7; 7.5, 0 and 11 are not grades.
#[inline]
pub fn as_grade(value: f64) -> Option<u8> {
    if value.fract() != 0.0 || !(1.0..=10.0).contains(&value) {
        return None;
    }
    Some(value as u8)
}

/// Format a float the way a spreadsheet shows it: integral values without a
/// fractional part.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Percentage of `part` in `whole`, zero when `whole` is zero.
#[inline]
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_present_treats_empty_as_missing() {
        assert_eq!(present(&Some("Finance".to_string())), Some("Finance"));
        assert_eq!(present(&Some(String::new())), None);
        assert_eq!(present(&None), None);
    }

    #[test]
    fn test_count_present() {
        let values = vec![Some("a".to_string()), None, Some(String::new()), Some(" ".to_string())];
        assert_eq!(count_present(&values), 2);
    }

    #[test]
    fn test_parse_numeric_string() {
        assert_eq!(parse_numeric_string("9"), Some(9.0));
        assert_eq!(parse_numeric_string(" 10.0 "), Some(10.0));
        assert_eq!(parse_numeric_string("7,5"), Some(7.5));
        assert_eq!(parse_numeric_string("-3"), Some(-3.0));
        assert_eq!(parse_numeric_string("abc"), None);
        assert_eq!(parse_numeric_string(""), None);
        assert_eq!(parse_numeric_string("NaN"), None);
        assert_eq!(parse_numeric_string("inf"), None);
    }

    #[test]
    fn test_as_grade() {
        assert_eq!(as_grade(1.0), Some(1));
        assert_eq!(as_grade(10.0), Some(10));
        assert_eq!(as_grade(0.0), None);
        assert_eq!(as_grade(11.0), None);
        assert_eq!(as_grade(7.5), None);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(7.0), "7");
        assert_eq!(format_number(7.25), "7.25");
        assert_eq!(format_number(-2.0), "-2");
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(6, 10), 60.0);
        assert_eq!(percentage(3, 0), 0.0);
    }
}
