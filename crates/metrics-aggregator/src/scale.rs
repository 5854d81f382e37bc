use serde_json::Value;

/// Power-of-ten multiplier for a financial magnitude suffix.
fn scale_multiplier(suffix: char) -> Option<f64> {
    match suffix.to_ascii_uppercase() {
        'T' => Some(1e12),
        'B' => Some(1e9),
        'M' => Some(1e6),
        'K' => Some(1e3),
        _ => None,
    }
}

/// Parse a raw fundamental value that may be numeric or a suffixed magnitude
/// string ("1.2T", "350M"). Anything unrecognized is missing, never an error.
pub fn parse_scaled_value(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => parse_scaled_str(text),
        _ => None,
    }
}

/// String form of [`parse_scaled_value`]: bare numerics parse directly, a
/// trailing T/B/M/K (any case) scales by its power of ten. Non-finite parses
/// ("nan", "inf") count as unrecognized.
pub fn parse_scaled_str(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(direct) = trimmed.parse::<f64>().ok().filter(|v| v.is_finite()) {
        return Some(direct);
    }

    let suffix = trimmed.chars().last()?;
    let multiplier = scale_multiplier(suffix)?;
    let body = trimmed[..trimmed.len() - suffix.len_utf8()].trim();
    body.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v * multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    #[test]
    fn test_parse_suffixed_magnitudes() {
        assert_relative_eq!(parse_scaled_str("1.5T").unwrap(), 1.5e12);
        assert_relative_eq!(parse_scaled_str("250M").unwrap(), 2.5e8);
        assert_relative_eq!(parse_scaled_str("3B").unwrap(), 3.0e9);
        assert_relative_eq!(parse_scaled_str("12K").unwrap(), 1.2e4);
    }

    #[test]
    fn test_parse_suffix_is_case_insensitive() {
        assert_relative_eq!(parse_scaled_str("1.5t").unwrap(), 1.5e12);
        assert_relative_eq!(parse_scaled_str("250m").unwrap(), 2.5e8);
    }

    #[test]
    fn test_parse_bare_numeric_string() {
        assert_relative_eq!(parse_scaled_str("42").unwrap(), 42.0);
        assert_relative_eq!(parse_scaled_str(" -3.25 ").unwrap(), -3.25);
    }

    #[test]
    fn test_parse_unrecognized_is_missing() {
        assert_eq!(parse_scaled_str("N/A"), None);
        assert_eq!(parse_scaled_str(""), None);
        assert_eq!(parse_scaled_str("T"), None);
        assert_eq!(parse_scaled_str("12X"), None);
        assert_eq!(parse_scaled_str("nan"), None);
        assert_eq!(parse_scaled_str("inf"), None);
    }

    #[test]
    fn test_parse_negative_scaled() {
        assert_relative_eq!(parse_scaled_str("-1.5B").unwrap(), -1.5e9);
    }

    #[test]
    fn test_parse_json_values() {
        assert_relative_eq!(parse_scaled_value(&json!(42)).unwrap(), 42.0);
        assert_relative_eq!(parse_scaled_value(&json!(2.5)).unwrap(), 2.5);
        assert_relative_eq!(parse_scaled_value(&json!("1.5T")).unwrap(), 1.5e12);
        assert_eq!(parse_scaled_value(&json!("N/A")), None);
        assert_eq!(parse_scaled_value(&json!(null)), None);
        assert_eq!(parse_scaled_value(&json!(true)), None);
        assert_eq!(parse_scaled_value(&json!(["1.5T"])), None);
    }
}
