use regex::Regex;
use std::sync::OnceLock;

/// Parses one required numeric field
///
/// Accepts plain and exponential notation (`"25"`, `"2.5e1"`). Missing,
/// blank and non-finite inputs are rejected with a message naming the field.
pub fn parse_number(field: &str, raw: Option<&str>) -> Result<f64, String> {
    let text = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("{} is required", field))?;

    let value: f64 = text
        .parse()
        .map_err(|_| format!("{} must be numeric, got '{}'", field, text))?;

    if !value.is_finite() {
        return Err(format!("{} must be finite, got '{}'", field, text));
    }
    Ok(value)
}

/// Parses a fixed-length list of numbers
///
/// Numbers are picked out of each entry wherever they appear, so all of
/// these read as three values:
/// - `"1.0,1.0,1.0"`
/// - `"[1, 1, 1]"`
/// - `"0.7\\0.7\\2.5"`
/// - `"0.7x0.7x3"`
///
/// # Errors
///
/// Returns an error if an entry holds no number or the count differs
/// from `expected`
pub fn parse_number_list<S: AsRef<str>>(
    field: &str,
    raw: &[S],
    expected: usize,
) -> Result<Vec<f64>, String> {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    let re = REGEX.get_or_init(|| {
        Regex::new(r"[-+]?\d*\.?\d+(?:[eE][-+]?\d+)?").expect("Failed to compile regex")
    });

    let mut values = Vec::with_capacity(expected);
    for entry in raw {
        let entry = entry.as_ref();
        let before = values.len();
        for number in re.find_iter(entry) {
            values.push(parse_number(field, Some(number.as_str()))?);
        }
        if values.len() == before && !entry.trim().is_empty() {
            return Err(format!("{} must be numeric, got '{}'", field, entry.trim()));
        }
    }

    if values.len() != expected {
        return Err(format!(
            "{} expects {} values, got {}",
            field,
            expected,
            values.len()
        ));
    }
    Ok(values)
}

/// Parses a boolean flag (`true/false`, `yes/no`, `1/0`, `on/off`)
pub fn parse_flag(field: &str, raw: Option<&str>) -> Result<bool, String> {
    let text = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("{} is required", field))?;

    match text.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(format!("{} must be true or false, got '{}'", field, text)),
    }
}
