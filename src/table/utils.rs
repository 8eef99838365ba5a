use super::Value;

/// Markers a CSV export uses for a missing value.
const NA_MARKERS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "null", "NULL", "None", "<NA>", "#N/A",
];

/// 1) Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

/// 2) Infer a typed value from a raw CSV cell: NA markers → Null, then
///    integer, finite float, and finally string.
pub fn parse_cell(raw: &str) -> Value {
    let cleaned = clean_str(raw);
    if NA_MARKERS.contains(&cleaned.as_str()) {
        return Value::Null;
    }
    if let Ok(i) = cleaned.parse::<i64>() {
        return Value::Int(i);
    }
    match cleaned.parse::<f64>() {
        Ok(f) if f.is_finite() => Value::Float(f),
        _ => Value::Str(cleaned),
    }
}

/// Case-fold and replace whitespace with underscores.
pub fn normalize_column_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}
