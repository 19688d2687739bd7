use serde_json::Value;

/// Decode a buffered server-sent-events body.
///
/// The meaningful payload is the last `data:` line whose content parses as JSON.
/// Lines that are not data lines, and data lines that are not well-formed JSON
/// (keep-alives, partial frames), are skipped.
pub fn last_data_json(body: &str) -> Option<Value> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .filter_map(|data| serde_json::from_str::<Value>(data.trim()).ok())
        .last()
}
