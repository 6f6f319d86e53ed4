//! Randomization idea log kept per session.

use serde_json::Value;

use crate::error::{LimitlabError, Result};

/// Extract the idea list from a request body field.
///
/// The field must be a JSON array of strings.
pub fn parse_ideas(value: Option<&Value>) -> Result<Vec<String>> {
    let invalid = || LimitlabError::Validation("Invalid ideas data provided.".to_string());

    let items = value.and_then(Value::as_array).ok_or_else(invalid)?;
    items
        .iter()
        .map(|v| v.as_str().map(str::to_string).ok_or_else(|| invalid().into()))
        .collect()
}

/// Append `incoming` to `existing`, dropping duplicates and keeping
/// first-seen order.
pub fn merge_ideas(existing: &[String], incoming: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(existing.len() + incoming.len());
    for idea in existing.iter().chain(incoming) {
        if !merged.contains(idea) {
            merged.push(idea.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_merge_appends_and_dedups() {
        let merged = merge_ideas(&strings(&["a", "b"]), &strings(&["b", "c", "a", "d"]));
        assert_eq!(merged, strings(&["a", "b", "c", "d"]));
    }

    #[test]
    fn test_merge_collapses_existing_duplicates() {
        let merged = merge_ideas(&strings(&["x", "x"]), &[]);
        assert_eq!(merged, strings(&["x"]));
    }

    #[test]
    fn test_parse_accepts_string_array() {
        let v = json!(["one", "two"]);
        assert_eq!(parse_ideas(Some(&v)).unwrap(), strings(&["one", "two"]));
    }

    #[test]
    fn test_parse_rejects_non_arrays_and_mixed_items() {
        assert!(parse_ideas(None).is_err());
        assert!(parse_ideas(Some(&json!("one"))).is_err());
        assert!(parse_ideas(Some(&json!(["one", 2]))).is_err());
    }
}
