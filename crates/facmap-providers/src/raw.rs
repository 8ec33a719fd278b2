//! Lenient accessors over untyped provider JSON.

use std::collections::BTreeMap;

use serde_json::Value;

/// String at `key`, or `""` when absent or not a string.
pub(crate) fn text<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// Owned, trimmed copy of [`text`].
pub(crate) fn owned_text(value: &Value, key: &str) -> String {
    text(value, key).trim().to_owned()
}

pub(crate) fn is_non_empty_str(value: Option<&Value>) -> bool {
    value
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty())
}

/// A number, or a string holding one.
pub(crate) fn number(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

/// JavaScript-style truthiness, which is how the providers encode flags.
pub(crate) fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}

/// Dictionary key for an id that may arrive as a string or an integer.
pub(crate) fn id_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Map every id in the array at `key` through `dictionary`; unknown ids
/// are dropped.
pub(crate) fn translate_ids(
    value: &Value,
    key: &str,
    dictionary: &BTreeMap<String, String>,
) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(id_key)
        .filter_map(|id| dictionary.get(&id).cloned())
        .collect()
}

/// Prefix `https://` unless the link already carries a scheme.
pub(crate) fn link(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with("http") {
        raw.to_owned()
    } else {
        format!("https://{raw}")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn number_accepts_numeric_strings() {
        assert_eq!(number(Some(&json!("52.1"))), Some(52.1));
        assert_eq!(number(Some(&json!(21))), Some(21.0));
        assert_eq!(number(Some(&json!("n/a"))), None);
        assert_eq!(number(None), None);
    }

    #[test]
    fn truthiness_follows_provider_flags() {
        assert!(truthy(Some(&json!(1))));
        assert!(truthy(Some(&json!(true))));
        assert!(!truthy(Some(&json!(0))));
        assert!(!truthy(Some(&json!(""))));
        assert!(!truthy(Some(&Value::Null)));
    }

    #[test]
    fn translate_ids_drops_unknown_entries() {
        let dictionary = BTreeMap::from([
            ("1".to_owned(), "Classic".to_owned()),
            ("2".to_owned(), "Plus".to_owned()),
        ]);
        let item = json!({"cards_ids": [2, "1", 99]});
        assert_eq!(translate_ids(&item, "cards_ids", &dictionary), vec!["Plus", "Classic"]);
    }

    #[test]
    fn link_adds_scheme_only_when_missing() {
        assert_eq!(link("gym.pl"), "https://gym.pl");
        assert_eq!(link("http://gym.pl"), "http://gym.pl");
        assert_eq!(link(""), "");
    }
}
