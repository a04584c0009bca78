use crate::policy::current_policy;
use std::collections::BTreeMap;

pub type LabelMap = BTreeMap<String, String>;

/// Build a label map from `(key, value)` pairs.
pub fn labels<const N: usize>(pairs: [(&str, &str); N]) -> LabelMap {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Normalise keys, drop empty ones, cap value length and series width.
pub fn sanitize_labels(kv: LabelMap) -> LabelMap {
    let policy = current_policy();
    kv.into_iter()
        .filter_map(|(key, value)| {
            let key: String = key
                .trim()
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
                .collect();
            if key.is_empty() {
                return None;
            }
            let value: String = value
                .chars()
                .filter(|c| *c != '"' && *c != '\\' && !c.is_control())
                .take(policy.label_value_max)
                .collect();
            Some((key, value))
        })
        .take(policy.label_limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_normalised_and_values_escaped() {
        let sanitized = sanitize_labels(labels([("Trig-ger", "ti\"mer"), ("  ", "x")]));
        assert_eq!(sanitized.len(), 1);
        assert_eq!(sanitized.get("trig_ger").map(String::as_str), Some("timer"));
    }
}
