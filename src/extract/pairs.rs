use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Start of a `key=` segment. Values run until the next key boundary, so a
/// value may itself contain `|` as long as no `|name=` follows it.
static KEY_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\|)\s*([A-Za-z][A-Za-z0-9_]*)=").expect("key boundary regex is valid")
});

/// Parsed `|key=value|key=value` payload.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PipePairs {
    values: HashMap<String, String>,
    /// Keys seen more than once, in order of the repeat occurrence
    pub duplicates: Vec<String>,
}

impl PipePairs {
    pub fn parse(payload: &str) -> Self {
        let payload = payload.trim().trim_end_matches('|');
        let boundaries: Vec<(usize, usize, &str)> = KEY_BOUNDARY
            .captures_iter(payload)
            .filter_map(|c| {
                let whole = c.get(0)?;
                let key = c.get(1)?;
                Some((whole.start(), whole.end(), key.as_str()))
            })
            .collect();

        let mut pairs = PipePairs::default();
        for (i, (_, value_start, key)) in boundaries.iter().enumerate() {
            let value_end = boundaries
                .get(i + 1)
                .map(|(next_start, _, _)| *next_start)
                .unwrap_or(payload.len());
            let value = unquote(payload[*value_start..value_end].trim());
            if pairs
                .values
                .insert(key.to_string(), value.to_string())
                .is_some()
            {
                pairs.duplicates.push(key.to_string());
            }
        }
        pairs
    }

    /// Raw value for `key`, with surrounding quotes removed.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Value for `key` with empty, `null` and `NA` treated as absent.
    pub fn text(&self, key: &str) -> Option<String> {
        self.get(key)
            .filter(|v| !v.is_empty() && *v != "null" && *v != "NA")
            .map(str::to_string)
    }

    pub fn integer(&self, key: &str) -> Option<i64> {
        self.get(key)?.trim().parse().ok()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_pairs() {
        let pairs = PipePairs::parse("|a=1|b=two|c=\"quoted value\"");
        assert_eq!(pairs.get("a"), Some("1"));
        assert_eq!(pairs.get("b"), Some("two"));
        assert_eq!(pairs.get("c"), Some("quoted value"));
        assert_eq!(pairs.len(), 3);
    }

    #[test]
    fn test_value_containing_pipes_extends_to_next_key() {
        let pairs = PipePairs::parse("errorMessage=first|second|third|runMode=full");
        assert_eq!(pairs.get("errorMessage"), Some("first|second|third"));
        assert_eq!(pairs.get("runMode"), Some("full"));
    }

    #[test]
    fn test_duplicate_key_last_wins() {
        let pairs = PipePairs::parse("|status=Pending|status=Success|");
        assert_eq!(pairs.get("status"), Some("Success"));
        assert_eq!(pairs.duplicates, vec!["status".to_string()]);
    }

    #[test]
    fn test_null_and_na_are_absent() {
        let pairs = PipePairs::parse("|a=null|b=NA|c=|d=x");
        assert_eq!(pairs.text("a"), None);
        assert_eq!(pairs.text("b"), None);
        assert_eq!(pairs.text("c"), None);
        assert_eq!(pairs.text("d"), Some("x".to_string()));
    }

    #[test]
    fn test_integer_parse_failure_is_absent() {
        let pairs = PipePairs::parse("|size=12a|count=7");
        assert_eq!(pairs.integer("size"), None);
        assert_eq!(pairs.integer("count"), Some(7));
    }

    #[test]
    fn test_no_pairs() {
        assert!(PipePairs::parse("just some text").is_empty());
    }
}
