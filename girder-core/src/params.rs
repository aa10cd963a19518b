// Flat, multi-valued request parameter space

use crate::logging::warn;
use std::collections::HashMap;

/// Query and form parameters of a single request.
///
/// Keys keep insertion order and may carry several values (repeated form
/// fields). Nested structures use the `name[index]` / `name.field`
/// convention, which the binder interprets; this type stores keys verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSpace {
    entries: Vec<(String, Vec<String>)>,
    /// Position of each key in `entries`
    index: HashMap<String, usize>,
}

impl ParameterSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an `application/x-www-form-urlencoded` string (query string or
    /// form body). `+` decodes to a space.
    pub fn parse(encoded: &str) -> Self {
        let mut space = Self::new();
        space.extend_from_encoded(encoded);
        space
    }

    /// Append every pair of an urlencoded string, after existing values.
    pub fn extend_from_encoded(&mut self, encoded: &str) {
        let encoded = encoded.trim_start_matches('?');
        if encoded.is_empty() {
            return;
        }
        match serde_urlencoded::from_str::<Vec<(String, String)>>(encoded) {
            Ok(pairs) => {
                for (key, value) in pairs {
                    self.append(key, value);
                }
            }
            Err(e) => warn!(error = %e, "Ignoring undecodable parameters"),
        }
    }

    /// Add a value under `key`, keeping any previous values.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.index.get(&key) {
            Some(&position) => self.entries[position].1.push(value),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, vec![value]));
            }
        }
    }

    /// All values for a key
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.index
            .get(key)
            .map(|&position| self.entries[position].1.as_slice())
    }

    /// First value for a key
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, values)| (k.as_str(), values.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for ParameterSpace
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut space = Self::new();
        for (key, value) in iter {
            space.append(key, value);
        }
        space
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_string() {
        let params = ParameterSpace::parse("name=john&age=30");
        assert_eq!(params.first("name"), Some("john"));
        assert_eq!(params.first("age"), Some("30"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_repeated_keys_are_multi_valued() {
        let params = ParameterSpace::parse("tag=a&tag=b&other=x&tag=c");
        assert_eq!(
            params.get("tag"),
            Some(&["a".to_string(), "b".to_string(), "c".to_string()][..])
        );
        let keys: Vec<&str> = params.keys().collect();
        assert_eq!(keys, vec!["tag", "other"]);
    }

    #[test]
    fn test_percent_and_plus_decoding() {
        let params = ParameterSpace::parse("emp.name=Bob+Smith&list%5B0%5D=a%2Fb");
        assert_eq!(params.first("emp.name"), Some("Bob Smith"));
        assert_eq!(params.first("list[0]"), Some("a/b"));
    }

    #[test]
    fn test_leading_question_mark_and_empty() {
        assert!(ParameterSpace::parse("").is_empty());
        assert_eq!(ParameterSpace::parse("?a=1").first("a"), Some("1"));
    }

    #[test]
    fn test_from_iterator() {
        let params: ParameterSpace = [("a", "1"), ("b", "2"), ("a", "3")].into_iter().collect();
        assert_eq!(params.get("a").map(|v| v.len()), Some(2));
        assert!(params.contains_key("b"));
        assert!(!params.contains_key("c"));
    }

    #[test]
    fn test_many_keys_keep_order_and_values() {
        let mut params = ParameterSpace::new();
        for round in 0..3 {
            for i in 0..5_000 {
                params.append(format!("rows[{}].id", i), format!("{}-{}", i, round));
            }
        }

        assert_eq!(params.len(), 5_000);
        assert_eq!(params.keys().next(), Some("rows[0].id"));
        assert_eq!(params.keys().last(), Some("rows[4999].id"));
        assert_eq!(
            params.get("rows[1234].id"),
            Some(&["1234-0".to_string(), "1234-1".to_string(), "1234-2".to_string()][..])
        );
        assert!(params.contains_key("rows[4999].id"));
        assert!(!params.contains_key("rows[5000].id"));
    }
}
