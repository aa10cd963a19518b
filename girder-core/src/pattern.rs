//! Path template compilation and matching.
//!
//! A template such as `/users/{id}/posts/{post}` is split on `/`. Literal
//! segments are escaped verbatim, `{name}` segments become a single-segment
//! capture (`[^/]+`), and the whole expression is anchored, so a pattern only
//! matches paths with exactly the same number of segments.
//!
//! ```
//! use girder_core::pattern::PathPattern;
//!
//! let pattern = PathPattern::compile("/dept/{id}").unwrap();
//! assert!(pattern.matches("/dept/42"));
//! assert_eq!(pattern.extract("/dept/42").unwrap().get("id"), Some("42"));
//! assert!(!pattern.matches("/dept"));
//! ```

use crate::Error;
use regex::Regex;
use std::fmt;

/// A compiled, immutable path template.
#[derive(Debug, Clone)]
pub struct PathPattern {
    template: String,
    param_names: Vec<String>,
    regex: Regex,
}

impl PathPattern {
    /// Compile a path template.
    ///
    /// Fails on unbalanced or nested braces, braces embedded in a literal
    /// segment, empty or non-identifier parameter names and duplicated
    /// parameter names.
    pub fn compile(template: &str) -> Result<Self, Error> {
        check_braces(template)?;

        let mut source = String::from("^");
        let mut param_names: Vec<String> = Vec::new();

        for segment in template.split('/').filter(|s| !s.is_empty()) {
            source.push('/');

            match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) => {
                    if name.is_empty() {
                        return Err(invalid(template, "empty parameter name"));
                    }
                    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                        return Err(invalid(
                            template,
                            &format!("parameter name '{}' must be [A-Za-z0-9_]+", name),
                        ));
                    }
                    if param_names.iter().any(|existing| existing == name) {
                        return Err(invalid(
                            template,
                            &format!("duplicate parameter '{}'", name),
                        ));
                    }
                    param_names.push(name.to_string());
                    source.push_str("([^/]+)");
                }
                None => {
                    if segment.contains('{') || segment.contains('}') {
                        return Err(invalid(
                            template,
                            &format!("segment '{}' mixes literal text and a parameter", segment),
                        ));
                    }
                    source.push_str(&regex::escape(segment));
                }
            }
        }

        if param_names.is_empty() && source.len() == 1 {
            source.push('/');
        }
        source.push('$');

        let regex = Regex::new(&source).map_err(|e| invalid(template, &e.to_string()))?;

        Ok(Self {
            template: template.to_string(),
            param_names,
            regex,
        })
    }

    /// The template this pattern was compiled from
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Parameter names in declaration order
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Number of `{name}` captures
    pub fn arity(&self) -> usize {
        self.param_names.len()
    }

    /// Exact, anchored match against a request path (no query string).
    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Extract captured parameters in declaration order.
    ///
    /// Returns `None` when the path does not match.
    pub fn extract(&self, path: &str) -> Option<PathParams> {
        let captures = self.regex.captures(path)?;
        let values = self
            .param_names
            .iter()
            .enumerate()
            .filter_map(|(i, name)| {
                captures
                    .get(i + 1)
                    .map(|m| (name.clone(), m.as_str().to_string()))
            })
            .collect();
        Some(PathParams(values))
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

/// Ordered map of path parameters extracted by a [`PathPattern`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(Vec<(String, String)>);

impl PathParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a captured value by parameter name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for PathParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn check_braces(template: &str) -> Result<(), Error> {
    let mut open = false;
    for c in template.chars() {
        match c {
            '{' if open => return Err(invalid(template, "nested '{'")),
            '{' => open = true,
            '}' if !open => return Err(invalid(template, "unbalanced '}'")),
            '}' => open = false,
            '/' if open => return Err(invalid(template, "'/' inside a parameter")),
            _ => {}
        }
    }
    if open {
        return Err(invalid(template, "unbalanced '{'"));
    }
    Ok(())
}

fn invalid(template: &str, reason: &str) -> Error {
    Error::InvalidPattern {
        template: template.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_pattern() {
        let pattern = PathPattern::compile("/users").unwrap();
        assert!(pattern.matches("/users"));
        assert!(!pattern.matches("/users/"));
        assert!(!pattern.matches("/users/1"));
        assert_eq!(pattern.arity(), 0);
    }

    #[test]
    fn test_root_pattern() {
        let pattern = PathPattern::compile("/").unwrap();
        assert!(pattern.matches("/"));
        assert!(!pattern.matches("/x"));
    }

    #[test]
    fn test_single_param() {
        let pattern = PathPattern::compile("/dept/{id}").unwrap();
        let params = pattern.extract("/dept/42").unwrap();
        assert_eq!(params.get("id"), Some("42"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_multiple_params_keep_declaration_order() {
        let pattern = PathPattern::compile("/users/{user}/posts/{post}").unwrap();
        let params = pattern.extract("/users/7/posts/99").unwrap();
        let names: Vec<&str> = params.names().collect();
        assert_eq!(names, vec!["user", "post"]);
        assert_eq!(params.get("user"), Some("7"));
        assert_eq!(params.get("post"), Some("99"));
    }

    #[test]
    fn test_segment_count_mismatch() {
        let pattern = PathPattern::compile("/users/{id}").unwrap();
        assert!(!pattern.matches("/users"));
        assert!(!pattern.matches("/users/1/2"));
        assert!(pattern.extract("/users").is_none());
    }

    #[test]
    fn test_param_never_spans_slash() {
        let pattern = PathPattern::compile("/files/{name}").unwrap();
        assert!(!pattern.matches("/files/a/b"));
    }

    #[test]
    fn test_literal_metacharacters_are_escaped() {
        let pattern = PathPattern::compile("/report.v1/{id}").unwrap();
        assert!(pattern.matches("/report.v1/3"));
        assert!(!pattern.matches("/reportXv1/3"));

        let pattern = PathPattern::compile("/a+b/(x)").unwrap();
        assert!(pattern.matches("/a+b/(x)"));
        assert!(!pattern.matches("/aab/x"));
    }

    #[test]
    fn test_duplicate_slashes_in_template_are_skipped() {
        let pattern = PathPattern::compile("//users//{id}/").unwrap();
        assert!(pattern.matches("/users/1"));
    }

    #[test]
    fn test_malformed_templates() {
        for template in [
            "/users/{id",
            "/users/id}",
            "/users/{}",
            "/users/{{id}}",
            "/users/x{id}",
            "/users/{a-b}",
            "/a/{id}/b/{id}",
        ] {
            let err = PathPattern::compile(template).unwrap_err();
            assert!(
                matches!(err, Error::InvalidPattern { .. }),
                "{} should be rejected",
                template
            );
        }
    }

    #[test]
    fn test_substituted_values_roundtrip() {
        let templates = [
            "/{a}",
            "/x/{a}/y/{b}",
            "/{a}/{b}/{c}",
            "/shop/{category}/items/{item_id}",
        ];
        let values = ["1", "hello-world", "a.b", "%20", "x_y"];

        for template in templates {
            let pattern = PathPattern::compile(template).unwrap();
            let mut path = String::new();
            let mut expected = Vec::new();
            let mut next = 0;
            for segment in template.split('/').filter(|s| !s.is_empty()) {
                path.push('/');
                if let Some(name) = segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                    let value = values[next % values.len()];
                    next += 1;
                    path.push_str(value);
                    expected.push((name.to_string(), value.to_string()));
                } else {
                    path.push_str(segment);
                }
            }

            assert!(pattern.matches(&path), "{} should match {}", template, path);
            let extracted = pattern.extract(&path).unwrap();
            let actual: Vec<(String, String)> = extracted
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            assert_eq!(actual, expected);
        }
    }
}
