//! URI templates for resource families.
//!
//! A template such as `file:///logs/{date}` compiles to an anchored regex.
//! `{name}` matches one path segment; `{+name}` may span `/`.

use {
    crate::error::{McpError, McpResult},
    regex::Regex,
    std::collections::HashMap,
};

#[derive(Debug, Clone)]
pub struct UriTemplate {
    template: String,
    regex: Regex,
    variables: Vec<String>,
}

impl UriTemplate {
    pub fn parse(template: &str) -> McpResult<Self> {
        let invalid = |reason: String| McpError::InvalidUriTemplate {
            template: template.to_string(),
            reason,
        };

        let mut pattern = String::from("^");
        let mut variables: Vec<String> = Vec::new();
        let mut rest = template;

        while let Some(brace) = rest.find(['{', '}']) {
            let (literal, tail) = rest.split_at(brace);
            pattern.push_str(&regex::escape(literal));
            if tail.starts_with('}') {
                return Err(invalid("unmatched '}'".to_string()));
            }
            let close = tail
                .find('}')
                .ok_or_else(|| invalid("unclosed '{'".to_string()))?;
            let expression = &tail[1..close];
            if expression.contains('{') {
                return Err(invalid("nested '{'".to_string()));
            }

            let (spans_segments, name) = match expression.strip_prefix('+') {
                Some(name) => (true, name),
                None => (false, expression),
            };
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(invalid(format!("invalid placeholder '{{{expression}}}'")));
            }
            if variables.iter().any(|existing| existing == name) {
                return Err(invalid(format!("duplicate placeholder '{name}'")));
            }
            variables.push(name.to_string());
            pattern.push_str(if spans_segments { "(.+)" } else { "([^/]+)" });
            rest = &tail[close + 1..];
        }
        pattern.push_str(&regex::escape(rest));
        pattern.push('$');

        let regex = Regex::new(&pattern).map_err(|e| invalid(e.to_string()))?;
        Ok(Self {
            template: template.to_string(),
            regex,
            variables,
        })
    }

    /// Placeholder values if `uri` matches, keyed by placeholder name
    pub fn matches(&self, uri: &str) -> Option<HashMap<String, String>> {
        let captures = self.regex.captures(uri)?;
        Some(
            self.variables
                .iter()
                .enumerate()
                .filter_map(|(index, name)| {
                    captures
                        .get(index + 1)
                        .map(|value| (name.clone(), value.as_str().to_string()))
                })
                .collect(),
        )
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_placeholders() {
        let template = UriTemplate::parse("file:///logs/{year}/{day}.txt").unwrap();
        assert_eq!(template.variables(), ["year", "day"]);

        let values = template.matches("file:///logs/2024/07.txt").unwrap();
        assert_eq!(values["year"], "2024");
        assert_eq!(values["day"], "07");

        assert!(template.matches("file:///logs/2024/a/07.txt").is_none());
        assert!(template.matches("file:///logs/2024/07.txt.bak").is_none());
    }

    #[test]
    fn test_literal_regex_characters_are_escaped() {
        let template = UriTemplate::parse("db://table.{name}?v=1").unwrap();
        assert!(template.matches("db://table.users?v=1").is_some());
        assert!(template.matches("db://tableXusers?v=1").is_none());
    }

    #[test]
    fn test_reserved_expansion_spans_segments() {
        let template = UriTemplate::parse("repo://{+path}").unwrap();
        assert_eq!(template.matches("repo://src/lib.rs").unwrap()["path"], "src/lib.rs");
    }

    #[test]
    fn test_invalid_templates_fail() {
        for bad in ["a/{", "a/}", "a/{}", "a/{x}/{x}", "a/{b{c}}", "a/{bad-name}"] {
            assert!(
                matches!(UriTemplate::parse(bad), Err(McpError::InvalidUriTemplate { .. })),
                "{bad} should be rejected"
            );
        }
    }
}
