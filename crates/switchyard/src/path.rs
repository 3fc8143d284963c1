//! Path template compilation and matching.

use std::collections::HashMap;

use percent_encoding::percent_decode_str;
use regex::Regex;

use crate::error::{Result, RouterError};
use crate::request::PathParams;

/// A piece of a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Literal text, matched verbatim.
    Literal(String),
    /// A `{name}` placeholder matching one or more non-slash characters.
    Param(String),
}

/// A compiled path template.
#[derive(Debug, Clone)]
pub struct PathPattern {
    /// The raw template string.
    pattern: String,
    /// Parsed template pieces.
    segments: Vec<PathSegment>,
    /// Compiled, fully anchored regex.
    regex: Regex,
    /// Parameter names in order of appearance.
    param_names: Vec<String>,
}

impl PathPattern {
    /// Compiles a path template.
    ///
    /// Template syntax:
    /// - `/users` - Literal path
    /// - `/users/{id}` - Path with a parameter
    /// - `/files/{name}.txt` - Parameters may sit inside a segment
    ///
    /// Unbalanced braces, empty or non-identifier names and repeated names
    /// are rejected with [`RouterError::InvalidPattern`].
    ///
    /// # Example
    ///
    /// ```
    /// use switchyard::PathPattern;
    ///
    /// let pattern = PathPattern::new("/posts/{id}/comments/{comment_id}").unwrap();
    /// let params = pattern.match_path("/posts/123/comments/456").unwrap();
    /// assert_eq!(params.get("id"), Some("123"));
    /// assert_eq!(params.get("comment_id"), Some("456"));
    /// ```
    pub fn new(pattern: &str) -> Result<Self> {
        let segments = tokenize(pattern)?;
        let mut param_names: Vec<String> = Vec::new();
        let mut regex_str = String::from("^");

        for segment in &segments {
            match segment {
                PathSegment::Literal(text) => regex_str.push_str(&regex::escape(text)),
                PathSegment::Param(name) => {
                    if param_names.contains(name) {
                        return Err(invalid(pattern, format!("duplicate parameter `{name}`")));
                    }
                    param_names.push(name.clone());
                    regex_str.push_str("([^/]+)");
                }
            }
        }

        regex_str.push('$');

        let regex = Regex::new(&regex_str).map_err(|e| invalid(pattern, e.to_string()))?;
        debug_assert_eq!(regex.captures_len() - 1, param_names.len());

        Ok(Self {
            pattern: pattern.to_string(),
            segments,
            regex,
            param_names,
        })
    }

    /// Returns true if the whole path matches.
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Attempts to match a path against this pattern.
    ///
    /// Returns extracted parameters, in template order, if the path matches.
    /// Captured values are percent-decoded, so paths built by
    /// [`PathPattern::reverse`] yield the values they were built from.
    pub fn match_path(&self, path: &str) -> Option<PathParams> {
        let caps = self.regex.captures(path)?;

        let mut params = PathParams::new();
        for (name, value) in self.param_names.iter().zip(caps.iter().skip(1)) {
            if let Some(value) = value {
                params.insert(name.clone(), decode_segment(value.as_str()));
            }
        }

        Some(params)
    }

    /// Returns the raw template string.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns the parsed template pieces.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Returns the parameter names.
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Generates a path from parameters.
    ///
    /// Values are percent-encoded so they stay inside one path segment.
    /// Keys the template does not use are ignored. Returns the name of the
    /// first placeholder without a value as the error.
    pub fn reverse<'a>(
        &'a self,
        params: &HashMap<String, String>,
    ) -> std::result::Result<String, &'a str> {
        let mut path = String::with_capacity(self.pattern.len());

        for segment in &self.segments {
            match segment {
                PathSegment::Literal(text) => path.push_str(text),
                PathSegment::Param(name) => {
                    let value = params.get(name).ok_or(name.as_str())?;
                    path.push_str(&encode_segment(value));
                }
            }
        }

        Ok(path)
    }
}

/// Splits a template into literal and placeholder pieces.
fn tokenize(template: &str) -> Result<Vec<PathSegment>> {
    let mut segments = Vec::new();
    let mut rest = template;
    let mut offset = 0;

    while let Some(open) = rest.find(|c: char| c == '{' || c == '}') {
        let (literal, tail) = rest.split_at(open);
        if tail.starts_with('}') {
            return Err(invalid(
                template,
                format!("unmatched `}}` at offset {}", offset + open),
            ));
        }
        if !literal.is_empty() {
            segments.push(PathSegment::Literal(literal.to_string()));
        }

        let after = &tail[1..];
        let close = after.find('}').ok_or_else(|| {
            invalid(template, format!("unclosed `{{` at offset {}", offset + open))
        })?;
        let name = &after[..close];
        if !is_identifier(name) {
            return Err(invalid(template, format!("invalid parameter name `{name}`")));
        }
        segments.push(PathSegment::Param(name.to_string()));

        rest = &after[close + 1..];
        offset += open + close + 2;
    }

    if !rest.is_empty() {
        segments.push(PathSegment::Literal(rest.to_string()));
    }

    Ok(segments)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Percent-encodes a value for use inside a single path segment.
fn encode_segment(value: &str) -> String {
    // byte_serialize escapes a literal '+' as %2B, so every '+' left is a space.
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Percent-decodes a captured segment. Invalid UTF-8 is replaced, not rejected.
fn decode_segment(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}

fn invalid(template: &str, reason: String) -> RouterError {
    RouterError::InvalidPattern {
        template: template.to_string(),
        reason,
    }
}
