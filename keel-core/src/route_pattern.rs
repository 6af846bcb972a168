//! Route pattern parsing and compilation
//!
//! A pattern is literal text interleaved with placeholders:
//!
//! ```text
//! /users/{id:numeric}
//! /blog/{year:numeric}/{slug:slug}
//! /files/{name}.{ext:alpha}
//! ```
//!
//! Parsing validates the placeholder syntax and produces a token list used
//! both for matching (via [`CompiledRoute`]) and for reverse URL generation.

use crate::Error;
use crate::route_constraint::Constraint;
use crate::route_params::RouteParams;
use regex::Regex;

/// A piece of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Text that must appear verbatim in the path.
    Literal(String),
    /// A named dynamic piece of a segment.
    Placeholder { name: String, constraint: Constraint },
}

/// A parsed, validated route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    source: String,
    tokens: Vec<Token>,
}

fn invalid(pattern: &str, reason: impl Into<String>) -> Error {
    Error::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.into(),
    }
}

/// Leading `/` is implied and a single trailing `/` is dropped, except for
/// the root pattern.
fn normalize_pattern(pattern: &str) -> String {
    let trimmed = pattern.trim();
    let mut source = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    };
    if source.len() > 1 && source.ends_with('/') {
        source.pop();
    }
    source
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

impl RoutePattern {
    /// Parse a pattern, failing with `InvalidPattern` on malformed syntax.
    pub fn parse(pattern: &str) -> Result<Self, Error> {
        let source = normalize_pattern(pattern);
        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars();

        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    let mut body = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        match c {
                            '}' => {
                                closed = true;
                                break;
                            }
                            '{' => return Err(invalid(&source, "nested '{' inside placeholder")),
                            '/' => {
                                return Err(invalid(&source, "placeholder cannot span segments"));
                            }
                            c => body.push(c),
                        }
                    }
                    if !closed {
                        return Err(invalid(&source, "unterminated placeholder"));
                    }
                    if !literal.is_empty() {
                        tokens.push(Token::Literal(std::mem::take(&mut literal)));
                    }
                    let token = Self::parse_placeholder(&source, &body, &tokens)?;
                    tokens.push(token);
                }
                '}' => return Err(invalid(&source, "unmatched '}'")),
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }

        Ok(Self { source, tokens })
    }

    fn parse_placeholder(source: &str, body: &str, seen: &[Token]) -> Result<Token, Error> {
        let (name, constraint) = match body.split_once(':') {
            Some((name, tag)) => {
                let constraint = Constraint::from_tag(tag.trim()).ok_or_else(|| {
                    invalid(source, format!("unknown constraint '{}' on '{}'", tag, name))
                })?;
                (name.trim(), constraint)
            }
            None => (body.trim(), Constraint::Any),
        };

        if !is_valid_name(name) {
            return Err(invalid(source, format!("invalid placeholder name '{}'", name)));
        }

        let duplicate = seen
            .iter()
            .any(|t| matches!(t, Token::Placeholder { name: n, .. } if n == name));
        if duplicate {
            return Err(invalid(source, format!("duplicate placeholder '{}'", name)));
        }

        Ok(Token::Placeholder {
            name: name.to_string(),
            constraint,
        })
    }

    /// The normalized pattern text.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Placeholder names, left to right.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().filter_map(|t| match t {
            Token::Placeholder { name, .. } => Some(name.as_str()),
            Token::Literal(_) => None,
        })
    }

    /// Build the anchored regex source for this pattern.
    pub fn regex_source(&self) -> String {
        let mut expr = String::with_capacity(self.source.len() + 16);
        expr.push('^');
        for token in &self.tokens {
            match token {
                Token::Literal(text) => expr.push_str(&regex::escape(text)),
                Token::Placeholder { constraint, .. } => {
                    expr.push('(');
                    expr.push_str(constraint.fragment());
                    expr.push(')');
                }
            }
        }
        expr.push('$');
        expr
    }

    /// Compile into an anchored matcher with one capture per placeholder.
    pub fn compile(&self) -> Result<CompiledRoute, Error> {
        let params = self.placeholders().map(str::to_string).collect();
        CompiledRoute::from_source(&self.source, self.regex_source(), params)
    }
}

/// An anchored matcher plus the placeholder names it captures, in order.
#[derive(Debug, Clone)]
pub struct CompiledRoute {
    regex: Regex,
    params: Vec<String>,
}

impl CompiledRoute {
    /// Build from a regex source, e.g. one read back from the route cache.
    pub fn from_source(pattern: &str, expr: String, params: Vec<String>) -> Result<Self, Error> {
        let regex = Regex::new(&expr).map_err(|e| invalid(pattern, e.to_string()))?;
        if regex.captures_len() != params.len() + 1 {
            return Err(invalid(
                pattern,
                format!(
                    "matcher has {} capture groups for {} placeholders",
                    regex.captures_len() - 1,
                    params.len()
                ),
            ));
        }
        Ok(Self { regex, params })
    }

    /// The regex source.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Match a normalized path, returning the captured text verbatim in
    /// pattern order.
    pub fn captures(&self, path: &str) -> Option<RouteParams> {
        let caps = self.regex.captures(path)?;
        let mut params = RouteParams::with_capacity(self.params.len());
        for (index, name) in self.params.iter().enumerate() {
            let raw = caps.get(index + 1).map(|m| m.as_str()).unwrap_or_default();
            params.push(name.as_str(), raw);
        }
        Some(params)
    }
}
