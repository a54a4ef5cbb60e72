use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use thiserror::Error;

/// Opening of a `${key}` or `${key:default}` placeholder
static PLACEHOLDER_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{").expect("placeholder regex should be valid"));

/// Separator between a placeholder key and its default
const DEFAULT_SEPARATOR: char = ':';

/// Failure to turn a declaration expression into a concrete value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("could not resolve placeholder '{placeholder}'")]
    UnresolvablePlaceholder { placeholder: String },
    #[error("placeholder '{placeholder}' is missing its closing brace")]
    UnterminatedPlaceholder { placeholder: String },
    #[error("'{value}' is not a boolean")]
    NotABoolean { value: String },
    #[error("'{value}' is not an integer")]
    NotAnInteger { value: String },
}

/// Resolves listener declaration expressions into concrete values.
///
/// Implementations are consulted only while the registry is being built.
/// An expression may be a literal, a placeholder, a comma-separated list or
/// an array literal (`[a, b]`).
pub trait ExpressionResolver: Send + Sync {
    /// Resolve to zero or more strings.
    fn resolve_strings(&self, expression: &str) -> Result<Vec<String>, ResolveError>;

    /// Resolve to a boolean, returning `default` if the expression resolves to nothing.
    fn resolve_bool(&self, expression: &str, default: bool) -> Result<bool, ResolveError>;

    /// Resolve to an integer, returning `default` if the expression resolves to nothing.
    fn resolve_int(&self, expression: &str, default: i64) -> Result<i64, ResolveError>;
}

/// Map-backed resolver supporting `${key}` and `${key:default}` placeholders.
///
/// With [`PropertiesResolver::with_env`] enabled, keys missing from the map are
/// looked up in the process environment before falling back to the inline
/// default.
#[derive(Debug, Clone, Default)]
pub struct PropertiesResolver {
    properties: HashMap<String, String>,
    use_env: bool,
}

impl PropertiesResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_map(properties: HashMap<String, String>) -> Self {
        Self {
            properties,
            use_env: false,
        }
    }

    /// Also consult environment variables for keys not present in the map.
    #[must_use]
    pub fn with_env(mut self, enabled: bool) -> Self {
        self.use_env = enabled;
        self
    }

    /// Add or replace a single property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    fn lookup(&self, key: &str) -> Option<String> {
        if let Some(value) = self.properties.get(key) {
            return Some(value.clone());
        }
        if self.use_env {
            return std::env::var(key).ok();
        }
        None
    }

    /// Substitute every placeholder in `expression`.
    ///
    /// Keys and defaults may themselves contain placeholders
    /// (`${queue.${region}}`, `${a:${b}}`); a default is only resolved when
    /// its key is missing. Substituted values are not rescanned.
    pub fn resolve_placeholders(&self, expression: &str) -> Result<String, ResolveError> {
        let mut resolved = String::with_capacity(expression.len());
        let mut cursor = 0;
        while let Some(open) = PLACEHOLDER_START.find_at(expression, cursor) {
            let Some(close) = closing_brace(expression, open.end()) else {
                return Err(ResolveError::UnterminatedPlaceholder {
                    placeholder: expression[open.start()..].to_string(),
                });
            };
            resolved.push_str(&expression[cursor..open.start()]);
            resolved.push_str(&self.resolve_placeholder(
                &expression[open.end()..close],
                &expression[open.start()..=close],
            )?);
            cursor = close + 1;
        }
        resolved.push_str(&expression[cursor..]);
        Ok(resolved)
    }

    fn resolve_placeholder(&self, body: &str, whole: &str) -> Result<String, ResolveError> {
        let (raw_key, default) = match top_level_separator(body) {
            Some(idx) => (&body[..idx], Some(&body[idx + 1..])),
            None => (body, None),
        };
        let key = self.resolve_placeholders(raw_key)?;
        if let Some(value) = self.lookup(key.trim()) {
            return Ok(value);
        }
        match default {
            Some(default) => self.resolve_placeholders(default),
            None => Err(ResolveError::UnresolvablePlaceholder {
                placeholder: whole.to_string(),
            }),
        }
    }
}

/// Index of the `}` closing the placeholder whose body starts at `from`.
fn closing_brace(text: &str, from: usize) -> Option<usize> {
    let mut depth = 1usize;
    for (idx, byte) in text.bytes().enumerate().skip(from) {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// First key/default separator outside any nested placeholder.
fn top_level_separator(body: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, ch) in body.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            c if c == DEFAULT_SEPARATOR && depth == 0 => return Some(idx),
            _ => {}
        }
    }
    None
}

impl ExpressionResolver for PropertiesResolver {
    fn resolve_strings(&self, expression: &str) -> Result<Vec<String>, ResolveError> {
        let resolved = self.resolve_placeholders(expression)?;
        let trimmed = resolved.trim();
        let body = trimmed
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .unwrap_or(trimmed);
        Ok(body
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn resolve_bool(&self, expression: &str, default: bool) -> Result<bool, ResolveError> {
        let resolved = self.resolve_placeholders(expression)?;
        let value = resolved.trim();
        if value.is_empty() {
            return Ok(default);
        }
        if value.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if value.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(ResolveError::NotABoolean {
                value: value.to_string(),
            })
        }
    }

    fn resolve_int(&self, expression: &str, default: i64) -> Result<i64, ResolveError> {
        let resolved = self.resolve_placeholders(expression)?;
        let value = resolved.trim();
        if value.is_empty() {
            return Ok(default);
        }
        value.parse().map_err(|_| ResolveError::NotAnInteger {
            value: value.to_string(),
        })
    }
}
