use super::{ExpressionResolver, ListenerDeclaration, ResolveError};
use crate::error::ConfigurationError;
use crate::message::InboundMessage;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

/// Resolved and validated configuration of one listener.
///
/// # Ordering
///
/// Mappings are totally ordered so the dispatcher can pick one listener
/// when several serve the same queue; the least mapping wins. Fields are
/// compared in this order:
///
/// 1. number of queue names, fewer first
/// 2. the sorted queue names, lexicographically
/// 3. `delayed_queue`, `false` first
/// 4. `num_retries`, transport default (`None`) first, then ascending
/// 5. `dead_letter_queue`, `None` first, then lexically
///
/// Two mappings compare equal only when every field is equal, and the
/// registry refuses to index two listeners with equal mappings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MappingInformation {
    queue_names: BTreeSet<String>,
    delayed_queue: bool,
    num_retries: Option<u32>,
    dead_letter_queue: Option<String>,
}

impl MappingInformation {
    pub fn new<I, S>(
        queue_names: I,
        delayed_queue: bool,
        num_retries: Option<u32>,
        dead_letter_queue: Option<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queue_names: queue_names.into_iter().map(Into::into).collect(),
            delayed_queue,
            num_retries,
            dead_letter_queue,
        }
    }

    /// Resolve a declaration into a mapping.
    ///
    /// Queue expressions are unioned. A dead letter queue expression that does
    /// not resolve to exactly one name fails here, whether or not the mapping
    /// turns out to be valid. Validity is checked by the caller.
    pub fn resolve(
        declaration: &ListenerDeclaration,
        resolver: &dyn ExpressionResolver,
    ) -> Result<Self, ConfigurationError> {
        let mut queue_names = BTreeSet::new();
        for expression in &declaration.queues {
            let names = resolver
                .resolve_strings(expression)
                .map_err(|e| resolve_error(expression, e))?;
            queue_names.extend(names);
        }

        let delayed_queue = resolver
            .resolve_bool(&declaration.delayed_queue, false)
            .map_err(|e| resolve_error(&declaration.delayed_queue, e))?;

        let num_retries = resolve_retries(&declaration.num_retries, resolver)?;

        let dead_letter_queue = match &declaration.dead_letter_queue {
            None => None,
            Some(expression) => Some(resolve_dead_letter_queue(expression, resolver)?),
        };

        Ok(Self {
            queue_names,
            delayed_queue,
            num_retries,
            dead_letter_queue,
        })
    }

    /// A mapping is valid iff it serves at least one queue.
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.queue_names.is_empty()
    }

    /// Whether this mapping serves `destination`.
    #[inline]
    #[must_use]
    pub fn matches(&self, destination: &str) -> bool {
        self.queue_names.contains(destination)
    }

    /// Whether this mapping serves the destination named by `message`.
    #[must_use]
    pub fn matches_message(&self, message: &InboundMessage) -> bool {
        message.destination().is_some_and(|d| self.matches(d))
    }

    #[must_use]
    pub fn queue_names(&self) -> &BTreeSet<String> {
        &self.queue_names
    }

    #[must_use]
    pub fn is_delayed_queue(&self) -> bool {
        self.delayed_queue
    }

    /// Retry budget, or `None` to use the transport default
    #[must_use]
    pub fn num_retries(&self) -> Option<u32> {
        self.num_retries
    }

    #[must_use]
    pub fn dead_letter_queue(&self) -> Option<&str> {
        self.dead_letter_queue.as_deref()
    }
}

fn resolve_error(expression: &str, err: ResolveError) -> ConfigurationError {
    ConfigurationError::Resolve {
        expression: expression.to_string(),
        reason: err.to_string(),
    }
}

fn resolve_retries(
    expression: &str,
    resolver: &dyn ExpressionResolver,
) -> Result<Option<u32>, ConfigurationError> {
    let value = resolver
        .resolve_int(expression, -1)
        .map_err(|e| resolve_error(expression, e))?;
    if value == -1 {
        return Ok(None);
    }
    u32::try_from(value)
        .map(Some)
        .map_err(|_| ConfigurationError::InvalidRetryCount {
            expression: expression.to_string(),
            value,
        })
}

fn resolve_dead_letter_queue(
    expression: &str,
    resolver: &dyn ExpressionResolver,
) -> Result<String, ConfigurationError> {
    let mut resolved = resolver
        .resolve_strings(expression)
        .map_err(|e| resolve_error(expression, e))?;
    match resolved.pop() {
        Some(name) if resolved.is_empty() => Ok(name),
        last => {
            resolved.extend(last);
            Err(ConfigurationError::DeadLetterQueue {
                expression: expression.to_string(),
                resolved,
            })
        }
    }
}

impl Ord for MappingInformation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.queue_names
            .len()
            .cmp(&other.queue_names.len())
            .then_with(|| self.queue_names.cmp(&other.queue_names))
            .then_with(|| self.delayed_queue.cmp(&other.delayed_queue))
            .then_with(|| self.num_retries.cmp(&other.num_retries))
            .then_with(|| self.dead_letter_queue.cmp(&other.dead_letter_queue))
    }
}

impl PartialOrd for MappingInformation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for MappingInformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let queues: Vec<&str> = self.queue_names.iter().map(String::as_str).collect();
        write!(
            f,
            "MappingInformation[queues=[{}], delayed_queue={}, num_retries=",
            queues.join(", "),
            self.delayed_queue
        )?;
        match self.num_retries {
            Some(n) => write!(f, "{n}")?,
            None => f.write_str("default")?,
        }
        match &self.dead_letter_queue {
            Some(dlq) => write!(f, ", dead_letter_queue={dlq}]"),
            None => f.write_str("]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::PropertiesResolver;

    fn resolve(decl: &ListenerDeclaration) -> Result<MappingInformation, ConfigurationError> {
        let resolver = PropertiesResolver::new()
            .with_property("two", "dlq-a,dlq-b")
            .with_property("none", "");
        MappingInformation::resolve(decl, &resolver)
    }

    #[test]
    fn queue_expressions_are_unioned() {
        let m = resolve(&ListenerDeclaration::new(["a,b", "b", "c"])).unwrap();
        let names: Vec<&str> = m.queue_names().iter().map(String::as_str).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(m.is_valid());
    }

    #[test]
    fn no_queues_is_invalid() {
        let m = resolve(&ListenerDeclaration::new([" , "])).unwrap();
        assert!(!m.is_valid());
        assert!(!m.matches(""));
    }

    #[test]
    fn dead_letter_queue_must_be_single() {
        let ok = resolve(&ListenerDeclaration::new(["q"]).dead_letter_queue("dlq")).unwrap();
        assert_eq!(ok.dead_letter_queue(), Some("dlq"));

        let two = resolve(&ListenerDeclaration::new(["q"]).dead_letter_queue("${two}"));
        match two {
            Err(ConfigurationError::DeadLetterQueue { resolved, .. }) => {
                assert_eq!(resolved, vec!["dlq-a", "dlq-b"]);
            }
            other => panic!("expected DeadLetterQueue error, got {other:?}"),
        }

        let zero = resolve(&ListenerDeclaration::new(["q"]).dead_letter_queue("${none}"));
        assert!(matches!(
            zero,
            Err(ConfigurationError::DeadLetterQueue { resolved, .. }) if resolved.is_empty()
        ));
    }

    #[test]
    fn dead_letter_check_applies_to_invalid_mappings_too() {
        let res = resolve(&ListenerDeclaration::new(Vec::<String>::new()).dead_letter_queue("x,y"));
        assert!(matches!(res, Err(ConfigurationError::DeadLetterQueue { .. })));
    }

    #[test]
    fn retry_sentinel_and_bounds() {
        let m = resolve(&ListenerDeclaration::new(["q"])).unwrap();
        assert_eq!(m.num_retries(), None);
        let m = resolve(&ListenerDeclaration::new(["q"]).num_retries("0")).unwrap();
        assert_eq!(m.num_retries(), Some(0));
        let err = resolve(&ListenerDeclaration::new(["q"]).num_retries("-2")).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidRetryCount { value: -2, .. }
        ));
    }

    #[test]
    fn ordering_prefers_fewer_queues_then_lexical() {
        let narrow = MappingInformation::new(["orders"], false, None, None);
        let wide = MappingInformation::new(["a", "orders"], false, None, None);
        let other = MappingInformation::new(["billing"], false, None, None);
        assert!(narrow < wide);
        assert!(other < narrow);

        let plain = MappingInformation::new(["q"], false, None, None);
        let delayed = MappingInformation::new(["q"], true, None, None);
        let retried = MappingInformation::new(["q"], false, Some(1), None);
        let dlq = MappingInformation::new(["q"], false, None, Some("d".to_string()));
        assert!(plain < delayed);
        assert!(plain < retried);
        assert!(plain < dlq);
        assert!(retried < delayed);
    }

    #[test]
    fn display_is_readable() {
        let m = MappingInformation::new(["b", "a"], true, Some(3), Some("dlq".to_string()));
        assert_eq!(
            m.to_string(),
            "MappingInformation[queues=[a, b], delayed_queue=true, num_retries=3, dead_letter_queue=dlq]"
        );
    }
}
