use crate::typed::HandlerMethod;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;

fn default_delayed_queue() -> String {
    "false".to_string()
}

fn default_num_retries() -> String {
    "-1".to_string()
}

/// Declarative listener metadata, the equivalent of a queue-listener annotation.
///
/// Every field holds an unresolved expression; values are only resolved when
/// the registry is built. In YAML, scalar fields accept plain numbers and
/// booleans as well as strings, and `queues` accepts a single string.
///
/// ```rust
/// use rqueue::listener::ListenerDeclaration;
///
/// let decl = ListenerDeclaration::new(["${orders.queue}", "orders-eu"])
///     .num_retries("3")
///     .dead_letter_queue("orders-dlq");
/// assert_eq!(decl.queues.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListenerDeclaration {
    /// Queue name expressions; each may expand to several names
    #[serde(alias = "value", deserialize_with = "one_or_many")]
    pub queues: Vec<String>,
    /// Whether the queues are delayed queues (default `"false"`)
    #[serde(default = "default_delayed_queue", deserialize_with = "scalar")]
    pub delayed_queue: String,
    /// Retry budget; `-1` means "transport default" (default `"-1"`)
    #[serde(default = "default_num_retries", deserialize_with = "scalar")]
    pub num_retries: String,
    /// Dead letter queue expression; must resolve to exactly one name when set
    #[serde(default, alias = "dead_later_queue")]
    pub dead_letter_queue: Option<String>,
}

impl ListenerDeclaration {
    pub fn new<I, S>(queues: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queues: queues.into_iter().map(Into::into).collect(),
            delayed_queue: default_delayed_queue(),
            num_retries: default_num_retries(),
            dead_letter_queue: None,
        }
    }

    #[must_use]
    pub fn delayed_queue(mut self, expression: impl Into<String>) -> Self {
        self.delayed_queue = expression.into();
        self
    }

    #[must_use]
    pub fn num_retries(mut self, expression: impl Into<String>) -> Self {
        self.num_retries = expression.into();
        self
    }

    #[must_use]
    pub fn dead_letter_queue(mut self, expression: impl Into<String>) -> Self {
        self.dead_letter_queue = Some(expression.into());
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(i64),
    Bool(bool),
}

impl From<Scalar> for String {
    fn from(s: Scalar) -> Self {
        match s {
            Scalar::Text(t) => t,
            Scalar::Int(i) => i.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

fn scalar<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Scalar::deserialize(deserializer).map(String::from)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

/// One method of a listener component, with its declaration if it has one.
///
/// Methods without a declaration are skipped during scanning, the same way
/// un-annotated methods are.
#[derive(Clone)]
pub struct ListenerMethod {
    pub name: String,
    pub declaration: Option<ListenerDeclaration>,
    pub handler: Arc<dyn HandlerMethod>,
}

impl ListenerMethod {
    pub fn new(
        name: impl Into<String>,
        declaration: ListenerDeclaration,
        handler: Arc<dyn HandlerMethod>,
    ) -> Self {
        Self {
            name: name.into(),
            declaration: Some(declaration),
            handler,
        }
    }

    /// A method that carries no listener declaration.
    pub fn undeclared(name: impl Into<String>, handler: Arc<dyn HandlerMethod>) -> Self {
        Self {
            name: name.into(),
            declaration: None,
            handler,
        }
    }
}

/// An application component exposing listener methods for scanning.
pub trait ListenerComponent: Send + Sync {
    /// Name used in logs and ambiguity errors
    fn component_name(&self) -> &str;

    /// Every method the component exposes
    fn methods(&self) -> Vec<ListenerMethod>;
}
