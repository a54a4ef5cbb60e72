//! Listener declaration files.
//!
//! A declaration file lists listeners and the properties their expressions
//! refer to, so a registry can be built without code:
//!
//! ```yaml
//! properties:
//!   orders.queue: orders
//!   orders.retries: 3
//! listeners:
//!   - component: billing
//!     method: on_order
//!     declaration:
//!       queues: ["${orders.queue}", orders-eu]
//!       num_retries: "${orders.retries}"
//!       dead_letter_queue: orders-dlq
//!   - method: on_job
//!     declaration:
//!       queues: jobs
//! ```

use crate::listener::{ListenerDeclaration, PropertiesResolver};
use crate::registry::RegistryBuilder;
use crate::typed::HandlerMethod;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

fn default_component() -> String {
    "declarations".to_string()
}

/// One listener entry of a declaration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListenerEntry {
    #[serde(default = "default_component")]
    pub component: String,
    pub method: String,
    pub declaration: ListenerDeclaration,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum PropertyValue {
    Text(String),
    Int(i64),
    Bool(bool),
    List(Vec<String>),
}

impl From<PropertyValue> for String {
    fn from(value: PropertyValue) -> Self {
        match value {
            PropertyValue::Text(s) => s,
            PropertyValue::Int(i) => i.to_string(),
            PropertyValue::Bool(b) => b.to_string(),
            PropertyValue::List(items) => items.join(","),
        }
    }
}

fn properties<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = BTreeMap::<String, PropertyValue>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|(k, v)| (k, v.into())).collect())
}

/// Parsed declaration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListenerFile {
    /// Property values for `${...}` placeholders; lists are joined with commas
    #[serde(default, deserialize_with = "properties")]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub listeners: Vec<ListenerEntry>,
}

impl ListenerFile {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("Invalid listener declaration file")
    }

    /// Resolver over this file's properties, optionally falling back to the
    /// process environment.
    #[must_use]
    pub fn resolver(&self, use_env: bool) -> PropertiesResolver {
        let properties: HashMap<String, String> = self
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        PropertiesResolver::from_map(properties).with_env(use_env)
    }

    /// A builder holding every entry, bound to the handler `make_handler` returns for it.
    pub fn registry_builder<F>(&self, mut make_handler: F) -> RegistryBuilder
    where
        F: FnMut(&ListenerEntry) -> Arc<dyn HandlerMethod>,
    {
        self.listeners
            .iter()
            .fold(RegistryBuilder::new(), |builder, entry| {
                let handler = make_handler(entry);
                builder.listener(
                    entry.component.clone(),
                    entry.method.clone(),
                    entry.declaration.clone(),
                    handler,
                )
            })
    }
}

/// Read and parse a declaration file.
pub fn load_listener_file(path: impl AsRef<Path>) -> Result<ListenerFile> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read listener file {}", path.display()))?;
    ListenerFile::from_yaml_str(&text).with_context(|| format!("In {}", path.display()))
}
