use crate::converter::TargetType;
use crate::error::{ConfigurationError, DispatchError};
use crate::listener::{
    ExpressionResolver, ListenerComponent, ListenerDeclaration, MappingInformation,
};
use crate::typed::HandlerMethod;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One listener bound to its resolved mapping.
///
/// Owned by the [`MappingRegistry`]; immutable once built.
#[derive(Clone)]
pub struct HandlerRegistration {
    mapping: Arc<MappingInformation>,
    component: Arc<str>,
    method: Arc<str>,
    handler: Arc<dyn HandlerMethod>,
}

impl HandlerRegistration {
    #[must_use]
    pub fn mapping(&self) -> &Arc<MappingInformation> {
        &self.mapping
    }

    #[must_use]
    pub fn component(&self) -> &str {
        &self.component
    }

    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    #[must_use]
    pub fn handler(&self) -> &Arc<dyn HandlerMethod> {
        &self.handler
    }

    /// `component::method`, as used in logs and errors
    #[must_use]
    pub fn handler_name(&self) -> String {
        format!("{}::{}", self.component, self.method)
    }

    #[must_use]
    pub fn target_type(&self) -> TargetType {
        self.handler.target_type()
    }
}

impl fmt::Debug for HandlerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistration")
            .field("handler", &self.handler_name())
            .field("mapping", &self.mapping)
            .field("target_type", &self.handler.target_type())
            .finish()
    }
}

/// A declared listener that was left out of the registry because its mapping
/// names no queue.
#[derive(Debug, Clone)]
pub struct SkippedListener {
    pub component: String,
    pub method: String,
    pub mapping: MappingInformation,
}

struct PendingListener {
    component: String,
    method: String,
    declaration: ListenerDeclaration,
    handler: Arc<dyn HandlerMethod>,
}

/// Collects listener declarations at startup and seals them into a [`MappingRegistry`].
///
/// ```rust
/// use rqueue::listener::{ListenerDeclaration, PropertiesResolver};
/// use rqueue::registry::RegistryBuilder;
/// use rqueue::typed::{handler_fn, TypedMessage};
///
/// let registry = RegistryBuilder::new()
///     .listener(
///         "orders",
///         "on_order",
///         ListenerDeclaration::new(["${orders.queue:orders}"]).num_retries("3"),
///         handler_fn(|_msg: TypedMessage<serde_json::Value>| Ok(())),
///     )
///     .build(&PropertiesResolver::new())
///     .unwrap();
///
/// let selected = registry.select_handler("orders").unwrap();
/// assert_eq!(selected.mapping().num_retries(), Some(3));
/// ```
#[derive(Default)]
pub struct RegistryBuilder {
    pending: Vec<PendingListener>,
}

impl RegistryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one listener explicitly.
    #[must_use]
    pub fn listener(
        mut self,
        component: impl Into<String>,
        method: impl Into<String>,
        declaration: ListenerDeclaration,
        handler: Arc<dyn HandlerMethod>,
    ) -> Self {
        self.pending.push(PendingListener {
            component: component.into(),
            method: method.into(),
            declaration,
            handler,
        });
        self
    }

    /// Register every declared method of `component`.
    ///
    /// Methods without a declaration are ignored.
    #[must_use]
    pub fn component(mut self, component: &dyn ListenerComponent) -> Self {
        let name = component.component_name().to_string();
        for method in component.methods() {
            let Some(declaration) = method.declaration else {
                debug!(component = %name, method = %method.name, "Method has no listener declaration");
                continue;
            };
            self.pending.push(PendingListener {
                component: name.clone(),
                method: method.name,
                declaration,
                handler: method.handler,
            });
        }
        self
    }

    /// Number of listeners collected so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Resolve every declaration and seal the registry.
    ///
    /// Listeners whose mapping names no queue are logged and skipped. Any
    /// resolution failure, or two listeners with identical mappings, aborts
    /// the build.
    pub fn build(
        self,
        resolver: &dyn ExpressionResolver,
    ) -> Result<MappingRegistry, ConfigurationError> {
        let mut index: HashMap<String, Vec<Arc<HandlerRegistration>>> = HashMap::new();
        let mut registrations: Vec<Arc<HandlerRegistration>> =
            Vec::with_capacity(self.pending.len());
        let mut skipped = Vec::new();
        let mut seen: HashMap<Arc<MappingInformation>, String> = HashMap::new();

        for pending in self.pending {
            let mapping = MappingInformation::resolve(&pending.declaration, resolver)?;

            if !mapping.is_valid() {
                warn!(
                    component = %pending.component,
                    method = %pending.method,
                    mapping = %mapping,
                    "Invalid listener mapping, no queue names - skipping"
                );
                skipped.push(SkippedListener {
                    component: pending.component,
                    method: pending.method,
                    mapping,
                });
                continue;
            }

            let mapping = Arc::new(mapping);
            let registration = Arc::new(HandlerRegistration {
                mapping: Arc::clone(&mapping),
                component: Arc::from(pending.component),
                method: Arc::from(pending.method),
                handler: pending.handler,
            });

            if let Some(existing) = seen.get(&mapping) {
                return Err(ConfigurationError::AmbiguousMapping {
                    mapping: mapping.as_ref().clone(),
                    existing: existing.clone(),
                    duplicate: registration.handler_name(),
                });
            }
            seen.insert(Arc::clone(&mapping), registration.handler_name());

            for queue in mapping.queue_names() {
                index
                    .entry(queue.clone())
                    .or_default()
                    .push(Arc::clone(&registration));
            }

            debug!(
                handler = %registration.handler_name(),
                mapping = %mapping,
                target_type = registration.target_type().type_name(),
                "Listener registered"
            );
            registrations.push(registration);
        }

        for bucket in index.values_mut() {
            bucket.sort_by(|a, b| a.mapping.cmp(&b.mapping));
        }

        let registry = MappingRegistry {
            index,
            registrations,
            skipped,
        };

        info!(
            listeners = registry.registrations.len(),
            queues = registry.index.len(),
            skipped = registry.skipped.len(),
            destinations = ?registry.destinations(),
            "Mapping registry sealed"
        );

        Ok(registry)
    }
}

/// Sealed lookup index from destination queue to the listeners serving it.
///
/// Read-only after [`RegistryBuilder::build`]; share it behind an `Arc`.
#[derive(Debug)]
pub struct MappingRegistry {
    index: HashMap<String, Vec<Arc<HandlerRegistration>>>,
    registrations: Vec<Arc<HandlerRegistration>>,
    skipped: Vec<SkippedListener>,
}

impl MappingRegistry {
    /// Pick the listener for `destination`.
    ///
    /// When several listeners serve the queue the one with the least mapping
    /// wins, regardless of registration order.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Unroutable`] if no listener serves `destination`.
    pub fn select_handler(&self, destination: &str) -> Result<&Arc<HandlerRegistration>, DispatchError> {
        let candidates = self.candidates(destination);
        let Some(selected) = candidates.first() else {
            return Err(DispatchError::Unroutable {
                destination: destination.to_string(),
            });
        };
        if candidates.len() > 1 {
            debug!(
                queue = %destination,
                candidates = candidates.len(),
                selected = %selected.handler_name(),
                "Multiple listeners match, least mapping selected"
            );
        }
        Ok(selected)
    }

    /// Every listener serving `destination`, least mapping first.
    #[must_use]
    pub fn candidates(&self, destination: &str) -> &[Arc<HandlerRegistration>] {
        self.index.get(destination).map_or(&[], Vec::as_slice)
    }

    /// All registrations in declaration order
    #[must_use]
    pub fn registrations(&self) -> &[Arc<HandlerRegistration>] {
        &self.registrations
    }

    /// Sorted list of queues with at least one listener
    #[must_use]
    pub fn destinations(&self) -> Vec<&str> {
        let mut queues: Vec<&str> = self.index.keys().map(String::as_str).collect();
        queues.sort_unstable();
        queues
    }

    /// Listeners excluded because their mapping was invalid
    #[must_use]
    pub fn skipped(&self) -> &[SkippedListener] {
        &self.skipped
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}
