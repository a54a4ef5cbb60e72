#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Tests for building the mapping registry
//!
//! # Test Coverage
//!
//! - Indexing a listener under every resolved queue name
//! - Skipping listeners whose mapping names no queue
//! - Dead letter queue validation at startup
//! - Deterministic selection, independent of registration order
//! - Component scanning and placeholder resolution
//! - Custom `ExpressionResolver` implementations

mod common;

use common::noop_handler;
use rqueue::error::ConfigurationError;
use rqueue::listener::{
    ExpressionResolver, ListenerComponent, ListenerDeclaration, ListenerMethod, PropertiesResolver,
    ResolveError,
};
use rqueue::registry::RegistryBuilder;
use std::collections::HashMap;

#[test]
fn test_listener_reachable_through_every_name() {
    let names: Vec<String> = (0..12).map(|i| format!("queue-{i}")).collect();
    let registry = RegistryBuilder::new()
        .listener("c", "many", ListenerDeclaration::new(names.clone()), noop_handler::<i64>())
        .build(&PropertiesResolver::new())
        .unwrap();

    assert_eq!(registry.len(), 1);
    assert_eq!(registry.destinations().len(), names.len());
    for name in &names {
        let selected = registry.select_handler(name).unwrap();
        assert_eq!(selected.handler_name(), "c::many");
        assert!(selected.mapping().matches(name));
    }
}

#[test]
fn test_zero_queue_declaration_is_never_selected() {
    let registry = RegistryBuilder::new()
        .listener("c", "nothing", ListenerDeclaration::new(Vec::<String>::new()), noop_handler::<i64>())
        .listener("c", "blank", ListenerDeclaration::new([" , "]), noop_handler::<i64>())
        .build(&PropertiesResolver::new())
        .unwrap();

    assert!(registry.is_empty());
    assert!(registry.destinations().is_empty());
    assert_eq!(registry.skipped().len(), 2);
    assert!(registry.select_handler("").is_err());
}

#[test]
fn test_dead_letter_queue_must_be_single() {
    let build = |dlq: &str| {
        RegistryBuilder::new()
            .listener(
                "c",
                "m",
                ListenerDeclaration::new(["jobs"]).dead_letter_queue(dlq),
                noop_handler::<i64>(),
            )
            .build(&PropertiesResolver::new())
    };

    let registry = build("jobs-dlq").unwrap();
    assert_eq!(
        registry.select_handler("jobs").unwrap().mapping().dead_letter_queue(),
        Some("jobs-dlq")
    );

    match build("dlqA,dlqB") {
        Err(ConfigurationError::DeadLetterQueue { resolved, .. }) => {
            assert_eq!(resolved, vec!["dlqA", "dlqB"]);
        }
        other => panic!("expected DeadLetterQueue error, got {other:?}"),
    }

    assert!(matches!(
        build(""),
        Err(ConfigurationError::DeadLetterQueue { .. })
    ));
}

#[test]
fn test_dead_letter_queue_checked_even_for_skipped_listener() {
    let err = RegistryBuilder::new()
        .listener(
            "c",
            "m",
            ListenerDeclaration::new(Vec::<String>::new()).dead_letter_queue("a,b"),
            noop_handler::<i64>(),
        )
        .build(&PropertiesResolver::new())
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::DeadLetterQueue { .. }));
}

#[test]
fn test_retry_sentinel_and_invalid_counts() {
    let build = |retries: &str| {
        RegistryBuilder::new()
            .listener(
                "c",
                "m",
                ListenerDeclaration::new(["jobs"]).num_retries(retries),
                noop_handler::<i64>(),
            )
            .build(&PropertiesResolver::new())
    };

    let default = build("-1").unwrap();
    assert_eq!(default.select_handler("jobs").unwrap().mapping().num_retries(), None);

    let zero = build("0").unwrap();
    assert_eq!(zero.select_handler("jobs").unwrap().mapping().num_retries(), Some(0));

    assert!(matches!(
        build("-2"),
        Err(ConfigurationError::InvalidRetryCount { value: -2, .. })
    ));
    assert!(matches!(build("many"), Err(ConfigurationError::Resolve { .. })));
}

#[test]
fn test_selection_independent_of_registration_order() {
    let declarations = vec![
        ("wide", ListenerDeclaration::new(["orders", "refunds", "returns"])),
        ("pair", ListenerDeclaration::new(["orders", "refunds"])),
        ("retrying", ListenerDeclaration::new(["orders"]).num_retries("2")),
        ("plain", ListenerDeclaration::new(["orders"])),
        ("delayed", ListenerDeclaration::new(["orders"]).delayed_queue("true")),
    ];

    let permutations: Vec<Vec<usize>> = vec![
        vec![0, 1, 2, 3, 4],
        vec![4, 3, 2, 1, 0],
        vec![2, 4, 0, 3, 1],
        vec![3, 0, 4, 1, 2],
    ];

    for permutation in permutations {
        let mut builder = RegistryBuilder::new();
        for &i in &permutation {
            let (name, decl) = &declarations[i];
            builder = builder.listener("c", *name, decl.clone(), noop_handler::<i64>());
        }
        let registry = builder.build(&PropertiesResolver::new()).unwrap();

        assert_eq!(registry.select_handler("orders").unwrap().method(), "plain");
        assert_eq!(registry.select_handler("refunds").unwrap().method(), "pair");
        assert_eq!(registry.select_handler("returns").unwrap().method(), "wide");

        let ranked: Vec<&str> = registry
            .candidates("orders")
            .iter()
            .map(|r| r.method())
            .collect();
        assert_eq!(ranked, vec!["plain", "retrying", "delayed", "pair", "wide"]);
    }
}

struct OrderListeners;

impl ListenerComponent for OrderListeners {
    fn component_name(&self) -> &str {
        "order_listeners"
    }

    fn methods(&self) -> Vec<ListenerMethod> {
        vec![
            ListenerMethod::new(
                "on_order",
                ListenerDeclaration::new(["${orders.queue}"]).num_retries("${orders.retries:1}"),
                noop_handler::<i64>(),
            ),
            ListenerMethod::undeclared("helper", noop_handler::<i64>()),
            ListenerMethod::new(
                "on_refund",
                ListenerDeclaration::new(["refunds"]).dead_letter_queue("${refunds.dlq}"),
                noop_handler::<String>(),
            ),
        ]
    }
}

#[test]
fn test_component_scanning_skips_undeclared_methods() {
    let resolver = PropertiesResolver::new()
        .with_property("orders.queue", "orders, orders-eu")
        .with_property("refunds.dlq", "refunds-dlq");
    let registry = RegistryBuilder::new()
        .component(&OrderListeners)
        .build(&resolver)
        .unwrap();

    assert_eq!(registry.len(), 2);
    assert_eq!(registry.destinations(), vec!["orders", "orders-eu", "refunds"]);

    let order = registry.select_handler("orders-eu").unwrap();
    assert_eq!(order.component(), "order_listeners");
    assert_eq!(order.mapping().num_retries(), Some(1));
    assert_eq!(
        registry.select_handler("refunds").unwrap().mapping().dead_letter_queue(),
        Some("refunds-dlq")
    );
    assert!(registry
        .registrations()
        .iter()
        .all(|r| r.method() != "helper"));
}

#[test]
fn test_unresolvable_placeholder_aborts_build() {
    let err = RegistryBuilder::new()
        .component(&OrderListeners)
        .build(&PropertiesResolver::new())
        .unwrap_err();
    match err {
        ConfigurationError::Resolve { expression, .. } => {
            assert_eq!(expression, "${orders.queue}");
        }
        other => panic!("expected Resolve error, got {other:?}"),
    }
}

/// Looks expressions up verbatim in a fixed table.
struct TableResolver(HashMap<&'static str, Vec<&'static str>>);

impl ExpressionResolver for TableResolver {
    fn resolve_strings(&self, expression: &str) -> Result<Vec<String>, ResolveError> {
        match self.0.get(expression) {
            Some(values) => Ok(values.iter().map(|v| v.to_string()).collect()),
            None => Ok(vec![expression.to_string()]),
        }
    }

    fn resolve_bool(&self, expression: &str, default: bool) -> Result<bool, ResolveError> {
        Ok(expression.parse().unwrap_or(default))
    }

    fn resolve_int(&self, expression: &str, default: i64) -> Result<i64, ResolveError> {
        Ok(expression.parse().unwrap_or(default))
    }
}

#[test]
fn test_custom_resolver_expands_groups() {
    let resolver = TableResolver(HashMap::from([("@regional", vec!["eu", "us", "apac"])]));
    let registry = RegistryBuilder::new()
        .listener("c", "m", ListenerDeclaration::new(["@regional", "global"]), noop_handler::<i64>())
        .build(&resolver)
        .unwrap();

    assert_eq!(registry.destinations(), vec!["apac", "eu", "global", "us"]);
}
