//! Tests for scopes shared between bindings.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use formscope::prelude::*;
use serde_json::{Value, json};

fn broken_child(scope: &ValidationScope, n: usize) -> FormBinding<Value> {
    let binding = FormBinding::within(
        nested_schema(),
        json!({ "aNestedValue": format!("nested value {n}"), "aDependantValue": "wrong" }),
        scope,
    );
    binding.observe("aNestedValue");
    binding.observe("aDependantValue");
    binding
}

#[tokio::test(start_paused = true)]
async fn test_nested_bindings_share_error_count() {
    let scope = ValidationScope::new(Some(options()));
    let first = broken_child(&scope, 1);
    let second = broken_child(&scope, 2);

    let errors = scope.validate_all_registered().await.unwrap();
    assert_eq!(errors.len(), 2);
    settle().await;
    assert_eq!(scope.error_count(), 2);
    assert_eq!(first.form_error_count(), 2);

    drop(second);
    settle().await;
    assert_eq!(scope.error_count(), 1);
    assert_eq!(scope.handle_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_parent_and_children_validate_in_registration_order() {
    let scope = ValidationScope::new(Some(options()));
    let parent = FormBinding::within(data_schema(), form_data(), &scope);
    parent.observe("aValue");
    let child = broken_child(&scope, 1);

    let errors = parent.validate_all().await.unwrap();

    let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["aValue", "aDependantValue"]);
    settle().await;
    assert_eq!(child.form_error_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_nested_binding_reuses_parent_scope() {
    let parent = FormBinding::new(data_schema(), form_data(), options());
    let child = FormBinding::create(nested_schema(), nested_data(1), None, Some(parent.scope()));

    assert!(child.scope().same_scope(parent.scope()));
    assert_eq!(parent.scope().handle_count(), 2);

    let _pending = child.on_change("aNestedValue", json!("x"));
    assert!(parent.is_form_dirty());
}

#[tokio::test(start_paused = true)]
async fn test_reset_all_registered_resets_every_binding() {
    let scope = ValidationScope::new(Some(options()));
    let first = broken_child(&scope, 1);
    let second = broken_child(&scope, 2);
    scope.validate_all_registered().await.unwrap();
    settle().await;
    assert_eq!(scope.error_count(), 2);

    scope.reset_all_registered();
    settle().await;

    assert!(first.errors().is_empty());
    assert!(second.errors().is_empty());
    assert_eq!(scope.error_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_teardown_makes_handlers_no_ops() {
    let binding = FormBinding::new(data_schema(), form_data(), options());
    let scope = binding.scope().clone();

    binding.teardown();
    binding.teardown();

    assert!(!binding.is_alive());
    assert_eq!(scope.handle_count(), 0);

    let outcome = binding.on_change("aValue", json!("value")).await.unwrap();
    assert_eq!(outcome, Invocation::Skipped);
    assert_eq!(binding.field_value("aValue"), Some(json!("valu")));
    assert!(!binding.is_field_dirty("aValue"));
    assert!(!scope.is_dirty());
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_result_is_dropped_after_teardown() {
    let scope = ValidationScope::new(Some(options()));
    let schema: Arc<dyn Schema<Value>> = Arc::new(Slow {
        delay: Duration::from_millis(500),
    });
    let binding = FormBinding::within(schema, json!({ "a": 1 }), &scope);

    let pending = binding.on_blur("a", None);
    // Debounce elapsed, schema still working.
    tokio::time::sleep(Duration::from_millis(300)).await;
    drop(binding);

    let outcome = pending.await.unwrap();
    assert!(outcome.is_completed());
    settle().await;
    assert_eq!(scope.error_count(), 0);
    assert_eq!(scope.handle_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_aggregation_collapses_and_notifies() {
    let scope = ValidationScope::new(Some(options()));
    let binding = broken_child(&scope, 1);
    let mut rx = scope.subscribe();

    binding.validate_all().await.unwrap();
    assert_eq!(scope.error_count(), 0);

    rx.changed().await.unwrap();
    assert_eq!(rx.borrow().error_count, 1);
    assert_eq!(scope.snapshot().error_count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_request_aggregation_resolves_with_count() {
    let scope = ValidationScope::new(Some(options()));
    let binding = broken_child(&scope, 1);
    binding.validate("aDependantValue").await.unwrap();

    let outcome = scope.request_aggregation().await.unwrap();

    assert_eq!(outcome, Invocation::Completed(1));
    assert_eq!(scope.aggregate_now(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_torn_down_scope_skips_aggregation() {
    let scope = ValidationScope::new(Some(options()));
    let binding = broken_child(&scope, 1);
    binding.validate("aDependantValue").await.unwrap();

    scope.teardown();
    settle().await;

    assert!(!scope.is_alive());
    assert_eq!(scope.error_count(), 0);
    assert_eq!(scope.request_aggregation().await.unwrap(), Invocation::Skipped);
}

#[tokio::test(start_paused = true)]
async fn test_binding_dropped_during_pass_is_left_out() {
    let scope = ValidationScope::new(Some(options()));
    let schema: Arc<dyn Schema<Value>> = Arc::new(Slow {
        delay: Duration::from_millis(500),
    });
    let first = FormBinding::within(schema, json!({ "a": 1 }), &scope);
    first.observe("a");
    let second = FormBinding::within(data_schema(), form_data(), &scope);
    second.observe("aValue");

    let pass = tokio::spawn({
        let scope = scope.clone();
        async move { scope.validate_all_registered().await }
    });
    // First binding is still waiting on its schema.
    tokio::time::sleep(Duration::from_millis(100)).await;
    drop(second);

    let errors = pass.await.unwrap().unwrap();
    let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["a"]);
    settle().await;
    assert_eq!(scope.handle_count(), 1);
    assert_eq!(scope.error_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_binding_dropped_mid_validation_reports_nothing() {
    let scope = ValidationScope::new(Some(options()));
    let schema: Arc<dyn Schema<Value>> = Arc::new(Slow {
        delay: Duration::from_millis(500),
    });
    let slow = FormBinding::within(schema, json!({ "a": 1 }), &scope);
    slow.observe("a");

    let pass = tokio::spawn({
        let scope = scope.clone();
        async move { scope.validate_all_registered().await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    drop(slow);

    assert!(pass.await.unwrap().unwrap().is_empty());
}
