//! A parent form with two nested sub-forms sharing one validation scope.
//!
//! Walks through the usual lifecycle: edit, blur, submit, fix, reset.
//! Debug logs go to `nested_form.log`.

use std::fs::File;
use std::sync::Arc;
use std::time::Duration;

use formscope::prelude::*;
use log::LevelFilter;
use regex::Regex;
use serde_json::{Value, json};
use simplelog::{Config, WriteLogger};

fn person_schema() -> Result<Arc<dyn Schema<Value>>, regex::Error> {
    Ok(Arc::new(
        RuleSchema::new()
            .field("name")
            .required()
            .min_length(2)
            .field("email")
            .required()
            .email()
            .field("zip")
            .pattern(Regex::new(r"^\d{5}$")?)
            .message("zip must be five digits")
            .build(),
    ))
}

fn greeting_schema() -> Arc<dyn Schema<Value>> {
    Arc::new(
        RuleSchema::new()
            .field("aNestedValue")
            .required()
            .field("aDependantValue")
            .required()
            .when("aNestedValue", |nested| {
                vec![json!(format!("Hello {}", nested.as_str().unwrap_or_default()))]
            })
            .build(),
    )
}

fn print_form(label: &str, binding: &FormBinding<Value>, fields: &[&str]) {
    for field in fields {
        let class = binding.error_marker(field, "form-control");
        match binding.input_error_messages(field) {
            Some(messages) => println!("  {label}.{field} [{class}]: {}", messages.join("; ")),
            None => println!("  {label}.{field} [{class}]"),
        }
    }
}

async fn settle(scope: &ValidationScope) {
    let options = scope.options();
    let longest = options.debounce_delay().max(options.reset_delay());
    tokio::time::sleep(longest + options.aggregate_delay() + Duration::from_millis(10)).await;
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Ok(log_file) = File::create("nested_form.log") {
        let _ = WriteLogger::init(LevelFilter::Debug, Config::default(), log_file);
    }

    let options = ScopeOptions::new()
        .error_input_marker("is-invalid")
        .error_message_marker("text-danger")
        .debounce_delay_ms(100);

    let person = FormBinding::new(
        person_schema()?,
        json!({ "name": "", "email": "ada@example", "zip": "1234" }),
        options,
    );
    let scope = person.scope().clone();

    let children: Vec<FormBinding<Value>> = (1..=2)
        .map(|n| {
            FormBinding::within(
                greeting_schema(),
                json!({
                    "aNestedValue": format!("nested value {n}"),
                    "aDependantValue": format!("Hello nested value {n}"),
                }),
                &scope,
            )
        })
        .collect();

    let person_fields = ["name", "email", "zip"];
    let child_fields = ["aNestedValue", "aDependantValue"];

    println!("initial render:");
    print_form("person", &person, &person_fields);
    for (i, child) in children.iter().enumerate() {
        print_form(&format!("child{i}"), child, &child_fields);
    }

    // Typing into the first child's nested value, after the dependant
    // field was visited.
    children[0].on_blur("aDependantValue", None).await?;
    children[0].on_change("aNestedValue", json!("world")).await?;
    settle(&scope).await;

    println!("\nafter editing child0 (errors: {}):", scope.error_count());
    print_form("child0", &children[0], &child_fields);

    // Submit.
    let errors = person.validate_all().await?;
    settle(&scope).await;
    println!("\nsubmit found {} invalid fields, {} messages:", errors.len(), scope.error_count());
    for error in &errors {
        println!("  {error}");
    }

    // Fix everything.
    person.on_change("name", json!("Ada")).await?;
    person.on_change("email", json!("ada@example.com")).await?;
    person.on_change("zip", json!("12345")).await?;
    children[0].on_change("aDependantValue", json!("Hello world")).await?;
    settle(&scope).await;

    let errors = scope.validate_all_registered().await?;
    settle(&scope).await;
    println!(
        "\nafter fixing: {} invalid fields, touched={}, dirty={}",
        errors.len(),
        scope.is_touched(),
        scope.is_dirty()
    );

    person.reset_context();
    settle(&scope).await;
    println!(
        "after reset: errors={}, touched={}, dirty={}",
        scope.error_count(),
        scope.is_touched(),
        scope.is_dirty()
    );

    drop(children);
    println!("children dropped, {} handle(s) left", scope.handle_count());

    Ok(())
}
