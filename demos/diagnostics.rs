//! Diagnostics example.
//!
//! Shows the single-line error produced for a rejected value, how unions
//! pick the most specific failing alternative, and how the structured path
//! can be inspected.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p cito-demos --example diagnostics
//! ```

use cito_core::{
    CitoError, SchemaError, ValidationConfig, Validator, array, enums, literal, number, object,
    optional, string, union,
};
use serde_json::{Value, json};

fn main() -> Result<(), SchemaError> {
    let user = object([
        ("name", string()),
        ("role", enums(["admin", "editor", "viewer"])?),
        ("tags", array(string())),
        ("nickname", optional(string())),
    ])?;

    println!("=== Object schema: {user} ===");
    report(&user, &json!({"name": "ada", "role": "admin", "tags": ["ops"]}));
    report(&user, &json!({"name": "ada", "role": "owner", "tags": []}));
    report(&user, &json!({"name": "ada", "role": "viewer", "tags": ["ops", 7]}));
    report(&user, &json!({"role": "viewer", "tags": []}));
    println!();

    let event = union([
        object([("type", literal("click")), ("x", number()), ("y", number())])?,
        object([
            ("type", literal("key")),
            ("key", object([("code", string()), ("repeat", number())])?),
        ])?,
    ])?;

    println!("=== Union schema: {event} ===");
    report(&event, &json!({"type": "click", "x": 1, "y": 2}));
    // The second alternative got deeper before failing, so it is reported.
    report(&event, &json!({"type": "key", "key": {"code": "KeyA", "repeat": "no"}}));
    // Both alternatives fail at `type`: the first one wins the tie.
    report(&event, &json!({"type": "scroll"}));
    // Neither alternative gets past the object check: the union reports itself.
    report(&event, &json!("click"));
    println!();

    println!("=== Structured path ===");
    let value = json!({"name": "ada", "role": "viewer", "tags": ["ops", 7]});
    if let Err(CitoError::Validation(err)) = user.assert(&value) {
        println!("  expected: {}", err.expected);
        println!("  actual:   {}", err.actual);
        for segment in err.path.segments() {
            println!("  segment:  {segment:?}");
        }
    }
    println!();

    println!("=== Shorter previews ===");
    let config = ValidationConfig::default().with_preview_len(12);
    let long = json!({"name": "ada", "role": "viewer", "tags": "a fairly long string value"});
    match user.assert_with(&long, &config) {
        Ok(_) => println!("  accepted"),
        Err(e) => println!("  {e}"),
    }

    Ok(())
}

fn report(schema: &Validator, value: &Value) {
    match schema.assert(value) {
        Ok(_) => println!("  ok        {value}"),
        Err(e) => println!("  rejected  {value}\n            {e}"),
    }
}
