//! Recursive schema example.
//!
//! Builds a self-referential comment-thread schema with `lazy`, validates
//! nested input through both the interpreter and the compiled routine, and
//! shows the depth limit on pathologically deep input.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p cito-demos --example recursive_schema
//! ```

use std::sync::LazyLock;

use cito_core::{CitoError, ValidationConfig, Validator, array, lazy, number, object, string};
use serde_json::{Value, json};

static COMMENT: LazyLock<Validator> = LazyLock::new(|| {
    object([
        ("author", string()),
        ("score", number()),
        ("replies", array(lazy(|| COMMENT.clone()))),
    ])
    .unwrap_or_else(|e| panic!("invalid comment schema: {e}"))
});

fn thread(depth: usize) -> Value {
    let mut node = json!({"author": "leaf", "score": 0, "replies": []});
    for i in 0..depth {
        node = json!({"author": format!("user{i}"), "score": i, "replies": [node]});
    }
    node
}

fn main() {
    let valid = json!({
        "author": "ada",
        "score": 12,
        "replies": [
            {"author": "bob", "score": 3, "replies": []},
            {"author": "cy", "score": 1, "replies": [
                {"author": "dee", "score": "high", "replies": []}
            ]}
        ]
    });

    println!("=== Interpreted ===");
    match COMMENT.assert(&valid) {
        Ok(_) => println!("  accepted"),
        Err(e) => println!("  {e}"),
    }

    println!("=== Compiled ===");
    match COMMENT.compile() {
        Ok(compiled) => {
            println!("  routine: {}", compiled.source());
            println!("  check:   {}", compiled.check(&valid));
            if let Err(e) = compiled.assert(&valid) {
                println!("  assert:  {e}");
            }
            println!("  deep(100) accepted: {}", compiled.check(&thread(100)));
        }
        Err(e) => println!("  not compilable: {e}"),
    }

    println!("=== Depth limit ===");
    let config = ValidationConfig::default().with_max_depth(16);
    for depth in [10, 20] {
        match COMMENT.assert_with(&thread(depth), &config) {
            Ok(_) => println!("  depth {depth}: accepted"),
            Err(CitoError::DepthLimitExceeded { limit, path }) => {
                println!("  depth {depth}: limit {limit} hit after {} segments", path.len());
            }
            Err(e) => println!("  depth {depth}: {e}"),
        }
    }
}
