use std::sync::LazyLock;

use cito_core::{
    CitoError, CompileError, PathSegment, SchemaError, ValidationConfig, Validator, any, array,
    boolean, date, enums, integer, lazy, literal, null, nullable, number, object, optional, record,
    string, tuple, undefined, union, unknown,
};
use rayon::prelude::*;
use serde::Deserialize;
use serde_json::{Value, json};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

static LIST: LazyLock<Validator> = LazyLock::new(|| {
    object([
        ("data", string()),
        ("next", lazy(|| LIST.clone()).optional()),
    ])
    .unwrap()
});

static TREE: LazyLock<Validator> = LazyLock::new(|| {
    object([
        ("label", string()),
        ("children", array(lazy(|| TREE.clone()))),
    ])
    .unwrap()
});

static PERSON: LazyLock<Validator> = LazyLock::new(|| {
    object([
        ("name", string()),
        ("employer", lazy(|| COMPANY.clone()).optional()),
    ])
    .unwrap()
});

static COMPANY: LazyLock<Validator> = LazyLock::new(|| {
    object([("title", string()), ("staff", array(lazy(|| PERSON.clone())))]).unwrap()
});

fn chain(len: usize) -> Value {
    let mut value = json!({"data": "tail"});
    for i in 0..len {
        value = json!({"data": format!("n{i}"), "next": value});
    }
    value
}

fn launch_schema() -> Validator {
    let rocket = object([
        ("rocket_name", string()),
        ("rocket_type", string()),
        (
            "first_stage",
            object([(
                "cores",
                array(
                    object([
                        ("flight", integer()),
                        ("core", object([("reuse_count", integer()), ("status", nullable(string()))]).unwrap()),
                    ])
                    .unwrap(),
                ),
            )])
            .unwrap(),
        ),
    ])
    .unwrap();
    object([
        ("id", string()),
        ("mission_name", string()),
        ("launch_date_utc", date()),
        ("launch_success", nullable(boolean())),
        ("upcoming", boolean()),
        ("rocket", rocket),
        ("ships", array(object([("name", string()), ("home_port", string())]).unwrap())),
        (
            "links",
            object([
                ("article_link", nullable(string())),
                ("flickr_images", array(string())),
            ])
            .unwrap(),
        ),
        ("details", optional(nullable(string()))),
    ])
    .unwrap()
}

fn launch_value() -> Value {
    json!({
        "id": "5eb87d46ffd86e000604b388",
        "mission_name": "CRS-21",
        "launch_date_utc": "2020-12-06T16:17:00.000Z",
        "launch_success": true,
        "upcoming": false,
        "rocket": {
            "rocket_name": "Falcon 9",
            "rocket_type": "FT",
            "first_stage": {
                "cores": [{"flight": 1, "core": {"reuse_count": 0, "status": null}}]
            }
        },
        "ships": [{"name": "OCISLY", "home_port": "Port Canaveral"}],
        "links": {"article_link": null, "flickr_images": []},
    })
}

fn sample_schemas() -> Vec<Validator> {
    vec![
        string(),
        number(),
        integer(),
        boolean(),
        any(),
        unknown(),
        null(),
        undefined(),
        literal("on"),
        literal(1),
        date(),
        string().and(literal("x")),
        number().or(string()),
        nullable(string()),
        optional(number()),
        array(number()),
        array(array(boolean())),
        record(string()),
        record(optional(number())),
        tuple([string(), number()]).unwrap(),
        tuple([optional(string())]).unwrap(),
        object([("a", string()), ("b", number()), ("items", array(string()))]).unwrap(),
        object([("weird key", boolean()), ("opt", optional(integer()))]).unwrap(),
        union([string(), number(), array(any())]).unwrap(),
        union([object([("kind", literal("a"))]).unwrap(), object([("kind", literal("b")), ("n", number())]).unwrap()])
            .unwrap(),
        enums(["red", "green"]).unwrap(),
        enums([1, 2]).unwrap(),
        array(lazy(string)),
        LIST.clone(),
        TREE.clone(),
        PERSON.clone(),
        launch_schema(),
    ]
}

fn sample_values() -> Vec<Value> {
    vec![
        Value::Null,
        json!(true),
        json!(0),
        json!(1),
        json!(1.0),
        json!(2.5),
        json!(-7),
        json!("x"),
        json!("on"),
        json!("red"),
        json!("2024-01-15T10:30:00Z"),
        json!([]),
        json!([1, 2, 3]),
        json!(["a", 1]),
        json!(["a", 1, 2]),
        json!([null]),
        json!([[true], [false, true]]),
        json!([[true], [1]]),
        json!({}),
        json!({"a": "x", "b": 1, "items": ["y", "z"]}),
        json!({"a": "x", "b": 1, "items": ["y", 2]}),
        json!({"weird key": true}),
        json!({"weird key": true, "opt": 1.5}),
        json!({"kind": "a"}),
        json!({"kind": "b", "n": "1"}),
        json!({"k": "v", "j": null}),
        json!({"data": "a", "next": {"data": "b"}}),
        json!({"data": "a", "next": {"data": 1}}),
        json!({"label": "root", "children": [{"label": "leaf", "children": []}]}),
        json!({"label": "root", "children": [{"label": "leaf"}]}),
        json!({"name": "ada", "employer": {"title": "acme", "staff": [{"name": "bob"}]}}),
        json!({"name": "ada", "employer": {"title": "acme", "staff": [{"name": 3}]}}),
        launch_value(),
        chain(20),
    ]
}

// ---------------------------------------------------------------------------
// Path precision
// ---------------------------------------------------------------------------

#[test]
fn test_path_precision_nested() {
    let schema = object([("sub", array(object([("inner", string())]).unwrap()))]).unwrap();
    let value = json!({"sub": [{"inner": 123}]});
    let err = schema.assert(&value).unwrap_err();
    let err = err.as_validation().unwrap();
    assert_eq!(err.path.to_string(), "sub[0].inner");
    assert_eq!(
        err.path.segments(),
        &[
            PathSegment::Field("sub".into()),
            PathSegment::Index(0),
            PathSegment::Field("inner".into()),
        ]
    );
    assert_eq!(err.expected, "string");
    assert_eq!(err.actual, "123");
}

#[test]
fn test_concrete_object_scenario() {
    let schema = object([("a", string()), ("b", number()), ("items", array(string()))]).unwrap();
    assert!(schema.check(&json!({"a": "x", "b": 1, "items": ["y", "z"]})));

    let bad = json!({"a": "x", "b": 1, "items": ["y", 2]});
    assert!(!schema.check(&bad));
    let err = schema.assert(&bad).unwrap_err();
    assert_eq!(err.as_validation().unwrap().path.to_string(), "items[1]");
    assert_eq!(err.to_string(), "Expected string @ items[1] (got 2)");
}

#[test]
fn test_extra_fields_are_ignored() {
    let schema = object([("a", string())]).unwrap();
    assert!(schema.check(&json!({"a": "x", "b": 1, "c": [1, 2]})));
}

#[test]
fn test_launch_payload_diagnostic() {
    let schema = launch_schema();
    assert!(schema.check(&launch_value()));

    let mut bad = launch_value();
    bad["rocket"]["first_stage"]["cores"][0]["core"]["reuse_count"] = json!("zero");
    let err = schema.assert(&bad).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Expected integer @ rocket.first_stage.cores[0].core.reuse_count (got \"zero\")"
    );

    let mut bad = launch_value();
    bad["launch_date_utc"] = json!("soon");
    let err = schema.assert(&bad).unwrap_err();
    assert_eq!(err.to_string(), "Expected date-time @ launch_date_utc (got \"soon\")");
}

#[test]
fn test_preview_respects_config() {
    let schema = object([("n", number())]).unwrap();
    let value = json!({"n": "a very long string that goes on and on and on"});

    let err = schema.assert(&value).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Expected number @ n (got \"a very long string that goes on and on ...)"
    );

    let config = ValidationConfig::default().with_preview_len(6);
    let err = schema.assert_with(&value, &config).unwrap_err();
    assert_eq!(err.to_string(), "Expected number @ n (got \"a ver...)");
}

// ---------------------------------------------------------------------------
// Laws
// ---------------------------------------------------------------------------

#[test]
fn test_check_is_pure() {
    let schema = union([string(), array(number())]).unwrap();
    let description = schema.describe();
    for value in sample_values() {
        let before = value.clone();
        let first = schema.check(&value);
        for _ in 0..3 {
            assert_eq!(schema.check(&value), first);
        }
        assert_eq!(value, before);
    }
    assert_eq!(schema.describe(), description);
}

#[test]
fn test_nullable_and_optional_laws() {
    for schema in sample_schemas() {
        assert!(nullable(schema.clone()).check(&Value::Null), "{schema}");
        assert!(optional(schema.clone()).check_opt(None), "{schema}");
    }
}

#[test]
fn test_union_law() {
    let pairs = [
        (string(), number()),
        (array(string()), record(number())),
        (object([("a", string())]).unwrap(), object([("b", string())]).unwrap()),
        (literal(true), null()),
    ];
    for (a, b) in pairs {
        let schema = union([a.clone(), b.clone()]).unwrap();
        for value in sample_values() {
            assert_eq!(
                schema.check(&value),
                a.check(&value) || b.check(&value),
                "{schema} against {value}"
            );
        }
    }
}

#[test]
fn test_tuple_arity() {
    let schema = tuple([string(), number()]).unwrap();
    assert!(!schema.check(&json!(["a"])));
    assert!(!schema.check(&json!(["a", 1, 2])));
    assert!(!schema.check(&json!([1, "a"])));
    assert!(schema.check(&json!(["a", 1])));
}

#[test]
fn test_missing_value_semantics() {
    assert!(any().check_opt(None));
    assert!(undefined().check_opt(None));
    assert!(!null().check_opt(None));
    assert!(!string().check_opt(None));

    let schema = object([("maybe", optional(string())), ("must", null())]).unwrap();
    assert!(schema.check(&json!({"must": null})));
    let err = schema.assert(&json!({})).unwrap_err();
    assert_eq!(err.to_string(), "Expected null @ must (got undefined)");
}

// ---------------------------------------------------------------------------
// Union diagnostics
// ---------------------------------------------------------------------------

#[test]
fn test_union_of_shapes_reports_deepest() {
    let circle = object([("kind", literal("circle")), ("radius", number())]).unwrap();
    let square = object([
        ("kind", literal("square")),
        ("size", object([("w", number()), ("h", number())]).unwrap()),
    ])
    .unwrap();
    let shape = union([circle, square]).unwrap();

    let err = shape
        .assert(&json!({"kind": "square", "size": {"w": 1, "h": "2"}}))
        .unwrap_err();
    assert_eq!(err.to_string(), "Expected number @ size.h (got \"2\")");

    let err = shape.assert(&json!({"kind": "oval"})).unwrap_err();
    assert_eq!(err.to_string(), "Expected \"circle\" @ kind (got \"oval\")");

    let err = shape.assert(&json!(4)).unwrap_err();
    assert_eq!(err.to_string(), "Expected object | object (got 4)");
}

#[test]
fn test_union_alternatives_start_from_same_depth() {
    let schema = object([(
        "items",
        array(union([array(string()), record(number())]).unwrap()),
    )])
    .unwrap();
    let err = schema
        .assert(&json!({"items": [["a"], {"x": 1, "y": false}]}))
        .unwrap_err();
    assert_eq!(err.to_string(), "Expected number @ items[1].y (got false)");
}

// ---------------------------------------------------------------------------
// Recursive schemas
// ---------------------------------------------------------------------------

#[test]
fn test_recursive_list() {
    assert!(LIST.check(&json!({"data": "a", "next": {"data": "b"}})));
    assert!(!LIST.check(&json!({"data": "a", "next": {"data": 1}})));

    let err = LIST
        .assert(&json!({"data": "a", "next": {"data": "b", "next": {"data": null}}}))
        .unwrap_err();
    assert_eq!(err.to_string(), "Expected string @ next.next.data (got null)");
}

#[test]
fn test_recursive_tree_and_mutual_recursion() {
    assert!(TREE.check(&json!({
        "label": "a",
        "children": [{"label": "b", "children": [{"label": "c", "children": []}]}]
    })));
    let err = TREE
        .assert(&json!({"label": "a", "children": [{"label": "b", "children": [{"label": 3, "children": []}]}]}))
        .unwrap_err();
    assert_eq!(err.to_string(), "Expected string @ children[0].children[0].label (got 3)");

    let err = PERSON
        .assert(&json!({"name": "ada", "employer": {"title": "acme", "staff": [{"name": 3}]}}))
        .unwrap_err();
    assert_eq!(err.to_string(), "Expected string @ employer.staff[0].name (got 3)");
}

#[test]
fn test_depth_limit_on_deep_input() {
    let deep = chain(20);
    assert!(LIST.check(&deep));

    let config = ValidationConfig::default().with_max_depth(8);
    assert!(!LIST.check_with(&deep, &config));
    match LIST.assert_with(&deep, &config).unwrap_err() {
        CitoError::DepthLimitExceeded { limit, path } => {
            assert_eq!(limit, 8);
            assert_eq!(path.len(), 9);
            assert!(path.segments().iter().all(|s| *s == PathSegment::Field("next".into())));
        }
        other => panic!("unexpected error: {other}"),
    }

    let very_deep = chain(500);
    assert!(!LIST.check(&very_deep));
    assert!(matches!(
        LIST.assert(&very_deep),
        Err(CitoError::DepthLimitExceeded { limit: 128, .. })
    ));
}

#[test]
fn test_lazy_cycle_surfaces_on_use() {
    static A: LazyLock<Validator> = LazyLock::new(|| lazy(|| B.clone()));
    static B: LazyLock<Validator> = LazyLock::new(|| lazy(|| A.clone()));

    let schema = object([("x", A.clone())]).unwrap();
    assert!(!schema.check(&json!({"x": 1})));
    assert!(matches!(
        schema.assert(&json!({"x": 1})),
        Err(CitoError::Schema(SchemaError::LazyCycle))
    ));
    assert_eq!(
        schema.compile().unwrap_err(),
        CompileError::UnresolvedLazy(SchemaError::LazyCycle)
    );
}

// ---------------------------------------------------------------------------
// Compiler
// ---------------------------------------------------------------------------

#[test]
fn test_compiled_equals_interpreted() {
    let values = sample_values();
    for schema in sample_schemas() {
        let compiled = schema.compile().unwrap();
        for value in &values {
            assert_eq!(
                compiled.check(value),
                schema.check(value),
                "{schema} against {value}"
            );
        }
        assert_eq!(compiled.check_opt(None), schema.check_opt(None), "{schema} against undefined");
    }
}

#[test]
fn test_compiled_recursion_is_depth_limited() {
    let compiled = LIST.compile().unwrap();
    assert!(compiled.check(&chain(50)));
    assert!(!compiled.check(&chain(500)));
    assert!(matches!(
        compiled.assert(&chain(500)),
        Err(CitoError::DepthLimitExceeded { .. })
    ));
}

#[test]
fn test_compiled_depth_boundary_matches_interpreter() {
    let compiled = LIST.compile().unwrap();
    for len in [127, 128, 129, 130] {
        let value = chain(len);
        let expected = len <= cito_core::DEFAULT_MAX_DEPTH;
        assert_eq!(LIST.check(&value), expected, "interpreted, len {len}");
        assert_eq!(compiled.check(&value), expected, "compiled, len {len}");
        assert_eq!(compiled.assert(&value).is_ok(), expected, "compiled assert, len {len}");
    }
}

#[test]
fn test_depth_fault_inside_alternatives_matches_interpreter() {
    let schemas = [
        union([LIST.clone(), any()]).unwrap(),
        LIST.clone().or(any()),
        object([("wrapped", union([LIST.clone(), record(any())]).unwrap())]).unwrap(),
    ];
    let values = [
        chain(300),
        json!({"wrapped": chain(300)}),
        json!({"wrapped": chain(3)}),
        json!(1),
    ];
    for schema in &schemas {
        let compiled = schema.compile().unwrap();
        for value in &values {
            assert_eq!(compiled.check(value), schema.check(value), "{schema} against {value}");
            assert_eq!(
                compiled.assert(value).is_ok(),
                schema.assert(value).is_ok(),
                "{schema} against {value}"
            );
        }
    }
    assert!(!union([LIST.clone(), any()]).unwrap().compile().unwrap().check(&chain(300)));
}

#[test]
fn test_compiled_equals_interpreted_near_small_limit() {
    let schemas = [
        LIST.clone(),
        TREE.clone(),
        PERSON.clone(),
        union([LIST.clone(), any()]).unwrap(),
        array(LIST.clone()),
    ];
    for max_depth in [1, 2, 4] {
        let config = ValidationConfig::default().with_max_depth(max_depth);
        let mut values: Vec<Value> = (max_depth.saturating_sub(1)..=max_depth + 1).map(chain).collect();
        values.push(json!([chain(max_depth), chain(max_depth + 1)]));
        values.push(json!({
            "label": "a",
            "children": [{"label": "b", "children": [{"label": "c", "children": []}]}]
        }));
        values.push(json!({
            "name": "ada",
            "employer": {"title": "acme", "staff": [{"name": "bob", "employer": {"title": "x", "staff": []}}]}
        }));
        for schema in &schemas {
            let compiled = schema.compile().unwrap();
            for value in &values {
                assert_eq!(
                    compiled.check_with(value, &config),
                    schema.check_with(value, &config),
                    "max_depth {max_depth}: {schema} against {value}"
                );
            }
        }
    }
}

#[test]
fn test_compiled_assert_matches_interpreter_message() {
    let schema = launch_schema();
    let compiled = schema.compile().unwrap();
    let mut bad = launch_value();
    bad["ships"][0]["home_port"] = json!(null);
    let interpreted = schema.assert(&bad).unwrap_err().to_string();
    let fast = compiled.assert(&bad).unwrap_err().to_string();
    assert_eq!(fast, interpreted);
    assert_eq!(fast, "Expected string @ ships[0].home_port (got null)");
}

#[test]
fn test_compile_cache_is_per_instance() {
    let schema = launch_schema();
    let first = schema.compile().unwrap();
    let shared: Vec<_> = (0..16)
        .into_par_iter()
        .map(|_| schema.clone().compile().unwrap())
        .collect();
    assert!(shared.iter().all(|c| c.ptr_eq(&first)));
    assert!(first.schema().ptr_eq(&schema));

    let twin = launch_schema();
    let other = twin.compile().unwrap();
    assert!(!other.ptr_eq(&first));
    assert_eq!(other.source(), first.source());
}

#[test]
fn test_uncompilable_schema() {
    let schema = object([(
        "tags",
        array(string().refine("tag", |v| v.as_str().is_some_and(|s| s.starts_with('#')))),
    )])
    .unwrap();
    assert!(schema.check(&json!({"tags": ["#a"]})));

    let err = schema.compile().unwrap_err();
    assert_eq!(err.to_string(), "no code generator for `tag`");
    let err = CitoError::from(err);
    assert_eq!(err.to_string(), "compile error: no code generator for `tag`");
}

// ---------------------------------------------------------------------------
// Schema construction
// ---------------------------------------------------------------------------

#[test]
fn test_malformed_schemas_fail_fast() {
    assert_eq!(union(Vec::new()).unwrap_err(), SchemaError::EmptyUnion);
    assert_eq!(tuple(Vec::new()).unwrap_err(), SchemaError::EmptyTuple);
    assert_eq!(enums(Vec::<&str>::new()).unwrap_err(), SchemaError::EmptyEnum);
    assert_eq!(
        object([("a", string()), ("b", number()), ("a", boolean())]).unwrap_err(),
        SchemaError::DuplicateField("a".into())
    );
}

#[test]
fn test_combinators_do_not_mutate_arguments() {
    let base = string();
    let wider = nullable(base.clone());
    assert!(!base.check(&Value::Null));
    assert!(wider.check(&Value::Null));
    assert_eq!(base.describe(), "string");
    assert_eq!(wider.describe(), "null | string");
}

// ---------------------------------------------------------------------------
// Typed construction
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, PartialEq)]
struct Ship {
    name: String,
    home_port: String,
}

#[derive(Debug, Deserialize)]
struct Launch {
    mission_name: String,
    launch_success: Option<bool>,
    ships: Vec<Ship>,
}

#[test]
fn test_construct_typed_value() {
    let schema = launch_schema();
    let launch: Launch = schema.construct(launch_value()).unwrap();
    assert_eq!(launch.mission_name, "CRS-21");
    assert_eq!(launch.launch_success, Some(true));
    assert_eq!(
        launch.ships,
        vec![Ship {
            name: "OCISLY".into(),
            home_port: "Port Canaveral".into()
        }]
    );

    let compiled = schema.compile().unwrap();
    let launch: Launch = compiled.construct(launch_value()).unwrap();
    assert_eq!(launch.ships.len(), 1);
}

#[test]
fn test_construct_reports_validation_before_deserialization() {
    #[derive(Debug, Deserialize)]
    struct Counter {
        #[allow(dead_code)]
        count: u8,
    }

    let schema = object([("count", integer())]).unwrap();
    let err = schema.construct::<Counter>(json!({"count": "3"})).unwrap_err();
    assert!(err.as_validation().is_some());

    let err = schema.construct::<Counter>(json!({"count": 300})).unwrap_err();
    assert!(matches!(err, CitoError::JsonError(_)));
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn test_concurrent_validation_keeps_diagnostics_apart() {
    let schema = object([("a", string()), ("b", number()), ("items", array(string()))]).unwrap();
    let inputs: Vec<Value> = (0..256)
        .map(|i| match i % 3 {
            0 => json!({"a": "x", "b": i, "items": ["y"]}),
            1 => json!({"a": "x", "b": i, "items": ["y", i]}),
            _ => json!({"a": i, "b": i, "items": []}),
        })
        .collect();

    let sequential: Vec<Option<String>> = inputs
        .iter()
        .map(|v| schema.assert(v).err().map(|e| e.to_string()))
        .collect();
    let parallel: Vec<Option<String>> = inputs
        .par_iter()
        .map(|v| schema.assert(v).err().map(|e| e.to_string()))
        .collect();

    assert_eq!(sequential, parallel);
    assert_eq!(parallel[1].as_deref(), Some("Expected string @ items[1] (got 1)"));
    assert_eq!(parallel[2].as_deref(), Some("Expected string @ a (got 2)"));
}

#[test]
fn test_concurrent_lazy_resolution() {
    static NODE: LazyLock<Validator> = LazyLock::new(|| {
        object([("v", number()), ("rest", lazy(|| NODE.clone()).optional())]).unwrap()
    });

    let results: Vec<bool> = (0..64)
        .into_par_iter()
        .map(|i| NODE.check(&json!({"v": i, "rest": {"v": i + 1}})))
        .collect();
    assert!(results.into_iter().all(|ok| ok));
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[test]
fn test_config_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cito.yaml");
    std::fs::write(&path, "max_depth: 4\n").unwrap();

    let config = ValidationConfig::load(&path).unwrap();
    assert_eq!(config.max_depth, 4);
    assert_eq!(config.preview_len, cito_core::DEFAULT_PREVIEW_LEN);
    assert!(!LIST.check_with(&chain(10), &config));

    let saved = dir.path().join("saved.yaml");
    config.with_preview_len(12).save(&saved).unwrap();
    let reloaded = ValidationConfig::load(&saved).unwrap();
    assert_eq!(reloaded, ValidationConfig::default().with_max_depth(4).with_preview_len(12));
}

#[test]
fn test_config_load_errors() {
    let dir = tempfile::tempdir().unwrap();
    let err = ValidationConfig::load(dir.path().join("missing.yaml")).unwrap_err();
    assert!(matches!(err, CitoError::IoError(_)));

    let path = dir.path().join("bad.yaml");
    std::fs::write(&path, "max_depth: [1, 2]\n").unwrap();
    let err = ValidationConfig::load(&path).unwrap_err();
    assert!(matches!(err, CitoError::YamlError(_)));
}
