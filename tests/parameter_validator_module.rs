use larder::catalog::ActionCatalog;
use larder::validate::{validate_call, CallerIdentity};
use serde_json::{json, Map, Value};

fn caller() -> CallerIdentity {
    CallerIdentity {
        kitchen_id: 42,
        user: "amy@example.com".to_string(),
    }
}

fn raw(entries: &[(&str, Value)]) -> Map<String, Value> {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

#[test]
fn caller_identity_is_carried_into_the_validated_call() {
    let catalog = ActionCatalog::builtin();
    let def = catalog.lookup("get_inventory").expect("def");
    let call = validate_call(def, &Map::new(), &caller()).expect("valid");
    assert_eq!(call.caller.kitchen_id, 42);
    assert_eq!(call.caller.user, "amy@example.com");
}

#[test]
fn failures_list_every_problem_not_just_the_first() {
    let catalog = ActionCatalog::builtin();
    let def = catalog.lookup("update_member_role").expect("def");
    let problems = validate_call(
        def,
        &raw(&[("role", json!("sous-chef"))]),
        &caller(),
    )
    .expect_err("two problems");
    assert_eq!(problems.len(), 2);
    assert!(problems.iter().any(|p| p.field == "member"));
    assert!(problems.iter().any(|p| p.field == "role"));
}

#[test]
fn resubmitting_with_fixes_is_idempotent() {
    let catalog = ActionCatalog::builtin();
    let def = catalog.lookup("update_inventory").expect("def");
    let mut params = raw(&[("quantity", json!("three"))]);

    let problems = validate_call(def, &params, &caller()).expect_err("invalid");
    assert_eq!(problems.len(), 2);

    params.insert("item".to_string(), json!("milk"));
    params.insert("quantity".to_string(), json!(3));
    let first = validate_call(def, &params, &caller()).expect("valid");
    let second = validate_call(def, &params, &caller()).expect("still valid");
    assert_eq!(first, second);
}

#[test]
fn coercions_are_single_step_only() {
    let catalog = ActionCatalog::builtin();
    let def = catalog.lookup("add_inventory").expect("def");

    let coerced = validate_call(
        def,
        &raw(&[("item", json!("rice")), ("quantity", json!("2.5"))]),
        &caller(),
    )
    .expect("fractional string coerces");
    assert_eq!(coerced.parameters.get("quantity"), Some(&json!(2.5)));

    let problems = validate_call(
        def,
        &raw(&[("item", json!("rice")), ("quantity", json!(true))]),
        &caller(),
    )
    .expect_err("bool never becomes number");
    assert_eq!(problems[0].field, "quantity");
}

#[test]
fn oracle_over_extraction_is_tolerated() {
    let catalog = ActionCatalog::builtin();
    let def = catalog.lookup("add_shopping_item").expect("def");
    let call = validate_call(
        def,
        &raw(&[
            ("item", json!("coffee")),
            ("urgency", json!("high")),
            ("store", json!("corner shop")),
        ]),
        &caller(),
    )
    .expect("unknown params dropped");
    assert_eq!(call.parameters.get("item"), Some(&json!("coffee")));
    assert!(!call.parameters.contains_key("urgency"));
    assert!(!call.parameters.contains_key("store"));
    // Default quantity fills in.
    assert_eq!(call.parameters.get("quantity"), Some(&json!(1)));
}

#[test]
fn validation_has_no_side_effects_on_inputs() {
    let catalog = ActionCatalog::builtin();
    let def = catalog.lookup("add_inventory").expect("def");
    let params = raw(&[("item", json!("eggs")), ("quantity", json!("12"))]);
    let before = params.clone();
    let _ = validate_call(def, &params, &caller());
    assert_eq!(params, before);
}
