use larder::bridge::{FailureKind, RemoteResult};
use larder::catalog::ActionCatalog;
use larder::respond::{
    render_action_reply, render_fallback, render_internal_failure, render_validation_failure,
};
use larder::validate::FieldProblem;
use serde_json::{json, Map, Value};

fn params(entries: &[(&str, Value)]) -> Map<String, Value> {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

#[test]
fn every_remote_outcome_produces_text_and_a_summary() {
    let outcomes = [
        RemoteResult::Success(json!({"id": 1})),
        RemoteResult::Failure {
            kind: FailureKind::Network,
            message: "timeout".to_string(),
        },
        RemoteResult::Failure {
            kind: FailureKind::RemoteRejected,
            message: "no such item".to_string(),
        },
        RemoteResult::Failure {
            kind: FailureKind::RemoteUnavailable,
            message: "503".to_string(),
        },
    ];
    for outcome in &outcomes {
        let reply = render_action_reply(
            "add_inventory",
            &params(&[("item", json!("apples")), ("quantity", json!(2))]),
            outcome,
        );
        assert!(!reply.text.is_empty());
        assert_eq!(reply.summary.action_taken.as_deref(), Some("add_inventory"));
        assert_eq!(reply.summary.success, outcome.is_success());
    }
}

#[test]
fn shopping_and_inventory_listings_read_naturally() {
    let shopping = render_action_reply(
        "get_shopping_list",
        &Map::new(),
        &RemoteResult::Success(json!({"items": [{"name": "coffee"}, {"name": "sugar"}]})),
    );
    assert!(shopping.text.contains("2"));
    assert!(shopping.text.contains("coffee"));

    let empty = render_action_reply(
        "get_low_stock",
        &Map::new(),
        &RemoteResult::Success(json!([])),
    );
    assert!(empty.text.to_lowercase().contains("nothing"));
}

#[test]
fn recipe_payloads_render_leading_names() {
    let reply = render_action_reply(
        "suggest_recipes",
        &params(&[("servings", json!(4))]),
        &RemoteResult::Success(json!({"recipes": [
            {"name": "fried rice"}, {"name": "omelette"}
        ]})),
    );
    assert!(reply.text.contains("fried rice"));
    assert!(reply.summary.success);
}

#[test]
fn unavailable_backend_never_leaks_status_or_urls() {
    let reply = render_action_reply(
        "get_inventory",
        &Map::new(),
        &RemoteResult::Failure {
            kind: FailureKind::RemoteUnavailable,
            message: "HTTP 503 from http://10.0.3.7:8080/api/internal/inventory".to_string(),
        },
    );
    assert!(!reply.text.contains("503"));
    assert!(!reply.text.contains("http"));
    assert_eq!(reply.summary.error.as_deref(), Some("remoteUnavailable"));
}

#[test]
fn validation_failure_text_mentions_the_action_problems_in_order() {
    let reply = render_validation_failure(
        "update_member_role",
        &[
            FieldProblem {
                field: "member".to_string(),
                reason: "is required".to_string(),
            },
            FieldProblem {
                field: "role".to_string(),
                reason: "`chef` is not one of [owner, admin, member]".to_string(),
            },
        ],
    );
    let member_at = reply.text.find("member:").expect("member problem");
    let role_at = reply.text.find("role:").expect("role problem");
    assert!(member_at < role_at);
}

#[test]
fn fallback_and_internal_failure_are_distinguishable() {
    let catalog = ActionCatalog::builtin();
    let fallback = render_fallback(&catalog, false);
    assert_eq!(fallback.summary.error, None);
    assert!(!fallback.summary.success);

    let internal = render_internal_failure(Some("add_inventory"));
    assert_eq!(internal.summary.error.as_deref(), Some("internal"));
    assert!(!internal.summary.success);
}
