use larder::catalog::ActionCatalog;
use larder::intent::{build_classifier_prompt, resolve_intent, HistoryLimits};
use larder::oracle::OracleError;
use larder::session::Turn;
use serde_json::json;

fn turn(message: &str, action: Option<&str>, outcome: Option<&str>) -> Turn {
    Turn {
        message: message.to_string(),
        action: action.map(|a| a.to_string()),
        outcome: outcome.map(|o| o.to_string()),
        timestamp: 0,
    }
}

#[test]
fn resolver_never_invents_actions_outside_the_catalog() {
    let catalog = ActionCatalog::builtin();
    for raw in [
        r#"{"action":"format_disk","parameters":{},"confidence":1.0}"#,
        r#"{"action":"GET_INVENTORY","parameters":{},"confidence":1.0}"#,
        r#"{"action":"","parameters":{},"confidence":1.0}"#,
    ] {
        let oracle = move |_: &str| -> Result<String, OracleError> { Ok(raw.to_string()) };
        let intent = resolve_intent(
            &oracle,
            "do something",
            &[],
            &catalog,
            HistoryLimits::default(),
            None,
        );
        assert_eq!(intent.action, None, "accepted `{raw}`");
    }
}

#[test]
fn explicit_none_verdict_is_a_clean_no_action() {
    let catalog = ActionCatalog::builtin();
    let oracle = |_: &str| -> Result<String, OracleError> {
        Ok(r#"{"action":"none","parameters":{},"confidence":0.2}"#.to_string())
    };
    let intent = resolve_intent(
        &oracle,
        "how's the weather",
        &[],
        &catalog,
        HistoryLimits::default(),
        None,
    );
    assert_eq!(intent.action, None);
    assert!(!intent.needs_clarification);
}

#[test]
fn oracle_errors_never_propagate_to_the_caller() {
    let catalog = ActionCatalog::builtin();
    let oracle = |_: &str| -> Result<String, OracleError> {
        Err(OracleError::MalformedResponse("no choices".to_string()))
    };
    let intent = resolve_intent(
        &oracle,
        "add milk",
        &[],
        &catalog,
        HistoryLimits::default(),
        None,
    );
    assert_eq!(intent.action, None);
    assert_eq!(intent.confidence, 0.0);
}

#[test]
fn ambiguity_signals_clarification_instead_of_guessing() {
    let catalog = ActionCatalog::builtin();
    let oracle = |_: &str| -> Result<String, OracleError> {
        Ok(json!({
            "action": "delete_inventory",
            "parameters": {"item": "bananas"},
            "confidence": 0.51,
            "alternates": ["remove_shopping_item"]
        })
        .to_string())
    };
    let intent = resolve_intent(
        &oracle,
        "remove bananas",
        &[],
        &catalog,
        HistoryLimits::default(),
        None,
    );
    assert_eq!(intent.action, None);
    assert!(intent.needs_clarification);
}

#[test]
fn history_from_the_same_session_reaches_the_prompt() {
    let catalog = ActionCatalog::builtin();
    let history = vec![turn(
        "add 3 milk",
        Some("add_inventory"),
        Some("Added 3 milk to your inventory."),
    )];
    let prompt = build_classifier_prompt(
        "make that 5",
        &history,
        &catalog,
        HistoryLimits::default(),
        None,
    );
    assert!(prompt.contains("add 3 milk"));
    assert!(prompt.contains("action=add_inventory"));
    assert!(prompt.contains("make that 5"));
}

#[test]
fn history_window_is_capped_by_turn_count() {
    let catalog = ActionCatalog::builtin();
    let history: Vec<Turn> = (0..20)
        .map(|index| turn(&format!("message {index}"), None, None))
        .collect();
    let prompt = build_classifier_prompt(
        "hello",
        &history,
        &catalog,
        HistoryLimits {
            max_turns: 4,
            max_chars: 100_000,
        },
        None,
    );
    assert!(prompt.contains("message 19"));
    assert!(prompt.contains("message 16"));
    assert!(!prompt.contains("message 15"));
}

#[test]
fn caller_context_is_included_when_present() {
    let catalog = ActionCatalog::builtin();
    let prompt = build_classifier_prompt(
        "add rice",
        &[],
        &catalog,
        HistoryLimits::default(),
        Some("speaking from the pantry view"),
    );
    assert!(prompt.contains("speaking from the pantry view"));
}

#[test]
fn confidence_is_clamped_to_unit_range() {
    let catalog = ActionCatalog::builtin();
    let oracle = |_: &str| -> Result<String, OracleError> {
        Ok(r#"{"action":"get_inventory","parameters":{},"confidence":7.5}"#.to_string())
    };
    let intent = resolve_intent(
        &oracle,
        "show inventory",
        &[],
        &catalog,
        HistoryLimits::default(),
        None,
    );
    assert_eq!(intent.confidence, 1.0);
}
