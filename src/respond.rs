use crate::bridge::{FailureKind, RemoteResult};
use crate::catalog::ActionCatalog;
use crate::validate::FieldProblem;
use serde_json::{Map, Value};

/// Programmatic summary shipped alongside the conversational reply.
/// `error = None` with `success = false` means "nothing to do", not a fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplySummary {
    pub action_taken: Option<String>,
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub summary: ReplySummary,
}

impl Reply {
    fn no_action(text: String) -> Self {
        Self {
            text,
            summary: ReplySummary {
                action_taken: None,
                success: false,
                error: None,
            },
        }
    }

    fn failed(action: Option<&str>, error: &str, text: String) -> Self {
        Self {
            text,
            summary: ReplySummary {
                action_taken: action.map(|a| a.to_string()),
                success: false,
                error: Some(error.to_string()),
            },
        }
    }
}

type PayloadRenderer = fn(&Map<String, Value>, &Value) -> String;

fn item_names(payload: &Value, limit: usize) -> Option<(usize, Vec<String>)> {
    let items = payload
        .as_array()
        .or_else(|| payload.get("items").and_then(Value::as_array))?;
    let names = items
        .iter()
        .filter_map(|item| {
            item.get("name")
                .or_else(|| item.get("item"))
                .and_then(Value::as_str)
                .map(|name| name.to_string())
        })
        .take(limit)
        .collect();
    Some((items.len(), names))
}

fn render_listing(noun: &str, payload: &Value) -> String {
    match item_names(payload, 5) {
        Some((0, _)) => format!("There are no {noun} right now."),
        Some((count, names)) if names.is_empty() => {
            format!("Found {count} {noun}.")
        }
        Some((count, names)) => {
            let lead = names.join(", ");
            if count > names.len() {
                format!("Found {count} {noun}, including {lead}.")
            } else {
                format!("You have {count} {noun}: {lead}.")
            }
        }
        None => format!("Here are your {noun}."),
    }
}

fn param_text<'a>(params: &'a Map<String, Value>, name: &str) -> &'a str {
    params.get(name).and_then(Value::as_str).unwrap_or("that item")
}

fn param_quantity(params: &Map<String, Value>) -> String {
    params
        .get("quantity")
        .map(|value| value.to_string())
        .unwrap_or_else(|| "some".to_string())
}

fn render_inventory(_: &Map<String, Value>, payload: &Value) -> String {
    render_listing("inventory items", payload)
}

fn render_search(params: &Map<String, Value>, payload: &Value) -> String {
    let query = param_text(params, "query");
    match item_names(payload, 5) {
        Some((0, _)) => format!("Nothing in your inventory matches \"{query}\"."),
        Some((count, names)) => format!(
            "Found {count} match(es) for \"{query}\": {}.",
            names.join(", ")
        ),
        None => format!("Here is what matches \"{query}\"."),
    }
}

fn render_add_inventory(params: &Map<String, Value>, _: &Value) -> String {
    format!(
        "Added {} {} to your inventory.",
        param_quantity(params),
        param_text(params, "item")
    )
}

fn render_update_inventory(params: &Map<String, Value>, _: &Value) -> String {
    format!(
        "Updated {} to a quantity of {}.",
        param_text(params, "item"),
        param_quantity(params)
    )
}

fn render_delete_inventory(params: &Map<String, Value>, _: &Value) -> String {
    format!("Removed {} from your inventory.", param_text(params, "item"))
}

fn render_consume_inventory(params: &Map<String, Value>, payload: &Value) -> String {
    let base = format!(
        "Consumed {} {}.",
        param_quantity(params),
        param_text(params, "item")
    );
    match payload.get("remaining").and_then(Value::as_f64) {
        Some(remaining) => format!("{base} {remaining} left."),
        None => base,
    }
}

fn render_low_stock(_: &Map<String, Value>, payload: &Value) -> String {
    match item_names(payload, 5) {
        Some((0, _)) => "Nothing is running low right now.".to_string(),
        Some((count, names)) => format!(
            "{count} item(s) are running low: {}.",
            names.join(", ")
        ),
        None => "Here are the items running low.".to_string(),
    }
}

fn render_expiring(_: &Map<String, Value>, payload: &Value) -> String {
    match item_names(payload, 5) {
        Some((0, _)) => "Nothing is expired or expiring soon.".to_string(),
        Some((count, names)) => format!(
            "{count} item(s) are expiring soon: {}.",
            names.join(", ")
        ),
        None => "Here are the items expiring soon.".to_string(),
    }
}

fn render_shopping_list(_: &Map<String, Value>, payload: &Value) -> String {
    render_listing("shopping list items", payload)
}

fn render_add_shopping(params: &Map<String, Value>, _: &Value) -> String {
    format!(
        "Added {} {} to your shopping list.",
        param_quantity(params),
        param_text(params, "item")
    )
}

fn render_remove_shopping(params: &Map<String, Value>, _: &Value) -> String {
    format!(
        "Removed {} from your shopping list.",
        param_text(params, "item")
    )
}

fn render_recipes(_: &Map<String, Value>, payload: &Value) -> String {
    let recipes = payload
        .get("recipes")
        .and_then(Value::as_array)
        .or_else(|| payload.as_array());
    match recipes {
        Some(recipes) if recipes.is_empty() => {
            "I couldn't find any recipes for what you have on hand.".to_string()
        }
        Some(recipes) => {
            let names: Vec<&str> = recipes
                .iter()
                .filter_map(|recipe| recipe.get("name").and_then(Value::as_str))
                .take(3)
                .collect();
            if names.is_empty() {
                format!("I found {} recipe(s) you can make.", recipes.len())
            } else {
                format!(
                    "I found {} recipe(s) you can make, like {}.",
                    recipes.len(),
                    names.join(", ")
                )
            }
        }
        None => "Here are some recipe ideas.".to_string(),
    }
}

fn render_dashboard(_: &Map<String, Value>, payload: &Value) -> String {
    let items = payload.get("totalItems").and_then(Value::as_i64);
    match items {
        Some(items) => format!("Your kitchen currently tracks {items} items."),
        None => "Here are your kitchen stats.".to_string(),
    }
}

fn render_member_role(params: &Map<String, Value>, _: &Value) -> String {
    format!(
        "Changed {}'s role to {}.",
        param_text(params, "member"),
        param_text(params, "role")
    )
}

/// Action name → success renderer. One entry per catalog action; adding an
/// action means adding a row here, not editing call sites.
const RENDERERS: &[(&str, PayloadRenderer)] = &[
    ("get_inventory", render_inventory),
    ("search_inventory", render_search),
    ("add_inventory", render_add_inventory),
    ("update_inventory", render_update_inventory),
    ("delete_inventory", render_delete_inventory),
    ("consume_inventory", render_consume_inventory),
    ("get_low_stock", render_low_stock),
    ("get_expiring", render_expiring),
    ("get_shopping_list", render_shopping_list),
    ("add_shopping_item", render_add_shopping),
    ("remove_shopping_item", render_remove_shopping),
    ("suggest_recipes", render_recipes),
    ("get_dashboard_stats", render_dashboard),
    ("update_member_role", render_member_role),
];

fn render_success(action: &str, params: &Map<String, Value>, payload: &Value) -> String {
    match RENDERERS.iter().find(|(name, _)| *name == action) {
        Some((_, renderer)) => renderer(params, payload),
        None => "Done.".to_string(),
    }
}

fn render_failure(kind: FailureKind, message: &str) -> String {
    match kind {
        FailureKind::Network => {
            "I couldn't reach the kitchen service. Please try again in a moment.".to_string()
        }
        FailureKind::RemoteUnavailable => {
            "The kitchen service is having trouble right now. Please try again later.".to_string()
        }
        FailureKind::RemoteRejected => {
            let detail = message.trim();
            if detail.is_empty() {
                "The kitchen service couldn't complete that request.".to_string()
            } else {
                format!("That didn't work: {detail}.")
            }
        }
    }
}

/// Reply for a dispatched action's remote result.
pub fn render_action_reply(
    action: &str,
    params: &Map<String, Value>,
    result: &RemoteResult,
) -> Reply {
    match result {
        RemoteResult::Success(payload) => Reply {
            text: render_success(action, params, payload),
            summary: ReplySummary {
                action_taken: Some(action.to_string()),
                success: true,
                error: None,
            },
        },
        RemoteResult::Failure { kind, message } => Reply::failed(
            Some(action),
            kind.as_str(),
            render_failure(*kind, message),
        ),
    }
}

pub fn render_validation_failure(action: &str, problems: &[FieldProblem]) -> Reply {
    let listed = problems
        .iter()
        .map(|problem| problem.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    Reply::failed(
        Some(action),
        "validationFailure",
        format!("I couldn't do that yet. Problems with the request: {listed}."),
    )
}

/// Conversational fallback when no action was resolved. Echoes a few catalog
/// capabilities so the user learns what is supported.
pub fn render_fallback(catalog: &ActionCatalog, needs_clarification: bool) -> Reply {
    if needs_clarification {
        return Reply::no_action(
            "I can read that a couple of different ways. Could you say which one you mean, \
             for example whether to change the inventory or the shopping list?"
                .to_string(),
        );
    }
    let capabilities = catalog
        .all()
        .map(|def| def.description.to_lowercase())
        .take(3)
        .collect::<Vec<_>>()
        .join(", ");
    Reply::no_action(format!(
        "I'm not sure what you'd like me to do. I can, for example: {capabilities}."
    ))
}

/// Guaranteed floor for unexpected engine faults. Never leaks the cause.
pub fn render_internal_failure(action: Option<&str>) -> Reply {
    Reply::failed(
        action,
        "internal",
        "Something went wrong on my side. Please try that again.".to_string(),
    )
}
