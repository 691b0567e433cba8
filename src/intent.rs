use crate::catalog::ActionCatalog;
use crate::oracle::IntentOracle;
use crate::session::Turn;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Caps on how much history reaches the oracle prompt. Keeps call size and
/// cost predictable regardless of how long a session has been running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryLimits {
    pub max_turns: usize,
    pub max_chars: usize,
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self {
            max_turns: 6,
            max_chars: 4000,
        }
    }
}

/// The engine's best guess at what the message asks for. `action` is either a
/// catalog name or `None` ("no action"); parameters are raw oracle output and
/// still untyped until validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedIntent {
    pub action: Option<String>,
    pub raw_parameters: Map<String, Value>,
    pub confidence: f32,
    pub needs_clarification: bool,
}

impl ResolvedIntent {
    pub fn none() -> Self {
        Self {
            action: None,
            raw_parameters: Map::new(),
            confidence: 0.0,
            needs_clarification: false,
        }
    }

    fn clarify() -> Self {
        Self {
            needs_clarification: true,
            ..Self::none()
        }
    }
}

/// Raw verdict shape the oracle is instructed to emit. Every field is
/// untrusted until checked against the catalog.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OracleVerdict {
    action: String,
    #[serde(default)]
    parameters: Map<String, Value>,
    #[serde(default)]
    confidence: f32,
    #[serde(default)]
    alternates: Vec<String>,
}

fn render_history(history: &[Turn], limits: HistoryLimits) -> Option<String> {
    if limits.max_turns == 0 || limits.max_chars == 0 {
        return None;
    }
    let skip = history.len().saturating_sub(limits.max_turns);
    let mut selected = Vec::new();
    let mut used = 0usize;
    for turn in history.iter().skip(skip).rev() {
        let mut line = format!("[user] {}", turn.message.trim());
        if let Some(action) = turn.action.as_deref() {
            line.push_str(&format!(" (action={action})"));
        }
        if let Some(outcome) = turn.outcome.as_deref() {
            line.push_str(&format!(" -> {outcome}"));
        }
        let line_len = line.chars().count();
        let sep = if selected.is_empty() { 0 } else { 1 };
        if used + sep + line_len > limits.max_chars {
            break;
        }
        used += sep + line_len;
        selected.push(line);
    }
    if selected.is_empty() {
        return None;
    }
    selected.reverse();
    Some(selected.join("\n"))
}

fn render_option_set(catalog: &ActionCatalog) -> String {
    let mut lines = Vec::new();
    for def in catalog.all() {
        let params = def
            .params
            .iter()
            .map(|param| {
                let mut rendered = format!("{}: {}", param.name, param.param_type);
                if let Some(allowed) = &param.allowed_values {
                    rendered.push_str(&format!(" one of [{}]", allowed.join(", ")));
                }
                if !param.required {
                    rendered.push_str(" (optional)");
                }
                rendered
            })
            .collect::<Vec<_>>()
            .join(", ");
        if params.is_empty() {
            lines.push(format!("- {}: {}", def.name, def.description));
        } else {
            lines.push(format!("- {} ({params}): {}", def.name, def.description));
        }
    }
    lines.join("\n")
}

pub fn build_classifier_prompt(
    message: &str,
    history: &[Turn],
    catalog: &ActionCatalog,
    limits: HistoryLimits,
    extra_context: Option<&str>,
) -> String {
    let mut prompt = String::from(
        "You classify a kitchen assistant message into exactly one supported action.\n\nSupported actions:\n",
    );
    prompt.push_str(&render_option_set(catalog));
    prompt.push_str("\n- none: no supported action matches\n");
    if let Some(context) = extra_context.map(str::trim).filter(|c| !c.is_empty()) {
        prompt.push_str(&format!("\nCaller context:\n{context}\n"));
    }
    if let Some(rendered) = render_history(history, limits) {
        prompt.push_str(&format!("\nRecent conversation turns:\n{rendered}\n"));
    }
    prompt.push_str(&format!(
        "\nUser message: {message:?}\n\n\
         Rules:\n\
         - Pick exactly one action name from the list above, or \"none\".\n\
         - Use the recent turns only to resolve pronouns and implicit subjects.\n\
         - If two actions are plausible, list the runner-up in \"alternates\" instead of guessing.\n\
         - Extract parameter values verbatim from the message; never invent values.\n\n\
         Respond with exactly one JSON object and nothing else:\n\
         {{\"action\": \"action_name\", \"parameters\": {{}}, \"confidence\": 0.0, \"alternates\": []}}\n\
         Do not use markdown fences.\n",
    ));
    prompt
}

fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

/// Resolve `message` to at most one catalog action. Fail-closed on every
/// irregularity: oracle failure, malformed JSON, an action name the catalog
/// does not know, or expressed ambiguity all resolve to "none" rather than a
/// guessed dispatch.
pub fn resolve_intent(
    oracle: &dyn IntentOracle,
    message: &str,
    history: &[Turn],
    catalog: &ActionCatalog,
    limits: HistoryLimits,
    extra_context: Option<&str>,
) -> ResolvedIntent {
    let prompt = build_classifier_prompt(message, history, catalog, limits, extra_context);
    let raw = match oracle.classify(&prompt) {
        Ok(raw) => raw,
        Err(_) => return ResolvedIntent::none(),
    };
    let verdict = match serde_json::from_str::<OracleVerdict>(strip_fences(&raw)) {
        Ok(verdict) => verdict,
        Err(_) => return ResolvedIntent::none(),
    };

    let alternates = verdict
        .alternates
        .iter()
        .filter(|name| catalog.lookup(name).is_some())
        .count();
    if alternates > 0 {
        return ResolvedIntent::clarify();
    }

    if verdict.action == "none" {
        return ResolvedIntent::none();
    }
    if catalog.lookup(&verdict.action).is_none() {
        return ResolvedIntent::none();
    }

    ResolvedIntent {
        action: Some(verdict.action),
        raw_parameters: verdict.parameters,
        confidence: verdict.confidence.clamp(0.0, 1.0),
        needs_clarification: false,
    }
}
