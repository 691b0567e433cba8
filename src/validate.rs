use crate::catalog::{ActionDefinition, ParamSpec, ParamType};
use serde_json::{Map, Value};

/// Authenticated scope attached to every outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub kitchen_id: i64,
    pub user: String,
}

/// Schema-conformant call, ready for the bridge. Only produced when every
/// required parameter is present and type-correct.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedCall {
    pub action: String,
    pub parameters: Map<String, Value>,
    pub caller: CallerIdentity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldProblem {
    pub field: String,
    pub reason: String,
}

impl FieldProblem {
    fn new(field: &str, reason: String) -> Self {
        Self {
            field: field.to_string(),
            reason,
        }
    }
}

impl std::fmt::Display for FieldProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Single well-defined coercion per type before giving up: numeric strings
/// parse to numbers, "true"/"false" to booleans, bare numbers render to text.
fn coerce(value: &Value, target: ParamType) -> Option<Value> {
    if target.matches(value) {
        return Some(value.clone());
    }
    match (target, value) {
        (ParamType::Number, Value::String(raw)) => {
            let raw = raw.trim();
            if let Ok(int) = raw.parse::<i64>() {
                return Some(Value::from(int));
            }
            raw.parse::<f64>().ok().and_then(|float| {
                serde_json::Number::from_f64(float).map(Value::Number)
            })
        }
        (ParamType::Boolean, Value::String(raw)) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        (ParamType::Text, Value::Number(number)) => Some(Value::String(number.to_string())),
        _ => None,
    }
}

fn check_allowed(spec: &ParamSpec, value: &Value) -> Result<Option<Value>, String> {
    let Some(allowed) = &spec.allowed_values else {
        return Ok(None);
    };
    let Some(raw) = value.as_str() else {
        return Err(format!("must be one of [{}]", allowed.join(", ")));
    };
    match allowed
        .iter()
        .find(|choice| choice.eq_ignore_ascii_case(raw.trim()))
    {
        Some(canonical) => Ok(Some(Value::String(canonical.clone()))),
        None => Err(format!(
            "`{raw}` is not one of [{}]",
            allowed.join(", ")
        )),
    }
}

/// Check raw oracle parameters against an action's schema. Pure and
/// deterministic; collects every problem rather than stopping at the first.
/// Unknown raw parameters are dropped silently.
pub fn validate_call(
    def: &ActionDefinition,
    raw_parameters: &Map<String, Value>,
    caller: &CallerIdentity,
) -> Result<ValidatedCall, Vec<FieldProblem>> {
    let mut parameters = Map::new();
    let mut problems = Vec::new();

    for spec in &def.params {
        let raw = raw_parameters.get(&spec.name).filter(|value| !value.is_null());
        match raw {
            Some(value) => match coerce(value, spec.param_type) {
                Some(coerced) => match check_allowed(spec, &coerced) {
                    Ok(Some(canonical)) => {
                        parameters.insert(spec.name.clone(), canonical);
                    }
                    Ok(None) => {
                        parameters.insert(spec.name.clone(), coerced);
                    }
                    Err(reason) => problems.push(FieldProblem::new(&spec.name, reason)),
                },
                None => problems.push(FieldProblem::new(
                    &spec.name,
                    format!("must be {}", spec.param_type),
                )),
            },
            None if spec.required => {
                problems.push(FieldProblem::new(&spec.name, "is required".to_string()));
            }
            None => {
                if let Some(default) = &spec.default {
                    parameters.insert(spec.name.clone(), default.clone());
                }
            }
        }
    }

    if problems.is_empty() {
        Ok(ValidatedCall {
            action: def.name.clone(),
            parameters,
            caller: caller.clone(),
        })
    } else {
        Err(problems)
    }
}
