use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("action name must be non-empty")]
    EmptyActionName,
    #[error("duplicate action `{0}`")]
    DuplicateAction(String),
    #[error("action `{action}` parameter `{param}` declares allowed values but is not text")]
    AllowedValuesOnNonText { action: String, param: String },
}

/// Wire-level type of an action parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    Text,
    Number,
    Boolean,
}

impl ParamType {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Text => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Number => write!(f, "number"),
            Self::Boolean => write!(f, "boolean"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub required: bool,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub allowed_values: Option<Vec<String>>,
}

impl ParamSpec {
    pub fn required(name: &str, param_type: ParamType) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            required: true,
            default: None,
            allowed_values: None,
        }
    }

    pub fn optional(name: &str, param_type: ParamType) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type)
        }
    }

    pub fn with_default(name: &str, param_type: ParamType, default: Value) -> Self {
        Self {
            required: false,
            default: Some(default),
            ..Self::required(name, param_type)
        }
    }

    pub fn enumerated(name: &str, allowed: &[&str]) -> Self {
        Self {
            allowed_values: Some(allowed.iter().map(|value| value.to_string()).collect()),
            ..Self::required(name, ParamType::Text)
        }
    }
}

/// Opaque reference to the backend operation an action maps to. The bridge
/// resolves `service_path` against its base URL; `mutating` drives the
/// no-retry rule for calls that change state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteOperation {
    pub service_path: String,
    pub mutating: bool,
}

impl RemoteOperation {
    pub fn read(service_path: &str) -> Self {
        Self {
            service_path: service_path.to_string(),
            mutating: false,
        }
    }

    pub fn write(service_path: &str) -> Self {
        Self {
            service_path: service_path.to_string(),
            mutating: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDefinition {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub params: Vec<ParamSpec>,
    pub operation: RemoteOperation,
}

impl ActionDefinition {
    pub fn new(
        name: &str,
        description: &str,
        params: Vec<ParamSpec>,
        operation: RemoteOperation,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            params,
            operation,
        }
    }
}

/// Immutable action registry. Built once at startup; lookups never fail with
/// anything other than `None`, which callers treat as "no matching action".
#[derive(Debug, Clone)]
pub struct ActionCatalog {
    actions: BTreeMap<String, ActionDefinition>,
}

impl ActionCatalog {
    pub fn new(definitions: Vec<ActionDefinition>) -> Result<Self, CatalogError> {
        let mut actions = BTreeMap::new();
        for def in definitions {
            if def.name.trim().is_empty() {
                return Err(CatalogError::EmptyActionName);
            }
            for param in &def.params {
                if param.allowed_values.is_some() && param.param_type != ParamType::Text {
                    return Err(CatalogError::AllowedValuesOnNonText {
                        action: def.name.clone(),
                        param: param.name.clone(),
                    });
                }
            }
            if actions.contains_key(&def.name) {
                return Err(CatalogError::DuplicateAction(def.name));
            }
            actions.insert(def.name.clone(), def);
        }
        Ok(Self { actions })
    }

    pub fn lookup(&self, name: &str) -> Option<&ActionDefinition> {
        self.actions.get(name)
    }

    pub fn all(&self) -> impl Iterator<Item = &ActionDefinition> {
        self.actions.values()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// The household-inventory action set exposed by the backend's internal
    /// API. Adding an action here plus a renderer in `respond` is the whole
    /// change surface for a new capability.
    pub fn builtin() -> Self {
        let definitions = vec![
            ActionDefinition::new(
                "get_inventory",
                "Show all inventory items in the kitchen",
                Vec::new(),
                RemoteOperation::read("inventory/getByKitchen"),
            ),
            ActionDefinition::new(
                "search_inventory",
                "Search inventory items by name or category",
                vec![ParamSpec::required("query", ParamType::Text)],
                RemoteOperation::read("inventory/search"),
            ),
            ActionDefinition::new(
                "add_inventory",
                "Add a new item or increase the quantity of an existing item",
                vec![
                    ParamSpec::required("item", ParamType::Text),
                    ParamSpec::required("quantity", ParamType::Number),
                ],
                RemoteOperation::write("inventory/add"),
            ),
            ActionDefinition::new(
                "update_inventory",
                "Set the quantity of an existing inventory item",
                vec![
                    ParamSpec::required("item", ParamType::Text),
                    ParamSpec::required("quantity", ParamType::Number),
                ],
                RemoteOperation::write("inventory/update"),
            ),
            ActionDefinition::new(
                "delete_inventory",
                "Remove an item from the inventory entirely",
                vec![ParamSpec::required("item", ParamType::Text)],
                RemoteOperation::write("inventory/delete"),
            ),
            ActionDefinition::new(
                "consume_inventory",
                "Consume/reduce the quantity of an inventory item",
                vec![
                    ParamSpec::required("item", ParamType::Text),
                    ParamSpec::required("quantity", ParamType::Number),
                ],
                RemoteOperation::write("inventory/consume"),
            ),
            ActionDefinition::new(
                "get_low_stock",
                "Show items that are running low on stock",
                Vec::new(),
                RemoteOperation::read("inventory/lowStock"),
            ),
            ActionDefinition::new(
                "get_expiring",
                "Show items that are expired or expiring soon",
                Vec::new(),
                RemoteOperation::read("inventory/getExpiring"),
            ),
            ActionDefinition::new(
                "get_shopping_list",
                "Show the shopping list",
                Vec::new(),
                RemoteOperation::read("shopping/getLists"),
            ),
            ActionDefinition::new(
                "add_shopping_item",
                "Add an item to the shopping list",
                vec![
                    ParamSpec::required("item", ParamType::Text),
                    ParamSpec::with_default("quantity", ParamType::Number, json!(1)),
                ],
                RemoteOperation::write("shopping/addItem"),
            ),
            ActionDefinition::new(
                "remove_shopping_item",
                "Remove an item from the shopping list",
                vec![ParamSpec::required("item", ParamType::Text)],
                RemoteOperation::write("shopping/removeItem"),
            ),
            ActionDefinition::new(
                "suggest_recipes",
                "Suggest recipes based on the available inventory",
                vec![
                    ParamSpec::with_default("servings", ParamType::Number, json!(4)),
                    ParamSpec::optional("category", ParamType::Text),
                ],
                RemoteOperation::read("recipes/suggest"),
            ),
            ActionDefinition::new(
                "get_dashboard_stats",
                "Show kitchen dashboard statistics",
                Vec::new(),
                RemoteOperation::read("dashboard/stats"),
            ),
            ActionDefinition::new(
                "update_member_role",
                "Change a kitchen member's role",
                vec![
                    ParamSpec::required("member", ParamType::Text),
                    ParamSpec::enumerated("role", &["owner", "admin", "member"]),
                ],
                RemoteOperation::write("kitchen/updateMemberRole"),
            ),
        ];
        Self::new(definitions).expect("builtin catalog is well-formed")
    }
}
