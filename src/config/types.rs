//! Raw model definitions as loaded from JSON (one `ListConfig` per model).

use serde::{Deserialize, Deserializer, Serialize};

/// Semantic field type as written in model definitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldTypeConfig {
    String,
    Number,
    Boolean,
    Date,
    Object,
    #[serde(alias = "ref", alias = "relationship")]
    Reference,
    Enum,
    #[serde(alias = "references", alias = "ref_array")]
    ReferenceArray,
}

/// Field default: a literal JSON value, or a named expression evaluated on create.
#[derive(Clone, Debug, Serialize)]
pub enum DefaultConfig {
    Literal(serde_json::Value),
    Expression { expression: String },
}

impl<'de> Deserialize<'de> for DefaultConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = serde_json::Value::deserialize(deserializer)?;
        match v {
            serde_json::Value::Object(mut obj) => {
                if let Some(serde_json::Value::String(s)) = obj.remove("expression") {
                    return Ok(DefaultConfig::Expression { expression: s });
                }
                if let Some(lit) = obj.remove("value") {
                    return Ok(DefaultConfig::Literal(lit));
                }
                Err(serde::de::Error::custom(format!(
                    "field default object must be {{ \"expression\": \"...\" }} or {{ \"value\": ... }}; got keys: {:?}",
                    obj.keys().collect::<Vec<_>>()
                )))
            }
            other => Ok(DefaultConfig::Literal(other)),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldConfig {
    pub path: String,
    #[serde(rename = "type")]
    pub type_: FieldTypeConfig,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<DefaultConfig>,
    #[serde(default, rename = "enum")]
    pub enum_values: Vec<String>,
    /// Referenced model name for reference and reference_array fields.
    #[serde(default, rename = "ref")]
    pub reference: Option<String>,
    #[serde(default)]
    pub selected: Option<bool>,
    #[serde(default)]
    pub editable: Option<bool>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AutoKeyConfig {
    pub path: String,
    #[serde(default)]
    pub from: Vec<String>,
}

/// `"list show create"` or `["list", "show", "create"]`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OperationsConfig {
    Spaced(String),
    List(Vec<String>),
}

impl OperationsConfig {
    pub fn names(&self) -> Vec<&str> {
        match self {
            OperationsConfig::Spaced(s) => s.split_whitespace().collect(),
            OperationsConfig::List(v) => v.iter().map(String::as_str).collect(),
        }
    }
}

impl Default for OperationsConfig {
    fn default() -> Self {
        OperationsConfig::Spaced("list show create update delete".into())
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RestConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub operations: OperationsConfig,
    /// Relationship fields that get a `/:id/{relationship}` sub-list route.
    #[serde(default)]
    pub relationships: Vec<String>,
}

/// One model definition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListConfig {
    pub name: String,
    /// Collection name; defaults to the lower-cased model name with an `s` appended.
    #[serde(default)]
    pub collection: Option<String>,
    pub fields: Vec<FieldConfig>,
    #[serde(default)]
    pub autokey: Option<AutoKeyConfig>,
    #[serde(default)]
    pub version_key: Option<String>,
    #[serde(default)]
    pub rest: Option<RestConfig>,
}
