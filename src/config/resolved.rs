//! Resolved model catalog: definitions validated and flattened for runtime use.
//! Descriptors are immutable once the catalog is shared; handlers hold `Arc`s to them.

use crate::error::ConfigError;
use crate::middleware::Middleware;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Path of the surrogate id in every stored document.
pub const ID_PATH: &str = "_id";

/// Default concurrency-token path.
pub const DEFAULT_VERSION_KEY: &str = "__v";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Date,
    Object,
    Enum(Vec<String>),
    /// Single reference to the named model.
    Reference(String),
    /// List of references to the named model.
    ReferenceArray(String),
}

impl FieldType {
    /// Type name as shown in generated documentation.
    pub fn doc_name(&self) -> &'static str {
        match self {
            FieldType::String | FieldType::Enum(_) => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Object | FieldType::Reference(_) => "object",
            FieldType::ReferenceArray(_) => "array",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FieldDefault {
    Literal(serde_json::Value),
    /// Current UTC time, RFC 3339.
    Now,
    /// Fresh UUID v4.
    Uuid,
}

impl FieldDefault {
    /// Expression defaults are computed per document and are not documented.
    pub fn is_expression(&self) -> bool {
        !matches!(self, FieldDefault::Literal(_))
    }
}

#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    pub path: String,
    pub type_: FieldType,
    pub required: bool,
    pub default: Option<FieldDefault>,
    /// Included in default projections.
    pub selected: bool,
    /// Accepted in create/update bodies.
    pub editable: bool,
}

impl FieldDescriptor {
    /// Referenced model name for single and list references.
    pub fn reference(&self) -> Option<&str> {
        match &self.type_ {
            FieldType::Reference(m) | FieldType::ReferenceArray(m) => Some(m),
            _ => None,
        }
    }

    pub fn enum_values(&self) -> &[String] {
        match &self.type_ {
            FieldType::Enum(v) => v,
            _ => &[],
        }
    }
}

/// The five generated CRUD operations, in canonical order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    List,
    Show,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::List,
        Operation::Show,
        Operation::Create,
        Operation::Update,
        Operation::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Show => "show",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl FromStr for Operation {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownOperation(s.to_string()))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Default)]
pub struct RestOptions {
    pub enabled: bool,
    /// Enabled operations, canonical order, no duplicates.
    pub operations: Vec<Operation>,
    /// Names that matched no operation.
    pub unknown_operations: Vec<String>,
    pub hooks: HashMap<Operation, Vec<Middleware>>,
    pub relationships: Vec<String>,
}

impl RestOptions {
    pub fn has(&self, op: Operation) -> bool {
        self.operations.contains(&op)
    }

    pub fn middleware(&self, op: Operation) -> Vec<Middleware> {
        self.hooks.get(&op).cloned().unwrap_or_default()
    }
}

#[derive(Clone, Debug)]
pub struct AutoKey {
    pub path: String,
    pub from: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct ModelDescriptor {
    pub name: String,
    pub collection: String,
    /// Declaration order.
    pub fields: Vec<FieldDescriptor>,
    pub auto_key: Option<AutoKey>,
    pub version_key: String,
    pub rest: Option<RestOptions>,
}

impl ModelDescriptor {
    pub fn field(&self, path: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.path == path)
    }

    /// Lower-cased collection name used in route paths.
    pub fn endpoint(&self) -> String {
        self.collection.to_lowercase()
    }

    /// Path used to locate a single document from the `:id` route parameter.
    pub fn find_by(&self) -> &str {
        self.auto_key.as_ref().map(|k| k.path.as_str()).unwrap_or(ID_PATH)
    }

    pub fn rest_enabled(&self) -> bool {
        self.rest.as_ref().map(|r| r.enabled).unwrap_or(false)
    }

    pub fn relationship_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.reference().is_some())
    }
}

/// All known models, in definition order.
#[derive(Clone, Debug, Default)]
pub struct ModelCatalog {
    models: Vec<Arc<ModelDescriptor>>,
    by_name: HashMap<String, usize>,
}

impl ModelCatalog {
    pub fn new(models: Vec<ModelDescriptor>) -> Self {
        let by_name = models
            .iter()
            .enumerate()
            .map(|(i, m)| (m.name.clone(), i))
            .collect();
        ModelCatalog {
            models: models.into_iter().map(Arc::new).collect(),
            by_name,
        }
    }

    pub fn models(&self) -> &[Arc<ModelDescriptor>] {
        &self.models
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ModelDescriptor>> {
        self.by_name.get(name).map(|&i| &self.models[i])
    }

    /// Attach a hook to one operation of a model. Call before the catalog is shared.
    pub fn hook(&mut self, model: &str, op: Operation, middleware: Middleware) -> Result<(), ConfigError> {
        let idx = *self.by_name.get(model).ok_or_else(|| ConfigError::MissingReference {
            kind: "model",
            id: model.to_string(),
        })?;
        let descriptor = Arc::make_mut(&mut self.models[idx]);
        let rest = descriptor.rest.as_mut().ok_or_else(|| {
            ConfigError::Validation(format!("{} has no rest options to hook into", model))
        })?;
        rest.hooks.entry(op).or_default().push(middleware);
        Ok(())
    }
}
