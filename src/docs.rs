//! API Blueprint documentation for generated endpoints.
//!
//! Every section is a fixed template with explicit slots (model name, api root, endpoint,
//! attribute list). Field metadata is never spliced into a template string that is scanned
//! again, so field names cannot collide with placeholders.

use crate::config::{FieldDefault, FieldDescriptor, ModelDescriptor, Operation};
use serde_json::Value;

const NEW_LINE: &str = "\n";
const TAB: &str = "    ";

/// One documentation block of a model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DocSection {
    Model,
    Operation(Operation),
}

pub fn render_section(section: DocSection, model: &ModelDescriptor, root: &str) -> String {
    let name = &model.collection;
    let endpoint = model.endpoint();
    let attributes = match section {
        DocSection::Model | DocSection::Operation(Operation::Create) | DocSection::Operation(Operation::Update) => {
            render_attributes(model)
        }
        _ => String::new(),
    };
    match section {
        DocSection::Model => format!(
            "# Endpoint for {name} [{root}{endpoint}]\nThis endpoint will provide all the required methods available for {name}\n\n+ Attributes\n{attributes}\n\n"
        ),
        DocSection::Operation(Operation::List) => format!(
            "## List all {name} [GET {root}{endpoint}]\nRetrieves the list of {name}\n\n+ Response 200 (application/json)"
        ),
        DocSection::Operation(Operation::Show) => format!(
            "## Retrieve {name} [GET {root}{endpoint}/{{id}}]\nRetrieves item with the id\n\n+ Response 200 (application/json)"
        ),
        DocSection::Operation(Operation::Create) => format!(
            "## Create a {name} [POST {root}{endpoint}]\n\n+ Attributes\n{attributes}\n\n+ Response 200 (application/json)"
        ),
        DocSection::Operation(Operation::Update) => format!(
            "## Updates a {name} [PUT {root}{endpoint}]\n\n+ Attributes\n{attributes}\n\n+ Response 200 (application/json)"
        ),
        DocSection::Operation(Operation::Delete) => format!(
            "## Deletes an item from {name} [DELETE {root}{endpoint}/{{id}}]\nDelete a {name}. **Warning:** This action **permanently** removes the {name} from the database.\n\n+ Response 200 (application/json)"
        ),
    }
}

/// Attribute list over the model's selected fields.
pub fn render_attributes(model: &ModelDescriptor) -> String {
    model
        .fields
        .iter()
        .filter(|f| f.selected)
        .map(attribute_line)
        .collect::<Vec<_>>()
        .join(NEW_LINE)
}

pub fn attribute_line(field: &FieldDescriptor) -> String {
    let mut line = format!(
        "{TAB}+ {} ({}{})",
        field.path,
        field.type_.doc_name(),
        if field.required { ", required" } else { "" }
    );
    let nested = format!("{NEW_LINE}{TAB}{TAB}+ ");
    if !field.enum_values().is_empty() {
        line.push_str(&nested);
        line.push_str("Options: ");
        line.push_str(&field.enum_values().join(", "));
    }
    if let Some(FieldDefault::Literal(v)) = &field.default {
        line.push_str(&nested);
        line.push_str("Default: ");
        line.push_str(&default_text(v));
    }
    if let Some(target) = field.reference() {
        line.push_str(&nested);
        line.push_str("Reference: ");
        line.push_str(target);
    }
    line
}

/// Falsy defaults (null, empty string, zero, false) print as `''`.
fn default_text(v: &Value) -> String {
    match v {
        Value::Null | Value::Bool(false) => "''".to_string(),
        Value::String(s) if s.is_empty() => "''".to_string(),
        Value::Number(n) if n.as_f64() == Some(0.0) => "''".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
