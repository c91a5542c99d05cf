//! Field selection: which paths are exposed by default and which are never writable.

use crate::config::ModelDescriptor;
use std::collections::HashSet;

/// Paths included in default projections, in declaration order.
pub fn selected_fields(model: &ModelDescriptor) -> Vec<String> {
    model
        .fields
        .iter()
        .filter(|f| f.selected)
        .map(|f| f.path.clone())
        .collect()
}

/// Paths stripped from create and update bodies.
pub fn uneditable_fields(model: &ModelDescriptor) -> HashSet<String> {
    model
        .fields
        .iter()
        .filter(|f| !f.editable)
        .map(|f| f.path.clone())
        .collect()
}
