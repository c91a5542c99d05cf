//! Shared state captured by generated handlers. Everything here is read-only after startup.

use crate::config::{ModelCatalog, ModelDescriptor};
use crate::fields::{selected_fields, uneditable_fields};
use crate::store::DocumentStore;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Clone)]
pub struct RestState {
    pub store: Arc<dyn DocumentStore>,
    /// All known models; used to resolve references during population.
    pub catalog: Arc<ModelCatalog>,
}

/// Per-model environment of a generated route.
#[derive(Clone)]
pub struct ModelContext {
    pub state: RestState,
    pub model: Arc<ModelDescriptor>,
    /// Default projection and allow-list for `select`.
    pub selected: Arc<[String]>,
    pub uneditable: Arc<HashSet<String>>,
}

impl ModelContext {
    pub fn new(state: RestState, model: Arc<ModelDescriptor>) -> Self {
        let selected = selected_fields(&model).into();
        let uneditable = Arc::new(uneditable_fields(&model));
        ModelContext {
            state,
            model,
            selected,
            uneditable,
        }
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.state.store.as_ref()
    }

    pub fn collection(&self) -> &str {
        &self.model.collection
    }
}
