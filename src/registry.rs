//! RestApi: owns the generated route table and documentation, registers models, mounts routes.

use crate::config::{ModelCatalog, ModelDescriptor, Operation};
use crate::docs::{render_section, DocSection};
use crate::error::RegistrationError;
use crate::routes::{synth, AxumBinder, RouteBinder, RouteDescriptor, DEFAULT_BODY_LIMIT};
use crate::state::{ModelContext, RestState};
use crate::store::DocumentStore;
use axum::Router;
use std::collections::HashSet;
use std::sync::Arc;

pub const DEFAULT_API_ROOT: &str = "/api/";

#[derive(Clone, Debug)]
pub struct RestSettings {
    /// Prefix of every generated path. Normalized to start and end with `/`.
    pub api_root: String,
    pub body_limit: usize,
}

impl Default for RestSettings {
    fn default() -> Self {
        RestSettings {
            api_root: DEFAULT_API_ROOT.to_string(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

/// `"api"` → `"/api/"`, `""` → the default root.
pub fn normalize_root(root: &str) -> String {
    let trimmed = root.trim().trim_matches('/');
    if root.trim().is_empty() {
        return DEFAULT_API_ROOT.to_string();
    }
    if trimmed.is_empty() {
        return "/".to_string();
    }
    format!("/{}/", trimmed)
}

/// Outcome of registering one model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Registered {
    Routes { routes: usize },
    AlreadyRegistered,
    Disabled,
}

/// Per-model registration results, in catalog order.
pub type RegistrationReport = Vec<(String, Result<Registered, RegistrationError>)>;

struct DocEntry {
    model: String,
    text: String,
}

pub struct RestApi {
    state: RestState,
    settings: RestSettings,
    routes: Vec<RouteDescriptor>,
    docs: Vec<DocEntry>,
    registered: HashSet<String>,
}

impl RestApi {
    pub fn new(catalog: Arc<ModelCatalog>, store: Arc<dyn DocumentStore>, settings: RestSettings) -> Self {
        let settings = RestSettings {
            api_root: normalize_root(&settings.api_root),
            ..settings
        };
        RestApi {
            state: RestState { store, catalog },
            settings,
            routes: Vec::new(),
            docs: Vec::new(),
            registered: HashSet::new(),
        }
    }

    /// Configure the root, then register every REST-enabled model of the catalog.
    pub fn create_rest(
        catalog: Arc<ModelCatalog>,
        store: Arc<dyn DocumentStore>,
        settings: RestSettings,
    ) -> (Self, RegistrationReport) {
        let mut api = Self::new(catalog, store, settings);
        let report = api.discover_and_register_all();
        (api, report)
    }

    pub fn api_root(&self) -> &str {
        &self.settings.api_root
    }

    pub fn state(&self) -> &RestState {
        &self.state
    }

    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    /// Register one model. Idempotent by collection name; a failure leaves the registry untouched.
    pub fn register(&mut self, model: &Arc<ModelDescriptor>) -> Result<Registered, RegistrationError> {
        if self.registered.contains(&model.collection) {
            tracing::info!(model = %model.name, "already registered, skipping");
            return Ok(Registered::AlreadyRegistered);
        }
        let Some(rest) = model.rest.as_ref().filter(|r| r.enabled) else {
            tracing::info!(model = %model.name, "rest not enabled, skipping");
            return Ok(Registered::Disabled);
        };

        let ctx = ModelContext::new(self.state.clone(), model.clone());
        let routes = synth::model_routes(&ctx, &self.settings.api_root)?;
        let mut taken: HashSet<_> = self.routes.iter().map(|r| r.key()).collect();
        for route in &routes {
            if !taken.insert(route.key()) {
                return Err(RegistrationError::RouteConflict {
                    model: model.name.clone(),
                    method: route.method.as_str(),
                    path: route.path.clone(),
                });
            }
        }

        let sections = std::iter::once(DocSection::Model).chain(rest.operations.iter().map(|&op| DocSection::Operation(op)));
        for section in sections {
            self.docs.push(DocEntry {
                model: model.name.clone(),
                text: render_section(section, model, &self.settings.api_root),
            });
        }
        let count = routes.len();
        self.routes.extend(routes);
        self.registered.insert(model.collection.clone());
        tracing::info!(model = %model.name, routes = count, "registered rest model");
        Ok(Registered::Routes { routes: count })
    }

    /// Manual registration of a model, possibly one outside the catalog.
    pub fn register_list(&mut self, model: &Arc<ModelDescriptor>) -> Result<Registered, RegistrationError> {
        self.register(model)
    }

    /// Register every catalog model with REST enabled. One model's failure never stops the others.
    pub fn discover_and_register_all(&mut self) -> RegistrationReport {
        let models: Vec<Arc<ModelDescriptor>> = self.state.catalog.models().to_vec();
        let mut report = Vec::with_capacity(models.len());
        for model in models {
            if !model.rest_enabled() {
                tracing::info!(model = %model.name, "rest not enabled, skipping");
                report.push((model.name.clone(), Ok(Registered::Disabled)));
                continue;
            }
            let result = self.register(&model);
            if let Err(e) = &result {
                tracing::warn!(model = %model.name, error = %e, "model registration failed");
            }
            report.push((model.name.clone(), result));
        }
        report
    }

    /// Hand every route to the host binder, in registration order.
    pub fn mount_routes(&self, binder: &mut dyn RouteBinder) {
        for route in &self.routes {
            binder.bind(route);
        }
        tracing::info!(routes = self.routes.len(), root = %self.settings.api_root, "mounted rest routes");
    }

    /// Axum router with every generated route and the body limit applied.
    pub fn router(&self) -> Router {
        let mut binder = AxumBinder::new(self.settings.body_limit);
        self.mount_routes(&mut binder);
        binder.into_router()
    }

    /// API Blueprint text: per model, the model block then its operations, separated by blank lines.
    pub fn render_documentation(&self) -> String {
        let mut models: Vec<Vec<&str>> = Vec::new();
        let mut current: Option<&str> = None;
        for entry in &self.docs {
            if current != Some(entry.model.as_str()) {
                models.push(Vec::new());
                current = Some(entry.model.as_str());
            }
            if let Some(last) = models.last_mut() {
                last.push(&entry.text);
            }
        }
        models
            .iter()
            .map(|blocks| blocks.join("\n\n"))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn api_docs(&self) -> String {
        self.render_documentation()
    }

    /// Documented operations of a registered model, canonical order.
    pub fn documented_operations(&self, model: &str) -> Vec<Operation> {
        self.state
            .catalog
            .get(model)
            .filter(|m| self.registered.contains(&m.collection))
            .and_then(|m| m.rest.as_ref())
            .map(|r| r.operations.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, ListConfig};
    use crate::store::MemoryStore;
    use serde_json::json;

    fn api() -> (RestApi, RegistrationReport) {
        let configs: Vec<ListConfig> = serde_json::from_value(json!([
            { "name": "User", "fields": [{ "path": "name", "type": "string" }], "rest": { "enabled": true, "operations": "list show" } },
            { "name": "Draft", "fields": [], "rest": { "enabled": false } },
            { "name": "Tag", "fields": [] },
            {
                "name": "Post",
                "fields": [
                    { "path": "title", "type": "string", "required": true },
                    { "path": "author", "type": "reference", "ref": "User" }
                ],
                "rest": { "enabled": true, "relationships": ["title"] }
            },
            { "name": "Comment", "fields": [{ "path": "body", "type": "string" }], "rest": { "enabled": true } }
        ]))
        .unwrap();
        RestApi::create_rest(
            Arc::new(resolve(&configs).unwrap()),
            Arc::new(MemoryStore::new()),
            RestSettings::default(),
        )
    }

    #[test]
    fn roots_are_normalized() {
        assert_eq!(normalize_root("api"), "/api/");
        assert_eq!(normalize_root("/v2"), "/v2/");
        assert_eq!(normalize_root(""), "/api/");
        assert_eq!(normalize_root("/"), "/");
    }

    #[test]
    fn failures_are_isolated() {
        let (api, report) = api();
        let outcome: Vec<(&str, bool)> = report.iter().map(|(m, r)| (m.as_str(), r.is_ok())).collect();
        assert_eq!(
            outcome,
            vec![("User", true), ("Draft", true), ("Tag", true), ("Post", false), ("Comment", true)]
        );
        assert!(matches!(report[3].1, Err(RegistrationError::UnknownRelationship { .. })));
        assert_eq!(report[1].1.as_ref().unwrap(), &Registered::Disabled);
        assert_eq!(report[4].1.as_ref().unwrap(), &Registered::Routes { routes: 6 });
        assert!(api.routes().iter().all(|r| r.model != "Post"));
        assert!(!api.api_docs().contains("posts"));
        assert_eq!(api.documented_operations("Comment").len(), 5);
        assert!(api.documented_operations("Post").is_empty());
    }

    #[test]
    fn bad_definitions_fail_only_their_model() {
        let configs: Vec<ListConfig> = serde_json::from_value(json!([
            { "name": "User", "fields": [{ "path": "name", "type": "string" }], "rest": { "enabled": true } },
            { "name": "Job", "fields": [], "rest": { "enabled": true, "operations": "list purge" } },
            {
                "name": "Post",
                "fields": [{ "path": "owner", "type": "reference", "ref": "Ghost" }],
                "rest": { "enabled": true }
            },
            { "name": "Note", "fields": [], "rest": { "enabled": false, "operations": "purge" } }
        ]))
        .unwrap();
        let catalog = resolve(&configs).unwrap();
        let (api, report) = RestApi::create_rest(Arc::new(catalog), Arc::new(MemoryStore::new()), RestSettings::default());

        assert_eq!(report[0].1.as_ref().unwrap(), &Registered::Routes { routes: 6 });
        assert!(matches!(
            &report[1].1,
            Err(RegistrationError::UnknownOperation { model, operation }) if model == "Job" && operation == "purge"
        ));
        assert!(matches!(
            &report[2].1,
            Err(RegistrationError::UnknownReference { target, .. }) if target == "Ghost"
        ));
        assert_eq!(report[3].1.as_ref().unwrap(), &Registered::Disabled);
        assert!(api.routes().iter().all(|r| r.model == "User"));
        assert!(api.api_docs().starts_with("# Endpoint for users"));
        assert!(!api.api_docs().contains("jobs"));
    }

    #[test]
    fn registration_is_idempotent() {
        let (mut api, _) = api();
        let routes = api.routes().len();
        let docs = api.api_docs();
        let user = api.state().catalog.get("User").unwrap().clone();
        assert_eq!(api.register(&user).unwrap(), Registered::AlreadyRegistered);
        assert_eq!(api.register_list(&user).unwrap(), Registered::AlreadyRegistered);
        assert_eq!(api.routes().len(), routes);
        assert_eq!(api.api_docs(), docs);
        assert_eq!(docs.matches("# Endpoint for users").count(), 1);
    }

    #[test]
    fn route_collisions_are_rejected() {
        let (mut api, _) = api();
        let mut clash = (**api.state().catalog.get("Comment").unwrap()).clone();
        clash.name = "Remark".into();
        clash.collection = "Comments".into();
        let err = api.register(&Arc::new(clash)).unwrap_err();
        assert!(matches!(err, RegistrationError::RouteConflict { method: "GET", .. }));
    }

    #[test]
    fn documentation_order() {
        let (api, _) = api();
        let docs = api.api_docs();
        let users = docs.find("# Endpoint for users").unwrap();
        let list = docs.find("## List all users").unwrap();
        let show = docs.find("## Retrieve users").unwrap();
        let comments = docs.find("# Endpoint for comments").unwrap();
        assert!(users < list && list < show && show < comments);
        assert!(docs.starts_with("# Endpoint for users [/api/users]"));
        assert!(docs.contains("(application/json)\n\n# Endpoint for comments"));
    }
}
