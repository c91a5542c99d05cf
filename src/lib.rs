//! model-rest: REST routes, queries and API Blueprint docs generated from model definitions.

pub mod config;
pub mod docs;
pub mod error;
pub mod fields;
pub mod handlers;
pub mod middleware;
pub mod query;
pub mod registry;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use config::{
    load_catalog, load_from_path, resolve, ListConfig, ModelCatalog, ModelDescriptor, Operation,
};
pub use error::{ConfigError, RegistrationError, RestError, StoreError};
pub use middleware::Middleware;
pub use registry::{RegistrationReport, Registered, RestApi, RestSettings, DEFAULT_API_ROOT};
pub use response::RestResponse;
pub use routes::{common_routes, common_routes_with_docs, AxumBinder, RouteBinder, RouteDescriptor, RouteMethod};
pub use service::RestService;
pub use state::{ModelContext, RestState};
pub use store::{ensure_database_exists, DocumentStore, MemoryStore, PgDocumentStore};
