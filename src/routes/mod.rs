//! Generated REST routes and the host-facing binder.

mod common;
mod descriptor;
mod mount;
pub mod synth;

pub use common::{common_routes, common_routes_with_docs};
pub use descriptor::{HandlerFuture, RouteDescriptor, RouteHandler, RouteMethod};
pub use mount::{AxumBinder, RouteBinder, DEFAULT_BODY_LIMIT};
