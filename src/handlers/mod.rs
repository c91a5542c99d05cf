//! HTTP handlers for generated REST routes.

pub mod rest;
pub use rest::*;
