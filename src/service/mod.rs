//! RestService: generic CRUD over the document store, plus body preparation and validation.

mod crud;
pub mod payload;
mod validation;
pub use crud::RestService;
pub use validation::PayloadValidator;
