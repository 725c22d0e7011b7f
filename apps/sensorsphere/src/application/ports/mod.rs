//! Port Interfaces
//!
//! Contracts the gateway consumes from external collaborators. Adapters in
//! the infrastructure layer implement them.
//!
//! - `Database`: sensor and reading storage with a nearest-neighbor query
//! - `Authorizer`: `(subject, object, action)` access decisions

mod authorizer;
mod database;

pub use authorizer::{AuthorizationError, Authorizer, OBJECT_WILDCARD};
pub use database::{Database, StorageError};

#[cfg(test)]
pub use authorizer::MockAuthorizer;
#[cfg(test)]
pub use database::MockDatabase;
