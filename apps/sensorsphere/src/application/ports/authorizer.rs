//! Authorization port.

use async_trait::async_trait;

/// Object name matching every resource.
pub const OBJECT_WILDCARD: &str = "*";

/// Authorization failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizationError {
    /// The policy does not grant the request.
    #[error("{subject} not permitted to {action} to {object}")]
    Denied {
        /// Caller identity.
        subject: String,
        /// Resource being accessed.
        object: String,
        /// Attempted action.
        action: String,
    },

    /// The policy engine failed to evaluate the request.
    #[error("authorization engine error: {0}")]
    Engine(String),
}

/// Access decisions over `(subject, object, action)` triples.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Allow or deny `subject` performing `action` on `object`.
    async fn authorize(
        &self,
        subject: &str,
        object: &str,
        action: &str,
    ) -> Result<(), AuthorizationError>;
}
