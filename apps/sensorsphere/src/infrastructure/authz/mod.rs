//! Authorization adapters implementing the `Authorizer` port.
//!
//! - `CasbinAuthorizer`: model and policy files evaluated by casbin
//! - `AllowAllAuthorizer`: permits every request, used when no ACL is configured

mod casbin_authorizer;

use async_trait::async_trait;

use crate::application::ports::{AuthorizationError, Authorizer};

pub use casbin_authorizer::CasbinAuthorizer;

/// Authorizer that grants every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllAuthorizer;

#[async_trait]
impl Authorizer for AllowAllAuthorizer {
    async fn authorize(
        &self,
        _subject: &str,
        _object: &str,
        _action: &str,
    ) -> Result<(), AuthorizationError> {
        Ok(())
    }
}
