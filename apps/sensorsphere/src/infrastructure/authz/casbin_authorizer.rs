use std::path::Path;

use async_trait::async_trait;
use casbin::{CoreApi, DefaultModel, Enforcer, FileAdapter};
use tracing::instrument;

use crate::application::ports::{AuthorizationError, Authorizer};

/// Casbin enforcer loaded from a model file and a CSV policy file.
///
/// Requests are evaluated as `(subject, object, action)`; the model decides
/// how wildcards and roles apply.
pub struct CasbinAuthorizer {
    enforcer: Enforcer,
}

impl std::fmt::Debug for CasbinAuthorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CasbinAuthorizer").finish_non_exhaustive()
    }
}

impl CasbinAuthorizer {
    /// Load the model and policy files.
    #[instrument(skip_all, fields(model = %model_file.as_ref().display(), policy = %policy_file.as_ref().display()))]
    pub async fn from_files(
        model_file: impl AsRef<Path>,
        policy_file: impl AsRef<Path>,
    ) -> Result<Self, AuthorizationError> {
        let model = DefaultModel::from_file(model_file.as_ref())
            .await
            .map_err(|e| AuthorizationError::Engine(format!("failed to load model: {e}")))?;
        let adapter = FileAdapter::new(policy_file.as_ref().to_path_buf());
        let enforcer = Enforcer::new(model, adapter)
            .await
            .map_err(|e| AuthorizationError::Engine(format!("failed to create enforcer: {e}")))?;

        tracing::info!("ACL policy loaded");
        Ok(Self { enforcer })
    }
}

#[async_trait]
impl Authorizer for CasbinAuthorizer {
    async fn authorize(
        &self,
        subject: &str,
        object: &str,
        action: &str,
    ) -> Result<(), AuthorizationError> {
        let allowed = self
            .enforcer
            .enforce((subject, object, action))
            .map_err(|e| AuthorizationError::Engine(e.to_string()))?;

        if allowed {
            Ok(())
        } else {
            Err(AuthorizationError::Denied {
                subject: subject.to_string(),
                object: object.to_string(),
                action: action.to_string(),
            })
        }
    }
}
