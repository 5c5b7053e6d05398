//! The policy catalog contract.
//!
//! A [`PolicyCatalog`] is the backend that owns templates and policies.  The session only needs
//! the operations below; [`crate::HttpCatalog`] implements them over HTTP and adds the overview,
//! team and template operations the command-line tools use.

use crate::{CatalogError, Policy, PolicyTemplate};

/// The operations a policy session performs against the backend.
#[allow(async_fn_in_trait)]
pub trait PolicyCatalog {
    /// Every template, in the order the service returns them.
    async fn list_templates(&self) -> Result<Vec<PolicyTemplate>, CatalogError>;

    /// One policy by id.
    async fn get_policy(&self, policy_id: &str) -> Result<Policy, CatalogError>;

    /// Validation info for a policy.  The payload is opaque to this crate.
    async fn get_validate_info(&self, policy_id: &str)
        -> Result<serde_json::Value, CatalogError>;

    /// Replace a policy.
    async fn update_policy(&self, policy_id: &str, policy: &Policy) -> Result<(), CatalogError>;

    /// Delete a policy.
    async fn delete_policy(&self, policy_id: &str) -> Result<(), CatalogError>;

    /// Create a policy and return it as stored.
    async fn create_policy(&self, policy: &Policy) -> Result<Policy, CatalogError>;
}
