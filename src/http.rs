//! [`PolicyCatalog`] over HTTP.

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};

use crate::{
    template, CatalogError, Policy, PolicyCatalog, PolicyTemplate, ResourceKey, ServiceConfig,
    ServiceError, Team,
};

/// A policy catalog reached over HTTP.
#[derive(Clone, Debug)]
pub struct HttpCatalog {
    client: Client,
    policy_url: String,
    users_url: String,
}

impl HttpCatalog {
    /// A catalog using a default client.
    pub fn new(config: &ServiceConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    /// A catalog using the provided client.
    pub fn with_client(client: Client, config: &ServiceConfig) -> Self {
        Self {
            client,
            policy_url: config.policy_url(),
            users_url: config.users_url(),
        }
    }

    /// The URL of a policy service resource.
    pub fn url(&self, key: &ResourceKey) -> String {
        format!("{}{key}", self.policy_url)
    }

    /// Policies owned by a team.
    pub async fn list_team_policies(&self, team_id: &str) -> Result<Vec<Policy>, CatalogError> {
        let url = format!("{}/policies", self.policy_url);
        decode(execute(self.client.get(url).query(&[("teamId", team_id)])).await?)
    }

    /// The policy overview across all teams.
    pub async fn policy_overview(&self) -> Result<serde_json::Value, CatalogError> {
        self.get(&ResourceKey::PolicyOverview).await
    }

    /// Insights for one team, or the overview when `team_id` is `None`.
    pub async fn insights(&self, team_id: Option<&str>) -> Result<serde_json::Value, CatalogError> {
        self.get_filtered("insights", team_id).await
    }

    /// Violations for one team, or the overview when `team_id` is `None`.
    pub async fn violations(
        &self,
        team_id: Option<&str>,
    ) -> Result<serde_json::Value, CatalogError> {
        self.get_filtered("violations", team_id).await
    }

    /// Every team.
    pub async fn list_teams(&self) -> Result<Vec<Team>, CatalogError> {
        self.get(&ResourceKey::Teams).await
    }

    /// Create a team.
    pub async fn create_team(&self, team: &Team) -> Result<Team, CatalogError> {
        let req = with_json(self.client.post(self.url(&ResourceKey::Teams)), team)?;
        decode(execute(req).await?)
    }

    /// Create a team on a background task that can be cancelled.
    ///
    /// Must be called from within a tokio runtime.
    pub fn create_team_cancellable(&self, team: &Team) -> Result<Cancellable<Team>, CatalogError> {
        let req = with_json(self.client.post(self.url(&ResourceKey::Teams)), team)?;
        let handle = tokio::spawn(async move { decode(execute(req).await?) });
        Ok(Cancellable { handle })
    }

    /// Create a template.
    pub async fn create_template(
        &self,
        template: &PolicyTemplate,
    ) -> Result<PolicyTemplate, CatalogError> {
        let req = with_json(self.client.post(self.url(&ResourceKey::Templates)), template)?;
        decode_or(execute(req).await?, template)
    }

    /// One template by id, looked up in the template list.
    pub async fn get_template(
        &self,
        template_id: &str,
    ) -> Result<Option<PolicyTemplate>, CatalogError> {
        let templates = self.list_templates().await?;
        Ok(template::by_id(&templates, template_id).cloned())
    }

    /// Update a template.
    pub async fn update_template(
        &self,
        template_id: &str,
        template: &PolicyTemplate,
    ) -> Result<PolicyTemplate, CatalogError> {
        let url = format!("{}/templates/{template_id}", self.policy_url);
        let req = with_json(self.client.patch(url), template)?;
        decode_or(execute(req).await?, template)
    }

    /// The signed-in user's profile from the users service.
    pub async fn user_profile(&self) -> Result<serde_json::Value, CatalogError> {
        let url = format!("{}/profile", self.users_url);
        decode(execute(self.client.get(url)).await?)
    }

    /// Platform navigation from the users service.
    pub async fn navigation(&self) -> Result<serde_json::Value, CatalogError> {
        let url = format!("{}/navigation", self.users_url);
        decode(execute(self.client.get(url)).await?)
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        key: &ResourceKey,
    ) -> Result<T, CatalogError> {
        decode(execute(self.client.get(self.url(key))).await?)
    }

    async fn get_filtered(
        &self,
        what: &str,
        team_id: Option<&str>,
    ) -> Result<serde_json::Value, CatalogError> {
        let url = format!("{}/policies/{what}", self.policy_url);
        let mut req = self.client.get(url);
        if let Some(team_id) = team_id {
            req = req.query(&[("teamId", team_id)]);
        }
        decode(execute(req).await?)
    }
}

impl PolicyCatalog for HttpCatalog {
    async fn list_templates(&self) -> Result<Vec<PolicyTemplate>, CatalogError> {
        self.get(&ResourceKey::Templates).await
    }

    async fn get_policy(&self, policy_id: &str) -> Result<Policy, CatalogError> {
        self.get(&ResourceKey::Policy(policy_id.to_string())).await
    }

    async fn get_validate_info(
        &self,
        policy_id: &str,
    ) -> Result<serde_json::Value, CatalogError> {
        self.get(&ResourceKey::ValidateInfo(policy_id.to_string()))
            .await
    }

    async fn update_policy(&self, policy_id: &str, policy: &Policy) -> Result<(), CatalogError> {
        let url = self.url(&ResourceKey::Policy(policy_id.to_string()));
        execute(with_json(self.client.patch(url), policy)?).await?;
        Ok(())
    }

    async fn delete_policy(&self, policy_id: &str) -> Result<(), CatalogError> {
        let url = self.url(&ResourceKey::Policy(policy_id.to_string()));
        execute(self.client.delete(url)).await?;
        Ok(())
    }

    async fn create_policy(&self, policy: &Policy) -> Result<Policy, CatalogError> {
        let req = with_json(self.client.post(self.url(&ResourceKey::PolicyOverview)), policy)?;
        decode_or(execute(req).await?, policy)
    }
}

/////////////////////////////////////////// Cancellable ////////////////////////////////////////////

/// A request running on its own task.
#[derive(Debug)]
pub struct Cancellable<T> {
    handle: tokio::task::JoinHandle<Result<T, CatalogError>>,
}

impl<T> Cancellable<T> {
    /// Abort the request.  Waiting afterwards yields [`CatalogError::Cancelled`].
    pub fn cancel(&self) {
        tracing::debug!("request cancelled");
        self.handle.abort();
    }

    /// Wait for the request to finish.
    pub async fn wait(self) -> Result<T, CatalogError> {
        match self.handle.await {
            Ok(result) => result,
            Err(err) if err.is_cancelled() => Err(CatalogError::Cancelled),
            Err(err) => std::panic::resume_unwind(err.into_panic()),
        }
    }
}

///////////////////////////////////////////// helpers //////////////////////////////////////////////

fn with_json<B: serde::Serialize>(req: RequestBuilder, body: &B) -> Result<RequestBuilder, CatalogError> {
    Ok(req
        .header(CONTENT_TYPE, "application/json")
        .body(serde_json::to_vec(body)?))
}

async fn execute(req: RequestBuilder) -> Result<Vec<u8>, CatalogError> {
    let resp = req.header(ACCEPT, "application/json").send().await?;
    let status = resp.status();
    let url = resp.url().clone();
    let body = resp.bytes().await?;
    if status.is_success() {
        tracing::debug!(%url, %status, "catalog request succeeded");
        return Ok(body.to_vec());
    }
    let err = service_error(status, &body);
    tracing::warn!(%url, %status, message = %err.message, "catalog request failed");
    Err(CatalogError::Service(err))
}

fn service_error(status: reqwest::StatusCode, body: &[u8]) -> ServiceError {
    let mut err: ServiceError = serde_json::from_slice(body).unwrap_or_default();
    if err.status == 0 {
        err.status = status.as_u16();
    }
    if err.error.is_empty() {
        err.error = status.canonical_reason().unwrap_or("Error").to_string();
    }
    if err.message.is_empty() {
        err.message = String::from_utf8_lossy(body).trim().to_string();
    }
    err
}

fn decode<T: serde::de::DeserializeOwned>(body: Vec<u8>) -> Result<T, CatalogError> {
    Ok(serde_json::from_slice(&body)?)
}

fn decode_or<T: serde::de::DeserializeOwned + Clone>(
    body: Vec<u8>,
    fallback: &T,
) -> Result<T, CatalogError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        Ok(fallback.clone())
    } else {
        decode(body)
    }
}
