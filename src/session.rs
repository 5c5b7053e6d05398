//! The lifecycle of one create or edit page.
//!
//! ```text
//! Loading --all fetches ok--> Ready --save/delete--> Saving --done--> Ready
//!    |                                                  (failure keeps the edits)
//!    +--any fetch fails--> Failed
//! ```
//!
//! A session is tied to a [`SessionToken`].  When the user navigates elsewhere the token stops
//! being current, and responses that arrive afterwards are discarded instead of applied.
//! Dropping the session invalidates its token and evicts its policy from the cache.

use std::sync::Arc;

use crate::{
    transform, validation, CatalogError, FormStore, Hydration, Loaded, Navigation, Notification,
    Notifier, Policy, PolicyCatalog, PolicyTemplate, QueryCache, ResourceKey, SessionError,
    SessionToken,
};

/////////////////////////////////////////// Interaction ////////////////////////////////////////////

/// What the page is doing.
#[derive(Clone, Debug, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum Interaction {
    /// Creating a new policy for a team.
    Create { team_id: String },
    /// Editing an existing policy.
    Edit { team_id: String, policy_id: String },
}

impl Interaction {
    /// The owning team.
    pub fn team_id(&self) -> &str {
        match self {
            Interaction::Create { team_id } => team_id,
            Interaction::Edit { team_id, .. } => team_id,
        }
    }

    /// The policy being edited, if any.
    pub fn policy_id(&self) -> Option<&str> {
        match self {
            Interaction::Create { .. } => None,
            Interaction::Edit { policy_id, .. } => Some(policy_id),
        }
    }
}

/////////////////////////////////////////// SessionState ///////////////////////////////////////////

/// Where a session is in its lifecycle.
#[derive(Clone, Debug, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum SessionState {
    /// Waiting on the initial fetches.
    Loading,
    /// Loaded and editable.
    Ready,
    /// A write is in flight; the form is read-only.
    Saving,
    /// Loading failed.  Terminal.
    Failed { reason: String },
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Loading => write!(f, "loading"),
            SessionState::Ready => write!(f, "ready"),
            SessionState::Saving => write!(f, "saving"),
            SessionState::Failed { reason } => write!(f, "failed ({reason})"),
        }
    }
}

/////////////////////////////////////////// PolicySession //////////////////////////////////////////

/// One create or edit page.
pub struct PolicySession<C: PolicyCatalog> {
    catalog: Arc<C>,
    cache: Arc<QueryCache>,
    notifier: Arc<dyn Notifier>,
    interaction: Interaction,
    token: SessionToken,
    state: SessionState,
    loaded: Option<Loaded>,
}

impl<C: PolicyCatalog> PolicySession<C> {
    /// Enter a page.  Any session opened earlier on `navigation` is superseded.
    pub fn open(
        catalog: Arc<C>,
        cache: Arc<QueryCache>,
        notifier: Arc<dyn Notifier>,
        navigation: &Navigation,
        interaction: Interaction,
    ) -> Self {
        Self {
            catalog,
            cache,
            notifier,
            interaction,
            token: navigation.enter(),
            state: SessionState::Loading,
            loaded: None,
        }
    }

    /// The lifecycle state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// What this page is doing.
    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    /// True until the user navigates away.
    pub fn is_current(&self) -> bool {
        self.token.is_current()
    }

    /// The form, once loaded.
    pub fn form(&self) -> Option<&FormStore> {
        self.loaded.as_ref().map(|l| &l.form)
    }

    /// The form for editing.  `None` unless the session is ready.
    pub fn form_mut(&mut self) -> Option<&mut FormStore> {
        if self.state != SessionState::Ready {
            return None;
        }
        self.loaded.as_mut().map(|l| &mut l.form)
    }

    /// The policy as last fetched or saved.
    pub fn policy(&self) -> Option<&Policy> {
        self.loaded.as_ref().and_then(|l| l.policy.as_ref())
    }

    /// The templates, once loaded.
    pub fn templates(&self) -> &[PolicyTemplate] {
        self.loaded
            .as_ref()
            .map(|l| l.templates.as_slice())
            .unwrap_or_default()
    }

    /// The validation info, for pages that edit an existing policy.
    pub fn validate_info(&self) -> Option<&serde_json::Value> {
        self.loaded.as_ref().and_then(|l| l.validate_info.as_ref())
    }

    /// Where to go once the page is done: the owning team.
    pub fn back_path(&self) -> String {
        format!("/teams/{}", self.interaction.team_id())
    }

    /// Fetch templates (and, when editing, the policy and its validation info).
    ///
    /// The fetches run concurrently.  The session becomes ready only when all of them succeed;
    /// the first failure moves it to [`SessionState::Failed`] without building a form.
    pub async fn load(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Loading {
            return Err(SessionError::Unsupported {
                operation: "reloading a loaded session".to_string(),
            });
        }
        let result = self.fetch_all().await;
        if !self.token.is_current() {
            tracing::debug!(interaction = ?self.interaction, "discarding load for a page that was left");
            return Err(SessionError::Superseded);
        }
        match result {
            Ok(loaded) => {
                tracing::info!(
                    policy_id = self.interaction.policy_id().unwrap_or("<new>"),
                    templates = loaded.templates.len(),
                    "policy session ready"
                );
                self.loaded = Some(loaded);
                self.state = SessionState::Ready;
                Ok(())
            }
            Err(SessionError::Superseded) => Err(SessionError::Superseded),
            Err(err) => {
                tracing::warn!(error = %err, "policy session failed to load");
                self.state = SessionState::Failed {
                    reason: err.to_string(),
                };
                self.notifier.notify(Notification::error(
                    "Something's Wrong",
                    "Request to load the policy failed",
                ));
                Err(err)
            }
        }
    }

    /// Persist the form: update when editing, create when creating.
    ///
    /// Returns the path to navigate to.  Invalid sections refuse the save without a request.  A
    /// failed request notifies the user and returns to ready with the edits intact, so the save
    /// can be retried.
    pub async fn save(&mut self) -> Result<String, SessionError> {
        self.ensure_ready()?;
        let Some(loaded) = self.loaded.as_ref() else {
            return Err(self.not_ready());
        };
        let invalid = validation::invalid_sections(loaded.form.errors());
        if !invalid.is_empty() {
            self.notifier.notify(Notification::error(
                "Something's Wrong",
                "Every row needs a value for each field",
            ));
            return Err(SessionError::Invalid { sections: invalid });
        }
        let form = &loaded.form;
        let policy = transform::inverse(
            form.name(),
            self.interaction.team_id(),
            self.interaction.policy_id(),
            form.inputs(),
            form.templates(),
        );

        self.state = SessionState::Saving;
        let result = match &self.interaction {
            Interaction::Edit { policy_id, .. } => self
                .catalog
                .update_policy(policy_id, &policy)
                .await
                .map(|()| policy.clone()),
            Interaction::Create { .. } => self.catalog.create_policy(&policy).await,
        };
        // The write landed whether or not the page is still open.
        if result.is_ok() {
            self.invalidate_after_write();
        }
        if !self.token.is_current() {
            return Err(SessionError::Superseded);
        }
        self.state = SessionState::Ready;

        let creating = matches!(self.interaction, Interaction::Create { .. });
        match result {
            Ok(saved) => {
                if creating {
                    self.notifier.notify(Notification::success(
                        "Policy Created",
                        "Policy successfully created",
                    ));
                    if let Some(policy_id) = saved.id.clone() {
                        self.interaction = Interaction::Edit {
                            team_id: self.interaction.team_id().to_string(),
                            policy_id,
                        };
                    }
                } else {
                    self.notifier.notify(Notification::success(
                        "Policy Updated",
                        "Policy successfully updated",
                    ));
                }
                tracing::info!(policy_id = saved.id.as_deref().unwrap_or("<unknown>"), "policy saved");
                if let Some(loaded) = self.loaded.as_mut() {
                    loaded.policy = Some(saved);
                }
                Ok(self.back_path())
            }
            Err(err) => {
                tracing::warn!(error = %err, "policy save failed");
                let action = if creating { "create" } else { "update" };
                self.notifier.notify(Notification::error(
                    "Something's Wrong",
                    format!("Request to {action} policy failed"),
                ));
                Err(err.into())
            }
        }
    }

    /// Delete the policy being edited.  Returns the path to navigate to.
    pub async fn delete(&mut self) -> Result<String, SessionError> {
        self.ensure_ready()?;
        let Some(policy_id) = self.interaction.policy_id().map(str::to_string) else {
            return Err(SessionError::Unsupported {
                operation: "deleting an unsaved policy".to_string(),
            });
        };
        let name = self
            .policy()
            .map(|p| p.name.clone())
            .unwrap_or_else(|| policy_id.clone());

        self.state = SessionState::Saving;
        let result = self.catalog.delete_policy(&policy_id).await;
        if result.is_ok() {
            self.invalidate_after_write();
            self.cache.remove(&ResourceKey::Policy(policy_id.clone()));
        }
        if !self.token.is_current() {
            return Err(SessionError::Superseded);
        }
        self.state = SessionState::Ready;

        match result {
            Ok(()) => {
                tracing::info!(policy_id = %policy_id, "policy deleted");
                self.notifier.notify(Notification::success(
                    "Policy deleted",
                    format!("Policy {name} successfully deleted"),
                ));
                Ok(self.back_path())
            }
            Err(err) => {
                tracing::warn!(policy_id = %policy_id, error = %err, "policy delete failed");
                self.notifier.notify(delete_failure(&err));
                Err(err.into())
            }
        }
    }

    /// Leave the page.
    pub fn close(self) {}

    async fn fetch_all(&self) -> Result<Loaded, SessionError> {
        let catalog = &*self.catalog;
        let cache = &*self.cache;
        let policy_id = self.interaction.policy_id();
        let mut hydration = match policy_id {
            Some(_) => Hydration::for_edit(),
            None => Hydration::for_create(),
        };

        let mut templates = std::pin::pin!(
            cache.get_or_fetch(ResourceKey::Templates, || catalog.list_templates())
        );
        let mut policy = std::pin::pin!(async {
            match policy_id {
                Some(id) => cache
                    .get_or_fetch(ResourceKey::Policy(id.to_string()), || {
                        catalog.get_policy(id)
                    })
                    .await
                    .map(Some),
                None => Ok(None),
            }
        });
        let mut info = std::pin::pin!(async {
            match policy_id {
                Some(id) => cache
                    .get_or_fetch(ResourceKey::ValidateInfo(id.to_string()), || {
                        catalog.get_validate_info(id)
                    })
                    .await
                    .map(Some),
                None => Ok(None),
            }
        });
        let (mut templates_done, mut policy_done, mut info_done) = (false, false, false);

        while !(templates_done && policy_done && info_done) {
            let arrival: Result<(), SessionError> = tokio::select! {
                res = &mut templates, if !templates_done => {
                    templates_done = true;
                    match res {
                        Ok(t) => hydration.supply_templates(t).map_err(SessionError::from),
                        Err(err) => Err(SessionError::from(err)),
                    }
                }
                res = &mut policy, if !policy_done => {
                    policy_done = true;
                    match res {
                        Ok(Some(p)) => hydration.supply_policy(p).map_err(SessionError::from),
                        Ok(None) => Ok(()),
                        Err(err) => Err(SessionError::from(err)),
                    }
                }
                res = &mut info, if !info_done => {
                    info_done = true;
                    match res {
                        Ok(Some(i)) => {
                            hydration.supply_validate_info(i);
                            Ok(())
                        }
                        Ok(None) => Ok(()),
                        Err(err) => Err(SessionError::from(err)),
                    }
                }
            };
            if !self.token.is_current() {
                return Err(SessionError::Superseded);
            }
            arrival?;
        }

        hydration.finish()?.ok_or_else(|| self.not_ready())
    }

    fn ensure_ready(&self) -> Result<(), SessionError> {
        if self.state == SessionState::Ready {
            Ok(())
        } else {
            Err(self.not_ready())
        }
    }

    fn not_ready(&self) -> SessionError {
        SessionError::NotReady {
            state: self.state.to_string(),
        }
    }

    fn invalidate_after_write(&self) {
        self.cache.invalidate(&ResourceKey::Templates);
        self.cache.invalidate(&ResourceKey::PolicyOverview);
        self.cache.invalidate(&ResourceKey::TeamPolicies(
            self.interaction.team_id().to_string(),
        ));
        if let Some(policy_id) = self.interaction.policy_id() {
            self.cache
                .invalidate(&ResourceKey::Policy(policy_id.to_string()));
            self.cache
                .invalidate(&ResourceKey::ValidateInfo(policy_id.to_string()));
        }
    }
}

impl<C: PolicyCatalog> Drop for PolicySession<C> {
    fn drop(&mut self) {
        self.token.invalidate();
        if let Some(policy_id) = self.interaction.policy_id() {
            self.cache.remove(&ResourceKey::Policy(policy_id.to_string()));
        }
    }
}

impl<C: PolicyCatalog> std::fmt::Debug for PolicySession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicySession")
            .field("interaction", &self.interaction)
            .field("state", &self.state)
            .field("current", &self.token.is_current())
            .finish()
    }
}

fn delete_failure(err: &CatalogError) -> Notification {
    match err.service_error() {
        Some(service) => Notification::error(service.title(), service.message.clone()),
        None => Notification::error("Something's Wrong", "Request to delete policy failed"),
    }
}
