#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use policyform::{
    CatalogError, Definition, Navigation, NotificationLog, Notifier, Policy, PolicyCatalog,
    PolicyTemplate, QueryCache, Row, ServiceError,
};

/// Everything the fake catalog knows and everything it was asked to do.
#[derive(Debug, Default)]
pub struct State {
    pub templates: Vec<PolicyTemplate>,
    pub policies: HashMap<String, Policy>,
    pub validate_info: serde_json::Value,
    pub failures: HashMap<&'static str, ServiceError>,
    pub calls: HashMap<&'static str, usize>,
    pub updated: Vec<(String, Policy)>,
    pub created: Vec<Policy>,
    pub deleted: Vec<String>,
    pub leave_on: Option<(&'static str, Navigation)>,
    pub next_id: usize,
}

/// An in-memory catalog with failure injection.
#[derive(Debug, Default)]
pub struct FakeCatalog {
    state: Mutex<State>,
}

impl FakeCatalog {
    pub fn new(templates: Vec<PolicyTemplate>, policies: Vec<Policy>) -> Self {
        let policies = policies
            .into_iter()
            .filter_map(|p| p.id.clone().map(|id| (id, p)))
            .collect();
        Self {
            state: Mutex::new(State {
                templates,
                policies,
                validate_info: serde_json::json!({"valid": true, "violations": []}),
                next_id: 2,
                ..State::default()
            }),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Make `op` fail with `err` until healed.
    pub fn fail(&self, op: &'static str, err: ServiceError) {
        self.state().failures.insert(op, err);
    }

    pub fn heal(&self, op: &'static str) {
        self.state().failures.remove(op);
    }

    pub fn calls(&self, op: &'static str) -> usize {
        self.state().calls.get(op).copied().unwrap_or(0)
    }

    /// Simulate the user entering another page while `op` is in flight.
    pub fn leave_during(&self, op: &'static str, navigation: &Navigation) {
        self.state().leave_on = Some((op, navigation.clone()));
    }

    async fn begin(&self, op: &'static str) -> Result<(), CatalogError> {
        tokio::task::yield_now().await;
        let mut state = self.state();
        *state.calls.entry(op).or_default() += 1;
        if let Some((leave_op, navigation)) = state.leave_on.as_ref() {
            if *leave_op == op {
                navigation.enter();
            }
        }
        match state.failures.get(op) {
            Some(err) => Err(CatalogError::Service(err.clone())),
            None => Ok(()),
        }
    }
}

impl PolicyCatalog for FakeCatalog {
    async fn list_templates(&self) -> Result<Vec<PolicyTemplate>, CatalogError> {
        self.begin("list_templates").await?;
        Ok(self.state().templates.clone())
    }

    async fn get_policy(&self, policy_id: &str) -> Result<Policy, CatalogError> {
        self.begin("get_policy").await?;
        self.state()
            .policies
            .get(policy_id)
            .cloned()
            .ok_or_else(|| CatalogError::Service(not_found(policy_id)))
    }

    async fn get_validate_info(
        &self,
        _policy_id: &str,
    ) -> Result<serde_json::Value, CatalogError> {
        self.begin("get_validate_info").await?;
        Ok(self.state().validate_info.clone())
    }

    async fn update_policy(&self, policy_id: &str, policy: &Policy) -> Result<(), CatalogError> {
        self.begin("update_policy").await?;
        let mut state = self.state();
        state.policies.insert(policy_id.to_string(), policy.clone());
        state.updated.push((policy_id.to_string(), policy.clone()));
        Ok(())
    }

    async fn delete_policy(&self, policy_id: &str) -> Result<(), CatalogError> {
        self.begin("delete_policy").await?;
        let mut state = self.state();
        state.policies.remove(policy_id);
        state.deleted.push(policy_id.to_string());
        Ok(())
    }

    async fn create_policy(&self, policy: &Policy) -> Result<Policy, CatalogError> {
        self.begin("create_policy").await?;
        let mut state = self.state();
        let id = format!("p-{}", state.next_id);
        state.next_id += 1;
        let mut stored = policy.clone();
        stored.id = Some(id.clone());
        state.created.push(policy.clone());
        state.policies.insert(id, stored.clone());
        Ok(stored)
    }
}

pub fn not_found(policy_id: &str) -> ServiceError {
    ServiceError::new(404, "Not Found", format!("no policy {policy_id}"))
}

pub fn server_error() -> ServiceError {
    ServiceError::new(500, "Internal Server Error", "boom")
}

pub fn templates() -> Vec<PolicyTemplate> {
    vec![
        PolicyTemplate::new("1", "scan", 1, &["severity", "path"]),
        PolicyTemplate::new("2", "license", 0, &["name"]),
    ]
}

pub fn row(value: serde_json::Value) -> Row {
    match value {
        serde_json::Value::Object(row) => row,
        _ => panic!("rows must be objects"),
    }
}

pub fn policy() -> Policy {
    Policy {
        id: Some("p-1".to_string()),
        name: "prod-policy".to_string(),
        team_id: "t-1".to_string(),
        definitions: vec![
            Definition {
                policy_template_id: "1".to_string(),
                rules: vec![row(serde_json::json!({"severity": "high", "path": "/src"}))],
            },
            Definition {
                policy_template_id: "2".to_string(),
                rules: vec![row(serde_json::json!({"name": "MIT"}))],
            },
        ],
    }
}

/// Shared wiring for one test.
pub struct Harness {
    pub catalog: Arc<FakeCatalog>,
    pub cache: Arc<QueryCache>,
    pub log: Arc<NotificationLog>,
    pub navigation: Navigation,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            catalog: Arc::new(FakeCatalog::new(templates(), vec![policy()])),
            cache: Arc::new(QueryCache::default()),
            log: Arc::new(NotificationLog::default()),
            navigation: Navigation::default(),
        }
    }

    pub fn notifier(&self) -> Arc<dyn Notifier> {
        Arc::clone(&self.log) as Arc<dyn Notifier>
    }
}
