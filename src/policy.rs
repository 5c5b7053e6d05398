//! The persisted policy shapes, as the policy service reads and writes them.

use crate::Row;

/// One template instantiated within a policy: the template it follows and its rule rows.
#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Definition {
    /// Id of the [`PolicyTemplate`](crate::PolicyTemplate) the rows follow.
    pub policy_template_id: String,
    /// Rule rows, one map of field name to value each.
    #[serde(default)]
    pub rules: Vec<Row>,
}

/// A named, team-owned collection of rule definitions.
///
/// `id` is absent until the catalog has created the policy.
#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// Catalog-assigned id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name.
    pub name: String,
    /// The owning team.
    pub team_id: String,
    /// Rule definitions; the form writes one per template, in template order.
    #[serde(default)]
    pub definitions: Vec<Definition>,
}

impl Policy {
    /// Total number of rule rows across every definition.
    pub fn rule_count(&self) -> usize {
        self.definitions.iter().map(|d| d.rules.len()).sum()
    }
}

/// A team that owns policies.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Team {
    /// Catalog-assigned id; absent when creating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name.
    pub name: String,
}
