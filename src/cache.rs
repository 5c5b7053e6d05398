//! A request cache keyed by logical resource.
//!
//! Reads go through [`QueryCache::get_or_fetch`].  After a successful write the caller
//! invalidates the resources it touched; an invalidated entry is kept but is refetched on the
//! next read.  [`QueryCache::remove`] evicts an entry outright, which is what closing a session
//! does for the policy it was editing.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use crate::CatalogError;

/////////////////////////////////////////// ResourceKey ////////////////////////////////////////////

/// A cacheable catalog resource.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum ResourceKey {
    /// The template list.
    Templates,
    /// One policy.
    Policy(String),
    /// Validation info for one policy.
    ValidateInfo(String),
    /// The policies of one team.
    TeamPolicies(String),
    /// The policy overview across teams.
    PolicyOverview,
    /// The team list.
    Teams,
    /// Insights for a team, or the overview when `None`.
    Insights(Option<String>),
    /// Violations for a team, or the overview when `None`.
    Violations(Option<String>),
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKey::Templates => write!(f, "/templates"),
            ResourceKey::Policy(id) => write!(f, "/policies/{id}"),
            ResourceKey::ValidateInfo(id) => write!(f, "/validate/info/{id}"),
            ResourceKey::TeamPolicies(team) => write!(f, "/policies?teamId={team}"),
            ResourceKey::PolicyOverview => write!(f, "/policies"),
            ResourceKey::Teams => write!(f, "/teams"),
            ResourceKey::Insights(Some(team)) => write!(f, "/policies/insights?teamId={team}"),
            ResourceKey::Insights(None) => write!(f, "/policies/insights"),
            ResourceKey::Violations(Some(team)) => {
                write!(f, "/policies/violations?teamId={team}")
            }
            ResourceKey::Violations(None) => write!(f, "/policies/violations"),
        }
    }
}

//////////////////////////////////////////// QueryCache ////////////////////////////////////////////

#[derive(Clone, Debug)]
struct Entry {
    value: serde_json::Value,
    stale: bool,
}

/// Cached catalog reads.
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: Mutex<HashMap<ResourceKey, Entry>>,
}

impl QueryCache {
    /// Return the cached value for `key`, or run `fetch` and cache what it returns.
    ///
    /// Stale entries are refetched.  A failed fetch leaves any previous entry in place.
    pub async fn get_or_fetch<T, F, Fut>(&self, key: ResourceKey, fetch: F) -> Result<T, CatalogError>
    where
        T: serde::Serialize + serde::de::DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CatalogError>>,
    {
        if let Some(value) = self.fresh(&key) {
            match serde_json::from_value(value) {
                Ok(hit) => {
                    tracing::trace!(%key, "cache hit");
                    return Ok(hit);
                }
                Err(err) => {
                    tracing::warn!(%key, error = %err, "cached value has the wrong shape; refetching");
                }
            }
        }
        tracing::debug!(%key, "fetching");
        let fetched = fetch().await?;
        let value = serde_json::to_value(&fetched)?;
        self.lock().insert(key, Entry { value, stale: false });
        Ok(fetched)
    }

    /// Mark an entry stale so the next read refetches it.
    pub fn invalidate(&self, key: &ResourceKey) {
        if let Some(entry) = self.lock().get_mut(key) {
            tracing::debug!(%key, "invalidated");
            entry.stale = true;
        }
    }

    /// Mark every entry matching `pred` stale.
    pub fn invalidate_where(&self, pred: impl Fn(&ResourceKey) -> bool) {
        for (key, entry) in self.lock().iter_mut() {
            if pred(key) {
                tracing::debug!(%key, "invalidated");
                entry.stale = true;
            }
        }
    }

    /// Evict an entry.
    pub fn remove(&self, key: &ResourceKey) {
        if self.lock().remove(key).is_some() {
            tracing::debug!(%key, "evicted");
        }
    }

    /// True when `key` has an entry that is not stale.
    pub fn is_fresh(&self, key: &ResourceKey) -> bool {
        self.lock().get(key).map(|e| !e.stale).unwrap_or(false)
    }

    /// True when `key` has an entry, stale or not.
    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.lock().contains_key(key)
    }

    fn fresh(&self, key: &ResourceKey) -> Option<serde_json::Value> {
        self.lock()
            .get(key)
            .filter(|e| !e.stale)
            .map(|e| e.value.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ResourceKey, Entry>> {
        // The map is never left half-updated, so a poisoned lock is still usable.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
