#![deny(missing_docs)]

//! policyform: the client-side core of a policy admin page.
//!
//! A policy is a named, team-owned list of definitions.  Each definition instantiates a policy
//! template and carries rule rows: maps from the template's field names to values.  Editing a
//! policy means turning it into per-template sections of uniquely identified rows, letting the
//! user change them, validating that every row is fully filled, and turning the sections back
//! into a policy to send to the catalog.
//!
//! # Core Concepts
//!
//! - **PolicyTemplate**: Names the fields (rules) each row of a section must fill.
//! - **Policy**: The persisted shape, with a list of definitions.
//! - **Section**: The editable rows for one template, each with a stable [`RowId`].
//! - **FormStore**: The form's single source of truth, published as immutable snapshots.
//! - **PolicySession**: One create or edit page, from loading through saving or deleting.
//! - **PolicyCatalog**: The remote service a session reads from and writes to.
//!
//! # Example
//!
//! ```
//! use policyform::{transform, validation, Policy, PolicyTemplate};
//!
//! let templates = vec![PolicyTemplate::new("1", "scan", 0, &["severity", "path"])];
//! let policy: Policy = serde_json::from_value(serde_json::json!({
//!     "id": "p-1",
//!     "name": "prod",
//!     "teamId": "t-1",
//!     "definitions": [
//!         {"policyTemplateId": "1", "rules": [{"severity": "high", "path": "/src"}]}
//!     ]
//! })).unwrap();
//!
//! let inputs = transform::forward(&policy, &templates).unwrap();
//! // A complete section is not invalid.
//! assert_eq!(Ok(false), validation::validate_section("scan", &inputs, &templates));
//! let back = transform::inverse("prod", "t-1", Some("p-1"), &inputs, &templates);
//! assert_eq!(policy, back);
//! ```

mod cache;
mod catalog;
mod config;
mod errors;
mod form;
mod http;
mod hydration;
mod navigation;
mod notify;
mod policy;
mod row;
mod session;

/// Policy templates and lookups over template lists.
pub mod template;

/// Converting between the persisted policy and the form's sections.
pub mod transform;

/// Per-section completeness checks.
pub mod validation;

pub use cache::{QueryCache, ResourceKey};
pub use catalog::PolicyCatalog;
pub use config::{
    init_logging, ServiceConfig, ServiceOptions, BASE_SERVICE_URL_ENV, DEFAULT_SERVICE_URL,
    PRODUCT_SERVICE_URL_ENV,
};
pub use errors::{CatalogError, FormError, ServiceError, SessionError};
pub use form::{FieldEdit, FormState, FormStore, Inputs};
pub use http::{Cancellable, HttpCatalog};
pub use hydration::{Hydration, Loaded};
pub use navigation::{Navigation, SessionToken};
pub use notify::{ConsoleNotifier, Notification, NotificationKind, NotificationLog, Notifier};
pub use policy::{Definition, Policy, Team};
pub use row::{filled_fields, is_truthy, Row, RowId, Section};
pub use session::{Interaction, PolicySession, SessionState};
pub use template::{KeySpelling, PolicyTemplate, RuleSpec};
