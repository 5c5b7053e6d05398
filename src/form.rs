//! The policy form: name, definition sections, and per-section validity.
//!
//! [`FormStore`] owns the templates and an immutable [`FormState`] snapshot.  Every mutation
//! builds a new snapshot from the previous one, revalidates the one section it touched, and
//! bumps the revision.  Readers holding an older `Arc<FormState>` keep seeing the old state.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{template, validation, FormError, PolicyTemplate, Row, RowId, Section};

/// Form sections keyed by template key.
pub type Inputs = BTreeMap<String, Section>;

//////////////////////////////////////////// FormState /////////////////////////////////////////////

/// One snapshot of the form.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormState {
    /// The policy name as typed.
    pub name: String,
    /// Rows per template key.
    pub inputs: Inputs,
    /// True for each section that currently fails validation.
    pub errors: BTreeMap<String, bool>,
}

impl FormState {
    /// True when any section is flagged invalid.
    pub fn has_errors(&self) -> bool {
        self.errors.values().any(|invalid| *invalid)
    }
}

//////////////////////////////////////////// FieldEdit /////////////////////////////////////////////

/// A single field change, as produced by an input handler.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldEdit {
    /// Key of the template section the row belongs to.
    pub definition_key: String,
    /// The row being edited.
    pub row_id: RowId,
    /// The rule field being set.
    pub field_name: String,
    /// The new value; `null` clears the field.
    pub value: serde_json::Value,
}

impl FieldEdit {
    /// Build a FieldEdit.
    pub fn new(
        definition_key: impl Into<String>,
        row_id: RowId,
        field_name: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        Self {
            definition_key: definition_key.into(),
            row_id,
            field_name: field_name.into(),
            value: value.into(),
        }
    }
}

//////////////////////////////////////////// FormStore /////////////////////////////////////////////

/// The mutable handle to a form session.
#[derive(Clone, Debug)]
pub struct FormStore {
    templates: Arc<[PolicyTemplate]>,
    state: Arc<FormState>,
    revision: u64,
}

impl FormStore {
    /// Start a form from already-transformed inputs.
    ///
    /// Fails if `inputs` holds a key no template declares.  Existing sections are validated so
    /// that a policy loaded with incomplete rows is flagged immediately.
    pub fn new(
        templates: impl Into<Arc<[PolicyTemplate]>>,
        name: impl Into<String>,
        inputs: Inputs,
    ) -> Result<Self, FormError> {
        let templates = templates.into();
        let mut errors = BTreeMap::new();
        for key in inputs.keys() {
            errors.insert(
                key.clone(),
                validation::validate_section(key, &inputs, &templates)?,
            );
        }
        Ok(Self {
            templates,
            state: Arc::new(FormState {
                name: name.into(),
                inputs,
                errors,
            }),
            revision: 0,
        })
    }

    /// An empty form, as used when creating a policy.
    pub fn empty(templates: impl Into<Arc<[PolicyTemplate]>>) -> Self {
        Self {
            templates: templates.into(),
            state: Arc::new(FormState::default()),
            revision: 0,
        }
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<FormState> {
        Arc::clone(&self.state)
    }

    /// Incremented by every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The templates this form was built for.
    pub fn templates(&self) -> &[PolicyTemplate] {
        &self.templates
    }

    /// Templates in display order.
    pub fn sorted_templates(&self) -> Vec<&PolicyTemplate> {
        template::sorted(&self.templates)
    }

    /// The policy name.
    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// The rows of a section, if it has any.
    pub fn section(&self, definition_key: &str) -> Option<&Section> {
        self.state.inputs.get(definition_key)
    }

    /// The current inputs.
    pub fn inputs(&self) -> &Inputs {
        &self.state.inputs
    }

    /// The current error flags.
    pub fn errors(&self) -> &BTreeMap<String, bool> {
        &self.state.errors
    }

    /// Whether a section is flagged invalid.
    pub fn is_invalid(&self, definition_key: &str) -> bool {
        self.state
            .errors
            .get(definition_key)
            .copied()
            .unwrap_or(false)
    }

    /// True when any section is flagged invalid.
    pub fn has_errors(&self) -> bool {
        self.state.has_errors()
    }

    /// Replace the policy name.
    pub fn set_name(&mut self, value: impl Into<String>) {
        let mut next = (*self.state).clone();
        next.name = value.into();
        self.commit(next);
    }

    /// Set one field of one row, creating the section and row as needed.
    pub fn set_field(&mut self, edit: FieldEdit) -> Result<(), FormError> {
        self.check_key(&edit.definition_key)?;
        let mut next = (*self.state).clone();
        next.inputs
            .entry(edit.definition_key.clone())
            .or_default()
            .set(edit.row_id, edit.field_name, edit.value);
        self.revalidate(&mut next, &edit.definition_key)?;
        self.commit(next);
        Ok(())
    }

    /// Append an empty row to a section and return its id.
    pub fn add_row(&mut self, definition_key: &str) -> Result<RowId, FormError> {
        self.check_key(definition_key)?;
        let mut next = (*self.state).clone();
        let id = next
            .inputs
            .entry(definition_key.to_string())
            .or_default()
            .push(Row::new());
        self.revalidate(&mut next, definition_key)?;
        self.commit(next);
        Ok(id)
    }

    /// Remove a row.  Removing a row that does not exist changes nothing but still revalidates.
    pub fn remove_row(&mut self, definition_key: &str, row_id: &RowId) -> Result<(), FormError> {
        self.check_key(definition_key)?;
        let mut next = (*self.state).clone();
        if let Some(section) = next.inputs.get_mut(definition_key) {
            if section.remove(row_id).is_none() {
                tracing::debug!(definition_key, %row_id, "remove of missing row");
            }
        }
        self.revalidate(&mut next, definition_key)?;
        self.commit(next);
        Ok(())
    }

    /// Merge externally computed error flags, e.g. from server-side validation.
    pub fn set_error(&mut self, errors: impl IntoIterator<Item = (String, bool)>) {
        let mut next = (*self.state).clone();
        next.errors.extend(errors);
        self.commit(next);
    }

    fn check_key(&self, definition_key: &str) -> Result<(), FormError> {
        template::by_key(&self.templates, definition_key)
            .map(|_| ())
            .ok_or_else(|| FormError::unknown_definition_key(definition_key))
    }

    fn revalidate(&self, next: &mut FormState, definition_key: &str) -> Result<(), FormError> {
        let invalid = validation::validate_section(definition_key, &next.inputs, &self.templates)?;
        next.errors.insert(definition_key.to_string(), invalid);
        Ok(())
    }

    fn commit(&mut self, next: FormState) {
        self.state = Arc::new(next);
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn templates() -> Vec<PolicyTemplate> {
        vec![
            PolicyTemplate::new("1", "scan", 0, &["severity", "path"]),
            PolicyTemplate::new("2", "license", 1, &["name"]),
        ]
    }

    fn store() -> FormStore {
        FormStore::empty(templates())
    }

    #[test]
    fn scan_scenario() {
        let mut form = store();
        let row = RowId::generate();
        form.set_field(FieldEdit::new("scan", row, "severity", "high"))
            .unwrap();
        assert!(form.is_invalid("scan"));
        form.set_field(FieldEdit::new("scan", row, "path", "/src"))
            .unwrap();
        assert_eq!(Some(&false), form.errors().get("scan"));

        form.remove_row("scan", &row).unwrap();
        assert_eq!(Some(&false), form.errors().get("scan"));
        assert_eq!(0, form.section("scan").unwrap().len());

        let row = RowId::generate();
        form.set_field(FieldEdit::new("scan", row, "severity", "low"))
            .unwrap();
        assert_eq!(Some(&true), form.errors().get("scan"));
    }

    #[test]
    fn remove_missing_row_keeps_name_and_other_errors() {
        let mut form = store();
        form.set_field(FieldEdit::new("license", RowId::generate(), "name", ""))
            .unwrap();
        assert!(form.is_invalid("license"));
        form.set_name("prod-policy");
        form.remove_row("scan", &RowId::generate()).unwrap();
        assert_eq!("prod-policy", form.name());
        assert_eq!(Some(&true), form.errors().get("license"));
        assert_eq!(Some(&false), form.errors().get("scan"));
    }

    #[test]
    fn mutations_only_touch_their_section() {
        let mut form = store();
        form.set_error([("license".to_string(), true)]);
        form.set_field(FieldEdit::new("scan", RowId::generate(), "severity", "high"))
            .unwrap();
        assert_eq!(Some(&true), form.errors().get("license"));
        assert!(form.section("license").is_none());
    }

    #[test]
    fn mutations_produce_new_snapshots() {
        let mut form = store();
        let before = form.snapshot();
        let revision = form.revision();
        form.set_name("prod-policy");
        let after = form.snapshot();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!("", before.name);
        assert_eq!("prod-policy", after.name);
        assert_eq!(revision + 1, form.revision());

        let row = form.add_row("scan").unwrap();
        assert!(form.snapshot().inputs["scan"].contains(&row));
        assert!(!after.inputs.contains_key("scan"));
    }

    #[test]
    fn add_row_flags_incomplete_section() {
        let mut form = store();
        let row = form.add_row("license").unwrap();
        assert!(form.is_invalid("license"));
        form.set_field(FieldEdit::new("license", row, "name", "MIT"))
            .unwrap();
        assert!(!form.is_invalid("license"));
        assert!(!form.has_errors());
    }

    #[test]
    fn unknown_key_leaves_state_untouched() {
        let mut form = store();
        let revision = form.revision();
        assert_eq!(
            Err(FormError::unknown_definition_key("coverage")),
            form.set_field(FieldEdit::new("coverage", RowId::generate(), "minimum", 80))
        );
        assert!(form.add_row("coverage").is_err());
        assert!(form.remove_row("coverage", &RowId::generate()).is_err());
        assert_eq!(revision, form.revision());
        assert!(form.inputs().is_empty());
    }

    #[test]
    fn set_error_merges() {
        let mut form = store();
        form.set_error([("scan".to_string(), true)]);
        form.set_error([("license".to_string(), true)]);
        form.set_error([("scan".to_string(), false)]);
        assert_eq!(Some(&false), form.errors().get("scan"));
        assert_eq!(Some(&true), form.errors().get("license"));
        assert!(form.has_errors());
    }

    #[test]
    fn new_validates_loaded_sections() {
        let templates = templates();
        let mut inputs = Inputs::new();
        let mut section = Section::default();
        section.set(RowId::generate(), "severity", "high".into());
        inputs.insert("scan".to_string(), section);
        let form = FormStore::new(templates, "loaded", inputs).unwrap();
        assert!(form.is_invalid("scan"));
        assert_eq!("loaded", form.name());
    }

    #[test]
    fn new_rejects_unknown_sections() {
        let mut inputs = Inputs::new();
        inputs.insert("coverage".to_string(), Section::default());
        assert!(FormStore::new(templates(), "x", inputs).is_err());
    }

    #[test]
    fn sorted_templates_follow_order() {
        let form = store();
        let keys: Vec<&str> = form
            .sorted_templates()
            .iter()
            .map(|t| t.key.as_str())
            .collect();
        assert_eq!(vec!["scan", "license"], keys);
    }
}
