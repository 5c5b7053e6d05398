//! Structural completeness checks for form sections.
//!
//! A section is complete when every row carries exactly one filled-in value per rule declared by
//! its template.  The check is coarse on purpose: one incomplete row marks the whole section
//! invalid.  Values are never inspected beyond truthiness.

use std::collections::BTreeMap;

use crate::{template, FormError, Inputs, PolicyTemplate};

/// Decide whether a section is invalid.
///
/// Returns `Ok(true)` when the count of filled-in values across the section's rows differs from
/// `rows * template.rules.len()`.  A section absent from `inputs` has zero rows and is valid.
pub fn validate_section(
    definition_key: &str,
    inputs: &Inputs,
    templates: &[PolicyTemplate],
) -> Result<bool, FormError> {
    let template = template::by_key(templates, definition_key)
        .ok_or_else(|| FormError::unknown_definition_key(definition_key))?;
    let (rows, actual) = match inputs.get(definition_key) {
        Some(section) => (section.len(), section.filled_fields()),
        None => (0, 0),
    };
    let expected = rows * template.field_count();
    Ok(actual != expected)
}

/// Validate every template's section.
pub fn validate_all(inputs: &Inputs, templates: &[PolicyTemplate]) -> BTreeMap<String, bool> {
    let mut errors = BTreeMap::new();
    for template in templates.iter() {
        // The key comes from the template list, so the lookup cannot miss.
        if let Ok(invalid) = validate_section(&template.key, inputs, templates) {
            errors.insert(template.key.clone(), invalid);
        }
    }
    errors
}

/// Keys flagged invalid in an error map, in key order.
pub fn invalid_sections(errors: &BTreeMap<String, bool>) -> Vec<String> {
    errors
        .iter()
        .filter(|(_, invalid)| **invalid)
        .map(|(key, _)| key.clone())
        .collect()
}
