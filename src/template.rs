//! Policy templates: the schema of one category of rule.
//!
//! A [`PolicyTemplate`] describes a definition section of the policy form.  Its `rules` declare
//! which fields each row of that section must fill in; the number of rules is the number of
//! non-empty values a complete row carries.

/// Which name a rule's field key was read under.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum KeySpelling {
    /// `"key"`.
    #[default]
    Key,
    /// `"field"`, as older templates write it.
    Field,
}

/// One declared field of a template's rows.
///
/// Rules serialize under the spelling they were read with, and keys this client does not model
/// are kept in `extra`.
#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(try_from = "RawRuleSpec", into = "RawRuleSpec")]
pub struct RuleSpec {
    /// The field name rows use for this rule.
    pub key: String,
    /// Display label for the field.
    pub label: Option<String>,
    /// Input type hint (e.g. "text", "select").
    pub kind: Option<String>,
    /// Whether `key` came from `"key"` or `"field"`.
    pub spelling: KeySpelling,
    /// Keys not modelled above.
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RuleSpec {
    /// A rule for the named field with no label or type hint.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }
}

#[derive(serde::Deserialize, serde::Serialize)]
struct RawRuleSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl TryFrom<RawRuleSpec> for RuleSpec {
    type Error = String;

    fn try_from(raw: RawRuleSpec) -> Result<Self, Self::Error> {
        let mut extra = raw.extra;
        let (key, spelling) = match (raw.key, raw.field) {
            (Some(key), field) => {
                // Both spellings present: "key" wins and "field" rides along untouched.
                if let Some(field) = field {
                    extra.insert("field".to_string(), serde_json::Value::String(field));
                }
                (key, KeySpelling::Key)
            }
            (None, Some(field)) => (field, KeySpelling::Field),
            (None, None) => return Err("rule has neither \"key\" nor \"field\"".to_string()),
        };
        Ok(Self {
            key,
            label: raw.label,
            kind: raw.kind,
            spelling,
            extra,
        })
    }
}

impl From<RuleSpec> for RawRuleSpec {
    fn from(rule: RuleSpec) -> Self {
        let mut extra = rule.extra;
        let (key, field) = match rule.spelling {
            KeySpelling::Key => match extra.remove("field") {
                Some(serde_json::Value::String(field)) => (Some(rule.key), Some(field)),
                Some(other) => {
                    extra.insert("field".to_string(), other);
                    (Some(rule.key), None)
                }
                None => (Some(rule.key), None),
            },
            KeySpelling::Field => (None, Some(rule.key)),
        };
        Self {
            key,
            field,
            label: rule.label,
            kind: rule.kind,
            extra,
        }
    }
}

/// A template for one definition section of a policy.
///
/// Templates are fetched from the catalog once per session and never mutated while a policy is
/// being edited.  Keys this client does not model are kept in `extra` so that updating a
/// template does not strip them.
#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyTemplate {
    /// Opaque identifier, referenced by `Definition::policy_template_id`.
    #[serde(default)]
    pub id: String,
    /// Stable section key, unique across templates.
    pub key: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Longer description shown under the section title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Sort position of the section.
    #[serde(default)]
    pub order: i64,
    /// The fields every row of this section must fill in.
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
    /// Rule text in the Rego policy language.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rego: Option<String>,
    /// Free-form labels.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    /// Keys not modelled above.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PolicyTemplate {
    /// A template with the given identity and rule fields.
    pub fn new(id: impl Into<String>, key: impl Into<String>, order: i64, rules: &[&str]) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            order,
            rules: rules.iter().map(|r| RuleSpec::new(*r)).collect(),
            ..Default::default()
        }
    }

    /// The number of non-empty values a complete row of this section carries.
    pub fn field_count(&self) -> usize {
        self.rules.len()
    }

    /// The name to show for this section, falling back to its key.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.key)
    }
}

/// Find the template with the given id.
pub fn by_id<'a>(templates: &'a [PolicyTemplate], id: &str) -> Option<&'a PolicyTemplate> {
    templates.iter().find(|t| t.id == id)
}

/// Find the template with the given section key.
pub fn by_key<'a>(templates: &'a [PolicyTemplate], key: &str) -> Option<&'a PolicyTemplate> {
    templates.iter().find(|t| t.key == key)
}

/// Templates in display order: by `order`, ties broken by key.
pub fn sorted(templates: &[PolicyTemplate]) -> Vec<&PolicyTemplate> {
    let mut sorted: Vec<&PolicyTemplate> = templates.iter().collect();
    sorted.sort_by(|lhs, rhs| lhs.order.cmp(&rhs.order).then_with(|| lhs.key.cmp(&rhs.key)));
    sorted
}
