//! Joining the three initial fetches into one form.
//!
//! A session waits on the template list, the policy, and the policy's validation info.  They
//! arrive in any order.  [`Hydration`] takes each as it arrives, re-runs the forward transform
//! whenever both the templates and the policy are known, and reports ready once all three have
//! settled.  Creating a policy settles the policy and validation info up front as absent.

use crate::{transform, FormError, FormStore, Inputs, Policy, PolicyTemplate};

/// One input of the join.
#[derive(Clone, Debug)]
enum Slot<T> {
    Pending,
    Settled(T),
}

impl<T> Slot<T> {
    fn get(&self) -> Option<&T> {
        match self {
            Slot::Pending => None,
            Slot::Settled(t) => Some(t),
        }
    }

    fn is_settled(&self) -> bool {
        matches!(self, Slot::Settled(_))
    }

    fn take(self) -> Option<T> {
        match self {
            Slot::Pending => None,
            Slot::Settled(t) => Some(t),
        }
    }
}

/// Everything a session needs once loading finishes.
#[derive(Clone, Debug)]
pub struct Loaded {
    /// Every template, as fetched.
    pub templates: Vec<PolicyTemplate>,
    /// The policy being edited; `None` when creating.
    pub policy: Option<Policy>,
    /// Server-side validation details for the policy, if any.
    pub validate_info: Option<serde_json::Value>,
    /// The form, seeded from the policy.
    pub form: FormStore,
}

/// The join over templates, policy and validation info.
#[derive(Clone, Debug)]
pub struct Hydration {
    templates: Slot<Vec<PolicyTemplate>>,
    policy: Slot<Option<Policy>>,
    validate_info: Slot<Option<serde_json::Value>>,
    inputs: Option<Inputs>,
    derivations: usize,
}

impl Hydration {
    /// Wait for templates, policy and validation info.
    pub fn for_edit() -> Self {
        Self {
            templates: Slot::Pending,
            policy: Slot::Pending,
            validate_info: Slot::Pending,
            inputs: None,
            derivations: 0,
        }
    }

    /// Wait for templates only.
    pub fn for_create() -> Self {
        Self {
            policy: Slot::Settled(None),
            validate_info: Slot::Settled(None),
            ..Self::for_edit()
        }
    }

    /// The template list arrived.
    pub fn supply_templates(&mut self, templates: Vec<PolicyTemplate>) -> Result<(), FormError> {
        self.templates = Slot::Settled(templates);
        self.derive()
    }

    /// The policy arrived.
    pub fn supply_policy(&mut self, policy: Policy) -> Result<(), FormError> {
        self.policy = Slot::Settled(Some(policy));
        self.derive()
    }

    /// The validation info arrived.
    pub fn supply_validate_info(&mut self, info: serde_json::Value) {
        self.validate_info = Slot::Settled(Some(info));
    }

    /// True once all three inputs have settled and the form has been derived.
    pub fn is_ready(&self) -> bool {
        self.templates.is_settled()
            && self.policy.is_settled()
            && self.validate_info.is_settled()
            && self.inputs.is_some()
    }

    /// The inputs derived so far, if templates and policy are both known.
    pub fn inputs(&self) -> Option<&Inputs> {
        self.inputs.as_ref()
    }

    /// How many times the forward transform has run.
    pub fn derivations(&self) -> usize {
        self.derivations
    }

    /// Consume the join, returning the loaded session data if it is ready.
    pub fn finish(self) -> Result<Option<Loaded>, FormError> {
        if !self.is_ready() {
            return Ok(None);
        }
        let (Some(templates), Some(policy), Some(validate_info), Some(inputs)) = (
            self.templates.take(),
            self.policy.take(),
            self.validate_info.take(),
            self.inputs,
        ) else {
            return Ok(None);
        };
        let name = policy.as_ref().map(|p| p.name.clone()).unwrap_or_default();
        let form = FormStore::new(templates.clone(), name, inputs)?;
        Ok(Some(Loaded {
            templates,
            policy,
            validate_info,
            form,
        }))
    }

    fn derive(&mut self) -> Result<(), FormError> {
        let (Some(templates), Some(policy)) = (self.templates.get(), self.policy.get()) else {
            return Ok(());
        };
        let inputs = match policy {
            Some(policy) => transform::forward(policy, templates)?,
            None => Inputs::new(),
        };
        self.derivations += 1;
        self.inputs = Some(inputs);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Definition;

    fn templates() -> Vec<PolicyTemplate> {
        vec![PolicyTemplate::new("1", "scan", 0, &["severity", "path"])]
    }

    fn policy(template_id: &str) -> Policy {
        let serde_json::Value::Object(row) = serde_json::json!({"severity": "high", "path": "/src"}) else {
            panic!("expected object");
        };
        Policy {
            id: Some("p-1".to_string()),
            name: "prod-policy".to_string(),
            team_id: "t-1".to_string(),
            definitions: vec![Definition {
                policy_template_id: template_id.to_string(),
                rules: vec![row],
            }],
        }
    }

    #[test]
    fn policy_before_templates_defers_transform() {
        let mut h = Hydration::for_edit();
        h.supply_policy(policy("1")).unwrap();
        assert!(h.inputs().is_none());
        assert_eq!(0, h.derivations());
        h.supply_validate_info(serde_json::json!({"valid": true}));
        assert!(!h.is_ready());
        h.supply_templates(templates()).unwrap();
        assert_eq!(1, h.derivations());
        assert!(h.is_ready());
        let loaded = h.finish().unwrap().unwrap();
        assert_eq!("prod-policy", loaded.form.name());
        assert_eq!(1, loaded.form.section("scan").unwrap().len());
        assert!(!loaded.form.is_invalid("scan"));
        assert_eq!(Some(serde_json::json!({"valid": true})), loaded.validate_info);
    }

    #[test]
    fn templates_before_policy() {
        let mut h = Hydration::for_edit();
        h.supply_templates(templates()).unwrap();
        assert!(h.inputs().is_none());
        h.supply_policy(policy("1")).unwrap();
        assert_eq!(1, h.derivations());
        assert!(!h.is_ready());
        assert!(h.clone().finish().unwrap().is_none());
        h.supply_validate_info(serde_json::Value::Null);
        assert!(h.is_ready());
    }

    #[test]
    fn each_arrival_rederives() {
        let mut h = Hydration::for_edit();
        h.supply_templates(templates()).unwrap();
        h.supply_policy(policy("1")).unwrap();
        h.supply_templates(templates()).unwrap();
        assert_eq!(2, h.derivations());
    }

    #[test]
    fn unknown_template_fails_loudly() {
        let mut h = Hydration::for_edit();
        h.supply_templates(templates()).unwrap();
        assert_eq!(
            Err(FormError::unknown_template("7")),
            h.supply_policy(policy("7"))
        );
        assert!(!h.is_ready());
    }

    #[test]
    fn create_needs_only_templates() {
        let mut h = Hydration::for_create();
        assert!(!h.is_ready());
        h.supply_templates(templates()).unwrap();
        assert!(h.is_ready());
        let loaded = h.finish().unwrap().unwrap();
        assert!(loaded.policy.is_none());
        assert!(loaded.validate_info.is_none());
        assert!(loaded.form.inputs().is_empty());
        assert_eq!("", loaded.form.name());
    }
}
