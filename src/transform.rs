//! Conversion between a catalog [`Policy`] and the row-keyed form inputs.
//!
//! The two directions are not inverses of each other.  Row ids are generated on the way in and
//! discarded on the way out, `null` values are dropped on the way out, and every template gets a
//! definition on the way out whether or not the policy had one.

use crate::{template, Definition, FormError, Inputs, Policy, PolicyTemplate, Row};

/// Turn a policy's definitions into form inputs keyed by template key.
///
/// Every rule object becomes a row under a freshly generated id.  A definition whose template is
/// unknown fails the whole conversion; dropping it would delete the definition on the next save.
pub fn forward(policy: &Policy, templates: &[PolicyTemplate]) -> Result<Inputs, FormError> {
    let mut inputs = Inputs::new();
    for definition in policy.definitions.iter() {
        let template = template::by_id(templates, &definition.policy_template_id)
            .ok_or_else(|| FormError::unknown_template(&definition.policy_template_id))?;
        let section = inputs.entry(template.key.clone()).or_default();
        for rule in definition.rules.iter() {
            section.push(rule.clone());
        }
    }
    Ok(inputs)
}

/// Build the policy to persist from the form.
///
/// Emits one definition per template, in template order, with that section's rows in row order.
/// Templates without rows still get a definition with empty rules.
pub fn inverse(
    name: &str,
    team_id: &str,
    policy_id: Option<&str>,
    inputs: &Inputs,
    templates: &[PolicyTemplate],
) -> Policy {
    let definitions = templates
        .iter()
        .map(|template| Definition {
            policy_template_id: template.id.clone(),
            rules: inputs
                .get(&template.key)
                .map(|section| section.iter().map(|(_, row)| strip_nulls(row)).collect())
                .unwrap_or_default(),
        })
        .collect();
    Policy {
        id: policy_id.map(str::to_string),
        name: name.to_string(),
        team_id: team_id.to_string(),
        definitions,
    }
}

fn strip_nulls(row: &Row) -> Row {
    row.iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use guacamole::combinators::*;
    use guacamole::Guacamole;

    use super::*;

    fn templates() -> Vec<PolicyTemplate> {
        vec![
            PolicyTemplate::new("1", "scan", 1, &["severity", "path"]),
            PolicyTemplate::new("2", "license", 0, &["name"]),
            PolicyTemplate::new("3", "coverage", 2, &["minimum"]),
        ]
    }

    fn row(value: serde_json::Value) -> Row {
        let serde_json::Value::Object(row) = value else {
            panic!("rows must be objects");
        };
        row
    }

    fn policy() -> Policy {
        Policy {
            id: Some("p-1".to_string()),
            name: "prod-policy".to_string(),
            team_id: "t-1".to_string(),
            definitions: vec![
                Definition {
                    policy_template_id: "1".to_string(),
                    rules: vec![
                        row(serde_json::json! {{"severity": "high", "path": "/src"}}),
                        row(serde_json::json! {{"severity": "low", "path": "/test"}}),
                    ],
                },
                Definition {
                    policy_template_id: "2".to_string(),
                    rules: vec![row(serde_json::json! {{"name": "MIT"}})],
                },
            ],
        }
    }

    #[test]
    fn forward_partitions_rows_by_key() {
        let inputs = forward(&policy(), &templates()).unwrap();
        assert_eq!(2, inputs.len());
        assert_eq!(2, inputs["scan"].len());
        assert_eq!(1, inputs["license"].len());
        assert!(!inputs.contains_key("coverage"));
    }

    #[test]
    fn forward_keeps_row_order() {
        let inputs = forward(&policy(), &templates()).unwrap();
        let paths: Vec<&serde_json::Value> = inputs["scan"]
            .iter()
            .map(|(_, row)| &row["path"])
            .collect();
        assert_eq!(
            vec![&serde_json::json!("/src"), &serde_json::json!("/test")],
            paths
        );
    }

    #[test]
    fn forward_rejects_unknown_template() {
        let mut policy = policy();
        policy.definitions.push(Definition {
            policy_template_id: "99".to_string(),
            rules: vec![],
        });
        assert_eq!(
            Err(FormError::unknown_template("99")),
            forward(&policy, &templates())
        );
    }

    #[test]
    fn forward_merges_repeated_templates() {
        let mut policy = policy();
        policy.definitions.push(Definition {
            policy_template_id: "2".to_string(),
            rules: vec![row(serde_json::json! {{"name": "Apache-2.0"}})],
        });
        let inputs = forward(&policy, &templates()).unwrap();
        assert_eq!(2, inputs["license"].len());
    }

    #[test]
    fn inverse_emits_every_template() {
        let templates = templates();
        let inputs = forward(&policy(), &templates).unwrap();
        let out = inverse("prod-policy", "t-1", Some("p-1"), &inputs, &templates);
        assert_eq!(templates.len(), out.definitions.len());
        let ids: Vec<&str> = out
            .definitions
            .iter()
            .map(|d| d.policy_template_id.as_str())
            .collect();
        assert_eq!(vec!["1", "2", "3"], ids);
        assert!(out.definitions[2].rules.is_empty());
        assert_eq!(Some("p-1".to_string()), out.id);
        assert_eq!("t-1", out.team_id);
    }

    #[test]
    fn round_trip_is_lossy() {
        let templates = templates();
        let mut original = policy();
        original.definitions[1]
            .rules
            .push(row(serde_json::json! {{"name": null}}));
        let inputs = forward(&original, &templates).unwrap();
        let out = inverse(&original.name, &original.team_id, None, &inputs, &templates);
        assert_ne!(original, out);
        // The null field collapsed to an absent key; the row itself survived.
        assert_eq!(2, out.definitions[1].rules.len());
        assert!(out.definitions[1].rules[1].is_empty());
        // The rows that were complete come back unchanged.
        assert_eq!(original.definitions[0].rules, out.definitions[0].rules);
        assert_eq!(None, out.id);
    }

    #[test]
    fn random_policies_preserve_row_counts() {
        let templates = templates();
        let mut guac = Guacamole::new(0);
        for _ in 0..100 {
            let mut policy = Policy::default();
            let definitions = range_to(6usize)(&mut guac);
            for _ in 0..definitions {
                let template = &templates[range_to(templates.len())(&mut guac)];
                let rows = range_to(4usize)(&mut guac);
                let mut rules = vec![];
                for _ in 0..rows {
                    let mut r = Row::new();
                    for rule in template.rules.iter() {
                        if coin()(&mut guac) {
                            r.insert(rule.key.clone(), "x".into());
                        }
                    }
                    rules.push(r);
                }
                policy.definitions.push(Definition {
                    policy_template_id: template.id.clone(),
                    rules,
                });
            }
            let inputs = forward(&policy, &templates).unwrap();
            let rows: usize = inputs.values().map(|s| s.len()).sum();
            assert_eq!(policy.rule_count(), rows);
            let out = inverse("n", "t", None, &inputs, &templates);
            assert_eq!(templates.len(), out.definitions.len());
            assert_eq!(policy.rule_count(), out.rule_count());
        }
    }
}
