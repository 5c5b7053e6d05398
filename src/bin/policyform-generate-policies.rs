//! Generate random policies against a template list.
//!
//! Reads a JSON array of templates on stdin and writes one policy per line.  With `--gaps`, some
//! rows leave fields empty so that the output exercises incomplete sections.

use std::io::Read;

use arrrg::CommandLine;
use guacamole::combinators::*;
use guacamole::Guacamole;

use policyform::{Definition, Policy, PolicyTemplate, Row};

#[derive(Clone, Default, Debug, Eq, PartialEq, arrrg_derive::CommandLine)]
struct Args {
    #[arrrg(optional, "Number of policies to generate (default 1000)")]
    count: Option<usize>,
    #[arrrg(optional, "Seed for the generator (default 0)")]
    seed: Option<u64>,
    #[arrrg(optional, "Team id to assign (default team-0)")]
    team: Option<String>,
    #[arrrg(flag, "Leave some fields empty")]
    gaps: bool,
}

const VALUES: &[&str] = &["high", "medium", "low", "/src", "/test", "MIT", "Apache-2.0", "80"];

fn generate_row(guac: &mut Guacamole, template: &PolicyTemplate, index: usize, gaps: bool) -> Row {
    let mut row = Row::new();
    for (field, rule) in template.rules.iter().enumerate() {
        if gaps && coin()(guac) && coin()(guac) {
            continue;
        }
        let value = match (index + field) % 3 {
            0 => serde_json::Value::from(index),
            1 => serde_json::Value::Bool(true),
            _ => serde_json::Value::from(VALUES[range_to(VALUES.len())(guac)]),
        };
        row.insert(rule.key.clone(), value);
    }
    row
}

fn generate_policy(
    guac: &mut Guacamole,
    templates: &[PolicyTemplate],
    team_id: &str,
    index: usize,
    gaps: bool,
) -> Policy {
    let mut definitions = vec![];
    for template in templates.iter() {
        if !coin()(guac) {
            continue;
        }
        let rows = range_to(4usize)(guac);
        definitions.push(Definition {
            policy_template_id: template.id.clone(),
            rules: (0..rows)
                .map(|row| generate_row(guac, template, index + row, gaps))
                .collect(),
        });
    }
    Policy {
        id: Some(format!("policy-{index}")),
        name: format!("generated policy {index}"),
        team_id: team_id.to_string(),
        definitions,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    policyform::init_logging();
    let (args, free) = Args::from_command_line_relaxed(
        "USAGE: policyform-generate-policies [--count N] [--seed N] [--gaps] < templates.json",
    );
    if !free.is_empty() {
        eprintln!("unexpected arguments: {free:?}");
        std::process::exit(1);
    }
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf)?;
    let templates: Vec<PolicyTemplate> = serde_json::from_str(&buf)?;
    if templates.is_empty() {
        eprintln!("no templates on stdin");
        std::process::exit(1);
    }
    let team_id = args.team.clone().unwrap_or_else(|| "team-0".to_string());
    let mut guac = Guacamole::new(args.seed.unwrap_or(0));
    for index in 0..args.count.unwrap_or(1_000) {
        let policy = generate_policy(&mut guac, &templates, &team_id, index, args.gaps);
        println!("{}", serde_json::to_string(&policy)?);
    }
    Ok(())
}
