use std::fs::OpenOptions;
use std::io::{BufRead, BufReader};

use arrrg::CommandLine;

use policyform::{transform, validation, Policy, PolicyTemplate};

#[derive(Clone, Default, Debug, Eq, PartialEq, arrrg_derive::CommandLine)]
struct Args {
    #[arrrg(required, "JSON file holding the template list.")]
    templates: String,
    #[arrrg(flag, "Print every incomplete section")]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    policyform::init_logging();
    let (args, free) = Args::from_command_line_relaxed(
        "USAGE: policyform-verify-policies --templates <FILE> <policies.jsonl> [policies.jsonl...]",
    );
    let templates: Vec<PolicyTemplate> =
        serde_json::from_str(&std::fs::read_to_string(&args.templates)?)?;

    let mut verified = 0u64;
    let mut incomplete = 0u64;
    let mut rejected = 0u64;
    for file in free.iter() {
        let file = OpenOptions::new().read(true).open(file)?;
        let file = BufReader::new(file);
        for line in file.lines() {
            let line = line?;
            let policy: Policy = match serde_json::from_str(&line) {
                Ok(policy) => policy,
                Err(err) => {
                    eprintln!("error parsing policy {line}: {err}");
                    rejected += 1;
                    continue;
                }
            };
            let inputs = match transform::forward(&policy, &templates) {
                Ok(inputs) => inputs,
                Err(err) => {
                    eprintln!("policy {:?}: {err}", policy.name);
                    rejected += 1;
                    continue;
                }
            };
            let invalid =
                validation::invalid_sections(&validation::validate_all(&inputs, &templates));
            if !invalid.is_empty() {
                incomplete += 1;
                if args.verbose {
                    eprintln!("policy {:?}: incomplete {}", policy.name, invalid.join(", "));
                }
            }
            verified += 1;
        }
    }
    eprintln!("verified {verified} policies; {incomplete} incomplete; {rejected} rejected");
    Ok(())
}
