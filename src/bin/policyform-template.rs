//! Fetch, create or update a policy template.
//!
//! `--show <id>` writes the stored template as JSON to stdout (or to `--json-out`) and its Rego
//! rule text to `--rego-out`.  Edit those files, then send them back with `--update <id>`.

use arrrg::CommandLine;

use policyform::{HttpCatalog, PolicyTemplate, ServiceConfig, ServiceOptions};

#[derive(Clone, Default, Debug, Eq, PartialEq, arrrg_derive::CommandLine)]
struct Args {
    #[arrrg(nested)]
    service: ServiceOptions,
    #[arrrg(optional, "Fetch the template with this id instead of uploading one.")]
    show: Option<String>,
    #[arrrg(optional, "With --show, write the template JSON to this file.")]
    json_out: Option<String>,
    #[arrrg(optional, "With --show, write the template's Rego rule text to this file.")]
    rego_out: Option<String>,
    #[arrrg(optional, "Read the template's Rego rule text from this file.")]
    rego: Option<String>,
    #[arrrg(optional, "Update the template with this id instead of creating one.")]
    update: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    policyform::init_logging();
    let (args, free) = Args::from_command_line_relaxed(
        "USAGE: policyform-template --show <TEMPLATE> [--json-out <FILE>] [--rego-out <FILE>]
       policyform-template [--rego <FILE>] [--update <TEMPLATE>] <template.json>",
    );
    let catalog = HttpCatalog::new(&ServiceConfig::resolve(&args.service));

    if let Some(template_id) = args.show.as_deref() {
        let Some(template) = catalog.get_template(template_id).await? else {
            eprintln!("no template {template_id}");
            std::process::exit(1);
        };
        let json = serde_json::to_string_pretty(&template)?;
        match args.json_out.as_deref() {
            Some(path) => std::fs::write(path, json + "\n")?,
            None => println!("{json}"),
        }
        if let Some(path) = args.rego_out.as_deref() {
            std::fs::write(path, template.rego.as_deref().unwrap_or_default())?;
        }
        return Ok(());
    }

    if free.len() != 1 {
        eprintln!("expected exactly one template file");
        std::process::exit(1);
    }
    let mut template: PolicyTemplate = serde_json::from_str(&std::fs::read_to_string(&free[0])?)?;
    if let Some(rego) = args.rego.as_deref() {
        template.rego = Some(std::fs::read_to_string(rego)?);
    }
    if template.rules.is_empty() {
        eprintln!("warning: template {} declares no rules", template.key);
    }
    let stored = match args.update.as_deref() {
        Some(template_id) => catalog.update_template(template_id, &template).await?,
        None => catalog.create_template(&template).await?,
    };
    println!("{}", serde_json::to_string_pretty(&stored)?);
    Ok(())
}
