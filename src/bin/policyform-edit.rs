//! Create or edit one team policy from the terminal.
//!
//! Loads the templates (and the policy, when `--policy` is given), then reads commands until the
//! policy is saved, deleted, or the user quits.  Rows are addressed by their 1-based position
//! within a section.

use std::sync::Arc;

use arrrg::CommandLine;
use rustyline::error::ReadlineError;

use policyform::{
    ConsoleNotifier, FieldEdit, FormError, FormStore, HttpCatalog, Interaction, Navigation,
    Notifier, PolicySession, QueryCache, ServiceConfig, ServiceOptions,
};

#[derive(Clone, Default, Debug, Eq, PartialEq, arrrg_derive::CommandLine)]
struct Args {
    #[arrrg(nested)]
    service: ServiceOptions,
    #[arrrg(required, "Team that owns the policy.")]
    team: String,
    #[arrrg(optional, "Policy to edit; omit to create a new policy.")]
    policy: Option<String>,
}

const HELP: &str = "\
commands:
  show                               print the form
  name <text>                        rename the policy
  add <section>                      append an empty row
  set <section> <row> <field> <value> set a field; value is JSON or bare text
  rm <section> <row>                 remove a row
  save                               create or update the policy
  delete                             delete the policy
  quit                               leave without saving";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    policyform::init_logging();
    let (args, free) =
        Args::from_command_line_relaxed("USAGE: policyform-edit --team <TEAM> [--policy <POLICY>]");
    if !free.is_empty() {
        eprintln!("unexpected arguments: {free:?}");
        std::process::exit(1);
    }
    let team_id = args.team.clone();

    let config = ServiceConfig::resolve(&args.service);
    let catalog = Arc::new(HttpCatalog::new(&config));
    let cache = Arc::new(QueryCache::default());
    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);
    let navigation = Navigation::default();
    let interaction = match args.policy.clone() {
        Some(policy_id) => Interaction::Edit { team_id, policy_id },
        None => Interaction::Create { team_id },
    };

    let mut session = PolicySession::open(catalog, cache, notifier, &navigation, interaction);
    if let Err(err) = session.load().await {
        eprintln!("could not load policy: {err}");
        std::process::exit(1);
    }
    if let Some(form) = session.form() {
        show(form);
    }

    let mut rl = rustyline::DefaultEditor::new()?;
    loop {
        let line = match rl.readline("policy> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line);
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            ["quit"] | ["exit"] => break,
            ["help"] => println!("{HELP}"),
            ["show"] => {
                if let Some(form) = session.form() {
                    show(form);
                }
            }
            ["save"] => match session.save().await {
                Ok(path) => {
                    println!("saved; back to {path}");
                    break;
                }
                Err(err) => eprintln!("{err}"),
            },
            ["delete"] => match session.delete().await {
                Ok(path) => {
                    println!("deleted; back to {path}");
                    break;
                }
                Err(err) => eprintln!("{err}"),
            },
            words => {
                let state = session.state().to_string();
                let Some(form) = session.form_mut() else {
                    eprintln!("the form is not editable while {state}");
                    continue;
                };
                if let Err(err) = edit(form, words) {
                    eprintln!("{err}");
                }
            }
        }
    }
    session.close();
    Ok(())
}

fn edit(form: &mut FormStore, words: &[&str]) -> Result<(), String> {
    match words {
        ["name", rest @ ..] => {
            form.set_name(rest.join(" "));
            Ok(())
        }
        ["add", key] => {
            let id = form.add_row(key).map_err(form_error)?;
            println!("added row {} to {key}", id.short());
            Ok(())
        }
        ["set", key, row, field, value @ ..] if !value.is_empty() => {
            let row_id = row_at(form, key, row)?;
            let text = value.join(" ");
            let value = serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text));
            form.set_field(FieldEdit::new(*key, row_id, *field, value))
                .map_err(form_error)
        }
        ["rm", key, row] => {
            let row_id = row_at(form, key, row)?;
            form.remove_row(key, &row_id).map_err(form_error)
        }
        _ => Err("unknown command; try help".to_string()),
    }
}

fn row_at(form: &FormStore, key: &str, position: &str) -> Result<policyform::RowId, String> {
    let position: usize = position
        .parse()
        .map_err(|_| format!("{position:?} is not a row number"))?;
    form.section(key)
        .and_then(|section| section.row_id(position))
        .ok_or_else(|| format!("{key} has no row {position}"))
}

fn form_error(err: FormError) -> String {
    err.to_string()
}

fn show(form: &FormStore) {
    let name = if form.name().is_empty() {
        "<unnamed>"
    } else {
        form.name()
    };
    println!("policy: {name}");
    for template in form.sorted_templates() {
        let marker = if form.is_invalid(&template.key) {
            " (incomplete)"
        } else {
            ""
        };
        println!("[{}] {}{marker}", template.key, template.display_name());
        let Some(section) = form.section(&template.key) else {
            continue;
        };
        for (index, (_, row)) in section.iter().enumerate() {
            let cells: Vec<String> = template
                .rules
                .iter()
                .map(|rule| match row.get(&rule.key) {
                    Some(value) => format!("{}={value}", rule.key),
                    None => format!("{}=", rule.key),
                })
                .collect();
            println!("  {}. {}", index + 1, cells.join(" "));
        }
    }
}
