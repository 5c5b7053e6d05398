//! Print the policies of a team, or of every team, with optional violations and insights.

use arrrg::CommandLine;

use policyform::{HttpCatalog, Policy, ServiceConfig, ServiceOptions};

#[derive(Clone, Default, Debug, Eq, PartialEq, arrrg_derive::CommandLine)]
struct Args {
    #[arrrg(nested)]
    service: ServiceOptions,
    #[arrrg(optional, "Only show this team's policies")]
    team: Option<String>,
    #[arrrg(flag, "Also print policy violations")]
    violations: bool,
    #[arrrg(flag, "Also print policy insights")]
    insights: bool,
    #[arrrg(flag, "List teams instead of policies")]
    teams: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    policyform::init_logging();
    let (args, free) = Args::from_command_line_relaxed(
        "USAGE: policyform-overview [--team <TEAM>] [--violations] [--insights] [--teams]",
    );
    if !free.is_empty() {
        eprintln!("unexpected arguments: {free:?}");
        std::process::exit(1);
    }
    let config = ServiceConfig::resolve(&args.service);
    let catalog = HttpCatalog::new(&config);

    if args.teams {
        let teams = catalog.list_teams().await?;
        println!("Teams ({})", teams.len());
        for team in teams {
            println!("  {} {}", team.id.as_deref().unwrap_or("-"), team.name);
        }
        return Ok(());
    }

    let policies: Vec<Policy> = match args.team.as_deref() {
        Some(team_id) => catalog.list_team_policies(team_id).await?,
        None => serde_json::from_value(catalog.policy_overview().await?)?,
    };
    if policies.is_empty() {
        println!("No policies found. Go forth and create one or two why don't you?");
    } else {
        println!("Policies ({})", policies.len());
        for policy in policies.iter() {
            println!(
                "  {} {} (team {}, {} rules)",
                policy.id.as_deref().unwrap_or("-"),
                policy.name,
                policy.team_id,
                policy.rule_count()
            );
        }
    }

    if args.violations {
        let violations = catalog.violations(args.team.as_deref()).await?;
        println!("Violations:\n{}", serde_json::to_string_pretty(&violations)?);
    }
    if args.insights {
        let insights = catalog.insights(args.team.as_deref()).await?;
        println!("Insights:\n{}", serde_json::to_string_pretty(&insights)?);
    }
    Ok(())
}
