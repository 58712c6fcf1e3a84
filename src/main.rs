use anyhow::Context;
use clap::Parser;
use std::fs::File;
use std::path::Path;
use tracing::error;

use raidtally::api::WclClient;
use raidtally::args::Args;
use raidtally::bosses::{self, BossRegistry};
use raidtally::error::Error;
use raidtally::guild;
use raidtally::model::{DateRange, Metric, SummaryRequest};
use raidtally::pipeline::{self, SummaryOutcome};
use raidtally::{table, utils};

fn build_request(
    args: &Args,
    client: &WclClient,
    registry: &BossRegistry,
) -> anyhow::Result<SummaryRequest> {
    let guild_input = args.guild.as_deref().context("--guild is required")?;
    let from = args.from.context("--from is required")?;
    let to = args.to.context("--to is required")?;
    let boss_input = args.boss.as_deref().context("--boss is required")?;

    let guild_id = guild::parse_guild_id(guild_input)?;
    let range = DateRange::new(from, to)?;

    let (boss_name, entry) = registry.find_boss(boss_input).with_context(|| {
        format!("boss '{boss_input}' is not in the registry; edit bosses.json or pass --bosses")
    })?;

    let ability_name = match args.ability {
        Some(id) => bosses::ability_label(client, registry, id),
        None => "All abilities".to_string(),
    };

    Ok(SummaryRequest {
        guild_id,
        range,
        boss_id: entry.id,
        boss_name: boss_name.to_string(),
        ability_id: args.ability,
        ability_name,
        difficulty: args.difficulty,
        wipes_only: !args.include_kills,
        metric: if args.damage_taken {
            Metric::DamageTaken
        } else {
            Metric::Deaths
        },
    })
}

fn print_outcome(outcome: &SummaryOutcome, request: &SummaryRequest, output: &Path) {
    println!("\n--- {} / {} ---", request.boss_name, request.ability_name);
    println!(
        "Date range: {} to {}",
        request.range.start, request.range.end
    );
    println!("Reports processed: {}", outcome.reports_processed);
    println!("Distinct players: {}", outcome.distinct_players);
    println!(
        "Total counted: {}",
        utils::format_number(outcome.table.total())
    );
    println!("CSV written to {}", output.display());
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    utils::setup_logging(args.verbose);
    utils::validate_args(&args)?;

    if args.init_bosses {
        bosses::init_default_registry()?;
        return Ok(());
    }

    let registry = bosses::load_registry(args.bosses.as_deref())?;
    let client = WclClient::from_env()?;
    let request = build_request(&args, &client, &registry)?;

    match pipeline::summarize(&client, &request) {
        Ok(outcome) => {
            let file = File::create(&args.output)
                .with_context(|| format!("could not create {}", args.output.display()))?;
            table::write_csv(&outcome.table, file)?;
            print_outcome(&outcome, &request, &args.output);
            Ok(())
        }
        Err(Error::NoData) => {
            println!(
                "No reports with {} encounters found for guild {} between {} and {}.",
                request.boss_name, request.guild_id, request.range.start, request.range.end
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Run failed");
            match &e {
                Error::Auth(_) => eprintln!(
                    "Authentication failed: {e}. Check WCL_CLIENT_ID / WCL_CLIENT_SECRET and try again."
                ),
                Error::Fetch {
                    retryable: true, ..
                } => eprintln!("The log provider is unavailable right now: {e}. Retry in a moment."),
                _ => eprintln!("Error: {e}"),
            }
            std::process::exit(1);
        }
    }
}
