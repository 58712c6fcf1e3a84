use std::time::Instant;
use tracing::info;

use crate::api::WclClient;
use crate::damage;
use crate::deaths;
use crate::error::Result;
use crate::model::{Metric, PlayerTally, SelectedReport, SummaryRequest};
use crate::reports;
use crate::table::{self, SummaryTable};

/// Everything the caller gets back from one run: the table plus the
/// summary counts shown to the operator.
#[derive(Debug)]
pub struct SummaryOutcome {
    pub table: SummaryTable,
    pub reports_processed: usize,
    pub distinct_players: usize,
}

/// Run the three stages in sequence: locate one report per day, tally the
/// metric per player for each, merge into the wide table. Fails fast on
/// the first error; there is no partial output.
pub fn summarize(client: &WclClient, request: &SummaryRequest) -> Result<SummaryOutcome> {
    let started = Instant::now();
    info!(
        action = "start",
        component = "pipeline",
        guild_id = request.guild_id,
        boss = %request.boss_name,
        ability = %request.ability_name,
        "Starting summary"
    );

    let selected = reports::locate_reports(client, request)?;
    let filter = request.fight_filter();

    let mut per_report: Vec<(SelectedReport, PlayerTally)> = Vec::with_capacity(selected.len());
    for report in selected {
        info!(
            action = "process",
            component = "pipeline",
            code = %report.code,
            date = %report.date,
            title = %report.title,
            "Processing report"
        );

        let tally = match request.metric {
            Metric::Deaths => {
                deaths::extract_deaths(client, &report, &filter, request.ability_id)?
            }
            Metric::DamageTaken => {
                damage::extract_damage_taken(client, &report, &filter, request.ability_id)?
            }
        };
        per_report.push((report, tally));
    }

    let table = table::build_table(&request.boss_name, &request.ability_name, &per_report);

    let outcome = SummaryOutcome {
        reports_processed: per_report.len(),
        distinct_players: table.players.len(),
        table,
    };

    info!(
        action = "complete",
        component = "pipeline",
        reports = outcome.reports_processed,
        players = outcome.distinct_players,
        duration_ms = started.elapsed().as_millis(),
        "Summary complete"
    );
    Ok(outcome)
}
