use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Instant;
use tracing::info;

use crate::api::{self, WclClient};
use crate::deaths::{self, FightFilter};
use crate::error::{Error, Result};
use crate::model::{PlayerTally, SelectedReport};

const DAMAGE_EVENTS_QUERY: &str = r#"
query ($code: String!, $startTime: Float!, $endTime: Float!, $fightIDs: [Int!], $abilityID: Float) {
  reportData {
    report(code: $code) {
      events(startTime: $startTime, endTime: $endTime, dataType: DamageTaken, fightIDs: $fightIDs, abilityID: $abilityID) {
        data
        nextPageTimestamp
      }
    }
  }
}
"#;

/// Per-player damage taken for one selected report, scoped to the boss
/// fights and, when given, the damaging ability. Cells in the final table
/// become damage totals instead of death counts.
pub fn extract_damage_taken(
    client: &WclClient,
    report: &SelectedReport,
    filter: &FightFilter,
    ability_id: Option<u64>,
) -> Result<PlayerTally> {
    let started = Instant::now();

    let fights = deaths::boss_fights(client, &report.code, filter)?;
    if fights.is_empty() {
        return Ok(PlayerTally::default());
    }

    let fight_ids: Vec<i64> = fights.iter().map(|f| f.id).collect();
    let window_start = fights.iter().map(|f| f.start_time).fold(f64::INFINITY, f64::min);
    let window_end = fights
        .iter()
        .map(|f| f.end_time)
        .fold(f64::NEG_INFINITY, f64::max);

    let events = api::paged_events(
        client,
        DAMAGE_EVENTS_QUERY,
        json!({
            "code": report.code,
            "startTime": window_start,
            "endTime": window_end,
            "fightIDs": fight_ids,
            "abilityID": ability_id.map(|id| id as f64),
        }),
    )?;

    let actors = deaths::actor_names(client, &report.code)?;
    let (tally, hits) = tally_damage_events(&events, &actors, ability_id, &fight_ids)?;

    info!(
        action = "complete",
        component = "damage_extractor",
        code = %report.code,
        total_damage = tally.total(),
        hits,
        players = tally.players.len(),
        duration_ms = started.elapsed().as_millis(),
        "Tallied damage taken"
    );
    Ok(tally)
}

/// Fold damage-taken events into per-player totals of post-mitigation
/// amount. Events outside the boss fights or for another ability are
/// ignored; counted events must resolve to a named actor.
pub fn tally_damage_events(
    events: &[Value],
    actors: &HashMap<i64, String>,
    ability_id: Option<u64>,
    fight_ids: &[i64],
) -> Result<(PlayerTally, u64)> {
    let mut tally = PlayerTally::default();
    let mut hits = 0u64;

    for event in events {
        let fight = event.get("fight").and_then(Value::as_i64);
        if !fight.is_some_and(|id| fight_ids.contains(&id)) {
            continue;
        }

        if let Some(wanted) = ability_id {
            if event.get("abilityGameID").and_then(Value::as_u64) != Some(wanted) {
                continue;
            }
        }

        let target = event
            .get("targetID")
            .and_then(Value::as_i64)
            .ok_or_else(|| Error::Malformed(format!("damage event without a target: {event}")))?;

        let player = actors.get(&target).ok_or_else(|| {
            Error::Malformed(format!("damage event target {target} has no actor entry"))
        })?;

        let amount = event.get("amount").and_then(Value::as_u64).unwrap_or(0);
        tally.add(player, amount);
        hits += 1;
    }

    Ok((tally, hits))
}
