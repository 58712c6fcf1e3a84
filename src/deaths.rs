use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Instant;
use tracing::info;

use crate::api::{self, WclClient};
use crate::error::{Error, Result};
use crate::model::{PlayerTally, SelectedReport};

/// Which fights inside a report count toward the tally.
#[derive(Debug, Clone, Copy)]
pub struct FightFilter {
    pub boss_id: u32,
    pub difficulty: i64,
    pub wipes_only: bool,
}

const FIGHTS_QUERY: &str = r#"
query ($code: String!) {
  reportData {
    report(code: $code) {
      fights {
        id
        name
        difficulty
        kill
        startTime
        endTime
        encounterID
      }
    }
  }
}
"#;

#[derive(Debug, Clone, Deserialize)]
pub struct Fight {
    pub id: i64,
    #[serde(default)]
    pub difficulty: Option<i64>,
    #[serde(default)]
    pub kill: Option<bool>,
    #[serde(rename = "startTime")]
    pub start_time: f64,
    #[serde(rename = "endTime")]
    pub end_time: f64,
    #[serde(rename = "encounterID", default)]
    pub encounter_id: Option<i64>,
}

/// All fights in the report matching the filter.
pub fn boss_fights(client: &WclClient, code: &str, filter: &FightFilter) -> Result<Vec<Fight>> {
    let document = client.query(FIGHTS_QUERY, json!({ "code": code }))?;
    let node = api::pointer(&document, "/data/reportData/report/fights")?;

    let fights: Vec<Fight> = serde_json::from_value(node.clone())
        .map_err(|e| Error::Malformed(format!("fight list did not match the schema: {e}")))?;

    let matching = filter_fights(fights, filter);
    info!(
        action = "fights",
        component = "death_extractor",
        code,
        boss_id = filter.boss_id,
        matching = matching.len(),
        "Filtered report fights"
    );
    Ok(matching)
}

/// Encounter and difficulty must match; kill pulls drop out when only
/// wipes are wanted.
pub fn filter_fights(fights: Vec<Fight>, filter: &FightFilter) -> Vec<Fight> {
    fights
        .into_iter()
        .filter(|f| f.encounter_id == Some(i64::from(filter.boss_id)))
        .filter(|f| f.difficulty == Some(filter.difficulty))
        .filter(|f| !filter.wipes_only || !f.kill.unwrap_or(false))
        .collect()
}

const ACTORS_QUERY: &str = r#"
query ($code: String!) {
  reportData {
    report(code: $code) {
      masterData {
        actors {
          id
          name
          type
        }
      }
    }
  }
}
"#;

/// Actor id -> name map for a report, used to resolve event targets.
pub fn actor_names(client: &WclClient, code: &str) -> Result<HashMap<i64, String>> {
    let document = client.query(ACTORS_QUERY, json!({ "code": code }))?;
    let node = api::pointer(&document, "/data/reportData/report/masterData/actors")?;
    let actors = node
        .as_array()
        .ok_or_else(|| Error::Malformed("actor list is not an array".to_string()))?;

    let mut names = HashMap::new();
    for actor in actors {
        let id = actor.get("id").and_then(Value::as_i64);
        let name = actor.get("name").and_then(Value::as_str);
        if let (Some(id), Some(name)) = (id, name) {
            if !name.is_empty() {
                names.insert(id, name.to_string());
            }
        }
    }

    info!(
        action = "actors",
        component = "death_extractor",
        code,
        actor_count = names.len(),
        "Loaded actor names"
    );
    Ok(names)
}

const DEATH_EVENTS_QUERY: &str = r#"
query ($code: String!, $startTime: Float!, $endTime: Float!, $fightIDs: [Int!]) {
  reportData {
    report(code: $code) {
      events(startTime: $startTime, endTime: $endTime, dataType: Deaths, fightIDs: $fightIDs) {
        data
        nextPageTimestamp
      }
    }
  }
}
"#;

/// Every death event inside the given fights, pages combined.
pub fn death_events(client: &WclClient, code: &str, fights: &[Fight]) -> Result<Vec<Value>> {
    if fights.is_empty() {
        return Ok(Vec::new());
    }

    let fight_ids: Vec<i64> = fights.iter().map(|f| f.id).collect();
    let window_start = fights.iter().map(|f| f.start_time).fold(f64::INFINITY, f64::min);
    let window_end = fights
        .iter()
        .map(|f| f.end_time)
        .fold(f64::NEG_INFINITY, f64::max);

    let events = api::paged_events(
        client,
        DEATH_EVENTS_QUERY,
        json!({
            "code": code,
            "startTime": window_start,
            "endTime": window_end,
            "fightIDs": fight_ids,
        }),
    )?;

    info!(
        action = "events",
        component = "death_extractor",
        code,
        event_count = events.len(),
        "Fetched death events"
    );
    Ok(events)
}

/// Boss-scoped death count for one report, used to rank same-day reports.
/// Returns None when the report has no matching fights at all.
pub fn count_boss_deaths(
    client: &WclClient,
    code: &str,
    filter: &FightFilter,
) -> Result<Option<u64>> {
    let fights = boss_fights(client, code, filter)?;
    if fights.is_empty() {
        return Ok(None);
    }
    let events = death_events(client, code, &fights)?;
    Ok(Some(events.len() as u64))
}

/// Per-player death counts for one selected report, scoped to the boss
/// fights and, when given, the killing ability.
pub fn extract_deaths(
    client: &WclClient,
    report: &SelectedReport,
    filter: &FightFilter,
    ability_id: Option<u64>,
) -> Result<PlayerTally> {
    let started = Instant::now();

    let fights = boss_fights(client, &report.code, filter)?;
    if fights.is_empty() {
        return Ok(PlayerTally::default());
    }

    let events = death_events(client, &report.code, &fights)?;
    let actors = actor_names(client, &report.code)?;
    let tally = tally_death_events(&events, &actors, ability_id)?;

    info!(
        action = "complete",
        component = "death_extractor",
        code = %report.code,
        deaths = tally.total(),
        players = tally.players.len(),
        duration_ms = started.elapsed().as_millis(),
        "Tallied deaths"
    );
    Ok(tally)
}

/// Fold death events into per-player counts, one increment per event.
/// Every counted event must resolve to a named actor; anything else means
/// the provider changed its data shape and the run fails rather than
/// under-counting.
pub fn tally_death_events(
    events: &[Value],
    actors: &HashMap<i64, String>,
    ability_id: Option<u64>,
) -> Result<PlayerTally> {
    let mut tally = PlayerTally::default();

    for event in events {
        if let Some(wanted) = ability_id {
            let killing = event.get("killingAbilityGameID").and_then(Value::as_u64);
            if killing != Some(wanted) {
                continue;
            }
        }

        let target = event
            .get("targetID")
            .and_then(Value::as_i64)
            .ok_or_else(|| Error::Malformed(format!("death event without a target: {event}")))?;

        let player = actors.get(&target).ok_or_else(|| {
            Error::Malformed(format!("death event target {target} has no actor entry"))
        })?;

        tally.add(player, 1);
    }

    Ok(tally)
}
