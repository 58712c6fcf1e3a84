use chrono::{NaiveDate, NaiveTime};
use std::collections::HashMap;

use crate::deaths::FightFilter;
use crate::error::{Error, Result};

/// Inclusive pair of calendar days, no time-of-day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidArgument(format!(
                "start date {start} is after end date {end}"
            )));
        }
        Ok(DateRange { start, end })
    }

    /// Midnight UTC at the start of the first day, in epoch milliseconds.
    pub fn start_ms(&self) -> i64 {
        self.start
            .and_time(NaiveTime::MIN)
            .and_utc()
            .timestamp_millis()
    }

    /// 23:59:59 UTC on the last day, in epoch milliseconds.
    pub fn end_ms(&self) -> i64 {
        let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
        self.end.and_time(end_of_day).and_utc().timestamp_millis()
    }
}

/// One report considered for its calendar day during selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportCandidate {
    pub code: String,
    pub title: String,
    /// Calendar day (UTC) derived from the report start timestamp.
    pub date: NaiveDate,
    pub start_ms: i64,
    /// Boss-scoped death count used to rank same-day reports.
    pub deaths: u64,
}

/// A candidate that won its day; at most one exists per distinct date.
pub type SelectedReport = ReportCandidate;

/// Per-report aggregation keyed by player name. Insertion order is kept so
/// the final table can preserve first-seen player order.
#[derive(Debug, Default, Clone)]
pub struct PlayerTally {
    pub players: Vec<String>,
    pub values: HashMap<String, u64>,
}

impl PlayerTally {
    pub fn add(&mut self, player: &str, amount: u64) {
        if !self.values.contains_key(player) {
            self.players.push(player.to_string());
        }
        *self.values.entry(player.to_string()).or_insert(0) += amount;
    }

    /// Absent players read as zero; zero-filling is the aggregator's job.
    pub fn get(&self, player: &str) -> u64 {
        self.values.get(player).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.values.values().sum()
    }
}

/// Which per-player metric the extractor tallies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Deaths,
    DamageTaken,
}

/// Everything the pipeline needs for one invocation. Built by the caller,
/// never mutated by the pipeline.
#[derive(Debug, Clone)]
pub struct SummaryRequest {
    pub guild_id: u32,
    pub range: DateRange,
    pub boss_id: u32,
    pub boss_name: String,
    pub ability_id: Option<u64>,
    /// Display label for the ability column of the metadata row.
    pub ability_name: String,
    pub difficulty: i64,
    pub wipes_only: bool,
    pub metric: Metric,
}

impl SummaryRequest {
    pub fn fight_filter(&self) -> FightFilter {
        FightFilter {
            boss_id: self.boss_id,
            difficulty: self.difficulty,
            wipes_only: self.wipes_only,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn date_range_rejects_inverted_bounds() {
        assert!(DateRange::new(day("2024-01-02"), day("2024-01-01")).is_err());
        assert!(DateRange::new(day("2024-01-01"), day("2024-01-01")).is_ok());
    }

    #[test]
    fn date_range_covers_whole_days() {
        let range = DateRange::new(day("2024-01-01"), day("2024-01-01")).unwrap();
        assert_eq!(range.start_ms(), 1_704_067_200_000);
        // Inclusive end: one second before the next midnight.
        assert_eq!(range.end_ms(), 1_704_067_200_000 + 86_399_000);
    }

    #[test]
    fn tally_keeps_first_seen_order() {
        let mut tally = PlayerTally::default();
        tally.add("Brakk", 1);
        tally.add("Aeris", 1);
        tally.add("Brakk", 1);

        assert_eq!(tally.players, vec!["Brakk", "Aeris"]);
        assert_eq!(tally.get("Brakk"), 2);
        assert_eq!(tally.get("Aeris"), 1);
        assert_eq!(tally.get("Unseen"), 0);
        assert_eq!(tally.total(), 3);
    }
}
