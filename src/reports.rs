use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::info;

use crate::api::{self, WclClient};
use crate::deaths;
use crate::error::{Error, Result};
use crate::model::{DateRange, ReportCandidate, SelectedReport, SummaryRequest};

const REPORTS_PAGE_SIZE: i64 = 100;

const REPORTS_QUERY: &str = r#"
query ($guildID: Int!, $startTime: Float!, $endTime: Float!, $limit: Int!, $page: Int!) {
  reportData {
    reports(guildID: $guildID, startTime: $startTime, endTime: $endTime, limit: $limit, page: $page) {
      data {
        code
        title
        startTime
        endTime
      }
      current_page
      has_more_pages
    }
  }
}
"#;

#[derive(Debug, Deserialize)]
struct RawReport {
    code: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(rename = "startTime")]
    start_time: f64,
}

/// Every report for the guild overlapping the range, provider pages
/// combined transparently.
fn list_guild_reports(
    client: &WclClient,
    guild_id: u32,
    range: &DateRange,
) -> Result<Vec<RawReport>> {
    let mut reports = Vec::new();
    let mut page = 1i64;

    loop {
        let document = client.query(
            REPORTS_QUERY,
            json!({
                "guildID": guild_id,
                "startTime": range.start_ms() as f64,
                "endTime": range.end_ms() as f64,
                "limit": REPORTS_PAGE_SIZE,
                "page": page,
            }),
        )?;

        let node = api::pointer(&document, "/data/reportData/reports")?;
        let data = node
            .get("data")
            .ok_or_else(|| Error::Malformed("report listing has no data field".to_string()))?;
        let batch: Vec<RawReport> = serde_json::from_value(data.clone())
            .map_err(|e| Error::Malformed(format!("report listing did not match the schema: {e}")))?;

        let more = node
            .get("has_more_pages")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        info!(
            action = "page",
            component = "report_locator",
            page,
            batch = batch.len(),
            more,
            "Fetched report page"
        );

        reports.extend(batch);
        if !more {
            break;
        }
        page += 1;
    }

    Ok(reports)
}

/// Calendar day (UTC) a report belongs to, from its start timestamp.
/// The provider's reporting timezone is authoritative here; timestamps are
/// epoch milliseconds and bucket into UTC days.
fn report_day(start_ms: i64) -> Result<NaiveDate> {
    DateTime::<Utc>::from_timestamp_millis(start_ms)
        .map(|t| t.date_naive())
        .ok_or_else(|| {
            Error::Malformed(format!("report start timestamp {start_ms} is out of range"))
        })
}

/// Challenger wins on a strictly higher death count. Ties go to the
/// earlier start time, then the smaller report code, so the selection
/// never depends on provider response order.
fn beats(challenger: &ReportCandidate, incumbent: &ReportCandidate) -> bool {
    if challenger.deaths != incumbent.deaths {
        return challenger.deaths > incumbent.deaths;
    }
    if challenger.start_ms != incumbent.start_ms {
        return challenger.start_ms < incumbent.start_ms;
    }
    challenger.code < incumbent.code
}

/// Keep the best candidate per calendar day, output ordered by date.
pub fn select_daily_best(candidates: Vec<ReportCandidate>) -> Vec<SelectedReport> {
    let mut by_day: BTreeMap<NaiveDate, ReportCandidate> = BTreeMap::new();

    for candidate in candidates {
        match by_day.get(&candidate.date) {
            Some(incumbent) if !beats(&candidate, incumbent) => {}
            _ => {
                by_day.insert(candidate.date, candidate);
            }
        }
    }

    by_day.into_values().collect()
}

/// Pick the single most relevant report per calendar day in range: the one
/// with the highest death count for the targeted boss. Reports without a
/// relevant encounter drop out of candidacy without failing the run.
pub fn locate_reports(
    client: &WclClient,
    request: &SummaryRequest,
) -> Result<Vec<SelectedReport>> {
    let started = Instant::now();
    info!(
        action = "start",
        component = "report_locator",
        guild_id = request.guild_id,
        "Listing guild reports"
    );

    let raw = list_guild_reports(client, request.guild_id, &request.range)?;
    if raw.is_empty() {
        return Err(Error::NoData);
    }

    info!(
        action = "list",
        component = "report_locator",
        report_count = raw.len(),
        "Found reports in range"
    );

    let filter = request.fight_filter();
    let mut candidates = Vec::new();
    for report in raw {
        let start_ms = report.start_time as i64;
        let date = report_day(start_ms)?;

        let deaths = match deaths::count_boss_deaths(client, &report.code, &filter)? {
            Some(count) => count,
            None => {
                info!(
                    action = "skip",
                    component = "report_locator",
                    code = %report.code,
                    "No relevant encounters in report"
                );
                continue;
            }
        };

        info!(
            action = "candidate",
            component = "report_locator",
            code = %report.code,
            date = %date,
            deaths,
            "Report is a candidate"
        );
        candidates.push(ReportCandidate {
            code: report.code,
            title: report.title.unwrap_or_default(),
            date,
            start_ms,
            deaths,
        });
    }

    if candidates.is_empty() {
        return Err(Error::NoData);
    }

    let selected = select_daily_best(candidates);
    info!(
        action = "complete",
        component = "report_locator",
        selected = selected.len(),
        duration_ms = started.elapsed().as_millis(),
        "Selected one report per day"
    );
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn candidate(code: &str, date: &str, start_ms: i64, deaths: u64) -> ReportCandidate {
        ReportCandidate {
            code: code.to_string(),
            title: String::new(),
            date: day(date),
            start_ms,
            deaths,
        }
    }

    #[test]
    fn highest_death_count_wins_the_day() {
        let selected = select_daily_best(vec![
            candidate("aaa", "2024-01-01", 100, 5),
            candidate("bbb", "2024-01-01", 200, 8),
        ]);

        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].code, "bbb");
    }

    #[test]
    fn at_most_one_report_per_day_and_date_ordered() {
        let selected = select_daily_best(vec![
            candidate("ccc", "2024-01-02", 300, 2),
            candidate("aaa", "2024-01-01", 100, 5),
            candidate("bbb", "2024-01-01", 200, 3),
            candidate("ddd", "2024-01-02", 400, 7),
        ]);

        let dates: Vec<NaiveDate> = selected.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![day("2024-01-01"), day("2024-01-02")]);
        let codes: Vec<&str> = selected.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["aaa", "ddd"]);

        for report in &selected {
            assert!(report.deaths >= 2);
        }
    }

    #[test]
    fn ties_break_on_earliest_start_then_code() {
        let selected = select_daily_best(vec![
            candidate("bbb", "2024-01-01", 200, 5),
            candidate("aaa", "2024-01-01", 100, 5),
        ]);
        assert_eq!(selected[0].code, "aaa");

        let selected = select_daily_best(vec![
            candidate("zzz", "2024-01-01", 100, 5),
            candidate("mmm", "2024-01-01", 100, 5),
        ]);
        assert_eq!(selected[0].code, "mmm");
    }

    #[test]
    fn selection_is_order_independent() {
        let forward = vec![
            candidate("aaa", "2024-01-01", 100, 5),
            candidate("bbb", "2024-01-01", 200, 5),
            candidate("ccc", "2024-01-02", 300, 1),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        assert_eq!(select_daily_best(forward), select_daily_best(reversed));
    }

    #[test]
    fn report_day_truncates_to_utc_date() {
        // 2024-01-01T23:30:00Z
        assert_eq!(report_day(1_704_151_800_000).unwrap(), day("2024-01-01"));
        // 30 minutes later it is the next day.
        assert_eq!(report_day(1_704_153_600_000).unwrap(), day("2024-01-02"));
    }
}
