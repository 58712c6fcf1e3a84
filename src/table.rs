use chrono::NaiveDate;
use std::io::Write;

use crate::error::Result;
use crate::model::{PlayerTally, SelectedReport};

/// Wide players x dates matrix with a computed total column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryTable {
    pub boss: String,
    pub ability: String,
    /// One column per selected report, ascending.
    pub dates: Vec<NaiveDate>,
    /// Row keys in first-seen order across the date-ordered inputs.
    pub players: Vec<String>,
    /// One row per player, one cell per date, zero-filled.
    pub cells: Vec<Vec<u64>>,
    /// Row-wise sums, parallel to players.
    pub totals: Vec<u64>,
}

impl SummaryTable {
    pub fn total(&self) -> u64 {
        self.totals.iter().sum()
    }
}

/// Merge per-report tallies into one wide table. A player absent from a
/// date's tally gets an explicit zero cell, never a gap. No sorting or
/// filtering happens here; any such view belongs downstream.
pub fn build_table(
    boss: &str,
    ability: &str,
    per_report: &[(SelectedReport, PlayerTally)],
) -> SummaryTable {
    let mut players: Vec<String> = Vec::new();
    for (_, tally) in per_report {
        for player in &tally.players {
            if !players.contains(player) {
                players.push(player.clone());
            }
        }
    }

    let dates: Vec<NaiveDate> = per_report.iter().map(|(report, _)| report.date).collect();

    let mut cells = Vec::with_capacity(players.len());
    let mut totals = Vec::with_capacity(players.len());
    for player in &players {
        let row: Vec<u64> = per_report
            .iter()
            .map(|(_, tally)| tally.get(player))
            .collect();
        totals.push(row.iter().sum());
        cells.push(row);
    }

    SummaryTable {
        boss: boss.to_string(),
        ability: ability.to_string(),
        dates,
        players,
        cells,
        totals,
    }
}

/// Serialize the table as CSV: the metadata row, a header row, then one
/// row per player. Cells are plain integers, UTF-8, no separators.
pub fn write_csv<W: Write>(table: &SummaryTable, writer: W) -> Result<()> {
    // Flexible writer: the metadata row is shorter than the data rows.
    let mut out = csv::WriterBuilder::new().flexible(true).from_writer(writer);

    out.write_record(["", table.boss.as_str(), table.ability.as_str()])?;

    let mut header = vec!["Player".to_string()];
    header.extend(table.dates.iter().map(|d| d.format("%Y-%m-%d").to_string()));
    header.push("Total".to_string());
    out.write_record(&header)?;

    for (row, player) in table.players.iter().enumerate() {
        let mut record = vec![player.clone()];
        record.extend(table.cells[row].iter().map(u64::to_string));
        record.push(table.totals[row].to_string());
        out.write_record(&record)?;
    }

    out.flush()?;
    Ok(())
}

pub fn render_csv(table: &SummaryTable) -> Result<String> {
    let mut buffer = Vec::new();
    write_csv(table, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
