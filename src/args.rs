use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "raidtally",
    about = "Tally raid deaths per player from Warcraft Logs into a CSV matrix",
    version,
    long_about = None
)]
pub struct Args {
    /// Guild page URL or numeric guild id
    #[arg(short, long)]
    pub guild: Option<String>,

    /// First day of the range, YYYY-MM-DD (UTC)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last day of the range, inclusive, YYYY-MM-DD (UTC)
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Boss name as listed in the boss registry
    #[arg(short, long)]
    pub boss: Option<String>,

    /// Ability id to attribute deaths to; omit to count every death on the boss
    #[arg(short, long)]
    pub ability: Option<u64>,

    /// Encounter difficulty (1 = LFR .. 5 = Mythic)
    #[arg(short, long, default_value_t = 5)]
    pub difficulty: i64,

    /// Count kill pulls too, instead of wipes only
    #[arg(long)]
    pub include_kills: bool,

    /// Tally damage taken instead of deaths
    #[arg(long)]
    pub damage_taken: bool,

    /// Output CSV path
    #[arg(short, long, default_value = "deaths_summary.csv")]
    pub output: PathBuf,

    /// Path to a custom boss registry JSON file
    #[arg(long)]
    pub bosses: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Write bosses.json with the built-in encounter list and exit
    #[arg(long)]
    pub init_bosses: bool,
}
