// tests/export_csv.rs
use std::fs;

use raidtally::model::{PlayerTally, ReportCandidate};
use raidtally::table::{build_table, write_csv};

fn report(code: &str, date: &str, deaths: u64) -> ReportCandidate {
    ReportCandidate {
        code: code.to_string(),
        title: format!("Raid night {date}"),
        date: date.parse().unwrap(),
        start_ms: 0,
        deaths,
    }
}

fn tally(entries: &[(&str, u64)]) -> PlayerTally {
    let mut t = PlayerTally::default();
    for (player, count) in entries {
        t.add(player, *count);
    }
    t
}

#[test]
fn csv_file_round_trip_matches_expected_layout() {
    let input = vec![
        (
            report("abc123", "2024-01-01", 4),
            tally(&[("PlayerA", 3), ("PlayerB", 1)]),
        ),
        (
            report("def456", "2024-01-02", 2),
            tally(&[("PlayerA", 0), ("PlayerB", 2)]),
        ),
    ];

    let table = build_table("X", "Y", &input);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deaths_summary.csv");
    let file = fs::File::create(&path).unwrap();
    write_csv(&table, file).unwrap();

    let written = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = written.lines().collect();

    assert_eq!(lines[0], ",X,Y");
    assert_eq!(lines[1], "Player,2024-01-01,2024-01-02,Total");
    assert_eq!(lines[2], "PlayerA,3,0,3");
    assert_eq!(lines[3], "PlayerB,1,2,3");
    assert_eq!(lines.len(), 4);
}

#[test]
fn player_names_with_commas_are_quoted() {
    let input = vec![(
        report("abc123", "2024-01-01", 1),
        tally(&[("Weird, Name", 1)]),
    )];

    let table = build_table("Boss", "Ability", &input);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.csv");
    write_csv(&table, fs::File::create(&path).unwrap()).unwrap();

    let written = fs::read_to_string(&path).unwrap();
    assert!(written.contains("\"Weird, Name\",1,1"));
}
