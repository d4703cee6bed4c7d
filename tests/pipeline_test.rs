use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use podium::config::{MeetConfig, SourceType};
use podium::model::Event;
use podium::output::ShirtFormat;
use podium::pipeline::{Pipeline, RunOptions};
use podium::store::ResultsStore;
use serde_json::json;
use tempfile::tempdir;

const ARTIFACTS: [&str; 4] = [
    "winners_sheet.csv",
    "order_forms_by_gym.txt",
    "back_of_shirt.md",
    "gym_report.json",
];

const MSO_HEADER: &str =
    "name\tgym\tsession\tlevel\tdivision\tvault\tvault_rank\tbars\tbars_rank\tbeam\tbeam_rank\tfloor\tfloor_rank\taa\taa_rank";

/// Four athletes across three partitions. The Apex pair splits the
/// Jr A events between them; the Summit athletes own their partitions.
fn scorecat_fixture() -> String {
    serde_json::to_string(&json!([
        {
            "firstName": "Maya", "lastName": "Ortiz", "clubName": "Apex Athletics",
            "level": "Level: 3", "division": "Jr A", "description": "Session: 1",
            "vt": 9.10, "ub": 8.75, "bb": 9.00, "fx": 9.35, "aa": 36.20,
            "vtRank": 1, "ubRank": "2T", "bbRank": 2, "fxRank": 1, "aaPlace": 2
        },
        {
            "firstName": "Ella", "lastName": "Carter", "clubName": "APEX ATHLETICS",
            "level": "Level: 3", "division": "Jr A", "description": "Session: 1",
            "vt": 9.00, "ub": 9.10, "bb": 9.20, "fx": 9.10, "aa": 36.40,
            "vtRank": 2, "ubRank": 1, "bbRank": 1, "fxRank": 2, "aaPlace": 1
        },
        {
            "firstName": "Nia", "lastName": "Brooks", "clubName": "Summit Gymnastics",
            "level": "Level: 3", "division": "CH B", "description": "Session: 1",
            "vt": 8.90, "ub": 8.80, "bb": 8.75, "fx": 9.00, "aa": 35.45,
            "vtRank": 1, "ubRank": 1, "bbRank": 1, "fxRank": 1, "aaPlace": 1
        },
        {
            "firstName": "Lena", "lastName": "Park", "clubName": "Summit Gymnastics",
            "level": "4", "division": "Jr A", "description": "Session: 2",
            "vt": 9.20, "ub": 9.00, "bb": 9.10, "fx": 9.25, "aa": 36.55,
            "vtRank": 1, "ubRank": 1, "bbRank": 1, "fxRank": 1, "aaPlace": 1
        }
    ]))
    .expect("fixture serializes")
}

fn meet_config(meet_name: &str, source: SourceType, data: Vec<PathBuf>) -> MeetConfig {
    MeetConfig {
        state: "OR".to_string(),
        meet_name: meet_name.to_string(),
        association: "USAG".to_string(),
        source,
        data,
        strip_parenthetical: false,
        gym_map: None,
        shirt_format: ShirtFormat::EventFirst,
        shirt_title: None,
    }
}

#[test]
fn test_scorecat_run_end_to_end() -> Result<()> {
    let temp = tempdir()?;
    let data_path = temp.path().join("meet.json");
    fs::write(&data_path, scorecat_fixture())?;
    let output_dir = temp.path().join("output");

    let config = meet_config("Rose City Classic", SourceType::Scorecat, vec![data_path]);
    let options = RunOptions {
        output_dir: output_dir.clone(),
        db_path: None,
        refresh_divisions: false,
    };

    let summary = Pipeline::run(&config, &options)?;

    assert_eq!(summary.athletes, 4);
    assert_eq!(summary.unique_gyms, 2);
    assert_eq!(summary.auto_merged, 1);
    assert_eq!(summary.fuzzy_candidates, 0);
    assert_eq!(summary.divisions, 2);
    assert_eq!(summary.winner_rows, 15);
    assert_eq!(summary.artifacts.len(), 4);

    // Winners sheet: level 4 first, then level 3 by division position and AA
    let sheet = fs::read_to_string(output_dir.join("winners_sheet.csv"))?;
    let lines: Vec<&str> = sheet.lines().collect();
    assert_eq!(lines[0], "name,gym name,level,Vault,Bars,Beam,Floor,AA");
    assert_eq!(lines[1], "Lena Park,Summit Gymnastics,4,TRUE,TRUE,TRUE,TRUE,TRUE");
    assert_eq!(lines[2], "Nia Brooks,Summit Gymnastics,3,TRUE,TRUE,TRUE,TRUE,TRUE");
    assert_eq!(lines[3], "Ella Carter,Apex Athletics,3,FALSE,TRUE,TRUE,FALSE,TRUE");
    assert_eq!(lines[4], "Maya Ortiz,Apex Athletics,3,TRUE,FALSE,FALSE,TRUE,FALSE");

    // Order forms group winners per gym with the events each athlete won
    let forms = fs::read_to_string(output_dir.join("order_forms_by_gym.txt"))?;
    assert!(forms.contains("  Apex Athletics"));
    assert!(forms.contains("  Ella Carter - Bars, Beam, AA"));
    assert!(forms.contains("  Maya Ortiz - Vault, Floor"));
    assert!(forms.contains("  Level 3 Division CH B"));

    // Shirt layout defaults to event-first
    let shirt = fs::read_to_string(output_dir.join("back_of_shirt.md"))?;
    assert!(shirt.contains("## Vault"));
    assert!(shirt.contains("Nia Brooks"));
    assert!(shirt.contains("Lena Park"));

    // The normalization report records the case merge it applied
    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(output_dir.join("gym_report.json"))?)?;
    assert_eq!(report["case_merged"]["APEX ATHLETICS"], "Apex Athletics");

    // Division order is cached beside the database
    let cache: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(output_dir.join("state_divisions.json"))?)?;
    assert_eq!(cache["OR"]["CH B"], 1);
    assert_eq!(cache["OR"]["Jr A"], 2);

    // Rows persisted under the meet
    let store = ResultsStore::open(options.database_path())?;
    assert_eq!(store.count_results("Rose City Classic")?, 4);
    assert_eq!(store.count_winners("Rose City Classic")?, 15);
    Ok(())
}

#[test]
fn test_rerun_rebuilds_without_duplication() -> Result<()> {
    let temp = tempdir()?;
    let data_path = temp.path().join("meet.json");
    fs::write(&data_path, scorecat_fixture())?;
    let output_dir = temp.path().join("output");

    let config = meet_config("Rose City Classic", SourceType::Scorecat, vec![data_path]);
    let options = RunOptions {
        output_dir: output_dir.clone(),
        db_path: None,
        refresh_divisions: false,
    };

    Pipeline::run(&config, &options)?;
    let mut first = Vec::new();
    for name in ARTIFACTS {
        first.push(fs::read_to_string(output_dir.join(name))?);
    }

    // Second run hits the division cache and rebuilds the same rows
    let summary = Pipeline::run(&config, &options)?;
    assert_eq!(summary.athletes, 4);
    assert_eq!(summary.winner_rows, 15);

    for (name, before) in ARTIFACTS.iter().zip(&first) {
        let after = fs::read_to_string(output_dir.join(name))?;
        assert_eq!(&after, before, "{name} changed between runs");
    }

    let store = ResultsStore::open(options.database_path())?;
    assert_eq!(store.count_results("Rose City Classic")?, 4);
    assert_eq!(store.count_winners("Rose City Classic")?, 15);
    Ok(())
}

#[test]
fn test_mso_run_uses_score_based_winners() -> Result<()> {
    let temp = tempdir()?;
    let data_path = temp.path().join("meet.tsv");
    let rows = format!(
        "{MSO_HEADER}\n\
         Riley James\tNorth Peak\tA\t5\tSenior A\t9.30\t1\t9.00\t2\t8.90\t3\t9.10\t2\t36.30\t1\n\
         Quinn Avery\tNorth Peak\tA\t5\tSenior A\t9.30\t1\t8.50\t3\t9.20\t2\t8.90\t3\t35.90\t2\n\
         Nora Diaz\tCascade Elite\tA\t5\tSenior A\t0\t\t9.40\t1\t9.30\t1\t9.50\t1\t28.20\t3\n"
    );
    fs::write(&data_path, rows)?;
    let output_dir = temp.path().join("output");

    let config = meet_config("Winter Cup", SourceType::Mso, vec![data_path]);
    let options = RunOptions {
        output_dir: output_dir.clone(),
        db_path: None,
        refresh_divisions: false,
    };

    let summary = Pipeline::run(&config, &options)?;
    assert_eq!(summary.athletes, 3);
    assert_eq!(summary.divisions, 1);
    assert_eq!(summary.winner_rows, 6);

    // The shared top vault score produces a tie pair
    let store = ResultsStore::open(options.database_path())?;
    let winners = store.fetch_winners("Winter Cup")?;
    let vault: Vec<_> = winners.iter().filter(|w| w.event == Event::Vault).collect();
    assert_eq!(vault.len(), 2);
    assert!(vault.iter().all(|w| w.is_tie));

    // Rows sort by AA within the single partition
    let sheet = fs::read_to_string(output_dir.join("winners_sheet.csv"))?;
    let lines: Vec<&str> = sheet.lines().collect();
    assert_eq!(lines[1], "Riley James,North Peak,5,TRUE,FALSE,FALSE,FALSE,TRUE");
    assert_eq!(lines[2], "Quinn Avery,North Peak,5,TRUE,FALSE,FALSE,FALSE,FALSE");
    assert_eq!(lines[3], "Nora Diaz,Cascade Elite,5,FALSE,TRUE,TRUE,TRUE,FALSE");
    Ok(())
}

#[test]
fn test_division_cache_shared_across_meets_in_a_state() -> Result<()> {
    let temp = tempdir()?;
    let output_dir = temp.path().join("output");
    let options = RunOptions {
        output_dir: output_dir.clone(),
        db_path: None,
        refresh_divisions: false,
    };

    let first_data = temp.path().join("first.json");
    fs::write(&first_data, scorecat_fixture())?;
    let first = meet_config("Rose City Classic", SourceType::Scorecat, vec![first_data]);
    Pipeline::run(&first, &options)?;

    // A later meet in the same state sees only one of the cached divisions
    let second_data = temp.path().join("second.json");
    let payload = serde_json::to_string(&json!([{
        "firstName": "Isla", "lastName": "Reed", "clubName": "Vault City",
        "level": "3", "division": "Jr A", "session": "1",
        "vt": 9.0, "aa": 9.0, "vtRank": 1, "aaPlace": 1
    }]))?;
    fs::write(&second_data, payload)?;
    let second = meet_config("Valley Invite", SourceType::Scorecat, vec![second_data]);
    let summary = Pipeline::run(&second, &options)?;

    // The cached state order is reused rather than recomputed
    assert_eq!(summary.divisions, 2);
    let cache: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(output_dir.join("state_divisions.json"))?)?;
    assert_eq!(cache["OR"]["CH B"], 1);
    assert_eq!(cache["OR"]["Jr A"], 2);

    // Both meets coexist in the shared database
    let store = ResultsStore::open(options.database_path())?;
    assert_eq!(store.count_results("Rose City Classic")?, 4);
    assert_eq!(store.count_results("Valley Invite")?, 1);
    Ok(())
}
