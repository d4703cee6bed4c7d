use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::adapters::{
    first_field, rank_from_value, score_from_value, strip_label_prefix, value_to_string,
    SourceAdapter,
};
use crate::error::Result;
use crate::model::AthleteResult;
use crate::normalize::title_case_gym;

// Dash-notes appended to last names by scorers: "Holder- BB, FX"
static DASH_NOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*-\s*[A-Z, ]+$").unwrap());

// Keys an object may wrap its athlete array under
const WRAPPER_KEYS: [&str; 4] = ["athletes", "data", "results", "scores"];

/// Parses ScoreCat Firestore JSON exports.
///
/// Handles both Firestore-style keys (event1Score, event1Rank) and
/// ScoreCat API-style keys (vtScore, ubScore, vtRank, ubRank). Per-event
/// ranks are carried through so winners can be determined rank-first.
pub struct ScoreCatAdapter;

impl SourceAdapter for ScoreCatAdapter {
    fn source_name(&self) -> &'static str {
        "scorecat"
    }

    fn parse(&self, content: &str) -> Result<Vec<AthleteResult>> {
        let mut root: Value = serde_json::from_str(content)?;

        // Unwrap double-encoded JSON (browser-captured exports are stringified twice)
        if let Value::String(inner) = &root {
            match serde_json::from_str(inner) {
                Ok(decoded) => root = decoded,
                Err(e) => {
                    warn!("ScoreCatAdapter: double-encoded payload failed to decode: {e}");
                    return Ok(Vec::new());
                }
            }
        }

        let raw_athletes: Vec<Value> = match root {
            Value::Array(items) => items,
            Value::Object(map) => {
                let wrapped = WRAPPER_KEYS
                    .iter()
                    .find_map(|key| map.get(*key).and_then(|v| v.as_array()).cloned());
                match wrapped {
                    Some(items) => items,
                    None => map.into_iter().map(|(_, value)| value).collect(),
                }
            }
            _ => return Ok(Vec::new()),
        };

        let mut athletes = Vec::new();
        for raw in &raw_athletes {
            if let Some(obj) = raw.as_object() {
                let athlete = extract_athlete(obj);
                if !athlete.name.is_empty() {
                    athletes.push(athlete);
                }
            }
        }
        debug!("ScoreCatAdapter: extracted athletes count={}", athletes.len());
        Ok(athletes)
    }
}

fn extract_athlete(obj: &serde_json::Map<String, Value>) -> AthleteResult {
    let first = value_to_string(first_field(obj, &["firstName", "first_name", "first"]));
    let last = value_to_string(first_field(obj, &["lastName", "last_name", "last"]));
    let full = value_to_string(first_field(obj, &["fullName", "full_name", "name"]));

    let name = if !first.is_empty() && !last.is_empty() {
        clean_name(&first, &last)
    } else if !full.is_empty() {
        let parts: Vec<&str> = full.split_whitespace().collect();
        if parts.len() >= 2 {
            clean_name(parts[0], &parts[1..].join(" "))
        } else {
            title_case_gym(&full)
        }
    } else {
        String::new()
    };

    let session = value_to_string(first_field(
        obj,
        &["description", "session", "sessionDescription"],
    ));

    let mut athlete = AthleteResult {
        name,
        gym: value_to_string(first_field(obj, &["clubName", "club_name", "club", "gym", "team"])),
        session: strip_label_prefix(&session, "Session"),
        level: strip_label_prefix(&value_to_string(first_field(obj, &["level"])), "Level"),
        division: strip_label_prefix(&value_to_string(first_field(obj, &["division"])), "Division"),
        vault: score_from_value(first_field(obj, &["vt", "vtScore", "event1Score", "vault"])),
        bars: score_from_value(first_field(obj, &["ub", "ubScore", "event2Score", "bars"])),
        beam: score_from_value(first_field(obj, &["bb", "bbScore", "event3Score", "beam"])),
        floor: score_from_value(first_field(obj, &["fx", "fxScore", "event4Score", "floor"])),
        aa: score_from_value(first_field(obj, &["aa", "aaScore", "event7Score"])),
        vault_rank: rank_from_value(first_field(
            obj,
            &["vtRank", "event1Rank", "event1Place", "vaultRank"],
        )),
        bars_rank: rank_from_value(first_field(
            obj,
            &["ubRank", "event2Rank", "event2Place", "barsRank"],
        )),
        beam_rank: rank_from_value(first_field(
            obj,
            &["bbRank", "event3Rank", "event3Place", "beamRank"],
        )),
        floor_rank: rank_from_value(first_field(
            obj,
            &["fxRank", "event4Rank", "event4Place", "floorRank"],
        )),
        aa_rank: rank_from_value(first_field(
            obj,
            &["aaPlace", "event7Rank", "event7Place", "aaRank"],
        )),
        ..Default::default()
    };
    // The overall rank label mirrors the AA rank for this source
    athlete.rank = athlete.aa_rank.map(|rank| rank.to_string());
    athlete
}

fn clean_last_name(raw: &str) -> String {
    DASH_NOTE.replace(raw.trim(), "").trim().to_string()
}

fn clean_name(first: &str, last: &str) -> String {
    let first = first.trim();
    let last = clean_last_name(last);
    if !first.is_empty() && !last.is_empty() {
        format!("{first} {last}")
    } else if !first.is_empty() {
        first.to_string()
    } else {
        last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Vec<AthleteResult> {
        ScoreCatAdapter.parse(content).unwrap()
    }

    #[test]
    fn test_parses_api_style_keys() {
        let athletes = parse(
            r#"[{
                "firstName": "Maya",
                "lastName": "Ortiz",
                "clubName": "Flip City",
                "level": "Level: 4",
                "division": "Division: Jr A",
                "description": "Session: P2",
                "vt": 9.1, "ub": "8.75", "bb": 0, "fx": 9.35, "aa": 36.2,
                "vtRank": "1", "ubRank": "2T", "bbRank": null, "fxRank": 1, "aaPlace": 1
            }]"#,
        );
        assert_eq!(athletes.len(), 1);
        let a = &athletes[0];
        assert_eq!(a.name, "Maya Ortiz");
        assert_eq!(a.gym, "Flip City");
        assert_eq!(a.level, "4");
        assert_eq!(a.division, "Jr A");
        assert_eq!(a.session, "P2");
        assert_eq!(a.vault, Some(9.1));
        assert_eq!(a.bars, Some(8.75));
        assert_eq!(a.beam, None);
        assert_eq!(a.vault_rank, Some(1));
        assert_eq!(a.bars_rank, Some(2));
        assert_eq!(a.beam_rank, None);
        assert_eq!(a.aa_rank, Some(1));
        assert_eq!(a.rank.as_deref(), Some("1"));
    }

    #[test]
    fn test_parses_firestore_style_keys() {
        let athletes = parse(
            r#"{"athletes": [{
                "fullName": "ella mae carter",
                "club": "Summit Gymnastics",
                "level": "3",
                "division": "CH B",
                "session": "1",
                "event1Score": "9.025", "event7Score": "35.1",
                "event1Rank": 3, "event7Rank": "2"
            }]}"#,
        );
        assert_eq!(athletes.len(), 1);
        let a = &athletes[0];
        assert_eq!(a.name, "ella mae carter");
        assert_eq!(a.vault, Some(9.025));
        assert_eq!(a.aa, Some(35.1));
        assert_eq!(a.vault_rank, Some(3));
        assert_eq!(a.aa_rank, Some(2));
    }

    #[test]
    fn test_strips_dash_notes_from_last_names() {
        let athletes = parse(
            r#"[{"firstName": "Ava", "lastName": "Holder- BB, FX", "club": "Apex"}]"#,
        );
        assert_eq!(athletes[0].name, "Ava Holder");
    }

    #[test]
    fn test_drops_nameless_records_and_unwraps_double_encoding() {
        let inner = r#"[{"club": "No Name Gym"}, {"name": "Solo Athlete", "club": "Apex"}]"#;
        let content = serde_json::to_string(inner).unwrap();
        let athletes = parse(&content);
        assert_eq!(athletes.len(), 1);
        assert_eq!(athletes[0].name, "Solo Athlete");
    }

    #[test]
    fn test_unknown_object_shape_uses_values() {
        let athletes = parse(
            r#"{"doc1": {"name": "Nia Brooks", "club": "Vault City"},
                "doc2": {"name": "Isla Reed", "club": "Vault City"}}"#,
        );
        assert_eq!(athletes.len(), 2);
    }
}
