use std::collections::HashMap;

use csv::ReaderBuilder;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::adapters::{
    parse_score, rank_from_value, score_from_value, strip_label_prefix, value_to_string,
    SourceAdapter,
};
use crate::error::Result;
use crate::model::AthleteResult;

// MSO event annotation suffixes on names: "Alley Perez IES V,Be,Fx"
static EVENT_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+(?:IES\s+)?(?:V|UB|Be|Fl|Fx|FX)(?:,(?:V|UB|Be|Fl|Fx|FX))*\s*$").unwrap()
});

static DASH_NOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*-\s*[A-Z, ]+$").unwrap());

/// Map common column name variations to canonical field names. Keys are
/// compared lowercased with spaces and underscores removed.
fn canonical_column(raw: &str) -> Option<&'static str> {
    let key: String = raw
        .to_ascii_lowercase()
        .chars()
        .filter(|c| !matches!(c, ' ' | '_'))
        .collect();
    let mapped = match key.as_str() {
        "name" | "athlete" | "gymnast" => "name",
        "gym" | "club" | "clubname" | "team" => "gym",
        "session" | "sess" => "session",
        "level" | "lvl" => "level",
        "division" | "div" => "division",
        "vault" | "vt" => "vault",
        "bars" | "ub" => "bars",
        "beam" | "bb" => "beam",
        "floor" | "fx" => "floor",
        "aa" | "allaround" | "all-around" => "aa",
        "rank" | "place" => "rank",
        "num" | "number" => "num",
        _ => return None,
    };
    Some(mapped)
}

/// Parses generic JSON or TSV exports from unknown sources.
///
/// JSON: an array of objects with recognizable column names. TSV: a
/// header row naming the columns. Either may arrive double-encoded as a
/// JSON string. Columns are matched case-insensitively through the alias
/// table; missing columns stay empty.
pub struct GenericAdapter;

impl SourceAdapter for GenericAdapter {
    fn source_name(&self) -> &'static str {
        "generic"
    }

    fn parse(&self, content: &str) -> Result<Vec<AthleteResult>> {
        let trimmed = content.trim();

        if trimmed.starts_with('[') || trimmed.starts_with('{') {
            if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
                let athletes = match value {
                    Value::Array(rows) => parse_json_rows(&rows),
                    other => parse_json_rows(&[other]),
                };
                debug!("GenericAdapter: parsed JSON rows count={}", athletes.len());
                return Ok(athletes);
            }
        }

        // Double-encoded payloads: a JSON string wrapping either JSON or TSV
        if trimmed.starts_with('"') {
            if let Ok(Value::String(inner)) = serde_json::from_str::<Value>(trimmed) {
                let inner = inner.trim();
                if inner.starts_with('[') {
                    if let Ok(Value::Array(rows)) = serde_json::from_str::<Value>(inner) {
                        return Ok(parse_json_rows(&rows));
                    }
                } else {
                    return parse_tsv(inner);
                }
            }
        }

        parse_tsv(trimmed)
    }
}

fn parse_json_rows(rows: &[Value]) -> Vec<AthleteResult> {
    let mut athletes = Vec::new();
    for row in rows {
        let Some(obj) = row.as_object() else { continue };

        let mut mapped: HashMap<&'static str, &Value> = HashMap::new();
        for (key, value) in obj {
            if let Some(canonical) = canonical_column(key) {
                mapped.insert(canonical, value);
            }
        }

        let mut name = value_to_string(mapped.get("name").copied());
        if name.is_empty() {
            name = name_from_parts(obj);
        }
        if name.is_empty() {
            continue;
        }
        name = EVENT_SUFFIX.replace(&name, "").trim().to_string();

        let mut athlete = AthleteResult {
            name,
            gym: value_to_string(mapped.get("gym").copied()),
            session: strip_label_prefix(&value_to_string(mapped.get("session").copied()), "Session"),
            level: strip_label_prefix(&value_to_string(mapped.get("level").copied()), "Level"),
            division: strip_label_prefix(
                &value_to_string(mapped.get("division").copied()),
                "Division",
            ),
            vault: score_from_value(mapped.get("vault").copied()),
            bars: score_from_value(mapped.get("bars").copied()),
            beam: score_from_value(mapped.get("beam").copied()),
            floor: score_from_value(mapped.get("floor").copied()),
            aa: score_from_value(mapped.get("aa").copied()),
            rank: non_empty(value_to_string(mapped.get("rank").copied())),
            num: non_empty(value_to_string(mapped.get("num").copied())),
            ..Default::default()
        };

        // Carry ScoreCat-style per-event ranks when the source includes them
        athlete.vault_rank = rank_from_value(obj.get("vtRank"));
        athlete.bars_rank = rank_from_value(obj.get("ubRank"));
        athlete.beam_rank = rank_from_value(obj.get("bbRank"));
        athlete.floor_rank = rank_from_value(obj.get("fxRank"));
        athlete.aa_rank = rank_from_value(obj.get("aaRank").or_else(|| obj.get("aaPlace")));

        athletes.push(athlete);
    }
    athletes
}

fn name_from_parts(obj: &serde_json::Map<String, Value>) -> String {
    let first = value_to_string(obj.get("firstName").or(obj.get("first_name")));
    let last = value_to_string(obj.get("lastName").or(obj.get("last_name")));
    let last = DASH_NOTE.replace(&last, "").trim().to_string();
    if !first.is_empty() && !last.is_empty() {
        format!("{last}, {first}")
    } else if !first.is_empty() {
        first
    } else {
        last
    }
}

fn parse_tsv(content: &str) -> Result<Vec<AthleteResult>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut columns: HashMap<&'static str, usize> = HashMap::new();
    for (index, header) in reader.headers()?.iter().enumerate() {
        if let Some(canonical) = canonical_column(header.trim()) {
            columns.insert(canonical, index);
        }
    }

    let mut athletes = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.get(0).map_or(true, |cell| cell.trim().is_empty()) {
            continue;
        }
        let field = |name: &str| {
            columns
                .get(name)
                .and_then(|index| record.get(*index))
                .unwrap_or("")
                .trim()
                .to_string()
        };

        let name = field("name");
        if name.is_empty() {
            continue;
        }
        athletes.push(AthleteResult {
            name,
            gym: field("gym"),
            session: field("session"),
            level: field("level"),
            division: field("division"),
            vault: parse_score(&field("vault")),
            bars: parse_score(&field("bars")),
            beam: parse_score(&field("beam")),
            floor: parse_score(&field("floor")),
            aa: parse_score(&field("aa")),
            rank: non_empty(field("rank")),
            num: non_empty(field("num")),
            ..Default::default()
        });
    }
    debug!("GenericAdapter: parsed TSV rows count={}", athletes.len());
    Ok(athletes)
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Vec<AthleteResult> {
        GenericAdapter.parse(content).unwrap()
    }

    #[test]
    fn test_json_with_aliased_columns() {
        let athletes = parse(
            r#"[{"Athlete": "Zoe Lane", "Club": "Peak Gym", "Lvl": "6", "Div": "Youth",
                 "VT": "9.1", "UB": 8.5, "BB": "", "FX": 9.2, "All Around": 35.4, "Place": "2"}]"#,
        );
        assert_eq!(athletes.len(), 1);
        let a = &athletes[0];
        assert_eq!(a.name, "Zoe Lane");
        assert_eq!(a.gym, "Peak Gym");
        assert_eq!(a.level, "6");
        assert_eq!(a.division, "Youth");
        assert_eq!(a.vault, Some(9.1));
        assert_eq!(a.bars, Some(8.5));
        assert_eq!(a.beam, None);
        assert_eq!(a.aa, Some(35.4));
        assert_eq!(a.rank.as_deref(), Some("2"));
    }

    #[test]
    fn test_json_builds_name_from_parts_and_strips_suffixes() {
        let athletes = parse(
            r#"[{"firstName": "Ani", "lastName": "Short-VT, FX", "team": "Rise"},
                {"name": "Alley Perez IES V,Be,Fx", "team": "Rise"},
                {"name": "Ani Sabounjian UB", "team": "Rise"}]"#,
        );
        assert_eq!(athletes[0].name, "Short, Ani");
        assert_eq!(athletes[1].name, "Alley Perez");
        assert_eq!(athletes[2].name, "Ani Sabounjian");
    }

    #[test]
    fn test_json_carries_per_event_ranks() {
        let athletes = parse(
            r#"[{"name": "Tess Monroe", "club": "Apex", "vtRank": "1T", "ubRank": 2,
                 "bbRank": "x", "fxRank": 1, "aaPlace": 3}]"#,
        );
        let a = &athletes[0];
        assert_eq!(a.vault_rank, Some(1));
        assert_eq!(a.bars_rank, Some(2));
        assert_eq!(a.beam_rank, None);
        assert_eq!(a.floor_rank, Some(1));
        assert_eq!(a.aa_rank, Some(3));
    }

    #[test]
    fn test_tsv_with_header_mapping() {
        let content = "Athlete\tTeam\tSession\tLevel\tDivision\tVT\tUB\tBB\tFX\tAA\tPlace\n\
                       June Park\tNorth Star\tA\t4\tCH B\t9.0\t8.8\t9.2\t9.1\t36.1\t1\n\
                       \tmissing name\tA\t4\tCH B\t\t\t\t\t\t";
        let athletes = parse(content);
        assert_eq!(athletes.len(), 1);
        assert_eq!(athletes[0].name, "June Park");
        assert_eq!(athletes[0].gym, "North Star");
        assert_eq!(athletes[0].beam, Some(9.2));
    }

    #[test]
    fn test_double_encoded_tsv() {
        let inner = "name\tgym\tlevel\nIvy Cole\tSummit\t5";
        let content = serde_json::to_string(inner).unwrap();
        let athletes = parse(&content);
        assert_eq!(athletes.len(), 1);
        assert_eq!(athletes[0].name, "Ivy Cole");
        assert_eq!(athletes[0].level, "5");
    }
}
