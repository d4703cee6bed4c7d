//! Artifact renderers. Each renderer is a pure function of the winners
//! table content (plus lookup data) and returns the artifact body;
//! callers decide where the bytes go.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::divisions::DivisionOrder;
use crate::error::{ProcessorError, Result};
use crate::model::{level_numeral, AthleteResult, Event, WinnerRecord};

/// Grouping layout for the back-of-shirt listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ShirtFormat {
    /// Level headings first, events inside each level
    LevelFirst,
    /// Event headings first, names grouped by level under each
    EventFirst,
}

/// AA score lookup keyed by (name, gym, level, division, session).
pub type AaScoreIndex = BTreeMap<(String, String, String, String, String), f64>;

/// Index result rows by athlete identity for the winners sheet. The
/// first row wins when a batch carries duplicates; a missing AA score
/// counts as 0.
pub fn aa_score_index(results: &[AthleteResult]) -> AaScoreIndex {
    let mut index = AaScoreIndex::new();
    for result in results {
        let key = (
            result.name.clone(),
            result.gym.clone(),
            result.level.clone(),
            result.division.clone(),
            result.session.clone(),
        );
        index.entry(key).or_insert(result.aa.unwrap_or(0.0));
    }
    index
}

/// Render the back-of-shirt markdown listing of winner names.
pub fn back_of_shirt(
    winners: &[WinnerRecord],
    format: ShirtFormat,
    title: Option<&str>,
) -> String {
    let mut levels: Vec<String> = winners
        .iter()
        .map(|w| w.partition.level.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    levels.sort_by_key(|level| (level_numeral(level), level.clone()));

    let lines = match format {
        ShirtFormat::LevelFirst => shirt_level_first(winners, &levels, title),
        ShirtFormat::EventFirst => shirt_event_first(winners, &levels),
    };
    lines.join("\n")
}

fn shirt_level_first(
    winners: &[WinnerRecord],
    levels: &[String],
    title: Option<&str>,
) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(title) = title {
        lines.push(format!("# {title}\n"));
    }
    for level in levels {
        lines.push(format!("\n## Level {level}\n"));
        for event in Event::ALL {
            let names = winner_names(winners, event, level);
            if names.is_empty() {
                continue;
            }
            lines.push(format!("### {}", event.long_name()));
            lines.extend(names);
            lines.push(String::new());
        }
    }
    lines
}

fn shirt_event_first(winners: &[WinnerRecord], levels: &[String]) -> Vec<String> {
    let mut lines = Vec::new();
    for event in Event::ALL {
        lines.push(format!("\n## {}\n", event.display_name()));
        for level in levels {
            let names = winner_names(winners, event, level);
            if names.is_empty() {
                continue;
            }
            lines.extend(names);
            lines.push(String::new());
        }
    }
    lines
}

fn winner_names(winners: &[WinnerRecord], event: Event, level: &str) -> Vec<String> {
    winners
        .iter()
        .filter(|w| w.event == event && w.partition.level == level)
        .map(|w| w.name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Render per-gym order forms: banner per gym, one entry per athlete
/// and level/division with the events they won.
pub fn order_forms(winners: &[WinnerRecord]) -> String {
    let gyms: BTreeSet<&str> = winners.iter().map(|w| w.gym.as_str()).collect();

    let mut lines = Vec::new();
    for gym in gyms {
        lines.push(String::new());
        lines.push("=".repeat(60));
        lines.push(format!("  {gym}"));
        lines.push("=".repeat(60));

        let mut entries: Vec<(String, String, String)> = winners
            .iter()
            .filter(|w| w.gym == gym)
            .map(|w| {
                (
                    w.name.clone(),
                    w.partition.level.clone(),
                    w.partition.division.clone(),
                )
            })
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        entries.sort_by_key(|(name, level, division)| {
            (
                level_numeral(level),
                level.clone(),
                division.clone(),
                name.clone(),
            )
        });

        for (name, level, division) in entries {
            // Events won across all sessions at this level and division
            let mut events = Vec::new();
            for event in Event::ALL {
                let won = winners.iter().any(|w| {
                    w.event == event
                        && w.name == name
                        && w.gym == gym
                        && w.partition.level == level
                        && w.partition.division == division
                });
                if won {
                    events.push(event.display_name());
                }
            }
            lines.push(format!("  {name} - {}", events.join(", ")));
            lines.push(format!("  Level {level} Division {division}"));
            lines.push(String::new());
        }
    }
    lines.join("\n")
}

struct SheetRow {
    name: String,
    gym: String,
    level: String,
    division: String,
    session: String,
    aa_score: f64,
    won: BTreeSet<Event>,
}

/// Render the winners sheet CSV: one row per winning athlete entry with
/// TRUE/FALSE flags per event. Sorted by level descending, division
/// order, session, then AA score descending.
pub fn winners_csv(
    winners: &[WinnerRecord],
    division_order: &DivisionOrder,
    aa_scores: &AaScoreIndex,
) -> Result<String> {
    let athletes: BTreeSet<(String, String, String, String, String)> = winners
        .iter()
        .map(|w| {
            (
                w.name.clone(),
                w.gym.clone(),
                w.partition.level.clone(),
                w.partition.division.clone(),
                w.partition.session.clone(),
            )
        })
        .collect();

    let mut rows: Vec<SheetRow> = athletes
        .into_iter()
        .map(|(name, gym, level, division, session)| {
            // The events this athlete won anywhere at this level
            let won: BTreeSet<Event> = winners
                .iter()
                .filter(|w| w.name == name && w.gym == gym && w.partition.level == level)
                .map(|w| w.event)
                .collect();
            let aa_score = aa_scores
                .get(&(
                    name.clone(),
                    gym.clone(),
                    level.clone(),
                    division.clone(),
                    session.clone(),
                ))
                .copied()
                .unwrap_or(0.0);
            SheetRow {
                name,
                gym,
                level,
                division,
                session,
                aa_score,
                won,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        level_desc_key(&a.level)
            .cmp(&level_desc_key(&b.level))
            .then_with(|| division_position(division_order, &a.division).cmp(&division_position(division_order, &b.division)))
            .then_with(|| a.session.cmp(&b.session))
            .then_with(|| {
                b.aa_score
                    .partial_cmp(&a.aa_score)
                    .unwrap_or(Ordering::Equal)
            })
    });

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["name", "gym name", "level", "Vault", "Bars", "Beam", "Floor", "AA"])?;
    for row in &rows {
        writer.write_record([
            row.name.as_str(),
            row.gym.as_str(),
            row.level.as_str(),
            flag(row.won.contains(&Event::Vault)),
            flag(row.won.contains(&Event::Bars)),
            flag(row.won.contains(&Event::Beam)),
            flag(row.won.contains(&Event::Floor)),
            flag(row.won.contains(&Event::Aa)),
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ProcessorError::Render(format!("winners sheet buffer: {e}")))?;
    String::from_utf8(bytes).map_err(|e| ProcessorError::Render(format!("winners sheet utf8: {e}")))
}

// Numeric levels sort descending and come before named levels
fn level_desc_key(level: &str) -> i64 {
    if !level.is_empty() && level.chars().all(|c| c.is_ascii_digit()) {
        -level.parse::<i64>().unwrap_or(0)
    } else {
        0
    }
}

fn division_position(order: &DivisionOrder, division: &str) -> i64 {
    order.get(division).copied().unwrap_or(99)
}

fn flag(won: bool) -> &'static str {
    if won {
        "TRUE"
    } else {
        "FALSE"
    }
}
