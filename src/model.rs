use serde::{Deserialize, Serialize};

/// The five scored events, in canonical reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Event {
    Vault,
    Bars,
    Beam,
    Floor,
    Aa,
}

impl Event {
    pub const ALL: [Event; 5] = [
        Event::Vault,
        Event::Bars,
        Event::Beam,
        Event::Floor,
        Event::Aa,
    ];

    /// Column/key name used in storage and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::Vault => "vault",
            Event::Bars => "bars",
            Event::Beam => "beam",
            Event::Floor => "floor",
            Event::Aa => "aa",
        }
    }

    /// Short display form used in artifacts
    pub fn display_name(&self) -> &'static str {
        match self {
            Event::Vault => "Vault",
            Event::Bars => "Bars",
            Event::Beam => "Beam",
            Event::Floor => "Floor",
            Event::Aa => "AA",
        }
    }

    /// Long display form ("All Around" rather than "AA")
    pub fn long_name(&self) -> &'static str {
        match self {
            Event::Aa => "All Around",
            other => other.display_name(),
        }
    }

    pub fn from_column(column: &str) -> Option<Event> {
        match column {
            "vault" => Some(Event::Vault),
            "bars" => Some(Event::Bars),
            "beam" => Some(Event::Beam),
            "floor" => Some(Event::Floor),
            "aa" => Some(Event::Aa),
            _ => None,
        }
    }
}

/// One athlete's parsed results for a meet.
///
/// Adapters produce this shape from raw exports. Scores are absent (None)
/// rather than zero whenever the source had no positive value; the same
/// holds for per-event ranks, which only rank-based sources provide.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AthleteResult {
    pub name: String,
    pub gym: String,
    pub session: String,
    pub level: String,
    pub division: String,
    pub vault: Option<f64>,
    pub bars: Option<f64>,
    pub beam: Option<f64>,
    pub floor: Option<f64>,
    pub aa: Option<f64>,
    /// Overall rank label as exported ("1", "3T", ...)
    pub rank: Option<String>,
    /// Athlete number/bib when the source provides one
    pub num: Option<String>,
    pub vault_rank: Option<i64>,
    pub bars_rank: Option<i64>,
    pub beam_rank: Option<i64>,
    pub floor_rank: Option<i64>,
    pub aa_rank: Option<i64>,
}

impl AthleteResult {
    pub fn score(&self, event: Event) -> Option<f64> {
        match event {
            Event::Vault => self.vault,
            Event::Bars => self.bars,
            Event::Beam => self.beam,
            Event::Floor => self.floor,
            Event::Aa => self.aa,
        }
    }

    pub fn event_rank(&self, event: Event) -> Option<i64> {
        match event {
            Event::Vault => self.vault_rank,
            Event::Bars => self.bars_rank,
            Event::Beam => self.beam_rank,
            Event::Floor => self.floor_rank,
            Event::Aa => self.aa_rank,
        }
    }
}

/// Composite grouping key for winner determination: one competition
/// partition is a (session, level, division) triple.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartitionKey {
    pub session: String,
    pub level: String,
    pub division: String,
}

impl PartitionKey {
    pub fn for_result(result: &AthleteResult) -> Self {
        Self {
            session: result.session.clone(),
            level: result.level.clone(),
            division: result.division.clone(),
        }
    }

    /// Sort key ordering partitions by numeric level first, then division
    /// and session. Non-numeric levels share numeral 0 and fall back to
    /// their text order.
    pub fn sort_key(&self) -> (i64, String, String, String) {
        (
            level_numeral(&self.level),
            self.level.clone(),
            self.division.clone(),
            self.session.clone(),
        )
    }
}

/// One champion row: an athlete who won an event within a partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinnerRecord {
    pub name: String,
    pub gym: String,
    pub partition: PartitionKey,
    pub event: Event,
    pub score: f64,
    pub is_tie: bool,
}

/// Leading-digit interpretation of a level label ("10A" -> 10, "XB" -> 0),
/// matching SQLite CAST semantics.
pub fn level_numeral(level: &str) -> i64 {
    let digits: String = level
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_round_trips_through_column_name() {
        for event in Event::ALL {
            assert_eq!(Event::from_column(event.as_str()), Some(event));
        }
        assert_eq!(Event::from_column("pommel"), None);
    }

    #[test]
    fn test_level_numeral() {
        assert_eq!(level_numeral("10"), 10);
        assert_eq!(level_numeral("10A"), 10);
        assert_eq!(level_numeral(" 7"), 7);
        assert_eq!(level_numeral("XB"), 0);
        assert_eq!(level_numeral(""), 0);
    }

    #[test]
    fn test_score_accessors_cover_all_events() {
        let result = AthleteResult {
            vault: Some(9.0),
            bars: Some(9.1),
            beam: Some(9.2),
            floor: Some(9.3),
            aa: Some(36.6),
            beam_rank: Some(2),
            floor_rank: Some(4),
            ..Default::default()
        };
        assert_eq!(result.score(Event::Vault), Some(9.0));
        assert_eq!(result.score(Event::Beam), Some(9.2));
        assert_eq!(result.score(Event::Aa), Some(36.6));
        assert_eq!(result.event_rank(Event::Floor), Some(4));
        assert_eq!(result.event_rank(Event::Vault), None);
    }
}
