use csv::ReaderBuilder;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::adapters::{parse_score, SourceAdapter};
use crate::error::Result;
use crate::model::AthleteResult;

// Parenthetical event notations some exports append to names
static PARENTHETICAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\([^)]*\)\s*").unwrap());

// name, gym, session, level, division, then score/rank column pairs
const COLUMN_COUNT: usize = 15;

/// Parses MeetScoresOnline TSV exports.
///
/// Column layout: name, gym, session, level, division, vault, vault_rank,
/// bars, bars_rank, beam, beam_rank, floor, floor_rank, aa, aa_rank.
/// Only the AA rank is kept; winners for this source are score-based.
pub struct MsoAdapter {
    strip_parenthetical: bool,
}

impl MsoAdapter {
    pub fn new(strip_parenthetical: bool) -> Self {
        Self { strip_parenthetical }
    }
}

impl SourceAdapter for MsoAdapter {
    fn source_name(&self) -> &'static str {
        "mso"
    }

    fn parse(&self, content: &str) -> Result<Vec<AthleteResult>> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .quoting(false)
            .flexible(true)
            .from_reader(content.as_bytes());

        let mut athletes = Vec::new();
        for record in reader.records() {
            let record = record?;
            let column = |index: usize| record.get(index).unwrap_or("").trim().to_string();

            let mut name = column(0);
            if self.strip_parenthetical {
                name = PARENTHETICAL.replace_all(&name, "").trim().to_string();
            }
            if name.is_empty() {
                continue;
            }

            let rank = column(COLUMN_COUNT - 1);
            athletes.push(AthleteResult {
                name,
                gym: column(1),
                session: column(2),
                level: column(3),
                division: column(4),
                vault: parse_score(record.get(5).unwrap_or("")),
                bars: parse_score(record.get(7).unwrap_or("")),
                beam: parse_score(record.get(9).unwrap_or("")),
                floor: parse_score(record.get(11).unwrap_or("")),
                aa: parse_score(record.get(13).unwrap_or("")),
                rank: (!rank.is_empty()).then_some(rank),
                ..Default::default()
            });
        }
        debug!("MsoAdapter: extracted athletes count={}", athletes.len());
        Ok(athletes)
    }
}
