use serde_json::Value;

use crate::config::{MeetConfig, SourceType};
use crate::error::Result;
use crate::model::AthleteResult;

pub mod generic;
pub mod mso;
pub mod scorecat;

pub use generic::GenericAdapter;
pub use mso::MsoAdapter;
pub use scorecat::ScoreCatAdapter;

/// Core trait all source adapters implement: raw export content in,
/// athlete records out. Adapters never touch the filesystem; the pipeline
/// reads files and hands the content over.
pub trait SourceAdapter {
    /// Unique identifier for this source format
    fn source_name(&self) -> &'static str;

    /// Parse raw export content into athlete records. Records without a
    /// resolvable name are dropped.
    fn parse(&self, content: &str) -> Result<Vec<AthleteResult>>;
}

/// Select the adapter for a configured source.
pub fn for_config(config: &MeetConfig) -> Box<dyn SourceAdapter> {
    match config.source {
        SourceType::Scorecat => Box::new(ScoreCatAdapter),
        SourceType::Mso => Box::new(MsoAdapter::new(config.strip_parenthetical)),
        SourceType::Generic => Box::new(GenericAdapter),
    }
}

/// Parse a score field. Absent for empty, non-numeric, or non-positive
/// values; a zero score means "did not compete", never a real result.
pub fn parse_score(raw: &str) -> Option<f64> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value > 0.0 => Some(value),
        _ => None,
    }
}

/// Parse a rank field to an integer, stripping "1T" tie notation.
/// Only one trailing marker comes off; absent for empty, non-numeric,
/// or non-positive values.
pub fn parse_rank(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    let cleaned = trimmed.strip_suffix(['T', 't']).unwrap_or(trimmed);
    match cleaned.parse::<i64>() {
        Ok(value) if value > 0 => Some(value),
        _ => None,
    }
}

/// Score from a JSON value that may be a number or a string.
pub fn score_from_value(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64().filter(|v| *v > 0.0),
        Value::String(s) => parse_score(s),
        _ => None,
    }
}

/// Rank from a JSON value that may be a number or a string.
pub fn rank_from_value(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .filter(|v| *v > 0),
        Value::String(s) => parse_rank(s),
        _ => None,
    }
}

/// First non-null value among several candidate field names.
pub fn first_field<'a>(
    obj: &'a serde_json::Map<String, Value>,
    keys: &[&str],
) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find(|value| !value.is_null())
}

/// Render a JSON field as trimmed text; non-text values become empty.
pub fn value_to_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Strip label prefixes like "Level: 8" -> "8" or "Session: P7" -> "P7".
pub fn strip_label_prefix(raw: &str, prefix: &str) -> String {
    let trimmed = raw.trim();
    let marker = format!("{prefix}:");
    match trimmed.get(..marker.len()) {
        Some(head) if head.eq_ignore_ascii_case(&marker) => {
            trimmed[marker.len()..].trim().to_string()
        }
        _ => trimmed.to_string(),
    }
}
