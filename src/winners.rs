use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::model::{AthleteResult, Event, PartitionKey, WinnerRecord};

/// How event winners are determined within a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinnerStrategy {
    /// Highest positive score wins; ties share the win.
    ScoreBased,
    /// Rank 1 with a positive score wins, falling back to the score
    /// rule when no such athlete exists for the event.
    RankBased,
}

/// Computes the winners table content for one meet's results.
///
/// Winners are found per (session, level, division) partition and per
/// event, so an athlete can win several events and the same event has
/// independent winners in every partition.
pub struct WinnerEngine {
    strategy: WinnerStrategy,
}

impl WinnerEngine {
    pub fn new(strategy: WinnerStrategy) -> Self {
        Self { strategy }
    }

    pub fn compute(&self, results: &[AthleteResult]) -> Vec<WinnerRecord> {
        let mut groups: BTreeMap<PartitionKey, Vec<&AthleteResult>> = BTreeMap::new();
        for result in results {
            groups
                .entry(PartitionKey::for_result(result))
                .or_default()
                .push(result);
        }
        let mut partitions: Vec<(&PartitionKey, &Vec<&AthleteResult>)> = groups.iter().collect();
        partitions.sort_by_key(|(partition, _)| partition.sort_key());

        let mut winners = Vec::new();
        for (partition, members) in partitions {
            for event in Event::ALL {
                let winning = match self.strategy {
                    WinnerStrategy::ScoreBased => score_based(members, event),
                    WinnerStrategy::RankBased => rank_based(members, event),
                };
                let is_tie = winning.len() > 1;
                for athlete in winning {
                    winners.push(WinnerRecord {
                        name: athlete.name.clone(),
                        gym: athlete.gym.clone(),
                        partition: partition.clone(),
                        event,
                        score: athlete.score(event).unwrap_or(0.0),
                        is_tie,
                    });
                }
            }
        }

        info!(
            "Winners: computed {} winner rows across {} partitions",
            winners.len(),
            groups.len()
        );
        winners
    }
}

/// Everyone holding the partition's maximum positive score for the event.
fn score_based<'a>(members: &[&'a AthleteResult], event: Event) -> Vec<&'a AthleteResult> {
    let mut max: Option<f64> = None;
    for athlete in members {
        if let Some(score) = athlete.score(event) {
            if score > 0.0 && max.map_or(true, |m| score > m) {
                max = Some(score);
            }
        }
    }
    let max = match max {
        Some(max) => max,
        None => return Vec::new(),
    };
    members
        .iter()
        .copied()
        .filter(|athlete| athlete.score(event) == Some(max))
        .collect()
}

/// Everyone ranked 1 for the event with a recorded positive score. A
/// rank 1 paired with no score means a scratch, so an empty candidate
/// set falls back to the score rule.
fn rank_based<'a>(members: &[&'a AthleteResult], event: Event) -> Vec<&'a AthleteResult> {
    let ranked: Vec<&AthleteResult> = members
        .iter()
        .copied()
        .filter(|athlete| {
            athlete.event_rank(event) == Some(1)
                && athlete.score(event).map_or(false, |score| score > 0.0)
        })
        .collect();
    if !ranked.is_empty() {
        return ranked;
    }
    score_based(members, event)
}
