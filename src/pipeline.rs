use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::adapters;
use crate::config::MeetConfig;
use crate::divisions::{DivisionOrder, DivisionOrderResolver, JsonDivisionStore};
use crate::error::{ProcessorError, Result};
use crate::model::AthleteResult;
use crate::normalize::GymNormalizer;
use crate::output;
use crate::store::ResultsStore;
use crate::winners::WinnerEngine;

/// Result of a complete processing run
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub meet_name: String,
    pub state: String,
    pub started_at: DateTime<Utc>,
    pub athletes: usize,
    pub unique_gyms: usize,
    pub auto_merged: usize,
    pub fuzzy_candidates: usize,
    pub divisions: usize,
    pub winner_rows: usize,
    pub artifacts: Vec<String>,
    pub duration_secs: f64,
}

/// Paths and switches a run needs beyond the meet config.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub output_dir: PathBuf,
    /// Defaults to {output_dir}/meet_results.db
    pub db_path: Option<PathBuf>,
    pub refresh_divisions: bool,
}

impl RunOptions {
    pub fn database_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| self.output_dir.join("meet_results.db"))
    }
}

pub struct Pipeline;

impl Pipeline {
    /// Run the complete sequential pipeline for one meet:
    /// parse, normalize, rebuild the store, resolve division order,
    /// compute winners, write artifacts.
    #[instrument(skip(config, options), fields(meet = %config.meet_name))]
    pub fn run(config: &MeetConfig, options: &RunOptions) -> Result<RunSummary> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let timer = std::time::Instant::now();

        info!(
            "Pipeline: starting run {run_id} for {} ({})",
            config.meet_name, config.state
        );
        println!(
            "🚀 Processing {} ({}, {})",
            config.meet_name, config.state, config.association
        );

        // Step 1: parse the source exports
        let mut athletes = Self::parse_athletes(config)?;

        // Step 2: normalize gym names across the batch
        let normalizer = GymNormalizer::new().with_alias_map(config.gym_map.clone());
        let report = normalizer.normalize(&mut athletes);
        report.print();

        // Step 3: rebuild the meet's rows in the store
        fs::create_dir_all(&options.output_dir)?;
        let db_path = options.database_path();
        println!("\n💾 Building database at {}...", db_path.display());
        let mut store = ResultsStore::open(&db_path)?;
        store.rebuild_results(config, &athletes)?;

        // Step 4: resolve the division order for the state
        let divisions = store.distinct_divisions(&config.meet_name)?;
        let division_order = Self::resolve_divisions(
            &db_path,
            options.refresh_divisions,
            &config.state,
            &divisions,
        )?;
        println!(
            "Division order ({} divisions): {:?}",
            division_order.len(),
            ordered_labels(&division_order)
        );

        // Step 5: compute winners from the stored rows
        let stored = store.fetch_results(&config.meet_name)?;
        let engine = WinnerEngine::new(config.source.winner_strategy());
        let winner_rows = engine.compute(&stored);
        store.replace_winners(config, &winner_rows)?;
        println!("🏆 Computed {} winner rows", winner_rows.len());

        // Step 6: render artifacts from the winners table
        let winners = store.fetch_winners(&config.meet_name)?;
        let aa_scores = output::aa_score_index(&stored);
        let mut artifacts = Vec::new();

        let sheet = output::winners_csv(&winners, &division_order, &aa_scores)?;
        artifacts.push(Self::write_artifact(
            &options.output_dir.join("winners_sheet.csv"),
            &sheet,
        )?);

        let forms = output::order_forms(&winners);
        artifacts.push(Self::write_artifact(
            &options.output_dir.join("order_forms_by_gym.txt"),
            &forms,
        )?);

        let shirt = output::back_of_shirt(&winners, config.shirt_format, config.shirt_title.as_deref());
        artifacts.push(Self::write_artifact(
            &options.output_dir.join("back_of_shirt.md"),
            &shirt,
        )?);

        let gym_report = serde_json::to_string_pretty(&report)?;
        artifacts.push(Self::write_artifact(
            &options.output_dir.join("gym_report.json"),
            &gym_report,
        )?);

        let summary = RunSummary {
            run_id,
            meet_name: config.meet_name.clone(),
            state: config.state.clone(),
            started_at,
            athletes: athletes.len(),
            unique_gyms: report.unique_gyms.len(),
            auto_merged: report.case_merged.len() + report.suffix_merged.len(),
            fuzzy_candidates: report.fuzzy_candidates.len(),
            divisions: division_order.len(),
            winner_rows: winner_rows.len(),
            artifacts,
            duration_secs: timer.elapsed().as_secs_f64(),
        };
        info!(
            "Pipeline: run {run_id} finished with {} athletes and {} winner rows in {:.2}s",
            summary.athletes, summary.winner_rows, summary.duration_secs
        );
        Ok(summary)
    }

    fn parse_athletes(config: &MeetConfig) -> Result<Vec<AthleteResult>> {
        let files = expand_data_paths(&config.data)?;
        if files.is_empty() {
            return Err(ProcessorError::Config(
                "no data files configured for this meet".into(),
            ));
        }

        let adapter = adapters::for_config(config);
        info!(
            "Parse: reading {} file(s) with the {} adapter",
            files.len(),
            adapter.source_name()
        );

        let mut athletes = Vec::new();
        for path in &files {
            println!("📡 Parsing {}...", path.display());
            let content = fs::read_to_string(path)?;
            let batch = adapter.parse(&content)?;
            println!("   -> {} athletes", batch.len());
            athletes.extend(batch);
        }
        if files.len() > 1 {
            println!("Total: {} athletes from {} files", athletes.len(), files.len());
        }
        Ok(athletes)
    }

    fn resolve_divisions(
        db_path: &Path,
        refresh: bool,
        state: &str,
        divisions: &[String],
    ) -> Result<DivisionOrder> {
        let store = JsonDivisionStore::beside_database(db_path);
        DivisionOrderResolver::new(Box::new(store))
            .with_refresh(refresh)
            .resolve(state, divisions)
    }

    fn write_artifact(path: &Path, content: &str) -> Result<String> {
        fs::write(path, content)?;
        info!("Artifacts: wrote {}", path.display());
        println!("✅ Generated {}", path.display());
        Ok(path.display().to_string())
    }
}

/// Labels of an order sorted by their positions.
pub fn ordered_labels(order: &DivisionOrder) -> Vec<&str> {
    let mut entries: Vec<(&String, &i64)> = order.iter().collect();
    entries.sort_by_key(|(_, position)| **position);
    entries.into_iter().map(|(label, _)| label.as_str()).collect()
}

/// Expand configured data paths. Directories contribute their *.json and
/// *.tsv files in name order; files pass through; anything missing is a
/// config error.
pub fn expand_data_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| {
                    p.is_file()
                        && matches!(
                            p.extension().and_then(|e| e.to_str()),
                            Some("json") | Some("tsv")
                        )
                })
                .collect();
            entries.sort();
            files.extend(entries);
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            return Err(ProcessorError::Config(format!(
                "data path not found: {}",
                path.display()
            )));
        }
    }
    Ok(files)
}
