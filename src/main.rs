use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::error;

use podium::config::{MeetConfig, SourceType};
use podium::divisions::{DivisionOrderResolver, JsonDivisionStore};
use podium::logging;
use podium::output::ShirtFormat;
use podium::pipeline::{Pipeline, RunOptions};
use podium::store::ResultsStore;

#[derive(Parser)]
#[command(name = "podium")]
#[command(about = "Gymnastics meet results processor")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a meet end to end and write its artifacts
    Process(ProcessArgs),
    /// Resolve and print the division order for a state
    Divisions {
        /// State whose order to resolve
        #[arg(long)]
        state: String,
        /// Meet whose stored divisions seed detection on a cache miss
        #[arg(long)]
        meet: String,
        /// Directory holding the database (default location)
        #[arg(long, default_value = "output")]
        output: PathBuf,
        /// Central SQLite database (default: {output}/meet_results.db)
        #[arg(long)]
        db: Option<PathBuf>,
        /// Recompute even when a cached order exists
        #[arg(long)]
        refresh: bool,
    },
    /// Delete a meet's rows from the store
    Clear {
        /// Meet name to clear
        #[arg(long)]
        meet: String,
        /// Directory holding the database (default location)
        #[arg(long, default_value = "output")]
        output: PathBuf,
        /// Central SQLite database (default: {output}/meet_results.db)
        #[arg(long)]
        db: Option<PathBuf>,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args)]
struct ProcessArgs {
    /// TOML meet config; the flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,
    /// State name, e.g. "Iowa"
    #[arg(long)]
    state: Option<String>,
    /// Meet name keying this meet's rows in the store
    #[arg(long)]
    meet: Option<String>,
    /// Data source type
    #[arg(long, value_enum)]
    source: Option<SourceType>,
    /// Input data files or directories (repeatable)
    #[arg(long)]
    data: Vec<PathBuf>,
    /// Sanctioning association
    #[arg(long)]
    association: Option<String>,
    /// Output directory for artifacts
    #[arg(long, default_value = "output")]
    output: PathBuf,
    /// Central SQLite database (default: {output}/meet_results.db)
    #[arg(long)]
    db: Option<PathBuf>,
    /// JSON gym alias map applied after automatic normalization
    #[arg(long)]
    gym_map: Option<PathBuf>,
    /// Strip parenthetical notations from names (MSO exports)
    #[arg(long)]
    strip_parenthetical: bool,
    /// Back-of-shirt grouping layout
    #[arg(long, value_enum)]
    shirt_format: Option<ShirtFormat>,
    /// Title line for the level-first shirt layout
    #[arg(long)]
    shirt_title: Option<String>,
    /// Recompute the division order even when cached
    #[arg(long)]
    refresh_divisions: bool,
}

impl ProcessArgs {
    fn into_parts(self) -> anyhow::Result<(MeetConfig, RunOptions)> {
        let mut config = match &self.config {
            Some(path) => MeetConfig::load(path)?,
            None => {
                let source = self.source.ok_or_else(|| {
                    anyhow::anyhow!("--source is required when no --config is given")
                })?;
                MeetConfig {
                    state: String::new(),
                    meet_name: String::new(),
                    association: "USAG".to_string(),
                    source,
                    data: Vec::new(),
                    strip_parenthetical: false,
                    gym_map: None,
                    shirt_format: ShirtFormat::EventFirst,
                    shirt_title: None,
                }
            }
        };

        if let Some(state) = self.state {
            config.state = state;
        }
        if let Some(meet) = self.meet {
            config.meet_name = meet;
        }
        if let Some(source) = self.source {
            config.source = source;
        }
        if !self.data.is_empty() {
            config.data = self.data;
        }
        if let Some(association) = self.association {
            config.association = association;
        }
        if let Some(gym_map) = self.gym_map {
            config.gym_map = Some(gym_map);
        }
        if self.strip_parenthetical {
            config.strip_parenthetical = true;
        }
        if let Some(format) = self.shirt_format {
            config.shirt_format = format;
        }
        if let Some(title) = self.shirt_title {
            config.shirt_title = Some(title);
        }
        config.validate()?;

        let options = RunOptions {
            output_dir: self.output,
            db_path: self.db,
            refresh_divisions: self.refresh_divisions,
        };
        Ok((config, options))
    }
}

fn main() -> anyhow::Result<()> {
    logging::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Process(args) => run_process(args),
        Commands::Divisions {
            state,
            meet,
            output,
            db,
            refresh,
        } => run_divisions(state, meet, output, db, refresh),
        Commands::Clear {
            meet,
            output,
            db,
            yes,
        } => run_clear(meet, output, db, yes),
    }
}

fn run_process(args: ProcessArgs) -> anyhow::Result<()> {
    let (config, options) = args.into_parts()?;

    match Pipeline::run(&config, &options) {
        Ok(summary) => {
            println!("\n📊 Run summary for {}:", summary.meet_name);
            println!("   Athletes: {}", summary.athletes);
            println!(
                "   Unique gyms: {} ({} auto-merged, {} to review)",
                summary.unique_gyms, summary.auto_merged, summary.fuzzy_candidates
            );
            println!("   Divisions: {}", summary.divisions);
            println!("   Winner rows: {}", summary.winner_rows);
            for artifact in &summary.artifacts {
                println!("   Artifact: {artifact}");
            }
            println!("\nDone!");
            Ok(())
        }
        Err(e) => {
            error!("Pipeline failed: {e}");
            println!("❌ Processing failed: {e}");
            Err(e.into())
        }
    }
}

fn run_divisions(
    state: String,
    meet: String,
    output: PathBuf,
    db: Option<PathBuf>,
    refresh: bool,
) -> anyhow::Result<()> {
    let db_path = db.unwrap_or_else(|| output.join("meet_results.db"));
    let store = ResultsStore::open(&db_path)?;
    let divisions = store.distinct_divisions(&meet)?;

    let resolver =
        DivisionOrderResolver::new(Box::new(JsonDivisionStore::beside_database(&db_path)))
            .with_refresh(refresh);
    let order = resolver.resolve(&state, &divisions)?;

    println!("Division order for {state} ({} divisions):", order.len());
    let mut entries: Vec<(&String, &i64)> = order.iter().collect();
    entries.sort_by_key(|(_, position)| **position);
    for (label, position) in entries {
        println!("  {position:>2}. {label}");
    }
    Ok(())
}

fn run_clear(meet: String, output: PathBuf, db: Option<PathBuf>, yes: bool) -> anyhow::Result<()> {
    let db_path = db.unwrap_or_else(|| output.join("meet_results.db"));

    if !yes {
        println!(
            "⚠️  This will delete all rows for \"{meet}\" from {}",
            db_path.display()
        );
        println!("Press Enter to continue or Ctrl+C to cancel...");
        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
    }

    let mut store = ResultsStore::open(&db_path)?;
    let (results, winners) = store.clear_meet(&meet)?;
    println!("✅ Cleared {results} result rows and {winners} winner rows for \"{meet}\"");
    Ok(())
}
