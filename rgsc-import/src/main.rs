//! rgsc-import - score import command line
//!
//! Seeds the chart catalog, imports JSON score batches, maintains personal
//! bests and manages sessions against the database in the root folder.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rgsc_common::config::{self, TomlConfig};
use rgsc_common::db::{init_database, set_setting};
use rgsc_common::{Game, Playtype};
use rgsc_import::{RawScore, ScoreImporter};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Command-line arguments for rgsc-import
#[derive(Parser, Debug)]
#[command(name = "rgsc-import")]
#[command(about = "Rhythm game score import and personal-best consolidation")]
#[command(version)]
struct Args {
    /// Root folder holding the database
    #[arg(short, long, env = "RGSC_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Config file (defaults to the platform config location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load songs-<game>.json / charts-<game>.json from a directory
    Seed { dir: PathBuf },

    /// Import a JSON array of raw scores
    Import {
        #[arg(short, long)]
        user: i64,
        #[arg(short, long)]
        session: Option<Uuid>,
        file: PathBuf,
    },

    /// Rebuild one personal best from stored scores
    Consolidate {
        #[arg(short, long)]
        user: i64,
        #[arg(long)]
        chart: String,
    },

    /// Re-consolidate every user's personal best on a chart
    Recalc {
        #[arg(long)]
        chart: String,
    },

    /// Delete a score and re-consolidate its personal best
    Delete { score_id: String },

    /// Show personal bests
    Pb {
        #[arg(short, long)]
        user: i64,
        #[arg(short, long)]
        game: Game,
        #[arg(short, long)]
        playtype: Playtype,
    },

    /// Session management
    #[command(subcommand)]
    Session(SessionCommand),
}

#[derive(Subcommand, Debug)]
enum SessionCommand {
    /// Open a new session
    Start {
        #[arg(short, long)]
        user: i64,
        #[arg(short, long)]
        game: Game,
        #[arg(short, long)]
        playtype: Playtype,
        #[arg(short, long, default_value = "Session")]
        name: String,
    },
    /// Close a session and compute its ratings
    End { session_id: Uuid },
    /// Show a session with its score deltas and raise breakdown
    Show { session_id: Uuid },
    /// List a user's sessions
    List {
        #[arg(short, long)]
        user: i64,
        #[arg(short, long)]
        game: Game,
        #[arg(short, long)]
        playtype: Playtype,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = match &args.config {
        Some(path) => TomlConfig::load(path)?,
        None => TomlConfig::load_or_default(),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| toml_config.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let root_folder = config::resolve_root_folder(args.root_folder.as_deref(), &toml_config);
    let db_path = config::database_path(&root_folder);
    info!("Database: {}", db_path.display());

    let db = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    if let Some(concurrency) = toml_config.import.batch_concurrency {
        set_setting(&db, "import_batch_concurrency", &concurrency.to_string()).await?;
    }
    if let Some(wait) = toml_config.import.max_lock_wait_ms {
        set_setting(&db, "db_max_lock_wait_ms", &wait.to_string()).await?;
    }

    let importer = ScoreImporter::new(db).await?;
    run(&importer, args.command).await
}

async fn run(importer: &ScoreImporter, command: Command) -> Result<()> {
    match command {
        Command::Seed { dir } => {
            let counts = importer.catalog().load_seeds(&dir).await?;
            println!("Loaded {} songs and {} charts", counts.songs, counts.charts);
        }
        Command::Import {
            user,
            session,
            file,
        } => {
            let raws = read_scores(&file).await?;
            let report = importer.import_batch(user, session, &raws).await;
            print_json(&report)?;
        }
        Command::Consolidate { user, chart } => {
            let pb = importer.consolidate(user, &chart).await?;
            print_json(&pb)?;
        }
        Command::Recalc { chart } => {
            let report = importer.recalculate_chart(&chart).await?;
            print_json(&report)?;
        }
        Command::Delete { score_id } => {
            let pb = importer.delete_score(&score_id).await?;
            print_json(&pb)?;
        }
        Command::Pb {
            user,
            game,
            playtype,
        } => {
            let pbs = importer.graded_personal_bests(user, game, playtype).await?;
            print_json(&pbs)?;
        }
        Command::Session(command) => run_session(importer, command).await?,
    }

    Ok(())
}

async fn run_session(importer: &ScoreImporter, command: SessionCommand) -> Result<()> {
    let sessions = importer.sessions();

    match command {
        SessionCommand::Start {
            user,
            game,
            playtype,
            name,
        } => {
            let session = sessions.create_session(user, game, playtype, &name).await?;
            print_json(&session)?;
        }
        SessionCommand::End { session_id } => {
            let session = sessions.end_session(session_id).await?;
            print_json(&session)?;
        }
        SessionCommand::Show { session_id } => {
            #[derive(Serialize)]
            #[serde(rename_all = "camelCase")]
            struct SessionView {
                session: rgsc_common::db::Session,
                score_info: Vec<rgsc_common::db::SessionScoreInfo>,
                raises: rgsc_import::session::RaiseBreakdown,
            }

            let view = SessionView {
                session: sessions.session(session_id).await?,
                score_info: sessions.score_info(session_id).await?,
                raises: sessions.raise_breakdown(session_id).await?,
            };
            print_json(&view)?;
        }
        SessionCommand::List {
            user,
            game,
            playtype,
        } => {
            let list = sessions.list_sessions(user, game, playtype).await?;
            print_json(&list)?;
        }
    }

    Ok(())
}

async fn read_scores(path: &Path) -> Result<Vec<RawScore>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid score file {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
