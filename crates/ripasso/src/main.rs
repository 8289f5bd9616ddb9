use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

mod config;
mod data;
mod db;
mod html;
mod plan;
mod progress;
mod types;
mod watch;

use config::{CliOverrides, EnvConfig, Settings};
use db::SqliteStore;
use progress::{ProgressTracker, Readiness};

#[derive(Parser, Debug)]
#[command(name = "ripasso")]
#[command(about = "Generate an exam timetable and daily study plan page")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output directory for generated files
    #[arg(short, long, default_value = ".", global = true)]
    output: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// JSON dataset to use instead of the built-in one [env: RIPASSO_DATA]
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Progress database [env: RIPASSO_DB, default: <output>/progress.db]
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// First day of the study plan (YYYY-MM-DD) [env: RIPASSO_START]
    #[arg(long, global = true)]
    start: Option<NaiveDate>,

    /// Stop planning before this date (YYYY-MM-DD) [env: RIPASSO_CUTOFF]
    #[arg(long, global = true, conflicts_with = "stop_at_first_exam")]
    cutoff: Option<NaiveDate>,

    /// Stop planning before the first exam
    #[arg(long, global = true)]
    stop_at_first_exam: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate the static HTML page (default)
    Build,

    /// Build, then rebuild whenever the dataset file changes
    Watch,

    /// Show the exam timetable
    Schedule,

    /// Show the generated study plan
    Plan,

    /// Mark a task done, or undo it
    Toggle {
        /// Task id, e.g. 2026-02-09-Math
        task_id: String,
    },

    /// Show readiness and how much of the plan has elapsed
    Progress,

    /// Forget all completed tasks
    Reset,

    /// Write the built-in dataset as JSON, ready for editing
    InitData {
        /// Destination file
        file: PathBuf,
    },
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .context("Invalid log level")?;

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_max_level(Level::TRACE)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(&args.log_level)?;

    let env = EnvConfig::from_env()?;
    let settings = Settings::resolve(
        CliOverrides {
            output: args.output,
            data_file: args.data,
            db_path: args.db,
            start: args.start,
            cutoff: args.cutoff,
            stop_at_first_exam: args.stop_at_first_exam,
        },
        env,
    );
    let today = Local::now().date_naive();

    match args.command {
        None | Some(Commands::Build) => {
            build_page(&settings, today)?;
        }
        Some(Commands::Watch) => {
            let data_file = settings
                .data_file
                .clone()
                .context("watch needs a dataset file (--data or RIPASSO_DATA)")?;
            build_page(&settings, today)?;
            // The date is re-read on every rebuild so a long watch rolls over midnight
            watch::watch_dataset(&data_file, || {
                build_page(&settings, Local::now().date_naive()).map(|_| ())
            })?;
        }
        Some(Commands::Schedule) => {
            let dataset = settings.dataset()?;
            info!(
                school = %dataset.school,
                title = %dataset.title,
                entries = dataset.schedule.len(),
                "Exam timetable"
            );
            for entry in &dataset.schedule {
                info!(
                    date = %entry.date,
                    day = %entry.day,
                    subject = %entry.subject,
                    kind = %entry.kind,
                    today = entry.date == today,
                    "{}",
                    entry.syllabus
                );
            }
        }
        Some(Commands::Plan) => {
            let dataset = settings.dataset()?;
            let days = plan::generate_plan(&dataset, &settings.plan_options(&dataset), today);
            let tracker = open_tracker(&settings)?;
            let record = tracker.load()?;

            info!(days = days.len(), cutoff = ?settings.cutoff, "Study plan");
            for day in &days {
                for task in &day.items {
                    info!(
                        date = %day.date,
                        status = day.status(),
                        id = %task.id,
                        done = record.get(&task.id).copied().unwrap_or(false),
                        exam = ?dataset.exam_for(&task.subject).map(|e| e.date),
                        "{}: {}",
                        task.subject,
                        task.topic
                    );
                }
            }
            log_readiness(Readiness::of(&days, &record));
        }
        Some(Commands::Toggle { task_id }) => {
            let dataset = settings.dataset()?;
            let days = plan::generate_plan(&dataset, &settings.plan_options(&dataset), today);
            let task = plan::find_task(&days, &task_id)
                .with_context(|| format!("No task {task_id:?} in the current plan"))?;

            let mut tracker = open_tracker(&settings)?;
            let completed = tracker.toggle(&task.id)?;
            info!(
                id = %task.id,
                subject = %task.subject,
                topic = %task.topic,
                completed,
                "Task updated"
            );
            log_readiness(tracker.readiness(&days)?);
        }
        Some(Commands::Progress) => {
            let dataset = settings.dataset()?;
            let days = plan::generate_plan(&dataset, &settings.plan_options(&dataset), today);
            let tracker = open_tracker(&settings)?;

            log_readiness(tracker.readiness(&days)?);
            if let Some(first) = days.first() {
                info!(
                    elapsed = plan::schedule_elapsed_percent(first.date, days.len(), today),
                    "Schedule elapsed (%)"
                );
            }
        }
        Some(Commands::Reset) => {
            let mut tracker = open_tracker(&settings)?;
            let cleared = tracker.clear()?;
            info!(cleared, "Progress reset");
        }
        Some(Commands::InitData { file }) => {
            data::save_dataset(&data::Dataset::builtin(), &file)?;
            info!(path = %file.display(), "Dataset written");
        }
    }

    Ok(())
}

fn open_tracker(settings: &Settings) -> Result<ProgressTracker<SqliteStore>> {
    let store = SqliteStore::open(&settings.db_path).with_context(|| {
        format!(
            "Failed to open progress database {}",
            settings.db_path.display()
        )
    })?;
    Ok(ProgressTracker::new(store))
}

/// Load everything fresh and write `index.html`. Returns the page path.
fn build_page(settings: &Settings, today: NaiveDate) -> Result<PathBuf> {
    let dataset = settings.dataset()?;
    let days = plan::generate_plan(&dataset, &settings.plan_options(&dataset), today);
    let record = open_tracker(settings)?.load()?;

    std::fs::create_dir_all(&settings.output).with_context(|| {
        format!(
            "Failed to create output directory {}",
            settings.output.display()
        )
    })?;
    let html_path = settings.html_path();
    html::generate_html(&dataset, &days, &record, today, &html_path)?;

    info!(
        path = %html_path.display(),
        days = days.len(),
        "HTML saved"
    );
    log_readiness(Readiness::of(&days, &record));
    Ok(html_path)
}

fn log_readiness(readiness: Readiness) {
    info!(
        completed = readiness.completed,
        total = readiness.total,
        percent = readiness.percent,
        "Readiness"
    );
}
