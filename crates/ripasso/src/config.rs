//! Configuration from environment variables and command-line overrides.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::PathBuf;

use crate::data::{resolve_dataset, Dataset};
use crate::plan::{Cutoff, PlanOptions};

/// Default location of the progress database, relative to the output directory
pub const DEFAULT_DB_FILE: &str = "progress.db";

/// Settings that can come from the environment or a `.env` file.
/// Command-line flags take precedence over every field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    /// `RIPASSO_DATA`: JSON dataset replacing the built-in one
    pub data_file: Option<PathBuf>,

    /// `RIPASSO_DB`: progress database path
    pub db_path: Option<PathBuf>,

    /// `RIPASSO_START`: first day of the plan
    pub start: Option<NaiveDate>,

    /// `RIPASSO_CUTOFF`: date the plan must stop before
    pub cutoff: Option<NaiveDate>,
}

impl EnvConfig {
    /// Load settings from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            data_file: non_empty("RIPASSO_DATA").map(PathBuf::from),
            db_path: non_empty("RIPASSO_DB").map(PathBuf::from),
            start: non_empty("RIPASSO_START")
                .map(|v| parse_date(&v).context("RIPASSO_START is not a valid date"))
                .transpose()?,
            cutoff: non_empty("RIPASSO_CUTOFF")
                .map(|v| parse_date(&v).context("RIPASSO_CUTOFF is not a valid date"))
                .transpose()?,
        })
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub output: PathBuf,
    pub data_file: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub start: Option<NaiveDate>,
    pub cutoff: Option<NaiveDate>,
    pub stop_at_first_exam: bool,
}

/// Effective settings: command line first, then environment, then defaults
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub output: PathBuf,
    pub data_file: Option<PathBuf>,
    pub db_path: PathBuf,
    pub start: Option<NaiveDate>,
    pub cutoff: Cutoff,
}

impl Settings {
    pub fn resolve(cli: CliOverrides, env: EnvConfig) -> Self {
        let db_path = cli
            .db_path
            .or(env.db_path)
            .unwrap_or_else(|| cli.output.join(DEFAULT_DB_FILE));

        let cutoff = if cli.stop_at_first_exam {
            Cutoff::FirstExam
        } else {
            cli.cutoff.or(env.cutoff).map_or(Cutoff::None, Cutoff::Date)
        };

        Self {
            output: cli.output,
            data_file: cli.data_file.or(env.data_file),
            db_path,
            start: cli.start.or(env.start),
            cutoff,
        }
    }

    /// Load the configured dataset, re-reading the file on every call
    pub fn dataset(&self) -> Result<Dataset> {
        let dataset = resolve_dataset(self.data_file.as_deref())?;
        Ok(dataset)
    }

    pub fn plan_options(&self, dataset: &Dataset) -> PlanOptions {
        PlanOptions {
            start: self.start.unwrap_or(dataset.plan_start),
            cutoff: self.cutoff,
        }
    }

    pub fn html_path(&self) -> PathBuf {
        self.output.join("index.html")
    }
}

/// Parse a YYYY-MM-DD date
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .with_context(|| format!("expected YYYY-MM-DD, got {value:?}"))
}
