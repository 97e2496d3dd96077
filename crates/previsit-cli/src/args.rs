//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Previsit interview simulator
#[derive(Debug, Parser)]
#[command(name = "previsit", version, about)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a simulated pre-visit interview
    Interview(InterviewArgs),

    /// Inspect or manage the response cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Evaluate a finished report against the de-facto condition
    Evaluate(EvaluateArgs),
}

#[derive(Debug, Args)]
pub struct InterviewArgs {
    /// Full name of the patient to interview
    #[arg(long)]
    pub patient: String,

    /// Condition driving the roleplayed symptoms
    #[arg(long)]
    pub condition: String,

    /// Path to the patient roster fixture
    #[arg(long, default_value = "fixtures/patients.json")]
    pub patients_file: PathBuf,

    /// Path to the symptom catalog fixture
    #[arg(long, default_value = "fixtures/symptoms.json")]
    pub symptoms_file: PathBuf,

    /// Override the configured history-entry cap
    #[arg(long)]
    pub turns: Option<usize>,
}

#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Print hit/miss counters, entry count, and on-disk size
    Stats,

    /// Delete cached entries and reset counters
    Clear {
        /// Restrict the clear to one bucket
        #[arg(long, value_enum)]
        bucket: Option<BucketArg>,
    },

    /// Export the whole store as a compressed snapshot
    Export {
        /// Copy the snapshot to this path instead of leaving it in the
        /// OS temp directory
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Restore a previously exported snapshot into the store
    Import {
        /// Snapshot archive to restore
        path: PathBuf,
    },
}

#[derive(Debug, Args)]
pub struct EvaluateArgs {
    /// Path to the report markdown file
    #[arg(long)]
    pub report: PathBuf,

    /// The de-facto diagnosed condition
    #[arg(long)]
    pub condition: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BucketArg {
    Text,
    Audio,
}

impl From<BucketArg> for previsit_core::Bucket {
    fn from(bucket: BucketArg) -> Self {
        match bucket {
            BucketArg::Text => previsit_core::Bucket::Text,
            BucketArg::Audio => previsit_core::Bucket::Audio,
        }
    }
}
