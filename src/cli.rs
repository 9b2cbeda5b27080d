//! Command-line interface, built on clap.
//!
//! Defines the [`Cli`] struct with subcommands [`Command`] (run, status)
//! and global flags (--max-targets, --verbose).

use clap::{Parser, Subcommand};

/// autoapply — LLM-guided job-application automation.
#[derive(Debug, Parser)]
#[command(name = "autoapply", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Maximum number of targets to process this run.
    #[arg(long, global = true)]
    pub max_targets: Option<usize>,

    /// Enable verbose output.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Process a queue of job postings end to end.
    Run {
        /// Path to a JSON file listing job postings ({"url", "title"?} objects).
        #[arg(long)]
        jobs: String,

        /// Path to the tailored merged resume + cover letter file.
        #[arg(long)]
        resume: String,

        /// Path to the tailored cover-letter-only file.
        #[arg(long)]
        cover_letter: String,

        /// Path to a plain-text applicant profile given to the planner as context.
        #[arg(long)]
        profile: Option<String>,
    },

    /// Show the resolved configuration and credential status.
    Status,
}
