mod browser;
mod cli;
mod config;
mod error;
mod executor;
mod flow;
mod plan;
mod planner;
mod queue;
mod snapshot;
mod ui;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio::sync::watch;

use browser::webdriver::WebDriverSession;
use cli::{Cli, Command};
use config::AutoApplyConfig;
use flow::{FlowLimits, Intervention, parse_jobs};
use plan::DocumentSet;
use planner::GeminiPlanner;
use queue::QueueRunner;
use ui::RunProgress;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AutoApplyConfig::load()?;
    if let Some(max) = cli.max_targets {
        config.max_targets = max;
    }

    match cli.command {
        Command::Run {
            jobs,
            resume,
            cover_letter,
            profile,
        } => run(config, jobs, resume, cover_letter, profile, cli.verbose).await,
        Command::Status => {
            status(&config);
            Ok(())
        }
    }
}

async fn run(
    config: AutoApplyConfig,
    jobs: String,
    resume: String,
    cover_letter: String,
    profile: Option<String>,
    verbose: bool,
) -> Result<()> {
    if config.api_key.is_empty() {
        bail!("No Gemini API key configured. Set GEMINI_API_KEY or api_key in autoapply.toml");
    }

    let jobs_json =
        std::fs::read_to_string(&jobs).with_context(|| format!("reading jobs file {jobs}"))?;
    let mut targets = parse_jobs(&jobs_json, &jobs)?;

    let docs = DocumentSet {
        merged_resume: PathBuf::from(resume),
        cover_letter: PathBuf::from(cover_letter),
    };
    let profile_text = match profile {
        Some(path) => Some(
            std::fs::read_to_string(&path)
                .with_context(|| format!("reading profile file {path}"))?,
        ),
        None => None,
    };

    if verbose {
        eprintln!(
            "Loaded {} target(s), processing at most {}",
            targets.len(),
            config.max_targets
        );
    }

    let planner = GeminiPlanner::new(config.api_key.clone(), config.model.clone());
    let mut session = WebDriverSession::connect(&config.webdriver_url)
        .await
        .with_context(|| format!("connecting to WebDriver at {}", config.webdriver_url))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nShutdown requested, finishing current action...");
            let _ = shutdown_tx.send(true);
        }
    });

    // Security challenges are resolved by the operator in the browser itself;
    // the flow controller's page polling notices the challenge clearing. The
    // sender is kept alive so the suspension loop keeps its signal path.
    let (_intervention_tx, intervention_rx) = watch::channel(Intervention::Pending);

    let progress = RunProgress::start();
    let runner = QueueRunner::new(
        &mut session,
        &planner,
        &docs,
        profile_text,
        FlowLimits::from_config(&config),
        config.max_targets,
        intervention_rx,
        shutdown_rx,
        Some(&progress),
    );
    let summary = runner.run(&mut targets).await;
    progress.print_summary(&summary);
    Ok(())
}

fn status(config: &AutoApplyConfig) {
    println!("model:                    {}", config.model);
    println!("webdriver_url:            {}", config.webdriver_url);
    println!("max_cycles:               {}", config.max_cycles);
    println!("max_consecutive_failures: {}", config.max_consecutive_failures);
    println!("max_targets:              {}", config.max_targets);
    println!("poll_interval_secs:       {}", config.poll_interval_secs);
    println!(
        "api_key:                  {}",
        if config.api_key.is_empty() {
            "missing (set GEMINI_API_KEY)"
        } else {
            "configured"
        }
    );
}
