//! rxtriage CLI - drives the triage core against a live backend.
//!
//! Each subcommand builds a [`TriageStore`] over [`HttpBackend`], runs one
//! operation through it and prints the result as JSON on stdout. Mutation
//! notifications go to stderr. A rejected operation exits non-zero.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use rxtriage_client::{HttpBackend, LookupResource, LookupSource};
use rxtriage_core::TriageConfig;
use rxtriage_engine::{ActionOutcome, MessageBackend, TriageStore};
use rxtriage_types::{
    CancelPayload, CountBucket, MessageId, MessagePage, PatientId, RequestId, TabId,
};

#[derive(Parser)]
#[command(name = "rxtriage")]
#[command(about = "Triage e-prescription messages from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh every tab badge count
    Counts,
    /// Fetch one tab
    List {
        /// Tab id, e.g. pending, refillRequest, history
        tab: TabId,
        /// Restrict to the last N days (0, 5, 10 or 30)
        #[arg(long)]
        days: Option<u32>,
    },
    /// Approve a pending message
    Approve { id: u64 },
    /// Deny a pending message
    Deny { id: u64 },
    /// Cancel a message
    Cancel {
        id: u64,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        note: Option<String>,
    },
    /// Mark an errored request as reviewed
    Review {
        request_id: u64,
        /// Clear the reviewed flag instead
        #[arg(long)]
        undo: bool,
    },
    /// Clear every message in a tab, or every message for one patient
    Clear {
        #[arg(required_unless_present = "patient")]
        tab: Option<TabId>,
        #[arg(long, conflicts_with = "tab")]
        patient: Option<u64>,
    },
    /// Delete a message
    Delete { id: u64 },
    /// Autocomplete lookup (patients, pharmacies, allergies, diagnoses, drugs)
    Lookup {
        resource: LookupResource,
        query: String,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // stdout carries JSON; without a log file, logs go nowhere.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file() -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new().create(true).append(true).open(&candidate) {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.rxtriage/logs/rxtriage.log
    if let Some(config_path) = TriageConfig::path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("rxtriage.log"));
    }

    candidates.push(PathBuf::from(".rxtriage").join("logs").join("rxtriage.log"));

    candidates
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report_page(outcome: ActionOutcome<MessagePage>) -> Result<ExitCode> {
    match outcome {
        ActionOutcome::Fulfilled(page) | ActionOutcome::Superseded(Ok(page)) => {
            print_json(&page)?;
            Ok(ExitCode::SUCCESS)
        }
        other => {
            eprintln!(
                "Error: {}",
                other.error().unwrap_or("failed to load messages")
            );
            Ok(ExitCode::FAILURE)
        }
    }
}

fn report_mutation<B: MessageBackend>(store: &TriageStore<B>, applied: bool) -> ExitCode {
    for notification in store.take_notifications() {
        eprintln!("{}", notification.format());
    }
    if applied {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn run(command: Commands, config: &TriageConfig) -> Result<ExitCode> {
    let backend = HttpBackend::from_config(config)?;
    let store = TriageStore::from_config(backend.clone(), config);
    let queue = store.queue();

    let code = match command {
        Commands::Counts => {
            let counts = queue.refresh_counts().await;
            let by_bucket: Map<String, Value> = CountBucket::ALL
                .into_iter()
                .map(|bucket| (bucket.as_str().to_string(), counts.get(bucket).into()))
                .collect();
            print_json(&by_bucket)?;
            ExitCode::SUCCESS
        }
        Commands::List { tab, days } => match days {
            Some(days) => report_page(queue.set_time_frame(tab, days).await?)?,
            None => report_page(queue.select_tab(tab).await)?,
        },
        Commands::Approve { id } => {
            let applied = queue.approve(MessageId::new(id)).await;
            report_mutation(&store, applied)
        }
        Commands::Deny { id } => {
            let applied = queue.deny(MessageId::new(id)).await;
            report_mutation(&store, applied)
        }
        Commands::Cancel { id, reason, note } => {
            let applied = queue
                .cancel(MessageId::new(id), CancelPayload { reason, note })
                .await;
            report_mutation(&store, applied)
        }
        Commands::Review { request_id, undo } => {
            let applied = queue.mark_reviewed(RequestId::new(request_id), !undo).await;
            report_mutation(&store, applied)
        }
        Commands::Clear { tab, patient } => {
            let applied = match (tab, patient) {
                (_, Some(patient)) => queue.clear_all_for_patient(PatientId::new(patient)).await,
                (Some(tab), None) => queue.clear_all_in_tab(tab).await,
                (None, None) => bail!("either a tab or --patient is required"),
            };
            report_mutation(&store, applied)
        }
        Commands::Delete { id } => {
            let applied = queue.delete(MessageId::new(id)).await;
            report_mutation(&store, applied)
        }
        Commands::Lookup { resource, query } => {
            let mut lookup = store.autocomplete(
                resource.as_str(),
                LookupSource::new(backend, resource),
            );
            lookup.input(query);
            lookup.settle().await;
            match lookup.error() {
                Some(error) => {
                    eprintln!("Error: {error}");
                    ExitCode::FAILURE
                }
                None => {
                    print_json(&lookup.results())?;
                    ExitCode::SUCCESS
                }
            }
        }
    };

    Ok(code)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();

    let cli = Cli::parse();
    let config = TriageConfig::load()
        .context("loading ~/.rxtriage/config.toml")?
        .unwrap_or_default();

    run(cli.command, &config).await
}
