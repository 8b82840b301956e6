use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use hookpost::deliver::{Deliver, WebhookDispatcher};
use hookpost::jobs::store::JobStore;
use hookpost::jobs::types::{JobDraft, JobKind, JOB_CAPACITY, REMINDER_DELAY_SECS};
use hookpost::settings::{
    clamp_endpoint_index, endpoint_label, SettingsStore, QUICK_ACTION_SLOTS,
};
use hookpost::{compose, config, configure, jobs};
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hookpost", version, about = "hookpost CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler until interrupted
    Run,
    /// Edit endpoints and quick actions interactively
    Configure,
    /// Compose and deliver a message immediately
    Send {
        #[arg(long)]
        text: String,
        /// Countdown minutes embedded in the relative-timestamp token
        #[arg(long, default_value_t = 0)]
        min: i64,
        /// Countdown seconds embedded in the relative-timestamp token
        #[arg(long, default_value_t = 0)]
        sec: i64,
        /// Append a relative-timestamp token to the message
        #[arg(long)]
        timestamp: bool,
        /// Also schedule a +60s reminder echo of the message
        #[arg(long)]
        reminder: bool,
        /// Endpoint slot (1-5); defaults to the last one used
        #[arg(long)]
        endpoint: Option<usize>,
    },
    /// Fire a quick-action preset
    Quick {
        /// Preset number (1-9)
        index: usize,
    },
    Jobs {
        /// Manage scheduled messages
        #[command(subcommand)]
        command: JobsCommands,
    },
}

#[derive(Subcommand)]
enum JobsCommands {
    List,
    Status,
    Add {
        #[arg(long)]
        text: String,
        #[arg(long, default_value_t = 0)]
        hours: i64,
        #[arg(long, default_value_t = 0)]
        min: i64,
        #[arg(long, default_value_t = 10)]
        sec: i64,
        /// Endpoint slot (1-5); defaults to the last one used
        #[arg(long)]
        endpoint: Option<usize>,
    },
    Cancel {
        #[arg(long)]
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run().await,
        Commands::Configure => {
            let cfg = config::AppConfig::load()?;
            configure::run(&cfg.data_dir)
        }
        Commands::Send {
            text,
            min,
            sec,
            timestamp,
            reminder,
            endpoint,
        } => handle_send(text, min, sec, timestamp, reminder, endpoint).await,
        Commands::Quick { index } => handle_quick(index).await,
        Commands::Jobs { command } => handle_jobs(command).await,
    }
}

async fn run() -> Result<()> {
    let cfg = config::AppConfig::load()?;
    let dispatcher = Arc::new(WebhookDispatcher::new(cfg.request_timeout_secs)?);
    let (scheduler, _handle) = jobs::Scheduler::new(&cfg, dispatcher);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let loop_task = tokio::spawn(scheduler.run(shutdown_rx));

    tokio::signal::ctrl_c().await?;
    let _ = shutdown_tx.send(true);
    loop_task.await?;
    Ok(())
}

async fn handle_send(
    text: String,
    min: i64,
    sec: i64,
    timestamp: bool,
    reminder: bool,
    endpoint: Option<usize>,
) -> Result<()> {
    let cfg = config::AppConfig::load()?;
    let settings_store = SettingsStore::new(&cfg.data_dir);
    let settings = settings_store.load();

    let index = match endpoint {
        Some(n) => {
            let index = clamp_endpoint_index(n.saturating_sub(1));
            settings_store.save_last_index(index)?;
            index
        }
        None => settings.last_index,
    };
    let url = settings.endpoints[index].url.trim().to_string();
    if url.is_empty() {
        bail!(
            "{} is empty. Set it with `hookpost configure`.",
            endpoint_label(index, &settings.endpoints[index])
        );
    }

    let now = chrono::Utc::now().timestamp();
    let compiled =
        compose::compile_message(&text, compose::countdown_offset(min, sec), timestamp, now);
    if compiled.is_empty() {
        bail!("Nothing to send.");
    }

    let dispatcher = Arc::new(WebhookDispatcher::new(cfg.request_timeout_secs)?);
    match dispatcher.send(&url, &compiled).await {
        Ok(()) => println!("Sent."),
        // Surfaced verbatim, status and body included, so a bad endpoint is
        // debuggable from the terminal.
        Err(e) => println!("Send failed: {e}"),
    }

    // The reminder echo is scheduled regardless of the primary send's
    // outcome. The running scheduler picks it up from the shared table.
    if reminder && !text.trim().is_empty() {
        let (mut scheduler, _handle) = jobs::Scheduler::new(&cfg, dispatcher);
        match scheduler.create(JobDraft::reminder(text.trim(), index)) {
            Ok(job) => println!(
                "Reminder scheduled (+{REMINDER_DELAY_SECS}s, job {}).",
                job.id
            ),
            Err(e) => println!("Reminder not scheduled: {e}"),
        }
    }

    Ok(())
}

async fn handle_quick(index: usize) -> Result<()> {
    let cfg = config::AppConfig::load()?;
    let settings = SettingsStore::new(&cfg.data_dir).load();

    if !(1..=QUICK_ACTION_SLOTS).contains(&index) {
        bail!("Quick action must be between 1 and {QUICK_ACTION_SLOTS}.");
    }
    let action = &settings.quick_actions[index - 1];
    if action.message.is_empty() {
        bail!("Quick action {index} is not set.");
    }

    let endpoint_index = clamp_endpoint_index(action.endpoint_index);
    let url = settings.endpoints[endpoint_index].url.trim().to_string();
    if url.is_empty() {
        bail!(
            "{} is empty. Set it with `hookpost configure`.",
            endpoint_label(endpoint_index, &settings.endpoints[endpoint_index])
        );
    }

    let dispatcher = WebhookDispatcher::new(cfg.request_timeout_secs)?;
    match dispatcher.send(&url, &action.message).await {
        Ok(()) => println!("Quick action sent."),
        Err(e) => println!("Send failed: {e}"),
    }
    Ok(())
}

async fn handle_jobs(cmd: JobsCommands) -> Result<()> {
    let cfg = config::AppConfig::load()?;

    match cmd {
        JobsCommands::List => {
            let settings = SettingsStore::new(&cfg.data_dir).load();
            let mut store = JobStore::new(&cfg.data_dir);
            store.load();

            if store.jobs.is_empty() {
                println!("No scheduled jobs.");
            } else {
                let now = chrono::Utc::now().timestamp();
                println!(
                    "{:<10} {:<10} {:<14} {:<10} {}",
                    "ID", "Kind", "Endpoint", "Remaining", "Message"
                );
                println!("{:-<70}", "");
                for job in &store.jobs {
                    let index = clamp_endpoint_index(job.endpoint_index);
                    println!(
                        "{:<10} {:<10} {:<14} {:<10} {}",
                        job.id,
                        match job.kind {
                            JobKind::Scheduled => "scheduled",
                            JobKind::Reminder => "reminder",
                        },
                        endpoint_label(index, &settings.endpoints[index]),
                        format!("{}s", job.remaining_secs(now)),
                        job.text
                    );
                }
                println!("{}/{JOB_CAPACITY}", store.jobs.len());
            }
        }
        JobsCommands::Status => {
            let mut store = JobStore::new(&cfg.data_dir);
            store.load();
            let next = store
                .jobs
                .first()
                .map(|job| {
                    chrono::DateTime::<chrono::Utc>::from(
                        std::time::UNIX_EPOCH
                            + std::time::Duration::from_secs(job.send_at.max(0) as u64),
                    )
                    .to_rfc3339()
                })
                .unwrap_or_else(|| "N/A".to_string());
            println!("Jobs: {}/{JOB_CAPACITY}", store.jobs.len());
            println!("Next fire: {next}");
        }
        JobsCommands::Add {
            text,
            hours,
            min,
            sec,
            endpoint,
        } => {
            let settings = SettingsStore::new(&cfg.data_dir).load();
            let index = endpoint
                .map(|n| clamp_endpoint_index(n.saturating_sub(1)))
                .unwrap_or(settings.last_index);

            // A live network client is not needed to mutate the store; the
            // running scheduler picks the job up from the shared table.
            let dispatcher = Arc::new(WebhookDispatcher::new(cfg.request_timeout_secs)?);
            let (mut scheduler, _handle) = jobs::Scheduler::new(&cfg, dispatcher);
            let draft = JobDraft {
                text,
                endpoint_index: index,
                kind: JobKind::Scheduled,
                delay_secs: compose::schedule_delay(hours, min, sec),
            };
            match scheduler.create(draft) {
                Ok(job) => println!(
                    "Scheduled job {} (fires in {}s).",
                    job.id,
                    job.remaining_secs(chrono::Utc::now().timestamp())
                ),
                Err(e) => println!("{e}"),
            }
        }
        JobsCommands::Cancel { id } => {
            let dispatcher = Arc::new(WebhookDispatcher::new(cfg.request_timeout_secs)?);
            let (mut scheduler, _handle) = jobs::Scheduler::new(&cfg, dispatcher);
            scheduler.cancel(&id);
            println!("Canceled.");
        }
    }
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
