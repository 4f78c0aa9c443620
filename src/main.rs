// 🧰 Ledger Sync CLI
// Annotate parsed statement imports and inspect/resolve the offline action queue

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use ledger_sync::{
    annotate_batch, calculate_fee_total, calculate_total_spending, group_by_canonical_category,
    load_csv, logging, partition_new, ActionQueue, AppConfig, ImportContext, QueuedAction,
    SqliteStore,
};

#[derive(Parser)]
#[command(name = "ledger-sync", version, about = "Transaction import annotation and offline action queue")]
struct Cli {
    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database holding the action queue (overrides config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Annotate a CSV of parsed transactions and print them as JSON lines
    Annotate {
        csv: PathBuf,

        #[arg(long)]
        user: String,

        #[arg(long)]
        batch: String,

        /// File of already-imported dedup hashes, one per line
        #[arg(long)]
        known: Option<PathBuf>,
    },

    /// Inspect or resolve the offline action queue
    Queue {
        #[command(subcommand)]
        command: QueueCommand,
    },
}

#[derive(Subcommand)]
enum QueueCommand {
    /// Every pending action
    List,
    /// Actions that exhausted their retries
    Failed,
    /// Drop every action
    Clear,
    /// Drop quarantined actions only
    ClearFailed,
    /// Drop one action
    Remove { id: String },
    /// Reset one action's retry count
    Retry { id: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    if let Some(db) = cli.db {
        config.database_path = db;
    }

    logging::init(&config.log_level)?;

    match cli.command {
        Command::Annotate {
            csv,
            user,
            batch,
            known,
        } => run_annotate(&csv, &user, &batch, known.as_deref()),
        Command::Queue { command } => run_queue(&config, command),
    }
}

fn run_annotate(
    csv: &std::path::Path,
    user: &str,
    batch: &str,
    known: Option<&std::path::Path>,
) -> Result<()> {
    let ctx = ImportContext::new(user, batch)?;
    let transactions = load_csv(csv)?;
    let annotated = annotate_batch(&ctx, transactions)?;

    let known_hashes: HashSet<String> = match known {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read known hashes: {:?}", path))?
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
        None => HashSet::new(),
    };

    let total = annotated.len();
    let (fresh, duplicates) = partition_new(&known_hashes, annotated);

    for tx in &fresh {
        println!("{}", serde_json::to_string(tx)?);
    }

    eprintln!("✓ Annotated: {} transactions", total);
    eprintln!("✓ New: {}", fresh.len());
    eprintln!("✓ Skipped duplicates: {}", duplicates.len());
    for dup in &duplicates {
        eprintln!("   line {}: {}", dup.duplicate_index + 1, dup.reason);
    }
    eprintln!("✓ Total spend: {}", calculate_total_spending(&fresh));
    eprintln!("✓ Fees & interest: {}", calculate_fee_total(&fresh));
    for (category, amount) in group_by_canonical_category(&fresh) {
        eprintln!("   {:<32} {}", category.as_str(), amount);
    }

    Ok(())
}

fn run_queue(config: &AppConfig, command: QueueCommand) -> Result<()> {
    let store = SqliteStore::open(&config.database_path)?;
    let queue = ActionQueue::new(store, config.queue.clone());

    match command {
        QueueCommand::List => print_actions(&queue.pending_actions()?, config.queue.max_retries)?,
        QueueCommand::Failed => print_actions(&queue.get_failed_actions()?, config.queue.max_retries)?,
        QueueCommand::Clear => {
            queue.clear_queue()?;
            println!("✓ Queue cleared");
        }
        QueueCommand::ClearFailed => {
            let cleared = queue.clear_failed_actions()?;
            println!("✓ Cleared {} failed actions", cleared);
        }
        QueueCommand::Remove { id } => {
            if queue.remove_action(&id)? {
                println!("✓ Removed {}", id);
            } else {
                println!("✗ No queued action {}", id);
            }
        }
        QueueCommand::Retry { id } => {
            if queue.retry_action(&id)? {
                println!("✓ {} will be retried on the next drain", id);
            } else {
                println!("✗ No queued action {}", id);
            }
        }
    }

    Ok(())
}

fn print_actions(actions: &[QueuedAction], max_retries: u32) -> Result<()> {
    if actions.is_empty() {
        println!("(empty)");
        return Ok(());
    }

    for action in actions {
        let marker = if action.is_exhausted(max_retries) { "✗" } else { "•" };
        println!(
            "{} {}  {:<18} retries={}/{}  {}",
            marker,
            action.id,
            action.action.kind(),
            action.retry_count,
            max_retries,
            action.enqueued_at.to_rfc3339()
        );
    }

    Ok(())
}
