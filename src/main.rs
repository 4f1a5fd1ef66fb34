use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use inout::cli::{
    handle_account_command, handle_backup_command, handle_budget_command,
    handle_category_command, handle_cloud_command, handle_export_command, handle_import_command,
    handle_query_command, handle_report_command, handle_schedule_command,
    handle_transaction_command, Context,
};
use inout::config::{InoutPaths, Settings};

#[derive(Parser)]
#[command(
    name = "inout",
    version,
    about = "Local-first personal finance ledger",
    long_about = "In & Out keeps accounts, categories, transactions and budgets in a \
                  local document store. It exports to CSV and JSON, restores from \
                  backups, and can ship scheduled backups to a share outbox or a \
                  cloud drive."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Account management commands
    #[command(subcommand)]
    Account(inout::cli::AccountCommands),

    /// Category management commands
    #[command(subcommand)]
    Category(inout::cli::CategoryCommands),

    /// Budget management commands
    #[command(subcommand)]
    Budget(inout::cli::BudgetCommands),

    /// Transaction management commands
    #[command(subcommand, alias = "txn")]
    Transaction(inout::cli::TransactionCommands),

    /// Export data
    #[command(subcommand)]
    Export(inout::cli::ExportCommands),

    /// Import data
    #[command(subcommand)]
    Import(inout::cli::ImportCommands),

    /// Backup management commands
    #[command(subcommand)]
    Backup(inout::cli::BackupCommands),

    /// Cloud drive commands
    #[command(subcommand)]
    Cloud(inout::cli::CloudCommands),

    /// Scheduled backup commands
    #[command(subcommand)]
    Schedule(inout::cli::ScheduleCommands),

    /// Generate reports
    #[command(subcommand)]
    Report(inout::cli::ReportCommands),

    /// Send a raw request to the query layer
    Query(inout::cli::QueryArgs),

    /// Initialize the ledger with starter accounts and categories
    Init,

    /// Show current configuration and paths
    Config,

    /// Erase all data and reinstall the defaults
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("INOUT_LOG")
        .unwrap_or_else(|_| EnvFilter::new("inout=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    // Initialize paths and settings
    let paths = InoutPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;
    let ctx = Context::open(paths, settings)?;

    match cli.command {
        Some(Commands::Account(cmd)) => handle_account_command(&ctx, cmd).await?,
        Some(Commands::Category(cmd)) => handle_category_command(&ctx, cmd).await?,
        Some(Commands::Budget(cmd)) => handle_budget_command(&ctx, cmd).await?,
        Some(Commands::Transaction(cmd)) => handle_transaction_command(&ctx, cmd).await?,
        Some(Commands::Export(cmd)) => handle_export_command(&ctx, cmd).await?,
        Some(Commands::Import(cmd)) => handle_import_command(&ctx, cmd).await?,
        Some(Commands::Backup(cmd)) => handle_backup_command(&ctx, cmd).await?,
        Some(Commands::Cloud(cmd)) => handle_cloud_command(&ctx, cmd).await?,
        Some(Commands::Schedule(cmd)) => handle_schedule_command(&ctx, cmd).await?,
        Some(Commands::Report(cmd)) => handle_report_command(&ctx, cmd).await?,
        Some(Commands::Query(args)) => handle_query_command(&ctx, args).await?,
        Some(Commands::Init) => {
            println!("Initializing In & Out at: {}", ctx.paths.base_dir().display());
            if ctx.storage.is_initialized().await? {
                println!("Already initialized. Use 'inout reset --force' to start over.");
                return Ok(());
            }
            let store = ctx.store();
            store.save(store.load().await).await?;
            ctx.settings.save(&ctx.paths)?;

            let stats = store.stats().await?;
            println!("Initialization complete!");
            println!();
            println!(
                "Created {} starter accounts and {} categories.",
                stats.accounts, stats.categories
            );
            println!();
            println!("Run 'inout account list' to see your accounts.");
        }
        Some(Commands::Config) => {
            let stats = ctx.store().stats().await?;
            println!("In & Out Configuration");
            println!("======================");
            println!("Data directory:   {}", ctx.paths.base_dir().display());
            println!("Store directory:  {}", ctx.paths.store_dir().display());
            println!("Export directory: {}", ctx.paths.export_dir().display());
            println!("Share outbox:     {}", ctx.settings.outbox_dir(&ctx.paths).display());
            println!();
            println!("Settings:");
            println!("  Currency:          {}", ctx.settings.currency_code);
            println!("  Period start day:  {}", ctx.settings.period_start_day);
            println!("  Store timeout:     {} ms", ctx.settings.store_timeout_ms);
            println!("  Request timeout:   {} ms", ctx.settings.request_timeout_ms);
            println!("  Scheduler poll:    {} s", ctx.settings.scheduler_poll_secs);
            println!();
            println!("Data:");
            println!("  Accounts:     {}", stats.accounts);
            println!("  Categories:   {}", stats.categories);
            println!("  Transactions: {}", stats.transactions);
            println!("  Budgets:      {}", stats.budgets);
            println!("  Attachments:  {}", stats.attachments);
            println!("  Size:         {} bytes", stats.size_bytes);
        }
        Some(Commands::Reset { force }) => {
            if !force {
                println!("WARNING: This will erase ALL data!");
                println!("To proceed, run again with --force flag:");
                println!("  inout reset --force");
                return Ok(());
            }
            ctx.store().reset().await?;
            println!("All data erased. Default accounts and categories restored.");
        }
        None => {
            println!("In & Out - local-first personal finance ledger");
            println!();
            println!("Run 'inout --help' for usage information.");
            println!("Run 'inout init' to get started.");
        }
    }

    Ok(())
}
