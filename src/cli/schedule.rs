//! Scheduled backup CLI commands

use chrono::Utc;
use clap::Subcommand;
use tokio::sync::watch;
use tracing::info;

use crate::backup::{AppLifecycle, BackupFrequency, BackupMethod, ScheduledRun};
use crate::error::{InoutError, InoutResult};

use super::Context;

/// Schedule subcommands
#[derive(Subcommand)]
pub enum ScheduleCommands {
    /// Turn scheduled backups on
    Enable {
        /// daily, weekly or monthly
        #[arg(short, long, default_value = "weekly")]
        frequency: String,
        /// cloud, share or both
        #[arg(short, long, default_value = "cloud")]
        method: String,
    },

    /// Turn scheduled backups off
    Disable,

    /// Change how often backups run
    Frequency {
        /// daily, weekly or monthly
        frequency: String,
    },

    /// Show the schedule and its state
    Status,

    /// Back up now, whether due or not
    Now,

    /// Keep checking the schedule until interrupted
    Run {
        /// Check once and exit
        #[arg(long)]
        once: bool,
    },
}

fn parse_frequency(value: &str) -> InoutResult<BackupFrequency> {
    BackupFrequency::parse(value).ok_or_else(|| {
        InoutError::Validation(format!(
            "Invalid frequency: '{}'. Use daily, weekly or monthly",
            value
        ))
    })
}

fn print_run(run: ScheduledRun) -> InoutResult<()> {
    match run {
        ScheduledRun::Skipped => println!("No backup due."),
        ScheduledRun::Completed { note: None } => println!("Backup completed."),
        ScheduledRun::Completed { note: Some(note) } => {
            println!("Backup completed.");
            println!("  {}", note);
        }
        ScheduledRun::Failed(reason) => return Err(InoutError::Transport(reason)),
    }
    Ok(())
}

/// Handle a schedule command
pub async fn handle_schedule_command(ctx: &Context, cmd: ScheduleCommands) -> InoutResult<()> {
    let scheduler = ctx.scheduler()?;

    match cmd {
        ScheduleCommands::Enable { frequency, method } => {
            let frequency = parse_frequency(&frequency)?;
            let method = BackupMethod::parse(&method).ok_or_else(|| {
                InoutError::Validation(format!(
                    "Invalid method: '{}'. Use cloud, share or both",
                    method
                ))
            })?;

            let settings = scheduler.enable(frequency, method, Utc::now()).await?;
            println!("Scheduled backups enabled ({}, {})", settings.frequency, settings.method);
            if let Some(next) = settings.next_backup_date {
                println!("  Next backup: {}", next.format("%Y-%m-%d %H:%M UTC"));
            }
        }

        ScheduleCommands::Disable => {
            scheduler.disable().await?;
            println!("Scheduled backups disabled.");
        }

        ScheduleCommands::Frequency { frequency } => {
            let settings = scheduler
                .update_frequency(parse_frequency(&frequency)?, Utc::now())
                .await?;
            println!("Backup frequency set to {}", settings.frequency);
        }

        ScheduleCommands::Status => {
            let now = Utc::now();
            let settings = scheduler.settings().await?;
            let state = scheduler.status(now).await?;

            println!("Scheduled Backups");
            println!("=================");
            println!("Enabled:   {}", if settings.enabled { "Yes" } else { "No" });
            println!("Frequency: {}", settings.frequency);
            println!("Method:    {}", settings.method);
            println!("State:     {}", state);
            if let Some(last) = settings.last_backup_date {
                println!("Last:      {}", last.format("%Y-%m-%d %H:%M UTC"));
            }
            if let Some(next) = settings.next_backup_date {
                println!("Next:      {}", next.format("%Y-%m-%d %H:%M UTC"));
            }
            if let Some(error) = &settings.last_error {
                println!("Note:      {}", error);
            }
        }

        ScheduleCommands::Now => {
            print_run(scheduler.trigger_manual(Utc::now()).await?)?;
        }

        ScheduleCommands::Run { once } => {
            if once {
                return print_run(scheduler.perform(Utc::now(), false).await?);
            }

            if !scheduler.settings().await?.enabled {
                return Err(InoutError::Config("Scheduled backup is not enabled".into()));
            }

            // A terminal process counts as always in the foreground
            let (_lifecycle, receiver) = watch::channel(AppLifecycle::Foreground);
            info!(
                poll_secs = ctx.settings.scheduler_poll_secs,
                "scheduler running, press Ctrl-C to stop"
            );
            scheduler
                .run(receiver, async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await;
            println!("Scheduler stopped.");
        }
    }

    Ok(())
}
