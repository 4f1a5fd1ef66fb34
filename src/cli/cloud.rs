//! Cloud drive CLI commands

use chrono::{Duration, Utc};
use clap::Subcommand;

use crate::error::{InoutError, InoutResult};
use crate::transport::{AuthProvider, AuthTokens, CloudUser, StoredAuth};

use super::Context;

/// Cloud subcommands
#[derive(Subcommand)]
pub enum CloudCommands {
    /// Store an access token for the cloud drive
    #[command(alias = "login")]
    Signin {
        /// Account email
        #[arg(short, long)]
        email: String,
        /// OAuth access token
        #[arg(short, long, env = "INOUT_CLOUD_TOKEN")]
        token: String,
        /// Display name
        #[arg(short, long)]
        name: Option<String>,
        /// Token lifetime in minutes; omit for no expiry
        #[arg(long)]
        expires_in: Option<i64>,
    },

    /// Forget the stored token
    #[command(alias = "logout")]
    Signout,

    /// Show who is signed in
    Status,

    /// Create a backup and upload it
    Upload,

    /// List backups in the drive
    List,

    /// Download a backup and restore it over the ledger
    Restore {
        /// Cloud file ID
        id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Delete a backup from the drive
    Delete {
        /// Cloud file ID
        id: String,
    },
}

/// Handle a cloud command
pub async fn handle_cloud_command(ctx: &Context, cmd: CloudCommands) -> InoutResult<()> {
    match cmd {
        CloudCommands::Signin {
            email,
            token,
            name,
            expires_in,
        } => {
            if token.trim().is_empty() {
                return Err(InoutError::Validation("Access token cannot be empty".into()));
            }
            let credentials = StoredAuth {
                user: CloudUser {
                    id: email.clone(),
                    email,
                    name,
                },
                tokens: AuthTokens {
                    access_token: token.trim().to_string(),
                    expires_at: expires_in.map(|m| Utc::now() + Duration::minutes(m)),
                },
            };
            let user = ctx.auth().with_credentials(credentials).sign_in().await?;
            println!("Signed in as {}", user.email);
        }

        CloudCommands::Signout => {
            ctx.auth().sign_out().await?;
            println!("Signed out of cloud storage.");
        }

        CloudCommands::Status => {
            let auth = ctx.auth();
            match auth.current_user().await? {
                Some(user) => {
                    println!("Signed in as {}", user.email);
                    if let Some(name) = &user.name {
                        println!("  Name: {}", name);
                    }
                    if auth.get_tokens().await.is_err() {
                        println!("  Token expired. Sign in again to upload.");
                    }
                }
                None => println!("Not signed in."),
            }
        }

        CloudCommands::Upload => {
            let client = ctx.cloud()?;
            client.auth().get_tokens().await?;

            let file = ctx.backups().create_backup(Utc::now()).await?;
            let uploaded = client.upload(&file).await?;
            println!("Uploaded backup: {}", uploaded.name);
            println!("  ID: {}", uploaded.id);
        }

        CloudCommands::List => {
            let files = ctx.cloud()?.list().await?;
            if files.is_empty() {
                println!("No cloud backups found.");
                return Ok(());
            }
            for file in &files {
                let modified = file
                    .modified_time
                    .or(file.created_time)
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!(
                    "{:<40} {:<16} {:>10}  {}",
                    file.name,
                    modified,
                    file.size.as_deref().unwrap_or("-"),
                    file.id
                );
            }
            println!();
            println!("Total: {} backup(s)", files.len());
        }

        CloudCommands::Restore { id, force } => {
            if !force {
                println!("WARNING: This will overwrite ALL current data!");
                println!("To proceed, run again with --force flag:");
                println!("  inout cloud restore {} --force", id);
                return Ok(());
            }
            let client = ctx.cloud()?;
            let result = client.restore(&id, &ctx.restorer()).await?;
            println!("Restore complete!");
            println!("{}", result.summary());
        }

        CloudCommands::Delete { id } => {
            let client = ctx.cloud()?;
            client.delete(&id).await?;
            println!("Deleted cloud backup: {}", id);
        }
    }

    Ok(())
}
