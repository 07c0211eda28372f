use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use uuid::Uuid;

use crate::application::{EngineConfig, LedgerEngine, LedgerError, UserDirectory};
use crate::domain::{Operation, OperationKind, UserId, balance_effect, format_cents, parse_cents};
use crate::storage::{LedgerStore, SqliteStore};

/// Tally - append-only personal finance ledger
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "A personal finance ledger where every balance is derived from its operations")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "LEDGER_DATABASE", default_value = "tally.db")]
    pub database: PathBuf,

    /// Enable verbose (debug) logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print records as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Only let users look up operations they sent or received
    #[arg(long, global = true, env = "LEDGER_ENFORCE_OWNERSHIP")]
    pub enforce_ownership: bool,

    /// Allow a user to transfer money to themselves
    #[arg(long, global = true, env = "LEDGER_ALLOW_SELF_TRANSFER")]
    pub allow_self_transfer: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// User management commands
    #[command(subcommand)]
    User(UserCommands),

    /// Credit an account
    Deposit {
        /// User id or email
        user: String,

        /// Amount (e.g., "50.00" or "50")
        amount: String,

        /// Description of the operation
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Debit an account, refusing to overdraw it
    Withdraw {
        /// User id or email
        user: String,

        /// Amount (e.g., "50.00" or "50")
        amount: String,

        /// Description of the operation
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Move money from one user to another
    Transfer {
        /// Amount to transfer (e.g., "50.00" or "50")
        amount: String,

        /// Sending user id or email
        #[arg(long)]
        from: String,

        /// Receiving user id or email
        #[arg(long)]
        to: Option<String>,

        /// Description of the transfer
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Show a user's balance and statement
    Balance {
        /// User id or email
        user: String,
    },

    /// Show a single operation
    #[command(name = "show")]
    ShowOperation {
        /// Requesting user id or email
        user: String,

        /// Operation ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a new user
    Add {
        /// Display name
        name: String,

        /// Email address (must be unique)
        email: String,

        /// Credential hash produced by the identity service
        #[arg(long, default_value = "")]
        password_hash: String,
    },

    /// Show a user's profile
    Show {
        /// User id or email
        user: String,
    },
}

impl Cli {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_enforce_ownership(self.enforce_ownership)
            .with_allow_self_transfer(self.allow_self_transfer)
    }

    pub async fn run(self) -> Result<()> {
        let config = self.engine_config();
        let json = self.json;

        if matches!(self.command, Commands::Init) {
            SqliteStore::init(&self.database).await?;
            println!("Database initialized: {}", self.database.display());
            return Ok(());
        }

        let store: Arc<dyn LedgerStore> = Arc::new(
            SqliteStore::open(&self.database)
                .await
                .context("Database not found. Run `tally init` first")?,
        );
        let directory = UserDirectory::new(Arc::clone(&store));
        let engine = LedgerEngine::new(store, config);

        match self.command {
            Commands::Init => {}

            Commands::User(user_cmd) => run_user_command(&directory, user_cmd, json).await?,

            Commands::Deposit {
                user,
                amount,
                description,
            } => {
                let user_id = owner_id(&directory, &user).await?;
                let op = engine
                    .deposit(user_id, parse_amount(&amount)?, description)
                    .await?;
                print_operation(&op, json)?;
            }

            Commands::Withdraw {
                user,
                amount,
                description,
            } => {
                let user_id = owner_id(&directory, &user).await?;
                let op = engine
                    .withdraw(user_id, parse_amount(&amount)?, description)
                    .await?;
                print_operation(&op, json)?;
            }

            Commands::Transfer {
                amount,
                from,
                to,
                description,
            } => {
                let sender_id = owner_id(&directory, &from).await?;
                let receiver_id = match to {
                    Some(reference) => resolve_user(&directory, &reference).await?,
                    None => None,
                };
                let op = engine
                    .transfer(sender_id, receiver_id, parse_amount(&amount)?, description)
                    .await?;
                print_operation(&op, json)?;
            }

            Commands::Balance { user } => {
                let user_id = owner_id(&directory, &user).await?;
                run_balance_command(&engine, user_id, json).await?;
            }

            Commands::ShowOperation { user, id } => {
                let user_id = owner_id(&directory, &user).await?;
                // A malformed id cannot name any operation.
                let operation_id = Uuid::parse_str(id.trim()).unwrap_or_else(|_| Uuid::nil());
                let op = engine.get_operation(user_id, operation_id).await?;
                print_operation_details(&op, json)?;
            }
        }

        Ok(())
    }
}

async fn run_user_command(directory: &UserDirectory, cmd: UserCommands, json: bool) -> Result<()> {
    match cmd {
        UserCommands::Add {
            name,
            email,
            password_hash,
        } => {
            let user = directory.register(&name, &email, &password_hash).await?;
            if json {
                print_json(&user)?;
            } else {
                println!("Registered user: {} <{}> ({})", user.name, user.email, user.id);
            }
        }

        UserCommands::Show { user } => {
            let user_id = owner_id(directory, &user).await?;
            let user = directory.profile(user_id).await?;
            if json {
                print_json(&user)?;
            } else {
                println!("ID:      {}", user.id);
                println!("Name:    {}", user.name);
                println!("Email:   {}", user.email);
                println!("Created: {}", user.created_at.format("%Y-%m-%d %H:%M:%S"));
            }
        }
    }
    Ok(())
}

async fn run_balance_command(engine: &LedgerEngine, user_id: UserId, json: bool) -> Result<()> {
    let balance = engine.get_balance(user_id).await?;
    if json {
        return print_json(&balance);
    }

    println!("Balance: {}", format_cents(balance.balance));
    if balance.statement.is_empty() {
        println!("No operations found.");
        return Ok(());
    }

    println!();
    println!(
        "{:<20} {:<10} {:>12} {:<30} {:<36}",
        "DATE", "TYPE", "AMOUNT", "DESCRIPTION", "ID"
    );
    println!("{}", "-".repeat(112));
    for op in &balance.statement {
        println!(
            "{:<20} {:<10} {:>12} {:<30} {:<36}",
            op.created_at.format("%Y-%m-%d %H:%M:%S"),
            op.kind,
            format_cents(balance_effect(user_id, op)),
            truncate(&op.description, 30),
            op.id
        );
    }
    Ok(())
}

fn print_operation(op: &Operation, json: bool) -> Result<()> {
    if json {
        return print_json(op);
    }

    match (op.kind, op.receiver_id) {
        (OperationKind::Transfer, Some(receiver_id)) => println!(
            "Recorded transfer: {} {} -> {} ({})",
            format_cents(op.amount),
            op.user_id,
            receiver_id,
            op.id
        ),
        _ => println!(
            "Recorded {}: {} for {} ({})",
            op.kind,
            format_cents(op.amount),
            op.user_id,
            op.id
        ),
    }
    Ok(())
}

fn print_operation_details(op: &Operation, json: bool) -> Result<()> {
    if json {
        return print_json(op);
    }

    println!("ID:          {}", op.id);
    println!("Type:        {}", op.kind);
    println!("Amount:      {}", format_cents(op.amount));
    println!("User:        {}", op.user_id);
    if let Some(receiver_id) = op.receiver_id {
        println!("Receiver:    {}", receiver_id);
    }
    println!("Description: {}", op.description);
    println!("Created:     {}", op.created_at.to_rfc3339());
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_amount(amount: &str) -> Result<i64> {
    parse_cents(amount).context("Invalid amount format. Use '50.00' or '50'")
}

/// Resolve a user reference (UUID or email). `None` when it names nobody.
async fn resolve_user(directory: &UserDirectory, reference: &str) -> Result<Option<UserId>> {
    let reference = reference.trim();
    if let Ok(id) = Uuid::parse_str(reference) {
        return Ok(Some(id));
    }
    if !reference.contains('@') {
        return Ok(None);
    }

    match directory.find_by_email(reference).await {
        Ok(user) => Ok(Some(user.id)),
        Err(LedgerError::UserNotFound) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Resolve the acting user. An unresolvable reference becomes the nil id, which never
/// names a user, so the engine reports the missing account in its usual check order.
async fn owner_id(directory: &UserDirectory, reference: &str) -> Result<UserId> {
    Ok(resolve_user(directory, reference)
        .await?
        .unwrap_or_else(Uuid::nil))
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
