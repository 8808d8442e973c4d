mod accounts;
mod context;
mod preferences;
mod settings;
mod storage;

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use context::AppContext;
use serde::Serialize;
use settings::Settings;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::accounts::entities::{AccountDraft, AccountId};

#[derive(Debug, Parser)]
#[command(name = "swipe-account-store", about = "Manage the locally saved Swipe accounts")]
struct Cli {
    /// Settings file to use instead of ./settings.toml
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List saved accounts
    List,
    /// Save or update an account by phone number
    Save {
        phone_number: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        avatar: Option<String>,
        /// Make this the default account
        #[arg(long)]
        default: bool,
    },
    /// Save an account and make it the current one
    Login {
        phone_number: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        avatar: Option<String>,
    },
    /// Remove an account by id
    Remove { id: String },
    /// Mark an account as the default
    SetDefault { id: String },
    /// Show the default account
    #[command(name = "default")]
    ShowDefault,
    /// Show the current account
    Current,
    /// Find an account by phone number
    Find { phone_number: String },
    /// Show account usage statistics
    Stats,
    /// Forget all saved accounts and the current account
    Clear,
    /// Read or replace user preferences
    Prefs {
        #[command(subcommand)]
        command: PrefsCommand,
    },
}

#[derive(Debug, Subcommand)]
enum PrefsCommand {
    Get,
    /// Replace preferences with a JSON object
    Set { json: String },
}

fn draft_from_args(phone_number: String, name: Option<String>, avatar: Option<String>) -> AccountDraft {
    let mut draft = AccountDraft::new(phone_number);
    if let Some(name) = name {
        draft = draft.with_name(name);
    }
    if let Some(avatar) = avatar {
        draft = draft.with_avatar(avatar);
    }
    draft
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn ensure(succeeded: bool, action: &str) -> Result<()> {
    if !succeeded {
        bail!("{action} failed, see log for details");
    }
    println!("ok");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_env("RUST_LOG"))
        .init();

    let cli = Cli::parse();
    let settings = match &cli.settings {
        Some(path) => Settings::load_from_path(path)?,
        None => Settings::load()?,
    };
    debug!("loaded settings: {:?}", settings);

    let context = AppContext::from_settings(&settings).await?;
    let accounts = &context.account_store;

    match cli.command {
        Command::List => print_json(&accounts.list().await)?,
        Command::Save {
            phone_number,
            name,
            avatar,
            default,
        } => {
            let mut draft = draft_from_args(phone_number, name, avatar);
            if default {
                draft = draft.with_default(true);
            }
            ensure(accounts.save(draft).await, "saving account")?;
        }
        Command::Login {
            phone_number,
            name,
            avatar,
        } => {
            let draft = draft_from_args(phone_number, name, avatar);
            match accounts.login(draft).await {
                Some(account) => print_json(&account)?,
                None => bail!("login failed, see log for details"),
            }
        }
        Command::Remove { id } => {
            ensure(accounts.remove(&AccountId::from(id)).await, "removing account")?
        }
        Command::SetDefault { id } => ensure(
            accounts.set_default(&AccountId::from(id)).await,
            "setting default account",
        )?,
        Command::ShowDefault => print_json(&accounts.get_default().await)?,
        Command::Current => print_json(&accounts.get_current().await)?,
        Command::Find { phone_number } => print_json(&accounts.find_by_phone(&phone_number).await)?,
        Command::Stats => print_json(&accounts.stats().await)?,
        Command::Clear => ensure(accounts.clear_all().await, "clearing accounts")?,
        Command::Prefs { command } => match command {
            PrefsCommand::Get => print_json(&context.preferences_store.get().await)?,
            PrefsCommand::Set { json } => {
                let preferences: preferences::Preferences = serde_json::from_str(&json)?;
                ensure(
                    context.preferences_store.save(&preferences).await,
                    "saving preferences",
                )?;
            }
        },
    }

    Ok(())
}
