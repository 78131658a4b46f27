use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    ClientEvent, HttpLedgerGateway, ListState, MutationOutcome, SyncError, TodoClient, TodoHandle,
};
use shared::domain::{AccountAddress, TaskId};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wallet_integration::{HttpWalletBridge, WalletConnector};

mod config;
mod view;

use config::{load_settings, Settings};

#[derive(Parser, Debug)]
#[command(about = "Keep a todo list on the ledger in sync from the terminal")]
struct Args {
    #[arg(long)]
    node_url: Option<String>,
    #[arg(long)]
    wallet_url: Option<String>,
    #[arg(long)]
    module_address: Option<String>,
    /// Read as this account instead of asking the wallet. Only valid for `show`.
    #[arg(long)]
    account: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current list.
    Show,
    CreateList,
    Add { content: String },
    Complete { id: u64 },
}

impl Command {
    fn is_mutation(&self) -> bool {
        !matches!(self, Command::Show)
    }
}

impl Args {
    /// The wallet always signs as its own account.
    fn check_account_override(&self) -> Result<()> {
        if self.account.is_some() && self.command.is_mutation() {
            bail!("--account is read-only; mutations are signed by the wallet's connected account");
        }
        Ok(())
    }

    fn apply_to(&self, settings: &mut Settings) {
        if let Some(v) = &self.node_url {
            settings.node_url = v.clone();
        }
        if let Some(v) = &self.wallet_url {
            settings.wallet_url = v.clone();
        }
        if let Some(v) = &self.module_address {
            settings.module_address = Some(v.clone());
        }
    }
}

// Mutations patch the loaded list, so they need a successful read first.
fn check_initial_sync(command: &Command, loaded: Result<ListState, SyncError>) -> Result<()> {
    match loaded {
        Ok(_) => Ok(()),
        Err(err) if !command.is_mutation() => {
            warn!(error = %err, "could not load the todo list");
            Ok(())
        }
        Err(err) => {
            Err(anyhow::Error::new(err).context("could not load the todo list; nothing was submitted"))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();
    args.check_account_override()?;

    let mut settings = load_settings()?;
    args.apply_to(&mut settings);
    settings.validate()?;
    let module = settings.list_module()?;

    let gateway = Arc::new(HttpLedgerGateway::new(
        &settings.node_url,
        settings.gateway_options(),
    )?);
    let wallet = Arc::new(HttpWalletBridge::new(&settings.wallet_url)?);

    let account = match &args.account {
        Some(raw) => Some(
            AccountAddress::parse(raw).with_context(|| format!("invalid --account '{raw}'"))?,
        ),
        None => wallet
            .account()
            .await
            .context("failed to query connected wallet account")?,
    };

    let client = TodoClient::new(module, gateway, wallet);
    let printer = {
        let mut events = client.subscribe_events();
        tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                match event {
                    ClientEvent::StateChanged(state) if state.pending => {
                        println!("Waiting for the transaction to be confirmed...")
                    }
                    ClientEvent::TransactionCommitted { function, info } => {
                        println!("Committed {function} ({})", info.hash)
                    }
                    _ => {}
                }
            }
        })
    };

    let loaded = client.on_identity_changed(account.clone()).await;
    check_initial_sync(&args.command, loaded)?;

    let outcome = match args.command {
        Command::Show => None,
        Command::CreateList => Some(client.request_create_list().await?),
        Command::Add { content } => Some(client.request_add_item(&content).await?),
        Command::Complete { id } => Some(client.request_complete_item(TaskId(id)).await?),
    };
    if let Some(MutationOutcome::NoIdentity) = outcome {
        println!("No wallet account connected; nothing was submitted.");
    }

    let state = client.current_state().await;
    drop(client);
    let _ = printer.await;

    info!(?account, tasks = state.tasks.len(), "done");
    println!("{}", view::render(&state).trim_end());
    Ok(())
}
