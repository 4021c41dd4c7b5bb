use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{FileCredentialStore, Session};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod console;

use config::{load_settings, resolve_data_dir};
use console::{run_customers, run_query, Console};

#[derive(Parser, Debug)]
#[command(name = "cloudlinker", about = "Ask questions about your data in plain English")]
struct Args {
    /// Gateway base URL, e.g. http://localhost:8000
    #[arg(long)]
    api_url: Option<String>,
    /// Directory holding the stored API key
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Config file (defaults to ./cloudlinker.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Translate a question to SQL and show the result
    Query {
        #[arg(long)]
        db: Option<String>,
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// List customers
    Customers,
    /// Interactive session with query and customer pages
    Shell,
    /// Store an API key (prompts when omitted)
    SetKey { token: Option<String> },
    /// Forget the stored API key
    Logout,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(api_url) = args.api_url {
        settings.api_base_url = api_url;
    }
    if let Some(data_dir) = args.data_dir {
        settings.data_dir = Some(data_dir);
    }
    if let Command::Query { db: Some(db), .. } = &args.command {
        settings.default_db = Some(db.clone());
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let data_dir = resolve_data_dir(&settings)?;
    let store = FileCredentialStore::in_dir(&data_dir);
    info!(api = %settings.api_base_url, credentials = %store.path().display(), "starting");

    let session = Session::bootstrap(&settings.session_config(), Arc::new(store))
        .await
        .context("failed to start client session")?;
    let mut console = Console::new();

    let ok = match args.command {
        Command::SetKey { token } => {
            console.set_key(&session, token).await?;
            true
        }
        Command::Logout => {
            session.forget_credential().await?;
            println!("API key removed.");
            true
        }
        Command::Query { question, .. } => {
            console.ensure_credential(&session).await?;
            let mut events = session.subscribe();
            run_query(&session, &question.join(" "), &mut events).await
        }
        Command::Customers => {
            console.ensure_credential(&session).await?;
            let mut events = session.subscribe();
            run_customers(&session, &mut events).await
        }
        Command::Shell => {
            console.shell(&session).await?;
            true
        }
    };

    Ok(if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
