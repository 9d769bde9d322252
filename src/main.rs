//! Command line front end for section sync.
//!
//! Usage:
//!   section-sync show <session.json>                 # Print the items stored in the backend
//!   section-sync push <session.json>                 # Save the file's items to the backend
//!   section-sync delete <session.json> <lang> <idx>  # Delete item <idx> (0-based) everywhere
//!
//! Required environment variables:
//! - CONTENT_API_URL
//!
//! Optional:
//! - CONTENT_API_TOKEN
//! - SYNC_CONCURRENCY (defaults to 4)
//! - SYNC_SKIP_EMPTY (defaults to true)
//! - SYNC_ADD_POLICY (defaults to local)
//! - SYNC_PRUNE_STALE (defaults to false)
//! - API_MAX_RETRIES (defaults to 3)

use anyhow::{bail, Context, Result};
use section_sync::client::HttpContentApi;
use section_sync::config::Config;
use section_sync::notify::LogNotifier;
use section_sync::session::{FormSession, SessionFile};
use serde::Serialize;
use std::path::Path;
use tracing::info;

type Session = FormSession<HttpContentApi, LogNotifier>;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored when variables come from the environment)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("section_sync=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        print_usage();
        if matches!(args.get(1).map(String::as_str), Some("--help" | "-h" | "help")) {
            return Ok(());
        }
        std::process::exit(1);
    }

    let command = args[1].as_str();
    let file = SessionFile::read(Path::new(&args[2]))?;
    let config = Config::from_env()?;

    let mut session = open_session(&config, &file).await?;

    let result = match command {
        "show" => show_command(&session),
        "push" => push_command(&mut session, &file).await,
        "delete" => {
            let (lang, index) = match (args.get(3), args.get(4)) {
                (Some(lang), Some(index)) => (
                    lang.as_str(),
                    index
                        .parse::<usize>()
                        .with_context(|| format!("Invalid item index: '{}'", index))?,
                ),
                _ => bail!("delete needs a language code and an item index"),
            };
            delete_command(&mut session, lang, index).await
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            std::process::exit(1);
        }
    };

    info!("{}", session.reconciler().metrics().report().format_summary());
    result
}

async fn open_session(config: &Config, file: &SessionFile) -> Result<Session> {
    let api = HttpContentApi::from_config(config);
    let session = FormSession::open(
        api,
        LogNotifier,
        config.sync_options(),
        file.section_schema()?,
        file.target(),
        file.language_set()?,
    )
    .await?;
    Ok(session)
}

fn show_command(session: &Session) -> Result<()> {
    print_json(&session.store().snapshot())
}

async fn push_command(session: &mut Session, file: &SessionFile) -> Result<()> {
    if file.items.is_empty() {
        bail!("Session file has no items to push");
    }
    for (code, items) in &file.items {
        session.replace_items(code, items.clone())?;
    }

    let report = session.save().await?;
    print_json(&report)?;

    if !report.is_clean() {
        bail!("{} elements failed to sync", report.failures.len());
    }
    Ok(())
}

async fn delete_command(session: &mut Session, lang: &str, index: usize) -> Result<()> {
    let report = session.remove_item(lang, index).await?;
    print_json(&report)?;

    if !report.is_clean() {
        bail!("{} elements failed to delete or renumber", report.failures.len());
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_usage() {
    eprintln!("Usage: section-sync <command> <session.json> [args]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  show                 Print the items currently stored in the backend");
    eprintln!("  push                 Replace the items with the file's items and save");
    eprintln!("  delete <lang> <idx>  Delete item <idx> (0-based) from every language");
}
