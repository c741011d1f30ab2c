//! Noor - terminal Quran reader
//! Line-oriented front end over the reading session

mod commands;

use anyhow::{Context, Result};
use commands::Command;
use noor_lib::{AppState, NoorConfig};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = NoorConfig::load();
    tracing::info!(data_dir = %config.data_dir.display(), source = ?config.content_source, "starting reader");

    let state = AppState::new(config).context("Failed to initialize application state")?;

    let mut events = state.bus.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => tracing::debug!(?event, "event"),
                Err(RecvError::Lagged(skipped)) => tracing::debug!(skipped, "event log lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    if let Some(outcome) = state.session.restore().await {
        tracing::info!(?outcome, "previous session restored");
        print!("{}", commands::render_page(&state.session.snapshot()));
    }
    println!("type help for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match commands::parse(&line) {
            Ok(None) => {}
            Ok(Some(Command::Quit)) => break,
            Ok(Some(command)) => print!("{}", commands::execute(&state, command).await),
            Err(message) => println!("{}", message),
        }
    }

    Ok(())
}
