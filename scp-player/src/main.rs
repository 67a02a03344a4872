//! scp-player - Headless queue player
//!
//! Reads commands from stdin, searches and resolves through the scp proxy and
//! drives a clock-only audio output. Logs go to stderr; listener output to stdout.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use scp_common::{EventBus, PlayerEvent};
use scp_player::command::{CliCommand, HELP_TEXT};
use scp_player::controller::{self, PlayerCommand};
use scp_player::{ClockOutput, PlaybackController, ProxyClient, SessionSnapshot};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for scp-player
#[derive(Parser, Debug)]
#[command(name = "scp-player")]
#[command(about = "Headless catalog queue player")]
#[command(version)]
struct Args {
    /// Base URL of the scp proxy
    #[arg(long, default_value = "http://localhost:3000", env = "SCP_PROXY_URL")]
    proxy_url: String,

    /// Search to run at startup
    #[arg(short, long)]
    query: Option<String>,

    /// Clock output tick in milliseconds
    #[arg(long, default_value = "1000")]
    tick_ms: u64,

    /// Proxy request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scp_player=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    info!("Starting scp-player v{}", env!("CARGO_PKG_VERSION"));
    info!(proxy_url = %args.proxy_url, "Using proxy");

    let source = ProxyClient::new(&args.proxy_url, Duration::from_secs(args.timeout_secs))
        .context("Failed to create proxy client")?;
    let (output, output_events) = ClockOutput::new(Duration::from_millis(args.tick_ms.max(1)));

    let bus = EventBus::new(100);
    tokio::spawn(announce_events(bus.subscribe()));

    let player = PlaybackController::new(Arc::new(source), Box::new(output), Arc::new(bus));
    let (handle, task) = controller::spawn(player, output_events);

    if let Some(query) = args.query {
        handle.send(PlayerCommand::Search(query)).await?;
    }
    println!("{}", HELP_TEXT);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
                None
            }
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        match line.parse::<CliCommand>() {
            Ok(CliCommand::Player(command)) => handle.send(command).await?,
            Ok(CliCommand::Status) => println!("{}", status_line(&handle.snapshot())),
            Ok(CliCommand::Queue) => print_queue(&handle.snapshot()),
            Ok(CliCommand::Help) => println!("{}", HELP_TEXT),
            Ok(CliCommand::Quit) => break,
            Err(e) => println!("{}", e),
        }
    }

    // Controller may already be gone if stdin closed after a shutdown
    let _ = handle.send(PlayerCommand::Shutdown).await;
    task.await.context("Controller task failed")?;
    info!("scp-player stopped");
    Ok(())
}

/// Print the events a listener cares about
async fn announce_events(mut rx: broadcast::Receiver<PlayerEvent>) {
    loop {
        match rx.recv().await {
            Ok(PlayerEvent::SearchSucceeded { query, count, .. }) => {
                println!("{} results for '{}'", count, query);
            }
            Ok(PlayerEvent::SearchFailed { message, .. }) => println!("{}", message),
            Ok(PlayerEvent::PlaybackStarted { title, .. }) => println!("now playing: {}", title),
            Ok(PlayerEvent::PlaybackFault { message, .. }) => println!("{}", message),
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event printer lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}

fn status_line(snapshot: &SessionSnapshot) -> String {
    let title = snapshot.title.as_deref().unwrap_or("-");
    let volume = if snapshot.displays_muted {
        "muted".to_string()
    } else {
        format!("{:.0}%", snapshot.volume * 100.0)
    };
    let mut line = format!(
        "[{}] {} {} / {} vol {}",
        snapshot.transport, title, snapshot.position_display, snapshot.duration_display, volume
    );
    if let Some(error) = &snapshot.last_error {
        line.push_str(&format!(" ({})", error));
    }
    line
}

fn print_queue(snapshot: &SessionSnapshot) {
    if snapshot.queue.is_empty() {
        println!("queue is empty");
        return;
    }
    for (index, entry) in snapshot.queue.iter().enumerate() {
        let marker = if snapshot.current_index == Some(index) { ">" } else { " " };
        println!("{}{:>3}. {} - {}", marker, index + 1, entry.username, entry.title);
    }
    if snapshot.current_index.is_none() {
        if let Some(title) = &snapshot.title {
            println!("  (playing '{}' from an earlier search)", title);
        }
    }
}
