//! # TableMirror Watch
//!
//! A standalone CLI on top of the TableMirror SDK.
//!
//! - `watch` connects to a live room and prints every inbound message,
//!   with a table summary on a timer.
//! - `replay` feeds a JSON-lines capture through the dispatcher offline and
//!   prints the resulting table.
//! - `demo` runs a scripted hand over an in-memory connection, including a
//!   held trick and a reconnect.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::*;
use tmir_sdk::{
    BackoffPolicy, ClientConfig, ConnectOutcome, Dispatcher, Inbound, MemoryConnector,
    MessageKind, TableClient, TableEvent, TableState, TrickPlay,
};
use tokio::sync::mpsc;

// ─── CLI ───────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "tablemirror-watch")]
#[command(about = "Mirror a trick-taking table over a reconnecting WebSocket")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to a room and print traffic until Ctrl-C
    Watch {
        /// Room URL; defaults to TABLEMIRROR_WS_URL
        #[arg(long)]
        url: Option<String>,
        /// Stop after this many seconds
        #[arg(long)]
        seconds: Option<u64>,
    },
    /// Replay a capture of one JSON frame per line
    Replay {
        file: PathBuf,
        /// Print the table after every frame
        #[arg(long)]
        verbose: bool,
    },
    /// Scripted hand over an in-memory connection
    Demo,
}

// ─── Pretty printing ──────────────────────────────────────────────────────

fn header(text: &str) {
    let bar = "═".repeat(60);
    println!("\n{}", bar.bright_cyan());
    println!("  {}", text.bold().bright_white());
    println!("{}", bar.bright_cyan());
}

fn section(text: &str) {
    println!("\n{} {}", "▸".bright_yellow(), text.bold());
}

fn step(text: &str) {
    println!("  {} {}", "•".bright_green(), text);
}

fn trick_line(trick: &[TrickPlay]) -> String {
    if trick.is_empty() {
        return "(empty)".dimmed().to_string();
    }
    trick
        .iter()
        .map(|play| {
            let cards: Vec<&str> = play.cards.iter().map(|c| c.as_str()).collect();
            let entry = format!("{}:{}", play.position, cards.join(" "));
            if play.is_slingshot_failure() {
                entry.bright_red().to_string()
            } else {
                entry
            }
        })
        .collect::<Vec<_>>()
        .join("  ")
}

fn show_table(table: &TableState) {
    let border = "─".repeat(56);
    println!("  ┌{}┐", border);
    println!(
        "  │ {:<54} │",
        format!(
            "room {}  phase {}  trump {}",
            table.room_id.as_deref().unwrap_or("?"),
            table.phase,
            table
                .trump_suit
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_owned())
        )
    );
    println!("  ├{}┤", border);

    if table.players.is_empty() {
        println!("  │ {:<54} │", "(no players)");
    }
    for seat in &table.players {
        let name = seat.display_name.as_deref().unwrap_or(&seat.id);
        let turn = if table.current_player_position == Some(seat.position) {
            "◀"
        } else {
            " "
        };
        println!(
            "  │ {:<54} │",
            format!(
                "{:<6} {:<32} {:>3} cards {}",
                seat.position.as_str(),
                name,
                seat.hand_size,
                turn
            )
        );
    }
    println!("  ├{}┤", border);
    println!(
        "  │ {:<54} │",
        format!(
            "idle {}  tricks {}-{}  scores {}-{}",
            table.idle_score,
            table.tricks_won.team_a,
            table.tricks_won.team_b,
            table.team_scores.team_a,
            table.team_scores.team_b
        )
    );
    println!("  └{}┘", border);

    let hold = if table.waiting_for_next_trick() {
        " (held)".bright_yellow().to_string()
    } else {
        String::new()
    };
    println!("    current{}: {}", hold, trick_line(&table.current_trick));
    println!("    last:    {}", trick_line(&table.last_trick));
    if table.ready_for_next_round.ready_count > 0 {
        println!(
            "    ready:   {}/{}",
            table.ready_for_next_round.ready_count, table.ready_for_next_round.total_players
        );
    }
}

fn print_inbound(inbound: &Inbound) {
    let label = inbound
        .declared_kind
        .as_deref()
        .unwrap_or("message")
        .to_string();
    let label = match &inbound.event {
        TableEvent::ServerError(err) => {
            let detail = err.message.as_deref().unwrap_or("");
            format!("{} {}", label.bright_red(), detail)
        }
        TableEvent::Unknown { .. } => label.dimmed().to_string(),
        TableEvent::CardPlayed(_) | TableEvent::TrickComplete(_) => {
            label.bright_green().to_string()
        }
        _ => label.bright_white().to_string(),
    };
    println!("  {} {}", "←".bright_cyan(), label);
}

// ─── Watch ────────────────────────────────────────────────────────────────

async fn run_watch(url: Option<String>, seconds: Option<u64>) {
    header("Watching live table");

    let mut config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            println!("  {} {}", "!".bright_red(), err);
            return;
        }
    };
    if let Some(url) = url {
        config.ws_url = Some(url);
    }

    let client = TableClient::new(config);
    client.on(Arc::new(print_inbound));
    if let Err(err) = client.connect(None).await {
        println!("  {} {}", "!".bright_red(), err);
        println!("  Pass --url or set TABLEMIRROR_WS_URL");
        return;
    }
    step(&format!("session {}", client.session_id()));

    let mut ticker = tokio::time::interval(Duration::from_secs(5));
    ticker.tick().await;
    let deadline = async move {
        match seconds {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = &mut deadline => break,
            _ = ticker.tick() => {
                let state = client.connection_state();
                let status = match state {
                    Some(s) if s.is_open => "connected".bright_green(),
                    Some(s) => {
                        format!("reconnecting (attempt {})", s.retry_attempt).bright_yellow()
                    }
                    None => "idle".dimmed(),
                };
                section(&format!("status: {status}"));
                show_table(&client.table());
            }
        }
    }

    let table = client.table();
    client.leave().await;
    section("Final table");
    show_table(&table);
}

// ─── Replay ───────────────────────────────────────────────────────────────

fn run_replay(file: PathBuf, verbose: bool) {
    header(&format!("Replaying {}", file.display()));

    let text = match fs::read_to_string(&file) {
        Ok(text) => text,
        Err(err) => {
            println!("  {} cannot read {}: {}", "!".bright_red(), file.display(), err);
            return;
        }
    };

    let dispatcher = Dispatcher::default();
    let mut frames = 0;
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        frames += 1;
        let ok = dispatcher.handle_frame(line);
        if verbose {
            let marker = if ok { "✓".bright_green() } else { "✗".bright_red() };
            println!("  {} {}", marker, line.chars().take(80).collect::<String>());
            show_table(dispatcher.reconciler().read().state());
        }
    }

    let stats = dispatcher.stats();
    let reconciler = dispatcher.reconciler().read();
    let diagnostics = reconciler.diagnostics();
    section("Summary");
    step(&format!(
        "{} frames, {} decoded, {} undecodable",
        frames, stats.frames_decoded, stats.decode_faults
    ));
    step(&format!(
        "{} tricks held back, {} unmapped deals, {} unknown messages, {} server errors",
        diagnostics.ignored_tricks,
        diagnostics.unmapped_deals,
        diagnostics.unknown_messages,
        diagnostics.server_errors
    ));
    section("Final table");
    show_table(reconciler.state());
}

// ─── Demo ─────────────────────────────────────────────────────────────────

const DEMO_SCRIPT: &[(&str, &str)] = &[
    (
        "Snapshot seats four players",
        r#"{"type":"state_snapshot","room_id":"demo","phase":"waiting","players":[
            {"id":"p1","name":"Ann","position":"NORTH"},
            {"id":"p2","name":"Bo","position":"EAST"},
            {"id":"p3","name":"Cy","position":"SOUTH"},
            {"id":"p4","name":"Di","position":"WEST"}]}"#,
    ),
    ("Dealing starts", r#"{"type":"phase_changed","phase":"dealing"}"#),
    (
        "South is dealt a card",
        r#"{"type":"deal_tick","player":"south","card":"A♠","dealt_count":1}"#,
    ),
    (
        "West is dealt a hidden card",
        r#"{"type":"deal_tick","player":"west","card":null,"dealt_count":2}"#,
    ),
    ("Play begins", r#"{"type":"phase_changed","phase":"playing"}"#),
    (
        "North leads",
        r#"{"type":"card_played","current_trick":[{"pos":"NORTH","cards":["A♠"]}],"current_player":"EAST"}"#,
    ),
    (
        "Trick completes",
        r#"{"type":"trick_complete",
            "last_trick":[{"pos":"NORTH","cards":["A♠"]},{"pos":"EAST","cards":["3♠"]},
                          {"pos":"SOUTH","cards":["K♠"]},{"pos":"WEST","cards":["5♠"]}],
            "current_trick":[{"pos":"NORTH","cards":["A♠"]},{"pos":"EAST","cards":["3♠"]},
                             {"pos":"SOUTH","cards":["K♠"]},{"pos":"WEST","cards":["5♠"]}],
            "tricks_won":{"teamA":1,"teamB":0},"current_player":"NORTH"}"#,
    ),
    (
        "Snapshot with an empty trick (held trick stays)",
        r#"{"type":"state_snapshot","phase":"playing","current_trick":[]}"#,
    ),
    (
        "North leads again (hold released)",
        r#"{"type":"card_played","current_trick":[{"player":"north","card":"Q♥"}]}"#,
    ),
];

async fn wait_for(kinds: &mut mpsc::UnboundedReceiver<MessageKind>) {
    let _ = tokio::time::timeout(Duration::from_secs(2), kinds.recv()).await;
}

async fn run_demo() {
    header("Scripted demo over an in-memory connection");

    let (connector, mut peers) = MemoryConnector::new();
    connector.script([ConnectOutcome::Refuse]);
    let config = ClientConfig::builder()
        .backoff(BackoffPolicy::new(Duration::from_millis(50), Duration::from_millis(400)))
        .build();
    let client = TableClient::with_connector(config, Arc::new(connector));

    let (tx, mut kinds) = mpsc::unbounded_channel();
    client.on(Arc::new(move |inbound: &Inbound| {
        let _ = tx.send(inbound.kind);
    }));

    section("Connecting (first attempt is refused)");
    if let Err(err) = client.connect(Some("mem://demo")).await {
        println!("  {} {}", "!".bright_red(), err);
        return;
    }
    let Some(peer) = peers.recv().await else {
        println!("  {} connector closed", "!".bright_red());
        return;
    };
    step("connected after one retry");

    for (caption, frame) in DEMO_SCRIPT {
        section(caption);
        peer.push(*frame);
        wait_for(&mut kinds).await;
        show_table(&client.table());
    }

    section("Server drops the connection");
    peer.disconnect();
    let Some(peer) = peers.recv().await else {
        println!("  {} connector closed", "!".bright_red());
        return;
    };
    step("reconnected; table kept while waiting for a snapshot");
    peer.push(r#"{"type":"state_snapshot","phase":"playing","idle_score":15}"#);
    wait_for(&mut kinds).await;
    show_table(&client.table());

    section("Message log (newest first)");
    for line in client.log_lines().iter().take(12) {
        println!("    {}", line.dimmed());
    }

    client.leave().await;
}

// ─── Entry point ───────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    tmir_sdk::init_tracing("warn");

    match cli.command {
        Commands::Watch { url, seconds } => run_watch(url, seconds).await,
        Commands::Replay { file, verbose } => run_replay(file, verbose),
        Commands::Demo => run_demo().await,
    }
}
