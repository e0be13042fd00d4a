use anyhow::Result;
use chrono::{DateTime, Local};
use colored::{ColoredString, Colorize};
use reflex::components::logger::LoggedEntry;
use reflex::prelude::*;
use reflex::{ENGINE_NAME, VERSION as LIB_VERSION};
use rustyline::highlight::Highlighter;
use rustyline::Editor;
use rustyline_derive::{Completer, Helper, Hinter, Validator};
use std::borrow::Cow;
use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const SHELL_VERSION: &str = env!("CARGO_PKG_VERSION");

const LOGO_TEXT: &str = r"
   ___      __ _
  | _ \___ / _| |_____ __
  |   / -_)  _| / -_) \ /
  |_|_\___|_| |_\___/_\_\
";

/// A custom helper struct for rustyline that enables syntax highlighting.
#[derive(Completer, Helper, Hinter, Validator)]
struct CommandHighlighter;

impl Highlighter for CommandHighlighter {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if let Some((command, rest)) = line.split_once(' ') {
            Cow::Owned(format!("{} {}", command.yellow().bold(), rest.yellow()))
        } else {
            Cow::Owned(line.yellow().bold().to_string())
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

fn print_banner() {
    if env::var("QUIET_MODE").is_ok() {
        return;
    }
    println!("{}", LOGO_TEXT.cyan());

    let rule = "-".repeat(64);
    println!("{}", rule.dimmed());
    println!(
        "          Shell   v{:<8} Library   v{:<8}",
        SHELL_VERSION, LIB_VERSION
    );
    let license_blurb = "
    This software is provided 'as is', without warranty of any kind.
    Distributed under the MIT OR Apache-2.0 license. Use at your own risk.
    ";
    println!("{}", license_blurb.dimmed());
    println!("{}", rule.dimmed());
}

/// Feeds ticker firings into the game, echoing the session time while the
/// shared `watching` flag is set.
fn spawn_tick_driver(
    game: Arc<Mutex<Game>>,
    mut ticks: mpsc::UnboundedReceiver<Tick>,
    watching: Arc<AtomicBool>,
) {
    tokio::spawn(async move {
        while let Some(tick) = ticks.recv().await {
            let mut game = game.lock().await;
            if let Err(e) = game.tick(tick) {
                warn!("Tick rejected: {}", e);
                continue;
            }
            if watching.load(Ordering::Relaxed) {
                let seconds = game.timer().clock().elapsed_seconds();
                println!("<-- [TIME] {}", format_time(seconds));
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let path = env::var_os("REFLEX_CONFIG").map(PathBuf::from);
    let config = ReflexConfig::load(path.as_deref())?;

    let (ticker, ticks) = TokioTicker::channel();
    let game = Game::new(&config, Arc::new(MonotonicTime::new()), Box::new(ticker))?;
    let game = Arc::new(Mutex::new(game));
    let watching = Arc::new(AtomicBool::new(false));
    spawn_tick_driver(game.clone(), ticks, watching.clone());
    info!("{} ready with {} items", ENGINE_NAME, config.items.len());

    let mut rl = Editor::new()?;
    rl.set_helper(Some(CommandHighlighter));

    println!("{} is ready. Type 'help' for commands or 'exit' to quit.", ENGINE_NAME.cyan());

    loop {
        let prompt = format!("{}", ">> ".cyan().bold());
        match rl.readline(&prompt) {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                let args = line.split_whitespace().collect::<Vec<_>>();
                let Some(&command) = args.first() else {
                    continue;
                };
                if command == "exit" {
                    break;
                }
                let mut game = game.lock().await;
                if let Err(e) = run_command(&mut game, command, &args[1..], &watching) {
                    println!("{} {}", "Error:".red().bold(), e);
                }
            }
            Err(_) => {
                println!("Exiting reflexshell...");
                break;
            }
        }
    }

    game.lock().await.stop()?;
    Ok(())
}

fn run_command(
    game: &mut Game,
    command: &str,
    args: &[&str],
    watching: &AtomicBool,
) -> reflex::error::Result<()> {
    match command {
        "start" => {
            game.start()?;
            print_state(game);
        }
        "pause" => {
            game.pause()?;
            print_state(game);
        }
        "stop" => {
            game.stop()?;
            print_state(game);
        }
        "faster" => {
            game.increase_timescale()?;
            println!("--> Timescale x{}", game.timer().clock().timescale());
        }
        "slower" => {
            game.decrease_timescale()?;
            println!("--> Timescale x{}", game.timer().clock().timescale());
        }
        "speed" => match args.first().map(|n| n.parse::<i64>()) {
            Some(Ok(n)) => {
                game.set_timescale(n)?;
                println!("--> Timescale x{}", game.timer().clock().timescale());
            }
            Some(Err(_)) => println!("Error: '{}' is not a whole number.", args[0]),
            None => println!("Usage: speed <N>"),
        },
        "hit" => {
            if game.click_target()? {
                let target = game.target();
                let geometry = target.geometry();
                println!(
                    "--> Hit! Score {} | avg {} ms | next target {}px at ({}, {})",
                    game.score().session_text().yellow(),
                    target.average_click(),
                    geometry.side,
                    geometry.left,
                    geometry.top
                );
            } else {
                println!("--> Miss. The target only counts while running and visible.");
            }
        }
        "toggle" => {
            game.toggle_target()?;
            let shown = if game.target().is_visible() { "shown" } else { "hidden" };
            println!("--> Target {}", shown);
        }
        "item" => match args.first() {
            Some(id) => match game.click_item(id)? {
                ItemOutcome::Ignored => println!("--> Start a session before collecting items."),
                ItemOutcome::Collected { points, lateness } => {
                    println!("--> Collected for {} points ({:?})", points, lateness);
                }
                ItemOutcome::Early { seconds } => {
                    println!("--> Not spawned yet, {} seconds to go", seconds);
                }
            },
            None => println!("Usage: item <ID>. Use 'items' to list ids."),
        },
        "items" => {
            let now = game.timer().clock().elapsed_seconds();
            for item in game.items().items() {
                let status = if item.is_available(now) {
                    "up".green()
                } else {
                    format!("in {}s", item.spawn_time_seconds - now).dimmed()
                };
                println!(
                    "  {:<16} {:<14} spawns {}  {}",
                    item.id,
                    item.presentation_name,
                    format_time(item.spawn_time_seconds),
                    status
                );
            }
        }
        "score" => {
            let score = game.score();
            println!(
                "  Session {}   High {}",
                score.session_text().yellow(),
                score.high_text()
            );
        }
        "stats" => {
            let stats = game.target().stats();
            println!("  Average click   {} ms", stats.average());
            println!("  Intervals       {:?}", stats.intervals());
        }
        "log" => {
            if game.logger().is_empty() {
                println!("  (empty)");
            }
            for entry in game.logger().entries() {
                println!("  {} {}", wall_clock(&entry.recorded_at).dimmed(), styled(entry));
            }
        }
        "clear" => {
            game.clear_log()?;
            println!("--> Log cleared.");
        }
        "state" => print_state(game),
        "bus" => {
            let broker = game.broker();
            for name in broker.components() {
                println!("  {}", name.cyan().bold());
                let Some(state) = broker.state_of(name) else {
                    continue;
                };
                let mut properties: Vec<_> = state.iter().collect();
                properties.sort_by_key(|(property, _)| *property);
                for (property, message) in properties {
                    println!("    {:<20} {}", property, message.value());
                }
            }
            println!("  {} publications", broker.published());
        }
        "watch" => match args.first() {
            Some(&"on") => {
                watching.store(true, Ordering::Relaxed);
                println!("--> Echoing session time on every tick.");
            }
            Some(&"off") => {
                watching.store(false, Ordering::Relaxed);
                println!("--> Stopped echoing session time.");
            }
            _ => println!("Usage: watch on|off"),
        },
        "help" => {
            println!("Available commands:");
            println!("  start | pause | stop   - Controls the session clock.");
            println!("  faster | slower        - Steps the timescale up or down by one.");
            println!("  speed <N>              - Sets the timescale to N (N >= 1).");
            println!("  hit                    - Clicks the target.");
            println!("  toggle                 - Shows or hides the target.");
            println!("  item <ID>              - Collects an item.");
            println!("  items                  - Lists items and their spawn times.");
            println!("  score | stats | log    - Shows the score, click stats or log.");
            println!("  clear                  - Clears the log.");
            println!("  state                  - Shows the session state.");
            println!("  bus                    - Dumps every component's published state.");
            println!("  watch on|off           - Echoes session time on every tick.");
            println!("  exit                   - Quits the shell.");
        }
        _ => println!("Unknown command: '{}'. Type 'help'.", command),
    }
    Ok(())
}

fn print_state(game: &Game) {
    let clock = game.timer().clock();
    println!(
        "  {:?} at {} | x{} | {} segment(s)",
        clock.run_state(),
        format_time(clock.elapsed_seconds()),
        clock.timescale(),
        clock.segments().len()
    );
}

fn wall_clock(at: &DateTime<Local>) -> String {
    at.format("%H:%M:%S").to_string()
}

fn styled(entry: &LoggedEntry) -> ColoredString {
    let line = entry.line();
    match entry.style {
        LogStyle::Blue => line.blue(),
        LogStyle::Green => line.green(),
        LogStyle::Yellow => line.yellow(),
        LogStyle::Red => line.red(),
        LogStyle::Grey => line.dimmed(),
    }
}
