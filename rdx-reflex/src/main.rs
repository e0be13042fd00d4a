use anyhow::Result;
use colored::Colorize;
use reflex::components::logger::LoggedEntry;
use reflex::prelude::*;
use reflex::{ENGINE_NAME, VERSION};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize structured logging. RUST_LOG overrides the default level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // 2. Load the configuration, from REFLEX_CONFIG if set.
    let path = std::env::var_os("REFLEX_CONFIG").map(PathBuf::from);
    let config = ReflexConfig::load(path.as_deref())?;
    info!("{} v{} starting a scripted session", ENGINE_NAME, VERSION);

    // 3. Wire the game to real time and a tokio-backed ticker.
    let (ticker, ticks) = TokioTicker::channel();
    let game = Game::new(&config, Arc::new(MonotonicTime::new()), Box::new(ticker))?;
    let game = Arc::new(Mutex::new(game));
    spawn_tick_driver(game.clone(), ticks);

    // 4. Play through a short session.
    play_script(&game).await?;

    // 5. Print what happened, then end the session.
    let mut game = game.lock().await;
    print_summary(&game);
    game.stop()?;
    Ok(())
}

/// Feeds every ticker firing back into the game.
fn spawn_tick_driver(game: Arc<Mutex<Game>>, mut ticks: mpsc::UnboundedReceiver<Tick>) {
    tokio::spawn(async move {
        while let Some(tick) = ticks.recv().await {
            if let Err(e) = game.lock().await.tick(tick) {
                warn!("Tick rejected: {}", e);
            }
        }
    });
}

async fn play_script(game: &Mutex<Game>) -> Result<()> {
    game.lock().await.start()?;

    for delay in [420, 380, 510, 300] {
        tokio::time::sleep(Duration::from_millis(delay)).await;
        game.lock().await.click_target()?;
    }

    // Time spent paused is excluded from the next interval.
    game.lock().await.pause()?;
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    game.lock().await.start()?;
    tokio::time::sleep(Duration::from_millis(450)).await;
    game.lock().await.click_target()?;

    // Double speed doubles the points a hit is worth.
    game.lock().await.set_timescale(2)?;
    tokio::time::sleep(Duration::from_millis(1_200)).await;
    {
        let mut game = game.lock().await;
        game.click_target()?;
        let ids: Vec<String> = game.items().items().iter().map(|i| i.id.clone()).collect();
        for id in ids {
            let outcome = game.click_item(&id)?;
            info!(item = %id, ?outcome, "Item activated");
        }
    }

    tokio::time::sleep(Duration::from_millis(600)).await;
    let game = game.lock().await;
    info!(
        seconds = game.timer().clock().elapsed_seconds(),
        score = game.score().session(),
        "Script finished"
    );
    Ok(())
}

fn print_summary(game: &Game) {
    let target = game.target();
    println!();
    println!("{}", "Session summary".cyan().bold());
    println!(
        "  Score             {} (high {})",
        game.score().session_text().yellow(),
        game.score().high_text()
    );
    println!("  Session time      {}", format_time(game.timer().clock().elapsed_seconds()));
    println!("  Average click     {} ms", target.average_click());
    println!(
        "  Intervals         {}",
        target
            .stats()
            .intervals()
            .iter()
            .map(|ms| ms.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("  Publications      {}", game.broker().published());
    println!();
    println!("{}", "Log".cyan().bold());
    for entry in game.logger().entries() {
        println!("  {}", styled(entry));
    }
}

fn styled(entry: &LoggedEntry) -> colored::ColoredString {
    let line = entry.line();
    match entry.style {
        LogStyle::Blue => line.blue(),
        LogStyle::Green => line.green(),
        LogStyle::Yellow => line.yellow(),
        LogStyle::Red => line.red(),
        LogStyle::Grey => line.dimmed(),
    }
}
