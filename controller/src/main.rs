//! Squares pool runner.
//!
//! Follows one game (`GAME_ID`): polls the league scoreboard, keeps the game's
//! score current and records each period payout exactly once. Two one-shot
//! modes share the same store:
//!
//! - `SCRAMBLE=1` draws the board's digits and exits
//! - `MANUAL_SCORE=21-14` records a host-entered payout and exits

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use squares::PayoutEvent;
use squares_controller::config::{self, Config, RunMode};
use squares_controller::feed::ScoreFeedClient;
use squares_controller::game::{GameService, RolloverPrompt};
use squares_controller::paths;
use squares_controller::payout_log::PayoutLog;
use squares_controller::store::{DocumentStore, LocalStore};
use squares_controller::sync::{
    create_pool_channel, feed_poll_task, forward_game_snapshots, run_sync_loop, status_heartbeat_task,
    status_line, PayoutSync,
};

/// Asks on the terminal before recording a rollover.
struct StdinPrompt;

#[async_trait]
impl RolloverPrompt for StdinPrompt {
    async fn confirm_rollover(&self, payout: &PayoutEvent) -> bool {
        let question = format!(
            "Nobody holds the winning square for {} at {}. Record a rollover of ${:.2}? [y/N] ",
            payout.label, payout.scores, payout.amount
        );
        let answer = tokio::task::spawn_blocking(move || {
            use std::io::Write;
            print!("{}", question);
            let _ = std::io::stdout().flush();
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|_| line)
        })
        .await;

        match answer {
            Ok(Ok(line)) => matches!(line.trim().to_lowercase().as_str(), "y" | "yes"),
            Ok(Err(e)) => {
                warn!("[PAYOUT] Could not read answer: {}", e);
                false
            }
            Err(e) => {
                warn!("[PAYOUT] Prompt task failed: {}", e);
                false
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // The binary is `controller`, the library `squares_controller`, the domain
    // crate `squares`; default to info for all three.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info")
                    .add_directive("controller=info".parse().unwrap())
                    .add_directive("squares_controller=info".parse().unwrap())
                    .add_directive("squares=info".parse().unwrap())
            }),
        )
        .init();

    paths::load_dotenv();
    let config = Config::from_env()?;

    let store = Arc::new(LocalStore::open(&config.store_path)?);
    let payout_log = Arc::new(PayoutLog::new(&config.payout_log_path));
    let service = GameService::new(store.clone()).with_payout_log(payout_log.clone());

    match config.mode {
        RunMode::Scramble => {
            let game = service.scramble(&config.game_id).await?;
            info!("[GAME] {}", status_line(&game));
            return Ok(());
        }
        RunMode::ManualPayout(scores) => {
            match service.manual_payout(&config.game_id, scores, &StdinPrompt).await? {
                Some(payout) => info!("[PAYOUT] Recorded {} ({})", payout.id, payout.label),
                None => info!("[PAYOUT] Nothing recorded"),
            }
            return Ok(());
        }
        RunMode::Follow => {}
    }

    let game = store
        .get(&config.game_id)
        .await?
        .with_context(|| format!("game {} not found in {}", config.game_id, config.store_path.display()))?;
    let league = game
        .settings
        .league
        .clone()
        .with_context(|| format!("game {} has no league linked", game.id))?;

    info!("Squares pool runner");
    info!("   Game: {}", status_line(&game));
    info!("   League: {} | event: {}", league, game.settings.event_id.as_deref().unwrap_or("(match by team names)"));
    info!("   Store: {}", config.store_path.display());
    info!("   Payout log: {}", payout_log.path().display());
    if !game.axes.is_scrambled() {
        warn!("   Digits not drawn yet; payouts wait until SCRAMBLE=1 is run");
    }

    let client = Arc::new(ScoreFeedClient::new()?);
    client.scoreboard_url(&league)?;
    if let Some(event_id) = game.settings.event_id.as_deref() {
        match client.fetch_event(&league, event_id).await {
            Ok(Some(event)) => info!(
                "   Linked event: {} ({} {} - {} {}, {:?})",
                event.id, event.home.name, event.home.score, event.away.name, event.away.score, event.state
            ),
            Ok(None) => warn!("   Event {} is not on the {} scoreboard yet", event_id, league),
            Err(e) => warn!("   Could not check event {}: {:#}", event_id, e),
        }
    }

    let cancel = CancellationToken::new();
    let (tx, rx) = create_pool_channel();

    let sync = PayoutSync::new(&config.game_id, store.clone()).with_payout_log(payout_log);
    let sync_handle = tokio::spawn(run_sync_loop(rx, sync, cancel.clone()));
    let game_handle = tokio::spawn(forward_game_snapshots(
        store.subscribe(&config.game_id),
        tx.clone(),
        cancel.clone(),
    ));
    let feed_handle = tokio::spawn(feed_poll_task(
        client,
        league,
        tx,
        config::feed_poll_interval_secs(),
        cancel.clone(),
    ));
    let status_handle = tokio::spawn(status_heartbeat_task(
        store.clone(),
        config.game_id.clone(),
        config::status_interval_secs(),
        cancel.clone(),
    ));

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutting down...");
    cancel.cancel();

    let _ = tokio::join!(sync_handle, game_handle, feed_handle, status_handle);
    Ok(())
}
