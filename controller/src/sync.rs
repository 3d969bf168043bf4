//! Live payout sync.
//!
//! Two producers feed one queue: the feed poller pushes scoreboard snapshots
//! and the store subscription pushes game snapshots. A single consumer handles
//! them in arrival order against the latest game snapshot it has seen.
//!
//! Writes to the store are spawned and never awaited by the consumer. Trigger
//! identities with a write in flight are remembered locally so a repeated feed
//! snapshot cannot fire the same payout twice before the store echoes it back.
//! A failed write forgets the identity, so the next qualifying snapshot retries.

use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use squares::payout::{evaluate, Decision};
use squares::teams::{align_event, names_match};
use squares::{GameDoc, GameUpdate, LiveEvent, Scores};

use crate::feed::ScoreFeedClient;
use crate::payout_log::PayoutLog;
use crate::store::DocumentStore;

/// One unit of work for the sync loop.
#[derive(Debug, Clone)]
pub enum PoolEvent {
    /// A scoreboard snapshot from the feed
    Feed(Vec<LiveEvent>),
    /// The game document changed (`None` once deleted)
    Game(Option<GameDoc>),
}

pub fn create_pool_channel() -> (mpsc::UnboundedSender<PoolEvent>, mpsc::UnboundedReceiver<PoolEvent>) {
    mpsc::unbounded_channel()
}

/// Pick the pool's event out of a scoreboard: by linked id when set,
/// otherwise the first event whose names align with both pool teams.
pub fn find_linked_event<'a>(game: &GameDoc, events: &'a [LiveEvent]) -> Option<&'a LiveEvent> {
    let settings = &game.settings;
    match settings.event_id.as_deref() {
        Some(id) => events.iter().find(|e| e.id == id),
        None => events.iter().find(|e| {
            let a = names_match(&settings.team_a, &e.home.name) || names_match(&settings.team_a, &e.away.name);
            let b = names_match(&settings.team_b, &e.home.name) || names_match(&settings.team_b, &e.away.name);
            a && b
        }),
    }
}

/// Consumer state for one game.
pub struct PayoutSync {
    game_id: String,
    store: Arc<dyn DocumentStore>,
    payout_log: Option<Arc<PayoutLog>>,
    latest: Option<GameDoc>,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl PayoutSync {
    pub fn new(game_id: &str, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            game_id: game_id.to_string(),
            store,
            payout_log: None,
            latest: None,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn with_payout_log(mut self, log: Arc<PayoutLog>) -> Self {
        self.payout_log = Some(log);
        self
    }

    /// Trigger identities with a write outstanding.
    pub fn in_flight(&self) -> Vec<String> {
        self.in_flight.lock().iter().cloned().collect()
    }

    pub fn handle(&mut self, event: PoolEvent) {
        match event {
            PoolEvent::Game(doc) => self.on_game(doc),
            PoolEvent::Feed(events) => self.on_feed(&events),
        }
    }

    fn on_game(&mut self, doc: Option<GameDoc>) {
        match doc {
            Some(doc) => {
                // Identities now in history no longer need the local guard
                self.in_flight.lock().retain(|id| !doc.has_payout(id));
                self.latest = Some(doc);
            }
            None => {
                if self.latest.take().is_some() {
                    info!("[SYNC] Game {} was deleted", self.game_id);
                }
                self.in_flight.lock().clear();
            }
        }
    }

    fn on_feed(&mut self, events: &[LiveEvent]) {
        let Some(game) = &self.latest else {
            debug!("[SYNC] No game snapshot yet, skipping feed update");
            return;
        };
        let Some(event) = find_linked_event(game, events) else {
            debug!("[SYNC] Linked event not on scoreboard");
            return;
        };
        let Some(alignment) = align_event(&game.settings.team_a, &game.settings.team_b, event) else {
            debug!(
                "[SYNC] Teams unmatched: pool {} / {} vs feed {} / {}",
                game.settings.team_a, game.settings.team_b, event.home.name, event.away.name
            );
            return;
        };
        let Some(aligned) = alignment.scores(event) else {
            debug!("[SYNC] Unparseable scores {:?} / {:?}", event.home.score, event.away.score);
            return;
        };
        let scores = Scores::new(aligned.score_a, aligned.score_b);

        let mut updates = Vec::new();
        if scores != game.scores {
            updates.push(GameUpdate::SetScores(scores));
        }

        let mut fired = None;
        match evaluate(game, event, scores, Utc::now()) {
            Decision::Fire(payout) => {
                if self.in_flight.lock().insert(payout.id.clone()) {
                    info!(
                        "[PAYOUT] {} {} at {}: {} wins ${:.2}",
                        payout.id, payout.label, scores, payout.winner_name, payout.amount
                    );
                    fired = Some(payout.id.clone());
                    updates.push(GameUpdate::AppendPayout(payout));
                } else {
                    debug!("[SYNC] {} already in flight", payout.id);
                }
            }
            Decision::AlreadyPaid(id) => debug!("[SYNC] {} already paid", id),
            Decision::Indeterminate(id) => debug!("[SYNC] {} reached but digits not drawn", id),
            Decision::NoTrigger => {}
        }

        if updates.is_empty() {
            return;
        }
        self.spawn_write(updates, fired);
    }

    fn spawn_write(&self, updates: Vec<GameUpdate>, fired: Option<String>) {
        let store = self.store.clone();
        let game_id = self.game_id.clone();
        let in_flight = self.in_flight.clone();
        let payout_log = self.payout_log.clone();

        tokio::spawn(async move {
            match store.update(&game_id, updates).await {
                Ok(doc) => {
                    let Some(id) = fired else { return };
                    if let (Some(log), Some(payout)) = (payout_log, doc.payouts.iter().find(|p| p.id == id)) {
                        log.record(&game_id, payout);
                    }
                }
                Err(e) => {
                    if let Some(id) = fired {
                        in_flight.lock().remove(&id);
                        error!("[SYNC] Failed to record {} for game {}: {:#}", id, game_id, e);
                    } else {
                        warn!("[SYNC] Failed to write scores for game {}: {:#}", game_id, e);
                    }
                }
            }
        });
    }
}

/// Drain the queue until cancelled or every producer is gone.
pub async fn run_sync_loop(
    mut rx: mpsc::UnboundedReceiver<PoolEvent>,
    mut sync: PayoutSync,
    cancel: CancellationToken,
) {
    info!("[SYNC] Sync loop started for game {}", sync.game_id);
    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,
            event = rx.recv() => match event {
                Some(event) => sync.handle(event),
                None => break,
            },
        }
    }
    info!("[SYNC] Sync loop stopped");
}

/// Forward every store snapshot for the game into the queue.
pub async fn forward_game_snapshots(
    mut rx: watch::Receiver<Option<GameDoc>>,
    tx: mpsc::UnboundedSender<PoolEvent>,
    cancel: CancellationToken,
) {
    let initial = rx.borrow_and_update().clone();
    if tx.send(PoolEvent::Game(initial)).is_err() {
        return;
    }
    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    warn!("[SYNC] Game subscription closed");
                    break;
                }
                let doc = rx.borrow_and_update().clone();
                if tx.send(PoolEvent::Game(doc)).is_err() {
                    break;
                }
            }
        }
    }
}

/// Poll the league scoreboard every `interval_secs` and push each snapshot.
pub async fn feed_poll_task(
    client: Arc<ScoreFeedClient>,
    league: String,
    tx: mpsc::UnboundedSender<PoolEvent>,
    interval_secs: u64,
    cancel: CancellationToken,
) {
    info!("[FEED] Polling {} scoreboard every {}s", league, interval_secs);
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                match client.fetch_scoreboard(&league).await {
                    Ok(events) => {
                        if tx.send(PoolEvent::Feed(events)).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("[FEED] {:#}", e),
                }
            }
        }
    }
    info!("[FEED] Poller stopped");
}

/// Periodic one-line summary of the game.
pub async fn status_heartbeat_task(
    store: Arc<dyn DocumentStore>,
    game_id: String,
    interval_secs: u64,
    cancel: CancellationToken,
) {
    if interval_secs == 0 {
        return;
    }
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    interval.tick().await; // Skip immediate first tick

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                match store.get(&game_id).await {
                    Ok(Some(game)) => info!("[STATUS] {}", status_line(&game)),
                    Ok(None) => warn!("[STATUS] Game {} not found", game_id),
                    Err(e) => warn!("[STATUS] {:#}", e),
                }
            }
        }
    }
}

pub fn status_line(game: &GameDoc) -> String {
    let s = &game.settings;
    format!(
        "{} | {} {} - {} {} | pot ${:.2} ({} squares) | {} payouts, ${:.2} paid | digits {}",
        s.name,
        s.team_a,
        game.scores.team_a,
        game.scores.team_b,
        s.team_b,
        game.total_pot(),
        game.total_squares(),
        game.payouts.len(),
        game.total_paid_out(),
        if game.axes.is_scrambled() { "drawn" } else { "pending" },
    )
}
