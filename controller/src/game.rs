//! Host-side game management.
//!
//! Every operation here is a direct request from a person, so store failures
//! and rejected updates are returned to the caller rather than swallowed.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tracing::info;

use squares::manual::plan_manual_payout;
use squares::{AxisSet, Cell, Claim, GameDoc, GameSettings, GameUpdate, PayoutEvent, Scores};

use crate::payout_log::PayoutLog;
use crate::store::DocumentStore;

/// Asks the host whether to record a payout nobody won.
#[async_trait]
pub trait RolloverPrompt: Send + Sync {
    async fn confirm_rollover(&self, payout: &PayoutEvent) -> bool;
}

/// Fixed answer, for non-interactive runs and tests.
pub struct AutoAnswer(pub bool);

#[async_trait]
impl RolloverPrompt for AutoAnswer {
    async fn confirm_rollover(&self, _payout: &PayoutEvent) -> bool {
        self.0
    }
}

pub struct GameService {
    store: Arc<dyn DocumentStore>,
    payout_log: Option<Arc<PayoutLog>>,
}

impl GameService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store, payout_log: None }
    }

    pub fn with_payout_log(mut self, log: Arc<PayoutLog>) -> Self {
        self.payout_log = Some(log);
        self
    }

    async fn load(&self, game_id: &str) -> Result<GameDoc> {
        self.store
            .get(game_id)
            .await?
            .ok_or_else(|| anyhow!("game {} not found", game_id))
    }

    async fn update(&self, game_id: &str, updates: Vec<GameUpdate>) -> Result<GameDoc> {
        self.store.update(game_id, updates).await
    }

    // === Lifecycle ===

    pub async fn create_game(&self, host_uid: &str, settings: GameSettings) -> Result<GameDoc> {
        if settings.team_a.trim().is_empty() || settings.team_b.trim().is_empty() {
            bail!("both team names are required");
        }
        if settings.price_per_square.is_nan() || settings.price_per_square < 0.0 {
            bail!("price per square must be non-negative");
        }
        let suffix: u32 = StdRng::from_entropy().gen();
        let id = format!("g_{}_{:08x}", Utc::now().timestamp_millis(), suffix);
        let doc = GameDoc::new(&id, host_uid, settings);
        self.store.create(doc.clone()).await?;
        info!("[GAME] {} created game {} ({} vs {})", host_uid, id, doc.settings.team_a, doc.settings.team_b);
        Ok(doc)
    }

    pub async fn update_settings(&self, game_id: &str, settings: GameSettings) -> Result<GameDoc> {
        self.update(game_id, vec![GameUpdate::SetSettings(settings)]).await
    }

    /// Draw the digits with a freshly seeded CSPRNG. Quarterly boards get all
    /// four axes in the same write.
    pub async fn scramble(&self, game_id: &str) -> Result<GameDoc> {
        let game = self.load(game_id).await?;
        if game.axes.is_scrambled() {
            bail!("digits for game {} are already drawn", game_id);
        }
        let mut rng = StdRng::from_entropy();
        let axes = AxisSet::scramble(game.settings.scramble_mode, &mut rng, Utc::now());
        let doc = self
            .update(game_id, vec![GameUpdate::SetAxes(axes)])
            .await
            .context("scramble failed")?;
        info!("[GAME] Digits drawn for {} ({:?})", game_id, doc.settings.scramble_mode);
        Ok(doc)
    }

    pub async fn reset(&self, game_id: &str) -> Result<GameDoc> {
        let doc = self.update(game_id, vec![GameUpdate::Reset]).await?;
        info!("[GAME] Game {} reset", game_id);
        Ok(doc)
    }

    pub async fn delete(&self, game_id: &str) -> Result<()> {
        if !self.store.delete(game_id).await? {
            bail!("game {} not found", game_id);
        }
        Ok(())
    }

    pub async fn list_hosted(&self, host_uid: &str) -> Result<Vec<GameDoc>> {
        self.store.query_by_host(host_uid).await
    }

    // === Board ===

    /// Claim and player entry land in one write.
    pub async fn claim(&self, game_id: &str, cell: Cell, uid: &str, name: &str) -> Result<GameDoc> {
        self.update(game_id, vec![GameUpdate::ClaimCell { cell, claim: Claim::new(uid, name) }])
            .await
    }

    pub async fn unclaim(&self, game_id: &str, cell: Cell, uid: &str) -> Result<GameDoc> {
        self.update(game_id, vec![GameUpdate::UnclaimCell { cell, uid: uid.to_string() }])
            .await
    }

    pub async fn mark_paid(&self, game_id: &str, uid: &str, paid: bool) -> Result<GameDoc> {
        self.update(game_id, vec![GameUpdate::SetPaid { uid: uid.to_string(), paid }])
            .await
    }

    // === Payouts ===

    /// Record a payout at `scores`, entered by the host.
    ///
    /// Changed scores are written first. When nobody holds the winning cell
    /// the host is asked before a rollover is recorded; declining leaves the
    /// history untouched and returns `None`.
    pub async fn manual_payout(
        &self,
        game_id: &str,
        scores: Scores,
        prompt: &dyn RolloverPrompt,
    ) -> Result<Option<PayoutEvent>> {
        let mut game = self.load(game_id).await?;
        if game.scores != scores {
            game = self.update(game_id, vec![GameUpdate::SetScores(scores)]).await?;
        }

        let plan = plan_manual_payout(&game, scores, Utc::now())?;
        if plan.needs_confirmation && !prompt.confirm_rollover(&plan.payout).await {
            info!("[PAYOUT] Host declined rollover at {} for game {}", scores, game_id);
            return Ok(None);
        }

        let payout = plan.payout;
        self.update(game_id, vec![GameUpdate::AppendPayout(payout.clone())])
            .await
            .with_context(|| format!("failed to record {}", payout.id))?;
        info!(
            "[PAYOUT] {} {} at {}: {} wins ${:.2}",
            payout.id, payout.label, scores, payout.winner_name, payout.amount
        );
        if let Some(log) = &self.payout_log {
            log.record(game_id, &payout);
        }
        Ok(Some(payout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalStore;
    use squares::{QuarterKey, ScrambleMode, NO_WINNER_ID};

    fn service() -> (GameService, Arc<LocalStore>) {
        let store = Arc::new(LocalStore::in_memory());
        (GameService::new(store.clone()), store)
    }

    fn settings() -> GameSettings {
        GameSettings::new("Pool", "Chiefs", "Eagles", 10.0)
    }

    #[tokio::test]
    async fn test_create_rejects_missing_team() {
        let (svc, _) = service();
        assert!(svc.create_game("h", GameSettings::new("P", "", "B", 1.0)).await.is_err());
        assert!(svc.create_game("h", GameSettings::new("P", "A", "B", -1.0)).await.is_err());
    }

    #[tokio::test]
    async fn test_scramble_once_and_lock_claims() {
        let (svc, _) = service();
        let game = svc.create_game("h", settings()).await.unwrap();
        svc.claim(&game.id, Cell::new(0, 0).unwrap(), "u1", "Ann").await.unwrap();

        let doc = svc.scramble(&game.id).await.unwrap();
        assert!(doc.axes.is_scrambled());
        assert!(svc.scramble(&game.id).await.is_err());
        assert!(svc.claim(&game.id, Cell::new(1, 1).unwrap(), "u1", "Ann").await.is_err());
        assert!(svc.unclaim(&game.id, Cell::new(0, 0).unwrap(), "u1").await.is_err());
    }

    #[tokio::test]
    async fn test_quarterly_scramble_writes_all_quarters() {
        let (svc, _) = service();
        let mut s = settings();
        s.scramble_mode = ScrambleMode::Quarterly;
        let game = svc.create_game("h", s).await.unwrap();
        let doc = svc.scramble(&game.id).await.unwrap();
        let quarterly = doc.axes.quarterly.unwrap();
        for key in QuarterKey::ALL {
            assert!(quarterly.axes[&key].is_valid() && quarterly.axes[&key].is_set());
        }
    }

    #[tokio::test]
    async fn test_manual_rollover_declined_writes_scores_only() {
        let (svc, store) = service();
        let game = svc.create_game("h", settings()).await.unwrap();
        svc.scramble(&game.id).await.unwrap();

        // Empty board: any score is a rollover
        let out = svc.manual_payout(&game.id, Scores::new(14, 7), &AutoAnswer(false)).await.unwrap();
        assert!(out.is_none());
        let doc = store.get(&game.id).await.unwrap().unwrap();
        assert_eq!(doc.scores, Scores::new(14, 7));
        assert!(doc.payouts.is_empty());
    }

    #[tokio::test]
    async fn test_manual_rollover_confirmed() {
        let (svc, store) = service();
        let game = svc.create_game("h", settings()).await.unwrap();
        for col in 0..10 {
            svc.claim(&game.id, Cell::new(9, col).unwrap(), "u1", "Ann").await.unwrap();
        }
        let doc = svc.scramble(&game.id).await.unwrap();
        // Pick a score that lands outside row 9
        let row0_digit = doc.axes.fixed.rows[0] as i64;

        let payout = svc
            .manual_payout(&game.id, Scores::new(row0_digit, 0), &AutoAnswer(true))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payout.winner_user_id, NO_WINNER_ID);
        assert_eq!(payout.label, "Q1 Winner");
        // 10 squares at $10, Q1 share
        assert!((payout.amount - 20.0).abs() < 1e-9);
        assert_eq!(store.get(&game.id).await.unwrap().unwrap().payouts.len(), 1);
    }

    #[tokio::test]
    async fn test_manual_payout_requires_digits() {
        let (svc, _) = service();
        let game = svc.create_game("h", settings()).await.unwrap();
        assert!(svc.manual_payout(&game.id, Scores::new(1, 1), &AutoAnswer(true)).await.is_err());
    }

    #[tokio::test]
    async fn test_mark_paid_reset_delete_list() {
        let (svc, _) = service();
        let game = svc.create_game("h", settings()).await.unwrap();
        svc.create_game("other", settings()).await.unwrap();
        svc.claim(&game.id, Cell::new(2, 2).unwrap(), "u1", "Ann").await.unwrap();
        let doc = svc.mark_paid(&game.id, "u1", true).await.unwrap();
        assert!(doc.players["u1"].paid);

        let doc = svc.reset(&game.id).await.unwrap();
        assert!(doc.players.is_empty());
        assert_eq!(svc.list_hosted("h").await.unwrap().len(), 1);

        svc.delete(&game.id).await.unwrap();
        assert!(svc.delete(&game.id).await.is_err());
        assert!(svc.list_hosted("h").await.unwrap().is_empty());
    }
}
