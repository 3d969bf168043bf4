//! The game document: one hosted pool with its board, players, scores and
//! payout history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::axis::AxisSet;
use crate::types::{Cell, Claim, GameSettings, PayoutEvent, Player, Scores};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameDoc {
    pub id: String,
    pub host_uid: String,
    pub created_at: DateTime<Utc>,
    pub settings: GameSettings,
    #[serde(default)]
    pub axes: AxisSet,
    /// Claims keyed by [`Cell::key`], each list in insertion order
    #[serde(default)]
    pub grid: BTreeMap<String, Vec<Claim>>,
    #[serde(default)]
    pub players: BTreeMap<String, Player>,
    #[serde(default)]
    pub scores: Scores,
    #[serde(default)]
    pub payouts: Vec<PayoutEvent>,
}

impl GameDoc {
    pub fn new(id: &str, host_uid: &str, settings: GameSettings) -> Self {
        Self {
            id: id.to_string(),
            host_uid: host_uid.to_string(),
            created_at: Utc::now(),
            settings,
            axes: AxisSet::default(),
            grid: BTreeMap::new(),
            players: BTreeMap::new(),
            scores: Scores::default(),
            payouts: Vec::new(),
        }
    }

    pub fn claims_at(&self, cell: Cell) -> &[Claim] {
        self.grid.get(&cell.key()).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Squares held by `uid`, counted from the claim map.
    pub fn player_squares(&self, uid: &str) -> usize {
        self.grid
            .values()
            .map(|claims| claims.iter().filter(|c| c.uid == uid).count())
            .sum()
    }

    pub fn total_squares(&self) -> usize {
        self.grid.values().map(Vec::len).sum()
    }

    /// Σ over players of squares × price.
    pub fn total_pot(&self) -> f64 {
        self.total_squares() as f64 * self.settings.price_per_square
    }

    /// Amount owed by `uid` for their squares.
    pub fn amount_owed(&self, uid: &str) -> f64 {
        self.player_squares(uid) as f64 * self.settings.price_per_square
    }

    pub fn has_payout(&self, trigger_id: &str) -> bool {
        self.payouts.iter().any(|p| p.id == trigger_id)
    }

    /// Claims are only accepted before the digits are drawn.
    pub fn claims_open(&self) -> bool {
        !self.axes.is_scrambled()
    }

    /// Total paid out so far across the history.
    pub fn total_paid_out(&self) -> f64 {
        self.payouts.iter().map(|p| p.amount).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game_with_claims() -> GameDoc {
        let mut game = GameDoc::new("g1", "host", GameSettings::new("Pool", "A", "B", 5.0));
        let c1 = Cell::new(0, 0).unwrap();
        let c2 = Cell::new(4, 2).unwrap();
        game.grid.insert(c1.key(), vec![Claim::new("u1", "Ann"), Claim::new("u2", "Bob")]);
        game.grid.insert(c2.key(), vec![Claim::new("u1", "Ann")]);
        game
    }

    #[test]
    fn test_player_squares_derived_from_claims() {
        let game = game_with_claims();
        assert_eq!(game.player_squares("u1"), 2);
        assert_eq!(game.player_squares("u2"), 1);
        assert_eq!(game.player_squares("nobody"), 0);
        assert_eq!(game.total_squares(), 3);
    }

    #[test]
    fn test_total_pot() {
        let game = game_with_claims();
        assert!((game.total_pot() - 15.0).abs() < 1e-9);
        assert!((game.amount_owed("u1") - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_claims_at_empty_cell() {
        let game = game_with_claims();
        assert!(game.claims_at(Cell::new(9, 9).unwrap()).is_empty());
        assert_eq!(game.claims_at(Cell::new(0, 0).unwrap()).len(), 2);
    }

    #[test]
    fn test_doc_deserializes_with_missing_optional_fields() {
        let json = r#"{
            "id": "g1",
            "host_uid": "host",
            "created_at": "2026-01-01T00:00:00Z",
            "settings": {"name": "Pool", "team_a": "A", "team_b": "B", "price_per_square": 2.0}
        }"#;
        let game: GameDoc = serde_json::from_str(json).unwrap();
        assert!(game.grid.is_empty());
        assert!(game.payouts.is_empty());
        assert!(game.claims_open());
        assert_eq!(game.settings.payout_frequency, None);
    }
}
