//! Partial updates to a game document.
//!
//! Every write to a game goes through [`GameUpdate`]. A batch is applied to a
//! copy of the document and only replaces it when every step succeeds, so a
//! claim and its player entry land together or not at all.

use crate::axis::AxisSet;
use crate::game::GameDoc;
use crate::types::{Cell, Claim, GameSettings, PayoutEvent, Player, Scores};

#[derive(Debug, Clone, PartialEq)]
pub enum GameUpdate {
    SetScores(Scores),
    SetSettings(GameSettings),
    /// Write freshly drawn digits. Refused once the board is scrambled.
    SetAxes(AxisSet),
    /// Union `claim` into the cell's list and make sure the player exists.
    ClaimCell { cell: Cell, claim: Claim },
    /// Remove every claim by `uid` on the cell.
    UnclaimCell { cell: Cell, uid: String },
    SetPaid { uid: String, paid: bool },
    /// Union into the payout history, keyed by trigger identity.
    AppendPayout(PayoutEvent),
    /// Clear board, players, scores, digits and history. Settings survive.
    Reset,
}

impl GameUpdate {
    pub fn name(&self) -> &'static str {
        match self {
            GameUpdate::SetScores(_) => "set_scores",
            GameUpdate::SetSettings(_) => "set_settings",
            GameUpdate::SetAxes(_) => "set_axes",
            GameUpdate::ClaimCell { .. } => "claim_cell",
            GameUpdate::UnclaimCell { .. } => "unclaim_cell",
            GameUpdate::SetPaid { .. } => "set_paid",
            GameUpdate::AppendPayout(_) => "append_payout",
            GameUpdate::Reset => "reset",
        }
    }
}

/// Whether an update touched the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Changed,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimError {
    /// The user already holds this cell
    AlreadyClaimed { cell: Cell, uid: String },
    /// Digits are drawn; the board is closed
    Locked,
}

impl std::fmt::Display for ClaimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClaimError::AlreadyClaimed { cell, uid } => {
                write!(f, "{} already holds cell {}", uid, cell)
            }
            ClaimError::Locked => write!(f, "claims are closed once digits are drawn"),
        }
    }
}

impl std::error::Error for ClaimError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateError {
    Claim(ClaimError),
    /// Digits can only be drawn once per reset
    AxesLocked,
    /// Digit sequences are not permutations of 0..10
    InvalidAxes,
    UnknownPlayer(String),
}

impl std::fmt::Display for UpdateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateError::Claim(e) => write!(f, "claim rejected: {}", e),
            UpdateError::AxesLocked => write!(f, "digits already drawn"),
            UpdateError::InvalidAxes => write!(f, "digit sequences must be permutations of 0-9"),
            UpdateError::UnknownPlayer(uid) => write!(f, "no player {}", uid),
        }
    }
}

impl std::error::Error for UpdateError {}

impl From<ClaimError> for UpdateError {
    fn from(e: ClaimError) -> Self {
        UpdateError::Claim(e)
    }
}

impl GameDoc {
    /// Apply one update in place.
    pub fn apply(&mut self, update: &GameUpdate) -> Result<Applied, UpdateError> {
        match update {
            GameUpdate::SetScores(scores) => Ok(replace(&mut self.scores, *scores)),
            GameUpdate::SetSettings(settings) => Ok(replace(&mut self.settings, settings.clone())),
            GameUpdate::SetAxes(axes) => {
                if self.axes.is_scrambled() {
                    return Err(UpdateError::AxesLocked);
                }
                if !axes.is_valid() {
                    return Err(UpdateError::InvalidAxes);
                }
                Ok(replace(&mut self.axes, axes.clone()))
            }
            GameUpdate::ClaimCell { cell, claim } => {
                if !self.claims_open() {
                    return Err(ClaimError::Locked.into());
                }
                let claims = self.grid.entry(cell.key()).or_default();
                if claims.iter().any(|c| c.uid == claim.uid) {
                    return Err(ClaimError::AlreadyClaimed { cell: *cell, uid: claim.uid.clone() }.into());
                }
                claims.push(claim.clone());
                self.players
                    .entry(claim.uid.clone())
                    .or_insert_with(|| Player { name: claim.name.clone(), paid: false });
                Ok(Applied::Changed)
            }
            GameUpdate::UnclaimCell { cell, uid } => {
                if !self.claims_open() {
                    return Err(ClaimError::Locked.into());
                }
                let key = cell.key();
                let Some(claims) = self.grid.get_mut(&key) else {
                    return Ok(Applied::Unchanged);
                };
                let before = claims.len();
                claims.retain(|c| &c.uid != uid);
                let removed = claims.len() != before;
                if claims.is_empty() {
                    self.grid.remove(&key);
                }
                Ok(if removed { Applied::Changed } else { Applied::Unchanged })
            }
            GameUpdate::SetPaid { uid, paid } => {
                let player = self
                    .players
                    .get_mut(uid)
                    .ok_or_else(|| UpdateError::UnknownPlayer(uid.clone()))?;
                Ok(replace(&mut player.paid, *paid))
            }
            GameUpdate::AppendPayout(payout) => {
                if self.has_payout(&payout.id) {
                    return Ok(Applied::Unchanged);
                }
                self.payouts.push(payout.clone());
                Ok(Applied::Changed)
            }
            GameUpdate::Reset => {
                self.grid.clear();
                self.players.clear();
                self.scores = Scores::default();
                self.payouts.clear();
                self.axes = AxisSet::default();
                Ok(Applied::Changed)
            }
        }
    }
}

/// Apply a batch to a copy of `doc`. Returns the new document, or `None` when
/// no step changed anything. On error `doc` is untouched.
pub fn apply_updates(doc: &GameDoc, updates: &[GameUpdate]) -> Result<Option<GameDoc>, UpdateError> {
    let mut next = doc.clone();
    let mut changed = false;
    for update in updates {
        changed |= next.apply(update)? == Applied::Changed;
    }
    Ok(changed.then_some(next))
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> Applied {
    if *slot == value {
        Applied::Unchanged
    } else {
        *slot = value;
        Applied::Changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::Axis;
    use crate::types::{PayoutKind, Winner};
    use chrono::Utc;

    fn game() -> GameDoc {
        GameDoc::new("g1", "host", GameSettings::new("Pool", "A", "B", 10.0))
    }

    fn claim(cell: (usize, usize), uid: &str, name: &str) -> GameUpdate {
        GameUpdate::ClaimCell { cell: Cell::new(cell.0, cell.1).unwrap(), claim: Claim::new(uid, name) }
    }

    fn drawn() -> AxisSet {
        let digits: Vec<u8> = (0..10).collect();
        AxisSet { fixed: Axis { rows: digits.clone(), cols: digits }, quarterly: None }
    }

    fn payout(id: &str, amount: f64) -> PayoutEvent {
        PayoutEvent {
            id: id.into(),
            label: "Q1 Winner".into(),
            amount,
            winners: vec![Winner { uid: "u1".into(), name: "Ann".into() }],
            winner_user_id: "u1".into(),
            winner_name: "Ann".into(),
            scores: Scores::new(3, 7),
            cell: Cell::new(3, 7),
            kind: PayoutKind::Automatic,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_claim_creates_player_and_counts() {
        let mut g = game();
        g.apply(&claim((1, 1), "u1", "Ann")).unwrap();
        g.apply(&claim((2, 2), "u1", "Ann")).unwrap();
        g.apply(&claim((1, 1), "u2", "Bob")).unwrap();
        assert_eq!(g.players.len(), 2);
        assert_eq!(g.player_squares("u1"), 2);
        assert_eq!(g.claims_at(Cell::new(1, 1).unwrap()).len(), 2);
    }

    #[test]
    fn test_duplicate_claim_rejected() {
        let mut g = game();
        g.apply(&claim((1, 1), "u1", "Ann")).unwrap();
        let err = g.apply(&claim((1, 1), "u1", "Ann")).unwrap_err();
        assert!(matches!(err, UpdateError::Claim(ClaimError::AlreadyClaimed { .. })));
        assert_eq!(g.player_squares("u1"), 1);
    }

    #[test]
    fn test_claims_locked_after_scramble() {
        let mut g = game();
        g.apply(&claim((1, 1), "u1", "Ann")).unwrap();
        g.apply(&GameUpdate::SetAxes(drawn())).unwrap();
        assert_eq!(g.apply(&claim((2, 2), "u1", "Ann")), Err(UpdateError::Claim(ClaimError::Locked)));
        let unclaim = GameUpdate::UnclaimCell { cell: Cell::new(1, 1).unwrap(), uid: "u1".into() };
        assert_eq!(g.apply(&unclaim), Err(UpdateError::Claim(ClaimError::Locked)));
    }

    #[test]
    fn test_unclaim_removes_only_that_user() {
        let mut g = game();
        g.apply(&claim((1, 1), "u1", "Ann")).unwrap();
        g.apply(&claim((1, 1), "u2", "Bob")).unwrap();
        let unclaim = GameUpdate::UnclaimCell { cell: Cell::new(1, 1).unwrap(), uid: "u1".into() };
        assert_eq!(g.apply(&unclaim), Ok(Applied::Changed));
        assert_eq!(g.apply(&unclaim), Ok(Applied::Unchanged));
        assert_eq!(g.player_squares("u1"), 0);
        assert_eq!(g.player_squares("u2"), 1);
    }

    #[test]
    fn test_axes_drawn_once() {
        let mut g = game();
        g.apply(&GameUpdate::SetAxes(drawn())).unwrap();
        assert_eq!(g.apply(&GameUpdate::SetAxes(drawn())), Err(UpdateError::AxesLocked));
    }

    #[test]
    fn test_invalid_axes_rejected() {
        let mut g = game();
        let bad = AxisSet { fixed: Axis { rows: vec![1; 10], cols: (0..10).collect() }, quarterly: None };
        assert_eq!(g.apply(&GameUpdate::SetAxes(bad)), Err(UpdateError::InvalidAxes));
    }

    #[test]
    fn test_append_payout_is_union_by_id() {
        let mut g = game();
        assert_eq!(g.apply(&GameUpdate::AppendPayout(payout("Q1_END", 20.0))), Ok(Applied::Changed));
        // Same identity, different body: refused
        assert_eq!(g.apply(&GameUpdate::AppendPayout(payout("Q1_END", 99.0))), Ok(Applied::Unchanged));
        assert_eq!(g.payouts.len(), 1);
        assert!((g.payouts[0].amount - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_set_paid_unknown_player() {
        let mut g = game();
        let err = g.apply(&GameUpdate::SetPaid { uid: "ghost".into(), paid: true }).unwrap_err();
        assert_eq!(err, UpdateError::UnknownPlayer("ghost".into()));
    }

    #[test]
    fn test_reset_keeps_settings() {
        let mut g = game();
        g.apply(&claim((1, 1), "u1", "Ann")).unwrap();
        g.apply(&GameUpdate::SetAxes(drawn())).unwrap();
        g.apply(&GameUpdate::SetScores(Scores::new(7, 3))).unwrap();
        g.apply(&GameUpdate::AppendPayout(payout("Q1_END", 20.0))).unwrap();
        g.apply(&GameUpdate::Reset).unwrap();

        assert!(g.grid.is_empty());
        assert!(g.players.is_empty());
        assert!(g.payouts.is_empty());
        assert_eq!(g.scores, Scores::default());
        assert!(g.claims_open());
        assert_eq!(g.settings.name, "Pool");
    }

    #[test]
    fn test_batch_is_all_or_nothing() {
        let g = game();
        let batch = vec![
            GameUpdate::SetScores(Scores::new(1, 2)),
            claim((1, 1), "u1", "Ann"),
            claim((1, 1), "u1", "Ann"),
        ];
        assert!(apply_updates(&g, &batch).is_err());
        assert_eq!(g.scores, Scores::default());
        assert!(g.grid.is_empty());
    }

    #[test]
    fn test_batch_without_changes() {
        let g = game();
        assert_eq!(apply_updates(&g, &[GameUpdate::SetScores(Scores::default())]), Ok(None));
        let next = apply_updates(&g, &[GameUpdate::SetScores(Scores::new(3, 0))]).unwrap().unwrap();
        assert_eq!(next.scores, Scores::new(3, 0));
    }
}
