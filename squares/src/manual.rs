//! Host-entered payouts.
//!
//! The host types in the score at the moment they want to pay. The label
//! follows the history length (Q1, Q2, Q3, then Final for every later entry)
//! and every call produces a fresh event. An empty winning cell is still
//! recorded when the host confirms it, carrying the period's pot share.

use chrono::{DateTime, Utc};

use crate::game::GameDoc;
use crate::payout::{build_payout, Trigger};
use crate::types::{PayoutEvent, PayoutKind, QuarterKey, Scores};

/// Prefix shared by all host-entered trigger identities.
pub const MANUAL_ID_PREFIX: &str = "manual_q_";

#[derive(Debug, Clone, PartialEq)]
pub enum ManualPayoutError {
    /// The board has no digits for the period being paid
    AxisNotScrambled(QuarterKey),
}

impl std::fmt::Display for ManualPayoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ManualPayoutError::AxisNotScrambled(key) => {
                write!(f, "digits for {} have not been drawn yet", key)
            }
        }
    }
}

impl std::error::Error for ManualPayoutError {}

/// A manual payout ready to append.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualPlan {
    pub payout: PayoutEvent,
    /// Nobody holds the winning cell; the host must confirm the rollover
    pub needs_confirmation: bool,
}

/// Identity for a manual payout created at `now`. Bumped past any id already in
/// the history so two entries within the same millisecond stay distinct.
pub fn manual_trigger_id(game: &GameDoc, now: DateTime<Utc>) -> String {
    let mut ts = now.timestamp_millis();
    loop {
        let id = format!("{}{}", MANUAL_ID_PREFIX, ts);
        if !game.has_payout(&id) {
            return id;
        }
        ts += 1;
    }
}

/// Build the next manual payout for `scores`.
///
/// `game` should already carry `scores`; the caller writes them before
/// planning so subscribers see the score the payout was made on.
pub fn plan_manual_payout(
    game: &GameDoc,
    scores: Scores,
    now: DateTime<Utc>,
) -> Result<ManualPlan, ManualPayoutError> {
    let key = QuarterKey::from_sequence(game.payouts.len());
    let label = game
        .settings
        .payout_overrides
        .get(&key)
        .and_then(|o| o.label.clone())
        .unwrap_or_else(|| key.winner_label().to_string());
    let trigger = Trigger {
        id: manual_trigger_id(game, now),
        label,
        key,
        share: key.default_share(),
        halved: false,
    };

    let payout = build_payout(game, &trigger, scores, PayoutKind::Manual, true, now)
        .ok_or(ManualPayoutError::AxisNotScrambled(key))?;
    let needs_confirmation = payout.is_rollover();
    Ok(ManualPlan { payout, needs_confirmation })
}
