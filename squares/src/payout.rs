//! Payout trigger engine.
//!
//! Given the current game document and one feed snapshot, decide whether a new
//! payout-worthy moment has been reached and, if so, build the event. The only
//! state carried between calls is the game's payout history: a trigger identity
//! already present in it never fires again.
//!
//! Trigger identities:
//! - `H1_END`, `H2_END`: soccer halftime / full time
//! - `Q{p}_MID`: frequent-mode midpoint of period `p`
//! - `Q{p}_END`: end of period `p` (1..=4)

use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

use crate::axis::resolve_axis;
use crate::feed::{EventState, LiveEvent};
use crate::game::GameDoc;
use crate::grid::{map_score_to_cell, winner_summary, winners_at};
use crate::types::{GameSettings, PayoutEvent, PayoutFrequency, PayoutKind, QuarterKey, Scores};

/// Seconds remaining at or below which a period is in its midpoint window.
pub const MIDPOINT_WINDOW_SECS: f64 = 360.0;

/// Pot share for each soccer half.
pub const SOCCER_HALF_SHARE: f64 = 0.50;

static RE_HALFTIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bhalf[\s-]*time\b|^\s*HT\s*$").expect("valid halftime regex"));

// =============================================================================
// LEAGUE CLASSIFICATION
// =============================================================================

/// Sport family, derived from the league string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SportCategory {
    Soccer,
    Basketball,
    Football,
    Other,
}

impl SportCategory {
    pub fn from_league(league: &str) -> Self {
        let l = league.to_ascii_lowercase();
        let any = |needles: &[&str]| needles.iter().any(|n| l.contains(n));

        // ESPN only uses dotted league segments ("eng.1", "uefa.champions") for soccer
        if l.contains('.')
            || any(&["soccer", "ucl", "epl", "mls", "uefa", "laliga", "bundesliga", "seriea", "ligue1", "eredivisie"])
        {
            SportCategory::Soccer
        } else if any(&["nba", "basketball", "ncaab", "ncaam", "ncaaw"]) {
            SportCategory::Basketball
        } else if any(&["nfl", "ncaaf", "football", "cfb"]) {
            SportCategory::Football
        } else {
            SportCategory::Other
        }
    }
}

/// The cadence the engine actually runs with.
///
/// Basketball keeps `NBA_Frequent` if configured and otherwise runs
/// `NBA_Standard`; football always runs `NBA_Standard`; anything else uses the
/// configured value unchanged. `None` or `Manual` means no automatic payouts.
pub fn effective_frequency(league: &str, configured: Option<PayoutFrequency>) -> Option<PayoutFrequency> {
    match SportCategory::from_league(league) {
        SportCategory::Basketball => match configured {
            Some(PayoutFrequency::NbaFrequent) => Some(PayoutFrequency::NbaFrequent),
            _ => Some(PayoutFrequency::NbaStandard),
        },
        SportCategory::Football => Some(PayoutFrequency::NbaStandard),
        SportCategory::Soccer | SportCategory::Other => configured,
    }
}

// =============================================================================
// CLOCK
// =============================================================================

/// Remaining seconds from a feed clock: "MM:SS" (seconds may carry a decimal),
/// or bare seconds such as "24.3" shown in the last minute.
pub fn parse_clock(clock: &str) -> Option<f64> {
    let clock = clock.trim();
    let secs = match clock.split_once(':') {
        Some((mins, secs)) => {
            let mins: f64 = mins.trim().parse().ok()?;
            let secs: f64 = secs.trim().parse().ok()?;
            mins * 60.0 + secs
        }
        None => clock.parse().ok()?,
    };
    (secs.is_finite() && secs >= 0.0).then_some(secs)
}

/// Where the current period stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodPhase {
    Running,
    /// 0 < remaining ≤ [`MIDPOINT_WINDOW_SECS`]
    Midpoint,
    /// Clock expired, or the event is over
    End,
}

pub fn period_phase(event: &LiveEvent) -> PeriodPhase {
    match event.state {
        EventState::Post => return PeriodPhase::End,
        // Pre-game feeds report a zeroed clock
        EventState::Pre => return PeriodPhase::Running,
        _ => {}
    }
    match parse_clock(&event.clock) {
        Some(s) if s <= 0.0 => PeriodPhase::End,
        Some(s) if s <= MIDPOINT_WINDOW_SECS => PeriodPhase::Midpoint,
        _ => PeriodPhase::Running,
    }
}

pub fn is_halftime(status_detail: &str) -> bool {
    RE_HALFTIME.is_match(status_detail)
}

// =============================================================================
// TRIGGERS
// =============================================================================

/// A payout-worthy moment, before winners and amount are resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub id: String,
    pub label: String,
    /// Axis and override key for this moment
    pub key: QuarterKey,
    /// Default fraction of the pot
    pub share: f64,
    /// Frequent mode pays twice per period, so each payout is half a share
    pub halved: bool,
}

impl Trigger {
    fn period_end(key: QuarterKey, period: u32, settings: &GameSettings, halved: bool) -> Self {
        let label = settings
            .payout_overrides
            .get(&key)
            .and_then(|o| o.label.clone())
            .unwrap_or_else(|| key.winner_label().to_string());
        Self {
            id: format!("Q{}_END", period),
            label,
            key,
            share: key.default_share(),
            halved,
        }
    }

    fn midpoint(key: QuarterKey, period: u32) -> Self {
        Self {
            id: format!("Q{}_MID", period),
            label: format!("Q{} Midpoint", period),
            key,
            share: key.default_share(),
            halved: true,
        }
    }

    fn soccer_half(half: u32, settings: &GameSettings) -> Self {
        let (key, default_label) = if half == 1 {
            (QuarterKey::Q1, "Halftime Winner")
        } else {
            (QuarterKey::Final, "Final Winner")
        };
        let label = settings
            .payout_overrides
            .get(&key)
            .and_then(|o| o.label.clone())
            .unwrap_or_else(|| default_label.to_string());
        Self {
            id: format!("H{}_END", half),
            label,
            key,
            share: SOCCER_HALF_SHARE,
            halved: false,
        }
    }

    /// Amount paid for this trigger against `game`'s current pot.
    ///
    /// A host override amount replaces the period's share of the pot; halving
    /// still applies so a frequent-mode period totals the override.
    pub fn amount(&self, game: &GameDoc) -> f64 {
        let base = game
            .settings
            .payout_overrides
            .get(&self.key)
            .and_then(|o| o.amount)
            .unwrap_or_else(|| game.total_pot() * self.share);
        if self.halved {
            base / 2.0
        } else {
            base
        }
    }
}

/// Work out which trigger, if any, this snapshot represents. Does not consult
/// the payout history.
pub fn detect_trigger(settings: &GameSettings, event: &LiveEvent) -> Option<Trigger> {
    let league = settings.league.as_deref().unwrap_or(event.league.as_str());

    if SportCategory::from_league(league) == SportCategory::Soccer {
        if event.period == 1 && is_halftime(&event.status_detail) {
            return Some(Trigger::soccer_half(1, settings));
        }
        if event.is_post() {
            return Some(Trigger::soccer_half(2, settings));
        }
        return None;
    }

    let frequency = match effective_frequency(league, settings.payout_frequency) {
        None | Some(PayoutFrequency::Manual) => return None,
        Some(f) => f,
    };
    let key = QuarterKey::from_period(event.period)?;
    let frequent = frequency == PayoutFrequency::NbaFrequent;

    match period_phase(event) {
        PeriodPhase::Midpoint if frequent => Some(Trigger::midpoint(key, event.period)),
        PeriodPhase::End => Some(Trigger::period_end(key, event.period, settings, frequent)),
        _ => None,
    }
}

// =============================================================================
// EVALUATION
// =============================================================================

/// Outcome of running the engine on one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// A new event to append to the history
    Fire(PayoutEvent),
    /// Nothing payout-worthy in this snapshot
    NoTrigger,
    /// Trigger identity already in the history
    AlreadyPaid(String),
    /// Trigger reached but the board has no digits for it yet
    Indeterminate(String),
}

/// Resolve winners and amount for `trigger` at `scores`.
///
/// Returns `None` when the axis for the trigger's period is unset. With no
/// claim on the winning cell the event is a rollover; its amount is zero
/// unless `rollover_keeps_amount` is set.
pub fn build_payout(
    game: &GameDoc,
    trigger: &Trigger,
    scores: Scores,
    kind: PayoutKind,
    rollover_keeps_amount: bool,
    now: DateTime<Utc>,
) -> Option<PayoutEvent> {
    let axis = resolve_axis(&game.axes, trigger.key);
    let cell = map_score_to_cell(axis, scores.team_a, scores.team_b)?;
    let winners = winners_at(game, cell);
    let (winner_user_id, winner_name) = winner_summary(&winners);
    let amount = if winners.is_empty() && !rollover_keeps_amount {
        0.0
    } else {
        trigger.amount(game)
    };

    Some(PayoutEvent {
        id: trigger.id.clone(),
        label: trigger.label.clone(),
        amount,
        winners,
        winner_user_id,
        winner_name,
        scores,
        cell: Some(cell),
        kind,
        created_at: now,
    })
}

/// Run the engine for one feed snapshot. `scores` are the snapshot's scores
/// already aligned to the pool's teams.
pub fn evaluate(game: &GameDoc, event: &LiveEvent, scores: Scores, now: DateTime<Utc>) -> Decision {
    let Some(trigger) = detect_trigger(&game.settings, event) else {
        return Decision::NoTrigger;
    };
    if game.has_payout(&trigger.id) {
        return Decision::AlreadyPaid(trigger.id);
    }
    match build_payout(game, &trigger, scores, PayoutKind::Automatic, false, now) {
        Some(payout) => Decision::Fire(payout),
        None => Decision::Indeterminate(trigger.id),
    }
}
