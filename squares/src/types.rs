//! Core value types for a squares pool.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rows and columns on the board. Axis digits are the trailing digit of a score.
pub const GRID_SIZE: usize = 10;

/// Winner id recorded when nobody holds the winning cell.
pub const NO_WINNER_ID: &str = "NONE";

/// Winner name recorded when nobody holds the winning cell.
pub const NO_WINNER_NAME: &str = "No Winner (Rollover)";

// === Board ===

/// A board coordinate, both components in `0..GRID_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub row: u8,
    pub col: u8,
}

impl Cell {
    pub fn new(row: usize, col: usize) -> Option<Self> {
        if row < GRID_SIZE && col < GRID_SIZE {
            Some(Self { row: row as u8, col: col as u8 })
        } else {
            None
        }
    }

    /// Field-path key used in the claim map, e.g. "3-7".
    pub fn key(&self) -> String {
        format!("{}-{}", self.row, self.col)
    }

    /// Inverse of [`Cell::key`].
    pub fn from_key(key: &str) -> Option<Self> {
        let (row, col) = key.split_once('-')?;
        Self::new(row.trim().parse().ok()?, col.trim().parse().ok()?)
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

// === Periods ===

/// Period key used for quarterly axes, payout labels and overrides.
///
/// Soccer halves map onto this key space: the first half uses `Q1`, the second `Final`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QuarterKey {
    Q1,
    Q2,
    Q3,
    Final,
}

impl QuarterKey {
    pub const ALL: [QuarterKey; 4] = [QuarterKey::Q1, QuarterKey::Q2, QuarterKey::Q3, QuarterKey::Final];

    /// Key for a 1-based feed period. Periods outside 1..=4 have no key.
    pub fn from_period(period: u32) -> Option<Self> {
        match period {
            1 => Some(QuarterKey::Q1),
            2 => Some(QuarterKey::Q2),
            3 => Some(QuarterKey::Q3),
            4 => Some(QuarterKey::Final),
            _ => None,
        }
    }

    /// Key for the Nth payout in call order (0-based), clamped at `Final`.
    pub fn from_sequence(index: usize) -> Self {
        Self::ALL[index.min(Self::ALL.len() - 1)]
    }

    /// Standard end-of-period label.
    pub fn winner_label(&self) -> &'static str {
        match self {
            QuarterKey::Q1 => "Q1 Winner",
            QuarterKey::Q2 => "Q2 Winner",
            QuarterKey::Q3 => "Q3 Winner",
            QuarterKey::Final => "Final Winner",
        }
    }

    /// Default share of the pot paid for this period.
    pub fn default_share(&self) -> f64 {
        match self {
            QuarterKey::Final => 0.40,
            _ => 0.20,
        }
    }
}

impl std::fmt::Display for QuarterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuarterKey::Q1 => write!(f, "Q1"),
            QuarterKey::Q2 => write!(f, "Q2"),
            QuarterKey::Q3 => write!(f, "Q3"),
            QuarterKey::Final => write!(f, "Final"),
        }
    }
}

// === Participants ===

/// One user's hold on one cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub uid: String,
    pub name: String,
    pub claimed_at: DateTime<Utc>,
}

impl Claim {
    pub fn new(uid: &str, name: &str) -> Self {
        Self {
            uid: uid.to_string(),
            name: name.to_string(),
            claimed_at: Utc::now(),
        }
    }
}

/// Per-game player record. Square counts are derived from the claim map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    #[serde(default)]
    pub paid: bool,
}

/// Current score, indexed by the pool's own team slots (A = rows, B = columns).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scores {
    pub team_a: i64,
    pub team_b: i64,
}

impl Scores {
    pub fn new(team_a: i64, team_b: i64) -> Self {
        Self { team_a, team_b }
    }
}

impl std::fmt::Display for Scores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.team_a, self.team_b)
    }
}

// === Payouts ===

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Winner {
    pub uid: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutKind {
    /// Fired by the engine from a feed snapshot
    Automatic,
    /// Entered by the host
    Manual,
}

/// Immutable payout history entry, unique per `id` within a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutEvent {
    /// Trigger identity, e.g. "Q1_END", "Q2_MID", "H1_END", "manual_q_1700000000000"
    pub id: String,
    pub label: String,
    pub amount: f64,
    /// Everyone holding the winning cell, in claim order. Empty on rollover.
    pub winners: Vec<Winner>,
    pub winner_user_id: String,
    pub winner_name: String,
    pub scores: Scores,
    pub cell: Option<Cell>,
    pub kind: PayoutKind,
    pub created_at: DateTime<Utc>,
}

impl PayoutEvent {
    pub fn is_rollover(&self) -> bool {
        self.winners.is_empty()
    }
}

// === Settings ===

/// Payout cadence. `NBA_Standard` is never configured directly; it is the
/// effective mode resolved for basketball and football leagues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayoutFrequency {
    Standard,
    #[serde(rename = "NBA_Frequent")]
    NbaFrequent,
    #[serde(rename = "NBA_Standard")]
    NbaStandard,
    Manual,
}

impl std::fmt::Display for PayoutFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayoutFrequency::Standard => write!(f, "Standard"),
            PayoutFrequency::NbaFrequent => write!(f, "NBA_Frequent"),
            PayoutFrequency::NbaStandard => write!(f, "NBA_Standard"),
            PayoutFrequency::Manual => write!(f, "Manual"),
        }
    }
}

impl std::str::FromStr for PayoutFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(PayoutFrequency::Standard),
            "nba_frequent" | "frequent" => Ok(PayoutFrequency::NbaFrequent),
            "nba_standard" => Ok(PayoutFrequency::NbaStandard),
            "manual" => Ok(PayoutFrequency::Manual),
            other => Err(format!("unknown payout frequency '{}'", other)),
        }
    }
}

/// How digits are drawn when the host scrambles the board.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrambleMode {
    /// One axis for the whole event
    #[default]
    Static,
    /// A fresh axis for each of Q1, Q2, Q3 and Final
    Quarterly,
}

/// Host-defined replacement for a period's default label or pot share.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PayoutOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Fixed amount paid for the period instead of its share of the pot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
}

/// Game configuration. Mutated by the host, read-only to players.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameSettings {
    pub name: String,
    pub team_a: String,
    pub team_b: String,
    pub price_per_square: f64,
    /// Linked live-feed event
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub league: Option<String>,
    #[serde(default)]
    pub payout_frequency: Option<PayoutFrequency>,
    #[serde(default)]
    pub scramble_mode: ScrambleMode,
    #[serde(default)]
    pub payout_overrides: BTreeMap<QuarterKey, PayoutOverride>,
}

impl GameSettings {
    pub fn new(name: &str, team_a: &str, team_b: &str, price_per_square: f64) -> Self {
        Self {
            name: name.to_string(),
            team_a: team_a.to_string(),
            team_b: team_b.to_string(),
            price_per_square,
            ..Default::default()
        }
    }

    pub fn league_lower(&self) -> String {
        self.league.as_deref().unwrap_or_default().to_ascii_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_key_roundtrip() {
        let cell = Cell::new(3, 7).unwrap();
        assert_eq!(cell.key(), "3-7");
        assert_eq!(Cell::from_key("3-7"), Some(cell));
        assert_eq!(Cell::from_key("10-1"), None);
        assert_eq!(Cell::from_key("garbage"), None);
    }

    #[test]
    fn test_cell_out_of_range() {
        assert!(Cell::new(9, 9).is_some());
        assert!(Cell::new(10, 0).is_none());
    }

    #[test]
    fn test_default_shares_sum_to_one() {
        let total: f64 = QuarterKey::ALL.iter().map(|k| k.default_share()).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_quarter_from_sequence_clamps_at_final() {
        assert_eq!(QuarterKey::from_sequence(0), QuarterKey::Q1);
        assert_eq!(QuarterKey::from_sequence(2), QuarterKey::Q3);
        assert_eq!(QuarterKey::from_sequence(3), QuarterKey::Final);
        assert_eq!(QuarterKey::from_sequence(9), QuarterKey::Final);
    }

    #[test]
    fn test_quarter_from_period_range() {
        assert_eq!(QuarterKey::from_period(0), None);
        assert_eq!(QuarterKey::from_period(4), Some(QuarterKey::Final));
        assert_eq!(QuarterKey::from_period(5), None);
    }

    #[test]
    fn test_payout_frequency_serde_names() {
        let json = serde_json::to_string(&PayoutFrequency::NbaFrequent).unwrap();
        assert_eq!(json, "\"NBA_Frequent\"");
        let parsed: PayoutFrequency = serde_json::from_str("\"Standard\"").unwrap();
        assert_eq!(parsed, PayoutFrequency::Standard);
        assert_eq!("nba_frequent".parse::<PayoutFrequency>(), Ok(PayoutFrequency::NbaFrequent));
        assert!("weekly".parse::<PayoutFrequency>().is_err());
    }

    #[test]
    fn test_overrides_serialize_with_quarter_keys() {
        let mut settings = GameSettings::new("Pool", "A", "B", 10.0);
        settings.payout_overrides.insert(
            QuarterKey::Final,
            PayoutOverride { label: Some("Big One".into()), amount: Some(500.0) },
        );
        let json = serde_json::to_string(&settings).unwrap();
        let parsed: GameSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, settings);
    }
}
