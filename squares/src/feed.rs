//! Live score feed snapshot types.

use serde::{Deserialize, Serialize};

/// Game state as reported by the feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventState {
    Pre,
    In,
    Post,
    #[default]
    #[serde(other)]
    Unknown,
}

impl EventState {
    pub fn from_feed(state: &str) -> Self {
        match state.trim().to_ascii_lowercase().as_str() {
            "pre" => EventState::Pre,
            "in" => EventState::In,
            "post" => EventState::Post,
            _ => EventState::Unknown,
        }
    }
}

/// One side of a feed event. `score` is kept as delivered; parsing happens
/// when the side is aligned to a pool team.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedTeam {
    pub name: String,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub score: String,
}

/// Snapshot of one live or recent event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveEvent {
    pub id: String,
    pub league: String,
    pub name: String,
    pub home: FeedTeam,
    pub away: FeedTeam,
    pub period: u32,
    /// Remaining time in the period, "MM:SS"
    pub clock: String,
    pub state: EventState,
    /// Human-readable status, e.g. "Halftime", "End of 1st Quarter"
    pub status_detail: String,
    pub is_live: bool,
}

impl LiveEvent {
    pub fn is_post(&self) -> bool {
        self.state == EventState::Post
    }
}
