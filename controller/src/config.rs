//! Runner configuration and league mapping.
//!
//! Everything is read from the environment (after `.env` is loaded by
//! [`crate::paths::load_dotenv`]). Tunables that never change during a run are
//! cached behind `OnceLock`.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;

use squares::Scores;

/// ESPN site API root for scoreboards
pub const ESPN_SITE_API: &str = "https://site.api.espn.com/apis/site/v2/sports";

/// Game documents file, relative to the workspace root
pub const DEFAULT_STORE_FILE: &str = "games.json";

/// Payout audit trail, relative to the workspace root
pub const DEFAULT_PAYOUT_LOG_FILE: &str = "payouts.jsonl";

/// Attempts per scoreboard fetch before giving up on this poll
pub const FEED_FETCH_ATTEMPTS: u32 = 3;

/// HTTP timeout for the score feed (seconds)
pub const FEED_HTTP_TIMEOUT_SECS: u64 = 10;

/// League code -> ESPN scoreboard path
#[derive(Debug, Clone)]
pub struct LeagueConfig {
    pub league_code: &'static str,
    /// ESPN sport segment, e.g. "football"
    pub sport: &'static str,
    /// ESPN league segment, e.g. "nfl", "eng.1"
    pub espn_league: &'static str,
}

impl LeagueConfig {
    /// Scoreboard path below the API root, e.g. "football/nfl".
    pub fn scoreboard_path(&self) -> String {
        format!("{}/{}", self.sport, self.espn_league)
    }
}

/// All leagues the feed client knows how to poll
pub fn get_league_configs() -> Vec<LeagueConfig> {
    let league = |league_code, sport, espn_league| LeagueConfig { league_code, sport, espn_league };
    vec![
        // US sports
        league("nfl", "football", "nfl"),
        league("ncaaf", "football", "college-football"),
        league("nba", "basketball", "nba"),
        league("wnba", "basketball", "wnba"),
        league("ncaab", "basketball", "mens-college-basketball"),
        league("ncaaw", "basketball", "womens-college-basketball"),
        league("nhl", "hockey", "nhl"),
        league("mlb", "baseball", "mlb"),
        // Soccer
        league("epl", "soccer", "eng.1"),
        league("ucl", "soccer", "uefa.champions"),
        league("mls", "soccer", "usa.1"),
        league("laliga", "soccer", "esp.1"),
        league("bundesliga", "soccer", "ger.1"),
        league("seriea", "soccer", "ita.1"),
    ]
}

/// Look up a league by our code or by ESPN's league segment.
pub fn get_league_config(league: &str) -> Option<LeagueConfig> {
    let league = league.trim().to_lowercase();
    get_league_configs()
        .into_iter()
        .find(|c| c.league_code == league || c.espn_league == league)
}

/// Score feed root (`FEED_BASE_URL`, default ESPN site API)
pub fn feed_base_url() -> &'static str {
    static CACHED: std::sync::OnceLock<String> = std::sync::OnceLock::new();
    CACHED.get_or_init(|| {
        std::env::var("FEED_BASE_URL")
            .ok()
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| ESPN_SITE_API.to_string())
    })
}

/// Seconds between scoreboard polls (`FEED_POLL_INTERVAL_SECS`, default 15)
pub fn feed_poll_interval_secs() -> u64 {
    static CACHED: std::sync::OnceLock<u64> = std::sync::OnceLock::new();
    *CACHED.get_or_init(|| {
        std::env::var("FEED_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|v| *v > 0)
            .unwrap_or(15)
    })
}

/// Seconds between status heartbeats (`STATUS_INTERVAL_SECS`, default 60, 0 = off)
pub fn status_interval_secs() -> u64 {
    static CACHED: std::sync::OnceLock<u64> = std::sync::OnceLock::new();
    *CACHED.get_or_init(|| {
        std::env::var("STATUS_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60)
    })
}

pub fn parse_bool_env(key: &str) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.to_lowercase() == "true" || v.to_lowercase() == "yes")
        .unwrap_or(false)
}

/// Parse a host-entered score like "21-14" (team A first).
pub fn parse_score_pair(raw: &str) -> Result<Scores> {
    let (a, b) = raw
        .trim()
        .split_once('-')
        .with_context(|| format!("score '{}' must look like 21-14", raw))?;
    let a: i64 = a.trim().parse().with_context(|| format!("bad team A score in '{}'", raw))?;
    let b: i64 = b.trim().parse().with_context(|| format!("bad team B score in '{}'", raw))?;
    if a < 0 || b < 0 {
        bail!("scores cannot be negative: '{}'", raw);
    }
    Ok(Scores::new(a, b))
}

/// What the runner should do this invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum RunMode {
    /// Follow the live feed until interrupted
    Follow,
    /// Draw the digits once, then exit
    Scramble,
    /// Record one host-entered payout, then exit
    ManualPayout(Scores),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub game_id: String,
    pub store_path: PathBuf,
    pub payout_log_path: PathBuf,
    pub mode: RunMode,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let game_id = std::env::var("GAME_ID")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .context("GAME_ID not set")?;

        let store_path = std::env::var("STORE_PATH")
            .map(crate::paths::resolve_user_path)
            .unwrap_or_else(|_| crate::paths::resolve_workspace_file(DEFAULT_STORE_FILE));
        let payout_log_path = std::env::var("PAYOUT_LOG_PATH")
            .map(crate::paths::resolve_user_path)
            .unwrap_or_else(|_| crate::paths::resolve_workspace_file(DEFAULT_PAYOUT_LOG_FILE));

        let manual = std::env::var("MANUAL_SCORE").ok().filter(|s| !s.trim().is_empty());
        let mode = match (manual, parse_bool_env("SCRAMBLE")) {
            (Some(_), true) => bail!("MANUAL_SCORE and SCRAMBLE are mutually exclusive"),
            (Some(raw), false) => RunMode::ManualPayout(parse_score_pair(&raw)?),
            (None, true) => RunMode::Scramble,
            (None, false) => RunMode::Follow,
        };

        Ok(Self { game_id, store_path, payout_log_path, mode })
    }
}
