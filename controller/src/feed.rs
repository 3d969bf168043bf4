//! Live score feed client (ESPN site API scoreboards).
//!
//! Polls `{base}/{sport}/{league}/scoreboard` and flattens each event into a
//! [`LiveEvent`]. Transient failures are retried with exponential backoff
//! inside one fetch; anything still failing is returned to the poller, which
//! simply tries again on its next tick.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use squares::{EventState, FeedTeam, LiveEvent};

use crate::config::{get_league_config, FEED_FETCH_ATTEMPTS, FEED_HTTP_TIMEOUT_SECS};

// === ESPN wire format ===

#[derive(Debug, Deserialize)]
struct EspnScoreboard {
    #[serde(default)]
    events: Vec<EspnEvent>,
}

#[derive(Debug, Deserialize)]
struct EspnEvent {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    competitions: Vec<EspnCompetition>,
    status: Option<EspnStatus>,
}

#[derive(Debug, Deserialize)]
struct EspnCompetition {
    #[serde(default)]
    competitors: Vec<EspnCompetitor>,
    status: Option<EspnStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EspnCompetitor {
    home_away: String,
    #[serde(default)]
    score: Option<String>,
    team: EspnTeam,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EspnTeam {
    display_name: String,
    #[serde(default)]
    logo: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EspnStatus {
    #[serde(default)]
    period: u32,
    #[serde(default)]
    display_clock: String,
    #[serde(rename = "type")]
    kind: EspnStatusType,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EspnStatusType {
    #[serde(default)]
    state: String,
    #[serde(default)]
    detail: String,
    #[serde(default)]
    short_detail: String,
}

impl EspnEvent {
    /// Flatten into a feed snapshot. `None` when the event has no home/away pair.
    fn into_live_event(self, league: &str) -> Option<LiveEvent> {
        let competition = self.competitions.into_iter().next()?;
        let status = self.status.or(competition.status)?;

        let mut home = None;
        let mut away = None;
        for c in competition.competitors {
            let team = FeedTeam {
                name: c.team.display_name,
                logo: c.team.logo,
                score: c.score.unwrap_or_default(),
            };
            match c.home_away.as_str() {
                "home" => home = Some(team),
                "away" => away = Some(team),
                _ => {}
            }
        }

        let state = EventState::from_feed(&status.kind.state);
        let status_detail = if status.kind.detail.is_empty() {
            status.kind.short_detail
        } else {
            status.kind.detail
        };
        Some(LiveEvent {
            id: self.id,
            league: league.to_string(),
            name: self.name,
            home: home?,
            away: away?,
            period: status.period,
            clock: status.display_clock,
            state,
            status_detail,
            is_live: state == EventState::In,
        })
    }
}

// === Client ===

pub struct ScoreFeedClient {
    http: reqwest::Client,
    base_url: String,
}

impl ScoreFeedClient {
    /// Client for the configured feed root (`FEED_BASE_URL`).
    pub fn new() -> Result<Self> {
        Self::new_with_base_url(crate::config::feed_base_url())
    }

    /// Client against an explicit root, e.g. a mock server in tests.
    pub fn new_with_base_url(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(FEED_HTTP_TIMEOUT_SECS))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn scoreboard_url(&self, league: &str) -> Result<String> {
        let cfg = get_league_config(league).ok_or_else(|| anyhow!("unsupported league '{}'", league))?;
        Ok(format!("{}/{}/scoreboard", self.base_url, cfg.scoreboard_path()))
    }

    /// Every event on today's scoreboard for `league`.
    pub async fn fetch_scoreboard(&self, league: &str) -> Result<Vec<LiveEvent>> {
        let url = self.scoreboard_url(league)?;

        let mut last_error = None;
        for attempt in 0..FEED_FETCH_ATTEMPTS {
            if attempt > 0 {
                // 200ms, 400ms, ...
                tokio::time::sleep(Duration::from_millis(200 * (1 << (attempt - 1)))).await;
            }

            match self.http.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => match resp.json::<EspnScoreboard>().await {
                    Ok(board) => {
                        let events: Vec<LiveEvent> = board
                            .events
                            .into_iter()
                            .filter_map(|e| e.into_live_event(league))
                            .collect();
                        debug!("[FEED] {} events on {} scoreboard", events.len(), league);
                        return Ok(events);
                    }
                    Err(e) => last_error = Some(format!("JSON parse error: {}", e)),
                },
                Ok(resp) if resp.status().is_server_error() || resp.status().as_u16() == 429 => {
                    last_error = Some(format!("HTTP {}", resp.status()));
                }
                Ok(resp) => bail!("scoreboard {} returned HTTP {}", url, resp.status()),
                Err(e) => last_error = Some(format!("request error: {}", e)),
            }
            if let Some(err) = &last_error {
                warn!("[FEED] {} attempt {}/{} failed: {}", league, attempt + 1, FEED_FETCH_ATTEMPTS, err);
            }
        }

        Err(anyhow!(
            "scoreboard fetch for {} failed after {} attempts: {}",
            league,
            FEED_FETCH_ATTEMPTS,
            last_error.unwrap_or_default()
        ))
    }

    /// A single event from the scoreboard by id.
    pub async fn fetch_event(&self, league: &str, event_id: &str) -> Result<Option<LiveEvent>> {
        Ok(self
            .fetch_scoreboard(league)
            .await?
            .into_iter()
            .find(|e| e.id == event_id))
    }
}
