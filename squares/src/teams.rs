//! Aligning the pool's two team labels with a feed event's home/away sides.
//!
//! Pool names are free text typed by the host ("Chiefs", "KC Chiefs",
//! "Kansas City Chiefs") while the feed uses its own display names. Matching is
//! case-insensitive substring containment in either direction. Short,
//! ambiguous labels ("FC", "City") can attach to the wrong side; there is no
//! stable identifier linking a pool team to a feed team.

use crate::feed::{FeedTeam, LiveEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSide {
    Home,
    Away,
}

impl FeedSide {
    pub fn opposite(self) -> Self {
        match self {
            FeedSide::Home => FeedSide::Away,
            FeedSide::Away => FeedSide::Home,
        }
    }

    fn team(self, event: &LiveEvent) -> &FeedTeam {
        match self {
            FeedSide::Home => &event.home,
            FeedSide::Away => &event.away,
        }
    }
}

/// Which feed side each pool team is playing as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamAlignment {
    pub team_a: FeedSide,
    pub team_b: FeedSide,
}

/// Scores and logos re-indexed to the pool's team slots.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedScores {
    pub score_a: i64,
    pub score_b: i64,
    pub logo_a: Option<String>,
    pub logo_b: Option<String>,
}

impl TeamAlignment {
    /// Read both scores from the event. `None` if either score is not an integer.
    pub fn scores(&self, event: &LiveEvent) -> Option<AlignedScores> {
        let a = self.team_a.team(event);
        let b = self.team_b.team(event);
        Some(AlignedScores {
            score_a: parse_score(&a.score)?,
            score_b: parse_score(&b.score)?,
            logo_a: a.logo.clone(),
            logo_b: b.logo.clone(),
        })
    }
}

/// Either name contains the other, ignoring case. Empty names never match.
pub fn names_match(pool_name: &str, feed_name: &str) -> bool {
    let pool = pool_name.trim().to_lowercase();
    let feed = feed_name.trim().to_lowercase();
    if pool.is_empty() || feed.is_empty() {
        return false;
    }
    pool.contains(&feed) || feed.contains(&pool)
}

fn first_match(pool_name: &str, home: &str, away: &str) -> Option<FeedSide> {
    if names_match(pool_name, home) {
        Some(FeedSide::Home)
    } else if names_match(pool_name, away) {
        Some(FeedSide::Away)
    } else {
        None
    }
}

/// Align pool teams A and B to the feed's home/away names.
///
/// Each pool side takes its first match (home before away). A side that
/// matches nothing takes whatever the other side did not. Returns `None` when
/// neither pool team matches either feed team.
pub fn match_teams(pool_a: &str, pool_b: &str, feed_home: &str, feed_away: &str) -> Option<TeamAlignment> {
    let a = first_match(pool_a, feed_home, feed_away);
    let b = first_match(pool_b, feed_home, feed_away);
    match (a, b) {
        (Some(team_a), Some(team_b)) => Some(TeamAlignment { team_a, team_b }),
        (Some(team_a), None) => Some(TeamAlignment { team_a, team_b: team_a.opposite() }),
        (None, Some(team_b)) => Some(TeamAlignment { team_a: team_b.opposite(), team_b }),
        (None, None) => None,
    }
}

/// [`match_teams`] against an event's own names.
pub fn align_event(pool_a: &str, pool_b: &str, event: &LiveEvent) -> Option<TeamAlignment> {
    match_teams(pool_a, pool_b, &event.home.name, &event.away.name)
}

fn parse_score(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(home: (&str, &str), away: (&str, &str)) -> LiveEvent {
        LiveEvent {
            home: FeedTeam { name: home.0.into(), logo: Some(format!("{}.png", home.0)), score: home.1.into() },
            away: FeedTeam { name: away.0.into(), logo: None, score: away.1.into() },
            ..Default::default()
        }
    }

    #[test]
    fn test_match_both_directions() {
        // Pool name longer than feed name, and feed name longer than pool name
        let m = match_teams("Kansas City Chiefs", "Eagles", "Chiefs", "Philadelphia Eagles").unwrap();
        assert_eq!(m.team_a, FeedSide::Home);
        assert_eq!(m.team_b, FeedSide::Away);
    }

    #[test]
    fn test_match_when_pool_listed_away_first() {
        let m = match_teams("Eagles", "Chiefs", "Kansas City Chiefs", "Philadelphia Eagles").unwrap();
        assert_eq!(m.team_a, FeedSide::Away);
        assert_eq!(m.team_b, FeedSide::Home);
    }

    #[test]
    fn test_case_insensitive() {
        assert!(names_match("LAKERS", "Los Angeles Lakers"));
        assert!(names_match("los angeles lakers", "Lakers"));
    }

    #[test]
    fn test_unmatched_returns_none() {
        assert!(match_teams("Bruins", "Rangers", "Lakers", "Celtics").is_none());
    }

    #[test]
    fn test_empty_names_never_match() {
        assert!(!names_match("", "Lakers"));
        assert!(!names_match("Lakers", "  "));
        assert!(match_teams("", "", "Lakers", "Celtics").is_none());
    }

    #[test]
    fn test_one_side_match_infers_other() {
        let m = match_teams("Chiefs", "The Birds", "Chiefs", "Philadelphia Eagles").unwrap();
        assert_eq!(m.team_a, FeedSide::Home);
        assert_eq!(m.team_b, FeedSide::Away);

        let m = match_teams("Who Knows", "Eagles", "Chiefs", "Philadelphia Eagles").unwrap();
        assert_eq!(m.team_a, FeedSide::Home);
        assert_eq!(m.team_b, FeedSide::Away);
    }

    #[test]
    fn test_scores_follow_alignment() {
        let ev = event(("Chiefs", "17"), ("Philadelphia Eagles", "23"));
        let aligned = align_event("Eagles", "Chiefs", &ev).unwrap();
        let scores = aligned.scores(&ev).unwrap();
        assert_eq!(scores.score_a, 23);
        assert_eq!(scores.score_b, 17);
        assert_eq!(scores.logo_b.as_deref(), Some("Chiefs.png"));
        assert_eq!(scores.logo_a, None);
    }

    #[test]
    fn test_unparseable_score_skips() {
        let ev = event(("Chiefs", "--"), ("Eagles", "3"));
        let aligned = align_event("Chiefs", "Eagles", &ev).unwrap();
        assert!(aligned.scores(&ev).is_none());
    }
}
