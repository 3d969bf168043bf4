// tests/feed_client_tests.rs
// Score feed client against a mock scoreboard server.

use serde_json::json;
use squares::EventState;
use squares_controller::feed::ScoreFeedClient;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// === TEST HELPERS ===

fn scoreboard(period: u32, clock: &str, state: &str, detail: &str, home: &str, away: &str) -> serde_json::Value {
    json!({
        "events": [{
            "id": "401",
            "name": "Philadelphia Eagles at Kansas City Chiefs",
            "competitions": [{
                "competitors": [
                    {"homeAway": "home", "score": home, "team": {"displayName": "Kansas City Chiefs", "logo": "https://a.espncdn.com/kc.png"}},
                    {"homeAway": "away", "score": away, "team": {"displayName": "Philadelphia Eagles"}}
                ]
            }],
            "status": {"period": period, "displayClock": clock, "type": {"state": state, "detail": detail}}
        }]
    })
}

// === TESTS ===

#[tokio::test]
async fn test_fetch_scoreboard_decodes_events() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/football/nfl/scoreboard"))
        .respond_with(ResponseTemplate::new(200).set_body_json(scoreboard(1, "0:00", "in", "End of 1st Quarter", "23", "17")))
        .expect(1)
        .mount(&server)
        .await;

    let client = ScoreFeedClient::new_with_base_url(&server.uri()).unwrap();
    let events = client.fetch_scoreboard("nfl").await.unwrap();

    assert_eq!(events.len(), 1);
    let ev = &events[0];
    assert_eq!(ev.id, "401");
    assert_eq!(ev.home.score, "23");
    assert_eq!(ev.away.name, "Philadelphia Eagles");
    assert_eq!(ev.period, 1);
    assert_eq!(ev.clock, "0:00");
    assert_eq!(ev.state, EventState::In);
    assert_eq!(ev.status_detail, "End of 1st Quarter");
}

#[tokio::test]
async fn test_fetch_retries_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/basketball/nba/scoreboard"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/basketball/nba/scoreboard"))
        .respond_with(ResponseTemplate::new(200).set_body_json(scoreboard(2, "4:30", "in", "4:30 - 2nd Quarter", "50", "48")))
        .expect(1)
        .mount(&server)
        .await;

    let client = ScoreFeedClient::new_with_base_url(&server.uri()).unwrap();
    let events = client.fetch_scoreboard("nba").await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].league, "nba");
}

#[tokio::test]
async fn test_fetch_gives_up_after_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/football/nfl/scoreboard"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let client = ScoreFeedClient::new_with_base_url(&server.uri()).unwrap();
    let err = client.fetch_scoreboard("nfl").await.unwrap_err();
    assert!(err.to_string().contains("after 3 attempts"));
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/football/nfl/scoreboard"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = ScoreFeedClient::new_with_base_url(&server.uri()).unwrap();
    assert!(client.fetch_scoreboard("nfl").await.is_err());
}

#[tokio::test]
async fn test_fetch_event_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/football/nfl/scoreboard"))
        .respond_with(ResponseTemplate::new(200).set_body_json(scoreboard(3, "9:12", "in", "", "10", "7")))
        .mount(&server)
        .await;

    let client = ScoreFeedClient::new_with_base_url(&server.uri()).unwrap();
    assert!(client.fetch_event("nfl", "401").await.unwrap().is_some());
    assert!(client.fetch_event("nfl", "402").await.unwrap().is_none());
}

#[tokio::test]
async fn test_unknown_league_fails_without_request() {
    let server = MockServer::start().await;
    let client = ScoreFeedClient::new_with_base_url(&server.uri()).unwrap();
    assert!(client.fetch_scoreboard("quidditch").await.is_err());
}
