//! Shared fixtures for offerflow-ingest integration tests

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use offerflow_ingest::{MemoryQueue, PipelineConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const SOURCE: &str = "memory://offers-in";
pub const DESTINATION: &str = "memory://offers-out";

/// League ids of the 23 scenario offers; 15 of them are leaves of [`taxonomy`].
pub const SCENARIO_LEAGUES: [u64; 23] = [1, 4, 2, 3, 5, 1, 2, 6, 3, 1, 7, 2, 3, 8, 1, 2, 9, 3, 1, 10, 2, 11, 3];

/// Taxonomy whose leaves are {1, 2, 3}
pub fn taxonomy() -> Value {
    json!({
        "group": {
            "id": 100,
            "name": "All Sports",
            "groups": [
                {
                    "id": 10,
                    "name": "Football",
                    "groups": [
                        { "id": 1, "name": "Premier League" },
                        { "id": 2, "name": "La Liga", "groups": [] }
                    ]
                },
                {
                    "id": 20,
                    "name": "Tennis",
                    "groups": [{ "id": 3, "name": "ATP" }]
                }
            ]
        }
    })
}

/// Offer `1000 + index` in league `league_id`.
///
/// Outcomes: a team, an outcome without participant, a player, and a player
/// kind with no id.
pub fn offer(index: u64, league_id: u64) -> Value {
    json!({
        "id": 1000 + index,
        "type": "match",
        "sport": "football",
        "leagueName": format!("League {}", league_id),
        "leagueId": league_id,
        "criterion": "Full Time",
        "outcomes": [
            { "label": "1", "participantType": "team", "participantId": 10 + index },
            { "label": "X" },
            { "label": "2", "participantType": "player", "participantId": 100 + index },
            { "label": "first scorer", "participantType": "player" }
        ]
    })
}

pub fn scenario_offers() -> Vec<Value> {
    SCENARIO_LEAGUES
        .iter()
        .enumerate()
        .map(|(index, league)| offer(index as u64, *league))
        .collect()
}

/// Ids of the scenario offers that survive the league filter, in order
pub fn expected_scenario_ids() -> Vec<u64> {
    SCENARIO_LEAGUES
        .iter()
        .enumerate()
        .filter(|(_, league)| [1, 2, 3].contains(*league))
        .map(|(index, _)| 1000 + index as u64)
        .collect()
}

/// Answers `/{kind}-info/{id}` with a record echoing kind and id
pub struct ParticipantRecord(pub &'static str);

impl Respond for ParticipantRecord {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let id: u64 = request
            .url
            .path_segments()
            .and_then(|segments| segments.last())
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default();

        ResponseTemplate::new(200).set_body_json(json!({
            "id": id,
            "kind": self.0,
            "name": format!("{} {}", self.0, id)
        }))
    }
}

/// Start a registry serving [`taxonomy`] and echo records for every team and player
pub async fn registry() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/league-info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(taxonomy()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/team-info/\d+$"))
        .respond_with(ParticipantRecord("team"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/player-info/\d+$"))
        .respond_with(ParticipantRecord("player"))
        .mount(&server)
        .await;

    server
}

/// Source queue loaded with `offers` plus an empty destination queue
pub async fn queues(offers: &[Value]) -> Arc<MemoryQueue> {
    let queue = Arc::new(MemoryQueue::new());
    queue.create_queue(SOURCE).await;
    queue.create_queue(DESTINATION).await;
    queue.push_json(SOURCE, offers).await.unwrap();
    queue
}

pub fn config(registry_url: &str) -> PipelineConfig {
    PipelineConfig {
        source_queue_url: SOURCE.to_string(),
        destination_queue_url: DESTINATION.to_string(),
        registry_url: registry_url.to_string(),
        lookup_timeout_ms: 2_000,
        deadline_secs: 30,
        ..PipelineConfig::default()
    }
}
