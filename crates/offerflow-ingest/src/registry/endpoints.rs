//! Registry endpoint URL builders

use offerflow_common::types::{Participant, ParticipantKind};

/// Build league taxonomy URL
pub fn league_taxonomy_url(base_url: &str) -> String {
    format!("{}/league-info", base_url.trim_end_matches('/'))
}

/// Build team record URL
pub fn team_url(base_url: &str, id: u64) -> String {
    format!("{}/team-info/{}", base_url.trim_end_matches('/'), id)
}

/// Build player record URL
pub fn player_url(base_url: &str, id: u64) -> String {
    format!("{}/player-info/{}", base_url.trim_end_matches('/'), id)
}

/// Build the record URL for a participant of either kind
pub fn participant_url(base_url: &str, participant: Participant) -> String {
    match participant.kind {
        ParticipantKind::Team => team_url(base_url, participant.id),
        ParticipantKind::Player => player_url(base_url, participant.id),
    }
}
