//! Domain types shared across Offerflow
//!
//! Wire shapes follow the JSON documents exchanged with the source queue and
//! the sports registry: camelCase field names, optional participant fields
//! omitted when absent and written back as `null` when sent as `null`.

use crate::error::CommonError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Bet Offers
// ============================================================================

/// A bet offer as carried in a queue message body.
///
/// Fields the pipeline does not interpret are kept in `extra` so that a
/// republished offer carries everything the producer sent.
///
/// # Examples
///
/// ```
/// use offerflow_common::types::Offer;
///
/// let body = r#"{
///     "id": 1001, "type": "match", "sport": "football",
///     "leagueName": "Premier League", "leagueId": 1,
///     "criterion": "Full Time", "outcomes": [{ "label": "1" }]
/// }"#;
/// let offer: Offer = serde_json::from_str(body).unwrap();
/// assert_eq!(offer.league_id, 1);
/// assert_eq!(offer.category, "match");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    /// Offer identifier assigned by the producer
    pub id: u64,

    /// Category tag (serialized as `type`)
    #[serde(rename = "type")]
    pub category: String,

    /// Sport tag (e.g. "football")
    pub sport: String,

    /// Display name of the league
    pub league_name: String,

    /// League identifier; must be a leaf of the league taxonomy to be published
    pub league_id: u64,

    /// Free-text criterion (e.g. "Full Time")
    pub criterion: String,

    /// Ordered outcomes of the offer
    pub outcomes: Vec<Outcome>,

    /// Uninterpreted fields, passed through unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single outcome of an offer.
///
/// `participant_type` stays a raw string so that outcomes with kinds the
/// pipeline does not enrich serialize exactly as they were received.
///
/// The outer `Option` of the participant fields records whether the key was
/// present at all; `Some(None)` is an explicit `null` and is written back as
/// `null`. `participant_info` needs no inner `Option` since an explicit
/// `null` is kept as `Value::Null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    /// Display label
    pub label: String,

    /// Participant kind as sent by the producer ("team", "player", ...)
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub participant_type: Option<Option<String>>,

    /// Participant identifier in the registry
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<Option<u64>>,

    /// Registry payload, populated by enrichment only
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub participant_info: Option<Value>,

    /// Uninterpreted fields, passed through unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Outcome {
    /// Returns the participant descriptor when both kind and id are usable.
    ///
    /// A kind without an id, an id without a kind, an id of `0`, or a kind
    /// other than team/player all yield `None`.
    pub fn participant(&self) -> Option<Participant> {
        let kind = self.participant_type.as_ref()?.as_deref()?.parse().ok()?;
        let id = self.participant_id.flatten().filter(|id| *id != 0)?;
        Some(Participant { kind, id })
    }
}

/// Deserialize a field that is present in the document, `null` included.
///
/// Paired with `#[serde(default)]`, a missing key stays `None` while a key
/// holding `null` becomes `Some` of the null representation.
fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

// ============================================================================
// Participants
// ============================================================================

/// Kind of registry record an outcome refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantKind {
    Team,
    Player,
}

impl ParticipantKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantKind::Team => "team",
            ParticipantKind::Player => "player",
        }
    }
}

impl std::str::FromStr for ParticipantKind {
    type Err = CommonError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "team" => Ok(ParticipantKind::Team),
            "player" => Ok(ParticipantKind::Player),
            other => Err(CommonError::InvalidParticipantKind(other.to_string())),
        }
    }
}

impl std::fmt::Display for ParticipantKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lookup key for a registry record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Participant {
    pub kind: ParticipantKind,
    pub id: u64,
}

impl std::fmt::Display for Participant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

// ============================================================================
// League Taxonomy
// ============================================================================

/// A node of the league taxonomy.
///
/// A node without children (absent or empty `groups`) is a leaf; leaf
/// identifiers are the league ids offers may be published for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: u64,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<Group>>,
}

impl Group {
    /// Create a leaf node
    pub fn leaf(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            groups: None,
        }
    }

    /// Create an inner node with the given children
    pub fn branch(id: u64, name: impl Into<String>, children: Vec<Group>) -> Self {
        Self {
            id,
            name: name.into(),
            groups: Some(children),
        }
    }

    /// Child nodes, empty for leaves
    pub fn children(&self) -> &[Group] {
        self.groups.as_deref().unwrap_or_default()
    }

    pub fn is_leaf(&self) -> bool {
        self.children().is_empty()
    }
}

/// Document returned by the registry's league taxonomy endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueTaxonomy {
    /// Root of the taxonomy tree
    pub group: Group,
}
