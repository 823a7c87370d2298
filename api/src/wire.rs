//! Raw wire types for the tournament backend, serde shapes only.
//! Mapped to the clean domain types in client.rs.
use crate::Id;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// GET /event/{eventId}/match
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub id: Option<Id>,
    pub key_number: Option<u32>,
    pub match_number: Option<u32>,
    pub winner_id: Option<Id>,
    /// Populated for user-vs-user events.
    pub first_user: Option<UserRef>,
    pub second_user: Option<UserRef>,
    /// Populated for team-vs-team (`multiplayer`) events.
    pub first_team: Option<TeamRef>,
    pub second_team: Option<TeamRef>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct UserRef {
    pub id: Option<Id>,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct TeamRef {
    pub id: Option<Id>,
    pub name: Option<String>,
}

// ---------------------------------------------------------------------------
// POST /event/winner/{matchId}
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WinnerBody<'a> {
    pub winner_id: &'a Id,
}

// ---------------------------------------------------------------------------
// Error payloads
// ---------------------------------------------------------------------------

/// Error bodies seen from the backend: `{ "message": .. }` or `{ "error": .. }`.
#[derive(Debug, Deserialize, Default)]
pub struct ErrorBody {
    pub message: Option<String>,
    pub error: Option<String>,
}
