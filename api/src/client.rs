use crate::wire::{ErrorBody, MatchRecord, TeamRef, UserRef, WinnerBody};
use crate::{Bracket, Id, Match, Participant, Slot};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use std::fmt;
use std::time::Duration;

pub type ApiResult<T> = Result<T, ApiError>;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const GENERIC_FAILURE: &str = "Something went wrong, please try again.";
const UNREACHABLE: &str = "Could not reach the tournament server.";

/// Client for the tournament backend's match endpoints.
#[derive(Debug, Clone)]
pub struct TourneyApi {
    client: Client,
    base_url: String,
    timeout: Duration,
    cookie: Option<String>,
}

impl Default for TourneyApi {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[derive(Debug)]
pub enum ApiError {
    Network(reqwest::Error, String),
    /// Non-2xx answer. `message` is whatever the backend put in the body.
    Server { status: StatusCode, message: Option<String>, url: String },
    Parsing(reqwest::Error, String),
    Other(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(e, url) => write!(f, "Network error for {url}: {e}"),
            ApiError::Server { status, message: Some(msg), url } => {
                write!(f, "Server error {status} for {url}: {msg}")
            }
            ApiError::Server { status, message: None, url } => {
                write!(f, "Server error {status} for {url}")
            }
            ApiError::Parsing(e, url) => write!(f, "Parse error for {url}: {e}"),
            ApiError::Other(msg) => write!(f, "Error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// Best-effort text for the person at the keyboard.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Server { message: Some(msg), .. } => msg.clone(),
            ApiError::Network(..) => UNREACHABLE.to_owned(),
            _ => GENERIC_FAILURE.to_owned(),
        }
    }
}

impl TourneyApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::builder()
                .user_agent("brackets/0.1 (terminal bracket client)")
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            timeout: Duration::from_secs(10),
            cookie: None,
        }
    }

    /// Forward an existing session cookie (`name=value; ...`) on every request.
    pub fn with_cookie(mut self, cookie: Option<String>) -> Self {
        self.cookie = cookie.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch every match of an event and group them into rounds.
    pub async fn fetch_bracket(&self, event_id: &str, multiplayer: bool) -> ApiResult<Bracket> {
        if event_id.trim().is_empty() {
            return Err(ApiError::Other("event id must not be empty".to_owned()));
        }
        let url = self.endpoint(&["event", event_id, "match"])?;
        let response = self.send(self.client.get(url.clone()), url.as_str()).await?;
        let records: Vec<MatchRecord> = response
            .json()
            .await
            .map_err(|e| ApiError::Parsing(e, url.to_string()))?;

        let matches = records
            .iter()
            .filter_map(|r| map_record(r, multiplayer))
            .collect();
        Ok(Bracket::from_matches(event_id, multiplayer, matches))
    }

    /// Record `winner_id` as the winner of `match_id`. The response body is ignored.
    pub async fn declare_winner(&self, match_id: &Id, winner_id: &Id) -> ApiResult<()> {
        let match_id = match_id.to_string();
        let url = self.endpoint(&["event", "winner", &match_id])?;
        let request = self.client.post(url.clone()).json(&WinnerBody { winner_id });
        self.send(request, url.as_str()).await.map(|_| ())
    }

    /// Ids are pushed as single path segments, so `/`, `?` and `#` are escaped.
    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ApiError::Other(format!("invalid base url {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| ApiError::Other(format!("base url {} cannot take a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder, url: &str) -> ApiResult<Response> {
        let mut request = request.timeout(self.timeout);
        if let Some(cookie) = &self.cookie {
            request = request.header(reqwest::header::COOKIE, cookie);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e, url.to_owned()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Server {
            status,
            message: extract_error_message(&body),
            url: url.to_owned(),
        })
    }
}

// ---------------------------------------------------------------------------
// Mapping: wire types → clean domain types
// ---------------------------------------------------------------------------

/// Records without an id can't be addressed by the winner endpoint; drop them.
fn map_record(record: &MatchRecord, multiplayer: bool) -> Option<Match> {
    let id = record.id.clone()?;
    let slots = if multiplayer {
        [map_team(record.first_team.as_ref()), map_team(record.second_team.as_ref())]
    } else {
        [map_user(record.first_user.as_ref()), map_user(record.second_user.as_ref())]
    };

    Some(Match {
        id,
        key_number: record.key_number.unwrap_or(0),
        match_number: record.match_number.unwrap_or(0),
        winner_id: record.winner_id.clone(),
        slots,
    })
}

fn map_user(user: Option<&UserRef>) -> Slot {
    let participant = user.and_then(|u| {
        u.id.clone().map(|id| Participant {
            name: u.username.clone().unwrap_or_else(|| id.to_string()),
            id,
        })
    });
    Slot { participant }
}

fn map_team(team: Option<&TeamRef>) -> Slot {
    let participant = team.and_then(|t| {
        t.id.clone().map(|id| Participant {
            name: t.name.clone().unwrap_or_else(|| id.to_string()),
            id,
        })
    });
    Slot { participant }
}

fn extract_error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(trimmed) {
        return parsed
            .message
            .or(parsed.error)
            .map(|m| m.trim().to_owned())
            .filter(|m| !m.is_empty());
    }
    // Plain-text bodies are shown as-is when short; HTML error pages never are.
    if trimmed.starts_with('<') || trimmed.len() > 200 {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MatchState;
    use mockito::Matcher;

    const USER_MATCHES: &str = r#"[
        {"id": 12, "keyNumber": 1, "matchNumber": 0, "winnerId": null,
         "firstUser": null, "secondUser": null},
        {"id": 11, "keyNumber": 0, "matchNumber": 1, "winnerId": null,
         "firstUser": {"id": 3, "username": "carol"}, "secondUser": {"id": 4, "username": "dave"}},
        {"id": 10, "keyNumber": 0, "matchNumber": 0, "winnerId": 1,
         "firstUser": {"id": 1, "username": "alice"}, "secondUser": {"id": 2, "username": "bob"},
         "createdAt": "2024-05-01T10:00:00.000Z"}
    ]"#;

    #[test]
    fn user_records_map_to_user_slots() {
        let records: Vec<MatchRecord> = serde_json::from_str(USER_MATCHES).unwrap();
        let game = map_record(&records[2], false).unwrap();
        assert_eq!(game.id, Id::Num(10));
        assert_eq!(game.slots[0].label(), "alice");
        assert_eq!(game.slots[1].label(), "bob");
        assert_eq!(game.state(), MatchState::Decided);
    }

    #[test]
    fn team_records_read_team_fields_only() {
        let raw = r#"{"id": "m1", "keyNumber": 0, "matchNumber": 0,
            "firstUser": {"id": 1, "username": "ignored"},
            "firstTeam": {"id": "t1", "name": "Red"}, "secondTeam": {"id": "t2", "name": "Blue"}}"#;
        let record: MatchRecord = serde_json::from_str(raw).unwrap();

        let teams = map_record(&record, true).unwrap();
        assert_eq!(teams.slots[0].participant.as_ref().unwrap().id, Id::from("t1"));
        assert_eq!(teams.slots[1].label(), "Blue");

        let users = map_record(&record, false).unwrap();
        assert_eq!(users.slots[0].label(), "ignored");
        assert!(!users.slots[1].is_resolved());
    }

    #[test]
    fn participant_without_id_stays_unresolved() {
        let record: MatchRecord = serde_json::from_str(
            r#"{"id": 5, "keyNumber": 0, "matchNumber": 0, "firstUser": {"id": null, "username": "ghost"}}"#,
        )
        .unwrap();
        let game = map_record(&record, false).unwrap();
        assert!(!game.slots[0].is_resolved());
        assert_eq!(game.state(), MatchState::Pending);
    }

    #[test]
    fn record_without_id_is_dropped() {
        let record: MatchRecord = serde_json::from_str(r#"{"keyNumber": 0, "matchNumber": 0}"#).unwrap();
        assert!(map_record(&record, false).is_none());
    }

    #[test]
    fn error_message_prefers_json_fields() {
        assert_eq!(extract_error_message(r#"{"message": "Match already decided"}"#).as_deref(), Some("Match already decided"));
        assert_eq!(extract_error_message(r#"{"error": "Unauthorized"}"#).as_deref(), Some("Unauthorized"));
        assert_eq!(extract_error_message("Bad winner"), Some("Bad winner".to_owned()));
        assert_eq!(extract_error_message("<html><body>502</body></html>"), None);
        assert_eq!(extract_error_message("   "), None);
        assert_eq!(extract_error_message(r#"{"status": 500}"#), None);
    }

    #[test]
    fn user_message_falls_back_to_generic_text() {
        let err = ApiError::Server {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: None,
            url: "http://x".into(),
        };
        assert_eq!(err.user_message(), GENERIC_FAILURE);

        let err = ApiError::Server {
            status: StatusCode::BAD_REQUEST,
            message: Some("Winner must be a participant".into()),
            url: "http://x".into(),
        };
        assert_eq!(err.user_message(), "Winner must be a participant");
    }

    #[test]
    fn ids_are_escaped_as_single_path_segments() {
        let api = TourneyApi::new("http://localhost:3000");
        let url = api.endpoint(&["event", "a/b?c#d", "match"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/event/a%2Fb%3Fc%23d/match");

        let api = TourneyApi::new("http://localhost:3000/api/");
        let url = api.endpoint(&["event", "winner", "m 1"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api/event/winner/m%201");
    }

    #[test]
    fn unusable_base_url_is_an_error() {
        let api = TourneyApi::new("not a url");
        assert!(matches!(api.endpoint(&["event"]), Err(ApiError::Other(_))));
    }

    #[tokio::test]
    async fn fetch_bracket_groups_rounds_and_forwards_cookie() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/event/7/match")
            .match_header("cookie", "token=abc")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(USER_MATCHES)
            .create_async()
            .await;

        let api = TourneyApi::new(&server.url()).with_cookie(Some("token=abc".into()));
        let bracket = api.fetch_bracket("7", false).await.unwrap();

        mock.assert_async().await;
        assert_eq!(bracket.event_id, "7");
        assert_eq!(bracket.rounds.len(), 2);
        let first: Vec<Id> = bracket.rounds[0].matches.iter().map(|m| m.id.clone()).collect();
        assert_eq!(first, vec![Id::Num(10), Id::Num(11)]);
        assert_eq!(bracket.rounds[1].matches[0].state(), MatchState::Pending);
    }

    #[tokio::test]
    async fn declare_winner_posts_winner_id_as_received() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/event/winner/11")
            .match_body(Matcher::Json(serde_json::json!({ "winnerId": 3 })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let api = TourneyApi::new(&format!("{}/", server.url()));
        api.declare_winner(&Id::Num(11), &Id::Num(3)).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn declare_winner_surfaces_server_message() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/event/winner/11")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message": "Match is not ready"}"#)
            .create_async()
            .await;

        let api = TourneyApi::new(&server.url());
        let err = api.declare_winner(&Id::Num(11), &Id::Num(3)).await.unwrap_err();
        match &err {
            ApiError::Server { status, .. } => assert_eq!(*status, StatusCode::BAD_REQUEST),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.user_message(), "Match is not ready");
    }

    #[tokio::test]
    async fn empty_event_id_never_hits_the_network() {
        let api = TourneyApi::new("http://127.0.0.1:9");
        let err = api.fetch_bracket(" ", false).await.unwrap_err();
        assert!(matches!(err, ApiError::Other(_)), "got {err}");
    }

    #[tokio::test]
    async fn malformed_payload_is_a_parse_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/event/1/match")
            .with_status(200)
            .with_body(r#"{"not": "a list"}"#)
            .create_async()
            .await;

        let api = TourneyApi::new(&server.url());
        let err = api.fetch_bracket("1", false).await.unwrap_err();
        assert!(matches!(err, ApiError::Parsing(..)), "got {err}");
        assert_eq!(err.user_message(), GENERIC_FAILURE);
    }
}
