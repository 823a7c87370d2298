use crate::state::app_settings::EventTarget;
use crate::state::messages::{NetworkRequest, NetworkResponse};
use log::{debug, error};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tourney_api::Id;
use tourney_api::client::{ApiError, TourneyApi};

const SPINNER_CHARS: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
pub const ERROR_CHAR: char = '!';

#[derive(Debug, Copy, Clone)]
pub struct LoadingState {
    pub is_loading: bool,
    pub spinner_char: char,
}

impl Default for LoadingState {
    fn default() -> Self {
        Self { is_loading: false, spinner_char: ' ' }
    }
}

/// Serves snapshot fetches and winner declarations one at a time, in order.
pub struct NetworkWorker {
    client: TourneyApi,
    target: EventTarget,
    requests: mpsc::Receiver<NetworkRequest>,
    responses: mpsc::Sender<NetworkResponse>,
    is_loading: Arc<AtomicBool>,
}

impl NetworkWorker {
    pub fn new(
        client: TourneyApi,
        target: EventTarget,
        requests: mpsc::Receiver<NetworkRequest>,
        responses: mpsc::Sender<NetworkResponse>,
    ) -> Self {
        Self {
            client,
            target,
            requests,
            responses,
            is_loading: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn run(mut self) {
        while let Some(request) = self.requests.recv().await {
            self.start_loading_animation().await;

            let result = match request {
                NetworkRequest::LoadBracket { generation } => self.handle_load_bracket(generation).await,
                NetworkRequest::DeclareWinner { match_id, winner_id, generation } => {
                    self.handle_declare_winner(match_id, winner_id, generation).await
                }
            };

            let response = result.unwrap_or_else(|err| {
                error!("Network error: {err}");
                NetworkResponse::Error { message: err.user_message() }
            });

            debug!("network request complete");
            self.stop_loading_animation(!is_failure(&response)).await;

            if let Err(e) = self.responses.send(response).await {
                error!("Failed to send network response: {e}");
                break;
            }
        }
    }

    async fn handle_load_bracket(&self, generation: u64) -> Result<NetworkResponse, ApiError> {
        debug!("loading bracket for event {} (generation {generation})", self.target.event_id);
        let bracket = self
            .client
            .fetch_bracket(&self.target.event_id, self.target.multiplayer)
            .await?;
        Ok(NetworkResponse::BracketLoaded { generation, bracket })
    }

    /// POST the decision, then refetch the whole snapshot. Nothing is patched locally.
    async fn handle_declare_winner(
        &self,
        match_id: Id,
        winner_id: Id,
        generation: u64,
    ) -> Result<NetworkResponse, ApiError> {
        debug!("declaring {winner_id} winner of match {match_id}");
        if let Err(e) = self.client.declare_winner(&match_id, &winner_id).await {
            error!("Winner declaration for match {match_id} failed: {e}");
            return Ok(NetworkResponse::DecisionFailed { match_id, message: e.user_message() });
        }

        let refreshed = self
            .client
            .fetch_bracket(&self.target.event_id, self.target.multiplayer)
            .await
            .map_err(|e| {
                error!("Refetch after declaring match {match_id} failed: {e}");
                e.user_message()
            });
        Ok(NetworkResponse::WinnerDeclared { match_id, generation, refreshed })
    }

    async fn start_loading_animation(&self) {
        self.is_loading.store(true, Ordering::Relaxed);

        let mut loading_state =
            LoadingState { is_loading: true, spinner_char: SPINNER_CHARS[0] };
        let _ = self
            .responses
            .send(NetworkResponse::LoadingStateChanged { loading_state })
            .await;

        let responses = self.responses.clone();
        let is_loading = self.is_loading.clone();

        tokio::spawn(async move {
            let mut spinner_index = 1;
            let mut interval = tokio::time::interval(Duration::from_millis(33));
            loop {
                interval.tick().await;
                if !is_loading.load(Ordering::Relaxed) {
                    break;
                }
                loading_state.spinner_char = SPINNER_CHARS[spinner_index];
                spinner_index = (spinner_index + 1) % SPINNER_CHARS.len();
                if responses
                    .send(NetworkResponse::LoadingStateChanged { loading_state })
                    .await
                    .is_err()
                {
                    break;
                }
            }
        });
    }

    async fn stop_loading_animation(&self, is_ok: bool) {
        self.is_loading.store(false, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(15)).await;

        let spinner_char = if is_ok { ' ' } else { ERROR_CHAR };
        let _ = self
            .responses
            .send(NetworkResponse::LoadingStateChanged {
                loading_state: LoadingState { is_loading: false, spinner_char },
            })
            .await;
    }
}

fn is_failure(response: &NetworkResponse) -> bool {
    matches!(
        response,
        NetworkResponse::Error { .. }
            | NetworkResponse::DecisionFailed { .. }
            | NetworkResponse::WinnerDeclared { refreshed: Err(_), .. }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tourney_api::Bracket;

    #[test]
    fn failures_flag_the_spinner() {
        assert!(is_failure(&NetworkResponse::Error { message: "x".into() }));
        assert!(is_failure(&NetworkResponse::DecisionFailed { match_id: Id::Num(1), message: "x".into() }));
        assert!(is_failure(&NetworkResponse::WinnerDeclared {
            match_id: Id::Num(1),
            generation: 1,
            refreshed: Err("x".into()),
        }));
        assert!(!is_failure(&NetworkResponse::BracketLoaded { generation: 1, bracket: Bracket::default() }));
    }

    async fn next_payload(rx: &mut mpsc::Receiver<NetworkResponse>) -> NetworkResponse {
        loop {
            match rx.recv().await.expect("worker closed the channel") {
                NetworkResponse::LoadingStateChanged { .. } => continue,
                other => return other,
            }
        }
    }

    #[tokio::test]
    async fn failed_declaration_skips_the_refetch() {
        let mut server = mockito::Server::new_async().await;
        let post = server
            .mock("POST", "/event/winner/5")
            .with_status(403)
            .with_body(r#"{"message": "Only the organizer can declare winners"}"#)
            .create_async()
            .await;
        let get = server.mock("GET", "/event/3/match").expect(0).create_async().await;

        let (req_tx, req_rx) = mpsc::channel(8);
        let (resp_tx, mut resp_rx) = mpsc::channel(64);
        let target = EventTarget { event_id: "3".into(), multiplayer: false };
        tokio::spawn(NetworkWorker::new(TourneyApi::new(&server.url()), target, req_rx, resp_tx).run());

        req_tx
            .send(NetworkRequest::DeclareWinner { match_id: Id::Num(5), winner_id: Id::Num(9), generation: 4 })
            .await
            .unwrap();

        match next_payload(&mut resp_rx).await {
            NetworkResponse::DecisionFailed { match_id, message } => {
                assert_eq!(match_id, Id::Num(5));
                assert_eq!(message, "Only the organizer can declare winners");
            }
            other => panic!("unexpected response: {other:?}"),
        }
        post.assert_async().await;
        get.assert_async().await;
    }

    #[tokio::test]
    async fn unreachable_server_reports_generic_message() {
        let (req_tx, req_rx) = mpsc::channel(8);
        let (resp_tx, mut resp_rx) = mpsc::channel(64);
        let target = EventTarget { event_id: "3".into(), multiplayer: false };
        let client = TourneyApi::new("http://127.0.0.1:9").with_timeout(Duration::from_secs(2));
        tokio::spawn(NetworkWorker::new(client, target, req_rx, resp_tx).run());

        req_tx.send(NetworkRequest::LoadBracket { generation: 1 }).await.unwrap();
        match next_payload(&mut resp_rx).await {
            NetworkResponse::Error { message } => assert_eq!(message, "Could not reach the tournament server."),
            other => panic!("unexpected response: {other:?}"),
        }
    }
}
