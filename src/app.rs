use crate::state::app_settings::AppSettings;
use crate::state::app_state::AppState;
use crate::state::messages::NetworkRequest;
use log::{debug, error, info, warn};
use tourney_api::{Bracket, Id, SlotSide};

/// Pan distance of one arrow key press, in layout pixels.
pub const PAN_STEP_X: f64 = 40.0;
pub const PAN_STEP_Y: f64 = 40.0;

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum MenuItem {
    #[default]
    Bracket,
    Matches,
    Help,
}

const WORKER_GONE: &str = "The network worker stopped; restart to keep submitting.";

pub struct App {
    pub settings: AppSettings,
    pub state: AppState,
    /// Generation of the periodic reload still waiting for an answer.
    refresh_in_flight: Option<u64>,
}

impl App {
    pub fn new(settings: AppSettings) -> Self {
        if let Some(level) = settings.log_level {
            log::set_max_level(level);
            tui_logger::set_default_level(level);
        }

        Self {
            state: AppState::default(),
            settings,
            refresh_in_flight: None,
        }
    }

    /// A snapshot request under a fresh generation; older in-flight
    /// snapshots become stale.
    pub fn request_bracket(&mut self) -> NetworkRequest {
        NetworkRequest::LoadBracket {
            generation: self.state.bracket.next_generation(),
        }
    }

    /// A periodic reload, skipped while the previous one is unanswered so a
    /// slow server never builds up a queue of fetches.
    pub fn refresh_tick(&mut self) -> Option<NetworkRequest> {
        if let Some(generation) = self.refresh_in_flight {
            debug!("skipping refresh, generation {generation} still loading");
            return None;
        }
        let request = self.request_bracket();
        if let NetworkRequest::LoadBracket { generation } = request {
            self.refresh_in_flight = Some(generation);
        }
        Some(request)
    }

    /// The worker is gone and `request` was never sent.
    pub fn on_request_dropped(&mut self, request: NetworkRequest) {
        error!("network request dropped: {request:?}");
        match request {
            NetworkRequest::DeclareWinner { match_id, .. } => self.state.bracket.finish_decision(&match_id),
            NetworkRequest::LoadBracket { generation } => {
                if self.refresh_in_flight == Some(generation) {
                    self.refresh_in_flight = None;
                }
            }
        }
        self.on_error(WORKER_GONE.to_string());
    }

    // -----------------------------------------------------------------------
    // Network response handlers, called from main_ui_loop
    // -----------------------------------------------------------------------

    pub fn on_bracket_loaded(&mut self, generation: u64, bracket: Bracket) {
        if self.refresh_in_flight.is_some_and(|pending| generation >= pending) {
            self.refresh_in_flight = None;
        }
        if self.state.bracket.apply_snapshot(generation, bracket) {
            self.state.last_error = None;
        }
    }

    /// A snapshot fetch failed. Only loads answer with a bare error.
    pub fn on_load_failed(&mut self, message: String) {
        self.refresh_in_flight = None;
        self.on_error(message);
    }

    /// The in-flight mark stays until a snapshot fetched after the POST is shown.
    pub fn on_winner_declared(&mut self, match_id: Id, generation: u64, refreshed: Result<Bracket, String>) {
        info!("winner recorded for match {match_id}");
        match refreshed {
            Ok(bracket) => {
                self.on_bracket_loaded(generation, bracket);
                self.state.notice = Some(format!("Winner recorded for match {match_id}"));
            }
            Err(message) => self.on_error(message),
        }
    }

    pub fn on_decision_failed(&mut self, match_id: Id, message: String) {
        self.state.bracket.finish_decision(&match_id);
        self.on_error(message);
    }

    pub fn on_error(&mut self, message: String) {
        self.state.notice = None;
        self.state.last_error = Some(message);
    }

    // -----------------------------------------------------------------------
    // Decisions
    // -----------------------------------------------------------------------

    /// Gate a winner declaration for the selected match. Rejections are
    /// surfaced in the status line and never reach the network.
    pub fn declare_winner(&mut self, side: SlotSide) -> Option<NetworkRequest> {
        match self.state.bracket.begin_decision(side) {
            Ok(decision) => {
                self.state.last_error = None;
                self.state.notice = Some(format!("Submitting winner for match {}…", decision.match_id));
                Some(NetworkRequest::DeclareWinner {
                    match_id: decision.match_id,
                    winner_id: decision.winner_id,
                    generation: decision.generation,
                })
            }
            Err(e) => {
                warn!("winner declaration rejected: {e}");
                self.state.last_error = Some(e.to_string());
                None
            }
        }
    }

    // -----------------------------------------------------------------------
    // Tab management
    // -----------------------------------------------------------------------

    pub fn update_tab(&mut self, next: MenuItem) {
        if self.state.active_tab == next {
            return;
        }
        self.state.previous_tab = self.state.active_tab;
        self.state.active_tab = next;
    }

    pub fn exit_help(&mut self) {
        if self.state.active_tab == MenuItem::Help {
            self.state.active_tab = self.state.previous_tab;
        }
    }

    pub fn toggle_show_logs(&mut self) {
        self.state.show_logs = !self.state.show_logs;
    }

    pub fn toggle_full_screen(&mut self) {
        self.settings.full_screen = !self.settings.full_screen;
    }

    // -----------------------------------------------------------------------
    // Selection and panning, delegated to BracketState
    // -----------------------------------------------------------------------

    pub fn select_parent(&mut self) {
        self.state.bracket.select_parent();
    }

    pub fn select_feeder(&mut self) {
        self.state.bracket.select_feeder();
    }

    pub fn select_next(&mut self) {
        self.state.bracket.select_next();
    }

    pub fn select_prev(&mut self) {
        self.state.bracket.select_prev();
    }

    pub fn center_on_selection(&mut self) {
        self.state.bracket.center_on_selection();
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.state.bracket.pan(dx, dy);
    }
}
