use crate::state::network::LoadingState;
use crossterm::event::{KeyEvent, MouseEvent};
use tourney_api::{Bracket, Id};

/// Every snapshot request carries the generation it was issued under so late
/// answers to superseded requests can be recognised and dropped.
#[derive(Debug, Clone)]
pub enum NetworkRequest {
    LoadBracket { generation: u64 },
    DeclareWinner { match_id: Id, winner_id: Id, generation: u64 },
}

#[derive(Debug)]
pub enum NetworkResponse {
    LoadingStateChanged { loading_state: LoadingState },
    BracketLoaded { generation: u64, bracket: Bracket },
    /// The decision was recorded. `refreshed` is the full refetch that follows it.
    WinnerDeclared { match_id: Id, generation: u64, refreshed: Result<Bracket, String> },
    DecisionFailed { match_id: Id, message: String },
    Error { message: String },
}

#[derive(Debug, Clone)]
pub enum UiEvent {
    KeyPressed(KeyEvent),
    Mouse(MouseEvent),
    Resize,
    AppStarted,
    RefreshTick,
}
