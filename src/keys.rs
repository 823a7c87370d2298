use crate::app::{App, MenuItem, PAN_STEP_X, PAN_STEP_Y};
use crate::state::messages::NetworkRequest;
use crossterm::event::KeyCode::Char;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tourney_api::SlotSide;

pub async fn handle_key_bindings(
    key_event: KeyEvent,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
) {
    let mut guard = app.lock().await;
    let mut request = None;

    match (guard.state.active_tab, key_event.code, key_event.modifiers) {
        // Quit
        (_, Char('q'), _) | (_, Char('c'), KeyModifiers::CONTROL) => {
            crate::cleanup_terminal();
            std::process::exit(0);
        }

        // Tab switching
        (_, Char('1'), _) => guard.update_tab(MenuItem::Bracket),
        (_, Char('2'), _) => guard.update_tab(MenuItem::Matches),
        (_, Char('?'), _) => guard.update_tab(MenuItem::Help),
        (MenuItem::Help, KeyCode::Esc, _) => guard.exit_help(),

        // Selection, shared by the canvas and the match list
        (MenuItem::Bracket | MenuItem::Matches, Char('l'), _) => guard.select_parent(),
        (MenuItem::Bracket | MenuItem::Matches, Char('h'), _) => guard.select_feeder(),
        (MenuItem::Bracket | MenuItem::Matches, Char('j'), _) => guard.select_next(),
        (MenuItem::Bracket | MenuItem::Matches, Char('k'), _) => guard.select_prev(),

        // Canvas panning
        (MenuItem::Bracket, KeyCode::Left, _) => guard.pan(-PAN_STEP_X, 0.0),
        (MenuItem::Bracket, KeyCode::Right, _) => guard.pan(PAN_STEP_X, 0.0),
        (MenuItem::Bracket, KeyCode::Up, _) => guard.pan(0.0, -PAN_STEP_Y),
        (MenuItem::Bracket, KeyCode::Down, _) => guard.pan(0.0, PAN_STEP_Y),
        (MenuItem::Bracket, Char('c'), _) => guard.center_on_selection(),

        // Decisions
        (MenuItem::Bracket | MenuItem::Matches, Char('t'), _) => {
            request = guard.declare_winner(SlotSide::First);
        }
        (MenuItem::Bracket | MenuItem::Matches, Char('b'), _) => {
            request = guard.declare_winner(SlotSide::Second);
        }

        // Global
        (_, Char('R'), _) => request = Some(guard.request_bracket()),
        (_, Char('f'), _) => guard.toggle_full_screen(),
        (_, Char('"'), _) => guard.toggle_show_logs(),

        _ => {}
    }

    if let Some(request) = request {
        drop(guard);
        send_request(request, app, network_requests).await;
    }
}

/// Queue `request` for the network worker. A closed channel is reported
/// back to the app so nothing stays marked in flight.
pub async fn send_request(
    request: NetworkRequest,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
) {
    if let Err(mpsc::error::SendError(request)) = network_requests.send(request).await {
        app.lock().await.on_request_dropped(request);
    }
}

/// Left-drag pans the canvas. Other mouse input is ignored.
pub async fn handle_mouse(mouse_event: MouseEvent, app: &Arc<Mutex<App>>) -> bool {
    let mut guard = app.lock().await;
    if guard.state.active_tab != MenuItem::Bracket {
        return false;
    }

    let bracket = &mut guard.state.bracket;
    match mouse_event.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            bracket.drag_start(mouse_event.column, mouse_event.row);
            false
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            bracket.drag_to(mouse_event.column, mouse_event.row);
            true
        }
        MouseEventKind::Up(MouseButton::Left) => {
            let was_dragging = bracket.is_dragging();
            bracket.drag_end();
            was_dragging
        }
        _ => false,
    }
}
