use crate::app::MenuItem;
use crate::components::bracket::{BoxRect, BracketLayout, LayoutConfig};
use crate::components::bracket_view::{CELL_HEIGHT_PX, CELL_WIDTH_PX};
use chrono::{DateTime, Local};
use log::{debug, warn};
use std::collections::HashMap;
use std::fmt;
use tourney_api::{Bracket, Id, Match, MatchState, SlotSide};

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// One accepted fetch together with the layout derived from it.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub bracket: Bracket,
    pub layout: BracketLayout,
    pub loaded_at: DateTime<Local>,
}

// ---------------------------------------------------------------------------
// Decision gate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionError {
    NoSnapshot,
    MatchNotFound,
    Incomplete,
    AlreadyDecided,
    InFlight,
}

impl fmt::Display for DecisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DecisionError::NoSnapshot => "The bracket has not loaded yet.",
            DecisionError::MatchNotFound => "No match is selected.",
            DecisionError::Incomplete => "Both participants must be known before declaring a winner.",
            DecisionError::AlreadyDecided => "This match already has a winner.",
            DecisionError::InFlight => "A decision for this match is already being submitted.",
        };
        f.write_str(text)
    }
}

impl std::error::Error for DecisionError {}

/// A validated decision, ready to be sent to the network worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinnerDecision {
    pub match_id: Id,
    pub winner_id: Id,
    pub generation: u64,
}

// ---------------------------------------------------------------------------
// Bracket view state
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub round: usize,
    pub index: usize,
}

/// Local pan state of the canvas, in layout pixels. Never sent anywhere.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub scroll_x: f64,
    pub scroll_y: f64,
    /// Size of the canvas in terminal cells, recorded on every draw.
    pub viewport: (u16, u16),
    drag_anchor: Option<(u16, u16)>,
}

impl ViewState {
    pub fn viewport_px(&self) -> (f64, f64) {
        (
            f64::from(self.viewport.0) * CELL_WIDTH_PX,
            f64::from(self.viewport.1) * CELL_HEIGHT_PX,
        )
    }
}

#[derive(Debug, Default)]
pub struct BracketState {
    pub snapshot: Option<Snapshot>,
    pub layout_config: LayoutConfig,
    pub selection: Selection,
    pub view: ViewState,
    /// Matches with a decision in flight, keyed to the decision's generation.
    pending: HashMap<Id, u64>,
    requested_generation: u64,
    applied_generation: u64,
}

impl BracketState {
    pub fn bracket(&self) -> Option<&Bracket> {
        self.snapshot.as_ref().map(|s| &s.bracket)
    }

    /// Allocate the generation for a new snapshot request. Any response
    /// carrying an older generation is stale from now on.
    pub fn next_generation(&mut self) -> u64 {
        self.requested_generation += 1;
        self.requested_generation
    }

    pub fn requested_generation(&self) -> u64 {
        self.requested_generation
    }

    pub fn applied_generation(&self) -> u64 {
        self.applied_generation
    }

    /// Replace the snapshot wholesale. Returns false when a snapshot of the
    /// same or a later generation is already shown and this one was dropped.
    pub fn apply_snapshot(&mut self, generation: u64, bracket: Bracket) -> bool {
        if generation <= self.applied_generation {
            debug!(
                "dropping stale snapshot (generation {generation}, showing {})",
                self.applied_generation
            );
            return false;
        }
        self.applied_generation = generation;
        self.settle_pending(generation, &bracket);

        let selected_id = self.selected_match().map(|m| m.id.clone());
        let layout = BracketLayout::compute(&bracket, self.layout_config);
        self.snapshot = Some(Snapshot { bracket, layout, loaded_at: Local::now() });

        let relocated = selected_id
            .as_ref()
            .and_then(|id| self.bracket()?.find_match(id))
            .map(|(round, index, _)| Selection { round, index });
        match relocated {
            Some(selection) => self.selection = selection,
            None => self.clamp_selection(),
        }
        self.clamp_scroll();
        true
    }

    pub fn selected_match(&self) -> Option<&Match> {
        self.bracket()?.match_at(self.selection.round, self.selection.index)
    }

    pub fn selected_rect(&self) -> Option<BoxRect> {
        self.snapshot
            .as_ref()?
            .layout
            .box_rect(self.selection.round, self.selection.index)
    }

    pub fn is_pending(&self, match_id: &Id) -> bool {
        self.pending.contains_key(match_id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Validate declaring the participant in `side` of the selected match.
    pub fn begin_decision(&mut self, side: SlotSide) -> Result<WinnerDecision, DecisionError> {
        let match_id = self
            .selected_match()
            .map(|m| m.id.clone())
            .ok_or(if self.snapshot.is_none() {
                DecisionError::NoSnapshot
            } else {
                DecisionError::MatchNotFound
            })?;
        self.begin_decision_for(&match_id, side)
    }

    /// Gate a decision on `match_id`. On success the match is marked in flight
    /// and a fresh generation is allocated for the refetch that follows.
    pub fn begin_decision_for(&mut self, match_id: &Id, side: SlotSide) -> Result<WinnerDecision, DecisionError> {
        let bracket = self.bracket().ok_or(DecisionError::NoSnapshot)?;
        let (_, _, game) = bracket.find_match(match_id).ok_or(DecisionError::MatchNotFound)?;

        match game.state() {
            MatchState::Decided => return Err(DecisionError::AlreadyDecided),
            MatchState::Pending => return Err(DecisionError::Incomplete),
            MatchState::Ready => {}
        }
        if self.pending.contains_key(match_id) {
            return Err(DecisionError::InFlight);
        }
        let winner_id = game
            .slot(side)
            .participant
            .as_ref()
            .map(|p| p.id.clone())
            .ok_or(DecisionError::Incomplete)?;

        let generation = self.next_generation();
        self.pending.insert(match_id.clone(), generation);
        Ok(WinnerDecision { match_id: match_id.clone(), winner_id, generation })
    }

    /// Drop the in-flight mark of a decision that never reached the server.
    pub fn finish_decision(&mut self, match_id: &Id) {
        if self.pending.remove(match_id).is_none() {
            warn!("decision for match {match_id} finished but was not pending");
        }
    }

    /// Requests are served in order, so a snapshot at or past a decision's
    /// generation was fetched after its POST and is authoritative for it.
    fn settle_pending(&mut self, generation: u64, bracket: &Bracket) {
        self.pending.retain(|match_id, decided_at| {
            let decided = bracket
                .find_match(match_id)
                .is_none_or(|(_, _, game)| game.state() == MatchState::Decided);
            !decided && *decided_at > generation
        });
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    fn round_len(&self, round: usize) -> usize {
        self.bracket()
            .and_then(|b| b.rounds.get(round))
            .map_or(0, |r| r.matches.len())
    }

    fn round_count(&self) -> usize {
        self.bracket().map_or(0, |b| b.rounds.len())
    }

    fn clamp_selection(&mut self) {
        let rounds = self.round_count();
        if rounds == 0 {
            self.selection = Selection::default();
            return;
        }
        self.selection.round = self.selection.round.min(rounds - 1);
        self.selection.index = self
            .selection
            .index
            .min(self.round_len(self.selection.round).saturating_sub(1));
    }

    /// Move toward the final: match `m` feeds match `m / 2` of the next round.
    pub fn select_parent(&mut self) {
        if self.selection.round + 1 < self.round_count() {
            self.selection.round += 1;
            self.selection.index /= 2;
            self.clamp_selection();
        }
    }

    /// Move toward round 0, landing on the first feeder `2m`.
    pub fn select_feeder(&mut self) {
        if self.selection.round > 0 {
            self.selection.round -= 1;
            self.selection.index *= 2;
            self.clamp_selection();
        }
    }

    pub fn select_next(&mut self) {
        if self.selection.index + 1 < self.round_len(self.selection.round) {
            self.selection.index += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selection.index = self.selection.index.saturating_sub(1);
    }

    // -----------------------------------------------------------------------
    // Panning
    // -----------------------------------------------------------------------

    fn content_size(&self) -> (f64, f64) {
        self.snapshot
            .as_ref()
            .map_or((0.0, 0.0), |s| (s.layout.content_width(), s.layout.content_height()))
    }

    fn clamp_scroll(&mut self) {
        let (width, height) = self.content_size();
        let (view_w, view_h) = self.view.viewport_px();
        self.view.scroll_x = self.view.scroll_x.clamp(0.0, (width - view_w).max(0.0));
        self.view.scroll_y = self.view.scroll_y.clamp(0.0, (height - view_h).max(0.0));
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.view.scroll_x += dx;
        self.view.scroll_y += dy;
        self.clamp_scroll();
    }

    pub fn set_viewport(&mut self, cols: u16, rows: u16) {
        self.view.viewport = (cols, rows);
    }

    pub fn center_on_selection(&mut self) {
        let Some(rect) = self.selected_rect() else {
            return;
        };
        let center = rect.center();
        let (view_w, view_h) = self.view.viewport_px();
        self.view.scroll_x = center.x - view_w / 2.0;
        self.view.scroll_y = center.y - view_h / 2.0;
        self.clamp_scroll();
    }

    pub fn drag_start(&mut self, column: u16, row: u16) {
        self.view.drag_anchor = Some((column, row));
    }

    /// Pan by the pointer delta since the last drag event. Content follows the pointer.
    pub fn drag_to(&mut self, column: u16, row: u16) {
        let Some((last_col, last_row)) = self.view.drag_anchor else {
            return;
        };
        let dx = (f64::from(column) - f64::from(last_col)) * CELL_WIDTH_PX;
        let dy = (f64::from(row) - f64::from(last_row)) * CELL_HEIGHT_PX;
        self.view.drag_anchor = Some((column, row));
        self.pan(-dx, -dy);
    }

    pub fn drag_end(&mut self) {
        self.view.drag_anchor = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.view.drag_anchor.is_some()
    }
}

// ---------------------------------------------------------------------------
// Root app state
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct AppState {
    pub active_tab: MenuItem,
    pub previous_tab: MenuItem,
    pub show_logs: bool,
    /// Alert shown in the status line until the next successful load.
    pub last_error: Option<String>,
    pub notice: Option<String>,
    pub bracket: BracketState,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tourney_api::Slot;

    fn game(id: i64, key: u32, number: u32, slots: [Slot; 2], winner: Option<i64>) -> Match {
        Match {
            id: Id::Num(id),
            key_number: key,
            match_number: number,
            winner_id: winner.map(Id::Num),
            slots,
        }
    }

    /// 4 -> 2 -> 1. Match 1 is decided, 2 is ready, 3 and 4 have a bye slot.
    fn bracket() -> Bracket {
        Bracket::from_matches(
            "7",
            false,
            vec![
                game(1, 0, 0, [Slot::resolved(10, "ann"), Slot::resolved(11, "bob")], Some(10)),
                game(2, 0, 1, [Slot::resolved(12, "cat"), Slot::resolved(13, "dan")], None),
                game(3, 0, 2, [Slot::resolved(14, "eve"), Slot::resolved(15, "fay")], None),
                game(4, 0, 3, [Slot::resolved(16, "gus"), Slot::resolved(17, "hal")], None),
                game(5, 1, 0, [Slot::resolved(10, "ann"), Slot::default()], None),
                game(6, 1, 1, [Slot::default(), Slot::default()], None),
                game(7, 2, 0, [Slot::default(), Slot::default()], None),
            ],
        )
    }

    fn loaded() -> BracketState {
        let mut state = BracketState::default();
        let generation = state.next_generation();
        assert!(state.apply_snapshot(generation, bracket()));
        state
    }

    #[test]
    fn decisions_need_a_snapshot() {
        let mut state = BracketState::default();
        assert_eq!(state.begin_decision(SlotSide::First), Err(DecisionError::NoSnapshot));
    }

    #[test]
    fn ready_match_produces_decision_and_marks_pending() {
        let mut state = loaded();
        state.selection = Selection { round: 0, index: 1 };
        let before = state.requested_generation();

        let decision = state.begin_decision(SlotSide::Second).unwrap();
        assert_eq!(decision.match_id, Id::Num(2));
        assert_eq!(decision.winner_id, Id::Num(13));
        assert_eq!(decision.generation, before + 1);
        assert!(state.is_pending(&Id::Num(2)));

        assert_eq!(state.begin_decision(SlotSide::First), Err(DecisionError::InFlight));
        state.finish_decision(&Id::Num(2));
        assert!(!state.is_pending(&Id::Num(2)));
    }

    #[test]
    fn incomplete_and_decided_matches_are_rejected() {
        let mut state = loaded();
        state.selection = Selection { round: 0, index: 0 };
        assert_eq!(state.begin_decision(SlotSide::First), Err(DecisionError::AlreadyDecided));

        state.selection = Selection { round: 1, index: 0 };
        assert_eq!(state.begin_decision(SlotSide::First), Err(DecisionError::Incomplete));
        assert_eq!(state.pending_count(), 0);

        assert_eq!(
            state.begin_decision_for(&Id::Num(99), SlotSide::First),
            Err(DecisionError::MatchNotFound)
        );
    }

    #[test]
    fn stale_snapshots_are_dropped() {
        let mut state = loaded();
        let old = state.next_generation();
        let latest = state.next_generation();

        let mut newer = bracket();
        newer.rounds[0].matches[1].winner_id = Some(Id::Num(12));
        assert!(state.apply_snapshot(latest, newer));
        assert_eq!(state.applied_generation(), latest);

        assert!(!state.apply_snapshot(old, bracket()));
        assert!(!state.apply_snapshot(latest, bracket()));
        assert_eq!(state.bracket().unwrap().rounds[0].matches[1].winner_id, Some(Id::Num(12)));
    }

    #[test]
    fn superseded_but_newer_snapshots_are_still_shown() {
        let mut state = loaded();
        let first = state.next_generation();
        let _second = state.next_generation();

        let mut newer = bracket();
        newer.rounds[0].matches[1].winner_id = Some(Id::Num(12));
        assert!(state.apply_snapshot(first, newer));
        assert_eq!(state.bracket().unwrap().rounds[0].matches[1].winner_id, Some(Id::Num(12)));
    }

    #[test]
    fn pending_mark_waits_for_a_snapshot_fetched_after_the_post() {
        let mut state = loaded();
        state.selection = Selection { round: 0, index: 1 };
        let earlier = state.next_generation();
        let decision = state.begin_decision(SlotSide::First).unwrap();

        // Fetched before the POST: still shows the match as ready.
        assert!(state.apply_snapshot(earlier, bracket()));
        assert!(state.is_pending(&Id::Num(2)));

        let mut decided = bracket();
        decided.rounds[0].matches[1].winner_id = Some(Id::Num(12));
        assert!(state.apply_snapshot(decision.generation, decided));
        assert!(!state.is_pending(&Id::Num(2)));
    }

    #[test]
    fn later_snapshot_clears_a_decision_whose_refetch_failed() {
        let mut state = loaded();
        state.selection = Selection { round: 0, index: 2 };
        state.begin_decision(SlotSide::Second).unwrap();

        let reload = state.next_generation();
        assert!(state.apply_snapshot(reload, bracket()));
        assert_eq!(state.pending_count(), 0);
    }

    #[test]
    fn selection_follows_the_match_across_snapshots() {
        let mut state = loaded();
        state.selection = Selection { round: 0, index: 2 };

        let mut reordered = bracket();
        reordered.rounds[0].matches.swap(0, 2);
        let generation = state.next_generation();
        state.apply_snapshot(generation, reordered);
        assert_eq!(state.selected_match().map(|m| m.id.clone()), Some(Id::Num(3)));
        assert_eq!(state.selection, Selection { round: 0, index: 0 });
    }

    #[test]
    fn navigation_follows_feeder_relationships() {
        let mut state = loaded();
        state.selection = Selection { round: 0, index: 3 };
        state.select_parent();
        assert_eq!(state.selection, Selection { round: 1, index: 1 });
        state.select_parent();
        assert_eq!(state.selection, Selection { round: 2, index: 0 });
        state.select_parent();
        assert_eq!(state.selection, Selection { round: 2, index: 0 });

        state.select_feeder();
        assert_eq!(state.selection, Selection { round: 1, index: 0 });
        state.select_next();
        state.select_next();
        assert_eq!(state.selection, Selection { round: 1, index: 1 });
        state.select_feeder();
        assert_eq!(state.selection, Selection { round: 0, index: 2 });
        state.select_prev();
        assert_eq!(state.selection, Selection { round: 0, index: 1 });
    }

    #[test]
    fn panning_is_clamped_to_content() {
        let mut state = loaded();
        state.set_viewport(20, 5);
        state.pan(-500.0, -500.0);
        assert_eq!((state.view.scroll_x, state.view.scroll_y), (0.0, 0.0));

        state.pan(10_000.0, 10_000.0);
        // content is 880 x 340 px, viewport 200 x 100 px
        assert_eq!(state.view.scroll_x, 680.0);
        assert_eq!(state.view.scroll_y, 240.0);
    }

    #[test]
    fn drag_moves_content_with_pointer() {
        let mut state = loaded();
        state.set_viewport(10, 2);
        state.pan(300.0, 100.0);

        state.drag_start(50, 10);
        state.drag_to(48, 9);
        assert_eq!((state.view.scroll_x, state.view.scroll_y), (320.0, 120.0));
        state.drag_end();
        state.drag_to(0, 0);
        assert_eq!((state.view.scroll_x, state.view.scroll_y), (320.0, 120.0));
    }

    #[test]
    fn centering_puts_selection_mid_viewport() {
        let mut state = loaded();
        state.set_viewport(20, 4);
        state.selection = Selection { round: 1, index: 1 };
        state.center_on_selection();
        let center = state.selected_rect().unwrap().center();
        assert_eq!(state.view.scroll_x, center.x - 100.0);
        assert_eq!(state.view.scroll_y, center.y - 40.0);
    }
}
