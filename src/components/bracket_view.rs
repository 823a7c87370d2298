use crate::components::bracket::{BoxRect, BracketLayout, Connector, Point};
use crate::components::theme::{ThemeColor, color, resolve, state_color};
use crate::state::app_state::BracketState;
use tourney_api::{Match, SlotSide};
use tui::buffer::Buffer;
use tui::layout::Rect;
use tui::style::Color;
use tui::symbols::Marker;
use tui::text::Span;
use tui::widgets::Widget;
use tui::widgets::canvas::{Canvas, Context, Line as CanvasLine};

/// Layout pixels covered by one terminal column.
pub const CELL_WIDTH_PX: f64 = 10.0;
/// Layout pixels covered by one terminal row. A default box is three rows tall.
pub const CELL_HEIGHT_PX: f64 = 20.0;

/// Line segments used to approximate one connector curve.
const CURVE_SEGMENTS: usize = 12;

/// Canvas rendering of the current snapshot, scrolled by the view state.
/// Layout y grows downward, canvas y grows upward, hence the negation.
pub struct BracketView<'a> {
    pub state: &'a BracketState,
}

impl Widget for BracketView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(snapshot) = self.state.snapshot.as_ref() else {
            return;
        };
        if area.width == 0 || area.height == 0 {
            return;
        }

        let left = self.state.view.scroll_x;
        let top = self.state.view.scroll_y;
        // Canvas spreads the bounds over (cells - 1) steps.
        let width = f64::from(area.width.saturating_sub(1).max(1)) * CELL_WIDTH_PX;
        let height = f64::from(area.height.saturating_sub(1).max(1)) * CELL_HEIGHT_PX;

        Canvas::default()
            .marker(Marker::Braille)
            .x_bounds([left, left + width])
            .y_bounds([-(top + height), -top])
            .paint(|ctx| {
                draw_connectors(ctx, &snapshot.layout);
                ctx.layer();
                for (r, i, rect) in snapshot.layout.boxes() {
                    let Some(game) = snapshot.bracket.match_at(r, i) else {
                        continue;
                    };
                    let selected = self.state.selection.round == r && self.state.selection.index == i;
                    let in_flight = self.state.is_pending(&game.id);
                    draw_match(ctx, rect, game, selected, in_flight);
                }
            })
            .render(area, buf);
    }
}

fn segment(ctx: &mut Context, from: Point, to: Point, line_color: Color) {
    ctx.draw(&CanvasLine {
        x1: from.x,
        y1: -from.y,
        x2: to.x,
        y2: -to.y,
        color: line_color,
    });
}

fn draw_connectors(ctx: &mut Context, layout: &BracketLayout) {
    let line_color = color(ThemeColor::Dim);
    for connector in &layout.connectors {
        match connector {
            Connector::Curve(curve) => {
                for pair in curve.sample(CURVE_SEGMENTS).windows(2) {
                    segment(ctx, pair[0], pair[1], line_color);
                }
            }
            Connector::Arrow(arrow) => {
                let [a, b, c] = arrow.points;
                segment(ctx, a, b, line_color);
                segment(ctx, b, c, line_color);
                segment(ctx, c, a, line_color);
            }
        }
    }
}

fn draw_match(ctx: &mut Context, rect: BoxRect, game: &Match, selected: bool, in_flight: bool) {
    let outline = if selected {
        ThemeColor::Accent
    } else if in_flight {
        ThemeColor::InFlight
    } else {
        ThemeColor::Primary
    };
    let corners = [
        Point::new(rect.x, rect.y),
        Point::new(rect.x + rect.width, rect.y),
        Point::new(rect.x + rect.width, rect.y + rect.height),
        Point::new(rect.x, rect.y + rect.height),
    ];
    for k in 0..corners.len() {
        segment(ctx, corners[k], corners[(k + 1) % corners.len()], color(outline));
    }

    let max_chars = ((rect.width / CELL_WIDTH_PX) as usize).saturating_sub(2);
    let text_x = rect.x + CELL_WIDTH_PX;
    let row_y = |row: f64| -(rect.y + CELL_HEIGHT_PX * (row + 0.5));

    for (row, side) in [(0.0, SlotSide::First), (2.0, SlotSide::Second)] {
        let style = if game.is_winner(side) {
            resolve(ThemeColor::Winner)
        } else if game.slot(side).is_resolved() {
            resolve(ThemeColor::Text)
        } else {
            resolve(ThemeColor::Dim)
        };
        ctx.print(text_x, row_y(row), Span::styled(fit(game.slot(side).label(), max_chars), style));
    }

    let (status, status_color) = if in_flight {
        ("submitting…", ThemeColor::InFlight)
    } else {
        (game.state().label(), state_color(game.state()))
    };
    let marker = if selected { ">" } else { " " };
    let status_line = format!("{marker}#{} {status}", game.match_number + 1);
    let status_style = if selected { resolve(ThemeColor::Accent) } else { resolve(status_color) };
    ctx.print(text_x, row_y(1.0), Span::styled(fit(&status_line, max_chars), status_style));
}

fn fit(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut s: String = text.chars().take(max.saturating_sub(1)).collect();
    s.push('…');
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use tourney_api::{Bracket, Id, Slot};

    fn rendered(state: &BracketState, width: u16, height: u16) -> Vec<String> {
        let area = Rect::new(0, 0, width, height);
        let mut buf = Buffer::empty(area);
        BracketView { state }.render(area, &mut buf);
        (0..height)
            .map(|y| (0..width).map(|x| buf[(x, y)].symbol().to_string()).collect())
            .collect()
    }

    fn loaded_state() -> BracketState {
        let bracket = Bracket::from_matches(
            "1",
            false,
            vec![
                Match {
                    id: Id::Num(1),
                    key_number: 0,
                    match_number: 0,
                    winner_id: None,
                    slots: [Slot::resolved(10, "alice"), Slot::resolved(11, "bob")],
                },
                Match {
                    id: Id::Num(2),
                    key_number: 0,
                    match_number: 1,
                    winner_id: None,
                    slots: [Slot::resolved(12, "carol"), Slot::resolved(13, "dave")],
                },
                Match {
                    id: Id::Num(3),
                    key_number: 1,
                    match_number: 0,
                    winner_id: None,
                    slots: [Slot::default(), Slot::default()],
                },
            ],
        );
        let mut state = BracketState::default();
        let generation = state.next_generation();
        state.apply_snapshot(generation, bracket);
        state
    }

    #[test]
    fn fit_truncates_with_ellipsis() {
        assert_eq!(fit("alice", 8), "alice");
        assert_eq!(fit("a very long name", 8), "a very …");
    }

    #[test]
    fn nothing_is_drawn_without_a_snapshot() {
        let rows = rendered(&BracketState::default(), 40, 10);
        assert!(rows.iter().all(|r| r.trim().is_empty()));
    }

    #[test]
    fn names_and_status_are_printed() {
        let rows = rendered(&loaded_state(), 60, 10);
        let text = rows.join("\n");
        assert!(text.contains("alice"));
        assert!(text.contains("dave"));
        assert!(text.contains(">#1 ready"));
        assert!(text.contains("TBD"));
    }

    #[test]
    fn scrolled_out_boxes_are_not_printed() {
        let mut state = loaded_state();
        state.set_viewport(30, 10);
        state.pan(320.0, 0.0);
        let text = rendered(&state, 30, 10).join("\n");
        assert!(!text.contains("alice"));
        assert!(text.contains("TBD"));
    }
}
