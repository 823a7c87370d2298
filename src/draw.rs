use log::error;
use tui::backend::Backend;
use tui::layout::{Alignment, Constraint, Layout, Rect};
use tui::style::{Color, Modifier, Style};
use tui::text::{Line, Span};
use tui::widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table, Tabs};
use tui::{Frame, Terminal};
use tui_logger::{TuiLoggerLevelOutput, TuiLoggerWidget};

use crate::app::{App, MenuItem};
use crate::components::bracket_view::BracketView;
use crate::components::theme::{ThemeColor, resolve, state_color};
use crate::state::network::{ERROR_CHAR, LoadingState};
use crate::ui::layout::LayoutAreas;
use tourney_api::{Bracket, SlotSide};

static TABS: &[&str; 2] = &["Bracket", "Matches"];

const HELP_TEXT: &str = "\
Navigation
  h / l        feeder round / next round
  j / k        next / previous match in the round
  arrows       pan the bracket canvas (mouse drag works too)
  c            center the view on the selected match

Decisions
  t            declare the first participant the winner
  b            declare the second participant the winner

General
  R            reload the bracket from the server
  1 / 2 / ?    Bracket / Matches / Help
  f            toggle full screen
  \"            toggle the log pane
  q            quit";

pub fn draw<B>(terminal: &mut Terminal<B>, app: &mut App, loading: LoadingState)
where
    B: Backend,
{
    let current_size = terminal.size().unwrap_or_default();
    if current_size.width <= 10 || current_size.height <= 10 {
        return;
    }

    let mut layout = LayoutAreas::new(current_size);

    let result = terminal.draw(|f| {
        layout.update(f.area(), app.settings.full_screen, app.state.show_logs);

        if !app.settings.full_screen {
            draw_tabs(f, layout.tab_bar, app);
        }

        match app.state.active_tab {
            MenuItem::Bracket => draw_bracket(f, layout.main, app),
            MenuItem::Matches => draw_matches(f, layout.main, app),
            MenuItem::Help => draw_help(f, layout.main),
        }

        draw_status(f, layout.status, app);
        if let Some(logs) = layout.logs {
            draw_logs(f, logs);
        }

        let full = f.area();
        draw_loading_spinner(f, full, app, loading);
    });

    if let Err(e) = result {
        error!("Failed to draw frame: {e}");
    }
}

pub fn default_border<'a>(color: Color) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color))
}

fn draw_tabs(f: &mut Frame, tab_bar: [Rect; 2], app: &App) {
    let style = Style::default().fg(Color::White);
    let border_type = BorderType::Rounded;

    let tab_index = match app.state.active_tab {
        MenuItem::Bracket => 0,
        MenuItem::Matches => 1,
        MenuItem::Help => 0,
    };

    let titles: Vec<Line> = TABS.iter().map(|t| Line::from(*t)).collect();
    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::LEFT | Borders::BOTTOM | Borders::TOP)
                .border_type(border_type),
        )
        .highlight_style(Style::default().add_modifier(Modifier::UNDERLINED))
        .select(tab_index)
        .style(style);
    f.render_widget(tabs, tab_bar[0]);

    let help = Paragraph::new("Help: ? ")
        .alignment(Alignment::Right)
        .block(
            Block::default()
                .borders(Borders::RIGHT | Borders::BOTTOM | Borders::TOP)
                .border_type(border_type),
        )
        .style(style);
    f.render_widget(help, tab_bar[1]);
}

fn draw_placeholder(f: &mut Frame, area: Rect, msg: &str) {
    f.render_widget(
        Paragraph::new(msg)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center),
        area,
    );
}

fn empty_message(app: &App) -> String {
    match app.state.last_error.as_deref() {
        Some(err) => format!("Bracket load failed:\n{err}"),
        None => "Loading bracket data...".to_string(),
    }
}

fn bracket_title(bracket: &Bracket) -> String {
    let mode = if bracket.multiplayer { "teams" } else { "players" };
    format!(" Event {} | {mode} ", bracket.event_id)
}

fn draw_bracket(f: &mut Frame, area: Rect, app: &mut App) {
    let title = app
        .state
        .bracket
        .bracket()
        .map_or_else(|| " Bracket ".to_string(), bracket_title);
    let block = default_border(Color::White).title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let Some(bracket) = app.state.bracket.bracket() else {
        draw_placeholder(f, inner, &empty_message(app));
        return;
    };
    if bracket.rounds.is_empty() {
        draw_placeholder(f, inner, "This event has no matches yet.");
        return;
    }

    let [header, canvas] = Layout::vertical([Constraint::Length(1), Constraint::Fill(1)]).areas(inner);

    let mut spans = vec![Span::raw(format!(
        "{} rounds | {} matches",
        bracket.rounds.len(),
        bracket.match_count()
    ))];
    if let Some(champion) = bracket.champion() {
        spans.push(Span::raw(" | champion "));
        spans.push(Span::styled(champion.name.clone(), resolve(ThemeColor::Winner)));
    }
    spans.push(Span::styled(
        "   h/l round  j/k match  t/b winner  c center  arrows pan",
        resolve(ThemeColor::Dim),
    ));
    f.render_widget(Paragraph::new(Line::from(spans)), header);

    app.state.bracket.set_viewport(canvas.width, canvas.height);
    f.render_widget(BracketView { state: &app.state.bracket }, canvas);
}

fn draw_matches(f: &mut Frame, area: Rect, app: &App) {
    let selection = app.state.bracket.selection;
    let block = default_border(Color::White).title(format!(" Round {} ", selection.round + 1));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let Some(round) = app
        .state
        .bracket
        .bracket()
        .and_then(|b| b.rounds.get(selection.round))
    else {
        draw_placeholder(f, inner, &empty_message(app));
        return;
    };

    let rows = round.matches.iter().enumerate().map(|(idx, game)| {
        let name = |side: SlotSide| {
            let style = if game.is_winner(side) {
                resolve(ThemeColor::Winner)
            } else if game.slot(side).is_resolved() {
                resolve(ThemeColor::Text)
            } else {
                resolve(ThemeColor::Dim)
            };
            Cell::from(Span::styled(game.slot(side).label().to_string(), style))
        };
        let (state, state_style) = if app.state.bracket.is_pending(&game.id) {
            ("submitting", resolve(ThemeColor::InFlight))
        } else {
            (game.state().label(), resolve(state_color(game.state())))
        };
        let marker = if idx == selection.index { ">" } else { " " };

        let row = Row::new(vec![
            Cell::from(format!("{marker} {}", game.match_number + 1)),
            Cell::from(game.id.to_string()),
            name(SlotSide::First),
            name(SlotSide::Second),
            Cell::from(Span::styled(state, state_style)),
        ]);
        if idx == selection.index {
            row.style(Style::default().add_modifier(Modifier::REVERSED))
        } else {
            row
        }
    });

    let header = Row::new(vec!["  #", "id", "first", "second", "state"]).style(resolve(ThemeColor::Dim));
    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Length(8),
            Constraint::Fill(1),
            Constraint::Fill(1),
            Constraint::Length(11),
        ],
    )
    .header(header);
    f.render_widget(table, inner);
}

fn draw_help(f: &mut Frame, area: Rect) {
    let block = default_border(Color::DarkGray).title(" Help ");
    let inner = block.inner(area);
    f.render_widget(block, area);
    f.render_widget(Paragraph::new(HELP_TEXT), inner);
}

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = Vec::new();
    if let Some(snapshot) = app.state.bracket.snapshot.as_ref() {
        spans.push(Span::styled(
            format!(" refreshed {} ", snapshot.loaded_at.format("%H:%M:%S")),
            resolve(ThemeColor::Dim),
        ));
    }
    let pending = app.state.bracket.pending_count();
    if pending > 0 {
        spans.push(Span::styled(format!(" {pending} submitting "), resolve(ThemeColor::InFlight)));
    }
    if let Some(err) = app.state.last_error.as_deref() {
        spans.push(Span::styled(format!(" {err}"), resolve(ThemeColor::Alert)));
    } else if let Some(notice) = app.state.notice.as_deref() {
        spans.push(Span::styled(format!(" {notice}"), resolve(ThemeColor::Text)));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_logs(f: &mut Frame, area: Rect) {
    let logger = TuiLoggerWidget::default()
        .block(default_border(Color::DarkGray).title(" Logs "))
        .style_error(Style::default().fg(Color::Red))
        .style_warn(Style::default().fg(Color::Yellow))
        .style_info(Style::default().fg(Color::Cyan))
        .style_debug(Style::default().fg(Color::Gray))
        .output_separator(' ')
        .output_timestamp(Some("%H:%M:%S".to_string()))
        .output_level(Some(TuiLoggerLevelOutput::Abbreviated))
        .output_target(false)
        .output_file(false)
        .output_line(false);
    f.render_widget(logger, area);
}

fn draw_loading_spinner(f: &mut Frame, area: Rect, app: &App, loading: LoadingState) {
    if !loading.is_loading && loading.spinner_char != ERROR_CHAR {
        return;
    }
    let style = match loading.spinner_char {
        ERROR_CHAR => Style::default().fg(Color::Red),
        _ => Style::default().fg(Color::White),
    };
    let spinner = Paragraph::new(loading.spinner_char.to_string())
        .alignment(Alignment::Right)
        .style(style);
    let area = if app.settings.full_screen {
        Rect::new(area.width.saturating_sub(3), area.height.saturating_sub(2), 1, 1)
    } else {
        Rect::new(area.width.saturating_sub(11), 1, 1, 1)
    };
    f.render_widget(spinner, area);
}
