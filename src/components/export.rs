use crate::components::bracket::{BracketLayout, Connector, DrawCommand, LayoutConfig};
use serde::Serialize;
use std::fmt::Write;
use tourney_api::{Bracket, Match, MatchState, SlotSide};

const FONT_SIZE: f64 = 14.0;

// ---------------------------------------------------------------------------
// SVG
// ---------------------------------------------------------------------------

/// Standalone SVG document of the whole bracket: boxes, names, connectors.
pub fn render_svg(bracket: &Bracket, layout: &BracketLayout) -> String {
    let width = layout.content_width();
    let height = layout.content_height();
    let mut out = String::new();

    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    );
    out.push_str(r##"<rect width="100%" height="100%" fill="#111418"/>"##);
    out.push('\n');

    out.push_str(r##"<g fill="none" stroke="#5c6370" stroke-width="2">"##);
    out.push('\n');
    for connector in &layout.connectors {
        if let Connector::Curve(curve) = connector {
            let _ = writeln!(out, r#"<path d="{}"/>"#, curve.svg_path());
        }
    }
    out.push_str("</g>\n");

    out.push_str(r##"<g fill="#5c6370">"##);
    out.push('\n');
    for connector in &layout.connectors {
        if let Connector::Arrow(arrow) = connector {
            let _ = writeln!(out, r#"<polygon points="{}"/>"#, arrow.svg_points());
        }
    }
    out.push_str("</g>\n");

    for (r, i, rect) in layout.boxes() {
        let Some(game) = bracket.match_at(r, i) else {
            continue;
        };
        let stroke = match game.state() {
            MatchState::Pending => "#3e4451",
            MatchState::Ready => "#e5c07b",
            MatchState::Decided => "#98c379",
        };
        let _ = writeln!(
            out,
            r##"<rect x="{}" y="{}" width="{}" height="{}" rx="6" fill="#1e2228" stroke="{stroke}" stroke-width="2"/>"##,
            rect.x, rect.y, rect.width, rect.height
        );
        for side in [SlotSide::First, SlotSide::Second] {
            let row = side.index() as f64;
            let y = rect.y + rect.height / 4.0 + row * rect.height / 2.0 + FONT_SIZE / 3.0;
            let (fill, weight) = if game.is_winner(side) { ("#98c379", "bold") } else { ("#abb2bf", "normal") };
            let _ = writeln!(
                out,
                r#"<text x="{}" y="{y}" font-family="monospace" font-size="{FONT_SIZE}" font-weight="{weight}" fill="{fill}">{}</text>"#,
                rect.x + 10.0,
                escape_xml(game.slot(side).label())
            );
        }
    }

    out.push_str("</svg>\n");
    out
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutExport<'a> {
    pub event_id: &'a str,
    pub multiplayer: bool,
    pub config: LayoutConfig,
    pub width: f64,
    pub height: f64,
    pub rounds: Vec<RoundExport>,
    pub connectors: Vec<DrawCommand>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundExport {
    pub key_number: u32,
    pub positions: Vec<f64>,
    pub matches: Vec<MatchExport>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchExport {
    pub id: String,
    pub match_number: u32,
    pub state: &'static str,
    pub slots: [String; 2],
    pub winner: Option<String>,
}

impl MatchExport {
    fn from_match(game: &Match) -> Self {
        Self {
            id: game.id.to_string(),
            match_number: game.match_number,
            state: game.state().label(),
            slots: [
                game.slot(SlotSide::First).label().to_owned(),
                game.slot(SlotSide::Second).label().to_owned(),
            ],
            winner: game.winner().map(|p| p.name.clone()),
        }
    }
}

pub fn layout_export<'a>(bracket: &'a Bracket, layout: &BracketLayout) -> LayoutExport<'a> {
    let rounds = bracket
        .rounds
        .iter()
        .zip(layout.positions.iter())
        .map(|(round, positions)| RoundExport {
            key_number: round.index,
            positions: positions.clone(),
            matches: round.matches.iter().map(MatchExport::from_match).collect(),
        })
        .collect();

    LayoutExport {
        event_id: &bracket.event_id,
        multiplayer: bracket.multiplayer,
        config: layout.config,
        width: layout.content_width(),
        height: layout.content_height(),
        rounds,
        connectors: layout.draw_commands(),
    }
}

pub fn render_json(bracket: &Bracket, layout: &BracketLayout) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&layout_export(bracket, layout))
}
