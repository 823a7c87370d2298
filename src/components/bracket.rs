use serde::Serialize;
use tourney_api::Bracket;

// ---------------------------------------------------------------------------
// Layout constants (pixels)
// ---------------------------------------------------------------------------

pub const BOX_WIDTH: f64 = 200.0;
pub const BOX_HEIGHT: f64 = 60.0;
/// Horizontal space between two round columns; connectors live here.
pub const ROUND_GAP: f64 = 120.0;
pub const VERTICAL_GAP: f64 = 20.0;
/// Outer padding added to every coordinate.
pub const PADDING: f64 = 20.0;
/// Horizontal distance from a curve endpoint to its control point.
pub const CURVE_OFFSET: f64 = 60.0;
pub const ARROW_SIZE: f64 = 8.0;

/// Geometric configuration of the bracket canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    pub box_width: f64,
    pub box_height: f64,
    pub round_gap: f64,
    pub vertical_gap: f64,
    pub padding: f64,
    pub curve_offset: f64,
    pub arrow_size: f64,
    /// Offset below the previous sibling for a match with no feeder at all.
    /// `None` uses the regular row stride.
    pub orphan_stride: Option<f64>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            box_width: BOX_WIDTH,
            box_height: BOX_HEIGHT,
            round_gap: ROUND_GAP,
            vertical_gap: VERTICAL_GAP,
            padding: PADDING,
            curve_offset: CURVE_OFFSET,
            arrow_size: ARROW_SIZE,
            orphan_stride: None,
        }
    }
}

impl LayoutConfig {
    /// Distance between the tops of two consecutive first-round boxes.
    pub fn row_stride(&self) -> f64 {
        self.box_height + self.vertical_gap
    }

    /// Left edge of a round's column.
    pub fn column_x(&self, round: usize) -> f64 {
        self.padding + round as f64 * (self.box_width + self.round_gap)
    }

    fn orphan_offset(&self) -> f64 {
        self.orphan_stride.unwrap_or_else(|| self.row_stride())
    }
}

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// Vertical offset of every match box, per round, indexed like the sorted
/// match list of that round.
///
/// Round 0 is an evenly spaced column. A later match sits at the midpoint of
/// its feeders `2m` and `2m+1` in the previous round, at its only feeder when
/// the other is missing (a bye), and otherwise one stride below its previous
/// sibling so boxes never overlap on incomplete data.
pub fn compute_positions(match_counts: &[usize], config: &LayoutConfig) -> Vec<Vec<f64>> {
    let mut positions: Vec<Vec<f64>> = Vec::with_capacity(match_counts.len());

    for (r, &count) in match_counts.iter().enumerate() {
        let mut column: Vec<f64> = Vec::with_capacity(count);

        if r == 0 {
            column.extend((0..count).map(|i| i as f64 * config.row_stride()));
        } else {
            let feeders = &positions[r - 1];
            for m in 0..count {
                let y = match (feeders.get(2 * m), feeders.get(2 * m + 1)) {
                    (Some(a), Some(b)) => (a + b) / 2.0,
                    (Some(only), None) | (None, Some(only)) => *only,
                    (None, None) => column
                        .last()
                        .map(|prev| prev + config.orphan_offset())
                        .unwrap_or(0.0),
                };
                column.push(y);
            }
        }

        positions.push(column);
    }

    positions
}

// ---------------------------------------------------------------------------
// Connectors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Cubic Bézier from a feeder's right edge to its parent's left edge.
/// Control points are horizontal tangents so the curve leaves and enters flat.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicCurve {
    pub from: Point,
    pub ctrl1: Point,
    pub ctrl2: Point,
    pub to: Point,
}

impl CubicCurve {
    pub fn svg_path(&self) -> String {
        format!(
            "M {} {} C {} {}, {} {}, {} {}",
            self.from.x, self.from.y, self.ctrl1.x, self.ctrl1.y, self.ctrl2.x, self.ctrl2.y, self.to.x, self.to.y
        )
    }

    pub fn point_at(&self, t: f64) -> Point {
        let u = 1.0 - t;
        let (b0, b1, b2, b3) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
        Point {
            x: b0 * self.from.x + b1 * self.ctrl1.x + b2 * self.ctrl2.x + b3 * self.to.x,
            y: b0 * self.from.y + b1 * self.ctrl1.y + b2 * self.ctrl2.y + b3 * self.to.y,
        }
    }

    /// `segments + 1` points along the curve, endpoints included.
    pub fn sample(&self, segments: usize) -> Vec<Point> {
        let segments = segments.max(1);
        (0..=segments)
            .map(|i| self.point_at(i as f64 / segments as f64))
            .collect()
    }
}

/// Right-pointing triangle whose tip touches the parent box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arrowhead {
    /// Upper base corner, tip, lower base corner.
    pub points: [Point; 3],
}

impl Arrowhead {
    pub fn new(tip: Point, size: f64) -> Self {
        let half = size / 2.0;
        Self {
            points: [
                Point::new(tip.x - size, tip.y - half),
                tip,
                Point::new(tip.x - size, tip.y + half),
            ],
        }
    }

    pub fn tip(&self) -> Point {
        self.points[1]
    }

    pub fn svg_path(&self) -> String {
        let [a, b, c] = self.points;
        format!("M {} {} L {} {} L {} {} Z", a.x, a.y, b.x, b.y, c.x, c.y)
    }

    pub fn svg_points(&self) -> String {
        self.points
            .iter()
            .map(|p| format!("{},{}", p.x, p.y))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Connector {
    Curve(CubicCurve),
    Arrow(Arrowhead),
}

/// Flat draw instruction: `{ path }` for curves, `{ path, isArrow, points }` for arrows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawCommand {
    pub path: String,
    #[serde(rename = "isArrow", skip_serializing_if = "Option::is_none")]
    pub is_arrow: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<String>,
}

impl Connector {
    pub fn to_command(&self) -> DrawCommand {
        match self {
            Connector::Curve(curve) => DrawCommand { path: curve.svg_path(), is_arrow: None, points: None },
            Connector::Arrow(arrow) => DrawCommand {
                path: arrow.svg_path(),
                is_arrow: Some(true),
                points: Some(arrow.svg_points()),
            },
        }
    }
}

/// Curves (one per existing feeder) and an arrowhead for every match of
/// round r+1, linking it to matches `2m` and `2m+1` of round r.
pub fn compute_connectors(positions: &[Vec<f64>], config: &LayoutConfig) -> Vec<Connector> {
    let center = |y: f64| config.padding + y + config.box_height / 2.0;
    let mut connectors = Vec::new();

    for r in 0..positions.len().saturating_sub(1) {
        let start_x = config.column_x(r) + config.box_width;
        let end_x = config.column_x(r + 1);

        for (m, &target) in positions[r + 1].iter().enumerate() {
            let to = Point::new(end_x, center(target));
            let mut linked = false;

            for child in [2 * m, 2 * m + 1] {
                let Some(&source) = positions[r].get(child) else {
                    continue;
                };
                let from = Point::new(start_x, center(source));
                connectors.push(Connector::Curve(CubicCurve {
                    from,
                    ctrl1: Point::new(start_x + config.curve_offset, from.y),
                    ctrl2: Point::new(end_x - config.curve_offset, to.y),
                    to,
                }));
                linked = true;
            }

            if linked {
                connectors.push(Connector::Arrow(Arrowhead::new(to, config.arrow_size)));
            }
        }
    }

    connectors
}

// ---------------------------------------------------------------------------
// BracketLayout: everything derived from one snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoxRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoxRect {
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Derived geometry for a bracket snapshot. Recomputed wholesale whenever
/// the snapshot changes, never patched.
#[derive(Debug, Clone, PartialEq)]
pub struct BracketLayout {
    pub config: LayoutConfig,
    pub positions: Vec<Vec<f64>>,
    pub connectors: Vec<Connector>,
}

impl BracketLayout {
    pub fn compute(bracket: &Bracket, config: LayoutConfig) -> Self {
        let counts: Vec<usize> = bracket.rounds.iter().map(|r| r.matches.len()).collect();
        let positions = compute_positions(&counts, &config);
        let connectors = compute_connectors(&positions, &config);
        Self { config, positions, connectors }
    }

    /// Absolute box of match `idx` in round `round`, padding included.
    pub fn box_rect(&self, round: usize, idx: usize) -> Option<BoxRect> {
        let y = *self.positions.get(round)?.get(idx)?;
        Some(BoxRect {
            x: self.config.column_x(round),
            y: self.config.padding + y,
            width: self.config.box_width,
            height: self.config.box_height,
        })
    }

    pub fn boxes(&self) -> impl Iterator<Item = (usize, usize, BoxRect)> + '_ {
        self.positions.iter().enumerate().flat_map(move |(r, column)| {
            (0..column.len()).filter_map(move |i| self.box_rect(r, i).map(|rect| (r, i, rect)))
        })
    }

    pub fn round_count(&self) -> usize {
        self.positions.len()
    }

    pub fn content_width(&self) -> f64 {
        match self.positions.len() {
            0 => 0.0,
            n => self.config.column_x(n - 1) + self.config.box_width + self.config.padding,
        }
    }

    pub fn content_height(&self) -> f64 {
        let lowest = self
            .positions
            .iter()
            .flatten()
            .copied()
            .fold(None, |acc: Option<f64>, y| Some(acc.map_or(y, |a| a.max(y))));
        match lowest {
            None => 0.0,
            Some(y) => y + self.config.box_height + 2.0 * self.config.padding,
        }
    }

    pub fn draw_commands(&self) -> Vec<DrawCommand> {
        self.connectors.iter().map(Connector::to_command).collect()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
