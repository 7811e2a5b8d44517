//! Path construction for PostScript graphics.
//!
//! Paths are built incrementally using move, line, curve, arc and close
//! operations, in user space. The active transform is applied only when the
//! path is painted.

use std::f64::consts::FRAC_PI_2;
use std::fmt;

/// A path element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathElement {
    /// Move to a new point (starts a new subpath)
    MoveTo(f64, f64),
    /// Line to a point
    LineTo(f64, f64),
    /// Cubic Bézier curve (cp1x, cp1y, cp2x, cp2y, x, y)
    CurveTo(f64, f64, f64, f64, f64, f64),
    /// Circular arc around (cx, cy). Angles in degrees, positive sweep is
    /// counter-clockwise. The start point is already the current point.
    Arc {
        cx: f64,
        cy: f64,
        radius: f64,
        start: f64,
        sweep: f64,
    },
    /// Close the current subpath
    ClosePath,
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathElement::MoveTo(x, y) => write!(f, "M {} {}", x, y),
            PathElement::LineTo(x, y) => write!(f, "L {} {}", x, y),
            PathElement::CurveTo(cp1x, cp1y, cp2x, cp2y, x, y) => {
                write!(f, "C {} {} {} {} {} {}", cp1x, cp1y, cp2x, cp2y, x, y)
            }
            PathElement::Arc {
                cx,
                cy,
                radius,
                start,
                sweep,
            } => write!(f, "A {} {} {} {} {}", cx, cy, radius, start, sweep),
            PathElement::ClosePath => write!(f, "Z"),
        }
    }
}

/// Degrees in a full circle. No arc sweeps further than this.
const FULL_TURN: f64 = 360.0;

/// Point on a circle at `degrees`.
pub fn point_on_circle(cx: f64, cy: f64, radius: f64, degrees: f64) -> (f64, f64) {
    let (sin, cos) = degrees.to_radians().sin_cos();
    (cx + radius * cos, cy + radius * sin)
}

/// Approximate an arc with cubic Béziers of at most 90 degrees each.
///
/// Returns `CurveTo` elements only; the caller is positioned at the start.
/// Sweeps beyond a full turn are drawn as a full circle; a non-finite sweep
/// yields no curves.
pub fn arc_to_cubics(cx: f64, cy: f64, radius: f64, start: f64, sweep: f64) -> Vec<PathElement> {
    if !sweep.is_finite() {
        return Vec::new();
    }
    let total = sweep.clamp(-FULL_TURN, FULL_TURN).to_radians();
    let segments = ((total.abs() / FRAC_PI_2).ceil() as usize).clamp(1, 4);
    let delta = total / segments as f64;
    let k = 4.0 / 3.0 * (delta / 4.0).tan();

    let mut curves = Vec::with_capacity(segments);
    let mut theta = start.to_radians();
    for _ in 0..segments {
        let (s0, c0) = theta.sin_cos();
        let (s1, c1) = (theta + delta).sin_cos();
        let (x0, y0) = (cx + radius * c0, cy + radius * s0);
        let (x3, y3) = (cx + radius * c1, cy + radius * s1);
        curves.push(PathElement::CurveTo(
            x0 - k * radius * s0,
            y0 + k * radius * c0,
            x3 + k * radius * s1,
            y3 - k * radius * c1,
            x3,
            y3,
        ));
        theta += delta;
    }
    curves
}

/// A path for rendering.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Path {
    /// The path elements
    elements: Vec<PathElement>,

    /// Current point (if any)
    current_point: Option<(f64, f64)>,

    /// Start of the current subpath (for close operations)
    subpath_start: Option<(f64, f64)>,

    /// Whether we have an open subpath
    has_open_subpath: bool,
}

impl Path {
    /// Create a new empty path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new path, clearing any existing elements.
    pub fn begin(&mut self) {
        self.elements.clear();
        self.current_point = None;
        self.subpath_start = None;
        self.has_open_subpath = false;
    }

    /// Move to a new point, starting a new subpath.
    pub fn move_to(&mut self, x: f64, y: f64) {
        // Consecutive moves collapse into one
        if let Some(PathElement::MoveTo(..)) = self.elements.last() {
            self.elements.pop();
        }
        self.elements.push(PathElement::MoveTo(x, y));
        self.current_point = Some((x, y));
        self.subpath_start = Some((x, y));
        self.has_open_subpath = false;
    }

    /// Add a line segment from the current point to (x, y).
    pub fn line_to(&mut self, x: f64, y: f64) {
        // If we don't have a current point, implicit move
        if self.current_point.is_none() {
            self.move_to(x, y);
            return;
        }

        self.elements.push(PathElement::LineTo(x, y));
        self.current_point = Some((x, y));
        self.has_open_subpath = true;
    }

    /// Add a cubic Bézier curve.
    pub fn curve_to(&mut self, cp1x: f64, cp1y: f64, cp2x: f64, cp2y: f64, x: f64, y: f64) {
        if self.current_point.is_none() {
            self.move_to(cp1x, cp1y);
        }

        self.elements
            .push(PathElement::CurveTo(cp1x, cp1y, cp2x, cp2y, x, y));
        self.current_point = Some((x, y));
        self.has_open_subpath = true;
    }

    /// Append a circular arc from `start` to `end` degrees.
    ///
    /// Counter-clockwise arcs extend `end` by whole turns until it is not
    /// below `start`; clockwise arcs do the reverse. A line joins the current
    /// point to the arc start, or a move begins the subpath if there is no
    /// current point. A sweep of more than a full turn draws the full circle.
    pub fn arc(&mut self, cx: f64, cy: f64, radius: f64, start: f64, end: f64, clockwise: bool) {
        let mut sweep = end - start;
        if clockwise {
            if sweep > 0.0 {
                sweep = -(start - end).rem_euclid(FULL_TURN);
            }
        } else if sweep < 0.0 {
            sweep = sweep.rem_euclid(FULL_TURN);
        }
        if !sweep.is_finite() {
            sweep = 0.0;
        }
        let sweep = sweep.clamp(-FULL_TURN, FULL_TURN);

        let (sx, sy) = point_on_circle(cx, cy, radius, start);
        if self.current_point.is_some() {
            self.line_to(sx, sy);
        } else {
            self.move_to(sx, sy);
        }

        if radius > 0.0 && sweep != 0.0 {
            self.elements.push(PathElement::Arc {
                cx,
                cy,
                radius,
                start,
                sweep,
            });
            self.has_open_subpath = true;
        }
        self.current_point = Some(point_on_circle(cx, cy, radius, start + sweep));
    }

    /// Add a closed rectangle to the path.
    pub fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.move_to(x, y);
        self.line_to(x + width, y);
        self.line_to(x + width, y + height);
        self.line_to(x, y + height);
        self.close_path();
    }

    /// Close the current subpath. The current point returns to the start of
    /// the subpath.
    pub fn close_path(&mut self) {
        if self.has_open_subpath {
            self.elements.push(PathElement::ClosePath);
            self.has_open_subpath = false;
        }
        if let Some(start) = self.subpath_start {
            self.current_point = Some(start);
        }
    }

    /// Get the current point.
    pub fn current_point(&self) -> Option<(f64, f64)> {
        self.current_point
    }

    /// Get the path elements.
    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    /// Elements with every arc replaced by cubic Béziers.
    pub fn expanded_elements(&self) -> Vec<PathElement> {
        let mut out = Vec::with_capacity(self.elements.len());
        for el in &self.elements {
            match *el {
                PathElement::Arc {
                    cx,
                    cy,
                    radius,
                    start,
                    sweep,
                } => out.extend(arc_to_cubics(cx, cy, radius, start, sweep)),
                other => out.push(other),
            }
        }
        out
    }

    /// Check if the path is empty.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Get the number of elements in the path.
    pub fn len(&self) -> usize {
        self.elements.len()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for el in &self.elements {
            write!(f, "{} ", el)?;
        }
        Ok(())
    }
}
