//! Graphics state management for PostScript rendering.
//!
//! This module holds the state that `gsave`/`grestore` snapshot: pen
//! position, color, stroke style and the current transformation matrix.

use std::fmt;
use std::str::FromStr;

/// Identity matrix `[a b c d e f]`.
pub const IDENTITY: [f64; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Line cap style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
    /// Butt cap (default) - stroke is squared off at the endpoint
    #[default]
    Butt = 0,
    /// Round cap - semicircular arc with center at endpoint
    Round = 1,
    /// Projecting square cap - stroke continues beyond endpoint
    ProjectingSquare = 2,
}

impl LineCap {
    /// Map a `setlinecap` code; unknown codes fall back to butt.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => LineCap::Round,
            2 => LineCap::ProjectingSquare,
            _ => LineCap::Butt,
        }
    }
}

/// Line join style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineJoin {
    /// Miter join (default) - outer edges meet at a sharp point
    #[default]
    Miter = 0,
    /// Round join - circular arc between the edges
    Round = 1,
    /// Bevel join - outer edges meet at a beveled edge
    Bevel = 2,
}

impl LineJoin {
    /// Map a `setlinejoin` code; unknown codes fall back to miter.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => LineJoin::Round,
            2 => LineJoin::Bevel,
            _ => LineJoin::Miter,
        }
    }
}

/// Stroke properties for path rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeProps {
    /// Line width in user space units (default: 1.0)
    pub line_width: f64,

    /// Line cap style (default: Butt)
    pub line_cap: LineCap,

    /// Line join style (default: Miter)
    pub line_join: LineJoin,

    /// Miter limit (default: 10.0)
    pub miter_limit: f64,
}

impl Default for StrokeProps {
    fn default() -> Self {
        StrokeProps {
            line_width: 1.0,
            line_cap: LineCap::default(),
            line_join: LineJoin::default(),
            miter_limit: 10.0,
        }
    }
}

/// RGB color with channels normalized to 0.0-1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    /// Create an RGB color, clamping each channel to [0, 1].
    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Color {
            r: clamp_unit(r),
            g: clamp_unit(g),
            b: clamp_unit(b),
        }
    }

    /// Grayscale color (0.0 = black, 1.0 = white).
    pub fn gray(g: f64) -> Self {
        Color::rgb(g, g, g)
    }

    /// Convert CMYK to RGB: r=(1-c)(1-k), g=(1-m)(1-k), b=(1-y)(1-k).
    pub fn from_cmyk(c: f64, m: f64, y: f64, k: f64) -> Self {
        Color::rgb((1.0 - c) * (1.0 - k), (1.0 - m) * (1.0 - k), (1.0 - y) * (1.0 - k))
    }

    /// Create a color from u8 values (0-255).
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Color::rgb(r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0)
    }

    pub fn black() -> Self {
        Color::gray(0.0)
    }

    pub fn white() -> Self {
        Color::gray(1.0)
    }

    /// Get RGBA components as u8 values. Alpha is always 255.
    pub fn rgba8(&self) -> [u8; 4] {
        [to_byte(self.r), to_byte(self.g), to_byte(self.b), 255]
    }

    pub(crate) fn to_skia(self) -> tiny_skia::Color {
        let [r, g, b, a] = self.rgba8();
        tiny_skia::Color::from_rgba8(r, g, b, a)
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::black()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, _] = self.rgba8();
        write!(f, "#{:02x}{:02x}{:02x}", r, g, b)
    }
}

/// Parses `rrggbb` or `#rrggbb`.
impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_start_matches('#');
        let mut rgb = [0u8; 3];
        hex::decode_to_slice(digits, &mut rgb)
            .map_err(|e| format!("invalid color '{}': {}", s, e))?;
        Ok(Color::from_rgb8(rgb[0], rgb[1], rgb[2]))
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

fn to_byte(v: f64) -> u8 {
    (clamp_unit(v) * 255.0).round() as u8
}

/// Graphics state for PostScript rendering.
///
/// The in-progress path is deliberately not part of this struct, so a
/// snapshot taken by `gsave` never carries path segments.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsState {
    /// Current Transformation Matrix (CTM) - 6-element array [a b c d e f]
    /// representing the affine transform:
    /// | a c e |
    /// | b d f |
    /// | 0 0 1 |
    pub ctm: [f64; 6],

    /// Pen position in user space
    pub current_point: (f64, f64),

    /// Paint color used by both stroke and fill
    pub color: Color,

    /// Stroke properties
    pub stroke_props: StrokeProps,
}

impl Default for GraphicsState {
    fn default() -> Self {
        GraphicsState {
            ctm: IDENTITY,
            current_point: (0.0, 0.0),
            color: Color::black(),
            stroke_props: StrokeProps::default(),
        }
    }
}

impl GraphicsState {
    /// Create a new graphics state with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Save a copy of this state. The matrix is a value, so later changes to
    /// `self` never reach the snapshot.
    pub fn save(&self) -> Self {
        self.clone()
    }

    /// Concatenate a transformation matrix to the CTM.
    ///
    /// The operand matrix applies to user-space coordinates first, then the
    /// existing CTM (PostScript `concat` order).
    pub fn concat_matrix(&mut self, transform: &[f64; 6]) {
        // Matrix multiplication: CTM = CTM * transform
        let [a, b, c, d, e, f] = *transform;
        let [ctm_a, ctm_b, ctm_c, ctm_d, ctm_e, ctm_f] = self.ctm;

        self.ctm = [
            ctm_a * a + ctm_c * b,
            ctm_b * a + ctm_d * b,
            ctm_a * c + ctm_c * d,
            ctm_b * c + ctm_d * d,
            ctm_a * e + ctm_c * f + ctm_e,
            ctm_b * e + ctm_d * f + ctm_f,
        ];
    }

    pub fn translate(&mut self, tx: f64, ty: f64) {
        self.concat_matrix(&[1.0, 0.0, 0.0, 1.0, tx, ty]);
    }

    pub fn scale(&mut self, sx: f64, sy: f64) {
        self.concat_matrix(&[sx, 0.0, 0.0, sy, 0.0, 0.0]);
    }

    /// Rotate counter-clockwise by `degrees`.
    pub fn rotate(&mut self, degrees: f64) {
        let (sin, cos) = degrees.to_radians().sin_cos();
        self.concat_matrix(&[cos, sin, -sin, cos, 0.0, 0.0]);
    }

    /// Transform a point by the CTM.
    pub fn transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        let [a, b, c, d, e, f] = self.ctm;
        (a * x + c * y + e, b * x + d * y + f)
    }
}
