//! Rendering context for interpreting PostScript drawing commands.
//!
//! This module provides the RenderingContext, which coordinates:
//! - The operand stack
//! - Graphics state stack (save/restore)
//! - Current path being constructed
//! - Device for rendering operations

use super::device::{Device, PathDrawMode};
use super::graphics_state::{Color, GraphicsState, LineCap, LineJoin};
use super::path::Path;
use super::raster::RasterImage;
use super::skia_device::SkiaDevice;
use crate::core::error::EpsResult;
use crate::core::operand::{Operand, OperandStack};
use crate::core::prescan::BoundingBox;
use crate::core::tokenizer::{Operator, Token, tokenize};

/// Interpreter for the supported PostScript subset.
///
/// Tokens are executed once, left to right. One context is built per render
/// call and owns all of its state.
pub struct RenderingContext<D: Device> {
    /// The device for rendering
    device: D,

    /// Operand stack
    operands: OperandStack,

    /// Active graphics state
    state: GraphicsState,

    /// Snapshots pushed by `gsave`
    state_stack: Vec<GraphicsState>,

    /// Current path being constructed, in user space
    current_path: Path,

    /// Number of paint operators executed
    paint_count: usize,
}

impl<D: Device> RenderingContext<D> {
    /// Create a new rendering context.
    pub fn new(device: D) -> Self {
        RenderingContext {
            device,
            operands: OperandStack::new(),
            state: GraphicsState::default(),
            state_stack: Vec::new(),
            current_path: Path::new(),
            paint_count: 0,
        }
    }

    /// Get the current graphics state.
    pub fn current_state(&self) -> &GraphicsState {
        &self.state
    }

    /// Get the path under construction.
    pub fn current_path(&self) -> &Path {
        &self.current_path
    }

    /// Get the operand stack.
    pub fn operands(&self) -> &OperandStack {
        &self.operands
    }

    /// Get the device.
    pub fn device(&mut self) -> &mut D {
        &mut self.device
    }

    /// Consume the context, returning the device.
    pub fn into_device(self) -> D {
        self.device
    }

    /// Number of paint operators (`stroke`, `fill`, `eofill`, `rectstroke`,
    /// `rectfill`) executed so far.
    pub fn paint_count(&self) -> usize {
        self.paint_count
    }

    /// Interpret a whole document.
    ///
    /// Stops at the first device error; everything painted before it stays
    /// on the device.
    pub fn run(&mut self, text: &str) -> EpsResult<()> {
        for token in tokenize(text) {
            self.process_token(token)?;
        }
        Ok(())
    }

    /// Process a single token.
    pub fn process_token(&mut self, token: Token<'_>) -> EpsResult<()> {
        match token {
            Token::Number(n) => self.operands.push_number(n),
            Token::Operator(op) => self.execute(op)?,
            Token::Name(_) | Token::Definition(_) => {}
            Token::Opaque(word) => self.operands.push(Operand::Opaque(word.to_string())),
        }
        Ok(())
    }

    /// Execute an operator.
    ///
    /// Operators with too few operands are skipped and leave the stack as it
    /// was.
    pub fn execute(&mut self, op: Operator) -> EpsResult<()> {
        if self.operands.len() < op.arity() {
            log::trace!(
                "skipping {}: needs {} operands, have {}",
                op,
                op.arity(),
                self.operands.len()
            );
            return Ok(());
        }

        match op {
            // Path construction
            Operator::MoveTo => {
                if let Some([x, y]) = self.operands.pop_numbers() {
                    self.move_to(x, y);
                }
            }
            Operator::LineTo => {
                if let Some([x, y]) = self.operands.pop_numbers() {
                    self.line_to(x, y);
                }
            }
            Operator::RMoveTo => {
                if let Some([dx, dy]) = self.operands.pop_numbers() {
                    let (x, y) = self.state.current_point;
                    self.move_to(x + dx, y + dy);
                }
            }
            Operator::RLineTo => {
                if let Some([dx, dy]) = self.operands.pop_numbers() {
                    let (x, y) = self.state.current_point;
                    self.line_to(x + dx, y + dy);
                }
            }
            Operator::CurveTo => {
                if let Some([x1, y1, x2, y2, x3, y3]) = self.operands.pop_numbers() {
                    self.curve_to(x1, y1, x2, y2, x3, y3);
                }
            }
            Operator::RCurveTo => {
                if let Some([dx1, dy1, dx2, dy2, dx3, dy3]) = self.operands.pop_numbers() {
                    let (x, y) = self.state.current_point;
                    self.curve_to(x + dx1, y + dy1, x + dx2, y + dy2, x + dx3, y + dy3);
                }
            }
            Operator::Arc | Operator::ArcN => {
                if let Some([cx, cy, r, a1, a2]) = self.operands.pop_numbers() {
                    self.current_path
                        .arc(cx, cy, r, a1, a2, op == Operator::ArcN);
                    self.sync_pen();
                }
            }
            Operator::ClosePath => {
                self.current_path.close_path();
                self.sync_pen();
            }
            Operator::NewPath => self.current_path.begin(),

            // Painting
            Operator::Stroke => {
                self.paint_count += 1;
                self.paint_current_path(PathDrawMode::Stroke)?;
            }
            Operator::Fill | Operator::EOFill => {
                self.paint_count += 1;
                self.paint_current_path(PathDrawMode::Fill)?;
            }
            Operator::RectStroke | Operator::RectFill => {
                if let Some([x, y, w, h]) = self.operands.pop_numbers() {
                    self.paint_count += 1;
                    let mut rect = Path::new();
                    rect.rect(x, y, w, h);
                    let mode = if op == Operator::RectFill {
                        PathDrawMode::Fill
                    } else {
                        PathDrawMode::Stroke
                    };
                    self.paint(&rect, mode)?;
                }
            }
            Operator::Clip => {
                self.device.clip_path(&self.current_path, &self.state.ctm)?;
            }

            // Color
            Operator::SetGray => {
                if let Some(g) = self.operands.pop_number() {
                    self.state.color = Color::gray(g);
                }
            }
            Operator::SetRGBColor => {
                if let Some([r, g, b]) = self.operands.pop_numbers() {
                    self.state.color = Color::rgb(r, g, b);
                }
            }
            Operator::SetCMYKColor => {
                if let Some([c, m, y, k]) = self.operands.pop_numbers() {
                    self.state.color = Color::from_cmyk(c, m, y, k);
                }
            }

            // Line style
            Operator::SetLineWidth => {
                if let Some(w) = self.operands.pop_number() {
                    self.state.stroke_props.line_width = w;
                }
            }
            Operator::SetLineCap => {
                if let Some(code) = self.operands.pop_number() {
                    self.state.stroke_props.line_cap = LineCap::from_code(code as i64);
                }
            }
            Operator::SetLineJoin => {
                if let Some(code) = self.operands.pop_number() {
                    self.state.stroke_props.line_join = LineJoin::from_code(code as i64);
                }
            }
            Operator::SetMiterLimit => {
                if let Some(limit) = self.operands.pop_number() {
                    self.state.stroke_props.miter_limit = limit;
                }
            }

            // Transforms
            Operator::Translate => {
                if let Some([tx, ty]) = self.operands.pop_numbers() {
                    self.state.translate(tx, ty);
                }
            }
            Operator::Scale => {
                if let Some([sx, sy]) = self.operands.pop_numbers() {
                    self.state.scale(sx, sy);
                }
            }
            Operator::Rotate => {
                if let Some(angle) = self.operands.pop_number() {
                    self.state.rotate(angle);
                }
            }

            // Graphics state
            Operator::GSave => self.save(),
            Operator::GRestore => self.restore(),

            Operator::ShowPage => {}
        }
        Ok(())
    }

    // === Graphics State Operators ===

    fn save(&mut self) {
        self.state_stack.push(self.state.save());
        self.device.save_state();
    }

    fn restore(&mut self) {
        match self.state_stack.pop() {
            Some(saved) => {
                self.state = saved;
                self.device.restore_state();
            }
            None => log::debug!("grestore without matching gsave"),
        }
    }

    // === Path Construction Operators ===

    fn move_to(&mut self, x: f64, y: f64) {
        self.current_path.move_to(x, y);
        self.state.current_point = (x, y);
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.current_path.line_to(x, y);
        self.state.current_point = (x, y);
    }

    fn curve_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64) {
        self.current_path.curve_to(x1, y1, x2, y2, x3, y3);
        self.state.current_point = (x3, y3);
    }

    fn sync_pen(&mut self) {
        if let Some(point) = self.current_path.current_point() {
            self.state.current_point = point;
        }
    }

    // === Path Painting Operators ===

    fn paint_current_path(&mut self, mode: PathDrawMode) -> EpsResult<()> {
        let path = std::mem::take(&mut self.current_path);
        self.paint(&path, mode)
    }

    fn paint(&mut self, path: &Path, mode: PathDrawMode) -> EpsResult<()> {
        self.device.draw_path(
            path,
            mode,
            self.state.color,
            &self.state.stroke_props,
            &self.state.ctm,
        )
    }
}

/// Result of interpreting a document onto a raster surface.
#[derive(Debug, Clone)]
pub struct Interpretation {
    pub image: RasterImage,
    /// Paint operators executed. Zero means the drawing is not usable.
    pub paint_ops: usize,
}

impl Interpretation {
    pub fn is_usable(&self) -> bool {
        self.paint_ops > 0
    }
}

/// Interpret `text` onto a `width` x `height` surface showing `bbox`.
///
/// A fault part-way through is logged and the partial drawing is returned.
/// Only a failure to allocate the surface is an error.
pub fn interpret(
    text: &str,
    width: u32,
    height: u32,
    bbox: &BoundingBox,
    background: Color,
) -> EpsResult<Interpretation> {
    let device = SkiaDevice::new(width, height, bbox, background)?;
    let mut ctx = RenderingContext::new(device);

    if let Err(e) = ctx.run(text) {
        log::warn!("interpretation stopped early: {}", e);
    }

    let paint_ops = ctx.paint_count();
    log::debug!("interpreted document: {} paint operators", paint_ops);
    Ok(Interpretation {
        image: RasterImage::from_pixmap(ctx.into_device().into_pixmap()),
        paint_ops,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::device::TestDevice;

    fn create_context() -> RenderingContext<TestDevice> {
        let device = TestDevice::new(612.0, 792.0);
        RenderingContext::new(device)
    }

    fn run(source: &str) -> RenderingContext<TestDevice> {
        let mut ctx = create_context();
        ctx.run(source).unwrap();
        ctx
    }

    #[test]
    fn test_context_creation() {
        let ctx = create_context();
        assert!(ctx.state_stack.is_empty());
        assert!(ctx.current_path().is_empty());
        assert_eq!(ctx.paint_count(), 0);
    }

    #[test]
    fn test_move_to_operator() {
        let ctx = run("10 20 moveto");
        assert_eq!(ctx.current_path().current_point(), Some((10.0, 20.0)));
        assert_eq!(ctx.current_state().current_point, (10.0, 20.0));
        assert!(ctx.operands().is_empty());
    }

    #[test]
    fn test_underflow_skips_operator() {
        let ctx = run("5 lineto");
        assert!(ctx.current_path().is_empty());
        assert_eq!(ctx.operands().len(), 1);
    }

    #[test]
    fn test_relative_moves_follow_pen() {
        let ctx = run("10 10 moveto 5 0 rlineto 0 5 rmoveto");
        assert_eq!(ctx.current_state().current_point, (15.0, 15.0));
    }

    #[test]
    fn test_rcurveto() {
        let ctx = run("10 10 moveto 1 1 2 2 3 3 rcurveto");
        assert_eq!(ctx.current_state().current_point, (13.0, 13.0));
    }

    #[test]
    fn test_closepath_returns_pen() {
        let ctx = run("1 2 moveto 10 2 lineto 10 10 lineto closepath");
        assert_eq!(ctx.current_state().current_point, (1.0, 2.0));
    }

    #[test]
    fn test_save_restore() {
        let mut ctx = run("1 0 0 setrgbcolor gsave 0 0 1 setrgbcolor 3 setlinewidth");
        assert_eq!(ctx.current_state().color, Color::rgb(0.0, 0.0, 1.0));

        ctx.run("grestore").unwrap();
        assert_eq!(ctx.current_state().color, Color::rgb(1.0, 0.0, 0.0));
        assert_eq!(ctx.current_state().stroke_props.line_width, 1.0);
        assert_eq!(
            ctx.device().operations(),
            &["save_state", "restore_state"]
        );
    }

    #[test]
    fn test_unbalanced_grestore_is_ignored() {
        let ctx = run("grestore grestore 0.5 setgray");
        assert_eq!(ctx.current_state().color, Color::gray(0.5));
    }

    #[test]
    fn test_path_is_not_saved() {
        let ctx = run("0 0 moveto gsave 10 10 lineto grestore");
        assert_eq!(ctx.current_path().len(), 2);
    }

    #[test]
    fn test_fill_clears_path_and_counts() {
        let mut ctx = run("0 0 moveto 10 0 lineto 10 10 lineto closepath fill");
        assert!(ctx.current_path().is_empty());
        assert_eq!(ctx.paint_count(), 1);
        assert!(ctx.device().operations()[0].starts_with("fill(#000000 M 0 0"));
    }

    #[test]
    fn test_eofill_is_fill() {
        let mut ctx = run("0 0 moveto 10 10 lineto eofill");
        assert!(ctx.device().operations()[0].starts_with("fill("));
    }

    #[test]
    fn test_transform_applied_at_paint_time() {
        let mut ctx = run("0 0 moveto 10 10 lineto 100 200 translate stroke");
        let op = ctx.device().operations()[0].clone();
        assert!(op.contains("M 0 0 L 10 10"));
        assert!(op.ends_with("[1.0, 0.0, 0.0, 1.0, 100.0, 200.0])"));
    }

    #[test]
    fn test_rectfill_keeps_current_path() {
        let mut ctx = run("5 5 moveto 0 0 10 20 rectfill");
        assert_eq!(ctx.current_path().len(), 1);
        assert_eq!(ctx.paint_count(), 1);
        assert!(ctx.device().operations()[0].contains("M 0 0 L 10 0 L 10 20 L 0 20 Z"));
    }

    #[test]
    fn test_clip_keeps_path() {
        let mut ctx = run("0 0 10 10 rectstroke 0 0 moveto 5 5 lineto clip");
        assert_eq!(ctx.current_path().len(), 2);
        assert!(ctx.device().operations()[1].starts_with("clip("));
    }

    #[test]
    fn test_names_and_definitions_are_discarded() {
        let ctx = run("/Helvetica findfont 12 scalefont setfont /x 3 def");
        // findfont, scalefont and setfont are opaque; 12 and 3 are numbers
        assert_eq!(ctx.operands().len(), 5);
    }

    #[test]
    fn test_opaque_operand_reads_as_zero() {
        let ctx = run("foo 7 moveto");
        assert_eq!(ctx.current_state().current_point, (0.0, 7.0));
    }

    #[test]
    fn test_line_style_operators() {
        let ctx = run("2 setlinewidth 1 setlinecap 2 setlinejoin 4 setmiterlimit");
        let props = &ctx.current_state().stroke_props;
        assert_eq!(props.line_width, 2.0);
        assert_eq!(props.line_cap, LineCap::Round);
        assert_eq!(props.line_join, LineJoin::Bevel);
        assert_eq!(props.miter_limit, 4.0);
    }

    #[test]
    fn test_arc_moves_pen_to_endpoint() {
        let ctx = run("50 50 10 0 180 arc");
        let (x, y) = ctx.current_state().current_point;
        assert!((x - 40.0).abs() < 1e-9 && (y - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_interpret_renders_square() {
        let bbox = BoundingBox::new(0, 0, 100, 100).unwrap();
        let result = interpret(
            "0 0 moveto 100 0 lineto 100 100 lineto 0 100 lineto closepath fill",
            100,
            100,
            &bbox,
            Color::white(),
        )
        .unwrap();
        assert!(result.is_usable());
        assert_eq!(result.image.pixel(50, 50), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_interpret_without_paint_is_not_usable() {
        let bbox = BoundingBox::default();
        let result = interpret("1 0 0 setrgbcolor showpage", 100, 100, &bbox, Color::white()).unwrap();
        assert!(!result.is_usable());
        assert_eq!(result.image.pixel(0, 0), Some([255, 255, 255, 255]));
    }
}
