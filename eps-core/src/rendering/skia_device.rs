//! A tiny-skia based rendering device.

use std::rc::Rc;

use tiny_skia::{
    FillRule, LineCap as SkiaLineCap, LineJoin as SkiaLineJoin, Mask, Paint, PathBuilder, Pixmap,
    Stroke, Transform,
};

use crate::core::error::{EpsError, EpsResult};
use crate::core::prescan::BoundingBox;
use crate::rendering::device::{Device, PathDrawMode};
use crate::rendering::graphics_state::{Color, LineCap, LineJoin, StrokeProps};
use crate::rendering::path::{Path, PathElement};

// --- Conversion helpers ---

fn to_skia_paint(color: Color) -> Paint<'static> {
    let mut sk_paint = Paint::default();
    sk_paint.set_color(color.to_skia());
    sk_paint.anti_alias = true;
    sk_paint
}

fn to_skia_line_cap(line_cap: LineCap) -> SkiaLineCap {
    match line_cap {
        LineCap::Butt => SkiaLineCap::Butt,
        LineCap::Round => SkiaLineCap::Round,
        LineCap::ProjectingSquare => SkiaLineCap::Square,
    }
}

fn to_skia_line_join(line_join: LineJoin) -> SkiaLineJoin {
    match line_join {
        LineJoin::Miter => SkiaLineJoin::Miter,
        LineJoin::Round => SkiaLineJoin::Round,
        LineJoin::Bevel => SkiaLineJoin::Bevel,
    }
}

fn to_skia_stroke(stroke_props: &StrokeProps) -> Stroke {
    Stroke {
        width: stroke_props.line_width.max(0.0) as f32,
        miter_limit: stroke_props.miter_limit.max(1.0) as f32,
        line_cap: to_skia_line_cap(stroke_props.line_cap),
        line_join: to_skia_line_join(stroke_props.line_join),
        ..Stroke::default()
    }
}

fn to_skia_transform(matrix: &[f64; 6]) -> Transform {
    Transform::from_row(
        matrix[0] as f32,
        matrix[1] as f32,
        matrix[2] as f32,
        matrix[3] as f32,
        matrix[4] as f32,
        matrix[5] as f32,
    )
}

/// Build a tiny-skia path. Returns `None` for paths with no drawable
/// segments.
fn to_skia_path(path: &Path) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    for el in path.expanded_elements() {
        match el {
            PathElement::MoveTo(x, y) => pb.move_to(x as f32, y as f32),
            PathElement::LineTo(x, y) => pb.line_to(x as f32, y as f32),
            PathElement::CurveTo(x1, y1, x2, y2, x, y) => pb.cubic_to(
                x1 as f32, y1 as f32, x2 as f32, y2 as f32, x as f32, y as f32,
            ),
            PathElement::ClosePath => pb.close(),
            // expanded_elements never yields arcs
            PathElement::Arc { .. } => {}
        }
    }
    pb.finish()
}

/// Transform mapping document space (Y-up, origin lower-left) onto a
/// `width` x `height` pixel surface (Y-down, origin top-left).
///
/// The scale is uniform: the smaller of the two axis ratios. A box with no
/// extent on an axis uses a ratio of 1 for that axis.
pub fn base_transform(width: u32, height: u32, bbox: &BoundingBox) -> [f64; 6] {
    let ratio = |pixels: u32, extent: i32| {
        if extent > 0 {
            pixels as f64 / extent as f64
        } else {
            1.0
        }
    };
    let s = ratio(width, bbox.width()).min(ratio(height, bbox.height()));
    [
        s,
        0.0,
        0.0,
        -s,
        -s * bbox.llx() as f64,
        s * bbox.ury() as f64,
    ]
}

/// Rasterizing device backed by an owned pixmap.
///
/// Clip masks live in device space, one per save level. Levels share a
/// mask until one of them clips again.
pub struct SkiaDevice {
    pixmap: Pixmap,
    base: Transform,
    clip_stack: Vec<Option<Rc<Mask>>>,
}

impl SkiaDevice {
    /// Create a device with a surface of `width` x `height` pixels, filled
    /// with `background`, mapping `bbox` onto it.
    pub fn new(width: u32, height: u32, bbox: &BoundingBox, background: Color) -> EpsResult<Self> {
        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            EpsError::rendering(format!("cannot allocate {}x{} surface", width, height))
        })?;
        pixmap.fill(background.to_skia());

        Ok(SkiaDevice {
            pixmap,
            base: to_skia_transform(&base_transform(width, height, bbox)),
            clip_stack: vec![None],
        })
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn into_pixmap(self) -> Pixmap {
        self.pixmap
    }

    fn current_clip(&self) -> Option<&Rc<Mask>> {
        self.clip_stack.last().and_then(Option::as_ref)
    }

    fn device_transform(&self, ctm: &[f64; 6]) -> Transform {
        self.base.pre_concat(to_skia_transform(ctm))
    }
}

impl Device for SkiaDevice {
    fn draw_path(
        &mut self,
        path: &Path,
        mode: PathDrawMode,
        color: Color,
        stroke_props: &StrokeProps,
        ctm: &[f64; 6],
    ) -> EpsResult<()> {
        let Some(sk_path) = to_skia_path(path) else {
            log::trace!("skipping empty path");
            return Ok(());
        };

        let sk_paint = to_skia_paint(color);
        let transform = self.device_transform(ctm);
        // Split borrows: the clip mask is read while the pixmap is written
        let clip = self.clip_stack.last().and_then(Option::as_deref);

        match mode {
            PathDrawMode::Fill => {
                self.pixmap
                    .fill_path(&sk_path, &sk_paint, FillRule::Winding, transform, clip);
            }
            PathDrawMode::Stroke => {
                let sk_stroke = to_skia_stroke(stroke_props);
                self.pixmap
                    .stroke_path(&sk_path, &sk_paint, &sk_stroke, transform, clip);
            }
        }

        Ok(())
    }

    fn clip_path(&mut self, path: &Path, ctm: &[f64; 6]) -> EpsResult<()> {
        let transform = self.device_transform(ctm);
        let (width, height) = (self.pixmap.width(), self.pixmap.height());
        let sk_path = to_skia_path(path);

        let slot = self
            .clip_stack
            .last_mut()
            .ok_or_else(|| EpsError::rendering("clip stack is empty"))?;

        let Some(sk_path) = sk_path else {
            // An empty clip path leaves nothing visible
            *slot = Some(Rc::new(
                Mask::new(width, height)
                    .ok_or_else(|| EpsError::rendering("cannot allocate clip mask"))?,
            ));
            return Ok(());
        };

        if let Some(mask) = slot.as_mut() {
            // Copies the mask only while an outer save level still holds it
            Rc::make_mut(mask).intersect_path(&sk_path, FillRule::Winding, true, transform);
        } else {
            let mut mask = Mask::new(width, height)
                .ok_or_else(|| EpsError::rendering("cannot allocate clip mask"))?;
            mask.fill_path(&sk_path, FillRule::Winding, true, transform);
            *slot = Some(Rc::new(mask));
        }

        Ok(())
    }

    fn save_state(&mut self) {
        let current = self.current_clip().cloned();
        self.clip_stack.push(current);
    }

    fn restore_state(&mut self) {
        if self.clip_stack.len() > 1 {
            self.clip_stack.pop();
        }
    }

    fn page_bounds(&self) -> (f64, f64) {
        (self.pixmap.width() as f64, self.pixmap.height() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::graphics_state::IDENTITY;

    fn pixel(device: &SkiaDevice, x: u32, y: u32) -> [u8; 4] {
        let p = device.pixmap().pixel(x, y).unwrap().demultiply();
        [p.red(), p.green(), p.blue(), p.alpha()]
    }

    fn square(x: f64, y: f64, size: f64) -> Path {
        let mut path = Path::new();
        path.rect(x, y, size, size);
        path
    }

    #[test]
    fn test_base_transform_flips_y() {
        let bbox = BoundingBox::new(10, 20, 110, 220).unwrap();
        let m = base_transform(50, 100, &bbox);
        assert_eq!(m, [0.5, 0.0, 0.0, -0.5, -5.0, 110.0]);
    }

    #[test]
    fn test_base_transform_degenerate_box() {
        let bbox = BoundingBox::new(0, 0, 0, 50).unwrap();
        let m = base_transform(100, 100, &bbox);
        assert_eq!(m[0], 1.0);
    }

    #[test]
    fn test_fill_lower_left_lands_bottom_left() {
        let bbox = BoundingBox::new(0, 0, 100, 100).unwrap();
        let mut device = SkiaDevice::new(100, 100, &bbox, Color::white()).unwrap();
        device
            .draw_path(
                &square(0.0, 0.0, 50.0),
                PathDrawMode::Fill,
                Color::black(),
                &StrokeProps::default(),
                &IDENTITY,
            )
            .unwrap();

        assert_eq!(pixel(&device, 25, 75), [0, 0, 0, 255]);
        assert_eq!(pixel(&device, 25, 25), [255, 255, 255, 255]);
    }

    #[test]
    fn test_clip_restricts_fill() {
        let bbox = BoundingBox::new(0, 0, 100, 100).unwrap();
        let mut device = SkiaDevice::new(100, 100, &bbox, Color::white()).unwrap();

        device.save_state();
        device.clip_path(&square(0.0, 0.0, 50.0), &IDENTITY).unwrap();
        device
            .draw_path(
                &square(0.0, 0.0, 100.0),
                PathDrawMode::Fill,
                Color::black(),
                &StrokeProps::default(),
                &IDENTITY,
            )
            .unwrap();
        assert_eq!(pixel(&device, 25, 75), [0, 0, 0, 255]);
        assert_eq!(pixel(&device, 75, 25), [255, 255, 255, 255]);

        device.restore_state();
        device
            .draw_path(
                &square(50.0, 50.0, 50.0),
                PathDrawMode::Fill,
                Color::rgb(1.0, 0.0, 0.0),
                &StrokeProps::default(),
                &IDENTITY,
            )
            .unwrap();
        assert_eq!(pixel(&device, 75, 25), [255, 0, 0, 255]);
    }

    #[test]
    fn test_nested_saves_share_clip_mask() {
        let bbox = BoundingBox::new(0, 0, 100, 100).unwrap();
        let mut device = SkiaDevice::new(100, 100, &bbox, Color::white()).unwrap();
        device.clip_path(&square(0.0, 0.0, 50.0), &IDENTITY).unwrap();

        for _ in 0..1000 {
            device.save_state();
        }

        assert_eq!(device.clip_stack.len(), 1001);
        let outer = device.clip_stack[0].as_ref().unwrap();
        let inner = device.clip_stack[1000].as_ref().unwrap();
        assert!(Rc::ptr_eq(outer, inner));
        assert_eq!(Rc::strong_count(outer), 1001);
    }

    #[test]
    fn test_inner_clip_leaves_outer_clip_intact() {
        let bbox = BoundingBox::new(0, 0, 100, 100).unwrap();
        let mut device = SkiaDevice::new(100, 100, &bbox, Color::white()).unwrap();
        device.clip_path(&square(0.0, 0.0, 50.0), &IDENTITY).unwrap();

        device.save_state();
        device.clip_path(&square(0.0, 0.0, 25.0), &IDENTITY).unwrap();
        assert!(!Rc::ptr_eq(
            device.clip_stack[0].as_ref().unwrap(),
            device.clip_stack[1].as_ref().unwrap()
        ));
        device.restore_state();

        device
            .draw_path(
                &square(0.0, 0.0, 100.0),
                PathDrawMode::Fill,
                Color::black(),
                &StrokeProps::default(),
                &IDENTITY,
            )
            .unwrap();

        // (40, 60) is inside the outer clip but outside the inner one
        assert_eq!(pixel(&device, 40, 60), [0, 0, 0, 255]);
        assert_eq!(pixel(&device, 75, 25), [255, 255, 255, 255]);
    }

    #[test]
    fn test_empty_path_is_ignored() {
        let bbox = BoundingBox::default();
        let mut device = SkiaDevice::new(100, 100, &bbox, Color::white()).unwrap();
        let result = device.draw_path(
            &Path::new(),
            PathDrawMode::Stroke,
            Color::black(),
            &StrokeProps::default(),
            &IDENTITY,
        );
        assert!(result.is_ok());
        assert_eq!(device.page_bounds(), (100.0, 100.0));
    }
}
