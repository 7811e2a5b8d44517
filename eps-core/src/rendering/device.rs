//! Device trait for rendering backend abstraction.
//!
//! The interpreter builds paths in user space and hands them to a device
//! together with the transform in effect at paint time. This keeps operator
//! interpretation independent of the rasterizer, so tests can swap in a
//! recording device.

use super::graphics_state::{Color, StrokeProps};
use super::path::Path;
use crate::core::error::EpsResult;

/// How to draw a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathDrawMode {
    /// Fill the path (nonzero winding)
    Fill,
    /// Stroke the path outline
    Stroke,
}

/// A device that can render PostScript drawing operations.
pub trait Device {
    /// Paint `path`, whose coordinates are in user space, under `ctm`.
    fn draw_path(
        &mut self,
        path: &Path,
        mode: PathDrawMode,
        color: Color,
        stroke_props: &StrokeProps,
        ctm: &[f64; 6],
    ) -> EpsResult<()>;

    /// Intersect the clip region with `path` under `ctm`.
    fn clip_path(&mut self, path: &Path, ctm: &[f64; 6]) -> EpsResult<()>;

    /// Save the device state (clip region).
    fn save_state(&mut self);

    /// Restore the device state. Unbalanced restores are ignored.
    fn restore_state(&mut self);

    /// Get the output size in device units.
    fn page_bounds(&self) -> (f64, f64);
}

/// A device that records drawing operations instead of producing pixels.
#[derive(Debug, Default)]
pub struct TestDevice {
    page_width: f64,
    page_height: f64,
    depth: usize,
    operations: Vec<String>,
}

impl TestDevice {
    /// Create a new test device with the given page dimensions.
    pub fn new(width: f64, height: f64) -> Self {
        TestDevice {
            page_width: width,
            page_height: height,
            depth: 0,
            operations: Vec::new(),
        }
    }

    /// Get the recorded operations.
    pub fn operations(&self) -> &[String] {
        &self.operations
    }

    /// Current save depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Clear the recorded operations.
    pub fn clear_operations(&mut self) {
        self.operations.clear();
    }
}

impl Device for TestDevice {
    fn draw_path(
        &mut self,
        path: &Path,
        mode: PathDrawMode,
        color: Color,
        stroke_props: &StrokeProps,
        ctm: &[f64; 6],
    ) -> EpsResult<()> {
        match mode {
            PathDrawMode::Fill => {
                self.operations
                    .push(format!("fill({} {}, {:?})", color, path, ctm));
            }
            PathDrawMode::Stroke => {
                self.operations.push(format!(
                    "stroke({} w={} {}, {:?})",
                    color, stroke_props.line_width, path, ctm
                ));
            }
        }
        Ok(())
    }

    fn clip_path(&mut self, path: &Path, ctm: &[f64; 6]) -> EpsResult<()> {
        self.operations.push(format!("clip({}, {:?})", path, ctm));
        Ok(())
    }

    fn save_state(&mut self) {
        self.depth += 1;
        self.operations.push("save_state".to_string());
    }

    fn restore_state(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.operations.push("restore_state".to_string());
    }

    fn page_bounds(&self) -> (f64, f64) {
        (self.page_width, self.page_height)
    }
}
