//! Rendering layer.
//!
//! Interprets the supported PostScript subset against a [`Device`]:
//! - graphics state and path construction
//! - a tiny-skia backed raster device
//! - placeholder and error images for documents that cannot be drawn

pub mod context;
pub mod device;
pub mod graphics_state;
pub mod path;
pub mod placeholder;
pub mod raster;
pub mod skia_device;

// Re-export key types
pub use context::{Interpretation, RenderingContext, interpret};
pub use device::{Device, PathDrawMode, TestDevice};
pub use graphics_state::{Color, GraphicsState, IDENTITY, LineCap, LineJoin, StrokeProps};
pub use path::{Path, PathElement};
pub use raster::RasterImage;
pub use skia_device::SkiaDevice;
