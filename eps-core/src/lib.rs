//! # eps-core: Encapsulated PostScript rendering for Rust
//!
//! eps-core turns EPS documents into raster images. It prescans the Document
//! Structuring Convention comments for the bounding box and metadata, runs a
//! small PostScript subset interpreter over the body, and falls back through
//! progressively simpler strategies so that a render call always produces an
//! image.
//!
//! ## Quick Start
//!
//! ```rust
//! use eps_core::{EpsRenderer, RenderOptions, RenderTier};
//!
//! let eps = b"%!PS-Adobe-3.0 EPSF-3.0\n\
//!             %%BoundingBox: 0 0 200 200\n\
//!             0 0 1 setrgbcolor\n\
//!             50 50 100 100 rectfill\n\
//!             showpage\n";
//!
//! let renderer = EpsRenderer::new();
//! let rendered = renderer.render_bytes(eps, &RenderOptions::default());
//!
//! assert_eq!(rendered.tier, RenderTier::Interpreter);
//! assert_eq!(rendered.image.width(), 200);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Prescan
//!
//! The header comments can be read without rendering:
//!
//! ```rust
//! use eps_core::{BoundingBox, MetadataKey, PrescanOptions, prescan};
//!
//! let eps = b"%!PS-Adobe-3.0 EPSF-3.0\n%%Title: logo\n%%BoundingBox: 10 20 110 70\n";
//! let scan = prescan(eps, &PrescanOptions::default());
//!
//! assert!(scan.is_valid);
//! assert_eq!(scan.bounding_box, BoundingBox::new(10, 20, 110, 70)?);
//! assert_eq!(scan.metadata.get(MetadataKey::Title), Some("logo"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! 1. **Prescan**: header comments, binary EPS headers, signature check
//! 2. **Interpreter**: tokenizer, operand stack and graphics state driving a [`Device`]
//! 3. **Fallbacks**: native engine, embedded raster recovery, placeholders
//! 4. **Export**: PNG, JPEG or PDF output, one file or a batch
//!
//! ## CLI Tool
//!
//! ```bash
//! cargo run --bin eps-inspect figure.eps --render figure.png
//! cargo run --bin eps-inspect a.eps b.eps --export-dir out --format jpg
//! ```

pub mod core;
pub mod rendering;

// Re-export main types for convenience
pub use core::{
    BatchExport, BoundingBox, DocumentMetadata, EpsError, EpsRenderer, EpsResult, ExportFormat,
    GhostscriptEngine, MetadataKey, NativeEngine, NoNativeEngine, PrescanOptions, PrescanResult,
    RenderOptions, RenderTier, Rendered, is_valid_eps, prescan, prescan_reader,
};

// Re-export rendering types
pub use rendering::{
    Color, Device, GraphicsState, Interpretation, Path, PathDrawMode, RasterImage,
    RenderingContext, SkiaDevice, interpret,
};
