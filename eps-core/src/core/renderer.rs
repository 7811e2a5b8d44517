//! Render orchestration.
//!
//! A document is rendered by trying a fixed sequence of tiers, each of which
//! either produces an image or declines:
//!
//! 1. the built-in interpreter,
//! 2. the native engine, when one is installed,
//! 3. embedded raster recovery, for image-based content,
//! 4. an informational placeholder,
//! 5. the error image, which cannot fail.
//!
//! The first image produced wins. [`EpsRenderer::render`] therefore always
//! returns an image and never panics on malformed input.

use std::fmt;
use std::io::Read;
use std::path::Path;

use image::imageops::{self, FilterType};

use super::embedded_raster::{extract_embedded_raster, is_image_based};
use super::error::{EpsError, EpsResult};
use super::native::{self, GhostscriptEngine, NativeEngine, NoNativeEngine, clamp_dpi, dpi_for_scale};
use super::prescan::{BoundingBox, PrescanOptions, postscript_section, prescan};
use crate::rendering::placeholder::{self, Creator, count_drawing_commands};
use crate::rendering::{Color, RasterImage, interpret};

/// Smallest edge of any rendered image, in pixels.
pub const MIN_DIMENSION: u32 = 100;

/// Largest edge of any rendered image, in pixels.
pub const MAX_DIMENSION: u32 = 16_384;

/// Options for a single render call.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    /// Pixels per point. Negative or non-finite values mean 1.0.
    pub scale: f64,
    /// Explicit resolution; overrides `scale` with `dpi / 72`.
    pub dpi: Option<u32>,
    pub background: Color,
    pub prescan: PrescanOptions,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            scale: 1.0,
            dpi: None,
            background: Color::white(),
            prescan: PrescanOptions::default(),
        }
    }
}

impl RenderOptions {
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = Some(dpi);
        self
    }

    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    pub fn with_prescan(mut self, prescan: PrescanOptions) -> Self {
        self.prescan = prescan;
        self
    }

    /// Scale actually used for sizing the output.
    pub fn effective_scale(&self) -> f64 {
        if let Some(dpi) = self.dpi {
            return dpi as f64 / 72.0;
        }
        if self.scale.is_finite() && self.scale >= 0.0 {
            self.scale
        } else {
            1.0
        }
    }

    /// Resolution requested from a native engine.
    pub fn native_dpi(&self) -> u32 {
        match self.dpi {
            Some(dpi) => clamp_dpi(dpi),
            None => dpi_for_scale(self.effective_scale()),
        }
    }
}

/// Output size for `bbox` at `scale`: each edge is the truncated scaled
/// extent, at least [`MIN_DIMENSION`] and at most [`MAX_DIMENSION`].
pub fn target_dimensions(bbox: &BoundingBox, scale: f64) -> (u32, u32) {
    let edge = |extent: i32| {
        let scaled = (extent as f64 * scale).trunc();
        if scaled.is_finite() {
            (scaled as i64).clamp(MIN_DIMENSION as i64, MAX_DIMENSION as i64) as u32
        } else {
            MIN_DIMENSION
        }
    };
    (edge(bbox.width()), edge(bbox.height()))
}

/// Which tier produced an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTier {
    Interpreter,
    NativeEngine,
    EmbeddedRaster,
    Placeholder,
    Error,
}

impl RenderTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderTier::Interpreter => "interpreter",
            RenderTier::NativeEngine => "native engine",
            RenderTier::EmbeddedRaster => "embedded raster",
            RenderTier::Placeholder => "placeholder",
            RenderTier::Error => "error",
        }
    }
}

impl fmt::Display for RenderTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a render call.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub image: RasterImage,
    pub tier: RenderTier,
    /// Bounding box the image was sized from
    pub bounding_box: BoundingBox,
}

/// Renders EPS documents to raster images.
///
/// Holds no per-call state, so one renderer can serve many threads.
pub struct EpsRenderer {
    native: Box<dyn NativeEngine>,
}

impl Default for EpsRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EpsRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EpsRenderer")
            .field("native_available", &self.native.is_available())
            .finish()
    }
}

impl EpsRenderer {
    /// Renderer without a native engine.
    pub fn new() -> Self {
        Self::with_native_engine(NoNativeEngine)
    }

    pub fn with_native_engine(engine: impl NativeEngine + 'static) -> Self {
        EpsRenderer {
            native: Box::new(engine),
        }
    }

    /// Renderer backed by Ghostscript, located via [`GhostscriptEngine::from_env`].
    pub fn with_ghostscript() -> Self {
        Self::with_native_engine(GhostscriptEngine::from_env())
    }

    pub fn native_engine(&self) -> &dyn NativeEngine {
        self.native.as_ref()
    }

    /// Read `reader` to the end and render it.
    pub fn render<R: Read>(&self, mut reader: R, options: &RenderOptions) -> Rendered {
        let mut data = Vec::new();
        match reader.read_to_end(&mut data) {
            Ok(_) => self.render_bytes(&data, options),
            Err(e) => self.failed(EpsError::Io(e), options),
        }
    }

    /// Render an in-memory document.
    pub fn render_bytes(&self, data: &[u8], options: &RenderOptions) -> Rendered {
        if data.is_empty() {
            return self.failed(EpsError::EmptyDocument, options);
        }

        let scan = prescan(data, &options.prescan);
        if !scan.is_valid {
            log::warn!("document lacks an EPS signature, rendering anyway");
        }
        let bbox = scan.bounding_box;
        let section = match postscript_section(data) {
            Ok(section) => section,
            Err(e) => {
                log::warn!("{}", e);
                data
            }
        };
        let text = String::from_utf8_lossy(section);

        let (width, height) = target_dimensions(&bbox, options.effective_scale());
        log::debug!(
            "rendering {}x{} from bounding box {} (scale {})",
            width,
            height,
            bbox,
            options.effective_scale()
        );

        let image_based = is_image_based(&text);
        let ctx = TierInput {
            text: &text,
            document: data,
            bbox: &bbox,
            width,
            height,
            options,
        };

        let (image, tier) = interpreter_tier(&ctx)
            .map(|img| (img, RenderTier::Interpreter))
            .or_else(|| self.native_tier(&ctx).map(|img| (img, RenderTier::NativeEngine)))
            .or_else(|| {
                image_based
                    .then(|| extract_embedded_raster(&text, &bbox, width, height))
                    .flatten()
                    .map(|img| (img, RenderTier::EmbeddedRaster))
            })
            .or_else(|| placeholder_tier(&ctx, image_based).map(|img| (img, RenderTier::Placeholder)))
            .unwrap_or_else(|| (placeholder::error_image(width, height), RenderTier::Error));

        log::info!("rendered {}x{} via {}", image.width(), image.height(), tier);
        Rendered {
            image,
            tier,
            bounding_box: bbox,
        }
    }

    /// Convert a document to PDF at `output` through the native engine.
    ///
    /// Returns `false` when no engine is available or conversion fails.
    pub fn convert_to_document(&self, data: &[u8], output: &Path) -> bool {
        if !self.native.is_available() {
            log::warn!("no native engine available for document conversion");
            return false;
        }
        let input = match native::scratch_file(data, ".eps") {
            Ok(file) => file,
            Err(e) => {
                log::error!("cannot stage document for conversion: {}", e);
                return false;
            }
        };
        let converted = self.native.convert_to_document_format(input.path(), output);
        if converted {
            log::info!("converted document to {}", output.display());
        }
        converted
    }

    /// Bounding box measured by the native engine, if one is available.
    pub fn native_bounding_box(&self, data: &[u8]) -> Option<BoundingBox> {
        if !self.native.is_available() {
            return None;
        }
        let input = native::scratch_file(data, ".eps")
            .map_err(|e| log::error!("cannot stage document for measuring: {}", e))
            .ok()?;
        let (llx, lly, urx, ury) = self.native.bounding_box(input.path())?;
        BoundingBox::new(llx, lly, urx, ury)
            .map_err(|e| log::warn!("native engine reported {}", e))
            .ok()
    }

    fn native_tier(&self, ctx: &TierInput<'_>) -> Option<RasterImage> {
        if !self.native.is_available() {
            return None;
        }
        match native::rasterize(self.native.as_ref(), ctx.document, ctx.options.native_dpi()) {
            Ok(image) => Some(fit(image, ctx.width, ctx.height)),
            Err(e) => {
                log::warn!("native engine tier failed: {}", e);
                None
            }
        }
    }

    fn failed(&self, error: EpsError, options: &RenderOptions) -> Rendered {
        log::error!("error rendering EPS: {}", error);
        let bbox = BoundingBox::default();
        let (width, height) = target_dimensions(&bbox, options.effective_scale());
        Rendered {
            image: placeholder::error_image(width, height),
            tier: RenderTier::Error,
            bounding_box: bbox,
        }
    }
}

/// Everything a tier needs about the current call.
struct TierInput<'a> {
    text: &'a str,
    document: &'a [u8],
    bbox: &'a BoundingBox,
    width: u32,
    height: u32,
    options: &'a RenderOptions,
}

fn interpreter_tier(ctx: &TierInput<'_>) -> Option<RasterImage> {
    match interpret(
        ctx.text,
        ctx.width,
        ctx.height,
        ctx.bbox,
        ctx.options.background,
    ) {
        Ok(result) if result.is_usable() => Some(result.image),
        Ok(_) => {
            log::debug!("interpreter painted nothing");
            None
        }
        Err(e) => {
            log::warn!("interpreter tier failed: {}", e);
            None
        }
    }
}

fn placeholder_tier(ctx: &TierInput<'_>, image_based: bool) -> Option<RasterImage> {
    let result: EpsResult<RasterImage> = if image_based {
        placeholder::image_based_placeholder(
            ctx.width,
            ctx.height,
            ctx.bbox,
            Creator::detect(ctx.text),
            ctx.text.lines().count(),
            ctx.options.background,
        )
    } else {
        placeholder::vector_placeholder(
            ctx.width,
            ctx.height,
            ctx.bbox,
            count_drawing_commands(ctx.text),
            ctx.options.background,
        )
    };
    result
        .map_err(|e| log::warn!("placeholder tier failed: {}", e))
        .ok()
}

/// Scale `image` to exactly `width` x `height`.
fn fit(image: RasterImage, width: u32, height: u32) -> RasterImage {
    if (image.width(), image.height()) == (width, height) {
        return image;
    }
    let scaled = imageops::resize(&image.to_rgba_image(), width, height, FilterType::Triangle);
    RasterImage::from_rgba_image(scaled)
}
