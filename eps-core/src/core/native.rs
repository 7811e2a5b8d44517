//! Optional native PostScript engine.
//!
//! A full interpreter installed on the host can rasterize documents the
//! built-in interpreter cannot. Its absence is a normal condition: every
//! operation reports failure and the renderer falls through to the next tier.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::OnceLock;

use super::error::{EpsError, EpsResult};
use super::prescan::{PrescanOptions, prescan};
use crate::rendering::RasterImage;

/// Lowest and highest resolution requested from a native engine.
pub const MIN_DPI: u32 = 72;
pub const MAX_DPI: u32 = 600;

/// Resolution for a render scale: `72 * scale`, clamped to 72..=600.
pub fn dpi_for_scale(scale: f64) -> u32 {
    let dpi = 72.0 * scale;
    if !dpi.is_finite() {
        return MIN_DPI;
    }
    (dpi as i64).clamp(MIN_DPI as i64, MAX_DPI as i64) as u32
}

/// Clamp an explicit resolution to the supported range.
pub fn clamp_dpi(dpi: u32) -> u32 {
    dpi.clamp(MIN_DPI, MAX_DPI)
}

/// Contract for an external PostScript interpreter.
///
/// Methods return `false`/`None` on any failure; callers treat that the
/// same as the engine being absent.
pub trait NativeEngine: Send + Sync {
    fn is_available(&self) -> bool;

    /// Rasterize `input` to a PNG at `output`.
    fn render_to_raster(&self, input: &Path, output: &Path, dpi: u32) -> bool;

    /// Convert `input` to a PDF at `output`.
    fn convert_to_document_format(&self, input: &Path, output: &Path) -> bool;

    /// Measure the drawn extent of `input` as `(llx, lly, urx, ury)`.
    fn bounding_box(&self, input: &Path) -> Option<(i32, i32, i32, i32)>;
}

/// Engine used when none is installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNativeEngine;

impl NativeEngine for NoNativeEngine {
    fn is_available(&self) -> bool {
        false
    }

    fn render_to_raster(&self, _input: &Path, _output: &Path, _dpi: u32) -> bool {
        false
    }

    fn convert_to_document_format(&self, _input: &Path, _output: &Path) -> bool {
        false
    }

    fn bounding_box(&self, _input: &Path) -> Option<(i32, i32, i32, i32)> {
        None
    }
}

/// Engine driving the Ghostscript command-line executable.
#[derive(Debug)]
pub struct GhostscriptEngine {
    executable: PathBuf,
    available: OnceLock<bool>,
}

impl GhostscriptEngine {
    /// Environment variable naming the executable.
    pub const ENV_VAR: &'static str = "EPS_GHOSTSCRIPT";

    pub fn new(executable: impl Into<PathBuf>) -> Self {
        GhostscriptEngine {
            executable: executable.into(),
            available: OnceLock::new(),
        }
    }

    /// Use `$EPS_GHOSTSCRIPT`, or `gs` from the search path.
    pub fn from_env() -> Self {
        let executable = std::env::var_os(Self::ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("gs"));
        Self::new(executable)
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Version string reported by the executable.
    pub fn version(&self) -> Option<String> {
        let output = self.run(&["--version"]).ok()?;
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        (!version.is_empty()).then_some(version)
    }

    fn run<S: AsRef<std::ffi::OsStr>>(&self, args: &[S]) -> EpsResult<Output> {
        let output = Command::new(&self.executable)
            .args(args)
            .output()
            .map_err(|e| {
                EpsError::native(format!(
                    "failed to execute {}: {}",
                    self.executable.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EpsError::native(format!(
                "{} exited with {}: {}",
                self.executable.display(),
                output.status,
                stderr.trim()
            )));
        }
        Ok(output)
    }

    fn run_device(&self, device: &str, extra: &[String], input: &Path) -> EpsResult<Output> {
        let mut args: Vec<std::ffi::OsString> = vec![
            "-dSAFER".into(),
            "-dBATCH".into(),
            "-dNOPAUSE".into(),
            "-dQUIET".into(),
            format!("-sDEVICE={}", device).into(),
        ];
        args.extend(extra.iter().map(Into::into));
        args.push(input.as_os_str().to_owned());
        self.run(args.as_slice())
    }
}

impl Default for GhostscriptEngine {
    fn default() -> Self {
        Self::from_env()
    }
}

impl NativeEngine for GhostscriptEngine {
    fn is_available(&self) -> bool {
        *self.available.get_or_init(|| match self.version() {
            Some(version) => {
                log::info!("Ghostscript {} found at {}", version, self.executable.display());
                true
            }
            None => {
                log::debug!("Ghostscript not available at {}", self.executable.display());
                false
            }
        })
    }

    fn render_to_raster(&self, input: &Path, output: &Path, dpi: u32) -> bool {
        let extra = [
            "-dEPSCrop".to_string(),
            "-dTextAlphaBits=4".to_string(),
            "-dGraphicsAlphaBits=4".to_string(),
            format!("-r{}", clamp_dpi(dpi)),
            "-o".to_string(),
            output.display().to_string(),
        ];
        match self.run_device("png16m", &extra, input) {
            Ok(_) => true,
            Err(e) => {
                log::warn!("Ghostscript rasterization failed: {}", e);
                false
            }
        }
    }

    fn convert_to_document_format(&self, input: &Path, output: &Path) -> bool {
        let extra = [
            "-dEPSCrop".to_string(),
            "-o".to_string(),
            output.display().to_string(),
        ];
        match self.run_device("pdfwrite", &extra, input) {
            Ok(_) => true,
            Err(e) => {
                log::warn!("Ghostscript conversion failed: {}", e);
                false
            }
        }
    }

    fn bounding_box(&self, input: &Path) -> Option<(i32, i32, i32, i32)> {
        let output = match self.run_device("bbox", &[], input) {
            Ok(output) => output,
            Err(e) => {
                log::warn!("Ghostscript bounding box failed: {}", e);
                return None;
            }
        };
        // The bbox device reports on stderr
        let scan = prescan(&output.stderr, &PrescanOptions::default());
        scan.bounding_box_found
            .then(|| scan.bounding_box.as_tuple())
    }
}

/// Scratch file holding `data`, deleted when dropped.
pub(crate) fn scratch_file(data: &[u8], suffix: &str) -> EpsResult<tempfile::NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("eps_render_")
        .suffix(suffix)
        .tempfile()?;
    file.write_all(data)?;
    file.flush()?;
    Ok(file)
}

/// Rasterize `document` through `engine` at `dpi`.
///
/// Both scratch files are removed on every exit path.
pub fn rasterize(engine: &dyn NativeEngine, document: &[u8], dpi: u32) -> EpsResult<RasterImage> {
    let input = scratch_file(document, ".eps")?;
    let output = scratch_file(&[], ".png")?;

    if !engine.render_to_raster(input.path(), output.path(), clamp_dpi(dpi)) {
        return Err(EpsError::native("engine reported failure"));
    }
    if std::fs::metadata(output.path())?.len() == 0 {
        return Err(EpsError::native("engine produced no output"));
    }

    let decoded = image::open(output.path())?.to_rgba8();
    log::info!(
        "native engine rendered {}x{} at {} dpi",
        decoded.width(),
        decoded.height(),
        dpi
    );
    Ok(RasterImage::from_rgba_image(decoded))
}
