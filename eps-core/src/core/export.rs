//! Writing documents to PNG, JPEG and PDF files.
//!
//! Raster formats go through the render tier chain, so an export always
//! produces a file unless the write itself fails. PDF needs the native
//! engine.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rustc_hash::FxHashSet;

use super::error::{EpsError, EpsResult};
use super::renderer::{EpsRenderer, RenderOptions, Rendered};

/// JPEG quality used for exports.
pub const JPEG_QUALITY: u8 = 90;

/// Target file format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg,
    Pdf,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Png, ExportFormat::Jpeg, ExportFormat::Pdf];

    /// File extension written for this format, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpeg => "image/jpeg",
            ExportFormat::Pdf => "application/pdf",
        }
    }

    /// Format for an extension, ignoring case. Accepts both `jpg` and `jpeg`.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "png" => Some(ExportFormat::Png),
            "jpg" | "jpeg" => Some(ExportFormat::Jpeg),
            "pdf" => Some(ExportFormat::Pdf),
            _ => None,
        }
    }

    /// Format implied by the extension of `path`.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn is_raster(&self) -> bool {
        !matches!(self, ExportFormat::Pdf)
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s.trim().trim_start_matches('.'))
            .ok_or_else(|| format!("unknown export format '{}' (expected png, jpg or pdf)", s))
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.extension().to_ascii_uppercase())
    }
}

/// Outcome of a batch export.
#[derive(Debug, Default)]
pub struct BatchExport {
    /// Files written, in input order
    pub exported: Vec<PathBuf>,
    /// Inputs that could not be exported
    pub failed: Vec<(PathBuf, EpsError)>,
}

impl BatchExport {
    pub fn success_count(&self) -> usize {
        self.exported.len()
    }
}

impl EpsRenderer {
    /// Write `data` to `output` in `format`.
    ///
    /// Returns the render for raster formats and `None` for PDF.
    pub fn export(
        &self,
        data: &[u8],
        output: &Path,
        format: ExportFormat,
        options: &RenderOptions,
    ) -> EpsResult<Option<Rendered>> {
        log::debug!("exporting {} to {}", format, output.display());
        match format {
            ExportFormat::Pdf => {
                if self.convert_to_document(data, output) {
                    Ok(None)
                } else {
                    Err(EpsError::native(format!(
                        "cannot convert to PDF at {}",
                        output.display()
                    )))
                }
            }
            ExportFormat::Png | ExportFormat::Jpeg => {
                let rendered = self.render_bytes(data, options);
                if format == ExportFormat::Png {
                    rendered.image.save_png(output)?;
                } else {
                    rendered.image.save_jpeg(output, JPEG_QUALITY)?;
                }
                Ok(Some(rendered))
            }
        }
    }

    /// Export every file in `inputs` into `output_dir`, named after the
    /// input's file stem with the format's extension.
    ///
    /// A failing input is recorded and the batch carries on. Inputs sharing
    /// a stem get a numeric suffix so no output overwrites another. Only a
    /// missing or uncreatable output directory fails the whole call.
    pub fn batch_export<P: AsRef<Path>>(
        &self,
        inputs: &[P],
        output_dir: &Path,
        format: ExportFormat,
        options: &RenderOptions,
    ) -> EpsResult<BatchExport> {
        fs::create_dir_all(output_dir)?;

        let mut report = BatchExport::default();
        let mut taken: FxHashSet<PathBuf> = FxHashSet::default();

        for input in inputs {
            let input = input.as_ref();
            let output = unique_output(output_dir, input, format, &mut taken);
            let result = fs::read(input)
                .map_err(EpsError::from)
                .and_then(|data| self.export(&data, &output, format, options));

            match result {
                Ok(_) => report.exported.push(output),
                Err(e) => {
                    log::warn!("failed to export {}: {}", input.display(), e);
                    report.failed.push((input.to_path_buf(), e));
                }
            }
        }

        log::info!(
            "batch export: {} of {} written to {}",
            report.success_count(),
            inputs.len(),
            output_dir.display()
        );
        Ok(report)
    }
}

fn unique_output(
    output_dir: &Path,
    input: &Path,
    format: ExportFormat,
    taken: &mut FxHashSet<PathBuf>,
) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("export");

    let mut candidate = output_dir.join(format!("{}.{}", stem, format.extension()));
    let mut n = 1;
    while !taken.insert(candidate.clone()) {
        candidate = output_dir.join(format!("{}-{}.{}", stem, n, format.extension()));
        n += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension() {
        assert_eq!(ExportFormat::from_extension("PNG"), Some(ExportFormat::Png));
        assert_eq!(ExportFormat::from_extension("jpeg"), Some(ExportFormat::Jpeg));
        assert_eq!(ExportFormat::from_extension("Jpg"), Some(ExportFormat::Jpeg));
        assert_eq!(ExportFormat::from_extension("pdf"), Some(ExportFormat::Pdf));
        assert_eq!(ExportFormat::from_extension("tiff"), None);
    }

    #[test]
    fn test_from_path() {
        assert_eq!(ExportFormat::from_path(Path::new("out/a.JPG")), Some(ExportFormat::Jpeg));
        assert_eq!(ExportFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(".jpg".parse::<ExportFormat>(), Ok(ExportFormat::Jpeg));
        assert!("gif".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::Jpeg.to_string(), "JPG");
        for format in ExportFormat::ALL {
            assert_eq!(format.extension().parse::<ExportFormat>(), Ok(format));
        }
    }

    #[test]
    fn test_unique_output_suffixes_repeated_stems() {
        let mut taken = FxHashSet::default();
        let dir = Path::new("out");
        let a = unique_output(dir, Path::new("a/fig.eps"), ExportFormat::Png, &mut taken);
        let b = unique_output(dir, Path::new("b/fig.eps"), ExportFormat::Png, &mut taken);
        let c = unique_output(dir, Path::new(""), ExportFormat::Pdf, &mut taken);

        assert_eq!(a, dir.join("fig.png"));
        assert_eq!(b, dir.join("fig-1.png"));
        assert_eq!(c, dir.join("export.pdf"));
    }
}
