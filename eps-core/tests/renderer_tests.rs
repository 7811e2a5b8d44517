//! End-to-end tests of the render tier chain.


use std::io::{self, Read};
use std::path::Path;

use eps_core::{
    BoundingBox, Color, EpsRenderer, NativeEngine, RasterImage, RenderOptions, RenderTier,
};
use test_utils::*;

/// Engine that "renders" every document as a solid green PNG.
struct FakeEngine;

const GREEN: [u8; 4] = [0, 255, 0, 255];

impl NativeEngine for FakeEngine {
    fn is_available(&self) -> bool {
        true
    }

    fn render_to_raster(&self, input: &Path, output: &Path, dpi: u32) -> bool {
        assert!(input.exists());
        assert!((72..=600).contains(&dpi));
        RasterImage::filled(50, 50, Color::rgb(0.0, 1.0, 0.0))
            .save_png(output)
            .is_ok()
    }

    fn convert_to_document_format(&self, input: &Path, output: &Path) -> bool {
        std::fs::copy(input, output).is_ok()
    }

    fn bounding_box(&self, _input: &Path) -> Option<(i32, i32, i32, i32)> {
        Some((1, 2, 30, 40))
    }
}

struct FailingReader;

impl Read for FailingReader {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::other("disk on fire"))
    }
}

fn render(renderer: &EpsRenderer, document: &str) -> eps_core::Rendered {
    renderer.render_bytes(document.as_bytes(), &RenderOptions::default())
}

#[test]
fn test_vector_document_uses_interpreter() {
    let doc = eps_document((0, 0, 200, 100), "0 setgray 0 0 100 100 rectfill");
    let rendered = render(&EpsRenderer::new(), &doc);

    assert_eq!(rendered.tier, RenderTier::Interpreter);
    assert_eq!((rendered.image.width(), rendered.image.height()), (200, 100));
    assert_eq!(rendered.bounding_box, BoundingBox::new(0, 0, 200, 100).unwrap());
    assert_pixel(&rendered.image, 50, 50, BLACK);
    assert_pixel(&rendered.image, 150, 50, WHITE);
}

#[test]
fn test_scale_sizes_output() {
    let doc = eps_document((0, 0, 150, 120), "0 setgray 0 0 150 120 rectfill");
    let options = RenderOptions::default().with_scale(2.0);
    let rendered = EpsRenderer::new().render_bytes(doc.as_bytes(), &options);

    assert_eq!((rendered.image.width(), rendered.image.height()), (300, 240));
    assert_pixel(&rendered.image, 299, 239, BLACK);
}

#[test]
fn test_small_box_is_raised_to_minimum() {
    let doc = eps_document((0, 0, 20, 10), "0 setgray 0 0 20 10 rectfill");
    let rendered = render(&EpsRenderer::new(), &doc);
    assert_eq!((rendered.image.width(), rendered.image.height()), (100, 100));
}

#[test]
fn test_background_color() {
    let doc = eps_document((0, 0, 100, 100), "0 setgray 40 40 20 20 rectfill");
    let options = RenderOptions::default().with_background(Color::rgb(1.0, 0.0, 0.0));
    let rendered = EpsRenderer::new().render_bytes(doc.as_bytes(), &options);

    assert_pixel(&rendered.image, 50, 50, BLACK);
    assert_pixel(&rendered.image, 2, 2, RED);
}

#[test]
fn test_missing_bounding_box_uses_letter() {
    let doc = "%!PS-Adobe-3.0 EPSF-3.0\n0 setgray 0 0 10 10 rectfill\n";
    let rendered = render(&EpsRenderer::new(), doc);
    assert_eq!(rendered.bounding_box, BoundingBox::default());
    assert_eq!((rendered.image.width(), rendered.image.height()), (612, 792));
}

#[test]
fn test_image_keyword_in_comments_does_not_skip_interpreter() {
    let doc = "%!PS-Adobe-3.0 EPSF-3.0\n%%Title: company-image.eps\n%%BoundingBox: 0 0 100 100\n\
               % draws no colorimage, just a square\n0 0 100 100 rectfill\n";
    let rendered = render(&EpsRenderer::new(), doc);

    assert_eq!(rendered.tier, RenderTier::Interpreter);
    assert_pixel(&rendered.image, 50, 50, BLACK);
}

#[test]
fn test_extreme_arc_angles_still_render() {
    let bodies = [
        "50 50 10 0 1e20 arc stroke",
        "0 0 10 0 1e9 arc fill",
        "50 50 20 1e300 -1e300 arcn fill",
        "50 50 20 0 0 arc stroke",
        "50 50 0 0 360 arc fill",
    ];
    for body in bodies {
        let doc = eps_document((0, 0, 100, 100), &format!("0 setgray {}", body));
        let rendered = render(&EpsRenderer::new(), &doc);
        assert_eq!((rendered.image.width(), rendered.image.height()), (100, 100), "{}", body);
        assert_ne!(rendered.tier, RenderTier::Error, "{}", body);
    }
}

#[test]
fn test_huge_sweep_fills_one_circle() {
    let doc = eps_document((0, 0, 100, 100), "0 setgray 50 50 40 0 1e20 arc fill");
    let rendered = render(&EpsRenderer::new(), &doc);

    assert_eq!(rendered.tier, RenderTier::Interpreter);
    assert_pixel(&rendered.image, 50, 50, BLACK);
    assert_pixel(&rendered.image, 2, 2, WHITE);
}

#[test]
fn test_no_drawing_falls_back_to_placeholder() {
    let doc = eps_document((0, 0, 300, 200), "% nothing to draw\n/x 1 def");
    let rendered = render(&EpsRenderer::new(), &doc);

    assert_eq!(rendered.tier, RenderTier::Placeholder);
    assert_eq!((rendered.image.width(), rendered.image.height()), (300, 200));
}

#[test]
fn test_image_based_document_is_extracted() {
    let doc = image_document(4, 4, [255, 0, 0]);
    let rendered = render(&EpsRenderer::new(), &doc);

    assert_eq!(rendered.tier, RenderTier::EmbeddedRaster);
    assert_eq!((rendered.image.width(), rendered.image.height()), (100, 100));
    assert_pixel(&rendered.image, 50, 50, RED);
}

#[test]
fn test_unreadable_image_data_gives_placeholder() {
    let doc = "%!PS-Adobe-3.0 EPSF-3.0\n%%Creator: ImageMagick\n%%BoundingBox: 0 0 120 120\n\
               120 120 8 [1 0 0 1 0 0] currentfile false 3 colorimage\nzzzz\ngrestore\n";
    let rendered = render(&EpsRenderer::new(), doc);

    assert_eq!(rendered.tier, RenderTier::Placeholder);
    assert_eq!((rendered.image.width(), rendered.image.height()), (120, 120));
}

#[test]
fn test_empty_document_gives_error_image() {
    let rendered = EpsRenderer::new().render_bytes(b"", &RenderOptions::default());

    assert_eq!(rendered.tier, RenderTier::Error);
    assert_eq!((rendered.image.width(), rendered.image.height()), (612, 792));
}

#[test]
fn test_failing_reader_gives_error_image() {
    let rendered = EpsRenderer::new().render(FailingReader, &RenderOptions::default());
    assert_eq!(rendered.tier, RenderTier::Error);
}

#[test]
fn test_render_from_reader() {
    let doc = eps_document((0, 0, 100, 100), "0 setgray 0 0 100 100 rectfill");
    let rendered = EpsRenderer::new().render(doc.as_bytes(), &RenderOptions::default());
    assert_eq!(rendered.tier, RenderTier::Interpreter);
}

#[test]
fn test_binary_eps_is_unwrapped() {
    let doc = eps_document((0, 0, 100, 100), "0 setgray 0 0 100 100 rectfill");
    let data = binary_eps(doc.as_bytes());
    let rendered = EpsRenderer::new().render_bytes(&data, &RenderOptions::default());

    assert_eq!(rendered.tier, RenderTier::Interpreter);
    assert_eq!(rendered.bounding_box, BoundingBox::new(0, 0, 100, 100).unwrap());
    assert_pixel(&rendered.image, 50, 50, BLACK);
}

#[test]
fn test_native_engine_tier() {
    let renderer = EpsRenderer::with_native_engine(FakeEngine);
    let doc = eps_document((0, 0, 200, 100), "/x 1 def");
    let rendered = render(&renderer, &doc);

    assert_eq!(rendered.tier, RenderTier::NativeEngine);
    assert_eq!((rendered.image.width(), rendered.image.height()), (200, 100));
    assert_pixel(&rendered.image, 100, 50, GREEN);
}

#[test]
fn test_interpreter_precedes_native_engine() {
    let renderer = EpsRenderer::with_native_engine(FakeEngine);
    let doc = eps_document((0, 0, 100, 100), "0 setgray 0 0 100 100 rectfill");
    assert_eq!(render(&renderer, &doc).tier, RenderTier::Interpreter);
}

#[test]
fn test_native_engine_precedes_embedded_raster() {
    let renderer = EpsRenderer::with_native_engine(FakeEngine);
    let rendered = render(&renderer, &image_document(4, 4, [255, 0, 0]));
    assert_eq!(rendered.tier, RenderTier::NativeEngine);
}

#[test]
fn test_convert_without_engine_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.pdf");
    let doc = eps_document((0, 0, 10, 10), "");

    assert!(!EpsRenderer::new().convert_to_document(doc.as_bytes(), &output));
    assert!(!output.exists());
}

#[test]
fn test_convert_with_engine() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.pdf");
    let doc = eps_document((0, 0, 10, 10), "");

    let renderer = EpsRenderer::with_native_engine(FakeEngine);
    assert!(renderer.convert_to_document(doc.as_bytes(), &output));
    assert_eq!(std::fs::read_to_string(&output).unwrap(), doc);
}

#[test]
fn test_native_bounding_box() {
    let doc = eps_document((0, 0, 10, 10), "");
    assert_eq!(EpsRenderer::new().native_bounding_box(doc.as_bytes()), None);
    assert_eq!(
        EpsRenderer::with_native_engine(FakeEngine).native_bounding_box(doc.as_bytes()),
        Some(BoundingBox::new(1, 2, 30, 40).unwrap())
    );
}

#[test]
fn test_renderer_shared_across_threads() {
    let renderer = EpsRenderer::new();
    let shared = &renderer;
    let docs: Vec<String> = (1..=8)
        .map(|i| eps_document((0, 0, 100 + i * 10, 100), "0 setgray 0 0 50 50 rectfill"))
        .collect();

    std::thread::scope(|s| {
        let handles: Vec<_> = docs
            .iter()
            .map(|doc| s.spawn(move || render(shared, doc)))
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let rendered = handle.join().unwrap();
            assert_eq!(rendered.tier, RenderTier::Interpreter);
            assert_eq!(rendered.image.width(), 110 + i as u32 * 10);
        }
    });
}
