//! Property-based tests for eps-core robustness validation.
//!
//! These tests use proptest to generate random inputs and verify invariants.


use eps_core::core::renderer::{MAX_DIMENSION, MIN_DIMENSION, target_dimensions};
use eps_core::core::tokenizer::tokenize;
use eps_core::{BoundingBox, EpsRenderer, PrescanOptions, RenderOptions, prescan};
use proptest::prelude::*;
use test_utils::*;

// ============================================================================
// Prescan Property Tests
// ============================================================================

/// Property: a well-formed box comment is found exactly
proptest! {
    #[test]
    fn prop_bounding_box_round_trip(
        llx in -1000i32..1000,
        lly in -1000i32..1000,
        w in 0i32..5000,
        h in 0i32..5000,
    ) {
        let doc = eps_document((llx, lly, llx + w, lly + h), "");
        let scan = prescan(doc.as_bytes(), &PrescanOptions::default());

        prop_assert!(scan.bounding_box_found);
        prop_assert_eq!(scan.bounding_box, BoundingBox::new(llx, lly, llx + w, lly + h).unwrap());
    }
}

/// Property: whatever the header says, the resolved box never has negative extent
proptest! {
    #[test]
    fn prop_resolved_box_is_ordered(a in any::<i32>(), b in any::<i32>(), c in any::<i32>(), d in any::<i32>()) {
        let doc = format!("%!PS-Adobe-3.0 EPSF-3.0\n%%BoundingBox: {} {} {} {}\n", a, b, c, d);
        let scan = prescan(doc.as_bytes(), &PrescanOptions::default());
        let bbox = scan.bounding_box;

        prop_assert!(bbox.llx() <= bbox.urx());
        prop_assert!(bbox.lly() <= bbox.ury());
    }
}

/// Property: prescan never panics on arbitrary bytes
proptest! {
    #[test]
    fn prop_prescan_arbitrary_bytes(data in prop::collection::vec(any::<u8>(), 0..2048)) {
        let _ = prescan(&data, &PrescanOptions::default().with_trailer_lines(10));
    }
}

// ============================================================================
// Interpreter Property Tests
// ============================================================================

/// Property: the tokenizer accepts any text
proptest! {
    #[test]
    fn prop_tokenize_arbitrary_text(text in ".{0,512}") {
        let _ = tokenize(&text).count();
    }
}

/// Property: every render produces an image of the target size
proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_render_always_sized(
        words in prop::collection::vec(
            prop_oneof![
                Just("moveto"), Just("lineto"), Just("curveto"), Just("arc"), Just("arcn"),
                Just("closepath"), Just("fill"), Just("stroke"), Just("clip"), Just("gsave"),
                Just("grestore"), Just("scale"), Just("rotate"), Just("translate"),
                Just("setgray"), Just("setcmykcolor"), Just("rectfill"), Just("1"), Just("-3.5"),
                Just("100"), Just("0"), Just("/name"), Just("{"), Just("}"),
                Just("1e20"), Just("-1e9"), Just("360"),
            ],
            0..64,
        ),
        w in 1i32..400,
        h in 1i32..400,
    ) {
        let doc = eps_document((0, 0, w, h), &words.join(" "));
        let rendered = EpsRenderer::new().render_bytes(doc.as_bytes(), &RenderOptions::default());
        let bbox = BoundingBox::new(0, 0, w, h).unwrap();

        prop_assert_eq!(
            (rendered.image.width(), rendered.image.height()),
            target_dimensions(&bbox, 1.0)
        );
    }
}

/// Property: arcs with any finite angles render without panicking
proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_arc_angles_any_magnitude(
        start in prop_oneof![-1e30f64..1e30, -720.0f64..720.0, Just(f64::MAX), Just(f64::MIN)],
        end in prop_oneof![-1e30f64..1e30, -720.0f64..720.0, Just(f64::MAX), Just(f64::MIN)],
        radius in 0.0f64..200.0,
        clockwise in any::<bool>(),
        paint in prop_oneof![Just("fill"), Just("stroke"), Just("clip 0 0 100 100 rectfill")],
    ) {
        let op = if clockwise { "arcn" } else { "arc" };
        let body = format!("50 50 {} {:e} {:e} {} {}", radius, start, end, op, paint);
        let doc = eps_document((0, 0, 100, 100), &body);
        let rendered = EpsRenderer::new().render_bytes(doc.as_bytes(), &RenderOptions::default());

        prop_assert_eq!((rendered.image.width(), rendered.image.height()), (100, 100));
    }
}

/// Property: target dimensions stay within the supported range
proptest! {
    #[test]
    fn prop_target_dimensions_clamped(w in 0i32..100_000, h in 0i32..100_000, scale in -10.0f64..100.0) {
        let bbox = BoundingBox::new(0, 0, w, h).unwrap();
        let (tw, th) = target_dimensions(&bbox, scale);

        prop_assert!((MIN_DIMENSION..=MAX_DIMENSION).contains(&tw));
        prop_assert!((MIN_DIMENSION..=MAX_DIMENSION).contains(&th));
    }
}
