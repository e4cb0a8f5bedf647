//! Integration tests for image assembly, histogram adjustment and the
//! full `create_image` pipeline.

use renderer::assemble::assemble_quiet;
use renderer::{
    create_image, ChannelLayout, ColorPalette, DisplayRange, HistogramMatching, ImageInfo,
    OverlayLayer, PaletteMode, PalettePoint, ThresholdEvaluator,
};
use scene_common::{CancelFlag, Color, NullProgressMonitor, SceneError};
use test_utils::{band, create_grid_with_nans, flag_band, ramp_band};

fn grey_info() -> ImageInfo {
    ImageInfo::with_palette(PaletteMode::Ramp(ColorPalette::grey(0.0, 1.0).unwrap()))
}

// ============================================================================
// Single band
// ============================================================================

#[test]
fn test_mid_grey() {
    let b = band("b", 1, 1, vec![0.5]);
    let image = assemble_quiet(&[&b], &grey_info()).unwrap();
    // round(127.5) selects index 128
    assert_eq!(image.data(), &[128, 128, 128]);
}

#[test]
fn test_ramp_ends_and_clamping() {
    let b = band("b", 4, 1, vec![-1.0, 0.0, 1.0, 2.0]);
    let image = assemble_quiet(&[&b], &grey_info()).unwrap();
    assert_eq!(image.pixel(0, 0), Color::BLACK);
    assert_eq!(image.pixel(1, 0), Color::BLACK);
    assert_eq!(image.pixel(2, 0), Color::WHITE);
    assert_eq!(image.pixel(3, 0), Color::WHITE);
}

#[test]
fn test_no_data_color_for_invalid_pixels() {
    let data = create_grid_with_nans(3, 2, 0.25, &[(1, 0)]);
    let b = band("b", 3, 2, data).with_no_data_value(0.25);
    let info = grey_info()
        .layout(ChannelLayout::Abgr)
        .no_data_color(Color::new(9, 8, 7, 6));
    let image = assemble_quiet(&[&b], &info).unwrap();
    for y in 0..2 {
        for x in 0..3 {
            assert_eq!(image.pixel(x, y), Color::new(9, 8, 7, 6));
        }
    }
}

#[test]
fn test_multi_stop_palette_interpolates() {
    let palette = ColorPalette::new(vec![
        PalettePoint::new(0.0, Color::rgb(0, 0, 255)),
        PalettePoint::new(50.0, Color::rgb(0, 255, 0)),
        PalettePoint::new(100.0, Color::rgb(255, 0, 0)),
    ])
    .unwrap();
    let b = band("b", 3, 1, vec![0.0, 50.0, 100.0]);
    let image = assemble_quiet(&[&b], &ImageInfo::with_palette(PaletteMode::Ramp(palette))).unwrap();
    assert_eq!(image.pixel(0, 0), Color::rgb(0, 0, 255));
    assert_eq!(image.pixel(2, 0), Color::rgb(255, 0, 0));
    // 50 quantizes to 128, slightly past the middle stop
    let mid = image.pixel(1, 0);
    assert!(mid.g >= 250 && mid.r <= 5 && mid.b == 0, "{:?}", mid);
}

// ============================================================================
// Three bands
// ============================================================================

#[test]
fn test_rgb_channels_and_opaque_alpha() {
    let r = band("r", 2, 1, vec![1.0, 0.0]);
    let g = band("g", 2, 1, vec![0.0, 2.0]);
    let b = band("b", 2, 1, vec![0.0, 5.0]);
    let info = ImageInfo::with_rgb_ranges([
        DisplayRange::new(0.0, 1.0),
        DisplayRange::new(0.0, 2.0),
        DisplayRange::new(0.0, 10.0),
    ])
    .layout(ChannelLayout::Abgr);
    let image = assemble_quiet(&[&r, &g, &b], &info).unwrap();
    // A,B,G,R byte order
    assert_eq!(&image.data()[0..4], &[255, 0, 0, 255]);
    assert_eq!(&image.data()[4..8], &[255, 128, 255, 0]);
}

#[test]
fn test_rgb_gamma_per_channel() {
    let r = band("r", 1, 1, vec![0.25]);
    let info = ImageInfo::with_rgb_ranges([
        DisplayRange::new(0.0, 1.0).with_gamma(2.0),
        DisplayRange::new(0.0, 1.0),
        DisplayRange::new(0.0, 1.0),
    ]);
    let image = assemble_quiet(&[&r, &r, &r], &info).unwrap();
    // B,G,R: linear 0.25 -> 64, gamma 2 -> sqrt(0.25) = 0.5 -> 128
    assert_eq!(image.data(), &[64, 64, 128]);
}

#[test]
fn test_rgb_invalid_if_any_band_invalid() {
    let r = band("r", 2, 1, vec![1.0, 1.0]);
    let g = band("g", 2, 1, vec![1.0, f32::NAN]);
    let b = band("b", 2, 1, vec![1.0, 1.0]);
    let info = ImageInfo::with_rgb_ranges([DisplayRange::new(0.0, 1.0); 3])
        .no_data_color(Color::rgb(1, 2, 3));
    let image = assemble_quiet(&[&r, &g, &b], &info).unwrap();
    assert_eq!(image.pixel(0, 0), Color::WHITE);
    assert_eq!(image.pixel(1, 0), Color::rgb(1, 2, 3));
}

#[test]
fn test_rgb_dimension_mismatch() {
    let a = band("a", 2, 2, vec![0.0; 4]);
    let b = band("b", 4, 1, vec![0.0; 4]);
    let info = ImageInfo::with_rgb_ranges([DisplayRange::new(0.0, 1.0); 3]);
    let result = assemble_quiet(&[&a, &a, &b], &info);
    assert!(matches!(
        result,
        Err(SceneError::DimensionMismatch {
            expected: (2, 2),
            found: (4, 1)
        })
    ));
}

#[test]
fn test_rgb_invalid_range() {
    let a = band("a", 1, 1, vec![0.0]);
    let info = ImageInfo::with_rgb_ranges([
        DisplayRange::new(0.0, 1.0),
        DisplayRange::new(3.0, 3.0),
        DisplayRange::new(0.0, 1.0),
    ]);
    assert!(matches!(
        assemble_quiet(&[&a, &a, &a], &info),
        Err(SceneError::InvalidRange { .. })
    ));
}

// ============================================================================
// Full pipeline
// ============================================================================

#[test]
fn test_create_image_with_overlay() {
    let data = ramp_band("data", 4, 4, 0.0, 1.0);
    let flags = flag_band("flags", 4, 4);
    let evaluator = ThresholdEvaluator::new()
        .with_band("data", &data)
        .with_band("flags", &flags);
    let layers = [OverlayLayer::new("cloud", "flags & 0x04", Color::rgb(255, 0, 0), 1.0)];

    let image = create_image(&[&data], &grey_info(), &layers, &evaluator, &NullProgressMonitor).unwrap();
    // upper half untouched, lower half red
    assert_eq!(image.pixel(0, 0), Color::BLACK);
    assert_eq!(image.pixel(3, 1), Color::WHITE);
    for x in 0..4 {
        assert_eq!(image.pixel(x, 2), Color::rgb(255, 0, 0));
        assert_eq!(image.pixel(x, 3), Color::rgb(255, 0, 0));
    }
}

#[test]
fn test_create_image_equalizes_before_overlay() {
    let data = band("data", 2, 1, vec![0.4, 0.6]);
    let info = grey_info().histogram_matching(HistogramMatching::Equalize);
    let evaluator = ThresholdEvaluator::new().with_band("data", &data);
    let layers = [OverlayLayer::new("low", "data < 0.5", Color::rgb(0, 0, 255), 1.0)];

    let image = create_image(&[&data], &info, &layers, &evaluator, &NullProgressMonitor).unwrap();
    assert_eq!(image.pixel(0, 0), Color::rgb(0, 0, 255));
    // equalization stretches the two grey levels apart
    let plain = assemble_quiet(&[&data], &grey_info()).unwrap();
    assert!(image.pixel(1, 0).r > plain.pixel(1, 0).r);
}

#[test]
fn test_create_image_bad_expression() {
    let data = band("data", 1, 1, vec![0.0]);
    let evaluator = ThresholdEvaluator::new().with_band("data", &data);
    let layers = [OverlayLayer::new("bad", "missing > 1", Color::WHITE, 0.5)];
    let result = create_image(&[&data], &grey_info(), &layers, &evaluator, &NullProgressMonitor);
    match result {
        Err(SceneError::PredicateEvaluation { expression, .. }) => assert_eq!(expression, "missing > 1"),
        other => panic!("unexpected result: {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_create_image_cancelled() {
    let data = ramp_band("data", 8, 8, 0.0, 1.0);
    let pm = CancelFlag::new();
    pm.cancel();
    let result = create_image(&[&data], &grey_info(), &[], &ThresholdEvaluator::new(), &pm);
    assert!(matches!(result, Err(SceneError::UserCancelled)));
}
