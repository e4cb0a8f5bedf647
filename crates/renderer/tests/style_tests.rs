//! Tests for image-info configuration.
//!
//! Tests JSON parsing, conversion into assembler settings and overlay
//! layers, and rendering driven entirely by a configuration file.

use std::io::Write;

use renderer::assemble::assemble_quiet;
use renderer::style::{ImageInfoConfig, StyleError};
use renderer::{
    composite, create_image, ChannelLayout, HistogramMatching, PaletteMode, ThresholdEvaluator,
};
use scene_common::{Color, NullProgressMonitor, SceneError};
use test_utils::{band, flag_band, temperature_band};

const BRIGHTNESS_STYLE: &str = r##"{
    "palette": {
        "points": [
            { "sample": 250.0, "color": "#0000FF", "label": "cold" },
            { "sample": 280.0, "color": "#00FF00" },
            { "sample": 310.0, "color": "#FF0000", "label": "warm" }
        ]
    },
    "layout": "abgr",
    "no_data_color": "#00000000",
    "histogram_matching": "equalize",
    "bitmasks": [
        { "name": "cloud", "expr": "flags & 0x04", "color": "white", "alpha": 0.5 },
        { "name": "land", "expr": "flags & 0x01", "color": [0, 128, 0] }
    ]
}"##;

// ============================================================================
// Parsing
// ============================================================================

#[test]
fn test_parse_full_style() {
    let config = ImageInfoConfig::from_json(BRIGHTNESS_STYLE).unwrap();
    let info = config.to_image_info().unwrap();
    assert_eq!(info.layout, ChannelLayout::Abgr);
    assert_eq!(info.no_data_color, Color::transparent());
    assert_eq!(info.histogram_matching, HistogramMatching::Equalize);

    let Some(PaletteMode::Ramp(palette)) = &info.palette else {
        panic!("expected a ramp palette");
    };
    assert_eq!(palette.len(), 3);
    assert_eq!(palette.points()[0].label.as_deref(), Some("cold"));
    assert_eq!(palette.points()[1].color, Color::rgb(0, 255, 0));
}

#[test]
fn test_bitmask_defaults_and_order() {
    let config = ImageInfoConfig::from_json(BRIGHTNESS_STYLE).unwrap();
    let layers = config.to_overlay_layers().unwrap();
    assert_eq!(layers.len(), 2);
    assert_eq!(layers[0].name, "cloud");
    assert_eq!(layers[0].color, Color::WHITE);
    assert_eq!(layers[1].opacity, 0.5);
    assert_eq!(layers[1].color, Color::rgb(0, 128, 0));
}

#[test]
fn test_categorical_palette() {
    let config = ImageInfoConfig::from_json(
        r##"{"palette": {"categorical": true, "points": [
            {"sample": 1, "color": "#FF0000", "label": "water"},
            {"sample": 4, "color": "#00FF00", "label": "forest"}
        ]}}"##,
    )
    .unwrap();
    let info = config.to_image_info().unwrap();
    assert!(matches!(info.palette, Some(PaletteMode::Categorical(_))));

    let classes = band("classes", 3, 1, vec![4.0, 2.0, 1.0]);
    let image = assemble_quiet(&[&classes], &info).unwrap();
    assert_eq!(image.pixel(0, 0), Color::rgb(0, 255, 0));
    assert_eq!(image.pixel(2, 0), Color::rgb(255, 0, 0));
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_unsorted_palette_rejected() {
    let config = ImageInfoConfig::from_json(
        r##"{"palette": {"points": [{"sample": 5, "color": "red"}, {"sample": 1, "color": "blue"}]}}"##,
    )
    .unwrap();
    assert!(matches!(
        config.to_image_info(),
        Err(StyleError::Scene(SceneError::UnsortedPalette { index: 1 }))
    ));
}

#[test]
fn test_bitmask_alpha_out_of_range() {
    let config = ImageInfoConfig::from_json(
        r##"{"rgb": [{"min": 0, "max": 1}, {"min": 0, "max": 1}, {"min": 0, "max": 1}],
            "bitmasks": [{"name": "x", "expr": "a", "color": "red", "alpha": 1.5}]}"##,
    )
    .unwrap();
    assert!(matches!(
        config.to_overlay_layers(),
        Err(StyleError::Scene(SceneError::InvalidArgument(_)))
    ));
}

#[test]
fn test_invalid_rgb_range() {
    let config = ImageInfoConfig::from_json(
        r##"{"rgb": [{"min": 0, "max": 1}, {"min": 1, "max": 0}, {"min": 0, "max": 1}]}"##,
    )
    .unwrap();
    assert!(matches!(
        config.to_image_info(),
        Err(StyleError::Scene(SceneError::InvalidRange { .. }))
    ));
}

#[test]
fn test_malformed_json() {
    assert!(matches!(
        ImageInfoConfig::from_json("{ palette: "),
        Err(StyleError::Json(_))
    ));
    assert!(matches!(
        ImageInfoConfig::from_file("/nonexistent/style.json"),
        Err(StyleError::Io(_))
    ));
}

// ============================================================================
// Rendering from configuration
// ============================================================================

#[test]
fn test_render_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(BRIGHTNESS_STYLE.as_bytes()).unwrap();
    let config = ImageInfoConfig::from_file(file.path()).unwrap();

    let tb = temperature_band("tb", 8, 8);
    let flags = flag_band("flags", 8, 8);
    let evaluator = ThresholdEvaluator::new().with_band("tb", &tb).with_band("flags", &flags);
    let info = config.to_image_info().unwrap();
    let layers = config.to_overlay_layers().unwrap();

    let image = create_image(&[&tb], &info, &layers, &evaluator, &NullProgressMonitor).unwrap();
    assert_eq!((image.width(), image.height()), (8, 8));
    assert_eq!(image.layout(), ChannelLayout::Abgr);
}

#[test]
fn test_overlay_layers_blend_in_declaration_priority() {
    let config = ImageInfoConfig::from_json(
        r##"{"palette": {"points": [{"sample": 0, "color": "black"}, {"sample": 1, "color": "white"}]},
            "bitmasks": [
                {"name": "top", "expr": "flags & 0x01", "color": "#FF0000", "alpha": 1.0},
                {"name": "bottom", "expr": "flags & 0x04", "color": "#0000FF", "alpha": 1.0}
            ]}"##,
    )
    .unwrap();
    let data = band("data", 2, 2, vec![0.0; 4]);
    let flags = flag_band("flags", 2, 2);
    let evaluator = ThresholdEvaluator::new().with_band("flags", &flags);

    let image = assemble_quiet(&[&data], &config.to_image_info().unwrap()).unwrap();
    let image = composite(image, &config.to_overlay_layers().unwrap(), &evaluator, &NullProgressMonitor).unwrap();
    // column 0 is flagged by both layers; the first declared wins
    assert_eq!(image.pixel(0, 1), Color::rgb(255, 0, 0));
    assert_eq!(image.pixel(1, 1), Color::rgb(0, 0, 255));
    assert_eq!(image.pixel(1, 0), Color::BLACK);
}
