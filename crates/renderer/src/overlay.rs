//! Alpha-blended bitmask overlays.
//!
//! Each [`OverlayLayer`] names a boolean pixel expression, a color and an
//! opacity. Where the expression holds, the layer color is blended onto the
//! image with `new = overlay * opacity + old * (1 - opacity)` on every
//! channel, alpha included.

use std::time::Instant;

use rayon::prelude::*;
use scene_common::{check_cancelled, BoxedCause, Color, ProgressMonitor, SceneError, SceneResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::image::ImageBuffer;

/// A predicate-driven overlay drawn on top of an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayLayer {
    pub name: String,
    pub expression: String,
    pub color: Color,
    /// Blend weight of the layer color, in [0, 1].
    pub opacity: f32,
}

impl OverlayLayer {
    pub fn new(
        name: impl Into<String>,
        expression: impl Into<String>,
        color: Color,
        opacity: f32,
    ) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
            color,
            opacity,
        }
    }
}

/// Pixel being evaluated: column, row and row-major index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelContext {
    pub x: usize,
    pub y: usize,
    pub index: usize,
}

/// A parsed boolean pixel expression.
pub trait CompiledPredicate: Send + Sync {
    fn evaluate(&self, pixel: &PixelContext) -> bool;
}

impl<F> CompiledPredicate for F
where
    F: Fn(&PixelContext) -> bool + Send + Sync,
{
    fn evaluate(&self, pixel: &PixelContext) -> bool {
        self(pixel)
    }
}

/// Parses overlay expressions into predicates.
pub trait PredicateEvaluator {
    fn compile(&self, expression: &str) -> Result<Box<dyn CompiledPredicate + '_>, BoxedCause>;
}

/// Blend `layers` onto `image`.
///
/// Layers are drawn in reverse declaration order, so the first declared
/// layer ends up on top. All expressions are compiled before any pixel is
/// touched. Blending of one layer runs row-parallel; layers are sequential.
pub fn composite(
    mut image: ImageBuffer,
    layers: &[OverlayLayer],
    evaluator: &dyn PredicateEvaluator,
    pm: &dyn ProgressMonitor,
) -> SceneResult<ImageBuffer> {
    if layers.is_empty() {
        return Ok(image);
    }
    for layer in layers {
        if !(0.0..=1.0).contains(&layer.opacity) {
            return Err(SceneError::invalid_argument(format!(
                "opacity of overlay '{}' must be within [0, 1], got {}",
                layer.name, layer.opacity
            )));
        }
    }
    let predicates = layers
        .iter()
        .map(|layer| {
            evaluator
                .compile(&layer.expression)
                .map_err(|e| SceneError::predicate(layer.expression.clone(), e))
        })
        .collect::<SceneResult<Vec<_>>>()?;

    let started = Instant::now();
    pm.begin_task("Creating bitmasks ...", layers.len() as u32);
    let result = (|| -> SceneResult<()> {
        for (layer, predicate) in layers.iter().zip(&predicates).rev() {
            let layer_started = Instant::now();
            let blended = blend_layer(&mut image, layer, predicate.as_ref());
            debug!(
                layer = %layer.name,
                pixels = blended,
                elapsed_ms = layer_started.elapsed().as_millis() as u64,
                "overlay layer blended"
            );
            pm.worked(1);
            check_cancelled(pm)?;
        }
        Ok(())
    })();
    pm.done();
    result?;

    debug!(
        layers = layers.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "overlay bitmasks"
    );
    Ok(image)
}

/// Blend one layer in place; returns the number of pixels it covered.
fn blend_layer(image: &mut ImageBuffer, layer: &OverlayLayer, predicate: &dyn CompiledPredicate) -> usize {
    let width = image.width();
    let layout = image.layout();
    let n = layout.channels();
    let row_len = image.row_len();
    if row_len == 0 {
        return 0;
    }

    let alpha = layer.opacity;
    let transparency = 1.0 - alpha;
    let overlay = [
        layer.color.a as f32 * alpha,
        layer.color.r as f32 * alpha,
        layer.color.g as f32 * alpha,
        layer.color.b as f32 * alpha,
    ];
    let blend = |overlay: f32, old: u8| (overlay + old as f32 * transparency) as u8;

    image
        .data_mut()
        .par_chunks_mut(row_len)
        .enumerate()
        .map(|(y, row)| {
            let mut covered = 0;
            for (x, pixel) in row.chunks_exact_mut(n).enumerate() {
                let ctx = PixelContext {
                    x,
                    y,
                    index: y * width + x,
                };
                if !predicate.evaluate(&ctx) {
                    continue;
                }
                let old = layout.read(pixel);
                let new = Color::new(
                    blend(overlay[1], old.r),
                    blend(overlay[2], old.g),
                    blend(overlay[3], old.b),
                    blend(overlay[0], old.a),
                );
                layout.write(pixel, new);
                covered += 1;
            }
            covered
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ChannelLayout;
    use scene_common::{CancelFlag, NullProgressMonitor};

    /// Evaluator understanding "all", "none", "left" (x == 0) and failing otherwise.
    struct FixedEvaluator;

    impl PredicateEvaluator for FixedEvaluator {
        fn compile(&self, expression: &str) -> Result<Box<dyn CompiledPredicate + '_>, BoxedCause> {
            match expression {
                "all" => Ok(Box::new(|_: &PixelContext| true)),
                "none" => Ok(Box::new(|_: &PixelContext| false)),
                "left" => Ok(Box::new(|p: &PixelContext| p.x == 0)),
                other => Err(format!("unknown expression '{}'", other).into()),
            }
        }
    }

    fn grey_image(layout: ChannelLayout) -> ImageBuffer {
        let mut image = ImageBuffer::new(2, 2, layout);
        for y in 0..2 {
            for x in 0..2 {
                image.set_pixel(x, y, Color::new(100, 100, 100, 255));
            }
        }
        image
    }

    #[test]
    fn test_empty_layers_return_input() {
        let image = grey_image(ChannelLayout::Bgr);
        let out = composite(image.clone(), &[], &FixedEvaluator, &NullProgressMonitor).unwrap();
        assert_eq!(out, image);
    }

    #[test]
    fn test_full_and_zero_opacity() {
        let red = Color::new(255, 0, 0, 255);
        let layers = [OverlayLayer::new("full", "left", red, 1.0)];
        let out = composite(grey_image(ChannelLayout::Abgr), &layers, &FixedEvaluator, &NullProgressMonitor)
            .unwrap();
        assert_eq!(out.pixel(0, 0), red);
        assert_eq!(out.pixel(1, 0), Color::new(100, 100, 100, 255));

        let layers = [OverlayLayer::new("zero", "all", red, 0.0)];
        let out = composite(grey_image(ChannelLayout::Abgr), &layers, &FixedEvaluator, &NullProgressMonitor)
            .unwrap();
        assert_eq!(out, grey_image(ChannelLayout::Abgr));
    }

    #[test]
    fn test_half_opacity_blend_truncates() {
        let layers = [OverlayLayer::new("half", "all", Color::new(255, 0, 0, 0), 0.5)];
        let out = composite(grey_image(ChannelLayout::Abgr), &layers, &FixedEvaluator, &NullProgressMonitor)
            .unwrap();
        // 127.5 + 50 = 177.5 -> 177, 0 + 50 = 50, alpha 0 + 127.5 -> 127
        assert_eq!(out.pixel(1, 1), Color::new(177, 50, 50, 127));
    }

    #[test]
    fn test_first_declared_layer_is_on_top() {
        let layers = [
            OverlayLayer::new("top", "all", Color::rgb(0, 0, 255), 1.0),
            OverlayLayer::new("bottom", "all", Color::rgb(0, 255, 0), 1.0),
        ];
        let out = composite(grey_image(ChannelLayout::Bgr), &layers, &FixedEvaluator, &NullProgressMonitor)
            .unwrap();
        assert_eq!(out.pixel(0, 0), Color::rgb(0, 0, 255));
    }

    #[test]
    fn test_parse_failure_wraps_cause() {
        let layers = [
            OverlayLayer::new("ok", "all", Color::WHITE, 1.0),
            OverlayLayer::new("bad", "flags &", Color::WHITE, 1.0),
        ];
        let err = composite(grey_image(ChannelLayout::Bgr), &layers, &FixedEvaluator, &NullProgressMonitor)
            .unwrap_err();
        match err {
            SceneError::PredicateEvaluation { expression, .. } => assert_eq!(expression, "flags &"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_opacity() {
        let layers = [OverlayLayer::new("x", "all", Color::WHITE, 1.5)];
        let result = composite(grey_image(ChannelLayout::Bgr), &layers, &FixedEvaluator, &NullProgressMonitor);
        assert!(matches!(result, Err(SceneError::InvalidArgument(_))));
    }

    #[test]
    fn test_cancelled_between_layers() {
        let pm = CancelFlag::new();
        pm.cancel();
        let layers = [OverlayLayer::new("x", "none", Color::WHITE, 1.0)];
        let result = composite(grey_image(ChannelLayout::Bgr), &layers, &FixedEvaluator, &pm);
        assert!(matches!(result, Err(SceneError::UserCancelled)));
    }
}
