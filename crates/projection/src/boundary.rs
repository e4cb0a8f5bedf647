//! Pixel boundaries of rectangular regions and their geographic projection.

use scene_common::{GeoCoding, GeoPos, PixelPos, PixelRect, RasterView, SceneError, SceneResult};
use tracing::{debug, warn};

/// Perimeter of `rect` walked clockwise from the upper-left corner.
///
/// Each side advances by `step` pixels: right along the top edge, down the
/// right edge, left along the bottom edge and up the left edge. The bottom
/// and left sides restart at the last coordinate stepped on the top and
/// right sides, so every corner appears exactly once. With
/// `use_pixel_center` the walk is inset by half a pixel.
///
/// A `step` of zero yields the four corners only.
///
/// A 100 x 50 rectangle with step 10 produces 30 positions.
pub fn create_rect_boundary(rect: PixelRect, step: usize, use_pixel_center: bool) -> Vec<PixelPos> {
    let inset = if use_pixel_center { 0.5 } else { 0.0 };
    let x1 = rect.x as f64 + inset;
    let y1 = rect.y as f64 + inset;
    let x2 = x1 + rect.width as f64 - 2.0 * inset;
    let y2 = y1 + rect.height as f64 - 2.0 * inset;

    let step = if step == 0 {
        2 * rect.width.max(rect.height)
    } else {
        step
    } as f64;
    // A zero-sized rectangle still needs a positive stride.
    let step = step.max(1.0);

    let mut points = Vec::new();

    let mut last_x = 0.0;
    let mut x = x1;
    while x < x2 {
        points.push(PixelPos::new(x, y1));
        last_x = x;
        x += step;
    }

    let mut last_y = 0.0;
    let mut y = y1;
    while y < y2 {
        points.push(PixelPos::new(x2, y));
        last_y = y;
        y += step;
    }

    points.push(PixelPos::new(x2, y2));

    let mut x = last_x;
    while x > x1 {
        points.push(PixelPos::new(x, y2));
        x -= step;
    }

    points.push(PixelPos::new(x1, y2));

    let mut y = last_y;
    while y > y1 {
        points.push(PixelPos::new(x1, y));
        y -= step;
    }

    points
}

/// Map pixel positions to geographic positions, one to one and in order.
pub fn project(points: &[PixelPos], geocoding: &dyn GeoCoding) -> Vec<GeoPos> {
    points.iter().map(|&p| geocoding.geo_pos(p)).collect()
}

/// The raster's geocoding, if it can map pixels to geographic positions.
pub fn usable_geocoding(raster: &dyn RasterView) -> SceneResult<&dyn GeoCoding> {
    match raster.geocoding() {
        Some(gc) if gc.can_get_geo_pos() => Ok(gc),
        _ => Err(SceneError::NoGeoCoding),
    }
}

/// Geographic boundary of `region` (the whole raster when `None`).
pub fn create_geo_boundary(
    raster: &dyn RasterView,
    region: Option<PixelRect>,
    step: usize,
    use_pixel_center: bool,
) -> SceneResult<Vec<GeoPos>> {
    let gc = usable_geocoding(raster)?;
    let rect = region.unwrap_or_else(|| PixelRect::full(raster.width(), raster.height()));
    let pixels = create_rect_boundary(rect, step, use_pixel_center);
    let geo = project(&pixels, gc);

    let invalid = geo.iter().filter(|p| !p.is_valid()).count();
    if invalid > 0 {
        warn!(invalid, total = geo.len(), "boundary contains unmapped positions");
    }
    debug!(
        x = rect.x,
        y = rect.y,
        width = rect.width,
        height = rect.height,
        step,
        points = geo.len(),
        "geo boundary"
    );
    Ok(geo)
}

/// Geographic position of the center pixel of a `width` x `height` scene.
pub fn center_geo_pos(width: usize, height: usize, geocoding: &dyn GeoCoding) -> GeoPos {
    let center = PixelPos::new(0.5 * width as f64 + 0.5, 0.5 * height as f64 + 0.5);
    geocoding.geo_pos(center)
}

/// Step used when the caller does not choose one: an eighth of the shorter
/// side, at least one pixel.
pub fn default_boundary_step(width: usize, height: usize) -> usize {
    (width.min(height) / 8).max(1)
}
