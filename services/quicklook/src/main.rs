//! Quicklook renderer.
//!
//! Renders a PNG quicklook of a raw float32 band and, when the band is
//! geocoded, prints its antimeridian-safe boundary and a best-fit output
//! grid as JSON on stdout.

mod scene;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use projection::{
    center_geo_pos, create_geo_boundary_paths, suitable_output_grid, GridAnchor,
    IdentityMapTransform, LambertConformal, LatLonGridGeoCoding, MapTransform,
};
use renderer::{ImageInfoConfig, ThresholdEvaluator};
use scene_common::{GridSpec, PixelRect, RasterView, SampleBand};
use serde_json::json;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::scene::{
    boundary_geojson, default_image_info, read_raw_band, render_png, select_rasters,
    synthetic_band, TracingProgress,
};

/// Map coordinates of the fitted output grid.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum MapProjection {
    /// Longitude/latitude in degrees
    Geographic,
    /// HRRR Lambert conformal grid, metres
    Hrrr,
}

#[derive(Parser, Debug)]
#[command(name = "quicklook")]
#[command(about = "Render a PNG quicklook and boundary of a raw float32 band")]
struct Args {
    /// Raw little-endian float32 band, the red channel of RGB styles;
    /// a synthetic scene when omitted
    #[arg(short, long, env = "QUICKLOOK_INPUT")]
    input: Option<PathBuf>,

    /// Green channel band for styles with RGB ranges
    #[arg(long, requires = "blue")]
    green: Option<PathBuf>,

    /// Blue channel band for styles with RGB ranges
    #[arg(long, requires = "green")]
    blue: Option<PathBuf>,

    /// Band width in pixels
    #[arg(long, default_value = "512", env = "QUICKLOOK_WIDTH")]
    width: usize,

    /// Band height in pixels
    #[arg(long, default_value = "256", env = "QUICKLOOK_HEIGHT")]
    height: usize,

    /// Name under which overlay expressions refer to the band
    #[arg(long, default_value = "band")]
    band_name: String,

    /// Raw float32 flag band, addressable as `flags`
    #[arg(long, env = "QUICKLOOK_FLAGS")]
    flags: Option<PathBuf>,

    /// Samples equal to this value are no-data
    #[arg(long)]
    no_data: Option<f64>,

    /// Image-info JSON (palette or RGB ranges, bitmasks)
    #[arg(short, long, env = "QUICKLOOK_STYLE")]
    style: Option<PathBuf>,

    /// Output PNG path
    #[arg(short, long, default_value = "quicklook.png", env = "QUICKLOOK_OUTPUT")]
    output: PathBuf,

    /// Write a color-indexed PNG straight from the palette
    #[arg(long)]
    indexed: bool,

    /// Longitude of the first pixel center; enables geocoding
    #[arg(long, requires = "first_lat", allow_negative_numbers = true)]
    first_lon: Option<f64>,

    /// Latitude of the first pixel center
    #[arg(long, requires = "first_lon", allow_negative_numbers = true)]
    first_lat: Option<f64>,

    /// Pixel size in degrees; rows run southwards
    #[arg(long, default_value = "0.1")]
    pixel_size: f64,

    /// Boundary sampling step in pixels
    #[arg(long)]
    boundary_step: Option<usize>,

    /// Map projection of the fitted output grid
    #[arg(long, value_enum, default_value = "geographic", env = "QUICKLOOK_MAP")]
    map: MapProjection,

    /// Log level
    #[arg(long, default_value = "info", env = "QUICKLOOK_LOG_LEVEL")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, env = "QUICKLOOK_JSON_LOGS")]
    json_logs: bool,
}

fn init_tracing(args: &Args) -> Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    // logs go to stderr, stdout carries the boundary JSON
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr);
    if args.json_logs {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn load_channels(args: &Args) -> Result<Vec<SampleBand>> {
    let (Some(green), Some(blue)) = (&args.green, &args.blue) else {
        return Ok(Vec::new());
    };
    [("green", green), ("blue", blue)]
        .into_iter()
        .map(|(name, path)| {
            let band = read_raw_band(path, name, args.width, args.height)?;
            Ok(match args.no_data {
                Some(value) => band.with_no_data_value(value),
                None => band,
            })
        })
        .collect()
}

fn load_band(args: &Args) -> Result<SampleBand> {
    let band = match &args.input {
        Some(path) => read_raw_band(path, &args.band_name, args.width, args.height)?,
        None => synthetic_band(&args.band_name, args.width, args.height)?,
    };
    let band = match args.no_data {
        Some(value) => band.with_no_data_value(value),
        None => band,
    };
    Ok(match (args.first_lon, args.first_lat) {
        (Some(lon), Some(lat)) => {
            let grid = GridSpec::new(args.width, args.height, args.pixel_size, -args.pixel_size, lon, lat);
            band.with_geocoding(Arc::new(LatLonGridGeoCoding::new(grid)))
        }
        _ => band,
    })
}

fn print_boundary(args: &Args, band: &SampleBand) -> Result<()> {
    let Some(geocoding) = band.geocoding() else {
        info!("band has no geocoding, skipping boundary");
        return Ok(());
    };
    let fragments = create_geo_boundary_paths(band, None, args.boundary_step)?;
    let center = center_geo_pos(band.width(), band.height(), geocoding);

    let hrrr;
    let transform: &dyn MapTransform = match args.map {
        MapProjection::Geographic => &IdentityMapTransform,
        MapProjection::Hrrr => {
            hrrr = LambertConformal::hrrr();
            &hrrr
        }
    };
    let grid = suitable_output_grid(
        band,
        PixelRect::full(band.width(), band.height()),
        transform,
        GridAnchor::UpperLeft,
    )?;

    let output = json!({
        "center": { "lon": center.lon, "lat": center.lat },
        "boundary": boundary_geojson(&fragments),
        "output_grid": grid,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(&args)?;

    let band = load_band(&args)?;
    let flags = args
        .flags
        .as_deref()
        .map(|path| read_raw_band(path, "flags", args.width, args.height))
        .transpose()?;
    let channels = load_channels(&args)?;
    info!(
        width = band.width(),
        height = band.height(),
        name = band.name(),
        channels = channels.len(),
        "band loaded"
    );

    let (info, layers) = match &args.style {
        Some(path) => {
            let config = ImageInfoConfig::from_file(path)
                .with_context(|| format!("Failed to load style {}", path.display()))?;
            (config.to_image_info()?, config.to_overlay_layers()?)
        }
        None => (default_image_info(&band)?, Vec::new()),
    };

    let rasters = select_rasters(&info, &band, &channels)?;

    let mut evaluator = ThresholdEvaluator::new().with_band(args.band_name.clone(), &band);
    for channel in &channels {
        evaluator = evaluator.with_band(channel.name(), channel);
    }
    if let Some(flags) = &flags {
        evaluator = evaluator.with_band("flags", flags);
    }

    let png = render_png(&rasters, &info, &layers, &evaluator, args.indexed, &TracingProgress::default())?;
    std::fs::write(&args.output, &png)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    info!(path = %args.output.display(), bytes = png.len(), layers = layers.len(), "quicklook written");

    print_boundary(&args, &band)
}
