//! Common types shared by the scene renderer and the boundary/projection crates.

pub mod color;
pub mod envelope;
pub mod error;
pub mod geocoding;
pub mod geom;
pub mod grid;
pub mod progress;
pub mod raster;

pub use color::{Color, ColorSpec};
pub use envelope::Envelope;
pub use error::{BoxedCause, SceneError, SceneResult};
pub use geocoding::GeoCoding;
pub use geom::{GeoPos, PixelPos, PixelRect};
pub use grid::GridSpec;
pub use progress::{
    check_cancelled, CancelFlag, NullProgressMonitor, ProgressMonitor, SubProgressMonitor,
};
pub use raster::{RasterView, SampleBand};
