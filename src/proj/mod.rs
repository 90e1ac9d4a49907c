//! Geographic projection stage: source CRS to WGS84.

pub mod crs;
pub mod ellipsoid;

use crate::error::ProjError;

/// Trait for projection handles that take source-CRS points to WGS84
/// geographic coordinates.
///
/// Output is always `(longitude°, latitude°, ellipsoidal height m)` in
/// traditional GIS order, regardless of the axis order the source CRS
/// declares. Heights ride through the horizontal transform unchanged; the
/// geoid stage handles vertical datums.
pub trait Wgs84Projection: Send + Sync {
    /// Transform a single point from the source CRS to WGS84.
    fn to_wgs84(&self, x: f64, y: f64, z: f64) -> Result<(f64, f64, f64), ProjError>;
}
