use proj4rs::Proj;

use crate::error::ProjError;
use crate::proj::Wgs84Projection;

/// Thin wrapper around proj4rs that transforms source-CRS points to WGS84
/// geographic coordinates, handling radians/degrees conversion transparently.
///
/// proj4rs uses radians for geographic CRS, but callers of this crate work in
/// degrees and CRS native units. This wrapper auto-converts on both ends.
pub struct CrsToWgs84 {
    src: Proj,
    dst: Proj,
    src_is_geo: bool,
}

impl CrsToWgs84 {
    /// Create a handle for a source CRS identified by EPSG code.
    pub fn from_epsg(code: u32) -> Result<Self, ProjError> {
        Self::from_user_string(&format!("EPSG:{code}"))
    }

    /// Create a handle for a source CRS defined by Well-Known Text.
    pub fn from_wkt(wkt: &str) -> Result<Self, ProjError> {
        Self::from_user_string(wkt)
    }

    /// Accepts EPSG codes ("EPSG:4326"), PROJ strings ("+proj=utm +zone=33 ...")
    /// or WKT.
    fn from_user_string(src_crs: &str) -> Result<Self, ProjError> {
        let src = Proj::from_user_string(src_crs)
            .map_err(|e| ProjError::UnknownCrs(format!("{src_crs}: {e}")))?;
        let dst = Proj::from_user_string("EPSG:4326")
            .map_err(|e| ProjError::UnknownCrs(format!("EPSG:4326: {e}")))?;
        let src_is_geo = src.is_latlong();
        Ok(Self {
            src,
            dst,
            src_is_geo,
        })
    }
}

impl Wgs84Projection for CrsToWgs84 {
    fn to_wgs84(&self, x: f64, y: f64, z: f64) -> Result<(f64, f64, f64), ProjError> {
        let mut point = if self.src_is_geo {
            (x.to_radians(), y.to_radians(), z)
        } else {
            (x, y, z)
        };

        proj4rs::transform::transform(&self.src, &self.dst, &mut point)
            .map_err(|e| ProjError::TransformFailed(e.to_string()))?;

        // The destination is always geographic: radians out.
        Ok((point.0.to_degrees(), point.1.to_degrees(), point.2))
    }
}
