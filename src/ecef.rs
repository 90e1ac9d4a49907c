//! ECEF and local tangent-plane math on the WGS84 ellipsoid.
//!
//! The 4×4 matrices here are column-major homogeneous transforms with the
//! left-multiplication convention (`result = M · v`). The column-major
//! 16-element form produced by [`to_column_major`] is exactly the layout the
//! 3D Tiles root `transform` array expects: rotation basis in columns 0..2,
//! translation in slots 12..14, a literal 1 in slot 15.

use nalgebra::{Matrix4, Vector3, Vector4};

use crate::coordinate_system::UpAxis;
use crate::proj::ellipsoid::WGS84;

/// Convert WGS84 geographic coordinates (degrees, meters) to ECEF.
pub fn cartographic_to_ecef(lon_deg: f64, lat_deg: f64, height: f64) -> Vector3<f64> {
    let lon = lon_deg.to_radians();
    let lat = lat_deg.to_radians();

    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();

    let n = WGS84.prime_vertical_radius(lat);

    Vector3::new(
        (n + height) * cos_lat * cos_lon,
        (n + height) * cos_lat * sin_lon,
        (n * (1.0 - WGS84.e2) + height) * sin_lat,
    )
}

/// Build the ENU→ECEF rigid-body transform for a tangent plane anchored at
/// (lon°, lat°, height m).
///
/// Columns are the East, North and Up basis vectors expressed in ECEF,
/// followed by the anchor's ECEF position:
///
/// ```text
/// East  = (-sin λ,         cos λ,        0    )
/// North = (-sin φ cos λ,  -sin φ sin λ,  cos φ)
/// Up    = ( cos φ cos λ,   cos φ sin λ,  sin φ)
/// ```
pub fn enu_to_ecef_matrix(lon_deg: f64, lat_deg: f64, height: f64) -> Matrix4<f64> {
    let lon = lon_deg.to_radians();
    let lat = lat_deg.to_radians();

    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();

    let origin = cartographic_to_ecef(lon_deg, lat_deg, height);

    Matrix4::new(
        -sin_lon, -sin_lat * cos_lon, cos_lat * cos_lon, origin.x,
        cos_lon, -sin_lat * sin_lon, cos_lat * sin_lon, origin.y,
        0.0, cos_lat, sin_lat, origin.z,
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Rotation between Y-Up and Z-Up right-handed frames.
///
/// `Z_UP → Y_UP: (x, y, z) ↦ (x, z, -y)`; `Y_UP → Z_UP: (x, y, z) ↦ (x, -z, y)`;
/// identity when the axes match.
pub fn axis_transform_matrix(from: UpAxis, to: UpAxis) -> Matrix4<f64> {
    if from == to {
        return Matrix4::identity();
    }
    match (from, to) {
        (UpAxis::ZUp, UpAxis::YUp) => Matrix4::new(
            1.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, -1.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ),
        _ => Matrix4::new(
            1.0, 0.0, 0.0, 0.0,
            0.0, 0.0, -1.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ),
    }
}

/// Apply a homogeneous transform to a 3D point.
pub fn transform_point(m: &Matrix4<f64>, p: Vector3<f64>) -> Vector3<f64> {
    (m * Vector4::new(p.x, p.y, p.z, 1.0)).xyz()
}

/// Rotate a metric ENU offset at (lon°, lat°) into an ECEF translation delta.
///
/// Used to shift a tileset root transform by an ENU offset without rebuilding
/// the whole matrix.
pub fn enu_offset_to_ecef(lon_deg: f64, lat_deg: f64, offset: Vector3<f64>) -> Vector3<f64> {
    let (sin_lat, cos_lat) = lat_deg.to_radians().sin_cos();
    let (sin_lon, cos_lon) = lon_deg.to_radians().sin_cos();

    Vector3::new(
        -sin_lon * offset.x - sin_lat * cos_lon * offset.y + cos_lat * cos_lon * offset.z,
        cos_lon * offset.x - sin_lat * sin_lon * offset.y + cos_lat * sin_lon * offset.z,
        cos_lat * offset.y + sin_lat * offset.z,
    )
}

/// Flatten a matrix into the serialized tileset layout: 16 doubles in
/// column-major order, translation in slots 12..14, 1 in slot 15.
pub fn to_column_major(m: &Matrix4<f64>) -> [f64; 16] {
    let mut out = [0.0; 16];
    out.copy_from_slice(m.as_slice());
    out
}

// Small-angle degree-free approximations used by the legacy tileset writer.
// One radian of latitude ~ 1/1.57891e-7 meters on the WGS84 sphere.

/// Approximate meters of northing for a latitude difference in radians.
pub fn lat_rad_to_meters(diff: f64) -> f64 {
    diff / 0.000000157891
}

/// Approximate meters of easting for a longitude difference in radians at a
/// latitude in radians.
pub fn lon_rad_to_meters(diff: f64, lat_rad: f64) -> f64 {
    diff / 0.000000156785 * lat_rad.cos()
}

/// Inverse of [`lat_rad_to_meters`].
pub fn meters_to_lat_rad(m: f64) -> f64 {
    m * 0.000000157891
}

/// Inverse of [`lon_rad_to_meters`].
pub fn meters_to_lon_rad(m: f64, lat_rad: f64) -> f64 {
    m * 0.000000156785 / lat_rad.cos()
}
