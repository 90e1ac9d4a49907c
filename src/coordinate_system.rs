//! Source coordinate-system descriptors.
//!
//! A [`CoordinateSystem`] is an immutable tagged value describing where a
//! dataset's coordinates live: a bare local Cartesian frame (FBX, single
//! OSGB), an ENU tangent plane declared by oblique-photography metadata, or a
//! CRS identified by EPSG code or Well-Known Text. It carries no I/O and can
//! be copied freely.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which axis points up in a local Cartesian frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpAxis {
    /// Y axis up (FBX, glTF).
    #[default]
    YUp,
    /// Z axis up (OSGB).
    ZUp,
}

impl fmt::Display for UpAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpAxis::YUp => write!(f, "Y_UP"),
            UpAxis::ZUp => write!(f, "Z_UP"),
        }
    }
}

/// Chirality of a local Cartesian frame.
///
/// Left-handed frames are representable but not supported by the transformer;
/// they pass through unconverted with a logged warning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handedness {
    #[default]
    Right,
    Left,
}

impl fmt::Display for Handedness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handedness::Right => write!(f, "Right"),
            Handedness::Left => write!(f, "Left"),
        }
    }
}

/// Which surface heights are measured against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerticalDatum {
    /// Height above the WGS84 ellipsoid; no correction needed.
    Ellipsoidal,
    /// Height above the geoid (mean sea level); needs geoid correction.
    Orthometric,
    /// Not declared by the source; treated as orthometric when a geoid model
    /// is active.
    #[default]
    Unknown,
}

impl fmt::Display for VerticalDatum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerticalDatum::Ellipsoidal => write!(f, "Ellipsoidal"),
            VerticalDatum::Orthometric => write!(f, "Orthometric"),
            VerticalDatum::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A geographic anchor mapping a local frame's origin onto the earth.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoReference {
    /// Longitude in degrees.
    pub lon: f64,
    /// Latitude in degrees.
    pub lat: f64,
    /// Height in meters, measured against `datum`.
    pub height: f64,
    pub datum: VerticalDatum,
}

impl GeoReference {
    /// Anchor at (lon°, lat°, height m) with an ellipsoidal height.
    pub fn from_degrees(lon: f64, lat: f64, height: f64) -> Self {
        Self {
            lon,
            lat,
            height,
            datum: VerticalDatum::Ellipsoidal,
        }
    }

    pub fn with_datum(mut self, datum: VerticalDatum) -> Self {
        self.datum = datum;
        self
    }
}

/// Tagged descriptor of a source coordinate system and its origin.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum CoordinateSystem {
    /// Unknown or uninitialized; [`CoordinateSystem::is_valid`] is false.
    #[default]
    Unknown,
    /// A local Cartesian frame with no geographic meaning of its own.
    LocalCartesian {
        up_axis: UpAxis,
        handedness: Handedness,
    },
    /// An East-North-Up tangent plane centered at a geographic origin, with a
    /// metric SRSOrigin offset already baked into the dataset.
    Enu {
        /// Origin longitude in degrees.
        origin_lon: f64,
        /// Origin latitude in degrees.
        origin_lat: f64,
        /// Origin height in meters (ellipsoidal).
        origin_height: f64,
        /// SRSOrigin east offset in meters.
        offset_x: f64,
        /// SRSOrigin north offset in meters.
        offset_y: f64,
        /// SRSOrigin up offset in meters.
        offset_z: f64,
    },
    /// A CRS identified by EPSG code; axes in whatever order and units the
    /// code defines.
    Epsg {
        code: u32,
        origin_x: f64,
        origin_y: f64,
        origin_z: f64,
        vertical_datum: VerticalDatum,
    },
    /// A CRS defined by its Well-Known Text.
    Wkt {
        wkt: String,
        origin_x: f64,
        origin_y: f64,
        origin_z: f64,
        vertical_datum: VerticalDatum,
    },
}

impl CoordinateSystem {
    /// A local Cartesian frame (FBX, single OSGB); only axis orientation and
    /// handedness are known.
    pub fn local_cartesian(up_axis: UpAxis, handedness: Handedness) -> Self {
        CoordinateSystem::LocalCartesian {
            up_axis,
            handedness,
        }
    }

    /// An ENU tangent plane at (lon°, lat°, height m) with a metric SRSOrigin
    /// offset. Carries its own geographic reference.
    pub fn enu(
        origin_lon: f64,
        origin_lat: f64,
        origin_height: f64,
        offset_x: f64,
        offset_y: f64,
        offset_z: f64,
    ) -> Self {
        CoordinateSystem::Enu {
            origin_lon,
            origin_lat,
            origin_height,
            offset_x,
            offset_y,
            offset_z,
        }
    }

    /// A CRS identified by EPSG code, vertical datum undeclared.
    pub fn epsg(code: u32, origin_x: f64, origin_y: f64, origin_z: f64) -> Self {
        Self::epsg_with_datum(code, origin_x, origin_y, origin_z, VerticalDatum::Unknown)
    }

    pub fn epsg_with_datum(
        code: u32,
        origin_x: f64,
        origin_y: f64,
        origin_z: f64,
        vertical_datum: VerticalDatum,
    ) -> Self {
        CoordinateSystem::Epsg {
            code,
            origin_x,
            origin_y,
            origin_z,
            vertical_datum,
        }
    }

    /// A CRS defined by Well-Known Text, vertical datum undeclared.
    pub fn wkt(wkt: impl Into<String>, origin_x: f64, origin_y: f64, origin_z: f64) -> Self {
        Self::wkt_with_datum(wkt, origin_x, origin_y, origin_z, VerticalDatum::Unknown)
    }

    pub fn wkt_with_datum(
        wkt: impl Into<String>,
        origin_x: f64,
        origin_y: f64,
        origin_z: f64,
        vertical_datum: VerticalDatum,
    ) -> Self {
        CoordinateSystem::Wkt {
            wkt: wkt.into(),
            origin_x,
            origin_y,
            origin_z,
            vertical_datum,
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, CoordinateSystem::Unknown)
    }

    /// Whether points must go through the spatial-reference backend to reach
    /// WGS84 (EPSG and WKT systems).
    pub fn needs_projection(&self) -> bool {
        matches!(
            self,
            CoordinateSystem::Epsg { .. } | CoordinateSystem::Wkt { .. }
        )
    }

    /// Whether the system carries its own geographic reference (ENU systems).
    pub fn has_builtin_geo_reference(&self) -> bool {
        matches!(self, CoordinateSystem::Enu { .. })
    }

    /// The built-in geographic reference of an ENU system.
    pub fn builtin_geo_reference(&self) -> Option<GeoReference> {
        match self {
            CoordinateSystem::Enu {
                origin_lon,
                origin_lat,
                origin_height,
                ..
            } => Some(GeoReference::from_degrees(
                *origin_lon,
                *origin_lat,
                *origin_height,
            )),
            _ => None,
        }
    }

    /// The source origin as (x, y, z), with variant-dependent meaning: the
    /// SRSOrigin offset for ENU, the projected origin for EPSG/WKT, zeros
    /// otherwise.
    pub fn source_origin(&self) -> (f64, f64, f64) {
        match self {
            CoordinateSystem::Enu {
                offset_x,
                offset_y,
                offset_z,
                ..
            } => (*offset_x, *offset_y, *offset_z),
            CoordinateSystem::Epsg {
                origin_x,
                origin_y,
                origin_z,
                ..
            }
            | CoordinateSystem::Wkt {
                origin_x,
                origin_y,
                origin_z,
                ..
            } => (*origin_x, *origin_y, *origin_z),
            _ => (0.0, 0.0, 0.0),
        }
    }

    pub fn epsg_code(&self) -> Option<u32> {
        match self {
            CoordinateSystem::Epsg { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn wkt_string(&self) -> Option<&str> {
        match self {
            CoordinateSystem::Wkt { wkt, .. } => Some(wkt),
            _ => None,
        }
    }

    /// The vertical datum heights are measured against. ENU and local
    /// Cartesian heights are definitionally ellipsoidal.
    pub fn vertical_datum(&self) -> VerticalDatum {
        match self {
            CoordinateSystem::Epsg { vertical_datum, .. }
            | CoordinateSystem::Wkt { vertical_datum, .. } => *vertical_datum,
            CoordinateSystem::Enu { .. } | CoordinateSystem::LocalCartesian { .. } => {
                VerticalDatum::Ellipsoidal
            }
            CoordinateSystem::Unknown => VerticalDatum::Unknown,
        }
    }

    /// Set the vertical datum. Only EPSG and WKT systems carry one; the call
    /// is a no-op on every other variant.
    pub fn set_vertical_datum(&mut self, datum: VerticalDatum) {
        match self {
            CoordinateSystem::Epsg { vertical_datum, .. }
            | CoordinateSystem::Wkt { vertical_datum, .. } => *vertical_datum = datum,
            _ => {}
        }
    }

    /// Up axis of the frame. Every non-local-Cartesian variant is Y-Up, in
    /// line with glTF and 3D Tiles.
    pub fn up_axis(&self) -> UpAxis {
        match self {
            CoordinateSystem::LocalCartesian { up_axis, .. } => *up_axis,
            _ => UpAxis::YUp,
        }
    }

    pub fn handedness(&self) -> Handedness {
        match self {
            CoordinateSystem::LocalCartesian { handedness, .. } => *handedness,
            _ => Handedness::Right,
        }
    }
}

impl fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinateSystem::Unknown => write!(f, "CoordinateSystem(Unknown)"),
            CoordinateSystem::LocalCartesian {
                up_axis,
                handedness,
            } => write!(
                f,
                "CoordinateSystem(LocalCartesian, up_axis={up_axis}, handedness={handedness})"
            ),
            CoordinateSystem::Enu {
                origin_lon,
                origin_lat,
                origin_height,
                offset_x,
                offset_y,
                offset_z,
            } => write!(
                f,
                "CoordinateSystem(ENU, origin=({origin_lon}, {origin_lat}, {origin_height}), \
                 offset=({offset_x}, {offset_y}, {offset_z}))"
            ),
            CoordinateSystem::Epsg {
                code,
                origin_x,
                origin_y,
                origin_z,
                vertical_datum,
            } => write!(
                f,
                "CoordinateSystem(EPSG:{code}, origin=({origin_x}, {origin_y}, {origin_z}), \
                 datum={vertical_datum})"
            ),
            CoordinateSystem::Wkt {
                origin_x,
                origin_y,
                origin_z,
                vertical_datum,
                ..
            } => write!(
                f,
                "CoordinateSystem(WKT, origin=({origin_x}, {origin_y}, {origin_z}), \
                 datum={vertical_datum})"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_local_cartesian_creation() {
        let cs = CoordinateSystem::local_cartesian(UpAxis::YUp, Handedness::Right);
        assert!(cs.is_valid());
        assert_eq!(cs.up_axis(), UpAxis::YUp);
        assert_eq!(cs.handedness(), Handedness::Right);
        assert!(!cs.needs_projection());
        assert!(!cs.has_builtin_geo_reference());

        let cs_zup = CoordinateSystem::local_cartesian(UpAxis::ZUp, Handedness::Right);
        assert_eq!(cs_zup.up_axis(), UpAxis::ZUp);
    }

    #[test]
    fn test_enu_creation() {
        let cs = CoordinateSystem::enu(117.0, 35.0, 0.0, -958.0, -993.0, 69.0);
        assert!(cs.is_valid());
        assert!(!cs.needs_projection());
        assert!(cs.has_builtin_geo_reference());

        let geo_ref = cs.builtin_geo_reference().unwrap();
        assert_relative_eq!(geo_ref.lon, 117.0, epsilon = 1e-6);
        assert_relative_eq!(geo_ref.lat, 35.0, epsilon = 1e-6);
        assert_eq!(geo_ref.datum, VerticalDatum::Ellipsoidal);

        let (ox, oy, oz) = cs.source_origin();
        assert_relative_eq!(ox, -958.0, epsilon = 1e-6);
        assert_relative_eq!(oy, -993.0, epsilon = 1e-6);
        assert_relative_eq!(oz, 69.0, epsilon = 1e-6);
    }

    #[test]
    fn test_epsg_creation() {
        let cs = CoordinateSystem::epsg(4326, 117.0, 35.0, 0.0);
        assert!(cs.is_valid());
        assert!(cs.needs_projection());
        assert!(!cs.has_builtin_geo_reference());
        assert_eq!(cs.epsg_code(), Some(4326));

        let (ox, _, _) = cs.source_origin();
        assert_relative_eq!(ox, 117.0, epsilon = 1e-6);
    }

    #[test]
    fn test_wkt_creation() {
        let wkt = "GEOGCS[\"WGS 84\",DATUM[\"WGS_1984\",SPHEROID[\"WGS 84\",6378137,298.257223563]],PRIMEM[\"Greenwich\",0],UNIT[\"degree\",0.0174532925199433]]";
        let cs = CoordinateSystem::wkt(wkt, 117.0, 35.0, 0.0);
        assert!(cs.is_valid());
        assert!(cs.needs_projection());
        assert!(cs.wkt_string().unwrap().contains("WGS 84"));
    }

    #[test]
    fn test_default_is_invalid() {
        let cs = CoordinateSystem::default();
        assert!(!cs.is_valid());
        assert!(!cs.needs_projection());
        assert!(!cs.has_builtin_geo_reference());
        assert_eq!(cs.source_origin(), (0.0, 0.0, 0.0));
        assert_eq!(cs.vertical_datum(), VerticalDatum::Unknown);
    }

    #[test]
    fn test_vertical_datum_set_get() {
        let mut cs =
            CoordinateSystem::epsg_with_datum(4545, 500000.0, 3000000.0, 0.0, VerticalDatum::Orthometric);
        assert_eq!(cs.vertical_datum(), VerticalDatum::Orthometric);

        cs.set_vertical_datum(VerticalDatum::Ellipsoidal);
        assert_eq!(cs.vertical_datum(), VerticalDatum::Ellipsoidal);

        let mut cs_enu = CoordinateSystem::enu(117.0, 35.0, 0.0, 0.0, 0.0, 0.0);
        assert_eq!(cs_enu.vertical_datum(), VerticalDatum::Ellipsoidal);
        cs_enu.set_vertical_datum(VerticalDatum::Orthometric);
        assert_eq!(cs_enu.vertical_datum(), VerticalDatum::Ellipsoidal);
    }

    #[test]
    fn test_up_axis_defaults() {
        assert_eq!(
            CoordinateSystem::epsg(4326, 0.0, 0.0, 0.0).up_axis(),
            UpAxis::YUp
        );
        assert_eq!(
            CoordinateSystem::enu(0.0, 0.0, 0.0, 0.0, 0.0, 0.0).handedness(),
            Handedness::Right
        );
    }

    #[test]
    fn test_display() {
        let cs = CoordinateSystem::local_cartesian(UpAxis::ZUp, Handedness::Right);
        let s = cs.to_string();
        assert!(s.contains("LocalCartesian"));
        assert!(s.contains("Z_UP"));

        let cs = CoordinateSystem::epsg(4326, 0.0, 0.0, 0.0);
        assert!(cs.to_string().contains("EPSG:4326"));

        let cs = CoordinateSystem::enu(117.0, 35.0, 0.0, -958.0, -993.0, 69.0);
        assert!(cs.to_string().contains("ENU"));
    }

    #[test]
    fn test_geo_reference() {
        let geo_ref = GeoReference::from_degrees(120.0, 30.0, 100.0);
        assert_relative_eq!(geo_ref.lon, 120.0, epsilon = 1e-6);
        assert_relative_eq!(geo_ref.lat, 30.0, epsilon = 1e-6);
        assert_relative_eq!(geo_ref.height, 100.0, epsilon = 1e-6);
        assert_eq!(geo_ref.datum, VerticalDatum::Ellipsoidal);

        let geo_ref = geo_ref.with_datum(VerticalDatum::Orthometric);
        assert_eq!(geo_ref.datum, VerticalDatum::Orthometric);
    }
}
