//! Coordinate transformer: source coordinate systems to WGS84, ECEF and a
//! local East-North-Up frame.
//!
//! A [`CoordinateTransformer`] is built once per source dataset. Construction
//! resolves the geographic origin, computes the ENU↔ECEF rigid-body pair
//! there and caches the axis transform; every subsequent operation is a pure
//! computation over that cached state. Transformers are move-only and own
//! their projection handle; independent instances can run on different
//! threads.
//!
//! Failure semantics degrade rather than abort: a missing projection backend
//! or geoid grid turns the affected stage into a pass-through with a logged
//! warning, because a mis-georeferenced tile is preferable to no output.

use nalgebra::{Matrix4, Vector3};
use tracing::{debug, info, warn};

use crate::coordinate_system::{CoordinateSystem, GeoReference, Handedness, UpAxis, VerticalDatum};
use crate::ecef;
use crate::geoid::{self, GeoidConfig};
use crate::proj::crs::CrsToWgs84;
use crate::proj::Wgs84Projection;

/// Whether a transformer carries a geographic reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransformMode {
    /// Axis conversion only (pure format conversion, e.g. OSGB → glTF).
    None,
    /// Full geographic transformation chain (3D Tiles output).
    WithGeoReference,
}

pub struct CoordinateTransformer {
    source_cs: CoordinateSystem,
    mode: TransformMode,

    /// Geographic origin (WGS84, degrees / ellipsoidal meters).
    geo_origin_lon: f64,
    geo_origin_lat: f64,
    geo_origin_height: f64,

    enu_to_ecef: Matrix4<f64>,
    ecef_to_enu: Matrix4<f64>,
    axis_transform: Matrix4<f64>,

    projection: Option<Box<dyn Wgs84Projection>>,
    geoid_config: GeoidConfig,
}

impl CoordinateTransformer {
    /// Axis-conversion-only transformer. Geographic operations log a warning
    /// and return their input unchanged.
    pub fn new(source_cs: CoordinateSystem) -> Self {
        Self {
            axis_transform: ecef::axis_transform_matrix(source_cs.up_axis(), UpAxis::YUp),
            source_cs,
            mode: TransformMode::None,
            geo_origin_lon: 0.0,
            geo_origin_lat: 0.0,
            geo_origin_height: 0.0,
            enu_to_ecef: Matrix4::identity(),
            ecef_to_enu: Matrix4::identity(),
            projection: None,
            geoid_config: GeoidConfig::disabled(),
        }
    }

    /// Transformer with a geographic reference and geoid correction disabled.
    pub fn with_geo_reference(source_cs: CoordinateSystem, geo_ref: GeoReference) -> Self {
        Self::with_geoid(source_cs, geo_ref, GeoidConfig::disabled())
    }

    /// Transformer with a geographic reference and a geoid configuration.
    pub fn with_geoid(
        source_cs: CoordinateSystem,
        geo_ref: GeoReference,
        geoid_config: GeoidConfig,
    ) -> Self {
        let projection = Self::build_projection(&source_cs);
        Self::assemble(source_cs, geo_ref, geoid_config, projection)
    }

    /// Transformer with a caller-supplied projection handle instead of the
    /// proj4rs-backed default.
    pub fn with_projection(
        source_cs: CoordinateSystem,
        geo_ref: GeoReference,
        geoid_config: GeoidConfig,
        projection: Box<dyn Wgs84Projection>,
    ) -> Self {
        Self::assemble(source_cs, geo_ref, geoid_config, Some(projection))
    }

    fn assemble(
        source_cs: CoordinateSystem,
        geo_ref: GeoReference,
        geoid_config: GeoidConfig,
        projection: Option<Box<dyn Wgs84Projection>>,
    ) -> Self {
        let mut t = Self {
            axis_transform: ecef::axis_transform_matrix(source_cs.up_axis(), UpAxis::YUp),
            source_cs,
            mode: TransformMode::WithGeoReference,
            geo_origin_lon: 0.0,
            geo_origin_lat: 0.0,
            geo_origin_height: 0.0,
            enu_to_ecef: Matrix4::identity(),
            ecef_to_enu: Matrix4::identity(),
            projection,
            geoid_config,
        };
        t.initialize_with_geo_ref(geo_ref);
        t
    }

    fn build_projection(source_cs: &CoordinateSystem) -> Option<Box<dyn Wgs84Projection>> {
        let handle = match source_cs {
            CoordinateSystem::Epsg { code, .. } => CrsToWgs84::from_epsg(*code),
            CoordinateSystem::Wkt { wkt, .. } => CrsToWgs84::from_wkt(wkt),
            _ => return None,
        };
        match handle {
            Ok(h) => {
                debug!(source = %source_cs, "projection handle created");
                Some(Box::new(h) as Box<dyn Wgs84Projection>)
            }
            Err(e) => {
                warn!(
                    source = %source_cs,
                    error = %e,
                    "failed to create projection handle; EPSG/WKT transforms will pass through"
                );
                None
            }
        }
    }

    fn initialize_with_geo_ref(&mut self, geo_ref: GeoReference) {
        if self.source_cs.handedness() == Handedness::Left {
            warn!("left-handed source frames are not supported; coordinates pass through unconverted");
        }

        match &self.source_cs {
            CoordinateSystem::Enu {
                origin_lon,
                origin_lat,
                origin_height,
                ..
            } => {
                self.geo_origin_lon = *origin_lon;
                self.geo_origin_lat = *origin_lat;
                self.geo_origin_height = *origin_height;
            }
            CoordinateSystem::Epsg { .. } | CoordinateSystem::Wkt { .. } => {
                if geo_ref.lon != 0.0 || geo_ref.lat != 0.0 {
                    // Caller already resolved the origin; trust it, but still
                    // lift an orthometric height onto the ellipsoid
                    self.geo_origin_lon = geo_ref.lon;
                    self.geo_origin_lat = geo_ref.lat;
                    self.geo_origin_height =
                        self.apply_geoid_correction(geo_ref.lat, geo_ref.lon, geo_ref.height);
                } else {
                    let (ox, oy, oz) = self.source_cs.source_origin();
                    let (lon, lat, h) = self.project_to_wgs84(ox, oy, oz);
                    self.geo_origin_lon = lon;
                    self.geo_origin_lat = lat;
                    self.geo_origin_height = self.apply_geoid_correction(lat, lon, h);
                }
                info!(
                    lon = self.geo_origin_lon,
                    lat = self.geo_origin_lat,
                    height = self.geo_origin_height,
                    "projected geographic origin"
                );
            }
            _ => {
                // Local Cartesian (or unknown): caller-supplied anchor, verbatim
                self.geo_origin_lon = geo_ref.lon;
                self.geo_origin_lat = geo_ref.lat;
                self.geo_origin_height = geo_ref.height;
            }
        }

        self.enu_to_ecef = ecef::enu_to_ecef_matrix(
            self.geo_origin_lon,
            self.geo_origin_lat,
            self.geo_origin_height,
        );
        // The rigid-body matrix is always invertible; identity is the
        // never-taken degradation path
        self.ecef_to_enu = self
            .enu_to_ecef
            .try_inverse()
            .unwrap_or_else(Matrix4::identity);

        info!(
            lon = self.geo_origin_lon,
            lat = self.geo_origin_lat,
            height = self.geo_origin_height,
            "coordinate transformer initialized"
        );
    }

    // ----- mode -----

    pub fn mode(&self) -> TransformMode {
        self.mode
    }

    pub fn has_geo_reference(&self) -> bool {
        self.mode == TransformMode::WithGeoReference
    }

    pub fn source_coordinate_system(&self) -> &CoordinateSystem {
        &self.source_cs
    }

    // ----- coordinate transformations (geo-reference mode only) -----

    /// Transform a point to WGS84 geographic coordinates (lon°, lat°, h).
    ///
    /// For ENU and local Cartesian sources this is the documented
    /// approximation `(origin_lon, origin_lat, origin_height + p.z)` rather
    /// than a true inverse; it exists for logging and diagnostics.
    pub fn to_wgs84(&self, point: Vector3<f64>) -> Vector3<f64> {
        if !self.has_geo_reference() {
            warn!("to_wgs84 called on a transformer without a geographic reference");
            return point;
        }

        let p = ecef::transform_point(&self.axis_transform, point);

        match &self.source_cs {
            CoordinateSystem::Epsg { .. } | CoordinateSystem::Wkt { .. }
                if self.projection.is_some() =>
            {
                let (ox, oy, oz) = self.source_cs.source_origin();
                let (lon, lat, h) = self.project_to_wgs84(p.x + ox, p.y + oy, p.z + oz);
                Vector3::new(lon, lat, h)
            }
            _ => Vector3::new(
                self.geo_origin_lon,
                self.geo_origin_lat,
                self.geo_origin_height + p.z,
            ),
        }
    }

    /// Transform a point to ECEF.
    pub fn to_ecef(&self, point: Vector3<f64>) -> Vector3<f64> {
        if !self.has_geo_reference() {
            warn!("to_ecef called on a transformer without a geographic reference");
            return point;
        }

        match &self.source_cs {
            CoordinateSystem::Enu {
                offset_x,
                offset_y,
                offset_z,
                ..
            } => {
                let shifted = point + Vector3::new(*offset_x, *offset_y, *offset_z);
                ecef::transform_point(&self.enu_to_ecef, shifted)
            }
            CoordinateSystem::Epsg { .. } | CoordinateSystem::Wkt { .. }
                if self.projection.is_some() =>
            {
                let (ox, oy, oz) = self.source_cs.source_origin();
                let (lon, lat, h) =
                    self.project_to_wgs84(point.x + ox, point.y + oy, point.z + oz);
                let h = self.apply_geoid_correction(lat, lon, h);
                ecef::cartographic_to_ecef(lon, lat, h)
            }
            _ => {
                let wgs = self.to_wgs84(point);
                ecef::cartographic_to_ecef(wgs.x, wgs.y, wgs.z)
            }
        }
    }

    /// Transform a point to the local East-North-Up frame at the geographic
    /// origin. This is the coordinate system 3D Tiles content is written in.
    pub fn to_local_enu(&self, point: Vector3<f64>) -> Vector3<f64> {
        if !self.has_geo_reference() {
            warn!("to_local_enu called on a transformer without a geographic reference");
            return point;
        }

        match &self.source_cs {
            CoordinateSystem::Enu {
                offset_x,
                offset_y,
                offset_z,
                ..
            } => {
                // Dataset points are relative to the SRSOrigin; restore the
                // offset, then reproject through ECEF into the local frame
                let shifted = point + Vector3::new(*offset_x, *offset_y, *offset_z);
                let ecef_p = ecef::transform_point(&self.enu_to_ecef, shifted);
                ecef::transform_point(&self.ecef_to_enu, ecef_p)
            }
            CoordinateSystem::Epsg { .. } | CoordinateSystem::Wkt { .. }
                if self.projection.is_some() =>
            {
                let (ox, oy, oz) = self.source_cs.source_origin();
                let (lon, lat, h) =
                    self.project_to_wgs84(point.x + ox, point.y + oy, point.z + oz);
                let h = self.apply_geoid_correction(lat, lon, h);
                let ecef_p = ecef::cartographic_to_ecef(lon, lat, h);
                ecef::transform_point(&self.ecef_to_enu, ecef_p)
            }
            // Local Cartesian input is already local; no geographic
            // projection applies
            _ => point,
        }
    }

    /// In-place batch form of [`Self::to_wgs84`].
    pub fn transform_to_wgs84(&self, points: &mut [Vector3<f64>]) {
        for p in points.iter_mut() {
            *p = self.to_wgs84(*p);
        }
    }

    /// In-place batch form of [`Self::to_local_enu`].
    pub fn transform_to_local_enu(&self, points: &mut [Vector3<f64>]) {
        for p in points.iter_mut() {
            *p = self.to_local_enu(*p);
        }
    }

    // ----- axis conversion (all modes) -----

    /// Rotate a point from the source frame's up-axis to `target`, in a
    /// right-handed frame. Available regardless of mode.
    pub fn convert_up_axis(&self, point: Vector3<f64>, target: UpAxis) -> Vector3<f64> {
        let m = ecef::axis_transform_matrix(self.source_cs.up_axis(), target);
        ecef::transform_point(&m, point)
    }

    // ----- matrices and origin -----

    pub fn enu_to_ecef_matrix(&self) -> &Matrix4<f64> {
        &self.enu_to_ecef
    }

    pub fn ecef_to_enu_matrix(&self) -> &Matrix4<f64> {
        &self.ecef_to_enu
    }

    /// The ENU→ECEF matrix in the serialized tileset layout: 16 doubles,
    /// column-major, translation in slots 12..14. Emitted verbatim as the
    /// 3D Tiles root `transform` array.
    pub fn root_transform(&self) -> [f64; 16] {
        ecef::to_column_major(&self.enu_to_ecef)
    }

    /// Geographic origin longitude in degrees.
    pub fn geo_origin_lon(&self) -> f64 {
        self.geo_origin_lon
    }

    /// Geographic origin latitude in degrees.
    pub fn geo_origin_lat(&self) -> f64 {
        self.geo_origin_lat
    }

    /// Geographic origin height in meters (ellipsoidal).
    pub fn geo_origin_height(&self) -> f64 {
        self.geo_origin_height
    }

    // ----- geoid configuration -----

    /// Toggle geoid correction. Mutating; set before sharing the transformer
    /// across threads.
    pub fn set_geoid_correction(&mut self, enabled: bool) {
        self.geoid_config.enabled = enabled;
    }

    pub fn geoid_correction_enabled(&self) -> bool {
        self.geoid_config.enabled
    }

    pub fn geoid_config(&self) -> &GeoidConfig {
        &self.geoid_config
    }

    // ----- internals -----

    fn project_to_wgs84(&self, x: f64, y: f64, z: f64) -> (f64, f64, f64) {
        match &self.projection {
            Some(p) => match p.to_wgs84(x, y, z) {
                Ok(r) => r,
                Err(e) => {
                    warn!(error = %e, "projection failed; passing coordinates through");
                    (x, y, z)
                }
            },
            None => (x, y, z),
        }
    }

    fn should_apply_geoid_correction(&self) -> bool {
        if !self.geoid_config.enabled {
            return false;
        }
        // ENU and local Cartesian heights are definitionally ellipsoidal
        if !self.source_cs.needs_projection() {
            return false;
        }
        if !matches!(
            self.source_cs.vertical_datum(),
            VerticalDatum::Orthometric | VerticalDatum::Unknown
        ) {
            return false;
        }
        let calc = geoid::global()
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        calc.is_initialized() && calc.model() == self.geoid_config.model
    }

    fn apply_geoid_correction(&self, lat: f64, lon: f64, height: f64) -> f64 {
        if !self.should_apply_geoid_correction() {
            return height;
        }
        let corrected = geoid::global()
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .orthometric_to_ellipsoidal(lat, lon, height);
        debug!(
            orthometric = height,
            ellipsoidal = corrected,
            "geoid correction applied"
        );
        corrected
    }
}
