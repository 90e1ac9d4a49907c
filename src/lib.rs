//! Geodetic coordinate engine for 3D Tiles conversion.
//!
//! Maps points from heterogeneous source coordinate systems — local Cartesian
//! frames, ENU tangent planes from oblique-photography metadata, and EPSG- or
//! WKT-defined CRSs — into a local East-North-Up frame, and emits the
//! ENU→ECEF matrix used as a tileset root transform.

pub mod coordinate_system;
pub mod ecef;
pub mod error;
pub mod geoid;
pub mod proj;
pub mod transformer;

pub use coordinate_system::{CoordinateSystem, GeoReference, Handedness, UpAxis, VerticalDatum};
pub use geoid::{GeoidConfig, GeoidModel};
pub use transformer::{CoordinateTransformer, TransformMode};
