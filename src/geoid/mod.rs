//! Geoid undulation lookup and vertical-datum conversion.
//!
//! Heights in source data are often orthometric (above mean sea level) while
//! 3D Tiles positioning needs ellipsoidal heights. The conversion is
//! `h_ellipsoidal = h_orthometric + N(lat, lon)` with N the geoid undulation
//! from one of the EGM models.
//!
//! A process-global [`GeoidCalculator`] is provided because the grid is large
//! and read-mostly after initialization; the transformer reads it but never
//! owns it.

pub mod grid;

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{OnceLock, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::GeoidError;
use self::grid::GeoidGrid;

/// Earth gravitational models with distributed geoid grids.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeoidModel {
    /// No model; heights pass through unchanged.
    #[default]
    None,
    Egm84,
    Egm96,
    Egm2008,
}

impl GeoidModel {
    /// Parse from a case-insensitive model name.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" => Some(Self::None),
            "egm84" => Some(Self::Egm84),
            "egm96" => Some(Self::Egm96),
            "egm2008" => Some(Self::Egm2008),
            _ => None,
        }
    }

    /// GeographicLib grid file stem for this model.
    pub fn grid_name(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Egm84 => Some("egm84-15"),
            Self::Egm96 => Some("egm96-5"),
            Self::Egm2008 => Some("egm2008-5"),
        }
    }
}

impl fmt::Display for GeoidModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Egm84 => write!(f, "egm84"),
            Self::Egm96 => write!(f, "egm96"),
            Self::Egm2008 => write!(f, "egm2008"),
        }
    }
}

/// Which geoid model to apply and where its data files live.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoidConfig {
    pub enabled: bool,
    pub model: GeoidModel,
    /// Geoid data directory; `None` uses the default resolution of
    /// [`default_data_path`].
    pub data_path: Option<PathBuf>,
}

impl GeoidConfig {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn egm96(data_path: Option<PathBuf>) -> Self {
        Self {
            enabled: true,
            model: GeoidModel::Egm96,
            data_path,
        }
    }

    pub fn egm2008(data_path: Option<PathBuf>) -> Self {
        Self {
            enabled: true,
            model: GeoidModel::Egm2008,
            data_path,
        }
    }
}

/// Undulation lookups for one loaded geoid model.
#[derive(Default)]
pub struct GeoidCalculator {
    model: GeoidModel,
    grid: Option<GeoidGrid>,
}

impl GeoidCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the grid for `model` from `data_path`, or from the default data
    /// directory. `GeoidModel::None` clears any loaded grid and succeeds.
    pub fn initialize(
        &mut self,
        model: GeoidModel,
        data_path: Option<&Path>,
    ) -> Result<(), GeoidError> {
        let Some(name) = model.grid_name() else {
            self.model = GeoidModel::None;
            self.grid = None;
            info!("geoid model set to none, heights will pass through unchanged");
            return Ok(());
        };

        let dir = data_path.map(Path::to_path_buf).unwrap_or_else(default_data_path);
        let path = dir.join(format!("{name}.pgm"));
        info!(model = %model, path = %path.display(), "loading geoid grid");

        let grid = GeoidGrid::open(&path)?;
        info!(
            width = grid.width(),
            height = grid.height(),
            "geoid grid loaded"
        );

        self.model = model;
        self.grid = Some(grid);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.grid.is_some()
    }

    pub fn model(&self) -> GeoidModel {
        self.model
    }

    /// Geoid undulation N at (lat°, lon°) in meters. `None` when no grid is
    /// loaded or the location falls outside it.
    pub fn geoid_height(&self, lat: f64, lon: f64) -> Option<f64> {
        self.grid.as_ref()?.undulation(lat, lon)
    }

    /// `h_ellipsoidal = h_orthometric + N`; the height passes through when the
    /// lookup fails.
    pub fn orthometric_to_ellipsoidal(&self, lat: f64, lon: f64, orthometric: f64) -> f64 {
        match self.geoid_height(lat, lon) {
            Some(n) => orthometric + n,
            None => orthometric,
        }
    }

    /// `h_orthometric = h_ellipsoidal - N`; the height passes through when the
    /// lookup fails.
    pub fn ellipsoidal_to_orthometric(&self, lat: f64, lon: f64, ellipsoidal: f64) -> f64 {
        match self.geoid_height(lat, lon) {
            Some(n) => ellipsoidal - n,
            None => ellipsoidal,
        }
    }

    /// Build a calculator around an already-parsed grid.
    pub fn from_grid(model: GeoidModel, grid: GeoidGrid) -> Self {
        Self {
            model,
            grid: Some(grid),
        }
    }
}

/// Default geoid data directory: `GEOGRAPHICLIB_GEOID_PATH`, then
/// `GEOGRAPHICLIB_DATA/geoids`, then the platform install location.
pub fn default_data_path() -> PathBuf {
    if let Some(p) = env::var_os("GEOGRAPHICLIB_GEOID_PATH").filter(|p| !p.is_empty()) {
        return PathBuf::from(p);
    }
    if let Some(p) = env::var_os("GEOGRAPHICLIB_DATA").filter(|p| !p.is_empty()) {
        return PathBuf::from(p).join("geoids");
    }
    if cfg!(windows) {
        PathBuf::from("C:/ProgramData/GeographicLib/geoids")
    } else {
        PathBuf::from("/usr/local/share/GeographicLib/geoids")
    }
}

static GLOBAL: OnceLock<RwLock<GeoidCalculator>> = OnceLock::new();

/// The process-global geoid calculator. Read-mostly after initialization;
/// initialize it once before transforming.
pub fn global() -> &'static RwLock<GeoidCalculator> {
    GLOBAL.get_or_init(|| RwLock::new(GeoidCalculator::new()))
}

/// Initialize the process-global calculator.
pub fn initialize_global(model: GeoidModel, data_path: Option<&Path>) -> Result<(), GeoidError> {
    global()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .initialize(model, data_path)
}

/// Whether the process-global calculator has a grid loaded.
pub fn is_initialized() -> bool {
    global()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .is_initialized()
}

/// Undulation lookup against the process-global calculator.
pub fn geoid_height(lat: f64, lon: f64) -> Option<f64> {
    global()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .geoid_height(lat, lon)
}

/// Orthometric → ellipsoidal conversion against the process-global calculator.
pub fn orthometric_to_ellipsoidal(lat: f64, lon: f64, orthometric: f64) -> f64 {
    global()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .orthometric_to_ellipsoidal(lat, lon, orthometric)
}

/// Ellipsoidal → orthometric conversion against the process-global calculator.
pub fn ellipsoidal_to_orthometric(lat: f64, lon: f64, ellipsoidal: f64) -> f64 {
    global()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .ellipsoidal_to_orthometric(lat, lon, ellipsoidal)
}
