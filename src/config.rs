use crate::util::settings_store::{KEY_EST_LAT, KEY_EST_LON, SettingsStore};
use std::{env, path::PathBuf, time::Duration};

/// Environment variable holding the base URL of the plate solver service.
pub const ENV_SOLVER_URL: &str = "SEXTANT_SOLVER_URL";
/// Environment variable holding the base URL of the sight reduction service.
pub const ENV_NAVIGATOR_URL: &str = "SEXTANT_NAVIGATOR_URL";
/// Environment variable pointing to the JSON settings file.
pub const ENV_SETTINGS_FILE: &str = "SEXTANT_SETTINGS_FILE";
/// Environment variable pointing to the directory receiving sighting JSON records.
pub const ENV_DUMP_DIR: &str = "SEXTANT_DUMP_DIR";

const DEF_SOLVER_URL: &str = "http://localhost:33100";
const DEF_NAVIGATOR_URL: &str = "http://localhost:33101";

/// Process level configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct SextantConfig {
    pub solver_url: String,
    pub navigator_url: String,
    pub settings_file: Option<PathBuf>,
    pub dump_dir: Option<PathBuf>,
}

impl SextantConfig {
    /// Builds the configuration from the environment, falling back to local defaults.
    pub fn from_env() -> Self {
        let solver_url = env::var(ENV_SOLVER_URL).unwrap_or_else(|_| DEF_SOLVER_URL.to_string());
        let navigator_url =
            env::var(ENV_NAVIGATOR_URL).unwrap_or_else(|_| DEF_NAVIGATOR_URL.to_string());
        Self {
            solver_url,
            navigator_url,
            settings_file: env::var(ENV_SETTINGS_FILE).ok().map(PathBuf::from),
            dump_dir: env::var(ENV_DUMP_DIR).ok().map(PathBuf::from),
        }
    }
}

/// Navigation settings consumed by the sighting pipeline and the fix aggregator.
///
/// Shared through a `watch` channel; tasks always read the latest value right
/// before calling a collaborator.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NavSettings {
    /// Estimated latitude in degrees, north positive.
    pub est_lat_deg: f64,
    /// Estimated longitude in degrees, sign given by `lon_east_positive`.
    pub est_lon_deg: f64,
    /// Longitude convention handed to the sight reduction service.
    pub lon_east_positive: bool,
    /// Magnetic declination in degrees, east positive.
    pub declination_deg: f64,
    /// Time budget handed to the plate solver.
    pub solve_timeout: Duration,
}

impl NavSettings {
    const DEF_EST_LAT: f64 = 49.49;
    const DEF_EST_LON: f64 = 0.11;
    const DEF_SOLVE_TIMEOUT: Duration = Duration::from_secs(10);

    /// Restores the persisted estimated position, defaults for everything else.
    pub fn from_store(store: &dyn SettingsStore) -> Self {
        Self {
            est_lat_deg: store.get_f64(KEY_EST_LAT).unwrap_or(Self::DEF_EST_LAT),
            est_lon_deg: store.get_f64(KEY_EST_LON).unwrap_or(Self::DEF_EST_LON),
            ..Self::default()
        }
    }
}

impl Default for NavSettings {
    fn default() -> Self {
        Self {
            est_lat_deg: Self::DEF_EST_LAT,
            est_lon_deg: Self::DEF_EST_LON,
            lon_east_positive: true,
            declination_deg: 0.0,
            solve_timeout: Self::DEF_SOLVE_TIMEOUT,
        }
    }
}
