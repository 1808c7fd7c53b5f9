use crate::calibration::CalibrationController;
use crate::config::{NavSettings, SextantConfig};
use crate::fix::{FixAggregator, PositionFix};
use crate::orientation::OrientationTracker;
use crate::sighting::SightingRegistry;
use crate::solver::{HttpLopSolver, HttpPlateSolver, LopSolver, PlateSolver};
use crate::util::settings_store::{
    JsonFileStore, KEY_EST_LAT, KEY_EST_LON, KEY_PITCH_CALIBRATION_OFFSET, MemoryStore, SettingsStore, StoreError,
};
use crate::{info, warn};
use std::{path::PathBuf, sync::Arc};
use strum_macros::Display;
use tokio::{
    sync::{Mutex, watch},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Display)]
pub enum StartupError {
    Store(StoreError),
    Http(reqwest::Error),
}

impl std::error::Error for StartupError {}

impl From<StoreError> for StartupError {
    fn from(value: StoreError) -> Self { Self::Store(value) }
}

impl From<reqwest::Error> for StartupError {
    fn from(value: reqwest::Error) -> Self { Self::Http(value) }
}

#[derive(Debug, Display)]
pub enum PositionError {
    /// Latitude must lie in `[-90, 90]` and longitude in `[-180, 180]`.
    OutOfRange(f64, f64),
    Store(StoreError),
}

impl std::error::Error for PositionError {}

impl From<StoreError> for PositionError {
    fn from(value: StoreError) -> Self { Self::Store(value) }
}

/// Struct holding the key components of the sextant core: the orientation
/// tracker, the calibration controller, the sighting registry and the
/// running fix aggregator.
///
/// # Fields
/// - `store`: Persistent settings, holds the calibration offset.
/// - `nav_settings`: Navigation settings shared with all consumers.
/// - `tracker`: Derives orientation snapshots from sensor events.
/// - `calibration`: Runs zenith and horizon calibrations.
/// - `registry`: Holds the sightings and their analysis tasks.
/// - `fix_rx`: The latest position fix.
#[derive(Clone)]
pub struct Keychain {
    store: Arc<dyn SettingsStore>,
    nav_settings: Arc<watch::Sender<NavSettings>>,
    tracker: Arc<OrientationTracker>,
    calibration: Arc<CalibrationController>,
    registry: Arc<SightingRegistry>,
    fix_rx: watch::Receiver<Option<PositionFix>>,
    fix_c_tok: CancellationToken,
    fix_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Keychain {
    /// Creates all components from the process configuration, using the HTTP collaborators.
    ///
    /// # Errors
    /// A [`StartupError`] if the settings file is unreadable or an HTTP client cannot be built.
    pub fn new(config: &SextantConfig) -> Result<Self, StartupError> {
        let store: Arc<dyn SettingsStore> = match &config.settings_file {
            Some(path) => Arc::new(JsonFileStore::open(path)?),
            None => {
                warn!("No settings file configured, calibration will not survive restarts");
                Arc::new(MemoryStore::new())
            }
        };
        let plate_solver = Arc::new(HttpPlateSolver::new(&config.solver_url)?);
        let lop_solver = Arc::new(HttpLopSolver::new(&config.navigator_url)?);
        Ok(Self::with_collaborators(store, plate_solver, lop_solver, config.dump_dir.clone()))
    }

    /// Creates all components around the given collaborators and starts the fix aggregator.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_collaborators(
        store: Arc<dyn SettingsStore>,
        plate_solver: Arc<dyn PlateSolver>,
        lop_solver: Arc<dyn LopSolver>,
        dump_dir: Option<PathBuf>,
    ) -> Self {
        let (nav_tx, nav_rx) = watch::channel(NavSettings::from_store(store.as_ref()));
        let offset = store.get_f64(KEY_PITCH_CALIBRATION_OFFSET).unwrap_or(0.0);
        info!("Restored pitch calibration offset {offset:.2}°");

        let tracker = Arc::new(OrientationTracker::new(offset, nav_rx.clone()));
        let calibration = Arc::new(CalibrationController::new(Arc::clone(&tracker), Arc::clone(&store)));
        let registry = Arc::new(SightingRegistry::new(
            plate_solver,
            Arc::clone(&lop_solver),
            nav_rx.clone(),
            dump_dir.clone(),
        ));
        let aggregator = FixAggregator::new(Arc::clone(&registry), lop_solver, nav_rx, dump_dir);
        let fix_rx = aggregator.subscribe();
        let fix_c_tok = CancellationToken::new();
        let fix_handle = aggregator.spawn(fix_c_tok.clone());
        Self {
            store,
            nav_settings: Arc::new(nav_tx),
            tracker,
            calibration,
            registry,
            fix_rx,
            fix_c_tok,
            fix_handle: Arc::new(Mutex::new(Some(fix_handle))),
        }
    }

    /// Provides a cloned reference to the orientation tracker.
    pub fn tracker(&self) -> Arc<OrientationTracker> { Arc::clone(&self.tracker) }

    /// Provides a cloned reference to the calibration controller.
    pub fn calibration(&self) -> Arc<CalibrationController> { Arc::clone(&self.calibration) }

    /// Provides a cloned reference to the sighting registry.
    pub fn registry(&self) -> Arc<SightingRegistry> { Arc::clone(&self.registry) }

    pub fn fix(&self) -> Option<PositionFix> { self.fix_rx.borrow().clone() }

    pub fn subscribe_fix(&self) -> watch::Receiver<Option<PositionFix>> { self.fix_rx.clone() }

    pub fn nav_settings(&self) -> NavSettings { self.nav_settings.borrow().clone() }

    /// Replaces the navigation settings, effective for the next collaborator call.
    pub fn set_nav_settings(&self, settings: NavSettings) { self.nav_settings.send_replace(settings); }

    /// Updates and persists the estimated position.
    ///
    /// # Errors
    /// [`PositionError::OutOfRange`] for coordinates outside the valid ranges (NaN included),
    /// leaving the settings untouched.
    pub fn set_estimated_position(&self, lat_deg: f64, lon_deg: f64) -> Result<(), PositionError> {
        if !(-90.0..=90.0).contains(&lat_deg) || !(-180.0..=180.0).contains(&lon_deg) {
            return Err(PositionError::OutOfRange(lat_deg, lon_deg));
        }
        self.nav_settings.send_modify(|s| {
            s.est_lat_deg = lat_deg;
            s.est_lon_deg = lon_deg;
        });
        self.store.set_f64(KEY_EST_LAT, lat_deg)?;
        self.store.set_f64(KEY_EST_LON, lon_deg)?;
        info!("Estimated position set to {lat_deg:.4}°, {lon_deg:.4}°");
        Ok(())
    }

    /// Tears the pipeline down: stops calibration and the aggregator, cancels
    /// all sighting tasks and releases the collaborators.
    pub async fn shutdown(&self) {
        self.calibration.leave().await;
        self.fix_c_tok.cancel();
        if let Some(handle) = self.fix_handle.lock().await.take() {
            if let Err(e) = handle.await {
                warn!("Fix aggregator ended abnormally: {e}");
            }
        }
        self.registry.shutdown().await;
    }
}

#[cfg(test)]
mod tests;
