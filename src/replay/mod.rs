use crate::keychain::Keychain;
use crate::orientation::{MotionSensor, OrientationEvent, SensorAccuracy};
use crate::sighting::{CaptureSource, Sighting, SightingId};
use crate::{error, info, log, warn};
use std::{collections::HashMap, path::Path, time::Duration};
use strum_macros::Display;
use tokio::time::Instant;


/// One recorded user or sensor action.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplayAction {
    Orientation { event: OrientationEvent },
    Accuracy { accuracy: SensorAccuracy },
    RawReading { sensor: MotionSensor, values: [f64; 3] },
    /// Captures a sighting with the orientation current at that moment.
    /// `label` names the sighting for later removal.
    Capture { image_reference: String, source: CaptureSource, label: Option<String> },
    Remove { label: String },
    RemoveAll,
    BeginCalibration,
    ConfirmCalibration,
    LeaveCalibration,
    HorizonCalibration { height_of_eye_m: f64 },
    EstimatedPosition { lat_deg: f64, lon_deg: f64 },
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct ReplayStep {
    /// Offset from the start of the replay.
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: ReplayAction,
}

/// A recorded session.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct ReplaySession {
    pub steps: Vec<ReplayStep>,
    /// Time granted to pending analyses after the last step.
    #[serde(default = "ReplaySession::default_settle_ms")]
    pub settle_ms: u64,
}

impl ReplaySession {
    fn default_settle_ms() -> u64 { 30_000 }
}

#[derive(Debug, Display)]
pub enum ReplayError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl std::error::Error for ReplayError {}

impl From<std::io::Error> for ReplayError {
    fn from(value: std::io::Error) -> Self { Self::Io(value) }
}

impl From<serde_json::Error> for ReplayError {
    fn from(value: serde_json::Error) -> Self { Self::Parse(value) }
}

/// Reads a session file.
pub fn load_session(path: &Path) -> Result<ReplaySession, ReplayError> {
    let raw = std::fs::read(path)?;
    let mut session: ReplaySession = serde_json::from_slice(&raw)?;
    session.steps.sort_by_key(|s| s.at_ms);
    Ok(session)
}

/// Plays `session` against `keychain` in real time.
///
/// # Returns
/// The sightings left in the registry after all analyses settled.
pub async fn run_session(keychain: &Keychain, session: &ReplaySession) -> Vec<Sighting> {
    let start = Instant::now();
    let mut labels: HashMap<String, SightingId> = HashMap::new();
    let tracker = keychain.tracker();
    let calibration = keychain.calibration();
    let registry = keychain.registry();

    for step in &session.steps {
        tokio::time::sleep_until(start + Duration::from_millis(step.at_ms)).await;
        match &step.action {
            ReplayAction::Orientation { event } => {
                tracker.handle_event(event);
            }
            ReplayAction::Accuracy { accuracy } => tracker.handle_accuracy_changed(*accuracy),
            ReplayAction::RawReading { sensor, values } => tracker.handle_raw_reading(*sensor, *values),
            ReplayAction::Capture { image_reference, source, label } => {
                let Some(snapshot) = tracker.current() else {
                    warn!("No orientation available, skipping capture of {image_reference}");
                    continue;
                };
                match registry.add_sighting(image_reference.clone(), snapshot, *source).await {
                    Ok(id) => {
                        if let Some(label) = label {
                            labels.insert(label.clone(), id);
                        }
                    }
                    Err(e) => warn!("Capture of {image_reference} rejected: {e}"),
                }
            }
            ReplayAction::Remove { label } => match labels.remove(label) {
                Some(id) => {
                    if let Err(e) = registry.remove_sighting(id).await {
                        warn!("Removing {label} failed: {e}");
                    }
                }
                None => warn!("Unknown sighting label {label}"),
            },
            ReplayAction::RemoveAll => {
                registry.remove_all().await;
                labels.clear();
            }
            ReplayAction::BeginCalibration => calibration.begin().await,
            ReplayAction::ConfirmCalibration => {
                if let Err(e) = calibration.start_sampling().await {
                    warn!("Calibration could not start: {e}");
                }
            }
            ReplayAction::LeaveCalibration => calibration.leave().await,
            ReplayAction::HorizonCalibration { height_of_eye_m } => {
                if let Err(e) = calibration.calibrate_to_horizon(*height_of_eye_m).await {
                    warn!("Horizon calibration failed: {e}");
                }
            }
            ReplayAction::EstimatedPosition { lat_deg, lon_deg } => {
                if let Err(e) = keychain.set_estimated_position(*lat_deg, *lon_deg) {
                    error!("Estimated position rejected: {e}");
                }
            }
        }
    }
    log!("All {} steps replayed, waiting for analyses", session.steps.len());

    let mut view_rx = registry.subscribe();
    let settled = tokio::time::timeout(
        Duration::from_millis(session.settle_ms),
        view_rx.wait_for(|v| v.iter().all(Sighting::is_terminal)),
    )
    .await
    .is_ok();
    if !settled {
        warn!("Analyses did not settle within {} ms", session.settle_ms);
    }
    let sightings = registry.sightings();
    info!("Replay finished with {} sightings", sightings.len());
    sightings
}
