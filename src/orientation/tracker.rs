use super::{
    angles::{azimuth_pitch_roll, device_y_axis_from_rotation_matrix, pointing_vector_from_rotation_matrix},
    snapshot::{MotionSensor, OrientationSnapshot, RawSensorReadings, SensorAccuracy},
};
use crate::config::NavSettings;
use crate::util::math::helpers::{RotationMatrix, rotation_matrix_from_rotation_vector};
use crate::{event, info, warn};
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch};

/// Raw orientation input as delivered by the platform sensor.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum RotationInput {
    /// A row-major device-to-world rotation matrix.
    Matrix(RotationMatrix),
    /// A rotation vector sample, the scalar part `w` may be omitted.
    RotationVector { x: f64, y: f64, z: f64, w: Option<f64> },
}

impl RotationInput {
    fn to_matrix(self) -> Option<RotationMatrix> {
        match self {
            RotationInput::Matrix(m) => Some(m),
            RotationInput::RotationVector { x, y, z, w: Some(w) } => {
                rotation_matrix_from_rotation_vector(&[x, y, z, w])
            }
            RotationInput::RotationVector { x, y, z, w: None } => {
                rotation_matrix_from_rotation_vector(&[x, y, z])
            }
        }
    }
}

/// A single orientation sensor event.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OrientationEvent {
    pub rotation: RotationInput,
    pub accuracy: SensorAccuracy,
    pub timestamp: DateTime<Utc>,
}

/// Turns the raw orientation event stream into [`OrientationSnapshot`]s.
///
/// [`OrientationTracker::handle_event`] is meant to be called directly from
/// the sensor callback: it never awaits and never blocks on I/O. The latest
/// snapshot is published through a `watch` channel (atomic replace, readers
/// always see a complete value); every snapshot is additionally fanned out on
/// a `broadcast` channel for consumers that need each sample (calibration).
pub struct OrientationTracker {
    /// Latest derived orientation, `None` until the first usable event.
    snapshot_tx: watch::Sender<Option<OrientationSnapshot>>,
    /// Every derived orientation, in order.
    sample_tx: broadcast::Sender<OrientationSnapshot>,
    /// Active pitch calibration offset in degrees.
    pitch_offset: watch::Sender<f64>,
    /// Latest accuracy reported by either the event stream or the accuracy callback.
    accuracy: watch::Sender<SensorAccuracy>,
    /// Latest raw motion sensor readings, attached to every snapshot.
    raw_sensors: watch::Sender<RawSensorReadings>,
    /// Navigation settings, provides the magnetic declination.
    nav_settings: watch::Receiver<NavSettings>,
}

impl OrientationTracker {
    /// Capacity of the per-sample broadcast channel (several seconds at 50 Hz).
    const SAMPLE_CHANNEL_CAPACITY: usize = 512;

    /// Creates a new tracker applying `pitch_offset` to all derived pitches.
    pub fn new(pitch_offset: f64, nav_settings: watch::Receiver<NavSettings>) -> Self {
        let (snapshot_tx, _) = watch::channel(None);
        let (sample_tx, _) = broadcast::channel(Self::SAMPLE_CHANNEL_CAPACITY);
        let (offset_tx, _) = watch::channel(pitch_offset);
        let (accuracy_tx, _) = watch::channel(SensorAccuracy::Unreliable);
        let (raw_tx, _) = watch::channel(RawSensorReadings::default());
        Self {
            snapshot_tx,
            sample_tx,
            pitch_offset: offset_tx,
            accuracy: accuracy_tx,
            raw_sensors: raw_tx,
            nav_settings,
        }
    }

    /// Processes one raw sensor event and publishes the derived snapshot.
    ///
    /// # Returns
    /// The published snapshot, `None` if the event did not describe a usable
    /// orientation (malformed matrix), in which case the previous snapshot stays.
    pub fn handle_event(&self, ev: &OrientationEvent) -> Option<OrientationSnapshot> {
        self.update_accuracy(ev.accuracy);
        let Some(m) = ev.rotation.to_matrix().filter(|m| m.iter().all(|v| v.is_finite())) else {
            warn!("Dropping orientation event with malformed rotation at {}", ev.timestamp);
            return None;
        };
        let pointing = pointing_vector_from_rotation_matrix(&m);
        if pointing.abs_sq() < 0.5 {
            warn!("Dropping orientation event with degenerate camera axis at {}", ev.timestamp);
            return None;
        }
        let device_y = device_y_axis_from_rotation_matrix(&m);
        let declination = self.nav_settings.borrow().declination_deg;
        let angles = azimuth_pitch_roll(&pointing, &device_y, declination);
        let offset = *self.pitch_offset.borrow();
        let snapshot = OrientationSnapshot::new(
            pointing,
            angles.magnetic_azimuth_deg,
            angles.true_azimuth_deg,
            angles.pitch_deg,
            (angles.pitch_deg + offset).clamp(-90.0, 90.0),
            angles.roll_deg,
            ev.accuracy,
            ev.timestamp,
        )
        .with_raw_sensors(*self.raw_sensors.borrow());
        event!(
            "Orientation: az {:.2}, pitch {:.2} (raw {:.2}), roll {:.2}",
            snapshot.true_azimuth_deg(),
            snapshot.pitch_deg(),
            snapshot.raw_pitch_deg(),
            snapshot.roll_deg()
        );
        self.snapshot_tx.send_replace(Some(snapshot));
        // no subscribers outside of calibration sessions
        let _ = self.sample_tx.send(snapshot);
        Some(snapshot)
    }

    /// Records a raw accelerometer, gyroscope or magnetometer reading.
    ///
    /// Readings are not used for the orientation itself; they are attached to
    /// the following snapshots so sighting records carry them.
    pub fn handle_raw_reading(&self, sensor: MotionSensor, values: [f64; 3]) {
        if values.iter().any(|v| !v.is_finite()) {
            warn!("Dropping non-finite {sensor} reading");
            return;
        }
        self.raw_sensors.send_modify(|r| r.record(sensor, values));
    }

    pub fn raw_sensors(&self) -> RawSensorReadings { *self.raw_sensors.borrow() }

    /// Accuracy callback of the sensor, may arrive independently from events.
    pub fn handle_accuracy_changed(&self, accuracy: SensorAccuracy) { self.update_accuracy(accuracy); }

    fn update_accuracy(&self, accuracy: SensorAccuracy) {
        let changed = self.accuracy.send_if_modified(|current| {
            let changed = *current != accuracy;
            *current = accuracy;
            changed
        });
        if changed {
            info!("Orientation sensor accuracy changed to {accuracy}");
        }
    }

    /// Returns the latest snapshot.
    pub fn current(&self) -> Option<OrientationSnapshot> { *self.snapshot_tx.borrow() }

    /// Subscribes to the latest-value channel.
    pub fn subscribe(&self) -> watch::Receiver<Option<OrientationSnapshot>> { self.snapshot_tx.subscribe() }

    /// Subscribes to every future snapshot.
    pub fn subscribe_samples(&self) -> broadcast::Receiver<OrientationSnapshot> { self.sample_tx.subscribe() }

    /// Returns the currently applied pitch offset.
    pub fn pitch_offset(&self) -> f64 { *self.pitch_offset.borrow() }

    /// Replaces the applied pitch offset, effective from the next event on.
    pub fn set_pitch_offset(&self, offset: f64) {
        self.pitch_offset.send_replace(offset);
        info!("Pitch offset set to {offset:.2}°");
    }

    /// Returns the latest sensor accuracy.
    pub fn accuracy(&self) -> SensorAccuracy { *self.accuracy.borrow() }

    /// Returns a user facing hint if the sensor accuracy is degraded.
    pub fn accuracy_warning(&self) -> Option<String> {
        let accuracy = self.accuracy();
        if accuracy.is_degraded() {
            Some(format!(
                "Sensor accuracy is {accuracy}. Move the device in a figure-eight pattern to improve."
            ))
        } else {
            None
        }
    }
}
