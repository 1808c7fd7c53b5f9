use crate::util::math::vec3d::Vec3D;
use chrono::{DateTime, Utc};
use strum_macros::{Display, EnumIter};

/// Reliability level reported by the orientation sensor.
#[derive(
    Debug, Display, EnumIter, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum SensorAccuracy {
    Unreliable,
    Low,
    Medium,
    High,
}

impl SensorAccuracy {
    /// Returns `true` if azimuth and roll derived at this level should not be trusted.
    pub fn is_degraded(self) -> bool { self <= SensorAccuracy::Low }
}

impl From<i32> for SensorAccuracy {
    /// Maps the platform status codes (`0..=3`) onto [`SensorAccuracy`].
    /// Unknown codes are treated as unreliable.
    fn from(value: i32) -> Self {
        match value {
            1 => SensorAccuracy::Low,
            2 => SensorAccuracy::Medium,
            3 => SensorAccuracy::High,
            _ => SensorAccuracy::Unreliable,
        }
    }
}

/// The motion sensors whose raw readings are kept next to the derived orientation.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MotionSensor {
    Accelerometer,
    Gyroscope,
    Magnetometer,
}

/// Latest raw reading of each motion sensor, `None` for sensors that never reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RawSensorReadings {
    /// m/s²
    pub accelerometer: Option<[f64; 3]>,
    /// rad/s
    pub gyroscope: Option<[f64; 3]>,
    /// µT
    pub magnetometer: Option<[f64; 3]>,
}

impl RawSensorReadings {
    pub fn record(&mut self, sensor: MotionSensor, values: [f64; 3]) {
        let slot = match sensor {
            MotionSensor::Accelerometer => &mut self.accelerometer,
            MotionSensor::Gyroscope => &mut self.gyroscope,
            MotionSensor::Magnetometer => &mut self.magnetometer,
        };
        *slot = Some(values);
    }
}

/// The orientation of the device at one instant, as derived from a single sensor event.
///
/// Snapshots are immutable; the tracker replaces the published value as a whole.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OrientationSnapshot {
    /// Camera axis in the world frame (unit length).
    pointing_vector: Vec3D<f64>,
    /// Azimuth of the camera axis relative to magnetic north in `[0, 360)`.
    magnetic_azimuth_deg: f64,
    /// Azimuth of the camera axis relative to true north in `[0, 360)`.
    true_azimuth_deg: f64,
    /// Elevation of the camera axis as measured, without calibration.
    raw_pitch_deg: f64,
    /// Elevation of the camera axis with the calibration offset applied, `[-90, 90]`.
    pitch_deg: f64,
    /// Rotation of the device around the camera axis in `(-180, 180]`.
    roll_deg: f64,
    accuracy: SensorAccuracy,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    raw_sensors: RawSensorReadings,
}

impl OrientationSnapshot {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pointing_vector: Vec3D<f64>,
        magnetic_azimuth_deg: f64,
        true_azimuth_deg: f64,
        raw_pitch_deg: f64,
        pitch_deg: f64,
        roll_deg: f64,
        accuracy: SensorAccuracy,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            pointing_vector,
            magnetic_azimuth_deg,
            true_azimuth_deg,
            raw_pitch_deg,
            pitch_deg,
            roll_deg,
            accuracy,
            timestamp,
            raw_sensors: RawSensorReadings::default(),
        }
    }

    /// Attaches the raw motion sensor readings current at the time of this snapshot.
    #[must_use]
    pub fn with_raw_sensors(mut self, raw_sensors: RawSensorReadings) -> Self {
        self.raw_sensors = raw_sensors;
        self
    }

    pub fn pointing_vector(&self) -> Vec3D<f64> { self.pointing_vector }
    pub fn magnetic_azimuth_deg(&self) -> f64 { self.magnetic_azimuth_deg }
    pub fn true_azimuth_deg(&self) -> f64 { self.true_azimuth_deg }
    pub fn raw_pitch_deg(&self) -> f64 { self.raw_pitch_deg }
    pub fn pitch_deg(&self) -> f64 { self.pitch_deg }
    pub fn roll_deg(&self) -> f64 { self.roll_deg }
    pub fn accuracy(&self) -> SensorAccuracy { self.accuracy }
    pub fn timestamp(&self) -> DateTime<Utc> { self.timestamp }
    pub fn raw_sensors(&self) -> RawSensorReadings { self.raw_sensors }
}
