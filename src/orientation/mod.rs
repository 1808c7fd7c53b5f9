pub mod angles;
mod snapshot;
mod tracker;
#[cfg(test)]
mod tests;

pub use snapshot::{MotionSensor, OrientationSnapshot, RawSensorReadings, SensorAccuracy};
pub use tracker::{OrientationEvent, OrientationTracker, RotationInput};
