mod calibration_controller;
mod calibration_state;
mod horizon;

pub use calibration_controller::{CalibrationController, CalibrationError};
pub use calibration_state::{
    CALIBRATION_POSE_PITCH, CalibrationOutcome, CalibrationSession, CalibrationState, CalibrationTiming,
    evaluate_samples,
};
pub use horizon::{dip_deg, horizon_offset};
