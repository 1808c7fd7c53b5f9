use std::time::Duration;
use strum_macros::Display;

/// Phases of a zenith calibration session.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum CalibrationState {
    /// No session was started since the calibration screen was entered.
    Idle,
    /// The user is asked to hold the device screen up and confirm.
    Instructing,
    /// Raw pitch samples are being collected while the countdown runs.
    Sampling,
    /// The countdown has expired and the samples are being evaluated.
    Finalizing,
    /// The session ended, see [`CalibrationSession::outcome`] for the result.
    Calibrated,
}

/// Durations of a calibration session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationTiming {
    /// Length of the sampling countdown in seconds.
    pub duration_secs: u32,
    /// Initial part of the countdown whose samples are discarded.
    pub settling_secs: u32,
    /// Nominal sensor rate used to convert the settling window to a sample count.
    pub sample_rate_hz: u32,
    /// Pause between the end of the countdown and the evaluation.
    pub finalize_delay: Duration,
}

impl CalibrationTiming {
    pub const CALIBRATION_DURATION: u32 = 20;
    pub const SETTLING_DURATION: u32 = 5;
    pub const SAMPLE_RATE: u32 = 50;
    const FINALIZE_DELAY: Duration = Duration::from_millis(500);

    /// Number of leading samples dropped before averaging.
    pub fn samples_to_discard(&self) -> usize { (self.settling_secs * self.sample_rate_hz) as usize }
}

impl Default for CalibrationTiming {
    fn default() -> Self {
        Self {
            duration_secs: Self::CALIBRATION_DURATION,
            settling_secs: Self::SETTLING_DURATION,
            sample_rate_hz: Self::SAMPLE_RATE,
            finalize_delay: Self::FINALIZE_DELAY,
        }
    }
}

/// Result of evaluating the samples of a finished countdown.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub enum CalibrationOutcome {
    /// A new offset was derived.
    Success { offset: f64, mean_raw_pitch: f64, samples_used: usize },
    /// Nothing was left after the settling window; the previous offset stays active.
    InsufficientData { collected: usize, discarded: usize, retained_offset: f64 },
}

impl CalibrationOutcome {
    pub fn is_failure(&self) -> bool { matches!(self, CalibrationOutcome::InsufficientData { .. }) }
}

/// Raw pitch of the camera axis in the calibration pose.
///
/// The pose is "screen up": the display faces the zenith, so the camera on
/// the back of the device looks at the nadir.
pub const CALIBRATION_POSE_PITCH: f64 = -90.0;

/// Derives the calibration outcome from the collected raw pitch samples.
///
/// # Arguments
/// * `samples` - Raw pitch samples in collection order.
/// * `discard` - Number of leading samples belonging to the settling window.
/// * `previous_offset` - Offset reported as retained on failure.
pub fn evaluate_samples(samples: &[f64], discard: usize, previous_offset: f64) -> CalibrationOutcome {
    let remaining = samples.get(discard..).unwrap_or_default();
    if remaining.is_empty() {
        return CalibrationOutcome::InsufficientData {
            collected: samples.len(),
            discarded: discard,
            retained_offset: previous_offset,
        };
    }
    #[allow(clippy::cast_precision_loss)]
    let mean_raw_pitch = remaining.iter().sum::<f64>() / remaining.len() as f64;
    CalibrationOutcome::Success {
        offset: CALIBRATION_POSE_PITCH - mean_raw_pitch,
        mean_raw_pitch,
        samples_used: remaining.len(),
    }
}

/// Observable state of the current calibration session.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CalibrationSession {
    state: CalibrationState,
    collected_samples: Vec<f64>,
    remaining_seconds: u32,
    result_message: String,
    outcome: Option<CalibrationOutcome>,
}

impl CalibrationSession {
    /// A fresh session in the [`CalibrationState::Idle`] state.
    pub fn idle() -> Self {
        Self {
            state: CalibrationState::Idle,
            collected_samples: Vec::new(),
            remaining_seconds: 0,
            result_message: String::new(),
            outcome: None,
        }
    }

    pub fn state(&self) -> CalibrationState { self.state }
    pub fn collected_samples(&self) -> &[f64] { &self.collected_samples }
    pub fn remaining_seconds(&self) -> u32 { self.remaining_seconds }
    pub fn result_message(&self) -> &str { &self.result_message }
    pub fn outcome(&self) -> Option<CalibrationOutcome> { self.outcome }

    pub(super) fn instruct(&mut self, message: String) {
        *self = Self::idle();
        self.state = CalibrationState::Instructing;
        self.result_message = message;
    }

    pub(super) fn start_sampling(&mut self, duration_secs: u32) {
        self.state = CalibrationState::Sampling;
        self.collected_samples.clear();
        self.remaining_seconds = duration_secs;
        self.result_message = String::from("Calibrating: screen up... keep the device very still.");
        self.outcome = None;
    }

    pub(super) fn push_sample(&mut self, raw_pitch: f64) {
        if self.state == CalibrationState::Sampling {
            self.collected_samples.push(raw_pitch);
        }
    }

    pub(super) fn tick(&mut self) -> u32 {
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        self.remaining_seconds
    }

    pub(super) fn finalize(&mut self) {
        self.state = CalibrationState::Finalizing;
        self.result_message = String::from("Finalizing calibration...");
    }

    pub(super) fn complete(&mut self, outcome: CalibrationOutcome, timing: &CalibrationTiming) {
        self.result_message = match outcome {
            CalibrationOutcome::Success { offset, mean_raw_pitch, samples_used } => format!(
                "Calibration complete! New pitch offset: {offset:.2}° (raw nadir average over the last {} s: {mean_raw_pitch:.2}°, {samples_used} samples)",
                timing.duration_secs.saturating_sub(timing.settling_secs)
            ),
            CalibrationOutcome::InsufficientData { .. } => String::from(
                "Calibration failed: not enough data collected after settling. Previous offset retained.",
            ),
        };
        self.outcome = Some(outcome);
        self.state = CalibrationState::Calibrated;
    }

    pub(super) fn set_message(&mut self, message: String) { self.result_message = message; }
}
