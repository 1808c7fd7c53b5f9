use super::{
    calibration_state::{CalibrationOutcome, CalibrationSession, CalibrationState, CalibrationTiming, evaluate_samples},
    horizon::horizon_offset,
};
use crate::orientation::OrientationTracker;
use crate::util::settings_store::{KEY_PITCH_CALIBRATION_OFFSET, SettingsStore, StoreError};
use crate::{event, info, log, warn};
use std::{
    sync::{Arc, Mutex as SyncMutex, PoisonError},
    time::Duration,
};
use strum_macros::Display;
use tokio::{
    sync::{Mutex, broadcast::error::RecvError, watch},
    task::JoinHandle,
    time::{Instant, interval_at},
};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Display)]
pub enum CalibrationError {
    /// Sampling was requested outside of the instruction screen.
    NotInstructing(CalibrationState),
    /// No orientation was derived yet.
    NoOrientation,
    /// Height of eye must be finite and non-negative.
    InvalidHeight(f64),
    /// The new offset was applied but could not be persisted.
    Store(StoreError),
}

impl std::error::Error for CalibrationError {}

impl From<StoreError> for CalibrationError {
    fn from(value: StoreError) -> Self { Self::Store(value) }
}

/// The currently running countdown task.
struct Countdown {
    c_tok: CancellationToken,
    handle: JoinHandle<()>,
}

/// Serializes cancelling a countdown with committing its result.
///
/// A countdown checks for cancellation and commits the offset while holding
/// the gate, so a cancellation either precedes the check or follows the whole commit.
#[derive(Clone, Default)]
struct CommitGate(Arc<SyncMutex<()>>);

impl CommitGate {
    fn cancel(&self, c_tok: &CancellationToken) {
        let _guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        c_tok.cancel();
    }

    /// Runs `commit` unless `c_tok` was cancelled, returns whether it ran.
    fn commit_unless_cancelled(&self, c_tok: &CancellationToken, commit: impl FnOnce()) -> bool {
        let _guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if c_tok.is_cancelled() {
            return false;
        }
        commit();
        true
    }
}

/// Drives the zenith calibration state machine.
///
/// A session goes `Idle -> Instructing -> Sampling -> Finalizing -> Calibrated`.
/// While sampling, every raw pitch sample published by the [`OrientationTracker`]
/// is collected and a one second countdown runs on its own task. Leaving the
/// calibration screen cancels that task; nothing is committed in that case.
pub struct CalibrationController {
    tracker: Arc<OrientationTracker>,
    store: Arc<dyn SettingsStore>,
    session: Arc<watch::Sender<CalibrationSession>>,
    countdown: Mutex<Option<Countdown>>,
    gate: CommitGate,
    timing: CalibrationTiming,
}

impl CalibrationController {
    pub fn new(tracker: Arc<OrientationTracker>, store: Arc<dyn SettingsStore>) -> Self {
        Self::with_timing(tracker, store, CalibrationTiming::default())
    }

    /// Creates a controller using custom session durations.
    pub fn with_timing(
        tracker: Arc<OrientationTracker>,
        store: Arc<dyn SettingsStore>,
        timing: CalibrationTiming,
    ) -> Self {
        let (session, _) = watch::channel(CalibrationSession::idle());
        Self {
            tracker,
            store,
            session: Arc::new(session),
            countdown: Mutex::new(None),
            gate: CommitGate::default(),
            timing,
        }
    }

    /// Returns a copy of the current session.
    pub fn session(&self) -> CalibrationSession { self.session.borrow().clone() }

    pub fn subscribe(&self) -> watch::Receiver<CalibrationSession> { self.session.subscribe() }

    pub fn timing(&self) -> CalibrationTiming { self.timing }

    /// Enters the calibration screen.
    ///
    /// Any running countdown is cancelled and a fresh session is started in
    /// [`CalibrationState::Instructing`].
    pub async fn begin(&self) {
        self.stop_countdown().await;
        let mut prompt = String::from(
            "Hold the device flat with the screen facing up (camera toward the ground), then confirm.",
        );
        if let Some(warning) = self.tracker.accuracy_warning() {
            prompt.push(' ');
            prompt.push_str(&warning);
        }
        self.session.send_modify(|s| s.instruct(prompt));
        info!("Calibration session started");
    }

    /// Confirms the calibration pose and starts collecting samples.
    ///
    /// # Errors
    /// [`CalibrationError::NotInstructing`] if no session is waiting for confirmation.
    pub async fn start_sampling(&self) -> Result<(), CalibrationError> {
        let mut countdown = self.countdown.lock().await;
        let state = self.session.borrow().state();
        if state != CalibrationState::Instructing {
            return Err(CalibrationError::NotInstructing(state));
        }
        if let Some(old) = countdown.take() {
            self.gate.cancel(&old.c_tok);
            let _ = old.handle.await;
        }
        // subscribe before publishing the state so no sample is lost
        let samples = self.tracker.subscribe_samples();
        self.session.send_modify(|s| s.start_sampling(self.timing.duration_secs));
        info!("Calibration sampling started for {} s", self.timing.duration_secs);

        let c_tok = CancellationToken::new();
        let handle = tokio::spawn(Self::run_countdown(
            Arc::clone(&self.session),
            Arc::clone(&self.tracker),
            Arc::clone(&self.store),
            samples,
            self.timing,
            self.gate.clone(),
            c_tok.clone(),
        ));
        *countdown = Some(Countdown { c_tok, handle });
        Ok(())
    }

    /// Leaves the calibration screen, discarding any unfinished session.
    pub async fn leave(&self) {
        self.stop_countdown().await;
        self.session.send_replace(CalibrationSession::idle());
        log!("Left calibration screen");
    }

    /// Calibrates against the visible sea horizon instead of the zenith.
    ///
    /// The current raw pitch is taken as pointing at the apparent horizon,
    /// which lies `dip` below the true horizontal for the given height of eye.
    /// A zenith session in progress is abandoned and the session returns to idle.
    ///
    /// # Returns
    /// The new offset, already applied and persisted.
    pub async fn calibrate_to_horizon(&self, height_of_eye_m: f64) -> Result<f64, CalibrationError> {
        if !height_of_eye_m.is_finite() || height_of_eye_m < 0.0 {
            return Err(CalibrationError::InvalidHeight(height_of_eye_m));
        }
        let snapshot = self.tracker.current().ok_or(CalibrationError::NoOrientation)?;
        self.stop_countdown().await;
        self.session.send_if_modified(|s| {
            if s.state() == CalibrationState::Idle {
                return false;
            }
            *s = CalibrationSession::idle();
            true
        });
        let offset = horizon_offset(snapshot.raw_pitch_deg(), height_of_eye_m);
        self.tracker.set_pitch_offset(offset);
        self.store.set_f64(KEY_PITCH_CALIBRATION_OFFSET, offset)?;
        info!("Horizon calibration at {height_of_eye_m:.1} m: offset {offset:.2}°");
        Ok(offset)
    }

    async fn stop_countdown(&self) {
        if let Some(old) = self.countdown.lock().await.take() {
            self.gate.cancel(&old.c_tok);
            let _ = old.handle.await;
        }
    }

    async fn run_countdown(
        session: Arc<watch::Sender<CalibrationSession>>,
        tracker: Arc<OrientationTracker>,
        store: Arc<dyn SettingsStore>,
        mut samples: tokio::sync::broadcast::Receiver<crate::orientation::OrientationSnapshot>,
        timing: CalibrationTiming,
        gate: CommitGate,
        c_tok: CancellationToken,
    ) {
        let tick = Duration::from_secs(1);
        let mut ticker = interval_at(Instant::now() + tick, tick);
        let mut remaining = timing.duration_secs;
        while remaining > 0 {
            tokio::select! {
                biased;
                () = c_tok.cancelled() => {
                    log!("Calibration countdown cancelled");
                    return;
                }
                sample = samples.recv() => match sample {
                    Ok(snap) => session.send_modify(|s| s.push_sample(snap.raw_pitch_deg())),
                    Err(RecvError::Lagged(n)) => warn!("Calibration missed {n} orientation samples"),
                    Err(RecvError::Closed) => {
                        warn!("Orientation stream closed during calibration");
                        c_tok.cancelled().await;
                        return;
                    }
                },
                _ = ticker.tick() => {
                    session.send_modify(|s| remaining = s.tick());
                    event!("Calibration countdown: {remaining} s left");
                }
            }
        }
        drop(samples);
        session.send_modify(CalibrationSession::finalize);

        tokio::select! {
            () = c_tok.cancelled() => return,
            () = tokio::time::sleep(timing.finalize_delay) => {}
        }
        let collected = session.borrow().collected_samples().to_vec();
        let outcome = evaluate_samples(&collected, timing.samples_to_discard(), tracker.pitch_offset());
        let committed = gate.commit_unless_cancelled(&c_tok, || {
            if let CalibrationOutcome::Success { offset, .. } = outcome {
                tracker.set_pitch_offset(offset);
            }
            session.send_modify(|s| s.complete(outcome, &timing));
        });
        if !committed {
            log!("Calibration result discarded, session was left");
            return;
        }
        match outcome {
            CalibrationOutcome::Success { offset, mean_raw_pitch, samples_used } => {
                info!(
                    "Calibration complete: mean raw pitch {mean_raw_pitch:.2}° over {samples_used} samples, offset {offset:.2}°"
                );
                if let Err(e) = store.set_f64(KEY_PITCH_CALIBRATION_OFFSET, offset) {
                    warn!("Failed to persist calibration offset: {e}");
                    session.send_modify(|s| {
                        let msg = format!("{} Offset could not be saved: {e}", s.result_message());
                        s.set_message(msg);
                    });
                }
            }
            CalibrationOutcome::InsufficientData { collected, discarded, .. } => {
                warn!("Calibration failed: {collected} samples collected, {discarded} discarded for settling");
            }
        }
    }
}
