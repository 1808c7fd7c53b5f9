use super::angles::{azimuth_pitch_roll, device_y_axis_from_rotation_matrix, pointing_vector_from_rotation_matrix};
use super::{MotionSensor, OrientationEvent, OrientationTracker, RotationInput, SensorAccuracy};
use crate::config::NavSettings;
use crate::util::math::helpers::{RotationMatrix, rotation_matrix_from_rotation_vector};
use chrono::Utc;
use rand::Rng;
use strum::IntoEnumIterator;
use tokio::sync::watch;

/// Device flat on a table, screen up: camera looks at the nadir.
const FLAT_SCREEN_UP: RotationMatrix = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
/// Device upright in portrait, camera looking north at the horizon.
const UPRIGHT_NORTH: RotationMatrix = [1.0, 0.0, 0.0, 0.0, 0.0, -1.0, 0.0, 1.0, 0.0];

fn rand_rotation_matrix() -> RotationMatrix {
    let mut rng = rand::rng();
    loop {
        let q: [f64; 4] = [
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
        ];
        let norm = q.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.1 {
            let unit: Vec<f64> = q.iter().map(|v| v / norm).collect();
            return rotation_matrix_from_rotation_vector(&unit).unwrap();
        }
    }
}

fn tracker_with(offset: f64, declination_deg: f64) -> (OrientationTracker, watch::Sender<NavSettings>) {
    let (tx, rx) = watch::channel(NavSettings { declination_deg, ..NavSettings::default() });
    (OrientationTracker::new(offset, rx), tx)
}

fn event(m: RotationMatrix, accuracy: SensorAccuracy) -> OrientationEvent {
    OrientationEvent { rotation: RotationInput::Matrix(m), accuracy, timestamp: Utc::now() }
}

#[test]
fn test_pointing_vector_is_unit_for_random_rotations() {
    for _ in 0..2000 {
        let m = rand_rotation_matrix();
        let p = pointing_vector_from_rotation_matrix(&m);
        assert!((p.abs() - 1.0).abs() < 1e-4, "pointing vector {p} not unit length");
    }
}

#[test]
fn test_angle_ranges_for_random_rotations() {
    let mut rng = rand::rng();
    for _ in 0..2000 {
        let m = rand_rotation_matrix();
        let decl = rng.random_range(-30.0..30.0);
        let angles = azimuth_pitch_roll(
            &pointing_vector_from_rotation_matrix(&m),
            &device_y_axis_from_rotation_matrix(&m),
            decl,
        );
        assert!((0.0..360.0).contains(&angles.true_azimuth_deg));
        assert!((0.0..360.0).contains(&angles.magnetic_azimuth_deg));
        assert!(angles.roll_deg > -180.0 && angles.roll_deg <= 180.0);
        assert!((-90.0..=90.0).contains(&angles.pitch_deg));
    }
}

#[test]
fn test_known_poses() {
    let flat = azimuth_pitch_roll(
        &pointing_vector_from_rotation_matrix(&FLAT_SCREEN_UP),
        &device_y_axis_from_rotation_matrix(&FLAT_SCREEN_UP),
        0.0,
    );
    assert!((flat.pitch_deg + 90.0).abs() < 1e-9);

    let upright = azimuth_pitch_roll(
        &pointing_vector_from_rotation_matrix(&UPRIGHT_NORTH),
        &device_y_axis_from_rotation_matrix(&UPRIGHT_NORTH),
        -5.0,
    );
    assert!(upright.pitch_deg.abs() < 1e-9);
    assert!(upright.magnetic_azimuth_deg.abs() < 1e-9);
    assert!((upright.true_azimuth_deg - 355.0).abs() < 1e-9);
    assert!(upright.roll_deg.abs() < 1e-9);
}

#[test]
fn test_tracker_applies_offset_and_publishes() {
    let (tracker, _settings) = tracker_with(1.0, 0.0);
    assert!(tracker.current().is_none());
    let snap = tracker.handle_event(&event(FLAT_SCREEN_UP, SensorAccuracy::High)).unwrap();
    assert!((snap.raw_pitch_deg() + 90.0).abs() < 1e-9);
    assert!((snap.pitch_deg() + 89.0).abs() < 1e-9);
    assert_eq!(tracker.current(), Some(snap));
    assert_eq!(tracker.accuracy(), SensorAccuracy::High);
    assert!(tracker.accuracy_warning().is_none());

    tracker.set_pitch_offset(-2.0);
    let snap = tracker.handle_event(&event(UPRIGHT_NORTH, SensorAccuracy::High)).unwrap();
    assert!((snap.pitch_deg() + 2.0).abs() < 1e-9);
}

#[test]
fn test_tracker_follows_declination_changes() {
    let (tracker, settings) = tracker_with(0.0, 0.0);
    let snap = tracker.handle_event(&event(UPRIGHT_NORTH, SensorAccuracy::Medium)).unwrap();
    assert!(snap.true_azimuth_deg().abs() < 1e-9);
    settings.send_modify(|s| s.declination_deg = 12.5);
    let snap = tracker.handle_event(&event(UPRIGHT_NORTH, SensorAccuracy::Medium)).unwrap();
    assert!((snap.true_azimuth_deg() - 12.5).abs() < 1e-9);
}

#[test]
fn test_tracker_drops_malformed_events() {
    let (tracker, _settings) = tracker_with(0.0, 0.0);
    let good = tracker.handle_event(&event(UPRIGHT_NORTH, SensorAccuracy::Low)).unwrap();
    let mut bad = UPRIGHT_NORTH;
    bad[5] = f64::NAN;
    assert!(tracker.handle_event(&event(bad, SensorAccuracy::Low)).is_none());
    assert!(tracker.handle_event(&event([0.0; 9], SensorAccuracy::Low)).is_none());
    assert_eq!(tracker.current(), Some(good));
    assert!(tracker.accuracy_warning().is_some());
}

#[test]
fn test_accuracy_callback_and_rotation_vector_input() {
    let (tracker, _settings) = tracker_with(0.0, 0.0);
    tracker.handle_accuracy_changed(SensorAccuracy::Medium);
    assert_eq!(tracker.accuracy(), SensorAccuracy::Medium);
    assert_eq!(SensorAccuracy::from(3), SensorAccuracy::High);
    assert_eq!(SensorAccuracy::from(-1), SensorAccuracy::Unreliable);
    let degraded: Vec<_> = SensorAccuracy::iter().filter(|a| a.is_degraded()).collect();
    assert_eq!(degraded, vec![SensorAccuracy::Unreliable, SensorAccuracy::Low]);

    let ev = OrientationEvent {
        rotation: RotationInput::RotationVector { x: 0.0, y: 0.0, z: 0.0, w: None },
        accuracy: SensorAccuracy::High,
        timestamp: Utc::now(),
    };
    let snap = tracker.handle_event(&ev).unwrap();
    assert!((snap.raw_pitch_deg() + 90.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_sample_subscribers_receive_every_update() {
    let (tracker, _settings) = tracker_with(0.0, 0.0);
    let mut samples = tracker.subscribe_samples();
    for _ in 0..5 {
        tracker.handle_event(&event(FLAT_SCREEN_UP, SensorAccuracy::High));
    }
    let mut received = 0;
    while let Ok(snap) = samples.try_recv() {
        assert!((snap.raw_pitch_deg() + 90.0).abs() < 1e-9);
        received += 1;
    }
    assert_eq!(received, 5);
}

#[test]
fn test_raw_readings_follow_snapshots() {
    let (tracker, _settings) = tracker_with(0.0, 0.0);
    let snap = tracker.handle_event(&event(UPRIGHT_NORTH, SensorAccuracy::High)).unwrap();
    assert!(snap.raw_sensors().accelerometer.is_none());

    tracker.handle_raw_reading(MotionSensor::Accelerometer, [0.0, 9.81, 0.0]);
    tracker.handle_raw_reading(MotionSensor::Magnetometer, [0.0, 21.5, -42.0]);
    tracker.handle_raw_reading(MotionSensor::Gyroscope, [f64::NAN, 0.0, 0.0]);
    let snap = tracker.handle_event(&event(UPRIGHT_NORTH, SensorAccuracy::High)).unwrap();
    assert_eq!(snap.raw_sensors().accelerometer, Some([0.0, 9.81, 0.0]));
    assert_eq!(snap.raw_sensors().magnetometer, Some([0.0, 21.5, -42.0]));
    assert!(snap.raw_sensors().gyroscope.is_none());
    assert_eq!(tracker.current().unwrap().raw_sensors(), tracker.raw_sensors());
}
