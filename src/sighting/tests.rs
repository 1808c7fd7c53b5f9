use super::{AnalysisState, CaptureSource, FailureReason, RegistryError, Sighting, SightingRegistry};
use crate::config::NavSettings;
use crate::http_handler::http_response::response_common::ResponseError;
use crate::orientation::{MotionSensor, OrientationSnapshot, RawSensorReadings, SensorAccuracy};
use crate::solver::{
    CollaboratorError, LopResponse, SolveResponse,
    test_doubles::{StubLopSolver, StubPlateSolver},
};
use crate::util::math::vec3d::Vec3D;
use chrono::{TimeZone, Utc};
use std::{sync::Arc, time::Duration};
use tokio::sync::watch;

fn snapshot(true_azimuth_deg: f64, pitch_deg: f64) -> OrientationSnapshot {
    OrientationSnapshot::new(
        Vec3D::new(0.0, 1.0, 0.0),
        true_azimuth_deg,
        true_azimuth_deg,
        pitch_deg,
        pitch_deg,
        0.0,
        SensorAccuracy::High,
        Utc.with_ymd_and_hms(2025, 3, 14, 19, 30, 0).unwrap(),
    )
}

fn registry(
    plate: &Arc<StubPlateSolver>,
    lop: &Arc<StubLopSolver>,
) -> (SightingRegistry, watch::Sender<NavSettings>) {
    let (nav_tx, nav_rx) = watch::channel(NavSettings::default());
    let reg = SightingRegistry::new(Arc::clone(plate) as _, Arc::clone(lop) as _, nav_rx, None);
    (reg, nav_tx)
}

async fn wait_terminal(reg: &SightingRegistry, count: usize) -> Vec<Sighting> {
    let mut rx = reg.subscribe();
    rx.wait_for(|v| v.len() == count && v.iter().all(Sighting::is_terminal)).await.unwrap().clone()
}

#[tokio::test(start_paused = true)]
async fn test_capacity_is_enforced_without_mutation() {
    let plate = Arc::new(StubPlateSolver::solving(Duration::from_secs(60), 10.0, 20.0));
    let lop = Arc::new(StubLopSolver::single(Duration::ZERO, 1.0, 10.0));
    let (reg, _nav) = registry(&plate, &lop);

    for i in 0..3 {
        reg.add_sighting(format!("img_{i}.jpg"), snapshot(0.0, 30.0), CaptureSource::Camera).await.unwrap();
    }
    let before = reg.sightings();
    let res = reg.add_sighting(String::from("img_3.jpg"), snapshot(0.0, 30.0), CaptureSource::Storage).await;
    assert_eq!(res, Err(RegistryError::CapacityExceeded(3)));
    assert_eq!(reg.sightings(), before);
    assert!(before.iter().all(|s| s.analysis_state() == AnalysisState::Pending));

    let res = reg.add_sighting(String::from("  "), snapshot(0.0, 30.0), CaptureSource::Storage).await;
    assert_eq!(res, Err(RegistryError::EmptyImageReference));
}

#[tokio::test(start_paused = true)]
async fn test_successful_analysis_produces_lop() {
    let plate = Arc::new(StubPlateSolver::solving(Duration::from_millis(300), 101.28, -16.71));
    let lop = Arc::new(StubLopSolver::single(Duration::from_millis(100), 4.2, 135.0));
    let (reg, nav) = registry(&plate, &lop);
    nav.send_modify(|s| {
        s.est_lat_deg = 45.0;
        s.est_lon_deg = -3.0;
    });

    let id = reg.add_sighting(String::from("sirius.jpg"), snapshot(135.0, 22.5), CaptureSource::Camera).await.unwrap();
    let sightings = wait_terminal(&reg, 1).await;
    let sighting = &sightings[0];
    assert_eq!(sighting.id(), id);
    assert_eq!(sighting.analysis_state(), AnalysisState::Solved);
    assert_eq!(sighting.plate_solve_result().and_then(|r| r.ra_deg()), Some(101.28));
    let line = sighting.valid_lop().unwrap();
    assert!((line.intercept_nm() - 4.2).abs() < 1e-12);
    assert!((line.azimuth_deg() - 135.0).abs() < 1e-12);

    let requests = lop.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].est_lat_deg, 45.0);
    assert_eq!(requests[0].est_lon_deg, -3.0);
    let obs = &requests[0].observations[0];
    assert_eq!(obs.azimuth_deg, Some(135.0));
    assert_eq!(obs.pitch_deg, 22.5);
    assert_eq!(obs.utc, sighting.capture_orientation().timestamp());
    assert_eq!(plate.calls(), 1);
    assert_eq!(reg.get(id).as_ref(), Some(sighting));
}

#[tokio::test(start_paused = true)]
async fn test_removed_sighting_is_never_published_again() {
    let plate = Arc::new(StubPlateSolver::solving(Duration::from_secs(2), 10.0, 20.0));
    let lop = Arc::new(StubLopSolver::single(Duration::ZERO, 1.0, 10.0));
    let (reg, _nav) = registry(&plate, &lop);

    let id = reg.add_sighting(String::from("late.jpg"), snapshot(0.0, 30.0), CaptureSource::Camera).await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    let mut rx = reg.subscribe();
    reg.remove_sighting(id).await.unwrap();
    assert!(rx.has_changed().unwrap());
    rx.borrow_and_update();

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(!rx.has_changed().unwrap());
    assert!(reg.sightings().is_empty());
    assert!(reg.get(id).is_none());
    assert_eq!(lop.requests().len(), 0);
    assert_eq!(reg.active_task_count().await, 0);
    assert_eq!(reg.remove_sighting(id).await, Err(RegistryError::UnknownSighting(id)));
}

#[tokio::test(start_paused = true)]
async fn test_plate_solve_failures_are_mapped() {
    let plate = Arc::new(StubPlateSolver::new(Duration::from_millis(10), |path| match path {
        "nomatch.jpg" => Ok(SolveResponse::failed(SolveResponse::STATUS_NO_MATCH)),
        "weird.jpg" => Ok(SolveResponse::failed(99)),
        _ => Err(CollaboratorError::Http(ResponseError::NoConnection)),
    }));
    let lop = Arc::new(StubLopSolver::single(Duration::ZERO, 1.0, 10.0));
    let (reg, _nav) = registry(&plate, &lop);

    for path in ["nomatch.jpg", "weird.jpg", "offline.jpg"] {
        reg.add_sighting(String::from(path), snapshot(0.0, 30.0), CaptureSource::Storage).await.unwrap();
    }
    let sightings = wait_terminal(&reg, 3).await;
    let reasons: Vec<_> = sightings
        .iter()
        .map(|s| {
            assert_eq!(s.analysis_state(), AnalysisState::Failed);
            assert!(s.lop().is_none());
            s.plate_solve_result().and_then(|r| r.failure_reason())
        })
        .collect();
    assert_eq!(
        reasons,
        vec![Some(FailureReason::NoMatch), Some(FailureReason::Unknown), Some(FailureReason::IOError)]
    );
    assert!(lop.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_hanging_solver_times_out() {
    let plate = Arc::new(StubPlateSolver::solving(Duration::from_secs(3600), 10.0, 20.0));
    let lop = Arc::new(StubLopSolver::single(Duration::ZERO, 1.0, 10.0));
    let (reg, _nav) = registry(&plate, &lop);

    reg.add_sighting(String::from("slow.jpg"), snapshot(0.0, 30.0), CaptureSource::Camera).await.unwrap();
    let sightings = wait_terminal(&reg, 1).await;
    let result = sightings[0].plate_solve_result().unwrap();
    assert_eq!(result.failure_reason(), Some(FailureReason::Timeout));
    assert!(!result.is_solved());
}

#[tokio::test(start_paused = true)]
async fn test_lop_failure_keeps_solved_state() {
    let plate = Arc::new(StubPlateSolver::solving(Duration::ZERO, 10.0, 20.0));
    let lop = Arc::new(StubLopSolver::new(Duration::ZERO, |_| Err(CollaboratorError::Timeout)));
    let (reg, _nav) = registry(&plate, &lop);

    reg.add_sighting(String::from("a.jpg"), snapshot(0.0, 30.0), CaptureSource::Camera).await.unwrap();
    let sightings = wait_terminal(&reg, 1).await;
    assert_eq!(sightings[0].analysis_state(), AnalysisState::Solved);
    assert!(sightings[0].lop().and_then(|l| l.error()).is_some());
    assert!(sightings[0].valid_lop().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_reported_lop_error_is_attached() {
    let plate = Arc::new(StubPlateSolver::solving(Duration::ZERO, 10.0, 20.0));
    let lop = Arc::new(StubLopSolver::new(Duration::ZERO, |_| {
        Ok(LopResponse {
            latitude_deg: None,
            longitude_deg: None,
            spread_nm: None,
            error: Some(String::from("body below horizon")),
            per_observation_details: vec![],
        })
    }));
    let (reg, _nav) = registry(&plate, &lop);

    reg.add_sighting(String::from("a.jpg"), snapshot(0.0, 30.0), CaptureSource::Camera).await.unwrap();
    let sightings = wait_terminal(&reg, 1).await;
    assert_eq!(sightings[0].lop().and_then(|l| l.error()), Some("body below horizon"));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_tasks_and_releases_collaborators() {
    let plate = Arc::new(StubPlateSolver::solving(Duration::from_secs(30), 10.0, 20.0));
    let lop = Arc::new(StubLopSolver::single(Duration::ZERO, 1.0, 10.0));
    let (reg, _nav) = registry(&plate, &lop);

    reg.add_sighting(String::from("a.jpg"), snapshot(0.0, 30.0), CaptureSource::Camera).await.unwrap();
    reg.add_sighting(String::from("b.jpg"), snapshot(0.0, 30.0), CaptureSource::Camera).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(reg.active_task_count().await, 2);

    reg.shutdown().await;
    assert_eq!(reg.active_task_count().await, 0);
    assert!(reg.sightings().is_empty());
    assert!(plate.is_released());
    assert!(lop.is_released());
}

#[tokio::test]
async fn test_terminal_sightings_are_dumped() {
    let dir = std::env::temp_dir().join(format!("neosextant_dump_{}", std::process::id()));
    let plate = Arc::new(StubPlateSolver::new(Duration::ZERO, |_| Ok(SolveResponse::failed(5))));
    let lop = Arc::new(StubLopSolver::single(Duration::ZERO, 1.0, 10.0));
    let (_nav_tx, nav_rx) = watch::channel(NavSettings::default());
    let reg = SightingRegistry::new(Arc::clone(&plate) as _, Arc::clone(&lop) as _, nav_rx, Some(dir.clone()));

    let mut raw = RawSensorReadings::default();
    raw.record(MotionSensor::Gyroscope, [0.001, -0.002, 0.0]);
    let capture = snapshot(0.0, 30.0).with_raw_sensors(raw);
    let id = reg.add_sighting(String::from("a.jpg"), capture, CaptureSource::Camera).await.unwrap();
    let sightings = wait_terminal(&reg, 1).await;
    assert_eq!(
        sightings[0].plate_solve_result().and_then(|r| r.failure_reason()),
        Some(FailureReason::TooFewCentroids)
    );
    reg.shutdown().await;

    let path = dir.join("sightings").join(format!("sighting_{}_20250314_193000.json", id.value()));
    let record: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(record["analysis_state"], "Failed");
    assert_eq!(record["image_reference"], "a.jpg");
    let recorded = &record["capture_orientation"]["raw_sensors"];
    assert_eq!(recorded["gyroscope"], serde_json::json!([0.001, -0.002, 0.0]));
    assert!(recorded["accelerometer"].is_null());
    std::fs::remove_dir_all(&dir).unwrap();
}
