use super::{Keychain, PositionError};
use crate::solver::test_doubles::{StubLopSolver, StubPlateSolver};
use crate::util::settings_store::{KEY_EST_LAT, KEY_EST_LON, MemoryStore, SettingsStore};
use std::{sync::Arc, time::Duration};

fn stub_keychain(store: &Arc<MemoryStore>) -> Keychain {
    Keychain::with_collaborators(
        Arc::clone(store) as _,
        Arc::new(StubPlateSolver::solving(Duration::ZERO, 0.0, 0.0)),
        Arc::new(StubLopSolver::single(Duration::ZERO, 1.0, 90.0)),
        None,
    )
}

#[tokio::test]
async fn test_estimated_position_is_persisted() {
    let store = Arc::new(MemoryStore::new());
    let keychain = stub_keychain(&store);
    keychain.set_estimated_position(-33.86, 151.21).unwrap();
    assert_eq!(keychain.nav_settings().est_lat_deg, -33.86);
    assert_eq!(keychain.nav_settings().est_lon_deg, 151.21);
    assert_eq!(store.get_f64(KEY_EST_LAT), Some(-33.86));
    assert_eq!(store.get_f64(KEY_EST_LON), Some(151.21));

    keychain.set_estimated_position(90.0, -180.0).unwrap();
    assert_eq!(store.get_f64(KEY_EST_LAT), Some(90.0));
    keychain.shutdown().await;
}

#[tokio::test]
async fn test_invalid_estimated_position_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let keychain = stub_keychain(&store);
    let before = keychain.nav_settings();

    for (lat, lon) in [(f64::NAN, 0.0), (0.0, f64::INFINITY), (90.5, 0.0), (-91.0, 0.0), (10.0, 180.1)] {
        let res = keychain.set_estimated_position(lat, lon);
        assert!(matches!(res, Err(PositionError::OutOfRange(..))), "({lat}, {lon}) accepted");
    }
    assert_eq!(keychain.nav_settings(), before);
    assert!(store.get_f64(KEY_EST_LAT).is_none());
    assert!(store.get_f64(KEY_EST_LON).is_none());
    keychain.shutdown().await;
}
