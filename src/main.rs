#![warn(clippy::shadow_reuse, clippy::shadow_same, clippy::builtin_type_shadow)]
use neosextant::config::SextantConfig;
use neosextant::keychain::Keychain;
use neosextant::replay::{load_session, run_session};
use neosextant::{fatal, info, log, warn};
use std::{env, path::PathBuf};

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() {
    let Some(session_path) = env::args().nth(1).map(PathBuf::from) else {
        fatal!("Usage: neosextant-replay <session.json>");
    };
    let config = SextantConfig::from_env();
    info!("Using plate solver {} and sight reduction {}", config.solver_url, config.navigator_url);

    let session = load_session(&session_path)
        .unwrap_or_else(|e| fatal!("Failed to load session {}: {e:?}", session_path.display()));
    let keychain = Keychain::new(&config).unwrap_or_else(|e| fatal!("Startup failed: {e:?}"));

    let sightings = run_session(&keychain, &session).await;
    for s in &sightings {
        match s.lop() {
            Some(lop) if lop.is_valid() => log!(
                "Sighting {}: {} (intercept {:.2} NM, azimuth {:.1}°)",
                s.id(),
                s.analysis_state(),
                lop.intercept_nm(),
                lop.azimuth_deg()
            ),
            _ => log!("Sighting {}: {}", s.id(), s.analysis_state()),
        }
    }
    match keychain.fix() {
        Some(fix) if fix.is_valid() => info!(
            "Fix: {:.4}°, {:.4}° (spread {:.2} NM)",
            fix.latitude_deg().unwrap_or_default(),
            fix.longitude_deg().unwrap_or_default(),
            fix.spread_nm().unwrap_or_default()
        ),
        Some(fix) => warn!("No fix: {}", fix.error().unwrap_or_default()),
        None => warn!("No fix: fewer than three valid lines of position"),
    }
    keychain.shutdown().await;
}
