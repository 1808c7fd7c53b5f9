use super::position_fix::PositionFix;
use crate::config::NavSettings;
use crate::logger::JsonDump;
use crate::sighting::{LineOfPosition, Sighting, SightingId, SightingRegistry};
use crate::solver::{LopRequest, LopSolver, Observation};
use crate::{info, log, sight, warn};
use itertools::Itertools;
use std::{path::PathBuf, sync::Arc};
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;

/// Computes a position fix whenever exactly three sightings carry a valid
/// line of position.
///
/// The aggregator follows the registry view. Each distinct set of three
/// qualifying sightings triggers one multi-observation sight reduction; its
/// own line of position back-fill keeps the set unchanged and therefore does
/// not trigger again.
pub struct FixAggregator {
    registry: Arc<SightingRegistry>,
    lop_solver: Arc<dyn LopSolver>,
    nav_settings: watch::Receiver<NavSettings>,
    fix_tx: watch::Sender<Option<PositionFix>>,
    dump_dir: Option<PathBuf>,
    /// Sightings of the last attempted fix.
    last_set: Option<Vec<SightingId>>,
}

impl FixAggregator {
    pub const FIX_SIGHTINGS: usize = 3;

    pub fn new(
        registry: Arc<SightingRegistry>,
        lop_solver: Arc<dyn LopSolver>,
        nav_settings: watch::Receiver<NavSettings>,
        dump_dir: Option<PathBuf>,
    ) -> Self {
        let (fix_tx, _) = watch::channel(None);
        Self { registry, lop_solver, nav_settings, fix_tx, dump_dir, last_set: None }
    }

    /// Subscribes to the published fix, `None` while no fix is available.
    pub fn subscribe(&self) -> watch::Receiver<Option<PositionFix>> { self.fix_tx.subscribe() }

    /// Spawns [`FixAggregator::run`] on the runtime.
    pub fn spawn(self, c_tok: CancellationToken) -> JoinHandle<()> { tokio::spawn(self.run(c_tok)) }

    /// Follows the registry until `c_tok` is cancelled or the registry is dropped.
    pub async fn run(mut self, c_tok: CancellationToken) {
        let mut view_rx = self.registry.subscribe();
        loop {
            let view = view_rx.borrow_and_update().clone();
            tokio::select! {
                () = c_tok.cancelled() => break,
                () = self.evaluate(&view) => {}
            }
            tokio::select! {
                () = c_tok.cancelled() => break,
                res = view_rx.changed() => if res.is_err() { break },
            }
        }
        log!("Fix aggregator stopped");
    }

    pub(super) async fn evaluate(&mut self, view: &[Sighting]) {
        let qualifying = Self::qualifying_set(view);
        if qualifying.len() < Self::FIX_SIGHTINGS {
            self.last_set = None;
            if self.fix_tx.send_if_modified(|fix| fix.take().is_some()) {
                info!("Position fix cleared, {} valid lines of position left", qualifying.len());
            }
            return;
        }
        if self.last_set.as_ref() == Some(&qualifying) {
            return;
        }
        self.last_set = Some(qualifying.clone());

        let Some(observations) = self.current_observations(&qualifying) else {
            warn!("Sightings {qualifying:?} changed before the fix could be computed");
            self.publish(PositionFix::failed(qualifying, String::from("sighting set changed")));
            return;
        };
        let request = {
            let settings = self.nav_settings.borrow();
            LopRequest {
                observations,
                est_lat_deg: settings.est_lat_deg,
                est_lon_deg: settings.est_lon_deg,
                lon_east_positive: settings.lon_east_positive,
            }
        };
        sight!("Computing position fix from sightings {qualifying:?}");
        let result = self.lop_solver.compute_lop(&request).await;

        if Self::qualifying_set(&self.registry.sightings()) != qualifying {
            log!("Discarding fix of sightings {qualifying:?}, set changed during computation");
            return;
        }
        match result {
            Ok(resp) => {
                let fix = PositionFix::from_response(qualifying.clone(), &resp);
                if fix.is_valid() {
                    let lops = qualifying
                        .iter()
                        .zip(&resp.per_observation_details)
                        .filter(|(_, d)| d.error.is_none())
                        .map(|(id, d)| (*id, LineOfPosition::from_detail(d)))
                        .collect();
                    self.registry.backfill_lops(lops).await;
                }
                self.publish(fix);
            }
            Err(e) => self.publish(PositionFix::failed(qualifying, format!("fix computation failed: {e:?}"))),
        }
    }

    /// Ids of the sightings with a valid line of position, ordered.
    fn qualifying_set(view: &[Sighting]) -> Vec<SightingId> {
        view.iter().filter(|s| s.valid_lop().is_some()).map(Sighting::id).sorted().collect()
    }

    /// Observations of `ids` as currently registered, `None` if any of them lost its line of position.
    fn current_observations(&self, ids: &[SightingId]) -> Option<Vec<Observation>> {
        ids.iter()
            .map(|id| self.registry.get(*id).filter(|s| s.valid_lop().is_some()).and_then(|s| s.observation()))
            .collect()
    }

    fn publish(&self, fix: PositionFix) {
        match (fix.latitude_deg(), fix.longitude_deg(), fix.error()) {
            (Some(lat), Some(lon), None) => sight!(
                "Position fix: {lat:.4}°, {lon:.4}° (spread {:.2} NM)",
                fix.spread_nm().unwrap_or(f64::NAN)
            ),
            (_, _, err) => warn!("Position fix failed: {}", err.unwrap_or("unknown error")),
        }
        if let Some(dir) = &self.dump_dir {
            if let Err(e) = fix.dump_json(dir) {
                warn!("Failed to write fix record: {e}");
            }
        }
        self.fix_tx.send_replace(Some(fix));
    }
}
