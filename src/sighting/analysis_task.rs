use super::{
    sighting::{FailureReason, LineOfPosition, PlateSolveResult, Sighting, SightingId},
    sighting_registry::SharedRegistry,
};
use crate::config::NavSettings;
use crate::logger::JsonDump;
use crate::solver::{CollaboratorError, LopRequest, LopSolver, PlateSolver};
use crate::{sight, warn};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// The sequential analysis of one sighting: plate solve, then line of position.
pub(super) struct AnalysisTask {
    id: SightingId,
    image_reference: String,
    shared: Arc<SharedRegistry>,
    plate_solver: Arc<dyn PlateSolver>,
    lop_solver: Arc<dyn LopSolver>,
    nav_settings: watch::Receiver<NavSettings>,
    dump_dir: Option<PathBuf>,
    c_tok: CancellationToken,
}

impl AnalysisTask {
    /// Time granted to the plate solver on top of its own budget before the
    /// attempt is abandoned locally.
    const LOCAL_GUARD: Duration = Duration::from_secs(5);

    pub(super) fn new(
        sighting: Sighting,
        shared: Arc<SharedRegistry>,
        plate_solver: Arc<dyn PlateSolver>,
        lop_solver: Arc<dyn LopSolver>,
        nav_settings: watch::Receiver<NavSettings>,
        dump_dir: Option<PathBuf>,
        c_tok: CancellationToken,
    ) -> Self {
        Self {
            id: sighting.id(),
            image_reference: sighting.image_reference().to_string(),
            shared,
            plate_solver,
            lop_solver,
            nav_settings,
            dump_dir,
            c_tok,
        }
    }

    pub(super) async fn run(self) {
        let Some(result) = self.plate_solve().await else { return };
        let Some(sighting) = self.shared.update_if_live(self.id, &self.c_tok, |s| s.set_solve_result(result)).await
        else {
            return;
        };
        let Some(observation) = sighting.observation() else {
            let reason = sighting.plate_solve_result().and_then(PlateSolveResult::failure_reason);
            sight!("Sighting {} could not be solved: {}", self.id, reason.unwrap_or(FailureReason::Unknown));
            self.dump(&sighting);
            return;
        };
        sight!("Sighting {} solved: RA {:.3}°, Dec {:.3}°", self.id, observation.ra_deg, observation.dec_deg);

        let request = {
            let settings = self.nav_settings.borrow();
            LopRequest {
                observations: vec![observation],
                est_lat_deg: settings.est_lat_deg,
                est_lon_deg: settings.est_lon_deg,
                lon_east_positive: settings.lon_east_positive,
            }
        };
        let lop = tokio::select! {
            () = self.c_tok.cancelled() => return,
            res = self.lop_solver.compute_lop(&request) => match res {
                Ok(resp) => LineOfPosition::from_response(&resp),
                Err(e) => LineOfPosition::failed(format!("line of position failed: {e:?}")),
            }
        };
        match lop.error() {
            None => sight!(
                "Sighting {} line of position: intercept {:.2} NM, azimuth {:.1}°",
                self.id,
                lop.intercept_nm(),
                lop.azimuth_deg()
            ),
            Some(e) => warn!("Sighting {} line of position failed: {e}", self.id),
        }
        if let Some(sighting) = self.shared.update_if_live(self.id, &self.c_tok, |s| {
            s.set_lop(lop);
        })
        .await
        {
            self.dump(&sighting);
        }
    }

    /// Runs the plate solver, `None` if the task was cancelled meanwhile.
    async fn plate_solve(&self) -> Option<PlateSolveResult> {
        let timeout = self.nav_settings.borrow().solve_timeout;
        let solve = tokio::time::timeout(
            timeout.saturating_add(Self::LOCAL_GUARD),
            self.plate_solver.solve(&self.image_reference, timeout),
        );
        tokio::select! {
            () = self.c_tok.cancelled() => None,
            res = solve => Some(match res {
                Ok(Ok(resp)) => PlateSolveResult::from_response(resp),
                Ok(Err(CollaboratorError::Timeout)) | Err(_) => PlateSolveResult::failure(
                    FailureReason::Timeout,
                    Some(format!("no answer within {} ms", timeout.as_millis())),
                ),
                Ok(Err(e)) => PlateSolveResult::failure(FailureReason::IOError, Some(format!("{e:?}"))),
            }),
        }
    }

    fn dump(&self, sighting: &Sighting) {
        let Some(dir) = &self.dump_dir else { return };
        if let Err(e) = sighting.dump_json(dir) {
            warn!("Failed to write record of sighting {}: {e}", self.id);
        }
    }
}
