use super::{
    analysis_task::AnalysisTask,
    sighting::{CaptureSource, LineOfPosition, Sighting, SightingId},
};
use crate::config::NavSettings;
use crate::orientation::OrientationSnapshot;
use crate::solver::{LopSolver, PlateSolver};
use crate::{info, log, warn};
use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};
use strum_macros::Display;
use tokio::{
    sync::{Mutex, RwLock, watch},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Display, PartialEq, Eq)]
pub enum RegistryError {
    /// The registry already holds the maximum number of sightings.
    CapacityExceeded(usize),
    UnknownSighting(SightingId),
    EmptyImageReference,
}

impl std::error::Error for RegistryError {}

/// A live sighting together with the task analysing it.
struct Entry {
    sighting: Sighting,
    c_tok: CancellationToken,
    handle: JoinHandle<()>,
}

/// Registry state shared with the analysis tasks.
pub(super) struct SharedRegistry {
    entries: RwLock<HashMap<SightingId, Entry>>,
    view: watch::Sender<Vec<Sighting>>,
}

impl SharedRegistry {
    /// Applies `f` to the sighting `id` and publishes the new view.
    ///
    /// Nothing happens if the task was cancelled or the sighting removed; both
    /// are checked under the registry lock.
    ///
    /// # Returns
    /// The updated sighting, `None` if it was not live anymore.
    pub(super) async fn update_if_live<F>(&self, id: SightingId, c_tok: &CancellationToken, f: F) -> Option<Sighting>
    where F: FnOnce(&mut Sighting) {
        let mut entries = self.entries.write().await;
        if c_tok.is_cancelled() {
            return None;
        }
        let entry = entries.get_mut(&id)?;
        f(&mut entry.sighting);
        let updated = entry.sighting.clone();
        Self::publish_locked(&self.view, &entries);
        Some(updated)
    }

    fn publish_locked(view: &watch::Sender<Vec<Sighting>>, entries: &HashMap<SightingId, Entry>) {
        let mut sightings: Vec<Sighting> = entries.values().map(|e| e.sighting.clone()).collect();
        sightings.sort_by_key(Sighting::id);
        view.send_replace(sightings);
    }
}

/// Holds the live sightings (at most [`SightingRegistry::MAX_SIGHTINGS`]) and
/// drives one cancellable plate solve and line of position task per sighting.
///
/// Every mutation publishes a consistent view on a `watch` channel while the
/// registry lock is held, so readers and the fix aggregator never observe
/// partially applied updates.
pub struct SightingRegistry {
    shared: Arc<SharedRegistry>,
    next_id: AtomicU64,
    /// Handles of cancelled tasks that might still be unwinding.
    retired: Mutex<Vec<JoinHandle<()>>>,
    plate_solver: Arc<dyn PlateSolver>,
    lop_solver: Arc<dyn LopSolver>,
    nav_settings: watch::Receiver<NavSettings>,
    dump_dir: Option<PathBuf>,
}

impl SightingRegistry {
    pub const MAX_SIGHTINGS: usize = 3;

    /// Creates an empty registry.
    ///
    /// # Arguments
    /// * `plate_solver` - Collaborator identifying the stars in the images.
    /// * `lop_solver` - Collaborator reducing solved sightings to lines of position.
    /// * `nav_settings` - Provides the estimated position and the solve timeout.
    /// * `dump_dir` - Directory receiving a JSON record of every finished sighting.
    pub fn new(
        plate_solver: Arc<dyn PlateSolver>,
        lop_solver: Arc<dyn LopSolver>,
        nav_settings: watch::Receiver<NavSettings>,
        dump_dir: Option<PathBuf>,
    ) -> Self {
        let (view, _) = watch::channel(Vec::new());
        Self {
            shared: Arc::new(SharedRegistry { entries: RwLock::new(HashMap::new()), view }),
            next_id: AtomicU64::new(1),
            retired: Mutex::new(Vec::new()),
            plate_solver,
            lop_solver,
            nav_settings,
            dump_dir,
        }
    }

    /// Adds a new pending sighting and starts its analysis.
    ///
    /// # Errors
    /// [`RegistryError::CapacityExceeded`] if three sightings exist already, the
    /// registry stays untouched in that case.
    pub async fn add_sighting(
        &self,
        image_reference: String,
        capture_orientation: OrientationSnapshot,
        source: CaptureSource,
    ) -> Result<SightingId, RegistryError> {
        if image_reference.trim().is_empty() {
            return Err(RegistryError::EmptyImageReference);
        }
        let mut entries = self.shared.entries.write().await;
        if entries.len() >= Self::MAX_SIGHTINGS {
            warn!("Rejecting sighting of {image_reference}: registry full");
            return Err(RegistryError::CapacityExceeded(Self::MAX_SIGHTINGS));
        }
        let id = SightingId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let sighting = Sighting::new(id, image_reference, source, capture_orientation);
        let c_tok = CancellationToken::new();
        let task = AnalysisTask::new(
            sighting.clone(),
            Arc::clone(&self.shared),
            Arc::clone(&self.plate_solver),
            Arc::clone(&self.lop_solver),
            self.nav_settings.clone(),
            self.dump_dir.clone(),
            c_tok.clone(),
        );
        // the task blocks on the registry lock until the entry is in place
        let handle = tokio::spawn(task.run());
        entries.insert(id, Entry { sighting, c_tok, handle });
        SharedRegistry::publish_locked(&self.shared.view, &entries);
        info!("Added sighting {id} ({} live)", entries.len());
        Ok(id)
    }

    /// Cancels the analysis of `id` and removes the sighting.
    pub async fn remove_sighting(&self, id: SightingId) -> Result<(), RegistryError> {
        let entry = {
            let mut entries = self.shared.entries.write().await;
            let entry = entries.remove(&id).ok_or(RegistryError::UnknownSighting(id))?;
            entry.c_tok.cancel();
            SharedRegistry::publish_locked(&self.shared.view, &entries);
            entry
        };
        self.retire(vec![entry.handle]).await;
        info!("Removed sighting {id}");
        Ok(())
    }

    /// Cancels every analysis and clears the registry.
    pub async fn remove_all(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut entries = self.shared.entries.write().await;
            let handles = entries
                .drain()
                .map(|(_, entry)| {
                    entry.c_tok.cancel();
                    entry.handle
                })
                .collect();
            SharedRegistry::publish_locked(&self.shared.view, &entries);
            handles
        };
        let count = handles.len();
        self.retire(handles).await;
        info!("Removed all sightings ({count})");
    }

    async fn retire(&self, handles: Vec<JoinHandle<()>>) {
        let mut retired = self.retired.lock().await;
        retired.retain(|h| !h.is_finished());
        retired.extend(handles);
    }

    /// Replaces the lines of position of the given sightings.
    ///
    /// Sightings that vanished or are not solved are skipped. The view is
    /// published once.
    pub async fn backfill_lops(&self, lops: Vec<(SightingId, LineOfPosition)>) {
        let mut entries = self.shared.entries.write().await;
        let mut changed = false;
        for (id, lop) in lops {
            if let Some(entry) = entries.get_mut(&id) {
                if entry.sighting.lop() != Some(&lop) {
                    changed |= entry.sighting.set_lop(lop);
                }
            }
        }
        if changed {
            SharedRegistry::publish_locked(&self.shared.view, &entries);
        }
    }

    /// Returns the current sightings ordered by id.
    pub fn sightings(&self) -> Vec<Sighting> { self.shared.view.borrow().clone() }

    pub fn get(&self, id: SightingId) -> Option<Sighting> {
        self.shared.view.borrow().iter().find(|s| s.id() == id).cloned()
    }

    /// Subscribes to every published registry view.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Sighting>> { self.shared.view.subscribe() }

    /// Number of analysis tasks that have not terminated yet, including cancelled ones.
    pub async fn active_task_count(&self) -> usize {
        let live = self.shared.entries.read().await.values().filter(|e| !e.handle.is_finished()).count();
        let retired = self.retired.lock().await.iter().filter(|h| !h.is_finished()).count();
        live + retired
    }

    /// Removes all sightings, waits for every task to terminate and releases the collaborators.
    pub async fn shutdown(&self) {
        self.remove_all().await;
        let handles: Vec<JoinHandle<()>> = self.retired.lock().await.drain(..).collect();
        for res in futures::future::join_all(handles).await {
            if let Err(e) = res {
                warn!("Sighting task ended abnormally: {e}");
            }
        }
        self.plate_solver.release().await;
        self.lop_solver.release().await;
        log!("Sighting registry shut down");
    }
}
