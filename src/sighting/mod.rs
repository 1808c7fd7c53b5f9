mod analysis_task;
#[allow(clippy::module_inception)]
mod sighting;
mod sighting_registry;
#[cfg(test)]
mod tests;

pub use sighting::{
    AnalysisState, CaptureSource, FailureReason, LineOfPosition, PlateSolveResult, Sighting, SightingId,
};
pub use sighting_registry::{RegistryError, SightingRegistry};
