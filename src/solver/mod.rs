mod http_solvers;
mod lop_solver;
mod plate_solver;
mod solver_common;
#[cfg(test)]
pub(crate) mod test_doubles;

pub use http_solvers::{HttpLopSolver, HttpPlateSolver};
pub use lop_solver::{LopRequest, LopResponse, LopSolver, Observation, ObservationDetail};
pub use plate_solver::{PlateSolver, SolveResponse};
pub use solver_common::CollaboratorError;
