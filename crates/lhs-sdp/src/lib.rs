#![deny(missing_docs)]
#![doc = "PSD feasibility problems, the solver capability trait, the clarabel \
backend and a secondary projected-gradient backend."]

mod backend;
pub mod conic;
pub mod gradient;
pub mod problem;
mod solver;

pub use backend::Backend;
pub use conic::{ClarabelSettings, ClarabelSolver};
pub use gradient::{GradientSettings, ProjectedGradientSolver};
pub use problem::{
    EqualityId, MatrixEquality, MatrixVar, SdpProblem, TraceEquality, TraceId, VarId, VarKind,
};
pub use solver::{PsdFeasibilitySolver, SolveStatus, SolverReport};
