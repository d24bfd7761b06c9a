use std::fmt;

use lhs_core::linalg::CMatrix;
use lhs_core::LhsError;
use serde::{Deserialize, Serialize};

use crate::problem::SdpProblem;

/// Terminal status reported by a [`PsdFeasibilitySolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SolveStatus {
    /// A point satisfying every constraint was found.
    Feasible,
    /// A Farkas ray proving infeasibility was found.
    Infeasible,
    /// The iteration budget ran out before either proof was reached.
    IterationLimit,
    /// The backend stopped without a usable proof either way.
    NumericalError,
}

impl SolveStatus {
    /// True for the two statuses that decide the problem.
    pub fn is_decisive(self) -> bool {
        matches!(self, SolveStatus::Feasible | SolveStatus::Infeasible)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStatus::Feasible => write!(f, "feasible"),
            SolveStatus::Infeasible => write!(f, "infeasible"),
            SolveStatus::IterationLimit => write!(f, "iteration-limit"),
            SolveStatus::NumericalError => write!(f, "numerical-error"),
        }
    }
}

/// Everything a solver hands back after a single invocation.
///
/// When the status is [`SolveStatus::Infeasible`] the duals form a Farkas
/// ray `y`: the adjoint `A*(y)` is PSD on PSD variables and zero on free
/// Hermitian variables, while `<y, b> < 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverReport {
    /// Terminal status.
    pub status: SolveStatus,
    /// Last iterate, one matrix per declared variable; zeros when the backend returns none.
    pub primal: Vec<CMatrix>,
    /// Dual block per matrix equality.
    pub equality_duals: Vec<CMatrix>,
    /// Dual scalar per trace equality.
    pub trace_duals: Vec<f64>,
    /// Iterations performed.
    pub iterations: usize,
    /// `||A(X) - b||` at the last iterate, in the caller's units.
    pub residual_norm: f64,
}

/// Capability to decide a [`SdpProblem`].
pub trait PsdFeasibilitySolver: Send + Sync {
    /// Short identifier recorded in diagnostics.
    fn name(&self) -> &str;

    /// Solves the problem once; never retries.
    fn solve(&self, problem: &SdpProblem) -> Result<SolverReport, LhsError>;
}
