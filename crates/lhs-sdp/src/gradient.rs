//! Secondary first-order backend, kept for cross-checking [`crate::ClarabelSolver`].
//!
//! Minimizes `1/2 ||A(X) - b||^2` over the variable cones. A vanishing
//! residual proves feasibility; at a non-zero minimizer the residual
//! `r = A(X) - b` satisfies `A*(r) ⪰ 0` and `<r, b> = -||r||^2`, which is the
//! Farkas ray reported for infeasible problems.

use lhs_core::linalg::{
    hermitian_part, hs_inner, min_eigenvalue, project_psd, real, trace_re, zeros, CMatrix,
};
use lhs_core::LhsError;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::problem::{SdpProblem, VarKind};
use crate::solver::{PsdFeasibilitySolver, SolveStatus, SolverReport};

fn default_max_iterations() -> usize {
    200_000
}

fn default_feasibility_tol() -> f64 {
    1e-8
}

fn default_certificate_tol() -> f64 {
    1e-6
}

fn default_check_interval() -> usize {
    10
}

/// Knobs for [`ProjectedGradientSolver`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientSettings {
    /// Iteration budget before reporting [`SolveStatus::IterationLimit`].
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Residual norm (relative to `||b||`) below which the problem is feasible.
    #[serde(default = "default_feasibility_tol")]
    pub feasibility_tol: f64,
    /// Allowed negativity of `A*(r)`, relative to `||r||`, for an infeasibility proof.
    #[serde(default = "default_certificate_tol")]
    pub certificate_tol: f64,
    /// Iterations between termination checks.
    #[serde(default = "default_check_interval")]
    pub check_interval: usize,
}

impl Default for GradientSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            feasibility_tol: default_feasibility_tol(),
            certificate_tol: default_certificate_tol(),
            check_interval: default_check_interval(),
        }
    }
}

/// FISTA with gradient-based adaptive restart on the least-squares residual.
#[derive(Debug, Clone, Default)]
pub struct ProjectedGradientSolver {
    settings: GradientSettings,
}

impl ProjectedGradientSolver {
    /// Creates a solver with the given settings.
    pub fn new(settings: GradientSettings) -> Self {
        Self { settings }
    }

    /// Active settings.
    pub fn settings(&self) -> &GradientSettings {
        &self.settings
    }
}

/// Residual of every constraint at a point, in units where `||b|| = 1`.
struct Residual {
    matrix: Vec<CMatrix>,
    scalar: Vec<f64>,
}

impl Residual {
    fn norm(&self) -> f64 {
        let matrix: f64 = self.matrix.iter().map(|r| r.norm_squared()).sum();
        let scalar: f64 = self.scalar.iter().map(|r| r * r).sum();
        (matrix + scalar).sqrt()
    }
}

struct Scaled<'a> {
    problem: &'a SdpProblem,
    scale: f64,
}

impl Scaled<'_> {
    fn residual(&self, x: &[CMatrix]) -> Residual {
        let inv = 1.0 / self.scale;
        let matrix = self
            .problem
            .equalities()
            .iter()
            .map(|eq| {
                let mut acc = eq.constant.clone() * real(-inv);
                for &(var, coeff) in &eq.terms {
                    acc += &x[var.index()] * real(coeff);
                }
                acc
            })
            .collect();
        let scalar = self
            .problem
            .trace_equalities()
            .iter()
            .map(|eq| {
                eq.terms
                    .iter()
                    .map(|&(var, coeff)| coeff * trace_re(&x[var.index()]))
                    .sum::<f64>()
                    - eq.value * inv
            })
            .collect();
        Residual { matrix, scalar }
    }

    /// `A*(r)`, one block per variable.
    fn adjoint(&self, r: &Residual) -> Vec<CMatrix> {
        let mut grad: Vec<CMatrix> = self
            .problem
            .variables()
            .iter()
            .map(|var| zeros(var.dim))
            .collect();
        for (eq, block) in self.problem.equalities().iter().zip(&r.matrix) {
            for &(var, coeff) in &eq.terms {
                grad[var.index()] += block * real(coeff);
            }
        }
        for (eq, value) in self.problem.trace_equalities().iter().zip(&r.scalar) {
            for &(var, coeff) in &eq.terms {
                for i in 0..grad[var.index()].nrows() {
                    grad[var.index()][(i, i)] += real(coeff * value);
                }
            }
        }
        grad
    }

    /// `<r, b>` with `b` in scaled units.
    fn pairing(&self, r: &Residual) -> f64 {
        let inv = 1.0 / self.scale;
        let matrix: f64 = self
            .problem
            .equalities()
            .iter()
            .zip(&r.matrix)
            .map(|(eq, block)| hs_inner(block, &eq.constant) * inv)
            .sum();
        let scalar: f64 = self
            .problem
            .trace_equalities()
            .iter()
            .zip(&r.scalar)
            .map(|(eq, value)| value * eq.value * inv)
            .sum();
        matrix + scalar
    }
}

fn rhs_norm(problem: &SdpProblem) -> f64 {
    let matrix: f64 = problem
        .equalities()
        .iter()
        .map(|eq| eq.constant.norm_squared())
        .sum();
    let scalar: f64 = problem
        .trace_equalities()
        .iter()
        .map(|eq| eq.value * eq.value)
        .sum();
    (matrix + scalar).sqrt()
}

/// Schur-test bound on `||A||^2` using per-block operator norms.
fn lipschitz_bound(problem: &SdpProblem) -> f64 {
    let mut col_sums = vec![0.0f64; problem.variables().len()];
    let mut max_row = 0.0f64;
    for eq in problem.equalities() {
        let mut row = 0.0;
        for &(var, coeff) in &eq.terms {
            row += coeff.abs();
            col_sums[var.index()] += coeff.abs();
        }
        max_row = max_row.max(row);
    }
    for eq in problem.trace_equalities() {
        let mut row = 0.0;
        for &(var, coeff) in &eq.terms {
            let weight = coeff.abs() * (problem.variables()[var.index()].dim as f64).sqrt();
            row += weight;
            col_sums[var.index()] += weight;
        }
        max_row = max_row.max(row);
    }
    let max_col = col_sums.iter().copied().fold(0.0, f64::max);
    let bound = max_row * max_col;
    if bound > 0.0 {
        bound
    } else {
        1.0
    }
}

fn project(kind: VarKind, m: &CMatrix) -> CMatrix {
    match kind {
        VarKind::Psd => project_psd(m),
        VarKind::Hermitian => hermitian_part(m),
    }
}

fn all_finite(x: &[CMatrix]) -> bool {
    x.iter()
        .all(|m| m.iter().all(|z| z.re.is_finite() && z.im.is_finite()))
}

impl ProjectedGradientSolver {
    fn certificate_holds(
        &self,
        problem: &SdpProblem,
        op: &Scaled<'_>,
        residual: &Residual,
        norm: f64,
    ) -> bool {
        let margin = -op.pairing(residual);
        if margin < 0.5 * norm * norm {
            return false;
        }
        let slack = self.settings.certificate_tol * norm;
        let grad = op.adjoint(residual);
        problem
            .variables()
            .iter()
            .zip(&grad)
            .all(|(var, block)| match var.kind {
                VarKind::Psd => min_eigenvalue(block) >= -slack,
                VarKind::Hermitian => block.norm() <= slack,
            })
    }

    fn finish(
        &self,
        status: SolveStatus,
        x: Vec<CMatrix>,
        residual: Residual,
        scale: f64,
        iterations: usize,
    ) -> SolverReport {
        let norm = residual.norm() * scale;
        debug!(%status, iterations, residual = norm, "projected gradient finished");
        let factor = real(scale);
        let (equality_duals, trace_duals) = if status == SolveStatus::Infeasible {
            (
                residual.matrix.into_iter().map(|r| r * factor).collect(),
                residual.scalar.into_iter().map(|r| r * scale).collect(),
            )
        } else {
            (Vec::new(), Vec::new())
        };
        SolverReport {
            status,
            primal: x.into_iter().map(|m| m * factor).collect(),
            equality_duals,
            trace_duals,
            iterations,
            residual_norm: norm,
        }
    }
}

impl PsdFeasibilitySolver for ProjectedGradientSolver {
    fn name(&self) -> &str {
        "projected-gradient"
    }

    fn solve(&self, problem: &SdpProblem) -> Result<SolverReport, LhsError> {
        let vars = problem.variables();
        let scale = rhs_norm(problem);
        let mut x: Vec<CMatrix> = vars.iter().map(|var| zeros(var.dim)).collect();
        if scale == 0.0 {
            let op = Scaled {
                problem,
                scale: 1.0,
            };
            let residual = op.residual(&x);
            return Ok(self.finish(SolveStatus::Feasible, x, residual, 1.0, 0));
        }
        let op = Scaled { problem, scale };
        let step = 1.0 / lipschitz_bound(problem);
        let check_interval = self.settings.check_interval.max(1);
        debug!(
            variables = vars.len(),
            equalities = problem.equalities().len(),
            trace_equalities = problem.trace_equalities().len(),
            step,
            "projected gradient started"
        );

        let mut y = x.clone();
        let mut momentum = 1.0f64;
        for iteration in 1..=self.settings.max_iterations {
            let grad = op.adjoint(&op.residual(&y));
            let next: Vec<CMatrix> = vars
                .iter()
                .zip(y.iter().zip(&grad))
                .map(|(var, (point, g))| project(var.kind, &(point - g * real(step))))
                .collect();
            if !all_finite(&next) {
                let residual = op.residual(&x);
                return Ok(self.finish(SolveStatus::NumericalError, x, residual, scale, iteration));
            }

            let next_momentum = (1.0 + (1.0 + 4.0 * momentum * momentum).sqrt()) / 2.0;
            let restart: f64 = y
                .iter()
                .zip(&next)
                .zip(&x)
                .map(|((point, new), old)| hs_inner(&(point - new), &(new - old)))
                .sum();
            if restart > 0.0 {
                momentum = 1.0;
                y = next.clone();
            } else {
                let beta = real((momentum - 1.0) / next_momentum);
                y = next
                    .iter()
                    .zip(&x)
                    .map(|(new, old)| new + (new - old) * beta)
                    .collect();
                momentum = next_momentum;
            }
            x = next;

            if iteration % check_interval != 0 && iteration != self.settings.max_iterations {
                continue;
            }
            let residual = op.residual(&x);
            let norm = residual.norm();
            if !norm.is_finite() {
                return Ok(self.finish(SolveStatus::NumericalError, x, residual, scale, iteration));
            }
            if norm <= self.settings.feasibility_tol {
                return Ok(self.finish(SolveStatus::Feasible, x, residual, scale, iteration));
            }
            if self.certificate_holds(problem, &op, &residual, norm) {
                return Ok(self.finish(SolveStatus::Infeasible, x, residual, scale, iteration));
            }
        }
        let residual = op.residual(&x);
        Ok(self.finish(
            SolveStatus::IterationLimit,
            x,
            residual,
            scale,
            self.settings.max_iterations,
        ))
    }
}
