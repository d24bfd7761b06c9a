//! Interior-point backend on the `clarabel` conic solver.
//!
//! A Hermitian `d × d` variable `X = A + iB` is stored as `d^2` real
//! parameters: the diagonal, then `(Re, Im)` of each upper off-diagonal entry.
//! PSD variables are tied to the real symmetric embedding
//! `[[A, -B], [B, A]]` through a `PSDTriangleConeT(2d)` block, which is PSD iff
//! `X` is. Equalities become zero-cone rows. A primal infeasibility
//! certificate `z` (with `A^T z = 0`, `z ∈ K*`, `<b, z> < 0`) restricted to
//! the zero-cone rows is exactly the Farkas ray of the Hermitian problem.

use clarabel::algebra::CscMatrix;
use clarabel::solver::{DefaultSettings, DefaultSolver, IPSolver, SolverStatus, SupportedConeT};
use lhs_core::linalg::{hs_inner, zeros, CMatrix};
use lhs_core::LhsError;
use nalgebra::Complex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::problem::{SdpProblem, VarKind};
use crate::solver::{PsdFeasibilitySolver, SolveStatus, SolverReport};

fn default_max_iter() -> u32 {
    200
}

fn default_tol() -> f64 {
    1e-8
}

/// Knobs for [`ClarabelSolver`]; the rest of clarabel's settings keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClarabelSettings {
    /// Interior-point iteration budget.
    #[serde(default = "default_max_iter")]
    pub max_iter: u32,
    /// Primal and dual feasibility tolerance.
    #[serde(default = "default_tol")]
    pub tol_feas: f64,
    /// Absolute duality gap tolerance.
    #[serde(default = "default_tol")]
    pub tol_gap_abs: f64,
    /// Relative duality gap tolerance.
    #[serde(default = "default_tol")]
    pub tol_gap_rel: f64,
    /// Absolute tolerance on infeasibility certificates.
    #[serde(default = "default_tol")]
    pub tol_infeas_abs: f64,
    /// Relative tolerance on infeasibility certificates.
    #[serde(default = "default_tol")]
    pub tol_infeas_rel: f64,
    /// Print clarabel's iteration log to stdout.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for ClarabelSettings {
    fn default() -> Self {
        Self {
            max_iter: default_max_iter(),
            tol_feas: default_tol(),
            tol_gap_abs: default_tol(),
            tol_gap_rel: default_tol(),
            tol_infeas_abs: default_tol(),
            tol_infeas_rel: default_tol(),
            verbose: false,
        }
    }
}

impl ClarabelSettings {
    fn to_clarabel(&self) -> DefaultSettings<f64> {
        DefaultSettings {
            max_iter: self.max_iter,
            tol_feas: self.tol_feas,
            tol_gap_abs: self.tol_gap_abs,
            tol_gap_rel: self.tol_gap_rel,
            tol_infeas_abs: self.tol_infeas_abs,
            tol_infeas_rel: self.tol_infeas_rel,
            verbose: self.verbose,
            ..DefaultSettings::default()
        }
    }
}

/// Default backend: the Hermitian problem as a real conic program for clarabel.
#[derive(Debug, Clone, Default)]
pub struct ClarabelSolver {
    settings: ClarabelSettings,
}

impl ClarabelSolver {
    /// Creates a solver with the given settings.
    pub fn new(settings: ClarabelSettings) -> Self {
        Self { settings }
    }

    /// Active settings.
    pub fn settings(&self) -> &ClarabelSettings {
        &self.settings
    }
}

/// Real parameter layout of one Hermitian variable.
#[derive(Debug, Clone, Copy)]
struct Layout {
    offset: usize,
    dim: usize,
}

impl Layout {
    fn len(&self) -> usize {
        self.dim * self.dim
    }

    fn diag(&self, k: usize) -> usize {
        self.offset + k
    }

    fn pair(&self, i: usize, j: usize) -> usize {
        debug_assert!(i < j);
        i * self.dim - i * (i + 1) / 2 + (j - i - 1)
    }

    fn re(&self, i: usize, j: usize) -> usize {
        self.offset + self.dim + 2 * self.pair(i, j)
    }

    fn im(&self, i: usize, j: usize) -> usize {
        self.re(i, j) + 1
    }

    /// `Re X[i][j]` as `(parameter, coefficient)`.
    fn real_entry(&self, i: usize, j: usize) -> (usize, f64) {
        match i.cmp(&j) {
            std::cmp::Ordering::Equal => (self.diag(i), 1.0),
            std::cmp::Ordering::Less => (self.re(i, j), 1.0),
            std::cmp::Ordering::Greater => (self.re(j, i), 1.0),
        }
    }

    /// `Im X[i][j]`, absent on the diagonal.
    fn imag_entry(&self, i: usize, j: usize) -> Option<(usize, f64)> {
        match i.cmp(&j) {
            std::cmp::Ordering::Equal => None,
            std::cmp::Ordering::Less => Some((self.im(i, j), 1.0)),
            std::cmp::Ordering::Greater => Some((self.im(j, i), -1.0)),
        }
    }

    fn read(&self, x: &[f64]) -> CMatrix {
        let mut m = zeros(self.dim);
        for i in 0..self.dim {
            m[(i, i)] = Complex::new(x[self.diag(i)], 0.0);
            for j in (i + 1)..self.dim {
                let value = Complex::new(x[self.re(i, j)], x[self.im(i, j)]);
                m[(i, j)] = value;
                m[(j, i)] = value.conj();
            }
        }
        m
    }
}

/// Conic data in triplet form, compressed to CSC at the end.
struct ConicData {
    triplets: Vec<(usize, usize, f64)>,
    rhs: Vec<f64>,
}

impl ConicData {
    fn push_row(&mut self, entries: impl IntoIterator<Item = (usize, f64)>, rhs: f64) -> usize {
        let row = self.rhs.len();
        for (col, value) in entries {
            if value != 0.0 {
                self.triplets.push((row, col, value));
            }
        }
        self.rhs.push(rhs);
        row
    }

    fn into_csc(mut self, cols: usize) -> (CscMatrix<f64>, Vec<f64>) {
        self.triplets.sort_by(|a, b| (a.1, a.0).cmp(&(b.1, b.0)));
        let mut colptr = vec![0usize; cols + 1];
        let mut rowval: Vec<usize> = Vec::with_capacity(self.triplets.len());
        let mut nzval: Vec<f64> = Vec::with_capacity(self.triplets.len());
        let mut last: Option<(usize, usize)> = None;
        for (row, col, value) in self.triplets {
            if last == Some((row, col)) {
                if let Some(tail) = nzval.last_mut() {
                    *tail += value;
                }
                continue;
            }
            rowval.push(row);
            nzval.push(value);
            colptr[col + 1] += 1;
            last = Some((row, col));
        }
        for col in 0..cols {
            colptr[col + 1] += colptr[col];
        }
        let rows = self.rhs.len();
        (CscMatrix::new(rows, cols, colptr, rowval, nzval), self.rhs)
    }
}

/// Where the zero-cone rows of each constraint start.
struct RowMap {
    equalities: Vec<usize>,
    traces: Vec<usize>,
    zero_rows: usize,
}

fn layouts(problem: &SdpProblem) -> (Vec<Layout>, usize) {
    let mut offset = 0;
    let layouts = problem
        .variables()
        .iter()
        .map(|var| {
            let layout = Layout {
                offset,
                dim: var.dim,
            };
            offset += layout.len();
            layout
        })
        .collect();
    (layouts, offset)
}

fn equality_rows(problem: &SdpProblem, layouts: &[Layout], data: &mut ConicData) -> RowMap {
    let mut equalities = Vec::with_capacity(problem.equalities().len());
    for eq in problem.equalities() {
        let dim = eq.constant.nrows();
        equalities.push(data.rhs.len());
        for j in 0..dim {
            for i in 0..=j {
                let real_terms: Vec<(usize, f64)> = eq
                    .terms
                    .iter()
                    .map(|&(var, coeff)| {
                        let (col, unit) = layouts[var.index()].real_entry(i, j);
                        (col, coeff * unit)
                    })
                    .collect();
                data.push_row(real_terms, eq.constant[(i, j)].re);
                if i != j {
                    let imag_terms: Vec<(usize, f64)> = eq
                        .terms
                        .iter()
                        .filter_map(|&(var, coeff)| {
                            layouts[var.index()]
                                .imag_entry(i, j)
                                .map(|(col, unit)| (col, coeff * unit))
                        })
                        .collect();
                    data.push_row(imag_terms, eq.constant[(i, j)].im);
                }
            }
        }
    }
    let mut traces = Vec::with_capacity(problem.trace_equalities().len());
    for eq in problem.trace_equalities() {
        let terms: Vec<(usize, f64)> = eq
            .terms
            .iter()
            .flat_map(|&(var, coeff)| {
                let layout = layouts[var.index()];
                (0..layout.dim).map(move |k| (layout.diag(k), coeff))
            })
            .collect();
        traces.push(data.push_row(terms, eq.value));
    }
    RowMap {
        equalities,
        traces,
        zero_rows: data.rhs.len(),
    }
}

/// Rows `s = svec([[A, -B], [B, A]])`, upper triangle by columns, off-diagonals scaled by sqrt 2.
fn embedding_rows(layout: Layout, data: &mut ConicData) {
    let d = layout.dim;
    for q in 0..2 * d {
        for p in 0..=q {
            let scale = if p == q { 1.0 } else { std::f64::consts::SQRT_2 };
            let entry = if q < d {
                Some(layout.real_entry(p, q))
            } else if p < d {
                layout
                    .imag_entry(p, q - d)
                    .map(|(col, unit)| (col, -unit))
            } else {
                Some(layout.real_entry(p - d, q - d))
            };
            // A x + s = b with b = 0 puts s = -A x in the cone.
            data.push_row(entry.map(|(col, unit)| (col, -scale * unit)), 0.0);
        }
    }
}

/// Hermitian dual block of one equality, from its zero-cone multipliers.
fn equality_dual(z: &[f64], start: usize, dim: usize) -> CMatrix {
    let mut block = zeros(dim);
    let mut row = start;
    for j in 0..dim {
        for i in 0..=j {
            if i == j {
                block[(i, i)] = Complex::new(z[row], 0.0);
                row += 1;
            } else {
                let value = Complex::new(z[row] / 2.0, z[row + 1] / 2.0);
                block[(i, j)] = value;
                block[(j, i)] = value.conj();
                row += 2;
            }
        }
    }
    block
}

fn finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}

impl PsdFeasibilitySolver for ClarabelSolver {
    fn name(&self) -> &str {
        "clarabel"
    }

    fn solve(&self, problem: &SdpProblem) -> Result<SolverReport, LhsError> {
        let (layouts, cols) = layouts(problem);
        let mut data = ConicData {
            triplets: Vec::new(),
            rhs: Vec::new(),
        };
        let rows = equality_rows(problem, &layouts, &mut data);
        let empty: Vec<CMatrix> = problem.variables().iter().map(|var| zeros(var.dim)).collect();
        if rows.zero_rows == 0 {
            return Ok(SolverReport {
                status: SolveStatus::Feasible,
                primal: empty,
                equality_duals: Vec::new(),
                trace_duals: Vec::new(),
                iterations: 0,
                residual_norm: 0.0,
            });
        }

        let mut cones = vec![SupportedConeT::ZeroConeT(rows.zero_rows)];
        for (var, layout) in problem.variables().iter().zip(&layouts) {
            if var.kind == VarKind::Psd && layout.dim > 0 {
                embedding_rows(*layout, &mut data);
                cones.push(SupportedConeT::PSDTriangleConeT(2 * layout.dim));
            }
        }
        let (a, b) = data.into_csc(cols);
        let p = CscMatrix::new(cols, cols, vec![0; cols + 1], Vec::new(), Vec::new());
        let q = vec![0.0; cols];
        debug!(
            variables = problem.variables().len(),
            columns = cols,
            rows = b.len(),
            zero_rows = rows.zero_rows,
            "clarabel started"
        );

        let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, self.settings.to_clarabel());
        solver.solve();
        let solution = &solver.solution;
        let iterations = solution.iterations as usize;

        let decided = match solution.status {
            SolverStatus::Solved => SolveStatus::Feasible,
            SolverStatus::PrimalInfeasible => SolveStatus::Infeasible,
            SolverStatus::MaxIterations | SolverStatus::MaxTime => SolveStatus::IterationLimit,
            _ => SolveStatus::NumericalError,
        };

        let mut status = decided;
        let mut primal = empty;
        let mut equality_duals = Vec::new();
        let mut trace_duals = Vec::new();
        match decided {
            SolveStatus::Feasible if finite(&solution.x) => {
                primal = layouts.iter().map(|layout| layout.read(&solution.x)).collect();
            }
            SolveStatus::Infeasible if finite(&solution.z) => {
                equality_duals = problem
                    .equalities()
                    .iter()
                    .zip(&rows.equalities)
                    .map(|(eq, &start)| equality_dual(&solution.z, start, eq.constant.nrows()))
                    .collect();
                trace_duals = rows.traces.iter().map(|&row| solution.z[row]).collect();
                let pairing: f64 = problem
                    .equalities()
                    .iter()
                    .zip(&equality_duals)
                    .map(|(eq, y)| hs_inner(y, &eq.constant))
                    .sum::<f64>()
                    + problem
                        .trace_equalities()
                        .iter()
                        .zip(&trace_duals)
                        .map(|(eq, t)| eq.value * t)
                        .sum::<f64>();
                if pairing.is_nan() || pairing >= 0.0 {
                    equality_duals.clear();
                    trace_duals.clear();
                    status = SolveStatus::NumericalError;
                }
            }
            SolveStatus::Feasible | SolveStatus::Infeasible => {
                status = SolveStatus::NumericalError;
            }
            SolveStatus::IterationLimit | SolveStatus::NumericalError => {}
        }

        let residual_norm = problem.residual_norm(&primal)?;
        debug!(
            %status,
            clarabel_status = ?solution.status,
            iterations,
            residual = residual_norm,
            "clarabel finished"
        );
        Ok(SolverReport {
            status,
            primal,
            equality_duals,
            trace_duals,
            iterations,
            residual_norm,
        })
    }
}
