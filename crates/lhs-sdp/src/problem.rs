//! Solver-agnostic description of a PSD feasibility problem.

use lhs_core::linalg::{hermitian_defect, real, trace_re, CMatrix};
use lhs_core::{ErrorInfo, LhsError};
use serde::{Deserialize, Serialize};

/// Handle to a matrix variable of an [`SdpProblem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VarId(usize);

impl VarId {
    /// Position of the variable in [`SdpProblem::variables`].
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Handle to a matrix equality of an [`SdpProblem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EqualityId(usize);

impl EqualityId {
    /// Position of the constraint in [`SdpProblem::equalities`].
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Handle to a trace equality of an [`SdpProblem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TraceId(usize);

impl TraceId {
    /// Position of the constraint in [`SdpProblem::trace_equalities`].
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Cone a variable is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VarKind {
    /// Hermitian positive semidefinite.
    Psd,
    /// Any Hermitian matrix.
    Hermitian,
}

/// Declared matrix variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixVar {
    /// Side length of the square variable.
    pub dim: usize,
    /// Cone the variable lives in.
    pub kind: VarKind,
}

/// `sum_i coeff_i * X_{var_i} = constant`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixEquality {
    /// Variable terms with real coefficients.
    pub terms: Vec<(VarId, f64)>,
    /// Hermitian right-hand side.
    pub constant: CMatrix,
}

/// `sum_i coeff_i * tr X_{var_i} = value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEquality {
    /// Variable terms with real coefficients.
    pub terms: Vec<(VarId, f64)>,
    /// Scalar right-hand side.
    pub value: f64,
}

/// Variables plus linear equality constraints; there is no objective.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SdpProblem {
    variables: Vec<MatrixVar>,
    equalities: Vec<MatrixEquality>,
    trace_equalities: Vec<TraceEquality>,
}

fn unknown_variable(var: VarId, count: usize) -> LhsError {
    LhsError::Shape(
        ErrorInfo::new("unknown-variable", "constraint references an undeclared variable")
            .with_context("variable", var.index())
            .with_context("declared", count),
    )
}

impl SdpProblem {
    /// Creates an empty problem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a `dim × dim` variable in the given cone.
    pub fn add_variable(&mut self, dim: usize, kind: VarKind) -> VarId {
        self.variables.push(MatrixVar { dim, kind });
        VarId(self.variables.len() - 1)
    }

    /// Declares a PSD variable.
    pub fn add_psd_variable(&mut self, dim: usize) -> VarId {
        self.add_variable(dim, VarKind::Psd)
    }

    /// Adds `sum_i c_i X_i = constant`; every term must match the constant's shape.
    pub fn add_equality(
        &mut self,
        terms: Vec<(VarId, f64)>,
        constant: CMatrix,
    ) -> Result<EqualityId, LhsError> {
        if !constant.is_square() {
            return Err(LhsError::shape(
                "constant-shape",
                "equality right-hand side must be square",
            ));
        }
        if hermitian_defect(&constant) > 1e-9 * constant.norm().max(1.0) {
            return Err(LhsError::shape(
                "constant-not-hermitian",
                "equality right-hand side must be Hermitian",
            ));
        }
        for &(var, _) in &terms {
            let declared = self
                .variables
                .get(var.index())
                .ok_or_else(|| unknown_variable(var, self.variables.len()))?;
            if declared.dim != constant.nrows() {
                return Err(LhsError::Shape(
                    ErrorInfo::new("term-shape", "variable and constant dimensions differ")
                        .with_context("variable", var.index())
                        .with_context("variable_dim", declared.dim)
                        .with_context("constant_dim", constant.nrows()),
                ));
            }
        }
        self.equalities.push(MatrixEquality { terms, constant });
        Ok(EqualityId(self.equalities.len() - 1))
    }

    /// Adds `sum_i c_i tr X_i = value`.
    pub fn add_trace_equality(
        &mut self,
        terms: Vec<(VarId, f64)>,
        value: f64,
    ) -> Result<TraceId, LhsError> {
        for &(var, _) in &terms {
            if var.index() >= self.variables.len() {
                return Err(unknown_variable(var, self.variables.len()));
            }
        }
        self.trace_equalities.push(TraceEquality { terms, value });
        Ok(TraceId(self.trace_equalities.len() - 1))
    }

    /// Declared variables.
    pub fn variables(&self) -> &[MatrixVar] {
        &self.variables
    }

    /// Declared matrix equalities.
    pub fn equalities(&self) -> &[MatrixEquality] {
        &self.equalities
    }

    /// Declared trace equalities.
    pub fn trace_equalities(&self) -> &[TraceEquality] {
        &self.trace_equalities
    }

    /// Variable metadata for `var`.
    pub fn variable(&self, var: VarId) -> Option<&MatrixVar> {
        self.variables.get(var.index())
    }

    /// `||A(X) - b||` over every matrix and trace equality.
    pub fn residual_norm(&self, primal: &[CMatrix]) -> Result<f64, LhsError> {
        let block = |var: VarId| {
            primal
                .get(var.index())
                .filter(|m| m.nrows() == self.variables[var.index()].dim)
                .ok_or_else(|| {
                    LhsError::Shape(
                        ErrorInfo::new("primal-shape", "primal point does not match the variables")
                            .with_context("variable", var.index())
                            .with_context("provided", primal.len()),
                    )
                })
        };
        let mut total = 0.0;
        for eq in &self.equalities {
            let mut acc = -eq.constant.clone();
            for &(var, coeff) in &eq.terms {
                acc += block(var)? * real(coeff);
            }
            total += acc.norm_squared();
        }
        for eq in &self.trace_equalities {
            let mut acc = -eq.value;
            for &(var, coeff) in &eq.terms {
                acc += coeff * trace_re(block(var)?);
            }
            total += acc * acc;
        }
        Ok(total.sqrt())
    }
}
