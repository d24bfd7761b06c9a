//! Precondition checks run before an assemblage reaches the solver.

use serde::{Deserialize, Serialize};

use crate::assemblage::Assemblage;
use crate::errors::{ErrorInfo, LhsError};
use crate::linalg::{hermitian_defect, min_eigenvalue, trace_re};

/// Whether the hidden-state ensemble must have unit total trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Normalization {
    /// No trace constraint; sub-normalized assemblages are allowed.
    #[default]
    Unnormalized,
    /// `tr(sum_lam siglam) = 1` and `sum_a tr sigma[a|x] = 1` for every input.
    Normalized,
}

impl Normalization {
    /// True for [`Normalization::Normalized`].
    pub fn is_normalized(self) -> bool {
        matches!(self, Normalization::Normalized)
    }
}

impl From<bool> for Normalization {
    fn from(normalized: bool) -> Self {
        if normalized {
            Normalization::Normalized
        } else {
            Normalization::Unnormalized
        }
    }
}

fn default_tol() -> f64 {
    1e-8
}

fn default_normalization_tol() -> f64 {
    1e-6
}

/// Tolerances used by [`validate_assemblage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOpts {
    /// Maximum Frobenius norm of `B - B†` for a block to count as Hermitian.
    #[serde(default = "default_tol")]
    pub hermitian_tol: f64,
    /// Most negative eigenvalue tolerated in a block.
    #[serde(default = "default_tol")]
    pub psd_tol: f64,
    /// Allowed deviation of `sum_a tr sigma[a|x]` from one in normalized mode.
    #[serde(default = "default_normalization_tol")]
    pub normalization_tol: f64,
}

impl Default for ValidationOpts {
    fn default() -> Self {
        Self {
            hermitian_tol: default_tol(),
            psd_tol: default_tol(),
            normalization_tol: default_normalization_tol(),
        }
    }
}

fn block_info(code: &str, message: &str, outcome: usize, input: usize, value: f64) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("outcome", outcome)
        .with_context("input", input)
        .with_context("value", format!("{value:.3e}"))
}

/// Checks shape, Hermiticity, positivity and (optionally) normalization.
pub fn validate_assemblage(
    sigma: &Assemblage,
    normalization: Normalization,
    opts: &ValidationOpts,
) -> Result<(), LhsError> {
    sigma.validate_shape().map_err(|err| match err {
        LhsError::Shape(info) => LhsError::InvalidAssemblage(info),
        other => other,
    })?;
    for x in 0..sigma.inputs() {
        for a in 0..sigma.outcomes() {
            let block = sigma.block(a, x);
            if block.iter().any(|entry| !entry.re.is_finite() || !entry.im.is_finite()) {
                return Err(LhsError::InvalidAssemblage(block_info(
                    "non-finite-block",
                    "block contains NaN or infinite entries",
                    a,
                    x,
                    f64::NAN,
                )));
            }
            let defect = hermitian_defect(block);
            if defect > opts.hermitian_tol {
                return Err(LhsError::InvalidAssemblage(block_info(
                    "not-hermitian",
                    "block is not Hermitian",
                    a,
                    x,
                    defect,
                )));
            }
            let lowest = min_eigenvalue(block);
            if lowest < -opts.psd_tol {
                return Err(LhsError::InvalidAssemblage(
                    block_info("not-psd", "block has a negative eigenvalue", a, x, lowest)
                        .with_hint("assemblage elements must be positive semidefinite"),
                ));
            }
        }
        if normalization.is_normalized() {
            let total = trace_re(&sigma.marginal(x));
            if (total - 1.0).abs() > opts.normalization_tol {
                return Err(LhsError::InvalidAssemblage(
                    ErrorInfo::new("not-normalized", "marginal trace differs from one")
                        .with_context("input", x)
                        .with_context("trace", format!("{total:.9}")),
                ));
            }
        }
    }
    Ok(())
}
