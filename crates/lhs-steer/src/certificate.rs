use lhs_core::linalg::{hermitian_part, real, trace_re, CMatrix};
use lhs_core::{ErrorInfo, LhsError, SteeringFunctional};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constraints::LhsConstraints;

fn default_degeneracy_tol() -> f64 {
    1e-9
}

/// Options controlling certificate normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateOpts {
    /// Smallest admissible divisor relative to its Cauchy–Schwarz bound.
    #[serde(default = "default_degeneracy_tol")]
    pub degeneracy_tol: f64,
}

impl Default for CertificateOpts {
    fn default() -> Self {
        Self {
            degeneracy_tol: default_degeneracy_tol(),
        }
    }
}

/// Rescales a raw dual tensor so that `sum_{a,x,lam} D[a,x,lam] tr F[a|x] = 1`.
///
/// The divisor is `S = oa^(ma-1) * sum_{a,x} tr F_raw[a|x]`. It is rejected
/// when it is not finite, not positive, or below `degeneracy_tol` times
/// `oa^(ma-1) * sqrt(dB) * sum_{a,x} ||F_raw[a|x]||`, which bounds `|S|`.
pub fn normalize_certificate(
    raw: Vec<CMatrix>,
    constraints: &LhsConstraints,
    opts: &CertificateOpts,
) -> Result<SteeringFunctional, LhsError> {
    let strategies = constraints.strategies();
    let multiplicity = strategies.multiplicity() as f64;
    let divisor = multiplicity * raw.iter().map(trace_re).sum::<f64>();
    let bound = multiplicity
        * (constraints.dim() as f64).sqrt()
        * raw.iter().map(|block| block.norm()).sum::<f64>();

    if !divisor.is_finite() || divisor <= opts.degeneracy_tol * bound || bound == 0.0 {
        warn!(divisor, bound, "steering certificate cannot be normalized");
        return Err(LhsError::DegenerateCertificate(
            ErrorInfo::new("degenerate-divisor", "certificate trace sum is zero or negligible")
                .with_context("divisor", format!("{divisor:.3e}"))
                .with_context("bound", format!("{bound:.3e}"))
                .with_hint("the assemblage sits on the boundary of the LHS set"),
        ));
    }

    let factor = real(1.0 / divisor);
    let blocks = raw
        .iter()
        .map(|block| hermitian_part(&(block * factor)))
        .collect();
    SteeringFunctional::new(
        constraints.dim(),
        strategies.outcomes(),
        strategies.inputs(),
        blocks,
    )
}
