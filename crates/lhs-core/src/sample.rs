//! Reference states, measurements and random LHS models.

use nalgebra::Complex;

use crate::assemblage::Assemblage;
use crate::errors::{ErrorInfo, LhsError};
use crate::linalg::{identity, projector, real, trace_re, CMatrix};
use crate::model::LhsModel;
use crate::rng::RngHandle;
use crate::strategy::DeterministicStrategies;

/// Density matrix of `|Phi> = sum_i |ii> / sqrt(dim)`.
pub fn maximally_entangled(dim: usize) -> CMatrix {
    let mut v = vec![Complex::new(0.0, 0.0); dim * dim];
    let amp = 1.0 / (dim as f64).sqrt();
    for i in 0..dim {
        v[i * dim + i] = real(amp);
    }
    projector(&v)
}

/// Isotropic state `v |Phi><Phi| + (1 - v) I / dim^2`.
pub fn isotropic_state(dim: usize, visibility: f64) -> CMatrix {
    let total = dim * dim;
    maximally_entangled(dim) * real(visibility)
        + identity(total) * real((1.0 - visibility) / total as f64)
}

/// Projective qubit measurements in the Z, X and Y bases, in that order.
pub fn qubit_mub_measurements(inputs: usize) -> Result<Vec<Vec<CMatrix>>, LhsError> {
    if inputs == 0 || inputs > 3 {
        return Err(LhsError::Shape(
            ErrorInfo::new("mub-count", "a qubit has between one and three MUB measurements")
                .with_context("inputs", inputs),
        ));
    }
    let h = 1.0 / 2f64.sqrt();
    let bases = [
        [
            [real(1.0), real(0.0)],
            [real(0.0), real(1.0)],
        ],
        [[real(h), real(h)], [real(h), real(-h)]],
        [
            [real(h), Complex::new(0.0, h)],
            [real(h), Complex::new(0.0, -h)],
        ],
    ];
    Ok(bases
        .iter()
        .take(inputs)
        .map(|basis| basis.iter().map(|vector| projector(vector)).collect())
        .collect())
}

/// Assemblage steered from a two-qubit isotropic state with `inputs` MUB measurements.
///
/// Steerable exactly when `visibility > 1 / sqrt(inputs)` for two or three inputs.
pub fn noisy_qubit_assemblage(visibility: f64, inputs: usize) -> Result<Assemblage, LhsError> {
    let measurements = qubit_mub_measurements(inputs)?;
    Assemblage::from_state(&isotropic_state(2, visibility), 2, &measurements)
}

/// Random full-rank LHS model with unit total trace.
pub fn random_lhs_model(
    dim: usize,
    outcomes: usize,
    inputs: usize,
    rng: &mut RngHandle,
) -> Result<LhsModel, LhsError> {
    let strategies = DeterministicStrategies::enumerate(outcomes, inputs)?;
    let mut states: Vec<CMatrix> = (0..strategies.len())
        .map(|_| rng.psd_matrix(dim, dim, 0.1))
        .collect();
    let total: f64 = states.iter().map(trace_re).sum();
    for state in &mut states {
        *state *= real(1.0 / total);
    }
    LhsModel::new(dim, strategies, states)
}
