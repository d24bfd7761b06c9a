//! Deterministic RNG wrapper used for sample assemblages.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use crate::linalg::{real, CMatrix};

/// Deterministic RNG handle exposed to LHS consumers.
///
/// The handle is a thin wrapper around `StdRng`. A master `seed: u64` must be
/// provided by the caller; the same seed always yields the same sample
/// assemblages on every platform.
#[derive(Debug, Clone)]
pub struct RngHandle {
    rng: StdRng,
}

impl RngHandle {
    /// Creates a new RNG handle from a master seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Returns a mutable reference to the underlying RNG for advanced usage.
    pub fn inner_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Complex matrix with real and imaginary parts uniform in `[-1, 1)`.
    pub fn complex_matrix(&mut self, rows: usize, cols: usize) -> CMatrix {
        CMatrix::from_fn(rows, cols, |_, _| {
            nalgebra::Complex::new(
                self.rng.gen_range(-1.0..1.0),
                self.rng.gen_range(-1.0..1.0),
            )
        })
    }

    /// Random PSD matrix `G G† + floor * I` with `G` of shape `dim × rank`.
    pub fn psd_matrix(&mut self, dim: usize, rank: usize, floor: f64) -> CMatrix {
        let g = self.complex_matrix(dim, rank.max(1));
        &g * g.adjoint() + CMatrix::identity(dim, dim) * real(floor)
    }
}

impl RngCore for RngHandle {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}
