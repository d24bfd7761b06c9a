use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, LhsError};
use crate::linalg::{zeros, CMatrix};

fn shape_error(code: &str, message: impl Into<String>) -> LhsError {
    LhsError::shape(code, message)
}

/// Family of sub-normalized states `sigma[a|x]` on a `dim`-dimensional system.
///
/// Block `(a, x)` is stored at position `a + outcomes * x`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AssemblageFields")]
pub struct Assemblage {
    dim: usize,
    outcomes: usize,
    inputs: usize,
    blocks: Vec<CMatrix>,
}

#[derive(Deserialize)]
struct AssemblageFields {
    dim: usize,
    outcomes: usize,
    inputs: usize,
    blocks: Vec<CMatrix>,
}

impl TryFrom<AssemblageFields> for Assemblage {
    type Error = LhsError;

    fn try_from(fields: AssemblageFields) -> Result<Self, LhsError> {
        Self::new(fields.dim, fields.outcomes, fields.inputs, fields.blocks)
    }
}

impl Assemblage {
    /// Creates an assemblage from blocks ordered by `a + outcomes * x`.
    pub fn new(
        dim: usize,
        outcomes: usize,
        inputs: usize,
        blocks: Vec<CMatrix>,
    ) -> Result<Self, LhsError> {
        let assemblage = Self {
            dim,
            outcomes,
            inputs,
            blocks,
        };
        assemblage.check_shape()?;
        Ok(assemblage)
    }

    /// Builds an assemblage by evaluating `f(a, x)` for every block.
    pub fn from_fn(
        dim: usize,
        outcomes: usize,
        inputs: usize,
        mut f: impl FnMut(usize, usize) -> CMatrix,
    ) -> Result<Self, LhsError> {
        let mut blocks = Vec::with_capacity(outcomes * inputs);
        for x in 0..inputs {
            for a in 0..outcomes {
                blocks.push(f(a, x));
            }
        }
        Self::new(dim, outcomes, inputs, blocks)
    }

    /// Steers Bob's side of a bipartite state `rho` on `alice_dim * dim`.
    ///
    /// `measurements[x][a]` is Alice's effect for outcome `a` of input `x`;
    /// each block is `tr_A[(M_{a|x} ⊗ I) rho]`.
    pub fn from_state(
        rho: &CMatrix,
        alice_dim: usize,
        measurements: &[Vec<CMatrix>],
    ) -> Result<Self, LhsError> {
        if alice_dim == 0 || rho.nrows() % alice_dim != 0 || !rho.is_square() {
            return Err(LhsError::Shape(
                ErrorInfo::new("state-shape", "state is not square on alice_dim * dim")
                    .with_context("rows", rho.nrows())
                    .with_context("cols", rho.ncols())
                    .with_context("alice_dim", alice_dim),
            ));
        }
        let dim = rho.nrows() / alice_dim;
        let inputs = measurements.len();
        let outcomes = measurements.first().map(Vec::len).unwrap_or(0);
        let mut blocks = Vec::with_capacity(outcomes * inputs);
        for (x, effects) in measurements.iter().enumerate() {
            if effects.len() != outcomes {
                return Err(LhsError::Shape(
                    ErrorInfo::new("ragged-measurements", "inputs disagree on outcome count")
                        .with_context("input", x)
                        .with_context("expected", outcomes)
                        .with_context("found", effects.len()),
                ));
            }
            for effect in effects {
                if effect.nrows() != alice_dim || effect.ncols() != alice_dim {
                    return Err(shape_error(
                        "effect-shape",
                        "measurement effect does not act on alice_dim",
                    ));
                }
                let mut block = zeros(dim);
                for j in 0..dim {
                    for l in 0..dim {
                        let mut acc = nalgebra::Complex::new(0.0, 0.0);
                        for i in 0..alice_dim {
                            for m in 0..alice_dim {
                                acc += effect[(i, m)] * rho[(m * dim + j, i * dim + l)];
                            }
                        }
                        block[(j, l)] = acc;
                    }
                }
                blocks.push(block);
            }
        }
        Self::new(dim, outcomes, inputs, blocks)
    }

    fn check_shape(&self) -> Result<(), LhsError> {
        if self.dim == 0 || self.outcomes == 0 || self.inputs == 0 {
            return Err(LhsError::Shape(
                ErrorInfo::new("empty-assemblage", "dimensions must be positive")
                    .with_context("dim", self.dim)
                    .with_context("outcomes", self.outcomes)
                    .with_context("inputs", self.inputs),
            ));
        }
        if self.blocks.len() != self.outcomes * self.inputs {
            return Err(LhsError::Shape(
                ErrorInfo::new("block-count", "expected outcomes * inputs blocks")
                    .with_context("expected", self.outcomes * self.inputs)
                    .with_context("found", self.blocks.len()),
            ));
        }
        for (idx, block) in self.blocks.iter().enumerate() {
            if block.nrows() != self.dim || block.ncols() != self.dim {
                return Err(LhsError::Shape(
                    ErrorInfo::new("block-shape", "block is not dim x dim")
                        .with_context("outcome", idx % self.outcomes)
                        .with_context("input", idx / self.outcomes)
                        .with_context("rows", block.nrows())
                        .with_context("cols", block.ncols()),
                ));
            }
        }
        Ok(())
    }

    /// Re-checks the shape invariants (useful after deserialization).
    pub fn validate_shape(&self) -> Result<(), LhsError> {
        self.check_shape()
    }

    /// Dimension `dB` of every block.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of outcomes `oa`.
    pub fn outcomes(&self) -> usize {
        self.outcomes
    }

    /// Number of inputs `ma`.
    pub fn inputs(&self) -> usize {
        self.inputs
    }

    /// Block `sigma[a|x]`.
    pub fn block(&self, outcome: usize, input: usize) -> &CMatrix {
        &self.blocks[outcome + self.outcomes * input]
    }

    /// All blocks in storage order.
    pub fn blocks(&self) -> &[CMatrix] {
        &self.blocks
    }

    /// Consumes the assemblage and returns its blocks.
    pub fn into_blocks(self) -> Vec<CMatrix> {
        self.blocks
    }

    /// Marginal `sum_a sigma[a|x]` for input `x`.
    pub fn marginal(&self, input: usize) -> CMatrix {
        (0..self.outcomes).fold(zeros(self.dim), |acc, a| acc + self.block(a, input))
    }

    /// Largest Frobenius distance between the marginals of two inputs.
    pub fn signalling_deviation(&self) -> f64 {
        let reference = self.marginal(0);
        (1..self.inputs)
            .map(|x| (self.marginal(x) - &reference).norm())
            .fold(0.0, f64::max)
    }

    /// Returns `factor * sigma`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            dim: self.dim,
            outcomes: self.outcomes,
            inputs: self.inputs,
            blocks: self
                .blocks
                .iter()
                .map(|block| block * crate::linalg::real(factor))
                .collect(),
        }
    }

    /// Convex mixture `weight * self + (1 - weight) * other`.
    pub fn mixed_with(&self, other: &Assemblage, weight: f64) -> Result<Self, LhsError> {
        if self.dim != other.dim || self.outcomes != other.outcomes || self.inputs != other.inputs
        {
            return Err(shape_error(
                "mix-shape",
                "cannot mix assemblages of different shapes",
            ));
        }
        let keep = crate::linalg::real(weight);
        let rest = crate::linalg::real(1.0 - weight);
        let blocks = self
            .blocks
            .iter()
            .zip(&other.blocks)
            .map(|(mine, theirs)| mine * keep + theirs * rest)
            .collect();
        Self::new(self.dim, self.outcomes, self.inputs, blocks)
    }
}
