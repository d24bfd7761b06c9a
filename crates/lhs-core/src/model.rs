use serde::{Deserialize, Serialize};

use crate::assemblage::Assemblage;
use crate::errors::{ErrorInfo, LhsError};
use crate::linalg::{hs_inner, trace_re, zeros, CMatrix};
use crate::strategy::DeterministicStrategies;

/// Hidden states `siglam[lam]` reproducing an assemblage through deterministic strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ModelFields")]
pub struct LhsModel {
    dim: usize,
    strategies: DeterministicStrategies,
    hidden_states: Vec<CMatrix>,
}

#[derive(Deserialize)]
struct ModelFields {
    dim: usize,
    strategies: DeterministicStrategies,
    hidden_states: Vec<CMatrix>,
}

impl TryFrom<ModelFields> for LhsModel {
    type Error = LhsError;

    fn try_from(fields: ModelFields) -> Result<Self, LhsError> {
        Self::new(fields.dim, fields.strategies, fields.hidden_states)
    }
}

impl LhsModel {
    /// Creates a model with one `dim × dim` hidden state per strategy.
    pub fn new(
        dim: usize,
        strategies: DeterministicStrategies,
        hidden_states: Vec<CMatrix>,
    ) -> Result<Self, LhsError> {
        if hidden_states.len() != strategies.len() {
            return Err(LhsError::Shape(
                ErrorInfo::new("hidden-state-count", "expected one hidden state per strategy")
                    .with_context("expected", strategies.len())
                    .with_context("found", hidden_states.len()),
            ));
        }
        if hidden_states
            .iter()
            .any(|state| state.nrows() != dim || state.ncols() != dim)
        {
            return Err(LhsError::shape(
                "hidden-state-shape",
                "hidden state is not dim x dim",
            ));
        }
        Ok(Self {
            dim,
            strategies,
            hidden_states,
        })
    }

    /// Dimension of the hidden states.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Strategy table the hidden states are indexed by.
    pub fn strategies(&self) -> &DeterministicStrategies {
        &self.strategies
    }

    /// Hidden state for strategy `lam`.
    pub fn hidden_state(&self, lam: usize) -> &CMatrix {
        &self.hidden_states[lam]
    }

    /// All hidden states in strategy order.
    pub fn hidden_states(&self) -> &[CMatrix] {
        &self.hidden_states
    }

    /// Total trace `tr(sum_lam siglam[lam])`.
    pub fn total_trace(&self) -> f64 {
        self.hidden_states.iter().map(trace_re).sum()
    }

    /// Contracts the hidden states back into `sigma[a|x] = sum_lam D[a,x,lam] siglam[lam]`.
    pub fn reconstruct(&self) -> Result<Assemblage, LhsError> {
        let strategies = &self.strategies;
        Assemblage::from_fn(
            self.dim,
            strategies.outcomes(),
            strategies.inputs(),
            |a, x| {
                (0..strategies.len())
                    .filter(|&lam| strategies.indicator(a, x, lam))
                    .fold(zeros(self.dim), |acc, lam| acc + &self.hidden_states[lam])
            },
        )
    }
}

/// Hermitian functional `F[a|x]` separating an assemblage from the LHS set.
///
/// Every LHS assemblage scores `evaluate >= 0` whenever all strategy
/// operators are PSD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FunctionalFields")]
pub struct SteeringFunctional {
    dim: usize,
    outcomes: usize,
    inputs: usize,
    blocks: Vec<CMatrix>,
}

#[derive(Deserialize)]
struct FunctionalFields {
    dim: usize,
    outcomes: usize,
    inputs: usize,
    blocks: Vec<CMatrix>,
}

impl TryFrom<FunctionalFields> for SteeringFunctional {
    type Error = LhsError;

    fn try_from(fields: FunctionalFields) -> Result<Self, LhsError> {
        Self::new(fields.dim, fields.outcomes, fields.inputs, fields.blocks)
    }
}

impl SteeringFunctional {
    /// Creates a functional from blocks ordered by `a + outcomes * x`.
    pub fn new(
        dim: usize,
        outcomes: usize,
        inputs: usize,
        blocks: Vec<CMatrix>,
    ) -> Result<Self, LhsError> {
        // Same layout rules as an assemblage, minus positivity.
        let blocks = Assemblage::new(dim, outcomes, inputs, blocks)?.into_blocks();
        Ok(Self {
            dim,
            outcomes,
            inputs,
            blocks,
        })
    }

    /// Dimension of every block.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of outcomes.
    pub fn outcomes(&self) -> usize {
        self.outcomes
    }

    /// Number of inputs.
    pub fn inputs(&self) -> usize {
        self.inputs
    }

    /// Block `F[a|x]`.
    pub fn block(&self, outcome: usize, input: usize) -> &CMatrix {
        &self.blocks[outcome + self.outcomes * input]
    }

    /// All blocks in storage order.
    pub fn blocks(&self) -> &[CMatrix] {
        &self.blocks
    }

    /// `sum_{a,x} tr[F[a|x] sigma[a|x]]`.
    ///
    /// LHS assemblages score `>= 0` when every strategy operator is PSD.
    pub fn evaluate(&self, sigma: &Assemblage) -> Result<f64, LhsError> {
        if sigma.dim() != self.dim
            || sigma.outcomes() != self.outcomes
            || sigma.inputs() != self.inputs
        {
            return Err(LhsError::shape(
                "functional-shape",
                "functional and assemblage shapes differ",
            ));
        }
        Ok(self
            .blocks
            .iter()
            .zip(sigma.blocks())
            .map(|(f, s)| hs_inner(f, s))
            .sum())
    }

    /// Strategy operator `sum_{a,x} D[a,x,lam] F[a|x]`.
    pub fn strategy_operator(&self, strategies: &DeterministicStrategies, lam: usize) -> CMatrix {
        (0..self.inputs).fold(zeros(self.dim), |acc, x| {
            acc + self.block(strategies.output(lam, x), x)
        })
    }

    /// `sum_{a,x,lam} D[a,x,lam] tr F[a|x]`.
    pub fn strategy_trace_sum(&self, strategies: &DeterministicStrategies) -> f64 {
        (0..strategies.len())
            .map(|lam| trace_re(&self.strategy_operator(strategies, lam)))
            .sum()
    }
}
