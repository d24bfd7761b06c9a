//! Linear structure linking hidden states to an assemblage.
//!
//! Row `(a, x)` of the constraint tensor reads
//! `sigma[a|x] = sum_{lam in row} siglam[lam]`, where the row holds every
//! strategy answering `a` on input `x`. For a fixed `x` the rows partition the
//! strategies, so each hidden state enters exactly one equation per input.

use lhs_core::linalg::{zeros, CMatrix};
use lhs_core::{Assemblage, DeterministicStrategies, ErrorInfo, LhsError, Normalization};
use lhs_sdp::{EqualityId, SdpProblem, TraceId, VarId};
use serde::{Deserialize, Serialize};

/// One matrix equation of the constraint tensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintRow {
    /// Outcome `a` of the equation.
    pub outcome: usize,
    /// Input `x` of the equation.
    pub input: usize,
    /// Strategies whose hidden states sum to `sigma[a|x]`.
    pub strategies: Vec<usize>,
}

/// Constraint tensor for a `(dB, oa, ma)` scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LhsConstraints {
    dim: usize,
    strategies: DeterministicStrategies,
    rows: Vec<ConstraintRow>,
}

/// Right-hand side the hidden states are tied to when emitting constraints.
#[derive(Debug, Clone, Copy)]
pub enum AssemblageTarget<'a> {
    /// A concrete assemblage.
    Fixed(&'a Assemblage),
    /// Assemblage blocks that are themselves variables of a larger problem,
    /// ordered by `a + outcomes * x`.
    Variables {
        /// Number of outcomes `oa`.
        outcomes: usize,
        /// Number of inputs `ma`.
        inputs: usize,
        /// Block variables.
        blocks: &'a [VarId],
    },
}

/// Handles created by [`LhsConstraints::emit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedLhs {
    /// Constraint structure that was emitted.
    pub constraints: LhsConstraints,
    /// One PSD variable per strategy, in strategy order.
    pub hidden_states: Vec<VarId>,
    /// One equality per `(a, x)`, ordered like the constraint rows.
    pub equalities: Vec<EqualityId>,
    /// Trace normalization, when requested.
    pub normalization: Option<TraceId>,
}

impl LhsConstraints {
    /// Builds the rows for `dim`-dimensional hidden states over `strategies`.
    pub fn build(dim: usize, strategies: DeterministicStrategies) -> Result<Self, LhsError> {
        if dim == 0 {
            return Err(LhsError::shape(
                "empty-dimension",
                "hidden-state dimension must be positive",
            ));
        }
        let mut rows = Vec::with_capacity(strategies.outcomes() * strategies.inputs());
        for input in 0..strategies.inputs() {
            for outcome in 0..strategies.outcomes() {
                rows.push(ConstraintRow {
                    outcome,
                    input,
                    strategies: strategies.responders(outcome, input),
                });
            }
        }
        Ok(Self {
            dim,
            strategies,
            rows,
        })
    }

    /// Enumerates strategies for `(outcomes, inputs)` and builds the rows.
    pub fn for_shape(dim: usize, outcomes: usize, inputs: usize) -> Result<Self, LhsError> {
        Self::build(dim, DeterministicStrategies::enumerate(outcomes, inputs)?)
    }

    /// Hidden-state dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Strategy table.
    pub fn strategies(&self) -> &DeterministicStrategies {
        &self.strategies
    }

    /// Rows ordered by `a + outcomes * x`.
    pub fn rows(&self) -> &[ConstraintRow] {
        &self.rows
    }

    /// Row for `(outcome, input)`.
    pub fn row(&self, outcome: usize, input: usize) -> &ConstraintRow {
        &self.rows[outcome + self.strategies.outcomes() * input]
    }

    /// True when, for every input, the rows cover each strategy exactly once.
    pub fn is_partition(&self) -> bool {
        (0..self.strategies.inputs()).all(|input| {
            let mut seen = vec![0usize; self.strategies.len()];
            for outcome in 0..self.strategies.outcomes() {
                for &lam in &self.row(outcome, input).strategies {
                    seen[lam] += 1;
                }
            }
            seen.iter().all(|&count| count == 1)
        })
    }

    /// Forward contraction `sigma[a|x] = sum_lam D[a,x,lam] siglam[lam]`.
    pub fn apply(&self, hidden_states: &[CMatrix]) -> Result<Assemblage, LhsError> {
        if hidden_states.len() != self.strategies.len() {
            return Err(LhsError::Shape(
                ErrorInfo::new("hidden-state-count", "expected one hidden state per strategy")
                    .with_context("expected", self.strategies.len())
                    .with_context("found", hidden_states.len()),
            ));
        }
        let blocks = self
            .rows
            .iter()
            .map(|row| {
                row.strategies
                    .iter()
                    .fold(zeros(self.dim), |acc, &lam| acc + &hidden_states[lam])
            })
            .collect();
        Assemblage::new(
            self.dim,
            self.strategies.outcomes(),
            self.strategies.inputs(),
            blocks,
        )
    }

    /// Dual contraction `lam -> sum_{a,x} D[a,x,lam] F[a|x]`.
    pub fn adjoint(&self, blocks: &[CMatrix]) -> Vec<CMatrix> {
        let mut out = vec![zeros(self.dim); self.strategies.len()];
        for (row, block) in self.rows.iter().zip(blocks) {
            for &lam in &row.strategies {
                out[lam] += block;
            }
        }
        out
    }

    /// Emits the hidden-state variables and linking equalities into `problem`.
    ///
    /// Nothing is validated beyond shapes; the caller owns the semantics of
    /// the surrounding problem.
    pub fn emit(
        &self,
        problem: &mut SdpProblem,
        target: AssemblageTarget<'_>,
        normalization: Normalization,
    ) -> Result<EmbeddedLhs, LhsError> {
        let (outcomes, inputs) = match target {
            AssemblageTarget::Fixed(sigma) => (sigma.outcomes(), sigma.inputs()),
            AssemblageTarget::Variables {
                outcomes, inputs, ..
            } => (outcomes, inputs),
        };
        if outcomes != self.strategies.outcomes() || inputs != self.strategies.inputs() {
            return Err(LhsError::Shape(
                ErrorInfo::new("target-shape", "target scenario differs from the constraints")
                    .with_context("outcomes", outcomes)
                    .with_context("inputs", inputs),
            ));
        }
        if let AssemblageTarget::Variables { blocks, .. } = target {
            if blocks.len() != self.rows.len() {
                return Err(LhsError::Shape(
                    ErrorInfo::new("target-blocks", "expected one variable per (a, x)")
                        .with_context("expected", self.rows.len())
                        .with_context("found", blocks.len()),
                ));
            }
        }

        let hidden_states: Vec<VarId> = (0..self.strategies.len())
            .map(|_| problem.add_psd_variable(self.dim))
            .collect();
        let mut equalities = Vec::with_capacity(self.rows.len());
        for (idx, row) in self.rows.iter().enumerate() {
            let mut terms: Vec<(VarId, f64)> = row
                .strategies
                .iter()
                .map(|&lam| (hidden_states[lam], 1.0))
                .collect();
            let constant = match target {
                AssemblageTarget::Fixed(sigma) => sigma.block(row.outcome, row.input).clone(),
                AssemblageTarget::Variables { blocks, .. } => {
                    terms.push((blocks[idx], -1.0));
                    zeros(self.dim)
                }
            };
            equalities.push(problem.add_equality(terms, constant)?);
        }
        let normalization = if normalization.is_normalized() {
            let terms = hidden_states.iter().map(|&var| (var, 1.0)).collect();
            Some(problem.add_trace_equality(terms, 1.0)?)
        } else {
            None
        };
        Ok(EmbeddedLhs {
            constraints: self.clone(),
            hidden_states,
            equalities,
            normalization,
        })
    }
}

/// Embeddable mode: emits the LHS constraints for `target` without validating
/// or solving anything.
pub fn embed_lhs_constraints(
    problem: &mut SdpProblem,
    target: AssemblageTarget<'_>,
    normalization: Normalization,
) -> Result<EmbeddedLhs, LhsError> {
    let (dim, outcomes, inputs) = match target {
        AssemblageTarget::Fixed(sigma) => (sigma.dim(), sigma.outcomes(), sigma.inputs()),
        AssemblageTarget::Variables {
            outcomes,
            inputs,
            blocks,
        } => {
            let first = blocks
                .first()
                .and_then(|&var| problem.variable(var))
                .ok_or_else(|| {
                    LhsError::shape("target-blocks", "variable target has no declared blocks")
                })?;
            (first.dim, outcomes, inputs)
        }
    };
    LhsConstraints::for_shape(dim, outcomes, inputs)?.emit(problem, target, normalization)
}
