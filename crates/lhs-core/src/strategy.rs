//! Enumeration of deterministic response strategies.
//!
//! A strategy `lam` in `0..oa^ma` is read as a base-`oa` number with `ma`
//! digits, least significant digit first. Digit `x` is the outcome the
//! strategy outputs on input `x`.

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, LhsError};

/// Returns the number of deterministic strategies `oa^ma`.
pub fn strategy_count(outcomes: usize, inputs: usize) -> Result<usize, LhsError> {
    if outcomes == 0 || inputs == 0 {
        return Err(LhsError::Shape(
            ErrorInfo::new("empty-scenario", "outcome and input counts must be positive")
                .with_context("outcomes", outcomes)
                .with_context("inputs", inputs),
        ));
    }
    let exponent = u32::try_from(inputs)
        .map_err(|_| LhsError::shape("strategy-overflow", "input count exceeds u32"))?;
    outcomes.checked_pow(exponent).ok_or_else(|| {
        LhsError::Shape(
            ErrorInfo::new("strategy-overflow", "oa^ma does not fit in usize")
                .with_context("outcomes", outcomes)
                .with_context("inputs", inputs),
        )
    })
}

/// Decomposes `index` into its `inputs` base-`outcomes` digits.
///
/// Digits beyond the range of `index` are zero and higher digits of `index`
/// that do not fit in `inputs` places are discarded, so the function is total.
pub fn strategy_digits(index: usize, outcomes: usize, inputs: usize) -> Vec<usize> {
    let base = outcomes.max(1);
    let mut rest = index;
    let mut digits = Vec::with_capacity(inputs);
    for _ in 0..inputs {
        if base == 1 {
            digits.push(0);
        } else {
            digits.push(rest % base);
            rest /= base;
        }
    }
    digits
}

/// Inverse of [`strategy_digits`]: folds base-`outcomes` digits back into an index.
///
/// Every digit must be below `outcomes`, and the index must fit in `usize`.
pub fn strategy_index(digits: &[usize], outcomes: usize) -> Result<usize, LhsError> {
    digits.iter().enumerate().rev().try_fold(0usize, |acc, (input, &digit)| {
        if digit >= outcomes {
            return Err(LhsError::Shape(
                ErrorInfo::new("digit-range", "strategy digit is not a valid outcome")
                    .with_context("input", input)
                    .with_context("digit", digit)
                    .with_context("outcomes", outcomes),
            ));
        }
        acc.checked_mul(outcomes)
            .and_then(|shifted| shifted.checked_add(digit))
            .ok_or_else(|| {
                LhsError::Shape(
                    ErrorInfo::new("strategy-overflow", "strategy index does not fit in usize")
                        .with_context("outcomes", outcomes)
                        .with_context("digits", digits.len()),
                )
            })
    })
}

/// The full table `D[a, x, lam]` for a fixed `(oa, ma)` scenario.
///
/// Deserialization rebuilds the table and rejects any stored assignments that
/// differ from the enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StrategyTable")]
pub struct DeterministicStrategies {
    outcomes: usize,
    inputs: usize,
    assignments: Vec<Vec<usize>>,
}

#[derive(Deserialize)]
struct StrategyTable {
    outcomes: usize,
    inputs: usize,
    assignments: Vec<Vec<usize>>,
}

impl TryFrom<StrategyTable> for DeterministicStrategies {
    type Error = LhsError;

    fn try_from(table: StrategyTable) -> Result<Self, LhsError> {
        let enumerated = Self::enumerate(table.outcomes, table.inputs)?;
        if let Some(lam) = (0..enumerated.len().max(table.assignments.len()))
            .find(|&lam| table.assignments.get(lam) != enumerated.assignments.get(lam))
        {
            return Err(LhsError::Shape(
                ErrorInfo::new("strategy-table", "stored assignments differ from the enumeration")
                    .with_context("strategy", lam)
                    .with_context("expected", enumerated.len())
                    .with_context("found", table.assignments.len()),
            ));
        }
        Ok(enumerated)
    }
}

impl DeterministicStrategies {
    /// Enumerates all `oa^ma` strategies in index order.
    pub fn enumerate(outcomes: usize, inputs: usize) -> Result<Self, LhsError> {
        let count = strategy_count(outcomes, inputs)?;
        let assignments = (0..count)
            .map(|lam| strategy_digits(lam, outcomes, inputs))
            .collect();
        Ok(Self {
            outcomes,
            inputs,
            assignments,
        })
    }

    /// Number of outcomes `oa`.
    pub fn outcomes(&self) -> usize {
        self.outcomes
    }

    /// Number of inputs `ma`.
    pub fn inputs(&self) -> usize {
        self.inputs
    }

    /// Number of strategies `Ndet`.
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Always false for an enumerated table; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Outcome assigned to `input` by strategy `lam`.
    pub fn output(&self, lam: usize, input: usize) -> usize {
        self.assignments[lam][input]
    }

    /// Digit vector of strategy `lam`.
    pub fn assignment(&self, lam: usize) -> &[usize] {
        &self.assignments[lam]
    }

    /// Indicator `D[a, x, lam]`.
    pub fn indicator(&self, outcome: usize, input: usize, lam: usize) -> bool {
        self.assignments[lam][input] == outcome
    }

    /// Strategies that answer `outcome` on `input`, in increasing order.
    pub fn responders(&self, outcome: usize, input: usize) -> Vec<usize> {
        (0..self.len())
            .filter(|&lam| self.indicator(outcome, input, lam))
            .collect()
    }

    /// Number of strategies sharing any fixed `(a, x)` response, `oa^(ma-1)`.
    pub fn multiplicity(&self) -> usize {
        self.len() / self.outcomes
    }
}
