use lhs_core::linalg::{identity, real, CMatrix};
use lhs_core::{
    validate_assemblage, Assemblage, ErrorInfo, LhsError, LhsModel, Normalization,
    SteeringFunctional, ValidationOpts,
};
use lhs_sdp::{Backend, PsdFeasibilitySolver, SdpProblem, SolveStatus, SolverReport};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::certificate::{normalize_certificate, CertificateOpts};
use crate::constraints::{AssemblageTarget, EmbeddedLhs, LhsConstraints};

/// Result of the feasibility decision.
#[derive(Debug, Clone, PartialEq)]
pub enum LhsOutcome {
    /// An LHS model exists; the hidden states reproduce the assemblage.
    Lhs(LhsModel),
    /// No LHS model exists; the functional separates the assemblage.
    Steerable(SteeringFunctional),
}

impl LhsOutcome {
    /// The feasibility bit.
    pub fn is_lhs(&self) -> bool {
        matches!(self, LhsOutcome::Lhs(_))
    }

    /// Hidden-state model, present iff feasible.
    pub fn model(&self) -> Option<&LhsModel> {
        match self {
            LhsOutcome::Lhs(model) => Some(model),
            LhsOutcome::Steerable(_) => None,
        }
    }

    /// Steering functional, present iff infeasible.
    pub fn witness(&self) -> Option<&SteeringFunctional> {
        match self {
            LhsOutcome::Lhs(_) => None,
            LhsOutcome::Steerable(witness) => Some(witness),
        }
    }

    /// Splits into `(feasible, model, witness)`.
    pub fn into_parts(self) -> (bool, Option<LhsModel>, Option<SteeringFunctional>) {
        match self {
            LhsOutcome::Lhs(model) => (true, Some(model), None),
            LhsOutcome::Steerable(witness) => (false, None, Some(witness)),
        }
    }
}

/// Configuration of a standalone decision, loadable from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DecideOpts {
    /// Whether the hidden-state ensemble must have unit trace.
    #[serde(default)]
    pub normalization: Normalization,
    /// Input precondition tolerances.
    #[serde(default)]
    pub validation: ValidationOpts,
    /// Bundled backend and its settings; clarabel unless configured otherwise.
    #[serde(default)]
    pub solver: Backend,
    /// Certificate normalization options.
    #[serde(default)]
    pub certificate: CertificateOpts,
}

impl DecideOpts {
    /// Default options with the given normalization mode.
    pub fn with_normalization(normalization: Normalization) -> Self {
        Self {
            normalization,
            ..Self::default()
        }
    }

    /// Parses options from a YAML document; missing fields take defaults.
    pub fn from_yaml_str(source: &str) -> Result<Self, LhsError> {
        serde_yaml::from_str(source)
            .map_err(|err| LhsError::Serde(ErrorInfo::new("yaml-read", err.to_string())))
    }

    /// Renders the options as YAML.
    pub fn to_yaml_string(&self) -> Result<String, LhsError> {
        serde_yaml::to_string(self)
            .map_err(|err| LhsError::Serde(ErrorInfo::new("yaml-write", err.to_string())))
    }
}

/// Outcome plus the solver statistics of the single invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// Feasibility verdict with its model or witness.
    pub outcome: LhsOutcome,
    /// Name reported by the solver.
    pub solver: String,
    /// Iterations the solver spent.
    pub iterations: usize,
    /// Residual norm at the solver's last iterate.
    pub residual_norm: f64,
}

fn status_error(solver: &str, report: &SolverReport) -> LhsError {
    LhsError::SolverStatus(
        ErrorInfo::new("undecided", "solver returned neither feasible nor infeasible")
            .with_context("solver", solver)
            .with_context("status", report.status)
            .with_context("iterations", report.iterations)
            .with_context("residual", format!("{:.3e}", report.residual_norm))
            .with_hint("raise the iteration budget or loosen the solver tolerances"),
    )
}

fn missing_duals(solver: &str) -> LhsError {
    LhsError::SolverStatus(
        ErrorInfo::new("missing-duals", "infeasible report carries no dual blocks")
            .with_context("solver", solver),
    )
}

/// Dual blocks of the linking equalities, with the normalization multiplier
/// spread evenly over the inputs.
fn raw_certificate(
    solver: &str,
    report: &SolverReport,
    embedded: &EmbeddedLhs,
) -> Result<Vec<CMatrix>, LhsError> {
    let mut blocks = Vec::with_capacity(embedded.equalities.len());
    for id in &embedded.equalities {
        let block = report
            .equality_duals
            .get(id.index())
            .ok_or_else(|| missing_duals(solver))?;
        blocks.push(block.clone());
    }
    if let Some(trace) = embedded.normalization {
        let multiplier = report
            .trace_duals
            .get(trace.index())
            .copied()
            .ok_or_else(|| missing_duals(solver))?;
        let inputs = embedded.constraints.strategies().inputs() as f64;
        let shift = identity(embedded.constraints.dim()) * real(multiplier / inputs);
        for block in &mut blocks {
            *block += &shift;
        }
    }
    Ok(blocks)
}

/// Standalone decision with the full solver statistics.
pub fn decide_lhs_detailed(
    solver: &dyn PsdFeasibilitySolver,
    sigma: &Assemblage,
    opts: &DecideOpts,
) -> Result<Decision, LhsError> {
    validate_assemblage(sigma, opts.normalization, &opts.validation)?;

    let constraints = LhsConstraints::for_shape(sigma.dim(), sigma.outcomes(), sigma.inputs())?;
    let mut problem = SdpProblem::new();
    let embedded = constraints.emit(
        &mut problem,
        AssemblageTarget::Fixed(sigma),
        opts.normalization,
    )?;
    debug!(
        dim = sigma.dim(),
        outcomes = sigma.outcomes(),
        inputs = sigma.inputs(),
        strategies = constraints.strategies().len(),
        normalized = opts.normalization.is_normalized(),
        solver = solver.name(),
        "deciding LHS feasibility"
    );

    let report = solver.solve(&problem)?;
    let outcome = match report.status {
        SolveStatus::Feasible => {
            let hidden_states = embedded
                .hidden_states
                .iter()
                .map(|var| {
                    report.primal.get(var.index()).cloned().ok_or_else(|| {
                        LhsError::SolverStatus(
                            ErrorInfo::new("missing-primal", "feasible report lacks a variable")
                                .with_context("solver", solver.name())
                                .with_context("variable", var.index()),
                        )
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            LhsOutcome::Lhs(LhsModel::new(
                sigma.dim(),
                constraints.strategies().clone(),
                hidden_states,
            )?)
        }
        SolveStatus::Infeasible => {
            let raw = raw_certificate(solver.name(), &report, &embedded)?;
            LhsOutcome::Steerable(normalize_certificate(raw, &constraints, &opts.certificate)?)
        }
        SolveStatus::IterationLimit | SolveStatus::NumericalError => {
            return Err(status_error(solver.name(), &report));
        }
    };
    debug!(
        is_lhs = outcome.is_lhs(),
        iterations = report.iterations,
        residual = report.residual_norm,
        "LHS decision finished"
    );
    Ok(Decision {
        outcome,
        solver: solver.name().to_string(),
        iterations: report.iterations,
        residual_norm: report.residual_norm,
    })
}

/// Standalone decision against an injected solver.
pub fn decide_lhs_with(
    solver: &dyn PsdFeasibilitySolver,
    sigma: &Assemblage,
    opts: &DecideOpts,
) -> Result<LhsOutcome, LhsError> {
    decide_lhs_detailed(solver, sigma, opts).map(|decision| decision.outcome)
}

/// Decides whether `sigma` admits an LHS model using the clarabel backend.
pub fn decide_lhs(
    sigma: &Assemblage,
    normalization: impl Into<Normalization>,
) -> Result<LhsOutcome, LhsError> {
    let opts = DecideOpts::with_normalization(normalization.into());
    let solver = opts.solver.build();
    decide_lhs_with(solver.as_ref(), sigma, &opts)
}
