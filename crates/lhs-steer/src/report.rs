use std::path::Path;

use lhs_core::linalg::min_eigenvalue;
use lhs_core::{
    Assemblage, DeterministicStrategies, ErrorInfo, LhsError, LhsModel, Normalization,
    SteeringFunctional, ValidationOpts,
};
use lhs_sdp::{Backend, PsdFeasibilitySolver};
use serde::{Deserialize, Serialize};

use crate::decide::{decide_lhs_detailed, DecideOpts, LhsOutcome};
use crate::hash::stable_hash_string;
use crate::serde::{from_json_slice, to_canonical_json_bytes};

fn commit_string() -> String {
    option_env!("GIT_COMMIT_HASH")
        .or_else(|| option_env!("VERGEN_GIT_SHA"))
        .map(|value| value.to_string())
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string())
}

/// Scenario sizes of the analysed assemblage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportShape {
    /// Hidden-state dimension `dB`.
    pub dim: usize,
    /// Number of outcomes `oa`.
    pub outcomes: usize,
    /// Number of inputs `ma`.
    pub inputs: usize,
    /// Number of deterministic strategies `oa^ma`.
    pub strategies: usize,
}

/// Statistics of the single solver invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverSummary {
    /// Solver name.
    pub name: String,
    /// Iterations spent.
    pub iterations: usize,
    /// Final residual norm.
    pub residual_norm: f64,
}

/// Post-hoc checks of the returned model or witness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReportDiagnostics {
    /// Largest Frobenius distance between `sigma[a|x]` and its reconstruction.
    pub reconstruction_error: Option<f64>,
    /// `tr(sum_lam siglam[lam])` of the model.
    pub model_trace: Option<f64>,
    /// `sum_{a,x} tr[F[a|x] sigma[a|x]]`; negative for steerable inputs.
    pub witness_value: Option<f64>,
    /// `sum_{a,x,lam} D[a,x,lam] tr F[a|x]`; one after normalization.
    pub witness_strategy_sum: Option<f64>,
    /// Smallest eigenvalue over all strategy operators of the witness.
    pub min_strategy_eigenvalue: Option<f64>,
}

/// Provenance recorded in [`LhsReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LhsProvenance {
    /// Source commit or crate version.
    pub commit: String,
    /// Validation tolerances applied to the input.
    pub validation: ValidationOpts,
    /// Backend selection and settings from the options.
    pub backend: Backend,
}

/// Serializable record of one LHS decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LhsReport {
    /// Content hash over everything below.
    pub analysis_hash: String,
    /// Canonical hash of the input assemblage.
    pub input_hash: String,
    /// Scenario sizes.
    pub shape: ReportShape,
    /// Trace normalization mode.
    pub normalization: Normalization,
    /// Feasibility verdict.
    pub is_lhs: bool,
    /// Solver statistics.
    pub solver: SolverSummary,
    /// Checks on the payload.
    pub diagnostics: ReportDiagnostics,
    /// Hidden-state model when `is_lhs`.
    pub model: Option<LhsModel>,
    /// Steering functional when not `is_lhs`.
    pub witness: Option<SteeringFunctional>,
    /// Provenance.
    pub provenance: LhsProvenance,
}

impl LhsReport {
    /// Writes the report as canonical JSON.
    pub fn write_json(&self, path: &Path) -> Result<(), LhsError> {
        let bytes = to_canonical_json_bytes(self)?;
        std::fs::write(path, bytes).map_err(|err| {
            LhsError::Serde(
                ErrorInfo::new("report-write", err.to_string())
                    .with_context("path", path.display()),
            )
        })
    }

    /// Reads a report written by [`LhsReport::write_json`].
    pub fn read_json(path: &Path) -> Result<Self, LhsError> {
        let bytes = std::fs::read(path).map_err(|err| {
            LhsError::Serde(
                ErrorInfo::new("report-read", err.to_string())
                    .with_context("path", path.display()),
            )
        })?;
        from_json_slice(&bytes)
    }

    /// Recomputes the content hash and compares it with `analysis_hash`.
    pub fn verify_hash(&self) -> Result<bool, LhsError> {
        Ok(content_hash(self)? == self.analysis_hash)
    }
}

fn content_hash(report: &LhsReport) -> Result<String, LhsError> {
    stable_hash_string(&(
        &report.input_hash,
        &report.shape,
        &report.normalization,
        report.is_lhs,
        &report.solver,
        &report.diagnostics,
        &report.model,
        &report.witness,
        &report.provenance,
    ))
}

fn model_diagnostics(sigma: &Assemblage, model: &LhsModel) -> Result<ReportDiagnostics, LhsError> {
    let rebuilt = model.reconstruct()?;
    let error = rebuilt
        .blocks()
        .iter()
        .zip(sigma.blocks())
        .map(|(a, b)| (a - b).norm())
        .fold(0.0, f64::max);
    Ok(ReportDiagnostics {
        reconstruction_error: Some(error),
        model_trace: Some(model.total_trace()),
        ..ReportDiagnostics::default()
    })
}

fn witness_diagnostics(
    sigma: &Assemblage,
    witness: &SteeringFunctional,
) -> Result<ReportDiagnostics, LhsError> {
    let strategies = DeterministicStrategies::enumerate(sigma.outcomes(), sigma.inputs())?;
    let min_eigen = (0..strategies.len())
        .map(|lam| min_eigenvalue(&witness.strategy_operator(&strategies, lam)))
        .fold(f64::INFINITY, f64::min);
    Ok(ReportDiagnostics {
        witness_value: Some(witness.evaluate(sigma)?),
        witness_strategy_sum: Some(witness.strategy_trace_sum(&strategies)),
        min_strategy_eigenvalue: Some(min_eigen),
        ..ReportDiagnostics::default()
    })
}

/// Decides `sigma` with `solver` and packages the outcome with diagnostics.
pub fn analyze_assemblage_with(
    solver: &dyn PsdFeasibilitySolver,
    sigma: &Assemblage,
    opts: &DecideOpts,
) -> Result<LhsReport, LhsError> {
    let decision = decide_lhs_detailed(solver, sigma, opts)?;
    let input_hash = stable_hash_string(sigma)?;
    let strategies = DeterministicStrategies::enumerate(sigma.outcomes(), sigma.inputs())?;
    let shape = ReportShape {
        dim: sigma.dim(),
        outcomes: sigma.outcomes(),
        inputs: sigma.inputs(),
        strategies: strategies.len(),
    };
    let diagnostics = match &decision.outcome {
        LhsOutcome::Lhs(model) => model_diagnostics(sigma, model)?,
        LhsOutcome::Steerable(witness) => witness_diagnostics(sigma, witness)?,
    };
    let (is_lhs, model, witness) = decision.outcome.into_parts();

    let mut report = LhsReport {
        analysis_hash: String::new(),
        input_hash,
        shape,
        normalization: opts.normalization,
        is_lhs,
        solver: SolverSummary {
            name: decision.solver,
            iterations: decision.iterations,
            residual_norm: decision.residual_norm,
        },
        diagnostics,
        model,
        witness,
        provenance: LhsProvenance {
            commit: commit_string(),
            validation: opts.validation.clone(),
            backend: opts.solver.clone(),
        },
    };
    report.analysis_hash = content_hash(&report)?;
    Ok(report)
}

/// Decides `sigma` with the backend selected in `opts` (clarabel by default).
pub fn analyze_assemblage(sigma: &Assemblage, opts: &DecideOpts) -> Result<LhsReport, LhsError> {
    let solver = opts.solver.build();
    analyze_assemblage_with(solver.as_ref(), sigma, opts)
}
