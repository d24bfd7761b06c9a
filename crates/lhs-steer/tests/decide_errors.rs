use lhs_core::linalg::{identity, real, zeros};
use lhs_core::sample::noisy_qubit_assemblage;
use lhs_core::{Assemblage, LhsError, Normalization};
use lhs_sdp::{
    Backend, ClarabelSettings, GradientSettings, PsdFeasibilitySolver, SdpProblem, SolveStatus,
    SolverReport,
};
use lhs_steer::{decide_lhs_detailed, decide_lhs_with, DecideOpts};

/// Returns a canned report sized to the problem.
struct ScriptedSolver {
    status: SolveStatus,
    dual_scale: f64,
    emit_duals: bool,
}

impl PsdFeasibilitySolver for ScriptedSolver {
    fn name(&self) -> &str {
        "scripted"
    }

    fn solve(&self, problem: &SdpProblem) -> Result<SolverReport, LhsError> {
        let primal = problem
            .variables()
            .iter()
            .map(|var| zeros(var.dim))
            .collect();
        let (equality_duals, trace_duals) = if self.emit_duals {
            (
                problem
                    .equalities()
                    .iter()
                    .map(|eq| identity(eq.constant.nrows()) * real(self.dual_scale))
                    .collect(),
                vec![0.0; problem.trace_equalities().len()],
            )
        } else {
            (Vec::new(), Vec::new())
        };
        Ok(SolverReport {
            status: self.status,
            primal,
            equality_duals,
            trace_duals,
            iterations: 3,
            residual_norm: 0.5,
        })
    }
}

fn sample() -> Assemblage {
    noisy_qubit_assemblage(0.5, 2).expect("sample")
}

#[test]
fn iteration_budget_surfaces_as_solver_status() {
    let backends = [
        Backend::Clarabel(ClarabelSettings {
            max_iter: 1,
            ..ClarabelSettings::default()
        }),
        Backend::ProjectedGradient(GradientSettings {
            max_iterations: 1,
            ..GradientSettings::default()
        }),
    ];
    for backend in backends {
        let opts = DecideOpts {
            solver: backend,
            ..DecideOpts::default()
        };
        let solver = opts.solver.build();
        let err = decide_lhs_with(solver.as_ref(), &sample(), &opts).unwrap_err();
        assert!(matches!(err, LhsError::SolverStatus(_)));
        assert_eq!(err.info().code, "undecided");
        assert_eq!(
            err.info().context.get("status").map(String::as_str),
            Some("iteration-limit")
        );
        assert_eq!(
            err.info().context.get("solver").map(String::as_str),
            Some(solver.name())
        );
        assert!(err.info().context.contains_key("iterations"));
    }
}

#[test]
fn numerical_errors_are_not_retried() {
    let solver = ScriptedSolver {
        status: SolveStatus::NumericalError,
        dual_scale: 0.0,
        emit_duals: false,
    };
    let err = decide_lhs_with(&solver, &sample(), &DecideOpts::default()).unwrap_err();
    assert_eq!(err.info().code, "undecided");
    assert_eq!(
        err.info().context.get("solver").map(String::as_str),
        Some("scripted")
    );
}

#[test]
fn vanishing_duals_are_degenerate() {
    let solver = ScriptedSolver {
        status: SolveStatus::Infeasible,
        dual_scale: 0.0,
        emit_duals: true,
    };
    let err = decide_lhs_with(&solver, &sample(), &DecideOpts::default()).unwrap_err();
    assert!(matches!(err, LhsError::DegenerateCertificate(_)));
}

#[test]
fn negative_divisor_is_degenerate() {
    let solver = ScriptedSolver {
        status: SolveStatus::Infeasible,
        dual_scale: -1.0,
        emit_duals: true,
    };
    let err = decide_lhs_with(&solver, &sample(), &DecideOpts::default()).unwrap_err();
    assert_eq!(err.info().code, "degenerate-divisor");
}

#[test]
fn infeasible_report_without_duals_is_rejected() {
    let solver = ScriptedSolver {
        status: SolveStatus::Infeasible,
        dual_scale: 1.0,
        emit_duals: false,
    };
    let err = decide_lhs_with(&solver, &sample(), &DecideOpts::default()).unwrap_err();
    assert_eq!(err.info().code, "missing-duals");
}

#[test]
fn injected_certificate_is_normalized() {
    let solver = ScriptedSolver {
        status: SolveStatus::Infeasible,
        dual_scale: 2.0,
        emit_duals: true,
    };
    let opts = DecideOpts::with_normalization(Normalization::Normalized);
    let decision = decide_lhs_detailed(&solver, &sample(), &opts).expect("decide");
    assert_eq!(decision.solver, "scripted");
    assert_eq!(decision.iterations, 3);
    let witness = decision.outcome.witness().expect("witness").clone();
    // Four blocks of 2 I, multiplicity 2: divisor 2 * 16 = 32.
    for block in witness.blocks() {
        assert!((block - identity(2) * real(2.0 / 32.0)).norm() < 1e-15);
    }
}

#[test]
fn invalid_input_never_reaches_the_solver() {
    let solver = ScriptedSolver {
        status: SolveStatus::Feasible,
        dual_scale: 0.0,
        emit_duals: false,
    };
    let sigma = Assemblage::new(2, 1, 1, vec![identity(2) * real(-1.0)]).expect("shape");
    let err = decide_lhs_with(&solver, &sigma, &DecideOpts::default()).unwrap_err();
    assert!(matches!(err, LhsError::InvalidAssemblage(_)));
}
