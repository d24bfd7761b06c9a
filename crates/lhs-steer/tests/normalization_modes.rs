use lhs_core::rng::RngHandle;
use lhs_core::sample::{noisy_qubit_assemblage, random_lhs_model};
use lhs_core::{Assemblage, DeterministicStrategies, LhsError, Normalization};
use lhs_sdp::{
    ClarabelSolver, ProjectedGradientSolver, PsdFeasibilitySolver, SdpProblem, SolveStatus,
};
use lhs_steer::{decide_lhs, embed_lhs_constraints, AssemblageTarget};

fn backends() -> Vec<Box<dyn PsdFeasibilitySolver>> {
    vec![
        Box::new(ClarabelSolver::default()),
        Box::new(ProjectedGradientSolver::default()),
    ]
}

fn sample(seed: u64) -> Assemblage {
    let mut rng = RngHandle::from_seed(seed);
    random_lhs_model(2, 2, 2, &mut rng)
        .and_then(|model| model.reconstruct())
        .expect("sample")
}

#[test]
fn scaled_assemblages_stay_lhs_without_normalization() {
    let sigma = sample(31);
    for factor in [0.5, 2.0] {
        let outcome = decide_lhs(&sigma.scaled(factor), Normalization::Unnormalized)
            .expect("decide");
        let model = outcome.model().expect("model");
        assert!((model.total_trace() - factor).abs() < 1e-6);
    }
}

#[test]
fn scaled_steerable_assemblages_stay_steerable_without_normalization() {
    let sigma = noisy_qubit_assemblage(0.9, 2).expect("sample");
    let strategies = DeterministicStrategies::enumerate(2, 2).expect("strategies");
    for factor in [0.01, 100.0] {
        let scaled = sigma.scaled(factor);
        let outcome = decide_lhs(&scaled, Normalization::Unnormalized).expect("decide");
        let witness = outcome.witness().expect("witness");
        assert!(witness.evaluate(&scaled).expect("evaluate") < 0.0);
        assert!(witness.evaluate(&sigma).expect("evaluate") < 0.0);
        assert!((witness.strategy_trace_sum(&strategies) - 1.0).abs() < 1e-9);
    }
}

#[test]
fn normalized_mode_rejects_wrong_scale_up_front() {
    let sigma = sample(32);
    for factor in [0.5, 2.0] {
        let err = decide_lhs(&sigma.scaled(factor), Normalization::Normalized).unwrap_err();
        assert!(matches!(err, LhsError::InvalidAssemblage(_)));
        assert_eq!(err.info().code, "not-normalized");
    }
}

#[test]
fn unvalidated_embedding_turns_wrong_scale_infeasible() {
    let sigma = sample(33);
    for solver in backends() {
        for factor in [0.5, 2.0] {
            let scaled = sigma.scaled(factor);
            let mut problem = SdpProblem::new();
            let embedded = embed_lhs_constraints(
                &mut problem,
                AssemblageTarget::Fixed(&scaled),
                Normalization::Normalized,
            )
            .expect("embed");
            let trace = embedded.normalization.expect("trace row");

            let report = solver.solve(&problem).expect("solve");
            assert_eq!(report.status, SolveStatus::Infeasible, "{}", solver.name());
            // t (1 - factor) <= <y, b> < 0 for any Farkas ray.
            let multiplier = report.trace_duals[trace.index()];
            assert!(multiplier * (1.0 - factor) < 0.0, "{}", solver.name());
        }
    }
}

#[test]
fn unnormalized_embedding_of_scaled_input_is_feasible() {
    let scaled = sample(34).scaled(3.0);
    let mut problem = SdpProblem::new();
    let embedded = embed_lhs_constraints(
        &mut problem,
        AssemblageTarget::Fixed(&scaled),
        Normalization::Unnormalized,
    )
    .expect("embed");
    assert!(embedded.normalization.is_none());
    for solver in backends() {
        let report = solver.solve(&problem).expect("solve");
        assert_eq!(report.status, SolveStatus::Feasible, "{}", solver.name());
    }
}
