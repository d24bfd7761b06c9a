use lhs_core::linalg::min_eigenvalue;
use lhs_core::sample::noisy_qubit_assemblage;
use lhs_core::{DeterministicStrategies, Normalization, SteeringFunctional};
use lhs_steer::{decide_lhs, LhsOutcome};

fn expect_witness(outcome: LhsOutcome) -> SteeringFunctional {
    match outcome {
        LhsOutcome::Steerable(witness) => witness,
        LhsOutcome::Lhs(_) => panic!("expected a steering witness"),
    }
}

fn check_witness(witness: &SteeringFunctional, inputs: usize) {
    let strategies = DeterministicStrategies::enumerate(2, inputs).expect("strategies");
    assert!((witness.strategy_trace_sum(&strategies) - 1.0).abs() < 1e-9);
    for lam in 0..strategies.len() {
        assert!(min_eigenvalue(&witness.strategy_operator(&strategies, lam)) >= -1e-4);
    }
    for block in witness.blocks() {
        assert!((block - block.adjoint()).norm() < 1e-12);
    }
}

#[test]
fn strongly_entangled_assemblage_is_steerable() {
    let sigma = noisy_qubit_assemblage(0.9, 2).expect("sample");
    for normalization in [Normalization::Unnormalized, Normalization::Normalized] {
        let outcome = decide_lhs(&sigma, normalization).expect("decide");
        assert!(!outcome.is_lhs());
        assert!(outcome.model().is_none());
        let witness = expect_witness(outcome);
        check_witness(&witness, 2);
        assert!(witness.evaluate(&sigma).expect("evaluate") < 0.0);
    }
}

#[test]
fn witness_separates_unsteerable_assemblages() {
    let steerable = noisy_qubit_assemblage(0.95, 2).expect("sample");
    let witness = expect_witness(decide_lhs(&steerable, false).expect("decide"));
    assert!(witness.evaluate(&steerable).expect("evaluate") < 0.0);

    for visibility in [0.0, 0.3, 0.6] {
        let sigma = noisy_qubit_assemblage(visibility, 2).expect("sample");
        assert!(witness.evaluate(&sigma).expect("evaluate") > -1e-3);
    }
}

#[test]
fn three_measurements_lower_the_threshold() {
    let sigma = noisy_qubit_assemblage(0.65, 3).expect("sample");
    let witness = expect_witness(decide_lhs(&sigma, false).expect("decide"));
    check_witness(&witness, 3);
    assert!(witness.evaluate(&sigma).expect("evaluate") < 0.0);

    let two = noisy_qubit_assemblage(0.65, 2).expect("sample");
    assert!(decide_lhs(&two, false).expect("decide").is_lhs());
}
