use lhs_core::linalg::{real, zeros, CMatrix};
use lhs_core::{Assemblage, LhsError, Normalization};
use lhs_sdp::ProjectedGradientSolver;
use lhs_steer::{decide_lhs, decide_lhs_with, DecideOpts};

fn diag(entries: &[f64]) -> CMatrix {
    let mut m = zeros(entries.len());
    for (i, &value) in entries.iter().enumerate() {
        m[(i, i)] = real(value);
    }
    m
}

#[test]
fn single_outcome_with_consistent_marginals_is_lhs() {
    let rho = diag(&[0.7, 0.3]);
    let sigma = Assemblage::new(2, 1, 3, vec![rho.clone(); 3]).expect("assemblage");
    for normalization in [Normalization::Unnormalized, Normalization::Normalized] {
        let outcome = decide_lhs(&sigma, normalization).expect("decide");
        let model = outcome.model().expect("model");
        assert_eq!(model.strategies().len(), 1);
        assert!((model.hidden_state(0) - &rho).norm() < 1e-6);
    }
}

fn signalling() -> Assemblage {
    Assemblage::new(2, 1, 2, vec![diag(&[0.6, 0.4]), diag(&[0.4, 0.6])]).expect("assemblage")
}

#[test]
fn signalling_marginals_are_never_lhs() {
    match decide_lhs(&signalling(), Normalization::Unnormalized) {
        Ok(outcome) => {
            let witness = outcome.witness().expect("witness");
            assert!(witness.evaluate(&signalling()).expect("evaluate") < 0.0);
        }
        Err(err) => assert!(matches!(err, LhsError::DegenerateCertificate(_))),
    }
}

#[test]
fn least_squares_ray_on_signalling_marginals_is_degenerate() {
    // The residual ray here is traceless, so it cannot be normalized.
    let opts = DecideOpts::with_normalization(Normalization::Unnormalized);
    let err = decide_lhs_with(&ProjectedGradientSolver::default(), &signalling(), &opts)
        .unwrap_err();
    assert!(matches!(err, LhsError::DegenerateCertificate(_)));
    assert_eq!(err.info().code, "degenerate-divisor");
}

#[test]
fn single_input_is_always_lhs() {
    let blocks = vec![diag(&[0.2, 0.1]), diag(&[0.05, 0.25]), diag(&[0.25, 0.15])];
    let sigma = Assemblage::new(2, 3, 1, blocks.clone()).expect("assemblage");
    for normalization in [Normalization::Unnormalized, Normalization::Normalized] {
        let model = decide_lhs(&sigma, normalization)
            .expect("decide")
            .into_parts()
            .1
            .expect("model");
        assert_eq!(model.strategies().len(), 3);
        for (lam, block) in blocks.iter().enumerate() {
            assert!((model.hidden_state(lam) - block).norm() < 1e-6);
        }
    }
}

#[test]
fn one_dimensional_hidden_states_reduce_to_probabilities() {
    let p = |value: f64| CMatrix::from_element(1, 1, real(value));
    let sigma = Assemblage::new(1, 2, 2, vec![p(0.3), p(0.7), p(0.6), p(0.4)]).expect("shape");
    let outcome = decide_lhs(&sigma, Normalization::Normalized).expect("decide");
    assert!(outcome.is_lhs());
}
