use lhs_core::linalg::{identity, kron, projector, real, trace_re, CMatrix};
use lhs_core::sample::{isotropic_state, noisy_qubit_assemblage, qubit_mub_measurements};
use lhs_core::{Assemblage, LhsError};

fn close(a: &CMatrix, b: &CMatrix) -> bool {
    (a - b).norm() < 1e-12
}

#[test]
fn product_state_steers_nothing() {
    let alice = projector(&[real(0.6_f64.sqrt()), real(0.4_f64.sqrt())]);
    let bob = projector(&[real(1.0), real(0.0)]);
    let rho = kron(&alice, &bob);
    let measurements = qubit_mub_measurements(2).expect("mubs");
    let sigma = Assemblage::from_state(&rho, 2, &measurements).expect("assemblage");

    for x in 0..2 {
        for a in 0..2 {
            let weight = trace_re(&(&measurements[x][a] * &alice));
            assert!(close(sigma.block(a, x), &(&bob * real(weight))));
        }
        assert!(close(&sigma.marginal(x), &bob));
    }
}

#[test]
fn isotropic_blocks_have_known_form() {
    let v = 0.7;
    let sigma = noisy_qubit_assemblage(v, 3).expect("assemblage");
    let measurements = qubit_mub_measurements(3).expect("mubs");
    for x in 0..3 {
        for a in 0..2 {
            let expected = measurements[x][a].transpose() * real(v / 2.0)
                + identity(2) * real((1.0 - v) / 4.0);
            assert!(close(sigma.block(a, x), &expected));
        }
    }
    assert!(sigma.signalling_deviation() < 1e-12);
}

#[test]
fn marginals_reduce_to_bob_state() {
    let measurements = qubit_mub_measurements(2).expect("mubs");
    let sigma = Assemblage::from_state(&isotropic_state(2, 0.3), 2, &measurements)
        .expect("assemblage");
    for x in 0..2 {
        assert!(close(&sigma.marginal(x), &(identity(2) * real(0.5))));
    }
}

#[test]
fn ragged_measurements_are_rejected() {
    let mut measurements = qubit_mub_measurements(2).expect("mubs");
    measurements[1].pop();
    let err = Assemblage::from_state(&isotropic_state(2, 0.5), 2, &measurements).unwrap_err();
    assert!(matches!(err, LhsError::Shape(_)));
    assert_eq!(err.info().code, "ragged-measurements");
}

#[test]
fn block_layout_is_checked() {
    let err = Assemblage::new(2, 2, 2, vec![identity(2); 3]).unwrap_err();
    assert_eq!(err.info().code, "block-count");
    let err = Assemblage::new(2, 1, 1, vec![identity(3)]).unwrap_err();
    assert_eq!(err.info().code, "block-shape");
    let err = Assemblage::new(0, 1, 1, Vec::new()).unwrap_err();
    assert_eq!(err.info().code, "empty-assemblage");
}

#[test]
fn mixing_interpolates_blocks() {
    let steered = noisy_qubit_assemblage(1.0, 2).expect("assemblage");
    let noise = noisy_qubit_assemblage(0.0, 2).expect("assemblage");
    let mixed = steered.mixed_with(&noise, 0.4).expect("mix");
    let target = noisy_qubit_assemblage(0.4, 2).expect("assemblage");
    for (lhs, rhs) in mixed.blocks().iter().zip(target.blocks()) {
        assert!(close(lhs, rhs));
    }
}
