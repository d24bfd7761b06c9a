use lhs_core::linalg::{hs_inner, min_eigenvalue, real, trace_re, zeros, CMatrix};
use lhs_sdp::{
    GradientSettings, ProjectedGradientSolver, PsdFeasibilitySolver, SdpProblem, SolveStatus,
    VarKind,
};

fn diag(entries: &[f64]) -> CMatrix {
    let mut m = zeros(entries.len());
    for (i, &value) in entries.iter().enumerate() {
        m[(i, i)] = real(value);
    }
    m
}

fn solver() -> ProjectedGradientSolver {
    ProjectedGradientSolver::new(GradientSettings::default())
}

#[test]
fn psd_target_is_feasible() {
    let mut problem = SdpProblem::new();
    let x = problem.add_psd_variable(2);
    let mut target = diag(&[0.6, 0.4]);
    target[(0, 1)] = real(0.1);
    target[(1, 0)] = real(0.1);
    problem.add_equality(vec![(x, 1.0)], target.clone()).expect("equality");

    let report = solver().solve(&problem).expect("solve");
    assert_eq!(report.status, SolveStatus::Feasible);
    assert!((&report.primal[x.index()] - &target).norm() < 1e-7);
    assert!(report.equality_duals.is_empty());
}

#[test]
fn indefinite_target_yields_farkas_ray() {
    let mut problem = SdpProblem::new();
    let x = problem.add_psd_variable(2);
    let b = diag(&[1.0, -1.0]);
    let eq = problem.add_equality(vec![(x, 1.0)], b.clone()).expect("equality");

    let report = solver().solve(&problem).expect("solve");
    assert_eq!(report.status, SolveStatus::Infeasible);
    let y = &report.equality_duals[eq.index()];
    assert!(min_eigenvalue(y) >= -1e-9);
    assert!(hs_inner(y, &b) < 0.0);
}

#[test]
fn trace_equalities_are_honoured() {
    let mut problem = SdpProblem::new();
    let x = problem.add_psd_variable(3);
    problem.add_trace_equality(vec![(x, 1.0)], 2.0).expect("trace");

    let report = solver().solve(&problem).expect("solve");
    assert_eq!(report.status, SolveStatus::Feasible);
    assert!((trace_re(&report.primal[x.index()]) - 2.0).abs() < 1e-7);
    assert!(min_eigenvalue(&report.primal[x.index()]) >= -1e-12);
}

#[test]
fn negative_trace_is_infeasible() {
    let mut problem = SdpProblem::new();
    let x = problem.add_psd_variable(2);
    let t = problem.add_trace_equality(vec![(x, 1.0)], -1.0).expect("trace");

    let report = solver().solve(&problem).expect("solve");
    assert_eq!(report.status, SolveStatus::Infeasible);
    assert!(report.trace_duals[t.index()] > 0.0);
}

#[test]
fn free_variable_absorbs_indefinite_part() {
    let mut problem = SdpProblem::new();
    let x = problem.add_psd_variable(2);
    let h = problem.add_variable(2, VarKind::Hermitian);
    problem
        .add_equality(vec![(x, 1.0), (h, 1.0)], diag(&[1.0, -1.0]))
        .expect("equality");
    problem
        .add_equality(vec![(h, 1.0)], diag(&[0.5, -1.5]))
        .expect("equality");

    let report = solver().solve(&problem).expect("solve");
    assert_eq!(report.status, SolveStatus::Feasible);
    assert!((&report.primal[x.index()] - diag(&[0.5, 0.5])).norm() < 1e-6);
}

#[test]
fn pinned_free_variable_keeps_problem_infeasible() {
    let mut problem = SdpProblem::new();
    let x = problem.add_psd_variable(2);
    let h = problem.add_variable(2, VarKind::Hermitian);
    let b = diag(&[1.0, -1.0]);
    let first = problem
        .add_equality(vec![(x, 1.0), (h, 1.0)], b.clone())
        .expect("equality");
    let second = problem.add_equality(vec![(h, 1.0)], zeros(2)).expect("equality");

    let report = solver().solve(&problem).expect("solve");
    assert_eq!(report.status, SolveStatus::Infeasible);
    let y1 = &report.equality_duals[first.index()];
    let y2 = &report.equality_duals[second.index()];
    assert!(min_eigenvalue(y1) >= -2e-6 * y1.norm());
    assert!((y1 + y2).norm() <= 1e-5 * y1.norm());
    assert!(hs_inner(y1, &b) < 0.0);
}

#[test]
fn zero_right_hand_side_is_trivially_feasible() {
    let mut problem = SdpProblem::new();
    let x = problem.add_psd_variable(2);
    problem.add_equality(vec![(x, 1.0)], zeros(2)).expect("equality");
    let report = solver().solve(&problem).expect("solve");
    assert_eq!(report.status, SolveStatus::Feasible);
    assert_eq!(report.iterations, 0);
}

#[test]
fn malformed_constraints_are_rejected() {
    let mut problem = SdpProblem::new();
    let x = problem.add_psd_variable(2);
    let err = problem.add_equality(vec![(x, 1.0)], zeros(3)).unwrap_err();
    assert_eq!(err.info().code, "term-shape");

    let mut skew = zeros(2);
    skew[(0, 1)] = real(1.0);
    let err = problem.add_equality(vec![(x, 1.0)], skew).unwrap_err();
    assert_eq!(err.info().code, "constant-not-hermitian");

    let mut other = SdpProblem::new();
    let _ = other.add_psd_variable(2);
    let foreign = other.add_psd_variable(2);
    let err = problem
        .add_trace_equality(vec![(x, 1.0), (foreign, 1.0)], 1.0)
        .unwrap_err();
    assert_eq!(err.info().code, "unknown-variable");
}

#[test]
fn status_strings_are_kebab_case() {
    assert_eq!(SolveStatus::IterationLimit.to_string(), "iteration-limit");
    assert!(SolveStatus::Infeasible.is_decisive());
    assert!(!SolveStatus::NumericalError.is_decisive());
    let json = serde_json::to_string(&SolveStatus::NumericalError).expect("json");
    assert_eq!(json, "\"numerical-error\"");
}

#[test]
fn settings_fill_missing_fields() {
    let settings: GradientSettings =
        serde_json::from_str(r#"{"max_iterations": 50}"#).expect("settings");
    assert_eq!(settings.max_iterations, 50);
    assert_eq!(settings.feasibility_tol, GradientSettings::default().feasibility_tol);
    assert_eq!(solver().name(), "projected-gradient");
}
