//! Dense Hermitian matrix helpers built on `nalgebra`.

use nalgebra::{Complex, DMatrix, SymmetricEigen};

/// Complex dense matrix used for every block, hidden state and functional.
pub type CMatrix = DMatrix<Complex<f64>>;

/// Lifts a real number into the complex field.
pub fn real(value: f64) -> Complex<f64> {
    Complex::new(value, 0.0)
}

/// Returns the `dim × dim` zero matrix.
pub fn zeros(dim: usize) -> CMatrix {
    CMatrix::zeros(dim, dim)
}

/// Returns the `dim × dim` identity matrix.
pub fn identity(dim: usize) -> CMatrix {
    CMatrix::identity(dim, dim)
}

/// Returns `(m + m†) / 2`.
pub fn hermitian_part(m: &CMatrix) -> CMatrix {
    (m + m.adjoint()) * real(0.5)
}

/// Frobenius distance between `m` and its adjoint.
pub fn hermitian_defect(m: &CMatrix) -> f64 {
    (m - m.adjoint()).norm()
}

/// Real part of the trace.
pub fn trace_re(m: &CMatrix) -> f64 {
    m.trace().re
}

/// Hilbert–Schmidt inner product `Re tr(a† b)`.
pub fn hs_inner(a: &CMatrix, b: &CMatrix) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x.conj() * y).re).sum()
}

/// Smallest eigenvalue of the Hermitian part of `m`.
pub fn min_eigenvalue(m: &CMatrix) -> f64 {
    let h = hermitian_part(m);
    if h.nrows() == 1 {
        return h[(0, 0)].re;
    }
    h.symmetric_eigenvalues()
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min)
}

/// Euclidean projection of the Hermitian part of `m` onto the PSD cone.
pub fn project_psd(m: &CMatrix) -> CMatrix {
    let h = hermitian_part(m);
    if h.nrows() == 1 {
        return CMatrix::from_element(1, 1, real(h[(0, 0)].re.max(0.0)));
    }
    let eigen = SymmetricEigen::new(h);
    if eigen.eigenvalues.iter().all(|value| *value >= 0.0) {
        return eigen.recompose();
    }
    let clipped = CMatrix::from_diagonal(&eigen.eigenvalues.map(|value| real(value.max(0.0))));
    let vectors = eigen.eigenvectors;
    &vectors * clipped * vectors.adjoint()
}

/// Kronecker product `a ⊗ b`.
pub fn kron(a: &CMatrix, b: &CMatrix) -> CMatrix {
    a.kronecker(b)
}

/// Rank-one projector `|v⟩⟨v|` for a (not necessarily normalized) column vector.
pub fn projector(v: &[Complex<f64>]) -> CMatrix {
    let dim = v.len();
    CMatrix::from_fn(dim, dim, |row, col| v[row] * v[col].conj())
}
