//! Shared helpers for unit tests.

use ndarray as nd;
use rand::{ rngs::StdRng, Rng, SeedableRng };
use crate::complex::ComplexMatrix;

/// Seeded generator so failures are reproducible.
pub fn rng(seed: u64) -> StdRng { StdRng::seed_from_u64(seed) }

/// Square matrix with entries uniform in `[-1, 1)`.
pub fn random_matrix<R: Rng>(n: usize, rng: &mut R) -> nd::Array2<f64> {
    nd::Array2::from_shape_fn((n, n), |_| rng.gen_range(-1.0..1.0))
}

/// Real symmetric matrix with entries uniform in `[-1, 1)`.
pub fn random_symmetric<R: Rng>(n: usize, rng: &mut R) -> nd::Array2<f64> {
    let A = random_matrix(n, rng);
    (&A + &A.t()) / 2.0
}

/// Random orthogonal matrix, from the eigenvectors of a random symmetric one.
pub fn random_orthogonal<R: Rng>(n: usize, rng: &mut R) -> nd::Array2<f64> {
    crate::basis::diagonalize(random_symmetric(n, rng))
        .expect("random_orthogonal: diagonalization failed")
        .1
}

/// Random density matrix: positive semidefinite, Hermitian, unit trace.
pub fn random_density<R: Rng>(n: usize, rng: &mut R) -> ComplexMatrix {
    let A = ComplexMatrix::new(random_matrix(n, rng), random_matrix(n, rng))
        .unwrap();
    let rho = A.to_c64();
    let rho = rho.dot(&rho.t().mapv(|z| z.conj()));
    let tr: f64 = rho.diag().iter().map(|z| z.re).sum();
    ComplexMatrix::from_c64(&(rho / tr)).unwrap()
}
