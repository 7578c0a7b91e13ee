//! Changes of basis between the site and exciton (Hamiltonian eigen-) bases.
//!
//! The eigenvector matrix `Q` has the eigenvectors as columns, so a site-basis
//! operator `A` is expressed in the exciton basis as `Qᵗ A Q`. Nothing here
//! checks that `Q` is orthogonal; a non-orthogonal `Q` silently gives a wrong
//! (non-energy-preserving) rotation. Use [`orthogonality_defect`] to check.

use ndarray as nd;
use ndarray_linalg::Norm;
use tracing::{ debug, warn };
use crate::{
    error::{ RedfieldError, RedfieldResult },
    matrix::{ common_dim, expect_dim, mul_into, square_dim },
    scratch::ScratchPool,
};

/// Rotate `A` into the basis given by the columns of `Q`, in place:
/// `A ← Qᵗ A Q`.
///
/// Passing `Q.t()` applies the inverse rotation `A ← Q A Qᵗ`.
pub fn rotate<SQ>(A: &mut nd::Array2<f64>, Q: &nd::ArrayBase<SQ, nd::Ix2>)
    -> RedfieldResult<()>
where SQ: nd::Data<Elem = f64>
{
    let n = common_dim("basis::rotate", &*A, Q)?;
    let mut pool = ScratchPool::new(n);
    rotate_pooled(A, Q, &mut pool)
}

/// Like [`rotate`], but drawing the intermediate product from `pool`.
pub fn rotate_pooled<SQ>(
    A: &mut nd::Array2<f64>,
    Q: &nd::ArrayBase<SQ, nd::Ix2>,
    pool: &mut ScratchPool,
) -> RedfieldResult<()>
where SQ: nd::Data<Elem = f64>
{
    let n = common_dim("basis::rotate", &*A, Q)?;
    expect_dim("basis::rotate", n, pool.dim())?;
    let mut AQ = pool.take();
    mul_into(&*A, Q, &mut AQ)?;
    mul_into(&Q.t(), &AQ, A)?;
    pool.give(AQ);
    Ok(())
}

/// Build the jump operator `|a⟩⟨b|` in the basis given by the columns of `Q`,
/// i.e. `Qᵗ E_ab Q` where `E_ab` is the elementary matrix with a single 1 at
/// `(a, b)`.
///
/// With `Q` the identity this is just `E_ab`, transferring population from
/// state `b` to state `a`.
///
/// Fails with [`RedfieldError::StateOutOfRange`] if `a` or `b` is not below
/// the dimension of `Q`.
pub fn projector<SQ>(a: usize, b: usize, Q: &nd::ArrayBase<SQ, nd::Ix2>)
    -> RedfieldResult<nd::Array2<f64>>
where SQ: nd::Data<Elem = f64>
{
    let n = square_dim("basis::projector", Q)?;
    let mut pool = ScratchPool::new(n);
    projector_pooled(a, b, Q, &mut pool)
}

/// Like [`projector`], but drawing buffers from `pool`.
pub fn projector_pooled<SQ>(
    a: usize,
    b: usize,
    Q: &nd::ArrayBase<SQ, nd::Ix2>,
    pool: &mut ScratchPool,
) -> RedfieldResult<nd::Array2<f64>>
where SQ: nd::Data<Elem = f64>
{
    const CTX: &str = "basis::projector";
    let n = square_dim(CTX, Q)?;
    expect_dim(CTX, n, pool.dim())?;
    for index in [a, b] {
        if index >= n {
            return Err(RedfieldError::StateOutOfRange { context: CTX, index, n });
        }
    }
    let mut V = pool.take_zeroed();
    V[[a, b]] = 1.0;
    rotate_pooled(&mut V, Q, pool)?;
    Ok(V)
}

/// Largest element of `|Qᵗ Q - I|`; zero for an exactly orthogonal matrix.
pub fn orthogonality_defect<SQ>(Q: &nd::ArrayBase<SQ, nd::Ix2>)
    -> RedfieldResult<f64>
where SQ: nd::Data<Elem = f64>
{
    let n = square_dim("basis::orthogonality_defect", Q)?;
    let QtQ = Q.t().dot(Q);
    Ok((QtQ - nd::Array2::<f64>::eye(n)).norm_max())
}

/// Diagonalize a real symmetric matrix in place.
///
/// On success `A` holds the orthonormal eigenvectors as columns and the
/// eigenvalues are returned in ascending order. Only the upper triangle of
/// `A` is read.
///
/// LAPACK `dsyev` is called twice: once with `lwork = -1` to query the
/// optimal workspace size, then for the decomposition itself with a workspace
/// of that size. A non-zero status from either call is returned as
/// [`RedfieldError::Diagonalization`] and `A` is left unchanged.
pub fn diagonalize_in_place(A: &mut nd::Array2<f64>)
    -> RedfieldResult<nd::Array1<f64>>
{
    let n = square_dim("basis::diagonalize", &*A)?;
    if n == 0 {
        return Ok(nd::Array1::zeros(0));
    }
    let ni = n as i32;

    // column-major copy for LAPACK
    let mut a: Vec<f64> = A.t().iter().copied().collect();
    let mut w: Vec<f64> = vec![0.0; n];
    let mut info: i32 = 0;

    let mut work_query: [f64; 1] = [0.0];
    unsafe {
        lapack::dsyev(
            b'V', b'U', ni, &mut a, ni, &mut w, &mut work_query, -1, &mut info);
    }
    if info != 0 {
        warn!(code = info, "dsyev workspace query failed");
        return Err(RedfieldError::from_dsyev_info(info));
    }
    let lwork: i32 = (work_query[0] as i32).max(3 * ni - 1).max(1);
    debug!(n, lwork, "dsyev workspace allocated");
    let mut work: Vec<f64> = vec![0.0; lwork as usize];
    unsafe {
        lapack::dsyev(
            b'V', b'U', ni, &mut a, ni, &mut w, &mut work, lwork, &mut info);
    }
    if info != 0 {
        warn!(code = info, "dsyev decomposition failed");
        return Err(RedfieldError::from_dsyev_info(info));
    }

    A.assign(&nd::Array2::from_shape_fn((n, n), |(i, j)| a[i + j * n]));
    Ok(nd::Array1::from_vec(w))
}

/// Diagonalize a real symmetric matrix, returning `(eigenvalues,
/// eigenvectors)` with eigenvalues ascending and eigenvectors as columns.
///
/// See [`diagonalize_in_place`].
pub fn diagonalize(mut A: nd::Array2<f64>)
    -> RedfieldResult<(nd::Array1<f64>, nd::Array2<f64>)>
{
    let E = diagonalize_in_place(&mut A)?;
    Ok((E, A))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use ndarray_linalg::{ Eigh, UPLO };
    use crate::{
        matrix::max_abs_diff,
        test_utils::{ rng, random_matrix, random_orthogonal, random_symmetric },
    };

    #[test]
    fn rotate_round_trip_through_inverse_basis() {
        let mut rng = rng(7);
        for n in [2, 3, 8] {
            let A = random_matrix(n, &mut rng);
            let Q = random_orthogonal(n, &mut rng);
            let mut B = A.clone();
            rotate(&mut B, &Q).unwrap();
            rotate(&mut B, &Q.t()).unwrap();
            assert!(max_abs_diff(&A, &B).unwrap() < 1e-12);
        }
    }

    #[test]
    fn rotate_leaves_basis_untouched() {
        let mut rng = rng(8);
        let Q = random_orthogonal(5, &mut rng);
        let Q0 = Q.clone();
        let mut A = random_matrix(5, &mut rng);
        rotate(&mut A, &Q).unwrap();
        assert_eq!(Q, Q0);
    }

    #[test]
    fn rotating_into_eigenbasis_diagonalizes() {
        let mut rng = rng(9);
        let H = random_symmetric(6, &mut rng);
        let (E, Q) = diagonalize(H.clone()).unwrap();
        let mut D = H;
        rotate(&mut D, &Q).unwrap();
        assert!(max_abs_diff(&D, &nd::Array2::from_diag(&E)).unwrap() < 1e-12);
    }

    #[test]
    fn diagonalize_two_level_closed_form() {
        let (a, b, c) = (2.0, 0.75, -1.0);
        let A = array![[a, b], [b, c]];
        let (E, V) = diagonalize(A.clone()).unwrap();
        let mean = (a + c) / 2.0;
        let half_gap = (((a - c) / 2.0).powi(2) + b * b).sqrt();
        assert_abs_diff_eq!(E[0], mean - half_gap, epsilon = 1e-12);
        assert_abs_diff_eq!(E[1], mean + half_gap, epsilon = 1e-12);
        for k in 0..2 {
            let v = V.column(k);
            let Av = A.dot(&v);
            for i in 0..2 {
                assert_abs_diff_eq!(Av[i], E[k] * v[i], epsilon = 1e-12);
            }
        }
        assert!(orthogonality_defect(&V).unwrap() < 1e-12);
    }

    #[test]
    fn diagonalize_agrees_with_eigh() {
        let mut rng = rng(10);
        let A = random_symmetric(7, &mut rng);
        let (E, _) = diagonalize(A.clone()).unwrap();
        let (E_ref, _) = A.eigh(UPLO::Upper).unwrap();
        for (e, e_ref) in E.iter().zip(E_ref.iter()) {
            assert_abs_diff_eq!(*e, *e_ref, epsilon = 1e-10);
        }
        assert!(E.iter().zip(E.iter().skip(1)).all(|(x, y)| x <= y));
    }

    #[test]
    fn diagonalize_rejects_non_square() {
        let A: nd::Array2<f64> = nd::Array2::zeros((2, 3));
        assert!(matches!(
            diagonalize(A),
            Err(RedfieldError::NotSquare { .. })
        ));
    }

    #[test]
    fn projector_in_trivial_basis_is_elementary() {
        let Q: nd::Array2<f64> = nd::Array2::eye(3);
        let V = projector(0, 2, &Q).unwrap();
        let mut E: nd::Array2<f64> = nd::Array2::zeros((3, 3));
        E[[0, 2]] = 1.0;
        assert_eq!(V, E);
    }

    #[test]
    fn projector_matches_outer_product_of_basis_rows() {
        let mut rng = rng(11);
        let Q = random_orthogonal(4, &mut rng);
        let V = projector(1, 3, &Q).unwrap();
        for ((i, j), v) in V.indexed_iter() {
            assert_abs_diff_eq!(*v, Q[[1, i]] * Q[[3, j]], epsilon = 1e-12);
        }
    }

    #[test]
    fn projector_rejects_out_of_range_states() {
        let Q: nd::Array2<f64> = nd::Array2::eye(3);
        assert!(matches!(
            projector(3, 0, &Q),
            Err(RedfieldError::StateOutOfRange { index: 3, n: 3, .. })
        ));
        assert!(matches!(
            projector(0, 7, &Q),
            Err(RedfieldError::StateOutOfRange { index: 7, n: 3, .. })
        ));
    }

    #[test]
    fn pooled_operations_reject_pool_of_wrong_size() {
        let Q: nd::Array2<f64> = nd::Array2::eye(3);
        let mut pool = ScratchPool::new(2);
        assert!(matches!(
            projector_pooled(2, 2, &Q, &mut pool),
            Err(RedfieldError::DimensionMismatch { expected: 3, got: 2, .. })
        ));
        let mut A: nd::Array2<f64> = nd::Array2::ones((3, 3));
        assert!(rotate_pooled(&mut A, &Q, &mut pool).is_err());
        assert_eq!(A, nd::Array2::<f64>::ones((3, 3)));
        assert_eq!(pool.allocated(), 0);
    }

    #[test]
    fn non_finite_input_never_passes_as_a_clean_decomposition() {
        // dsyev has no finite input known to fail reliably, so the error path
        // is driven with a NaN entry: LAPACK either reports a non-zero status,
        // which must surface as a Diagonalization error, or propagates the NaN
        // into the eigenvalues.
        let A = array![[1.0, f64::NAN], [f64::NAN, 2.0]];
        match diagonalize(A) {
            Err(RedfieldError::Diagonalization { code, .. }) => {
                assert_ne!(code, 0);
            },
            Ok((E, _)) => assert!(E.iter().any(|e| !e.is_finite())),
            Err(e) => panic!("unexpected error {:?}", e),
        }
    }

    #[test]
    fn non_orthogonal_basis_is_detected() {
        let Q = array![[1.0, 0.5], [0.0, 1.0]];
        assert!(orthogonality_defect(&Q).unwrap() > 0.1);
    }
}
