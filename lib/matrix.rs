//! Elementary operations on square real matrices.
//!
//! Every binary operation checks that both operands are square and share the
//! same dimension before touching any element. The `*_into` variants write
//! into a caller-supplied output buffer of the same shape, which lets hot
//! loops reuse buffers drawn from a [`ScratchPool`][crate::scratch::ScratchPool].

use ndarray::{ self as nd, linalg::general_mat_mul };
use crate::error::{ RedfieldError, RedfieldResult };

/// Return the dimension of a square matrix.
pub fn square_dim<S>(context: &'static str, A: &nd::ArrayBase<S, nd::Ix2>)
    -> RedfieldResult<usize>
where S: nd::RawData
{
    let (rows, cols) = A.dim();
    if rows != cols {
        return Err(RedfieldError::NotSquare { context, rows, cols });
    }
    Ok(rows)
}

/// Check that `len` matches the expected dimension `n`.
pub(crate) fn expect_dim(context: &'static str, n: usize, len: usize)
    -> RedfieldResult<()>
{
    if n != len {
        return Err(
            RedfieldError::DimensionMismatch { context, expected: n, got: len });
    }
    Ok(())
}

/// Check that two matrices are square with equal dimension and return it.
pub fn common_dim<SA, SB>(
    context: &'static str,
    A: &nd::ArrayBase<SA, nd::Ix2>,
    B: &nd::ArrayBase<SB, nd::Ix2>,
) -> RedfieldResult<usize>
where
    SA: nd::RawData,
    SB: nd::RawData,
{
    let n = square_dim(context, A)?;
    let m = square_dim(context, B)?;
    expect_dim(context, n, m)?;
    Ok(n)
}

fn check_out<SA, SB, SC>(
    context: &'static str,
    A: &nd::ArrayBase<SA, nd::Ix2>,
    B: &nd::ArrayBase<SB, nd::Ix2>,
    C: &nd::ArrayBase<SC, nd::Ix2>,
) -> RedfieldResult<usize>
where
    SA: nd::RawData,
    SB: nd::RawData,
    SC: nd::RawData,
{
    let n = common_dim(context, A, B)?;
    let k = square_dim(context, C)?;
    expect_dim(context, n, k)?;
    Ok(n)
}

/// Compute `C = A + B` into an existing buffer.
pub fn add_into<SA, SB, SC>(
    A: &nd::ArrayBase<SA, nd::Ix2>,
    B: &nd::ArrayBase<SB, nd::Ix2>,
    C: &mut nd::ArrayBase<SC, nd::Ix2>,
) -> RedfieldResult<()>
where
    SA: nd::Data<Elem = f64>,
    SB: nd::Data<Elem = f64>,
    SC: nd::DataMut<Elem = f64>,
{
    check_out("matrix::add", A, B, &*C)?;
    nd::Zip::from(C).and(A).and(B)
        .for_each(|c, &a, &b| { *c = a + b; });
    Ok(())
}

/// Compute `C = A + B`.
pub fn add<SA, SB>(A: &nd::ArrayBase<SA, nd::Ix2>, B: &nd::ArrayBase<SB, nd::Ix2>)
    -> RedfieldResult<nd::Array2<f64>>
where
    SA: nd::Data<Elem = f64>,
    SB: nd::Data<Elem = f64>,
{
    let n = common_dim("matrix::add", A, B)?;
    let mut C: nd::Array2<f64> = nd::Array2::zeros((n, n));
    add_into(A, B, &mut C)?;
    Ok(C)
}

/// Compute `C = A - B` into an existing buffer.
pub fn sub_into<SA, SB, SC>(
    A: &nd::ArrayBase<SA, nd::Ix2>,
    B: &nd::ArrayBase<SB, nd::Ix2>,
    C: &mut nd::ArrayBase<SC, nd::Ix2>,
) -> RedfieldResult<()>
where
    SA: nd::Data<Elem = f64>,
    SB: nd::Data<Elem = f64>,
    SC: nd::DataMut<Elem = f64>,
{
    check_out("matrix::sub", A, B, &*C)?;
    nd::Zip::from(C).and(A).and(B)
        .for_each(|c, &a, &b| { *c = a - b; });
    Ok(())
}

/// Compute `C = A - B`.
pub fn sub<SA, SB>(A: &nd::ArrayBase<SA, nd::Ix2>, B: &nd::ArrayBase<SB, nd::Ix2>)
    -> RedfieldResult<nd::Array2<f64>>
where
    SA: nd::Data<Elem = f64>,
    SB: nd::Data<Elem = f64>,
{
    let n = common_dim("matrix::sub", A, B)?;
    let mut C: nd::Array2<f64> = nd::Array2::zeros((n, n));
    sub_into(A, B, &mut C)?;
    Ok(C)
}

/// Multiply every element of `A` by `s`, in place.
pub fn scalar_mul<S>(A: &mut nd::ArrayBase<S, nd::Ix2>, s: f64)
where S: nd::DataMut<Elem = f64>
{
    A.map_inplace(|a| { *a *= s; });
}

/// Compute the matrix product `C = A B` into an existing buffer.
///
/// `C[i, j] = Σ_k A[i, k] B[k, j]`. The output cannot alias either input.
pub fn mul_into<SA, SB, SC>(
    A: &nd::ArrayBase<SA, nd::Ix2>,
    B: &nd::ArrayBase<SB, nd::Ix2>,
    C: &mut nd::ArrayBase<SC, nd::Ix2>,
) -> RedfieldResult<()>
where
    SA: nd::Data<Elem = f64>,
    SB: nd::Data<Elem = f64>,
    SC: nd::DataMut<Elem = f64>,
{
    check_out("matrix::mul", A, B, &*C)?;
    general_mat_mul(1.0, A, B, 0.0, C);
    Ok(())
}

/// Compute the matrix product `C = A B`.
pub fn mul<SA, SB>(A: &nd::ArrayBase<SA, nd::Ix2>, B: &nd::ArrayBase<SB, nd::Ix2>)
    -> RedfieldResult<nd::Array2<f64>>
where
    SA: nd::Data<Elem = f64>,
    SB: nd::Data<Elem = f64>,
{
    let n = common_dim("matrix::mul", A, B)?;
    let mut C: nd::Array2<f64> = nd::Array2::zeros((n, n));
    mul_into(A, B, &mut C)?;
    Ok(C)
}

/// Transpose a square matrix in place.
pub fn transpose<S>(A: &mut nd::ArrayBase<S, nd::Ix2>) -> RedfieldResult<()>
where S: nd::DataMut<Elem = f64>
{
    let n = square_dim("matrix::transpose", &*A)?;
    for i in 0..n {
        for j in i + 1..n {
            A.swap([i, j], [j, i]);
        }
    }
    Ok(())
}

/// Largest absolute element-wise difference between two matrices of equal
/// shape.
pub fn max_abs_diff<SA, SB>(
    A: &nd::ArrayBase<SA, nd::Ix2>,
    B: &nd::ArrayBase<SB, nd::Ix2>,
) -> RedfieldResult<f64>
where
    SA: nd::Data<Elem = f64>,
    SB: nd::Data<Elem = f64>,
{
    common_dim("matrix::max_abs_diff", A, B)?;
    Ok(
        A.iter().zip(B)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use crate::test_utils::{ rng, random_matrix };

    #[test]
    fn add_then_sub_recovers_operand() {
        let mut rng = rng(1);
        for n in [1, 2, 5, 9] {
            let A = random_matrix(n, &mut rng);
            let B = random_matrix(n, &mut rng);
            let C = add(&A, &B).unwrap();
            let D = sub(&C, &B).unwrap();
            assert!(max_abs_diff(&A, &D).unwrap() < 1e-12);
        }
    }

    #[test]
    fn scalar_mul_inverse_recovers_operand() {
        let mut rng = rng(2);
        let A = random_matrix(6, &mut rng);
        for s in [3.5, -0.25, 1e-3, 7e4] {
            let mut B = A.clone();
            scalar_mul(&mut B, s);
            scalar_mul(&mut B, s.recip());
            assert!(max_abs_diff(&A, &B).unwrap() < 1e-12);
        }
    }

    #[test]
    fn mul_matches_definition() {
        let A = array![[1.0, 2.0], [3.0, 4.0]];
        let B = array![[0.0, 1.0], [-1.0, 2.0]];
        let C = mul(&A, &B).unwrap();
        assert_eq!(C, array![[-2.0, 5.0], [-4.0, 11.0]]);
    }

    #[test]
    fn mul_is_not_commutative_and_not_in_place() {
        let A = array![[0.0, 1.0], [0.0, 0.0]];
        let B = array![[0.0, 0.0], [1.0, 0.0]];
        let AB = mul(&A, &B).unwrap();
        let BA = mul(&B, &A).unwrap();
        assert_eq!(AB, array![[1.0, 0.0], [0.0, 0.0]]);
        assert_eq!(BA, array![[0.0, 0.0], [0.0, 1.0]]);
        assert_eq!(A, array![[0.0, 1.0], [0.0, 0.0]]);
    }

    #[test]
    fn transpose_in_place() {
        let mut A = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]];
        transpose(&mut A).unwrap();
        assert_eq!(A, array![[1.0, 4.0, 7.0], [2.0, 5.0, 8.0], [3.0, 6.0, 9.0]]);
        let mut rng = rng(3);
        let R = random_matrix(7, &mut rng);
        let mut S = R.clone();
        transpose(&mut S).unwrap();
        assert_eq!(S, R.t());
        transpose(&mut S).unwrap();
        assert_eq!(S, R);
    }

    #[test]
    fn mismatched_dimensions_are_rejected() {
        let A: nd::Array2<f64> = nd::Array2::zeros((3, 3));
        let B: nd::Array2<f64> = nd::Array2::zeros((4, 4));
        match add(&A, &B) {
            Err(RedfieldError::DimensionMismatch { expected, got, .. }) => {
                assert_eq!((expected, got), (3, 4));
            },
            other => panic!("unexpected result {:?}", other),
        }
        assert!(mul(&A, &B).is_err());
        let mut C: nd::Array2<f64> = nd::Array2::zeros((4, 4));
        assert!(sub_into(&A, &A, &mut C).is_err());
        assert!(C.iter().all(|c| *c == 0.0));
    }

    #[test]
    fn non_square_is_rejected() {
        let mut A: nd::Array2<f64> = nd::Array2::zeros((2, 3));
        assert!(matches!(
            transpose(&mut A),
            Err(RedfieldError::NotSquare { rows: 2, cols: 3, .. })
        ));
    }
}
