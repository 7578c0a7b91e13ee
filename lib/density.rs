//! Diagnostics for density matrices.
//!
//! The RHS evaluation assumes, but never checks, that `ρ` is Hermitian with
//! unit trace. Under exact arithmetic the computed `dρ/dt` keeps it that way;
//! under floating-point arithmetic a long integration drifts. Integrators
//! should call [`check_density`] every so often and renormalize (or abort)
//! when it fails.

use ndarray as nd;
use ndarray_linalg::Norm;
use crate::{
    complex::ComplexMatrix,
    error::{ RedfieldError, RedfieldResult },
};

/// Largest deviation from Hermiticity: `max(|re - reᵗ|, |im + imᵗ|)`.
pub fn hermiticity_error(rho: &ComplexMatrix) -> f64 {
    let re = (&rho.re - &rho.re.t()).norm_max();
    let im = (&rho.im + &rho.im.t()).norm_max();
    re.max(im)
}

/// Deviation from unit trace: `|tr re - 1| + |tr im|`.
pub fn trace_error(rho: &ComplexMatrix) -> f64 {
    let tr = rho.trace();
    (tr.re - 1.0).abs() + tr.im.abs()
}

/// State populations, i.e. the main diagonal of `re`.
pub fn populations(rho: &ComplexMatrix) -> nd::Array1<f64> {
    rho.re.diag().to_owned()
}

/// Fail with [`RedfieldError::NumericInstability`] if `rho` is non-Hermitian
/// or has non-unit trace beyond `tol`.
pub fn check_density(rho: &ComplexMatrix, tol: f64) -> RedfieldResult<()> {
    let hermiticity = hermiticity_error(rho);
    let trace = trace_error(rho);
    if hermiticity > tol || trace > tol {
        return Err(
            RedfieldError::NumericInstability { hermiticity, trace, tol });
    }
    Ok(())
}

/// Project `rho` back onto Hermitian, unit-trace matrices:
/// `ρ ← (ρ + ρ†) / (2 tr ρ)`.
///
/// Leaves `rho` unchanged if its trace is zero.
pub fn renormalize(rho: &mut ComplexMatrix) {
    let re = (&rho.re + &rho.re.t()) / 2.0;
    let im = (&rho.im - &rho.im.t()) / 2.0;
    rho.re = re;
    rho.im = im;
    let tr = rho.re.diag().sum();
    if tr != 0.0 {
        rho.scale(tr.recip());
    }
}
