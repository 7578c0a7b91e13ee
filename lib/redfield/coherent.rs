//! Coherent part of the evolution, `-i [H, ρ] / ħ`.

use ndarray as nd;
use crate::{
    complex::{ complex_mul_pooled, ComplexMatrix },
    error::RedfieldResult,
    matrix::{ expect_dim, sub_into },
    scratch::ScratchPool,
    units::UnitSystem,
};

/// Compute `-i [H, ρ] / ħ` for a Hamiltonian `H` that is diagonal in the
/// exciton basis, given by its diagonal `energies`.
///
/// With `[H, ρ] = X + i Y` the result is `(Y - i X) / ħ`: the real part of
/// the output comes from the imaginary part of the raw commutator and the
/// imaginary part from minus its real part.
pub fn commutator<S>(
    rho: &ComplexMatrix,
    energies: &nd::ArrayBase<S, nd::Ix1>,
    units: &UnitSystem,
) -> RedfieldResult<ComplexMatrix>
where S: nd::Data<Elem = f64>
{
    let mut pool = ScratchPool::new(rho.dim());
    commutator_pooled(rho, energies, units, &mut pool)
}

/// Like [`commutator`], but drawing every buffer from `pool`.
pub fn commutator_pooled<S>(
    rho: &ComplexMatrix,
    energies: &nd::ArrayBase<S, nd::Ix1>,
    units: &UnitSystem,
    pool: &mut ScratchPool,
) -> RedfieldResult<ComplexMatrix>
where S: nd::Data<Elem = f64>
{
    const CTX: &str = "coherent::commutator";
    let n = rho.checked_dim(CTX)?;
    expect_dim(CTX, n, energies.len())?;
    expect_dim(CTX, n, pool.dim())?;

    let H = ComplexMatrix::from_diagonal(energies);
    let Hrho = complex_mul_pooled(&H, rho, pool)?;
    let rhoH = complex_mul_pooled(rho, &H, pool)?;

    let mut re = pool.take();
    sub_into(&Hrho.im, &rhoH.im, &mut re)?;
    let mut im = pool.take();
    sub_into(&rhoH.re, &Hrho.re, &mut im)?;
    Hrho.recycle(pool);
    rhoH.recycle(pool);

    let mut comm = ComplexMatrix { re, im };
    comm.scale(units.hbar_inv());
    Ok(comm)
}
