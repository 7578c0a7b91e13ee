//! Incoherent part of the evolution: Lindblad dissipators built from real jump
//! operators in the exciton basis.
//!
//! For a real jump operator `V`,
//! ```text
//! D[V]ρ = V ρ Vᵗ - ½ Vᵗ V ρ - ½ ρ Vᵗ V
//! ```
//! which is real-linear in `ρ`, so it is applied separately to `ρ.re` and
//! `ρ.im`. Each application is trace-preserving on its own.
//!
//! Three passes contribute:
//! 1. Decay among exciton states: for each interior state `m` (excluding the
//!    loss state `0` and the target state `N - 1`), the projector onto `m`
//!    weighted by every rate `gammas[[M, N, m]]`.
//! 2. Decay into the loss sink: `|0⟩⟨m|` at rate `links_to_loss[m]`.
//! 3. Decay into the target sink: `|N-1⟩⟨m|` at rate `links_to_target[m]`.
//!
//! Pass 1 dominates at O(N⁶). Under [`Parallelism::Rayon`] it is split over
//! `(M, N)` pairs with a fold into per-worker accumulators followed by a tree
//! reduction, so no matrix is ever written by two threads. The reduction order
//! depends on scheduling, so results may differ between runs in the last few
//! bits.

use itertools::Itertools;
use ndarray as nd;
use rayon::iter::{ IntoParallelIterator, ParallelIterator };
use tracing::trace;
use crate::{
    basis::projector_pooled,
    complex::ComplexMatrix,
    error::{ RedfieldError, RedfieldResult },
    matrix::{ expect_dim, mul_into, square_dim },
    redfield::Parallelism,
    scratch::ScratchPool,
};

/// A real jump operator `V` together with `Vᵗ` and `Vᵗ V`.
#[derive(Clone, Debug)]
pub struct JumpOperator {
    V: nd::Array2<f64>,
    Vt: nd::Array2<f64>,
    VtV: nd::Array2<f64>,
}

impl JumpOperator {
    /// Wrap a square real matrix.
    pub fn new(V: nd::Array2<f64>) -> RedfieldResult<Self> {
        square_dim("JumpOperator::new", &V)?;
        let Vt = V.t().to_owned();
        let VtV = Vt.dot(&V);
        Ok(Self { V, Vt, VtV })
    }

    /// `|a⟩⟨b|` in the basis given by the columns of `Q`; see
    /// [`projector`][crate::basis::projector].
    pub fn from_states<SQ>(
        a: usize,
        b: usize,
        Q: &nd::ArrayBase<SQ, nd::Ix2>,
        pool: &mut ScratchPool,
    ) -> RedfieldResult<Self>
    where SQ: nd::Data<Elem = f64>
    {
        let V = projector_pooled(a, b, Q, pool)?;
        let mut Vt = pool.take();
        Vt.assign(&V.t());
        let mut VtV = pool.take();
        mul_into(&Vt, &V, &mut VtV)?;
        Ok(Self { V, Vt, VtV })
    }

    /// Matrix dimension.
    pub fn dim(&self) -> usize { self.V.nrows() }

    /// Return all buffers to a scratch pool.
    pub fn recycle(self, pool: &mut ScratchPool) {
        pool.give(self.V);
        pool.give(self.Vt);
        pool.give(self.VtV);
    }
}

// shared shape checks for the accumulating operations: `rho` and `acc` must
// be square and non-ragged, and `pool` must hand out buffers of the same size
fn check_operands(
    context: &'static str,
    acc: &ComplexMatrix,
    rho: &ComplexMatrix,
    pool: &ScratchPool,
) -> RedfieldResult<usize>
{
    let n = rho.checked_dim(context)?;
    expect_dim(context, n, acc.checked_dim(context)?)?;
    expect_dim(context, n, pool.dim())?;
    Ok(n)
}

/// Add `rate · D[V]ρ` into `acc`.
pub fn accumulate_lindblad(
    acc: &mut ComplexMatrix,
    jump: &JumpOperator,
    rate: f64,
    rho: &ComplexMatrix,
    pool: &mut ScratchPool,
) -> RedfieldResult<()>
{
    const CTX: &str = "dissipator::lindblad";
    let n = check_operands(CTX, acc, rho, pool)?;
    expect_dim(CTX, n, jump.dim())?;

    let mut Vx = pool.take();
    let mut term = pool.take();
    for (x, out) in [(&rho.re, &mut acc.re), (&rho.im, &mut acc.im)] {
        mul_into(&jump.V, x, &mut Vx)?;
        // V x Vᵗ
        mul_into(&Vx, &jump.Vt, &mut term)?;
        out.scaled_add(rate, &term);
        // Vᵗ V x
        mul_into(&jump.Vt, &Vx, &mut term)?;
        out.scaled_add(-0.5 * rate, &term);
        // x Vᵗ V
        mul_into(x, &jump.VtV, &mut term)?;
        out.scaled_add(-0.5 * rate, &term);
    }
    pool.give(Vx);
    pool.give(term);
    Ok(())
}

/// Compute `rate · D[V]ρ` for a single channel.
pub fn lindblad_term(V: &nd::Array2<f64>, rate: f64, rho: &ComplexMatrix)
    -> RedfieldResult<ComplexMatrix>
{
    let n = rho.checked_dim("dissipator::lindblad_term")?;
    let jump = JumpOperator::new(V.clone())?;
    let mut pool = ScratchPool::new(n);
    let mut out = ComplexMatrix::zeros(n);
    accumulate_lindblad(&mut out, &jump, rate, rho, &mut pool)?;
    Ok(out)
}

fn check_inputs<SG, SQ, SL, ST>(
    rho: &ComplexMatrix,
    gammas: &nd::ArrayBase<SG, nd::Ix3>,
    Q: &nd::ArrayBase<SQ, nd::Ix2>,
    links_to_loss: &nd::ArrayBase<SL, nd::Ix1>,
    links_to_target: &nd::ArrayBase<ST, nd::Ix1>,
) -> RedfieldResult<usize>
where
    SG: nd::Data<Elem = f64>,
    SQ: nd::Data<Elem = f64>,
    SL: nd::Data<Elem = f64>,
    ST: nd::Data<Elem = f64>,
{
    const CTX: &str = "dissipator";
    let n = rho.checked_dim(CTX)?;
    let (g0, g1, g2) = gammas.dim();
    expect_dim(CTX, n, g0)?;
    expect_dim(CTX, n, g1)?;
    expect_dim(CTX, n, g2)?;
    expect_dim(CTX, n, square_dim(CTX, Q)?)?;
    expect_dim(CTX, n, links_to_loss.len())?;
    expect_dim(CTX, n, links_to_target.len())?;
    Ok(n)
}

/// Pass 1: decay among exciton states, added into `acc`.
///
/// For every interior state `m` and every pair `(M, N)`, adds
/// `gammas[[M, N, m]] · D[|m⟩⟨m|]ρ` with the projector taken in the basis of
/// `Q`. Exactly-zero rates are skipped.
pub fn inter_exciton_pass<SG, SQ>(
    acc: &mut ComplexMatrix,
    rho: &ComplexMatrix,
    gammas: &nd::ArrayBase<SG, nd::Ix3>,
    Q: &nd::ArrayBase<SQ, nd::Ix2>,
    parallelism: Parallelism,
    pool: &mut ScratchPool,
) -> RedfieldResult<()>
where
    SG: nd::Data<Elem = f64>,
    SQ: nd::Data<Elem = f64>,
{
    const CTX: &str = "dissipator::inter_exciton_pass";
    let n = check_operands(CTX, acc, rho, pool)?;
    expect_dim(CTX, n, square_dim(CTX, Q)?)?;
    let (g0, g1, g2) = gammas.dim();
    expect_dim(CTX, n, g0)?;
    expect_dim(CTX, n, g1)?;
    expect_dim(CTX, n, g2)?;

    let pairs: Vec<(usize, usize)>
        = (0..n).cartesian_product(0..n).collect();
    for m in 1..n.saturating_sub(1) {
        let jump = JumpOperator::from_states(m, m, Q, pool)?;
        let rates: Vec<f64>
            = pairs.iter()
            .map(|&(M, N)| gammas[[M, N, m]])
            .filter(|rate| *rate != 0.0)
            .collect();
        trace!(m, channels = rates.len(), "inter-exciton decay");
        match parallelism {
            Parallelism::Serial => {
                for rate in rates.into_iter() {
                    accumulate_lindblad(acc, &jump, rate, rho, pool)?;
                }
            },
            Parallelism::Rayon => {
                let partial: ComplexMatrix
                    = rates.into_par_iter()
                    .try_fold(
                        || (ComplexMatrix::zeros(n), ScratchPool::new(n)),
                        |(mut local, mut local_pool), rate|
                            -> RedfieldResult<(ComplexMatrix, ScratchPool)>
                        {
                            accumulate_lindblad(
                                &mut local, &jump, rate, rho, &mut local_pool)?;
                            Ok((local, local_pool))
                        },
                    )
                    .map(|res| res.map(|(local, _)| local))
                    .try_reduce(
                        || ComplexMatrix::zeros(n),
                        |mut a, b| -> RedfieldResult<ComplexMatrix> {
                            a.add_scaled(1.0, &b)?;
                            Ok(a)
                        },
                    )?;
                acc.add_scaled(1.0, &partial)?;
            },
        }
        jump.recycle(pool);
    }
    Ok(())
}

/// Passes 2 and 3: decay from every state `m` into `sink` at rate
/// `links[m]`, added into `acc`.
///
/// Fails with [`RedfieldError::StateOutOfRange`] if `sink` is not a state.
pub fn sink_pass<SL, SQ>(
    acc: &mut ComplexMatrix,
    rho: &ComplexMatrix,
    sink: usize,
    links: &nd::ArrayBase<SL, nd::Ix1>,
    Q: &nd::ArrayBase<SQ, nd::Ix2>,
    pool: &mut ScratchPool,
) -> RedfieldResult<()>
where
    SL: nd::Data<Elem = f64>,
    SQ: nd::Data<Elem = f64>,
{
    const CTX: &str = "dissipator::sink_pass";
    let n = check_operands(CTX, acc, rho, pool)?;
    expect_dim(CTX, n, square_dim(CTX, Q)?)?;
    expect_dim(CTX, n, links.len())?;
    if sink >= n {
        return Err(
            RedfieldError::StateOutOfRange { context: CTX, index: sink, n });
    }
    for (m, &rate) in links.iter().enumerate() {
        if rate == 0.0 { continue; }
        let jump = JumpOperator::from_states(sink, m, Q, pool)?;
        accumulate_lindblad(acc, &jump, rate, rho, pool)?;
        jump.recycle(pool);
    }
    trace!(sink, "sink decay");
    Ok(())
}

/// Compute the full dissipator into `acc`, which is expected to be zeroed
/// by the caller if only the dissipator is wanted.
#[allow(clippy::too_many_arguments)]
pub fn dissipator_into<SG, SQ, SL, ST>(
    acc: &mut ComplexMatrix,
    rho: &ComplexMatrix,
    gammas: &nd::ArrayBase<SG, nd::Ix3>,
    Q: &nd::ArrayBase<SQ, nd::Ix2>,
    links_to_loss: &nd::ArrayBase<SL, nd::Ix1>,
    links_to_target: &nd::ArrayBase<ST, nd::Ix1>,
    parallelism: Parallelism,
    pool: &mut ScratchPool,
) -> RedfieldResult<()>
where
    SG: nd::Data<Elem = f64>,
    SQ: nd::Data<Elem = f64>,
    SL: nd::Data<Elem = f64>,
    ST: nd::Data<Elem = f64>,
{
    let n = check_inputs(rho, gammas, Q, links_to_loss, links_to_target)?;
    check_operands("dissipator", acc, rho, pool)?;
    if n == 0 { return Ok(()); }
    inter_exciton_pass(acc, rho, gammas, Q, parallelism, pool)?;
    sink_pass(acc, rho, 0, links_to_loss, Q, pool)?;
    sink_pass(acc, rho, n - 1, links_to_target, Q, pool)?;
    Ok(())
}

/// Compute the full dissipator in a freshly zeroed matrix.
pub fn dissipator<SG, SQ, SL, ST>(
    rho: &ComplexMatrix,
    gammas: &nd::ArrayBase<SG, nd::Ix3>,
    Q: &nd::ArrayBase<SQ, nd::Ix2>,
    links_to_loss: &nd::ArrayBase<SL, nd::Ix1>,
    links_to_target: &nd::ArrayBase<ST, nd::Ix1>,
    parallelism: Parallelism,
) -> RedfieldResult<ComplexMatrix>
where
    SG: nd::Data<Elem = f64>,
    SQ: nd::Data<Elem = f64>,
    SL: nd::Data<Elem = f64>,
    ST: nd::Data<Elem = f64>,
{
    let n = check_inputs(rho, gammas, Q, links_to_loss, links_to_target)?;
    let mut pool = ScratchPool::new(n);
    let mut acc = ComplexMatrix::zeros(n);
    dissipator_into(
        &mut acc,
        rho,
        gammas,
        Q,
        links_to_loss,
        links_to_target,
        parallelism,
        &mut pool,
    )?;
    Ok(acc)
}
