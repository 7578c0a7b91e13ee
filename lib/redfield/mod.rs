//! Right-hand side `dρ/dt` of the Redfield/Lindblad master equation in the
//! exciton basis.
//!
//! ```text
//! dρ/dt = -i [H, ρ] / ħ + Σ_k γ_k D[V_k] ρ
//! ```
//! where `H` is diagonal in the exciton basis and the jump operators `V_k`
//! are projectors `|a⟩⟨b|` rotated by the eigenvector matrix `Q`. See
//! [`coherent`] and [`dissipator`] for the two halves.
//!
//! State `0` is the loss sink and state `N - 1` is the target sink. Each
//! evaluation is a pure function of its inputs; time integration and
//! re-normalization are left to the caller.

use ndarray as nd;
use tracing::{ debug, warn };
use crate::{
    basis::orthogonality_defect,
    complex::ComplexMatrix,
    error::RedfieldResult,
    matrix::{ expect_dim, square_dim },
    scratch::ScratchPool,
    units::UnitSystem,
};

pub mod coherent;
pub mod dissipator;

/// Largest `|Qᵗ Q - I|` accepted without a warning.
const ORTHOGONALITY_WARN: f64 = 1e-8;

/// Strategy for the inter-exciton dissipator pass.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Parallelism {
    /// Everything on the calling thread, in a fixed order.
    Serial,
    /// Split over `(M, N)` rate pairs on the rayon global pool.
    #[default]
    Rayon,
}

/// Settings fixed for the lifetime of a [`RedfieldOperator`].
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct EngineConfig {
    pub units: UnitSystem,
    pub parallelism: Parallelism,
}

impl EngineConfig {
    pub fn with_units(mut self, units: UnitSystem) -> Self {
        self.units = units;
        self
    }

    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }
}

/// Borrowed system description, all in the exciton basis.
///
/// - `energies`: exciton energies (diagonal of `H`), length `N`
/// - `gammas`: inter-exciton rates, `gammas[[M, N, m]]`, shape `N × N × N`
/// - `eigvects`: eigenvector matrix `Q`, eigenvectors as columns, `N × N`
/// - `links_to_loss`: rate from each state into state `0`, length `N`
/// - `links_to_target`: rate from each state into state `N - 1`, length `N`
#[derive(Copy, Clone, Debug)]
pub struct RedfieldParams<'a> {
    pub energies: nd::ArrayView1<'a, f64>,
    pub gammas: nd::ArrayView3<'a, f64>,
    pub eigvects: nd::ArrayView2<'a, f64>,
    pub links_to_loss: nd::ArrayView1<'a, f64>,
    pub links_to_target: nd::ArrayView1<'a, f64>,
}

impl<'a> RedfieldParams<'a> {
    /// Check that every input agrees on the system size and return it.
    pub fn dim(&self) -> RedfieldResult<usize> {
        const CTX: &str = "RedfieldParams";
        let n = self.energies.len();
        expect_dim(CTX, n, square_dim(CTX, &self.eigvects)?)?;
        let (g0, g1, g2) = self.gammas.dim();
        expect_dim(CTX, n, g0)?;
        expect_dim(CTX, n, g1)?;
        expect_dim(CTX, n, g2)?;
        expect_dim(CTX, n, self.links_to_loss.len())?;
        expect_dim(CTX, n, self.links_to_target.len())?;
        Ok(n)
    }
}

/// A validated system, ready to be evaluated at many density matrices.
#[derive(Clone, Debug)]
pub struct RedfieldOperator<'a> {
    params: RedfieldParams<'a>,
    config: EngineConfig,
    n: usize,
}

impl<'a> RedfieldOperator<'a> {
    /// Validate `params` once.
    ///
    /// Logs a warning if `eigvects` is noticeably non-orthogonal; such a basis
    /// is still accepted.
    pub fn new(params: RedfieldParams<'a>, config: EngineConfig)
        -> RedfieldResult<Self>
    {
        let n = params.dim()?;
        let defect = orthogonality_defect(&params.eigvects)?;
        if defect > ORTHOGONALITY_WARN {
            warn!(n, defect, "eigenvector basis is not orthogonal");
        }
        Ok(Self { params, config, n })
    }

    /// System dimension `N`.
    pub fn dim(&self) -> usize { self.n }

    fn check_rho(&self, rho: &ComplexMatrix) -> RedfieldResult<()> {
        let n = rho.checked_dim("RedfieldOperator")?;
        expect_dim("RedfieldOperator", self.n, n)
    }

    /// Coherent part `-i [H, ρ] / ħ` alone.
    pub fn coherent(&self, rho: &ComplexMatrix) -> RedfieldResult<ComplexMatrix> {
        self.check_rho(rho)?;
        coherent::commutator(rho, &self.params.energies, &self.config.units)
    }

    /// Dissipative part alone.
    pub fn dissipator(&self, rho: &ComplexMatrix)
        -> RedfieldResult<ComplexMatrix>
    {
        self.check_rho(rho)?;
        dissipator::dissipator(
            rho,
            &self.params.gammas,
            &self.params.eigvects,
            &self.params.links_to_loss,
            &self.params.links_to_target,
            self.config.parallelism,
        )
    }

    /// Compute `dρ/dt`.
    ///
    /// `rho` is assumed to be Hermitian with unit trace but is not checked;
    /// see [`crate::density::check_density`].
    pub fn rhs(&self, rho: &ComplexMatrix) -> RedfieldResult<ComplexMatrix> {
        self.check_rho(rho)?;
        debug!(n = self.n, parallelism = ?self.config.parallelism, "evaluating rhs");
        let mut pool = ScratchPool::new(self.n);
        let coh = coherent::commutator_pooled(
            rho, &self.params.energies, &self.config.units, &mut pool)?;
        let mut diss = ComplexMatrix {
            re: pool.take_zeroed(),
            im: pool.take_zeroed(),
        };
        dissipator::dissipator_into(
            &mut diss,
            rho,
            &self.params.gammas,
            &self.params.eigvects,
            &self.params.links_to_loss,
            &self.params.links_to_target,
            self.config.parallelism,
            &mut pool,
        )?;
        let mut drho = coh;
        drho.add_scaled(1.0, &diss)?;
        Ok(drho)
    }

    /// [`Self::rhs`] as a closure, for handing to a time integrator.
    pub fn rhs_fn(&self)
        -> impl Fn(&ComplexMatrix) -> RedfieldResult<ComplexMatrix> + '_ + use<'_, 'a>
    {
        move |rho: &ComplexMatrix| self.rhs(rho)
    }
}

/// Compute `dρ/dt` for a single set of inputs with the default
/// [`EngineConfig`].
///
/// All dimensions are validated before any arithmetic. For repeated
/// evaluations with the same couplings, build a [`RedfieldOperator`] instead.
pub fn evaluate_rhs<SE, SG, SQ, SL, ST>(
    rho: &ComplexMatrix,
    energies: &nd::ArrayBase<SE, nd::Ix1>,
    gammas: &nd::ArrayBase<SG, nd::Ix3>,
    eigvects: &nd::ArrayBase<SQ, nd::Ix2>,
    links_to_loss: &nd::ArrayBase<SL, nd::Ix1>,
    links_to_target: &nd::ArrayBase<ST, nd::Ix1>,
) -> RedfieldResult<ComplexMatrix>
where
    SE: nd::Data<Elem = f64>,
    SG: nd::Data<Elem = f64>,
    SQ: nd::Data<Elem = f64>,
    SL: nd::Data<Elem = f64>,
    ST: nd::Data<Elem = f64>,
{
    evaluate_rhs_with(
        rho,
        energies,
        gammas,
        eigvects,
        links_to_loss,
        links_to_target,
        EngineConfig::default(),
    )
}

/// Like [`evaluate_rhs`], with an explicit configuration.
pub fn evaluate_rhs_with<SE, SG, SQ, SL, ST>(
    rho: &ComplexMatrix,
    energies: &nd::ArrayBase<SE, nd::Ix1>,
    gammas: &nd::ArrayBase<SG, nd::Ix3>,
    eigvects: &nd::ArrayBase<SQ, nd::Ix2>,
    links_to_loss: &nd::ArrayBase<SL, nd::Ix1>,
    links_to_target: &nd::ArrayBase<ST, nd::Ix1>,
    config: EngineConfig,
) -> RedfieldResult<ComplexMatrix>
where
    SE: nd::Data<Elem = f64>,
    SG: nd::Data<Elem = f64>,
    SQ: nd::Data<Elem = f64>,
    SL: nd::Data<Elem = f64>,
    ST: nd::Data<Elem = f64>,
{
    let params = RedfieldParams {
        energies: energies.view(),
        gammas: gammas.view(),
        eigvects: eigvects.view(),
        links_to_loss: links_to_loss.view(),
        links_to_target: links_to_target.view(),
    };
    RedfieldOperator::new(params, config)?.rhs(rho)
}
