#![allow(non_snake_case)]

//! Excitation transfer along a short chain of sites into a target sink, with a
//! weak loss channel, integrated by a fixed-step RK4 loop.
//!
//! Log verbosity is set through `RUST_LOG` (e.g. `RUST_LOG=redfield_sim=debug`).

use anyhow::Context;
use ndarray as nd;
use tracing::info;
use tracing_subscriber::{ fmt, prelude::*, EnvFilter };
use redfield_sim::{
    basis::diagonalize,
    density::{ check_density, populations, renormalize },
    ComplexMatrix,
    EngineConfig,
    RedfieldOperator,
    RedfieldParams,
    RedfieldResult,
};

// site energies and nearest-neighbor couplings, cm⁻¹
const SITE_ENERGIES: [f64; 3] = [280.0, 420.0, 230.0];
const COUPLING: f64 = -95.0;
// rates, fs⁻¹
const DEPHASING: f64 = 4e-3;
const LOSS: f64 = 1e-5;
const TRAPPING: f64 = 2.5e-3;
// time grid, fs
const DT: f64 = 1.0;
const STEPS: usize = 5000;
const REPORT_EVERY: usize = 500;
const DRIFT_TOL: f64 = 1e-9;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}

fn axpy(y: &ComplexMatrix, a: f64, x: &ComplexMatrix)
    -> RedfieldResult<ComplexMatrix>
{
    let mut out = y.clone();
    out.add_scaled(a, x)?;
    Ok(out)
}

fn rk4_step<F>(rhs: &F, rho: &mut ComplexMatrix, dt: f64) -> RedfieldResult<()>
where F: Fn(&ComplexMatrix) -> RedfieldResult<ComplexMatrix>
{
    let k1 = rhs(&*rho)?;
    let k2 = rhs(&axpy(rho, dt / 2.0, &k1)?)?;
    let k3 = rhs(&axpy(rho, dt / 2.0, &k2)?)?;
    let k4 = rhs(&axpy(rho, dt, &k3)?)?;
    rho.add_scaled(dt / 6.0, &k1)?;
    rho.add_scaled(dt / 3.0, &k2)?;
    rho.add_scaled(dt / 3.0, &k3)?;
    rho.add_scaled(dt / 6.0, &k4)?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let n_sites = SITE_ENERGIES.len();
    let n = n_sites + 2;

    let H_site = nd::Array2::from_shape_fn((n_sites, n_sites), |(i, j)| {
        if i == j { SITE_ENERGIES[i] }
        else if i.abs_diff(j) == 1 { COUPLING }
        else { 0.0 }
    });
    let (E, R) = diagonalize(H_site)
        .context("failed to diagonalize site Hamiltonian")?;
    info!(energies = ?E.to_vec(), "exciton energies (cm⁻¹)");

    // sinks are left uncoupled to the chain and sit at zero energy
    let mut energies: nd::Array1<f64> = nd::Array1::zeros(n);
    energies.slice_mut(nd::s![1..n - 1]).assign(&E);
    let mut Q: nd::Array2<f64> = nd::Array2::eye(n);
    Q.slice_mut(nd::s![1..n - 1, 1..n - 1]).assign(&R);

    // local dephasing on every site; trapping from the last site only
    let mut gammas: nd::Array3<f64> = nd::Array3::zeros((n, n, n));
    let mut links_to_loss: nd::Array1<f64> = nd::Array1::zeros(n);
    for m in 1..n - 1 {
        gammas[[m, m, m]] = DEPHASING;
        links_to_loss[m] = LOSS;
    }
    let mut links_to_target: nd::Array1<f64> = nd::Array1::zeros(n);
    links_to_target[n - 2] = TRAPPING;

    let params = RedfieldParams {
        energies: energies.view(),
        gammas: gammas.view(),
        eigvects: Q.view(),
        links_to_loss: links_to_loss.view(),
        links_to_target: links_to_target.view(),
    };
    let op = RedfieldOperator::new(params, EngineConfig::default())?;
    let rhs = op.rhs_fn();

    // start with the excitation on the first site, expressed in the exciton
    // basis
    let mut rho = ComplexMatrix::zeros(n);
    let first = Q.row(1);
    rho.re.assign(
        &nd::Array2::from_shape_fn((n, n), |(i, j)| first[i] * first[j]));

    println!("{:>8}  {:>10}  {:>10}  {:>10}", "t (fs)", "loss", "chain", "target");
    for step in 0..=STEPS {
        if step % REPORT_EVERY == 0 {
            let p = populations(&rho);
            let chain: f64 = p.slice(nd::s![1..n - 1]).sum();
            println!(
                "{:8.1}  {:10.6}  {:10.6}  {:10.6}",
                step as f64 * DT, p[0], chain, p[n - 1],
            );
        }
        if step == STEPS { break; }
        rk4_step(&rhs, &mut rho, DT)?;
        if check_density(&rho, DRIFT_TOL).is_err() {
            info!(step, "renormalizing density matrix");
            renormalize(&mut rho);
        }
    }
    Ok(())
}
