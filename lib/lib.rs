#![allow(non_snake_case)]

//! Right-hand side of the Redfield/Lindblad master equation for exciton
//! transport, in the exciton eigenbasis.
//!
//! Energies are in wavenumbers (cm⁻¹) and times in femtoseconds; see
//! [`units::UnitSystem`]. Matrices are plain [`ndarray`] arrays, with complex
//! matrices carried as pairs of real matrices ([`complex::ComplexMatrix`]).
//!
//! The only per-step entry point for a time integrator is
//! [`redfield::evaluate_rhs`] (or [`redfield::RedfieldOperator::rhs`] when the
//! couplings are fixed across many steps).

pub mod error;
pub mod units;
pub mod matrix;
pub mod scratch;
pub mod complex;
pub mod basis;
pub mod density;
pub mod redfield;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::{ RedfieldError, RedfieldResult };
pub use complex::ComplexMatrix;
pub use units::UnitSystem;
pub use redfield::{
    evaluate_rhs,
    evaluate_rhs_with,
    EngineConfig,
    Parallelism,
    RedfieldOperator,
    RedfieldParams,
};
