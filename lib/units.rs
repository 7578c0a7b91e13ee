//! Physical constants and the unit system in which the engine works.
//!
//! Energies are wavenumbers (cm⁻¹) and times are femtoseconds, so ħ is carried
//! in units of cm⁻¹·fs.

use crate::error::{ RedfieldError, RedfieldResult };

/// Reduced Planck constant in eV·s.
pub const HBAR_EV_S: f64 = 6.582119514e-16;

/// Wavenumbers per electronvolt.
pub const EV_TO_CM1: f64 = 8065.54429;

/// Femtoseconds per second.
pub const S_TO_FS: f64 = 1e15;

/// Femtosecond·wavenumber product equal to one, i.e. `1 / c` in fs/cm.
pub const FS1_TO_CM1: f64 = 33356.40952;

/// Inverse of [`FS1_TO_CM1`].
pub const CM1_TO_FS1: f64 = 1.0 / FS1_TO_CM1;

/// Immutable set of unit conversion factors, built once and shared by every
/// evaluation.
///
/// The default is the wavenumber/femtosecond system, in which
/// `ħ = 6.582119514e-16 eV·s × 8065.54429 cm⁻¹/eV × 10¹⁵ fs/s ≈ 5308.84
/// cm⁻¹·fs`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct UnitSystem {
    hbar: f64,
    hbar_inv: f64,
    cm1_to_fs1: f64,
}

impl Default for UnitSystem {
    fn default() -> Self { Self::wavenumber_femtosecond() }
}

impl UnitSystem {
    /// Energies in cm⁻¹, times in fs.
    pub fn wavenumber_femtosecond() -> Self {
        Self::from_parts(HBAR_EV_S * EV_TO_CM1 * S_TO_FS, CM1_TO_FS1)
    }

    /// Natural units, where ħ = 1 and energies are angular frequencies.
    pub fn natural() -> Self { Self::from_parts(1.0, 1.0) }

    /// Build a unit system from a value of ħ (energy × time) and the factor
    /// converting an energy unit into an inverse time unit.
    ///
    /// Fails with [`RedfieldError::InvalidUnits`] if `hbar` is not finite and
    /// positive.
    pub fn with_hbar(hbar: f64, cm1_to_fs1: f64) -> RedfieldResult<Self> {
        if !(hbar.is_finite() && hbar > 0.0) {
            return Err(RedfieldError::InvalidUnits { hbar });
        }
        Ok(Self::from_parts(hbar, cm1_to_fs1))
    }

    fn from_parts(hbar: f64, cm1_to_fs1: f64) -> Self {
        Self { hbar, hbar_inv: hbar.recip(), cm1_to_fs1 }
    }

    /// ħ in energy × time units.
    pub fn hbar(&self) -> f64 { self.hbar }

    /// 1/ħ, the factor applied to the commutator `[H, ρ]`.
    pub fn hbar_inv(&self) -> f64 { self.hbar_inv }

    /// Convert an energy (wavenumber) into an inverse time.
    pub fn energy_to_rate(&self, e: f64) -> f64 { e * self.cm1_to_fs1 }

    /// Convert an inverse time into an energy (wavenumber).
    pub fn rate_to_energy(&self, r: f64) -> f64 { r / self.cm1_to_fs1 }
}
