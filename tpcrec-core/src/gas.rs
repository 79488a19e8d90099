//! Gas stopping power and beam energy tables.
//!
//! The reconstruction core treats gas properties as tabulated lookups:
//! a stopping-power table on a 1-keV grid and a beam-energy-vs-penetration
//! table on a 1-mm grid. The tables are usually built from an external gas
//! physics source, but this module also carries the Bethe formula and the
//! empirical fits used by the AT-TPC analysis chain so a table can be
//! derived in-process.

use crate::constants::{beta, C_LGT, EPS_0, E_CHG, E_MC2, MEV_TO_KG, N_AVO, P_MC2};
use crate::error::TrackingError;
use std::f64::consts::PI;

/// Depth of the active volume covered by the beam-energy table, mm.
const BEAM_TABLE_MM: usize = 1000;

/// Tabulated gas model.
///
/// `stopping_power` answers how much energy per unit length a particle of
/// the tracked species loses at a given kinetic energy; `beam_energy_at`
/// answers what the beam's residual energy is after penetrating to a given
/// z. The beam is taken to enter the active volume at z = 1 m moving in −z,
/// so penetration depth is `1 m − z`.
#[derive(Clone, Debug)]
pub struct GasModel {
    /// Stopping power, MeV/m, on a 1-keV grid: `eloss[i]` is the value at
    /// `i` keV.
    eloss: Vec<f64>,
    /// Beam kinetic energy, MeV, on a 1-mm penetration grid from 0 to
    /// [`BEAM_TABLE_MM`].
    en_vs_z: Vec<f64>,
}

impl GasModel {
    /// Build a model from a caller-supplied stopping-power table
    /// (1-keV spacing, MeV/m). The beam-energy table starts out flat at
    /// zero; attach one with [`with_beam_table`](Self::with_beam_table) or
    /// [`with_beam_profile`](Self::with_beam_profile).
    pub fn from_eloss_table(eloss: Vec<f64>) -> Result<Self, TrackingError> {
        if eloss.len() < 2 {
            return Err(TrackingError::InvalidArgument(format!(
                "stopping power table needs at least 2 entries, got {}",
                eloss.len()
            )));
        }
        if eloss.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(TrackingError::InvalidArgument(
                "stopping power table contains negative or non-finite entries".into(),
            ));
        }
        Ok(Self {
            eloss,
            en_vs_z: vec![0.0; BEAM_TABLE_MM + 1],
        })
    }

    /// Tabulate a stopping-power function `en_mev -> MeV/m` on the 1-keV
    /// grid up to `max_en_mev`.
    ///
    /// The entry at index 0 is evaluated at half a keV so fit functions with
    /// a pole at zero energy produce a finite table.
    pub fn from_energy_loss<F>(f: F, max_en_mev: f64) -> Result<Self, TrackingError>
    where
        F: Fn(f64) -> f64,
    {
        if !(max_en_mev > 0.0) {
            return Err(TrackingError::InvalidArgument(format!(
                "max table energy must be positive, got {max_en_mev}"
            )));
        }
        let n = (max_en_mev * 1000.0) as usize;
        let eloss = (0..=n)
            .map(|i| {
                let en = if i == 0 { 0.5e-3 } else { i as f64 * 1.0e-3 };
                f(en).max(0.0)
            })
            .collect();
        Self::from_eloss_table(eloss)
    }

    /// Attach a caller-supplied beam-energy table (1-mm spacing from the
    /// entrance, MeV). The table must be monotonically non-increasing.
    pub fn with_beam_table(mut self, en_vs_z: Vec<f64>) -> Result<Self, TrackingError> {
        if en_vs_z.len() < 2 {
            return Err(TrackingError::InvalidArgument(format!(
                "beam energy table needs at least 2 entries, got {}",
                en_vs_z.len()
            )));
        }
        if en_vs_z.windows(2).any(|w| w[1] > w[0]) {
            return Err(TrackingError::InvalidArgument(
                "beam energy table must be non-increasing with penetration".into(),
            ));
        }
        self.en_vs_z = en_vs_z;
        Ok(self)
    }

    /// Derive the beam-energy table by stepping an `en_mev -> MeV/m`
    /// stopping-power function for the beam species from the entrance
    /// energy, in 0.1-mm substeps.
    #[must_use]
    pub fn with_beam_profile<F>(mut self, beam_stopping: F, entrance_energy: f64) -> Self
    where
        F: Fn(f64) -> f64,
    {
        let mut table = Vec::with_capacity(BEAM_TABLE_MM + 1);
        let mut en = entrance_energy.max(0.0);
        table.push(en);
        for _ in 0..BEAM_TABLE_MM {
            for _ in 0..10 {
                if en <= 0.0 {
                    en = 0.0;
                    break;
                }
                en = (en - beam_stopping(en) * 1.0e-4).max(0.0);
            }
            table.push(en);
        }
        self.en_vs_z = table;
        self
    }

    /// Stopping power for the tracked species at kinetic energy `en_mev`,
    /// in MeV/m. Linear interpolation on the 1-keV grid; energies outside
    /// the table clamp to the nearest endpoint.
    #[must_use]
    pub fn stopping_power(&self, en_mev: f64) -> f64 {
        lerp_table(&self.eloss, en_mev * 1000.0)
    }

    /// Residual beam kinetic energy at height `z_m` (m), in MeV.
    ///
    /// The beam enters at z = 1 m moving in −z, so the penetration depth in
    /// mm is `(1 − z) · 1000`; out-of-range depths clamp.
    #[must_use]
    pub fn beam_energy_at(&self, z_m: f64) -> f64 {
        lerp_table(&self.en_vs_z, (1.0 - z_m) * 1000.0)
    }
}

/// Clamped linear interpolation of `table` at fractional index `x`.
fn lerp_table(table: &[f64], x: f64) -> f64 {
    if x <= 0.0 {
        return table[0];
    }
    let last = table.len() - 1;
    if x >= last as f64 {
        return table[last];
    }
    let i = x as usize;
    let frac = x - i as f64;
    table[i] * (1.0 - frac) + table[i + 1] * frac
}

/// A gas described by bulk properties, used to derive stopping power from
/// the Bethe formula or from the bundled empirical fits.
#[derive(Clone, Copy, Debug)]
pub struct GasMixture {
    /// Molar mass, g/mol.
    pub molar_mass: f64,
    /// Electrons per molecule (total Z).
    pub num_electrons: f64,
    /// Mean excitation potential, eV.
    pub mean_exc_pot: f64,
    /// Pressure, torr.
    pub pressure: f64,
}

impl GasMixture {
    /// Pure helium-4 at the given pressure (torr).
    #[must_use]
    pub fn helium(pressure: f64) -> Self {
        Self {
            molar_mass: 4.0,
            num_electrons: 2.0,
            mean_exc_pot: 41.8,
            pressure,
        }
    }

    /// He/CO₂ 90:10 at the given pressure (torr).
    ///
    /// The electron density properties inherited from the bulk description
    /// are approximate for this mixture; the empirical fit
    /// [`heco2_energy_loss`](Self::heco2_energy_loss) should be preferred
    /// over [`bethe_energy_loss`](Self::bethe_energy_loss).
    #[must_use]
    pub fn heco2(pressure: f64) -> Self {
        Self {
            molar_mass: 4.002 * 0.9 + 44.01 * 0.1,
            num_electrons: 2.0,
            mean_exc_pot: 41.8,
            pressure,
        }
    }

    /// Mass density, g/cm³.
    #[must_use]
    pub fn density(&self) -> f64 {
        self.pressure / 760.0 * self.molar_mass / 24040.0
    }

    /// Electron density, m⁻³.
    #[must_use]
    pub fn electron_density_per_m3(&self) -> f64 {
        N_AVO * self.num_electrons * self.density() / self.molar_mass * 1.0e6
    }

    /// Stopping power from the Bethe formula for a projectile with mass
    /// number `proj_mass` and charge number `proj_charge` at kinetic energy
    /// `en_mev`, in MeV/m.
    #[must_use]
    pub fn bethe_energy_loss(&self, en_mev: f64, proj_mass: u32, proj_charge: u32) -> f64 {
        let b = beta(en_mev, f64::from(proj_mass) * P_MC2);
        bethe(
            b,
            proj_charge,
            self.electron_density_per_m3(),
            self.mean_exc_pot,
        )
    }

    /// Empirical stopping power for projectiles in pure helium, MeV/m.
    ///
    /// Fits for protons and alphas; the alpha fit is only good down to
    /// about 10 keV kinetic energy.
    pub fn helium_energy_loss(
        &self,
        en_mev: f64,
        proj_mass: u32,
        proj_charge: u32,
    ) -> Result<f64, TrackingError> {
        let fit = match (proj_mass, proj_charge) {
            (1, 1) => {
                6.5 * en_mev.powf(-0.83) / (20.0 + 1.6 / en_mev.powf(1.3))
                    + 0.2 * (-30.0 * (en_mev - 0.1).powi(2)).exp()
            }
            (4, 2) => {
                10.0 * en_mev.powf(-0.83) / (2.5 + 1.6 / en_mev.sqrt())
                    + 0.05 * (-(en_mev - 0.5).powi(2)).exp()
            }
            _ => {
                return Err(TrackingError::InvalidArgument(format!(
                    "no helium fit for projectile A={proj_mass}, Z={proj_charge}"
                )))
            }
        };
        // fit is in MeV/(mg/cm^2)
        Ok(fit * 1000.0 * self.density() * 100.0)
    }

    /// Empirical stopping power for alphas in He/CO₂ 90:10, MeV/m.
    ///
    /// Fit to ASTAR data; only alphas are supported.
    pub fn heco2_energy_loss(
        &self,
        en_mev: f64,
        proj_mass: u32,
        proj_charge: u32,
    ) -> Result<f64, TrackingError> {
        if (proj_mass, proj_charge) != (4, 2) {
            return Err(TrackingError::InvalidArgument(format!(
                "no He/CO2 fit for projectile A={proj_mass}, Z={proj_charge}"
            )));
        }
        const A: f64 = 3.969_523_85e2;
        const B: f64 = 9.333_648_32e-1;
        const C: f64 = 9.591_372_01e-2;
        const D: f64 = 8.822_622_74e-2;
        const E: f64 = 1.515_012_28;
        const F: f64 = -1.822_053_50e3;
        const G: f64 = 9.939_112_92e3;
        const H: f64 = -1.817_476_43e-1;
        let fit = A * en_mev.powf(-B) / (C + D * en_mev.powf(-E))
            + F * (-G * (en_mev - H).powi(2)).exp();
        // fit is in MeV/(g/cm^2)
        Ok(fit * self.density() * 100.0)
    }
}

/// Bethe stopping power.
///
/// `b` is the projectile's Lorentz beta, `z` its charge number, `ne` the
/// gas electron density in m⁻³, and `exc_en` the mean excitation potential
/// in eV. Returns MeV/m. A stopped particle (beta = 0) yields +∞ and a
/// fully relativistic one (beta = 1) yields 0, matching the limiting
/// behavior of the formula's source.
#[must_use]
pub fn bethe(b: f64, z: u32, ne: f64, exc_en: f64) -> f64 {
    let exc_en_mev = exc_en * 1.0e-6;
    let beta_sq = b * b;

    if beta_sq == 0.0 {
        return f64::INFINITY;
    }
    if beta_sq >= 1.0 {
        return 0.0;
    }

    let zf = f64::from(z);
    let frnt = ne * zf * zf * E_CHG.powi(4)
        / (E_MC2 * MEV_TO_KG * C_LGT * C_LGT * beta_sq * 4.0 * PI * EPS_0 * EPS_0);
    let lnt = (2.0 * E_MC2 * beta_sq / (exc_en_mev * (1.0 - beta_sq))).ln();
    // frnt * (lnt - beta_sq) is in J/m
    frnt * (lnt - beta_sq) / E_CHG * 1.0e-6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolation_and_clamping() {
        let gas = GasModel::from_eloss_table(vec![0.0, 1.0, 2.0, 3.0]).unwrap();
        // exact grid points (keV)
        assert_eq!(gas.stopping_power(0.001), 1.0);
        assert_eq!(gas.stopping_power(0.003), 3.0);
        // midpoint
        assert!((gas.stopping_power(0.0015) - 1.5).abs() < 1e-12);
        // clamps
        assert_eq!(gas.stopping_power(-1.0), 0.0);
        assert_eq!(gas.stopping_power(10.0), 3.0);
    }

    #[test]
    fn test_rejects_bad_tables() {
        assert!(GasModel::from_eloss_table(vec![1.0]).is_err());
        assert!(GasModel::from_eloss_table(vec![1.0, -2.0]).is_err());
        assert!(GasModel::from_eloss_table(vec![1.0, f64::NAN]).is_err());

        let gas = GasModel::from_eloss_table(vec![1.0, 1.0]).unwrap();
        assert!(gas.with_beam_table(vec![1.0, 2.0]).is_err());
    }

    #[test]
    fn test_beam_profile_monotone() {
        let mix = GasMixture::heco2(150.0);
        let gas = GasModel::from_eloss_table(vec![1.0, 1.0])
            .unwrap()
            .with_beam_profile(|en| mix.heco2_energy_loss(en, 4, 2).unwrap(), 12.0);
        let mut prev = f64::INFINITY;
        for z_mm in 0..=1000 {
            let en = gas.beam_energy_at(1.0 - z_mm as f64 * 1e-3);
            assert!(en <= prev + 1e-12);
            prev = en;
        }
        // entrance value is the configured beam energy
        assert!((gas.beam_energy_at(1.0) - 12.0).abs() < 1e-12);
        // the beam loses a few MeV over the first half meter at 150 torr
        assert!(gas.beam_energy_at(0.5) < 11.0);
    }

    #[test]
    fn test_heco2_fit_reference_values() {
        let mix = GasMixture::heco2(150.0);
        let d12 = mix.heco2_energy_loss(12.0, 4, 2).unwrap();
        let d4 = mix.heco2_energy_loss(4.0, 4, 2).unwrap();
        assert!((d12 - 2.6183).abs() < 1e-3);
        assert!((d4 - 6.7013).abs() < 1e-3);
        assert!(mix.heco2_energy_loss(1.0, 1, 1).is_err());
    }

    #[test]
    fn test_helium_fit_reference_values() {
        let mix = GasMixture::helium(200.0);
        let alpha = mix.helium_energy_loss(2.0, 4, 2).unwrap();
        let proton = mix.helium_energy_loss(1.0, 1, 1).unwrap();
        assert!((alpha - 6.8060).abs() < 1e-3);
        assert!((proton - 1.3177).abs() < 1e-3);
        assert!(mix.helium_energy_loss(1.0, 12, 6).is_err());
    }

    #[test]
    fn test_bethe_limits_and_scale() {
        let mix = GasMixture::helium(760.0);
        let ne = mix.electron_density_per_m3();
        assert!(bethe(0.0, 1, ne, 41.8).is_infinite());
        assert_eq!(bethe(1.0, 1, ne, 41.8), 0.0);
        // 10 MeV proton in helium at 760 torr
        let b = crate::constants::beta(10.0, P_MC2);
        let dedx = bethe(b, 1, ne, 41.8);
        assert!((dedx - 0.7599).abs() < 1e-3);
    }

    #[test]
    fn test_from_energy_loss_handles_pole() {
        let mix = GasMixture::heco2(150.0);
        let gas =
            GasModel::from_energy_loss(|en| mix.heco2_energy_loss(en, 4, 2).unwrap(), 15.0)
                .unwrap();
        assert!(gas.stopping_power(0.0).is_finite());
        assert!(gas.stopping_power(0.0005) > gas.stopping_power(12.0));
    }
}
