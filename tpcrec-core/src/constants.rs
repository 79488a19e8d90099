//! Physical constants (CODATA 2010)

/// Speed of light, m/s.
pub const C_LGT: f64 = 299_792_458.0;

/// Elementary charge, C.
pub const E_CHG: f64 = 1.602_176_565e-19;

/// Proton rest energy, MeV/c².
pub const P_MC2: f64 = 938.272_046;

/// Electron rest energy, MeV/c².
pub const E_MC2: f64 = 0.510_998_928;

/// Avogadro's number, mol⁻¹.
pub const N_AVO: f64 = 6.022_141_29e23;

/// Vacuum permittivity, F/m.
pub const EPS_0: f64 = 8.854_187_817e-12;

/// Conversion factor MeV → J.
pub const MEV_TO_J: f64 = 1.0e6 * E_CHG;

/// Conversion factor MeV/c² → kg.
pub const MEV_TO_KG: f64 = MEV_TO_J / (C_LGT * C_LGT);

/// Lorentz beta of a particle with kinetic energy `en` (MeV) and rest
/// energy `mass` (MeV/c²).
#[must_use]
pub fn beta(en: f64, mass: f64) -> f64 {
    let gamma = (en + mass) / mass;
    (1.0 - 1.0 / (gamma * gamma)).max(0.0).sqrt()
}
