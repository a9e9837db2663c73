//! In-vitro binding corrections
//!
//! Hepatocyte incubation binding (Kilford 2008) and the plasma lipid correction of
//! the measured unbound fraction (Pearce 2017).

use crate::data::physiology::PlasmaComposition;
use crate::error::Warnings;
use crate::partition::MAX_POW;
use crate::PbtkError;

/// Default cell volume fraction of a hepatocyte incubation
pub const DEFAULT_VR: f64 = 0.005;

/// Fraction unbound in a hepatocyte incubation.
///
/// `log_pd` is log10 Pow for bases and log10 Dow at pH 7.4 otherwise. Any result
/// outside `[0, 1]` is replaced by 1 and recorded in `warnings`; the value is never
/// pushed down to 0.
pub fn calc_fu_hep(log_pd: f64, vr: f64, warnings: &mut Warnings) -> f64 {
    let exponent = 0.072 * log_pd.powi(2) + 0.067 * log_pd - 1.126;
    let fu_hep = 1.0 / (1.0 + 125.0 * vr * 10f64.powf(exponent));
    if fu_hep.is_nan() || (0.0..=1.0).contains(&fu_hep) {
        fu_hep
    } else {
        warnings.clamp("fu_hep", fu_hep, 1.0, "incubation binding outside [0, 1]");
        1.0
    }
}

/// Neutral lipid plus 30 % of phospholipid, as volume fraction of plasma
pub fn plasma_lipid_fraction(plasma: &PlasmaComposition) -> f64 {
    plasma.neutral_lipid + 0.3 * plasma.phospholipid
}

/// Ratio of lipid-corrected to measured fraction unbound in plasma.
///
/// `fup_corrected = 1 / (Dow74 F_lipid + 1 / fup)`, with Dow74 capped at 1e6.
pub fn calc_fup_correction(fup: f64, dow74: f64, lipid_fraction: f64) -> Result<f64, PbtkError> {
    if fup.is_nan() || fup <= 0.0 {
        return Err(PbtkError::domain(format!(
            "fup correction requires a positive fraction unbound, got {}",
            fup
        )));
    }
    let dow74 = dow74.min(MAX_POW);
    let corrected = 1.0 / (dow74 * lipid_fraction + 1.0 / fup);
    Ok(corrected / fup)
}
