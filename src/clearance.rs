//! Whole-organ clearance from in-vitro intrinsic clearance

use std::fmt;
use std::str::FromStr;

use log::info;
use serde::{Deserialize, Serialize};

use crate::data::physiology::{PhysiologyProfile, Tissue};
use crate::PbtkError;

/// Axial dispersion number of the dispersion liver model
pub const DISPERSION_NUMBER: f64 = 0.17;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HepaticModel {
    #[default]
    WellStirred,
    ParallelTube,
    Dispersion,
}

impl fmt::Display for HepaticModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HepaticModel::WellStirred => write!(f, "well-stirred"),
            HepaticModel::ParallelTube => write!(f, "parallel tube"),
            HepaticModel::Dispersion => write!(f, "dispersion"),
        }
    }
}

impl FromStr for HepaticModel {
    type Err = PbtkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['_', '-', '.'], " ").as_str() {
            "well stirred" => Ok(HepaticModel::WellStirred),
            "parallel tube" => Ok(HepaticModel::ParallelTube),
            "dispersion" => Ok(HepaticModel::Dispersion),
            other => Err(PbtkError::domain(format!("unknown liver model '{}'", other))),
        }
    }
}

impl HepaticModel {
    /// Extraction ratio for a blood clearance : blood flow ratio
    pub fn extraction(&self, ratio: f64) -> f64 {
        match self {
            HepaticModel::WellStirred => ratio / (1.0 + ratio),
            HepaticModel::ParallelTube => 1.0 - (-ratio).exp(),
            HepaticModel::Dispersion => {
                let dn = DISPERSION_NUMBER;
                let a = (1.0 + 4.0 * dn * ratio).sqrt();
                let denominator = (1.0 + a).powi(2) * ((a - 1.0) / (2.0 * dn)).exp()
                    - (1.0 - a).powi(2) * (-(a + 1.0) / (2.0 * dn)).exp();
                1.0 - 4.0 * a / denominator
            }
        }
    }
}

/// Scale Clint (uL/min/10^6 hepatocytes) to whole-liver clearance (L/h/kg BW)
pub fn scale_clint(clint: f64, physiology: &PhysiologyProfile) -> Result<f64, PbtkError> {
    let liver_volume = physiology.tissue(Tissue::Liver)?.volume;
    Ok(clint
        * 1e-6
        * 60.0
        * physiology.hepatocellularity
        * physiology.liver_density
        * 1000.0
        * liver_volume)
}

/// Clint whose p-value exceeds `threshold` is indistinguishable from no metabolism
pub fn significant_clint(clint: f64, pvalue: Option<f64>, threshold: f64) -> f64 {
    match pvalue {
        Some(p) if p > threshold => {
            info!(
                "Clint {} has p-value {} above {}, treating as not metabolized",
                clint, p, threshold
            );
            0.0
        }
        _ => clint,
    }
}

/// Renal clearance by glomerular filtration of the unbound fraction
pub fn renal_clearance(gfr: f64, fup: f64) -> f64 {
    gfr * fup
}

/// Inputs of the liver models. Rates in L/h/kg BW.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HepaticClearanceInputs {
    /// Liver blood flow
    pub q_liver: f64,
    pub fup: f64,
    /// Scaled intrinsic clearance
    pub clint_scaled: f64,
    /// Pass 1 to disable the blood : plasma correction
    pub rblood2plasma: f64,
    pub restrictive: bool,
    pub model: HepaticModel,
}

impl HepaticClearanceInputs {
    fn blood_clearance(&self) -> Result<f64, PbtkError> {
        if self.q_liver.is_nan() || self.q_liver <= 0.0 {
            return Err(PbtkError::domain(format!(
                "liver blood flow must be positive, got {}",
                self.q_liver
            )));
        }
        if self.rblood2plasma.is_nan() || self.rblood2plasma <= 0.0 {
            return Err(PbtkError::domain(format!(
                "Rblood2plasma must be positive, got {}",
                self.rblood2plasma
            )));
        }
        let fu = if self.restrictive { self.fup } else { 1.0 };
        Ok(fu * self.clint_scaled / self.rblood2plasma)
    }

    pub fn extraction(&self) -> Result<f64, PbtkError> {
        let cl_b = self.blood_clearance()?;
        Ok(self.model.extraction(cl_b / self.q_liver))
    }

    /// Hepatic clearance referenced to plasma concentration
    pub fn clearance(&self) -> Result<f64, PbtkError> {
        Ok(self.rblood2plasma * self.q_liver * self.extraction()?)
    }

    /// Fraction escaping first-pass hepatic extraction
    pub fn bioavailability(&self) -> Result<f64, PbtkError> {
        Ok(1.0 - self.extraction()?)
    }
}

/// Hepatic clearance (L/h/kg BW, plasma referenced)
pub fn calc_hepatic_clearance(inputs: &HepaticClearanceInputs) -> Result<f64, PbtkError> {
    inputs.clearance()
}

pub fn calc_hepatic_bioavailability(inputs: &HepaticClearanceInputs) -> Result<f64, PbtkError> {
    inputs.bioavailability()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::physiology::Species;
    use approx::assert_relative_eq;

    fn inputs(restrictive: bool, model: HepaticModel) -> HepaticClearanceInputs {
        HepaticClearanceInputs {
            q_liver: 1.2,
            fup: 0.2,
            clint_scaled: 3.0,
            rblood2plasma: 0.9,
            restrictive,
            model,
        }
    }

    #[test]
    fn well_stirred_matches_closed_form() {
        let i = inputs(true, HepaticModel::WellStirred);
        let expected = i.q_liver * i.fup * i.clint_scaled
            / (i.q_liver + i.fup * i.clint_scaled / i.rblood2plasma);
        assert_relative_eq!(i.clearance().unwrap(), expected, epsilon = 1e-12);
        assert_relative_eq!(
            i.bioavailability().unwrap(),
            i.q_liver / (i.q_liver + i.fup * i.clint_scaled / i.rblood2plasma),
            epsilon = 1e-12
        );
    }

    #[test]
    fn without_blood_correction_rblood2plasma_is_one() {
        let mut i = inputs(true, HepaticModel::WellStirred);
        i.rblood2plasma = 1.0;
        let expected =
            i.q_liver * i.fup * i.clint_scaled / (i.q_liver + i.fup * i.clint_scaled);
        assert_relative_eq!(i.clearance().unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn non_restrictive_clearance_is_never_lower() {
        for model in [
            HepaticModel::WellStirred,
            HepaticModel::ParallelTube,
            HepaticModel::Dispersion,
        ] {
            for fup in [0.001, 0.05, 0.5, 0.99] {
                let mut r = inputs(true, model);
                r.fup = fup;
                let mut n = r;
                n.restrictive = false;
                assert!(n.clearance().unwrap() >= r.clearance().unwrap());
            }
        }
    }

    #[test]
    fn liver_models_are_ordered() {
        // For the same clearance ratio: well-stirred <= dispersion <= parallel tube
        for ratio in [0.1, 1.0, 5.0] {
            let ws = HepaticModel::WellStirred.extraction(ratio);
            let d = HepaticModel::Dispersion.extraction(ratio);
            let pt = HepaticModel::ParallelTube.extraction(ratio);
            assert!(ws <= d + 1e-12 && d <= pt + 1e-12, "{} {} {}", ws, d, pt);
        }
        assert_relative_eq!(HepaticModel::Dispersion.extraction(0.0), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn high_pvalue_clint_is_zero() {
        assert_eq!(significant_clint(10.0, Some(0.2), 0.05), 0.0);
        assert_eq!(significant_clint(10.0, Some(0.01), 0.05), 10.0);
        assert_eq!(significant_clint(10.0, None, 0.05), 10.0);
    }

    #[test]
    fn clint_scaling_uses_liver_physiology() {
        let human = PhysiologyProfile::reference(Species::Human).unwrap();
        let scaled = scale_clint(1.0, &human).unwrap();
        let expected = 1e-6 * 60.0 * 110.0 * 1.05 * 1000.0 * 0.0245;
        assert_relative_eq!(scaled, expected, epsilon = 1e-12);
    }

    #[test]
    fn zero_liver_flow_is_rejected() {
        let mut i = inputs(true, HepaticModel::WellStirred);
        i.q_liver = 0.0;
        assert!(matches!(i.clearance(), Err(PbtkError::Domain(_))));
    }
}
