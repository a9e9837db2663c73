//! Units at the crate boundary
//!
//! Internally amounts are in µmol, concentrations in µM (µmol/L), time in hours and
//! doses in µmol (absolute) or mg/kg BW where a per-weight rate is required. The
//! functions here are the only place where caller units are converted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::PbtkError;

/// Molar volume of an ideal gas at 25 °C and 1 atm (L/mol)
pub const MOLAR_VOLUME: f64 = 24.45;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AmountUnit {
    #[default]
    Umol,
    Mg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConcentrationUnit {
    #[default]
    Um,
    MgPerL,
    /// Parts per million by volume, for air
    Ppmv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DoseUnit {
    #[default]
    MgPerKg,
    Mg,
    Umol,
}

impl fmt::Display for AmountUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmountUnit::Umol => write!(f, "umol"),
            AmountUnit::Mg => write!(f, "mg"),
        }
    }
}

impl fmt::Display for ConcentrationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConcentrationUnit::Um => write!(f, "uM"),
            ConcentrationUnit::MgPerL => write!(f, "mg/L"),
            ConcentrationUnit::Ppmv => write!(f, "ppmv"),
        }
    }
}

impl fmt::Display for DoseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DoseUnit::MgPerKg => write!(f, "mg/kg"),
            DoseUnit::Mg => write!(f, "mg"),
            DoseUnit::Umol => write!(f, "umol"),
        }
    }
}

impl FromStr for ConcentrationUnit {
    type Err = PbtkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "um" | "µm" | "umol/l" => Ok(ConcentrationUnit::Um),
            "mg/l" => Ok(ConcentrationUnit::MgPerL),
            "ppmv" | "ppm" => Ok(ConcentrationUnit::Ppmv),
            other => Err(PbtkError::domain(format!(
                "unknown concentration unit '{}'",
                other
            ))),
        }
    }
}

impl FromStr for DoseUnit {
    type Err = PbtkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mg/kg" => Ok(DoseUnit::MgPerKg),
            "mg" => Ok(DoseUnit::Mg),
            "umol" | "µmol" => Ok(DoseUnit::Umol),
            other => Err(PbtkError::domain(format!("unknown dose unit '{}'", other))),
        }
    }
}

fn check_molecular_weight(mw: f64) -> Result<(), PbtkError> {
    if mw.is_finite() && mw > 0.0 {
        Ok(())
    } else {
        Err(PbtkError::domain(format!(
            "molecular weight must be positive, got {}",
            mw
        )))
    }
}

/// Convert a dose to µmol for a body of `body_weight` kg
pub fn dose_to_umol(dose: f64, unit: DoseUnit, mw: f64, body_weight: f64) -> Result<f64, PbtkError> {
    match unit {
        DoseUnit::Umol => Ok(dose),
        DoseUnit::Mg => {
            check_molecular_weight(mw)?;
            Ok(dose * 1000.0 / mw)
        }
        DoseUnit::MgPerKg => {
            check_molecular_weight(mw)?;
            Ok(dose * body_weight * 1000.0 / mw)
        }
    }
}

/// Convert an amount in µmol to the requested unit
pub fn amount_from_umol(amount: f64, unit: AmountUnit, mw: f64) -> Result<f64, PbtkError> {
    match unit {
        AmountUnit::Umol => Ok(amount),
        AmountUnit::Mg => {
            check_molecular_weight(mw)?;
            Ok(amount * mw / 1000.0)
        }
    }
}

pub fn amount_to_umol(amount: f64, unit: AmountUnit, mw: f64) -> Result<f64, PbtkError> {
    match unit {
        AmountUnit::Umol => Ok(amount),
        AmountUnit::Mg => {
            check_molecular_weight(mw)?;
            Ok(amount * 1000.0 / mw)
        }
    }
}

/// Convert a µM concentration to the requested unit.
///
/// ppmv is only meaningful for air; for the gas phase 1 µM corresponds to
/// `MOLAR_VOLUME` ppmv.
pub fn concentration_from_um(conc: f64, unit: ConcentrationUnit, mw: f64) -> Result<f64, PbtkError> {
    match unit {
        ConcentrationUnit::Um => Ok(conc),
        ConcentrationUnit::MgPerL => {
            check_molecular_weight(mw)?;
            Ok(conc * mw / 1000.0)
        }
        ConcentrationUnit::Ppmv => Ok(conc * MOLAR_VOLUME),
    }
}

pub fn concentration_to_um(conc: f64, unit: ConcentrationUnit, mw: f64) -> Result<f64, PbtkError> {
    match unit {
        ConcentrationUnit::Um => Ok(conc),
        ConcentrationUnit::MgPerL => {
            check_molecular_weight(mw)?;
            Ok(conc * 1000.0 / mw)
        }
        ConcentrationUnit::Ppmv => Ok(conc / MOLAR_VOLUME),
    }
}

/// Convert between two concentration units
pub fn convert_concentration(
    conc: f64,
    from: ConcentrationUnit,
    to: ConcentrationUnit,
    mw: f64,
) -> Result<f64, PbtkError> {
    if from == to {
        return Ok(conc);
    }
    concentration_from_um(concentration_to_um(conc, from, mw)?, to, mw)
}
