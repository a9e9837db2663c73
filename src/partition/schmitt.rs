//! Schmitt (2008) tissue-composition partitioning

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::chemical::ChemicalProperties;
use crate::data::physiology::{PhysiologyProfile, Tissue, TissueComposition};
use crate::error::Warnings;
use crate::partition::ionization::{calc_dow, calc_ionization, is_base};
use crate::PbtkError;

/// Upper bound applied to the octanol:water partition coefficient
pub const MAX_POW: f64 = 1e6;

/// Interstitial protein as a fraction of plasma protein
const INTERSTITIAL_PROTEIN_RATIO: f64 = 0.37;

/// Cap Pow at [MAX_POW]. NaN is passed through unchanged.
pub fn truncate_pow(pow: f64, warnings: &mut Warnings) -> f64 {
    if pow > MAX_POW {
        warnings.clamp("Pow", pow, MAX_POW, "octanol:water partition above 1e6");
        MAX_POW
    } else {
        pow
    }
}

/// Membrane affinity, driving acidic phospholipid and protein binding
pub fn membrane_affinity(pow: f64) -> f64 {
    10f64.powf(1.294 + 0.304 * pow.log10())
}

/// Neutral phospholipids partition like 30 % lipid and 70 % water
pub fn neutral_phospholipid_affinity(pow: f64) -> f64 {
    0.3 * pow + 0.7
}

/// Chemical inputs of the partitioning model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchmittInputs {
    /// Truncated octanol:water partition coefficient
    pub pow: f64,
    pub pka_donor: Vec<f64>,
    pub pka_accept: Vec<f64>,
}

impl SchmittInputs {
    pub fn new(pow: f64, pka_donor: Vec<f64>, pka_accept: Vec<f64>) -> Self {
        Self {
            pow,
            pka_donor,
            pka_accept,
        }
    }

    /// Build from a property record; logP and both pKa lists must be present
    pub fn from_properties(
        properties: &ChemicalProperties,
        warnings: &mut Warnings,
    ) -> Result<Self, PbtkError> {
        let log_p = properties.require_log_p()?;
        let (donor, accept) = properties.require_pka()?;
        Ok(Self {
            pow: truncate_pow(10f64.powf(log_p), warnings),
            pka_donor: donor.to_vec(),
            pka_accept: accept.to_vec(),
        })
    }

    pub fn dow(&self, ph: f64) -> f64 {
        calc_dow(self.pow, ph, &self.pka_donor, &self.pka_accept)
    }
}

/// Tissue : unbound plasma concentration ratio of one tissue
pub fn tissue_to_unbound_plasma(
    inputs: &SchmittInputs,
    tissue: &TissueComposition,
    physiology: &PhysiologyProfile,
) -> f64 {
    let plasma = &physiology.plasma;
    let cell = calc_ionization(tissue.ph, &inputs.pka_donor, &inputs.pka_accept);
    let at_plasma = calc_ionization(plasma.ph, &inputs.pka_donor, &inputs.pka_accept);

    let neutral_lipid = if is_base(tissue.ph, &inputs.pka_donor, &inputs.pka_accept) {
        inputs.pow
    } else {
        inputs.dow(tissue.ph)
    };
    let neutral_phospholipid = neutral_phospholipid_affinity(inputs.pow);
    let membrane = membrane_affinity(inputs.pow);
    let acidic_phospholipid =
        membrane * (cell.neutral + 20.0 * cell.positive + 0.05 * cell.negative);
    let protein = 0.163 + 0.0221 * membrane;

    let trapping = at_plasma.neutral / cell.neutral;
    let k_cell = (tissue.water
        + neutral_lipid * tissue.neutral_lipid
        + neutral_phospholipid * tissue.neutral_phospholipid
        + acidic_phospholipid * tissue.acidic_phospholipid
        + protein * tissue.protein)
        * trapping;

    let k_interstitial =
        plasma.water + protein * INTERSTITIAL_PROTEIN_RATIO * plasma.protein;

    tissue.interstitial * k_interstitial + (1.0 - tissue.interstitial) * k_cell
}

/// Tissue : unbound plasma partition coefficients, keyed by tissue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartitionCoefficientSet(BTreeMap<Tissue, f64>);

impl PartitionCoefficientSet {
    pub fn get(&self, tissue: Tissue) -> Option<f64> {
        self.0.get(&tissue).copied()
    }

    pub fn insert(&mut self, tissue: Tissue, value: f64) {
        self.0.insert(tissue, value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Tissue, &f64)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Volume weighted coefficient of a group of tissues
    pub fn lump(&self, tissues: &[Tissue], physiology: &PhysiologyProfile) -> Result<f64, PbtkError> {
        let mut volume = 0.0;
        let mut weighted = 0.0;
        for &tissue in tissues {
            let v = physiology.tissue(tissue)?.volume;
            let k = self.get(tissue).ok_or_else(|| {
                PbtkError::missing(format!("K{}2pu", tissue.name()), "partition coefficient")
            })?;
            volume += v;
            weighted += v * k;
        }
        if volume <= 0.0 {
            return Err(PbtkError::domain("lumped tissues have no volume"));
        }
        Ok(weighted / volume)
    }
}

/// Predict Kt2pu for every organ and for red blood cells
pub fn predict_partitioning_schmitt(
    inputs: &SchmittInputs,
    physiology: &PhysiologyProfile,
) -> Result<PartitionCoefficientSet, PbtkError> {
    let mut set = PartitionCoefficientSet::default();
    for tissue in Tissue::ORGANS
        .iter()
        .chain(std::iter::once(&Tissue::RedBloodCells))
    {
        let composition = physiology.composition(*tissue)?;
        set.insert(
            *tissue,
            tissue_to_unbound_plasma(inputs, &composition, physiology),
        );
    }
    Ok(set)
}

/// Blood : plasma concentration ratio from the red blood cell partition coefficient
pub fn calc_rblood2plasma(hematocrit: f64, krbc2pu: f64, fup: f64) -> f64 {
    if hematocrit == 0.0 {
        return 1.0;
    }
    1.0 - hematocrit + hematocrit * krbc2pu * fup
}
