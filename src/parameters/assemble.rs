//! Shared parameterization pipeline
//!
//! Order matters: Pow is truncated before anything uses it, the fup floor is
//! applied after the lipid correction, and the blood : plasma ratio is computed
//! from the floored fup.

use std::collections::BTreeMap;

use log::debug;

use crate::binding::{calc_fu_hep, calc_fup_correction, plasma_lipid_fraction};
use crate::clearance::{renal_clearance, scale_clint, significant_clint, HepaticClearanceInputs};
use crate::data::chemical::ChemicalProperties;
use crate::data::physiology::{PhysiologyProfile, Species, Tissue};
use crate::error::Warnings;
use crate::parameters::{Param, ParameterizeOptions};
use crate::partition::{
    calc_rblood2plasma, is_base, predict_partitioning_schmitt, PartitionCoefficientSet,
    SchmittInputs,
};
use crate::PbtkError;

const PLASMA_PH: f64 = 7.4;

/// Tissues lumped into the rest-of-body compartment of the PBTK models
pub const REST_OF_BODY: [Tissue; 7] = [
    Tissue::Adipose,
    Tissue::Bone,
    Tissue::Brain,
    Tissue::Heart,
    Tissue::Muscle,
    Tissue::Skin,
    Tissue::Spleen,
];

/// Everything derived from one chemical and one physiology
#[derive(Debug, Clone)]
pub struct Assembly {
    pub body_weight: f64,
    pub molecular_weight: f64,
    pub schmitt: SchmittInputs,
    pub dow74: f64,
    pub fup_invitro: f64,
    pub fup_adjustment: f64,
    pub fup: f64,
    pub partition: PartitionCoefficientSet,
    pub rblood2plasma: f64,
    pub clint: f64,
    pub fu_hep: f64,
    /// Binding-corrected Clint scaled to the whole liver (L/h/kg)
    pub clint_scaled: f64,
    /// Total liver blood flow (L/h/kg)
    pub q_liver: f64,
    /// L/h/kg
    pub gfr: f64,
    pub hepatic_clearance: f64,
    pub hepatic_bioavailability: f64,
    pub vdist: f64,
    pub kelim: f64,
    pub restrictive: bool,
    pub warnings: Warnings,
}

impl Assembly {
    pub fn build(
        properties: &ChemicalProperties,
        physiology: &PhysiologyProfile,
        options: &ParameterizeOptions,
    ) -> Result<Self, PbtkError> {
        let mut warnings = Warnings::new();
        let molecular_weight = properties.require_molecular_weight()?;
        let schmitt = SchmittInputs::from_properties(properties, &mut warnings)?;
        let fup_invitro = properties.require_funbound_plasma()?;
        if fup_invitro.is_nan() || fup_invitro <= 0.0 {
            return Err(PbtkError::domain(format!(
                "Funbound.plasma of {} must be positive, got {}",
                properties.identity, fup_invitro
            )));
        }

        let dow74 = schmitt.dow(PLASMA_PH);
        let fup_adjustment = if options.adjusted_funbound_plasma {
            let plasma = if options.force_human_fup || properties.substituted_from_human {
                PhysiologyProfile::reference(Species::Human)?.plasma
            } else {
                physiology.plasma
            };
            calc_fup_correction(fup_invitro, dow74, plasma_lipid_fraction(&plasma))?
        } else {
            1.0
        };

        let mut fup = fup_invitro * fup_adjustment;
        if fup < options.minimum_funbound_plasma {
            warnings.clamp(
                "Funbound.plasma",
                fup,
                options.minimum_funbound_plasma,
                "below the minimum fraction unbound",
            );
            fup = options.minimum_funbound_plasma;
        }

        let partition = predict_partitioning_schmitt(&schmitt, physiology)?;
        let krbc2pu = partition
            .get(Tissue::RedBloodCells)
            .ok_or_else(|| PbtkError::missing("Krbc2pu", "red blood cell partitioning"))?;
        let rblood2plasma = match properties.rblood2plasma {
            Some(measured) => measured,
            None => calc_rblood2plasma(physiology.hematocrit, krbc2pu, fup),
        };

        let clint = significant_clint(
            properties.require_clint()?,
            properties.clint_pvalue,
            options.clint_pvalue_threshold,
        );
        let fu_hep = if options.adjusted_clint {
            let log_pd = if is_base(PLASMA_PH, &schmitt.pka_donor, &schmitt.pka_accept) {
                schmitt.pow.log10()
            } else {
                dow74.log10()
            };
            calc_fu_hep(log_pd, options.vr, &mut warnings)
        } else {
            1.0
        };
        let clint_scaled = scale_clint(clint / fu_hep, physiology)?;

        let q_cardiac = physiology.per_kg(physiology.cardiac_output);
        let q_liver = q_cardiac
            * (physiology.tissue(Tissue::Liver)?.flow_fraction
                + physiology.tissue(Tissue::Gut)?.flow_fraction);
        let gfr = physiology.per_kg(physiology.gfr);

        let hepatic = HepaticClearanceInputs {
            q_liver,
            fup,
            clint_scaled,
            rblood2plasma: if options.well_stirred_correction {
                rblood2plasma
            } else {
                1.0
            },
            restrictive: options.restrictive_clearance,
            model: options.hepatic_model,
        };
        let hepatic_clearance = hepatic.clearance()?;
        let hepatic_bioavailability = hepatic.bioavailability()?;

        let vdist = calc_vdist(physiology, &partition, fup)?;
        let kelim = calc_elimination_rate(hepatic_clearance, renal_clearance(gfr, fup), vdist)?;

        debug!(
            "{}: fup {} (adjustment {}), Rblood2plasma {}, Clint scaled {} L/h/kg, Vdist {} L/kg",
            properties.identity, fup, fup_adjustment, rblood2plasma, clint_scaled, vdist
        );

        Ok(Self {
            body_weight: physiology.body_weight,
            molecular_weight,
            schmitt,
            dow74,
            fup_invitro,
            fup_adjustment,
            fup,
            partition,
            rblood2plasma,
            clint,
            fu_hep,
            clint_scaled,
            q_liver,
            gfr,
            hepatic_clearance,
            hepatic_bioavailability,
            vdist,
            kelim,
            restrictive: options.restrictive_clearance,
            warnings,
        })
    }

    /// Values shared by every topology
    pub fn common_values(&self, options: &ParameterizeOptions) -> BTreeMap<Param, f64> {
        let mut values = BTreeMap::new();
        values.insert(Param::BodyWeight, self.body_weight);
        values.insert(Param::MolecularWeight, self.molecular_weight);
        values.insert(Param::Pow, self.schmitt.pow);
        values.insert(Param::Dow74, self.dow74);
        values.insert(Param::FunboundPlasma, self.fup);
        values.insert(Param::UnadjustedFunboundPlasma, self.fup_invitro);
        values.insert(Param::FunboundPlasmaAdjustment, self.fup_adjustment);
        values.insert(Param::Clint, self.clint);
        values.insert(Param::FuHep, self.fu_hep);
        values.insert(Param::Rblood2plasma, self.rblood2plasma);
        values.insert(Param::Fabsgut, options.fabsgut);
        values.insert(Param::Kgutabs, options.kgutabs);
        values.insert(Param::HepaticClearance, self.hepatic_clearance);
        values.insert(Param::HepaticBioavailability, self.hepatic_bioavailability);
        values.insert(Param::Vdist, self.vdist);
        values.insert(Param::Kelim, self.kelim);
        values
    }

    /// Flows, volumes and lumped partition coefficients of the PBTK network
    pub fn pbtk_values(
        &self,
        physiology: &PhysiologyProfile,
        options: &ParameterizeOptions,
    ) -> Result<BTreeMap<Param, f64>, PbtkError> {
        let mut values = self.common_values(options);
        // Non-restrictive metabolism acts on total rather than unbound plasma
        let clint_scaled = if self.restrictive {
            self.clint_scaled
        } else {
            self.clint_scaled / self.fup
        };
        values.insert(Param::ClintScaled, clint_scaled);
        values.insert(Param::Qcardiacc, physiology.cardiac_output);
        values.insert(Param::Qgfrc, physiology.gfr);
        values.insert(Param::Qgutf, physiology.tissue(Tissue::Gut)?.flow_fraction);
        values.insert(Param::Qliverf, physiology.tissue(Tissue::Liver)?.flow_fraction);
        values.insert(Param::Qkidneyf, physiology.tissue(Tissue::Kidney)?.flow_fraction);

        let blood = physiology.blood_volume();
        values.insert(Param::Vvenc, blood * physiology.venous_fraction);
        values.insert(Param::Vartc, blood * (1.0 - physiology.venous_fraction));
        values.insert(Param::Vgutc, physiology.tissue(Tissue::Gut)?.volume);
        values.insert(Param::Vliverc, physiology.tissue(Tissue::Liver)?.volume);
        values.insert(Param::Vkidneyc, physiology.tissue(Tissue::Kidney)?.volume);
        values.insert(Param::Vlungc, physiology.tissue(Tissue::Lung)?.volume);
        let mut rest_volume = 0.0;
        for tissue in REST_OF_BODY {
            rest_volume += physiology.tissue(tissue)?.volume;
        }
        values.insert(Param::Vrestc, rest_volume);

        let coefficient = |tissue: Tissue| {
            self.partition.get(tissue).ok_or_else(|| {
                PbtkError::missing(format!("K{}2pu", tissue.name()), "partition coefficient")
            })
        };
        values.insert(Param::Kgut2pu, coefficient(Tissue::Gut)?);
        values.insert(Param::Kliver2pu, coefficient(Tissue::Liver)?);
        values.insert(Param::Kkidney2pu, coefficient(Tissue::Kidney)?);
        values.insert(Param::Klung2pu, coefficient(Tissue::Lung)?);
        values.insert(
            Param::Krest2pu,
            self.partition.lump(&REST_OF_BODY, physiology)?,
        );
        Ok(values)
    }
}

/// Steady-state volume of distribution (L/kg)
pub fn calc_vdist(
    physiology: &PhysiologyProfile,
    partition: &PartitionCoefficientSet,
    fup: f64,
) -> Result<f64, PbtkError> {
    let krbc2pu = partition
        .get(Tissue::RedBloodCells)
        .ok_or_else(|| PbtkError::missing("Krbc2pu", "volume of distribution"))?;
    let mut vdist = physiology.plasma_volume + physiology.red_blood_cell_volume() * krbc2pu * fup;
    for tissue in Tissue::ORGANS {
        let volume = physiology.tissue(tissue)?.volume;
        let k = partition.get(tissue).ok_or_else(|| {
            PbtkError::missing(format!("K{}2pu", tissue.name()), "volume of distribution")
        })?;
        vdist += volume * k * fup;
    }
    Ok(vdist)
}

/// First-order elimination rate (1/h) from hepatic and renal clearance (L/h/kg)
pub fn calc_elimination_rate(
    hepatic_clearance: f64,
    renal_clearance: f64,
    vdist: f64,
) -> Result<f64, PbtkError> {
    if vdist.is_nan() || vdist <= 0.0 {
        return Err(PbtkError::domain(format!(
            "volume of distribution must be positive, got {}",
            vdist
        )));
    }
    Ok((hepatic_clearance + renal_clearance) / vdist)
}

/// Elimination half-life (h)
pub fn calc_half_life(kelim: f64) -> Result<f64, PbtkError> {
    if kelim.is_nan() || kelim <= 0.0 {
        return Err(PbtkError::domain(format!(
            "half-life requires a positive elimination rate, got {}",
            kelim
        )));
    }
    Ok(std::f64::consts::LN_2 / kelim)
}

/// Total plasma clearance (L/h/kg)
pub fn calc_total_clearance(hepatic_clearance: f64, gfr: f64, fup: f64) -> f64 {
    hepatic_clearance + renal_clearance(gfr, fup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::chemical::ChemicalIdentity;
    use approx::assert_relative_eq;

    fn properties() -> ChemicalProperties {
        ChemicalProperties::new(ChemicalIdentity::new("80-05-7", "Bisphenol A"))
            .with_log_p(3.32)
            .with_pka(vec![9.78, 10.39], vec![])
            .with_molecular_weight(228.29)
            .with_funbound_plasma(0.0385)
            .with_clint(12.1, Some(0.0001))
    }

    fn human() -> PhysiologyProfile {
        PhysiologyProfile::reference(Species::Human).unwrap()
    }

    #[test]
    fn lipid_correction_lowers_fup() {
        let assembly = Assembly::build(&properties(), &human(), &Default::default()).unwrap();
        assert!(assembly.fup_adjustment < 1.0);
        assert_relative_eq!(
            assembly.fup,
            assembly.fup_invitro * assembly.fup_adjustment,
            epsilon = 1e-15
        );
        let unadjusted = Assembly::build(
            &properties(),
            &human(),
            &ParameterizeOptions::default().with_adjusted_funbound_plasma(false),
        )
        .unwrap();
        assert_eq!(unadjusted.fup, 0.0385);
    }

    #[test]
    fn fup_floor_is_applied_after_correction() {
        let options = ParameterizeOptions::default().with_minimum_funbound_plasma(0.03);
        let assembly = Assembly::build(&properties(), &human(), &options).unwrap();
        assert_eq!(assembly.fup, 0.03);
        assert!(assembly.warnings.contains("Funbound.plasma"));
    }

    #[test]
    fn zero_fup_is_not_floored() {
        let properties = properties().with_funbound_plasma(0.0);
        assert!(matches!(
            Assembly::build(&properties, &human(), &Default::default()),
            Err(PbtkError::Domain(_))
        ));
    }

    #[test]
    fn missing_clint_is_not_defaulted() {
        let mut properties = properties();
        properties.clint = None;
        assert!(matches!(
            Assembly::build(&properties, &human(), &Default::default()),
            Err(PbtkError::MissingParameter { .. })
        ));
    }

    #[test]
    fn measured_rblood2plasma_wins() {
        let properties = properties().with_rblood2plasma(0.8);
        let assembly = Assembly::build(&properties, &human(), &Default::default()).unwrap();
        assert_eq!(assembly.rblood2plasma, 0.8);
    }

    #[test]
    fn insignificant_clint_removes_hepatic_clearance() {
        let properties = properties().with_clint(12.1, Some(0.4));
        let assembly = Assembly::build(&properties, &human(), &Default::default()).unwrap();
        assert_eq!(assembly.hepatic_clearance, 0.0);
        assert_eq!(assembly.hepatic_bioavailability, 1.0);
    }

    #[test]
    fn vdist_includes_plasma_volume() {
        let physiology = human();
        let assembly = Assembly::build(&properties(), &physiology, &Default::default()).unwrap();
        assert!(assembly.vdist > physiology.plasma_volume);
        let kelim = calc_elimination_rate(
            assembly.hepatic_clearance,
            renal_clearance(assembly.gfr, assembly.fup),
            assembly.vdist,
        )
        .unwrap();
        assert_relative_eq!(kelim, assembly.kelim);
        assert_relative_eq!(
            calc_half_life(kelim).unwrap() * kelim,
            std::f64::consts::LN_2,
            epsilon = 1e-12
        );
    }
}
