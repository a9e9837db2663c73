use crate::data::chemical::ChemicalProperties;
use crate::data::physiology::PhysiologyProfile;
use crate::models::{positive_fup, Model, ModelKind};
use crate::parameters::{check_applicability, Assembly, Param, ParameterSet, ParameterizeOptions};
use crate::PbtkError;

const REQUIRED: [Param; 8] = [
    Param::BodyWeight,
    Param::MolecularWeight,
    Param::FunboundPlasma,
    Param::Rblood2plasma,
    Param::Fabsgut,
    Param::HepaticBioavailability,
    Param::HepaticClearance,
    Param::Qgfrc,
];

/// Gut, liver and systemic compartments at steady state only
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreeCompartmentSs;

impl Model for ThreeCompartmentSs {
    fn kind(&self) -> ModelKind {
        ModelKind::ThreeCompartmentSs
    }

    fn required_parameters(&self) -> &'static [Param] {
        &REQUIRED
    }

    fn parameterize(
        &self,
        properties: &ChemicalProperties,
        physiology: &PhysiologyProfile,
        options: &ParameterizeOptions,
    ) -> Result<ParameterSet, PbtkError> {
        check_applicability(self, properties, options)?;
        // The partition coefficients kept with the set are the ones tissue Css uses
        let assembly = Assembly::build(properties, physiology, options)?;
        let mut values = assembly.common_values(options);
        values.insert(Param::Qgfrc, physiology.gfr);
        Ok(ParameterSet::new(self.kind(), values)?
            .with_derivation(assembly.partition, assembly.warnings))
    }

    fn css_plasma(&self, params: &ParameterSet, dose_rate: f64) -> Result<f64, PbtkError> {
        let fup = positive_fup(params)?;
        let gfr = params.get(Param::Qgfrc)? / params.get(Param::BodyWeight)?.powf(0.25);
        let clearance = gfr * fup + params.get(Param::HepaticClearance)?;
        if clearance.is_nan() || clearance <= 0.0 {
            return Err(PbtkError::domain(format!(
                "total clearance must be positive, got {}",
                clearance
            )));
        }
        Ok(dose_rate * params.get(Param::Fabsgut)? * params.get(Param::HepaticBioavailability)?
            / clearance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::BTreeMap;

    fn params() -> ParameterSet {
        let values: BTreeMap<Param, f64> = [
            (Param::BodyWeight, 70.0),
            (Param::MolecularWeight, 200.0),
            (Param::FunboundPlasma, 0.1),
            (Param::Rblood2plasma, 1.0),
            (Param::Fabsgut, 1.0),
            (Param::HepaticBioavailability, 0.6),
            (Param::HepaticClearance, 0.5),
            (Param::Qgfrc, 0.31),
        ]
        .into_iter()
        .collect();
        ParameterSet::new(ModelKind::ThreeCompartmentSs, values).unwrap()
    }

    #[test]
    fn css_matches_closed_form() {
        let gfr = 0.31 / 70f64.powf(0.25);
        let expected = 0.6 / (gfr * 0.1 + 0.5);
        assert_relative_eq!(
            ThreeCompartmentSs.css_plasma(&params(), 1.0).unwrap(),
            expected,
            epsilon = 1e-12
        );
    }

    #[test]
    fn has_no_dynamics() {
        assert!(matches!(
            ThreeCompartmentSs.system(&params()),
            Err(PbtkError::Domain(_))
        ));
    }
}
