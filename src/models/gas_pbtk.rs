//! PBTK model with inhalation exposure and exhalation

use crate::data::chemical::ChemicalProperties;
use crate::data::physiology::{PhysiologyProfile, Tissue};
use crate::models::pbtk::{self, GasExchange, Network};
use crate::models::{CompartmentSystem, Model, ModelKind};
use crate::parameters::{check_applicability, Assembly, Param, ParameterSet, ParameterizeOptions};
use crate::PbtkError;

/// Ideal gas constant (atm m³ / K / mol)
const GAS_CONSTANT: f64 = 8.205746e-5;

/// Body temperature (K)
const BODY_TEMPERATURE: f64 = 310.0;

const REQUIRED: [Param; 27] = [
    Param::BodyWeight,
    Param::MolecularWeight,
    Param::FunboundPlasma,
    Param::Rblood2plasma,
    Param::Kgutabs,
    Param::Fabsgut,
    Param::ClintScaled,
    Param::Qcardiacc,
    Param::Qgfrc,
    Param::Qgutf,
    Param::Qliverf,
    Param::Qkidneyf,
    Param::Vartc,
    Param::Vvenc,
    Param::Vgutc,
    Param::Vliverc,
    Param::Vkidneyc,
    Param::Vlungc,
    Param::Vrestc,
    Param::Kgut2pu,
    Param::Kliver2pu,
    Param::Kkidney2pu,
    Param::Klung2pu,
    Param::Krest2pu,
    Param::Qalvc,
    Param::Kblood2air,
    Param::LogHenry,
];

/// Water : air partition coefficient at body temperature from log10 Henry's
/// constant (atm m³/mol)
pub fn calc_kwater2air(log_henry: f64) -> f64 {
    GAS_CONSTANT * BODY_TEMPERATURE / 10f64.powf(log_henry)
}

/// Blood : air partition coefficient
pub fn calc_kblood2air(log_henry: f64, rblood2plasma: f64, fup: f64) -> f64 {
    calc_kwater2air(log_henry) * rblood2plasma / fup
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GasPbtk;

impl GasPbtk {
    fn exchange(params: &ParameterSet) -> Result<GasExchange, PbtkError> {
        let qalv = params.get(Param::Qalvc)? * params.get(Param::BodyWeight)?.powf(0.75);
        let kblood2air = params.get(Param::Kblood2air)?;
        if kblood2air.is_nan() || kblood2air <= 0.0 {
            return Err(PbtkError::domain(format!(
                "Kblood2air must be positive, got {}",
                kblood2air
            )));
        }
        Ok(GasExchange { qalv, kblood2air })
    }
}

impl Model for GasPbtk {
    fn kind(&self) -> ModelKind {
        ModelKind::GasPbtk
    }

    fn required_parameters(&self) -> &'static [Param] {
        &REQUIRED
    }

    fn log_henry_limit(&self) -> Option<f64> {
        None
    }

    fn parameterize(
        &self,
        properties: &ChemicalProperties,
        physiology: &PhysiologyProfile,
        options: &ParameterizeOptions,
    ) -> Result<ParameterSet, PbtkError> {
        check_applicability(self, properties, options)?;
        let log_henry = properties.require_log_henry()?;
        let assembly = Assembly::build(properties, physiology, options)?;
        let mut values = assembly.pbtk_values(physiology, options)?;
        values.insert(Param::Qalvc, physiology.alveolar_ventilation);
        values.insert(Param::LogHenry, log_henry);
        values.insert(
            Param::Kblood2air,
            calc_kblood2air(log_henry, assembly.rblood2plasma, assembly.fup),
        );
        Ok(ParameterSet::new(self.kind(), values)?
            .with_derivation(assembly.partition, assembly.warnings))
    }

    /// Oral Css, with exhalation as an additional loss
    fn css_plasma(&self, params: &ParameterSet, dose_rate: f64) -> Result<f64, PbtkError> {
        let network = Network::from_params(params, Some(Self::exchange(params)?))?;
        Ok(network.css_plasma(dose_rate * network.body_weight))
    }

    fn compartment_partition(&self, params: &ParameterSet, tissue: Tissue) -> Option<f64> {
        pbtk::compartment_partition(params, tissue)
    }

    fn system(&self, params: &ParameterSet) -> Result<Box<dyn CompartmentSystem>, PbtkError> {
        Ok(Box::new(Network::from_params(
            params,
            Some(Self::exchange(params)?),
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::pbtk::tests::values;
    use crate::models::pbtk::{EXHALED, INHALED, LUNG};
    use crate::models::Pbtk;
    use approx::assert_relative_eq;

    fn params() -> ParameterSet {
        let mut values = values();
        values.insert(Param::Qalvc, 13.0);
        values.insert(Param::LogHenry, -2.26);
        values.insert(Param::Kblood2air, calc_kblood2air(-2.26, 0.9, 0.2));
        ParameterSet::new(ModelKind::GasPbtk, values).unwrap()
    }

    #[test]
    fn kwater2air_follows_henrys_law() {
        assert_relative_eq!(
            calc_kwater2air(-3.0),
            8.205746e-5 * 310.0 * 1000.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn exhalation_lowers_oral_css() {
        let gas = GasPbtk.css_plasma(&params(), 1.0).unwrap();
        let oral_only =
            Pbtk.css_plasma(&ParameterSet::new(ModelKind::Pbtk, values()).unwrap(), 1.0)
                .unwrap();
        assert!(gas < oral_only);
    }

    #[test]
    fn inhalation_enters_through_the_lung() {
        let system = GasPbtk.system(&params()).unwrap();
        assert!(system.accepts_forcing());
        let x = vec![0.0; 13];
        let mut dx = vec![0.0; 13];
        system.rhs(&x, 2.0, &mut dx);
        assert!(dx[LUNG] > 0.0);
        assert_relative_eq!(dx[INHALED], dx[LUNG]);
        assert_eq!(dx[EXHALED], 0.0);
    }

    #[test]
    fn requires_henrys_constant() {
        let properties = ChemicalProperties::new(
            crate::data::chemical::ChemicalIdentity::new("1-1-1", "x"),
        );
        let physiology =
            PhysiologyProfile::reference(crate::data::physiology::Species::Human).unwrap();
        assert!(matches!(
            GasPbtk.parameterize(&properties, &physiology, &ParameterizeOptions::default()),
            Err(PbtkError::MissingParameter { .. })
        ));
    }
}
