use crate::data::chemical::ChemicalProperties;
use crate::data::physiology::PhysiologyProfile;
use crate::models::{
    positive_fup, CompartmentSystem, Model, ModelKind, OutputColumn, OutputKind,
};
use crate::parameters::{check_applicability, Assembly, Param, ParameterSet, ParameterizeOptions};
use crate::simulator::Route;
use crate::PbtkError;

const REQUIRED: [Param; 10] = [
    Param::BodyWeight,
    Param::MolecularWeight,
    Param::FunboundPlasma,
    Param::Rblood2plasma,
    Param::Vdist,
    Param::Kelim,
    Param::Kgutabs,
    Param::Fabsgut,
    Param::HepaticBioavailability,
    Param::HepaticClearance,
];

const STATES: [&str; 4] = ["Agutlumen", "Acompartment", "Ametabolized", "AUC"];

const OUTPUTS: [OutputColumn; 5] = [
    OutputColumn::new("Agutlumen", OutputKind::Amount),
    OutputColumn::new("Acompartment", OutputKind::Amount),
    OutputColumn::new("Ametabolized", OutputKind::Amount),
    OutputColumn::new("Ccompartment", OutputKind::Concentration),
    OutputColumn::new("AUC", OutputKind::Auc),
];

/// Single well-mixed plasma-referenced compartment with first-order absorption
/// and elimination
#[derive(Debug, Clone, Copy, Default)]
pub struct OneCompartment;

impl Model for OneCompartment {
    fn kind(&self) -> ModelKind {
        ModelKind::OneCompartment
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
        let assembly = Assembly::build(properties, physiology, options)?;
        let mut values = assembly.common_values(options);
        values.insert(Param::Qgfrc, physiology.gfr);
        Ok(ParameterSet::new(self.kind(), values)?
            .with_derivation(assembly.partition, assembly.warnings))
    }

    fn css_plasma(&self, params: &ParameterSet, dose_rate: f64) -> Result<f64, PbtkError> {
        positive_fup(params)?;
        let bioavailability =
            params.get(Param::Fabsgut)? * params.get(Param::HepaticBioavailability)?;
        let clearance = params.get(Param::Kelim)? * params.get(Param::Vdist)?;
        if clearance.is_nan() || clearance <= 0.0 {
            return Err(PbtkError::domain(format!(
                "no elimination (kelim * Vdist = {}), steady state is unbounded",
                clearance
            )));
        }
        Ok(dose_rate * bioavailability / clearance)
    }

    fn system(&self, params: &ParameterSet) -> Result<Box<dyn CompartmentSystem>, PbtkError> {
        let vdist = params.get(Param::Vdist)? * params.get(Param::BodyWeight)?;
        if vdist.is_nan() || vdist <= 0.0 {
            return Err(PbtkError::domain(format!(
                "volume of distribution must be positive, got {}",
                vdist
            )));
        }
        Ok(Box::new(OneCompartmentSystem {
            kgutabs: params.get(Param::Kgutabs)?,
            kelim: params.get(Param::Kelim)?,
            vdist,
            oral_fraction: params.get(Param::Fabsgut)?
                * params.get(Param::HepaticBioavailability)?,
        }))
    }
}

#[derive(Debug, Clone)]
struct OneCompartmentSystem {
    kgutabs: f64,
    kelim: f64,
    /// L
    vdist: f64,
    oral_fraction: f64,
}

impl CompartmentSystem for OneCompartmentSystem {
    fn states(&self) -> &'static [&'static str] {
        &STATES
    }

    fn outputs(&self) -> &'static [OutputColumn] {
        &OUTPUTS
    }

    fn dose_state(&self, route: Route) -> Result<usize, PbtkError> {
        match route {
            Route::Oral => Ok(0),
            Route::Iv => Ok(1),
            Route::Inhalation => Err(PbtkError::domain(
                "the 1compartment model has no inhalation route",
            )),
        }
    }

    fn dose_fraction(&self, route: Route) -> f64 {
        match route {
            Route::Oral => self.oral_fraction,
            _ => 1.0,
        }
    }

    fn plasma_output(&self) -> &'static str {
        "Ccompartment"
    }

    fn rhs(&self, x: &[f64], _forcing: f64, dx: &mut [f64]) {
        let absorption = self.kgutabs * x[0];
        let elimination = self.kelim * x[1];
        dx[0] = -absorption;
        dx[1] = absorption - elimination;
        dx[2] = elimination;
        dx[3] = x[1] / self.vdist;
    }

    fn observe(&self, x: &[f64], _forcing: f64, y: &mut [f64]) {
        y[0] = x[0];
        y[1] = x[1];
        y[2] = x[2];
        y[3] = x[1] / self.vdist;
        y[4] = x[3];
    }
}
