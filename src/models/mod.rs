//! Model topologies
//!
//! Every topology implements [Model]: it declares its required parameters and
//! applicability rules, builds its [ParameterSet], gives its analytic plasma Css and,
//! where it has dynamics, a [CompartmentSystem] for the ODE harness.

pub mod gas_pbtk;
pub mod one_compartment;
pub mod pbtk;
pub mod three_compartment_ss;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::data::chemical::ChemicalProperties;
use crate::data::physiology::{PhysiologyProfile, Tissue};
use crate::parameters::{Param, ParameterSet, ParameterizeOptions};
use crate::simulator::Route;
use crate::PbtkError;

pub use gas_pbtk::GasPbtk;
pub use one_compartment::OneCompartment;
pub use pbtk::Pbtk;
pub use three_compartment_ss::ThreeCompartmentSs;

/// Chemicals with logHenry at or above this value (atm m³/mol) are too volatile for
/// the oral models
pub const VOLATILITY_LOG_HENRY: f64 = -4.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModelKind {
    OneCompartment,
    ThreeCompartmentSs,
    Pbtk,
    GasPbtk,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [
        ModelKind::OneCompartment,
        ModelKind::ThreeCompartmentSs,
        ModelKind::Pbtk,
        ModelKind::GasPbtk,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::OneCompartment => "1compartment",
            ModelKind::ThreeCompartmentSs => "3compartmentss",
            ModelKind::Pbtk => "pbtk",
            ModelKind::GasPbtk => "gas_pbtk",
        }
    }

    /// The registered implementation of this topology
    pub fn model(&self) -> &'static dyn Model {
        REGISTRY.get(*self)
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ModelKind {
    type Err = PbtkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelKind::ALL
            .iter()
            .find(|k| k.name().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| PbtkError::domain(format!("unknown model '{}'", s)))
    }
}

/// What a simulation output column holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputKind {
    Amount,
    Concentration,
    AirConcentration,
    /// Area under the plasma concentration curve
    Auc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputColumn {
    pub name: &'static str,
    pub kind: OutputKind,
}

impl OutputColumn {
    pub const fn new(name: &'static str, kind: OutputKind) -> Self {
        Self { name, kind }
    }
}

/// Linear compartmental mass balance with absolute volumes (L) and flows (L/h).
///
/// States are amounts in µmol, `forcing` is an inhaled concentration in µM.
pub trait CompartmentSystem: Send + Sync {
    fn states(&self) -> &'static [&'static str];

    fn outputs(&self) -> &'static [OutputColumn];

    /// State receiving doses by `route`
    fn dose_state(&self, route: Route) -> Result<usize, PbtkError>;

    /// Fraction of a dose by `route` that reaches the dose state
    fn dose_fraction(&self, route: Route) -> f64;

    fn accepts_forcing(&self) -> bool {
        false
    }

    /// Output column holding the plasma concentration
    fn plasma_output(&self) -> &'static str {
        "Cplasma"
    }

    fn rhs(&self, x: &[f64], forcing: f64, dx: &mut [f64]);

    fn observe(&self, x: &[f64], forcing: f64, y: &mut [f64]);

    fn state_index(&self, name: &str) -> Option<usize> {
        self.states()
            .iter()
            .position(|s| s.eq_ignore_ascii_case(name))
    }
}

/// One model topology
pub trait Model: Send + Sync {
    fn kind(&self) -> ModelKind;

    fn required_parameters(&self) -> &'static [Param];

    fn excluded_classes(&self) -> &'static [&'static str] {
        &["PFAS"]
    }

    /// logHenry at or above which a chemical is excluded, if any
    fn log_henry_limit(&self) -> Option<f64> {
        Some(VOLATILITY_LOG_HENRY)
    }

    fn parameterize(
        &self,
        properties: &ChemicalProperties,
        physiology: &PhysiologyProfile,
        options: &ParameterizeOptions,
    ) -> Result<ParameterSet, PbtkError>;

    /// Plasma Css (mg/L) for a constant oral dose rate (mg/kg/h)
    fn css_plasma(&self, params: &ParameterSet, dose_rate: f64) -> Result<f64, PbtkError>;

    /// Tissue : unbound plasma coefficient carried by one of the model compartments
    fn compartment_partition(&self, _params: &ParameterSet, _tissue: Tissue) -> Option<f64> {
        None
    }

    fn system(&self, _params: &ParameterSet) -> Result<Box<dyn CompartmentSystem>, PbtkError> {
        Err(PbtkError::domain(format!(
            "the {} model has no dynamic form",
            self.kind()
        )))
    }
}

/// Fraction unbound of a parameter set; zero is rejected before anyone divides by it
pub(crate) fn positive_fup(params: &ParameterSet) -> Result<f64, PbtkError> {
    let fup = params.get(Param::FunboundPlasma)?;
    if fup.is_nan() || fup <= 0.0 {
        return Err(PbtkError::domain(format!(
            "Funbound.plasma must be positive, got {}",
            fup
        )));
    }
    Ok(fup)
}

/// Maps topology tags to implementations
pub struct ModelRegistry {
    models: BTreeMap<ModelKind, Box<dyn Model>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        let models = ModelKind::ALL
            .into_iter()
            .map(|kind| {
                let model: Box<dyn Model> = match kind {
                    ModelKind::OneCompartment => Box::new(OneCompartment),
                    ModelKind::ThreeCompartmentSs => Box::new(ThreeCompartmentSs),
                    ModelKind::Pbtk => Box::new(Pbtk),
                    ModelKind::GasPbtk => Box::new(GasPbtk),
                };
                (kind, model)
            })
            .collect();
        Self { models }
    }

    // `new` registers every kind
    fn get(&self, kind: ModelKind) -> &dyn Model {
        self.models[&kind].as_ref()
    }

    /// Look a model up by its name, e.g. `"pbtk"`
    pub fn by_name(&self, name: &str) -> Result<&dyn Model, PbtkError> {
        Ok(self.get(name.parse()?))
    }

    pub fn kinds(&self) -> impl Iterator<Item = ModelKind> + '_ {
        self.models.keys().copied()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    static ref REGISTRY: ModelRegistry = ModelRegistry::new();
}

/// The process-wide model registry
pub fn registry() -> &'static ModelRegistry {
    &REGISTRY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_serves_every_topology() {
        for kind in ModelKind::ALL {
            assert_eq!(kind.model().kind(), kind);
            assert_eq!(registry().by_name(kind.name()).unwrap().kind(), kind);
        }
        assert_eq!(registry().kinds().count(), 4);
        assert!(ModelRegistry::default().kinds().eq(ModelKind::ALL));
    }

    #[test]
    fn unknown_model_name_is_rejected() {
        assert!(registry().by_name("2compartment").is_err());
    }

    #[test]
    fn only_the_gas_model_accepts_volatiles() {
        assert_eq!(ModelKind::GasPbtk.model().log_henry_limit(), None);
        assert_eq!(
            ModelKind::Pbtk.model().log_henry_limit(),
            Some(VOLATILITY_LOG_HENRY)
        );
    }
}
