//! Model parameter sets
//!
//! [Param] is the closed set of parameter names used by the four model topologies.
//! A [ParameterSet] is built once per call, checked against the required list of its
//! topology, and never mutated in place.

pub mod applicability;
pub mod assemble;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::clearance::HepaticModel;
use crate::data::chemical::{ChemicalIdentity, ChemicalProperties, ChemicalQuery};
use crate::data::physiology::{PhysiologyProfile, Species};
use crate::data::store::PropertyStore;
use crate::error::Warnings;
use crate::models::ModelKind;
use crate::partition::PartitionCoefficientSet;
use crate::PbtkError;

pub use applicability::check_applicability;
pub use assemble::{
    calc_elimination_rate, calc_half_life, calc_total_clearance, calc_vdist, Assembly,
};

/// Parameter names. Rates are per kg body weight (suffix `c`: allometric, per
/// kg^0.75), volumes are L/kg, flows marked `f` are fractions of cardiac output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Param {
    BodyWeight,
    MolecularWeight,
    Pow,
    Dow74,
    LogHenry,
    /// Fraction unbound in plasma after correction and flooring
    FunboundPlasma,
    /// Fraction unbound in plasma as measured
    UnadjustedFunboundPlasma,
    FunboundPlasmaAdjustment,
    Clint,
    FuHep,
    Rblood2plasma,
    Fabsgut,
    Kgutabs,
    Vdist,
    Kelim,
    /// Hepatic plasma clearance from the liver model (L/h/kg)
    HepaticClearance,
    /// Scaled intrinsic clearance acting on unbound liver concentration (L/h/kg)
    ClintScaled,
    HepaticBioavailability,
    Qcardiacc,
    Qgfrc,
    Qalvc,
    Qgutf,
    Qliverf,
    Qkidneyf,
    Vartc,
    Vvenc,
    Vgutc,
    Vliverc,
    Vkidneyc,
    Vlungc,
    Vrestc,
    Kgut2pu,
    Kliver2pu,
    Kkidney2pu,
    Klung2pu,
    Krest2pu,
    Kblood2air,
}

impl Param {
    pub const ALL: [Param; 37] = [
        Param::BodyWeight,
        Param::MolecularWeight,
        Param::Pow,
        Param::Dow74,
        Param::LogHenry,
        Param::FunboundPlasma,
        Param::UnadjustedFunboundPlasma,
        Param::FunboundPlasmaAdjustment,
        Param::Clint,
        Param::FuHep,
        Param::Rblood2plasma,
        Param::Fabsgut,
        Param::Kgutabs,
        Param::Vdist,
        Param::Kelim,
        Param::HepaticClearance,
        Param::ClintScaled,
        Param::HepaticBioavailability,
        Param::Qcardiacc,
        Param::Qgfrc,
        Param::Qalvc,
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
        Param::Kblood2air,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Param::BodyWeight => "BW",
            Param::MolecularWeight => "MW",
            Param::Pow => "Pow",
            Param::Dow74 => "Dow74",
            Param::LogHenry => "logHenry",
            Param::FunboundPlasma => "Funbound.plasma",
            Param::UnadjustedFunboundPlasma => "unadjusted.Funbound.plasma",
            Param::FunboundPlasmaAdjustment => "Funbound.plasma.adjustment",
            Param::Clint => "Clint",
            Param::FuHep => "Fhep.assay.correction",
            Param::Rblood2plasma => "Rblood2plasma",
            Param::Fabsgut => "Fabsgut",
            Param::Kgutabs => "kgutabs",
            Param::Vdist => "Vdist",
            Param::Kelim => "kelim",
            Param::HepaticClearance => "Clhep",
            Param::ClintScaled => "Clmetabolismc",
            Param::HepaticBioavailability => "hepatic.bioavailability",
            Param::Qcardiacc => "Qcardiacc",
            Param::Qgfrc => "Qgfrc",
            Param::Qalvc => "Qalvc",
            Param::Qgutf => "Qgutf",
            Param::Qliverf => "Qliverf",
            Param::Qkidneyf => "Qkidneyf",
            Param::Vartc => "Vartc",
            Param::Vvenc => "Vvenc",
            Param::Vgutc => "Vgutc",
            Param::Vliverc => "Vliverc",
            Param::Vkidneyc => "Vkidneyc",
            Param::Vlungc => "Vlungc",
            Param::Vrestc => "Vrestc",
            Param::Kgut2pu => "Kgut2pu",
            Param::Kliver2pu => "Kliver2pu",
            Param::Kkidney2pu => "Kkidney2pu",
            Param::Klung2pu => "Klung2pu",
            Param::Krest2pu => "Krest2pu",
            Param::Kblood2air => "Kblood2air",
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Param {
    type Err = PbtkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Param::ALL
            .iter()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| PbtkError::domain(format!("unknown parameter '{}'", s)))
    }
}

/// Policy flags of the parameterization pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterizeOptions {
    /// Use human fup and Clint when the species has no measurement
    pub default_to_human: bool,
    /// Apply the plasma lipid correction to fup
    pub adjusted_funbound_plasma: bool,
    /// Correct Clint for binding in the hepatocyte incubation
    pub adjusted_clint: bool,
    /// Only the unbound fraction is available to metabolism
    pub restrictive_clearance: bool,
    /// Use Rblood2plasma in the liver model; 1 otherwise
    pub well_stirred_correction: bool,
    pub hepatic_model: HepaticModel,
    /// Floor for fup, applied after all corrections
    pub minimum_funbound_plasma: f64,
    /// Clint with a p-value above this is treated as zero
    pub clint_pvalue_threshold: f64,
    /// Reject chemicals in a model's excluded classes
    pub class_exclude: bool,
    /// Reject chemicals outside a model's phys-chem domain
    pub physchem_exclude: bool,
    /// Cell volume fraction of the hepatocyte incubation
    pub vr: f64,
    /// Use human plasma lipid content for the fup correction
    pub force_human_fup: bool,
    /// Gut absorption rate constant (1/h)
    pub kgutabs: f64,
    /// Fraction of an oral dose absorbed into gut tissue
    pub fabsgut: f64,
}

impl Default for ParameterizeOptions {
    fn default() -> Self {
        Self {
            default_to_human: false,
            adjusted_funbound_plasma: true,
            adjusted_clint: true,
            restrictive_clearance: true,
            well_stirred_correction: true,
            hepatic_model: HepaticModel::WellStirred,
            minimum_funbound_plasma: 1e-4,
            clint_pvalue_threshold: 0.05,
            class_exclude: true,
            physchem_exclude: true,
            vr: crate::binding::DEFAULT_VR,
            force_human_fup: false,
            kgutabs: 2.18,
            fabsgut: 1.0,
        }
    }
}

impl ParameterizeOptions {
    pub fn from_json(json: &str) -> Result<Self, PbtkError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_default_to_human(mut self, value: bool) -> Self {
        self.default_to_human = value;
        self
    }

    pub fn with_adjusted_funbound_plasma(mut self, value: bool) -> Self {
        self.adjusted_funbound_plasma = value;
        self
    }

    pub fn with_adjusted_clint(mut self, value: bool) -> Self {
        self.adjusted_clint = value;
        self
    }

    pub fn with_restrictive_clearance(mut self, value: bool) -> Self {
        self.restrictive_clearance = value;
        self
    }

    pub fn with_well_stirred_correction(mut self, value: bool) -> Self {
        self.well_stirred_correction = value;
        self
    }

    pub fn with_hepatic_model(mut self, model: HepaticModel) -> Self {
        self.hepatic_model = model;
        self
    }

    pub fn with_minimum_funbound_plasma(mut self, value: f64) -> Self {
        self.minimum_funbound_plasma = value;
        self
    }

    pub fn with_clint_pvalue_threshold(mut self, value: f64) -> Self {
        self.clint_pvalue_threshold = value;
        self
    }

    pub fn with_class_exclude(mut self, value: bool) -> Self {
        self.class_exclude = value;
        self
    }

    pub fn with_physchem_exclude(mut self, value: bool) -> Self {
        self.physchem_exclude = value;
        self
    }

    pub fn with_force_human_fup(mut self, value: bool) -> Self {
        self.force_human_fup = value;
        self
    }
}

/// Parameters of one model topology for one chemical and species
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    model: ModelKind,
    values: BTreeMap<Param, f64>,
    /// Every tissue coefficient, when the set was derived from phys-chem inputs
    partition: Option<PartitionCoefficientSet>,
    warnings: Warnings,
}

impl ParameterSet {
    /// Validate `values` against the required parameters of `model`
    pub fn new(model: ModelKind, values: BTreeMap<Param, f64>) -> Result<Self, PbtkError> {
        for required in model.model().required_parameters() {
            if !values.contains_key(required) {
                return Err(PbtkError::missing(
                    required.name(),
                    format!("required by the {} model", model),
                ));
            }
        }
        Ok(Self {
            model,
            values,
            partition: None,
            warnings: Warnings::new(),
        })
    }

    pub(crate) fn with_derivation(
        mut self,
        partition: PartitionCoefficientSet,
        warnings: Warnings,
    ) -> Self {
        self.partition = Some(partition);
        self.warnings = warnings;
        self
    }

    pub fn model(&self) -> ModelKind {
        self.model
    }

    pub fn get(&self, param: Param) -> Result<f64, PbtkError> {
        self.values.get(&param).copied().ok_or_else(|| {
            PbtkError::missing(param.name(), format!("not in the {} parameter set", self.model))
        })
    }

    pub fn try_get(&self, param: Param) -> Option<f64> {
        self.values.get(&param).copied()
    }

    pub fn values(&self) -> &BTreeMap<Param, f64> {
        &self.values
    }

    /// A copy with one value replaced
    pub fn with_value(&self, param: Param, value: f64) -> Self {
        let mut next = self.clone();
        next.values.insert(param, value);
        next
    }

    pub fn partition(&self) -> Option<&PartitionCoefficientSet> {
        self.partition.as_ref()
    }

    pub fn warnings(&self) -> &Warnings {
        &self.warnings
    }
}

/// Chemical argument of the solver entry points.
///
/// A prebuilt [ParameterSet] takes precedence over a chemical query.
#[derive(Debug, Clone, Default)]
pub struct ChemicalInput {
    pub query: Option<ChemicalQuery>,
    pub parameters: Option<ParameterSet>,
}

impl ChemicalInput {
    pub fn query(query: ChemicalQuery) -> Self {
        Self {
            query: Some(query),
            parameters: None,
        }
    }

    pub fn parameters(parameters: ParameterSet) -> Self {
        Self {
            query: None,
            parameters: Some(parameters),
        }
    }

    pub fn with_query(mut self, query: ChemicalQuery) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_parameters(mut self, parameters: ParameterSet) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Produce the parameter set for `model`, parameterizing from the store if needed
    pub fn resolve(
        &self,
        store: &dyn PropertyStore,
        model: ModelKind,
        species: Species,
        options: &ParameterizeOptions,
    ) -> Result<ParameterSet, PbtkError> {
        if let Some(parameters) = &self.parameters {
            if parameters.model() != model {
                return Err(PbtkError::domain(format!(
                    "parameter set was built for the {} model, not {}",
                    parameters.model(),
                    model
                )));
            }
            return Ok(parameters.clone());
        }
        let query = self.query.as_ref().ok_or_else(|| {
            PbtkError::missing(
                "chemical",
                "either a chemical identifier or a parameter set is required",
            )
        })?;
        let identity = store.resolve_identity(query)?;
        parameterize(store, &identity, model, species, options)
    }
}

/// Fetch properties and physiology from `store` and parameterize `model`
pub fn parameterize(
    store: &dyn PropertyStore,
    identity: &ChemicalIdentity,
    model: ModelKind,
    species: Species,
    options: &ParameterizeOptions,
) -> Result<ParameterSet, PbtkError> {
    let physiology: PhysiologyProfile = store.get_physiology(species)?;
    let properties =
        ChemicalProperties::fetch(store, identity, species, options.default_to_human)?;
    model.model().parameterize(&properties, &physiology, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_names_round_trip() {
        for param in Param::ALL {
            assert_eq!(param.name().parse::<Param>().unwrap(), param);
        }
    }

    #[test]
    fn options_from_partial_json_keep_defaults() {
        let options =
            ParameterizeOptions::from_json(r#"{"restrictive_clearance": false}"#).unwrap();
        assert!(!options.restrictive_clearance);
        assert_eq!(options.minimum_funbound_plasma, 1e-4);
        assert!(options.class_exclude);
    }

    #[test]
    fn options_reject_malformed_json() {
        assert!(matches!(
            ParameterizeOptions::from_json("{restrictive"),
            Err(PbtkError::Config(_))
        ));
    }

    #[test]
    fn incomplete_parameter_set_is_rejected() {
        let mut values = BTreeMap::new();
        values.insert(Param::BodyWeight, 70.0);
        assert!(matches!(
            ParameterSet::new(ModelKind::OneCompartment, values),
            Err(PbtkError::MissingParameter { .. })
        ));
    }
}
