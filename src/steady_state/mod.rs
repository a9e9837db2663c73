//! Steady-state plasma and tissue concentrations
//!
//! Every model supplies its closed-form plasma Css for a constant oral dose rate.
//! Blood, free plasma and tissue concentrations are post-multiplications of that
//! value; nothing here reaches back into the model.

pub mod numeric;

use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::data::physiology::{Species, Tissue};
use crate::data::store::PropertyStore;
use crate::data::units::{convert_concentration, ConcentrationUnit};
use crate::error::Warnings;
use crate::models::{positive_fup, ModelKind};
use crate::parameters::{ChemicalInput, Param, ParameterSet, ParameterizeOptions};
use crate::PbtkError;

pub use numeric::{days_to_steady_state, numeric_css_plasma, SteadyStateDays, SteadyStateOptions};

/// Which concentration a Css is reported for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConcentrationKind {
    #[default]
    Plasma,
    Blood,
    /// Total tissue concentration
    Tissue(Tissue),
    /// Unbound plasma concentration
    FreePlasma,
}

impl fmt::Display for ConcentrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConcentrationKind::Plasma => write!(f, "plasma"),
            ConcentrationKind::Blood => write!(f, "blood"),
            ConcentrationKind::Tissue(tissue) => write!(f, "{}", tissue.name()),
            ConcentrationKind::FreePlasma => write!(f, "free plasma"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CssOptions {
    /// Constant oral dose (mg/kg BW/day)
    pub daily_dose: f64,
    pub concentration: ConcentrationKind,
    /// uM or mg/L
    pub output_unit: ConcentrationUnit,
}

impl Default for CssOptions {
    fn default() -> Self {
        Self {
            daily_dose: 1.0,
            concentration: ConcentrationKind::Plasma,
            output_unit: ConcentrationUnit::Um,
        }
    }
}

impl CssOptions {
    pub fn from_json(json: &str) -> Result<Self, PbtkError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_daily_dose(mut self, daily_dose: f64) -> Self {
        self.daily_dose = daily_dose;
        self
    }

    pub fn with_concentration(mut self, concentration: ConcentrationKind) -> Self {
        self.concentration = concentration;
        self
    }

    pub fn with_output_unit(mut self, unit: ConcentrationUnit) -> Self {
        self.output_unit = unit;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CssResult {
    pub model: ModelKind,
    pub value: f64,
    pub unit: ConcentrationUnit,
    pub concentration: ConcentrationKind,
    pub warnings: Warnings,
}

/// Tissue : unbound plasma coefficient of `tissue` carried by `params`
fn tissue_partition(params: &ParameterSet, tissue: Tissue) -> Result<f64, PbtkError> {
    params
        .partition()
        .and_then(|set| set.get(tissue))
        .or_else(|| params.model().model().compartment_partition(params, tissue))
        .ok_or_else(|| {
            PbtkError::missing(
                format!("K{}2pu", tissue.name()),
                "tissue steady-state concentration",
            )
        })
}

/// Analytic steady-state concentration under constant oral dosing
pub fn calc_analytic_css(
    params: &ParameterSet,
    options: &CssOptions,
) -> Result<CssResult, PbtkError> {
    let fup = positive_fup(params)?;
    if options.output_unit == ConcentrationUnit::Ppmv {
        return Err(PbtkError::domain(
            "steady-state concentrations are reported in uM or mg/L",
        ));
    }
    let model = params.model();
    let plasma = model
        .model()
        .css_plasma(params, options.daily_dose / 24.0)?;

    let factor = match options.concentration {
        ConcentrationKind::Plasma => 1.0,
        ConcentrationKind::Blood => params.get(Param::Rblood2plasma)?,
        ConcentrationKind::FreePlasma => fup,
        ConcentrationKind::Tissue(tissue) => fup * tissue_partition(params, tissue)?,
    };
    let value = convert_concentration(
        plasma * factor,
        ConcentrationUnit::MgPerL,
        options.output_unit,
        params.get(Param::MolecularWeight)?,
    )?;
    debug!(
        "{} Css ({}) for {} mg/kg/day: {} {}",
        model, options.concentration, options.daily_dose, value, options.output_unit
    );

    Ok(CssResult {
        model,
        value,
        unit: options.output_unit,
        concentration: options.concentration,
        warnings: params.warnings().clone(),
    })
}

/// Resolve the chemical (or take its ready parameter set) and compute its Css
pub fn calc_css(
    store: &dyn PropertyStore,
    input: &ChemicalInput,
    model: ModelKind,
    species: Species,
    options: &CssOptions,
    parameterize_options: &ParameterizeOptions,
) -> Result<CssResult, PbtkError> {
    let params = input.resolve(store, model, species, parameterize_options)?;
    calc_analytic_css(&params, options)
}

/// Daily oral dose (mg/kg BW/day) that yields `bioactive_conc` (uM) at steady state.
///
/// Uses the concentration kind of `options`; its dose and unit are ignored.
pub fn calc_oral_equivalent_dose(
    params: &ParameterSet,
    bioactive_conc: f64,
    options: &CssOptions,
) -> Result<f64, PbtkError> {
    let unit_css = calc_analytic_css(
        params,
        &CssOptions {
            daily_dose: 1.0,
            output_unit: ConcentrationUnit::Um,
            ..*options
        },
    )?;
    if unit_css.value.is_nan() || unit_css.value <= 0.0 {
        return Err(PbtkError::domain(format!(
            "Css at 1 mg/kg/day is {}, no oral equivalent exists",
            unit_css.value
        )));
    }
    Ok(bioactive_conc / unit_css.value)
}
