//! Time-course simulation of the dynamic models
//!
//! A [ParameterSet] is turned into its model's [CompartmentSystem](crate::models::CompartmentSystem),
//! doses are converted to µmol at the boundary, and the system is integrated with
//! diffsol's BDF solver between dosing events. Outputs are converted back to the
//! units requested in [SimulationOptions].

pub mod dosing;
pub(crate) mod ode;
pub mod result;

use std::collections::BTreeMap;

use log::{debug, info};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::data::physiology::Species;
use crate::data::store::PropertyStore;
use crate::data::units::{
    amount_from_umol, amount_to_umol, concentration_from_um, concentration_to_um, dose_to_umol,
    AmountUnit, ConcentrationUnit,
};
use crate::models::{ModelKind, OutputKind};
use crate::parameters::{ChemicalInput, Param, ParameterSet, ParameterizeOptions};
use crate::PbtkError;

pub use dosing::{scheduled_exposure, Dose, DosingRequest, DosingSchedule, Route};
pub use result::{SimulationResult, TkStats};

use dosing::forcing_at;
use ode::{Bolus, Tolerances};

/// Controls for a simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationOptions {
    /// Simulated horizon (days)
    pub days: f64,
    /// Output points per hour
    pub tsteps: u32,
    /// Explicit output times (h), replacing the regular grid
    pub times: Option<Vec<f64>>,
    pub rtol: f64,
    pub atol: f64,
    /// Initial amounts by state name, in `amount_unit`; other states start empty
    pub initial_values: BTreeMap<String, f64>,
    pub amount_unit: AmountUnit,
    pub concentration_unit: ConcentrationUnit,
    pub air_concentration_unit: ConcentrationUnit,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            days: 10.0,
            tsteps: 4,
            times: None,
            rtol: 1e-8,
            atol: 1e-12,
            initial_values: BTreeMap::new(),
            amount_unit: AmountUnit::Umol,
            concentration_unit: ConcentrationUnit::Um,
            air_concentration_unit: ConcentrationUnit::Ppmv,
        }
    }
}

impl SimulationOptions {
    pub fn from_json(json: &str) -> Result<Self, PbtkError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_days(mut self, days: f64) -> Self {
        self.days = days;
        self
    }

    pub fn with_tsteps(mut self, tsteps: u32) -> Self {
        self.tsteps = tsteps;
        self
    }

    pub fn with_times(mut self, times: Vec<f64>) -> Self {
        self.times = Some(times);
        self
    }

    pub fn with_initial_value(mut self, state: impl Into<String>, amount: f64) -> Self {
        self.initial_values.insert(state.into(), amount);
        self
    }

    pub fn with_concentration_unit(mut self, unit: ConcentrationUnit) -> Self {
        self.concentration_unit = unit;
        self
    }

    pub fn with_amount_unit(mut self, unit: AmountUnit) -> Self {
        self.amount_unit = unit;
        self
    }

    /// Output times in hours
    pub(crate) fn output_times(&self) -> Result<Vec<f64>, PbtkError> {
        if self.rtol.is_nan() || self.rtol <= 0.0 || self.atol.is_nan() || self.atol <= 0.0 {
            return Err(PbtkError::domain(format!(
                "solver tolerances must be positive (rtol {}, atol {})",
                self.rtol, self.atol
            )));
        }
        if let Some(times) = &self.times {
            if times.is_empty() || times.iter().any(|t| !t.is_finite() || *t < 0.0) {
                return Err(PbtkError::domain(
                    "output times must be a non-empty list of non-negative hours",
                ));
            }
            let mut times = times.clone();
            times.sort_by(|a, b| a.total_cmp(b));
            times.dedup();
            if times[0] > 0.0 {
                times.insert(0, 0.0);
            }
            return Ok(times);
        }
        if self.days.is_nan() || self.days <= 0.0 || self.tsteps == 0 {
            return Err(PbtkError::domain(format!(
                "simulation needs a positive horizon and at least one output per hour \
                 (days {}, tsteps {})",
                self.days, self.tsteps
            )));
        }
        let steps = (self.days * 24.0 * self.tsteps as f64).round() as usize;
        Ok((0..=steps)
            .map(|i| i as f64 / self.tsteps as f64)
            .collect())
    }
}

/// Simulate `params` under `dosing`
pub fn simulate(
    params: &ParameterSet,
    dosing: &DosingSchedule,
    options: &SimulationOptions,
) -> Result<SimulationResult, PbtkError> {
    let model = params.model();
    if options.concentration_unit == ConcentrationUnit::Ppmv {
        return Err(PbtkError::domain(
            "ppmv is an air concentration; body concentrations are reported in uM or mg/L",
        ));
    }
    let system = model.model().system(params)?;
    let mw = params.get(Param::MolecularWeight)?;
    let bw = params.get(Param::BodyWeight)?;
    let times = options.output_times()?;
    let end = times[times.len() - 1];

    let states = system.states();
    let mut initial = vec![0.0; states.len()];
    for (name, amount) in &options.initial_values {
        let index = system.state_index(name).ok_or_else(|| {
            PbtkError::domain(format!("the {} model has no state '{}'", model, name))
        })?;
        initial[index] = amount_to_umol(*amount, options.amount_unit, mw)?;
    }

    let mut boluses = Vec::new();
    let mut forcing = Vec::new();
    match dosing {
        DosingSchedule::Bolus { route, unit, .. } | DosingSchedule::Daily { route, unit, .. } => {
            let administrations = dosing.administrations(end)?;
            if !administrations.is_empty() {
                let state = system.dose_state(*route)?;
                let fraction = system.dose_fraction(*route);
                for dose in administrations {
                    boluses.push(Bolus {
                        time: dose.time,
                        state,
                        amount: dose_to_umol(dose.amount, *unit, mw, bw)? * fraction,
                    });
                }
            }
        }
        DosingSchedule::Forcing { series, unit } => {
            if !system.accepts_forcing() {
                return Err(PbtkError::domain(format!(
                    "the {} model has no inhalation exposure",
                    model
                )));
            }
            for (time, value) in series {
                forcing.push((*time, concentration_to_um(*value, *unit, mw)?));
            }
            forcing.sort_by(|a: &(f64, f64), b| a.0.total_cmp(&b.0));
        }
    }

    info!(
        "Simulating {} model over {} h with {} doses and {} forcing points",
        model,
        end,
        boluses.len(),
        forcing.len()
    );
    let trajectory = ode::integrate(
        system.as_ref(),
        &initial,
        &boluses,
        &forcing,
        &times,
        Tolerances {
            rtol: options.rtol,
            atol: options.atol,
        },
    )?;

    let outputs = system.outputs();
    let mut data = Array2::zeros((times.len(), outputs.len() + 1));
    let mut y = vec![0.0; outputs.len()];
    for (row, (t, x)) in times.iter().zip(&trajectory).enumerate() {
        system.observe(x, forcing_at(&forcing, *t), &mut y);
        data[[row, 0]] = *t;
        for (col, (output, value)) in outputs.iter().zip(&y).enumerate() {
            data[[row, col + 1]] = match output.kind {
                OutputKind::Amount => amount_from_umol(*value, options.amount_unit, mw)?,
                OutputKind::Concentration | OutputKind::Auc => {
                    concentration_from_um(*value, options.concentration_unit, mw)?
                }
                OutputKind::AirConcentration => {
                    concentration_from_um(*value, options.air_concentration_unit, mw)?
                }
            };
        }
    }
    debug!("Simulation of {} produced {} rows", model, times.len());

    let mut columns = vec!["time".to_string()];
    let mut kinds = vec![None];
    let mut units = vec!["h".to_string()];
    for output in outputs {
        columns.push(output.name.to_string());
        kinds.push(Some(output.kind));
        units.push(match output.kind {
            OutputKind::Amount => options.amount_unit.to_string(),
            OutputKind::Concentration => options.concentration_unit.to_string(),
            OutputKind::AirConcentration => options.air_concentration_unit.to_string(),
            OutputKind::Auc => format!("{}*h", options.concentration_unit),
        });
    }

    Ok(SimulationResult::new(
        model,
        columns,
        kinds,
        units,
        data,
        system.plasma_output(),
        params.warnings().clone(),
    ))
}

/// Resolve the chemical (or take its ready parameter set) and simulate it
pub fn solve_model(
    store: &dyn PropertyStore,
    input: &ChemicalInput,
    model: ModelKind,
    species: Species,
    dosing: &DosingRequest,
    options: &SimulationOptions,
    parameterize_options: &ParameterizeOptions,
) -> Result<SimulationResult, PbtkError> {
    let schedule = dosing.resolve()?;
    let params = input.resolve(store, model, species, parameterize_options)?;
    simulate(&params, &schedule, options)
}
