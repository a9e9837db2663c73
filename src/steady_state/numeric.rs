//! Steady state from the dynamic models
//!
//! [numeric_css_plasma] solves the linear mass balance directly; [days_to_steady_state]
//! integrates repeated daily dosing until the daily mean plasma concentration gets
//! close to the analytic Css.

use log::{debug, info};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::data::units::{dose_to_umol, DoseUnit};
use crate::models::CompartmentSystem;
use crate::parameters::{Param, ParameterSet};
use crate::simulator::ode::{integrate, Bolus, Tolerances};
use crate::simulator::Route;
use crate::steady_state::{calc_analytic_css, CssOptions};
use crate::PbtkError;

/// Days integrated per solver run
const BLOCK_DAYS: u32 = 30;

fn plasma_index(system: &dyn CompartmentSystem) -> Result<usize, PbtkError> {
    let name = system.plasma_output();
    system
        .outputs()
        .iter()
        .position(|o| o.name == name)
        .ok_or_else(|| PbtkError::missing(name, "model outputs"))
}

/// Plasma Css (mg/L) for a constant oral dose rate (mg/kg/h), from the model's
/// dynamic form rather than its closed-form expression
pub fn numeric_css_plasma(params: &ParameterSet, dose_rate: f64) -> Result<f64, PbtkError> {
    let system = params.model().model().system(params)?;
    let system = system.as_ref();
    let n = system.states().len();

    let mut jacobian = DMatrix::zeros(n, n);
    let mut unit = vec![0.0; n];
    let mut column = vec![0.0; n];
    for j in 0..n {
        unit[j] = 1.0;
        system.rhs(&unit, 0.0, &mut column);
        unit[j] = 0.0;
        for (i, value) in column.iter().enumerate() {
            jacobian[(i, j)] = *value;
        }
    }

    // States nothing depends on only accumulate (AUC, eliminated amounts)
    let active: Vec<usize> = (0..n)
        .filter(|&j| jacobian.column(j).iter().any(|v| *v != 0.0))
        .collect();

    let mut input = vec![0.0; n];
    let dose_state = system.dose_state(Route::Oral)?;
    input[dose_state] =
        dose_rate * params.get(Param::BodyWeight)? * system.dose_fraction(Route::Oral);

    let reduced = DMatrix::from_fn(active.len(), active.len(), |i, j| {
        jacobian[(active[i], active[j])]
    });
    let rhs = DVector::from_fn(active.len(), |i, _| -input[active[i]]);
    let solution = reduced.lu().solve(&rhs).ok_or_else(|| {
        PbtkError::NumericalFailure(format!(
            "the {} mass balance has no steady state (singular system)",
            params.model()
        ))
    })?;

    let mut state = vec![0.0; n];
    for (i, &j) in active.iter().enumerate() {
        state[j] = solution[i];
    }
    let mut y = vec![0.0; system.outputs().len()];
    system.observe(&state, 0.0, &mut y);
    Ok(y[plasma_index(system)?])
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteadyStateOptions {
    /// Oral dose (mg/kg BW/day)
    pub daily_dose: f64,
    pub doses_per_day: u32,
    /// Fraction of the analytic Css the daily mean has to reach
    pub fraction: f64,
    pub max_days: u32,
    pub rtol: f64,
    pub atol: f64,
}

impl Default for SteadyStateOptions {
    fn default() -> Self {
        Self {
            daily_dose: 1.0,
            doses_per_day: 1,
            fraction: 0.9,
            max_days: 3650,
            rtol: 1e-8,
            atol: 1e-12,
        }
    }
}

impl SteadyStateOptions {
    pub fn with_fraction(mut self, fraction: f64) -> Self {
        self.fraction = fraction;
        self
    }

    pub fn with_max_days(mut self, max_days: u32) -> Self {
        self.max_days = max_days;
        self
    }

    pub fn with_doses_per_day(mut self, doses_per_day: u32) -> Self {
        self.doses_per_day = doses_per_day;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SteadyStateDays {
    /// First day whose mean plasma concentration reached the target, if any
    pub days: Option<u32>,
    /// Analytic plasma Css (uM)
    pub css: f64,
    /// Mean plasma concentration (uM) over the last simulated day
    pub average: f64,
}

/// Days of daily oral dosing until the mean plasma concentration of a day reaches
/// `fraction` of the analytic Css
pub fn days_to_steady_state(
    params: &ParameterSet,
    options: &SteadyStateOptions,
) -> Result<SteadyStateDays, PbtkError> {
    if options.doses_per_day == 0 {
        return Err(PbtkError::domain("doses_per_day must be at least 1"));
    }
    if options.fraction.is_nan() || options.fraction <= 0.0 || options.fraction > 1.0 {
        return Err(PbtkError::domain(format!(
            "steady-state fraction must lie in (0, 1], got {}",
            options.fraction
        )));
    }
    let css = calc_analytic_css(
        params,
        &CssOptions::default().with_daily_dose(options.daily_dose),
    )?
    .value;
    let target = options.fraction * css;

    let system = params.model().model().system(params)?;
    let system = system.as_ref();
    let auc = system
        .state_index("AUC")
        .ok_or_else(|| PbtkError::missing("AUC", "model states"))?;
    let dose_state = system.dose_state(Route::Oral)?;
    let per_dose = dose_to_umol(
        options.daily_dose / options.doses_per_day as f64,
        DoseUnit::MgPerKg,
        params.get(Param::MolecularWeight)?,
        params.get(Param::BodyWeight)?,
    )? * system.dose_fraction(Route::Oral);
    let interval = 24.0 / options.doses_per_day as f64;
    let tolerances = Tolerances {
        rtol: options.rtol,
        atol: options.atol,
    };

    let mut state = vec![0.0; system.states().len()];
    let mut day = 0;
    let mut previous_auc = 0.0;
    let mut average = 0.0;
    while day < options.max_days {
        let block = BLOCK_DAYS.min(options.max_days - day);
        let times: Vec<f64> = (0..=block).map(|d| d as f64 * 24.0).collect();
        let boluses: Vec<Bolus> = (0..block * options.doses_per_day)
            .map(|k| Bolus {
                time: k as f64 * interval,
                state: dose_state,
                amount: per_dose,
            })
            .collect();
        let trajectory = integrate(system, &state, &boluses, &[], &times, tolerances)?;
        for x in trajectory.iter().skip(1) {
            day += 1;
            average = (x[auc] - previous_auc) / 24.0;
            previous_auc = x[auc];
            if average >= target {
                info!(
                    "{} reaches {} of Css after {} days",
                    params.model(),
                    options.fraction,
                    day
                );
                return Ok(SteadyStateDays {
                    days: Some(day),
                    css,
                    average,
                });
            }
        }
        if let Some(last) = trajectory.last() {
            state.clone_from(last);
        }
        debug!("day {}: mean plasma {} uM, target {} uM", day, average, target);
    }
    info!(
        "{} does not reach {} of Css within {} days",
        params.model(),
        options.fraction,
        options.max_days
    );
    Ok(SteadyStateDays {
        days: None,
        css,
        average,
    })
}
