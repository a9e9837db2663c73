use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::units::{ConcentrationUnit, DoseUnit};
use crate::PbtkError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Route {
    #[default]
    Oral,
    Iv,
    Inhalation,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Oral => write!(f, "oral"),
            Route::Iv => write!(f, "iv"),
            Route::Inhalation => write!(f, "inhalation"),
        }
    }
}

/// A single administration at `time` hours
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dose {
    pub time: f64,
    pub amount: f64,
}

impl Dose {
    pub fn new(time: f64, amount: f64) -> Self {
        Self { time, amount }
    }
}

/// Exposure of one simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DosingSchedule {
    /// Individual doses
    Bolus {
        route: Route,
        doses: Vec<Dose>,
        unit: DoseUnit,
    },
    /// `daily_dose` split evenly over `doses_per_day` administrations every day
    Daily {
        route: Route,
        daily_dose: f64,
        doses_per_day: u32,
        unit: DoseUnit,
    },
    /// Step function of inhaled concentration; each `(time, value)` holds until
    /// the next entry
    Forcing {
        series: Vec<(f64, f64)>,
        unit: ConcentrationUnit,
    },
}

impl DosingSchedule {
    /// No exposure at all
    pub fn none() -> Self {
        DosingSchedule::Bolus {
            route: Route::Oral,
            doses: Vec::new(),
            unit: DoseUnit::MgPerKg,
        }
    }

    /// A single oral dose at time zero
    pub fn oral(amount: f64, unit: DoseUnit) -> Self {
        DosingSchedule::Bolus {
            route: Route::Oral,
            doses: vec![Dose::new(0.0, amount)],
            unit,
        }
    }

    pub fn daily(route: Route, daily_dose: f64, doses_per_day: u32, unit: DoseUnit) -> Self {
        DosingSchedule::Daily {
            route,
            daily_dose,
            doses_per_day,
            unit,
        }
    }

    /// Expand into `(time, amount)` administrations up to `end` hours
    pub(crate) fn administrations(&self, end: f64) -> Result<Vec<Dose>, PbtkError> {
        match self {
            DosingSchedule::Bolus { doses, .. } => {
                let mut doses: Vec<Dose> = doses
                    .iter()
                    .filter(|d| d.time <= end)
                    .copied()
                    .collect();
                doses.sort_by(|a, b| a.time.total_cmp(&b.time));
                Ok(doses)
            }
            DosingSchedule::Daily {
                daily_dose,
                doses_per_day,
                ..
            } => {
                if *doses_per_day == 0 {
                    return Err(PbtkError::domain("doses_per_day must be at least 1"));
                }
                let interval = 24.0 / *doses_per_day as f64;
                let amount = daily_dose / *doses_per_day as f64;
                let count = (end / interval).floor() as usize;
                Ok((0..=count)
                    .map(|k| Dose::new(k as f64 * interval, amount))
                    .filter(|d| d.time < end)
                    .collect())
            }
            DosingSchedule::Forcing { .. } => Ok(Vec::new()),
        }
    }

    pub fn route(&self) -> Route {
        match self {
            DosingSchedule::Bolus { route, .. } | DosingSchedule::Daily { route, .. } => *route,
            DosingSchedule::Forcing { .. } => Route::Inhalation,
        }
    }
}

/// Dosing arguments as supplied by a caller; at most one mode may be set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DosingRequest {
    pub bolus: Option<DosingSchedule>,
    pub daily: Option<DosingSchedule>,
    pub forcing: Option<DosingSchedule>,
}

impl DosingRequest {
    pub fn resolve(&self) -> Result<DosingSchedule, PbtkError> {
        let selected: Vec<&DosingSchedule> = [&self.bolus, &self.daily, &self.forcing]
            .into_iter()
            .flatten()
            .collect();
        match selected.as_slice() {
            [] => Ok(DosingSchedule::none()),
            [one] => Ok((*one).clone()),
            _ => Err(PbtkError::domain(
                "only one of bolus doses, daily dosing and a forcing series may be given",
            )),
        }
    }
}

/// Cyclic exposure: `conc` switched on at the start of every period for
/// `duration` hours, over `days` days.
///
/// ```
/// use pbtk::simulator::scheduled_exposure;
///
/// let series = scheduled_exposure(0.0, 5.0, 24.0, 12.0, 2.0).unwrap();
/// assert_eq!(series, vec![(0.0, 5.0), (12.0, 0.0), (24.0, 5.0), (36.0, 0.0)]);
/// ```
pub fn scheduled_exposure(
    start: f64,
    conc: f64,
    period: f64,
    duration: f64,
    days: f64,
) -> Result<Vec<(f64, f64)>, PbtkError> {
    if duration > period {
        return Err(PbtkError::domain(format!(
            "exposure duration {} h exceeds the period of {} h",
            duration, period
        )));
    }
    if period.is_nan() || period <= 0.0 || duration < 0.0 {
        return Err(PbtkError::domain(format!(
            "invalid exposure cycle: period {} h, duration {} h",
            period, duration
        )));
    }
    let cycles = (days * 24.0 / period).ceil().max(0.0) as usize;
    let mut series = Vec::with_capacity(2 * cycles);
    for k in 0..cycles {
        let on = start + k as f64 * period;
        series.push((on, conc));
        series.push((on + duration, 0.0));
    }
    Ok(series)
}

/// Value of a step-function series at `t`; zero before the first entry
pub(crate) fn forcing_at(series: &[(f64, f64)], t: f64) -> f64 {
    series
        .iter()
        .take_while(|(time, _)| *time <= t)
        .last()
        .map(|(_, value)| *value)
        .unwrap_or(0.0)
}
