use diffsol::{
    error::{DiffsolError, OdeSolverError},
    ode_solver::method::OdeSolverMethod,
    OdeBuilder, OdeSolverStopReason,
};
use nalgebra::DVector;

use crate::models::CompartmentSystem;
use crate::simulator::dosing::forcing_at;
use crate::PbtkError;

type V = DVector<f64>;
type M = nalgebra::DMatrix<f64>;
type LS = diffsol::NalgebraLU<f64>;

/// Times closer than this are treated as the same event
const TIME_EPS: f64 = 1e-9;

/// Amount added to a state at a point in time
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Bolus {
    pub time: f64,
    pub state: usize,
    /// µmol
    pub amount: f64,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Tolerances {
    pub rtol: f64,
    pub atol: f64,
}

/// Integrate `system` from `initial` at `times[0]`, recording the state at every
/// entry of `times` (sorted ascending).
///
/// Boluses and changes of the forcing series split the horizon into segments; the
/// problem is rebuilt at every segment start. A state recorded at a bolus time
/// already includes the bolus.
pub(crate) fn integrate(
    system: &dyn CompartmentSystem,
    initial: &[f64],
    boluses: &[Bolus],
    forcing: &[(f64, f64)],
    times: &[f64],
    tolerances: Tolerances,
) -> Result<Vec<Vec<f64>>, PbtkError> {
    let nstates = system.states().len();
    if initial.len() != nstates {
        return Err(PbtkError::domain(format!(
            "expected {} initial values, got {}",
            nstates,
            initial.len()
        )));
    }
    let (start, end) = match (times.first(), times.last()) {
        (Some(start), Some(end)) => (*start, *end),
        _ => return Ok(Vec::new()),
    };

    let mut cuts: Vec<f64> = boluses
        .iter()
        .map(|b| b.time)
        .chain(forcing.iter().map(|(t, _)| *t))
        .filter(|t| *t > start && *t < end)
        .collect();
    cuts.push(start);
    cuts.push(end);
    cuts.sort_by(|a, b| a.total_cmp(b));
    cuts.dedup_by(|a, b| (*a - *b).abs() < TIME_EPS);

    let mut boluses = boluses.iter().peekable();
    let mut state = initial.to_vec();
    let mut records = Vec::with_capacity(times.len());
    let mut next_time = 0;

    for (index, &segment_start) in cuts.iter().enumerate() {
        while let Some(bolus) = boluses.next_if(|b| b.time <= segment_start + TIME_EPS) {
            state[bolus.state] += bolus.amount;
        }
        let segment_end = match cuts.get(index + 1) {
            Some(t) => *t,
            None => {
                // Only outputs at the very end remain
                while next_time < times.len() {
                    records.push(state.clone());
                    next_time += 1;
                }
                break;
            }
        };
        let last = index + 2 == cuts.len();
        let mut stops = Vec::new();
        while next_time < times.len()
            && (times[next_time] < segment_end - TIME_EPS || (last && times[next_time] <= end))
        {
            stops.push(times[next_time]);
            next_time += 1;
        }

        let level = forcing_at(forcing, segment_start);
        let (recorded, final_state) = integrate_segment(
            system,
            &state,
            level,
            segment_start,
            segment_end,
            &stops,
            tolerances,
        )?;
        records.extend(recorded);
        state = final_state;
        if last {
            break;
        }
    }

    // Doses at the horizon have no segment of their own
    let at_end: Vec<&Bolus> = boluses.filter(|b| b.time <= end + TIME_EPS).collect();
    if !at_end.is_empty() {
        for (t, record) in times.iter().zip(records.iter_mut()) {
            if (*t - end).abs() < TIME_EPS {
                for bolus in &at_end {
                    record[bolus.state] += bolus.amount;
                }
            }
        }
    }
    Ok(records)
}

fn integrate_segment(
    system: &dyn CompartmentSystem,
    initial: &[f64],
    forcing: f64,
    t0: f64,
    t1: f64,
    stops: &[f64],
    tolerances: Tolerances,
) -> Result<(Vec<Vec<f64>>, Vec<f64>), PbtkError> {
    let nstates = initial.len();
    let y0 = V::from_column_slice(initial);
    let problem = OdeBuilder::<M>::new()
        .t0(t0)
        .rtol(tolerances.rtol)
        .atol(vec![tolerances.atol; nstates])
        .rhs_implicit(
            |x: &V, _p: &V, _t: f64, dx: &mut V| {
                system.rhs(x.as_slice(), forcing, dx.as_mut_slice())
            },
            // The mass balance is linear, so J·v is the unforced rhs at v
            |_x: &V, _p: &V, _t: f64, v: &V, y: &mut V| {
                system.rhs(v.as_slice(), 0.0, y.as_mut_slice())
            },
        )
        .init(move |_p: &V, _t: f64| y0.clone())
        .build()?;
    let mut solver = problem.bdf::<LS>()?;

    let mut recorded = Vec::with_capacity(stops.len());
    for &stop in stops.iter().chain(std::iter::once(&t1)) {
        if stop > solver.state().t + TIME_EPS {
            match solver.set_stop_time(stop) {
                Ok(()) => loop {
                    match solver.step() {
                        Ok(OdeSolverStopReason::TstopReached) => break,
                        Ok(_) => continue,
                        Err(DiffsolError::OdeSolverError(OdeSolverError::StepSizeTooSmall {
                            ..
                        })) => {
                            return Err(PbtkError::NumericalFailure(format!(
                                "step size of the ODE solver went to zero before t = {} h",
                                stop
                            )));
                        }
                        Err(err) => return Err(err.into()),
                    }
                },
                Err(DiffsolError::OdeSolverError(OdeSolverError::StopTimeAtCurrentTime)) => {}
                Err(err) => return Err(err.into()),
            }
        }
        recorded.push(solver.state().y.as_slice().to_vec());
    }
    let final_state = recorded.pop().unwrap_or_else(|| initial.to_vec());
    Ok((recorded, final_state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OutputColumn, OutputKind};
    use crate::simulator::Route;
    use approx::assert_relative_eq;

    /// dA/dt = -k A, with a tracer of the eliminated amount
    struct Decay {
        k: f64,
    }

    const STATES: [&str; 2] = ["A", "Aeliminated"];
    const OUTPUTS: [OutputColumn; 1] = [OutputColumn::new("A", OutputKind::Amount)];

    impl CompartmentSystem for Decay {
        fn states(&self) -> &'static [&'static str] {
            &STATES
        }
        fn outputs(&self) -> &'static [OutputColumn] {
            &OUTPUTS
        }
        fn dose_state(&self, _route: Route) -> Result<usize, PbtkError> {
            Ok(0)
        }
        fn dose_fraction(&self, _route: Route) -> f64 {
            1.0
        }
        fn accepts_forcing(&self) -> bool {
            true
        }
        fn rhs(&self, x: &[f64], forcing: f64, dx: &mut [f64]) {
            dx[0] = forcing - self.k * x[0];
            dx[1] = self.k * x[0];
        }
        fn observe(&self, x: &[f64], _forcing: f64, y: &mut [f64]) {
            y[0] = x[0];
        }
    }

    /// dA/dt = A^2, which is unbounded at t = 1 / A(0)
    struct BlowUp;

    const BLOW_UP_STATES: [&str; 1] = ["A"];

    impl CompartmentSystem for BlowUp {
        fn states(&self) -> &'static [&'static str] {
            &BLOW_UP_STATES
        }
        fn outputs(&self) -> &'static [OutputColumn] {
            &OUTPUTS
        }
        fn dose_state(&self, _route: Route) -> Result<usize, PbtkError> {
            Ok(0)
        }
        fn dose_fraction(&self, _route: Route) -> f64 {
            1.0
        }
        fn rhs(&self, x: &[f64], _forcing: f64, dx: &mut [f64]) {
            dx[0] = x[0] * x[0];
        }
        fn observe(&self, x: &[f64], _forcing: f64, y: &mut [f64]) {
            y[0] = x[0];
        }
    }

    fn tolerances() -> Tolerances {
        Tolerances {
            rtol: 1e-8,
            atol: 1e-10,
        }
    }

    #[test]
    fn follows_exponential_decay() {
        let system = Decay { k: 0.5 };
        let times = [0.0, 1.0, 2.0, 4.0];
        let states = integrate(&system, &[10.0, 0.0], &[], &[], &times, tolerances()).unwrap();
        assert_eq!(states.len(), 4);
        for (t, x) in times.iter().zip(&states) {
            assert_relative_eq!(x[0], 10.0 * (-0.5 * t).exp(), max_relative = 1e-5);
            assert_relative_eq!(x[0] + x[1], 10.0, max_relative = 1e-6);
        }
    }

    #[test]
    fn bolus_is_visible_at_its_own_time() {
        let system = Decay { k: 0.1 };
        let boluses = [
            Bolus {
                time: 0.0,
                state: 0,
                amount: 5.0,
            },
            Bolus {
                time: 2.0,
                state: 0,
                amount: 5.0,
            },
        ];
        let times = [0.0, 1.0, 2.0, 3.0];
        let states = integrate(&system, &[0.0, 0.0], &boluses, &[], &times, tolerances()).unwrap();
        assert_relative_eq!(states[0][0], 5.0, epsilon = 1e-12);
        let expected = 5.0 * (-0.2f64).exp() + 5.0;
        assert_relative_eq!(states[2][0], expected, max_relative = 1e-5);

        // Same schedule, but the second dose falls on the last output time
        let times = [0.0, 1.0, 2.0];
        let states = integrate(&system, &[0.0, 0.0], &boluses, &[], &times, tolerances()).unwrap();
        assert_eq!(states.len(), 3);
        assert_relative_eq!(states[2][0], expected, max_relative = 1e-5);
    }

    #[test]
    fn dose_on_the_horizon_alone_is_recorded() {
        let system = Decay { k: 0.1 };
        let boluses = [Bolus {
            time: 12.0,
            state: 0,
            amount: 3.0,
        }];
        let short = integrate(&system, &[0.0, 0.0], &boluses, &[], &[0.0, 12.0], tolerances())
            .unwrap();
        let long = integrate(
            &system,
            &[0.0, 0.0],
            &boluses,
            &[],
            &[0.0, 12.0, 13.0],
            tolerances(),
        )
        .unwrap();
        assert_eq!(short[0][0], 0.0);
        assert_relative_eq!(short[1][0], 3.0, epsilon = 1e-12);
        assert_relative_eq!(short[1][0], long[1][0], epsilon = 1e-9);
    }

    #[test]
    fn forcing_switches_off() {
        let system = Decay { k: 1.0 };
        let series = [(0.0, 2.0), (5.0, 0.0)];
        let times = [0.0, 5.0, 10.0];
        let states = integrate(&system, &[0.0, 0.0], &[], &series, &times, tolerances()).unwrap();
        let at_five = 2.0 * (1.0 - (-5.0f64).exp());
        assert_relative_eq!(states[1][0], at_five, max_relative = 1e-5);
        assert_relative_eq!(states[2][0], at_five * (-5.0f64).exp(), max_relative = 1e-4);
    }

    #[test]
    fn collapsing_step_size_is_a_numerical_failure() {
        let result = integrate(&BlowUp, &[1.0], &[], &[], &[0.0, 2.0], tolerances());
        assert!(
            matches!(result, Err(PbtkError::NumericalFailure(_))),
            "{:?}",
            result
        );
    }
}
