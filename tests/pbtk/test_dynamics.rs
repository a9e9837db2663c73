use approx::assert_relative_eq;
use pbtk::prelude::data::*;
use pbtk::prelude::simulator::*;
use pbtk::prelude::steady_state::*;
use pbtk::prelude::*;

use super::common::{bpa, params, store, toluene};

const BODY: [&str; 10] = [
    "Agutlumen",
    "Agut",
    "Aliver",
    "Aven",
    "Alung",
    "Aart",
    "Arest",
    "Akidney",
    "Atubules",
    "Ametabolized",
];

fn body_amount(result: &SimulationResult, row: usize) -> f64 {
    BODY.iter()
        .map(|name| result.column(name).unwrap()[row])
        .sum()
}

#[test]
fn oral_dose_is_conserved_in_the_pbtk_model() {
    let set = params(&bpa(), ModelKind::Pbtk);
    let result = simulate(
        &set,
        &DosingSchedule::oral(1.0, DoseUnit::MgPerKg),
        &SimulationOptions::default().with_days(2.0),
    )
    .unwrap();

    let dose = set.get(Param::BodyWeight).unwrap() / set.get(Param::MolecularWeight).unwrap()
        * 1000.0
        * set.get(Param::Fabsgut).unwrap();
    for row in 0..result.len() {
        assert_relative_eq!(body_amount(&result, row), dose, max_relative = 1e-5);
    }
    assert_eq!(result.unit("Aliver"), Some("umol"));
}

#[test]
fn no_exposure_leaves_every_output_at_zero() {
    let set = params(&bpa(), ModelKind::Pbtk);
    let result = simulate(
        &set,
        &DosingSchedule::none(),
        &SimulationOptions::default().with_days(1.0),
    )
    .unwrap();
    for name in result.columns().iter().skip(1) {
        assert!(
            result.column(name).unwrap().iter().all(|v| *v == 0.0),
            "{} is not zero",
            name
        );
    }
}

#[test]
fn single_dose_auc_matches_daily_steady_state() {
    let set = params(&bpa(), ModelKind::OneCompartment);
    let kelim = set.get(Param::Kelim).unwrap();
    let end = 40.0 / kelim;
    let result = simulate(
        &set,
        &DosingSchedule::oral(2.0, DoseUnit::MgPerKg),
        &SimulationOptions::default().with_times(vec![0.0, end / 2.0, end]),
    )
    .unwrap();
    let css = calc_analytic_css(&set, &CssOptions::default().with_daily_dose(2.0))
        .unwrap()
        .value;
    let stats = result.tk_stats().unwrap();
    assert_relative_eq!(stats.auc, 24.0 * css, max_relative = 1e-4);
    assert_relative_eq!(stats.mean, stats.auc / end, max_relative = 1e-12);
}

#[test]
fn inhaled_amount_balances_the_body_in_the_gas_model() {
    let set = params(&toluene(), ModelKind::GasPbtk);
    let series = scheduled_exposure(0.0, 10.0, 24.0, 8.0, 2.0).unwrap();
    let result = simulate(
        &set,
        &DosingSchedule::Forcing {
            series,
            unit: ConcentrationUnit::Ppmv,
        },
        &SimulationOptions::default().with_days(2.0),
    )
    .unwrap();

    let inhaled = result.column("Ainh").unwrap();
    let exhaled = result.column("Aexh").unwrap();
    let last = result.len() - 1;
    assert!(inhaled[last] > 0.0);
    for row in 0..result.len() {
        let net = inhaled[row] - exhaled[row];
        assert_relative_eq!(
            body_amount(&result, row),
            net,
            epsilon = 1e-6 * inhaled[last],
            max_relative = 1e-5
        );
    }

    let times = result.times();
    let mixed = result.column("Cmixexh").unwrap();
    let during = times.iter().position(|t| *t == 4.0).unwrap();
    assert!(mixed[during] > 0.0);
    assert_eq!(result.unit("Cmixexh"), Some("ppmv"));
}

#[test]
fn forcing_needs_the_gas_model() {
    let set = params(&bpa(), ModelKind::Pbtk);
    let forcing = DosingSchedule::Forcing {
        series: vec![(0.0, 1.0)],
        unit: ConcentrationUnit::Um,
    };
    assert!(matches!(
        simulate(&set, &forcing, &SimulationOptions::default()),
        Err(PbtkError::Domain(_))
    ));
}

#[test]
fn conflicting_dosing_modes_are_rejected() {
    let request = DosingRequest {
        bolus: Some(DosingSchedule::oral(1.0, DoseUnit::MgPerKg)),
        daily: Some(DosingSchedule::daily(Route::Oral, 1.0, 1, DoseUnit::MgPerKg)),
        forcing: None,
    };
    let result = solve_model(
        &store(),
        &bpa(),
        ModelKind::Pbtk,
        Species::Human,
        &request,
        &SimulationOptions::default(),
        &ParameterizeOptions::default(),
    );
    assert!(matches!(result, Err(PbtkError::Domain(_))));
}

#[test]
fn daily_dosing_by_identity_accumulates() {
    let request = DosingRequest {
        daily: Some(DosingSchedule::daily(Route::Oral, 1.0, 2, DoseUnit::MgPerKg)),
        ..Default::default()
    };
    let result = solve_model(
        &store(),
        &bpa(),
        ModelKind::Pbtk,
        Species::Human,
        &request,
        &SimulationOptions::default().with_days(3.0),
        &ParameterizeOptions::default(),
    )
    .unwrap();
    assert_eq!(result.model(), ModelKind::Pbtk);
    let plasma = result.plasma().unwrap();
    assert!(plasma.iter().all(|c| *c >= 0.0));

    let stats = result.tk_stats().unwrap();
    assert!(stats.peak > 0.0);
    assert!(stats.tmax > 0.0);
    let auc = result.column("AUC").unwrap();
    assert_eq!(stats.auc, auc[result.len() - 1]);
}

#[test]
fn unknown_initial_state_is_rejected() {
    let set = params(&bpa(), ModelKind::Pbtk);
    let options = SimulationOptions::default().with_initial_value("Aspleen", 1.0);
    assert!(matches!(
        simulate(&set, &DosingSchedule::none(), &options),
        Err(PbtkError::Domain(_))
    ));
}
