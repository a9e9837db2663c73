use approx::assert_relative_eq;
use pbtk::prelude::data::*;
use pbtk::prelude::steady_state::*;
use pbtk::prelude::*;

use super::common::{bpa, params, store, toluene};

#[test]
fn css_is_linear_in_dose_for_every_model() {
    for kind in ModelKind::ALL {
        let input = if kind == ModelKind::GasPbtk { toluene() } else { bpa() };
        let set = params(&input, kind);
        let one = calc_analytic_css(&set, &CssOptions::default()).unwrap().value;
        let five = calc_analytic_css(&set, &CssOptions::default().with_daily_dose(5.0))
            .unwrap()
            .value;
        assert!(one > 0.0, "{}", kind);
        assert_relative_eq!(five, 5.0 * one, max_relative = 1e-10);
    }
}

#[test]
fn closed_form_matches_the_dynamic_mass_balance() {
    let rate = 1.0 / 24.0;
    for (kind, input) in [
        (ModelKind::OneCompartment, bpa()),
        (ModelKind::Pbtk, bpa()),
        (ModelKind::GasPbtk, toluene()),
    ] {
        let set = params(&input, kind);
        let analytic = kind.model().css_plasma(&set, rate).unwrap();
        let numeric = numeric_css_plasma(&set, rate).unwrap();
        assert_relative_eq!(analytic, numeric, max_relative = 1e-8);
    }
}

#[test]
fn tissue_css_uses_the_stored_partition_coefficients() {
    for kind in [ModelKind::ThreeCompartmentSs, ModelKind::Pbtk] {
        let set = params(&bpa(), kind);
        let plasma = calc_analytic_css(&set, &CssOptions::default()).unwrap().value;
        let brain = calc_analytic_css(
            &set,
            &CssOptions::default().with_concentration(ConcentrationKind::Tissue(Tissue::Brain)),
        )
        .unwrap()
        .value;
        let k = set.partition().unwrap().get(Tissue::Brain).unwrap();
        let fup = set.get(Param::FunboundPlasma).unwrap();
        assert_relative_eq!(brain, plasma * fup * k, max_relative = 1e-12);
    }
}

#[test]
fn identity_entry_point_matches_parameter_set_entry_point() {
    let by_identity = calc_css(
        &store(),
        &bpa(),
        ModelKind::Pbtk,
        Species::Human,
        &CssOptions::default(),
        &ParameterizeOptions::default(),
    )
    .unwrap();
    let by_params =
        calc_analytic_css(&params(&bpa(), ModelKind::Pbtk), &CssOptions::default()).unwrap();
    assert_eq!(by_identity.value, by_params.value);
    assert_eq!(by_identity.unit, ConcentrationUnit::Um);
}

#[test]
fn oral_equivalent_dose_reaches_the_bioactive_concentration() {
    let set = params(&bpa(), ModelKind::ThreeCompartmentSs);
    let dose = calc_oral_equivalent_dose(&set, 10.0, &CssOptions::default()).unwrap();
    let css = calc_analytic_css(&set, &CssOptions::default().with_daily_dose(dose))
        .unwrap()
        .value;
    assert_relative_eq!(css, 10.0, max_relative = 1e-10);
}

#[test]
fn daily_dosing_approaches_the_analytic_css() {
    let set = params(&bpa(), ModelKind::Pbtk);
    let result = days_to_steady_state(&set, &SteadyStateOptions::default()).unwrap();
    let days = result.days.unwrap();
    assert!(days >= 1);
    assert!(result.average >= 0.9 * result.css);
}

#[test]
fn batch_reports_each_chemical() {
    let queries = vec![
        ChemicalQuery::cas("80-05-7"),
        ChemicalQuery::cas("335-67-1"),
        ChemicalQuery::cas("108-88-3"),
    ];
    let entries = css_batch(
        &store(),
        &queries,
        ModelKind::ThreeCompartmentSs,
        Species::Human,
        &CssOptions::default(),
        &ParameterizeOptions::default(),
        false,
    );
    assert!(entries[0].result.is_ok());
    assert!(matches!(
        entries[1].result,
        Err(PbtkError::NotApplicable { .. })
    ));
    assert!(matches!(
        entries[2].result,
        Err(PbtkError::NotApplicable { .. })
    ));
}
