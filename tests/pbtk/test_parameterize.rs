use pbtk::prelude::data::*;
use pbtk::prelude::*;

use super::common::{bpa, params, store, toluene};

#[test]
fn every_model_gets_its_required_parameters() {
    for kind in ModelKind::ALL {
        let input = if kind == ModelKind::GasPbtk { toluene() } else { bpa() };
        let set = params(&input, kind);
        assert_eq!(set.model(), kind);
        for param in kind.model().required_parameters() {
            assert!(set.get(*param).is_ok(), "{} lacks {}", kind, param);
        }
    }
}

#[test]
fn fraction_unbound_is_lipid_corrected_and_positive() {
    let set = params(&bpa(), ModelKind::Pbtk);
    let fup = set.get(Param::FunboundPlasma).unwrap();
    assert!(fup > 0.0);
    assert!(fup < 0.0385);
    assert!(set.warnings().is_empty());
}

#[test]
fn pfas_is_excluded_unless_class_exclusion_is_off() {
    let input = ChemicalInput::query(ChemicalQuery::cas("335-67-1"));
    let excluded = input.resolve(
        &store(),
        ModelKind::Pbtk,
        Species::Human,
        &ParameterizeOptions::default(),
    );
    assert!(matches!(excluded, Err(PbtkError::NotApplicable { .. })));

    let allowed = input.resolve(
        &store(),
        ModelKind::Pbtk,
        Species::Human,
        &ParameterizeOptions::default().with_class_exclude(false),
    );
    assert!(allowed.is_ok());
}

#[test]
fn volatile_chemicals_need_the_gas_model() {
    let options = ParameterizeOptions::default();
    let oral = toluene().resolve(&store(), ModelKind::Pbtk, Species::Human, &options);
    assert!(matches!(oral, Err(PbtkError::NotApplicable { .. })));

    let gas = params(&toluene(), ModelKind::GasPbtk);
    assert!(gas.get(Param::Kblood2air).unwrap() > 0.0);

    let unchecked = toluene().resolve(
        &store(),
        ModelKind::Pbtk,
        Species::Human,
        &options.with_physchem_exclude(false),
    );
    assert!(unchecked.is_ok());
}

#[test]
fn non_restrictive_clearance_is_not_lower() {
    let restrictive = params(&bpa(), ModelKind::OneCompartment);
    let non_restrictive = bpa()
        .resolve(
            &store(),
            ModelKind::OneCompartment,
            Species::Human,
            &ParameterizeOptions::default().with_restrictive_clearance(false),
        )
        .unwrap();
    assert!(
        non_restrictive.get(Param::HepaticClearance).unwrap()
            >= restrictive.get(Param::HepaticClearance).unwrap()
    );
}

#[test]
fn rat_uses_human_values_only_when_asked() {
    let options = ParameterizeOptions::default();
    let rat = bpa().resolve(&store(), ModelKind::Pbtk, Species::Rat, &options);
    assert!(matches!(rat, Err(PbtkError::MissingParameter { .. })));

    let substituted = bpa()
        .resolve(
            &store(),
            ModelKind::Pbtk,
            Species::Rat,
            &options.with_default_to_human(true),
        )
        .unwrap();
    let rat_physiology = PhysiologyProfile::reference(Species::Rat).unwrap();
    assert_eq!(
        substituted.get(Param::BodyWeight).unwrap(),
        rat_physiology.body_weight
    );
}

#[test]
fn unknown_and_conflicting_identities_are_identity_errors() {
    let options = ParameterizeOptions::default();
    let unknown = ChemicalInput::query(ChemicalQuery::cas("1-2-3"));
    assert!(matches!(
        unknown.resolve(&store(), ModelKind::Pbtk, Species::Human, &options),
        Err(PbtkError::Identity(_))
    ));

    let conflicting =
        ChemicalInput::query(ChemicalQuery::cas("80-05-7").with_name("Toluene"));
    assert!(matches!(
        conflicting.resolve(&store(), ModelKind::Pbtk, Species::Human, &options),
        Err(PbtkError::Identity(_))
    ));
}

#[test]
fn a_prebuilt_parameter_set_wins_over_the_query() {
    let set = params(&bpa(), ModelKind::ThreeCompartmentSs);
    let input = toluene().with_parameters(set.clone());
    let resolved = input
        .resolve(
            &store(),
            ModelKind::ThreeCompartmentSs,
            Species::Human,
            &ParameterizeOptions::default(),
        )
        .unwrap();
    assert_eq!(resolved, set);
    assert!(ChemicalInput::default()
        .resolve(
            &store(),
            ModelKind::Pbtk,
            Species::Human,
            &ParameterizeOptions::default()
        )
        .is_err());
}

#[test]
fn half_life_follows_elimination_rate() {
    let set = params(&bpa(), ModelKind::OneCompartment);
    let kelim = set.get(Param::Kelim).unwrap();
    let half_life = pbtk::parameters::calc_half_life(kelim).unwrap();
    assert!((half_life * kelim - std::f64::consts::LN_2).abs() < 1e-12);
}
