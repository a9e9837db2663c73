use pbtk::prelude::data::*;
use pbtk::prelude::*;

pub const CHEMICALS: &str = "\
CAS,Name,DTXSID,logP,MW,logHenry,pKa_Donor,pKa_Accept,class,species,fup,clint,Rblood2plasma
80-05-7,Bisphenol A,DTXSID7020182,3.32,228.29,-10.0,\"9.78,10.39\",none,,Human,0.0385,\"12.1,5.2,20.4,0.0001\",
80-05-7,Bisphenol A,,,,,,,,Rat,0.15,,
335-67-1,PFOA,DTXSID8031865,4.81,414.07,,2.5,none,PFAS,Human,0.005,0,
108-88-3,Toluene,DTXSID7021360,2.73,92.14,-2.18,none,none,,Human,0.1,10.0,
";

pub fn store() -> InMemoryStore {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut store = InMemoryStore::new();
    load_chemicals(&mut store, CHEMICALS.as_bytes()).unwrap();
    store
}

pub fn bpa() -> ChemicalInput {
    ChemicalInput::query(ChemicalQuery::cas("80-05-7"))
}

pub fn toluene() -> ChemicalInput {
    ChemicalInput::query(ChemicalQuery::name("Toluene"))
}

pub fn params(input: &ChemicalInput, model: ModelKind) -> ParameterSet {
    input
        .resolve(&store(), model, Species::Human, &ParameterizeOptions::default())
        .unwrap()
}
