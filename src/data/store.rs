//! Read-only property store contract
//!
//! The chemical property database is an external collaborator. Everything in this
//! crate reaches it through [PropertyStore], passed explicitly to every entry point.
//! [InMemoryStore] is a plain table implementation, fed programmatically or from CSV
//! (see [crate::data::parser]).

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::chemical::{ChemicalIdentity, ChemicalQuery, PropertyValue};
use crate::data::physiology::{PhysiologyProfile, Species};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Property {
    LogP,
    PkaDonor,
    PkaAccept,
    MolecularWeight,
    LogHenry,
    WaterSolubility,
    MeltingPoint,
    ChemicalClass,
    FunboundPlasma,
    Clint,
    Rblood2plasma,
}

impl Property {
    /// In-vitro measurements are made per species; phys-chem properties are not
    pub fn is_species_specific(&self) -> bool {
        matches!(
            self,
            Property::FunboundPlasma | Property::Clint | Property::Rblood2plasma
        )
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Property::LogP => "logP",
            Property::PkaDonor => "pKa_Donor",
            Property::PkaAccept => "pKa_Accept",
            Property::MolecularWeight => "MW",
            Property::LogHenry => "logHenry",
            Property::WaterSolubility => "logWSol",
            Property::MeltingPoint => "MP",
            Property::ChemicalClass => "Chemical.Class",
            Property::FunboundPlasma => "Funbound.plasma",
            Property::Clint => "Clint",
            Property::Rblood2plasma => "Rblood2plasma",
        };
        write!(f, "{}", name)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("No chemical matches {query}")]
    ChemicalNotFound { query: String },

    #[error("Identifiers {query} match different chemicals: {matches:?}")]
    AmbiguousIdentity { query: String, matches: Vec<String> },

    /// The property was never measured for this chemical
    #[error("{property} is not available for {chemical}")]
    MissingProperty { property: Property, chemical: String },

    /// The chemical has no record at all for the requested species
    #[error("{property} for {chemical} is not available in {species}")]
    NotApplicableForSpecies {
        property: Property,
        chemical: String,
        species: Species,
    },

    #[error("Unknown species: {0}")]
    UnknownSpecies(String),
}

/// Query contract of the chemical property database
pub trait PropertyStore: Send + Sync {
    fn resolve_identity(&self, query: &ChemicalQuery) -> Result<ChemicalIdentity, StoreError>;

    fn get_property(
        &self,
        property: Property,
        identity: &ChemicalIdentity,
        species: Species,
    ) -> Result<PropertyValue, StoreError>;

    fn get_physiology(&self, species: Species) -> Result<PhysiologyProfile, StoreError>;
}

/// One chemical row: phys-chem values plus per-species in-vitro measurements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChemicalRecord {
    pub identity: ChemicalIdentity,
    pub physchem: HashMap<Property, PropertyValue>,
    pub measured: HashMap<Species, HashMap<Property, PropertyValue>>,
}

impl ChemicalRecord {
    pub fn new(identity: ChemicalIdentity) -> Self {
        Self {
            identity,
            physchem: HashMap::new(),
            measured: HashMap::new(),
        }
    }

    pub fn physchem(mut self, property: Property, value: impl Into<PropertyValue>) -> Self {
        self.physchem.insert(property, value.into());
        self
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        let class = class.into();
        match self.physchem.get_mut(&Property::ChemicalClass) {
            Some(PropertyValue::Text(classes)) => classes.push(class),
            _ => {
                self.physchem
                    .insert(Property::ChemicalClass, PropertyValue::Text(vec![class]));
            }
        }
        self
    }

    pub fn measured(
        mut self,
        species: Species,
        property: Property,
        value: impl Into<PropertyValue>,
    ) -> Self {
        self.measured
            .entry(species)
            .or_default()
            .insert(property, value.into());
        self
    }

    fn matches_cas(&self, cas: &str) -> bool {
        self.identity.cas.eq_ignore_ascii_case(cas.trim())
    }

    fn matches_name(&self, name: &str) -> bool {
        self.identity.name.eq_ignore_ascii_case(name.trim())
    }

    fn matches_dtxsid(&self, dtxsid: &str) -> bool {
        self.identity
            .dtxsid
            .as_deref()
            .is_some_and(|d| d.eq_ignore_ascii_case(dtxsid.trim()))
    }
}

/// Table-backed [PropertyStore]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryStore {
    chemicals: Vec<ChemicalRecord>,
    physiology: HashMap<Species, PhysiologyProfile>,
}

impl InMemoryStore {
    /// A store with the reference physiology for all known species and no chemicals
    pub fn new() -> Self {
        let physiology = Species::ALL
            .iter()
            .filter_map(|&s| PhysiologyProfile::reference(s).ok().map(|p| (s, p)))
            .collect();
        Self {
            chemicals: Vec::new(),
            physiology,
        }
    }

    /// Add a chemical, replacing any record with the same CAS number
    pub fn add_chemical(&mut self, record: ChemicalRecord) {
        let cas = record.identity.cas.clone();
        match self.chemicals.iter_mut().find(|r| r.matches_cas(&cas)) {
            Some(existing) => *existing = record,
            None => self.chemicals.push(record),
        }
    }

    pub fn with_chemical(mut self, record: ChemicalRecord) -> Self {
        self.add_chemical(record);
        self
    }

    pub fn set_physiology(&mut self, profile: PhysiologyProfile) {
        self.physiology.insert(profile.species, profile);
    }

    pub fn chemicals(&self) -> &[ChemicalRecord] {
        &self.chemicals
    }

    pub fn record_mut(&mut self, cas: &str) -> Option<&mut ChemicalRecord> {
        self.chemicals.iter_mut().find(|r| r.matches_cas(cas))
    }

    fn record(&self, identity: &ChemicalIdentity) -> Option<&ChemicalRecord> {
        self.chemicals.iter().find(|r| r.matches_cas(&identity.cas))
    }
}

impl PropertyStore for InMemoryStore {
    fn resolve_identity(&self, query: &ChemicalQuery) -> Result<ChemicalIdentity, StoreError> {
        let positions = |pred: &dyn Fn(&ChemicalRecord) -> bool| -> Vec<usize> {
            self.chemicals
                .iter()
                .enumerate()
                .filter(|(_, r)| pred(r))
                .map(|(i, _)| i)
                .collect()
        };

        // Hits of every identifier the query supplies
        let mut keys: Vec<Vec<usize>> = Vec::new();
        if let Some(cas) = &query.cas {
            keys.push(positions(&|r| r.matches_cas(cas)));
        }
        if let Some(dtxsid) = &query.dtxsid {
            keys.push(positions(&|r| r.matches_dtxsid(dtxsid)));
        }
        if let Some(name) = &query.name {
            keys.push(positions(&|r| r.matches_name(name)));
        }

        let describe = |hits: &[usize]| -> Vec<String> {
            let mut matches: Vec<String> = hits
                .iter()
                .map(|&i| self.chemicals[i].identity.to_string())
                .collect();
            matches.sort();
            matches.dedup();
            matches
        };

        let matched: Vec<usize> = keys.iter().flatten().copied().collect();
        if keys.iter().any(|hits| hits.is_empty()) {
            // An identifier naming no chemical conflicts with any that does
            return if matched.is_empty() {
                Err(StoreError::ChemicalNotFound {
                    query: query.to_string(),
                })
            } else {
                Err(StoreError::AmbiguousIdentity {
                    query: query.to_string(),
                    matches: describe(&matched[..]),
                })
            };
        }

        let mut candidates = match keys.first() {
            Some(first) => first.clone(),
            None => {
                return Err(StoreError::ChemicalNotFound {
                    query: query.to_string(),
                })
            }
        };
        for hits in &keys[1..] {
            if hits.iter().any(|h| !candidates.contains(h)) {
                return Err(StoreError::AmbiguousIdentity {
                    query: query.to_string(),
                    matches: describe(&matched[..]),
                });
            }
            candidates = hits.clone();
        }

        match candidates.as_slice() {
            [single] => Ok(self.chemicals[*single].identity.clone()),
            many => Err(StoreError::AmbiguousIdentity {
                query: query.to_string(),
                matches: describe(many),
            }),
        }
    }

    fn get_property(
        &self,
        property: Property,
        identity: &ChemicalIdentity,
        species: Species,
    ) -> Result<PropertyValue, StoreError> {
        let record = self
            .record(identity)
            .ok_or_else(|| StoreError::ChemicalNotFound {
                query: identity.to_string(),
            })?;

        if !property.is_species_specific() {
            return record
                .physchem
                .get(&property)
                .cloned()
                .ok_or_else(|| StoreError::MissingProperty {
                    property,
                    chemical: identity.to_string(),
                });
        }

        match record.measured.get(&species) {
            None => Err(StoreError::NotApplicableForSpecies {
                property,
                chemical: identity.to_string(),
                species,
            }),
            Some(values) => values
                .get(&property)
                .cloned()
                .ok_or_else(|| StoreError::MissingProperty {
                    property,
                    chemical: identity.to_string(),
                }),
        }
    }

    fn get_physiology(&self, species: Species) -> Result<PhysiologyProfile, StoreError> {
        self.physiology
            .get(&species)
            .cloned()
            .ok_or_else(|| StoreError::UnknownSpecies(species.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> InMemoryStore {
        InMemoryStore::new()
            .with_chemical(
                ChemicalRecord::new(
                    ChemicalIdentity::new("80-05-7", "Bisphenol A").with_dtxsid("DTXSID7020182"),
                )
                .physchem(Property::LogP, 3.32)
                .measured(Species::Human, Property::FunboundPlasma, 0.0385),
            )
            .with_chemical(
                ChemicalRecord::new(ChemicalIdentity::new("58-08-2", "Caffeine"))
                    .physchem(Property::LogP, -0.07),
            )
    }

    #[test]
    fn resolves_by_any_identifier() {
        let store = store();
        for query in [
            ChemicalQuery::cas("80-05-7"),
            ChemicalQuery::name("bisphenol a"),
            ChemicalQuery::dtxsid("DTXSID7020182"),
        ] {
            assert_eq!(store.resolve_identity(&query).unwrap().cas, "80-05-7");
        }
    }

    #[test]
    fn conflicting_identifiers_are_ambiguous() {
        let query = ChemicalQuery::cas("80-05-7").with_name("Caffeine");
        assert!(matches!(
            store().resolve_identity(&query),
            Err(StoreError::AmbiguousIdentity { .. })
        ));
    }

    #[test]
    fn identifier_matching_nothing_conflicts_with_one_that_does() {
        let query = ChemicalQuery::cas("80-05-7").with_name("Not A Chemical");
        assert!(matches!(
            store().resolve_identity(&query),
            Err(StoreError::AmbiguousIdentity { .. })
        ));
        let query = ChemicalQuery::cas("80-05-7").with_name("Bisphenol A");
        assert_eq!(store().resolve_identity(&query).unwrap().cas, "80-05-7");
        let query = ChemicalQuery::cas("1-2-3").with_name("Nothing");
        assert!(matches!(
            store().resolve_identity(&query),
            Err(StoreError::ChemicalNotFound { .. })
        ));
    }

    #[test]
    fn unknown_chemical_is_not_found() {
        assert!(matches!(
            store().resolve_identity(&ChemicalQuery::cas("1-2-3")),
            Err(StoreError::ChemicalNotFound { .. })
        ));
    }

    #[test]
    fn missing_and_not_applicable_are_distinct() {
        let store = store();
        let bpa = store.resolve_identity(&ChemicalQuery::cas("80-05-7")).unwrap();
        assert!(matches!(
            store.get_property(Property::Clint, &bpa, Species::Human),
            Err(StoreError::MissingProperty { .. })
        ));
        assert!(matches!(
            store.get_property(Property::FunboundPlasma, &bpa, Species::Rat),
            Err(StoreError::NotApplicableForSpecies { .. })
        ));
    }

    #[test]
    fn adding_a_chemical_takes_effect_immediately() {
        let mut store = store();
        let caffeine = store.resolve_identity(&ChemicalQuery::cas("58-08-2")).unwrap();
        assert!(store
            .get_property(Property::MolecularWeight, &caffeine, Species::Human)
            .is_err());
        store.add_chemical(
            ChemicalRecord::new(ChemicalIdentity::new("58-08-2", "Caffeine"))
                .physchem(Property::MolecularWeight, 194.19),
        );
        assert_eq!(
            store
                .get_property(Property::MolecularWeight, &caffeine, Species::Human)
                .unwrap(),
            PropertyValue::Scalar(194.19)
        );
    }
}
