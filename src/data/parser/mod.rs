//! CSV loader for [InMemoryStore]
//!
//! One row per chemical and species. Phys-chem columns may be repeated on every row
//! of a chemical or given once; the first non-empty value wins. Recognised columns
//! (case-insensitive):
//!
//! | column | meaning |
//! | --- | --- |
//! | `cas`, `name`, `dtxsid` | identity, `cas` and `name` are required |
//! | `logp`, `mw`, `loghenry`, `logwsol`, `mp` | phys-chem scalars |
//! | `pka_donor`, `pka_accept` | comma separated lists, `none` for no groups, `NA` or empty when unknown |
//! | `class` | chemical class tags separated by `;` |
//! | `species` | species of the in-vitro columns below |
//! | `fup`, `clint`, `rblood2plasma` | scalar or `median,lower,upper[,pvalue]` |
//!
//! Lines starting with `#` are ignored.

use std::collections::HashMap;
use std::io::Read;

use serde::Deserialize;
use thiserror::Error;

use crate::data::chemical::{ChemicalIdentity, PropertyValue};
use crate::data::physiology::Species;
use crate::data::store::{ChemicalRecord, InMemoryStore, Property};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Error encountered when reading CSV data
    #[error("CSV error: {0}")]
    CSVError(String),
    #[error("Invalid value '{value}' in column {column} for {cas}: {reason}")]
    InvalidValue {
        cas: String,
        column: String,
        value: String,
        reason: String,
    },
    #[error("Unknown species '{species}' for {cas}")]
    UnknownSpecies { cas: String, species: String },
}

#[derive(Debug, Clone, Deserialize)]
struct Row {
    cas: String,
    name: String,
    #[serde(default, deserialize_with = "deserialize_option_string")]
    dtxsid: Option<String>,
    #[serde(default, deserialize_with = "deserialize_option_string")]
    logp: Option<String>,
    #[serde(default, deserialize_with = "deserialize_option_string")]
    mw: Option<String>,
    #[serde(default, deserialize_with = "deserialize_option_string")]
    loghenry: Option<String>,
    #[serde(default, deserialize_with = "deserialize_option_string")]
    logwsol: Option<String>,
    #[serde(default, deserialize_with = "deserialize_option_string")]
    mp: Option<String>,
    #[serde(default, deserialize_with = "deserialize_option_string")]
    pka_donor: Option<String>,
    #[serde(default, deserialize_with = "deserialize_option_string")]
    pka_accept: Option<String>,
    #[serde(default, deserialize_with = "deserialize_option_string")]
    class: Option<String>,
    #[serde(default, deserialize_with = "deserialize_option_string")]
    species: Option<String>,
    #[serde(default, deserialize_with = "deserialize_option_string")]
    fup: Option<String>,
    #[serde(default, deserialize_with = "deserialize_option_string")]
    clint: Option<String>,
    #[serde(default, deserialize_with = "deserialize_option_string")]
    rblood2plasma: Option<String>,
}

fn deserialize_option_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.and_then(|s| {
        let s = s.trim();
        if s.is_empty() {
            None
        } else {
            Some(s.to_string())
        }
    }))
}

fn is_na(text: &str) -> bool {
    text.eq_ignore_ascii_case("na") || text.eq_ignore_ascii_case("nan")
}

impl Row {
    fn invalid(&self, column: &str, value: &str, reason: String) -> ParseError {
        ParseError::InvalidValue {
            cas: self.cas.clone(),
            column: column.to_string(),
            value: value.to_string(),
            reason,
        }
    }

    fn measurement(
        &self,
        column: &str,
        field: &Option<String>,
    ) -> Result<Option<PropertyValue>, ParseError> {
        match field.as_deref() {
            None => Ok(None),
            Some(text) if is_na(text) => Ok(None),
            Some(text) => PropertyValue::parse_measurement(text)
                .map(Some)
                .map_err(|reason| self.invalid(column, text, reason)),
        }
    }

    fn pka(&self, column: &str, field: &Option<String>) -> Result<Option<PropertyValue>, ParseError> {
        match field.as_deref() {
            None => Ok(None),
            Some(text) if is_na(text) => Ok(None),
            Some(text) => PropertyValue::parse_list(text)
                .map(Some)
                .map_err(|reason| self.invalid(column, text, reason)),
        }
    }

    fn physchem(&self) -> Result<Vec<(Property, PropertyValue)>, ParseError> {
        let mut values = Vec::new();
        let scalars = [
            (Property::LogP, "logp", &self.logp),
            (Property::MolecularWeight, "mw", &self.mw),
            (Property::LogHenry, "loghenry", &self.loghenry),
            (Property::WaterSolubility, "logwsol", &self.logwsol),
            (Property::MeltingPoint, "mp", &self.mp),
        ];
        for (property, column, field) in scalars {
            if let Some(value) = self.measurement(column, field)? {
                values.push((property, value));
            }
        }
        if let Some(value) = self.pka("pka_donor", &self.pka_donor)? {
            values.push((Property::PkaDonor, value));
        }
        if let Some(value) = self.pka("pka_accept", &self.pka_accept)? {
            values.push((Property::PkaAccept, value));
        }
        if let Some(class) = &self.class {
            let classes: Vec<String> = class
                .split(';')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect();
            if !classes.is_empty() {
                values.push((Property::ChemicalClass, PropertyValue::Text(classes)));
            }
        }
        Ok(values)
    }

    fn measured(&self) -> Result<Option<(Species, Vec<(Property, PropertyValue)>)>, ParseError> {
        let Some(species) = &self.species else {
            return Ok(None);
        };
        let species: Species = species.parse().map_err(|_| ParseError::UnknownSpecies {
            cas: self.cas.clone(),
            species: species.clone(),
        })?;
        let mut values = Vec::new();
        let columns = [
            (Property::FunboundPlasma, "fup", &self.fup),
            (Property::Clint, "clint", &self.clint),
            (Property::Rblood2plasma, "rblood2plasma", &self.rblood2plasma),
        ];
        for (property, column, field) in columns {
            if let Some(value) = self.measurement(column, field)? {
                values.push((property, value));
            }
        }
        Ok(Some((species, values)))
    }
}

/// Read a chemical table from a CSV file into a new [InMemoryStore]
///
/// The store starts with the built-in reference physiology for every species.
pub fn read_chemicals(path: impl AsRef<std::path::Path>) -> Result<InMemoryStore, ParseError> {
    let file =
        std::fs::File::open(path.as_ref()).map_err(|e| ParseError::CSVError(e.to_string()))?;
    let mut store = InMemoryStore::new();
    load_chemicals(&mut store, file)?;
    Ok(store)
}

/// Add every chemical in the CSV `reader` to `store`, replacing records with the same CAS
pub fn load_chemicals<R: Read>(store: &mut InMemoryStore, reader: R) -> Result<usize, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = reader
        .headers()
        .map_err(|e| ParseError::CSVError(e.to_string()))?
        .iter()
        .map(|h| h.to_lowercase())
        .collect::<Vec<_>>();
    reader.set_headers(csv::StringRecord::from(headers));

    // Keep file order so the resulting store is deterministic
    let mut order: Vec<String> = Vec::new();
    let mut records: HashMap<String, ChemicalRecord> = HashMap::new();

    for row_result in reader.deserialize() {
        let row: Row = row_result.map_err(|e| ParseError::CSVError(e.to_string()))?;
        let key = row.cas.to_ascii_lowercase();
        let physchem = row.physchem()?;
        let measured = row.measured()?;

        let record = records.entry(key.clone()).or_insert_with(|| {
            order.push(key.clone());
            let mut identity = ChemicalIdentity::new(row.cas.clone(), row.name.clone());
            identity.dtxsid = row.dtxsid.clone();
            ChemicalRecord::new(identity)
        });
        if record.identity.dtxsid.is_none() {
            record.identity.dtxsid = row.dtxsid.clone();
        }
        for (property, value) in physchem {
            record.physchem.entry(property).or_insert(value);
        }
        if let Some((species, values)) = measured {
            let entry = record.measured.entry(species).or_default();
            for (property, value) in values {
                entry.insert(property, value);
            }
        }
    }

    let count = order.len();
    for key in order {
        if let Some(record) = records.remove(&key) {
            store.add_chemical(record);
        }
    }
    Ok(count)
}
