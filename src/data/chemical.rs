//! Chemical identity and property records
//!
//! A [ChemicalProperties] record is fetched once per call from a
//! [PropertyStore](crate::data::store::PropertyStore) and is read-only afterwards.
//! Callers can also build one directly (or patch a fetched one with the `with_*`
//! methods) to override store values.

use std::fmt;
use std::str::FromStr;

use log::info;
use serde::{Deserialize, Serialize};

use crate::data::physiology::Species;
use crate::data::store::{Property, PropertyStore, StoreError};
use crate::PbtkError;

/// Lookup key for a chemical. At least one identifier must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChemicalQuery {
    pub cas: Option<String>,
    pub name: Option<String>,
    pub dtxsid: Option<String>,
}

impl ChemicalQuery {
    pub fn cas(cas: impl Into<String>) -> Self {
        Self {
            cas: Some(cas.into()),
            ..Default::default()
        }
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn dtxsid(dtxsid: impl Into<String>) -> Self {
        Self {
            dtxsid: Some(dtxsid.into()),
            ..Default::default()
        }
    }

    pub fn with_cas(mut self, cas: impl Into<String>) -> Self {
        self.cas = Some(cas.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_dtxsid(mut self, dtxsid: impl Into<String>) -> Self {
        self.dtxsid = Some(dtxsid.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.cas.is_none() && self.name.is_none() && self.dtxsid.is_none()
    }
}

impl fmt::Display for ChemicalQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = [
            self.cas.as_ref().map(|c| format!("cas={}", c)),
            self.name.as_ref().map(|n| format!("name={}", n)),
            self.dtxsid.as_ref().map(|d| format!("dtxsid={}", d)),
        ]
        .into_iter()
        .flatten()
        .collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

/// A resolved chemical
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChemicalIdentity {
    pub cas: String,
    pub name: String,
    pub dtxsid: Option<String>,
}

impl ChemicalIdentity {
    pub fn new(cas: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            cas: cas.into(),
            name: name.into(),
            dtxsid: None,
        }
    }

    pub fn with_dtxsid(mut self, dtxsid: impl Into<String>) -> Self {
        self.dtxsid = Some(dtxsid.into());
        self
    }
}

impl fmt::Display for ChemicalIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.cas)
    }
}

/// An externally supplied measurement distribution.
///
/// Values are passed through untouched; only the median is used as the point
/// estimate. The p-value is only meaningful for intrinsic clearance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub median: f64,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    pub pvalue: Option<f64>,
}

/// A value returned by the property store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Scalar(f64),
    /// Ordered values, e.g. pKa lists. An empty list means "measured: none".
    List(Vec<f64>),
    Distribution(Distribution),
    Text(Vec<String>),
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Scalar(value)
    }
}

impl From<Vec<f64>> for PropertyValue {
    fn from(values: Vec<f64>) -> Self {
        PropertyValue::List(values)
    }
}

impl From<Distribution> for PropertyValue {
    fn from(distribution: Distribution) -> Self {
        PropertyValue::Distribution(distribution)
    }
}

impl PropertyValue {
    /// Parse a scalar or a comma separated `median,lower,upper[,pvalue]` tuple
    pub fn parse_measurement(text: &str) -> Result<Self, String> {
        let fields: Vec<&str> = text.split(',').map(str::trim).collect();
        let parse = |s: &str| -> Result<Option<f64>, String> {
            if s.is_empty() || s.eq_ignore_ascii_case("na") {
                Ok(None)
            } else {
                s.parse::<f64>()
                    .map(Some)
                    .map_err(|_| format!("'{}' is not a number", s))
            }
        };
        match fields.len() {
            1 => parse(fields[0])?
                .map(PropertyValue::Scalar)
                .ok_or_else(|| "empty measurement".to_string()),
            3 | 4 => {
                let median = parse(fields[0])?.ok_or_else(|| "missing median".to_string())?;
                Ok(PropertyValue::Distribution(Distribution {
                    median,
                    lower: parse(fields[1])?,
                    upper: parse(fields[2])?,
                    pvalue: match fields.get(3) {
                        Some(p) => parse(p)?,
                        None => None,
                    },
                }))
            }
            n => Err(format!("expected 1, 3 or 4 fields, found {}", n)),
        }
    }

    /// Parse a comma separated list; `none` is the empty list
    pub fn parse_list(text: &str) -> Result<Self, String> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("none") {
            return Ok(PropertyValue::List(Vec::new()));
        }
        text.split(',')
            .map(|s| {
                s.trim()
                    .parse::<f64>()
                    .map_err(|_| format!("'{}' is not a number", s.trim()))
            })
            .collect::<Result<Vec<f64>, String>>()
            .map(PropertyValue::List)
    }

    /// Median for distributions, the value itself for scalars
    pub fn point_estimate(&self) -> Option<f64> {
        match self {
            PropertyValue::Scalar(v) => Some(*v),
            PropertyValue::Distribution(d) => Some(d.median),
            PropertyValue::List(_) | PropertyValue::Text(_) => None,
        }
    }

    pub fn pvalue(&self) -> Option<f64> {
        match self {
            PropertyValue::Distribution(d) => d.pvalue,
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<Vec<f64>> {
        match self {
            PropertyValue::List(values) => Some(values.clone()),
            PropertyValue::Scalar(v) => Some(vec![*v]),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<Vec<String>> {
        match self {
            PropertyValue::Text(values) => Some(values.clone()),
            _ => None,
        }
    }
}

/// Everything the parameterization pipeline needs to know about one chemical.
///
/// `None` means "absent"; it is never silently replaced by a default. For the pKa
/// lists `Some(vec![])` means the chemical has no ionizable groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChemicalProperties {
    pub identity: ChemicalIdentity,
    pub log_p: Option<f64>,
    pub pka_donor: Option<Vec<f64>>,
    pub pka_accept: Option<Vec<f64>>,
    pub molecular_weight: Option<f64>,
    /// log10 of Henry's law constant in atm·m³/mol
    pub log_henry: Option<f64>,
    pub water_solubility: Option<f64>,
    pub melting_point: Option<f64>,
    pub classes: Vec<String>,
    pub funbound_plasma: Option<f64>,
    pub clint: Option<f64>,
    pub clint_pvalue: Option<f64>,
    pub rblood2plasma: Option<f64>,
    /// Species whose in-vitro values were substituted by human values
    pub substituted_from_human: bool,
}

impl ChemicalProperties {
    pub fn new(identity: ChemicalIdentity) -> Self {
        Self {
            identity,
            log_p: None,
            pka_donor: None,
            pka_accept: None,
            molecular_weight: None,
            log_henry: None,
            water_solubility: None,
            melting_point: None,
            classes: Vec::new(),
            funbound_plasma: None,
            clint: None,
            clint_pvalue: None,
            rblood2plasma: None,
            substituted_from_human: false,
        }
    }

    /// Fetch all properties of `identity` for `species`.
    ///
    /// Absent values are recorded as `None`. When `default_to_human` is set the
    /// species-specific in-vitro values missing for `species` are taken from the
    /// human record instead.
    pub fn fetch(
        store: &dyn PropertyStore,
        identity: &ChemicalIdentity,
        species: Species,
        default_to_human: bool,
    ) -> Result<Self, PbtkError> {
        let get = |property: Property, species: Species| -> Result<Option<PropertyValue>, PbtkError> {
            match store.get_property(property, identity, species) {
                Ok(value) => Ok(Some(value)),
                Err(StoreError::MissingProperty { .. })
                | Err(StoreError::NotApplicableForSpecies { .. }) => Ok(None),
                Err(e) => Err(e.into()),
            }
        };
        let scalar = |property: Property| -> Result<Option<f64>, PbtkError> {
            Ok(get(property, species)?.and_then(|v| v.point_estimate()))
        };

        let mut properties = ChemicalProperties::new(identity.clone());
        properties.log_p = scalar(Property::LogP)?;
        properties.pka_donor = get(Property::PkaDonor, species)?.and_then(|v| v.as_list());
        properties.pka_accept = get(Property::PkaAccept, species)?.and_then(|v| v.as_list());
        properties.molecular_weight = scalar(Property::MolecularWeight)?;
        properties.log_henry = scalar(Property::LogHenry)?;
        properties.water_solubility = scalar(Property::WaterSolubility)?;
        properties.melting_point = scalar(Property::MeltingPoint)?;
        properties.classes = get(Property::ChemicalClass, species)?
            .and_then(|v| v.as_text())
            .unwrap_or_default();

        let mut fup = get(Property::FunboundPlasma, species)?;
        let mut clint = get(Property::Clint, species)?;
        let rb2p = get(Property::Rblood2plasma, species)?;

        if default_to_human && species != Species::Human && (fup.is_none() || clint.is_none()) {
            info!(
                "Substituting human in-vitro values for {} in {}",
                identity, species
            );
            properties.substituted_from_human = true;
            if fup.is_none() {
                fup = get(Property::FunboundPlasma, Species::Human)?;
            }
            if clint.is_none() {
                clint = get(Property::Clint, Species::Human)?;
            }
            // Blood:plasma ratios depend on hematocrit and are not carried over
        }

        properties.funbound_plasma = fup.as_ref().and_then(|v| v.point_estimate());
        properties.clint_pvalue = clint.as_ref().and_then(|v| v.pvalue());
        properties.clint = clint.as_ref().and_then(|v| v.point_estimate());
        properties.rblood2plasma = rb2p.as_ref().and_then(|v| v.point_estimate());
        Ok(properties)
    }

    pub fn with_log_p(mut self, log_p: f64) -> Self {
        self.log_p = Some(log_p);
        self
    }

    pub fn with_pka(mut self, donor: Vec<f64>, accept: Vec<f64>) -> Self {
        self.pka_donor = Some(donor);
        self.pka_accept = Some(accept);
        self
    }

    pub fn with_molecular_weight(mut self, mw: f64) -> Self {
        self.molecular_weight = Some(mw);
        self
    }

    pub fn with_log_henry(mut self, log_henry: f64) -> Self {
        self.log_henry = Some(log_henry);
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_funbound_plasma(mut self, fup: f64) -> Self {
        self.funbound_plasma = Some(fup);
        self
    }

    pub fn with_clint(mut self, clint: f64, pvalue: Option<f64>) -> Self {
        self.clint = Some(clint);
        self.clint_pvalue = pvalue;
        self
    }

    pub fn with_rblood2plasma(mut self, rb2p: f64) -> Self {
        self.rblood2plasma = Some(rb2p);
        self
    }

    pub(crate) fn require_log_p(&self) -> Result<f64, PbtkError> {
        self.log_p
            .ok_or_else(|| PbtkError::missing("logP", format!("required for {}", self.identity)))
    }

    pub(crate) fn require_pka(&self) -> Result<(&[f64], &[f64]), PbtkError> {
        let donor = self.pka_donor.as_deref().ok_or_else(|| {
            PbtkError::missing("pKa_Donor", format!("required for {}", self.identity))
        })?;
        let accept = self.pka_accept.as_deref().ok_or_else(|| {
            PbtkError::missing("pKa_Accept", format!("required for {}", self.identity))
        })?;
        Ok((donor, accept))
    }

    pub(crate) fn require_molecular_weight(&self) -> Result<f64, PbtkError> {
        self.molecular_weight
            .ok_or_else(|| PbtkError::missing("MW", format!("required for {}", self.identity)))
    }

    pub(crate) fn require_funbound_plasma(&self) -> Result<f64, PbtkError> {
        self.funbound_plasma.ok_or_else(|| {
            PbtkError::missing("Funbound.plasma", format!("required for {}", self.identity))
        })
    }

    pub(crate) fn require_clint(&self) -> Result<f64, PbtkError> {
        self.clint
            .ok_or_else(|| PbtkError::missing("Clint", format!("required for {}", self.identity)))
    }

    pub(crate) fn require_log_henry(&self) -> Result<f64, PbtkError> {
        self.log_henry.ok_or_else(|| {
            PbtkError::missing("logHenry", format!("required for {}", self.identity))
        })
    }

    /// True if any class tag matches `class`, ignoring case
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c.eq_ignore_ascii_case(class))
    }
}

impl FromStr for ChemicalQuery {
    type Err = String;

    /// `DTXSID...` strings are treated as DTXSIDs, `123-45-6` style strings as CAS
    /// numbers, anything else as a name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty chemical identifier".to_string());
        }
        if s.to_ascii_uppercase().starts_with("DTXSID") {
            Ok(ChemicalQuery::dtxsid(s))
        } else if s.split('-').count() == 3
            && s.split('-').all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
        {
            Ok(ChemicalQuery::cas(s))
        } else {
            Ok(ChemicalQuery::name(s))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clint_tuple_with_pvalue() {
        let value = PropertyValue::parse_measurement("12.5,3.1,40.2,0.03").unwrap();
        assert_eq!(value.point_estimate(), Some(12.5));
        assert_eq!(value.pvalue(), Some(0.03));
    }

    #[test]
    fn parses_scalar_measurement() {
        let value = PropertyValue::parse_measurement("0.12").unwrap();
        assert_eq!(value, PropertyValue::Scalar(0.12));
    }

    #[test]
    fn rejects_two_field_measurement() {
        assert!(PropertyValue::parse_measurement("1,2").is_err());
    }

    #[test]
    fn none_is_an_empty_pka_list() {
        assert_eq!(
            PropertyValue::parse_list("none").unwrap(),
            PropertyValue::List(vec![])
        );
        assert_eq!(
            PropertyValue::parse_list("4.2, 9.8").unwrap(),
            PropertyValue::List(vec![4.2, 9.8])
        );
    }

    #[test]
    fn query_from_str_detects_identifier_kind() {
        assert_eq!(
            "80-05-7".parse::<ChemicalQuery>().unwrap(),
            ChemicalQuery::cas("80-05-7")
        );
        assert_eq!(
            "DTXSID7020182".parse::<ChemicalQuery>().unwrap(),
            ChemicalQuery::dtxsid("DTXSID7020182")
        );
        assert_eq!(
            "bisphenol a".parse::<ChemicalQuery>().unwrap(),
            ChemicalQuery::name("bisphenol a")
        );
    }
}
