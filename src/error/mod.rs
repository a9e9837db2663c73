use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::parser::ParseError;
use crate::data::store::StoreError;

#[derive(Error, Debug)]
pub enum PbtkError {
    /// The chemical could not be resolved, or the identifiers point at different chemicals
    #[error("Identity error: {0}")]
    Identity(#[source] StoreError),

    /// The model is excluded for this chemical by class or phys-chem domain
    #[error("Model '{model}' is not applicable to {chemical}: {reason}")]
    NotApplicable {
        model: String,
        chemical: String,
        reason: String,
    },

    /// A required input for the requested computation path is absent
    #[error("Missing parameter '{name}' ({context})")]
    MissingParameter { name: String, context: String },

    #[error("Unknown species: {0}")]
    UnknownSpecies(String),

    /// A quantity is physically invalid for further use
    #[error("Domain error: {0}")]
    Domain(String),

    #[error("Numerical failure: {0}")]
    NumericalFailure(String),

    #[error("ODE solver error: {0}")]
    Solver(#[from] diffsol::error::DiffsolError),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Data error: {0}")]
    Data(#[from] ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PbtkError {
    pub(crate) fn missing(name: impl Into<String>, context: impl Into<String>) -> Self {
        PbtkError::MissingParameter {
            name: name.into(),
            context: context.into(),
        }
    }

    pub(crate) fn domain(message: impl Into<String>) -> Self {
        PbtkError::Domain(message.into())
    }
}

impl From<StoreError> for PbtkError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::ChemicalNotFound { .. } | StoreError::AmbiguousIdentity { .. } => {
                PbtkError::Identity(error)
            }
            StoreError::UnknownSpecies(species) => PbtkError::UnknownSpecies(species),
            StoreError::MissingProperty { property, .. }
            | StoreError::NotApplicableForSpecies { property, .. } => PbtkError::MissingParameter {
                name: property.to_string(),
                context: error.to_string(),
            },
        }
    }
}

/// A value that was forced into its valid range.
///
/// Clamping changes model output silently, so every clamp is logged and kept
/// alongside the result that it affected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericalWarning {
    pub quantity: String,
    pub original: f64,
    pub clamped: f64,
    pub reason: String,
}

impl fmt::Display for NumericalWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} clamped from {} to {} ({})",
            self.quantity, self.original, self.clamped, self.reason
        )
    }
}

/// Side channel for [NumericalWarning]s
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Warnings(Vec<NumericalWarning>);

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a clamp and emit it through the `log` facade
    pub fn clamp(
        &mut self,
        quantity: impl Into<String>,
        original: f64,
        clamped: f64,
        reason: impl Into<String>,
    ) {
        let warning = NumericalWarning {
            quantity: quantity.into(),
            original,
            clamped,
            reason: reason.into(),
        };
        warn!("{}", warning);
        self.0.push(warning);
    }

    pub fn extend(&mut self, other: &Warnings) {
        self.0.extend(other.0.iter().cloned());
    }

    pub fn iter(&self) -> impl Iterator<Item = &NumericalWarning> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if a warning was recorded for `quantity`
    pub fn contains(&self, quantity: &str) -> bool {
        self.0.iter().any(|w| w.quantity == quantity)
    }
}
