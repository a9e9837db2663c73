//! Tissue partitioning
//!
//! Ionization fractions, the distribution coefficient and the Schmitt tissue
//! composition method for tissue : unbound plasma partition coefficients.

pub mod ionization;
pub mod schmitt;

pub use ionization::{calc_dow, calc_ionization, is_base, Ionization};
pub use schmitt::{
    calc_rblood2plasma, membrane_affinity, neutral_phospholipid_affinity,
    predict_partitioning_schmitt, tissue_to_unbound_plasma, truncate_pow,
    PartitionCoefficientSet, SchmittInputs, MAX_POW,
};
