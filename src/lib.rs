//! Physiologically-based toxicokinetic (PBTK) modelling.
//!
//! Chemical properties and physiology come from a [PropertyStore](data::PropertyStore).
//! A topology from [models] turns them into a [ParameterSet](parameters::ParameterSet),
//! which feeds the closed-form steady states in [steady_state] or the ODE
//! simulations in [simulator].

pub mod batch;
pub mod binding;
pub mod clearance;
pub mod data;
pub mod error;
pub mod models;
pub mod parameters;
pub mod partition;
pub mod simulator;
pub mod steady_state;

pub use error::{NumericalWarning, PbtkError, Warnings};

pub mod prelude {
    pub mod data {
        pub use crate::data::parser::{load_chemicals, read_chemicals};
        pub use crate::data::{
            ChemicalIdentity, ChemicalProperties, ChemicalQuery, ChemicalRecord, InMemoryStore,
            PhysiologyProfile, Property, PropertyStore, PropertyValue, Species, Tissue,
        };
        pub use crate::data::{AmountUnit, ConcentrationUnit, DoseUnit};
    }
    pub mod simulator {
        pub use crate::simulator::{
            scheduled_exposure, simulate, solve_model, Dose, DosingRequest, DosingSchedule, Route,
            SimulationOptions, SimulationResult, TkStats,
        };
    }
    pub mod steady_state {
        pub use crate::steady_state::{
            calc_analytic_css, calc_css, calc_oral_equivalent_dose, days_to_steady_state,
            numeric_css_plasma, ConcentrationKind, CssOptions, CssResult, SteadyStateOptions,
        };
    }

    pub use crate::batch::css_batch;
    pub use crate::models::{registry, Model, ModelKind};
    pub use crate::parameters::{
        parameterize, ChemicalInput, Param, ParameterSet, ParameterizeOptions,
    };
    pub use crate::PbtkError;
}
