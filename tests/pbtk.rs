//! Integration tests for parameterization, steady states and simulation

#[path = "pbtk/common.rs"]
mod common;

#[path = "pbtk/test_parameterize.rs"]
mod test_parameterize;

#[path = "pbtk/test_steady_state.rs"]
mod test_steady_state;

#[path = "pbtk/test_dynamics.rs"]
mod test_dynamics;
