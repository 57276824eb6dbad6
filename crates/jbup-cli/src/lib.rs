//! jbup library - expose modules for testing
//!
//! The binary in `main.rs` is a thin clap front end over these modules.

pub mod commands;
pub mod common;
pub mod deadline;
pub mod errors;
pub mod install;
pub mod marketplace;
pub mod orchestrator;
pub mod probe;

#[cfg(test)]
pub(crate) mod testing;

pub use common::GlobalOpts;
