// corpusboard - app/mod.rs
//
// Application layer: state ownership, scheduling, orchestration.
// Dependencies: core layer, util.
// Must NOT depend on: platform specifics.

pub mod backend;
pub mod dashboard;
pub mod dataset;
pub mod scheduler;
pub mod store;
