// corpusboard - core/mod.rs
//
// Core business logic layer.
// Dependencies: serde, chrono, regex, csv.
// Must NOT depend on: app, platform, or any filesystem access.

pub mod balance;
pub mod corpus;
pub mod export;
pub mod filter;
pub mod model;
pub mod seed;
