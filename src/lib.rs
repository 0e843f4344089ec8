// corpusboard - lib.rs
//
// Library entry point, exposing every module for integration testing and
// for embedding the dashboard state in another front end.
//
// The command-line driver lives in `main.rs` and is not part of the
// library surface.

pub mod app;
pub mod core;
pub mod platform;
pub mod util;
