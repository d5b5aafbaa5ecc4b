// PRISM - lib.rs
//
// Library entry point, exposing every module for integration testing and
// for use by the `prism` binary.

pub mod app;
pub mod core;
pub mod platform;
pub mod util;
