// PRISM - core/mod.rs
//
// Core business logic layer: export parsing, deduplication, filtering,
// classification, and report output.
// Must NOT depend on: app or platform.

pub mod aggregate;
pub mod export;
pub mod filter;
pub mod model;
pub mod parser;
