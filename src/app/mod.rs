// PRISM - app/mod.rs
//
// Application layer: run orchestration and mail actions.
// Dependencies: core, platform.

pub mod actions;
pub mod context;
