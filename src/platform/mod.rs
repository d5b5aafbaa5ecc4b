// PRISM - platform/mod.rs
//
// Platform abstraction layer: config directory resolution and config.toml.
// Must NOT depend on: core, app.

pub mod config;
