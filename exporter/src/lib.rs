//! Pipeline exporter application: settings, wiring and lifecycle.

pub mod app;
pub mod config;
