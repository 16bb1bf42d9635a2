//! HTTP front end for the `race_engine` simulator.

pub mod config;
pub mod routes;
pub mod types;
