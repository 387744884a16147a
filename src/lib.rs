//! # Property Agent Library
//!
//! Resolves configuration properties for a service from the process
//! environment, a remote key-value configuration store or a secret vault,
//! coerces them into typed values and caches both the resolved values and
//! the bearer tokens used to fetch them.
//!
//! Modules:
//! - `configuration`: lifecycle-gated gateway with typed accessors
//! - `properties`: property handlers and the TTL cache decorator
//! - `auth`: token sources, the token cache and the authorization registry
//! - `coercion`: raw string to typed value conversion
//! - `config`: YAML service file loading, validation and wiring

pub mod auth;
pub mod coercion;
pub mod config;
pub mod configuration;
pub mod error;
pub mod helpers;
pub mod observability;
pub mod properties;
pub mod resilience;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::configuration::{Configuration, Environment};
pub use crate::error::{PropertyError, Result};
