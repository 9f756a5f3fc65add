//! Stationdeck App Services
//!
//! Catalog providers, data persistence, networking, and the station factory.
//! Depends on the `stationdeck` engine crate.

pub mod config;
pub mod data;
pub mod error;
pub mod factory;
pub mod network;
pub mod providers;

pub use error::{AppError, Result};
pub use factory::StationFactory;
