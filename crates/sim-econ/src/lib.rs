#![deny(warnings)]

//! Cost, geography and demand models for the fulfillment simulator.
//!
//! This crate provides pure helpers for:
//! - Holding, delivery, shipment and fulfillment costs
//! - Great-circle distances and nearest-warehouse lookup
//! - Calendar seasonality and daily order volume

use thiserror::Error;

pub mod cost;
pub mod geo;
pub mod seasonality;

pub use cost::*;
pub use geo::*;
pub use seasonality::*;

/// Errors produced by economic helpers.
#[derive(Debug, Error, PartialEq)]
pub enum EconError {
    /// Monetary rates must be non-negative.
    #[error("invalid cost rate: {0}")]
    InvalidRate(&'static str),
    /// Noise parameters must be finite with a non-negative spread.
    #[error("invalid noise parameters")]
    InvalidNoise,
}
