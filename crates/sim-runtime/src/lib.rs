#![deny(warnings)]

//! Day-by-day runtime of the fulfillment simulator.
//!
//! A [`Simulation`] owns its parameters, dimensions, carried state and one
//! seeded random stream. Each [`Simulation::step`] produces the fact tables
//! of one calendar day; [`run_backfill`] drives the loop into a
//! [`persistence::TableSink`].

pub mod config;
pub mod deliveries;
pub mod dimensions;
pub mod engine;
pub mod experiments;
pub mod inventory;
pub mod orders;
pub mod sampling;
pub mod shipments;

pub use config::{ConfigError, ExtensionParams, SimParams};
pub use dimensions::{apply_extension_changes, generate_dimensions, ExtensionChanges};
pub use engine::{run_backfill, RunOptions, RunSummary, SimError, Simulation};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Midnight of `date`; the `created_at` stamp of rows generated for it.
pub(crate) fn day_start(date: NaiveDate) -> NaiveDateTime {
    NaiveDateTime::new(date, NaiveTime::default())
}

/// Small, fast parameter set for unit tests.
#[cfg(test)]
pub(crate) fn test_params() -> SimParams {
    let mut p = SimParams::default();
    p.start_date = NaiveDate::from_ymd_opt(2022, 2, 1).unwrap();
    p.end_date = NaiveDate::from_ymd_opt(2022, 2, 28).unwrap();
    p.dimensions.products = 40;
    p.dimensions.customers = 200;
    p.dimensions.driver_scale = 0.1;
    p.orders.daily_orders = 200;
    p
}
