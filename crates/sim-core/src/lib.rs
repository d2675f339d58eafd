#![deny(warnings)]

//! Core domain models and invariants for the fulfillment network simulator.
//!
//! This crate defines the serializable types shared by every other crate:
//! dimension rows (products, warehouses, suppliers, drivers, customers,
//! experiments), the per-day fact rows produced by the simulation, and the
//! carried-over [`SimulationState`] with its checkpoint form.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod dims;
pub mod facts;
pub mod state;

pub use dims::*;
pub use facts::*;
pub use state::*;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

id_type!(
    /// Warehouse identifier, e.g. "WH-001".
    WarehouseId
);
id_type!(
    /// Product identifier, e.g. "PROD-0001".
    ProductId
);
id_type!(
    /// Supplier identifier, e.g. "SUP-001".
    SupplierId
);
id_type!(
    /// Driver identifier, e.g. "DRV-0001".
    DriverId
);
id_type!(
    /// Customer identifier, e.g. "CUST-00001".
    CustomerId
);
id_type!(
    /// Experiment identifier, e.g. "EXP-001".
    ExperimentId
);

/// Delivery priority requested by the customer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    /// Two-day delivery window.
    Standard,
    /// Same-business-day window of a few hours.
    Express,
    /// Delivery within hours of the order.
    #[serde(rename = "Same-Day")]
    SameDay,
}

/// Terminal order status. Sampled directly, never transitioned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Delivered,
    Shipped,
    Processing,
    Pending,
    Cancelled,
}

impl OrderStatus {
    /// Whether the order debits stock from its fulfilling warehouse.
    pub fn debits_stock(self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Shipped | OrderStatus::Processing
        )
    }
}

/// Policy used to pick the fulfilling warehouse for an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStrategy {
    /// Closest warehouse by great-circle distance.
    Nearest,
    /// Nearest most of the time, with imperfect routing reassignments.
    CostOptimal,
    /// Uniformly random warehouse.
    LoadBalanced,
}

/// Last-mile delivery outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DeliveryStatus {
    Delivered,
    #[serde(rename = "In Transit")]
    InTransit,
    Assigned,
    Failed,
}

impl DeliveryStatus {
    /// A completed delivery attempt counts toward driver activity.
    pub fn is_completed(self) -> bool {
        matches!(self, DeliveryStatus::Delivered | DeliveryStatus::Failed)
    }
}

/// Experiment arm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ExperimentGroup {
    Control,
    Treatment,
}

/// Driver roster status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DriverStatus {
    Active,
    #[serde(rename = "On Leave")]
    OnLeave,
    Inactive,
}

/// Delivery vehicle kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VehicleType {
    Van,
    Truck,
    Car,
    Bike,
}

/// Validation errors for dimension inputs.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// A required dimension table has no rows.
    #[error("dimension table `{0}` is empty")]
    EmptyTable(&'static str),
    /// Two rows share the same identifier.
    #[error("duplicate identifier: {0}")]
    DuplicateId(String),
    /// Price or cost must be non-negative.
    #[error("negative monetary value on {0}")]
    NegativeMoney(String),
    /// Reliability must be within [0, 1].
    #[error("reliability score of {0} must be within [0,1]")]
    InvalidReliability(String),
    /// Numeric field must be finite and within its domain.
    #[error("invalid numeric value on {0}")]
    InvalidNumber(String),
    /// Row references an unknown warehouse.
    #[error("unknown warehouse {1} referenced by {0}")]
    UnknownWarehouse(String, String),
}

/// Validate the dimension tables, including cross-references.
///
/// Categories without a supplier are not an error: replenishment for those
/// products is silently skipped. Use [`Dimensions::unsupplied_categories`]
/// to report them.
pub fn validate_dimensions(d: &Dimensions) -> Result<(), ValidationError> {
    if d.warehouses.is_empty() {
        return Err(ValidationError::EmptyTable("warehouses"));
    }
    if d.products.is_empty() {
        return Err(ValidationError::EmptyTable("products"));
    }
    if d.customers.is_empty() {
        return Err(ValidationError::EmptyTable("customers"));
    }

    let mut seen = std::collections::BTreeSet::new();
    for w in &d.warehouses {
        if !seen.insert(w.warehouse_id.as_str()) {
            return Err(ValidationError::DuplicateId(w.warehouse_id.0.clone()));
        }
        if !(w.latitude.is_finite() && w.longitude.is_finite()) {
            return Err(ValidationError::InvalidNumber(w.warehouse_id.0.clone()));
        }
    }
    let mut seen = std::collections::BTreeSet::new();
    for p in &d.products {
        if !seen.insert(p.product_id.as_str()) {
            return Err(ValidationError::DuplicateId(p.product_id.0.clone()));
        }
        if p.cost_price.is_sign_negative() || p.selling_price.is_sign_negative() {
            return Err(ValidationError::NegativeMoney(p.product_id.0.clone()));
        }
    }
    for s in &d.suppliers {
        if !(0.0..=1.0).contains(&s.reliability_score) {
            return Err(ValidationError::InvalidReliability(s.supplier_id.0.clone()));
        }
        if !s.lead_time_std_dev.is_finite() || s.lead_time_std_dev < 0.0 {
            return Err(ValidationError::InvalidNumber(s.supplier_id.0.clone()));
        }
    }
    for dr in &d.drivers {
        if d.warehouse(&dr.warehouse_id).is_none() {
            return Err(ValidationError::UnknownWarehouse(
                dr.driver_id.0.clone(),
                dr.warehouse_id.0.clone(),
            ));
        }
        if !dr.avg_speed_kmh.is_finite() || dr.avg_speed_kmh < 0.0 {
            return Err(ValidationError::InvalidNumber(dr.driver_id.0.clone()));
        }
    }
    Ok(())
}
