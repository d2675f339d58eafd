//! Dimension tables: static reference data produced once per run.

use crate::{
    CustomerId, DriverId, DriverStatus, ExperimentId, ProductId, SupplierId, VehicleType,
    WarehouseId,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A sellable product.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: ProductId,
    pub product_name: String,
    /// Category name; suppliers are matched on it.
    pub category: String,
    pub subcategory: String,
    /// Unit cost in USD (>= 0).
    pub cost_price: Decimal,
    /// Unit selling price in USD (>= 0).
    pub selling_price: Decimal,
    pub weight_kg: f64,
    /// Nominal replenishment lead time for the category.
    pub lead_time_days: u32,
    /// Stock level at or below which a reorder is armed.
    pub reorder_point: u32,
    /// Stock level below which the cell is flagged at risk.
    pub safety_stock: u32,
    pub is_perishable: bool,
}

/// A regional fulfillment center.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Warehouse {
    pub warehouse_id: WarehouseId,
    pub warehouse_name: String,
    pub region: String,
    pub city: String,
    pub state: String,
    pub latitude: f64,
    pub longitude: f64,
    pub capacity_units: u32,
    pub operating_cost_per_day: Decimal,
}

/// A replenishment supplier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Supplier {
    pub supplier_id: SupplierId,
    pub supplier_name: String,
    pub region: String,
    /// Nominal lead time in days.
    pub average_lead_time: u32,
    /// Standard deviation of the per-shipment lead time noise.
    pub lead_time_std_dev: f64,
    /// Probability in [0,1] that a shipment avoids an extra delay.
    pub reliability_score: f64,
    /// Comma-delimited list of served categories.
    pub product_categories: String,
}

impl Supplier {
    /// Served categories, trimmed, empty entries dropped.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.product_categories
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// A last-mile driver attached to one warehouse.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub driver_id: DriverId,
    pub warehouse_id: WarehouseId,
    pub driver_name: String,
    pub vehicle_type: VehicleType,
    pub max_delivery_capacity: u32,
    pub avg_speed_kmh: f64,
    pub availability_status: DriverStatus,
    pub hire_date: NaiveDate,
}

/// A customer with a fixed delivery location.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: CustomerId,
    pub region: String,
    pub city: String,
    pub customer_segment: String,
    pub order_frequency_score: f64,
    pub acquisition_date: NaiveDate,
    pub latitude: f64,
    pub longitude: f64,
}

/// An A/B experiment targeting a set of warehouses.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub experiment_id: ExperimentId,
    pub experiment_name: String,
    pub strategy_name: String,
    pub experiment_type: String,
    pub start_date: NaiveDate,
    /// Open-ended when absent.
    pub end_date: Option<NaiveDate>,
    /// Comma-delimited warehouse ids.
    pub target_warehouses: String,
    pub status: String,
}

impl Experiment {
    /// Whether the experiment runs on `date` (both bounds inclusive).
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.start_date <= date && self.end_date.map_or(true, |end| end >= date)
    }

    /// Whether `warehouse` is one of the experiment's targets.
    pub fn targets(&self, warehouse: &WarehouseId) -> bool {
        self.target_warehouses
            .split(',')
            .any(|w| w.trim() == warehouse.as_str())
    }
}

/// One row of the calendar dimension.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub day_of_week: String,
    pub day_of_week_num: u32,
    pub week_number: u32,
    pub month: u32,
    pub month_name: String,
    pub quarter: u32,
    pub year: i32,
    pub is_holiday: bool,
    pub is_weekend: bool,
    pub season: String,
}

/// All dimension tables consumed by the simulation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub products: Vec<Product>,
    pub warehouses: Vec<Warehouse>,
    pub suppliers: Vec<Supplier>,
    pub drivers: Vec<Driver>,
    pub customers: Vec<Customer>,
    pub experiments: Vec<Experiment>,
    pub calendar: Vec<CalendarDay>,
}

impl Dimensions {
    /// Look up a warehouse by id.
    pub fn warehouse(&self, id: &WarehouseId) -> Option<&Warehouse> {
        self.warehouses.iter().find(|w| &w.warehouse_id == id)
    }

    /// Experiments running on `date`, in table order.
    pub fn active_experiments(&self, date: NaiveDate) -> Vec<&Experiment> {
        self.experiments
            .iter()
            .filter(|e| e.is_active_on(date))
            .collect()
    }

    /// Product categories no supplier serves. Reorders for these never ship.
    pub fn unsupplied_categories(&self) -> Vec<String> {
        let served: BTreeSet<&str> = self.suppliers.iter().flat_map(|s| s.categories()).collect();
        let all: BTreeSet<&str> = self.products.iter().map(|p| p.category.as_str()).collect();
        all.difference(&served).map(|c| c.to_string()).collect()
    }
}
