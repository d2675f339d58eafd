//! Per-day fact rows produced by the simulation.

use crate::{
    AllocationStrategy, CustomerId, DeliveryStatus, DriverId, ExperimentGroup, ExperimentId,
    OrderStatus, Priority, ProductId, SupplierId, WarehouseId,
};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Batch identifier stamped on every row produced for `date`.
pub fn batch_id(date: NaiveDate) -> String {
    format!("batch_{}", date.format("%Y%m%d"))
}

/// Identifier of the form `PREFIX-YYYYMMDD-NNNNN` (counter zero-padded to `width`).
pub fn dated_id(prefix: &str, date: NaiveDate, counter: u64, width: usize) -> String {
    format!("{prefix}-{}-{counter:0width$}", date.format("%Y%m%d"))
}

/// One customer order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub order_date: NaiveDate,
    pub order_timestamp: NaiveDateTime,
    pub customer_id: CustomerId,
    pub assigned_warehouse_id: WarehouseId,
    pub nearest_warehouse_id: WarehouseId,
    pub allocation_strategy: AllocationStrategy,
    pub order_priority: Priority,
    /// Sum of item quantities.
    pub total_items: u32,
    /// Sum of item revenue in USD.
    pub total_amount: Decimal,
    pub total_fulfillment_cost: Decimal,
    pub order_status: OrderStatus,
    /// Only ever set on delivered orders.
    pub return_flag: bool,
    pub experiment_id: Option<ExperimentId>,
    pub experiment_group: Option<ExperimentGroup>,
    pub created_at: NaiveDateTime,
    pub batch_id: String,
}

/// One line of an order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub order_item_id: String,
    pub order_id: String,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub discount_amount: Decimal,
    pub revenue: Decimal,
    pub created_at: NaiveDateTime,
    pub batch_id: String,
}

/// End-of-day stock position of one (warehouse, product) cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub snapshot_date: NaiveDate,
    pub warehouse_id: WarehouseId,
    pub product_id: ProductId,
    pub opening_stock: u32,
    pub units_sold: u32,
    pub units_received: u32,
    pub units_returned: u32,
    pub closing_stock: u32,
    /// Demand the available stock could not cover.
    pub unfulfilled_units: u32,
    pub stockout_flag: bool,
    pub below_safety_stock_flag: bool,
    pub reorder_triggered_flag: bool,
    pub units_on_order: u32,
    pub days_of_supply: f64,
    pub holding_cost: Decimal,
    pub inventory_value: Decimal,
    pub created_at: NaiveDateTime,
    pub batch_id: String,
}

/// A supplier-to-warehouse replenishment shipment. Immutable once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub shipment_id: String,
    pub supplier_id: SupplierId,
    pub warehouse_id: WarehouseId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub shipment_cost: Decimal,
    pub shipment_date: NaiveDate,
    /// `shipment_date` plus the supplier's nominal lead time.
    pub expected_arrival_date: NaiveDate,
    /// Always at least one day after `shipment_date`.
    pub actual_arrival_date: NaiveDate,
    pub delay_days: u32,
    pub delay_flag: bool,
    pub reorder_triggered_flag: bool,
    pub created_at: NaiveDateTime,
    pub batch_id: String,
}

/// One last-mile delivery, derived from a non-cancelled order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub delivery_id: String,
    pub order_id: String,
    pub driver_id: DriverId,
    pub warehouse_id: WarehouseId,
    pub assigned_time: NaiveDateTime,
    pub pickup_time: NaiveDateTime,
    pub delivered_time: Option<NaiveDateTime>,
    pub estimated_eta_minutes: f64,
    pub actual_delivery_minutes: Option<f64>,
    pub distance_km: f64,
    pub delivery_cost: Decimal,
    pub delivery_status: DeliveryStatus,
    pub on_time_flag: Option<bool>,
    pub sla_minutes: u32,
    pub sla_breach_flag: Option<bool>,
    pub created_at: NaiveDateTime,
    pub batch_id: String,
}

/// Daily utilization of one active driver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DriverActivity {
    pub driver_id: DriverId,
    pub activity_date: NaiveDate,
    pub warehouse_id: WarehouseId,
    pub deliveries_completed: u32,
    pub total_distance_km: f64,
    pub total_active_hours: f64,
    pub idle_hours: f64,
    pub utilization_pct: f64,
    pub created_at: NaiveDateTime,
    pub batch_id: String,
}

/// Enrollment of one order in an experiment arm.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExperimentAssignment {
    pub assignment_id: String,
    pub experiment_id: ExperimentId,
    pub order_id: String,
    pub group_name: ExperimentGroup,
    pub assigned_at: NaiveDateTime,
    pub warehouse_id: WarehouseId,
    pub created_at: NaiveDateTime,
    pub batch_id: String,
}

/// Every table produced for a single simulated day.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DayOutput {
    pub date: NaiveDate,
    /// 1-based day counter, continuing across extension runs.
    pub day: u32,
    pub orders: Vec<Order>,
    pub order_items: Vec<OrderItem>,
    pub inventory: Vec<InventorySnapshot>,
    /// Shipments created today.
    pub shipments: Vec<Shipment>,
    /// Shipments that arrived and were credited today.
    pub arrivals: Vec<Shipment>,
    pub deliveries: Vec<Delivery>,
    pub driver_activity: Vec<DriverActivity>,
    pub assignments: Vec<ExperimentAssignment>,
}

impl DayOutput {
    /// Total rows across the persisted tables (arrivals are not a table).
    pub fn row_count(&self) -> usize {
        self.orders.len()
            + self.order_items.len()
            + self.inventory.len()
            + self.shipments.len()
            + self.deliveries.len()
            + self.driver_activity.len()
            + self.assignments.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_embed_date_and_padded_counter() {
        let d = NaiveDate::from_ymd_opt(2022, 2, 1).unwrap();
        assert_eq!(dated_id("SHP", d, 42, 5), "SHP-20220201-00042");
        assert_eq!(dated_id("ITM", d, 7, 6), "ITM-20220201-000007");
        assert_eq!(dated_id("DEL", d, 1_234_567, 5), "DEL-20220201-1234567");
        assert_eq!(batch_id(d), "batch_20220201");
    }
}
