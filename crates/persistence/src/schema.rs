//! Arrow schemas of the persisted tables.
//!
//! Money is `Decimal128(18, 2)`, dates are `Date32`, timestamps are
//! second-resolution without a zone, and enums and ids are `Utf8`.

use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use serde::Serialize;
use sim_core::{
    CalendarDay, Customer, Delivery, Driver, DriverActivity, Experiment, ExperimentAssignment,
    InventorySnapshot, Order, OrderItem, Product, Shipment, Supplier, Warehouse,
};

/// A row type with a fixed table name and column layout.
pub trait Table: Serialize {
    const NAME: &'static str;
    fn schema() -> Schema;
}

const TEXT: DataType = DataType::Utf8;
const MONEY: DataType = DataType::Decimal128(18, 2);
const DATE: DataType = DataType::Date32;
const TS: DataType = DataType::Timestamp(TimeUnit::Second, None);
const U32: DataType = DataType::UInt32;
const F64: DataType = DataType::Float64;
const BOOL: DataType = DataType::Boolean;

macro_rules! table {
    ($ty:ty, $name:literal, [$(($col:literal, $dt:expr $(, $null:ident)?)),* $(,)?]) => {
        impl Table for $ty {
            const NAME: &'static str = $name;
            fn schema() -> Schema {
                Schema::new(vec![$(Field::new($col, $dt, table!(@null $($null)?))),*])
            }
        }
    };
    (@null) => { false };
    (@null nullable) => { true };
}

table!(Product, "dim_product", [
    ("product_id", TEXT),
    ("product_name", TEXT),
    ("category", TEXT),
    ("subcategory", TEXT),
    ("cost_price", MONEY),
    ("selling_price", MONEY),
    ("weight_kg", F64),
    ("lead_time_days", U32),
    ("reorder_point", U32),
    ("safety_stock", U32),
    ("is_perishable", BOOL),
]);

table!(Warehouse, "dim_warehouse", [
    ("warehouse_id", TEXT),
    ("warehouse_name", TEXT),
    ("region", TEXT),
    ("city", TEXT),
    ("state", TEXT),
    ("latitude", F64),
    ("longitude", F64),
    ("capacity_units", U32),
    ("operating_cost_per_day", MONEY),
]);

table!(Supplier, "dim_supplier", [
    ("supplier_id", TEXT),
    ("supplier_name", TEXT),
    ("region", TEXT),
    ("average_lead_time", U32),
    ("lead_time_std_dev", F64),
    ("reliability_score", F64),
    ("product_categories", TEXT),
]);

table!(Driver, "dim_driver", [
    ("driver_id", TEXT),
    ("warehouse_id", TEXT),
    ("driver_name", TEXT),
    ("vehicle_type", TEXT),
    ("max_delivery_capacity", U32),
    ("avg_speed_kmh", F64),
    ("availability_status", TEXT),
    ("hire_date", DATE),
]);

table!(Customer, "dim_customer", [
    ("customer_id", TEXT),
    ("region", TEXT),
    ("city", TEXT),
    ("customer_segment", TEXT),
    ("order_frequency_score", F64),
    ("acquisition_date", DATE),
    ("latitude", F64),
    ("longitude", F64),
]);

table!(Experiment, "dim_experiments", [
    ("experiment_id", TEXT),
    ("experiment_name", TEXT),
    ("strategy_name", TEXT),
    ("experiment_type", TEXT),
    ("start_date", DATE),
    ("end_date", DATE, nullable),
    ("target_warehouses", TEXT),
    ("status", TEXT),
]);

table!(CalendarDay, "dim_date", [
    ("date", DATE),
    ("day_of_week", TEXT),
    ("day_of_week_num", U32),
    ("week_number", U32),
    ("month", U32),
    ("month_name", TEXT),
    ("quarter", U32),
    ("year", DataType::Int32),
    ("is_holiday", BOOL),
    ("is_weekend", BOOL),
    ("season", TEXT),
]);

table!(Order, "fact_orders", [
    ("order_id", TEXT),
    ("order_date", DATE),
    ("order_timestamp", TS),
    ("customer_id", TEXT),
    ("assigned_warehouse_id", TEXT),
    ("nearest_warehouse_id", TEXT),
    ("allocation_strategy", TEXT),
    ("order_priority", TEXT),
    ("total_items", U32),
    ("total_amount", MONEY),
    ("total_fulfillment_cost", MONEY),
    ("order_status", TEXT),
    ("return_flag", BOOL),
    ("experiment_id", TEXT, nullable),
    ("experiment_group", TEXT, nullable),
    ("created_at", TS),
    ("batch_id", TEXT),
]);

table!(OrderItem, "fact_order_items", [
    ("order_item_id", TEXT),
    ("order_id", TEXT),
    ("product_id", TEXT),
    ("quantity", U32),
    ("unit_price", MONEY),
    ("discount_amount", MONEY),
    ("revenue", MONEY),
    ("created_at", TS),
    ("batch_id", TEXT),
]);

table!(InventorySnapshot, "fact_inventory_snapshot", [
    ("snapshot_date", DATE),
    ("warehouse_id", TEXT),
    ("product_id", TEXT),
    ("opening_stock", U32),
    ("units_sold", U32),
    ("units_received", U32),
    ("units_returned", U32),
    ("closing_stock", U32),
    ("unfulfilled_units", U32),
    ("stockout_flag", BOOL),
    ("below_safety_stock_flag", BOOL),
    ("reorder_triggered_flag", BOOL),
    ("units_on_order", U32),
    ("days_of_supply", F64),
    ("holding_cost", MONEY),
    ("inventory_value", MONEY),
    ("created_at", TS),
    ("batch_id", TEXT),
]);

table!(Shipment, "fact_shipments", [
    ("shipment_id", TEXT),
    ("supplier_id", TEXT),
    ("warehouse_id", TEXT),
    ("product_id", TEXT),
    ("quantity", U32),
    ("shipment_cost", MONEY),
    ("shipment_date", DATE),
    ("expected_arrival_date", DATE),
    ("actual_arrival_date", DATE),
    ("delay_days", U32),
    ("delay_flag", BOOL),
    ("reorder_triggered_flag", BOOL),
    ("created_at", TS),
    ("batch_id", TEXT),
]);

table!(Delivery, "fact_deliveries", [
    ("delivery_id", TEXT),
    ("order_id", TEXT),
    ("driver_id", TEXT),
    ("warehouse_id", TEXT),
    ("assigned_time", TS),
    ("pickup_time", TS),
    ("delivered_time", TS, nullable),
    ("estimated_eta_minutes", F64),
    ("actual_delivery_minutes", F64, nullable),
    ("distance_km", F64),
    ("delivery_cost", MONEY),
    ("delivery_status", TEXT),
    ("on_time_flag", BOOL, nullable),
    ("sla_minutes", U32),
    ("sla_breach_flag", BOOL, nullable),
    ("created_at", TS),
    ("batch_id", TEXT),
]);

table!(DriverActivity, "fact_driver_activity", [
    ("driver_id", TEXT),
    ("activity_date", DATE),
    ("warehouse_id", TEXT),
    ("deliveries_completed", U32),
    ("total_distance_km", F64),
    ("total_active_hours", F64),
    ("idle_hours", F64),
    ("utilization_pct", F64),
    ("created_at", TS),
    ("batch_id", TEXT),
]);

table!(ExperimentAssignment, "fact_experiment_assignments", [
    ("assignment_id", TEXT),
    ("experiment_id", TEXT),
    ("order_id", TEXT),
    ("group_name", TEXT),
    ("assigned_at", TS),
    ("warehouse_id", TEXT),
    ("created_at", TS),
    ("batch_id", TEXT),
]);
