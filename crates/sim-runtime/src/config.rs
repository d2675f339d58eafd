//! Run parameters. Every field has a default so a YAML file may override
//! only what it needs.

use chrono::NaiveDate;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sim_core::{AllocationStrategy, CounterOffsets, OrderStatus, Priority};
use sim_econ::{CostRates, EconError};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Configuration errors detected before a run starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("weights for {0} must be finite, non-negative and not all zero")]
    InvalidWeights(&'static str),
    #[error("range {0} is empty or inverted")]
    InvalidRange(&'static str),
    #[error("probability {0} must be within [0,1]")]
    InvalidProbability(&'static str),
    #[error("end date {end} is before start date {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },
    #[error(transparent)]
    Econ(#[from] EconError),
    #[error("io error: {0}")]
    Io(String),
    #[error("invalid yaml: {0}")]
    Yaml(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e.to_string())
    }
}

/// Inclusive integer range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRange {
    pub min: u32,
    pub max: u32,
}

impl UnitRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        rng.gen_range(self.min..=self.max.max(self.min))
    }

    fn check(&self, name: &'static str) -> Result<(), ConfigError> {
        if self.min > self.max {
            return Err(ConfigError::InvalidRange(name));
        }
        Ok(())
    }
}

/// Half-open float range `[min, max)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub min: f64,
    pub max: f64,
}

impl Span {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.max > self.min {
            rng.gen_range(self.min..self.max)
        } else {
            self.min
        }
    }

    fn check(&self, name: &'static str) -> Result<(), ConfigError> {
        if !(self.min.is_finite() && self.max.is_finite()) || self.min > self.max {
            return Err(ConfigError::InvalidRange(name));
        }
        Ok(())
    }
}

fn check_probability(p: f64, name: &'static str) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&p) {
        return Err(ConfigError::InvalidProbability(name));
    }
    Ok(())
}

/// Sizes of the generated dimension tables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DimensionParams {
    pub products: u32,
    pub customers: u32,
    /// Multiplier on the per-warehouse driver headcount.
    pub driver_scale: f64,
}

impl Default for DimensionParams {
    fn default() -> Self {
        Self {
            products: 500,
            customers: 10_000,
            driver_scale: 1.0,
        }
    }
}

/// Order generation parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderParams {
    /// Base orders per day before seasonality.
    pub daily_orders: u32,
    pub priority_weights: BTreeMap<Priority, f64>,
    pub status_weights: BTreeMap<OrderStatus, f64>,
    pub allocation_weights: BTreeMap<AllocationStrategy, f64>,
    /// Chance a cost-optimal order is rerouted to a random warehouse.
    pub cost_optimal_reassign: f64,
    /// Share of delivered orders that are returned.
    pub return_rate: f64,
    /// Share of orders considered for experiment enrollment.
    pub experiment_participation: f64,
    pub discount_probability: f64,
    pub discount_range: Span,
    /// Hour of the first entry in `hour_weights`.
    pub first_hour: u32,
    pub hour_weights: Vec<f64>,
    /// Item counts drawn uniformly (repeat a value to weight it).
    pub items_per_order: Vec<u32>,
    pub quantity_choices: Vec<u32>,
}

impl Default for OrderParams {
    fn default() -> Self {
        Self {
            daily_orders: 5000,
            priority_weights: BTreeMap::from([
                (Priority::Standard, 0.60),
                (Priority::Express, 0.30),
                (Priority::SameDay, 0.10),
            ]),
            status_weights: BTreeMap::from([
                (OrderStatus::Delivered, 0.85),
                (OrderStatus::Shipped, 0.05),
                (OrderStatus::Processing, 0.03),
                (OrderStatus::Pending, 0.02),
                (OrderStatus::Cancelled, 0.05),
            ]),
            allocation_weights: BTreeMap::from([
                (AllocationStrategy::Nearest, 0.65),
                (AllocationStrategy::CostOptimal, 0.20),
                (AllocationStrategy::LoadBalanced, 0.15),
            ]),
            cost_optimal_reassign: 0.30,
            return_rate: 0.08,
            experiment_participation: 0.40,
            discount_probability: 0.15,
            discount_range: Span::new(0.05, 0.25),
            first_hour: 6,
            hour_weights: vec![
                0.02, 0.03, 0.05, 0.08, 0.10, 0.12, 0.11, 0.09, 0.08, 0.07, 0.06, 0.05, 0.04,
                0.04, 0.03, 0.02, 0.01,
            ],
            items_per_order: vec![1, 1, 1, 2, 2, 2, 3, 3, 4, 5],
            quantity_choices: vec![1, 1, 1, 2, 2, 3],
        }
    }
}

/// Inventory ledger and replenishment parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryParams {
    pub initial_stock: UnitRange,
    pub reorder_quantity: UnitRange,
    /// Exponential smoothing weight of today's sales.
    pub smoothing_alpha: f64,
    /// Extra days added when a supplier misses its reliability roll.
    pub reliability_penalty_days: UnitRange,
}

impl Default for InventoryParams {
    fn default() -> Self {
        Self {
            initial_stock: UnitRange::new(50, 499),
            reorder_quantity: UnitRange::new(50, 199),
            smoothing_alpha: 0.1,
            reliability_penalty_days: UnitRange::new(1, 4),
        }
    }
}

/// Last-mile delivery and driver shift parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryParams {
    pub sla_minutes: BTreeMap<Priority, u32>,
    pub handling_minutes: Span,
    /// Spread of the actual/ETA ratio around 1.0.
    pub variability_std: f64,
    pub variability_clamp: Span,
    /// Share of shipped orders still in transit (the rest are delivered).
    pub shipped_in_transit: f64,
    /// Share of delivered outcomes relabelled as failed.
    pub failure_rate: f64,
    pub assign_delay_minutes: UnitRange,
    pub pickup_delay_minutes: UnitRange,
    pub fallback_driver_id: String,
    pub fallback_speed_kmh: f64,
    pub fallback_location: (f64, f64),
    pub shift_hours: f64,
    /// Ceiling on active hours, overtime included.
    pub max_active_hours: f64,
    pub handling_hours_per_delivery: f64,
    /// Active hours of a driver with no driving logged.
    pub idle_shift_hours: Span,
}

impl Default for DeliveryParams {
    fn default() -> Self {
        Self {
            sla_minutes: BTreeMap::from([
                (Priority::Standard, 2880),
                (Priority::Express, 480),
                (Priority::SameDay, 240),
            ]),
            handling_minutes: Span::new(5.0, 20.0),
            variability_std: 0.20,
            variability_clamp: Span::new(0.7, 1.5),
            shipped_in_transit: 0.6,
            failure_rate: 0.04,
            assign_delay_minutes: UnitRange::new(5, 29),
            pickup_delay_minutes: UnitRange::new(10, 44),
            fallback_driver_id: "DRV-0001".to_string(),
            fallback_speed_kmh: 35.0,
            fallback_location: (40.0, -74.0),
            shift_hours: 8.0,
            max_active_hours: 10.0,
            handling_hours_per_delivery: 0.25,
            idle_shift_hours: Span::new(0.5, 2.0),
        }
    }
}

/// Dimension drift injected once when a run reaches `effective_date`:
/// price and stock-policy changes, supplier performance shifts, driver
/// leave and fleet upgrades, customer segment upgrades.
///
/// Counts are capped at what the tables hold.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionParams {
    /// First day simulated with the changed dimensions.
    pub effective_date: NaiveDate,
    pub price_changes: u32,
    /// Multiplier applied to both cost and selling price.
    pub price_increase: Span,
    pub safety_stock_changes: u32,
    pub safety_stock_increase: Span,
    pub reorder_point_changes: u32,
    pub reorder_point_adjust: Span,
    pub reliability_degraded: u32,
    pub reliability_drop: Span,
    pub reliability_improved: u32,
    pub reliability_gain: Span,
    /// Reliability after a change stays within these bounds.
    pub reliability_bounds: Span,
    pub lead_time_changes: u32,
    /// Largest lead time shift in days, either direction.
    pub lead_time_max_delta: u32,
    pub lead_time_bounds: UnitRange,
    /// Active drivers sent on leave.
    pub drivers_on_leave: u32,
    /// Car drivers move to vans, van drivers to trucks.
    pub vehicle_upgrades: u32,
    pub occasional_to_regular: u32,
    pub regular_to_premium: u32,
}

impl Default for ExtensionParams {
    fn default() -> Self {
        Self {
            effective_date: NaiveDate::from_ymd_opt(2025, 2, 2).unwrap_or_default(),
            price_changes: 25,
            price_increase: Span::new(1.05, 1.15),
            safety_stock_changes: 20,
            safety_stock_increase: Span::new(1.20, 1.40),
            reorder_point_changes: 15,
            reorder_point_adjust: Span::new(0.80, 1.20),
            reliability_degraded: 3,
            reliability_drop: Span::new(0.02, 0.05),
            reliability_improved: 3,
            reliability_gain: Span::new(0.01, 0.03),
            reliability_bounds: Span::new(0.70, 1.0),
            lead_time_changes: 4,
            lead_time_max_delta: 2,
            lead_time_bounds: UnitRange::new(1, 14),
            drivers_on_leave: 20,
            vehicle_upgrades: 10,
            occasional_to_regular: 150,
            regular_to_premium: 50,
        }
    }
}

impl ExtensionParams {
    fn validate(&self) -> Result<(), ConfigError> {
        self.price_increase.check("extension.price_increase")?;
        self.safety_stock_increase.check("extension.safety_stock_increase")?;
        self.reorder_point_adjust.check("extension.reorder_point_adjust")?;
        self.reliability_drop.check("extension.reliability_drop")?;
        self.reliability_gain.check("extension.reliability_gain")?;
        self.reliability_bounds.check("extension.reliability_bounds")?;
        self.lead_time_bounds.check("extension.lead_time_bounds")?;
        if self.price_increase.min < 0.0
            || self.safety_stock_increase.min < 0.0
            || self.reorder_point_adjust.min < 0.0
        {
            return Err(ConfigError::InvalidRange("extension multipliers"));
        }
        check_probability(self.reliability_bounds.min, "extension.reliability_bounds")?;
        check_probability(self.reliability_bounds.max, "extension.reliability_bounds")?;
        if self.lead_time_bounds.min == 0 {
            return Err(ConfigError::InvalidRange("extension.lead_time_bounds"));
        }
        Ok(())
    }
}

/// Complete parameter set of a simulation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// Seed for the run's single random stream.
    pub seed: u64,
    pub start_date: NaiveDate,
    /// Last simulated day, inclusive.
    pub end_date: NaiveDate,
    pub dimensions: DimensionParams,
    pub orders: OrderParams,
    pub inventory: InventoryParams,
    pub deliveries: DeliveryParams,
    pub costs: CostRates,
    /// Counter offsets for extension runs.
    pub counters: CounterOffsets,
    /// Dimension changes for an extension period; none when absent.
    pub extension: Option<ExtensionParams>,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            seed: 42,
            start_date: NaiveDate::from_ymd_opt(2022, 2, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap_or_default(),
            dimensions: DimensionParams::default(),
            orders: OrderParams::default(),
            inventory: InventoryParams::default(),
            deliveries: DeliveryParams::default(),
            costs: CostRates::default(),
            counters: CounterOffsets::default(),
            extension: None,
        }
    }
}

impl SimParams {
    /// Parse parameters from YAML; missing fields take their defaults.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(s).map_err(|e| ConfigError::Yaml(e.to_string()))
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Number of days between start and end, inclusive.
    pub fn total_days(&self) -> u32 {
        ((self.end_date - self.start_date).num_days() + 1).max(0) as u32
    }

    /// Reject parameter sets that would make a run fail or panic midway.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.end_date < self.start_date {
            return Err(ConfigError::EndBeforeStart {
                start: self.start_date,
                end: self.end_date,
            });
        }
        let o = &self.orders;
        check_probability(o.cost_optimal_reassign, "orders.cost_optimal_reassign")?;
        check_probability(o.return_rate, "orders.return_rate")?;
        check_probability(o.experiment_participation, "orders.experiment_participation")?;
        check_probability(o.discount_probability, "orders.discount_probability")?;
        o.discount_range.check("orders.discount_range")?;
        if o.items_per_order.is_empty() || o.items_per_order.contains(&0) {
            return Err(ConfigError::InvalidRange("orders.items_per_order"));
        }
        if o.quantity_choices.is_empty() {
            return Err(ConfigError::InvalidRange("orders.quantity_choices"));
        }
        if o.hour_weights.is_empty() || o.first_hour as usize + o.hour_weights.len() > 24 {
            return Err(ConfigError::InvalidRange("orders.hour_weights"));
        }

        let i = &self.inventory;
        i.initial_stock.check("inventory.initial_stock")?;
        i.reorder_quantity.check("inventory.reorder_quantity")?;
        i.reliability_penalty_days.check("inventory.reliability_penalty_days")?;
        if i.reorder_quantity.min == 0 {
            return Err(ConfigError::InvalidRange("inventory.reorder_quantity"));
        }
        check_probability(i.smoothing_alpha, "inventory.smoothing_alpha")?;

        let d = &self.deliveries;
        d.handling_minutes.check("deliveries.handling_minutes")?;
        d.variability_clamp.check("deliveries.variability_clamp")?;
        d.idle_shift_hours.check("deliveries.idle_shift_hours")?;
        d.assign_delay_minutes.check("deliveries.assign_delay_minutes")?;
        d.pickup_delay_minutes.check("deliveries.pickup_delay_minutes")?;
        check_probability(d.shipped_in_transit, "deliveries.shipped_in_transit")?;
        check_probability(d.failure_rate, "deliveries.failure_rate")?;
        if !(d.shift_hours > 0.0 && d.fallback_speed_kmh > 0.0) {
            return Err(ConfigError::InvalidRange("deliveries.shift_hours"));
        }

        self.costs.validate()?;
        if let Some(ext) = &self.extension {
            ext.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let p = SimParams::default();
        p.validate().unwrap();
        assert_eq!(p.total_days(), 1097);
    }

    #[test]
    fn yaml_overrides_only_named_fields() {
        let p = SimParams::from_yaml_str(
            r#"
seed: 7
start_date: 2025-02-02
end_date: 2025-02-10
orders:
  daily_orders: 120
  priority_weights:
    Standard: 0.5
    Same-Day: 0.5
counters:
  shipment: 200000
"#,
        )
        .unwrap();
        assert_eq!(p.seed, 7);
        assert_eq!(p.total_days(), 9);
        assert_eq!(p.orders.daily_orders, 120);
        assert_eq!(p.orders.priority_weights.len(), 2);
        assert_eq!(p.orders.return_rate, 0.08);
        assert_eq!(p.counters.shipment, 200_000);
        assert_eq!(p.counters.delivery, 1);
        p.validate().unwrap();
    }

    #[test]
    fn inverted_dates_rejected() {
        let mut p = SimParams::default();
        p.end_date = p.start_date.pred_opt().unwrap();
        assert!(matches!(p.validate(), Err(ConfigError::EndBeforeStart { .. })));
    }

    #[test]
    fn inverted_range_rejected() {
        let mut p = SimParams::default();
        p.inventory.reorder_quantity = UnitRange::new(200, 50);
        assert!(matches!(
            p.validate(),
            Err(ConfigError::InvalidRange("inventory.reorder_quantity"))
        ));
    }

    #[test]
    fn hours_must_fit_in_a_day() {
        let mut p = SimParams::default();
        p.orders.first_hour = 10;
        assert!(p.validate().is_err());
    }

    #[test]
    fn extension_section_takes_defaults() {
        let p = SimParams::from_yaml_str(
            r#"
extension:
  effective_date: 2023-01-01
  drivers_on_leave: 3
"#,
        )
        .unwrap();
        let ext = p.extension.as_ref().unwrap();
        assert_eq!(ext.effective_date, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(ext.drivers_on_leave, 3);
        assert_eq!(ext.price_changes, 25);
        assert_eq!(ext.lead_time_bounds, UnitRange::new(1, 14));
        p.validate().unwrap();
        assert!(SimParams::default().extension.is_none());
    }

    #[test]
    fn extension_reliability_bounds_must_be_probabilities() {
        let mut p = SimParams::default();
        p.extension = Some(ExtensionParams {
            reliability_bounds: Span::new(0.7, 1.2),
            ..ExtensionParams::default()
        });
        assert!(matches!(
            p.validate(),
            Err(ConfigError::InvalidProbability("extension.reliability_bounds"))
        ));
    }

    #[test]
    fn bundled_small_config_loads() {
        let p = SimParams::from_yaml_str(include_str!("../../../configs/backfill-small.yaml")).unwrap();
        p.validate().unwrap();
        assert_eq!(p.total_days(), 14);
        assert_eq!(p.dimensions.products, 60);
        assert_eq!(p.orders.allocation_weights[&AllocationStrategy::CostOptimal], 0.3);
        assert_eq!(p.deliveries.sla_minutes[&Priority::SameDay], 180);
        assert_eq!(p.inventory.initial_stock, UnitRange::new(40, 240));
        assert_eq!(p.inventory.smoothing_alpha, 0.1);
    }
}
