//! Cost formulas. Monetary results are rounded to cents.

use crate::EconError;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Days of supply reported when demand is effectively zero, and the upper cap otherwise.
pub const DAYS_OF_SUPPLY_CAP: f64 = 99.99;

/// Cost parameters shared by the ledger, the shipment pipeline and deliveries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostRates {
    /// Daily holding cost as a fraction of unit cost (0.001 = 0.1%/day).
    pub holding_rate: Decimal,
    /// Fixed cost per delivery in USD.
    pub delivery_base: Decimal,
    /// Delivery cost per road kilometre in USD.
    pub delivery_per_km: Decimal,
    /// Fixed cost per supplier shipment in USD.
    pub shipment_base: Decimal,
    /// Supplier shipment cost per unit in USD.
    pub shipment_per_unit: Decimal,
    /// Share of the order value charged as pick/pack holding cost.
    pub order_handling_rate: Decimal,
    /// Fraction of the handling cost attributed to fulfillment.
    pub handling_share: Decimal,
}

impl Default for CostRates {
    fn default() -> Self {
        Self {
            holding_rate: Decimal::new(1, 3),
            delivery_base: Decimal::new(350, 2),
            delivery_per_km: Decimal::new(85, 2),
            shipment_base: Decimal::new(2500, 2),
            shipment_per_unit: Decimal::new(50, 2),
            order_handling_rate: Decimal::new(2, 2),
            handling_share: Decimal::new(1, 1),
        }
    }
}

impl CostRates {
    /// Reject negative rates.
    pub fn validate(&self) -> Result<(), EconError> {
        let fields = [
            ("holding_rate", self.holding_rate),
            ("delivery_base", self.delivery_base),
            ("delivery_per_km", self.delivery_per_km),
            ("shipment_base", self.shipment_base),
            ("shipment_per_unit", self.shipment_per_unit),
            ("order_handling_rate", self.order_handling_rate),
            ("handling_share", self.handling_share),
        ];
        for (name, v) in fields {
            if v < Decimal::ZERO {
                return Err(EconError::InvalidRate(name));
            }
        }
        Ok(())
    }
}

/// Daily holding cost of a cell: stock × unit cost × holding rate.
///
/// Example:
/// let c = holding_cost(200, Decimal::new(1000, 2), &CostRates::default());
/// assert_eq!(c, Decimal::new(200, 2)); // 200 × 10.00 × 0.001
pub fn holding_cost(closing_stock: u32, cost_price: Decimal, rates: &CostRates) -> Decimal {
    (Decimal::from(closing_stock) * cost_price * rates.holding_rate).round_dp(2)
}

/// Stock valued at cost.
pub fn inventory_value(closing_stock: u32, cost_price: Decimal) -> Decimal {
    (Decimal::from(closing_stock) * cost_price).round_dp(2)
}

/// Cost to deliver one order over `distance_km` of road.
/// Non-finite or negative distances are charged the base cost only.
pub fn delivery_cost(distance_km: f64, rates: &CostRates) -> Decimal {
    let km = if distance_km.is_finite() && distance_km > 0.0 {
        Decimal::from_f64(distance_km).unwrap_or(Decimal::ZERO)
    } else {
        Decimal::ZERO
    };
    (rates.delivery_base + km * rates.delivery_per_km).round_dp(2)
}

/// Cost of a supplier-to-warehouse shipment of `quantity` units.
pub fn shipment_cost(quantity: u32, rates: &CostRates) -> Decimal {
    (rates.shipment_base + Decimal::from(quantity) * rates.shipment_per_unit).round_dp(2)
}

/// Total fulfillment cost of an order: delivery plus a share of handling.
pub fn fulfillment_cost(delivery: Decimal, order_amount: Decimal, rates: &CostRates) -> Decimal {
    let handling = order_amount * rates.order_handling_rate;
    (delivery + handling * rates.handling_share).round_dp(2)
}

/// Days the closing stock lasts at the current demand, rounded to 2 dp and
/// capped at [`DAYS_OF_SUPPLY_CAP`]. Zero demand yields the cap.
pub fn days_of_supply(closing_stock: u32, avg_daily_demand: f64) -> f64 {
    if !(avg_daily_demand > 0.0) {
        return DAYS_OF_SUPPLY_CAP;
    }
    round2(closing_stock as f64 / avg_daily_demand).min(DAYS_OF_SUPPLY_CAP)
}

/// Round half away from zero to two decimals.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn holding_cost_uses_daily_rate() {
        let c = holding_cost(200, Decimal::new(1000, 2), &CostRates::default());
        assert_eq!(c, Decimal::new(200, 2));
        assert_eq!(inventory_value(200, Decimal::new(1000, 2)), Decimal::new(2000, 0));
    }

    #[test]
    fn delivery_cost_is_base_plus_distance() {
        let r = CostRates::default();
        assert_eq!(delivery_cost(10.0, &r), Decimal::new(1200, 2));
        assert_eq!(delivery_cost(0.0, &r), Decimal::new(350, 2));
        assert_eq!(delivery_cost(f64::NAN, &r), Decimal::new(350, 2));
    }

    #[test]
    fn shipment_and_fulfillment_costs() {
        let r = CostRates::default();
        assert_eq!(shipment_cost(100, &r), Decimal::new(7500, 2));
        // 12.00 + 100.00 × 0.02 × 0.1
        assert_eq!(
            fulfillment_cost(Decimal::new(1200, 2), Decimal::new(10000, 2), &r),
            Decimal::new(1220, 2)
        );
    }

    #[test]
    fn days_of_supply_sentinel() {
        assert_eq!(days_of_supply(50, 0.0), DAYS_OF_SUPPLY_CAP);
        assert_eq!(days_of_supply(50, f64::NAN), DAYS_OF_SUPPLY_CAP);
        assert_eq!(days_of_supply(50, 4.0), 12.5);
        assert_eq!(days_of_supply(10_000, 1.0), DAYS_OF_SUPPLY_CAP);
    }

    #[test]
    fn negative_rate_rejected() {
        let r = CostRates {
            delivery_per_km: Decimal::new(-1, 0),
            ..CostRates::default()
        };
        assert_eq!(r.validate(), Err(EconError::InvalidRate("delivery_per_km")));
    }

    proptest! {
        #[test]
        fn holding_cost_monotonic_in_stock(stock in 0u32..100_000, cents in 1i64..100_000) {
            let r = CostRates::default();
            let p = Decimal::new(cents, 2);
            prop_assert!(holding_cost(stock + 1, p, &r) >= holding_cost(stock, p, &r));
        }

        #[test]
        fn days_of_supply_bounded(stock in 0u32..1_000_000, demand in 0.0f64..500.0) {
            let d = days_of_supply(stock, demand);
            prop_assert!((0.0..=DAYS_OF_SUPPLY_CAP).contains(&d));
        }
    }
}
