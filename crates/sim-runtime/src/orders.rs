//! Daily order and order-item generation.

use crate::config::SimParams;
use crate::day_start;
use crate::sampling::Samplers;
use chrono::NaiveDate;
use rand::seq::{index, SliceRandom};
use rand::Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sim_core::{
    batch_id, dated_id, AllocationStrategy, Dimensions, Experiment, ExperimentGroup, Order,
    OrderItem, OrderStatus, Warehouse,
};
use sim_econ::{daily_order_count, delivery_cost, fulfillment_cost, nearest_warehouse, road_distance_km};

/// Generate one day of orders with their line items.
///
/// The order count follows the seasonal demand curve. Inputs are never
/// mutated; with no customers, products or warehouses no orders are made.
pub fn generate_orders<R: Rng + ?Sized>(
    date: NaiveDate,
    dims: &Dimensions,
    active_experiments: &[&Experiment],
    params: &SimParams,
    samplers: &Samplers,
    rng: &mut R,
) -> (Vec<Order>, Vec<OrderItem>) {
    let o = &params.orders;
    let batch = batch_id(date);
    let count = daily_order_count(o.daily_orders, date, rng);
    let mut orders = Vec::with_capacity(count as usize);
    let mut items = Vec::with_capacity(count as usize * 2);

    if dims.customers.is_empty() || dims.products.is_empty() || dims.warehouses.is_empty() {
        return (orders, items);
    }

    let mut item_counter = 1u64;
    for i in 0..count {
        let order_id = dated_id("ORD", date, u64::from(i) + 1, 5);
        let hour = samplers.hour.sample(rng);
        let minute = rng.gen_range(0..60);
        let timestamp = date
            .and_hms_opt(hour, minute, 0)
            .unwrap_or_else(|| day_start(date));

        let customer = &dims.customers[rng.gen_range(0..dims.customers.len())];
        let nearest = nearest_warehouse(&dims.warehouses, customer.latitude, customer.longitude)
            .unwrap_or(&dims.warehouses[0]);

        let strategy = samplers.allocation.sample(rng);
        let assigned = allocate(strategy, nearest, &dims.warehouses, o.cost_optimal_reassign, rng);

        let priority = samplers.priority.sample(rng);
        let status = samplers.status.sample(rng);
        let return_flag = status == OrderStatus::Delivered && rng.gen::<f64>() < o.return_rate;

        let mut experiment = None;
        if !active_experiments.is_empty() && rng.gen::<f64>() < o.experiment_participation {
            let exp = active_experiments[rng.gen_range(0..active_experiments.len())];
            if exp.targets(&assigned.warehouse_id) {
                let group = if rng.gen_bool(0.5) {
                    ExperimentGroup::Control
                } else {
                    ExperimentGroup::Treatment
                };
                experiment = Some((exp.experiment_id.clone(), group));
            }
        }

        let wanted = o.items_per_order.choose(rng).copied().unwrap_or(1) as usize;
        let picks = index::sample(rng, dims.products.len(), wanted.min(dims.products.len()));
        let mut total_amount = Decimal::ZERO;
        let mut total_items = 0u32;
        for idx in picks.iter() {
            let product = &dims.products[idx];
            let quantity = o.quantity_choices.choose(rng).copied().unwrap_or(1);
            let line = product.selling_price * Decimal::from(quantity);
            let discount = if rng.gen::<f64>() < o.discount_probability {
                let pct = o.discount_range.sample(rng);
                (line * Decimal::from_f64(pct).unwrap_or(Decimal::ZERO)).round_dp(2)
            } else {
                Decimal::ZERO
            };
            let revenue = (line - discount).round_dp(2);
            items.push(OrderItem {
                order_item_id: dated_id("ITM", date, item_counter, 6),
                order_id: order_id.clone(),
                product_id: product.product_id.clone(),
                quantity,
                unit_price: product.selling_price,
                discount_amount: discount,
                revenue,
                created_at: timestamp,
                batch_id: batch.clone(),
            });
            total_amount += revenue;
            total_items += quantity;
            item_counter += 1;
        }

        let distance = road_distance_km(assigned, customer.latitude, customer.longitude);
        let delivery = delivery_cost(distance, &params.costs);
        let total_amount = total_amount.round_dp(2);
        let (experiment_id, experiment_group) = experiment.unzip();
        orders.push(Order {
            order_id,
            order_date: date,
            order_timestamp: timestamp,
            customer_id: customer.customer_id.clone(),
            assigned_warehouse_id: assigned.warehouse_id.clone(),
            nearest_warehouse_id: nearest.warehouse_id.clone(),
            allocation_strategy: strategy,
            order_priority: priority,
            total_items,
            total_amount,
            total_fulfillment_cost: fulfillment_cost(delivery, total_amount, &params.costs),
            order_status: status,
            return_flag,
            experiment_id,
            experiment_group,
            created_at: timestamp,
            batch_id: batch.clone(),
        });
    }
    (orders, items)
}

fn allocate<'a, R: Rng + ?Sized>(
    strategy: AllocationStrategy,
    nearest: &'a Warehouse,
    warehouses: &'a [Warehouse],
    reassign: f64,
    rng: &mut R,
) -> &'a Warehouse {
    match strategy {
        AllocationStrategy::Nearest => nearest,
        AllocationStrategy::CostOptimal => {
            if rng.gen::<f64>() < reassign {
                any_warehouse(warehouses, rng)
            } else {
                nearest
            }
        }
        AllocationStrategy::LoadBalanced => any_warehouse(warehouses, rng),
    }
}

fn any_warehouse<'a, R: Rng + ?Sized>(warehouses: &'a [Warehouse], rng: &mut R) -> &'a Warehouse {
    &warehouses[rng.gen_range(0..warehouses.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimensions::generate_dimensions;
    use crate::test_params;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::BTreeSet;

    fn day(date: NaiveDate, seed: u64) -> (Dimensions, Vec<Order>, Vec<OrderItem>) {
        let params = test_params();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let dims = generate_dimensions(&params, &mut rng);
        let samplers = Samplers::from_params(&params).unwrap();
        let active = dims.active_experiments(date);
        let (orders, items) = generate_orders(date, &dims, &active, &params, &samplers, &mut rng);
        (dims, orders, items)
    }

    fn d(y: i32, m: u32, dd: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, dd).unwrap()
    }

    #[test]
    fn orders_have_consistent_totals() {
        let (_, orders, items) = day(d(2022, 7, 5), 42);
        assert!(!orders.is_empty());
        for o in &orders {
            let lines: Vec<_> = items.iter().filter(|i| i.order_id == o.order_id).collect();
            assert!((1..=5).contains(&lines.len()));
            let qty: u32 = lines.iter().map(|i| i.quantity).sum();
            let rev: Decimal = lines.iter().map(|i| i.revenue).sum();
            assert_eq!(o.total_items, qty);
            assert_eq!(o.total_amount, rev.round_dp(2));
            let distinct: BTreeSet<_> = lines.iter().map(|i| &i.product_id).collect();
            assert_eq!(distinct.len(), lines.len());
            assert!(o.total_fulfillment_cost >= Decimal::new(350, 2));
        }
    }

    #[test]
    fn returns_only_on_delivered_orders() {
        let (_, orders, _) = day(d(2022, 11, 25), 3);
        assert!(orders
            .iter()
            .filter(|o| o.return_flag)
            .all(|o| o.order_status == OrderStatus::Delivered));
    }

    #[test]
    fn timestamps_within_trading_hours() {
        let (_, orders, _) = day(d(2023, 2, 14), 9);
        let date = d(2023, 2, 14);
        for o in &orders {
            assert!(o.order_timestamp >= date.and_hms_opt(6, 0, 0).unwrap());
            assert!(o.order_timestamp <= date.and_hms_opt(22, 59, 0).unwrap());
        }
    }

    #[test]
    fn nearest_strategy_uses_nearest_warehouse() {
        let (_, orders, _) = day(d(2022, 3, 1), 21);
        assert!(orders
            .iter()
            .filter(|o| o.allocation_strategy == AllocationStrategy::Nearest)
            .all(|o| o.assigned_warehouse_id == o.nearest_warehouse_id));
    }

    #[test]
    fn enrollment_respects_experiment_targets() {
        // EXP-001 runs 2022-06-01..=2022-08-30 on WH-001..WH-004.
        let (dims, orders, _) = day(d(2022, 7, 1), 12);
        let mut enrolled = 0;
        for o in &orders {
            match (&o.experiment_id, o.experiment_group) {
                (Some(id), Some(_)) => {
                    enrolled += 1;
                    let exp = dims.experiments.iter().find(|e| &e.experiment_id == id).unwrap();
                    assert!(exp.targets(&o.assigned_warehouse_id));
                }
                (None, None) => {}
                _ => panic!("experiment id and group must be set together"),
            }
        }
        assert!(enrolled > 0);
    }

    #[test]
    fn no_enrollment_without_active_experiments() {
        let (_, orders, _) = day(d(2022, 3, 1), 12);
        assert!(orders.iter().all(|o| o.experiment_id.is_none()));
    }

    #[test]
    fn ids_are_sequential_per_day() {
        let (_, orders, items) = day(d(2022, 4, 2), 1);
        assert_eq!(orders[0].order_id, "ORD-20220402-00001");
        assert_eq!(items[0].order_item_id, "ITM-20220402-000001");
        let ids: BTreeSet<_> = items.iter().map(|i| &i.order_item_id).collect();
        assert_eq!(ids.len(), items.len());
    }
}
