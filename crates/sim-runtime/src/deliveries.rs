//! Last-mile deliveries and per-driver daily activity.

use crate::config::SimParams;
use crate::day_start;
use chrono::{Duration, NaiveDate};
use rand::Rng;
use sim_core::{
    batch_id, dated_id, CustomerId, Delivery, DeliveryStatus, Dimensions, Driver, DriverActivity,
    DriverId, DriverStatus, Order, OrderStatus, WarehouseId,
};
use sim_econ::{clamped_normal, delivery_cost, round2, road_distance_km};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

fn delivery_status<R: Rng + ?Sized>(order: OrderStatus, in_transit: f64, rng: &mut R) -> DeliveryStatus {
    match order {
        OrderStatus::Delivered => DeliveryStatus::Delivered,
        OrderStatus::Shipped => {
            if rng.gen::<f64>() < in_transit {
                DeliveryStatus::InTransit
            } else {
                DeliveryStatus::Delivered
            }
        }
        _ => DeliveryStatus::Assigned,
    }
}

/// One delivery per non-cancelled order, numbered from `counter`.
///
/// Drivers are drawn uniformly from the assigned warehouse's active roster.
/// Missing drivers, customers or warehouses fall back to fixed defaults.
pub fn generate_deliveries<R: Rng + ?Sized>(
    date: NaiveDate,
    orders: &[Order],
    dims: &Dimensions,
    params: &SimParams,
    counter: &mut u64,
    rng: &mut R,
) -> Vec<Delivery> {
    let dp = &params.deliveries;
    let customers: HashMap<&CustomerId, (f64, f64)> = dims
        .customers
        .iter()
        .map(|c| (&c.customer_id, (c.latitude, c.longitude)))
        .collect();
    let speeds: HashMap<&DriverId, f64> = dims
        .drivers
        .iter()
        .map(|d| (&d.driver_id, d.avg_speed_kmh))
        .collect();
    let mut rosters: BTreeMap<&WarehouseId, Vec<&DriverId>> = BTreeMap::new();
    for d in dims.drivers.iter().filter(|d| d.availability_status == DriverStatus::Active) {
        rosters.entry(&d.warehouse_id).or_default().push(&d.driver_id);
    }
    let fallback_driver = DriverId(dp.fallback_driver_id.clone());
    let created_at = day_start(date);
    let batch = batch_id(date);

    let mut rows = Vec::with_capacity(orders.len());
    for order in orders.iter().filter(|o| o.order_status != OrderStatus::Cancelled) {
        let wh = &order.assigned_warehouse_id;
        let (lat, lon) = customers.get(&order.customer_id).copied().unwrap_or_else(|| {
            debug!(customer = %order.customer_id, "unknown customer, using fallback location");
            dp.fallback_location
        });
        let distance_km = dims
            .warehouse(wh)
            .map_or(0.0, |w| road_distance_km(w, lat, lon));

        let driver_id = match rosters.get(wh) {
            Some(roster) => roster[rng.gen_range(0..roster.len())],
            None => &fallback_driver,
        };
        let speed = speeds
            .get(driver_id)
            .copied()
            .filter(|s| *s > 0.0)
            .unwrap_or(dp.fallback_speed_kmh);

        let handling = dp.handling_minutes.sample(rng);
        let eta = round2(distance_km / speed * 60.0 + handling);
        let clamp = dp.variability_clamp;
        let variability = clamped_normal(rng, 1.0, dp.variability_std, clamp.min, clamp.max);
        let actual = round2(eta * variability);

        let sla = dp
            .sla_minutes
            .get(&order.order_priority)
            .copied()
            .unwrap_or(2880);
        let mut status = delivery_status(order.order_status, dp.shipped_in_transit, rng);
        if status == DeliveryStatus::Delivered && rng.gen::<f64>() < dp.failure_rate {
            status = DeliveryStatus::Failed;
        }

        let assigned_time =
            order.order_timestamp + Duration::minutes(i64::from(dp.assign_delay_minutes.sample(rng)));
        let pickup_time =
            assigned_time + Duration::minutes(i64::from(dp.pickup_delay_minutes.sample(rng)));
        let (delivered_time, actual_minutes) = if status.is_completed() {
            (Some(pickup_time + Duration::minutes(actual as i64)), Some(actual))
        } else {
            (None, None)
        };
        let on_time = (status == DeliveryStatus::Delivered).then(|| actual <= f64::from(sla));

        rows.push(Delivery {
            delivery_id: dated_id("DEL", date, *counter, 5),
            order_id: order.order_id.clone(),
            driver_id: driver_id.clone(),
            warehouse_id: wh.clone(),
            assigned_time,
            pickup_time,
            delivered_time,
            estimated_eta_minutes: eta,
            actual_delivery_minutes: actual_minutes,
            distance_km,
            delivery_cost: delivery_cost(distance_km, &params.costs),
            delivery_status: status,
            on_time_flag: on_time,
            sla_minutes: sla,
            sla_breach_flag: on_time.map(|t| !t),
            created_at,
            batch_id: batch.clone(),
        });
        *counter += 1;
    }
    rows
}

/// Utilization of every active driver for `date`.
///
/// Completed attempts (delivered or failed) count toward a driver's load.
/// Drivers with no driving logged get a short minimum shift.
pub fn generate_driver_activity<R: Rng + ?Sized>(
    date: NaiveDate,
    drivers: &[Driver],
    deliveries: &[Delivery],
    params: &SimParams,
    rng: &mut R,
) -> Vec<DriverActivity> {
    let dp = &params.deliveries;
    let mut load: HashMap<&DriverId, (u32, f64)> = HashMap::new();
    for d in deliveries.iter().filter(|d| d.delivery_status.is_completed()) {
        let e = load.entry(&d.driver_id).or_insert((0, 0.0));
        e.0 += 1;
        e.1 += d.distance_km;
    }
    let created_at = day_start(date);
    let batch = batch_id(date);

    drivers
        .iter()
        .filter(|d| d.availability_status == DriverStatus::Active)
        .map(|d| {
            let (completed, distance) = load.get(&d.driver_id).copied().unwrap_or((0, 0.0));
            let distance = round2(distance);
            let active = if d.avg_speed_kmh > 0.0 && distance > 0.0 {
                let driving = distance / d.avg_speed_kmh;
                let handling = f64::from(completed) * dp.handling_hours_per_delivery;
                round2((driving + handling).min(dp.max_active_hours))
            } else {
                round2(dp.idle_shift_hours.sample(rng))
            };
            DriverActivity {
                driver_id: d.driver_id.clone(),
                activity_date: date,
                warehouse_id: d.warehouse_id.clone(),
                deliveries_completed: completed,
                total_distance_km: distance,
                total_active_hours: active,
                idle_hours: round2((dp.shift_hours - active).max(0.0)),
                utilization_pct: round2(active / dp.shift_hours * 100.0).min(100.0),
                created_at,
                batch_id: batch.clone(),
            }
        })
        .collect()
}
