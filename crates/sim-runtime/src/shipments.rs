//! Supplier replenishment: turns armed reorders into shipments and
//! releases shipments whose arrival date has come.

use crate::config::SimParams;
use crate::day_start;
use chrono::{Duration, NaiveDate};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use sim_core::{batch_id, dated_id, Product, ProductId, Shipment, SimulationState, Supplier};
use sim_econ::shipment_cost;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Result of one pipeline pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShipmentDay {
    /// Shipments created today, in creation order.
    pub created: Vec<Shipment>,
    /// Shipments due on or before today, removed from the queue.
    pub arriving: Vec<Shipment>,
}

/// Create shipments for yesterday's armed reorders, then release arrivals.
///
/// A cell ships when the ledger armed it on its last pass and the armed
/// units are still on order. The shipment carries exactly those units so
/// `units_on_order` always equals the quantity in transit. Products whose
/// category has no supplier are skipped.
pub fn advance_shipments<R: Rng + ?Sized>(
    date: NaiveDate,
    products: &[Product],
    suppliers: &[Supplier],
    state: &mut SimulationState,
    params: &SimParams,
    rng: &mut R,
) -> ShipmentDay {
    let by_product: HashMap<&ProductId, &Product> =
        products.iter().map(|p| (&p.product_id, p)).collect();
    let mut by_category: BTreeMap<&str, Vec<&Supplier>> = BTreeMap::new();
    for s in suppliers {
        for cat in s.categories() {
            by_category.entry(cat).or_default().push(s);
        }
    }

    let batch = batch_id(date);
    let created_at = day_start(date);
    let mut created = Vec::new();
    for (key, rec) in &state.inventory {
        if !(rec.reorder_triggered && rec.units_on_order > 0) {
            continue;
        }
        let Some(product) = by_product.get(&key.product_id) else {
            debug!(cell = %key, "reorder for unknown product skipped");
            continue;
        };
        let Some(candidates) = by_category.get(product.category.as_str()) else {
            debug!(cell = %key, category = %product.category, "no supplier for category");
            continue;
        };
        let supplier = candidates[rng.gen_range(0..candidates.len())];

        let base = i64::from(supplier.average_lead_time);
        let noisy = Normal::new(base as f64, supplier.lead_time_std_dev)
            .map(|n| n.sample(rng))
            .unwrap_or(base as f64);
        let mut lead = (noisy as i64).max(1);
        let mut delay_flag = lead > base;
        if rng.gen::<f64>() > supplier.reliability_score {
            lead += i64::from(params.inventory.reliability_penalty_days.sample(rng));
            delay_flag = true;
        }

        let quantity = rec.units_on_order;
        created.push(Shipment {
            shipment_id: dated_id("SHP", date, state.shipment_counter, 5),
            supplier_id: supplier.supplier_id.clone(),
            warehouse_id: key.warehouse_id.clone(),
            product_id: key.product_id.clone(),
            quantity,
            shipment_cost: shipment_cost(quantity, &params.costs),
            shipment_date: date,
            expected_arrival_date: date + Duration::days(base),
            actual_arrival_date: date + Duration::days(lead),
            delay_days: (lead - base).max(0) as u32,
            delay_flag,
            reorder_triggered_flag: true,
            created_at,
            batch_id: batch.clone(),
        });
        state.shipment_counter += 1;
    }
    state.pending_shipments.extend(created.iter().cloned());

    let (arriving, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut state.pending_shipments)
        .into_iter()
        .partition(|s| s.actual_arrival_date <= date);
    state.pending_shipments = pending;
    if let Some(stale) = arriving.iter().find(|s| s.actual_arrival_date < date) {
        debug!(shipment = %stale.shipment_id, "overdue shipment released");
    }
    ShipmentDay { created, arriving }
}
