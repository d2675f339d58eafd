//! Daily inventory ledger over every (warehouse, product) cell.

use crate::config::SimParams;
use crate::day_start;
use chrono::NaiveDate;
use rand::Rng;
use sim_core::{
    batch_id, CellKey, Dimensions, InventoryRecord, InventorySnapshot, Order, OrderItem, Product,
    ProductId, Shipment, Warehouse, WarehouseId,
};
use sim_econ::{days_of_supply, holding_cost, inventory_value};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Randomized opening stock for every cell, in warehouse-then-product order.
pub fn initialize_inventory<R: Rng + ?Sized>(
    warehouses: &[Warehouse],
    products: &[Product],
    params: &SimParams,
    rng: &mut R,
) -> BTreeMap<CellKey, InventoryRecord> {
    let mut cells = BTreeMap::new();
    for w in warehouses {
        for p in products {
            let stock = params.inventory.initial_stock.sample(rng);
            cells.insert(
                CellKey::new(w.warehouse_id.clone(), p.product_id.clone()),
                InventoryRecord::with_stock(stock),
            );
        }
    }
    cells
}

/// Movements feeding one ledger pass.
#[derive(Clone, Copy, Debug)]
pub struct DayActivity<'a> {
    pub orders: &'a [Order],
    pub items: &'a [OrderItem],
    /// Shipments credited today.
    pub arriving: &'a [Shipment],
}

#[derive(Default)]
struct Movements {
    sold: u32,
    returned: u32,
    received: u32,
}

fn aggregate<'a>(activity: &DayActivity<'a>) -> HashMap<(&'a WarehouseId, &'a ProductId), Movements> {
    let by_id: HashMap<&str, &Order> = activity
        .orders
        .iter()
        .map(|o| (o.order_id.as_str(), o))
        .collect();
    let mut moves: HashMap<(&WarehouseId, &ProductId), Movements> = HashMap::new();
    for item in activity.items {
        let Some(&order) = by_id.get(item.order_id.as_str()) else {
            continue;
        };
        let key = (&order.assigned_warehouse_id, &item.product_id);
        if order.order_status.debits_stock() {
            moves.entry(key).or_default().sold += item.quantity;
        }
        if order.return_flag {
            moves.entry(key).or_default().returned += item.quantity;
        }
    }
    for s in activity.arriving {
        moves
            .entry((&s.warehouse_id, &s.product_id))
            .or_default()
            .received += s.quantity;
    }
    moves
}

/// Run the ledger for `date`, mutating `cells` in place.
///
/// Sales, returns and arrivals are netted against yesterday's closing
/// stock. A reorder is armed when closing stock reaches the reorder point
/// and nothing is on order; the armed quantity is added to
/// `units_on_order` and shipped by the next day's pipeline.
///
/// Example:
/// // opening 40, reorder point 20, 25 sold
/// // => closing 15, reorder_triggered_flag, units_on_order = drawn quantity
pub fn advance_inventory<R: Rng + ?Sized>(
    date: NaiveDate,
    dims: &Dimensions,
    activity: &DayActivity<'_>,
    cells: &mut BTreeMap<CellKey, InventoryRecord>,
    params: &SimParams,
    rng: &mut R,
) -> Vec<InventorySnapshot> {
    let moves = aggregate(activity);
    let alpha = params.inventory.smoothing_alpha;
    let created_at = day_start(date);
    let batch = batch_id(date);
    let none = Movements::default();
    let mut rows = Vec::with_capacity(dims.warehouses.len() * dims.products.len());

    for w in &dims.warehouses {
        for p in &dims.products {
            let key = CellKey::new(w.warehouse_id.clone(), p.product_id.clone());
            let prev = match cells.get(&key) {
                Some(rec) => rec.clone(),
                None => {
                    debug!(cell = %key, "missing inventory cell, using baseline");
                    InventoryRecord::baseline()
                }
            };
            let m = moves.get(&(&w.warehouse_id, &p.product_id)).unwrap_or(&none);

            let opening = prev.closing_stock;
            let available = opening.saturating_add(m.received).saturating_add(m.returned);
            let closing = available.saturating_sub(m.sold);
            let unfulfilled = m.sold.saturating_sub(available);

            let triggered = closing <= p.reorder_point && prev.units_on_order == 0;
            let mut on_order = prev.units_on_order.saturating_sub(m.received);
            if triggered {
                on_order += params.inventory.reorder_quantity.sample(rng);
            }
            let avg_daily_demand = prev.avg_daily_demand * (1.0 - alpha) + f64::from(m.sold) * alpha;

            rows.push(InventorySnapshot {
                snapshot_date: date,
                warehouse_id: w.warehouse_id.clone(),
                product_id: p.product_id.clone(),
                opening_stock: opening,
                units_sold: m.sold,
                units_received: m.received,
                units_returned: m.returned,
                closing_stock: closing,
                unfulfilled_units: unfulfilled,
                stockout_flag: closing == 0,
                below_safety_stock_flag: closing < p.safety_stock,
                reorder_triggered_flag: triggered,
                units_on_order: on_order,
                days_of_supply: days_of_supply(closing, avg_daily_demand),
                holding_cost: holding_cost(closing, p.cost_price, &params.costs),
                inventory_value: inventory_value(closing, p.cost_price),
                created_at,
                batch_id: batch.clone(),
            });
            cells.insert(
                key,
                InventoryRecord {
                    closing_stock: closing,
                    units_on_order: on_order,
                    avg_daily_demand,
                    reorder_triggered: triggered,
                },
            );
        }
    }
    rows
}
