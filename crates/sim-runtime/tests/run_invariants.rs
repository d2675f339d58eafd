use chrono::{Duration, NaiveDate};
use sim_core::{CellKey, DayOutput, Shipment};
use sim_runtime::{SimParams, Simulation};
use std::collections::{BTreeMap, BTreeSet};

fn params(days: i64, seed: u64) -> SimParams {
    let mut p = SimParams::default();
    p.seed = seed;
    p.start_date = NaiveDate::from_ymd_opt(2022, 11, 20).unwrap();
    p.end_date = p.start_date + Duration::days(days - 1);
    p.dimensions.products = 24;
    p.dimensions.customers = 300;
    p.dimensions.driver_scale = 0.1;
    p.orders.daily_orders = 400;
    p
}

fn run(p: SimParams) -> Vec<DayOutput> {
    Simulation::seeded(p).unwrap().collect()
}

fn cell(s: &Shipment) -> (String, String) {
    (s.warehouse_id.to_string(), s.product_id.to_string())
}

#[test]
fn ledger_conserves_units() {
    for day in run(params(40, 42)) {
        for s in &day.inventory {
            assert_eq!(
                s.closing_stock + s.units_sold,
                s.opening_stock + s.units_received + s.units_returned + s.unfulfilled_units,
                "{} {} {}",
                s.snapshot_date,
                s.warehouse_id,
                s.product_id
            );
            assert_eq!(s.stockout_flag, s.closing_stock == 0);
            assert!(s.days_of_supply >= 0.0);
            assert!(!s.holding_cost.is_sign_negative());
        }
    }
}

#[test]
fn opening_stock_is_previous_closing() {
    let days = run(params(15, 3));
    for pair in days.windows(2) {
        let prev: BTreeMap<_, _> = pair[0]
            .inventory
            .iter()
            .map(|s| ((&s.warehouse_id, &s.product_id), s.closing_stock))
            .collect();
        for s in &pair[1].inventory {
            assert_eq!(Some(&s.opening_stock), prev.get(&(&s.warehouse_id, &s.product_id)));
        }
    }
}

#[test]
fn shipments_arrive_exactly_once_on_their_date() {
    let p = params(60, 42);
    let end = p.end_date;
    let days = run(p);
    let created: Vec<&Shipment> = days.iter().flat_map(|d| &d.shipments).collect();
    assert!(!created.is_empty(), "a 60-day run should replenish something");

    let mut arrived: BTreeMap<&str, NaiveDate> = BTreeMap::new();
    for day in &days {
        for s in &day.arrivals {
            assert_eq!(s.actual_arrival_date, day.date);
            assert!(arrived.insert(&s.shipment_id, day.date).is_none());
        }
        let received: u32 = day.inventory.iter().map(|s| s.units_received).sum();
        let shipped_in: u32 = day.arrivals.iter().map(|s| s.quantity).sum();
        assert_eq!(received, shipped_in);
    }
    for s in created {
        assert!(s.actual_arrival_date >= s.shipment_date + Duration::days(1));
        let late = (s.actual_arrival_date - s.expected_arrival_date).num_days().max(0);
        assert_eq!(i64::from(s.delay_days), late);
        if s.actual_arrival_date <= end {
            assert_eq!(arrived.get(s.shipment_id.as_str()), Some(&s.actual_arrival_date));
        } else {
            assert!(!arrived.contains_key(s.shipment_id.as_str()));
        }
    }
}

#[test]
fn one_outstanding_replenishment_per_cell() {
    let days = run(params(90, 8));
    let mut by_cell: BTreeMap<(String, String), Vec<&Shipment>> = BTreeMap::new();
    for s in days.iter().flat_map(|d| &d.shipments) {
        by_cell.entry(cell(s)).or_default().push(s);
    }
    for list in by_cell.values() {
        for pair in list.windows(2) {
            assert!(pair[1].shipment_date > pair[0].actual_arrival_date);
        }
    }
}

#[test]
fn on_order_matches_units_in_transit() {
    let mut sim = Simulation::seeded(params(45, 21)).unwrap();
    while let Some(day) = sim.step() {
        for snap in day.inventory.iter().filter(|s| !s.reorder_triggered_flag) {
            let key = CellKey::new(snap.warehouse_id.clone(), snap.product_id.clone());
            assert_eq!(snap.units_on_order, sim.state().in_transit(&key), "{} {key}", day.date);
        }
    }
}

#[test]
fn identifiers_unique_across_run() {
    let days = run(params(20, 5));
    fn unique<'a>(ids: impl Iterator<Item = &'a str>) {
        let mut seen = BTreeSet::new();
        for id in ids {
            assert!(seen.insert(id), "duplicate id {id}");
        }
    }
    unique(days.iter().flat_map(|d| &d.orders).map(|o| o.order_id.as_str()));
    unique(days.iter().flat_map(|d| &d.order_items).map(|i| i.order_item_id.as_str()));
    unique(days.iter().flat_map(|d| &d.shipments).map(|s| s.shipment_id.as_str()));
    unique(days.iter().flat_map(|d| &d.deliveries).map(|d| d.delivery_id.as_str()));
    unique(days.iter().flat_map(|d| &d.assignments).map(|a| a.assignment_id.as_str()));
}

#[test]
fn same_seed_same_tables() {
    let a = run(params(10, 77));
    let b = run(params(10, 77));
    assert_eq!(a, b);
    let c = run(params(10, 78));
    assert_ne!(a, c);
}

#[test]
fn resumed_run_matches_uninterrupted() {
    let full = run(params(30, 42));

    let mut first = Simulation::seeded(params(30, 42)).unwrap();
    let head: Vec<DayOutput> = first.by_ref().take(12).collect();
    let json = serde_json::to_string(&first.checkpoint()).unwrap();
    drop(first);

    let cp = serde_json::from_str(&json).unwrap();
    let tail: Vec<DayOutput> = Simulation::resume(params(30, 42), &cp).unwrap().collect();

    assert_eq!(head.len() + tail.len(), full.len());
    assert_eq!(&full[..12], &head[..]);
    assert_eq!(&full[12..], &tail[..]);
    assert_eq!(tail[0].day, 13);
}

#[test]
fn extension_run_continues_past_old_end_date() {
    let short = params(10, 42);
    let mut sim = Simulation::seeded(short.clone()).unwrap();
    let first: Vec<DayOutput> = sim.by_ref().collect();
    let cp = sim.checkpoint();

    let longer = params(25, 42);
    let mut ext = Simulation::resume(longer, &cp).unwrap();
    assert_eq!(ext.next_date(), short.end_date + Duration::days(1));
    let more: Vec<DayOutput> = ext.by_ref().collect();
    assert_eq!(more.len(), 15);
    assert_eq!(more[0].day, first.len() as u32 + 1);

    let ids: BTreeSet<_> = first
        .iter()
        .chain(&more)
        .flat_map(|d| &d.deliveries)
        .map(|d| d.delivery_id.clone())
        .collect();
    let total: usize = first.iter().chain(&more).map(|d| d.deliveries.len()).sum();
    assert_eq!(ids.len(), total);
}
