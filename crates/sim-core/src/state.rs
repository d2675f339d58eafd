//! Carried-over simulation memory and its checkpoint form.

use crate::{Dimensions, ProductId, Shipment, WarehouseId};
use chrono::NaiveDate;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Composite key of an inventory cell.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellKey {
    pub warehouse_id: WarehouseId,
    pub product_id: ProductId,
}

impl CellKey {
    pub fn new(warehouse_id: WarehouseId, product_id: ProductId) -> Self {
        Self {
            warehouse_id,
            product_id,
        }
    }

    /// Parse the flattened `"{warehouse_id}|{product_id}"` form.
    pub fn parse(flat: &str) -> Result<Self, CheckpointError> {
        match flat.split_once('|') {
            Some((wh, pid)) if !wh.is_empty() && !pid.is_empty() && !pid.contains('|') => {
                Ok(Self::new(WarehouseId::from(wh), ProductId::from(pid)))
            }
            _ => Err(CheckpointError::InvalidKey(flat.to_string())),
        }
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.warehouse_id, self.product_id)
    }
}

/// Stock state of one (warehouse, product) cell between days.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub closing_stock: u32,
    /// Units shipped by a supplier but not yet received.
    pub units_on_order: u32,
    /// Exponentially smoothed units sold per day.
    pub avg_daily_demand: f64,
    /// Set by the ledger when it armed a reorder on its latest pass.
    #[serde(default)]
    pub reorder_triggered: bool,
}

impl InventoryRecord {
    /// Fresh cell with `stock` units on hand.
    pub fn with_stock(stock: u32) -> Self {
        Self {
            closing_stock: stock,
            units_on_order: 0,
            avg_daily_demand: 0.0,
            reorder_triggered: false,
        }
    }

    /// Conservative stand-in for a cell missing from the state.
    pub fn baseline() -> Self {
        Self::with_stock(100)
    }
}

/// Starting values for the monotonic counters, used by extension runs so
/// their IDs never collide with an earlier run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterOffsets {
    pub shipment: u64,
    pub delivery: u64,
    pub assignment: u64,
    /// Days already simulated by the earlier run.
    pub day: u32,
}

impl Default for CounterOffsets {
    fn default() -> Self {
        Self {
            shipment: 1,
            delivery: 1,
            assignment: 1,
            day: 0,
        }
    }
}

/// Everything that carries over from one simulated day to the next.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationState {
    pub inventory: BTreeMap<CellKey, InventoryRecord>,
    /// Shipments in transit, in creation order.
    pub pending_shipments: Vec<Shipment>,
    pub shipment_counter: u64,
    pub delivery_counter: u64,
    pub assignment_counter: u64,
    /// Number of the last completed day.
    pub day_counter: u32,
}

impl Default for SimulationState {
    fn default() -> Self {
        Self::with_offsets(&CounterOffsets::default())
    }
}

impl SimulationState {
    /// Empty state with counters starting at the given offsets.
    pub fn with_offsets(offsets: &CounterOffsets) -> Self {
        Self {
            inventory: BTreeMap::new(),
            pending_shipments: Vec::new(),
            shipment_counter: offsets.shipment,
            delivery_counter: offsets.delivery,
            assignment_counter: offsets.assignment,
            day_counter: offsets.day,
        }
    }

    /// Confirm the state covers exactly the warehouse × product cells of
    /// `dims` and that every shipment in transit targets one of them.
    pub fn check_cells(&self, dims: &Dimensions) -> Result<(), CheckpointError> {
        let expected = dims.warehouses.len() * dims.products.len();
        if self.inventory.len() != expected {
            return Err(CheckpointError::DimensionMismatch(format!(
                "{} inventory cells, dimensions define {expected}",
                self.inventory.len()
            )));
        }
        for w in &dims.warehouses {
            for p in &dims.products {
                let key = CellKey::new(w.warehouse_id.clone(), p.product_id.clone());
                if !self.inventory.contains_key(&key) {
                    return Err(CheckpointError::DimensionMismatch(format!("no cell {key}")));
                }
            }
        }
        if let Some(s) = self.pending_shipments.iter().find(|s| {
            !self
                .inventory
                .contains_key(&CellKey::new(s.warehouse_id.clone(), s.product_id.clone()))
        }) {
            return Err(CheckpointError::DimensionMismatch(format!(
                "shipment {} targets unknown cell {}|{}",
                s.shipment_id, s.warehouse_id, s.product_id
            )));
        }
        Ok(())
    }

    /// Units still in transit to `key`.
    pub fn in_transit(&self, key: &CellKey) -> u32 {
        self.pending_shipments
            .iter()
            .filter(|s| s.warehouse_id == key.warehouse_id && s.product_id == key.product_id)
            .map(|s| s.quantity)
            .sum()
    }
}

/// Errors raised while restoring a checkpoint.
#[derive(Debug, Error, PartialEq)]
pub enum CheckpointError {
    /// Inventory key not of the form `warehouse|product`.
    #[error("invalid inventory key: {0:?}")]
    InvalidKey(String),
    /// RNG position could not be decoded.
    #[error("invalid rng position: {0}")]
    InvalidRng(String),
    /// The checkpoint was taken over different dimension tables.
    #[error("checkpoint does not match the dimensions: {0}")]
    DimensionMismatch(String),
}

/// Serializable position of the simulation's random stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngPosition {
    /// 32-byte seed, lowercase hex.
    pub seed: String,
    pub stream: u64,
    /// Word position as a decimal string (u128 does not fit every JSON reader).
    pub word_pos: String,
}

impl RngPosition {
    pub fn capture(rng: &ChaCha8Rng) -> Self {
        Self {
            seed: rng.get_seed().iter().map(|b| format!("{b:02x}")).collect(),
            stream: rng.get_stream(),
            word_pos: rng.get_word_pos().to_string(),
        }
    }

    pub fn restore(&self) -> Result<ChaCha8Rng, CheckpointError> {
        if self.seed.len() != 64 || !self.seed.is_ascii() {
            return Err(CheckpointError::InvalidRng("seed must be 64 hex digits".into()));
        }
        let mut seed = [0u8; 32];
        for (i, byte) in seed.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&self.seed[2 * i..2 * i + 2], 16)
                .map_err(|e| CheckpointError::InvalidRng(e.to_string()))?;
        }
        let word_pos: u128 = self
            .word_pos
            .parse()
            .map_err(|e: std::num::ParseIntError| CheckpointError::InvalidRng(e.to_string()))?;
        let mut rng = ChaCha8Rng::from_seed(seed);
        rng.set_stream(self.stream);
        rng.set_word_pos(word_pos);
        Ok(rng)
    }
}

/// Flat, JSON-friendly form of a paused run.
///
/// Composite keys are flattened to `"{warehouse_id}|{product_id}"`; dates and
/// timestamps serialize as ISO-8601 strings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub inventory_state: BTreeMap<String, InventoryRecord>,
    pub pending_shipments: Vec<Shipment>,
    pub shipment_counter: u64,
    pub delivery_counter: u64,
    pub assignment_counter: u64,
    pub day_counter: u32,
    /// First day the resumed run will simulate.
    pub next_date: NaiveDate,
    pub rng: RngPosition,
}

impl Checkpoint {
    pub fn capture(state: &SimulationState, next_date: NaiveDate, rng: &ChaCha8Rng) -> Self {
        Self {
            inventory_state: state
                .inventory
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            pending_shipments: state.pending_shipments.clone(),
            shipment_counter: state.shipment_counter,
            delivery_counter: state.delivery_counter,
            assignment_counter: state.assignment_counter,
            day_counter: state.day_counter,
            next_date,
            rng: RngPosition::capture(rng),
        }
    }

    /// Rebuild the state, the next date and the random stream.
    pub fn restore(&self) -> Result<(SimulationState, NaiveDate, ChaCha8Rng), CheckpointError> {
        let mut inventory = BTreeMap::new();
        for (flat, rec) in &self.inventory_state {
            inventory.insert(CellKey::parse(flat)?, rec.clone());
        }
        let state = SimulationState {
            inventory,
            pending_shipments: self.pending_shipments.clone(),
            shipment_counter: self.shipment_counter,
            delivery_counter: self.delivery_counter,
            assignment_counter: self.assignment_counter,
            day_counter: self.day_counter,
        };
        Ok((state, self.next_date, self.rng.restore()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SupplierId;
    use rand::Rng;
    use rust_decimal::Decimal;

    fn shipment() -> Shipment {
        let d = NaiveDate::from_ymd_opt(2022, 2, 3).unwrap();
        Shipment {
            shipment_id: "SHP-20220203-00001".into(),
            supplier_id: SupplierId::from("SUP-001"),
            warehouse_id: WarehouseId::from("WH-001"),
            product_id: ProductId::from("PROD-0001"),
            quantity: 120,
            shipment_cost: Decimal::new(8500, 2),
            shipment_date: d,
            expected_arrival_date: d + chrono::Duration::days(4),
            actual_arrival_date: d + chrono::Duration::days(6),
            delay_days: 2,
            delay_flag: true,
            reorder_triggered_flag: true,
            created_at: d.and_hms_opt(0, 0, 0).unwrap(),
            batch_id: "batch_20220203".into(),
        }
    }

    fn state() -> SimulationState {
        let mut s = SimulationState::with_offsets(&CounterOffsets {
            shipment: 200_000,
            delivery: 5_500_000,
            assignment: 1_200_000,
            day: 1096,
        });
        s.inventory.insert(
            CellKey::new("WH-001".into(), "PROD-0001".into()),
            InventoryRecord {
                closing_stock: 15,
                units_on_order: 120,
                avg_daily_demand: 2.5,
                reorder_triggered: false,
            },
        );
        s.inventory
            .insert(CellKey::new("WH-002".into(), "PROD-0001".into()), InventoryRecord::with_stock(310));
        s.pending_shipments.push(shipment());
        s
    }

    #[test]
    fn key_flattening_roundtrip() {
        let k = CellKey::new("WH-004".into(), "PROD-0420".into());
        assert_eq!(k.to_string(), "WH-004|PROD-0420");
        assert_eq!(CellKey::parse("WH-004|PROD-0420").unwrap(), k);
        assert!(CellKey::parse("WH-004").is_err());
        assert!(CellKey::parse("|PROD-1").is_err());
        assert!(CellKey::parse("a|b|c").is_err());
    }

    #[test]
    fn checkpoint_json_roundtrip_is_lossless() {
        let st = state();
        let rng = ChaCha8Rng::seed_from_u64(42);
        let next = NaiveDate::from_ymd_opt(2022, 2, 4).unwrap();
        let cp = Checkpoint::capture(&st, next, &rng);
        let s = serde_json::to_string_pretty(&cp).unwrap();
        assert!(s.contains("\"WH-001|PROD-0001\""));
        assert!(s.contains("\"2022-02-09\""));
        let back: Checkpoint = serde_json::from_str(&s).unwrap();
        let (restored, date, _) = back.restore().unwrap();
        assert_eq!(restored, st);
        assert_eq!(date, next);
    }

    #[test]
    fn rng_resumes_at_same_position() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..13 {
            let _: u64 = rng.gen();
        }
        let pos = RngPosition::capture(&rng);
        let mut resumed = pos.restore().unwrap();
        let a: Vec<u32> = (0..8).map(|_| rng.gen()).collect();
        let b: Vec<u32> = (0..8).map(|_| resumed.gen()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn missing_trigger_flag_defaults_to_false() {
        let rec: InventoryRecord =
            serde_json::from_str(r#"{"closing_stock":5,"units_on_order":0,"avg_daily_demand":1.0}"#)
                .unwrap();
        assert!(!rec.reorder_triggered);
    }

    #[test]
    fn bad_key_fails_restore() {
        let mut cp = Checkpoint::capture(
            &state(),
            NaiveDate::from_ymd_opt(2022, 2, 4).unwrap(),
            &ChaCha8Rng::seed_from_u64(1),
        );
        cp.inventory_state.insert("broken".into(), InventoryRecord::baseline());
        assert_eq!(
            cp.restore().unwrap_err(),
            CheckpointError::InvalidKey("broken".into())
        );
    }

    #[test]
    fn cells_must_match_dimensions() {
        use crate::{Product, Warehouse};
        let product = |id: &str| Product {
            product_id: id.into(),
            product_name: "Widget".into(),
            category: "Toys".into(),
            subcategory: "Puzzles".into(),
            cost_price: Decimal::new(500, 2),
            selling_price: Decimal::new(900, 2),
            weight_kg: 0.4,
            lead_time_days: 3,
            reorder_point: 20,
            safety_stock: 10,
            is_perishable: false,
        };
        let warehouse = |id: &str| Warehouse {
            warehouse_id: id.into(),
            warehouse_name: id.into(),
            region: "Northeast".into(),
            city: "Newark".into(),
            state: "NJ".into(),
            latitude: 40.7,
            longitude: -74.2,
            capacity_units: 1000,
            operating_cost_per_day: Decimal::new(100, 0),
        };
        let mut dims = Dimensions {
            products: vec![product("PROD-0001")],
            warehouses: vec![warehouse("WH-001"), warehouse("WH-002")],
            ..Dimensions::default()
        };
        state().check_cells(&dims).unwrap();

        dims.products.push(product("PROD-0002"));
        assert!(matches!(
            state().check_cells(&dims),
            Err(CheckpointError::DimensionMismatch(_))
        ));

        dims.products = vec![product("PROD-0009")];
        assert!(matches!(
            state().check_cells(&dims),
            Err(CheckpointError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn in_transit_sums_pending_quantities() {
        let st = state();
        let k = CellKey::new("WH-001".into(), "PROD-0001".into());
        assert_eq!(st.in_transit(&k), 120);
        let other = CellKey::new("WH-002".into(), "PROD-0001".into());
        assert_eq!(st.in_transit(&other), 0);
    }
}
