#![deny(warnings)]

//! Persistence: date-partitioned table output and run checkpoints.
//!
//! Tables land under `<root>/raw/<table>/date=YYYY-MM-DD/data.<ext>`, one
//! partition per simulated day. Dimensions are written once under
//! `<root>/raw/<table>/`. Checkpoints are JSON documents replaced atomically.

pub mod schema;

use arrow::datatypes::SchemaRef;
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use parquet::arrow::ArrowWriter;
use parquet::errors::ParquetError;
pub use schema::Table;
use sim_core::{Checkpoint, CheckpointError, DayOutput, Dimensions};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

const BATCH_ROWS: usize = 1024;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("arrow error: {0}")]
    Arrow(#[from] ArrowError),
    #[error("parquet error: {0}")]
    Parquet(#[from] ParquetError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid checkpoint: {0}")]
    Checkpoint(#[from] CheckpointError),
    #[error("unknown output format: {0:?} (expected csv, parquet or jsonl)")]
    UnknownFormat(String),
}

/// On-disk encoding of table partitions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    Csv,
    #[default]
    Parquet,
    JsonLines,
}

impl Format {
    pub fn extension(self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Parquet => "parquet",
            Format::JsonLines => "jsonl",
        }
    }
}

impl FromStr for Format {
    type Err = PersistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Format::Csv),
            "parquet" => Ok(Format::Parquet),
            "jsonl" | "json" | "ndjson" => Ok(Format::JsonLines),
            other => Err(PersistError::UnknownFormat(other.to_string())),
        }
    }
}

/// Destination for generated tables.
pub trait TableSink {
    fn write_dimensions(&mut self, dims: &Dimensions) -> Result<(), PersistError>;
    fn write_day(&mut self, day: &DayOutput) -> Result<(), PersistError>;
}

/// Build Arrow batches from serializable rows according to `T::schema()`.
///
/// Example: 500 rows produce one batch; 2500 rows produce three.
pub fn to_batches<T: Table>(rows: &[T]) -> Result<Vec<RecordBatch>, PersistError> {
    let schema: SchemaRef = Arc::new(T::schema());
    if rows.is_empty() {
        return Ok(vec![RecordBatch::new_empty(schema)]);
    }
    let mut decoder = arrow::json::ReaderBuilder::new(schema)
        .with_batch_size(BATCH_ROWS)
        .build_decoder()?;
    let mut batches = Vec::with_capacity(rows.len() / BATCH_ROWS + 1);
    for chunk in rows.chunks(BATCH_ROWS) {
        decoder.serialize(chunk)?;
        if let Some(batch) = decoder.flush()? {
            batches.push(batch);
        }
    }
    Ok(batches)
}

/// Writes each table to its own directory in the chosen format.
#[derive(Clone, Debug)]
pub struct PartitionWriter {
    root: PathBuf,
    format: Format,
}

impl PartitionWriter {
    pub fn new(root: impl Into<PathBuf>, format: Format) -> Self {
        Self { root: root.into(), format }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// Directory holding `table`, partitioned by `date` when given.
    pub fn partition_dir(&self, table: &str, date: Option<NaiveDate>) -> PathBuf {
        let dir = self.root.join("raw").join(table);
        match date {
            Some(d) => dir.join(format!("date={}", d.format("%Y-%m-%d"))),
            None => dir,
        }
    }

    /// Write one table file, replacing any earlier file for the same partition.
    pub fn write_table<T: Table>(
        &self,
        rows: &[T],
        date: Option<NaiveDate>,
    ) -> Result<PathBuf, PersistError> {
        let dir = self.partition_dir(T::NAME, date);
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("data.{}", self.format.extension()));
        let file = File::create(&path)?;
        match self.format {
            Format::JsonLines => {
                let mut out = BufWriter::new(file);
                for row in rows {
                    serde_json::to_writer(&mut out, row)?;
                    out.write_all(b"\n")?;
                }
                out.flush()?;
            }
            Format::Csv => {
                let mut writer = arrow::csv::Writer::new(BufWriter::new(file));
                for batch in to_batches(rows)? {
                    writer.write(&batch)?;
                }
            }
            Format::Parquet => {
                let schema = Arc::new(T::schema());
                let mut writer = ArrowWriter::try_new(file, schema, None)?;
                for batch in to_batches(rows)? {
                    writer.write(&batch)?;
                }
                writer.close()?;
            }
        }
        debug!(table = T::NAME, rows = rows.len(), path = %path.display(), "table written");
        Ok(path)
    }
}

impl TableSink for PartitionWriter {
    fn write_dimensions(&mut self, dims: &Dimensions) -> Result<(), PersistError> {
        self.write_table(&dims.products, None)?;
        self.write_table(&dims.warehouses, None)?;
        self.write_table(&dims.suppliers, None)?;
        self.write_table(&dims.drivers, None)?;
        self.write_table(&dims.customers, None)?;
        self.write_table(&dims.experiments, None)?;
        self.write_table(&dims.calendar, None)?;
        Ok(())
    }

    /// Daily tables. Orders, items, snapshots, deliveries and driver
    /// activity always get a partition; shipments and assignments only
    /// when the day produced some.
    fn write_day(&mut self, day: &DayOutput) -> Result<(), PersistError> {
        let date = Some(day.date);
        self.write_table(&day.orders, date)?;
        self.write_table(&day.order_items, date)?;
        self.write_table(&day.inventory, date)?;
        if !day.shipments.is_empty() {
            self.write_table(&day.shipments, date)?;
        }
        self.write_table(&day.deliveries, date)?;
        self.write_table(&day.driver_activity, date)?;
        if !day.assignments.is_empty() {
            self.write_table(&day.assignments, date)?;
        }
        Ok(())
    }
}

/// Keeps everything in memory. Used by tests and benchmarks.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    pub dimensions: Option<Dimensions>,
    pub days: Vec<DayOutput>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows_written(&self) -> usize {
        self.days.iter().map(DayOutput::row_count).sum()
    }
}

impl TableSink for MemorySink {
    fn write_dimensions(&mut self, dims: &Dimensions) -> Result<(), PersistError> {
        self.dimensions = Some(dims.clone());
        Ok(())
    }

    fn write_day(&mut self, day: &DayOutput) -> Result<(), PersistError> {
        self.days.push(day.clone());
        Ok(())
    }
}

/// Save a checkpoint. The previous file stays intact until the new one is complete.
pub fn save_checkpoint(path: &Path, checkpoint: &Checkpoint) -> Result<(), PersistError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let bytes = serde_json::to_vec_pretty(checkpoint)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    debug!(path = %path.display(), next_date = %checkpoint.next_date, "checkpoint saved");
    Ok(())
}

/// Load and validate a checkpoint written by [`save_checkpoint`].
pub fn load_checkpoint(path: &Path) -> Result<Checkpoint, PersistError> {
    let bytes = fs::read(path)?;
    let checkpoint: Checkpoint = serde_json::from_slice(&bytes)?;
    checkpoint.restore()?;
    Ok(checkpoint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, Decimal128Array, StringArray};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rust_decimal::Decimal;
    use sim_core::{
        batch_id, Delivery, DeliveryStatus, DriverId, InventoryRecord, OrderItem,
        ProductId, SimulationState, WarehouseId,
    };

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 3, 9).unwrap()
    }

    fn item(n: u64) -> OrderItem {
        let ts = date().and_hms_opt(9, 30, 0).unwrap();
        OrderItem {
            order_item_id: format!("ITEM-20220309-{n:05}-01"),
            order_id: format!("ORD-20220309-{n:05}"),
            product_id: ProductId::from("PROD-0042"),
            quantity: 2,
            unit_price: Decimal::new(1999, 2),
            discount_amount: Decimal::new(200, 2),
            revenue: Decimal::new(3798, 2),
            created_at: ts,
            batch_id: batch_id(date()),
        }
    }

    fn failed_delivery() -> Delivery {
        let ts = date().and_hms_opt(10, 0, 0).unwrap();
        Delivery {
            delivery_id: "DEL-20220309-00001".into(),
            order_id: "ORD-20220309-00001".into(),
            driver_id: DriverId::from("DRV-0003"),
            warehouse_id: WarehouseId::from("WH-002"),
            assigned_time: ts,
            pickup_time: ts,
            delivered_time: None,
            estimated_eta_minutes: 41.5,
            actual_delivery_minutes: None,
            distance_km: 12.25,
            delivery_cost: Decimal::new(1450, 2),
            delivery_status: DeliveryStatus::Failed,
            on_time_flag: None,
            sla_minutes: 240,
            sla_breach_flag: None,
            created_at: ts,
            batch_id: batch_id(date()),
        }
    }

    #[test]
    fn format_parses_aliases() {
        assert_eq!("CSV".parse::<Format>().unwrap(), Format::Csv);
        assert_eq!("ndjson".parse::<Format>().unwrap(), Format::JsonLines);
        assert!(matches!("xlsx".parse::<Format>(), Err(PersistError::UnknownFormat(_))));
    }

    #[test]
    fn batches_split_on_row_limit() {
        let rows: Vec<OrderItem> = (1..=2500).map(item).collect();
        let batches = to_batches(&rows).unwrap();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches.iter().map(|b| b.num_rows()).sum::<usize>(), 2500);
        let revenue = batches[0]
            .column_by_name("revenue")
            .unwrap()
            .as_any()
            .downcast_ref::<Decimal128Array>()
            .unwrap();
        assert_eq!(revenue.value(0), 3798);
    }

    #[test]
    fn empty_table_keeps_schema() {
        let batches = to_batches::<OrderItem>(&[]).unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].num_rows(), 0);
        assert_eq!(batches[0].schema().fields().len(), 9);
    }

    #[test]
    fn optional_fields_become_nulls() {
        let batches = to_batches(&[failed_delivery()]).unwrap();
        let b = &batches[0];
        assert!(b.column_by_name("delivered_time").unwrap().is_null(0));
        assert!(b.column_by_name("on_time_flag").unwrap().is_null(0));
        let status = b
            .column_by_name("delivery_status")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(status.value(0), "Failed");
    }

    #[test]
    fn parquet_partition_round_trips_row_count() {
        let dir = tempfile::tempdir().unwrap();
        let writer = PartitionWriter::new(dir.path(), Format::Parquet);
        let rows: Vec<OrderItem> = (1..=10).map(item).collect();
        let path = writer.write_table(&rows, Some(date())).unwrap();
        assert_eq!(
            path,
            dir.path().join("raw/fact_order_items/date=2022-03-09/data.parquet")
        );
        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&path).unwrap())
            .unwrap()
            .build()
            .unwrap();
        let total: usize = reader.map(|b| b.unwrap().num_rows()).sum();
        assert_eq!(total, 10);
    }

    #[test]
    fn csv_has_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let writer = PartitionWriter::new(dir.path(), Format::Csv);
        let path = writer.write_table(&[item(1), item(2)], Some(date())).unwrap();
        let text = fs::read_to_string(path).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("order_item_id,order_id,product_id"));
        assert_eq!(lines.count(), 2);
    }

    #[test]
    fn jsonl_writes_one_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let writer = PartitionWriter::new(dir.path(), Format::JsonLines);
        let path = writer.write_table(&[failed_delivery()], Some(date())).unwrap();
        let text = fs::read_to_string(path).unwrap();
        let v: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(v["delivery_status"], "Failed");
        assert!(v["delivered_time"].is_null());
    }

    #[test]
    fn day_without_shipments_skips_that_table() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = PartitionWriter::new(dir.path(), Format::JsonLines);
        let day = DayOutput {
            date: date(),
            day: 1,
            order_items: vec![item(1)],
            ..DayOutput::default()
        };
        writer.write_day(&day).unwrap();
        assert!(writer.partition_dir("fact_orders", Some(date())).join("data.jsonl").exists());
        assert!(!writer.partition_dir("fact_shipments", Some(date())).exists());
        assert!(!writer
            .partition_dir("fact_experiment_assignments", Some(date()))
            .exists());
    }

    #[test]
    fn checkpoint_save_replaces_and_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state/checkpoint.json");
        let mut state = SimulationState::default();
        state.inventory.insert(
            sim_core::CellKey::new(WarehouseId::from("WH-001"), ProductId::from("PROD-0001")),
            InventoryRecord::with_stock(77),
        );
        let rng = ChaCha8Rng::seed_from_u64(42);
        let first = Checkpoint::capture(&state, date(), &rng);
        save_checkpoint(&path, &first).unwrap();
        state.shipment_counter = 19;
        let second = Checkpoint::capture(&state, date().succ_opt().unwrap(), &rng);
        save_checkpoint(&path, &second).unwrap();

        let loaded = load_checkpoint(&path).unwrap();
        assert_eq!(loaded, second);
        assert!(!dir.path().join("state/checkpoint.json.tmp").exists());
    }

    #[test]
    fn malformed_checkpoint_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cp.json");
        let rng = ChaCha8Rng::seed_from_u64(1);
        let mut cp = Checkpoint::capture(&SimulationState::default(), date(), &rng);
        cp.inventory_state
            .insert("WH-001-PROD-0001".into(), InventoryRecord::baseline());
        fs::write(&path, serde_json::to_vec(&cp).unwrap()).unwrap();
        assert!(matches!(
            load_checkpoint(&path),
            Err(PersistError::Checkpoint(CheckpointError::InvalidKey(_)))
        ));
    }
}
