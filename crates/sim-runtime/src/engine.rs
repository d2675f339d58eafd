//! Daily orchestrator and backfill driver.

use crate::config::{ConfigError, SimParams};
use crate::deliveries::{generate_deliveries, generate_driver_activity};
use crate::dimensions::{apply_extension_changes, generate_dimensions};
use crate::experiments::generate_assignments;
use crate::inventory::{advance_inventory, initialize_inventory, DayActivity};
use crate::orders::generate_orders;
use crate::sampling::Samplers;
use crate::shipments::advance_shipments;
use chrono::NaiveDate;
use persistence::{save_checkpoint, PersistError, TableSink};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use sim_core::{
    validate_dimensions, Checkpoint, CheckpointError, DayOutput, Dimensions, RngPosition,
    SimulationState, ValidationError,
};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Offset from `seed` of the stream that draws extension dimension changes.
const EXTENSION_STREAM: u64 = 2;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid dimensions: {0}")]
    Validation(#[from] ValidationError),
    #[error("invalid checkpoint: {0}")]
    Checkpoint(#[from] CheckpointError),
    #[error("failed to persist {failed_date} (last completed {last_completed:?}, {days_written} days written): {source}")]
    Persist {
        failed_date: NaiveDate,
        last_completed: Option<NaiveDate>,
        days_written: u32,
        #[source]
        source: PersistError,
    },
    #[error("failed to save checkpoint {}: {source}", path.display())]
    SaveCheckpoint {
        path: PathBuf,
        #[source]
        source: PersistError,
    },
}

/// A running simulation: parameters, dimensions, carried state and the
/// random stream, advanced one day per [`Simulation::step`].
///
/// Several simulations may coexist; nothing is global.
#[derive(Clone, Debug)]
pub struct Simulation {
    params: SimParams,
    dims: Dimensions,
    samplers: Samplers,
    state: SimulationState,
    rng: ChaCha8Rng,
    next_date: NaiveDate,
    extension_applied: bool,
}

impl Simulation {
    /// Start a fresh run at `params.start_date` with randomized opening stock.
    pub fn new(params: SimParams, dims: Dimensions, mut rng: ChaCha8Rng) -> Result<Self, SimError> {
        params.validate()?;
        validate_dimensions(&dims)?;
        let samplers = Samplers::from_params(&params)?;
        for category in dims.unsupplied_categories() {
            warn!(%category, "no supplier serves category; its products will never be replenished");
        }
        let mut state = SimulationState::with_offsets(&params.counters);
        state.inventory = initialize_inventory(&dims.warehouses, &dims.products, &params, &mut rng);
        info!(
            start = %params.start_date,
            end = %params.end_date,
            cells = state.inventory.len(),
            "simulation initialised"
        );
        let next_date = params.start_date;
        let mut sim = Self {
            params,
            dims,
            samplers,
            state,
            rng,
            next_date,
            extension_applied: false,
        };
        sim.apply_extension(next_date);
        Ok(sim)
    }

    /// Fresh run whose dimensions and simulation draws share one stream seeded by `params.seed`.
    pub fn seeded(params: SimParams) -> Result<Self, SimError> {
        let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
        let dims = generate_dimensions(&params, &mut rng);
        Self::new(params, dims, rng)
    }

    /// Continue a paused run. `params.end_date` may lie beyond the original run's.
    ///
    /// `dims` must hold the same warehouse × product cells as the checkpoint.
    pub fn from_checkpoint(
        params: SimParams,
        dims: Dimensions,
        checkpoint: &Checkpoint,
    ) -> Result<Self, SimError> {
        params.validate()?;
        validate_dimensions(&dims)?;
        let samplers = Samplers::from_params(&params)?;
        let (state, next_date, rng) = checkpoint.restore()?;
        state.check_cells(&dims)?;
        info!(
            next_date = %next_date,
            end = %params.end_date,
            day = state.day_counter,
            pending = state.pending_shipments.len(),
            "simulation resumed"
        );
        let mut sim = Self {
            params,
            dims,
            samplers,
            state,
            rng,
            next_date,
            extension_applied: false,
        };
        sim.apply_extension(next_date);
        Ok(sim)
    }

    /// [`Simulation::from_checkpoint`] with dimensions regenerated from `params.seed`.
    ///
    /// The checkpoint's stream must come from the same seed.
    pub fn resume(params: SimParams, checkpoint: &Checkpoint) -> Result<Self, SimError> {
        let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
        if RngPosition::capture(&rng).seed != checkpoint.rng.seed {
            return Err(CheckpointError::DimensionMismatch(format!(
                "checkpoint was not taken from a run seeded with {}",
                params.seed
            ))
            .into());
        }
        let dims = generate_dimensions(&params, &mut rng);
        Self::from_checkpoint(params, dims, checkpoint)
    }

    /// Swap in the extension-period dimensions once `date` reaches the
    /// configured effective date. Draws from its own stream so the result
    /// does not depend on where the run was paused.
    fn apply_extension(&mut self, date: NaiveDate) {
        if self.extension_applied {
            return;
        }
        let Some(ext) = &self.params.extension else {
            return;
        };
        if date < ext.effective_date {
            return;
        }
        let mut rng = ChaCha8Rng::seed_from_u64(self.params.seed.wrapping_add(EXTENSION_STREAM));
        apply_extension_changes(&mut self.dims, ext, &mut rng);
        self.extension_applied = true;
    }

    /// Whether the extension dimension changes are in effect.
    pub fn extension_applied(&self) -> bool {
        self.extension_applied
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint::capture(&self.state, self.next_date, &self.rng)
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn dims(&self) -> &Dimensions {
        &self.dims
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Next day [`Simulation::step`] will simulate.
    pub fn next_date(&self) -> NaiveDate {
        self.next_date
    }

    pub fn is_finished(&self) -> bool {
        self.next_date > self.params.end_date
    }

    pub fn remaining_days(&self) -> u32 {
        if self.is_finished() {
            return 0;
        }
        ((self.params.end_date - self.next_date).num_days() + 1) as u32
    }

    /// Simulate the next day, or `None` once the end date has been passed.
    ///
    /// Order of work: orders, shipment pipeline (yesterday's reorders become
    /// shipments, due shipments arrive), inventory ledger, deliveries,
    /// driver activity, experiment assignments.
    pub fn step(&mut self) -> Option<DayOutput> {
        let date = self.next_date;
        if date > self.params.end_date {
            return None;
        }
        let next = date.succ_opt()?;
        let day = self.state.day_counter + 1;
        self.apply_extension(date);

        let active = self.dims.active_experiments(date);
        let (orders, order_items) = generate_orders(
            date,
            &self.dims,
            &active,
            &self.params,
            &self.samplers,
            &mut self.rng,
        );
        let shipments = advance_shipments(
            date,
            &self.dims.products,
            &self.dims.suppliers,
            &mut self.state,
            &self.params,
            &mut self.rng,
        );
        let activity = DayActivity {
            orders: &orders,
            items: &order_items,
            arriving: &shipments.arriving,
        };
        let inventory = advance_inventory(
            date,
            &self.dims,
            &activity,
            &mut self.state.inventory,
            &self.params,
            &mut self.rng,
        );
        let deliveries = generate_deliveries(
            date,
            &orders,
            &self.dims,
            &self.params,
            &mut self.state.delivery_counter,
            &mut self.rng,
        );
        let driver_activity =
            generate_driver_activity(date, &self.dims.drivers, &deliveries, &self.params, &mut self.rng);
        let assignments = generate_assignments(date, &orders, &mut self.state.assignment_counter);

        self.state.day_counter = day;
        self.next_date = next;
        debug!(
            %date,
            day,
            orders = orders.len(),
            shipments = shipments.created.len(),
            arrivals = shipments.arriving.len(),
            deliveries = deliveries.len(),
            "day simulated"
        );
        Some(DayOutput {
            date,
            day,
            orders,
            order_items,
            inventory,
            shipments: shipments.created,
            arrivals: shipments.arriving,
            deliveries,
            driver_activity,
            assignments,
        })
    }
}

impl Iterator for Simulation {
    type Item = DayOutput;

    fn next(&mut self) -> Option<DayOutput> {
        self.step()
    }
}

/// Backfill knobs.
#[derive(Clone, Debug)]
pub struct RunOptions {
    /// Log progress every N days (and on the first day). Zero disables it.
    pub progress_every: u32,
    /// Save a checkpoint every N days when `checkpoint_path` is set.
    pub checkpoint_every: Option<u32>,
    /// Checkpoint destination; also written once the run completes.
    pub checkpoint_path: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            progress_every: 30,
            checkpoint_every: None,
            checkpoint_path: None,
        }
    }
}

/// Row totals accumulated over a backfill.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub days: u32,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub orders: usize,
    pub order_items: usize,
    pub inventory_snapshots: usize,
    pub shipments: usize,
    pub arrivals: usize,
    pub deliveries: usize,
    pub driver_activity: usize,
    pub assignments: usize,
}

impl RunSummary {
    pub fn record(&mut self, day: &DayOutput) {
        self.days += 1;
        self.first_date.get_or_insert(day.date);
        self.last_date = Some(day.date);
        self.orders += day.orders.len();
        self.order_items += day.order_items.len();
        self.inventory_snapshots += day.inventory.len();
        self.shipments += day.shipments.len();
        self.arrivals += day.arrivals.len();
        self.deliveries += day.deliveries.len();
        self.driver_activity += day.driver_activity.len();
        self.assignments += day.assignments.len();
    }

    /// Rows across all persisted tables.
    pub fn total_rows(&self) -> usize {
        self.orders
            + self.order_items
            + self.inventory_snapshots
            + self.shipments
            + self.deliveries
            + self.driver_activity
            + self.assignments
    }
}

/// Run `sim` to its end date, persisting each day before the next is simulated.
///
/// A failing write aborts the run. Partitions written before the failure
/// stay on disk and the error names the last completed date.
pub fn run_backfill(
    sim: &mut Simulation,
    sink: &mut dyn TableSink,
    opts: &RunOptions,
) -> Result<RunSummary, SimError> {
    let total = sim.remaining_days();
    info!(
        start = %sim.next_date(),
        end = %sim.params().end_date,
        days = total,
        "backfill starting"
    );
    let mut summary = RunSummary::default();
    let mut extended = sim.extension_applied();
    while let Some(day) = sim.step() {
        let mut written = Ok(());
        if !extended && sim.extension_applied() {
            extended = true;
            written = sink.write_dimensions(sim.dims());
        }
        if let Err(source) = written.and_then(|()| sink.write_day(&day)) {
            return Err(SimError::Persist {
                failed_date: day.date,
                last_completed: summary.last_date,
                days_written: summary.days,
                source,
            });
        }
        summary.record(&day);

        let n = summary.days;
        if opts.progress_every > 0 && (n == 1 || n % opts.progress_every == 0) {
            info!(
                date = %day.date,
                day = day.day,
                completed = n,
                total,
                orders = summary.orders,
                shipments = summary.shipments,
                "progress"
            );
        }
        if let (Some(path), Some(every)) = (&opts.checkpoint_path, opts.checkpoint_every) {
            if every > 0 && n % every == 0 && !sim.is_finished() {
                write_checkpoint(sim, path)?;
            }
        }
    }
    if let Some(path) = &opts.checkpoint_path {
        write_checkpoint(sim, path)?;
    }
    info!(
        days = summary.days,
        rows = summary.total_rows(),
        orders = summary.orders,
        deliveries = summary.deliveries,
        "backfill complete"
    );
    Ok(summary)
}

fn write_checkpoint(sim: &Simulation, path: &Path) -> Result<(), SimError> {
    save_checkpoint(path, &sim.checkpoint()).map_err(|source| SimError::SaveCheckpoint {
        path: path.to_path_buf(),
        source,
    })
}
