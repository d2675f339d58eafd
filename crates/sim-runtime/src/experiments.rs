//! Experiment assignment rows for orders enrolled at order time.

use crate::day_start;
use chrono::NaiveDate;
use sim_core::{batch_id, dated_id, ExperimentAssignment, Order};

/// One assignment row per enrolled order, numbered from `counter`.
pub fn generate_assignments(
    date: NaiveDate,
    orders: &[Order],
    counter: &mut u64,
) -> Vec<ExperimentAssignment> {
    let created_at = day_start(date);
    let batch = batch_id(date);
    let mut rows = Vec::new();
    for order in orders {
        let (Some(experiment_id), Some(group)) = (&order.experiment_id, order.experiment_group)
        else {
            continue;
        };
        rows.push(ExperimentAssignment {
            assignment_id: dated_id("ASG", date, *counter, 5),
            experiment_id: experiment_id.clone(),
            order_id: order.order_id.clone(),
            group_name: group,
            assigned_at: order.order_timestamp,
            warehouse_id: order.assigned_warehouse_id.clone(),
            created_at,
            batch_id: batch.clone(),
        });
        *counter += 1;
    }
    rows
}
