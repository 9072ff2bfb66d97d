//! Compares fetched costs against the stored snapshot.

use tracing::{debug, warn};

use crate::config::DropPolicy;
use crate::models::{CostChangeRecord, PriceSnapshot};

/// Which way a cost moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Decrease,
    Increase,
}

/// A record whose cost differs from the stored one and passed the policy.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub sku: String,
    pub current_cost: f64,
    pub previous_cost: f64,
    pub direction: Direction,
    pub record: CostChangeRecord,
}

/// Result of comparing one batch of changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detection {
    /// In fetch order.
    pub candidates: Vec<Candidate>,
    /// The previous snapshot with every cost seen in this batch applied.
    pub snapshot: PriceSnapshot,
}

/// Split `records` into notification candidates and the next snapshot.
///
/// Records without a SKU or cost are ignored. A SKU seen for the first time
/// is only recorded. A SKU whose cost differs from `previous` becomes a
/// candidate when `policy` accepts the direction of the move. Every seen
/// cost lands in the returned snapshot regardless.
pub fn detect(records: &[CostChangeRecord], previous: &PriceSnapshot, policy: DropPolicy) -> Detection {
    let mut snapshot = previous.clone();
    let mut candidates = Vec::new();

    for record in records {
        let (Some(sku), Some(current_cost)) = (record.sku.as_deref(), record.current_cost) else {
            continue;
        };

        if let Some(previous_cost) = previous.get(sku) {
            if previous_cost != current_cost {
                let direction = if current_cost < previous_cost {
                    Direction::Decrease
                } else {
                    Direction::Increase
                };

                let accepted = match policy {
                    DropPolicy::DecreaseOnly => direction == Direction::Decrease,
                    DropPolicy::AnyChange => true,
                };

                if accepted {
                    if direction == Direction::Increase {
                        warn!(
                            sku = %sku,
                            previous_cost,
                            current_cost,
                            "cost increased; notifying because drop policy is 'any'"
                        );
                    }
                    candidates.push(Candidate {
                        sku: sku.to_string(),
                        current_cost,
                        previous_cost,
                        direction,
                        record: record.clone(),
                    });
                } else {
                    debug!(sku = %sku, previous_cost, current_cost, "cost increased, not a drop");
                }
            }
        }

        snapshot.insert(sku, current_cost);
    }

    Detection {
        candidates,
        snapshot,
    }
}
