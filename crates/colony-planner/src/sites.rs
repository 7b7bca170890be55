//! Budgeted construction-site placement shared by buildings and roads.

use colony_types::{Position, SiteId, StructureKind, ZoneId};
use colony_world::{ConstructionExecutor, PlacementError};
use serde::Serialize;
use tracing::{debug, warn};

/// Outcome of one placement pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlacementReport {
    /// Sites the executor accepted.
    pub placed: usize,
    /// Entries marked placed because the structure or site already existed.
    pub adopted: usize,
    /// Attempts the executor rejected.
    pub failed: usize,
    /// Unplaced entries not attempted this pass.
    pub skipped: usize,
}

/// One queued placement; `index` points back into the caller's plan list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Attempt {
    pub index: usize,
    pub position: Position,
    pub kind: StructureKind,
}

/// Try the queue in order, at most `budget` attempts.
///
/// `on_placed` is called with the plan index and correlation id of every
/// accepted site. A site-cap rejection ends the pass; every other rejection
/// is logged and skipped. The report's `skipped` counts queued entries that
/// were never attempted.
pub(crate) fn attempt_all(
    zone: &ZoneId,
    executor: &mut dyn ConstructionExecutor,
    queue: &[Attempt],
    budget: usize,
    report: &mut PlacementReport,
    mut on_placed: impl FnMut(usize, Option<SiteId>),
) {
    let mut attempted: usize = 0;
    for attempt in queue.iter().take(budget) {
        attempted = attempted.saturating_add(1);
        match executor.try_place(zone, attempt.position, attempt.kind) {
            Ok(site) => {
                debug!(
                    %zone,
                    position = %attempt.position,
                    kind = ?attempt.kind,
                    "Construction site placed"
                );
                report.placed = report.placed.saturating_add(1);
                on_placed(attempt.index, site);
            }
            Err(PlacementError::SiteCapReached) => {
                report.failed = report.failed.saturating_add(1);
                warn!(%zone, "Construction site cap reached, ending pass");
                break;
            }
            Err(err) => {
                report.failed = report.failed.saturating_add(1);
                debug!(
                    %zone,
                    position = %attempt.position,
                    kind = ?attempt.kind,
                    %err,
                    "Placement rejected"
                );
            }
        }
    }
    report.skipped = report
        .skipped
        .saturating_add(queue.len().saturating_sub(attempted));
}
