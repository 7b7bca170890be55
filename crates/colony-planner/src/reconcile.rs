//! Plan reconciler: diff placed entries against the live world.
//!
//! An entry marked placed whose structure is gone (destroyed, decayed, or a
//! site that was cancelled) goes back into the unplaced pool with its
//! `rebuild` flag set, so the next placement pass re-queues it ahead of new
//! work. Nothing is replanned here.

use colony_types::{StructureKind, ZonePlan};
use colony_world::Occupancy;
use serde::Serialize;
use tracing::{debug, info};

use crate::layout;

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Placed entries inspected.
    pub checked: usize,
    /// Buildings found missing and re-queued.
    pub missing_buildings: usize,
    /// Road segments found missing and re-queued.
    pub missing_roads: usize,
}

impl ReconcileReport {
    /// Total entries re-queued.
    pub const fn missing(&self) -> usize {
        self.missing_buildings.saturating_add(self.missing_roads)
    }
}

/// Flip every placed entry with no matching structure or site back to
/// unplaced.
pub fn reconcile(plan: &mut ZonePlan, occupancy: &Occupancy) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    for building in plan.buildings.iter_mut().filter(|b| b.placed) {
        report.checked = report.checked.saturating_add(1);
        let present = occupancy.has_structure(building.position, building.kind)
            || occupancy.has_site(building.position, building.kind);
        if !present {
            debug!(
                zone = %plan.zone,
                kind = ?building.kind,
                position = %building.position,
                "Planned structure missing"
            );
            building.placed = false;
            building.site_id = None;
            building.rebuild = true;
            report.missing_buildings = report.missing_buildings.saturating_add(1);
        }
    }

    for road in plan.roads.iter_mut().filter(|r| r.placed) {
        report.checked = report.checked.saturating_add(1);
        let present = occupancy.has_road(road.position)
            || occupancy.has_site(road.position, StructureKind::Road);
        if !present {
            road.placed = false;
            road.site_id = None;
            road.rebuild = true;
            report.missing_roads = report.missing_roads.saturating_add(1);
        }
    }

    if report.missing() > 0 {
        layout::refresh_status(plan);
        info!(
            zone = %plan.zone,
            checked = report.checked,
            missing_buildings = report.missing_buildings,
            missing_roads = report.missing_roads,
            "Plan reconciled"
        );
    }
    report
}
