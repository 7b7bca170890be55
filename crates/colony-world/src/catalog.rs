//! Structure catalog: per-tier layout templates and structure-count limits.
//!
//! - [`template`] returns the fixed relative layout unlocked at a tier
//! - [`cumulative_buildings`] concatenates templates 1..=tier
//! - [`limit`] / [`limits`] give the per-kind ceiling at a tier
//! - [`apply`] resolves a template against an anchor cell
//! - [`validate`] checks a template against its tier's limits
//!
//! Templates use a checkerboard: every structure sits on a cell whose
//! offset satisfies `(dx + dy) % 2 == 0`, leaving the odd cells for roads so
//! every structure touches a lane.

use std::collections::{BTreeMap, BTreeSet};

use colony_types::{Position, StructureKind, Tier};

use crate::error::CatalogError;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Effectively unlimited ceiling for roads, ramparts and walls.
pub const UNLIMITED: u32 = 2500;

/// Per-tier ceilings, index 0 is tier 1.
const fn limit_row(kind: StructureKind) -> [u32; 8] {
    match kind {
        StructureKind::Spawn => [1, 1, 1, 1, 1, 1, 2, 3],
        StructureKind::Extension => [0, 5, 10, 20, 30, 40, 50, 60],
        StructureKind::Road => [UNLIMITED; 8],
        StructureKind::Container => [0, 0, 5, 5, 5, 5, 5, 5],
        StructureKind::Tower => [0, 0, 1, 1, 2, 2, 3, 6],
        StructureKind::Storage => [0, 0, 0, 1, 1, 1, 1, 1],
        StructureKind::Link => [0, 0, 0, 0, 2, 3, 4, 6],
        StructureKind::Terminal | StructureKind::Extractor => [0, 0, 0, 0, 0, 1, 1, 1],
        StructureKind::Lab => [0, 0, 0, 0, 0, 3, 6, 10],
        StructureKind::Factory => [0, 0, 0, 0, 0, 0, 1, 1],
        StructureKind::Observer | StructureKind::PowerSpawn | StructureKind::Nuker => {
            [0, 0, 0, 0, 0, 0, 0, 1]
        }
        StructureKind::Rampart | StructureKind::Wall => [
            0, UNLIMITED, UNLIMITED, UNLIMITED, UNLIMITED, UNLIMITED, UNLIMITED, UNLIMITED,
        ],
    }
}

/// Maximum number of `kind` a zone may hold at `tier`.
pub fn limit(kind: StructureKind, tier: Tier) -> u32 {
    let row = limit_row(kind);
    usize::from(tier.level())
        .checked_sub(1)
        .and_then(|i| row.get(i))
        .copied()
        .unwrap_or(0)
}

/// Every kind's ceiling at `tier`.
pub fn limits(tier: Tier) -> BTreeMap<StructureKind, u32> {
    StructureKind::ALL
        .iter()
        .map(|kind| (*kind, limit(*kind, tier)))
        .collect()
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// One structure in a template, relative to the anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateEntry {
    /// Structure kind.
    pub kind: StructureKind,
    /// Horizontal offset from the anchor.
    pub dx: i8,
    /// Vertical offset from the anchor.
    pub dy: i8,
    /// Construction priority.
    pub priority: u32,
}

const fn entry(kind: StructureKind, dx: i8, dy: i8) -> TemplateEntry {
    TemplateEntry {
        kind,
        dx,
        dy,
        priority: kind.base_priority(),
    }
}

/// The structures unlocked at one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    /// Tier this template belongs to.
    pub tier: Tier,
    /// Relative placements.
    pub entries: &'static [TemplateEntry],
}

use StructureKind::{
    Extension as Ext, Factory, Lab, Link, Nuker, Observer, PowerSpawn, Spawn, Storage, Terminal,
    Tower,
};

const TIER_1: &[TemplateEntry] = &[entry(Spawn, 0, 0)];

const TIER_2: &[TemplateEntry] = &[
    entry(Ext, -1, 1),
    entry(Ext, 1, 1),
    entry(Ext, 3, -1),
    entry(Ext, -3, 1),
    entry(Ext, 3, 1),
];

const TIER_3: &[TemplateEntry] = &[
    entry(Tower, 2, 0),
    entry(Ext, -1, 3),
    entry(Ext, 1, 3),
    entry(Ext, -3, -3),
    entry(Ext, 3, -3),
    entry(Ext, -3, 3),
];

const TIER_4: &[TemplateEntry] = &[
    entry(Storage, 0, -2),
    entry(Ext, -2, -4),
    entry(Ext, 2, -4),
    entry(Ext, -4, -2),
    entry(Ext, 4, -2),
    entry(Ext, -4, 2),
    entry(Ext, 4, 2),
    entry(Ext, -2, 4),
    entry(Ext, 2, 4),
    entry(Ext, -4, -4),
    entry(Ext, 4, -4),
];

const TIER_5: &[TemplateEntry] = &[
    entry(Tower, -2, 0),
    entry(Link, 1, -1),
    entry(Link, 0, -4),
    entry(Ext, -4, 4),
    entry(Ext, -1, -5),
    entry(Ext, 1, -5),
    entry(Ext, -5, -1),
    entry(Ext, 5, -1),
    entry(Ext, -5, 1),
    entry(Ext, 5, 1),
    entry(Ext, -1, 5),
    entry(Ext, 1, 5),
    entry(Ext, -3, -5),
];

const TIER_6: &[TemplateEntry] = &[
    entry(Terminal, -1, -1),
    entry(Lab, 4, 4),
    entry(Lab, 5, 3),
    entry(Lab, 3, 5),
    entry(Link, -4, 0),
    entry(Ext, 3, -5),
    entry(Ext, -5, -3),
    entry(Ext, 5, -3),
    entry(Ext, -5, 3),
    entry(Ext, -3, 5),
    entry(Ext, -5, -5),
    entry(Ext, 5, -5),
    entry(Ext, -5, 5),
    entry(Ext, 6, 0),
    entry(Ext, 0, 6),
];

const TIER_7: &[TemplateEntry] = &[
    entry(Spawn, 0, 2),
    entry(Tower, 0, -6),
    entry(Lab, 5, 5),
    entry(Lab, 6, 4),
    entry(Lab, 4, 6),
    entry(Factory, 1, -3),
    entry(Link, 4, 0),
    entry(Ext, -2, -6),
    entry(Ext, 2, -6),
    entry(Ext, -6, -2),
    entry(Ext, 6, -2),
    entry(Ext, -6, 2),
    entry(Ext, 6, 2),
    entry(Ext, -2, 6),
    entry(Ext, 2, 6),
    entry(Ext, -4, -6),
    entry(Ext, 4, -6),
];

const TIER_8: &[TemplateEntry] = &[
    entry(Spawn, 2, 2),
    entry(Tower, -2, -2),
    entry(Tower, 2, -2),
    entry(Tower, -2, 2),
    entry(Lab, 6, 6),
    entry(Lab, 5, 7),
    entry(Lab, 7, 5),
    entry(Lab, 3, 3),
    entry(Observer, -6, 6),
    entry(PowerSpawn, -1, -3),
    entry(Nuker, -3, -1),
    entry(Link, 0, 4),
    entry(Link, -6, 0),
    entry(Ext, -6, -4),
    entry(Ext, 6, -4),
    entry(Ext, -6, 4),
    entry(Ext, -4, 6),
    entry(Ext, -6, -6),
    entry(Ext, 6, -6),
    entry(Ext, -1, -7),
    entry(Ext, 1, -7),
    entry(Ext, -7, -1),
    entry(Ext, 7, -1),
];

/// The template unlocked at `tier`.
pub fn template(tier: Tier) -> Template {
    let entries = match tier.level() {
        1 => TIER_1,
        2 => TIER_2,
        3 => TIER_3,
        4 => TIER_4,
        5 => TIER_5,
        6 => TIER_6,
        7 => TIER_7,
        _ => TIER_8,
    };
    Template { tier, entries }
}

/// Templates 1..=tier, tagged with the tier each entry unlocks at.
pub fn cumulative_buildings(tier: Tier) -> Vec<(Tier, TemplateEntry)> {
    tier.up_to()
        .flat_map(|t| template(t).entries.iter().map(move |e| (t, *e)))
        .collect()
}

/// A template entry resolved to an absolute cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplatePlacement {
    /// Structure kind.
    pub kind: StructureKind,
    /// Absolute cell.
    pub position: Position,
    /// Construction priority.
    pub priority: u32,
    /// Tier the entry unlocks at.
    pub tier: Tier,
}

/// Resolve a template against `anchor`, dropping cells outside `[1, 48]^2`.
pub fn apply(template: &Template, anchor: Position) -> Vec<TemplatePlacement> {
    template
        .entries
        .iter()
        .filter_map(|e| {
            let position = anchor.offset(e.dx, e.dy)?;
            position.is_interior().then_some(TemplatePlacement {
                kind: e.kind,
                position,
                priority: e.priority,
                tier: template.tier,
            })
        })
        .collect()
}

/// Per-kind counts of a template.
pub fn counts(entries: &[TemplateEntry]) -> BTreeMap<StructureKind, u32> {
    let mut counts = BTreeMap::new();
    for e in entries {
        let slot = counts.entry(e.kind).or_insert(0_u32);
        *slot = slot.saturating_add(1);
    }
    counts
}

/// Check that a template never exceeds its tier's limits and never repeats
/// an offset.
///
/// # Errors
///
/// Returns the first [`CatalogError`] found.
pub fn validate(template: &Template) -> Result<(), CatalogError> {
    let mut seen = BTreeSet::new();
    for e in template.entries {
        if !seen.insert((e.dx, e.dy)) {
            return Err(CatalogError::DuplicateOffset {
                tier: template.tier,
                dx: e.dx,
                dy: e.dy,
            });
        }
    }
    for (kind, count) in counts(template.entries) {
        let ceiling = limit(kind, template.tier);
        if count > ceiling {
            return Err(CatalogError::LimitExceeded {
                tier: template.tier,
                kind,
                count,
                limit: ceiling,
            });
        }
    }
    Ok(())
}
