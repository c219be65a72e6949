use crate::{
    domain::{ItemEvent, ItemEventKind, ItemId, Lane, Rank, RankEntry},
    engine::BoardEngine,
    error::{BoardError, Result},
    notify::{BoardEvent, Origin},
    storage::RankAssignment,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

pub const NO_CHANGES_REASON: &str = "no changes needed";

/// Result of a reorder call, `{ applied, reason? }` on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReorderOutcome {
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Items actually written
    #[serde(skip)]
    pub changed: Vec<RankAssignment>,
}

impl ReorderOutcome {
    fn unchanged() -> Self {
        Self {
            applied: true,
            reason: Some(NO_CHANGES_REASON.to_string()),
            changed: Vec::new(),
        }
    }

    fn applied(changed: Vec<RankAssignment>) -> Self {
        Self {
            applied: true,
            reason: None,
            changed,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.changed.is_empty()
    }
}

/// One write of a diff set together with the rank it replaces
#[derive(Debug, Clone, Copy)]
pub(super) struct Change {
    pub assignment: RankAssignment,
    pub previous: Rank,
}

impl Change {
    fn event_kind(&self) -> ItemEventKind {
        if self.previous.lane == self.assignment.lane {
            ItemEventKind::Reordered
        } else {
            ItemEventKind::StatusChange {
                from: self.previous.lane,
                to: self.assignment.lane,
            }
        }
    }
}

impl BoardEngine {
    /// Brings `lane` to the proposed arrangement.
    ///
    /// Entries may carry their own lane to move an item across lanes; the
    /// destination position is taken verbatim, nothing is auto-appended.
    /// Unknown ids are skipped. Only items whose rank differs are written, and
    /// an arrangement identical to storage returns without touching it.
    pub async fn reorder(
        &self,
        origin: Origin,
        lane: Lane,
        items: &[RankEntry],
    ) -> Result<ReorderOutcome> {
        validate_request(items)?;

        let _gate = self.write_gate.lock().await;

        let ids: Vec<ItemId> = items.iter().map(|entry| entry.id).collect();
        let current = self.store.get_ranks(&ids).await?;
        ensure_distinct_targets(lane, items, &current)?;
        let changes = diff_set(lane, items, &current);

        if changes.is_empty() {
            tracing::debug!(%lane, requested = items.len(), "reorder is a no-op");
            return Ok(ReorderOutcome::unchanged());
        }

        self.apply_changes(&changes).await?;
        tracing::info!(%lane, requested = items.len(), changed = changes.len(), "reorder applied");

        let arrangement = items
            .iter()
            .filter(|entry| current.contains_key(&entry.id))
            .map(|entry| {
                let target = entry.resolved_lane(lane);
                let resolved = RankEntry::new(entry.id, entry.position);
                if target == lane {
                    resolved
                } else {
                    resolved.in_lane(target)
                }
            })
            .collect();
        self.publish(
            origin,
            BoardEvent::Reordered {
                lane,
                items: arrangement,
            },
        );

        Ok(ReorderOutcome::applied(
            changes.into_iter().map(|change| change.assignment).collect(),
        ))
    }

    /// Writes a diff set through the store's two-phase update and records
    /// the audit trail. Callers hold the write gate.
    pub(super) async fn apply_changes(&self, changes: &[Change]) -> Result<()> {
        let assignments: Vec<RankAssignment> =
            changes.iter().map(|change| change.assignment).collect();
        self.store.apply_rank_update(&assignments).await?;

        for change in changes {
            self.record(ItemEvent::new(change.assignment.id, change.event_kind()))
                .await;
        }
        Ok(())
    }
}

/// Rejects requests that are malformed regardless of what is stored
fn validate_request(items: &[RankEntry]) -> Result<()> {
    let mut ids = HashSet::with_capacity(items.len());

    for entry in items {
        if entry.position < 0 {
            return Err(BoardError::ConstraintViolation(format!(
                "negative position {} for item {}",
                entry.position, entry.id
            )));
        }
        if !ids.insert(entry.id) {
            return Err(BoardError::ConstraintViolation(format!(
                "item {} appears more than once",
                entry.id
            )));
        }
    }
    Ok(())
}

/// Rejects two stored items aimed at the same (lane, position). Entries for
/// unknown ids are ignored, they never reach the store.
fn ensure_distinct_targets(
    lane: Lane,
    items: &[RankEntry],
    current: &HashMap<ItemId, Rank>,
) -> Result<()> {
    let mut ranks = HashSet::with_capacity(items.len());

    for entry in items.iter().filter(|entry| current.contains_key(&entry.id)) {
        let target = Rank::new(entry.resolved_lane(lane), entry.position);
        if !ranks.insert(target) {
            return Err(BoardError::ConstraintViolation(format!(
                "position {} in lane {} requested twice",
                target.position, target.lane
            )));
        }
    }
    Ok(())
}

/// Requested entries whose stored rank differs, in request order
fn diff_set(lane: Lane, items: &[RankEntry], current: &HashMap<ItemId, Rank>) -> Vec<Change> {
    items
        .iter()
        .filter_map(|entry| {
            let previous = *current.get(&entry.id)?;
            let target = RankAssignment::new(entry.id, entry.resolved_lane(lane), entry.position);
            (target.rank() != previous).then_some(Change {
                assignment: target,
                previous,
            })
        })
        .collect()
}
