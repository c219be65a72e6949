//! Whole-board state shared by the in-process backends.

use crate::{
    domain::{
        sort_items, Item, ItemEvent, ItemId, Lane, OrderDetails, Rank, SortField, SortOrder,
    },
    error::{BoardError, Result},
    storage::{placeholder_position, RankAssignment},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Items and events of a board, held entirely in memory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardState {
    pub items: BTreeMap<ItemId, Item>,
    #[serde(default)]
    pub events: Vec<ItemEvent>,
}

impl BoardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_ranks(&self, ids: &[ItemId]) -> HashMap<ItemId, Rank> {
        ids.iter()
            .filter_map(|id| self.items.get(id).map(|item| (*id, item.rank())))
            .collect()
    }

    pub fn max_position(&self, lane: Lane) -> Option<i64> {
        self.items
            .values()
            .filter(|item| item.lane == lane)
            .map(|item| item.position)
            .max()
    }

    pub fn insert_item(&mut self, item: Item) -> Result<()> {
        if self.items.contains_key(&item.id) {
            return Err(BoardError::ConstraintViolation(format!(
                "item {} already exists",
                item.id
            )));
        }
        if let Some(holder) = self.holder_of(item.rank()) {
            return Err(BoardError::ConstraintViolation(format!(
                "position {} in lane {} is held by {}",
                item.position, item.lane, holder
            )));
        }
        self.items.insert(item.id, item);
        Ok(())
    }

    pub fn load_item(&self, id: &ItemId) -> Result<Item> {
        self.items
            .get(id)
            .cloned()
            .ok_or_else(|| BoardError::NotFound(id.to_string()))
    }

    pub fn list_lane(&self, lane: Lane) -> Vec<Item> {
        let mut items: Vec<Item> = self
            .items
            .values()
            .filter(|item| item.lane == lane)
            .cloned()
            .collect();
        sort_items(&mut items, SortField::Position, SortOrder::Ascending);
        items
    }

    /// Removes the item and its audit trail
    pub fn delete_item(&mut self, id: &ItemId) -> Result<()> {
        self.items
            .remove(id)
            .ok_or_else(|| BoardError::NotFound(id.to_string()))?;
        self.events.retain(|event| &event.item_id != id);
        Ok(())
    }

    /// Replaces the order data of an item, keeping its rank
    pub fn update_details(&mut self, id: &ItemId, details: OrderDetails) -> Result<Item> {
        let item = self
            .items
            .get_mut(id)
            .ok_or_else(|| BoardError::NotFound(id.to_string()))?;
        item.details = details;
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    /// Two-phase rank update on this state. On error `self` is untouched.
    pub fn apply_rank_update(&mut self, assignments: &[RankAssignment]) -> Result<()> {
        let mut working = self.items.clone();

        // Phase A: displace every assigned item out of the legitimate range.
        for (index, assignment) in assignments.iter().enumerate() {
            let item = working.get_mut(&assignment.id).ok_or_else(|| {
                BoardError::ConstraintViolation(format!(
                    "item {} vanished during rank update",
                    assignment.id
                ))
            })?;
            item.position = placeholder_position(index);
        }
        ensure_unique(&working)?;

        // Phase B: commit final ranks.
        for assignment in assignments {
            if let Some(item) = working.get_mut(&assignment.id) {
                item.set_rank(assignment.rank());
            }
        }
        ensure_unique(&working)?;

        self.items = working;
        Ok(())
    }

    pub fn record_event(&mut self, event: ItemEvent) {
        self.events.push(event);
    }

    pub fn events_for(&self, id: &ItemId) -> Vec<ItemEvent> {
        self.events
            .iter()
            .filter(|event| &event.item_id == id)
            .cloned()
            .collect()
    }

    fn holder_of(&self, rank: Rank) -> Option<ItemId> {
        self.items
            .values()
            .find(|item| item.rank() == rank)
            .map(|item| item.id)
    }
}

fn ensure_unique(items: &BTreeMap<ItemId, Item>) -> Result<()> {
    let mut seen = HashSet::with_capacity(items.len());
    for item in items.values() {
        if !seen.insert(item.rank()) {
            return Err(BoardError::ConstraintViolation(format!(
                "duplicate position {} in lane {}",
                item.position, item.lane
            )));
        }
    }
    Ok(())
}
