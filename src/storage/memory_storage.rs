use crate::{
    domain::{Item, ItemEvent, ItemId, Lane, OrderDetails, Rank},
    error::Result,
    storage::{BoardStore, BoardState, RankAssignment},
};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};
use tokio::sync::RwLock;

/// In-process storage for single-instance deployments and tests
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: RwLock<BoardState>,
    initialized: AtomicBool,
    rank_writes: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of item rows written by rank updates so far
    pub fn rank_writes(&self) -> usize {
        self.rank_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BoardStore for MemoryStorage {
    async fn initialize(&self) -> Result<()> {
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    async fn get_ranks(&self, ids: &[ItemId]) -> Result<HashMap<ItemId, Rank>> {
        Ok(self.state.read().await.get_ranks(ids))
    }

    async fn max_position(&self, lane: Lane) -> Result<Option<i64>> {
        Ok(self.state.read().await.max_position(lane))
    }

    async fn insert_item(&self, item: &Item) -> Result<()> {
        self.state.write().await.insert_item(item.clone())
    }

    async fn load_item(&self, id: &ItemId) -> Result<Item> {
        self.state.read().await.load_item(id)
    }

    async fn list_lane(&self, lane: Lane) -> Result<Vec<Item>> {
        Ok(self.state.read().await.list_lane(lane))
    }

    async fn list_items(&self) -> Result<Vec<Item>> {
        Ok(self.state.read().await.items.values().cloned().collect())
    }

    async fn update_details(&self, id: &ItemId, details: &OrderDetails) -> Result<Item> {
        self.state.write().await.update_details(id, details.clone())
    }

    async fn delete_item(&self, id: &ItemId) -> Result<()> {
        self.state.write().await.delete_item(id)
    }

    async fn apply_rank_update(&self, assignments: &[RankAssignment]) -> Result<()> {
        // Both phases run under one write guard, so readers only ever see
        // the state before or after the batch.
        self.state.write().await.apply_rank_update(assignments)?;
        self.rank_writes
            .fetch_add(assignments.len(), Ordering::SeqCst);
        Ok(())
    }

    async fn record_event(&self, event: &ItemEvent) -> Result<()> {
        self.state.write().await.record_event(event.clone());
        Ok(())
    }

    async fn events_for(&self, id: &ItemId) -> Result<Vec<ItemEvent>> {
        Ok(self.state.read().await.events_for(id))
    }
}
