use crate::{
    domain::{Item, ItemEvent, ItemId, Lane, OrderDetails, Rank},
    error::Result,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod memory_storage;
pub mod state;

#[cfg(feature = "file-storage")]
pub mod file_storage;

#[cfg(feature = "sqlite-storage")]
pub mod sqlite_storage;

pub use memory_storage::MemoryStorage;
pub use state::BoardState;

#[cfg(feature = "file-storage")]
pub use file_storage::FileStorage;

#[cfg(feature = "sqlite-storage")]
pub use sqlite_storage::SqliteStorage;

/// First placeholder rank used while displacing items during a rank update.
/// Legitimate positions are non-negative, so the range below never collides.
pub const DISPLACE_BASE: i64 = -1000;

/// Placeholder rank for the item at `index` within a rank update batch
pub fn placeholder_position(index: usize) -> i64 {
    DISPLACE_BASE - index as i64
}

/// Final lane and position for one item of a rank update batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RankAssignment {
    pub id: ItemId,
    pub lane: Lane,
    pub position: i64,
}

impl RankAssignment {
    pub fn new(id: ItemId, lane: Lane, position: i64) -> Self {
        Self { id, lane, position }
    }

    pub fn rank(&self) -> Rank {
        Rank::new(self.lane, self.position)
    }
}

/// Storage trait for persisting board items and their audit trail
#[async_trait]
pub trait BoardStore: Send + Sync {
    /// Initializes the storage backend
    async fn initialize(&self) -> Result<()>;

    /// Checks if the backend has been initialized
    async fn is_initialized(&self) -> bool;

    /// Current rank of every existing id; unknown ids are omitted
    async fn get_ranks(&self, ids: &[ItemId]) -> Result<HashMap<ItemId, Rank>>;

    /// Highest position in the lane, `None` for an empty lane
    async fn max_position(&self, lane: Lane) -> Result<Option<i64>>;

    /// Inserts a new item; fails if its rank is already taken
    async fn insert_item(&self, item: &Item) -> Result<()>;

    /// Loads an item by ID
    async fn load_item(&self, id: &ItemId) -> Result<Item>;

    /// Items of one lane ordered by position
    async fn list_lane(&self, lane: Lane) -> Result<Vec<Item>>;

    /// Every item on the board, in no particular order
    async fn list_items(&self) -> Result<Vec<Item>>;

    /// Replaces an item's order data; its rank is untouched
    async fn update_details(&self, id: &ItemId, details: &OrderDetails) -> Result<Item>;

    /// Deletes an item together with its audit events
    async fn delete_item(&self, id: &ItemId) -> Result<()>;

    /// Applies all assignments or none.
    ///
    /// Implementations first displace every assigned item to
    /// [`placeholder_position`] and only then write the final ranks, so ranks
    /// permuted among the batch never collide. Readers never observe the
    /// displaced state. A vanished id or a final duplicate `(lane, position)`
    /// fails the batch with `ConstraintViolation`.
    async fn apply_rank_update(&self, assignments: &[RankAssignment]) -> Result<()>;

    /// Appends an audit event
    async fn record_event(&self, event: &ItemEvent) -> Result<()>;

    /// Audit events for an item, oldest first
    async fn events_for(&self, id: &ItemId) -> Result<Vec<ItemEvent>>;
}
