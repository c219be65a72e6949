//! The ordered-board engine.
//!
//! All mutations go through [`BoardEngine`], which serializes them behind a
//! single write gate so that the read, diff and write of one call are never
//! interleaved with another call. Reorders may span several lanes, so the
//! gate covers the whole board rather than one lane.

use crate::{
    config::{EngineConfig, TransitionPolicy},
    domain::{
        sort_items, Arrangement, BoardConfig, ColumnView, Item, ItemEvent, ItemEventKind, ItemId,
        Lane, SortField, SortOrder,
    },
    error::Result,
    notify::{BoardEvent, ChangeNotifier, Envelope, Origin},
    storage::BoardStore,
};
use std::sync::Arc;
use tokio::sync::Mutex;

mod lifecycle;
mod reorder;

pub use reorder::{ReorderOutcome, NO_CHANGES_REASON};

pub struct BoardEngine {
    store: Arc<dyn BoardStore>,
    notifier: Arc<dyn ChangeNotifier>,
    policy: TransitionPolicy,
    board: BoardConfig,
    write_gate: Mutex<()>,
}

impl BoardEngine {
    pub fn new(store: Arc<dyn BoardStore>, notifier: Arc<dyn ChangeNotifier>) -> Self {
        Self {
            store,
            notifier,
            policy: TransitionPolicy::default(),
            board: BoardConfig::default(),
            write_gate: Mutex::new(()),
        }
    }

    pub fn with_policy(mut self, policy: TransitionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_board(mut self, board: BoardConfig) -> Self {
        self.board = board;
        self
    }

    /// Opens the configured store and builds an engine on top of it
    pub async fn from_config(
        config: &EngineConfig,
        notifier: Arc<dyn ChangeNotifier>,
    ) -> Result<Self> {
        let store = config.storage.open().await?;
        Ok(Self::new(store, notifier)
            .with_policy(config.transition_policy)
            .with_board(config.board.clone()))
    }

    pub fn board(&self) -> &BoardConfig {
        &self.board
    }

    pub fn store(&self) -> &Arc<dyn BoardStore> {
        &self.store
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    /// Loads an item and records that it was viewed
    pub async fn view_item(&self, id: &ItemId) -> Result<Item> {
        let item = self.store.load_item(id).await?;
        self.record(ItemEvent::new(item.id, ItemEventKind::Viewed))
            .await;
        Ok(item)
    }

    /// Items of a lane in display order
    pub async fn lane_items(&self, lane: Lane) -> Result<Vec<Item>> {
        self.store.list_lane(lane).await
    }

    /// Configured columns in board order, each with its lane's items
    pub async fn columns(&self) -> Result<Vec<ColumnView>> {
        let mut views = Vec::with_capacity(self.board.columns.len());
        for column in &self.board.columns {
            views.push(ColumnView {
                name: column.name.clone(),
                lane: column.lane,
                items: self.store.list_lane(column.lane).await?,
            });
        }
        Ok(views)
    }

    /// Current `{ lane, items }` arrangement of a lane
    pub async fn arrangement(&self, lane: Lane) -> Result<Arrangement> {
        let items = self.store.list_lane(lane).await?;
        Ok(Arrangement::from_items(lane, &items))
    }

    /// Every item on the board, sorted for tabular display
    pub async fn items_sorted(&self, field: SortField, order: SortOrder) -> Result<Vec<Item>> {
        let mut items = self.store.list_items().await?;
        sort_items(&mut items, field, order);
        Ok(items)
    }

    /// Audit trail of an item, oldest first
    pub async fn events(&self, id: &ItemId) -> Result<Vec<ItemEvent>> {
        self.store.events_for(id).await
    }

    fn publish(&self, origin: Origin, event: BoardEvent) {
        self.notifier.publish(Envelope::new(origin, event));
    }

    /// Audit events are best-effort; the change they describe is already
    /// committed.
    async fn record(&self, event: ItemEvent) {
        if let Err(e) = self.store.record_event(&event).await {
            tracing::warn!(item_id = %event.item_id, error = %e, "failed to record item event");
        }
    }
}
