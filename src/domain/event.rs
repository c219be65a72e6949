use crate::domain::item::{ItemId, Lane};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened to an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemEventKind {
    Created,
    StatusChange { from: Lane, to: Lane },
    Reordered,
    Updated,
    Viewed,
}

/// Audit trail entry for an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemEvent {
    pub item_id: ItemId,
    pub kind: ItemEventKind,
    pub at: DateTime<Utc>,
}

impl ItemEvent {
    pub fn new(item_id: ItemId, kind: ItemEventKind) -> Self {
        Self {
            item_id,
            kind,
            at: Utc::now(),
        }
    }
}
