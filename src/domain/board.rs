use crate::domain::item::{Item, ItemId, Lane};
use serde::{Deserialize, Serialize};

/// Configuration for a board lane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub lane: Lane,
}

impl Column {
    pub fn new(name: String, lane: Lane) -> Self {
        Self { name, lane }
    }
}

/// Board configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            name: "Orders".to_string(),
            columns: vec![
                Column::new("New".to_string(), Lane::New),
                Column::new("In Progress".to_string(), Lane::InProgress),
                Column::new("Completed".to_string(), Lane::Completed),
            ],
        }
    }
}

impl BoardConfig {
    /// Gets the column configuration for a lane
    pub fn column_for_lane(&self, lane: Lane) -> Option<&Column> {
        self.columns.iter().find(|col| col.lane == lane)
    }

    /// Display name for a lane, falling back to its wire name
    pub fn lane_name(&self, lane: Lane) -> String {
        self.column_for_lane(lane)
            .map(|col| col.name.clone())
            .unwrap_or_else(|| lane.to_string())
    }
}

/// A configured column with its items in display order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnView {
    pub name: String,
    pub lane: Lane,
    pub items: Vec<Item>,
}

/// One entry of a lane arrangement as exchanged with clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankEntry {
    pub id: ItemId,
    pub position: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lane: Option<Lane>,
}

impl RankEntry {
    pub fn new(id: ItemId, position: i64) -> Self {
        Self {
            id,
            position,
            lane: None,
        }
    }

    /// Targets a lane other than the request's primary lane
    pub fn in_lane(mut self, lane: Lane) -> Self {
        self.lane = Some(lane);
        self
    }

    /// The lane this entry resolves to when `primary` is the request lane
    pub fn resolved_lane(&self, primary: Lane) -> Lane {
        self.lane.unwrap_or(primary)
    }
}

/// Ordered view of a single lane: `{ lane, items }` on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arrangement {
    pub lane: Lane,
    pub items: Vec<RankEntry>,
}

impl Arrangement {
    /// Builds the arrangement from items already ordered by position
    pub fn from_items(lane: Lane, items: &[Item]) -> Self {
        Self {
            lane,
            items: items
                .iter()
                .filter(|item| item.lane == lane)
                .map(|item| RankEntry::new(item.id, item.position))
                .collect(),
        }
    }

    /// Ids in display order
    pub fn ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|entry| entry.id).collect()
    }
}
