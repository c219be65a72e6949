use crate::{
    domain::{Item, ItemEvent, ItemEventKind, ItemId, Lane, OrderDetails, Rank},
    error::{BoardError, Result},
    storage::{placeholder_position, BoardStore, RankAssignment},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::{
    collections::HashMap,
    path::Path,
    str::FromStr,
    sync::{Mutex, MutexGuard},
};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS items (
      id TEXT PRIMARY KEY,
      lane TEXT NOT NULL,
      position INTEGER NOT NULL,
      details TEXT NOT NULL,
      created_at TEXT NOT NULL,
      updated_at TEXT NOT NULL
    );

    CREATE UNIQUE INDEX IF NOT EXISTS items_lane_position ON items(lane, position);

    CREATE TABLE IF NOT EXISTS item_events (
      seq INTEGER PRIMARY KEY AUTOINCREMENT,
      item_id TEXT NOT NULL,
      kind TEXT NOT NULL,
      at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS item_events_item ON item_events(item_id, seq);
"#;

const ITEM_COLUMNS: &str = "id, lane, position, details, created_at, updated_at";

/// SQLite-based storage backend.
///
/// `(lane, position)` carries a unique index that SQLite checks row by row,
/// which is exactly the situation the two-phase rank update exists for.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

/// Raw column values of an `items` row
type ItemRow = (String, String, i64, String, String, String);

impl SqliteStorage {
    /// Opens (or creates) the database file at `database_path`
    pub fn open(database_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(database_path)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| BoardError::StoreUnavailable("sqlite connection poisoned".to_string()))
    }
}

#[async_trait]
impl BoardStore for SqliteStorage {
    async fn initialize(&self) -> Result<()> {
        self.lock()?.execute_batch(SCHEMA)?;
        Ok(())
    }

    async fn is_initialized(&self) -> bool {
        let Ok(conn) = self.lock() else {
            return false;
        };
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'items'",
            [],
            |row| row.get::<_, i64>(0),
        )
        .map(|count| count > 0)
        .unwrap_or(false)
    }

    async fn get_ranks(&self, ids: &[ItemId]) -> Result<HashMap<ItemId, Rank>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached("SELECT lane, position FROM items WHERE id = ?1")?;
        let mut ranks = HashMap::with_capacity(ids.len());

        for id in ids {
            let row = stmt
                .query_row(params![id.to_string()], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })
                .optional()?;
            if let Some((lane, position)) = row {
                ranks.insert(*id, Rank::new(Lane::from_str(&lane)?, position));
            }
        }

        Ok(ranks)
    }

    async fn max_position(&self, lane: Lane) -> Result<Option<i64>> {
        let conn = self.lock()?;
        let max = conn.query_row(
            "SELECT MAX(position) FROM items WHERE lane = ?1",
            params![lane.as_str()],
            |row| row.get::<_, Option<i64>>(0),
        )?;
        Ok(max)
    }

    async fn insert_item(&self, item: &Item) -> Result<()> {
        let details = serde_json::to_string(&item.details)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO items (id, lane, position, details, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                item.id.to_string(),
                item.lane.as_str(),
                item.position,
                details,
                item.created_at.to_rfc3339(),
                item.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn load_item(&self, id: &ItemId) -> Result<Item> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1"),
                params![id.to_string()],
                read_item_row,
            )
            .optional()?;

        match row {
            Some(row) => item_from_row(row),
            None => Err(BoardError::NotFound(id.to_string())),
        }
    }

    async fn list_lane(&self, lane: Lane) -> Result<Vec<Item>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE lane = ?1 ORDER BY position ASC, created_at ASC"
        ))?;
        let rows = stmt
            .query_map(params![lane.as_str()], read_item_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(item_from_row).collect()
    }

    async fn list_items(&self) -> Result<Vec<Item>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("SELECT {ITEM_COLUMNS} FROM items"))?;
        let rows = stmt
            .query_map([], read_item_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(item_from_row).collect()
    }

    async fn update_details(&self, id: &ItemId, details: &OrderDetails) -> Result<Item> {
        let details = serde_json::to_string(details)?;
        let conn = self.lock()?;
        let count = conn.execute(
            "UPDATE items SET details = ?1, updated_at = ?2 WHERE id = ?3",
            params![details, Utc::now().to_rfc3339(), id.to_string()],
        )?;
        if count == 0 {
            return Err(BoardError::NotFound(id.to_string()));
        }

        let row = conn.query_row(
            &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1"),
            params![id.to_string()],
            read_item_row,
        )?;
        item_from_row(row)
    }

    async fn delete_item(&self, id: &ItemId) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let count = tx.execute("DELETE FROM items WHERE id = ?1", params![id.to_string()])?;
        if count == 0 {
            return Err(BoardError::NotFound(id.to_string()));
        }
        tx.execute(
            "DELETE FROM item_events WHERE item_id = ?1",
            params![id.to_string()],
        )?;
        tx.commit()?;
        Ok(())
    }

    async fn apply_rank_update(&self, assignments: &[RankAssignment]) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now = Utc::now().to_rfc3339();

        // Phase A: displace.
        for (index, assignment) in assignments.iter().enumerate() {
            let count = tx.execute(
                "UPDATE items SET position = ?1 WHERE id = ?2",
                params![placeholder_position(index), assignment.id.to_string()],
            )?;
            if count == 0 {
                return Err(BoardError::ConstraintViolation(format!(
                    "item {} vanished during rank update",
                    assignment.id
                )));
            }
        }

        // Phase B: commit.
        for assignment in assignments {
            tx.execute(
                "UPDATE items SET lane = ?1, position = ?2, updated_at = ?3 WHERE id = ?4",
                params![
                    assignment.lane.as_str(),
                    assignment.position,
                    now,
                    assignment.id.to_string(),
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    async fn record_event(&self, event: &ItemEvent) -> Result<()> {
        let kind = serde_json::to_string(&event.kind)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO item_events (item_id, kind, at) VALUES (?1, ?2, ?3)",
            params![event.item_id.to_string(), kind, event.at.to_rfc3339()],
        )?;
        Ok(())
    }

    async fn events_for(&self, id: &ItemId) -> Result<Vec<ItemEvent>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT kind, at FROM item_events WHERE item_id = ?1 ORDER BY seq ASC")?;
        let rows = stmt
            .query_map(params![id.to_string()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(kind, at)| {
                Ok(ItemEvent {
                    item_id: *id,
                    kind: serde_json::from_str::<ItemEventKind>(&kind)?,
                    at: parse_timestamp(&at)?,
                })
            })
            .collect()
    }
}

fn read_item_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ItemRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn item_from_row(row: ItemRow) -> Result<Item> {
    let (id, lane, position, details, created_at, updated_at) = row;
    Ok(Item {
        id: ItemId::from_str(&id)?,
        lane: Lane::from_str(&lane)?,
        position,
        details: serde_json::from_str(&details)?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| BoardError::StoreUnavailable(format!("bad timestamp '{}': {}", value, e)))
}
