use crate::{
    domain::{Item, ItemEvent, ItemId, Lane, OrderDetails, Rank},
    error::{BoardError, Result},
    storage::{BoardState, BoardStore, RankAssignment},
};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};
use tokio::{fs, sync::Mutex};

/// File-based storage implementation.
///
/// The whole board lives in one JSON document. Every mutation rewrites the
/// document through a temp file and a rename, so a reader of the file sees
/// either the old or the new board, never a half-applied rank update.
pub struct FileStorage {
    root_path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    const BOARD_DIR: &'static str = ".orderboard";
    const BOARD_FILE: &'static str = "board.json";
    const TEMP_FILE: &'static str = "board.json.tmp";

    /// Creates a new FileStorage instance for the given data root
    pub fn new(data_root: impl AsRef<Path>) -> Self {
        Self {
            root_path: data_root.as_ref().join(Self::BOARD_DIR),
            write_lock: Mutex::new(()),
        }
    }

    fn board_file(&self) -> PathBuf {
        self.root_path.join(Self::BOARD_FILE)
    }

    fn temp_file(&self) -> PathBuf {
        self.root_path.join(Self::TEMP_FILE)
    }

    async fn ensure_directory_exists(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path).await?;
        }
        Ok(())
    }

    async fn load_state(&self) -> Result<BoardState> {
        let board_file = self.board_file();

        if !board_file.exists() {
            return Err(BoardError::BoardNotInitialized);
        }

        let contents = fs::read_to_string(&board_file).await?;
        let state: BoardState = serde_json::from_str(&contents)?;

        Ok(state)
    }

    async fn save_state(&self, state: &BoardState) -> Result<()> {
        self.ensure_directory_exists(&self.root_path).await?;

        let json = serde_json::to_string_pretty(state)?;
        let temp = self.temp_file();
        fs::write(&temp, json).await?;
        fs::rename(&temp, self.board_file()).await?;

        Ok(())
    }

    /// Load, mutate and persist under the write lock
    async fn mutate<T>(&self, f: impl FnOnce(&mut BoardState) -> Result<T> + Send) -> Result<T> {
        let _guard = self.write_lock.lock().await;
        let mut state = self.load_state().await?;
        let value = f(&mut state)?;
        self.save_state(&state).await?;
        Ok(value)
    }
}

#[async_trait]
impl BoardStore for FileStorage {
    async fn initialize(&self) -> Result<()> {
        self.ensure_directory_exists(&self.root_path).await?;

        if !self.board_file().exists() {
            self.save_state(&BoardState::new()).await?;
        }

        let gitignore_path = self.root_path.join(".gitignore");
        if !gitignore_path.exists() {
            fs::write(gitignore_path, "# Temp files\n*.tmp\n").await?;
        }

        Ok(())
    }

    async fn is_initialized(&self) -> bool {
        self.root_path.exists() && self.board_file().exists()
    }

    async fn get_ranks(&self, ids: &[ItemId]) -> Result<HashMap<ItemId, Rank>> {
        Ok(self.load_state().await?.get_ranks(ids))
    }

    async fn max_position(&self, lane: Lane) -> Result<Option<i64>> {
        Ok(self.load_state().await?.max_position(lane))
    }

    async fn insert_item(&self, item: &Item) -> Result<()> {
        let item = item.clone();
        self.mutate(move |state| state.insert_item(item)).await
    }

    async fn load_item(&self, id: &ItemId) -> Result<Item> {
        self.load_state().await?.load_item(id)
    }

    async fn list_lane(&self, lane: Lane) -> Result<Vec<Item>> {
        Ok(self.load_state().await?.list_lane(lane))
    }

    async fn list_items(&self) -> Result<Vec<Item>> {
        Ok(self.load_state().await?.items.into_values().collect())
    }

    async fn update_details(&self, id: &ItemId, details: &OrderDetails) -> Result<Item> {
        let id = *id;
        let details = details.clone();
        self.mutate(move |state| state.update_details(&id, details))
            .await
    }

    async fn delete_item(&self, id: &ItemId) -> Result<()> {
        let id = *id;
        self.mutate(move |state| state.delete_item(&id)).await
    }

    async fn apply_rank_update(&self, assignments: &[RankAssignment]) -> Result<()> {
        self.mutate(|state| state.apply_rank_update(assignments))
            .await
    }

    async fn record_event(&self, event: &ItemEvent) -> Result<()> {
        let event = event.clone();
        self.mutate(move |state| {
            state.record_event(event);
            Ok(())
        })
        .await
    }

    async fn events_for(&self, id: &ItemId) -> Result<Vec<ItemEvent>> {
        Ok(self.load_state().await?.events_for(id))
    }
}
