pub mod board;
pub mod event;
pub mod item;
pub mod sorting;

pub use board::{Arrangement, BoardConfig, Column, ColumnView, RankEntry};
pub use event::{ItemEvent, ItemEventKind};
pub use item::{GeoPoint, Item, ItemId, Lane, OrderDetails, Rank};
pub use sorting::{sort_items, SortField, SortOrder};
