//! # Orderboard Core
//!
//! Ordering engine for a lane-based order management board.
//!
//! Orders sit in status lanes (`NEW`, `IN_PROGRESS`, `COMPLETED`) at an
//! integer position that is unique within the lane. The [`BoardEngine`]
//! appends orders, moves them between lanes and applies client-proposed
//! arrangements atomically, then fans the result out to every other
//! connected session through a [`ChangeNotifier`].

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod intake;
pub mod notify;
pub mod storage;

// Re-export commonly used types
pub use config::{EngineConfig, TransitionPolicy};
pub use domain::{
    board::{Arrangement, BoardConfig, Column, ColumnView, RankEntry},
    item::{Item, ItemId, Lane, OrderDetails, Rank},
};
pub use engine::{BoardEngine, ReorderOutcome};
pub use error::{BoardError, Result};
pub use notify::{BoardEvent, BroadcastNotifier, ChangeNotifier, Origin, SessionId};
pub use storage::BoardStore;
