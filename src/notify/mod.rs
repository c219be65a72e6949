//! Fan-out of committed board changes to connected sessions.
//!
//! Publishing is fire-and-forget: the engine hands an [`Envelope`] to a
//! [`ChangeNotifier`] after storage has committed and never waits on, or
//! fails because of, delivery.

use crate::domain::{Item, ItemId, Lane, RankEntry};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod broadcast;
pub mod presence;

pub use broadcast::{BroadcastNotifier, Subscription};
pub use presence::PresenceRegistry;

/// Identifier of a connected client session (one socket, one bot chat, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who triggered a change. Session-originated events are not echoed back.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Origin {
    #[default]
    System,
    Session(SessionId),
}

impl Origin {
    pub fn session(id: impl Into<String>) -> Self {
        Self::Session(SessionId::new(id))
    }

    pub fn is_session(&self, session: &SessionId) -> bool {
        matches!(self, Self::Session(own) if own == session)
    }
}

/// Change broadcast to sessions, `{ "type": ..., "data": ... }` on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum BoardEvent {
    ItemCreated {
        item: Item,
    },
    ItemUpdated {
        item: Item,
    },
    ItemMoved {
        item_id: ItemId,
        from: Lane,
        to: Lane,
        position: i64,
    },
    ItemRemoved {
        item_id: ItemId,
    },
    Reordered {
        lane: Lane,
        items: Vec<RankEntry>,
    },
    PresenceChanged {
        online: Vec<String>,
    },
    CursorMoved {
        employee_id: String,
        name: String,
        x: f64,
        y: f64,
    },
}

impl BoardEvent {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub origin: Origin,
    pub event: BoardEvent,
}

impl Envelope {
    pub fn new(origin: Origin, event: BoardEvent) -> Self {
        Self { origin, event }
    }
}

/// Sink for committed changes. Must not block.
pub trait ChangeNotifier: Send + Sync {
    fn publish(&self, envelope: Envelope);
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl ChangeNotifier for NoopNotifier {
    fn publish(&self, _envelope: Envelope) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderDetails;

    #[test]
    fn test_reordered_wire_format() {
        let id = ItemId::new();
        let event = BoardEvent::Reordered {
            lane: Lane::New,
            items: vec![RankEntry::new(id, 0)],
        };

        let json: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "reordered");
        assert_eq!(json["data"]["lane"], "NEW");
        assert_eq!(json["data"]["items"][0]["position"], 0);
    }

    #[test]
    fn test_item_updated_wire_format() {
        let item = Item::new(Lane::InProgress, 2, OrderDetails::new("Olga", "Kyiv, Sadova 5"));
        let event = BoardEvent::ItemUpdated { item: item.clone() };

        let json: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "item-updated");
        assert_eq!(json["data"]["item"]["lane"], "IN_PROGRESS");
        assert_eq!(json["data"]["item"]["details"]["client_name"], "Olga");

        let back: BoardEvent = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(back, BoardEvent::ItemUpdated { item });
    }

    #[test]
    fn test_origin_matching() {
        let me = SessionId::new("socket-1");
        assert!(Origin::session("socket-1").is_session(&me));
        assert!(!Origin::session("socket-2").is_session(&me));
        assert!(!Origin::System.is_session(&me));
    }
}
