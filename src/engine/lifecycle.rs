use super::reorder::Change;
use crate::{
    config::TransitionPolicy,
    domain::{Item, ItemEvent, ItemEventKind, ItemId, Lane, OrderDetails},
    engine::BoardEngine,
    error::{BoardError, Result},
    notify::{BoardEvent, Origin},
    storage::RankAssignment,
};

impl BoardEngine {
    /// Creates an item at the tail of `lane` (position 0 in an empty lane)
    pub async fn append(&self, origin: Origin, lane: Lane, details: OrderDetails) -> Result<Item> {
        let _gate = self.write_gate.lock().await;

        let position = self
            .store
            .max_position(lane)
            .await?
            .map_or(0, |max| max + 1);
        let item = Item::new(lane, position, details);
        self.store.insert_item(&item).await?;

        self.record(ItemEvent::new(item.id, ItemEventKind::Created))
            .await;
        tracing::info!(item_id = %item.id, %lane, position, "item appended");
        self.publish(origin, BoardEvent::ItemCreated { item: item.clone() });

        Ok(item)
    }

    /// Moves an item to `new_lane`.
    ///
    /// With an explicit `position` the item lands exactly there. Without one
    /// the destination follows the engine's [`TransitionPolicy`]. Either way
    /// the move is written as a single-item diff set, so a collision fails
    /// the call instead of leaving two items on one position.
    pub async fn transition(
        &self,
        origin: Origin,
        id: &ItemId,
        new_lane: Lane,
        position: Option<i64>,
    ) -> Result<Item> {
        if let Some(requested) = position.filter(|p| *p < 0) {
            return Err(BoardError::ConstraintViolation(format!(
                "negative position {} for item {}",
                requested, id
            )));
        }

        let _gate = self.write_gate.lock().await;

        let previous = self
            .store
            .get_ranks(&[*id])
            .await?
            .remove(id)
            .ok_or_else(|| BoardError::NotFound(id.to_string()))?;

        let target_position = match (position, self.policy) {
            (Some(requested), _) => requested,
            (None, _) if previous.lane == new_lane => previous.position,
            (None, TransitionPolicy::AppendToTail) => self
                .store
                .max_position(new_lane)
                .await?
                .map_or(0, |max| max + 1),
            (None, TransitionPolicy::PreservePosition) => previous.position,
        };

        let assignment = RankAssignment::new(*id, new_lane, target_position);
        if assignment.rank() == previous {
            tracing::debug!(item_id = %id, lane = %new_lane, "transition is a no-op");
            return self.store.load_item(id).await;
        }

        self.apply_changes(&[Change {
            assignment,
            previous,
        }])
        .await?;
        tracing::info!(
            item_id = %id,
            from = %previous.lane,
            to = %new_lane,
            column = %self.board.lane_name(new_lane),
            position = target_position,
            "item transitioned"
        );
        self.publish(
            origin,
            BoardEvent::ItemMoved {
                item_id: *id,
                from: previous.lane,
                to: new_lane,
                position: target_position,
            },
        );

        self.store.load_item(id).await
    }

    /// Replaces an item's order data and broadcasts the new state. The item
    /// keeps its lane and position.
    pub async fn update_details(
        &self,
        origin: Origin,
        id: &ItemId,
        details: OrderDetails,
    ) -> Result<Item> {
        let _gate = self.write_gate.lock().await;

        let item = self.store.update_details(id, &details).await?;
        self.record(ItemEvent::new(item.id, ItemEventKind::Updated))
            .await;
        tracing::info!(item_id = %id, "item details updated");
        self.publish(origin, BoardEvent::ItemUpdated { item: item.clone() });

        Ok(item)
    }

    /// Deletes an item and its audit trail. Other items keep their positions.
    pub async fn remove(&self, origin: Origin, id: &ItemId) -> Result<()> {
        let _gate = self.write_gate.lock().await;

        self.store.delete_item(id).await?;
        tracing::info!(item_id = %id, "item removed");
        self.publish(origin, BoardEvent::ItemRemoved { item_id: *id });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        config::TransitionPolicy,
        domain::{ItemEventKind, ItemId, Lane, OrderDetails},
        engine::BoardEngine,
        error::BoardError,
        notify::{BoardEvent, BroadcastNotifier, Origin, SessionId},
        storage::MemoryStorage,
    };
    use std::sync::Arc;

    fn engine() -> (BoardEngine, BroadcastNotifier) {
        let notifier = BroadcastNotifier::new(32);
        let engine = BoardEngine::new(Arc::new(MemoryStorage::new()), Arc::new(notifier.clone()));
        (engine, notifier)
    }

    fn order(client: &str) -> OrderDetails {
        OrderDetails::new(client, "Main St 1").with_price(100.0)
    }

    #[tokio::test]
    async fn test_first_append_gets_zero_then_tail() {
        let (engine, _) = engine();

        let a = engine.append(Origin::System, Lane::New, order("a")).await.unwrap();
        let b = engine.append(Origin::System, Lane::New, order("b")).await.unwrap();
        let c = engine.append(Origin::System, Lane::Completed, order("c")).await.unwrap();

        assert_eq!(a.position, 0);
        assert_eq!(b.position, 1);
        assert_eq!(c.position, 0);
    }

    #[tokio::test]
    async fn test_append_after_gap_uses_max() {
        let (engine, _) = engine();
        let a = engine.append(Origin::System, Lane::New, order("a")).await.unwrap();
        engine
            .transition(Origin::System, &a.id, Lane::New, Some(9))
            .await
            .unwrap();

        let b = engine.append(Origin::System, Lane::New, order("b")).await.unwrap();
        assert_eq!(b.position, 10);
    }

    #[tokio::test]
    async fn test_append_records_and_publishes() {
        let (engine, notifier) = engine();
        let mut watcher = notifier.subscribe(SessionId::new("watcher"));

        let item = engine.append(Origin::System, Lane::New, order("a")).await.unwrap();

        assert_eq!(
            watcher.recv().await,
            Some(BoardEvent::ItemCreated { item: item.clone() })
        );
        let events = engine.events(&item.id).await.unwrap();
        assert_eq!(events[0].kind, ItemEventKind::Created);
    }

    #[tokio::test]
    async fn test_transition_appends_to_destination_tail() {
        let (engine, _) = engine();
        engine.append(Origin::System, Lane::InProgress, order("x")).await.unwrap();
        engine.append(Origin::System, Lane::InProgress, order("y")).await.unwrap();
        let item = engine.append(Origin::System, Lane::New, order("a")).await.unwrap();

        let moved = engine
            .transition(Origin::System, &item.id, Lane::InProgress, None)
            .await
            .unwrap();

        assert_eq!(moved.lane, Lane::InProgress);
        assert_eq!(moved.position, 2);
        assert_eq!(moved.created_at, item.created_at);

        let events = engine.events(&item.id).await.unwrap();
        assert_eq!(
            events.last().map(|e| e.kind.clone()),
            Some(ItemEventKind::StatusChange {
                from: Lane::New,
                to: Lane::InProgress
            })
        );
    }

    #[tokio::test]
    async fn test_transition_into_empty_lane_gets_zero() {
        let (engine, _) = engine();
        engine.append(Origin::System, Lane::New, order("first")).await.unwrap();
        let item = engine.append(Origin::System, Lane::New, order("second")).await.unwrap();

        let moved = engine
            .transition(Origin::System, &item.id, Lane::Completed, None)
            .await
            .unwrap();
        assert_eq!(moved.position, 0);
    }

    #[tokio::test]
    async fn test_transition_with_explicit_position() {
        let (engine, _) = engine();
        let item = engine.append(Origin::System, Lane::New, order("a")).await.unwrap();

        let moved = engine
            .transition(Origin::System, &item.id, Lane::Completed, Some(7))
            .await
            .unwrap();
        assert_eq!((moved.lane, moved.position), (Lane::Completed, 7));
    }

    #[tokio::test]
    async fn test_preserve_position_rejects_collision() {
        let notifier = BroadcastNotifier::new(8);
        let engine = BoardEngine::new(Arc::new(MemoryStorage::new()), Arc::new(notifier))
            .with_policy(TransitionPolicy::PreservePosition);

        engine.append(Origin::System, Lane::Completed, order("holder")).await.unwrap();
        let item = engine.append(Origin::System, Lane::New, order("a")).await.unwrap();

        let err = engine
            .transition(Origin::System, &item.id, Lane::Completed, None)
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::ConstraintViolation(_)));

        let stored = engine.view_item(&item.id).await.unwrap();
        assert_eq!((stored.lane, stored.position), (Lane::New, 0));
    }

    #[tokio::test]
    async fn test_preserve_position_keeps_rank_when_free() {
        let engine = BoardEngine::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(BroadcastNotifier::new(8)),
        )
        .with_policy(TransitionPolicy::PreservePosition);

        engine.append(Origin::System, Lane::New, order("a")).await.unwrap();
        let item = engine.append(Origin::System, Lane::New, order("b")).await.unwrap();

        let moved = engine
            .transition(Origin::System, &item.id, Lane::Completed, None)
            .await
            .unwrap();
        assert_eq!((moved.lane, moved.position), (Lane::Completed, 1));
    }

    #[tokio::test]
    async fn test_transition_unknown_item_is_not_found() {
        let (engine, _) = engine();
        let err = engine
            .transition(Origin::System, &ItemId::new(), Lane::Completed, None)
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_transition_to_same_lane_is_noop() {
        let (engine, notifier) = engine();
        let item = engine.append(Origin::System, Lane::New, order("a")).await.unwrap();
        let mut watcher = notifier.subscribe(SessionId::new("watcher"));

        let same = engine
            .transition(Origin::System, &item.id, Lane::New, None)
            .await
            .unwrap();

        assert_eq!(same.position, item.position);
        assert_eq!(watcher.try_recv(), None);
    }

    #[tokio::test]
    async fn test_remove_publishes_and_deletes() {
        let (engine, notifier) = engine();
        let item = engine.append(Origin::System, Lane::New, order("a")).await.unwrap();
        let mut watcher = notifier.subscribe(SessionId::new("watcher"));

        engine.remove(Origin::session("actor"), &item.id).await.unwrap();

        assert_eq!(
            watcher.recv().await,
            Some(BoardEvent::ItemRemoved { item_id: item.id })
        );
        assert!(matches!(
            engine.view_item(&item.id).await,
            Err(BoardError::NotFound(_))
        ));
        assert!(engine.remove(Origin::System, &item.id).await.is_err());
        assert!(engine.events(&item.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_details_broadcasts_to_other_sessions() {
        let (engine, notifier) = engine();
        let item = engine.append(Origin::System, Lane::InProgress, order("a")).await.unwrap();
        let mut editor = notifier.subscribe(SessionId::new("editor"));
        let mut watcher = notifier.subscribe(SessionId::new("watcher"));

        let updated = engine
            .update_details(
                Origin::session("editor"),
                &item.id,
                OrderDetails::new("a", "Oak St 9").with_price(250.0),
            )
            .await
            .unwrap();

        assert_eq!(updated.rank(), item.rank());
        assert_eq!(updated.details.address, "Oak St 9");
        assert_eq!(
            watcher.recv().await,
            Some(BoardEvent::ItemUpdated { item: updated.clone() })
        );
        assert_eq!(editor.try_recv(), None);

        let kinds: Vec<ItemEventKind> = engine
            .events(&item.id)
            .await
            .unwrap()
            .into_iter()
            .map(|event| event.kind)
            .collect();
        assert_eq!(kinds, vec![ItemEventKind::Created, ItemEventKind::Updated]);
    }

    #[tokio::test]
    async fn test_update_details_of_unknown_item_is_not_found() {
        let (engine, _) = engine();
        let err = engine
            .update_details(Origin::System, &ItemId::new(), order("ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::NotFound(_)));
    }
}
