use crate::{
    config::EngineConfig,
    notify::{BoardEvent, ChangeNotifier, Envelope, SessionId},
};
use tokio::sync::broadcast::{self, error::RecvError};

/// Process-local notifier backed by a tokio broadcast channel
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<Envelope>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Notifier buffering `notify_capacity` events per subscriber
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.notify_capacity)
    }

    /// Registers a session. Dropping the returned subscription unregisters it.
    pub fn subscribe(&self, session: SessionId) -> Subscription {
        tracing::debug!(session = %session, "session subscribed");
        Subscription {
            session,
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(256)
    }
}

impl ChangeNotifier for BroadcastNotifier {
    fn publish(&self, envelope: Envelope) {
        // No receivers is not an error.
        let _ = self.tx.send(envelope);
    }
}

/// One session's view of the event stream
#[derive(Debug)]
pub struct Subscription {
    session: SessionId,
    rx: broadcast::Receiver<Envelope>,
}

impl Subscription {
    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// Next event not triggered by this session; `None` once the notifier is
    /// gone. Lagged events are dropped with a warning, the client is expected
    /// to re-fetch the board.
    pub async fn recv(&mut self) -> Option<BoardEvent> {
        loop {
            match self.rx.recv().await {
                Ok(envelope) if envelope.origin.is_session(&self.session) => continue,
                Ok(envelope) => return Some(envelope.event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(session = %self.session, skipped, "subscriber lagged, events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`Subscription::recv`]
    pub fn try_recv(&mut self) -> Option<BoardEvent> {
        use broadcast::error::TryRecvError;

        loop {
            match self.rx.try_recv() {
                Ok(envelope) if envelope.origin.is_session(&self.session) => continue,
                Ok(envelope) => return Some(envelope.event),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(session = %self.session, skipped, "subscriber lagged, events dropped");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ItemId, Lane};
    use crate::notify::Origin;

    fn removed() -> BoardEvent {
        BoardEvent::ItemRemoved {
            item_id: ItemId::new(),
        }
    }

    #[tokio::test]
    async fn test_origin_session_gets_no_echo() {
        let notifier = BroadcastNotifier::new(8);
        let mut alice = notifier.subscribe(SessionId::new("alice"));
        let mut bob = notifier.subscribe(SessionId::new("bob"));

        let event = BoardEvent::Reordered {
            lane: Lane::New,
            items: Vec::new(),
        };
        notifier.publish(Envelope::new(Origin::session("alice"), event.clone()));

        assert_eq!(bob.recv().await, Some(event));
        assert_eq!(alice.try_recv(), None);
    }

    #[tokio::test]
    async fn test_system_events_reach_everyone() {
        let notifier = BroadcastNotifier::new(8);
        let mut alice = notifier.subscribe(SessionId::new("alice"));

        let event = removed();
        notifier.publish(Envelope::new(Origin::System, event.clone()));

        assert_eq!(alice.recv().await, Some(event));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_silent() {
        let notifier = BroadcastNotifier::new(8);
        notifier.publish(Envelope::new(Origin::System, removed()));
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_dropping_subscription_prunes_it() {
        let notifier = BroadcastNotifier::new(8);
        let sub = notifier.subscribe(SessionId::new("alice"));
        assert_eq!(notifier.subscriber_count(), 1);

        drop(sub);
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_lagging_subscriber_keeps_receiving() {
        let notifier = BroadcastNotifier::new(2);
        let mut slow = notifier.subscribe(SessionId::new("slow"));

        for _ in 0..5 {
            notifier.publish(Envelope::new(Origin::System, removed()));
        }

        let mut received = 0;
        while slow.try_recv().is_some() {
            received += 1;
        }
        assert_eq!(received, 2);
    }

    #[tokio::test]
    async fn test_capacity_comes_from_config() {
        let config = EngineConfig::from_toml_str("notify_capacity = 3").unwrap();
        let notifier = BroadcastNotifier::from_config(&config);
        let mut slow = notifier.subscribe(SessionId::new("slow"));

        for _ in 0..10 {
            notifier.publish(Envelope::new(Origin::System, removed()));
        }

        let mut received = 0;
        while slow.try_recv().is_some() {
            received += 1;
        }
        assert_eq!(received, 3);
    }

    #[tokio::test]
    async fn test_closed_channel_ends_stream() {
        let notifier = BroadcastNotifier::new(2);
        let mut sub = notifier.subscribe(SessionId::new("alice"));

        drop(notifier);
        assert_eq!(sub.recv().await, None);
    }
}
