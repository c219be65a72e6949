use crate::{
    error::{BoardError, Result},
    notify::{BoardEvent, ChangeNotifier, Envelope, Origin, SessionId},
};
use std::{
    collections::{BTreeSet, HashMap},
    sync::{Arc, Mutex, MutexGuard},
};

/// Tracks which employee is behind each connected session
pub struct PresenceRegistry {
    sessions: Mutex<HashMap<SessionId, String>>,
    notifier: Arc<dyn ChangeNotifier>,
}

impl PresenceRegistry {
    pub fn new(notifier: Arc<dyn ChangeNotifier>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            notifier,
        }
    }

    /// Binds a session to an employee and announces the new online set
    pub fn join(&self, session: SessionId, employee_id: &str) -> Result<()> {
        let employee_id = employee_id.trim();
        if employee_id.is_empty() {
            return Err(BoardError::InvalidInput(
                "employee id must not be blank".to_string(),
            ));
        }

        let online = {
            let mut sessions = self.lock();
            sessions.insert(session.clone(), employee_id.to_string());
            online_of(&sessions)
        };
        tracing::debug!(session = %session, employee_id, "session joined");
        self.announce(online);
        Ok(())
    }

    /// Forgets a session; unknown sessions are ignored
    pub fn leave(&self, session: &SessionId) {
        let online = {
            let mut sessions = self.lock();
            if sessions.remove(session).is_none() {
                return;
            }
            online_of(&sessions)
        };
        tracing::debug!(session = %session, "session left");
        self.announce(online);
    }

    /// Distinct online employee ids, sorted
    pub fn online(&self) -> Vec<String> {
        online_of(&self.lock())
    }

    /// Relays a live cursor position to every other session
    pub fn relay_cursor(&self, session: &SessionId, employee_id: &str, name: &str, x: f64, y: f64) {
        self.notifier.publish(Envelope::new(
            Origin::Session(session.clone()),
            BoardEvent::CursorMoved {
                employee_id: employee_id.to_string(),
                name: name.to_string(),
                x,
                y,
            },
        ));
    }

    fn announce(&self, online: Vec<String>) {
        self.notifier.publish(Envelope::new(
            Origin::System,
            BoardEvent::PresenceChanged { online },
        ));
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, String>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn online_of(sessions: &HashMap<SessionId, String>) -> Vec<String> {
    sessions
        .values()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
