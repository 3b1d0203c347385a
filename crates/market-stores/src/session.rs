use crate::{Error, Result};
use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;

/// Identity that scopes every persisted snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidActor("actor id must not be empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ActorId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ActorChanged {
        previous: Option<ActorId>,
        current: ActorId,
    },
    LoggedOut {
        previous: ActorId,
    },
}

impl SessionEvent {
    /// Actor in effect after this event.
    pub fn current(&self) -> Option<&ActorId> {
        match self {
            SessionEvent::ActorChanged { current, .. } => Some(current),
            SessionEvent::LoggedOut { .. } => None,
        }
    }
}

/// Resolves the current actor and fans out actor-change notifications.
///
/// The auth layer drives it through `login`/`logout`; stores hold a
/// subscription and re-initialize when an event arrives.
pub struct SessionScope {
    current: Mutex<Option<ActorId>>,
    subscribers: Mutex<Vec<Sender<SessionEvent>>>,
}

impl SessionScope {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn with_actor(actor: ActorId) -> Self {
        Self {
            current: Mutex::new(Some(actor)),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn current_actor_id(&self) -> Option<ActorId> {
        self.current.lock().ok().and_then(|guard| guard.clone())
    }

    pub fn is_logged_in(&self) -> bool {
        self.current_actor_id().is_some()
    }

    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push(tx);
        }
        rx
    }

    pub fn login(&self, actor: ActorId) {
        let previous = {
            let Ok(mut current) = self.current.lock() else {
                return;
            };
            if current.as_ref() == Some(&actor) {
                return;
            }
            current.replace(actor.clone())
        };

        tracing::debug!(actor = %actor, "session actor changed");
        self.emit(SessionEvent::ActorChanged {
            previous,
            current: actor,
        });
    }

    pub fn logout(&self) {
        let previous = {
            let Ok(mut current) = self.current.lock() else {
                return;
            };
            current.take()
        };

        if let Some(previous) = previous {
            tracing::debug!(actor = %previous, "session logged out");
            self.emit(SessionEvent::LoggedOut { previous });
        }
    }

    fn emit(&self, event: SessionEvent) {
        if let Ok(mut subscribers) = self.subscribers.lock() {
            // Dropped receivers belong to stores that no longer exist.
            subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }
}

impl Default for SessionScope {
    fn default() -> Self {
        Self::new()
    }
}
