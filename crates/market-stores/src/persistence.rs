use crate::{ActorId, Error, InMemoryStorage, Result, StorageAdapter};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

const STORAGE_VERSION: &str = "1";

/// Namespaces inside the shared storage medium, one per store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreName {
    Conversations,
    Rewards,
}

impl StoreName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreName::Conversations => "conversations",
            StoreName::Rewards => "rewards",
        }
    }
}

/// Actor-scoped JSON snapshots over a flat `StorageAdapter`.
#[derive(Clone)]
pub struct PersistenceAdapter {
    storage: Arc<dyn StorageAdapter>,
}

impl PersistenceAdapter {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStorage::new()))
    }

    pub fn storage(&self) -> &Arc<dyn StorageAdapter> {
        &self.storage
    }

    fn prefix(store: StoreName) -> String {
        format!("v{}/{}/", STORAGE_VERSION, store.as_str())
    }

    pub fn key(actor: &ActorId, store: StoreName) -> String {
        format!("{}{}", Self::prefix(store), urlencoding::encode(actor.as_str()))
    }

    /// Missing, unreadable and undecodable snapshots all come back as `None`.
    pub fn read<T: DeserializeOwned>(&self, actor: &ActorId, store: StoreName) -> Option<T> {
        let key = Self::key(actor, store);
        let raw = match self.storage.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "failed to read snapshot");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "discarding corrupt snapshot");
                None
            }
        }
    }

    pub fn write<T: Serialize>(&self, actor: &ActorId, store: StoreName, value: &T) -> Result<()> {
        let key = Self::key(actor, store);
        let json =
            serde_json::to_string(value).map_err(|e| Error::Serialization(e.to_string()))?;
        self.storage.put(&key, json).map_err(|e| {
            tracing::warn!(key = %key, error = %e, "failed to write snapshot");
            e
        })
    }

    pub fn clear(&self, actor: &ActorId, store: StoreName) -> Result<()> {
        self.storage.del(&Self::key(actor, store))
    }

    /// Actors that currently have a snapshot for `store`.
    pub fn stored_actors(&self, store: StoreName) -> Result<Vec<ActorId>> {
        let prefix = Self::prefix(store);
        let mut actors: Vec<ActorId> = self
            .storage
            .list(&prefix)?
            .into_iter()
            .filter_map(|key| {
                let encoded = key.strip_prefix(&prefix)?.to_string();
                let decoded = urlencoding::decode(&encoded).ok()?;
                ActorId::new(decoded.into_owned()).ok()
            })
            .collect();
        actors.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(actors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Snapshot {
        count: u32,
    }

    fn actor(id: &str) -> ActorId {
        ActorId::new(id).unwrap()
    }

    #[test]
    fn keys_are_namespaced_by_store_and_encoded_actor() {
        assert_eq!(
            PersistenceAdapter::key(&actor("alice"), StoreName::Rewards),
            "v1/rewards/alice"
        );
        assert_eq!(
            PersistenceAdapter::key(&actor("a/b c"), StoreName::Conversations),
            "v1/conversations/a%2Fb%20c"
        );
    }

    #[test]
    fn stores_do_not_share_keys() {
        let persistence = PersistenceAdapter::in_memory();
        let alice = actor("alice");

        persistence
            .write(&alice, StoreName::Rewards, &Snapshot { count: 1 })
            .unwrap();

        assert!(persistence
            .read::<Snapshot>(&alice, StoreName::Conversations)
            .is_none());
        assert_eq!(
            persistence.read::<Snapshot>(&alice, StoreName::Rewards),
            Some(Snapshot { count: 1 })
        );

        persistence.clear(&alice, StoreName::Conversations).unwrap();
        assert!(persistence
            .read::<Snapshot>(&alice, StoreName::Rewards)
            .is_some());
    }

    #[test]
    fn corrupt_data_reads_as_absent() {
        let storage = Arc::new(InMemoryStorage::new());
        let persistence = PersistenceAdapter::new(storage.clone());
        let alice = actor("alice");

        storage
            .put("v1/rewards/alice", "{\"count\": 1".to_string())
            .unwrap();

        assert!(persistence.read::<Snapshot>(&alice, StoreName::Rewards).is_none());
    }

    #[test]
    fn stored_actors_round_trips_encoded_ids() {
        let persistence = PersistenceAdapter::in_memory();
        for id in ["bob", "alice@example.com"] {
            persistence
                .write(&actor(id), StoreName::Rewards, &Snapshot { count: 0 })
                .unwrap();
        }
        persistence
            .write(&actor("carol"), StoreName::Conversations, &Snapshot { count: 0 })
            .unwrap();

        let actors = persistence.stored_actors(StoreName::Rewards).unwrap();
        assert_eq!(actors, vec![actor("alice@example.com"), actor("bob")]);
    }
}
