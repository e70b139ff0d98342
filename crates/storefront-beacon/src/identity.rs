//! Anonymous, installation-scoped client identifier.

use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::ConfigStore;

/// Store key holding the persisted client id.
pub const CLIENT_ID_KEY: &str = "BEACON_ANALYTICS_CLIENT_ID";

/// Generate a new client id: lowercase hyphenated UUID v4.
pub fn generate_client_id() -> String {
    Uuid::new_v4().to_string()
}

/// Lazily loaded client id, cached for the life of the process.
///
/// The first caller reads the store and, when nothing usable is there,
/// generates and persists a fresh id. Concurrent first callers wait on the
/// same initialization instead of each generating their own.
#[derive(Debug, Default)]
pub struct ClientIdentity {
    cached: OnceCell<String>,
}

impl ClientIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the client id, loading or creating it on first use.
    pub async fn get<S: ConfigStore + ?Sized>(&self, store: &S) -> Result<&str, StoreError> {
        self.cached
            .get_or_try_init(|| async { load_or_create(store) })
            .await
            .map(String::as_str)
    }
}

fn load_or_create<S: ConfigStore + ?Sized>(store: &S) -> Result<String, StoreError> {
    if let Some(existing) = store.get(CLIENT_ID_KEY)?.filter(|id| !id.is_empty()) {
        return Ok(existing);
    }

    let client_id = generate_client_id();
    store.update_global(CLIENT_ID_KEY, &client_id)?;
    tracing::debug!(client_id = %client_id, "Generated new analytics client id");
    Ok(client_id)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::MemoryStore;

    fn assert_canonical_v4(id: &str) {
        assert_eq!(id.len(), 36, "unexpected length: {id}");
        for (i, c) in id.char_indices() {
            match i {
                8 | 13 | 18 | 23 => assert_eq!(c, '-', "expected hyphen at {i} in {id}"),
                _ => assert!(
                    c.is_ascii_digit() || ('a'..='f').contains(&c),
                    "non lowercase-hex {c:?} at {i} in {id}"
                ),
            }
        }
        assert_eq!(&id[14..15], "4", "version nibble in {id}");
        assert!(
            matches!(&id[19..20], "8" | "9" | "a" | "b"),
            "variant nibble in {id}"
        );
    }

    #[test]
    fn test_generated_ids_are_canonical_v4() {
        for _ in 0..500 {
            assert_canonical_v4(&generate_client_id());
        }
    }

    #[test]
    fn test_generated_ids_differ() {
        assert_ne!(generate_client_id(), generate_client_id());
    }

    #[tokio::test]
    async fn test_existing_id_returned_without_write() {
        let store = MemoryStore::new().with(CLIENT_ID_KEY, "stored-id");
        let identity = ClientIdentity::new();

        assert_eq!(identity.get(&store).await.unwrap(), "stored-id");
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_missing_id_generated_and_written_once() {
        let store = MemoryStore::new();
        let identity = ClientIdentity::new();

        let first = identity.get(&store).await.unwrap().to_string();
        let second = identity.get(&store).await.unwrap().to_string();

        assert_eq!(first, second);
        assert_canonical_v4(&first);
        assert_eq!(store.writes(), 1);
        assert_eq!(store.get(CLIENT_ID_KEY).unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_empty_stored_id_is_replaced() {
        let store = MemoryStore::new().with(CLIENT_ID_KEY, "");
        let identity = ClientIdentity::new();

        let id = identity.get(&store).await.unwrap();
        assert_canonical_v4(id);
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_access_generates_one_id() {
        let store = Arc::new(MemoryStore::new());
        let identity = Arc::new(ClientIdentity::new());

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            let identity = identity.clone();
            handles.push(tokio::spawn(async move {
                identity.get(&store).await.unwrap().to_string()
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }

        ids.dedup();
        assert_eq!(ids.len(), 1, "expected a single id, got {ids:?}");
        assert_eq!(store.writes(), 1);
    }
}
