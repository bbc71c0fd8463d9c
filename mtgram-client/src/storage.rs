//! Session persistence.
//!
//! The engine calls into a [`Storage`] after every durable state change: a
//! fresh auth key, a DC migration, or an advanced update checkpoint.  Restart
//! with the same storage and the engine resumes without a new handshake and
//! back-fills missed updates from the stored checkpoint.

use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Mutex;

use mtgram_tl::enums;

use crate::updates::UpdatesState;

/// Boxed future used by the object-safe async traits in this crate.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A persisted per-DC authorization.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthRecord {
    /// The data center this key was negotiated with.
    pub dc_id: i32,
    /// The 256-byte auth key.
    pub auth_key: [u8; 256],
    /// Whether this DC is the home DC (at most one record has this set).
    pub home: bool,
}

/// Where the engine persists auth keys and the update checkpoint.
///
/// Implementations must be cheap to call; the engine awaits writes inline.
pub trait Storage: Send + Sync {
    /// All saved authorizations, one per DC.
    fn read_authorizations(&self) -> BoxFuture<'_, io::Result<Vec<AuthRecord>>>;

    /// Insert or replace the authorization for `record.dc_id`.  When
    /// `record.home` is set, any previous home flag must be cleared.
    fn write_authorization(&self, record: AuthRecord) -> BoxFuture<'_, io::Result<()>>;

    /// Forget the authorization for one DC.
    fn delete_authorization(&self, dc_id: i32) -> BoxFuture<'_, io::Result<()>>;

    /// The last persisted update checkpoint, if any.
    fn read_updates_state(&self) -> BoxFuture<'_, io::Result<Option<UpdatesState>>>;

    /// Persist the update checkpoint.
    fn write_updates_state(&self, state: UpdatesState) -> BoxFuture<'_, io::Result<()>>;

    /// Cached users for the given protocol ids; unknown ids are skipped.
    fn read_users(&self, ids: &[i64]) -> BoxFuture<'_, io::Result<Vec<enums::User>>>;

    /// Upsert users into the entity cache, keyed by protocol id.
    fn write_users(&self, users: Vec<enums::User>) -> BoxFuture<'_, io::Result<()>>;

    /// Cached chats for the given protocol ids; unknown ids are skipped.
    fn read_chats(&self, ids: &[i64]) -> BoxFuture<'_, io::Result<Vec<enums::Chat>>>;

    /// Upsert chats into the entity cache, keyed by protocol id.
    fn write_chats(&self, chats: Vec<enums::Chat>) -> BoxFuture<'_, io::Result<()>>;

    /// Drop everything (logout).
    fn clear(&self) -> BoxFuture<'_, io::Result<()>>;
}

/// In-memory [`Storage`] for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryStorage {
    auths: Mutex<HashMap<i32, AuthRecord>>,
    updates: Mutex<Option<UpdatesState>>,
    users: Mutex<HashMap<i64, enums::User>>,
    chats: Mutex<HashMap<i64, enums::Chat>>,
}

impl MemoryStorage {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn read_authorizations(&self) -> BoxFuture<'_, io::Result<Vec<AuthRecord>>> {
        let out = self.auths.lock().unwrap().values().cloned().collect();
        Box::pin(async move { Ok(out) })
    }

    fn write_authorization(&self, record: AuthRecord) -> BoxFuture<'_, io::Result<()>> {
        let mut auths = self.auths.lock().unwrap();
        if record.home {
            for rec in auths.values_mut() {
                rec.home = false;
            }
        }
        auths.insert(record.dc_id, record);
        Box::pin(async { Ok(()) })
    }

    fn delete_authorization(&self, dc_id: i32) -> BoxFuture<'_, io::Result<()>> {
        self.auths.lock().unwrap().remove(&dc_id);
        Box::pin(async { Ok(()) })
    }

    fn read_updates_state(&self) -> BoxFuture<'_, io::Result<Option<UpdatesState>>> {
        let out = *self.updates.lock().unwrap();
        Box::pin(async move { Ok(out) })
    }

    fn write_updates_state(&self, state: UpdatesState) -> BoxFuture<'_, io::Result<()>> {
        *self.updates.lock().unwrap() = Some(state);
        Box::pin(async { Ok(()) })
    }

    fn read_users(&self, ids: &[i64]) -> BoxFuture<'_, io::Result<Vec<enums::User>>> {
        let cache = self.users.lock().unwrap();
        let out: Vec<_> = ids.iter().filter_map(|id| cache.get(id).cloned()).collect();
        Box::pin(async move { Ok(out) })
    }

    fn write_users(&self, users: Vec<enums::User>) -> BoxFuture<'_, io::Result<()>> {
        let mut cache = self.users.lock().unwrap();
        for user in users {
            cache.insert(user.id(), user);
        }
        Box::pin(async { Ok(()) })
    }

    fn read_chats(&self, ids: &[i64]) -> BoxFuture<'_, io::Result<Vec<enums::Chat>>> {
        let cache = self.chats.lock().unwrap();
        let out: Vec<_> = ids.iter().filter_map(|id| cache.get(id).cloned()).collect();
        Box::pin(async move { Ok(out) })
    }

    fn write_chats(&self, chats: Vec<enums::Chat>) -> BoxFuture<'_, io::Result<()>> {
        let mut cache = self.chats.lock().unwrap();
        for chat in chats {
            cache.insert(chat.id(), chat);
        }
        Box::pin(async { Ok(()) })
    }

    fn clear(&self) -> BoxFuture<'_, io::Result<()>> {
        self.auths.lock().unwrap().clear();
        *self.updates.lock().unwrap() = None;
        self.users.lock().unwrap().clear();
        self.chats.lock().unwrap().clear();
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn home_flag_is_exclusive() {
        let store = MemoryStorage::new();
        let key = [1u8; 256];
        store
            .write_authorization(AuthRecord { dc_id: 2, auth_key: key, home: true })
            .await
            .unwrap();
        store
            .write_authorization(AuthRecord { dc_id: 4, auth_key: key, home: true })
            .await
            .unwrap();

        let auths = store.read_authorizations().await.unwrap();
        let homes: Vec<_> = auths.iter().filter(|a| a.home).collect();
        assert_eq!(homes.len(), 1);
        assert_eq!(homes[0].dc_id, 4);
    }

    #[tokio::test]
    async fn entity_cache_upserts_by_id() {
        use mtgram_tl::types;

        let store = MemoryStorage::new();
        let user = |name: &str| {
            enums::User::User(types::User {
                id: 7,
                first_name: Some(name.to_string()),
                ..Default::default()
            })
        };
        store.write_users(vec![user("a")]).await.unwrap();
        store.write_users(vec![user("b")]).await.unwrap();

        let got = store.read_users(&[7, 8]).await.unwrap();
        assert_eq!(got.len(), 1, "unknown ids are skipped");
        assert_eq!(got[0], user("b"));
    }

    #[tokio::test]
    async fn deleted_authorizations_stay_gone() {
        let store = MemoryStorage::new();
        store
            .write_authorization(AuthRecord { dc_id: 2, auth_key: [0; 256], home: true })
            .await
            .unwrap();
        store.delete_authorization(2).await.unwrap();
        assert!(store.read_authorizations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let store = MemoryStorage::new();
        store
            .write_authorization(AuthRecord { dc_id: 1, auth_key: [0; 256], home: true })
            .await
            .unwrap();
        store
            .write_updates_state(UpdatesState { pts: 10, qts: 0, seq: 1, date: 99 })
            .await
            .unwrap();
        store.clear().await.unwrap();

        assert!(store.read_authorizations().await.unwrap().is_empty());
        assert!(store.read_updates_state().await.unwrap().is_none());
    }
}
