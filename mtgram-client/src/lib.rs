//! High-level MTProto engine.
//!
//! [`Telegram`] ties the layers together: it keeps one encrypted session to
//! the home data center, follows server-demanded DC migrations, reconciles
//! the update stream against a persisted checkpoint, and hands the caller an
//! ordered, exactly-once stream of updates.
//!
//! ```no_run
//! use std::sync::Arc;
//! use mtgram_client::{AppConfig, MemoryStorage, TcpConnector, Telegram};
//!
//! # async fn run(keys: Vec<mtgram_client::PinnedKey>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig {
//!     initial_dc: 2,
//!     addresses: AppConfig::production_addresses(),
//!     pinned_keys: keys,
//! };
//! let (client, mut updates) =
//!     Telegram::connect(config, Arc::new(MemoryStorage::new()), Arc::new(TcpConnector)).await?;
//!
//! while let Some(update) = updates.recv().await {
//!     println!("{update:?}");
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod datacenter;
pub mod errors;
pub mod storage;
pub mod updates;

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex, RwLock};

use mtgram_tl::{enums, functions, types, RemoteCall};

pub use datacenter::{
    Connector, DataCenter, NetStream, NetworkState, SessionEvent, TcpConnector,
};
pub use errors::{InvocationError, RpcError};
pub use mtgram_mtproto::handshake::PinnedKey;
pub use storage::{AuthRecord, MemoryStorage, Storage};
pub use updates::{DifferenceSource, Reconciled, UpdatesHandler, UpdatesState};

/// Re-export of the TL layer for building requests.
pub use mtgram_tl as tl;

/// Static client configuration.
pub struct AppConfig {
    /// DC to connect to when no session is saved.
    pub initial_dc: i32,
    /// DC id → `host:port`.
    pub addresses: HashMap<i32, String>,
    /// RSA keys trusted during the auth-key handshake.
    pub pinned_keys: Vec<PinnedKey>,
}

impl AppConfig {
    /// The well-known production DC addresses.
    pub fn production_addresses() -> HashMap<i32, String> {
        [
            (1, "149.154.175.53:443"),
            (2, "149.154.167.51:443"),
            (3, "149.154.175.100:443"),
            (4, "149.154.167.91:443"),
            (5, "91.108.56.130:443"),
        ]
        .into_iter()
        .map(|(dc, addr)| (dc, addr.to_string()))
        .collect()
    }

    fn addr_of(&self, dc_id: i32) -> Result<String, InvocationError> {
        self.addresses.get(&dc_id).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no address for DC {dc_id}")).into()
        })
    }
}

struct ClientInner {
    config: AppConfig,
    storage: Arc<dyn Storage>,
    connector: Arc<dyn Connector>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    home: RwLock<DataCenter>,
    /// Lazily opened sessions to other DCs, for file transfers.
    file_dcs: Mutex<HashMap<i32, DataCenter>>,
    handler: Mutex<UpdatesHandler>,
    update_tx: mpsc::UnboundedSender<enums::Update>,
    /// DC address table as advertised by `help.getConfig`.
    dc_options: watch::Sender<Vec<types::DcOption>>,
}

/// The engine.  Cheap to clone; all clones share one session.
#[derive(Clone)]
pub struct Telegram {
    inner: Arc<ClientInner>,
}

impl Telegram {
    /// Connect and resume (or establish) a session.
    ///
    /// Returns the client plus the stream of updates, delivered in server
    /// order with duplicates and gaps already reconciled.
    pub async fn connect(
        config: AppConfig,
        storage: Arc<dyn Storage>,
        connector: Arc<dyn Connector>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<enums::Update>), InvocationError> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let auths = storage.read_authorizations().await?;
        let (dc_id, saved_key) = match auths.iter().find(|a| a.home) {
            Some(rec) => (rec.dc_id, Some(rec.auth_key)),
            None => (config.initial_dc, None),
        };
        let addr = config.addr_of(dc_id)?;

        let fresh_key = saved_key.is_none();
        let dc = DataCenter::connect(
            dc_id,
            &addr,
            Arc::clone(&connector),
            &config.pinned_keys,
            saved_key,
            events_tx.clone(),
        )
        .await?;
        if fresh_key {
            storage
                .write_authorization(AuthRecord {
                    dc_id,
                    auth_key: dc.auth_key().await,
                    home: true,
                })
                .await?;
        }

        let saved_state = storage.read_updates_state().await?;
        let handler = match saved_state {
            Some(state) => UpdatesHandler::new(state),
            None => {
                let mut handler = UpdatesHandler::new(UpdatesState::default());
                handler.sync_state(&dc).await?;
                storage.write_updates_state(handler.state()).await?;
                handler
            }
        };
        // Back-fill anything missed while offline.
        if saved_state.is_some() {
            let _ = events_tx.send(SessionEvent::ShouldSyncUpdates);
        }

        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let (dc_options, _) = watch::channel(Vec::new());
        let inner = Arc::new(ClientInner {
            config,
            storage,
            connector,
            events_tx,
            home: RwLock::new(dc),
            file_dcs: Mutex::new(HashMap::new()),
            handler: Mutex::new(handler),
            update_tx,
            dc_options,
        });
        tokio::spawn(run_events(Arc::clone(&inner), events_rx));
        tokio::spawn(refresh_config(Arc::clone(&inner)));

        Ok((Self { inner }, update_rx))
    }

    /// Send a request to the home DC and await its reply.
    ///
    /// A home-DC migration rejection switches the home DC and retries the
    /// request once, transparently.  `FILE_MIGRATE` surfaces as an RPC error;
    /// route those calls through [`Self::file_session`].
    pub async fn invoke<R: RemoteCall>(&self, request: &R) -> Result<R::Return, InvocationError> {
        let home = self.inner.home.read().await.clone();
        match home.invoke(request).await {
            Err(InvocationError::Migrate(dc_id)) => {
                self.inner.migrate(dc_id).await?;
                let home = self.inner.home.read().await.clone();
                home.invoke(request).await
            }
            other => other,
        }
    }

    /// Observe the home DC's connectivity.
    pub async fn network_state(&self) -> watch::Receiver<NetworkState> {
        self.inner.home.read().await.network_state()
    }

    /// The current update checkpoint.
    pub async fn updates_state(&self) -> UpdatesState {
        self.inner.handler.lock().await.state()
    }

    /// Observe the DC address table advertised by the server.
    pub fn dc_options(&self) -> watch::Receiver<Vec<types::DcOption>> {
        self.inner.dc_options.subscribe()
    }

    /// Fold in updates produced by one of our own requests (local echo).
    /// Counters fast-forward without gap detection, so a later push of the
    /// same update is recognized as a duplicate.
    pub async fn apply_update(&self, update: enums::Update) {
        self.inner.handler.lock().await.apply_own(&update);
        self.inner.persist_checkpoint().await;
        let _ = self.inner.update_tx.send(update);
    }

    /// A session to another DC, for file transfers.  Opened lazily, reusing
    /// a persisted key when one exists, and kept for the client's lifetime.
    pub async fn file_session(&self, dc_id: i32) -> Result<DataCenter, InvocationError> {
        if let Some(dc) = self.inner.file_dcs.lock().await.get(&dc_id) {
            return Ok(dc.clone());
        }
        let dc = self.inner.open_dc(dc_id, false).await?;
        self.inner.file_dcs.lock().await.insert(dc_id, dc.clone());
        Ok(dc)
    }

    /// Log out and wipe the persisted session.
    pub async fn log_out(&self) -> Result<bool, InvocationError> {
        let ok = self.invoke(&functions::auth::LogOut).await?;
        if ok {
            self.inner.storage.clear().await?;
        }
        Ok(ok)
    }

    /// Shut the connection down.
    pub async fn close(&self) {
        self.inner.home.read().await.close().await;
    }
}

impl ClientInner {
    /// Resolve a DC address, preferring the server-advertised table over the
    /// static configuration.
    fn resolve_addr(&self, dc_id: i32) -> Result<String, InvocationError> {
        let advertised = self.dc_options.borrow().iter().find_map(|opt| {
            (opt.id == dc_id && !opt.ipv6 && !opt.media_only)
                .then(|| format!("{}:{}", opt.ip_address, opt.port))
        });
        match advertised {
            Some(addr) => Ok(addr),
            None => self.config.addr_of(dc_id),
        }
    }

    /// Open a session to `dc_id`, reusing a persisted key when one exists,
    /// otherwise negotiating a fresh one and transferring the authorization
    /// from the current home DC.
    async fn open_dc(&self, dc_id: i32, home: bool) -> Result<DataCenter, InvocationError> {
        let addr = self.resolve_addr(dc_id)?;
        let saved_key = self
            .storage
            .read_authorizations()
            .await?
            .into_iter()
            .find(|a| a.dc_id == dc_id)
            .map(|a| a.auth_key);
        let had_key = saved_key.is_some();

        let dc = DataCenter::connect(
            dc_id,
            &addr,
            Arc::clone(&self.connector),
            &self.config.pinned_keys,
            saved_key,
            self.events_tx.clone(),
        )
        .await?;

        if !had_key {
            // Carries the signed-in account over; fails harmlessly when the
            // session is not yet signed in.
            let main = self.home.read().await.clone();
            match main.invoke(&functions::auth::ExportAuthorization { dc_id }).await {
                Ok(exported) => {
                    dc.invoke(&functions::auth::ImportAuthorization {
                        id: exported.id,
                        bytes: exported.bytes,
                    })
                    .await?;
                }
                Err(e) => tracing::debug!("authorization export skipped: {e}"),
            }
            self.storage
                .write_authorization(AuthRecord {
                    dc_id,
                    auth_key: dc.auth_key().await,
                    home,
                })
                .await?;
        }
        Ok(dc)
    }

    /// Switch the home DC, transferring the authorization when the target has
    /// no saved key.
    async fn migrate(&self, dc_id: i32) -> Result<(), InvocationError> {
        tracing::info!(dc_id, "migrating home DC");
        let old = self.home.read().await.clone();
        let new = self.open_dc(dc_id, true).await?;

        self.storage
            .write_authorization(AuthRecord {
                dc_id,
                auth_key: new.auth_key().await,
                home: true,
            })
            .await?;

        *self.home.write().await = new;
        old.close().await;
        Ok(())
    }

    async fn sync_updates(&self) -> Result<(), InvocationError> {
        let home = self.home.read().await.clone();
        home.set_syncing(true);
        let result = {
            let mut handler = self.handler.lock().await;
            handler.sync(&home).await
        };
        home.set_syncing(false);

        self.deliver(result?).await;
        Ok(())
    }

    /// Cache entities, persist the checkpoint, then hand the updates to the
    /// subscriber.
    async fn deliver(&self, reconciled: Reconciled) {
        if !reconciled.users.is_empty() {
            if let Err(e) = self.storage.write_users(reconciled.users).await {
                tracing::warn!("failed to cache users: {e}");
            }
        }
        if !reconciled.chats.is_empty() {
            if let Err(e) = self.storage.write_chats(reconciled.chats).await {
                tracing::warn!("failed to cache chats: {e}");
            }
        }
        self.persist_checkpoint().await;
        for update in reconciled.updates {
            let _ = self.update_tx.send(update);
        }
    }

    async fn persist_checkpoint(&self) {
        let state = self.handler.lock().await.state();
        if let Err(e) = self.storage.write_updates_state(state).await {
            tracing::warn!("failed to persist update checkpoint: {e}");
        }
    }
}

async fn run_events(inner: Arc<ClientInner>, mut events: mpsc::UnboundedReceiver<SessionEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::Authorized { dc_id } => {
                // Keys are persisted at the connect sites, where the
                // DataCenter handle is available.
                tracing::debug!(dc_id, "auth key negotiated");
            }
            SessionEvent::Migrated { dc_id } => {
                tracing::debug!(dc_id, "server demanded migration");
            }
            SessionEvent::ShouldSyncUpdates => {
                if let Err(e) = inner.sync_updates().await {
                    tracing::warn!("update sync failed: {e}");
                }
            }
            SessionEvent::Updates(envelope) => {
                let home = inner.home.read().await.clone();
                let result = {
                    let mut handler = inner.handler.lock().await;
                    handler.process(envelope, &home).await
                };
                match result {
                    Ok(reconciled) => inner.deliver(reconciled).await,
                    Err(e) => tracing::warn!("failed to process updates: {e}"),
                }
            }
        }
    }
    tracing::debug!("event loop finished");
}

/// Fetch `help.getConfig` once and publish the advertised DC table; later
/// migrations resolve addresses against it.
async fn refresh_config(inner: Arc<ClientInner>) {
    let home = inner.home.read().await.clone();
    match home.invoke(&functions::help::GetConfig).await {
        Ok(config) => {
            tracing::debug!(this_dc = config.this_dc, "received server config");
            inner.dc_options.send_replace(config.dc_options);
        }
        Err(e) => tracing::warn!("could not fetch server config: {e}"),
    }
}
