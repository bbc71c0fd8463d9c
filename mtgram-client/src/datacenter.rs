//! A live connection to one data center.
//!
//! [`DataCenter`] owns the encrypted session, the socket, and the table of
//! in-flight calls.  A background reader task decrypts every incoming frame,
//! unwraps containers and compressed payloads, routes RPC results to their
//! waiting callers by `msg_id`, and reconnects with backoff when the socket
//! drops.  Updates and session-level notifications are forwarded to the
//! owner through a [`SessionEvent`] channel.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch, Mutex};

use mtgram_mtproto::handshake::{self, PinnedKey};
use mtgram_mtproto::{EncryptedSession, Message, MsgIdGen};
use mtgram_tl::deserialize::peek_id;
use mtgram_tl::{enums, functions, types, Cursor, Deserializable, Identifiable, RemoteCall};

use crate::errors::{InvocationError, RpcError};
use crate::storage::BoxFuture;
use crate::updates::DifferenceSource;

// Envelope constructors handled at the session layer.
const ID_RPC_RESULT: u32 = 0xf35c6d01;
const ID_MSG_CONTAINER: u32 = 0x73f1f8dc;
const ID_GZIP_PACKED: u32 = 0x3072cfa1;

// Intermediate transport: one-time init tag, then 4-byte LE length prefixes.
const INTERMEDIATE_INIT: [u8; 4] = [0xee, 0xee, 0xee, 0xee];
const MAX_FRAME_LEN: usize = 1 << 24;

/// Resend budget per call before it is reported as dropped.
const MAX_RETRIES: u32 = 5;

const RECONNECT_DELAY: Duration = Duration::from_secs(1);
const RECONNECT_DELAY_MAX: Duration = Duration::from_secs(30);

// ─── Connector ───────────────────────────────────────────────────────────────

/// Object-safe alias for the byte streams the engine runs over.
pub trait NetStream: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> NetStream for T {}

/// Opens byte streams to a DC address.  Swap this out for proxies or
/// in-memory pipes in tests.
pub trait Connector: Send + Sync + 'static {
    /// Open a stream to `addr` (`host:port`).
    fn connect<'a>(&'a self, addr: &'a str) -> BoxFuture<'a, io::Result<Box<dyn NetStream>>>;
}

/// Plain TCP with `TCP_NODELAY`.
pub struct TcpConnector;

impl Connector for TcpConnector {
    fn connect<'a>(&'a self, addr: &'a str) -> BoxFuture<'a, io::Result<Box<dyn NetStream>>> {
        Box::pin(async move {
            let stream = TcpStream::connect(addr).await?;
            stream.set_nodelay(true)?;
            Ok(Box::new(stream) as Box<dyn NetStream>)
        })
    }
}

// ─── Events and state ────────────────────────────────────────────────────────

/// Connectivity of one DC connection, observable through a watch channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NetworkState {
    /// Last dial failed; backing off before the next attempt.
    WaitingForNetwork,
    /// Socket down; a (re)connection attempt is in progress.
    Connecting,
    /// Socket up and the session is live.
    Connected,
    /// Connected, and currently back-filling missed updates.
    Updating,
    /// Closed for good.
    Disconnected,
}

/// Out-of-band notifications a [`DataCenter`] emits to its owner.
#[derive(Debug)]
pub enum SessionEvent {
    /// A fresh auth key was negotiated for this DC; persist it.
    Authorized {
        /// The DC the key belongs to.
        dc_id: i32,
    },
    /// The server demanded this account be served from another DC.
    Migrated {
        /// Target DC id.
        dc_id: i32,
    },
    /// The server may have dropped updates for us (new session, reconnect);
    /// run a difference fetch.
    ShouldSyncUpdates,
    /// An update envelope arrived.
    Updates(enums::Updates),
}

// ─── Wire helpers ────────────────────────────────────────────────────────────

async fn send_frame<W: AsyncWrite + Unpin>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    let mut buf = Vec::with_capacity(4 + payload.len());
    buf.extend((payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(payload);
    writer.write_all(&buf).await?;
    writer.flush().await
}

async fn recv_frame<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes).await?;
    let len = u32::from_le_bytes(len_bytes) as usize;
    if len > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame length {len} exceeds limit"),
        ));
    }
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

/// A 4-byte frame carries a transport-level error code, always negative.
fn transport_error(frame: &[u8]) -> Option<i32> {
    if frame.len() == 4 {
        let code = i32::from_le_bytes(frame.try_into().unwrap());
        if code < 0 {
            return Some(code);
        }
    }
    None
}

fn gz_inflate(bytes: &[u8]) -> Result<Vec<u8>, InvocationError> {
    use flate2::read::{GzDecoder, ZlibDecoder};
    use std::io::Read;

    let mut out = Vec::new();
    if GzDecoder::new(bytes).read_to_end(&mut out).is_ok() {
        return Ok(out);
    }
    out.clear();
    ZlibDecoder::new(bytes)
        .read_to_end(&mut out)
        .map_err(|e| InvocationError::Deserialize(format!("bad gzip payload: {e}")))?;
    Ok(out)
}

// ─── Pending calls ───────────────────────────────────────────────────────────

struct PendingCall {
    /// Serialized request, kept so the call can be re-sent under a new
    /// msg_id.
    body: Vec<u8>,
    tx: oneshot::Sender<Result<Vec<u8>, InvocationError>>,
    retries: u32,
}

type Writer = WriteHalf<Box<dyn NetStream>>;
type Reader = ReadHalf<Box<dyn NetStream>>;

struct DcShared {
    dc_id: i32,
    addr: String,
    connector: Arc<dyn Connector>,
    session: Mutex<EncryptedSession>,
    writer: Mutex<Option<Writer>>,
    pending: std::sync::Mutex<HashMap<i64, PendingCall>>,
    state_tx: watch::Sender<NetworkState>,
    events: mpsc::UnboundedSender<SessionEvent>,
    closed: AtomicBool,
}

// ─── DataCenter ──────────────────────────────────────────────────────────────

/// A connection to a single data center.
///
/// Cheap to clone; all clones share one session.
#[derive(Clone)]
pub struct DataCenter {
    shared: Arc<DcShared>,
}

impl DataCenter {
    /// Connect to `addr` and bring up an encrypted session.
    ///
    /// With `saved_key`, the handshake is skipped and the session starts with
    /// salt 0; the server corrects it through `bad_server_salt` on the first
    /// call.  Without one, a full DH exchange runs against `keys` and a
    /// [`SessionEvent::Authorized`] is emitted so the owner can persist the
    /// result.
    pub async fn connect(
        dc_id: i32,
        addr: &str,
        connector: Arc<dyn Connector>,
        keys: &[PinnedKey],
        saved_key: Option<[u8; 256]>,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<Self, InvocationError> {
        let stream = connector.connect(addr).await?;
        let (mut reader, mut writer) = tokio::io::split(stream);
        writer.write_all(&INTERMEDIATE_INIT).await?;

        let session = match saved_key {
            Some(key) => {
                tracing::debug!(dc_id, "resuming session with saved auth key");
                EncryptedSession::new(key, 0, 0)
            }
            None => {
                tracing::info!(dc_id, "no saved auth key, running handshake");
                let done = negotiate_key(&mut reader, &mut writer, keys).await?;
                let session =
                    EncryptedSession::new(done.auth_key, done.first_salt, done.time_offset);
                let _ = events.send(SessionEvent::Authorized { dc_id });
                session
            }
        };

        let (state_tx, _) = watch::channel(NetworkState::Connected);
        let shared = Arc::new(DcShared {
            dc_id,
            addr: addr.to_string(),
            connector,
            session: Mutex::new(session),
            writer: Mutex::new(Some(writer)),
            pending: std::sync::Mutex::new(HashMap::new()),
            state_tx,
            events,
            closed: AtomicBool::new(false),
        });

        tokio::spawn(run_reader(Arc::clone(&shared), reader));
        Ok(Self { shared })
    }

    /// The DC this connection talks to.
    pub fn dc_id(&self) -> i32 {
        self.shared.dc_id
    }

    /// Observe connectivity changes.
    pub fn network_state(&self) -> watch::Receiver<NetworkState> {
        self.shared.state_tx.subscribe()
    }

    /// Flag the connection as back-filling updates (or done doing so).  Only
    /// touches the watch value while the session is otherwise live.
    pub fn set_syncing(&self, syncing: bool) {
        self.shared.state_tx.send_if_modified(|state| match (*state, syncing) {
            (NetworkState::Connected, true) => {
                *state = NetworkState::Updating;
                true
            }
            (NetworkState::Updating, false) => {
                *state = NetworkState::Connected;
                true
            }
            _ => false,
        });
    }

    /// The session's auth key, for persistence.
    pub async fn auth_key(&self) -> [u8; 256] {
        self.shared.session.lock().await.auth_key_bytes()
    }

    /// Send a request and await its reply.
    ///
    /// Salt and msg_id rejections are retried transparently; a home-DC
    /// migration error surfaces as [`InvocationError::Migrate`].
    pub async fn invoke<R: RemoteCall>(&self, request: &R) -> Result<R::Return, InvocationError> {
        let rx = self.shared.send_call(request.to_bytes()).await?;
        match rx.await {
            Ok(Ok(payload)) => Ok(R::Return::from_bytes(&payload)?),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(InvocationError::Dropped),
        }
    }

    /// Send a `ping`; useful as a keep-alive.
    pub async fn ping(&self, ping_id: i64) -> Result<types::Pong, InvocationError> {
        self.invoke(&functions::Ping { ping_id }).await
    }

    /// Shut the connection down.  In-flight calls fail with
    /// [`InvocationError::ConnectionClosed`].
    pub async fn close(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        if let Some(mut writer) = self.shared.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
        self.shared.fail_pending();
        self.shared.state_tx.send_replace(NetworkState::Disconnected);
    }
}

impl DifferenceSource for DataCenter {
    fn get_state(&self) -> BoxFuture<'_, Result<types::updates::State, InvocationError>> {
        Box::pin(async move { self.invoke(&functions::updates::GetState).await })
    }

    fn get_difference(
        &self,
        pts: i32,
        date: i32,
        qts: i32,
    ) -> BoxFuture<'_, Result<enums::updates::Difference, InvocationError>> {
        Box::pin(async move {
            self.invoke(&functions::updates::GetDifference { pts, date, qts })
                .await
        })
    }
}

// ─── Handshake over plaintext frames ─────────────────────────────────────────

async fn plain_invoke<R: RemoteCall>(
    reader: &mut Reader,
    writer: &mut Writer,
    msg_ids: &mut MsgIdGen,
    request: &R,
) -> Result<R::Return, InvocationError> {
    let msg = Message::plaintext(msg_ids.next(), request.to_bytes());
    send_frame(writer, &msg.to_bytes()).await?;

    let frame = recv_frame(reader).await?;
    if let Some(code) = transport_error(&frame) {
        return Err(io::Error::other(format!("transport error {code}")).into());
    }
    let msg = Message::from_bytes(&frame)
        .map_err(|e| InvocationError::Deserialize(e.to_string()))?;
    Ok(R::Return::from_bytes(&msg.body)?)
}

async fn negotiate_key(
    reader: &mut Reader,
    writer: &mut Writer,
    keys: &[PinnedKey],
) -> Result<handshake::Finished, InvocationError> {
    let mut msg_ids = MsgIdGen::new(0);

    let (request, step1) = handshake::step1()?;
    let response = plain_invoke(reader, writer, &mut msg_ids, &request).await?;

    let (request, step2) = handshake::step2(step1, response, keys)?;
    let response = plain_invoke(reader, writer, &mut msg_ids, &request).await?;

    let (request, step3) = handshake::step3(step2, response)?;
    let response = plain_invoke(reader, writer, &mut msg_ids, &request).await?;

    let done = handshake::finish(step3, response)?;
    tracing::info!(time_offset = done.time_offset, "auth key negotiated");
    Ok(done)
}

// ─── Reader task ─────────────────────────────────────────────────────────────

async fn run_reader(shared: Arc<DcShared>, mut reader: Reader) {
    loop {
        match recv_frame(&mut reader).await {
            Ok(mut frame) => {
                if let Err(e) = shared.handle_frame(&mut frame).await {
                    tracing::warn!("discarding bad frame: {e}");
                }
            }
            Err(e) => {
                if shared.closed.load(Ordering::SeqCst) {
                    shared.fail_pending();
                    break;
                }
                tracing::warn!(dc_id = shared.dc_id, "connection lost: {e}");
                match shared.reconnect().await {
                    Some(new_reader) => reader = new_reader,
                    None => {
                        shared.fail_pending();
                        break;
                    }
                }
            }
        }
    }
    shared.state_tx.send_replace(NetworkState::Disconnected);
    tracing::debug!(dc_id = shared.dc_id, "reader task finished");
}

impl DcShared {
    async fn send_call(
        &self,
        body: Vec<u8>,
    ) -> Result<oneshot::Receiver<Result<Vec<u8>, InvocationError>>, InvocationError> {
        let (tx, rx) = oneshot::channel();
        let (frame, msg_id) = self.session.lock().await.pack_raw(body.clone());
        self.pending
            .lock()
            .unwrap()
            .insert(msg_id, PendingCall { body, tx, retries: 0 });

        if let Err(e) = self.send_raw(&frame).await {
            self.pending.lock().unwrap().remove(&msg_id);
            return Err(e);
        }
        Ok(rx)
    }

    async fn send_raw(&self, frame: &[u8]) -> Result<(), InvocationError> {
        let mut guard = self.writer.lock().await;
        match guard.as_mut() {
            Some(writer) => Ok(send_frame(writer, frame).await?),
            None => Err(InvocationError::ConnectionClosed),
        }
    }

    fn complete(&self, msg_id: i64, result: Result<Vec<u8>, InvocationError>) {
        match self.pending.lock().unwrap().remove(&msg_id) {
            Some(call) => {
                let _ = call.tx.send(result);
            }
            None => tracing::debug!(msg_id, "reply for unknown or abandoned call"),
        }
    }

    fn fail_pending(&self) {
        let drained: Vec<_> = {
            let mut pending = self.pending.lock().unwrap();
            pending.drain().collect()
        };
        for (_, call) in drained {
            let _ = call.tx.send(Err(InvocationError::ConnectionClosed));
        }
    }

    /// Re-send a previously registered call under a fresh msg_id.
    async fn resend(&self, bad_msg_id: i64) {
        let Some(call) = self.pending.lock().unwrap().remove(&bad_msg_id) else {
            tracing::debug!(bad_msg_id, "asked to resend an unknown call");
            return;
        };
        if call.retries >= MAX_RETRIES {
            let _ = call.tx.send(Err(InvocationError::Transport));
            return;
        }

        let (frame, msg_id) = self.session.lock().await.pack_raw(call.body.clone());
        self.pending.lock().unwrap().insert(
            msg_id,
            PendingCall { body: call.body, tx: call.tx, retries: call.retries + 1 },
        );
        tracing::debug!(bad_msg_id, msg_id, "resending call");
        // On send failure the call stays registered; the reconnect path
        // re-sends it.
        let _ = self.send_raw(&frame).await;
    }

    async fn handle_frame(&self, frame: &mut [u8]) -> Result<(), InvocationError> {
        if let Some(code) = transport_error(frame) {
            return Err(io::Error::other(format!("transport error {code}")).into());
        }

        let message = self
            .session
            .lock()
            .await
            .unpack(frame)
            .map_err(|e| InvocationError::Deserialize(e.to_string()))?;

        // Content-related server messages must be acknowledged, or the server
        // resends them and eventually drops the session.  A container itself
        // is unrelated; its content-related members are acked individually.
        let mut acks = Vec::new();
        if message.seq_no & 1 == 1 {
            acks.push(message.msg_id);
        }
        self.dispatch(message.msg_id, message.body, &mut acks).await?;

        if !acks.is_empty() {
            self.send_acks(acks).await;
        }
        Ok(())
    }

    async fn send_acks(&self, msg_ids: Vec<i64>) {
        let (frame, _) = self
            .session
            .lock()
            .await
            .pack_unrelated(&types::MsgsAck { msg_ids });
        let _ = self.send_raw(&frame).await;
    }

    /// Unwrap one decrypted message, including nested containers and
    /// compressed payloads, and route every leaf.  Content-related inner
    /// messages are appended to `acks`.
    async fn dispatch(
        &self,
        msg_id: i64,
        body: Vec<u8>,
        acks: &mut Vec<i64>,
    ) -> Result<(), InvocationError> {
        let mut queue = VecDeque::new();
        queue.push_back((msg_id, body));

        while let Some((msg_id, body)) = queue.pop_front() {
            let mut cur = Cursor::from_slice(&body);
            let id = peek_id(&mut cur)?;
            match id {
                ID_MSG_CONTAINER => {
                    u32::deserialize(&mut cur)?;
                    let count = i32::deserialize(&mut cur)?;
                    for _ in 0..count {
                        let inner_msg_id = i64::deserialize(&mut cur)?;
                        let inner_seq_no = i32::deserialize(&mut cur)?;
                        let len = i32::deserialize(&mut cur)? as usize;
                        let mut inner = vec![0u8; len];
                        cur.read_exact(&mut inner)?;
                        if inner_seq_no & 1 == 1 {
                            acks.push(inner_msg_id);
                        }
                        queue.push_back((inner_msg_id, inner));
                    }
                }
                ID_GZIP_PACKED => {
                    u32::deserialize(&mut cur)?;
                    let packed = Vec::<u8>::deserialize(&mut cur)?;
                    queue.push_back((msg_id, gz_inflate(&packed)?));
                }
                ID_RPC_RESULT => {
                    u32::deserialize(&mut cur)?;
                    let req_msg_id = i64::deserialize(&mut cur)?;
                    let mut rest = Vec::new();
                    cur.read_to_end(&mut rest);
                    self.handle_rpc_result(req_msg_id, rest)?;
                }
                types::BadServerSalt::CONSTRUCTOR_ID => {
                    let bad = types::BadServerSalt::from_bytes(&body)?;
                    tracing::debug!(bad_msg_id = bad.bad_msg_id, "bad server salt");
                    self.session.lock().await.set_salt(bad.new_server_salt);
                    self.resend(bad.bad_msg_id).await;
                }
                types::BadMsgNotification::CONSTRUCTOR_ID => {
                    let bad = types::BadMsgNotification::from_bytes(&body)?;
                    tracing::warn!(
                        bad_msg_id = bad.bad_msg_id,
                        error_code = bad.error_code,
                        "bad msg notification"
                    );
                    // 16/17: client msg_id outside the server's window; fix
                    // the clock from the server's own msg_id first.
                    if bad.error_code == 16 || bad.error_code == 17 {
                        self.session.lock().await.correct_time_offset(msg_id);
                    }
                    self.resend(bad.bad_msg_id).await;
                }
                types::Pong::CONSTRUCTOR_ID => {
                    let pong = types::Pong::from_bytes(&body)?;
                    self.complete(pong.msg_id, Ok(body.clone()));
                }
                types::NewSessionCreated::CONSTRUCTOR_ID => {
                    let created = types::NewSessionCreated::from_bytes(&body)?;
                    self.session.lock().await.set_salt(created.server_salt);
                    let _ = self.events.send(SessionEvent::ShouldSyncUpdates);
                }
                types::MsgsAck::CONSTRUCTOR_ID => {
                    // Outgoing messages are not tracked for acknowledgement.
                }
                _ => match enums::Updates::from_bytes(&body) {
                    Ok(updates) => {
                        let _ = self.events.send(SessionEvent::Updates(updates));
                    }
                    Err(_) => {
                        tracing::warn!("dropping message with unknown constructor {id:#010x}");
                    }
                },
            }
        }
        Ok(())
    }

    fn handle_rpc_result(
        &self,
        req_msg_id: i64,
        result: Vec<u8>,
    ) -> Result<(), InvocationError> {
        let mut cur = Cursor::from_slice(&result);
        let payload = if peek_id(&mut cur)? == ID_GZIP_PACKED {
            u32::deserialize(&mut cur)?;
            let packed = Vec::<u8>::deserialize(&mut cur)?;
            gz_inflate(&packed)?
        } else {
            result
        };

        let mut cur = Cursor::from_slice(&payload);
        if peek_id(&mut cur)? == types::RpcError::CONSTRUCTOR_ID {
            let raw = types::RpcError::from_bytes(&payload)?;
            let rpc = RpcError::from_server(raw.error_code, &raw.error_message);
            let outcome = match rpc.migrate_dc() {
                Some(dc_id) => {
                    let _ = self.events.send(SessionEvent::Migrated { dc_id });
                    Err(InvocationError::Migrate(dc_id))
                }
                None => Err(InvocationError::Rpc(rpc)),
            };
            self.complete(req_msg_id, outcome);
        } else {
            self.complete(req_msg_id, Ok(payload));
        }
        Ok(())
    }

    /// Re-dial with exponential backoff until connected or closed, then
    /// re-send every in-flight call under the fresh session.
    async fn reconnect(&self) -> Option<Reader> {
        let mut delay = RECONNECT_DELAY;
        loop {
            if self.closed.load(Ordering::SeqCst) {
                return None;
            }
            self.state_tx.send_replace(NetworkState::Connecting);
            match self.try_reconnect_once().await {
                Ok(reader) => {
                    self.state_tx.send_replace(NetworkState::Connected);
                    self.resend_all_pending().await;
                    let _ = self.events.send(SessionEvent::ShouldSyncUpdates);
                    tracing::info!(dc_id = self.dc_id, "reconnected");
                    return Some(reader);
                }
                Err(e) => {
                    tracing::warn!(dc_id = self.dc_id, "reconnect failed: {e}, retrying in {delay:?}");
                    self.state_tx.send_replace(NetworkState::WaitingForNetwork);
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(RECONNECT_DELAY_MAX);
                }
            }
        }
    }

    async fn try_reconnect_once(&self) -> io::Result<Reader> {
        let stream = self.connector.connect(&self.addr).await?;
        let (reader, mut writer) = tokio::io::split(stream);
        writer.write_all(&INTERMEDIATE_INIT).await?;

        // Same auth key and salt, fresh session_id and counters.
        {
            let mut session = self.session.lock().await;
            let key = session.auth_key_bytes();
            let salt = session.salt;
            let offset = session.time_offset();
            *session = EncryptedSession::new(key, salt, offset);
        }
        *self.writer.lock().await = Some(writer);
        Ok(reader)
    }

    /// Re-send every in-flight call, charging each one's retry budget.
    async fn resend_all_pending(&self) {
        let calls: Vec<_> = {
            let mut pending = self.pending.lock().unwrap();
            pending.drain().collect()
        };
        for (old_msg_id, mut call) in calls {
            if call.retries >= MAX_RETRIES {
                let _ = call.tx.send(Err(InvocationError::Transport));
                continue;
            }
            call.retries += 1;
            let (frame, msg_id) = self.session.lock().await.pack_raw(call.body.clone());
            tracing::debug!(old_msg_id, msg_id, "resending call after reconnect");
            self.pending.lock().unwrap().insert(msg_id, call);
            if self.send_raw(&frame).await.is_err() {
                // Still registered; the next reconnect pass retries it.
                return;
            }
        }
    }
}
