//! Encrypted session state (post auth-key).
//!
//! Construct an [`EncryptedSession`] from a [`crate::handshake::Finished`]
//! (or a persisted key) and use it to frame every subsequent message.

use mtgram_crypto::{decrypt_data, encrypt_data, AuthKey, Side};
use mtgram_tl::{RemoteCall, Serializable};

use crate::message::MsgIdGen;

/// Errors that can occur when decrypting a server frame.
#[derive(Debug)]
pub enum DecryptError {
    /// The underlying crypto layer rejected the message.
    Crypto(mtgram_crypto::DecryptError),
    /// The decrypted inner message was too short to contain a valid header.
    FrameTooShort,
    /// Session-ID mismatch (possible replay or wrong connection).
    SessionMismatch,
}

impl std::fmt::Display for DecryptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Crypto(e) => write!(f, "crypto: {e}"),
            Self::FrameTooShort => write!(f, "inner plaintext too short"),
            Self::SessionMismatch => write!(f, "session_id mismatch"),
        }
    }
}
impl std::error::Error for DecryptError {}

/// The inner payload extracted from a successfully decrypted server frame.
pub struct DecryptedMessage {
    /// `salt` sent by the server.
    pub salt: i64,
    /// The `session_id` from the frame.
    pub session_id: i64,
    /// The `msg_id` of the inner message.
    pub msg_id: i64,
    /// `seq_no` of the inner message.
    pub seq_no: i32,
    /// TL-serialized body of the inner message.
    pub body: Vec<u8>,
}

/// Encrypted session state.
///
/// Wraps an [`AuthKey`] and tracks per-session counters (session_id, seq_no,
/// last msg_id, server salt).  Use [`EncryptedSession::pack`] for outgoing
/// requests and [`EncryptedSession::unpack`] for incoming server frames.
pub struct EncryptedSession {
    auth_key: AuthKey,
    session_id: i64,
    sequence: i32,
    msg_ids: MsgIdGen,
    /// Current server salt to include in outgoing messages.
    pub salt: i64,
}

impl EncryptedSession {
    /// Create a fresh session over an auth key.
    ///
    /// `first_salt` may be 0 for a restored key; the server answers the first
    /// call with `bad_server_salt` carrying the valid one.
    pub fn new(auth_key: [u8; 256], first_salt: i64, time_offset: i32) -> Self {
        let mut rnd = [0u8; 8];
        getrandom::getrandom(&mut rnd).expect("getrandom");
        Self {
            auth_key: AuthKey::from_bytes(auth_key),
            session_id: i64::from_le_bytes(rnd),
            sequence: 0,
            msg_ids: MsgIdGen::new(time_offset),
            salt: first_salt,
        }
    }

    /// Next content-related seq_no (odd); advances the counter.
    fn next_seq_no(&mut self) -> i32 {
        let n = self.sequence * 2 + 1;
        self.sequence += 1;
        n
    }

    /// Next content-unrelated seq_no (even); does not advance the counter.
    fn next_seq_no_unrelated(&self) -> i32 {
        self.sequence * 2
    }

    fn pack_body(&mut self, body: Vec<u8>, content_related: bool) -> (Vec<u8>, i64) {
        let msg_id = self.msg_ids.next();
        let seq_no = if content_related {
            self.next_seq_no()
        } else {
            self.next_seq_no_unrelated()
        };

        let mut inner = Vec::with_capacity(32 + body.len());
        inner.extend(self.salt.to_le_bytes());
        inner.extend(self.session_id.to_le_bytes());
        inner.extend(msg_id.to_le_bytes());
        inner.extend(seq_no.to_le_bytes());
        inner.extend((body.len() as u32).to_le_bytes());
        inner.extend(&body);

        log::trace!("packing msg_id={msg_id} seq_no={seq_no} body_len={}", body.len());
        (encrypt_data(&inner, &self.auth_key, Side::Client), msg_id)
    }

    /// Encrypt and frame a [`RemoteCall`]; returns the wire bytes and the
    /// `msg_id` allocated for it, so the caller can register the pending
    /// reply before sending.
    pub fn pack<R: RemoteCall>(&mut self, call: &R) -> (Vec<u8>, i64) {
        self.pack_body(call.to_bytes(), true)
    }

    /// Encrypt a content-unrelated message (acks).  The server never replies
    /// to these, and they do not consume an odd seq_no slot.
    pub fn pack_unrelated<S: Serializable>(&mut self, msg: &S) -> (Vec<u8>, i64) {
        self.pack_body(msg.to_bytes(), false)
    }

    /// Encrypt an already-serialized request body.  Used to resend a call
    /// under a fresh `msg_id` after `bad_server_salt` or a msg_id rejection.
    pub fn pack_raw(&mut self, body: Vec<u8>) -> (Vec<u8>, i64) {
        self.pack_body(body, true)
    }

    /// Decrypt an encrypted server frame (already stripped of transport
    /// framing).
    pub fn unpack(&self, frame: &mut [u8]) -> Result<DecryptedMessage, DecryptError> {
        let plaintext =
            decrypt_data(frame, &self.auth_key, Side::Server).map_err(DecryptError::Crypto)?;

        // inner: salt(8) + session_id(8) + msg_id(8) + seq_no(4) + len(4) + body
        if plaintext.len() < 32 {
            return Err(DecryptError::FrameTooShort);
        }

        let salt = i64::from_le_bytes(plaintext[..8].try_into().unwrap());
        let session_id = i64::from_le_bytes(plaintext[8..16].try_into().unwrap());
        let msg_id = i64::from_le_bytes(plaintext[16..24].try_into().unwrap());
        let seq_no = i32::from_le_bytes(plaintext[24..28].try_into().unwrap());
        let body_len = u32::from_le_bytes(plaintext[28..32].try_into().unwrap()) as usize;

        if session_id != self.session_id {
            return Err(DecryptError::SessionMismatch);
        }

        let body = plaintext[32..32 + body_len.min(plaintext.len() - 32)].to_vec();
        Ok(DecryptedMessage { salt, session_id, msg_id, seq_no, body })
    }

    /// Replace the server salt, e.g. from `bad_server_salt` or
    /// `new_session_created`.
    pub fn set_salt(&mut self, salt: i64) {
        if self.salt != salt {
            log::debug!("server salt updated");
            self.salt = salt;
        }
    }

    /// The auth_key bytes, for persistence.
    pub fn auth_key_bytes(&self) -> [u8; 256] {
        self.auth_key.to_bytes()
    }

    /// The auth key's 64-bit fingerprint.
    pub fn auth_key_fingerprint(&self) -> i64 {
        self.auth_key.fingerprint()
    }

    /// The current session_id.
    pub fn session_id(&self) -> i64 {
        self.session_id
    }

    /// Clock skew in seconds relative to the server.
    pub fn time_offset(&self) -> i32 {
        self.msg_ids.time_offset()
    }

    /// Re-derive the clock skew from a server-issued `msg_id`.  Called on
    /// `bad_msg_notification` codes that signal an unacceptable client
    /// msg_id.
    pub fn correct_time_offset(&mut self, server_msg_id: i64) -> i32 {
        use std::time::{SystemTime, UNIX_EPOCH};
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        let offset = ((server_msg_id >> 32) - now) as i32;
        self.msg_ids.set_time_offset(offset);
        offset
    }
}
