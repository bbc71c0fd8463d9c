//! Concrete TL constructors as `struct`s.
//!
//! Every struct serializes its own constructor tag first and re-reads it on
//! deserialization, so a shape round-trips through bytes on its own.  Optional
//! fields are driven by a `flags` bitmask written before them.

use crate::deserialize::{self, Buffer};
use crate::serialize::Serializable;
use crate::{Deserializable, Identifiable};

fn expect_id(buf: Buffer, id: u32) -> deserialize::Result<()> {
    let got = u32::deserialize(buf)?;
    if got == id {
        Ok(())
    } else {
        Err(deserialize::Error::UnexpectedConstructor { id: got })
    }
}

// ═══ MTProto service schema ══════════════════════════════════════════════════

/// `resPQ` — the server's opening handshake reply.
#[derive(Clone, Debug, PartialEq)]
pub struct ResPq {
    pub nonce: [u8; 16],
    pub server_nonce: [u8; 16],
    pub pq: Vec<u8>,
    pub server_public_key_fingerprints: Vec<i64>,
}

impl Identifiable for ResPq {
    const CONSTRUCTOR_ID: u32 = 0x05162463;
}

impl Serializable for ResPq {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.nonce.serialize(buf);
        self.server_nonce.serialize(buf);
        self.pq.serialize(buf);
        self.server_public_key_fingerprints.serialize(buf);
    }
}

impl Deserializable for ResPq {
    fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
        expect_id(buf, Self::CONSTRUCTOR_ID)?;
        Ok(Self {
            nonce: <[u8; 16]>::deserialize(buf)?,
            server_nonce: <[u8; 16]>::deserialize(buf)?,
            pq: Vec::<u8>::deserialize(buf)?,
            server_public_key_fingerprints: Vec::<i64>::deserialize(buf)?,
        })
    }
}

/// `p_q_inner_data` — the RSA-encrypted payload of `req_DH_params`.
#[derive(Clone, Debug, PartialEq)]
pub struct PqInnerData {
    pub pq: Vec<u8>,
    pub p: Vec<u8>,
    pub q: Vec<u8>,
    pub nonce: [u8; 16],
    pub server_nonce: [u8; 16],
    pub new_nonce: [u8; 32],
}

impl Identifiable for PqInnerData {
    const CONSTRUCTOR_ID: u32 = 0x83c95aec;
}

impl Serializable for PqInnerData {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.pq.serialize(buf);
        self.p.serialize(buf);
        self.q.serialize(buf);
        self.nonce.serialize(buf);
        self.server_nonce.serialize(buf);
        self.new_nonce.serialize(buf);
    }
}

impl Deserializable for PqInnerData {
    fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
        expect_id(buf, Self::CONSTRUCTOR_ID)?;
        Ok(Self {
            pq: Vec::<u8>::deserialize(buf)?,
            p: Vec::<u8>::deserialize(buf)?,
            q: Vec::<u8>::deserialize(buf)?,
            nonce: <[u8; 16]>::deserialize(buf)?,
            server_nonce: <[u8; 16]>::deserialize(buf)?,
            new_nonce: <[u8; 32]>::deserialize(buf)?,
        })
    }
}

/// `server_DH_params_ok`.
#[derive(Clone, Debug, PartialEq)]
pub struct ServerDhParamsOk {
    pub nonce: [u8; 16],
    pub server_nonce: [u8; 16],
    pub encrypted_answer: Vec<u8>,
}

impl Identifiable for ServerDhParamsOk {
    const CONSTRUCTOR_ID: u32 = 0xd0e8075c;
}

impl Serializable for ServerDhParamsOk {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.nonce.serialize(buf);
        self.server_nonce.serialize(buf);
        self.encrypted_answer.serialize(buf);
    }
}

impl Deserializable for ServerDhParamsOk {
    fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
        expect_id(buf, Self::CONSTRUCTOR_ID)?;
        Ok(Self {
            nonce: <[u8; 16]>::deserialize(buf)?,
            server_nonce: <[u8; 16]>::deserialize(buf)?,
            encrypted_answer: Vec::<u8>::deserialize(buf)?,
        })
    }
}

/// `server_DH_params_fail`.
#[derive(Clone, Debug, PartialEq)]
pub struct ServerDhParamsFail {
    pub nonce: [u8; 16],
    pub server_nonce: [u8; 16],
    pub new_nonce_hash: [u8; 16],
}

impl Identifiable for ServerDhParamsFail {
    const CONSTRUCTOR_ID: u32 = 0x79cb045d;
}

impl Serializable for ServerDhParamsFail {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.nonce.serialize(buf);
        self.server_nonce.serialize(buf);
        self.new_nonce_hash.serialize(buf);
    }
}

impl Deserializable for ServerDhParamsFail {
    fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
        expect_id(buf, Self::CONSTRUCTOR_ID)?;
        Ok(Self {
            nonce: <[u8; 16]>::deserialize(buf)?,
            server_nonce: <[u8; 16]>::deserialize(buf)?,
            new_nonce_hash: <[u8; 16]>::deserialize(buf)?,
        })
    }
}

/// `server_DH_inner_data` — the decrypted Diffie–Hellman parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct ServerDhInnerData {
    pub nonce: [u8; 16],
    pub server_nonce: [u8; 16],
    pub g: i32,
    pub dh_prime: Vec<u8>,
    pub g_a: Vec<u8>,
    pub server_time: i32,
}

impl Identifiable for ServerDhInnerData {
    const CONSTRUCTOR_ID: u32 = 0xb5890dba;
}

impl Serializable for ServerDhInnerData {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.nonce.serialize(buf);
        self.server_nonce.serialize(buf);
        self.g.serialize(buf);
        self.dh_prime.serialize(buf);
        self.g_a.serialize(buf);
        self.server_time.serialize(buf);
    }
}

impl Deserializable for ServerDhInnerData {
    fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
        expect_id(buf, Self::CONSTRUCTOR_ID)?;
        Ok(Self {
            nonce: <[u8; 16]>::deserialize(buf)?,
            server_nonce: <[u8; 16]>::deserialize(buf)?,
            g: i32::deserialize(buf)?,
            dh_prime: Vec::<u8>::deserialize(buf)?,
            g_a: Vec::<u8>::deserialize(buf)?,
            server_time: i32::deserialize(buf)?,
        })
    }
}

/// `client_DH_inner_data` — encrypted and sent back in `set_client_DH_params`.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientDhInnerData {
    pub nonce: [u8; 16],
    pub server_nonce: [u8; 16],
    pub retry_id: i64,
    pub g_b: Vec<u8>,
}

impl Identifiable for ClientDhInnerData {
    const CONSTRUCTOR_ID: u32 = 0x6643b654;
}

impl Serializable for ClientDhInnerData {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.nonce.serialize(buf);
        self.server_nonce.serialize(buf);
        self.retry_id.serialize(buf);
        self.g_b.serialize(buf);
    }
}

impl Deserializable for ClientDhInnerData {
    fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
        expect_id(buf, Self::CONSTRUCTOR_ID)?;
        Ok(Self {
            nonce: <[u8; 16]>::deserialize(buf)?,
            server_nonce: <[u8; 16]>::deserialize(buf)?,
            retry_id: i64::deserialize(buf)?,
            g_b: Vec::<u8>::deserialize(buf)?,
        })
    }
}

/// `dh_gen_ok`.
#[derive(Clone, Debug, PartialEq)]
pub struct DhGenOk {
    pub nonce: [u8; 16],
    pub server_nonce: [u8; 16],
    pub new_nonce_hash1: [u8; 16],
}

impl Identifiable for DhGenOk {
    const CONSTRUCTOR_ID: u32 = 0x3bcbf734;
}

impl Serializable for DhGenOk {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.nonce.serialize(buf);
        self.server_nonce.serialize(buf);
        self.new_nonce_hash1.serialize(buf);
    }
}

impl Deserializable for DhGenOk {
    fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
        expect_id(buf, Self::CONSTRUCTOR_ID)?;
        Ok(Self {
            nonce: <[u8; 16]>::deserialize(buf)?,
            server_nonce: <[u8; 16]>::deserialize(buf)?,
            new_nonce_hash1: <[u8; 16]>::deserialize(buf)?,
        })
    }
}

/// `dh_gen_retry`.
#[derive(Clone, Debug, PartialEq)]
pub struct DhGenRetry {
    pub nonce: [u8; 16],
    pub server_nonce: [u8; 16],
    pub new_nonce_hash2: [u8; 16],
}

impl Identifiable for DhGenRetry {
    const CONSTRUCTOR_ID: u32 = 0x46dc1fb9;
}

impl Serializable for DhGenRetry {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.nonce.serialize(buf);
        self.server_nonce.serialize(buf);
        self.new_nonce_hash2.serialize(buf);
    }
}

impl Deserializable for DhGenRetry {
    fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
        expect_id(buf, Self::CONSTRUCTOR_ID)?;
        Ok(Self {
            nonce: <[u8; 16]>::deserialize(buf)?,
            server_nonce: <[u8; 16]>::deserialize(buf)?,
            new_nonce_hash2: <[u8; 16]>::deserialize(buf)?,
        })
    }
}

/// `dh_gen_fail`.
#[derive(Clone, Debug, PartialEq)]
pub struct DhGenFail {
    pub nonce: [u8; 16],
    pub server_nonce: [u8; 16],
    pub new_nonce_hash3: [u8; 16],
}

impl Identifiable for DhGenFail {
    const CONSTRUCTOR_ID: u32 = 0xa69dae02;
}

impl Serializable for DhGenFail {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.nonce.serialize(buf);
        self.server_nonce.serialize(buf);
        self.new_nonce_hash3.serialize(buf);
    }
}

impl Deserializable for DhGenFail {
    fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
        expect_id(buf, Self::CONSTRUCTOR_ID)?;
        Ok(Self {
            nonce: <[u8; 16]>::deserialize(buf)?,
            server_nonce: <[u8; 16]>::deserialize(buf)?,
            new_nonce_hash3: <[u8; 16]>::deserialize(buf)?,
        })
    }
}

/// `rpc_error` — a server-rejected call.
#[derive(Clone, Debug, PartialEq)]
pub struct RpcError {
    pub error_code: i32,
    pub error_message: String,
}

impl Identifiable for RpcError {
    const CONSTRUCTOR_ID: u32 = 0x2144ca19;
}

impl Serializable for RpcError {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.error_code.serialize(buf);
        self.error_message.serialize(buf);
    }
}

impl Deserializable for RpcError {
    fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
        expect_id(buf, Self::CONSTRUCTOR_ID)?;
        Ok(Self {
            error_code: i32::deserialize(buf)?,
            error_message: String::deserialize(buf)?,
        })
    }
}

/// `bad_msg_notification` — the server rejected a message (clock skew, bad
/// seq_no, ...); the session resends with corrected parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct BadMsgNotification {
    pub bad_msg_id: i64,
    pub bad_msg_seqno: i32,
    pub error_code: i32,
}

impl Identifiable for BadMsgNotification {
    const CONSTRUCTOR_ID: u32 = 0xa7eff811;
}

impl Serializable for BadMsgNotification {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.bad_msg_id.serialize(buf);
        self.bad_msg_seqno.serialize(buf);
        self.error_code.serialize(buf);
    }
}

impl Deserializable for BadMsgNotification {
    fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
        expect_id(buf, Self::CONSTRUCTOR_ID)?;
        Ok(Self {
            bad_msg_id: i64::deserialize(buf)?,
            bad_msg_seqno: i32::deserialize(buf)?,
            error_code: i32::deserialize(buf)?,
        })
    }
}

/// `bad_server_salt` — like `bad_msg_notification` but carrying the salt to
/// resend with.
#[derive(Clone, Debug, PartialEq)]
pub struct BadServerSalt {
    pub bad_msg_id: i64,
    pub bad_msg_seqno: i32,
    pub error_code: i32,
    pub new_server_salt: i64,
}

impl Identifiable for BadServerSalt {
    const CONSTRUCTOR_ID: u32 = 0xedab447b;
}

impl Serializable for BadServerSalt {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.bad_msg_id.serialize(buf);
        self.bad_msg_seqno.serialize(buf);
        self.error_code.serialize(buf);
        self.new_server_salt.serialize(buf);
    }
}

impl Deserializable for BadServerSalt {
    fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
        expect_id(buf, Self::CONSTRUCTOR_ID)?;
        Ok(Self {
            bad_msg_id: i64::deserialize(buf)?,
            bad_msg_seqno: i32::deserialize(buf)?,
            error_code: i32::deserialize(buf)?,
            new_server_salt: i64::deserialize(buf)?,
        })
    }
}

/// `pong`.
#[derive(Clone, Debug, PartialEq)]
pub struct Pong {
    pub msg_id: i64,
    pub ping_id: i64,
}

impl Identifiable for Pong {
    const CONSTRUCTOR_ID: u32 = 0x347773c5;
}

impl Serializable for Pong {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.msg_id.serialize(buf);
        self.ping_id.serialize(buf);
    }
}

impl Deserializable for Pong {
    fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
        expect_id(buf, Self::CONSTRUCTOR_ID)?;
        Ok(Self {
            msg_id: i64::deserialize(buf)?,
            ping_id: i64::deserialize(buf)?,
        })
    }
}

/// `new_session_created` — the server opened a fresh session; carries the
/// salt to use and implies updates may have been missed.
#[derive(Clone, Debug, PartialEq)]
pub struct NewSessionCreated {
    pub first_msg_id: i64,
    pub unique_id: i64,
    pub server_salt: i64,
}

impl Identifiable for NewSessionCreated {
    const CONSTRUCTOR_ID: u32 = 0x9ec20908;
}

impl Serializable for NewSessionCreated {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.first_msg_id.serialize(buf);
        self.unique_id.serialize(buf);
        self.server_salt.serialize(buf);
    }
}

impl Deserializable for NewSessionCreated {
    fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
        expect_id(buf, Self::CONSTRUCTOR_ID)?;
        Ok(Self {
            first_msg_id: i64::deserialize(buf)?,
            unique_id: i64::deserialize(buf)?,
            server_salt: i64::deserialize(buf)?,
        })
    }
}

/// `msgs_ack` — acknowledges received content-related messages.
#[derive(Clone, Debug, PartialEq)]
pub struct MsgsAck {
    pub msg_ids: Vec<i64>,
}

impl Identifiable for MsgsAck {
    const CONSTRUCTOR_ID: u32 = 0x62d6b459;
}

impl Serializable for MsgsAck {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.msg_ids.serialize(buf);
    }
}

impl Deserializable for MsgsAck {
    fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
        expect_id(buf, Self::CONSTRUCTOR_ID)?;
        Ok(Self { msg_ids: Vec::<i64>::deserialize(buf)? })
    }
}

// ═══ API subset — peers and entities ═════════════════════════════════════════

/// `peerUser`.
#[derive(Clone, Debug, PartialEq)]
pub struct PeerUser {
    pub user_id: i64,
}

impl Identifiable for PeerUser {
    const CONSTRUCTOR_ID: u32 = 0x9db1bc6d;
}

impl Serializable for PeerUser {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.user_id.serialize(buf);
    }
}

impl Deserializable for PeerUser {
    fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
        expect_id(buf, Self::CONSTRUCTOR_ID)?;
        Ok(Self { user_id: i64::deserialize(buf)? })
    }
}

/// `peerChat`.
#[derive(Clone, Debug, PartialEq)]
pub struct PeerChat {
    pub chat_id: i64,
}

impl Identifiable for PeerChat {
    const CONSTRUCTOR_ID: u32 = 0xbad0e5bb;
}

impl Serializable for PeerChat {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.chat_id.serialize(buf);
    }
}

impl Deserializable for PeerChat {
    fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
        expect_id(buf, Self::CONSTRUCTOR_ID)?;
        Ok(Self { chat_id: i64::deserialize(buf)? })
    }
}

/// `peerChannel`.
#[derive(Clone, Debug, PartialEq)]
pub struct PeerChannel {
    pub channel_id: i64,
}

impl Identifiable for PeerChannel {
    const CONSTRUCTOR_ID: u32 = 0xbddde532;
}

impl Serializable for PeerChannel {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.channel_id.serialize(buf);
    }
}

impl Deserializable for PeerChannel {
    fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
        expect_id(buf, Self::CONSTRUCTOR_ID)?;
        Ok(Self { channel_id: i64::deserialize(buf)? })
    }
}

/// `user` — optional fields driven by the leading flags word.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct User {
    pub bot: bool,
    pub id: i64,
    pub access_hash: Option<i64>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

impl Identifiable for User {
    const CONSTRUCTOR_ID: u32 = 0x215c4438;
}

impl Serializable for User {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        let mut flags = 0u32;
        if self.access_hash.is_some() { flags |= 1 << 0; }
        if self.first_name.is_some()  { flags |= 1 << 1; }
        if self.last_name.is_some()   { flags |= 1 << 2; }
        if self.username.is_some()    { flags |= 1 << 3; }
        if self.bot                   { flags |= 1 << 4; }
        flags.serialize(buf);
        self.id.serialize(buf);
        self.access_hash.serialize(buf);
        self.first_name.serialize(buf);
        self.last_name.serialize(buf);
        self.username.serialize(buf);
    }
}

impl Deserializable for User {
    fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
        expect_id(buf, Self::CONSTRUCTOR_ID)?;
        let flags = u32::deserialize(buf)?;
        Ok(Self {
            bot: flags & (1 << 4) != 0,
            id: i64::deserialize(buf)?,
            access_hash: if flags & (1 << 0) != 0 { Some(i64::deserialize(buf)?) } else { None },
            first_name: if flags & (1 << 1) != 0 { Some(String::deserialize(buf)?) } else { None },
            last_name: if flags & (1 << 2) != 0 { Some(String::deserialize(buf)?) } else { None },
            username: if flags & (1 << 3) != 0 { Some(String::deserialize(buf)?) } else { None },
        })
    }
}

/// `userEmpty`.
#[derive(Clone, Debug, PartialEq)]
pub struct UserEmpty {
    pub id: i64,
}

impl Identifiable for UserEmpty {
    const CONSTRUCTOR_ID: u32 = 0xd3bc4b7a;
}

impl Serializable for UserEmpty {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.id.serialize(buf);
    }
}

impl Deserializable for UserEmpty {
    fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
        expect_id(buf, Self::CONSTRUCTOR_ID)?;
        Ok(Self { id: i64::deserialize(buf)? })
    }
}

/// `chat` — a basic group.
#[derive(Clone, Debug, PartialEq)]
pub struct Chat {
    pub id: i64,
    pub title: String,
}

impl Identifiable for Chat {
    const CONSTRUCTOR_ID: u32 = 0x41cbf256;
}

impl Serializable for Chat {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.id.serialize(buf);
        self.title.serialize(buf);
    }
}

impl Deserializable for Chat {
    fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
        expect_id(buf, Self::CONSTRUCTOR_ID)?;
        Ok(Self {
            id: i64::deserialize(buf)?,
            title: String::deserialize(buf)?,
        })
    }
}

/// `channel`.
#[derive(Clone, Debug, PartialEq)]
pub struct Channel {
    pub broadcast: bool,
    pub id: i64,
    pub access_hash: Option<i64>,
    pub title: String,
}

impl Identifiable for Channel {
    const CONSTRUCTOR_ID: u32 = 0x29562865;
}

impl Serializable for Channel {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        let mut flags = 0u32;
        if self.access_hash.is_some() { flags |= 1 << 0; }
        if self.broadcast             { flags |= 1 << 1; }
        flags.serialize(buf);
        self.id.serialize(buf);
        self.access_hash.serialize(buf);
        self.title.serialize(buf);
    }
}

impl Deserializable for Channel {
    fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
        expect_id(buf, Self::CONSTRUCTOR_ID)?;
        let flags = u32::deserialize(buf)?;
        Ok(Self {
            broadcast: flags & (1 << 1) != 0,
            id: i64::deserialize(buf)?,
            access_hash: if flags & (1 << 0) != 0 { Some(i64::deserialize(buf)?) } else { None },
            title: String::deserialize(buf)?,
        })
    }
}

/// `message`.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub out: bool,
    pub id: i32,
    pub from_id: Option<crate::enums::Peer>,
    pub peer_id: crate::enums::Peer,
    pub reply_to_msg_id: Option<i32>,
    pub date: i32,
    pub message: String,
}

impl Identifiable for Message {
    const CONSTRUCTOR_ID: u32 = 0x94a35242;
}

impl Serializable for Message {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        let mut flags = 0u32;
        if self.out                       { flags |= 1 << 1; }
        if self.reply_to_msg_id.is_some() { flags |= 1 << 3; }
        if self.from_id.is_some()         { flags |= 1 << 8; }
        flags.serialize(buf);
        self.id.serialize(buf);
        self.from_id.serialize(buf);
        self.peer_id.serialize(buf);
        self.reply_to_msg_id.serialize(buf);
        self.date.serialize(buf);
        self.message.serialize(buf);
    }
}

impl Deserializable for Message {
    fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
        expect_id(buf, Self::CONSTRUCTOR_ID)?;
        let flags = u32::deserialize(buf)?;
        Ok(Self {
            out: flags & (1 << 1) != 0,
            id: i32::deserialize(buf)?,
            from_id: if flags & (1 << 8) != 0 {
                Some(crate::enums::Peer::deserialize(buf)?)
            } else {
                None
            },
            peer_id: crate::enums::Peer::deserialize(buf)?,
            reply_to_msg_id: if flags & (1 << 3) != 0 { Some(i32::deserialize(buf)?) } else { None },
            date: i32::deserialize(buf)?,
            message: String::deserialize(buf)?,
        })
    }
}

/// `messageEmpty` — a hole in the history.
#[derive(Clone, Debug, PartialEq)]
pub struct MessageEmpty {
    pub id: i32,
}

impl Identifiable for MessageEmpty {
    const CONSTRUCTOR_ID: u32 = 0x83e5de54;
}

impl Serializable for MessageEmpty {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.id.serialize(buf);
    }
}

impl Deserializable for MessageEmpty {
    fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
        expect_id(buf, Self::CONSTRUCTOR_ID)?;
        Ok(Self { id: i32::deserialize(buf)? })
    }
}

// ═══ API subset — updates ════════════════════════════════════════════════════

/// `updateNewMessage`.
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateNewMessage {
    pub message: crate::enums::Message,
    pub pts: i32,
    pub pts_count: i32,
}

impl Identifiable for UpdateNewMessage {
    const CONSTRUCTOR_ID: u32 = 0x1f2b0afd;
}

impl Serializable for UpdateNewMessage {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.message.serialize(buf);
        self.pts.serialize(buf);
        self.pts_count.serialize(buf);
    }
}

impl Deserializable for UpdateNewMessage {
    fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
        expect_id(buf, Self::CONSTRUCTOR_ID)?;
        Ok(Self {
            message: crate::enums::Message::deserialize(buf)?,
            pts: i32::deserialize(buf)?,
            pts_count: i32::deserialize(buf)?,
        })
    }
}

/// `updateDeleteMessages`.
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateDeleteMessages {
    pub messages: Vec<i32>,
    pub pts: i32,
    pub pts_count: i32,
}

impl Identifiable for UpdateDeleteMessages {
    const CONSTRUCTOR_ID: u32 = 0xa20db0e5;
}

impl Serializable for UpdateDeleteMessages {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.messages.serialize(buf);
        self.pts.serialize(buf);
        self.pts_count.serialize(buf);
    }
}

impl Deserializable for UpdateDeleteMessages {
    fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
        expect_id(buf, Self::CONSTRUCTOR_ID)?;
        Ok(Self {
            messages: Vec::<i32>::deserialize(buf)?,
            pts: i32::deserialize(buf)?,
            pts_count: i32::deserialize(buf)?,
        })
    }
}

/// `updateReadHistoryInbox`.
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateReadHistoryInbox {
    pub peer: crate::enums::Peer,
    pub max_id: i32,
    pub pts: i32,
    pub pts_count: i32,
}

impl Identifiable for UpdateReadHistoryInbox {
    const CONSTRUCTOR_ID: u32 = 0x9961fd5c;
}

impl Serializable for UpdateReadHistoryInbox {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.peer.serialize(buf);
        self.max_id.serialize(buf);
        self.pts.serialize(buf);
        self.pts_count.serialize(buf);
    }
}

impl Deserializable for UpdateReadHistoryInbox {
    fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
        expect_id(buf, Self::CONSTRUCTOR_ID)?;
        Ok(Self {
            peer: crate::enums::Peer::deserialize(buf)?,
            max_id: i32::deserialize(buf)?,
            pts: i32::deserialize(buf)?,
            pts_count: i32::deserialize(buf)?,
        })
    }
}

/// `updateUserStatus` — carries no pts; applied directly.
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateUserStatus {
    pub user_id: i64,
    pub online: bool,
}

impl Identifiable for UpdateUserStatus {
    const CONSTRUCTOR_ID: u32 = 0x1bfbd823;
}

impl Serializable for UpdateUserStatus {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.user_id.serialize(buf);
        self.online.serialize(buf);
    }
}

impl Deserializable for UpdateUserStatus {
    fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
        expect_id(buf, Self::CONSTRUCTOR_ID)?;
        Ok(Self {
            user_id: i64::deserialize(buf)?,
            online: bool::deserialize(buf)?,
        })
    }
}

// ═══ API subset — update containers ══════════════════════════════════════════

/// `updatesTooLong` — too many updates pending; the client must fetch the
/// difference.
#[derive(Clone, Debug, PartialEq)]
pub struct UpdatesTooLong;

impl Identifiable for UpdatesTooLong {
    const CONSTRUCTOR_ID: u32 = 0xe317af7e;
}

impl Serializable for UpdatesTooLong {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
    }
}

impl Deserializable for UpdatesTooLong {
    fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
        expect_id(buf, Self::CONSTRUCTOR_ID)?;
        Ok(Self)
    }
}

/// `updateShortMessage` — compact envelope for a single direct message.
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateShortMessage {
    pub out: bool,
    pub id: i32,
    pub user_id: i64,
    pub message: String,
    pub pts: i32,
    pub pts_count: i32,
    pub date: i32,
}

impl Identifiable for UpdateShortMessage {
    const CONSTRUCTOR_ID: u32 = 0x313bc7f8;
}

impl Serializable for UpdateShortMessage {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        let flags = if self.out { 1u32 << 1 } else { 0 };
        flags.serialize(buf);
        self.id.serialize(buf);
        self.user_id.serialize(buf);
        self.message.serialize(buf);
        self.pts.serialize(buf);
        self.pts_count.serialize(buf);
        self.date.serialize(buf);
    }
}

impl Deserializable for UpdateShortMessage {
    fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
        expect_id(buf, Self::CONSTRUCTOR_ID)?;
        let flags = u32::deserialize(buf)?;
        Ok(Self {
            out: flags & (1 << 1) != 0,
            id: i32::deserialize(buf)?,
            user_id: i64::deserialize(buf)?,
            message: String::deserialize(buf)?,
            pts: i32::deserialize(buf)?,
            pts_count: i32::deserialize(buf)?,
            date: i32::deserialize(buf)?,
        })
    }
}

/// `updateShortChatMessage` — compact envelope for a single group message.
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateShortChatMessage {
    pub out: bool,
    pub id: i32,
    pub from_id: i64,
    pub chat_id: i64,
    pub message: String,
    pub pts: i32,
    pub pts_count: i32,
    pub date: i32,
}

impl Identifiable for UpdateShortChatMessage {
    const CONSTRUCTOR_ID: u32 = 0x4d6deea5;
}

impl Serializable for UpdateShortChatMessage {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        let flags = if self.out { 1u32 << 1 } else { 0 };
        flags.serialize(buf);
        self.id.serialize(buf);
        self.from_id.serialize(buf);
        self.chat_id.serialize(buf);
        self.message.serialize(buf);
        self.pts.serialize(buf);
        self.pts_count.serialize(buf);
        self.date.serialize(buf);
    }
}

impl Deserializable for UpdateShortChatMessage {
    fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
        expect_id(buf, Self::CONSTRUCTOR_ID)?;
        let flags = u32::deserialize(buf)?;
        Ok(Self {
            out: flags & (1 << 1) != 0,
            id: i32::deserialize(buf)?,
            from_id: i64::deserialize(buf)?,
            chat_id: i64::deserialize(buf)?,
            message: String::deserialize(buf)?,
            pts: i32::deserialize(buf)?,
            pts_count: i32::deserialize(buf)?,
            date: i32::deserialize(buf)?,
        })
    }
}

/// `updateShort` — a single update without a sequence delta of its own.
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateShort {
    pub update: crate::enums::Update,
    pub date: i32,
}

impl Identifiable for UpdateShort {
    const CONSTRUCTOR_ID: u32 = 0x78d4dec1;
}

impl Serializable for UpdateShort {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.update.serialize(buf);
        self.date.serialize(buf);
    }
}

impl Deserializable for UpdateShort {
    fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
        expect_id(buf, Self::CONSTRUCTOR_ID)?;
        Ok(Self {
            update: crate::enums::Update::deserialize(buf)?,
            date: i32::deserialize(buf)?,
        })
    }
}

/// `updatesCombined` — a batch with an explicit `seq_start..seq` range.
#[derive(Clone, Debug, PartialEq)]
pub struct UpdatesCombined {
    pub updates: Vec<crate::enums::Update>,
    pub users: Vec<crate::enums::User>,
    pub chats: Vec<crate::enums::Chat>,
    pub date: i32,
    pub seq_start: i32,
    pub seq: i32,
}

impl Identifiable for UpdatesCombined {
    const CONSTRUCTOR_ID: u32 = 0x725b04c3;
}

impl Serializable for UpdatesCombined {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.updates.serialize(buf);
        self.users.serialize(buf);
        self.chats.serialize(buf);
        self.date.serialize(buf);
        self.seq_start.serialize(buf);
        self.seq.serialize(buf);
    }
}

impl Deserializable for UpdatesCombined {
    fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
        expect_id(buf, Self::CONSTRUCTOR_ID)?;
        Ok(Self {
            updates: Vec::<crate::enums::Update>::deserialize(buf)?,
            users: Vec::<crate::enums::User>::deserialize(buf)?,
            chats: Vec::<crate::enums::Chat>::deserialize(buf)?,
            date: i32::deserialize(buf)?,
            seq_start: i32::deserialize(buf)?,
            seq: i32::deserialize(buf)?,
        })
    }
}

/// `updates` — a batch whose `seq_start` is implicitly `seq`.
#[derive(Clone, Debug, PartialEq)]
pub struct Updates {
    pub updates: Vec<crate::enums::Update>,
    pub users: Vec<crate::enums::User>,
    pub chats: Vec<crate::enums::Chat>,
    pub date: i32,
    pub seq: i32,
}

impl Identifiable for Updates {
    const CONSTRUCTOR_ID: u32 = 0x74ae4240;
}

impl Serializable for Updates {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.updates.serialize(buf);
        self.users.serialize(buf);
        self.chats.serialize(buf);
        self.date.serialize(buf);
        self.seq.serialize(buf);
    }
}

impl Deserializable for Updates {
    fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
        expect_id(buf, Self::CONSTRUCTOR_ID)?;
        Ok(Self {
            updates: Vec::<crate::enums::Update>::deserialize(buf)?,
            users: Vec::<crate::enums::User>::deserialize(buf)?,
            chats: Vec::<crate::enums::Chat>::deserialize(buf)?,
            date: i32::deserialize(buf)?,
            seq: i32::deserialize(buf)?,
        })
    }
}

// ═══ API subset — configuration ══════════════════════════════════════════════

/// `dcOption` — one data-center endpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct DcOption {
    pub ipv6: bool,
    pub media_only: bool,
    pub id: i32,
    pub ip_address: String,
    pub port: i32,
}

impl Identifiable for DcOption {
    const CONSTRUCTOR_ID: u32 = 0x18b7a10d;
}

impl Serializable for DcOption {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        let mut flags = 0u32;
        if self.ipv6       { flags |= 1 << 0; }
        if self.media_only { flags |= 1 << 1; }
        flags.serialize(buf);
        self.id.serialize(buf);
        self.ip_address.serialize(buf);
        self.port.serialize(buf);
    }
}

impl Deserializable for DcOption {
    fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
        expect_id(buf, Self::CONSTRUCTOR_ID)?;
        let flags = u32::deserialize(buf)?;
        Ok(Self {
            ipv6: flags & (1 << 0) != 0,
            media_only: flags & (1 << 1) != 0,
            id: i32::deserialize(buf)?,
            ip_address: String::deserialize(buf)?,
            port: i32::deserialize(buf)?,
        })
    }
}

/// `config` — the server configuration slice this engine consumes.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub date: i32,
    pub expires: i32,
    pub this_dc: i32,
    pub dc_options: Vec<DcOption>,
    pub offline_blur_timeout_ms: i32,
    pub online_update_period_ms: i32,
}

impl Identifiable for Config {
    const CONSTRUCTOR_ID: u32 = 0xcc1a241e;
}

impl Serializable for Config {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.date.serialize(buf);
        self.expires.serialize(buf);
        self.this_dc.serialize(buf);
        self.dc_options.serialize(buf);
        self.offline_blur_timeout_ms.serialize(buf);
        self.online_update_period_ms.serialize(buf);
    }
}

impl Deserializable for Config {
    fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
        expect_id(buf, Self::CONSTRUCTOR_ID)?;
        Ok(Self {
            date: i32::deserialize(buf)?,
            expires: i32::deserialize(buf)?,
            this_dc: i32::deserialize(buf)?,
            dc_options: Vec::<DcOption>::deserialize(buf)?,
            offline_blur_timeout_ms: i32::deserialize(buf)?,
            online_update_period_ms: i32::deserialize(buf)?,
        })
    }
}

// ═══ Namespaced types ════════════════════════════════════════════════════════

pub mod updates {
    //! Types in the `updates.` namespace.

    use super::expect_id;
    use crate::deserialize::{self, Buffer};
    use crate::serialize::Serializable;
    use crate::{Deserializable, Identifiable};

    /// `updates.state` — the authoritative state vector.
    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    pub struct State {
        pub pts: i32,
        pub qts: i32,
        pub date: i32,
        pub seq: i32,
        pub unread_count: i32,
    }

    impl Identifiable for State {
        const CONSTRUCTOR_ID: u32 = 0xa56c2a3e;
    }

    impl Serializable for State {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            Self::CONSTRUCTOR_ID.serialize(buf);
            self.pts.serialize(buf);
            self.qts.serialize(buf);
            self.date.serialize(buf);
            self.seq.serialize(buf);
            self.unread_count.serialize(buf);
        }
    }

    impl Deserializable for State {
        fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
            expect_id(buf, Self::CONSTRUCTOR_ID)?;
            Ok(Self {
                pts: i32::deserialize(buf)?,
                qts: i32::deserialize(buf)?,
                date: i32::deserialize(buf)?,
                seq: i32::deserialize(buf)?,
                unread_count: i32::deserialize(buf)?,
            })
        }
    }

    /// `updates.differenceEmpty` — nothing was missed.
    #[derive(Clone, Debug, PartialEq)]
    pub struct DifferenceEmpty {
        pub date: i32,
        pub seq: i32,
    }

    impl Identifiable for DifferenceEmpty {
        const CONSTRUCTOR_ID: u32 = 0x5d75a138;
    }

    impl Serializable for DifferenceEmpty {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            Self::CONSTRUCTOR_ID.serialize(buf);
            self.date.serialize(buf);
            self.seq.serialize(buf);
        }
    }

    impl Deserializable for DifferenceEmpty {
        fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
            expect_id(buf, Self::CONSTRUCTOR_ID)?;
            Ok(Self {
                date: i32::deserialize(buf)?,
                seq: i32::deserialize(buf)?,
            })
        }
    }

    /// `updates.difference` — the complete catch-up payload.
    #[derive(Clone, Debug, PartialEq)]
    pub struct Difference {
        pub new_messages: Vec<crate::enums::Message>,
        pub other_updates: Vec<crate::enums::Update>,
        pub chats: Vec<crate::enums::Chat>,
        pub users: Vec<crate::enums::User>,
        pub state: State,
    }

    impl Identifiable for Difference {
        const CONSTRUCTOR_ID: u32 = 0x00f49ca0;
    }

    impl Serializable for Difference {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            Self::CONSTRUCTOR_ID.serialize(buf);
            self.new_messages.serialize(buf);
            self.other_updates.serialize(buf);
            self.chats.serialize(buf);
            self.users.serialize(buf);
            self.state.serialize(buf);
        }
    }

    impl Deserializable for Difference {
        fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
            expect_id(buf, Self::CONSTRUCTOR_ID)?;
            Ok(Self {
                new_messages: Vec::<crate::enums::Message>::deserialize(buf)?,
                other_updates: Vec::<crate::enums::Update>::deserialize(buf)?,
                chats: Vec::<crate::enums::Chat>::deserialize(buf)?,
                users: Vec::<crate::enums::User>::deserialize(buf)?,
                state: State::deserialize(buf)?,
            })
        }
    }

    /// `updates.differenceSlice` — a partial catch-up; fetch again from
    /// `intermediate_state`.
    #[derive(Clone, Debug, PartialEq)]
    pub struct DifferenceSlice {
        pub new_messages: Vec<crate::enums::Message>,
        pub other_updates: Vec<crate::enums::Update>,
        pub chats: Vec<crate::enums::Chat>,
        pub users: Vec<crate::enums::User>,
        pub intermediate_state: State,
    }

    impl Identifiable for DifferenceSlice {
        const CONSTRUCTOR_ID: u32 = 0xa8fb1981;
    }

    impl Serializable for DifferenceSlice {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            Self::CONSTRUCTOR_ID.serialize(buf);
            self.new_messages.serialize(buf);
            self.other_updates.serialize(buf);
            self.chats.serialize(buf);
            self.users.serialize(buf);
            self.intermediate_state.serialize(buf);
        }
    }

    impl Deserializable for DifferenceSlice {
        fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
            expect_id(buf, Self::CONSTRUCTOR_ID)?;
            Ok(Self {
                new_messages: Vec::<crate::enums::Message>::deserialize(buf)?,
                other_updates: Vec::<crate::enums::Update>::deserialize(buf)?,
                chats: Vec::<crate::enums::Chat>::deserialize(buf)?,
                users: Vec::<crate::enums::User>::deserialize(buf)?,
                intermediate_state: State::deserialize(buf)?,
            })
        }
    }

    /// `updates.differenceTooLong` — jump to `pts` and start over.
    #[derive(Clone, Debug, PartialEq)]
    pub struct DifferenceTooLong {
        pub pts: i32,
    }

    impl Identifiable for DifferenceTooLong {
        const CONSTRUCTOR_ID: u32 = 0x4afe8f6d;
    }

    impl Serializable for DifferenceTooLong {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            Self::CONSTRUCTOR_ID.serialize(buf);
            self.pts.serialize(buf);
        }
    }

    impl Deserializable for DifferenceTooLong {
        fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
            expect_id(buf, Self::CONSTRUCTOR_ID)?;
            Ok(Self { pts: i32::deserialize(buf)? })
        }
    }
}

pub mod auth {
    //! Types in the `auth.` namespace.

    use super::expect_id;
    use crate::deserialize::{self, Buffer};
    use crate::serialize::Serializable;
    use crate::{Deserializable, Identifiable};

    /// `auth.exportedAuthorization` — a transferable proof of authorization,
    /// consumed by `auth.importAuthorization` on another data center.
    #[derive(Clone, Debug, PartialEq)]
    pub struct ExportedAuthorization {
        pub id: i64,
        pub bytes: Vec<u8>,
    }

    impl Identifiable for ExportedAuthorization {
        const CONSTRUCTOR_ID: u32 = 0xb434e2b8;
    }

    impl Serializable for ExportedAuthorization {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            Self::CONSTRUCTOR_ID.serialize(buf);
            self.id.serialize(buf);
            self.bytes.serialize(buf);
        }
    }

    impl Deserializable for ExportedAuthorization {
        fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
            expect_id(buf, Self::CONSTRUCTOR_ID)?;
            Ok(Self {
                id: i64::deserialize(buf)?,
                bytes: Vec::<u8>::deserialize(buf)?,
            })
        }
    }

    /// `auth.authorization`.
    #[derive(Clone, Debug, PartialEq)]
    pub struct Authorization {
        pub user: crate::enums::User,
    }

    impl Identifiable for Authorization {
        const CONSTRUCTOR_ID: u32 = 0x2ea2c0d4;
    }

    impl Serializable for Authorization {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            Self::CONSTRUCTOR_ID.serialize(buf);
            self.user.serialize(buf);
        }
    }

    impl Deserializable for Authorization {
        fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
            expect_id(buf, Self::CONSTRUCTOR_ID)?;
            Ok(Self { user: crate::enums::User::deserialize(buf)? })
        }
    }
}
