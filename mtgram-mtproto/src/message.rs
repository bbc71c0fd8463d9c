//! Message identifiers and plaintext framing.

use std::time::{SystemTime, UNIX_EPOCH};

/// Allocates 64-bit message identifiers.
///
/// The upper 32 bits track server time (corrected by `time_offset`), the
/// lower bits a sub-second component.  Client identifiers keep the two least
/// significant bits at zero; ties are broken by bumping the previous id by 4,
/// so ids are strictly increasing within a session.
pub struct MsgIdGen {
    last_msg_id: i64,
    time_offset: i32,
}

impl MsgIdGen {
    /// Create a generator with the given clock skew in seconds.
    pub fn new(time_offset: i32) -> Self {
        Self { last_msg_id: 0, time_offset }
    }

    /// The current clock skew.
    pub fn time_offset(&self) -> i32 {
        self.time_offset
    }

    /// Replace the clock skew, e.g. after the server reports ours as stale.
    pub fn set_time_offset(&mut self, offset: i32) {
        self.time_offset = offset;
    }

    /// Allocate the next message id.
    pub fn next(&mut self) -> i64 {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        let secs = (now.as_secs() as i64).wrapping_add(self.time_offset as i64) as u64;
        let nanos = now.subsec_nanos() as u64;
        let mut id = ((secs << 32) | ((nanos << 2) & 0xffff_fffc)) as i64;
        if self.last_msg_id >= id {
            id = self.last_msg_id + 4;
        }
        self.last_msg_id = id;
        id
    }
}

/// Errors parsing a plaintext frame.
#[derive(Clone, Debug, PartialEq)]
pub enum PlaintextError {
    /// Fewer bytes than the fixed header needs.
    FrameTooShort,
    /// `auth_key_id` was non-zero; the frame belongs to an encrypted session.
    BadAuthKeyId { got: i64 },
    /// The length field points past the end of the frame.
    BadLength { len: usize },
}

impl std::fmt::Display for PlaintextError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FrameTooShort => write!(f, "plaintext frame too short"),
            Self::BadAuthKeyId { got } => write!(f, "expected auth_key_id 0, got {got}"),
            Self::BadLength { len } => write!(f, "length field {len} exceeds frame"),
        }
    }
}
impl std::error::Error for PlaintextError {}

/// An unencrypted MTProto message, used only during the key handshake.
#[derive(Debug)]
pub struct Message {
    /// Unique identifier for this message.
    pub msg_id: i64,
    /// The serialized TL body (constructor tag + fields).
    pub body: Vec<u8>,
}

impl Message {
    /// Construct a plaintext message.
    pub fn plaintext(msg_id: i64, body: Vec<u8>) -> Self {
        Self { msg_id, body }
    }

    /// Serialize into the plaintext wire format:
    ///
    /// ```text
    /// auth_key_id:long  (0 for plaintext)
    /// message_id:long
    /// message_data_length:int
    /// message_data:bytes
    /// ```
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8 + 8 + 4 + self.body.len());
        buf.extend(0i64.to_le_bytes());
        buf.extend(self.msg_id.to_le_bytes());
        buf.extend((self.body.len() as u32).to_le_bytes());
        buf.extend(&self.body);
        buf
    }

    /// Parse a plaintext frame received from the server.
    pub fn from_bytes(frame: &[u8]) -> Result<Self, PlaintextError> {
        if frame.len() < 20 {
            return Err(PlaintextError::FrameTooShort);
        }
        let auth_key_id = i64::from_le_bytes(frame[..8].try_into().unwrap());
        if auth_key_id != 0 {
            return Err(PlaintextError::BadAuthKeyId { got: auth_key_id });
        }
        let msg_id = i64::from_le_bytes(frame[8..16].try_into().unwrap());
        let len = u32::from_le_bytes(frame[16..20].try_into().unwrap()) as usize;
        if 20 + len > frame.len() {
            return Err(PlaintextError::BadLength { len });
        }
        Ok(Self { msg_id, body: frame[20..20 + len].to_vec() })
    }
}
