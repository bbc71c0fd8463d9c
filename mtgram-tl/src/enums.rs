//! Polymorphic (boxed) TL types as `enum`s.
//!
//! Deserialization peeks the constructor tag, rewinds, and dispatches to the
//! matching variant's own deserializer.  An unknown tag is a hard error, never
//! a silent skip.

use crate::deserialize::{self, peek_id, Buffer};
use crate::serialize::Serializable;
use crate::{types, Deserializable, Identifiable};

/// Dispatch table body shared by every enum in this module.
macro_rules! boxed_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident($ty:path)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq)]
        pub enum $name {
            $($variant($ty)),+
        }

        impl Serializable for $name {
            fn serialize(&self, buf: &mut impl Extend<u8>) {
                match self {
                    $(Self::$variant(x) => x.serialize(buf)),+
                }
            }
        }

        impl Deserializable for $name {
            fn deserialize(buf: Buffer) -> deserialize::Result<Self> {
                let id = peek_id(buf)?;
                match id {
                    $(<$ty as Identifiable>::CONSTRUCTOR_ID => {
                        Ok(Self::$variant(<$ty>::deserialize(buf)?))
                    })+
                    _ => Err(deserialize::Error::UnexpectedConstructor { id }),
                }
            }
        }
    };
}

boxed_enum! {
    /// `Peer` — who a message belongs to.
    pub enum Peer {
        User(types::PeerUser),
        Chat(types::PeerChat),
        Channel(types::PeerChannel),
    }
}

impl Peer {
    /// The bare numeric id regardless of peer kind.
    pub fn id(&self) -> i64 {
        match self {
            Self::User(p) => p.user_id,
            Self::Chat(p) => p.chat_id,
            Self::Channel(p) => p.channel_id,
        }
    }
}

boxed_enum! {
    /// `User`.
    pub enum User {
        User(types::User),
        Empty(types::UserEmpty),
    }
}

impl User {
    pub fn id(&self) -> i64 {
        match self {
            Self::User(u) => u.id,
            Self::Empty(u) => u.id,
        }
    }
}

boxed_enum! {
    /// `Chat` — basic groups and channels share one boxed type.
    pub enum Chat {
        Chat(types::Chat),
        Channel(types::Channel),
    }
}

impl Chat {
    pub fn id(&self) -> i64 {
        match self {
            Self::Chat(c) => c.id,
            Self::Channel(c) => c.id,
        }
    }
}

boxed_enum! {
    /// `Message`.
    pub enum Message {
        Message(types::Message),
        Empty(types::MessageEmpty),
    }
}

impl Message {
    pub fn id(&self) -> i32 {
        match self {
            Self::Message(m) => m.id,
            Self::Empty(m) => m.id,
        }
    }
}

boxed_enum! {
    /// `Update` — the individual event kinds the reconciler orders.
    pub enum Update {
        NewMessage(types::UpdateNewMessage),
        DeleteMessages(types::UpdateDeleteMessages),
        ReadHistoryInbox(types::UpdateReadHistoryInbox),
        UserStatus(types::UpdateUserStatus),
    }
}

impl Update {
    /// The `(pts, pts_count)` pair, when this update participates in the pts
    /// sequence.  Updates without one are applied directly.
    pub fn pts(&self) -> Option<(i32, i32)> {
        match self {
            Self::NewMessage(u) => Some((u.pts, u.pts_count)),
            Self::DeleteMessages(u) => Some((u.pts, u.pts_count)),
            Self::ReadHistoryInbox(u) => Some((u.pts, u.pts_count)),
            Self::UserStatus(_) => None,
        }
    }
}

boxed_enum! {
    /// `Updates` — the envelope kinds the server pushes outside RPC results.
    pub enum Updates {
        TooLong(types::UpdatesTooLong),
        ShortMessage(types::UpdateShortMessage),
        ShortChatMessage(types::UpdateShortChatMessage),
        Short(types::UpdateShort),
        Combined(types::UpdatesCombined),
        Updates(types::Updates),
    }
}

boxed_enum! {
    /// `Server_DH_Params` — answer to `req_DH_params`.
    pub enum ServerDhParams {
        Ok(types::ServerDhParamsOk),
        Fail(types::ServerDhParamsFail),
    }
}

boxed_enum! {
    /// `Set_client_DH_params_answer`.
    pub enum SetClientDhParamsAnswer {
        Ok(types::DhGenOk),
        Retry(types::DhGenRetry),
        Fail(types::DhGenFail),
    }
}

pub mod updates {
    //! Boxed types in the `updates.` namespace.

    use super::*;

    boxed_enum! {
        /// `updates.Difference` — answer to `updates.getDifference`.
        pub enum Difference {
            Empty(types::updates::DifferenceEmpty),
            Difference(types::updates::Difference),
            Slice(types::updates::DifferenceSlice),
            TooLong(types::updates::DifferenceTooLong),
        }
    }
}
