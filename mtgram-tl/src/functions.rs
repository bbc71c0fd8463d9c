//! RPC functions as `struct`s.
//!
//! Functions only serialize; the server never sends one back.  Each carries
//! its result type through [`RemoteCall::Return`].

use crate::serialize::Serializable;
use crate::{enums, types, Identifiable, RemoteCall};

/// `req_pq_multi` — opens the auth-key handshake.
#[derive(Clone, Debug, PartialEq)]
pub struct ReqPqMulti {
    pub nonce: [u8; 16],
}

impl Identifiable for ReqPqMulti {
    const CONSTRUCTOR_ID: u32 = 0xbe7e8ef1;
}

impl Serializable for ReqPqMulti {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.nonce.serialize(buf);
    }
}

impl RemoteCall for ReqPqMulti {
    type Return = types::ResPq;
}

/// `req_DH_params` — proof of PQ factorization plus the RSA-encrypted inner
/// data.
#[derive(Clone, Debug, PartialEq)]
pub struct ReqDhParams {
    pub nonce: [u8; 16],
    pub server_nonce: [u8; 16],
    pub p: Vec<u8>,
    pub q: Vec<u8>,
    pub public_key_fingerprint: i64,
    pub encrypted_data: Vec<u8>,
}

impl Identifiable for ReqDhParams {
    const CONSTRUCTOR_ID: u32 = 0xd712e4be;
}

impl Serializable for ReqDhParams {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.nonce.serialize(buf);
        self.server_nonce.serialize(buf);
        self.p.serialize(buf);
        self.q.serialize(buf);
        self.public_key_fingerprint.serialize(buf);
        self.encrypted_data.serialize(buf);
    }
}

impl RemoteCall for ReqDhParams {
    type Return = enums::ServerDhParams;
}

/// `set_client_DH_params` — the temp-key-encrypted client DH share.
#[derive(Clone, Debug, PartialEq)]
pub struct SetClientDhParams {
    pub nonce: [u8; 16],
    pub server_nonce: [u8; 16],
    pub encrypted_data: Vec<u8>,
}

impl Identifiable for SetClientDhParams {
    const CONSTRUCTOR_ID: u32 = 0xf5045f1f;
}

impl Serializable for SetClientDhParams {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.nonce.serialize(buf);
        self.server_nonce.serialize(buf);
        self.encrypted_data.serialize(buf);
    }
}

impl RemoteCall for SetClientDhParams {
    type Return = enums::SetClientDhParamsAnswer;
}

/// `ping`.
#[derive(Clone, Debug, PartialEq)]
pub struct Ping {
    pub ping_id: i64,
}

impl Identifiable for Ping {
    const CONSTRUCTOR_ID: u32 = 0x7abe77ec;
}

impl Serializable for Ping {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.ping_id.serialize(buf);
    }
}

impl RemoteCall for Ping {
    type Return = types::Pong;
}

pub mod auth {
    //! Functions in the `auth.` namespace.

    use super::*;

    /// `auth.exportAuthorization` — mint a proof the target data center will
    /// accept.
    #[derive(Clone, Debug, PartialEq)]
    pub struct ExportAuthorization {
        pub dc_id: i32,
    }

    impl Identifiable for ExportAuthorization {
        const CONSTRUCTOR_ID: u32 = 0xe5bfffcd;
    }

    impl Serializable for ExportAuthorization {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            Self::CONSTRUCTOR_ID.serialize(buf);
            self.dc_id.serialize(buf);
        }
    }

    impl RemoteCall for ExportAuthorization {
        type Return = types::auth::ExportedAuthorization;
    }

    /// `auth.importAuthorization` — redeem an exported proof on this data
    /// center.
    #[derive(Clone, Debug, PartialEq)]
    pub struct ImportAuthorization {
        pub id: i64,
        pub bytes: Vec<u8>,
    }

    impl Identifiable for ImportAuthorization {
        const CONSTRUCTOR_ID: u32 = 0xa57a7dad;
    }

    impl Serializable for ImportAuthorization {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            Self::CONSTRUCTOR_ID.serialize(buf);
            self.id.serialize(buf);
            self.bytes.serialize(buf);
        }
    }

    impl RemoteCall for ImportAuthorization {
        type Return = types::auth::Authorization;
    }

    /// `auth.logOut`.
    #[derive(Clone, Debug, PartialEq)]
    pub struct LogOut;

    impl Identifiable for LogOut {
        const CONSTRUCTOR_ID: u32 = 0x3e72ba19;
    }

    impl Serializable for LogOut {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            Self::CONSTRUCTOR_ID.serialize(buf);
        }
    }

    impl RemoteCall for LogOut {
        type Return = bool;
    }
}

pub mod help {
    //! Functions in the `help.` namespace.

    use super::*;

    /// `help.getConfig`.
    #[derive(Clone, Debug, PartialEq)]
    pub struct GetConfig;

    impl Identifiable for GetConfig {
        const CONSTRUCTOR_ID: u32 = 0xc4f9186b;
    }

    impl Serializable for GetConfig {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            Self::CONSTRUCTOR_ID.serialize(buf);
        }
    }

    impl RemoteCall for GetConfig {
        type Return = types::Config;
    }
}

pub mod updates {
    //! Functions in the `updates.` namespace.

    use super::*;

    /// `updates.getState`.
    #[derive(Clone, Debug, PartialEq)]
    pub struct GetState;

    impl Identifiable for GetState {
        const CONSTRUCTOR_ID: u32 = 0xedd4882a;
    }

    impl Serializable for GetState {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            Self::CONSTRUCTOR_ID.serialize(buf);
        }
    }

    impl RemoteCall for GetState {
        type Return = types::updates::State;
    }

    /// `updates.getDifference` — fetch everything missed since the given
    /// state vector.
    #[derive(Clone, Debug, PartialEq)]
    pub struct GetDifference {
        pub pts: i32,
        pub date: i32,
        pub qts: i32,
    }

    impl Identifiable for GetDifference {
        const CONSTRUCTOR_ID: u32 = 0x25939651;
    }

    impl Serializable for GetDifference {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            Self::CONSTRUCTOR_ID.serialize(buf);
            self.pts.serialize(buf);
            self.date.serialize(buf);
            self.qts.serialize(buf);
        }
    }

    impl RemoteCall for GetDifference {
        type Return = crate::enums::updates::Difference;
    }
}
