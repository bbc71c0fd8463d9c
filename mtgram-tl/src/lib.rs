//! TL binary serialization for the mtgram protocol engine.
//!
//! Every protocol value is encoded as a 4-byte little-endian constructor tag
//! followed by its fields in schema order.  Polymorphic values are resolved
//! by tag lookup when deserializing.
//!
//! | Module        | Contents                                                 |
//! |---------------|----------------------------------------------------------|
//! | [`types`]     | Concrete constructors as `struct`s                       |
//! | [`functions`] | RPC functions as `struct`s implementing [`RemoteCall`]   |
//! | [`enums`]     | Polymorphic (boxed) types as `enum`s                     |
//!
//! The shape set is closed and hand-written: this engine only carries the
//! MTProto service schema plus the small API subset the session and update
//! layers need.

#![deny(unsafe_code)]
#![allow(clippy::large_enum_variant)]

pub mod deserialize;
pub mod serialize;

pub mod enums;
pub mod functions;
pub mod types;

pub use deserialize::{Cursor, Deserializable};
pub use serialize::Serializable;

/// Bare `vector` — a length-prefixed list without the boxed `Vector`
/// constructor tag in front.
#[derive(Clone, Debug, PartialEq)]
pub struct RawVec<T>(pub Vec<T>);

// ─── Core traits ──────────────────────────────────────────────────────────────

/// Every concrete TL shape has a globally unique 32-bit constructor tag.
pub trait Identifiable {
    /// The constructor tag as specified in the schema.
    const CONSTRUCTOR_ID: u32;
}

/// A function type that can be sent to the server as an RPC call.
///
/// `Return` is the type the server responds with.
pub trait RemoteCall: Serializable {
    /// The deserialized response type.
    type Return: Deserializable;
}
