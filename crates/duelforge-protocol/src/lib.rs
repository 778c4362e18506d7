//! Wire protocol for Duelforge.
//!
//! This crate defines what clients and the server say to each other:
//!
//! - **Types** ([`Envelope`], [`ClientEvent`], [`ServerEvent`],
//!   [`SessionId`], [`Role`], [`SessionPhase`]): the structures that
//!   travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those structures
//!   become bytes and back.
//! - **Errors** ([`ProtocolError`]).
//!
//! The protocol layer knows nothing about connections or sessions; it
//! only knows how to serialize and deserialize events.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope<ClientEvent>) → Coordinator
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientEvent, DirectoryEntry, Envelope, Role, ServerEvent, SessionId,
    SessionPhase,
};
