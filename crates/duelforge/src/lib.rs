//! # Duelforge
//!
//! A two-party session coordinator for turn-based web games.
//!
//! Clients connect over WebSockets, open a session or join one from the
//! lobby directory, and from then on Duelforge relays their opaque game
//! events to the other participant. It never interprets the payloads:
//! rules, validation and scoring stay in the clients.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use duelforge::prelude::*;
//!
//! struct OpenAuth;
//!
//! impl Authenticator for OpenAuth {
//!     async fn authenticate(&self, token: &str) -> Result<SubjectId, SessionError> {
//!         Ok(SubjectId(token.to_string()))
//!     }
//! }
//!
//! # async fn run() -> Result<(), DuelforgeError> {
//! let server = DuelforgeServerBuilder::new()
//!     .bind("0.0.0.0:3000")
//!     .build(OpenAuth)
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use error::DuelforgeError;
pub use server::{DuelforgeServer, DuelforgeServerBuilder, PROTOCOL_VERSION};

pub use duelforge_coordinator as coordinator;
pub use duelforge_protocol as protocol;
pub use duelforge_session as session;
pub use duelforge_transport as transport;

/// Everything needed to run a server and talk to it.
pub mod prelude {
    pub use crate::{
        DuelforgeError, DuelforgeServer, DuelforgeServerBuilder,
        PROTOCOL_VERSION, ServerConfig,
    };
    pub use duelforge_coordinator::{
        ConfigError, Coordinator, CoordinatorConfig,
    };
    pub use duelforge_protocol::{
        ClientEvent, Codec, DirectoryEntry, Envelope, JsonCodec, Role,
        ServerEvent, SessionId, SessionPhase,
    };
    pub use duelforge_session::{Authenticator, SessionError, SubjectId};
    pub use duelforge_transport::ConnectionId;
}
