//! Session bookkeeping for Duelforge.
//!
//! This crate holds the process-wide state the coordinator mutates:
//!
//! 1. **Sessions**: one matched pair of participants ([`Session`]),
//!    owned by the [`SessionStore`]
//! 2. **Connections**: who is connected, which session they are in, and
//!    how to reach them ([`ConnectionRegistry`])
//! 3. **Authentication**: the boundary to the identity service
//!    ([`Authenticator`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Coordinator (above)  ← serializes every mutation behind one lock
//!     ↕
//! Session Layer (this crate)  ← sessions, connections, subjects
//!     ↕
//! Protocol / Transport (below)  ← SessionId, Role, ConnectionId, events
//! ```

mod auth;
mod error;
mod registry;
mod session;
mod store;

pub use auth::{Authenticator, SubjectId};
pub use error::SessionError;
pub use registry::{ConnectionRegistry, Outbox};
pub use session::{MAX_PARTICIPANTS, Participant, Session};
pub use store::{
    DEFAULT_SESSION_ID_LEN, MAX_ID_ATTEMPTS, MIN_SESSION_ID_LEN, RETIRED_ID_MEMORY,
    SessionStore,
};
