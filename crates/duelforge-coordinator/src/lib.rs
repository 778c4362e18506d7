//! Session coordination for Duelforge.
//!
//! The [`Coordinator`] is the core state machine: it creates sessions,
//! admits the second participant, assigns roles, relays opaque events
//! between the pair, and tears sessions down when participants leave or
//! disconnect. The [`DirectoryBroadcaster`] keeps every client's lobby
//! view current.
//!
//! # Key types
//!
//! - [`Coordinator`]: every session operation, plus [`dispatch`] for
//!   decoded client events
//! - [`DirectoryBroadcaster`]: full-state `updateGamesList` pushes
//! - [`CoordinatorConfig`]: id length and friends
//!
//! [`dispatch`]: Coordinator::dispatch

mod config;
mod coordinator;
mod directory;

pub use config::{ConfigError, CoordinatorConfig};
pub use coordinator::{Coordinator, SessionSnapshot};
pub use directory::DirectoryBroadcaster;
