//! Core protocol types for Duelforge's wire format.
//!
//! Every type here travels "on the wire": it is serialized to bytes,
//! written to a connection, and deserialized on the other side. Event
//! and field names follow the lobby's JavaScript clients (camelCase,
//! `createGame`, `joinGame`, `updateGamesList`, ...), so a browser can
//! `JSON.parse` a frame and switch on its `event` tag.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a session (one match between two players).
///
/// Newtype over `String` so a session id can't be confused with a
/// connection id or a subject id, even though all three are strings.
/// `#[serde(transparent)]` keeps it a plain JSON string on the wire.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// The fixed designation of a participant within a session.
///
/// The creator of a session always plays [`Role::A`] (moves first), the
/// second participant always plays [`Role::B`]. Assignment never depends
/// on iteration order of any collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// First mover; assigned to the session creator.
    A,
    /// Second mover; assigned to the joining participant.
    B,
}

impl Role {
    /// Returns the complementary role.
    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => f.write_str("A"),
            Self::B => f.write_str("B"),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionPhase
// ---------------------------------------------------------------------------

/// The lifecycle phase of a session.
///
/// Transitions are strictly ordered, no skipping and no way back:
///
/// ```text
/// AwaitingSecondParticipant → Active → Closed
/// ```
///
/// A session whose last participant leaves while it is still awaiting a
/// second one also ends up `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    AwaitingSecondParticipant,
    Active,
    Closed,
}

impl SessionPhase {
    /// Returns `true` if a second participant may still join.
    pub fn is_joinable(self) -> bool {
        matches!(self, Self::AwaitingSecondParticipant)
    }

    /// Returns `true` if transitioning to `target` is valid. Sessions
    /// assert this on every phase change in debug builds.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::AwaitingSecondParticipant, Self::Active)
                | (Self::AwaitingSecondParticipant, Self::Closed)
                | (Self::Active, Self::Closed)
        )
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitingSecondParticipant => {
                write!(f, "AwaitingSecondParticipant")
            }
            Self::Active => write!(f, "Active"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

/// A summary of one open session, as shown in the lobby directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    /// The session's unique ID.
    pub game_id: SessionId,
    /// Number of participants currently in the session.
    pub players: usize,
    /// Whether a second participant can still join.
    pub joinable: bool,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Everything a client may send.
///
/// `#[serde(tag = "event")]` produces internally tagged JSON, e.g.
/// `{"event": "joinGame", "gameId": "k3j9x0a1b"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    /// Must be the first event on a connection. `token` is handed to the
    /// server's authenticator unchanged.
    Handshake {
        version: u32,
        token: Option<String>,
    },

    /// Keep-alive; answered with [`ServerEvent::HeartbeatAck`].
    Heartbeat { client_time: u64 },

    /// Open a new session and become its first participant.
    CreateGame,

    /// Join an existing session as its second participant.
    JoinGame { game_id: SessionId },

    /// Relay an opaque payload to the other participant.
    ///
    /// `payload` and `state` are raw bytes and travel in JSON as arrays of
    /// byte values. A move `{"from":"e2","to":"e4"}` goes out as:
    ///
    /// ```json
    /// {"event":"movePiece","gameId":"k3x9q2mwa","payload":[123,34,102,114,111,109,34,58,...]}
    /// ```
    ///
    /// A browser builds that with
    /// `Array.from(new TextEncoder().encode(JSON.stringify(move)))` and
    /// reads it back with `new TextDecoder().decode(new Uint8Array(payload))`.
    ///
    /// `state`, when present, replaces the session's auxiliary state
    /// (e.g. a running position or score tally) that late
    /// `getGameState` queries will see.
    MovePiece {
        game_id: SessionId,
        payload: Vec<u8>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<Vec<u8>>,
    },

    /// Leave a session without closing the connection.
    LeaveGame { game_id: SessionId },

    /// Ask for the current directory.
    ListGames,

    /// Ask for a session's phase and auxiliary state.
    GetGameState { game_id: SessionId },

    /// "I'm disconnecting." The server closes the link afterwards.
    Disconnect { reason: String },
}

/// Everything the server may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// Handshake accepted; `connection_id` is this link's identifier.
    HandshakeAck {
        connection_id: String,
        server_time: u64,
    },

    /// Answer to [`ClientEvent::Heartbeat`].
    HeartbeatAck { client_time: u64, server_time: u64 },

    /// Sent to the creator once the session exists.
    GameCreated { game_id: SessionId },

    /// Tells a participant which role it plays in `game_id`.
    AssignColor { game_id: SessionId, role: Role },

    /// Both participants are present; the session is `Active`.
    GameStarted { game_id: SessionId },

    /// A relayed payload from the other participant, byte-for-byte. Same
    /// byte-array encoding as [`ClientEvent::MovePiece`].
    UpdateBoard { game_id: SessionId, payload: Vec<u8> },

    /// Acknowledges an explicit [`ClientEvent::LeaveGame`].
    GameLeft { game_id: SessionId },

    /// Full directory of open sessions.
    UpdateGamesList { games: Vec<DirectoryEntry> },

    /// Answer to [`ClientEvent::GetGameState`].
    GameState {
        game_id: SessionId,
        phase: SessionPhase,
        role: Role,
        players: usize,
        state: Option<Vec<u8>>,
    },

    /// The requested operation failed. `code` follows HTTP conventions
    /// (400 bad request, 401 unauthorized, 403 forbidden, 404 not
    /// found, 409 conflict).
    Error { code: u16, message: String },
}

// ---------------------------------------------------------------------------
// Envelope: the top-level wire format
// ---------------------------------------------------------------------------

/// The top-level message wrapper. Every frame on the wire is an Envelope
/// around either a [`ClientEvent`] or a [`ServerEvent`].
///
/// ```text
/// ┌──────────────────────────────────────┐
/// │ seq: 42                              │  ← per-sender ordering
/// │ timestamp: 15000                     │  ← ms since link start
/// │ ┌──────────────────────────────────┐ │
/// │ │ payload: {"event": "joinGame"..} │ │
/// │ └──────────────────────────────────┘ │
/// └──────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<E> {
    /// Auto-incrementing sequence number. Each side of a connection
    /// keeps its own counter.
    pub seq: u64,

    /// Milliseconds since the sender's side of the connection started.
    #[serde(default)]
    pub timestamp: u64,

    /// The event itself.
    pub payload: E,
}

impl<E> Envelope<E> {
    /// Wraps an event with the given sequence number and timestamp.
    pub fn new(seq: u64, timestamp: u64, payload: E) -> Self {
        Self {
            seq,
            timestamp,
            payload,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
