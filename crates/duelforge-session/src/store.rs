//! The session store: owns every open session in the process.
//!
//! Responsibilities:
//! - allocating fresh session ids that skip open and recently closed ones
//! - handing out sessions by id
//! - removing closed sessions
//! - producing the open-session directory
//!
//! # Concurrency note
//!
//! `SessionStore` is not thread-safe by itself. It is owned by the
//! coordinator, which serializes every mutation behind a single lock
//! together with the connection registry. That is why id allocation gives
//! up after [`MAX_ID_ATTEMPTS`] instead of retrying forever.
//!
//! # Retired ids
//!
//! The store remembers the last [`RETIRED_ID_MEMORY`] removed ids in a
//! bounded FIFO and won't reissue them, so a client holding a recently
//! closed id gets `SessionNotFound` rather than a stranger's new session.
//! Older ids are forgotten; at the default length a random id hitting one
//! of them is negligible.

use std::collections::{HashMap, HashSet, VecDeque};

use duelforge_protocol::{DirectoryEntry, SessionId};
use rand::Rng;
use rand::distr::Alphanumeric;

use crate::{Session, SessionError};

/// Default length of generated session ids.
pub const DEFAULT_SESSION_ID_LEN: usize = 9;

/// Shortest id length a server accepts. 62^6 ≈ 5.7e10 ids.
pub const MIN_SESSION_ID_LEN: usize = 6;

/// How many generated ids `create_session` tries before giving up.
pub const MAX_ID_ATTEMPTS: usize = 16;

/// How many removed ids are remembered and kept out of circulation.
pub const RETIRED_ID_MEMORY: usize = 1024;

type IdGenerator = Box<dyn FnMut() -> SessionId + Send>;

/// Owns all open sessions, keyed by id.
///
/// ## Lifecycle
///
/// ```text
/// create_session() ──→ [AwaitingSecondParticipant] ──→ [Active]
///                               │                         │
///                               └──────→ remove() ←───────┘
///                                           │
///                                      id retired
/// ```
pub struct SessionStore {
    sessions: HashMap<SessionId, Session>,

    /// Recently removed ids, oldest first, mirrored in `retired` for
    /// lookups. Capped at `RETIRED_ID_MEMORY`.
    retired_order: VecDeque<SessionId>,
    retired: HashSet<SessionId>,

    /// Creation counter, used to keep the directory in creation order.
    next_seq: u64,

    generate: IdGenerator,
}

impl SessionStore {
    /// Creates an empty store that generates random alphanumeric ids of
    /// length `id_len`. Callers are expected to reject lengths below
    /// [`MIN_SESSION_ID_LEN`]; shorter ids work but exhaust quickly.
    pub fn new(id_len: usize) -> Self {
        Self::with_id_generator(move || generate_session_id(id_len))
    }

    /// Creates an empty store with a custom id source.
    ///
    /// Ids that collide with an open or recently retired session are
    /// discarded and the generator is asked again, up to
    /// [`MAX_ID_ATTEMPTS`] times.
    pub fn with_id_generator(
        generate: impl FnMut() -> SessionId + Send + 'static,
    ) -> Self {
        Self {
            sessions: HashMap::new(),
            retired_order: VecDeque::new(),
            retired: HashSet::new(),
            next_seq: 0,
            generate: Box::new(generate),
        }
    }

    /// Allocates a fresh id and stores an empty session under it.
    ///
    /// # Errors
    /// Returns [`SessionError::IdSpaceExhausted`] if every one of
    /// [`MAX_ID_ATTEMPTS`] generated ids was already taken.
    pub fn create_session(&mut self) -> Result<SessionId, SessionError> {
        let mut fresh = None;
        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate = (self.generate)();
            if self.sessions.contains_key(&candidate)
                || self.retired.contains(&candidate)
            {
                tracing::warn!(game_id = %candidate, "session id collision, retrying");
                continue;
            }
            fresh = Some(candidate);
            break;
        }
        let Some(id) = fresh else {
            tracing::error!(
                attempts = MAX_ID_ATTEMPTS,
                open = self.sessions.len(),
                "no free session id"
            );
            return Err(SessionError::IdSpaceExhausted(MAX_ID_ATTEMPTS));
        };

        let seq = self.next_seq;
        self.next_seq += 1;
        self.sessions.insert(id.clone(), Session::new(id.clone(), seq));

        tracing::info!(game_id = %id, "session created");
        Ok(id)
    }

    /// Looks up a session.
    ///
    /// # Errors
    /// Returns [`SessionError::SessionNotFound`] if no open session has
    /// this id.
    pub fn get(&self, id: &SessionId) -> Result<&Session, SessionError> {
        self.sessions
            .get(id)
            .ok_or_else(|| SessionError::SessionNotFound(id.clone()))
    }

    /// Mutable variant of [`get`](Self::get).
    pub fn get_mut(
        &mut self,
        id: &SessionId,
    ) -> Result<&mut Session, SessionError> {
        self.sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::SessionNotFound(id.clone()))
    }

    /// Deletes a session and retires its id. Removing an id that isn't
    /// stored is a no-op.
    pub fn remove(&mut self, id: &SessionId) -> Option<Session> {
        let removed = self.sessions.remove(id);
        if removed.is_some() {
            self.retire(id.clone());
            tracing::info!(game_id = %id, "session removed");
        }
        removed
    }

    fn retire(&mut self, id: SessionId) {
        if self.retired_order.len() == RETIRED_ID_MEMORY {
            if let Some(oldest) = self.retired_order.pop_front() {
                self.retired.remove(&oldest);
            }
        }
        self.retired.insert(id.clone());
        self.retired_order.push_back(id);
    }

    /// Returns the directory of open sessions in creation order.
    ///
    /// Closed sessions are removed eagerly, so every stored session is
    /// open: both those awaiting a second participant and active ones.
    pub fn list_open(&self) -> Vec<DirectoryEntry> {
        let mut open: Vec<&Session> = self.sessions.values().collect();
        open.sort_by_key(|s| s.created_seq());
        open.into_iter().map(Session::directory_entry).collect()
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    /// Returns the number of open sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_ID_LEN)
    }
}

/// Generates a random alphanumeric id (`[A-Za-z0-9]{len}`).
///
/// At the default length of 9 that is 62^9 ≈ 1.3e16 possibilities, so
/// the retry loop in `create_session` practically never runs.
fn generate_session_id(len: usize) -> SessionId {
    let id: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect();
    SessionId(id)
}

// =========================================================================
// Tests
// =========================================================================
