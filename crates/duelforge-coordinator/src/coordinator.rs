//! The session coordinator: admission, roles, relay, and cleanup.
//!
//! All process-wide state (the [`SessionStore`] and the
//! [`ConnectionRegistry`]) lives behind one async mutex. Every operation
//! takes the lock, mutates, queues its outbound events on the affected
//! connections' outboxes, and releases the lock. Nothing awaits while
//! the lock is held, and sends never block, so one slow client can't
//! stall another.
//!
//! Holding a single lock across store and registry is what makes the
//! join race well-defined: of two concurrent `join_session` calls on the
//! same session, the first to take the lock wins and the second sees a
//! full session.

use duelforge_protocol::{
    ClientEvent, DirectoryEntry, Role, ServerEvent, SessionId, SessionPhase,
};
use duelforge_session::{
    ConnectionRegistry, Outbox, SessionError, SessionStore, SubjectId,
};
use duelforge_transport::ConnectionId;
use tokio::sync::Mutex;

use crate::{CoordinatorConfig, DirectoryBroadcaster};

struct CoordinatorState {
    store: SessionStore,
    registry: ConnectionRegistry,
}

/// A participant's view of a session, returned by
/// [`Coordinator::session_state`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub game_id: SessionId,
    pub phase: SessionPhase,
    pub role: Role,
    pub players: usize,
    pub state: Option<Vec<u8>>,
}

impl From<SessionSnapshot> for ServerEvent {
    fn from(s: SessionSnapshot) -> Self {
        ServerEvent::GameState {
            game_id: s.game_id,
            phase: s.phase,
            role: s.role,
            players: s.players,
            state: s.state,
        }
    }
}

/// Orchestrates sessions for every connection in the process.
///
/// Shared between connection tasks behind an `Arc`.
pub struct Coordinator {
    state: Mutex<CoordinatorState>,
    directory: DirectoryBroadcaster,
}

impl Coordinator {
    /// Creates a coordinator with an empty store.
    pub fn new(config: CoordinatorConfig) -> Self {
        Self::with_store(SessionStore::new(config.session_id_len))
    }

    /// Creates a coordinator around an existing (usually empty) store,
    /// e.g. one with a custom id generator.
    pub fn with_store(store: SessionStore) -> Self {
        Self {
            state: Mutex::new(CoordinatorState {
                store,
                registry: ConnectionRegistry::new(),
            }),
            directory: DirectoryBroadcaster,
        }
    }

    // ---------------------------------------------------------------------
    // Connection lifecycle
    // ---------------------------------------------------------------------

    /// Registers a connection and sends it the current directory.
    pub async fn connect(
        &self,
        connection_id: ConnectionId,
        subject: Option<SubjectId>,
        outbox: Outbox,
    ) {
        let mut state = self.state.lock().await;
        let CoordinatorState { store, registry } = &mut *state;

        tracing::info!(conn_id = %connection_id, "connection registered");
        registry.register(connection_id.clone(), subject, outbox);
        self.directory.send_snapshot(store, registry, &connection_id);
    }

    /// Forgets a connection and removes it from its session, closing the
    /// session if it was the last participant. Safe to call for
    /// connections that were never registered.
    pub async fn disconnect(&self, connection_id: &ConnectionId) {
        let mut state = self.state.lock().await;
        let CoordinatorState { store, registry } = &mut *state;

        let Some(game_id) = registry.unregister(connection_id) else {
            tracing::debug!(conn_id = %connection_id, "disconnected outside any session");
            return;
        };

        tracing::info!(conn_id = %connection_id, %game_id, "participant disconnected");
        if Self::detach(store, connection_id, &game_id) {
            self.directory.publish(store, registry);
        }
    }

    // ---------------------------------------------------------------------
    // Session operations
    // ---------------------------------------------------------------------

    /// Opens a new session with `connection_id` as its first participant
    /// (role A) and acknowledges with `gameCreated`.
    ///
    /// # Errors
    /// - [`SessionError::AlreadyInSession`] if the connection is already in
    ///   an open session
    /// - [`SessionError::IdSpaceExhausted`] if no free id could be found;
    ///   the lock is released and nothing changes
    pub async fn create_session(
        &self,
        connection_id: &ConnectionId,
    ) -> Result<SessionId, SessionError> {
        let mut state = self.state.lock().await;
        let CoordinatorState { store, registry } = &mut *state;

        if let Some(current) = registry.session_of(connection_id) {
            return Err(SessionError::AlreadyInSession(
                connection_id.clone(),
                current.clone(),
            ));
        }

        let game_id = store.create_session()?;
        let role = store.get_mut(&game_id)?.admit(connection_id.clone())?;
        registry.set_session(connection_id, Some(game_id.clone()));

        tracing::info!(conn_id = %connection_id, %game_id, %role, "session opened");
        registry.send_to(
            connection_id,
            ServerEvent::GameCreated {
                game_id: game_id.clone(),
            },
        );
        self.directory.publish(store, registry);
        Ok(game_id)
    }

    /// Admits `connection_id` as the second participant (role B) and
    /// starts the session: each participant gets `assignColor` with its
    /// own role, then both get `gameStarted`.
    ///
    /// # Errors
    /// - [`SessionError::AlreadyInSession`] if the caller is already in
    ///   a session (including this one)
    /// - [`SessionError::SessionNotFound`] if no open session has the id
    /// - [`SessionError::SessionFull`] if somebody else got the slot first
    pub async fn join_session(
        &self,
        connection_id: &ConnectionId,
        game_id: &SessionId,
    ) -> Result<Role, SessionError> {
        let mut state = self.state.lock().await;
        let CoordinatorState { store, registry } = &mut *state;

        if let Some(current) = registry.session_of(connection_id) {
            return Err(SessionError::AlreadyInSession(
                connection_id.clone(),
                current.clone(),
            ));
        }

        let session = store.get_mut(game_id)?;
        let role = session.admit(connection_id.clone())?;
        registry.set_session(connection_id, Some(game_id.clone()));

        tracing::info!(
            conn_id = %connection_id,
            %game_id,
            %role,
            players = session.player_count(),
            "participant joined"
        );

        if session.phase() == SessionPhase::Active {
            for p in session.participants() {
                registry.send_to(
                    &p.connection_id,
                    ServerEvent::AssignColor {
                        game_id: game_id.clone(),
                        role: p.role,
                    },
                );
            }
            for p in session.participants() {
                registry.send_to(
                    &p.connection_id,
                    ServerEvent::GameStarted {
                        game_id: game_id.clone(),
                    },
                );
            }
            tracing::info!(%game_id, "session started");
        }

        self.directory.publish(store, registry);
        Ok(role)
    }

    /// Forwards `payload` unchanged to the other participant, never back
    /// to the sender. If `state` is given it replaces the session's
    /// auxiliary state.
    ///
    /// # Errors
    /// - [`SessionError::SessionNotFound`] if no open session has the id
    /// - [`SessionError::NotAParticipant`] if the caller isn't in it
    /// - [`SessionError::SessionNotActive`] if the second participant
    ///   hasn't arrived yet
    pub async fn relay_event(
        &self,
        connection_id: &ConnectionId,
        game_id: &SessionId,
        payload: Vec<u8>,
        state: Option<Vec<u8>>,
    ) -> Result<(), SessionError> {
        let mut guard = self.state.lock().await;
        let CoordinatorState { store, registry } = &mut *guard;

        let session = store.get_mut(game_id)?;
        if !session.is_participant(connection_id) {
            return Err(SessionError::NotAParticipant(
                connection_id.clone(),
                game_id.clone(),
            ));
        }
        if session.phase() != SessionPhase::Active {
            return Err(SessionError::SessionNotActive(game_id.clone()));
        }

        if let Some(state) = state {
            session.set_auxiliary_state(state);
        }

        match session.other_participant(connection_id) {
            Some(other) => {
                tracing::debug!(
                    conn_id = %connection_id,
                    to = %other,
                    %game_id,
                    bytes = payload.len(),
                    "relaying event"
                );
                registry.send_to(
                    other,
                    ServerEvent::UpdateBoard {
                        game_id: game_id.clone(),
                        payload,
                    },
                );
            }
            None => {
                tracing::debug!(
                    conn_id = %connection_id,
                    %game_id,
                    "other participant gone, relay dropped"
                );
            }
        }
        Ok(())
    }

    /// Removes `connection_id` from the session and acknowledges with
    /// `gameLeft`. The session closes if nobody is left.
    ///
    /// # Errors
    /// - [`SessionError::SessionNotFound`] if no open session has the id
    /// - [`SessionError::NotAParticipant`] if the caller isn't in it
    pub async fn leave_session(
        &self,
        connection_id: &ConnectionId,
        game_id: &SessionId,
    ) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        let CoordinatorState { store, registry } = &mut *state;

        if !store.get(game_id)?.is_participant(connection_id) {
            return Err(SessionError::NotAParticipant(
                connection_id.clone(),
                game_id.clone(),
            ));
        }

        Self::detach(store, connection_id, game_id);
        registry.set_session(connection_id, None);
        tracing::info!(conn_id = %connection_id, %game_id, "participant left");

        registry.send_to(
            connection_id,
            ServerEvent::GameLeft {
                game_id: game_id.clone(),
            },
        );
        self.directory.publish(store, registry);
        Ok(())
    }

    /// Returns the caller's view of a session, including its auxiliary
    /// state exactly as last stored.
    ///
    /// # Errors
    /// - [`SessionError::SessionNotFound`] if no open session has the id
    /// - [`SessionError::NotAParticipant`] if the caller isn't in it
    pub async fn session_state(
        &self,
        connection_id: &ConnectionId,
        game_id: &SessionId,
    ) -> Result<SessionSnapshot, SessionError> {
        let state = self.state.lock().await;

        let session = state.store.get(game_id)?;
        let role = session.role_of(connection_id).ok_or_else(|| {
            SessionError::NotAParticipant(
                connection_id.clone(),
                game_id.clone(),
            )
        })?;

        Ok(SessionSnapshot {
            game_id: game_id.clone(),
            phase: session.phase(),
            role,
            players: session.player_count(),
            state: session.auxiliary_state().map(<[u8]>::to_vec),
        })
    }

    /// Returns the open-session directory.
    pub async fn open_sessions(&self) -> Vec<DirectoryEntry> {
        self.state.lock().await.store.list_open()
    }

    /// Returns the session a connection is currently in.
    pub async fn session_of(
        &self,
        connection_id: &ConnectionId,
    ) -> Option<SessionId> {
        self.state
            .lock()
            .await
            .registry
            .session_of(connection_id)
            .cloned()
    }

    /// Returns the number of registered connections.
    pub async fn connection_count(&self) -> usize {
        self.state.lock().await.registry.len()
    }

    // ---------------------------------------------------------------------
    // Event dispatch
    // ---------------------------------------------------------------------

    /// Runs the session operation a client event asks for. Failures are
    /// reported to the caller as a single `error` event; the connection
    /// itself is unaffected.
    ///
    /// Handshake, heartbeat and disconnect are connection-level events
    /// handled by the transport adapter; they are ignored here.
    pub async fn dispatch(&self, connection_id: &ConnectionId, event: ClientEvent) {
        let result = match event {
            ClientEvent::CreateGame => {
                self.create_session(connection_id).await.map(drop)
            }
            ClientEvent::JoinGame { game_id } => {
                self.join_session(connection_id, &game_id).await.map(drop)
            }
            ClientEvent::MovePiece {
                game_id,
                payload,
                state,
            } => {
                self.relay_event(connection_id, &game_id, payload, state)
                    .await
            }
            ClientEvent::LeaveGame { game_id } => {
                self.leave_session(connection_id, &game_id).await
            }
            ClientEvent::ListGames => {
                let state = self.state.lock().await;
                self.directory.send_snapshot(
                    &state.store,
                    &state.registry,
                    connection_id,
                );
                Ok(())
            }
            ClientEvent::GetGameState { game_id } => {
                match self.session_state(connection_id, &game_id).await {
                    Ok(snapshot) => {
                        self.send_to(connection_id, snapshot.into()).await;
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
            ClientEvent::Handshake { .. }
            | ClientEvent::Heartbeat { .. }
            | ClientEvent::Disconnect { .. } => {
                tracing::debug!(
                    conn_id = %connection_id,
                    "connection-level event reached the coordinator, ignoring"
                );
                Ok(())
            }
        };

        if let Err(e) = result {
            tracing::debug!(conn_id = %connection_id, error = %e, "operation rejected");
            self.send_to(
                connection_id,
                ServerEvent::Error {
                    code: e.code(),
                    message: e.to_string(),
                },
            )
            .await;
        }
    }

    /// Queues an event on one connection's outbox.
    pub async fn send_to(&self, connection_id: &ConnectionId, event: ServerEvent) {
        self.state.lock().await.registry.send_to(connection_id, event);
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    /// Removes a participant from a session and drops the session if it
    /// closed. Returns `true` if anything changed.
    fn detach(
        store: &mut SessionStore,
        connection_id: &ConnectionId,
        game_id: &SessionId,
    ) -> bool {
        let Ok(session) = store.get_mut(game_id) else {
            return false;
        };
        if !session.remove_participant(connection_id) {
            return false;
        }
        if session.phase() == SessionPhase::Closed {
            store.remove(game_id);
            tracing::info!(%game_id, "session closed");
        }
        true
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new(CoordinatorConfig::default())
    }
}
