//! Connection registry: process-local metadata per live connection.
//!
//! Each entry remembers the subject the authenticator resolved, the
//! session the connection is currently in (a plain id, looked up in the
//! store when needed), and the outbox that feeds the connection's writer
//! task. Sending is fire-and-forget: an outbox whose receiver is gone
//! means the connection is on its way out, and its disconnect will clean
//! up shortly.

use std::collections::HashMap;

use duelforge_protocol::{ServerEvent, SessionId};
use duelforge_transport::ConnectionId;
use tokio::sync::mpsc;

use crate::SubjectId;

/// Channel sender delivering server events to one connection.
pub type Outbox = mpsc::UnboundedSender<ServerEvent>;

struct ConnectionEntry {
    subject: Option<SubjectId>,
    session: Option<SessionId>,
    outbox: Outbox,
}

/// Maps connection ids to their metadata.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, ConnectionEntry>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection. Registering an id twice replaces the old
    /// entry, including its session link.
    pub fn register(
        &mut self,
        connection_id: ConnectionId,
        subject: Option<SubjectId>,
        outbox: Outbox,
    ) {
        tracing::debug!(conn_id = %connection_id, "connection registered");
        self.connections.insert(
            connection_id,
            ConnectionEntry {
                subject,
                session: None,
                outbox,
            },
        );
    }

    /// Removes a connection and returns the session it was in, if any,
    /// so the caller can clean that session up.
    pub fn unregister(
        &mut self,
        connection_id: &ConnectionId,
    ) -> Option<SessionId> {
        let entry = self.connections.remove(connection_id)?;
        tracing::debug!(conn_id = %connection_id, "connection unregistered");
        entry.session
    }

    /// Links (or unlinks, with `None`) a connection to a session.
    /// Unknown connections are ignored.
    pub fn set_session(
        &mut self,
        connection_id: &ConnectionId,
        session: Option<SessionId>,
    ) {
        if let Some(entry) = self.connections.get_mut(connection_id) {
            entry.session = session;
        }
    }

    pub fn session_of(&self, connection_id: &ConnectionId) -> Option<&SessionId> {
        self.connections
            .get(connection_id)
            .and_then(|e| e.session.as_ref())
    }

    pub fn subject_of(&self, connection_id: &ConnectionId) -> Option<&SubjectId> {
        self.connections
            .get(connection_id)
            .and_then(|e| e.subject.as_ref())
    }

    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.connections.contains_key(connection_id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Sends an event to one connection. Unknown ids and dead outboxes
    /// are logged and dropped.
    pub fn send_to(&self, connection_id: &ConnectionId, event: ServerEvent) {
        match self.connections.get(connection_id) {
            Some(entry) => {
                if entry.outbox.send(event).is_err() {
                    tracing::debug!(
                        conn_id = %connection_id,
                        "outbox closed, dropping event"
                    );
                }
            }
            None => {
                tracing::debug!(
                    conn_id = %connection_id,
                    "send to unknown connection dropped"
                );
            }
        }
    }

    /// Sends a copy of the event to every registered connection.
    pub fn broadcast(&self, event: &ServerEvent) {
        for (connection_id, entry) in &self.connections {
            if entry.outbox.send(event.clone()).is_err() {
                tracing::debug!(
                    conn_id = %connection_id,
                    "outbox closed, dropping broadcast"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn(id: &str) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn outbox() -> (Outbox, mpsc::UnboundedReceiver<ServerEvent>) {
        mpsc::unbounded_channel()
    }

    #[test]
    fn test_register_then_unregister_without_session() {
        let mut reg = ConnectionRegistry::new();
        let (tx, _rx) = outbox();
        reg.register(conn("c1"), None, tx);
        assert!(reg.contains(&conn("c1")));

        assert_eq!(reg.unregister(&conn("c1")), None);
        assert!(reg.is_empty());
    }

    #[test]
    fn test_unregister_returns_linked_session() {
        let mut reg = ConnectionRegistry::new();
        let (tx, _rx) = outbox();
        reg.register(conn("c1"), None, tx);
        reg.set_session(&conn("c1"), Some(SessionId::from("g1")));

        assert_eq!(reg.session_of(&conn("c1")), Some(&SessionId::from("g1")));
        assert_eq!(reg.unregister(&conn("c1")), Some(SessionId::from("g1")));
    }

    #[test]
    fn test_unregister_unknown_is_none() {
        let mut reg = ConnectionRegistry::new();
        assert_eq!(reg.unregister(&conn("ghost")), None);
    }

    #[test]
    fn test_set_session_none_unlinks() {
        let mut reg = ConnectionRegistry::new();
        let (tx, _rx) = outbox();
        reg.register(conn("c1"), None, tx);
        reg.set_session(&conn("c1"), Some(SessionId::from("g1")));
        reg.set_session(&conn("c1"), None);
        assert_eq!(reg.session_of(&conn("c1")), None);
    }

    #[test]
    fn test_subject_is_kept() {
        let mut reg = ConnectionRegistry::new();
        let (tx, _rx) = outbox();
        reg.register(conn("c1"), Some(SubjectId("alice".into())), tx);
        assert_eq!(
            reg.subject_of(&conn("c1")),
            Some(&SubjectId("alice".into()))
        );
    }

    #[test]
    fn test_send_to_reaches_only_target() {
        let mut reg = ConnectionRegistry::new();
        let (tx1, mut rx1) = outbox();
        let (tx2, mut rx2) = outbox();
        reg.register(conn("c1"), None, tx1);
        reg.register(conn("c2"), None, tx2);

        reg.send_to(&conn("c1"), ServerEvent::GameStarted {
            game_id: SessionId::from("g1"),
        });

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());
    }

    #[test]
    fn test_send_to_dead_outbox_is_swallowed() {
        let mut reg = ConnectionRegistry::new();
        let (tx, rx) = outbox();
        reg.register(conn("c1"), None, tx);
        drop(rx);

        // Must not panic.
        reg.send_to(&conn("c1"), ServerEvent::GameLeft {
            game_id: SessionId::from("g1"),
        });
        reg.send_to(&conn("ghost"), ServerEvent::GameLeft {
            game_id: SessionId::from("g1"),
        });
    }

    #[test]
    fn test_broadcast_reaches_everyone() {
        let mut reg = ConnectionRegistry::new();
        let (tx1, mut rx1) = outbox();
        let (tx2, mut rx2) = outbox();
        let (tx3, rx3) = outbox();
        reg.register(conn("c1"), None, tx1);
        reg.register(conn("c2"), None, tx2);
        reg.register(conn("c3"), None, tx3);
        drop(rx3);

        let event = ServerEvent::UpdateGamesList { games: vec![] };
        reg.broadcast(&event);

        assert_eq!(rx1.try_recv().unwrap(), event);
        assert_eq!(rx2.try_recv().unwrap(), event);
    }
}
