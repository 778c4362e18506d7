//! Directory broadcaster: pushes the open-session list to every client.
//!
//! There is no diffing. Whenever a session is created, closed, or its
//! participant count changes, the full directory goes out to everyone;
//! clients simply replace their lobby view.

use duelforge_protocol::ServerEvent;
use duelforge_session::{ConnectionRegistry, SessionStore};
use duelforge_transport::ConnectionId;

/// Publishes `updateGamesList` events.
#[derive(Debug, Default)]
pub struct DirectoryBroadcaster;

impl DirectoryBroadcaster {
    /// Sends the current directory to every registered connection.
    pub fn publish(&self, store: &SessionStore, registry: &ConnectionRegistry) {
        let games = store.list_open();
        tracing::debug!(
            open = games.len(),
            recipients = registry.len(),
            "publishing directory"
        );
        registry.broadcast(&ServerEvent::UpdateGamesList { games });
    }

    /// Sends the current directory to a single connection (on connect,
    /// or when it asks with `listGames`).
    pub fn send_snapshot(
        &self,
        store: &SessionStore,
        registry: &ConnectionRegistry,
        connection_id: &ConnectionId,
    ) {
        registry.send_to(
            connection_id,
            ServerEvent::UpdateGamesList {
                games: store.list_open(),
            },
        );
    }
}
