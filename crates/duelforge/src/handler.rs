//! Per-connection handler: handshake, outbox writer, and event routing.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive Handshake → validate version
//!   2. Authenticate token → get SubjectId
//!   3. Queue HandshakeAck, register with the coordinator (which queues
//!      the current directory), start the writer task
//!   4. Loop: receive envelopes → answer heartbeats, hand everything else
//!      to the coordinator
//!
//! Outbound traffic never goes through the reader: the coordinator pushes
//! events into the connection's outbox and the writer task drains it in
//! order, stamping each envelope with the connection's next `seq`.

use std::sync::Arc;
use std::time::Instant;

use duelforge_protocol::{
    ClientEvent, Codec, Envelope, ProtocolError, ServerEvent,
};
use duelforge_session::{Authenticator, SubjectId};
use duelforge_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::DuelforgeError;
use crate::server::{PROTOCOL_VERSION, ServerState};

/// Drop guard that disconnects a connection from the coordinator when
/// the handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async lock.
struct DisconnectGuard<A: Authenticator, C: Codec> {
    conn_id: ConnectionId,
    state: Arc<ServerState<A, C>>,
}

impl<A: Authenticator, C: Codec> Drop for DisconnectGuard<A, C> {
    fn drop(&mut self) {
        let conn_id = self.conn_id.clone();
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.coordinator.disconnect(&conn_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<A, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<A, C>>,
) -> Result<(), DuelforgeError>
where
    A: Authenticator,
    C: Codec,
{
    let conn = Arc::new(conn);
    let conn_id = conn.id().clone();
    let start = Instant::now();
    tracing::debug!(%conn_id, "handling new connection");

    // --- Step 1: Handshake ---
    let subject = perform_handshake(&conn, &state, &start).await?;
    tracing::info!(%conn_id, %subject, "connection authenticated");

    // --- Step 2: Register ---
    // The ack goes into the outbox before registration so it is always
    // the first frame, ahead of the directory snapshot.
    let (outbox, outbox_rx) = mpsc::unbounded_channel();
    let _ = outbox.send(ServerEvent::HandshakeAck {
        connection_id: conn_id.to_string(),
        server_time: elapsed_ms(&start),
    });
    state
        .coordinator
        .connect(conn_id.clone(), Some(subject), outbox)
        .await;
    let _guard = DisconnectGuard {
        conn_id: conn_id.clone(),
        state: Arc::clone(&state),
    };

    tokio::spawn(write_outbox(
        Arc::clone(&conn),
        outbox_rx,
        Arc::clone(&state),
        start,
    ));

    // --- Step 3: Event loop ---
    loop {
        let data = match tokio::time::timeout(
            state.config.idle_timeout,
            conn.recv(),
        )
        .await
        {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%conn_id, "connection timed out");
                break;
            }
        };

        let envelope: Envelope<ClientEvent> = match state.codec.decode(&data)
        {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(
                    %conn_id, error = %e, "failed to decode envelope"
                );
                continue;
            }
        };

        match envelope.payload {
            ClientEvent::Heartbeat { client_time } => {
                state
                    .coordinator
                    .send_to(
                        &conn_id,
                        ServerEvent::HeartbeatAck {
                            client_time,
                            server_time: elapsed_ms(&start),
                        },
                    )
                    .await;
            }
            ClientEvent::Disconnect { reason } => {
                tracing::info!(%conn_id, %reason, "client disconnected");
                break;
            }
            ClientEvent::Handshake { .. } => {
                tracing::warn!(%conn_id, "repeated handshake");
                state
                    .coordinator
                    .send_to(
                        &conn_id,
                        ServerEvent::Error {
                            code: 400,
                            message: "already handshaken".into(),
                        },
                    )
                    .await;
            }
            event => state.coordinator.dispatch(&conn_id, event).await,
        }
    }

    // _guard drops here → coordinator disconnect fires, the registry
    // drops the outbox, and the writer closes the socket once drained.
    Ok(())
}

/// Performs the initial handshake: receive Handshake, validate, auth.
async fn perform_handshake<A, C>(
    conn: &WebSocketConnection,
    state: &ServerState<A, C>,
    start: &Instant,
) -> Result<SubjectId, DuelforgeError>
where
    A: Authenticator,
    C: Codec,
{
    let data = match tokio::time::timeout(
        state.config.handshake_timeout,
        conn.recv(),
    )
    .await
    {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage(
                "connection closed before handshake".into(),
            )
            .into());
        }
        Ok(Err(e)) => return Err(DuelforgeError::Transport(e)),
        Err(_) => {
            return Err(ProtocolError::InvalidMessage(
                "handshake timed out".into(),
            )
            .into());
        }
    };

    let first: Result<Envelope<ClientEvent>, _> = state.codec.decode(&data);
    let (version, token) = match first {
        Ok(Envelope {
            payload: ClientEvent::Handshake { version, token },
            ..
        }) => (version, token),
        _ => {
            send_error(conn, &state.codec, 400, "expected handshake", start)
                .await?;
            return Err(ProtocolError::InvalidMessage(
                "first message must be a handshake".into(),
            )
            .into());
        }
    };

    if version != PROTOCOL_VERSION {
        send_error(
            conn,
            &state.codec,
            400,
            &format!(
                "version mismatch: expected {PROTOCOL_VERSION}, got {version}"
            ),
            start,
        )
        .await?;
        return Err(ProtocolError::InvalidMessage(
            "protocol version mismatch".into(),
        )
        .into());
    }

    let token = token.as_deref().unwrap_or("");
    match state.auth.authenticate(token).await {
        Ok(subject) => Ok(subject),
        Err(e) => {
            tracing::warn!(conn_id = %conn.id(), error = %e, "handshake rejected");
            send_error(conn, &state.codec, 401, "unauthorized", start).await?;
            Err(e.into())
        }
    }
}

/// Drains a connection's outbox onto the socket until the coordinator
/// drops the sending side or the socket fails, then closes the socket.
async fn write_outbox<A, C>(
    conn: Arc<WebSocketConnection>,
    mut outbox: mpsc::UnboundedReceiver<ServerEvent>,
    state: Arc<ServerState<A, C>>,
    start: Instant,
) where
    A: Authenticator,
    C: Codec,
{
    let mut seq: u64 = 0;

    while let Some(event) = outbox.recv().await {
        let envelope = Envelope::new(next_seq(&mut seq), elapsed_ms(&start), event);
        let bytes = match state.codec.encode(&envelope) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(conn_id = %conn.id(), error = %e, "failed to encode event");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(conn_id = %conn.id(), error = %e, "send failed, stopping writer");
            break;
        }
    }

    if let Err(e) = conn.close().await {
        tracing::debug!(conn_id = %conn.id(), error = %e, "close failed");
    }
}

/// Sends an `error` envelope straight to the socket. Only used before
/// the connection has an outbox.
async fn send_error(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    code: u16,
    message: &str,
    start: &Instant,
) -> Result<(), DuelforgeError> {
    let envelope = Envelope::new(
        0,
        elapsed_ms(start),
        ServerEvent::Error {
            code,
            message: message.to_string(),
        },
    );
    let bytes = codec.encode(&envelope)?;
    conn.send(&bytes).await?;
    Ok(())
}

/// Milliseconds since the connection was accepted.
fn elapsed_ms(start: &Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Increments and returns the next sequence number.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}
