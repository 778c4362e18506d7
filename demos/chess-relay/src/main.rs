//! Chess relay: a lobby server for two-player browser chess.
//!
//! The server pairs players and relays their moves; the browsers run the
//! chess rules themselves. Run with:
//!
//! ```bash
//! RUST_LOG=duelforge=debug cargo run --package chess-relay -- --bind 0.0.0.0:3000
//! ```

use std::time::Duration;

use clap::Parser;
use clap::builder::RangedU64ValueParser;
use duelforge::prelude::*;
use duelforge::session::MIN_SESSION_ID_LEN;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "chess-relay")]
#[command(about = "Pairs chess players and relays their moves")]
struct Args {
    /// WebSocket listen address.
    #[arg(long, env = "DUELFORGE_BIND", default_value = "0.0.0.0:3000")]
    bind: String,

    /// Seconds of silence after which a connection is dropped.
    #[arg(long, env = "DUELFORGE_IDLE_TIMEOUT_SECS", default_value_t = 15)]
    idle_timeout_secs: u64,

    /// Length of generated game ids (at least 6).
    #[arg(
        long,
        env = "DUELFORGE_GAME_ID_LEN",
        default_value_t = 9,
        value_parser = RangedU64ValueParser::<usize>::new().range(MIN_SESSION_ID_LEN as u64..)
    )]
    game_id_len: usize,
}

/// Trusts any non-empty token as the player's name. Put a real identity
/// check here before exposing the server.
struct TokenAuth;

impl Authenticator for TokenAuth {
    async fn authenticate(&self, token: &str) -> Result<SubjectId, SessionError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(SessionError::AuthFailed("missing token".into()));
        }
        Ok(SubjectId(token.to_string()))
    }
}

fn server_config(args: &Args) -> (ServerConfig, CoordinatorConfig) {
    let server = ServerConfig {
        idle_timeout: Duration::from_secs(args.idle_timeout_secs),
        ..ServerConfig::default()
    };
    let coordinator = CoordinatorConfig {
        session_id_len: args.game_id_len,
    };
    (server, coordinator)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive("chess_relay=info".parse()?)
                .add_directive("duelforge=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let (config, coordinator_config) = server_config(&args);
    tracing::info!(bind = %args.bind, idle_timeout_secs = args.idle_timeout_secs, "chess relay starting");

    let server = DuelforgeServerBuilder::new()
        .bind(&args.bind)
        .config(config)
        .coordinator_config(coordinator_config)
        .build(TokenAuth)
        .await?;

    server.run().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;

    type Ws = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn start() -> String {
        let args = Args::parse_from(["chess-relay", "--bind", "127.0.0.1:0"]);
        let (config, coordinator_config) = server_config(&args);
        let server = DuelforgeServerBuilder::new()
            .bind(&args.bind)
            .config(config)
            .coordinator_config(coordinator_config)
            .build(TokenAuth)
            .await
            .unwrap();
        let addr = server.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let _ = server.run().await;
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        addr
    }

    async fn ws(addr: &str) -> Ws {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .unwrap();
        ws
    }

    async fn send(ws: &mut Ws, event: ClientEvent) {
        let text = serde_json::to_string(&Envelope::new(0, 0, event)).unwrap();
        ws.send(Message::Text(text.into())).await.unwrap();
    }

    async fn next_event(ws: &mut Ws) -> ServerEvent {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let env: Envelope<ServerEvent> =
            serde_json::from_slice(&msg.into_data()).unwrap();
        env.payload
    }

    /// Skips directory pushes.
    async fn next_non_directory(ws: &mut Ws) -> ServerEvent {
        loop {
            match next_event(ws).await {
                ServerEvent::UpdateGamesList { .. } => continue,
                other => return other,
            }
        }
    }

    async fn login(ws: &mut Ws, name: &str) {
        send(ws, ClientEvent::Handshake {
            version: PROTOCOL_VERSION,
            token: Some(name.into()),
        })
        .await;
        assert!(matches!(next_event(ws).await, ServerEvent::HandshakeAck { .. }));
        assert!(matches!(next_event(ws).await, ServerEvent::UpdateGamesList { .. }));
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["chess-relay"]);
        assert_eq!(args.idle_timeout_secs, 15);
        let (config, coordinator) = server_config(&args);
        assert_eq!(config.idle_timeout, Duration::from_secs(15));
        assert_eq!(coordinator.session_id_len, 9);
    }

    #[test]
    fn test_args_reject_short_game_ids() {
        for len in ["0", "1", "5"] {
            let parsed = Args::try_parse_from(["chess-relay", "--game-id-len", len]);
            assert!(parsed.is_err(), "accepted --game-id-len {len}");
        }
        let args = Args::parse_from(["chess-relay", "--game-id-len", "6"]);
        assert_eq!(args.game_id_len, 6);
    }

    #[tokio::test]
    async fn test_empty_token_rejected() {
        let addr = start().await;
        let mut w = ws(&addr).await;
        send(&mut w, ClientEvent::Handshake {
            version: PROTOCOL_VERSION,
            token: None,
        })
        .await;
        assert!(matches!(
            next_event(&mut w).await,
            ServerEvent::Error { code: 401, .. }
        ));
    }

    #[tokio::test]
    async fn test_white_moves_black_sees_it() {
        let addr = start().await;
        let mut white = ws(&addr).await;
        let mut black = ws(&addr).await;
        login(&mut white, "magnus").await;
        login(&mut black, "hikaru").await;

        send(&mut white, ClientEvent::CreateGame).await;
        let ServerEvent::GameCreated { game_id } = next_non_directory(&mut white).await
        else {
            panic!("expected gameCreated");
        };
        assert_eq!(game_id.as_str().len(), 9);

        send(&mut black, ClientEvent::JoinGame {
            game_id: game_id.clone(),
        })
        .await;
        assert_eq!(next_non_directory(&mut white).await, ServerEvent::AssignColor {
            game_id: game_id.clone(),
            role: Role::A,
        });
        assert_eq!(next_non_directory(&mut black).await, ServerEvent::AssignColor {
            game_id: game_id.clone(),
            role: Role::B,
        });
        assert!(matches!(
            next_non_directory(&mut black).await,
            ServerEvent::GameStarted { .. }
        ));

        let mv = br#"{"from":"e2","to":"e4"}"#.to_vec();
        send(&mut white, ClientEvent::MovePiece {
            game_id: game_id.clone(),
            payload: mv.clone(),
            state: Some(b"rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b".to_vec()),
        })
        .await;
        assert_eq!(next_non_directory(&mut black).await, ServerEvent::UpdateBoard {
            game_id,
            payload: mv,
        });
    }
}
