//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::geometry::Vec2;
use crate::game::movement::Direction;
use crate::game::{GameHandle, Intent, IntentKind, Outbound, SessionId};
use crate::util::rate_limit::SessionRateLimiter;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let session_id: SessionId = Uuid::new_v4();
    let _connection = state.open_connection();
    info!(session_id = %session_id, "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();

    // Subscribe before the first intent can produce a reply
    let outbound_rx = state.game.subscribe();

    let walls = ServerMsg::Walls(state.game.walls().to_vec());
    if let Err(e) = send_msg(&mut ws_sink, &walls).await {
        error!(session_id = %session_id, error = %e, "Failed to send walls");
        return;
    }

    let rate_limiter = SessionRateLimiter::new(state.config.message_rate_limit);
    run_session(
        session_id,
        ws_sink,
        ws_stream,
        state.game.clone(),
        outbound_rx,
        rate_limiter,
    )
    .await;

    info!(session_id = %session_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    session_id: SessionId,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut ws_stream: SplitStream<WebSocket>,
    game: GameHandle,
    mut outbound_rx: broadcast::Receiver<Outbound>,
    rate_limiter: SessionRateLimiter,
) {
    // Writer task: game broadcasts -> WebSocket
    let writer_handle = tokio::spawn(async move {
        loop {
            match outbound_rx.recv().await {
                Ok(outbound) => {
                    if !outbound.audience.includes(&session_id) {
                        continue;
                    }
                    if let Err(e) = send_msg(&mut ws_sink, &outbound.msg).await {
                        debug!(session_id = %session_id, error = %e, "WebSocket send failed");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(
                        session_id = %session_id,
                        lagged_count = n,
                        "Client lagged, skipping {} messages", n
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(session_id = %session_id, "Outbound channel closed");
                    break;
                }
            }
        }
    });

    // Reader loop: WebSocket -> game loop
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_message() {
                    debug!(session_id = %session_id, "Rate limited inbound message");
                    continue;
                }

                let client_msg = match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!(session_id = %session_id, error = %e, "Failed to parse client message");
                        continue;
                    }
                };

                let Some(kind) = to_intent(client_msg) else {
                    debug!(session_id = %session_id, "Ignoring invalid intent");
                    continue;
                };

                if game.send(Intent { session_id, kind }).await.is_err() {
                    debug!(session_id = %session_id, "Game loop closed");
                    break;
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(session_id = %session_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(session_id = %session_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(session_id = %session_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Disconnect removes the player, if any
    let _ = game
        .send(Intent {
            session_id,
            kind: IntentKind::Leave,
        })
        .await;

    writer_handle.abort();
}

/// Map a wire message to a game intent; `None` for malformed intents
fn to_intent(msg: ClientMsg) -> Option<IntentKind> {
    match msg {
        ClientMsg::RegisterPlayer { username, color } => Some(IntentKind::Join { username, color }),
        ClientMsg::PlayerMovement { direction } => {
            direction.parse::<Direction>().ok().map(IntentKind::Move)
        }
        ClientMsg::Shoot { x, y } => {
            let aim = Vec2::new(x, y);
            aim.normalize().map(|_| IntentKind::Shoot(aim))
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum SendError {
    #[error(transparent)]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Socket(#[from] axum::Error),
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), SendError> {
    let json = serde_json::to_string(msg)?;
    sink.send(Message::Text(json)).await?;
    Ok(())
}
