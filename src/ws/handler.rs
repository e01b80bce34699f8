//! WebSocket upgrade handler and command dispatch

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::game::{DeliveryError, JoinError, Lobby, MessageSink, Player};
use crate::util::rate_limit::PlayerRateLimiter;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Writes queued notifications to the socket as JSON text frames
impl MessageSink for SplitSink<WebSocket, Message> {
    async fn deliver(&mut self, msg: ServerMsg) -> Result<(), DeliveryError> {
        let json = serde_json::to_string(&msg).map_err(|e| DeliveryError::Transport(e.to_string()))?;
        self.send(Message::Text(json))
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))
    }
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (ws_sink, mut ws_stream) = socket.split();

    let player = match state.lobby.connect(ws_sink) {
        Ok(player) => player,
        Err(e) => {
            error!(error = %e, "Rejecting connection");
            return;
        }
    };
    info!(player_id = %player.id(), "New WebSocket connection");

    let rate_limiter = PlayerRateLimiter::new();

    // Reader loop: WebSocket -> lobby / session actors
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(player_id = %player.id(), "Rate limited input message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => dispatch(&state.lobby, &player, msg).await,
                    Err(e) => {
                        warn!(player_id = %player.id(), error = %e, "Failed to parse client message");
                        player.send(ServerMsg::Error(format!("Malformed message: {e}")));
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(player_id = %player.id(), "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(player_id = %player.id(), "Client initiated close");
                break;
            }
            Err(e) => {
                error!(player_id = %player.id(), error = %e, "WebSocket error");
                break;
            }
        }
    }

    state.lobby.disconnect(&player).await;
    info!(player_id = %player.id(), "WebSocket connection closed");
}

/// Route one inbound action and answer the sender where the protocol expects it
pub async fn dispatch(lobby: &Lobby, player: &Player, msg: ClientMsg) {
    debug!(player_id = %player.id(), action = msg.action(), "Client message");

    match msg {
        ClientMsg::RegisterPlayer(identity) => {
            lobby.register(player, identity);
            player.send(ServerMsg::Registered {
                player_id: player.id().to_string(),
                name: player.name(),
                icon: player.icon(),
            });
        }

        ClientMsg::CreateGame(request) => match lobby.create_game(player, request) {
            Ok(handle) => player.send(ServerMsg::GameCreated {
                game_id: handle.id().to_string(),
            }),
            Err(e) => {
                warn!(player_id = %player.id(), error = %e, "Game creation rejected");
                player.send(ServerMsg::CreateGameError(e.to_string()));
            }
        },

        ClientMsg::ShowGames {} => player.send(ServerMsg::AvailableGames(lobby.available_games())),

        ClientMsg::ShowGameInfo { game_id } => match lobby.game(&game_id) {
            Some(details) => player.send(ServerMsg::GameInfo(details)),
            None => player.send(ServerMsg::Error(JoinError::GameNotFound.to_string())),
        },

        ClientMsg::JoinGame { game_id, password } => {
            if let Err(e) = lobby.join_game(player, &game_id, password).await {
                player.send(ServerMsg::JoinGameError(e.tag().to_string()));
            }
        }

        ClientMsg::LeaveGame {} => lobby.leave_game(player).await,

        ClientMsg::StartGame {} => {
            if let Err(e) = lobby.start_game(player).await {
                warn!(player_id = %player.id(), error = %e, "Start rejected");
                player.send(ServerMsg::Error(e.to_string()));
            }
        }

        ClientMsg::LocationUpdate {
            location,
            orientation,
        } => lobby.update_location(player, location, orientation).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameSettings;
    use crate::game::rng::SharedRng;
    use crate::game::setup::tests::square_request;
    use tokio::sync::mpsc;

    fn lobby() -> Lobby {
        Lobby::with_rng(GameSettings::default(), SharedRng::seeded(11))
    }

    fn connect(lobby: &Lobby) -> (Player, mpsc::UnboundedReceiver<ServerMsg>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (lobby.connect(tx).unwrap(), rx)
    }

    fn action(json: &str) -> ClientMsg {
        serde_json::from_str(json).unwrap()
    }

    #[tokio::test]
    async fn register_echoes_identity() {
        let lobby = lobby();
        let (player, mut rx) = connect(&lobby);

        let msg = action(r#"{"Action":"RegisterPlayer","Data":{"Name":"Ana","Icon":"fox"}}"#);
        dispatch(&lobby, &player, msg).await;

        assert_eq!(
            rx.recv().await,
            Some(ServerMsg::Registered {
                player_id: player.id().to_string(),
                name: "Ana".into(),
                icon: "fox".into(),
            })
        );
    }

    #[tokio::test]
    async fn create_then_list_and_join() {
        let lobby = lobby();
        let (host, mut host_rx) = connect(&lobby);
        let (guest, mut guest_rx) = connect(&lobby);

        dispatch(&lobby, &host, ClientMsg::CreateGame(square_request(100.0))).await;
        let Some(ServerMsg::GameCreated { game_id }) = host_rx.recv().await else {
            panic!("expected GameCreated");
        };

        dispatch(&lobby, &guest, action(r#"{"Action":"ShowGames","Data":{}}"#)).await;
        match guest_rx.recv().await {
            Some(ServerMsg::AvailableGames(games)) => {
                assert_eq!(games.len(), 1);
                assert_eq!(games[0].id, game_id);
            }
            other => panic!("expected AvailableGames, got {other:?}"),
        }

        dispatch(
            &lobby,
            &guest,
            ClientMsg::JoinGame {
                game_id: game_id.clone(),
                password: String::new(),
            },
        )
        .await;
        assert!(matches!(guest_rx.recv().await, Some(ServerMsg::GameInfo(_))));
        assert_eq!(lobby.registry().membership(guest.id()), Some(game_id));
    }

    #[tokio::test]
    async fn failures_are_reported_to_the_sender() {
        let lobby = lobby();
        let (player, mut rx) = connect(&lobby);

        dispatch(
            &lobby,
            &player,
            action(r#"{"Action":"JoinGame","Data":{"GameID":"nope"}}"#),
        )
        .await;
        assert_eq!(
            rx.recv().await,
            Some(ServerMsg::JoinGameError("GameNotFound".into()))
        );

        dispatch(&lobby, &player, action(r#"{"Action":"StartGame","Data":{}}"#)).await;
        assert!(matches!(rx.recv().await, Some(ServerMsg::Error(_))));

        dispatch(
            &lobby,
            &player,
            action(r#"{"Action":"ShowGameInfo","Data":{"GameID":"nope"}}"#),
        )
        .await;
        assert!(matches!(rx.recv().await, Some(ServerMsg::Error(_))));

        let mut request = square_request(100.0);
        request.boundaries.truncate(2);
        dispatch(&lobby, &player, ClientMsg::CreateGame(request)).await;
        assert!(matches!(rx.recv().await, Some(ServerMsg::CreateGameError(_))));
        assert_eq!(lobby.session_count(), 0);
    }
}
