//! HTTP route definitions

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::app::AppState;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;
use crate::ws::protocol::{GameDetails, GameListing};

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CLIENT_ORIGIN may list several origins; none configured means any
    let allowed_origins: Vec<HeaderValue> = state
        .config
        .client_origins
        .iter()
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    let allow_origin = if allowed_origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(allowed_origins)
    };

    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/games", get(games_handler))
        .route("/games/:id", get(game_handler))
        .route("/ws", get(ws_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_games: usize,
    players_in_games: usize,
    connected_players: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_games: state.lobby.session_count(),
        players_in_games: state.lobby.registry().player_count(),
        connected_players: state.lobby.player_count(),
    })
}

// ============================================================================
// Game listing
// ============================================================================

async fn games_handler(State(state): State<AppState>) -> Json<Vec<GameListing>> {
    Json(state.lobby.available_games())
}

async fn game_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<GameDetails>, AppError> {
    state
        .lobby
        .game(&id)
        .map(Json)
        .ok_or(AppError::NotFound(id))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Game not found: {0}")]
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        };

        let body = serde_json::json!({
            "error": self.to_string()
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, GameSettings};
    use crate::game::setup::tests::square_request;
    use tokio::sync::mpsc;

    fn state() -> AppState {
        AppState::new(Config {
            server_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "debug".into(),
            client_origins: vec![],
            game: GameSettings {
                rng_seed: Some(3),
                ..GameSettings::default()
            },
        })
    }

    #[tokio::test]
    async fn health_counts_games_and_players() {
        let state = state();
        let (tx, _rx) = mpsc::unbounded_channel();
        let host = state.lobby.connect(tx).unwrap();
        state.lobby.create_game(&host, square_request(100.0)).unwrap();

        let Json(health) = health_handler(State(state)).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.active_games, 1);
        assert_eq!(health.players_in_games, 1);
        assert_eq!(health.connected_players, 1);
    }

    #[tokio::test]
    async fn game_details_and_missing_game() {
        let state = state();
        let (tx, _rx) = mpsc::unbounded_channel();
        let host = state.lobby.connect(tx).unwrap();
        let handle = state.lobby.create_game(&host, square_request(100.0)).unwrap();

        let Json(games) = games_handler(State(state.clone())).await;
        assert_eq!(games.len(), 1);

        let details = game_handler(State(state.clone()), Path(handle.id().to_string()))
            .await
            .unwrap();
        assert_eq!(details.0.id, handle.id());

        let missing = game_handler(State(state), Path("nope".into())).await;
        assert!(matches!(missing, Err(AppError::NotFound(id)) if id == "nope"));
    }

    #[test]
    fn router_builds_with_and_without_origins() {
        let mut state = state();
        let _ = build_router(state.clone());

        let mut config = (*state.config).clone();
        config.client_origins = vec!["http://localhost:3000".into()];
        state.config = std::sync::Arc::new(config);
        let _ = build_router(state);
    }
}
