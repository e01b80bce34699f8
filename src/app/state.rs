//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::Lobby;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub lobby: Arc<Lobby>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let lobby = Arc::new(Lobby::new(config.game.clone()));

        Self {
            config: Arc::new(config),
            lobby,
        }
    }
}
