//! Lobby: connected players, game creation and routing to session actors

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{info, warn};

use super::error::{JoinError, SetupError, StartError};
use super::geometry::{GeoPoint, Location};
use super::placement::plan_layout;
use super::player::{MessageSink, Player, PlayerId};
use super::registry::SessionRegistry;
use super::rng::SharedRng;
use super::session::{GameSession, SessionHandle, StopReason};
use super::setup::SessionConfig;
use crate::config::GameSettings;
use crate::util::task::spawn_isolated;
use crate::ws::protocol::{CreateGameRequest, GameDetails, GameListing, PlayerIdentity, ServerMsg};

/// Identifier draws before giving up
pub const MAX_ID_ATTEMPTS: usize = 32;

pub struct Lobby {
    registry: Arc<SessionRegistry>,
    /// Connected players
    players: Arc<DashMap<PlayerId, Player>>,
    rng: SharedRng,
    settings: GameSettings,
}

impl Lobby {
    pub fn new(settings: GameSettings) -> Self {
        let rng = SharedRng::from_seed_option(settings.rng_seed);
        Self::with_rng(settings, rng)
    }

    pub fn with_rng(settings: GameSettings, rng: SharedRng) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new()),
            players: Arc::new(DashMap::new()),
            rng,
            settings,
        }
    }

    /// Create a player for a new connection. The id is unique among
    /// connected players and live sessions.
    pub fn connect<S: MessageSink>(&self, sink: S) -> Result<Player, SetupError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = self.rng.identifier();
            if self.registry.contains(&id) {
                continue;
            }
            if let Entry::Vacant(slot) = self.players.entry(id.clone()) {
                let player = Player::spawn(id, PlayerIdentity::default(), sink);
                slot.insert(player.clone());
                info!(player_id = %player.id(), "Player connected");
                return Ok(player);
            }
        }
        warn!("Could not allocate a player id");
        Err(SetupError::IdExhausted)
    }

    /// Set the name and icon shown to other players
    pub fn register(&self, player: &Player, identity: PlayerIdentity) {
        info!(player_id = %player.id(), name = %identity.name, "Player registered");
        player.set_identity(identity);
    }

    /// Validate the request, lay out the map and start a session hosted by
    /// `host`. Nothing is registered unless every step succeeds.
    pub fn create_game(
        &self,
        host: &Player,
        mut request: CreateGameRequest,
    ) -> Result<SessionHandle, SetupError> {
        if let Some(identity) = request.host.take() {
            if host.name().is_empty() {
                self.register(host, identity);
            }
        }

        if self.registry.membership(host.id()).is_some() || self.registry.contains(host.id()) {
            return Err(SetupError::AlreadyInGame);
        }

        let config = SessionConfig::from_request(request)?;
        let layout = plan_layout(
            &config.boundary,
            config.mode,
            config.control_points,
            self.settings.max_placement_attempts,
            &mut self.rng.fork(),
        )?;

        self.registry
            .claim_membership(host.id(), host.id())
            .map_err(|_| SetupError::AlreadyInGame)?;

        let (session, handle) = GameSession::new(
            host.clone(),
            config,
            layout,
            self.settings.clone(),
            self.rng.clone(),
            self.registry.clone(),
        );
        self.registry.insert(handle.clone());

        let session_id = handle.id().to_string();
        let actor = spawn_isolated("session", session_id.clone(), session.run());
        // Clean up after a panicked actor; a no-op after a normal exit
        let registry = self.registry.clone();
        let players = self.players.clone();
        tokio::spawn(async move {
            let _ = actor.await;
            abandon_session(&registry, &players, &session_id);
        });

        Ok(handle)
    }

    pub async fn join_game(
        &self,
        player: &Player,
        game_id: &str,
        password: String,
    ) -> Result<(), JoinError> {
        let handle = self.registry.get(game_id).ok_or(JoinError::GameNotFound)?;
        self.registry.claim_membership(player.id(), game_id)?;

        let result = handle.join(player.clone(), password).await;
        if let Err(e) = result {
            self.registry.release(player.id(), game_id);
            warn!(player_id = %player.id(), game_id = %game_id, error = %e, "Join rejected");
        }
        result
    }

    /// No-op when the player is not in a game
    pub async fn leave_game(&self, player: &Player) {
        let Some(session_id) = self.registry.membership(player.id()) else {
            return;
        };
        if let Some(handle) = self.registry.get(&session_id) {
            handle.leave(player.id().to_string()).await;
        }
        self.registry.release(player.id(), &session_id);
    }

    pub async fn start_game(&self, player: &Player) -> Result<(), StartError> {
        let handle = self
            .registry
            .membership(player.id())
            .and_then(|id| self.registry.get(&id))
            .ok_or(StartError::GameNotFound)?;
        handle.start(player.id().to_string()).await
    }

    /// Returns `false` when the game does not exist or already ended
    pub async fn stop_game(&self, game_id: &str, reason: StopReason) -> bool {
        match self.registry.get(game_id) {
            Some(handle) => handle.stop(reason).await,
            None => false,
        }
    }

    pub async fn update_location(&self, player: &Player, point: GeoPoint, orientation: f64) {
        let location = Location::from_geo(point);
        let handle = self
            .registry
            .membership(player.id())
            .and_then(|id| self.registry.get(&id));

        match handle {
            Some(handle) => {
                handle
                    .update_location(player.id().to_string(), location, orientation)
                    .await
            }
            None => player.update(|v| {
                v.location = Some(location);
                v.orientation = orientation;
            }),
        }
    }

    /// Connection gone: leave any game and stop delivery
    pub async fn disconnect(&self, player: &Player) {
        self.leave_game(player).await;
        self.players.remove(player.id());
        player.close();
        info!(player_id = %player.id(), "Player disconnected");
    }

    /// Games still accepting players, by name
    pub fn available_games(&self) -> Vec<GameListing> {
        let mut games: Vec<GameListing> = self
            .registry
            .sessions()
            .iter()
            .map(SessionHandle::summary)
            .filter(|s| s.is_open())
            .map(|s| GameListing::from(&s))
            .collect();
        games.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        games
    }

    pub fn game(&self, game_id: &str) -> Option<GameDetails> {
        self.registry
            .get(game_id)
            .map(|h| GameDetails::from(&h.summary()))
    }

    pub fn player(&self, player_id: &str) -> Option<Player> {
        self.players.get(player_id).map(|p| p.value().clone())
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn session_count(&self) -> usize {
        self.registry.session_count()
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }
}

/// Drop a session whose actor is gone without tearing down. Members are
/// reset and sent back to the lobby.
fn abandon_session(registry: &SessionRegistry, players: &DashMap<PlayerId, Player>, session_id: &str) {
    let members = registry.members(session_id);
    if registry.remove(session_id).is_none() {
        return;
    }
    warn!(
        session_id = %session_id,
        members = members.len(),
        "Removed session left behind by its actor"
    );

    for player_id in members {
        let Some(player) = players.get(&player_id).map(|p| p.value().clone()) else {
            continue;
        };
        player.reset();
        player.send(ServerMsg::Error("Game closed after an internal error".into()));
        player.send(ServerMsg::LeaveGame);
    }
}
