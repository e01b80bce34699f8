//! Connected players and their outbound delivery
//!
//! Every player owns a bounded queue of outbound messages and a forwarding
//! task that drains it into a [`MessageSink`] (the WebSocket writer in
//! production, a channel in tests). Messages reach the sink in the order
//! they were queued. Closing the player drops the queue sender, which lets
//! the forwarder flush what is left and exit.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::geometry::Location;
use super::pickup::Weapon;
use super::team::TeamColor;
use crate::util::task::spawn_isolated;
use crate::ws::protocol::{PlayerIdentity, PlayerInfo, ServerMsg};

pub type PlayerId = String;

pub const MAX_HEALTH: u32 = 100;
pub const MAX_ARMOR: u32 = 100;
/// Outbound queue depth per player
pub const OUTBOUND_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlayerStatus {
    Normal,
    OutOfBounds,
}

/// In-game state, reset when a game ends
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerVitals {
    pub team: Option<TeamColor>,
    pub status: PlayerStatus,
    pub health: u32,
    pub armor: u32,
    pub selected_weapon: Weapon,
    pub weapons: BTreeSet<Weapon>,
    pub location: Option<Location>,
    pub orientation: f64,
    /// Control point the player is standing in
    pub occupying: Option<String>,
}

impl Default for PlayerVitals {
    fn default() -> Self {
        Self {
            team: None,
            status: PlayerStatus::Normal,
            health: MAX_HEALTH,
            armor: 0,
            selected_weapon: Weapon::DEFAULT,
            weapons: BTreeSet::from([Weapon::DEFAULT]),
            location: None,
            orientation: 0.0,
            occupying: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Connection closed")]
    Closed,

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Destination of a player's outbound messages
pub trait MessageSink: Send + 'static {
    fn deliver(&mut self, msg: ServerMsg) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

impl MessageSink for mpsc::UnboundedSender<ServerMsg> {
    async fn deliver(&mut self, msg: ServerMsg) -> Result<(), DeliveryError> {
        self.send(msg).map_err(|_| DeliveryError::Closed)
    }
}

/// Shared handle to a connected player
#[derive(Clone)]
pub struct Player {
    inner: Arc<PlayerInner>,
}

struct PlayerInner {
    id: PlayerId,
    identity: Mutex<PlayerIdentity>,
    vitals: Mutex<PlayerVitals>,
    outbound: Mutex<Option<mpsc::Sender<ServerMsg>>>,
}

impl Player {
    /// Create a player and start its forwarding task
    pub fn spawn<S: MessageSink>(id: PlayerId, identity: PlayerIdentity, sink: S) -> Self {
        let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
        spawn_isolated("player_forwarder", id.clone(), forward(id.clone(), rx, sink));

        Self {
            inner: Arc::new(PlayerInner {
                id,
                identity: Mutex::new(identity),
                vitals: Mutex::new(PlayerVitals::default()),
                outbound: Mutex::new(Some(tx)),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn name(&self) -> String {
        self.inner.identity.lock().name.clone()
    }

    pub fn icon(&self) -> String {
        self.inner.identity.lock().icon.clone()
    }

    pub fn set_identity(&self, identity: PlayerIdentity) {
        *self.inner.identity.lock() = identity;
    }

    /// Roster entry
    pub fn info(&self) -> PlayerInfo {
        let identity = self.inner.identity.lock();
        PlayerInfo {
            name: identity.name.clone(),
            icon: identity.icon.clone(),
        }
    }

    /// Queue a message without waiting. Dropped with a warning when the
    /// queue is full; silently ignored once the player is closed.
    pub fn send(&self, msg: ServerMsg) {
        let outbound = self.inner.outbound.lock();
        let Some(tx) = outbound.as_ref() else {
            return;
        };

        match tx.try_send(msg) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(msg)) => {
                warn!(
                    player_id = %self.inner.id,
                    msg_type = msg.type_name(),
                    "Outbound queue full, dropping message"
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(player_id = %self.inner.id, "Forwarder gone, dropping message");
            }
        }
    }

    /// Stop accepting messages. The forwarder flushes the queue and exits.
    pub fn close(&self) {
        self.inner.outbound.lock().take();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.outbound.lock().is_none()
    }

    pub fn vitals(&self) -> PlayerVitals {
        self.inner.vitals.lock().clone()
    }

    pub fn update<T>(&self, f: impl FnOnce(&mut PlayerVitals) -> T) -> T {
        f(&mut self.inner.vitals.lock())
    }

    /// Back to defaults after a game. Owned weapons are kept.
    pub fn reset(&self) {
        let mut vitals = self.inner.vitals.lock();
        let weapons = std::mem::take(&mut vitals.weapons);
        *vitals = PlayerVitals {
            weapons,
            ..PlayerVitals::default()
        };
        vitals.weapons.insert(Weapon::DEFAULT);
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player").field("id", &self.inner.id).finish()
    }
}

async fn forward<S: MessageSink>(player_id: PlayerId, mut rx: mpsc::Receiver<ServerMsg>, mut sink: S) {
    while let Some(msg) = rx.recv().await {
        if let Err(e) = sink.deliver(msg).await {
            debug!(player_id = %player_id, error = %e, "Delivery failed, stopping forwarder");
            break;
        }
    }
    debug!(player_id = %player_id, "Forwarder stopped");
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Player whose messages land in the returned receiver
    pub(crate) fn test_player(id: &str) -> (Player, mpsc::UnboundedReceiver<ServerMsg>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let identity = PlayerIdentity {
            name: format!("{id}-name"),
            icon: "icon".into(),
        };
        (Player::spawn(id.to_string(), identity, tx), rx)
    }

    #[tokio::test]
    async fn delivers_in_order() {
        let (player, mut rx) = test_player("p1");
        for i in 0..50 {
            player.send(ServerMsg::Error(i.to_string()));
        }
        for i in 0..50 {
            assert_eq!(rx.recv().await, Some(ServerMsg::Error(i.to_string())));
        }
    }

    #[tokio::test]
    async fn forwarder_ends_after_close() {
        let (player, mut rx) = test_player("p1");
        player.send(ServerMsg::LeaveGame);
        player.close();
        player.send(ServerMsg::Error("late".into()));

        assert_eq!(rx.recv().await, Some(ServerMsg::LeaveGame));
        // Sink dropped with the forwarder
        assert_eq!(rx.recv().await, None);
        assert!(player.is_closed());
    }

    #[tokio::test]
    async fn reset_keeps_identity_and_weapons() {
        let (player, _rx) = test_player("p1");
        player.update(|v| {
            v.team = Some(TeamColor::Red);
            v.health = 40;
            v.armor = 30;
            v.status = PlayerStatus::OutOfBounds;
            v.weapons.insert(Weapon::Rifle);
            v.selected_weapon = Weapon::Rifle;
            v.location = Some(Location::new(1.0, 2.0));
            v.occupying = Some("CP1".into());
        });

        player.reset();

        let vitals = player.vitals();
        assert_eq!(vitals.team, None);
        assert_eq!(vitals.health, MAX_HEALTH);
        assert_eq!(vitals.armor, 0);
        assert_eq!(vitals.status, PlayerStatus::Normal);
        assert_eq!(vitals.selected_weapon, Weapon::Sword);
        assert_eq!(vitals.location, None);
        assert_eq!(vitals.occupying, None);
        assert!(vitals.weapons.contains(&Weapon::Rifle));
        assert_eq!(player.name(), "p1-name");
    }
}
