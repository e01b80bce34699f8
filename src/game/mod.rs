//! Game core: geometry, map generation, players and session actors

pub mod error;
pub mod geometry;
pub mod lobby;
pub mod objective;
pub mod pickup;
pub mod placement;
pub mod player;
pub mod registry;
pub mod rng;
pub mod session;
pub mod setup;
pub mod team;

pub use error::JoinError;
pub use lobby::Lobby;
pub use player::{DeliveryError, MessageSink, Player};
