//! Session state and the actor that owns it
//!
//! A session moves `Creating → Playing → GameOver` and never back. All of
//! its mutable state lives inside [`GameSession`], which runs as a single
//! task and processes [`SessionCommand`]s one at a time. Everything else
//! (connection handlers, timers, objective tickers) talks to it through a
//! [`SessionHandle`], and reads its public summary from a watch channel.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::error::{JoinError, StartError};
use super::geometry::{distance, GeoPoint, Location};
use super::objective::{spawn_ticker, ControlPoint};
use super::pickup::{Pickup, PickupSpot};
use super::placement::{Layout, PayloadRoute, PICKUP_RADIUS};
use super::player::{Player, PlayerId, PlayerStatus, MAX_ARMOR, MAX_HEALTH};
use super::registry::SessionRegistry;
use super::rng::SharedRng;
use super::setup::{GameMode, SessionConfig};
use super::team::{Team, TeamColor};
use crate::config::GameSettings;
use crate::util::task::spawn_isolated;
use crate::ws::protocol::{
    BaseInfo, GameDetails, GameStartInfo, GameUpdate, ObjectiveInfo, ObjectiveState, PickupInfo,
    PickupUpdate, PlayerInfo, PlayerPosition, Points, ServerMsg, TeamAssignment, Vitals,
};

/// Command queue depth per session
pub const COMMAND_CAPACITY: usize = 256;
/// How far beyond a pickup's radius a player can grab it (meters)
pub const PLAYER_REACH: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Accepting joins
    Creating,
    Playing,
    /// Terminal
    GameOver,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionStatus::Creating => "Creating",
            SessionStatus::Playing => "Playing",
            SessionStatus::GameOver => "GameOver",
        })
    }
}

/// Why a game ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    TimeLimit,
    PointLimit(TeamColor),
    PayloadDelivered,
    /// Ended from outside (operator or shutdown)
    Requested,
}

/// Read-only view published on every state change
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub mode: GameMode,
    pub status: SessionStatus,
    pub countdown_started: bool,
    pub player_limit: u32,
    pub point_limit: Option<u32>,
    pub time_limit: Duration,
    pub has_password: bool,
    /// Center of the play area, in degrees
    pub center: GeoPoint,
    pub boundaries: Vec<GeoPoint>,
    pub roster: Vec<PlayerInfo>,
}

impl SessionSummary {
    /// Open for joining
    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Creating
            && !self.countdown_started
            && self.roster.len() < self.player_limit as usize
    }
}

/// Full internal state, for inspection in tests and diagnostics
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub summary: SessionSummary,
    pub host: PlayerId,
    pub red: Team,
    pub blue: Team,
    /// Roster in join order with each player's team
    pub assignments: Vec<(PlayerId, Option<TeamColor>)>,
    pub control_points: BTreeMap<String, ControlPoint>,
    pub pickups: Vec<PickupSpot>,
    pub payload: Option<PayloadRoute>,
    pub activated_at: Option<Instant>,
    /// When the duration timer fires
    pub deadline: Option<Instant>,
    pub tickers: usize,
}

pub enum SessionCommand {
    Join {
        player: Player,
        password: String,
        reply: oneshot::Sender<Result<(), JoinError>>,
    },
    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<()>,
    },
    Start {
        requested_by: PlayerId,
        reply: oneshot::Sender<Result<(), StartError>>,
    },
    /// Countdown elapsed
    Activate,
    TickPoint {
        point_id: String,
    },
    BroadcastUpdate,
    LocationUpdate {
        player_id: PlayerId,
        location: Location,
        orientation: f64,
    },
    RespawnPickup {
        index: usize,
    },
    Stop {
        reason: StopReason,
        /// `true` when this command ended the game
        reply: Option<oneshot::Sender<bool>>,
    },
    Inspect {
        reply: oneshot::Sender<SessionSnapshot>,
    },
}

/// Handle to a running session
#[derive(Clone, Debug)]
pub struct SessionHandle {
    id: String,
    commands: mpsc::Sender<SessionCommand>,
    summary: watch::Receiver<SessionSummary>,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn summary(&self) -> SessionSummary {
        self.summary.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.summary.borrow().status
    }

    pub async fn join(&self, player: Player, password: String) -> Result<(), JoinError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(SessionCommand::Join {
                player,
                password,
                reply,
            })
            .await
            .map_err(|_| JoinError::GameStarted)?;
        // Actor went away mid-request: the game is over
        rx.await.unwrap_or(Err(JoinError::GameStarted))
    }

    pub async fn leave(&self, player_id: PlayerId) {
        let (reply, rx) = oneshot::channel();
        if self
            .commands
            .send(SessionCommand::Leave { player_id, reply })
            .await
            .is_ok()
        {
            let _ = rx.await;
        }
    }

    pub async fn start(&self, requested_by: PlayerId) -> Result<(), StartError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(SessionCommand::Start {
                requested_by,
                reply,
            })
            .await
            .map_err(|_| StartError::GameNotFound)?;
        rx.await.unwrap_or(Err(StartError::GameNotFound))
    }

    pub async fn update_location(&self, player_id: PlayerId, location: Location, orientation: f64) {
        let _ = self
            .commands
            .send(SessionCommand::LocationUpdate {
                player_id,
                location,
                orientation,
            })
            .await;
    }

    /// End the game. Returns `false` when it had already ended.
    pub async fn stop(&self, reason: StopReason) -> bool {
        let (reply, rx) = oneshot::channel();
        let cmd = SessionCommand::Stop {
            reason,
            reply: Some(reply),
        };
        if self.commands.send(cmd).await.is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// `None` once the session has ended
    pub async fn snapshot(&self) -> Option<SessionSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(SessionCommand::Inspect { reply })
            .await
            .ok()?;
        rx.await.ok()
    }
}

#[derive(Default)]
struct Timers {
    countdown: Option<JoinHandle<()>>,
    duration: Option<JoinHandle<()>>,
    broadcaster: Option<JoinHandle<()>>,
    tickers: Vec<JoinHandle<()>>,
    respawns: HashMap<usize, JoinHandle<()>>,
}

impl Timers {
    /// Tickers are left running; they exit on the `GameOver` summary.
    fn abort_all(&mut self) {
        let handles = [
            self.countdown.take(),
            self.duration.take(),
            self.broadcaster.take(),
        ];
        for handle in handles.into_iter().flatten() {
            handle.abort();
        }
        for (_, handle) in self.respawns.drain() {
            handle.abort();
        }
    }
}

/// The authoritative session actor
pub struct GameSession {
    id: String,
    host: PlayerId,
    config: SessionConfig,
    settings: GameSettings,
    status: SessionStatus,
    countdown_started: bool,
    roster: Vec<Player>,
    red: Team,
    blue: Team,
    control_points: BTreeMap<String, ControlPoint>,
    pickups: Vec<PickupSpot>,
    payload: Option<PayloadRoute>,
    activated_at: Option<Instant>,
    deadline: Option<Instant>,
    timers: Timers,
    rng: SharedRng,
    registry: Arc<SessionRegistry>,
    commands: mpsc::WeakSender<SessionCommand>,
    command_rx: mpsc::Receiver<SessionCommand>,
    summary_tx: watch::Sender<SessionSummary>,
}

impl GameSession {
    /// Build the actor for a validated config and a generated layout.
    /// The host is the first roster member; the session id is the host id.
    pub fn new(
        host: Player,
        config: SessionConfig,
        layout: Layout,
        settings: GameSettings,
        rng: SharedRng,
        registry: Arc<SessionRegistry>,
    ) -> (Self, SessionHandle) {
        let id = host.id().to_string();
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);

        let (summary_tx, _) = watch::channel(summary_of(
            &id,
            &config,
            SessionStatus::Creating,
            false,
            std::slice::from_ref(&host),
        ));

        let bases = layout.bases;
        let session = Self {
            id: id.clone(),
            host: id.clone(),
            config,
            settings,
            status: SessionStatus::Creating,
            countdown_started: false,
            roster: vec![host],
            red: Team::new(TeamColor::Red, bases.red, bases.radius),
            blue: Team::new(TeamColor::Blue, bases.blue, bases.radius),
            control_points: layout.control_points,
            pickups: layout.pickups,
            payload: layout.payload,
            activated_at: None,
            deadline: None,
            timers: Timers::default(),
            rng,
            registry,
            commands: command_tx.downgrade(),
            command_rx,
            summary_tx,
        };

        let handle = SessionHandle {
            id,
            commands: command_tx,
            summary: session.summary_tx.subscribe(),
        };
        (session, handle)
    }

    /// Process commands until the game ends or every handle is dropped
    pub async fn run(mut self) {
        info!(
            session_id = %self.id,
            mode = %self.config.mode,
            control_points = self.control_points.len(),
            pickups = self.pickups.len(),
            "Session created"
        );

        while let Some(cmd) = self.command_rx.recv().await {
            if self.handle_command(cmd).is_break() {
                break;
            }
        }

        debug!(session_id = %self.id, "Session actor stopped");
    }

    fn handle_command(&mut self, cmd: SessionCommand) -> ControlFlow<()> {
        match cmd {
            SessionCommand::Join {
                player,
                password,
                reply,
            } => {
                let result = self.handle_join(player, &password);
                let _ = reply.send(result);
            }
            SessionCommand::Leave { player_id, reply } => {
                let flow = self.handle_leave(&player_id);
                let _ = reply.send(());
                return flow;
            }
            SessionCommand::Start {
                requested_by,
                reply,
            } => {
                let result = self.handle_start(&requested_by);
                let _ = reply.send(result);
            }
            SessionCommand::Activate => self.activate(),
            SessionCommand::TickPoint { point_id } => return self.tick_point(&point_id),
            SessionCommand::BroadcastUpdate => {
                if self.status == SessionStatus::Playing {
                    self.broadcast(ServerMsg::GameUpdate(self.game_update()));
                }
            }
            SessionCommand::LocationUpdate {
                player_id,
                location,
                orientation,
            } => self.handle_location(&player_id, location, orientation),
            SessionCommand::RespawnPickup { index } => self.respawn_pickup(index),
            SessionCommand::Stop { reason, reply } => {
                let stopped = self.stop(reason);
                if let Some(reply) = reply {
                    let _ = reply.send(stopped);
                }
                return ControlFlow::Break(());
            }
            SessionCommand::Inspect { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
        ControlFlow::Continue(())
    }

    fn handle_join(&mut self, player: Player, password: &str) -> Result<(), JoinError> {
        if self.roster.iter().any(|p| p.id() == player.id()) {
            return Err(JoinError::AlreadyInGame);
        }
        if self.status != SessionStatus::Creating || self.countdown_started {
            return Err(JoinError::GameStarted);
        }
        if self.roster.len() >= self.config.player_limit as usize {
            return Err(JoinError::GameFull);
        }
        if !self.config.password.is_empty() && password != self.config.password {
            return Err(JoinError::WrongPassword);
        }

        info!(
            session_id = %self.id,
            player_id = %player.id(),
            player_count = self.roster.len() + 1,
            "Player joined session"
        );

        self.roster.push(player.clone());
        self.publish();
        player.send(ServerMsg::GameInfo(GameDetails::from(&*self.summary_tx.borrow())));
        self.broadcast_roster();
        Ok(())
    }

    fn handle_leave(&mut self, player_id: &str) -> ControlFlow<()> {
        if player_id == self.host {
            info!(session_id = %self.id, "Host left, closing session");
            self.teardown(None);
            return ControlFlow::Break(());
        }

        let Some(index) = self.roster.iter().position(|p| p.id() == player_id) else {
            return ControlFlow::Continue(());
        };
        let player = self.roster.remove(index);
        player.reset();
        self.registry.release(player_id, &self.id);
        for cp in self.control_points.values_mut() {
            cp.occupants.retain(|id| id != player_id);
        }

        info!(session_id = %self.id, player_id = %player_id, "Player left session");
        self.publish();
        self.broadcast_roster();
        ControlFlow::Continue(())
    }

    fn handle_start(&mut self, requested_by: &str) -> Result<(), StartError> {
        if requested_by != self.host {
            return Err(StartError::NotHost);
        }
        if self.status != SessionStatus::Creating || self.countdown_started {
            return Err(StartError::AlreadyStarted);
        }
        self.countdown_started = true;

        let mut order = self.roster.clone();
        self.rng.shuffle(&mut order);
        let red_count = order.len() / 2;
        for (i, player) in order.iter().enumerate() {
            let team = if i < red_count {
                TeamColor::Red
            } else {
                TeamColor::Blue
            };
            player.update(|v| v.team = Some(team));
        }

        let start_time = Utc::now()
            + chrono::Duration::from_std(self.settings.countdown)
                .unwrap_or_else(|_| chrono::Duration::zero());
        let info = self.start_info(start_time.to_rfc3339_opts(SecondsFormat::Secs, true));
        self.broadcast(ServerMsg::GameStartInfo(info));

        if let Some(commands) = self.commands.upgrade() {
            let countdown = self.settings.countdown;
            self.timers.countdown = Some(spawn_isolated("countdown", self.id.clone(), async move {
                sleep(countdown).await;
                let _ = commands.send(SessionCommand::Activate).await;
            }));
        }

        info!(
            session_id = %self.id,
            red = red_count,
            blue = order.len() - red_count,
            countdown_secs = self.settings.countdown.as_secs(),
            "Game starting"
        );
        self.publish();
        Ok(())
    }

    fn activate(&mut self) {
        if self.status != SessionStatus::Creating {
            return;
        }
        let Some(commands) = self.commands.upgrade() else {
            return;
        };

        self.status = SessionStatus::Playing;
        self.timers.countdown = None;
        let now = Instant::now();
        let time_limit = self.config.time_limit;
        self.activated_at = Some(now);
        self.deadline = now.checked_add(time_limit);

        // Publish first so tickers start from a Playing summary
        self.publish();

        let duration_commands = commands.clone();
        self.timers.duration = Some(spawn_isolated("duration_timer", self.id.clone(), async move {
            sleep(time_limit).await;
            let _ = duration_commands
                .send(SessionCommand::Stop {
                    reason: StopReason::TimeLimit,
                    reply: None,
                })
                .await;
        }));

        for point_id in self.control_points.keys() {
            self.timers.tickers.push(spawn_ticker(
                self.id.clone(),
                point_id.clone(),
                self.settings.objective_tick,
                commands.clone(),
                self.summary_tx.subscribe(),
            ));
        }

        let period = self.settings.game_update;
        self.timers.broadcaster = Some(spawn_isolated("game_update", self.id.clone(), async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if commands.send(SessionCommand::BroadcastUpdate).await.is_err() {
                    break;
                }
            }
        }));

        info!(
            session_id = %self.id,
            time_limit_secs = time_limit.as_secs(),
            "Game active"
        );
    }

    fn tick_point(&mut self, point_id: &str) -> ControlFlow<()> {
        if self.status != SessionStatus::Playing {
            return ControlFlow::Continue(());
        }

        let occupants = self.occupants_of(point_id);
        let Some(cp) = self.control_points.get_mut(point_id) else {
            warn!(session_id = %self.id, point_id = %point_id, "Tick for unknown control point");
            return ControlFlow::Continue(());
        };

        let red = occupants.iter().filter(|(_, t)| *t == TeamColor::Red).count();
        let blue = occupants.len() - red;
        cp.occupants = occupants.into_iter().map(|(id, _)| id).collect();

        // The payload is escorted, never captured
        if self.config.mode != GameMode::Payload {
            if let Some(team) = cp.evaluate(red, blue) {
                info!(session_id = %self.id, point_id = %point_id, team = team.name(), "Control point captured");
            }
        }

        match self.config.mode {
            GameMode::SingleCap | GameMode::MultiCap => {
                let Some(owner) = cp.belongs_to else {
                    return ControlFlow::Continue(());
                };
                let team = self.team_mut(owner);
                team.points += 1;
                let points = team.points;
                if self.config.point_limit.is_some_and(|limit| points >= limit) {
                    self.stop(StopReason::PointLimit(owner));
                    return ControlFlow::Break(());
                }
            }
            GameMode::Payload => {
                let Some(route) = self.payload else {
                    return ControlFlow::Continue(());
                };
                if red > 0 && blue == 0 {
                    let step = route.speed * self.settings.objective_tick.as_secs_f64();
                    let remaining = distance(cp.location, route.destination);
                    cp.location = if remaining <= step {
                        route.destination
                    } else {
                        cp.location.step_towards(route.direction, step)
                    };
                }
                if distance(cp.location, self.blue.base) <= self.blue.base_radius {
                    self.stop(StopReason::PayloadDelivered);
                    return ControlFlow::Break(());
                }
            }
        }
        ControlFlow::Continue(())
    }

    /// Normal, team-assigned players inside the point's radius
    fn occupants_of(&self, point_id: &str) -> Vec<(PlayerId, TeamColor)> {
        let Some(cp) = self.control_points.get(point_id) else {
            return Vec::new();
        };
        self.roster
            .iter()
            .filter_map(|p| {
                let v = p.vitals();
                match (v.team, v.location) {
                    (Some(team), Some(loc)) if v.status == PlayerStatus::Normal && cp.covers(loc) => {
                        Some((p.id().to_string(), team))
                    }
                    _ => None,
                }
            })
            .collect()
    }

    fn handle_location(&mut self, player_id: &str, location: Location, orientation: f64) {
        let Some(player) = self.roster.iter().find(|p| p.id() == player_id).cloned() else {
            debug!(session_id = %self.id, player_id = %player_id, "Location from non-member");
            return;
        };

        let status = if self.config.boundary.contains(location) {
            PlayerStatus::Normal
        } else {
            PlayerStatus::OutOfBounds
        };
        let occupying = self
            .control_points
            .values()
            .find(|cp| cp.covers(location))
            .map(|cp| cp.id.clone());

        let (changed, team) = player.update(|v| {
            v.location = Some(location);
            v.orientation = orientation;
            v.occupying = occupying;
            let changed = v.status != status;
            v.status = status;
            (changed, v.team)
        });

        if changed {
            debug!(session_id = %self.id, player_id = %player_id, ?status, "Player status changed");
            player.send(ServerMsg::StatusUpdate(status));
        }

        if self.status == SessionStatus::Playing && status == PlayerStatus::Normal && team.is_some() {
            self.collect_pickup(&player, location);
        }
    }

    fn collect_pickup(&mut self, player: &Player, location: Location) {
        let reach = PICKUP_RADIUS + PLAYER_REACH;
        let Some(index) = self
            .pickups
            .iter()
            .position(|s| s.available && distance(s.location, location) <= reach)
        else {
            return;
        };

        let spot = &mut self.pickups[index];
        spot.available = false;
        let pickup = spot.pickup;
        let spot_location = spot.location;

        match pickup {
            Pickup::Health(amount) => {
                let vitals = player.update(|v| {
                    v.health = (v.health + amount).min(MAX_HEALTH);
                    Vitals {
                        health: v.health,
                        armor: v.armor,
                    }
                });
                player.send(ServerMsg::VitalsUpdate(vitals));
            }
            Pickup::Armor(amount) => {
                let vitals = player.update(|v| {
                    v.armor = (v.armor + amount).min(MAX_ARMOR);
                    Vitals {
                        health: v.health,
                        armor: v.armor,
                    }
                });
                player.send(ServerMsg::VitalsUpdate(vitals));
            }
            Pickup::Weapon(weapon) => {
                player.update(|v| v.weapons.insert(weapon));
                player.send(ServerMsg::AcquireWeapon(weapon));
            }
        }

        debug!(
            session_id = %self.id,
            player_id = %player.id(),
            pickup = pickup.type_name(),
            "Pickup collected"
        );
        self.broadcast(ServerMsg::PickupUpdate(PickupUpdate {
            location: spot_location.to_geo(),
            available: false,
        }));

        if let Some(commands) = self.commands.upgrade() {
            let delay = self.settings.pickup_respawn;
            let handle = spawn_isolated("pickup_respawn", self.id.clone(), async move {
                sleep(delay).await;
                let _ = commands.send(SessionCommand::RespawnPickup { index }).await;
            });
            if let Some(previous) = self.timers.respawns.insert(index, handle) {
                previous.abort();
            }
        }
    }

    fn respawn_pickup(&mut self, index: usize) {
        self.timers.respawns.remove(&index);
        if self.status != SessionStatus::Playing {
            return;
        }
        let Some(spot) = self.pickups.get_mut(index) else {
            return;
        };
        spot.available = true;
        let location = spot.location.to_geo();
        self.broadcast(ServerMsg::PickupUpdate(PickupUpdate {
            location,
            available: true,
        }));
    }

    /// End the game. Returns `false` when it had already ended.
    fn stop(&mut self, reason: StopReason) -> bool {
        if self.status == SessionStatus::GameOver {
            return false;
        }
        let winner = self.winner(reason);
        info!(
            session_id = %self.id,
            ?reason,
            winner = %winner,
            red_points = self.red.points,
            blue_points = self.blue.points,
            "Game over"
        );
        self.teardown(Some(winner));
        true
    }

    /// Move to `GameOver`, cancel timers, release every player and leave the
    /// registry. With a winner everyone gets `Gameover`; without one (host
    /// left) everyone but the host gets `LeaveGame`.
    fn teardown(&mut self, winner: Option<String>) {
        self.status = SessionStatus::GameOver;
        self.publish();
        self.timers.abort_all();

        for player in self.roster.drain(..) {
            player.reset();
            self.registry.release(player.id(), &self.id);
            match &winner {
                Some(winner) => player.send(ServerMsg::Gameover(winner.clone())),
                None if player.id() != self.host => player.send(ServerMsg::LeaveGame),
                None => {}
            }
        }

        self.registry.remove(&self.id);
    }

    fn winner(&self, reason: StopReason) -> String {
        let by_score = || match self.red.points.cmp(&self.blue.points) {
            std::cmp::Ordering::Greater => TeamColor::Red.name().to_string(),
            std::cmp::Ordering::Less => TeamColor::Blue.name().to_string(),
            std::cmp::Ordering::Equal => "Draw".to_string(),
        };

        match (reason, self.config.mode) {
            (StopReason::PointLimit(team), _) => team.name().to_string(),
            (StopReason::PayloadDelivered, _) => TeamColor::Red.name().to_string(),
            // Defenders win when the payload never arrives
            (StopReason::TimeLimit, GameMode::Payload) => TeamColor::Blue.name().to_string(),
            (StopReason::Requested, GameMode::Payload) => "Draw".to_string(),
            (StopReason::TimeLimit | StopReason::Requested, _) => by_score(),
        }
    }

    fn team_mut(&mut self, color: TeamColor) -> &mut Team {
        match color {
            TeamColor::Red => &mut self.red,
            TeamColor::Blue => &mut self.blue,
        }
    }

    fn broadcast(&self, msg: ServerMsg) {
        for player in &self.roster {
            player.send(msg.clone());
        }
    }

    fn broadcast_roster(&self) {
        let roster = self.roster.iter().map(Player::info).collect();
        self.broadcast(ServerMsg::PlayerListUpdate(roster));
    }

    fn publish(&self) {
        self.summary_tx.send_replace(self.summary());
    }

    fn summary(&self) -> SessionSummary {
        summary_of(
            &self.id,
            &self.config,
            self.status,
            self.countdown_started,
            &self.roster,
        )
    }

    fn start_info(&self, start_time: String) -> GameStartInfo {
        GameStartInfo {
            player_list: self
                .roster
                .iter()
                .filter_map(|p| {
                    p.vitals().team.map(|team| TeamAssignment {
                        name: p.name(),
                        team,
                    })
                })
                .collect(),
            objectives: self
                .control_points
                .values()
                .map(|cp| ObjectiveInfo {
                    id: cp.id.clone(),
                    location: cp.location.to_geo(),
                    radius: cp.radius,
                })
                .collect(),
            pickups: self
                .pickups
                .iter()
                .map(|s| PickupInfo {
                    location: s.location.to_geo(),
                    kind: s.pickup.type_name().to_string(),
                    amount: s.pickup.amount(),
                    weapon: match s.pickup {
                        Pickup::Weapon(w) => Some(w),
                        _ => None,
                    },
                    available: s.available,
                })
                .collect(),
            red_base: BaseInfo {
                location: self.red.base.to_geo(),
                radius: self.red.base_radius,
            },
            blue_base: BaseInfo {
                location: self.blue.base.to_geo(),
                radius: self.blue.base_radius,
            },
            start_time,
        }
    }

    fn game_update(&self) -> GameUpdate {
        let name_of = |id: &PlayerId| {
            self.roster
                .iter()
                .find(|p| p.id() == id)
                .map(Player::name)
                .unwrap_or_default()
        };

        GameUpdate {
            player_list: self
                .roster
                .iter()
                .map(|p| {
                    let v = p.vitals();
                    PlayerPosition {
                        name: p.name(),
                        team: v.team,
                        location: v.location.map(Location::to_geo),
                        orientation: v.orientation,
                    }
                })
                .collect(),
            points: Points {
                red: self.red.points,
                blue: self.blue.points,
            },
            objectives: self
                .control_points
                .values()
                .map(|cp| ObjectiveState {
                    id: cp.id.clone(),
                    location: cp.location.to_geo(),
                    occupying: cp.occupants.iter().map(&name_of).collect(),
                    belongs_to: cp
                        .belongs_to
                        .map(|t| t.name().to_string())
                        .unwrap_or_else(|| "Neutral".to_string()),
                    progress: cp.progress,
                })
                .collect(),
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            summary: self.summary(),
            host: self.host.clone(),
            red: self.red.clone(),
            blue: self.blue.clone(),
            assignments: self
                .roster
                .iter()
                .map(|p| (p.id().to_string(), p.vitals().team))
                .collect(),
            control_points: self.control_points.clone(),
            pickups: self.pickups.clone(),
            payload: self.payload,
            activated_at: self.activated_at,
            deadline: self.deadline,
            tickers: self.timers.tickers.iter().filter(|t| !t.is_finished()).count(),
        }
    }
}

fn summary_of(
    id: &str,
    config: &SessionConfig,
    status: SessionStatus,
    countdown_started: bool,
    roster: &[Player],
) -> SessionSummary {
    SessionSummary {
        id: id.to_string(),
        name: config.name.clone(),
        description: config.description.clone(),
        mode: config.mode,
        status,
        countdown_started,
        player_limit: config.player_limit,
        point_limit: config.point_limit,
        time_limit: config.time_limit,
        has_password: !config.password.is_empty(),
        center: config.boundary.find_center().to_geo(),
        boundaries: config.geo_boundary.clone(),
        roster: roster.iter().map(Player::info).collect(),
    }
}
