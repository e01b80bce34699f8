//! Control points and the per-point ticker task

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

use super::geometry::{distance, Location};
use super::player::PlayerId;
use super::session::{SessionCommand, SessionStatus, SessionSummary};
use super::team::TeamColor;
use crate::util::task::spawn_isolated;

/// Capture progress gained per occupant per tick
pub const CAPTURE_STEP: u32 = 10;
/// Progress at which a point changes hands
pub const CAPTURE_THRESHOLD: u32 = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct ControlPoint {
    pub id: String,
    pub location: Location,
    pub radius: f64,
    pub belongs_to: Option<TeamColor>,
    /// Team currently building up `progress`
    pub capturing: Option<TeamColor>,
    pub progress: u32,
    pub occupants: Vec<PlayerId>,
}

impl ControlPoint {
    pub fn new(id: impl Into<String>, location: Location, radius: f64) -> Self {
        Self {
            id: id.into(),
            location,
            radius,
            belongs_to: None,
            capturing: None,
            progress: 0,
            occupants: Vec::new(),
        }
    }

    pub fn covers(&self, loc: Location) -> bool {
        distance(self.location, loc) <= self.radius
    }

    /// Apply one tick with the given occupant counts.
    /// Returns the team that captured the point on this tick, if any.
    pub fn evaluate(&mut self, red: usize, blue: usize) -> Option<TeamColor> {
        match (red > 0, blue > 0) {
            (true, false) => self.advance(TeamColor::Red, red),
            (false, true) => self.advance(TeamColor::Blue, blue),
            // Contested or empty: frozen
            _ => None,
        }
    }

    fn advance(&mut self, team: TeamColor, count: usize) -> Option<TeamColor> {
        if self.belongs_to == Some(team) {
            self.progress = self.progress.saturating_sub(CAPTURE_STEP);
            if self.progress == 0 {
                self.capturing = None;
            }
            return None;
        }

        if self.capturing != Some(team) {
            self.capturing = Some(team);
            self.progress = 0;
        }

        self.progress = self.progress.saturating_add(CAPTURE_STEP * count as u32);
        if self.progress >= CAPTURE_THRESHOLD {
            self.belongs_to = Some(team);
            self.capturing = None;
            self.progress = 0;
            return Some(team);
        }
        None
    }
}

/// Spawn the periodic task that asks the session to re-evaluate one point.
/// It stops once the session reports `GameOver` or the session is gone.
pub fn spawn_ticker(
    session_id: String,
    point_id: String,
    period: Duration,
    commands: mpsc::Sender<SessionCommand>,
    mut summary: watch::Receiver<SessionSummary>,
) -> JoinHandle<()> {
    spawn_isolated("objective_ticker", session_id.clone(), async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            if summary.borrow_and_update().status == SessionStatus::GameOver {
                break;
            }

            let cmd = SessionCommand::TickPoint {
                point_id: point_id.clone(),
            };
            if commands.send(cmd).await.is_err() {
                break;
            }
        }

        debug!(session_id = %session_id, point_id = %point_id, "Objective ticker stopped");
    })
}
