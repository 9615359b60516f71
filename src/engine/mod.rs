use tracing::{debug, info};

use crate::bracket::generate_bracket;
use crate::broadcast::{BroadcastHub, SubscriberId, Subscription};
use crate::constants::{
    DEFAULT_MATCH_SECONDS, DEFAULT_RECOVERY_SECONDS, DEFAULT_SUBSCRIBER_QUEUE, ROBOT_ID_PREFIX,
};
use crate::ranking::compute_ranking;
use crate::rng::Rng;
use crate::server_protocol::ArenaCommand;
use crate::timer::{TickDriver, TickToken, TimerKind};
use crate::types::{make_id, ArenaState, NewRobot, Robot};

mod result_system;
mod timer_system;

#[derive(Clone, Copy, Debug)]
pub struct EngineOptions {
    pub default_match_seconds: u32,
    pub default_recovery_seconds: u32,
    pub subscriber_queue: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            default_match_seconds: DEFAULT_MATCH_SECONDS,
            default_recovery_seconds: DEFAULT_RECOVERY_SECONDS,
            subscriber_queue: DEFAULT_SUBSCRIBER_QUEUE,
        }
    }
}

/// Owner of the arena state. Every command, request and timer tick goes
/// through `&mut self`, and each one publishes at most one snapshot after it
/// has fully applied.
pub struct ArenaEngine {
    options: EngineOptions,
    state: ArenaState,
    rng: Rng,
    ticks: Box<dyn TickDriver>,
    main_tick: Option<TickToken>,
    recovery_tick: Option<TickToken>,
    main_generation: u64,
    recovery_generation: u64,
    hub: BroadcastHub,
}

impl ArenaEngine {
    pub fn new(options: EngineOptions, seed: u32, ticks: Box<dyn TickDriver>) -> Self {
        Self {
            options,
            state: ArenaState::new(options.default_match_seconds),
            rng: Rng::new(seed),
            ticks,
            main_tick: None,
            recovery_tick: None,
            main_generation: 0,
            recovery_generation: 0,
            hub: BroadcastHub::new(options.subscriber_queue),
        }
    }

    pub fn state(&self) -> &ArenaState {
        &self.state
    }

    pub fn snapshot(&self) -> ArenaState {
        self.state.clone()
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    pub fn subscribe(&mut self) -> Subscription {
        self.hub.subscribe(&self.state)
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.hub.unsubscribe(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.hub.len()
    }

    /// Token the driver is currently delivering for `kind`, if that timer is armed.
    pub fn armed_token(&self, kind: TimerKind) -> Option<TickToken> {
        match kind {
            TimerKind::Main => self.main_tick,
            TimerKind::Recovery => self.recovery_tick,
        }
    }

    pub fn apply(&mut self, command: ArenaCommand) {
        debug!(?command, "applying command");
        match command {
            ArenaCommand::StartMatch { duration } => {
                let seconds = duration.unwrap_or(self.options.default_match_seconds);
                self.start_main_timer(seconds);
            }
            ArenaCommand::PauseMain => self.pause_main(),
            ArenaCommand::ResetMain { seconds } => {
                let seconds = seconds.unwrap_or(self.options.default_match_seconds);
                self.reset_main(seconds);
            }
            ArenaCommand::StartRecovery { seconds } => {
                let seconds = seconds.unwrap_or(self.options.default_recovery_seconds);
                self.start_recovery(seconds);
            }
            ArenaCommand::StopRecovery => {
                self.stop_recovery_tick();
                self.state.recovery_active = false;
            }
            ArenaCommand::EndMatch { match_id } => {
                let current = self.state.current_match().map(|entry| entry.id.as_str());
                if match_id.is_some() && match_id.as_deref() != current {
                    debug!(?match_id, ?current, "ending timer for a non-current match id");
                }
                self.end_match_now();
            }
        }
        self.publish();
    }

    /// Delivers one tick. Returns whether it changed the state; stale or
    /// inactive ticks are ignored.
    pub fn handle_tick(&mut self, token: TickToken) -> bool {
        if self.armed_token(token.kind) != Some(token) {
            debug!(?token, "stale tick ignored");
            return false;
        }
        let changed = match token.kind {
            TimerKind::Main => self.tick_main(),
            TimerKind::Recovery => self.tick_recovery(),
        };
        if changed {
            self.publish();
        }
        changed
    }

    pub fn register_robot(&mut self, input: NewRobot) -> Robot {
        let robot = Robot {
            id: make_id(ROBOT_ID_PREFIX),
            name: input.name,
            team: input.team,
            image: input.image,
        };
        info!(robot_id = %robot.id, name = %robot.name, "robot registered");
        self.state.robots.push(robot.clone());
        self.refresh_ranking();
        self.publish();
        robot
    }

    /// Replaces the bracket with a fresh shuffle of the registered robots.
    /// Returns the number of first-round matches.
    pub fn generate_tournament(&mut self) -> usize {
        match generate_bracket(&self.state.robots, &mut self.rng) {
            Some(pairing) => {
                info!(
                    robots = self.state.robots.len(),
                    round = %pairing.round,
                    matches = pairing.matches.len(),
                    "tournament generated"
                );
                self.state.current_round = Some(pairing.round);
                self.state.current_match_id = pairing.first_match_id();
                self.state.matches = pairing.matches;
            }
            None => {
                info!(robots = self.state.robots.len(), "not enough robots for a bracket");
                self.state.matches.clear();
                self.state.current_round = None;
                self.state.current_match_id = None;
            }
        }
        self.refresh_ranking();
        self.publish();
        self.state.matches.len()
    }

    /// Back to an empty arena. Subscribers stay connected.
    pub fn reset(&mut self) {
        self.stop_main_tick();
        self.stop_recovery_tick();
        self.state = ArenaState::new(self.options.default_match_seconds);
        info!("arena reset");
        self.publish();
    }

    fn refresh_ranking(&mut self) {
        self.state.ranking = compute_ranking(&self.state.robots, &self.state.matches);
    }

    fn publish(&mut self) {
        self.hub.publish(&self.state);
    }
}
