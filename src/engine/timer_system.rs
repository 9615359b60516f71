use super::*;
use crate::types::MainStatus;

impl ArenaEngine {
    pub(super) fn start_main_timer(&mut self, seconds: u32) {
        self.stop_main_tick();
        self.state.main_timer = seconds;
        self.state.main_status = MainStatus::Running;
        let token = TickToken {
            kind: TimerKind::Main,
            generation: self.main_generation,
        };
        self.main_tick = Some(token);
        self.ticks.arm(token);
        info!(seconds, "main timer started");
    }

    pub(super) fn start_recovery(&mut self, seconds: u32) {
        self.stop_recovery_tick();
        if self.state.main_status == MainStatus::Running {
            self.stop_main_tick();
            self.state.main_status = MainStatus::Paused;
        }
        self.state.recovery_timer = seconds;
        self.state.recovery_active = true;
        let token = TickToken {
            kind: TimerKind::Recovery,
            generation: self.recovery_generation,
        };
        self.recovery_tick = Some(token);
        self.ticks.arm(token);
        info!(seconds, main_remaining = self.state.main_timer, "recovery started");
    }

    pub(super) fn pause_main(&mut self) {
        self.stop_main_tick();
        if self.state.main_status != MainStatus::Finished {
            self.state.main_status = MainStatus::Paused;
        }
    }

    pub(super) fn reset_main(&mut self, seconds: u32) {
        self.stop_main_tick();
        self.state.main_timer = seconds;
        self.state.main_status = MainStatus::Idle;
    }

    pub(super) fn stop_main_tick(&mut self) {
        self.main_generation += 1;
        if self.main_tick.take().is_some() {
            self.ticks.disarm(TimerKind::Main);
        }
    }

    pub(super) fn stop_recovery_tick(&mut self) {
        self.recovery_generation += 1;
        if self.recovery_tick.take().is_some() {
            self.ticks.disarm(TimerKind::Recovery);
        }
    }

    /// Stops both countdowns. Recording a result is a separate step.
    pub(super) fn end_match_now(&mut self) {
        self.stop_main_tick();
        self.stop_recovery_tick();
        self.state.recovery_active = false;
        self.state.main_status = MainStatus::Finished;
        info!(match_id = ?self.state.current_match_id, "match ended");
    }

    pub(super) fn tick_main(&mut self) -> bool {
        if self.state.main_status != MainStatus::Running || self.state.recovery_active {
            return false;
        }
        self.state.main_timer = self.state.main_timer.saturating_sub(1);
        debug!(remaining = self.state.main_timer, "main tick");
        if self.state.main_timer == 0 {
            self.end_match_now();
        }
        true
    }

    /// Counts recovery down; at zero the fight resumes from the remaining main
    /// time, or the match ends if none is left.
    pub(super) fn tick_recovery(&mut self) -> bool {
        if !self.state.recovery_active {
            return false;
        }
        self.state.recovery_timer = self.state.recovery_timer.saturating_sub(1);
        debug!(remaining = self.state.recovery_timer, "recovery tick");
        if self.state.recovery_timer == 0 {
            self.stop_recovery_tick();
            self.state.recovery_active = false;
            if self.state.main_timer > 0 {
                self.start_main_timer(self.state.main_timer);
            } else {
                self.end_match_now();
            }
        }
        true
    }
}
