//! Session orchestration: the live GameState plus the timer deadlines that
//! drive the classic-mode deferred spawn and the time-mode countdown.

use crate::game::{
    self, Action, BlockId, Followup, GameState, IdGen, SPAWN_DELAY_MS, TICK_PERIOD_MS,
};
use crate::{GameConfig, Mode};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Pending deadlines owned by the session. Dropped wholesale whenever the
/// state leaves the mode that armed them, so a stale timer can never touch
/// a superseded game.
#[derive(Debug, Default)]
struct Timers {
    /// Next countdown tick (time mode only).
    countdown_due: Option<Instant>,
    /// Deferred classic-mode row spawns, in schedule order.
    spawns_due: VecDeque<Instant>,
}

impl Timers {
    fn cancel_all(&mut self) {
        self.countdown_due = None;
        self.spawns_due.clear();
    }
}

/// Thin adapter over the pure [`game::step`] function: holds the current
/// state, the generators, and the timers; every public entry point applies
/// one indivisible transition and then re-syncs the timers against the
/// result.
pub struct Session {
    state: GameState,
    rng: StdRng,
    ids: IdGen,
    timers: Timers,
    paused_at: Option<Instant>,
}

impl Session {
    pub fn new(config: &GameConfig, now: Instant) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut ids = IdGen::new();
        let state = GameState::new(config.mode, &mut rng, &mut ids);
        let mut session = Self {
            state,
            rng,
            ids,
            timers: Timers::default(),
            paused_at: None,
        };
        session.sync_timers(now);
        session
    }

    /// Read-only snapshot for the presentation layer.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Restart with a fresh state. Cancels every pending deadline first, so
    /// nothing scheduled against the old game can reach the new one.
    pub fn init_game(&mut self, mode: Mode, now: Instant) {
        self.timers.cancel_all();
        self.paused_at = None;
        self.ids = IdGen::new();
        self.state = GameState::new(mode, &mut self.rng, &mut self.ids);
        self.sync_timers(now);
    }

    /// Forward one block click. Silently ignored when the game is over.
    pub fn handle_block_click(&mut self, id: BlockId, now: Instant) {
        self.apply(Action::Click(id), now);
    }

    /// Fire every deadline that is due, earliest first. Catch-up ticks after
    /// a long frame replay one at a time, each as its own transition.
    pub fn poll(&mut self, now: Instant) {
        if self.paused_at.is_some() {
            return;
        }
        loop {
            let next_spawn = self.timers.spawns_due.front().copied();
            let next_tick = self.timers.countdown_due;
            match (next_spawn, next_tick) {
                (Some(s), t) if s <= now && t.is_none_or(|t| s <= t) => {
                    self.timers.spawns_due.pop_front();
                    self.apply(Action::SpawnRow, now);
                }
                (_, Some(t)) if t <= now => {
                    // Rearm from the due time, not `now`, to keep the tick
                    // cadence steady across slow frames.
                    self.timers.countdown_due = Some(t + Duration::from_millis(TICK_PERIOD_MS));
                    self.apply(Action::CountdownTick, now);
                }
                _ => break,
            }
        }
    }

    /// Freeze the deadlines. The caller stops polling while paused; resume
    /// shifts every deadline by the time spent paused so no tick is owed.
    pub fn pause(&mut self, now: Instant) {
        if self.paused_at.is_none() {
            self.paused_at = Some(now);
        }
    }

    pub fn resume(&mut self, now: Instant) {
        if let Some(start) = self.paused_at.take() {
            let dt = now.saturating_duration_since(start);
            if let Some(t) = self.timers.countdown_due.as_mut() {
                *t += dt;
            }
            for t in &mut self.timers.spawns_due {
                *t += dt;
            }
        }
    }

    fn apply(&mut self, action: Action, now: Instant) {
        let t = game::step(&self.state, action, &mut self.rng, &mut self.ids);
        self.state = t.state;
        if t.followup == Some(Followup::ScheduleSpawn) {
            self.timers
                .spawns_due
                .push_back(now + Duration::from_millis(SPAWN_DELAY_MS));
        }
        self.sync_timers(now);
    }

    /// Post-transition timer discipline. Every transition exits through
    /// here, so deadlines only exist while the state that armed them is
    /// still live.
    fn sync_timers(&mut self, now: Instant) {
        if self.state.game_over {
            self.timers.cancel_all();
            return;
        }
        match self.state.mode {
            Mode::Time => {
                if self.timers.countdown_due.is_none() {
                    self.timers.countdown_due = Some(now + Duration::from_millis(TICK_PERIOD_MS));
                }
            }
            Mode::Classic => self.timers.countdown_due = None,
        }
    }

    #[cfg(test)]
    pub(crate) fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }
}
