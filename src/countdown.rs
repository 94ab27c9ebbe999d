//! Countdown engine for the overlay.
//!
//! The engine is a small state machine, `Idle → Running → Fired → Idle`, driven
//! by Bubble Tea tick messages. Every start bumps an internal tag so ticks
//! scheduled by an earlier run are ignored; that tag is how `stop()` and
//! `restart()` cancel the pending interval.
//!
//! Completion is not reported from inside the tick handler. Reaching zero
//! schedules a [`FiredMsg`] for the next turn of the event loop, and
//! [`Model::complete`] accepts each run's completion exactly once.
//!
//! # bubbletea-rs Integration
//!
//! ```rust
//! use bubbletea_rs::{Cmd, Model as BubbleTeaModel, Msg};
//! use scene_countdown::countdown::{self, FiredMsg};
//!
//! struct App {
//!     countdown: countdown::Model,
//! }
//!
//! impl BubbleTeaModel for App {
//!     fn init() -> (Self, Option<Cmd>) {
//!         let mut countdown = countdown::new(10_000, 100);
//!         let cmd = countdown.start(10_000);
//!         (Self { countdown }, Some(cmd))
//!     }
//!
//!     fn update(&mut self, msg: Msg) -> Option<Cmd> {
//!         if let Some(fired) = msg.downcast_ref::<FiredMsg>() {
//!             if self.countdown.complete(fired) {
//!                 // Time is up.
//!             }
//!             return None;
//!         }
//!         self.countdown.update(&msg)
//!     }
//!
//!     fn view(&self) -> String {
//!         self.countdown.view()
//!     }
//! }
//! ```

use bubbletea_rs::{tick as bubbletea_tick, Cmd, Msg};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

// Internal ID management for countdown instances
static LAST_ID: AtomicI64 = AtomicI64::new(0);

fn next_id() -> i64 {
    LAST_ID.fetch_add(1, Ordering::SeqCst) + 1
}

/// Formats milliseconds as `MM:SS:mmm`.
///
/// Padding is a minimum width: minutes past 99 are printed in full.
///
/// ```rust
/// use scene_countdown::countdown::format_ms;
///
/// assert_eq!(format_ms(0), "00:00:000");
/// assert_eq!(format_ms(61_234), "01:01:234");
/// assert_eq!(format_ms(6_000_000), "100:00:000");
/// ```
pub fn format_ms(ms: u64) -> String {
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    let millis = ms % 1_000;
    format!("{:02}:{:02}:{:03}", minutes, seconds, millis)
}

/// Lifecycle phase of a countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Not counting; either never started or stopped.
    #[default]
    Idle,
    /// Counting down.
    Running,
    /// Reached zero. Stays here until the next start.
    Fired,
}

/// Message that advances a running countdown by one interval.
#[derive(Debug, Clone)]
pub struct TickMsg {
    /// Identifier of the countdown that scheduled this tick.
    pub id: i64,
    tag: i64,
}

/// Message scheduled when a countdown reaches zero.
#[derive(Debug, Clone)]
pub struct FiredMsg {
    /// Identifier of the countdown that fired.
    pub id: i64,
    run: u64,
}

/// Countdown state.
#[derive(Debug, Clone)]
pub struct Model {
    duration_ms: u64,
    tick_ms: u64,
    remaining_ms: u64,
    phase: Phase,
    id: i64,
    tag: i64,
    run: u64,
    reported_run: u64,
}

/// Creates an idle countdown. A `tick_ms` of zero is raised to 1.
pub fn new(duration_ms: u64, tick_ms: u64) -> Model {
    Model {
        duration_ms,
        tick_ms: tick_ms.max(1),
        remaining_ms: duration_ms,
        phase: Phase::Idle,
        id: next_id(),
        tag: 0,
        run: 0,
        reported_run: 0,
    }
}

impl Model {
    /// Unique identifier of this countdown.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether the countdown is currently counting.
    pub fn running(&self) -> bool {
        self.phase == Phase::Running
    }

    /// Whether the current run has reached zero.
    pub fn fired(&self) -> bool {
        self.phase == Phase::Fired
    }

    /// Time left in the current run.
    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    /// Duration used by [`Model::restart`].
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Length of one tick.
    pub fn tick_ms(&self) -> u64 {
        self.tick_ms
    }

    /// Starts a new run of `duration_ms`.
    ///
    /// Any tick scheduled by a previous run is invalidated. A zero duration
    /// fires immediately; the returned command then delivers the [`FiredMsg`]
    /// instead of the first tick.
    pub fn start(&mut self, duration_ms: u64) -> Cmd {
        self.tag += 1;
        self.run += 1;
        self.remaining_ms = duration_ms;

        if duration_ms == 0 {
            self.phase = Phase::Fired;
            return self.fired_cmd();
        }

        self.phase = Phase::Running;
        self.tick()
    }

    /// Cancels the pending tick. Safe to call in any phase, any number of times.
    pub fn stop(&mut self) {
        if self.phase == Phase::Running {
            self.phase = Phase::Idle;
            self.tag += 1;
        }
    }

    /// Stops and starts again with the original duration.
    pub fn restart(&mut self) -> Cmd {
        self.stop();
        self.start(self.duration_ms)
    }

    /// Accepts the completion of a run.
    ///
    /// Returns `true` the first time the [`FiredMsg`] of the current run is
    /// seen while the countdown is fired. Duplicates, runs replaced by a later
    /// start or restart, and other countdowns' messages return `false`.
    pub fn complete(&mut self, msg: &FiredMsg) -> bool {
        if msg.id != self.id
            || msg.run != self.run
            || self.phase != Phase::Fired
            || msg.run <= self.reported_run
        {
            return false;
        }
        self.reported_run = msg.run;
        true
    }

    fn tick(&self) -> Cmd {
        let id = self.id;
        let tag = self.tag;
        bubbletea_tick(Duration::from_millis(self.tick_ms), move |_| {
            Box::new(TickMsg { id, tag }) as Msg
        })
    }

    fn fired_cmd(&self) -> Cmd {
        let id = self.id;
        let run = self.run;
        bubbletea_tick(Duration::from_nanos(1), move |_| {
            Box::new(FiredMsg { id, run }) as Msg
        })
    }

    /// Handles a [`TickMsg`] and returns the next command.
    ///
    /// While time remains this is the next tick. When the countdown reaches
    /// zero it is the deferred [`FiredMsg`].
    pub fn update(&mut self, msg: &Msg) -> Option<Cmd> {
        let tick_msg = msg.downcast_ref::<TickMsg>()?;
        if !self.running() || tick_msg.id != self.id || tick_msg.tag != self.tag {
            return None;
        }

        self.remaining_ms = self.remaining_ms.saturating_sub(self.tick_ms);
        if self.remaining_ms > 0 {
            return Some(self.tick());
        }

        self.phase = Phase::Fired;
        self.tag += 1;
        Some(self.fired_cmd())
    }

    /// Formatted remaining time while running, empty otherwise.
    pub fn view(&self) -> String {
        if self.running() {
            format_ms(self.remaining_ms)
        } else {
            String::new()
        }
    }
}

impl Default for Model {
    fn default() -> Self {
        new(5 * 60_000, 1)
    }
}
