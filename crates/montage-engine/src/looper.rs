//! Decision logic of the session loop
//!
//! The [`Looper`] owns no thread and does no work. It holds the loop's
//! control flags and answers the questions the loop asks on each turn:
//! is there something to do, should the fixture be rebuilt, how long may
//! the loop sleep.
//!
//! ## Builder scheduling
//!
//! Processing a command marks the model dirty. Once the queue has drained,
//! the loop waits one builder delay and then runs an idle build. While
//! commands keep arriving the build is postponed, but never longer than the
//! builder delay multiplied by the busy slowdown factor; after that a build
//! is forced in between commands.
//!
//! The dirty marker starts at 2 and counts down once per processed turn in
//! which a build is due. The first such turn is the one that processed the
//! last command; the build itself runs on the following turn.

use std::time::{Duration, Instant};

use crate::config::EngineConfig;

const DIRTY_TURNS: u8 = 2;

pub struct Looper {
    shutdown: bool,
    disabled: bool,
    in_change: bool,
    dirty: u8,
    got_dirty: Option<Instant>,
    builder_delay: Duration,
    forced_build_delay: Duration,
    commands_pending: Box<dyn Fn() -> bool + Send>,
}

impl Looper {
    /// `commands_pending` reports whether the command queue holds entries
    pub fn new<F>(config: &EngineConfig, commands_pending: F) -> Self
    where
        F: Fn() -> bool + Send + 'static,
    {
        Self {
            shutdown: false,
            disabled: false,
            in_change: false,
            dirty: 0,
            got_dirty: None,
            builder_delay: config.builder_delay(),
            forced_build_delay: config.forced_build_delay(),
            commands_pending: Box::new(commands_pending),
        }
    }

    pub fn is_dying(&self) -> bool {
        self.shutdown
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled || self.is_dying()
    }

    /// Commands are waiting and processing is enabled
    pub fn is_working(&self) -> bool {
        self.has_commands_pending() && !self.is_disabled()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty > 0
    }

    /// A build is due because the queue drained
    pub fn idle_build(&self) -> bool {
        self.is_dirty() && !self.has_commands_pending()
    }

    /// A build is due because it was postponed too long
    pub fn force_build(&self) -> bool {
        self.is_dirty()
            && self
                .got_dirty
                .is_some_and(|since| since.elapsed() >= self.forced_build_delay)
    }

    pub fn run_build(&self) -> bool {
        (self.idle_build() || self.force_build()) && !self.is_disabled()
    }

    pub fn is_idle(&self) -> bool {
        !(self.is_working() || self.run_build() || self.is_disabled())
    }

    pub fn shall_loop(&self) -> bool {
        !self.is_dying()
    }

    pub fn trigger_shutdown(&mut self) {
        self.shutdown = true;
    }

    pub fn enable_processing(&mut self, enabled: bool) {
        self.disabled = !enabled;
    }

    /// Wake-up predicate of the loop, evaluated under the loop lock
    ///
    /// Marks the model dirty on the first command after a build and flags
    /// a change in progress whenever it lets the loop proceed.
    pub fn require_action(&mut self) -> bool {
        if self.is_working() && !self.is_dirty() {
            self.dirty = DIRTY_TURNS;
            self.got_dirty = Some(Instant::now());
        }
        let required = self.is_working() || self.force_build() || self.is_dying();
        if required {
            self.in_change = true;
        }
        required
    }

    /// Close one loop turn
    pub fn mark_state_processed(&mut self) {
        self.in_change = false;
        if self.idle_build() || self.force_build() {
            self.dirty = self.dirty.saturating_sub(1);
        }
        if !self.is_dirty() {
            self.got_dirty = None;
        }
    }

    pub fn has_pending_changes(&self) -> bool {
        self.in_change
    }

    /// Nothing queued, no build due and no turn in progress
    ///
    /// A disabled or dying loop counts as synchronised since it won't make
    /// further progress on its own.
    pub fn is_state_synched(&self) -> bool {
        !self.has_pending_changes()
            && (self.is_disabled() || (!self.has_commands_pending() && !self.is_dirty()))
    }

    /// How long the loop may sleep; `None` means until woken
    pub fn timeout(&self) -> Option<Duration> {
        if self.is_disabled() || !self.is_dirty() {
            None
        } else if self.is_working() {
            Some(self.forced_build_delay)
        } else {
            Some(self.builder_delay)
        }
    }

    fn has_commands_pending(&self) -> bool {
        (self.commands_pending)()
    }
}

impl std::fmt::Debug for Looper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Looper")
            .field("shutdown", &self.shutdown)
            .field("disabled", &self.disabled)
            .field("in_change", &self.in_change)
            .field("dirty", &self.dirty)
            .finish()
    }
}
