//! # TimeLoop — Frame Clock, Timers, Systems
//!
//! The [`TimeLoop`] advances the simulation clock and dispatches work each
//! frame. It never reads a wall clock: the host's frame source calls
//! [`tick`](TimeLoop::tick) with a timestamp in **milliseconds**, and
//! everything — deltas, timers, the FPS window — derives from that. A fixed
//! sequence of timestamps therefore replays identically.
//!
//! ## Tick order
//!
//! Within one tick: clock update → due timers → due scheduled events →
//! systems in ascending priority → generic callbacks in insertion order.
//! Everything is synchronous and runs to completion; there is no coroutine
//! or async machinery anywhere in the loop.
//!
//! ## Pause semantics
//!
//! `pause()` freezes the *delta* at zero — `current_time` stops, so timers
//! keyed to it stop too — but the tick keeps running, so systems and
//! callbacks that don't depend on delta continue every real frame.
//! [`resume`](TimeLoop::resume) resets the frame reference so the paused
//! span doesn't land as one giant catch-up delta.
//!
//! ## Timer drift
//!
//! A recurring timer's reference point resets to the *current* time when it
//! fires, not to `last_fired + interval`. Late ticks therefore accumulate
//! drift. This matches the behavior host code was written against; do not
//! "fix" it.

use std::collections::{HashMap, VecDeque};

use crate::physics::PhysicsWorld;
use crate::store::SceneStore;

/// How many tick timestamps the FPS window keeps.
const PERF_WINDOW: usize = 60;

/// Per-tick info handed to systems, callbacks, and timers.
#[derive(Debug, Clone, Copy)]
pub struct Frame {
    /// Scaled delta for this tick, milliseconds. Zero while paused.
    pub delta_ms: f64,
    /// Game clock, milliseconds (scaled, frozen while paused).
    pub elapsed_ms: f64,
    /// Real clock, milliseconds (unscaled, never frozen).
    pub real_ms: f64,
    /// Tick counter.
    pub number: u64,
}

impl Frame {
    pub fn delta_secs(&self) -> f32 {
        (self.delta_ms / 1000.0) as f32
    }
}

/// Work scheduled into the loop: systems, callbacks, timer and event bodies.
pub type TickFn = Box<dyn FnMut(&mut SceneStore, &mut PhysicsWorld, Frame)>;

macro_rules! loop_handle {
    ($($(#[$meta:meta])* $name:ident),+ $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $name(u64);
        )+
    };
}

loop_handle!(
    /// Handle to a timer, for [`TimeLoop::clear_timer`].
    TimerId,
    /// Handle to a scheduled event, for [`TimeLoop::cancel_event`].
    EventId,
    /// Handle to a registered system.
    SystemId,
    /// Handle to a generic per-tick callback.
    CallbackId,
);

enum TimerKind {
    /// Fires once `current_time - started >= delay`, then is removed.
    OneShot { started_ms: f64, delay_ms: f64 },
    /// Fires whenever `current_time - last_fired >= interval`; the
    /// reference resets to the current time (drift is intentional).
    Recurring { interval_ms: f64, last_fired_ms: f64 },
    /// Same pattern counted in frames instead of time.
    Frame { every: u64, last_frame: u64 },
}

struct TimerEntry {
    kind: TimerKind,
    callback: TickFn,
}

impl TimerEntry {
    fn due(&self, now_ms: f64, frame: u64) -> bool {
        match self.kind {
            TimerKind::OneShot { started_ms, delay_ms } => now_ms - started_ms >= delay_ms,
            TimerKind::Recurring { interval_ms, last_fired_ms } => {
                now_ms - last_fired_ms >= interval_ms
            }
            TimerKind::Frame { every, last_frame } => frame - last_frame >= every,
        }
    }
}

struct EventEntry {
    trigger_ms: f64,
    /// Compare against the game clock (pause-frozen) or the real clock.
    use_game_time: bool,
    callback: TickFn,
}

struct SystemEntry {
    id: SystemId,
    priority: i32,
    run: TickFn,
}

/// The cooperative frame loop. See the module docs.
#[derive(Default)]
pub struct TimeLoop {
    running: bool,
    paused: bool,
    time_scale: f64,
    current_time_ms: f64,
    real_time_ms: f64,
    last_frame_ms: f64,
    last_delta_ms: f64,
    frame_count: u64,
    frame_times: VecDeque<f64>,
    systems: Vec<SystemEntry>,
    callbacks: Vec<(CallbackId, TickFn)>,
    timers: HashMap<u64, TimerEntry>,
    events: HashMap<u64, EventEntry>,
    next_handle: u64,
}

impl TimeLoop {
    pub fn new() -> Self {
        Self {
            time_scale: 1.0,
            ..Self::default()
        }
    }

    fn next_handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Begin (or re-anchor) the loop at `now_ms`. Idempotent while running:
    /// calling it again just resets the frame reference.
    pub fn start(&mut self, now_ms: f64) {
        self.running = true;
        self.last_frame_ms = now_ms;
    }

    /// Halt future ticks. The in-flight tick, if any, finishes normally.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Freeze the game clock. The tick scheduler keeps running.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Unfreeze, re-anchoring the frame reference at `now_ms` so the paused
    /// span doesn't arrive as one large delta.
    pub fn resume(&mut self, now_ms: f64) {
        self.paused = false;
        self.last_frame_ms = now_ms;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_time_scale(&mut self, scale: f64) {
        self.time_scale = scale;
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// Game clock in milliseconds.
    pub fn current_time_ms(&self) -> f64 {
        self.current_time_ms
    }

    /// Real clock in milliseconds.
    pub fn real_time_ms(&self) -> f64 {
        self.real_time_ms
    }

    pub fn last_delta_ms(&self) -> f64 {
        self.last_delta_ms
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Frames per second over the rolling performance window.
    pub fn fps(&self) -> f64 {
        let n = self.frame_times.len();
        if n < 2 {
            return 0.0;
        }
        let span = self.frame_times[n - 1] - self.frame_times[0];
        if span <= 0.0 {
            return 0.0;
        }
        (n - 1) as f64 * 1000.0 / span
    }

    // ── Registration ─────────────────────────────────────────────────

    /// Register a system. Systems run every tick in ascending priority
    /// order; equal priorities run in registration order.
    pub fn add_system(
        &mut self,
        priority: i32,
        run: impl FnMut(&mut SceneStore, &mut PhysicsWorld, Frame) + 'static,
    ) -> SystemId {
        let id = SystemId(self.next_handle());
        let entry = SystemEntry {
            id,
            priority,
            run: Box::new(run),
        };
        let at = self
            .systems
            .partition_point(|existing| existing.priority <= priority);
        self.systems.insert(at, entry);
        id
    }

    pub fn remove_system(&mut self, id: SystemId) -> bool {
        let before = self.systems.len();
        self.systems.retain(|entry| entry.id != id);
        self.systems.len() != before
    }

    /// Register a generic callback. Callbacks run after all systems, in
    /// insertion order.
    pub fn on_tick(
        &mut self,
        callback: impl FnMut(&mut SceneStore, &mut PhysicsWorld, Frame) + 'static,
    ) -> CallbackId {
        let id = CallbackId(self.next_handle());
        self.callbacks.push((id, Box::new(callback)));
        id
    }

    pub fn remove_callback(&mut self, id: CallbackId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(existing, _)| *existing != id);
        self.callbacks.len() != before
    }

    /// Fire once after `delay_ms` of game time, then auto-remove.
    pub fn after(
        &mut self,
        delay_ms: f64,
        callback: impl FnMut(&mut SceneStore, &mut PhysicsWorld, Frame) + 'static,
    ) -> TimerId {
        let id = TimerId(self.next_handle());
        self.timers.insert(
            id.0,
            TimerEntry {
                kind: TimerKind::OneShot {
                    started_ms: self.current_time_ms,
                    delay_ms,
                },
                callback: Box::new(callback),
            },
        );
        id
    }

    /// Fire every `interval_ms` of game time until cleared.
    pub fn every(
        &mut self,
        interval_ms: f64,
        callback: impl FnMut(&mut SceneStore, &mut PhysicsWorld, Frame) + 'static,
    ) -> TimerId {
        let id = TimerId(self.next_handle());
        self.timers.insert(
            id.0,
            TimerEntry {
                kind: TimerKind::Recurring {
                    interval_ms,
                    last_fired_ms: self.current_time_ms,
                },
                callback: Box::new(callback),
            },
        );
        id
    }

    /// Fire every `frames` ticks until cleared.
    pub fn every_frames(
        &mut self,
        frames: u64,
        callback: impl FnMut(&mut SceneStore, &mut PhysicsWorld, Frame) + 'static,
    ) -> TimerId {
        let id = TimerId(self.next_handle());
        self.timers.insert(
            id.0,
            TimerEntry {
                kind: TimerKind::Frame {
                    every: frames,
                    last_frame: self.frame_count,
                },
                callback: Box::new(callback),
            },
        );
        id
    }

    /// Cancel a timer. Idempotent; unknown ids are a no-op. Takes effect
    /// before the next tick.
    pub fn clear_timer(&mut self, id: TimerId) {
        self.timers.remove(&id.0);
    }

    /// Fire once when the chosen clock reaches `trigger_ms` (absolute),
    /// then auto-remove. `use_game_time` picks the pause-frozen game clock
    /// over the real clock.
    pub fn at(
        &mut self,
        trigger_ms: f64,
        use_game_time: bool,
        callback: impl FnMut(&mut SceneStore, &mut PhysicsWorld, Frame) + 'static,
    ) -> EventId {
        let id = EventId(self.next_handle());
        self.events.insert(
            id.0,
            EventEntry {
                trigger_ms,
                use_game_time,
                callback: Box::new(callback),
            },
        );
        id
    }

    /// Cancel a scheduled event. Idempotent; unknown ids are a no-op.
    pub fn cancel_event(&mut self, id: EventId) {
        self.events.remove(&id.0);
    }

    // ── The tick ─────────────────────────────────────────────────────

    /// Run one frame at host timestamp `now_ms`. Does nothing when stopped.
    pub fn tick(&mut self, store: &mut SceneStore, physics: &mut PhysicsWorld, now_ms: f64) {
        if !self.running {
            return;
        }

        let raw_delta = (now_ms - self.last_frame_ms).max(0.0);
        let scaled = raw_delta * self.time_scale;
        let delta = if self.paused { 0.0 } else { scaled };
        self.current_time_ms += delta;
        self.real_time_ms += raw_delta;
        self.last_frame_ms = now_ms;
        self.last_delta_ms = delta;
        self.frame_count += 1;

        self.frame_times.push_back(now_ms);
        while self.frame_times.len() > PERF_WINDOW {
            self.frame_times.pop_front();
        }

        let frame = Frame {
            delta_ms: delta,
            elapsed_ms: self.current_time_ms,
            real_ms: self.real_time_ms,
            number: self.frame_count,
        };

        self.fire_timers(store, physics, frame);
        self.fire_events(store, physics, frame);

        for system in &mut self.systems {
            (system.run)(store, physics, frame);
        }
        for (_, callback) in &mut self.callbacks {
            callback(store, physics, frame);
        }
    }

    fn fire_timers(&mut self, store: &mut SceneStore, physics: &mut PhysicsWorld, frame: Frame) {
        let now_ms = self.current_time_ms;
        let frame_no = self.frame_count;

        // Ascending handle order, not hash order, so replays are stable.
        let mut due: Vec<u64> = self
            .timers
            .iter()
            .filter(|(_, timer)| timer.due(now_ms, frame_no))
            .map(|(id, _)| *id)
            .collect();
        due.sort_unstable();

        for id in due {
            let rearm = {
                let Some(timer) = self.timers.get_mut(&id) else {
                    continue;
                };
                match &mut timer.kind {
                    TimerKind::OneShot { .. } => false,
                    TimerKind::Recurring { last_fired_ms, .. } => {
                        *last_fired_ms = now_ms;
                        true
                    }
                    TimerKind::Frame { last_frame, .. } => {
                        *last_frame = frame_no;
                        true
                    }
                }
            };
            if rearm {
                if let Some(timer) = self.timers.get_mut(&id) {
                    (timer.callback)(store, physics, frame);
                }
            } else if let Some(mut timer) = self.timers.remove(&id) {
                (timer.callback)(store, physics, frame);
            }
        }
    }

    fn fire_events(&mut self, store: &mut SceneStore, physics: &mut PhysicsWorld, frame: Frame) {
        let mut due: Vec<u64> = self
            .events
            .iter()
            .filter(|(_, event)| {
                let clock = if event.use_game_time {
                    self.current_time_ms
                } else {
                    self.real_time_ms
                };
                clock >= event.trigger_ms
            })
            .map(|(id, _)| *id)
            .collect();
        due.sort_unstable();

        for id in due {
            if let Some(mut event) = self.events.remove(&id) {
                (event.callback)(store, physics, frame);
            }
        }
    }
}
