// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Background re-recording of dirty layers.
//!
//! The [`RenderScheduler`] owns one worker thread. Each time it is
//! [triggered](RenderScheduler::trigger) the worker runs a *sweep*: it walks
//! the stack's current [`Snapshot`](crate::layer::Snapshot) bottom to top,
//! calls [`render`](crate::layer::LayerRecord::render) on every record, then
//! asks the host to repaint exactly once.
//!
//! # State machine
//!
//! ```text
//!            trigger()                 worker picks up
//!   Idle ───────────────► Triggered ─────────────────► Rendering
//!    ▲                      ▲  trigger(): merged          │  trigger(): pending = true
//!    │                      │                             │
//!    │                      └──── pending ────────────────┤ sweep + repaint + pacing
//!    └─────────────────────────── not pending ────────────┘
//!
//!   stop() from any state ──► Stopped (terminal)
//! ```
//!
//! Triggers raised while a sweep is running collapse into a single `pending`
//! flag, so any number of them produces exactly one follow-up sweep.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use kurbo::Rect;
use parking_lot::{Condvar, Mutex};

use crate::error::SchedulerError;
use crate::layer::{LayerStack, RenderOutcome};
use crate::time::{HostClock, HostTime};
use crate::trace::{
    LayerOutcome, LayerRenderEvent, RepaintEvent, SweepBeginEvent, SweepEndEvent, TraceSink,
    Tracer,
};

/// Configuration for the [`RenderScheduler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Minimum time between the starts of two consecutive sweeps.
    ///
    /// After a sweep the worker waits out the remainder of this interval
    /// before picking up the next cycle. Triggers raised meanwhile coalesce.
    pub min_sweep_interval: Duration,
    /// Name given to the worker thread.
    pub thread_name: &'static str,
}

impl SchedulerConfig {
    /// Sweep as soon as triggered.
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            min_sweep_interval: Duration::ZERO,
            thread_name: "strata-render",
        }
    }

    /// At most one sweep per 16 ms frame.
    #[must_use]
    pub const fn paced_60hz() -> Self {
        Self {
            min_sweep_interval: Duration::from_millis(16),
            thread_name: "strata-render",
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::immediate()
    }
}

/// Observable scheduler state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SchedulerState {
    /// Waiting for a trigger.
    Idle,
    /// A sweep is scheduled but the worker has not picked it up yet.
    Triggered,
    /// A sweep (or its pacing wait) is in progress.
    Rendering,
    /// Terminal; triggers are ignored.
    Stopped,
}

/// Input to one sweep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SweepRequest {
    /// Sweep counter.
    pub index: u64,
    /// Bounds every dirty layer is recorded for.
    pub bounds: Rect,
    /// Number of triggers this sweep absorbs.
    pub triggers: u32,
}

/// What one sweep did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SweepReport {
    /// Sweep counter.
    pub index: u64,
    /// Layers in the swept snapshot.
    pub layers: u32,
    /// Layers re-recorded.
    pub rendered: u32,
    /// Layers skipped as clean.
    pub clean: u32,
    /// Layers whose render failed.
    pub failed: u32,
    /// Number of triggers the sweep absorbed.
    pub merged_triggers: u32,
    /// Host time at the start of the sweep.
    pub began: HostTime,
    /// Host time at the end of the sweep.
    pub ended: HostTime,
}

/// Asks the host to schedule a paint.
///
/// Called on the worker thread once per completed sweep. Implementations
/// typically post a message to the host's UI loop; they must not paint
/// synchronously. A panic is caught and logged; the worker keeps running.
pub trait RepaintRequester: Send + 'static {
    /// Requests a repaint after `report`'s sweep.
    fn request_repaint(&mut self, report: &SweepReport);
}

impl<F> RepaintRequester for F
where
    F: FnMut(&SweepReport) + Send + 'static,
{
    fn request_repaint(&mut self, report: &SweepReport) {
        self(report);
    }
}

/// Renders every dirty layer of `stack` once, in paint order.
///
/// Per-layer failures are logged, traced and counted; they never abort the
/// sweep. The worker thread calls this for each cycle; hosts and tests may
/// call it directly to sweep synchronously.
///
/// Sweeps of one stack never overlap. A call made while another sweep of
/// the same stack is running (on the worker or elsewhere) waits for it to
/// finish, then renders only what is still dirty.
pub fn run_sweep(
    stack: &LayerStack,
    request: &SweepRequest,
    clock: &HostClock,
    tracer: &mut Tracer<'_>,
) -> SweepReport {
    let _sweep = stack.lock_sweep();
    let snapshot = stack.snapshot();
    let began = clock.now();
    tracer.sweep_begin(&SweepBeginEvent {
        sweep_index: request.index,
        timestamp: began,
        layer_count: saturating_u32(snapshot.len()),
        merged_triggers: request.triggers,
    });

    let mut report = SweepReport {
        index: request.index,
        layers: saturating_u32(snapshot.len()),
        rendered: 0,
        clean: 0,
        failed: 0,
        merged_triggers: request.triggers,
        began,
        ended: began,
    };

    for (position, record) in snapshot.iter().enumerate() {
        let begin = clock.now();
        let outcome = match record.render(request.bounds) {
            Ok(RenderOutcome::Rendered) => {
                report.rendered += 1;
                LayerOutcome::Rendered
            }
            Ok(RenderOutcome::Clean) => {
                report.clean += 1;
                LayerOutcome::Clean
            }
            Err(err) => {
                log::warn!("layer `{}` failed to render: {err}", record.name());
                report.failed += 1;
                LayerOutcome::Failed
            }
        };
        tracer.layer_render(&LayerRenderEvent {
            sweep_index: request.index,
            position: saturating_u32(position),
            outcome,
            begin,
            end: clock.now(),
        });
    }

    report.ended = clock.now();
    tracer.sweep_end(&SweepEndEvent {
        sweep_index: request.index,
        timestamp: report.ended,
        rendered: report.rendered,
        failed: report.failed,
    });
    log::trace!(
        "sweep {} rendered {}/{} layers ({} failed) in {:?}",
        report.index,
        report.rendered,
        report.layers,
        report.failed,
        report.ended - report.began,
    );
    report
}

// ---------------------------------------------------------------------------
// Shared control state
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Control {
    state: SchedulerState,
    pending: bool,
    triggers: u32,
    bounds: Rect,
    sweeps: u64,
}

#[derive(Debug)]
struct Shared {
    control: Mutex<Control>,
    /// Wakes the worker: trigger, stop.
    wake: Condvar,
    /// Wakes `wait_idle` callers: sweep finished with nothing pending, stop.
    idle: Condvar,
}

impl Shared {
    fn stop(&self) -> bool {
        let mut control = self.control.lock();
        let was_running = control.state != SchedulerState::Stopped;
        control.state = SchedulerState::Stopped;
        control.pending = false;
        self.wake.notify_all();
        self.idle.notify_all();
        was_running
    }
}

/// Marks the scheduler stopped when the worker exits, including by an
/// unexpected panic.
struct ExitGuard<'a>(&'a Shared);

impl Drop for ExitGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            log::error!("render worker panicked; scheduler stopped");
        }
        self.0.stop();
    }
}

// ---------------------------------------------------------------------------
// RenderScheduler
// ---------------------------------------------------------------------------

/// Drives render sweeps on a dedicated worker thread.
///
/// Dropping the scheduler stops it and joins the worker. A draw callback in
/// flight is never interrupted: the worker observes the stop at its next
/// wake-up or sweep boundary.
#[derive(Debug)]
pub struct RenderScheduler {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
    clock: HostClock,
}

impl RenderScheduler {
    /// Spawns the worker for `stack`.
    ///
    /// The scheduler starts `Idle`; nothing renders until the first
    /// [`trigger`](Self::trigger).
    pub fn spawn(
        stack: Arc<LayerStack>,
        repaint: impl RepaintRequester,
        config: SchedulerConfig,
    ) -> Result<Self, SchedulerError> {
        Self::spawn_traced(stack, repaint, config, HostClock::new(), None)
    }

    /// Like [`spawn`](Self::spawn), stamping events with `clock` and
    /// delivering them to `sink` (when the `trace` feature is enabled).
    pub fn spawn_traced(
        stack: Arc<LayerStack>,
        mut repaint: impl RepaintRequester,
        config: SchedulerConfig,
        clock: HostClock,
        mut sink: Option<Box<dyn TraceSink + Send>>,
    ) -> Result<Self, SchedulerError> {
        let shared = Arc::new(Shared {
            control: Mutex::new(Control {
                state: SchedulerState::Idle,
                pending: false,
                triggers: 0,
                bounds: Rect::ZERO,
                sweeps: 0,
            }),
            wake: Condvar::new(),
            idle: Condvar::new(),
        });

        let worker = thread::Builder::new()
            .name(config.thread_name.to_owned())
            .spawn({
                let shared = Arc::clone(&shared);
                move || {
                    let _guard = ExitGuard(&shared);
                    let sink = sink.as_deref_mut().map(|s| s as &mut dyn TraceSink);
                    worker_loop(&shared, &stack, &mut repaint, config, clock, sink);
                }
            })?;
        log::debug!("render worker `{}` started", config.thread_name);

        Ok(Self {
            shared,
            worker: Some(worker),
            clock,
        })
    }

    /// Requests a sweep.
    ///
    /// Returns `true` if this call scheduled a new cycle, `false` if it was
    /// merged into one already scheduled or the scheduler is stopped.
    pub fn trigger(&self) -> bool {
        let mut control = self.shared.control.lock();
        match control.state {
            SchedulerState::Idle => {
                control.state = SchedulerState::Triggered;
                control.triggers = 1;
                self.shared.wake.notify_one();
                true
            }
            SchedulerState::Triggered => {
                control.triggers = control.triggers.saturating_add(1);
                false
            }
            SchedulerState::Rendering => {
                control.triggers = control.triggers.saturating_add(1);
                !core::mem::replace(&mut control.pending, true)
            }
            SchedulerState::Stopped => {
                log::debug!("trigger ignored: scheduler stopped");
                false
            }
        }
    }

    /// Sets the bounds handed to the next sweep.
    pub fn set_bounds(&self, bounds: Rect) {
        self.shared.control.lock().bounds = bounds;
    }

    /// The bounds the next sweep will use.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.shared.control.lock().bounds
    }

    /// Stops the scheduler without waiting for the worker.
    ///
    /// A sweep in progress runs to completion but does not request a
    /// repaint.
    pub fn stop(&self) {
        if self.shared.stop() {
            log::debug!("render scheduler stopped");
        }
    }

    /// Stops the scheduler and joins the worker thread.
    pub fn shutdown(mut self) {
        self.stop();
        self.join();
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SchedulerState {
        self.shared.control.lock().state
    }

    /// Number of sweeps completed so far.
    #[must_use]
    pub fn sweep_count(&self) -> u64 {
        self.shared.control.lock().sweeps
    }

    /// The clock trace events are stamped with.
    #[must_use]
    pub fn clock(&self) -> HostClock {
        self.clock
    }

    /// Blocks until the scheduler is idle with nothing pending, or stopped.
    ///
    /// Returns `false` if `timeout` elapsed first.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut control = self.shared.control.lock();
        loop {
            if matches!(
                control.state,
                SchedulerState::Idle | SchedulerState::Stopped
            ) {
                return true;
            }
            match deadline {
                Some(deadline) => {
                    if self.shared.idle.wait_until(&mut control, deadline).timed_out() {
                        return matches!(
                            control.state,
                            SchedulerState::Idle | SchedulerState::Stopped
                        );
                    }
                }
                None => self.shared.idle.wait(&mut control),
            }
        }
    }

    fn join(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        if worker.thread().id() == thread::current().id() {
            // Dropped from inside the repaint requester; the worker exits
            // on its own once it sees the stop.
            return;
        }
        if worker.join().is_err() {
            log::error!("render worker terminated by panic");
        }
    }
}

impl Drop for RenderScheduler {
    fn drop(&mut self) {
        self.stop();
        self.join();
    }
}

fn worker_loop(
    shared: &Shared,
    stack: &LayerStack,
    repaint: &mut dyn RepaintRequester,
    config: SchedulerConfig,
    clock: HostClock,
    mut sink: Option<&mut dyn TraceSink>,
) {
    loop {
        // -- Wait for a cycle --
        let request = {
            let mut control = shared.control.lock();
            loop {
                match control.state {
                    SchedulerState::Stopped => return,
                    SchedulerState::Triggered => break,
                    SchedulerState::Idle | SchedulerState::Rendering => {
                        shared.wake.wait(&mut control);
                    }
                }
            }
            control.state = SchedulerState::Rendering;
            control.pending = false;
            SweepRequest {
                index: control.sweeps,
                bounds: control.bounds,
                triggers: core::mem::take(&mut control.triggers),
            }
        };

        // -- Sweep --
        let started = Instant::now();
        let mut tracer = match sink.as_deref_mut() {
            Some(sink) => Tracer::new(sink),
            None => Tracer::none(),
        };
        let report = run_sweep(stack, &request, &clock, &mut tracer);

        let stopped = {
            let mut control = shared.control.lock();
            control.sweeps += 1;
            control.state == SchedulerState::Stopped
        };
        if stopped {
            log::debug!("sweep {} finished after stop; repaint skipped", report.index);
            return;
        }
        if panic::catch_unwind(AssertUnwindSafe(|| repaint.request_repaint(&report))).is_err() {
            log::error!("repaint requester panicked after sweep {}", report.index);
        }
        tracer.repaint(&RepaintEvent {
            sweep_index: report.index,
            timestamp: clock.now(),
        });

        // -- Pace and settle --
        let mut control = shared.control.lock();
        if let Some(deadline) = started.checked_add(config.min_sweep_interval) {
            while control.state != SchedulerState::Stopped && Instant::now() < deadline {
                if shared.wake.wait_until(&mut control, deadline).timed_out() {
                    break;
                }
            }
        }
        match control.state {
            SchedulerState::Stopped => return,
            _ if control.pending => {
                control.pending = false;
                control.state = SchedulerState::Triggered;
            }
            _ => {
                control.state = SchedulerState::Idle;
                shared.idle.notify_all();
            }
        }
    }
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::error::DrawError;
    use crate::layer::{Placement, from_fn};
    use crate::recording::{Color, Recorder};

    const BOUNDS: Rect = Rect::new(0.0, 0.0, 320.0, 240.0);
    const TIMEOUT: Duration = Duration::from_secs(5);

    fn fill(rec: &mut Recorder, bounds: Rect) -> Result<(), DrawError> {
        rec.fill_rect(bounds, Color::DARK_GRAY);
        Ok(())
    }

    fn request(index: u64) -> SweepRequest {
        SweepRequest {
            index,
            bounds: BOUNDS,
            triggers: 1,
        }
    }

    #[test]
    fn presets() {
        assert_eq!(SchedulerConfig::immediate().min_sweep_interval, Duration::ZERO);
        assert_eq!(
            SchedulerConfig::paced_60hz().min_sweep_interval,
            Duration::from_millis(16)
        );
        assert_eq!(SchedulerConfig::default(), SchedulerConfig::immediate());
    }

    #[test]
    fn sweep_renders_dirty_and_skips_clean() {
        let stack = LayerStack::new();
        stack.add("a", fill, Placement::Top).expect("add");
        stack.add("b", fill, Placement::Top).expect("add");
        let clock = HostClock::new();

        let report = run_sweep(&stack, &request(0), &clock, &mut Tracer::none());
        assert_eq!((report.layers, report.rendered, report.clean), (2, 2, 0));

        stack.invalidate("b").expect("invalidate");
        let report = run_sweep(&stack, &request(1), &clock, &mut Tracer::none());
        assert_eq!((report.rendered, report.clean, report.failed), (1, 1, 0));
        assert_eq!(stack.get("a").expect("a").render_count(), 1);
        assert_eq!(stack.get("b").expect("b").render_count(), 2);
        assert!(report.ended >= report.began);
    }

    #[test]
    fn sweep_contains_failures() {
        let stack = LayerStack::new();
        stack.add("ok", fill, Placement::Top).expect("add");
        stack
            .add(
                "err",
                from_fn(|_rec, _bounds| Err(DrawError::failed("no data"))),
                Placement::Top,
            )
            .expect("add");
        stack
            .add(
                "panic",
                from_fn(|_rec, _bounds| panic!("drawable bug")),
                Placement::Top,
            )
            .expect("add");
        stack.add("after", fill, Placement::Top).expect("add");

        let report = run_sweep(&stack, &request(0), &HostClock::new(), &mut Tracer::none());
        assert_eq!(report.rendered, 2, "healthy layers still render");
        assert_eq!(report.failed, 2);
        for name in ["err", "panic"] {
            let record = stack.get(name).expect("record");
            assert!(record.is_dirty(), "{name} stays dirty");
            assert_eq!(record.render_count(), 0);
        }
        assert_eq!(stack.get("after").expect("after").render_count(), 1);
    }

    #[test]
    fn concurrent_sweeps_render_each_invalidation_once() {
        use std::sync::Barrier;

        let stack = Arc::new(LayerStack::new());
        let in_sweep = Arc::new(AtomicU32::new(0));
        let overlapped = Arc::new(AtomicU32::new(0));
        for name in ["a", "b"] {
            let in_sweep = Arc::clone(&in_sweep);
            let overlapped = Arc::clone(&overlapped);
            stack
                .add(
                    name,
                    from_fn(move |rec, bounds| {
                        if in_sweep.fetch_add(1, Ordering::SeqCst) > 0 {
                            overlapped.fetch_add(1, Ordering::SeqCst);
                        }
                        thread::sleep(Duration::from_millis(10));
                        rec.fill_rect(bounds, Color::RED);
                        in_sweep.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    }),
                    Placement::Top,
                )
                .expect("add");
        }

        let start = Arc::new(Barrier::new(2));
        let sweeps: Vec<_> = (0..2_u64)
            .map(|index| {
                let stack = Arc::clone(&stack);
                let start = Arc::clone(&start);
                thread::spawn(move || {
                    start.wait();
                    run_sweep(&stack, &request(index), &HostClock::new(), &mut Tracer::none())
                })
            })
            .collect();
        let rendered: u32 = sweeps
            .into_iter()
            .map(|sweep| sweep.join().expect("sweep thread").rendered)
            .sum();

        assert_eq!(rendered, 2, "each layer renders once across both sweeps");
        for name in ["a", "b"] {
            assert_eq!(stack.get(name).expect("record").render_count(), 1);
        }
        assert_eq!(overlapped.load(Ordering::SeqCst), 0, "sweeps never overlap");
    }

    #[test]
    fn trigger_runs_one_sweep_and_repaints() {
        let stack = Arc::new(LayerStack::new());
        stack.add("a", fill, Placement::Top).expect("add");
        let repaints = Arc::new(AtomicU32::new(0));

        let scheduler = RenderScheduler::spawn(
            Arc::clone(&stack),
            {
                let repaints = Arc::clone(&repaints);
                move |_: &SweepReport| {
                    repaints.fetch_add(1, Ordering::SeqCst);
                }
            },
            SchedulerConfig::immediate(),
        )
        .expect("spawn");
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        scheduler.set_bounds(BOUNDS);
        assert_eq!(scheduler.bounds(), BOUNDS);

        assert!(scheduler.trigger());
        assert!(scheduler.wait_idle(TIMEOUT), "sweep finishes");
        assert_eq!(scheduler.sweep_count(), 1);
        assert_eq!(repaints.load(Ordering::SeqCst), 1);

        let record = stack.get("a").expect("a");
        assert_eq!(record.render_count(), 1);
        assert_eq!(record.recording().expect("recording").bounds(), BOUNDS);
    }

    #[test]
    fn panicking_repaint_requester_keeps_worker_alive() {
        let stack = Arc::new(LayerStack::new());
        stack.add("a", fill, Placement::Top).expect("add");
        let calls = Arc::new(AtomicU32::new(0));

        let scheduler = RenderScheduler::spawn(
            Arc::clone(&stack),
            {
                let calls = Arc::clone(&calls);
                move |_: &SweepReport| {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        panic!("host callback bug");
                    }
                }
            },
            SchedulerConfig::immediate(),
        )
        .expect("spawn");

        assert!(scheduler.trigger());
        assert!(scheduler.wait_idle(TIMEOUT));
        assert_eq!(scheduler.state(), SchedulerState::Idle, "worker survived");

        stack.invalidate("a").expect("invalidate");
        assert!(scheduler.trigger(), "triggers are still accepted");
        assert!(scheduler.wait_idle(TIMEOUT));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(scheduler.sweep_count(), 2);
        assert_eq!(stack.get("a").expect("a").render_count(), 2);
    }

    #[test]
    fn stopped_scheduler_ignores_triggers() {
        let stack = Arc::new(LayerStack::new());
        let scheduler =
            RenderScheduler::spawn(stack, |_: &SweepReport| {}, SchedulerConfig::immediate())
                .expect("spawn");
        scheduler.stop();
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert!(!scheduler.trigger());
        assert!(scheduler.wait_idle(TIMEOUT), "stopped counts as idle");
        assert_eq!(scheduler.sweep_count(), 0);
        scheduler.shutdown();
    }

    #[test]
    fn wait_idle_times_out_while_rendering() {
        let stack = Arc::new(LayerStack::new());
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        stack
            .add(
                "slow",
                from_fn(move |_rec, _bounds| {
                    _ = release_rx.lock().recv();
                    Ok(())
                }),
                Placement::Top,
            )
            .expect("add");

        let scheduler =
            RenderScheduler::spawn(stack, |_: &SweepReport| {}, SchedulerConfig::immediate())
                .expect("spawn");
        scheduler.trigger();
        assert!(!scheduler.wait_idle(Duration::from_millis(20)));
        release_tx.send(()).expect("release");
        assert!(scheduler.wait_idle(TIMEOUT));
    }
}
