// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Glue between a hosting widget and the render cache.
//!
//! A host (a canvas view, a window, a test harness) owns one [`LayerHost`]
//! and forwards three kinds of callbacks to it:
//!
//! | Host callback          | `LayerHost` method                                    | Effect                              |
//! |------------------------|-------------------------------------------------------|-------------------------------------|
//! | size changed           | [`on_bounds_changed`](LayerHost::on_bounds_changed)   | new bounds, every layer dirty, sweep |
//! | input touched layers   | [`on_input_event`](LayerHost::on_input_event)         | named layers dirty, sweep           |
//! | paint requested        | [`on_paint_requested`](LayerHost::on_paint_requested) | composite cached recordings          |
//!
//! In the other direction the worker calls the host's
//! [`RepaintRequester`] once per sweep; the host turns that into its own
//! paint request, which eventually arrives back at `on_paint_requested`.

use std::sync::Arc;

use kurbo::Rect;

use crate::compositor::{CompositeReport, Compositor, CompositorConfig};
use crate::error::{SchedulerError, StackError};
use crate::layer::LayerStack;
use crate::recording::Surface;
use crate::scheduler::{RenderScheduler, RepaintRequester, SchedulerConfig};
use crate::time::HostClock;
use crate::trace::{SharedSink, TraceSink, Tracer};

/// Configuration for a [`LayerHost`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HostConfig {
    /// Worker configuration.
    pub scheduler: SchedulerConfig,
    /// Paint configuration.
    pub compositor: CompositorConfig,
    /// Bounds used by the initial sweep, before the first
    /// [`on_bounds_changed`](LayerHost::on_bounds_changed).
    pub initial_bounds: Rect,
}

impl HostConfig {
    /// Immediate sweeps, plain compositing, empty initial bounds.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            scheduler: SchedulerConfig::immediate(),
            compositor: CompositorConfig::plain(),
            initial_bounds: Rect::ZERO,
        }
    }

    /// Sets the initial bounds.
    #[must_use]
    pub const fn with_initial_bounds(mut self, bounds: Rect) -> Self {
        self.initial_bounds = bounds;
        self
    }

    /// Sets the scheduler configuration.
    #[must_use]
    pub const fn with_scheduler(mut self, scheduler: SchedulerConfig) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Sets the compositor configuration.
    #[must_use]
    pub const fn with_compositor(mut self, compositor: CompositorConfig) -> Self {
        self.compositor = compositor;
        self
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// One hosted layer stack with its render worker and compositor.
pub struct LayerHost {
    stack: Arc<LayerStack>,
    scheduler: RenderScheduler,
    compositor: Compositor,
    sink: Option<Box<dyn TraceSink + Send>>,
}

impl core::fmt::Debug for LayerHost {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LayerHost")
            .field("stack", &self.stack)
            .field("scheduler", &self.scheduler)
            .field("compositor", &self.compositor)
            .field("traced", &self.sink.is_some())
            .finish()
    }
}

impl LayerHost {
    /// Starts the render worker and triggers the initial sweep.
    pub fn new(
        stack: Arc<LayerStack>,
        repaint: impl RepaintRequester,
        config: HostConfig,
    ) -> Result<Self, SchedulerError> {
        Self::build(stack, repaint, config, None, None)
    }

    /// Like [`new`](Self::new), feeding sweep and composite events into one
    /// shared sink.
    pub fn with_trace_sink<S>(
        stack: Arc<LayerStack>,
        repaint: impl RepaintRequester,
        config: HostConfig,
        sink: SharedSink<S>,
    ) -> Result<Self, SchedulerError>
    where
        S: TraceSink + Send + 'static,
    {
        Self::build(
            stack,
            repaint,
            config,
            Some(Box::new(sink.clone())),
            Some(Box::new(sink)),
        )
    }

    fn build(
        stack: Arc<LayerStack>,
        repaint: impl RepaintRequester,
        config: HostConfig,
        worker_sink: Option<Box<dyn TraceSink + Send>>,
        sink: Option<Box<dyn TraceSink + Send>>,
    ) -> Result<Self, SchedulerError> {
        let clock = HostClock::new();
        let scheduler = RenderScheduler::spawn_traced(
            Arc::clone(&stack),
            repaint,
            config.scheduler,
            clock,
            worker_sink,
        )?;
        scheduler.set_bounds(config.initial_bounds);
        scheduler.trigger();
        Ok(Self {
            stack,
            scheduler,
            compositor: Compositor::with_clock(config.compositor, clock),
            sink,
        })
    }

    /// The hosted stack.
    #[must_use]
    pub fn stack(&self) -> &Arc<LayerStack> {
        &self.stack
    }

    /// The render scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &RenderScheduler {
        &self.scheduler
    }

    /// The compositor, e.g. to toggle the overlay.
    pub fn compositor_mut(&mut self) -> &mut Compositor {
        &mut self.compositor
    }

    /// The host resized: every layer is re-recorded for `bounds`.
    pub fn on_bounds_changed(&self, bounds: Rect) {
        log::debug!("bounds changed to {bounds:?}");
        self.scheduler.set_bounds(bounds);
        self.stack.invalidate_all();
        self.scheduler.trigger();
    }

    /// An input event affected the named layers.
    ///
    /// Unknown names fail the whole call and nothing is invalidated or
    /// triggered.
    pub fn on_input_event<'n>(
        &self,
        names: impl IntoIterator<Item = &'n str>,
    ) -> Result<(), StackError> {
        self.stack.invalidate_many(names)?;
        self.scheduler.trigger();
        Ok(())
    }

    /// Requests a sweep for layers invalidated through the stack directly.
    pub fn request_render(&self) -> bool {
        self.scheduler.trigger()
    }

    /// The host is ready to paint: composite every cached recording.
    pub fn on_paint_requested(
        &mut self,
        surface: &mut dyn Surface,
        bounds: Rect,
    ) -> CompositeReport {
        let mut tracer = match self.sink.as_deref_mut() {
            Some(sink) => Tracer::new(sink),
            None => Tracer::none(),
        };
        self.compositor.paint_traced(&self.stack, surface, bounds, &mut tracer)
    }

    /// Stops the worker and waits for it to exit.
    pub fn shutdown(self) {
        self.scheduler.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use core::time::Duration;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::layer::{Placement, from_fn};
    use crate::recording::{Color, DrawOp};
    use crate::scheduler::SweepReport;

    const TIMEOUT: Duration = Duration::from_secs(5);

    struct NullSurface;

    impl Surface for NullSurface {
        fn clear(&mut self, _color: Color) {}
        fn draw(&mut self, _op: &DrawOp, _opacity: f32) {}
    }

    fn sample_stack() -> Arc<LayerStack> {
        let stack = Arc::new(LayerStack::new());
        for name in ["background", "grid", "data"] {
            stack
                .add(
                    name,
                    from_fn(|rec, bounds| {
                        rec.fill_rect(bounds, Color::WHITE);
                        Ok(())
                    }),
                    Placement::Top,
                )
                .expect("add");
        }
        stack
    }

    fn counting() -> (Arc<AtomicU32>, impl RepaintRequester) {
        let count = Arc::new(AtomicU32::new(0));
        let requester = {
            let count = Arc::clone(&count);
            move |_: &SweepReport| {
                count.fetch_add(1, Ordering::SeqCst);
            }
        };
        (count, requester)
    }

    #[test]
    fn new_runs_initial_sweep() {
        let stack = sample_stack();
        let (repaints, requester) = counting();
        let bounds = Rect::new(0.0, 0.0, 640.0, 480.0);
        let host = LayerHost::new(
            Arc::clone(&stack),
            requester,
            HostConfig::new().with_initial_bounds(bounds),
        )
        .expect("host");

        assert!(host.scheduler().wait_idle(TIMEOUT));
        assert_eq!(repaints.load(Ordering::SeqCst), 1);
        for record in stack.snapshot().iter() {
            assert_eq!(record.render_count(), 1);
            assert_eq!(record.recording().expect("recording").bounds(), bounds);
        }
        host.shutdown();
    }

    #[test]
    fn bounds_change_rerenders_everything() {
        let stack = sample_stack();
        let (_, requester) = counting();
        let host = LayerHost::new(Arc::clone(&stack), requester, HostConfig::new()).expect("host");
        assert!(host.scheduler().wait_idle(TIMEOUT));

        let resized = Rect::new(0.0, 0.0, 800.0, 600.0);
        host.on_bounds_changed(resized);
        assert!(host.scheduler().wait_idle(TIMEOUT));
        for record in stack.snapshot().iter() {
            assert_eq!(record.render_count(), 2);
            assert_eq!(record.recording().expect("recording").bounds(), resized);
        }
    }

    #[test]
    fn input_event_rerenders_named_layers() {
        let stack = sample_stack();
        let (_, requester) = counting();
        let mut host =
            LayerHost::new(Arc::clone(&stack), requester, HostConfig::new()).expect("host");
        assert!(host.scheduler().wait_idle(TIMEOUT));

        assert_eq!(
            host.on_input_event(["data", "nope"]),
            Err(StackError::NotFound("nope".into()))
        );
        host.on_input_event(["data"]).expect("input");
        assert!(host.scheduler().wait_idle(TIMEOUT));

        assert_eq!(stack.get("data").expect("data").render_count(), 2);
        assert_eq!(stack.get("grid").expect("grid").render_count(), 1);

        let report = host.on_paint_requested(&mut NullSurface, Rect::ZERO);
        assert_eq!(report.painted, 3);
    }

    #[test]
    fn request_render_picks_up_direct_invalidation() {
        let stack = sample_stack();
        let (repaints, requester) = counting();
        let host = LayerHost::new(Arc::clone(&stack), requester, HostConfig::new()).expect("host");
        assert!(host.scheduler().wait_idle(TIMEOUT));

        stack.invalidate("grid").expect("invalidate");
        assert!(host.request_render());
        assert!(host.scheduler().wait_idle(TIMEOUT));
        assert_eq!(stack.get("grid").expect("grid").render_count(), 2);
        assert_eq!(repaints.load(Ordering::SeqCst), 2);
    }
}
