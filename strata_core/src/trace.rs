// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for render sweeps and compositing.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! render worker and the compositor call at each stage. All method bodies
//! default to no-ops, so implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! Sweeps run on the worker thread and composites on the foreground, so a
//! sink that should see both is wrapped in a [`SharedSink`] and a clone is
//! handed to each side.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::time::HostTime;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// What happened to one layer during a sweep.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayerOutcome {
    /// The layer was dirty and re-recorded.
    Rendered,
    /// The layer was clean and skipped.
    Clean,
    /// The layer's drawable failed or panicked.
    Failed,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when the worker starts a sweep.
#[derive(Clone, Copy, Debug)]
pub struct SweepBeginEvent {
    /// Monotonic sweep counter, starting at 0.
    pub sweep_index: u64,
    /// Host time at the start of the sweep.
    pub timestamp: HostTime,
    /// Number of layers in the swept snapshot.
    pub layer_count: u32,
    /// Number of triggers this sweep absorbs.
    pub merged_triggers: u32,
}

/// Emitted after each layer's render attempt.
#[derive(Clone, Copy, Debug)]
pub struct LayerRenderEvent {
    /// Sweep counter.
    pub sweep_index: u64,
    /// Paint position of the layer in the swept snapshot.
    pub position: u32,
    /// What the attempt did.
    pub outcome: LayerOutcome,
    /// Host time before the render call.
    pub begin: HostTime,
    /// Host time after the render call.
    pub end: HostTime,
}

/// Emitted when a sweep finishes.
#[derive(Clone, Copy, Debug)]
pub struct SweepEndEvent {
    /// Sweep counter.
    pub sweep_index: u64,
    /// Host time at the end of the sweep.
    pub timestamp: HostTime,
    /// Layers re-recorded by this sweep.
    pub rendered: u32,
    /// Layers whose render failed.
    pub failed: u32,
}

/// Emitted when the worker asks the host to repaint.
#[derive(Clone, Copy, Debug)]
pub struct RepaintEvent {
    /// The sweep that requested the repaint.
    pub sweep_index: u64,
    /// Host time of the request.
    pub timestamp: HostTime,
}

/// Emitted after the compositor paints a frame.
#[derive(Clone, Copy, Debug)]
pub struct CompositeEvent {
    /// Monotonic composite counter, starting at 0.
    pub frame_index: u64,
    /// Host time before the first layer was painted.
    pub begin: HostTime,
    /// Host time after the overlay was drawn.
    pub end: HostTime,
    /// Layers whose recording was replayed.
    pub painted: u32,
    /// Layers skipped because they are hidden.
    pub hidden: u32,
    /// Layers skipped because they have no recording yet.
    pub empty: u32,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the render worker and the compositor.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a sweep starts.
    fn on_sweep_begin(&mut self, e: &SweepBeginEvent) {
        _ = e;
    }

    /// Called after each layer's render attempt.
    fn on_layer_render(&mut self, e: &LayerRenderEvent) {
        _ = e;
    }

    /// Called when a sweep finishes.
    fn on_sweep_end(&mut self, e: &SweepEndEvent) {
        _ = e;
    }

    /// Called when a repaint is requested.
    fn on_repaint(&mut self, e: &RepaintEvent) {
        _ = e;
    }

    /// Called after a composite.
    fn on_composite(&mut self, e: &CompositeEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// SharedSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] shared between threads.
///
/// Every clone forwards to the same inner sink under a mutex. Events from
/// the worker and the foreground interleave in arrival order.
#[derive(Debug, Default)]
pub struct SharedSink<S> {
    inner: Arc<Mutex<S>>,
}

impl<S> Clone for SharedSink<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: TraceSink> SharedSink<S> {
    /// Wraps `sink` for sharing.
    #[must_use]
    pub fn new(sink: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(sink)),
        }
    }

    /// Locks the inner sink, e.g. to read what it collected.
    pub fn lock(&self) -> MutexGuard<'_, S> {
        self.inner.lock()
    }
}

impl<S: TraceSink> TraceSink for SharedSink<S> {
    fn on_sweep_begin(&mut self, e: &SweepBeginEvent) {
        self.inner.lock().on_sweep_begin(e);
    }

    fn on_layer_render(&mut self, e: &LayerRenderEvent) {
        self.inner.lock().on_layer_render(e);
    }

    fn on_sweep_end(&mut self, e: &SweepEndEvent) {
        self.inner.lock().on_sweep_end(e);
    }

    fn on_repaint(&mut self, e: &RepaintEvent) {
        self.inner.lock().on_repaint(e);
    }

    fn on_composite(&mut self, e: &CompositeEvent) {
        self.inner.lock().on_composite(e);
    }
}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`SweepBeginEvent`].
    #[inline]
    pub fn sweep_begin(&mut self, e: &SweepBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_sweep_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`LayerRenderEvent`].
    #[inline]
    pub fn layer_render(&mut self, e: &LayerRenderEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_layer_render(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`SweepEndEvent`].
    #[inline]
    pub fn sweep_end(&mut self, e: &SweepEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_sweep_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`RepaintEvent`].
    #[inline]
    pub fn repaint(&mut self, e: &RepaintEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_repaint(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`CompositeEvent`].
    #[inline]
    pub fn composite(&mut self, e: &CompositeEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_composite(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Whether events reach a sink. Always `false` without the `trace`
    /// feature.
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        #[cfg(feature = "trace")]
        {
            self.sink.is_some()
        }
        #[cfg(not(feature = "trace"))]
        {
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_begin() -> SweepBeginEvent {
        SweepBeginEvent {
            sweep_index: 3,
            timestamp: HostTime(1_000),
            layer_count: 4,
            merged_triggers: 2,
        }
    }

    #[derive(Default)]
    struct CountingSink {
        begins: Vec<u64>,
        composites: u32,
    }

    impl TraceSink for CountingSink {
        fn on_sweep_begin(&mut self, e: &SweepBeginEvent) {
            self.begins.push(e.sweep_index);
        }

        fn on_composite(&mut self, _e: &CompositeEvent) {
            self.composites += 1;
        }
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_sweep_begin(&sample_begin());
        sink.on_sweep_end(&SweepEndEvent {
            sweep_index: 3,
            timestamp: HostTime(2_000),
            rendered: 1,
            failed: 0,
        });
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        assert!(!tracer.is_enabled());
        tracer.sweep_begin(&sample_begin());
        tracer.repaint(&RepaintEvent {
            sweep_index: 0,
            timestamp: HostTime(0),
        });
    }

    #[test]
    fn shared_sink_clones_feed_one_sink() {
        let shared = SharedSink::new(CountingSink::default());
        let mut worker_side = shared.clone();
        let mut foreground_side = shared.clone();

        std::thread::spawn(move || worker_side.on_sweep_begin(&sample_begin()))
            .join()
            .expect("worker thread");
        foreground_side.on_composite(&CompositeEvent {
            frame_index: 0,
            begin: HostTime(0),
            end: HostTime(10),
            painted: 4,
            hidden: 0,
            empty: 0,
        });

        let sink = shared.lock();
        assert_eq!(sink.begins, [3]);
        assert_eq!(sink.composites, 1);
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        let mut sink = CountingSink::default();
        let mut tracer = Tracer::new(&mut sink);
        assert!(tracer.is_enabled());
        tracer.sweep_begin(&sample_begin());
        // Access sink after tracer is dropped.
        drop(tracer);
        assert_eq!(sink.begins, [3]);
    }
}
