// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A single cached layer.

use core::any::Any;
use core::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use kurbo::Rect;
use parking_lot::{Mutex, RwLock};

use super::drawable::Drawable;
use crate::error::DrawError;
use crate::recording::{Recorder, Recording, Surface};

/// Result of a successful [`LayerRecord::render`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderOutcome {
    /// The layer was dirty and a new recording was published.
    Rendered,
    /// The layer was clean; nothing ran.
    Clean,
}

/// Result of a [`LayerRecord::paint`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PaintOutcome {
    /// The recording was replayed onto the surface.
    Drawn,
    /// A recording exists but the layer is hidden; nothing was drawn.
    Hidden,
    /// The layer has never rendered successfully; nothing was drawn.
    Empty,
}

/// Cached render state for one layer.
///
/// Shared between the stack, the render worker and the compositor as an
/// `Arc<LayerRecord>`. All methods take `&self`:
///
/// - Dirty state is a pair of epochs. [`invalidate`](Self::invalidate) bumps
///   the invalidation epoch; a successful [`render`](Self::render) stores the
///   epoch it observed *before* drawing. An invalidation that lands while a
///   draw is in flight therefore keeps the layer dirty.
/// - The recording is published by swapping an `Arc` handle under a write
///   lock held only for the swap. Readers clone the handle and replay
///   without holding the lock.
pub struct LayerRecord {
    name: RwLock<Arc<str>>,
    drawable: RwLock<Arc<dyn Drawable>>,
    recording: RwLock<Option<Arc<Recording>>>,
    /// Held for the whole of a render.
    render_lock: Mutex<()>,

    // -- Dirty epochs --
    invalidated: AtomicU64,
    rendered: AtomicU64,

    // -- Diagnostics --
    render_count: AtomicU64,
    paint_count: AtomicU64,
    failure_count: AtomicU64,

    // -- Paint-time modifiers --
    visible: AtomicBool,
    opacity: AtomicU32,
}

impl fmt::Debug for LayerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerRecord")
            .field("name", &self.name())
            .field("dirty", &self.is_dirty())
            .field("has_recording", &self.recording.read().is_some())
            .field("render_count", &self.render_count())
            .field("paint_count", &self.paint_count())
            .field("failure_count", &self.failure_count())
            .field("visible", &self.is_visible())
            .field("opacity", &self.opacity())
            .finish_non_exhaustive()
    }
}

impl LayerRecord {
    /// Creates a dirty record with no recording, visible at full opacity.
    pub fn new(name: impl Into<Arc<str>>, drawable: impl Drawable + 'static) -> Self {
        Self::with_shared(name.into(), Arc::new(drawable))
    }

    pub(crate) fn with_shared(name: Arc<str>, drawable: Arc<dyn Drawable>) -> Self {
        Self {
            name: RwLock::new(name),
            drawable: RwLock::new(drawable),
            recording: RwLock::new(None),
            render_lock: Mutex::new(()),
            invalidated: AtomicU64::new(1),
            rendered: AtomicU64::new(0),
            render_count: AtomicU64::new(0),
            paint_count: AtomicU64::new(0),
            failure_count: AtomicU64::new(0),
            visible: AtomicBool::new(true),
            opacity: AtomicU32::new(1.0_f32.to_bits()),
        }
    }

    // -- Cache lifecycle --

    /// Marks the cached recording stale.
    ///
    /// Leaves the recording and all counters untouched.
    pub fn invalidate(&self) {
        self.invalidated.fetch_add(1, Ordering::AcqRel);
    }

    /// Re-records the layer if it is dirty.
    ///
    /// A clean layer returns [`RenderOutcome::Clean`] without running its
    /// drawable. A dirty layer runs the drawable against a fresh
    /// [`Recorder`] for `bounds`; on success the finished recording replaces
    /// the previous one, the render count increments and the layer becomes
    /// clean. On failure, including a panic inside the drawable, the previous
    /// recording stays published, the layer stays dirty and the error is
    /// returned.
    ///
    /// Renders of one record are serialized. A call that arrives while
    /// another is drawing waits for it, then finds the layer clean unless it
    /// was invalidated in between.
    pub fn render(&self, bounds: Rect) -> Result<RenderOutcome, DrawError> {
        let _render = self.render_lock.lock();
        let target = self.invalidated.load(Ordering::Acquire);
        if target == self.rendered.load(Ordering::Acquire) {
            return Ok(RenderOutcome::Clean);
        }

        let drawable = Arc::clone(&self.drawable.read());
        let mut recorder = Recorder::new(bounds);
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            drawable.draw(&mut recorder, bounds)
        }))
        .unwrap_or_else(|payload| Err(DrawError::Panicked(panic_message(payload.as_ref()))));

        match result {
            Ok(()) => {
                let recording = Arc::new(recorder.finish());
                let previous = self.recording.write().replace(recording);
                // Released outside the lock; a compositor mid-replay may
                // still hold its own handle.
                drop(previous);
                self.render_count.fetch_add(1, Ordering::Relaxed);
                self.rendered.store(target, Ordering::Release);
                Ok(RenderOutcome::Rendered)
            }
            Err(err) => {
                self.failure_count.fetch_add(1, Ordering::Relaxed);
                Err(err)
            }
        }
    }

    /// Replays the cached recording onto `surface`.
    ///
    /// Without a recording this is a no-op. With one, the paint count
    /// increments whether or not the layer is visible, and the recording is
    /// replayed at the layer's opacity only when it is visible.
    pub fn paint(&self, surface: &mut dyn Surface) -> PaintOutcome {
        let Some(recording) = self.recording() else {
            return PaintOutcome::Empty;
        };
        self.paint_count.fetch_add(1, Ordering::Relaxed);
        if !self.is_visible() {
            return PaintOutcome::Hidden;
        }
        recording.replay(surface, self.opacity());
        PaintOutcome::Drawn
    }

    // -- Getters --

    /// The layer's current name.
    #[must_use]
    pub fn name(&self) -> Arc<str> {
        Arc::clone(&self.name.read())
    }

    /// Whether the cached recording is stale or absent.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.invalidated.load(Ordering::Acquire) != self.rendered.load(Ordering::Acquire)
    }

    /// A handle to the currently published recording, if any.
    #[must_use]
    pub fn recording(&self) -> Option<Arc<Recording>> {
        self.recording.read().clone()
    }

    /// Number of successful renders.
    #[must_use]
    pub fn render_count(&self) -> u64 {
        self.render_count.load(Ordering::Relaxed)
    }

    /// Number of paint calls that found a recording.
    #[must_use]
    pub fn paint_count(&self) -> u64 {
        self.paint_count.load(Ordering::Relaxed)
    }

    /// Number of failed render attempts.
    #[must_use]
    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// Whether the layer is drawn when painted.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Relaxed)
    }

    /// Paint opacity in `[0, 1]`.
    #[must_use]
    pub fn opacity(&self) -> f32 {
        f32::from_bits(self.opacity.load(Ordering::Relaxed))
    }

    // -- Setters (validated by the stack) --

    pub(crate) fn set_name(&self, name: Arc<str>) {
        *self.name.write() = name;
    }

    pub(crate) fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::Relaxed);
    }

    pub(crate) fn toggle_visible(&self) -> bool {
        !self.visible.fetch_xor(true, Ordering::Relaxed)
    }

    /// `opacity` must already be clamped to `[0, 1]`.
    pub(crate) fn set_opacity(&self, opacity: f32) {
        self.opacity.store(opacity.to_bits(), Ordering::Relaxed);
    }

    pub(crate) fn set_drawable(&self, drawable: Arc<dyn Drawable>) {
        *self.drawable.write() = drawable;
        self.invalidate();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
