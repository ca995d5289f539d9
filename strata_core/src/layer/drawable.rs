// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-layer draw capability.

use kurbo::Rect;

use crate::error::DrawError;
use crate::recording::Recorder;

/// Records a layer's content for a given set of bounds.
///
/// Only the render worker calls `draw`, possibly many times with different
/// bounds. Implementations are `Send + Sync` and must not share mutable state
/// with other layers; whatever they need to read should be captured by value
/// or behind the owner's own synchronization.
///
/// Returning an error (or panicking) leaves the layer's previous recording in
/// place and the layer dirty, so the draw is retried on the next sweep.
pub trait Drawable: Send + Sync {
    /// Issues the layer's drawing operations into `recorder`.
    fn draw(&self, recorder: &mut Recorder, bounds: Rect) -> Result<(), DrawError>;
}

impl<F> Drawable for F
where
    F: Fn(&mut Recorder, Rect) -> Result<(), DrawError> + Send + Sync,
{
    fn draw(&self, recorder: &mut Recorder, bounds: Rect) -> Result<(), DrawError> {
        self(recorder, bounds)
    }
}

/// Adapts a closure into a [`Drawable`], fixing its signature so argument
/// types are inferred.
///
/// ```
/// use strata_core::layer::from_fn;
/// use strata_core::recording::Color;
///
/// let background = from_fn(|rec, bounds| {
///     rec.fill_rect(bounds, Color::BLACK);
///     Ok(())
/// });
/// # let _ = background;
/// ```
pub fn from_fn<F>(f: F) -> F
where
    F: Fn(&mut Recorder, Rect) -> Result<(), DrawError> + Send + Sync,
{
    f
}
