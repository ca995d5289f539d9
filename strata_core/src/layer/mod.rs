// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer data model.
//!
//! A *layer* is one independently invalidatable slice of the output. Each
//! layer has:
//!
//! - An identity: a unique, renamable name within its [`LayerStack`], plus a
//!   generational [`LayerId`] handle that becomes stale when the layer is
//!   removed.
//! - A [`Drawable`] capability that records the layer's content for a given
//!   set of bounds.
//! - Cached state in its [`LayerRecord`]: the last complete
//!   [`Recording`](crate::recording::Recording), a dirty marker, render and
//!   paint counters.
//! - **Paint-time modifiers**: [`visibility`](LayerStack::set_visibility) and
//!   [`opacity`](LayerStack::set_opacity). Changing them never re-renders.
//!
//! # Ordering
//!
//! The stack's order is bottom-to-top paint order. Both the render worker and
//! the compositor walk the same immutable [`snapshot`](LayerStack::snapshot)
//! of that order, which is republished on every structural change.

mod drawable;
mod id;
mod record;
mod stack;

pub use drawable::{Drawable, from_fn};
pub use id::LayerId;
pub use record::{LayerRecord, PaintOutcome, RenderOutcome};
pub use stack::{LayerStack, Placement, Snapshot};
