// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer render cache with background re-recording and ordered compositing.
//!
//! `strata_core` manages a stack of independently invalidatable layers. Each
//! layer's drawing is expensive to produce but cheap to replay, so the
//! drawing is captured once as an immutable [`Recording`](recording::Recording)
//! and replayed on every paint until the layer is invalidated.
//!
//! # Architecture
//!
//! Two roles cooperate: a single render worker that produces recordings and
//! the host's foreground paint callback that consumes them.
//!
//! ```text
//!   host event (resize, input, property change)
//!       │  invalidate(name) / invalidate_all()
//!       ▼
//!   LayerStack ──trigger()──► RenderScheduler (worker thread)
//!       ▲                          │  run_sweep(): render every dirty layer
//!       │                          ▼
//!       │                    RepaintRequester::request_repaint()  (once per sweep)
//!       │                          │
//!       │           host marshals to its paint callback
//!       │                          ▼
//!       └──── snapshot() ◄── Compositor::paint(surface)  (foreground)
//! ```
//!
//! **[`recording`]**: Draw operations, the [`Recorder`](recording::Recorder)
//! builder handed to draw callbacks, and the [`Surface`](recording::Surface)
//! trait recordings replay onto.
//!
//! **[`layer`]**: [`LayerRecord`](layer::LayerRecord) (dirty state, cached
//! recording, counters, paint modifiers) and the name-unique, ordered
//! [`LayerStack`](layer::LayerStack) with generational handles.
//!
//! **[`scheduler`]**: The render worker and its
//! `Idle → Triggered → Rendering → Idle` state machine with
//! at-most-one-pending-cycle coalescing.
//!
//! **[`compositor`]**: Replays published recordings in stack order, with an
//! optional diagnostic overlay.
//!
//! **[`host`]**: [`LayerHost`](host::LayerHost), which maps a hosting
//! widget's callbacks onto the pieces above.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! sweep and paint instrumentation, with a zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! **[`time`]**: Monotonic [`HostTime`](time::HostTime) stamps used by
//! trace events.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod compositor;
pub mod error;
pub mod host;
pub mod layer;
pub mod recording;
pub mod scheduler;
pub mod time;
pub mod trace;
