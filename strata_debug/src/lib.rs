// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording, pretty-printing, and Chrome trace export for strata
//! diagnostics.
//!
//! This crate provides [`TraceSink`](strata_core::trace::TraceSink)
//! implementations for development and post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`]: human-readable one-line-per-event output.
//! - [`recorder::RecorderSink`]: compact binary recording with
//!   [`recorder::decode`] for playback.
//! - [`chrome::export`]: writes Chrome Trace Event Format JSON from recorded
//!   bytes.
//!
//! Depending on this crate turns on `strata_core`'s `trace` feature, so sweep
//! and composite events actually reach the sinks. Wrap a sink in a
//! [`SharedSink`](strata_core::trace::SharedSink) to collect events from the
//! render worker and the foreground in one place.

pub mod chrome;
pub mod pretty;
pub mod recorder;
