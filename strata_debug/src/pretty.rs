// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Timestamps
//! are printed in microseconds since the host clock's epoch.

use std::io::Write;

use strata_core::trace::{
    CompositeEvent, LayerOutcome, LayerRenderEvent, RepaintEvent, SweepBeginEvent, SweepEndEvent,
    TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write + Send>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns its writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn outcome_name(outcome: LayerOutcome) -> &'static str {
    match outcome {
        LayerOutcome::Rendered => "rendered",
        LayerOutcome::Clean => "clean",
        LayerOutcome::Failed => "FAILED",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_sweep_begin(&mut self, e: &SweepBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[sweep:begin] sweep={} layers={} triggers={} at {:.1}µs",
            e.sweep_index,
            e.layer_count,
            e.merged_triggers,
            e.timestamp.micros(),
        );
    }

    fn on_layer_render(&mut self, e: &LayerRenderEvent) {
        let _ = writeln!(
            self.writer,
            "[layer] sweep={} #{} {} in {:.1}µs",
            e.sweep_index,
            e.position,
            outcome_name(e.outcome),
            (e.end - e.begin).as_secs_f64() * 1e6,
        );
    }

    fn on_sweep_end(&mut self, e: &SweepEndEvent) {
        let _ = writeln!(
            self.writer,
            "[sweep:end] sweep={} rendered={} failed={} at {:.1}µs",
            e.sweep_index,
            e.rendered,
            e.failed,
            e.timestamp.micros(),
        );
    }

    fn on_repaint(&mut self, e: &RepaintEvent) {
        let _ = writeln!(
            self.writer,
            "[repaint] sweep={} at {:.1}µs",
            e.sweep_index,
            e.timestamp.micros(),
        );
    }

    fn on_composite(&mut self, e: &CompositeEvent) {
        let _ = writeln!(
            self.writer,
            "[composite] frame={} painted={} hidden={} empty={} in {:.1}µs",
            e.frame_index,
            e.painted,
            e.hidden,
            e.empty,
            (e.end - e.begin).as_secs_f64() * 1e6,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::time::HostTime;

    #[test]
    fn pretty_print_sweep() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_sweep_begin(&SweepBeginEvent {
            sweep_index: 1,
            timestamp: HostTime(1_000_000),
            layer_count: 4,
            merged_triggers: 3,
        });
        sink.on_layer_render(&LayerRenderEvent {
            sweep_index: 1,
            position: 2,
            outcome: LayerOutcome::Failed,
            begin: HostTime(1_000_000),
            end: HostTime(1_002_500),
        });
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert!(output.contains("[sweep:begin] sweep=1"), "got: {output}");
        assert!(output.contains("triggers=3"), "got: {output}");
        assert!(output.contains("#2 FAILED in 2.5µs"), "got: {output}");
    }

    #[test]
    fn pretty_print_composite() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_composite(&CompositeEvent {
            frame_index: 9,
            begin: HostTime(0),
            end: HostTime(500),
            painted: 3,
            hidden: 1,
            empty: 0,
        });
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            output,
            "[composite] frame=9 painted=3 hidden=1 empty=0 in 0.5µs\n"
        );
    }
}
