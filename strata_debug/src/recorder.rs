// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records, one tag byte followed by
//! the event's fields. [`decode`] reads them back as an iterator of
//! [`RecordedEvent`].

use strata_core::time::HostTime;
use strata_core::trace::{
    CompositeEvent, LayerOutcome, LayerRenderEvent, RepaintEvent, SweepBeginEvent, SweepEndEvent,
    TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_SWEEP_BEGIN: u8 = 1;
const TAG_LAYER_RENDER: u8 = 2;
const TAG_SWEEP_END: u8 = 3;
const TAG_REPAINT: u8 = 4;
const TAG_COMPOSITE: u8 = 5;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_time(&mut self, t: HostTime) {
        self.write_u64(t.nanos());
    }

    fn write_outcome(&mut self, o: LayerOutcome) {
        self.write_u8(match o {
            LayerOutcome::Rendered => 0,
            LayerOutcome::Clean => 1,
            LayerOutcome::Failed => 2,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_sweep_begin(&mut self, e: &SweepBeginEvent) {
        self.write_u8(TAG_SWEEP_BEGIN);
        self.write_u64(e.sweep_index);
        self.write_time(e.timestamp);
        self.write_u32(e.layer_count);
        self.write_u32(e.merged_triggers);
    }

    fn on_layer_render(&mut self, e: &LayerRenderEvent) {
        self.write_u8(TAG_LAYER_RENDER);
        self.write_u64(e.sweep_index);
        self.write_u32(e.position);
        self.write_outcome(e.outcome);
        self.write_time(e.begin);
        self.write_time(e.end);
    }

    fn on_sweep_end(&mut self, e: &SweepEndEvent) {
        self.write_u8(TAG_SWEEP_END);
        self.write_u64(e.sweep_index);
        self.write_time(e.timestamp);
        self.write_u32(e.rendered);
        self.write_u32(e.failed);
    }

    fn on_repaint(&mut self, e: &RepaintEvent) {
        self.write_u8(TAG_REPAINT);
        self.write_u64(e.sweep_index);
        self.write_time(e.timestamp);
    }

    fn on_composite(&mut self, e: &CompositeEvent) {
        self.write_u8(TAG_COMPOSITE);
        self.write_u64(e.frame_index);
        self.write_time(e.begin);
        self.write_time(e.end);
        self.write_u32(e.painted);
        self.write_u32(e.hidden);
        self.write_u32(e.empty);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`SweepBeginEvent`].
    SweepBegin(SweepBeginEvent),
    /// A [`LayerRenderEvent`].
    LayerRender(LayerRenderEvent),
    /// A [`SweepEndEvent`].
    SweepEnd(SweepEndEvent),
    /// A [`RepaintEvent`].
    Repaint(RepaintEvent),
    /// A [`CompositeEvent`].
    Composite(CompositeEvent),
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
///
/// Iteration stops at the first unknown tag, unknown outcome or truncated
/// record.
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?.try_into().ok()?;
        self.pos += N;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[v]| v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_time(&mut self) -> Option<HostTime> {
        self.read_u64().map(HostTime)
    }

    fn read_outcome(&mut self) -> Option<LayerOutcome> {
        match self.read_u8()? {
            0 => Some(LayerOutcome::Rendered),
            1 => Some(LayerOutcome::Clean),
            2 => Some(LayerOutcome::Failed),
            _ => None,
        }
    }

    fn decode_sweep_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::SweepBegin(SweepBeginEvent {
            sweep_index: self.read_u64()?,
            timestamp: self.read_time()?,
            layer_count: self.read_u32()?,
            merged_triggers: self.read_u32()?,
        }))
    }

    fn decode_layer_render(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::LayerRender(LayerRenderEvent {
            sweep_index: self.read_u64()?,
            position: self.read_u32()?,
            outcome: self.read_outcome()?,
            begin: self.read_time()?,
            end: self.read_time()?,
        }))
    }

    fn decode_sweep_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::SweepEnd(SweepEndEvent {
            sweep_index: self.read_u64()?,
            timestamp: self.read_time()?,
            rendered: self.read_u32()?,
            failed: self.read_u32()?,
        }))
    }

    fn decode_repaint(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Repaint(RepaintEvent {
            sweep_index: self.read_u64()?,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_composite(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Composite(CompositeEvent {
            frame_index: self.read_u64()?,
            begin: self.read_time()?,
            end: self.read_time()?,
            painted: self.read_u32()?,
            hidden: self.read_u32()?,
            empty: self.read_u32()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_u8()? {
            TAG_SWEEP_BEGIN => self.decode_sweep_begin(),
            TAG_LAYER_RENDER => self.decode_layer_render(),
            TAG_SWEEP_END => self.decode_sweep_end(),
            TAG_REPAINT => self.decode_repaint(),
            TAG_COMPOSITE => self.decode_composite(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
