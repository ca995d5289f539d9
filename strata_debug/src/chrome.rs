// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][spec] JSON to the given writer.
//!
//! Sweeps and layer renders land on the render worker's track, composites on
//! the foreground track.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use strata_core::time::HostTime;

use crate::recorder::{RecordedEvent, decode};

/// Track of the host's paint callback.
const TID_FOREGROUND: u32 = 0;
/// Track of the render worker.
const TID_WORKER: u32 = 1;

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
/// Timestamps are microseconds since the host clock's epoch.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = vec![
        thread_name(TID_FOREGROUND, "foreground"),
        thread_name(TID_WORKER, "render worker"),
    ];

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::SweepBegin(e) => {
                events.push(json!({
                    "ph": "B",
                    "name": "Sweep",
                    "cat": "Render",
                    "ts": us(e.timestamp),
                    "pid": 0,
                    "tid": TID_WORKER,
                    "args": {
                        "sweep_index": e.sweep_index,
                        "layer_count": e.layer_count,
                        "merged_triggers": e.merged_triggers,
                    }
                }));
            }
            RecordedEvent::LayerRender(e) => {
                events.push(json!({
                    "ph": "X",
                    "name": format!("layer {}", e.position),
                    "cat": "Render",
                    "ts": us(e.begin),
                    "dur": us(e.end) - us(e.begin),
                    "pid": 0,
                    "tid": TID_WORKER,
                    "args": {
                        "sweep_index": e.sweep_index,
                        "outcome": format!("{:?}", e.outcome),
                    }
                }));
            }
            RecordedEvent::SweepEnd(e) => {
                events.push(json!({
                    "ph": "E",
                    "name": "Sweep",
                    "cat": "Render",
                    "ts": us(e.timestamp),
                    "pid": 0,
                    "tid": TID_WORKER,
                    "args": {
                        "rendered": e.rendered,
                        "failed": e.failed,
                    }
                }));
            }
            RecordedEvent::Repaint(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Repaint",
                    "cat": "Render",
                    "ts": us(e.timestamp),
                    "pid": 0,
                    "tid": TID_WORKER,
                    "s": "t",
                    "args": {
                        "sweep_index": e.sweep_index,
                    }
                }));
            }
            RecordedEvent::Composite(e) => {
                events.push(json!({
                    "ph": "X",
                    "name": "Composite",
                    "cat": "Paint",
                    "ts": us(e.begin),
                    "dur": us(e.end) - us(e.begin),
                    "pid": 0,
                    "tid": TID_FOREGROUND,
                    "args": {
                        "frame_index": e.frame_index,
                        "painted": e.painted,
                        "hidden": e.hidden,
                        "empty": e.empty,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn thread_name(tid: u32, name: &str) -> Value {
    json!({
        "ph": "M",
        "name": "thread_name",
        "pid": 0,
        "tid": tid,
        "args": { "name": name }
    })
}

fn us(t: HostTime) -> f64 {
    t.micros()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use strata_core::trace::{
        CompositeEvent, LayerOutcome, LayerRenderEvent, SweepBeginEvent, SweepEndEvent, TraceSink,
    };

    #[test]
    fn export_produces_valid_json() {
        let mut rec = RecorderSink::new();
        rec.on_sweep_begin(&SweepBeginEvent {
            sweep_index: 0,
            timestamp: HostTime(1_000_000),
            layer_count: 1,
            merged_triggers: 1,
        });
        rec.on_layer_render(&LayerRenderEvent {
            sweep_index: 0,
            position: 0,
            outcome: LayerOutcome::Rendered,
            begin: HostTime(1_000_000),
            end: HostTime(1_004_000),
        });
        rec.on_sweep_end(&SweepEndEvent {
            sweep_index: 0,
            timestamp: HostTime(1_005_000),
            rendered: 1,
            failed: 0,
        });
        rec.on_composite(&CompositeEvent {
            frame_index: 0,
            begin: HostTime(2_000_000),
            end: HostTime(2_001_000),
            painted: 1,
            hidden: 0,
            empty: 0,
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();

        // Two metadata records, then one per event.
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.len(), 6);
        assert_eq!(parsed[0]["ph"], "M");

        assert_eq!(parsed[2]["ph"], "B");
        assert_eq!(parsed[2]["name"], "Sweep");
        assert_eq!(parsed[2]["ts"], 1000.0);

        assert_eq!(parsed[3]["ph"], "X");
        assert_eq!(parsed[3]["name"], "layer 0");
        assert_eq!(parsed[3]["dur"], 4.0);
        assert_eq!(parsed[3]["args"]["outcome"], "Rendered");

        assert_eq!(parsed[4]["ph"], "E");
        assert_eq!(parsed[5]["name"], "Composite");
        assert_eq!(parsed[5]["tid"], TID_FOREGROUND);
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert!(parsed.iter().all(|e| e["ph"] == "M"), "only metadata");
    }
}
