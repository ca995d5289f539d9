// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simulated chart host that exercises the layer cache end to end.
//!
//! Builds a four-layer chart, hosts it in a [`LayerHost`] and plays a short
//! script of host callbacks against it: a resize, a tap that touches the data
//! layer, and a grid visibility toggle. Every event goes to both a
//! [`PrettyPrintSink`] (stderr) and a [`RecorderSink`]; the recording is
//! exported as Chrome trace JSON at the end.
//!
//! ```text
//! cargo run -p layer_demo -- [trace.json]
//! ```
//!
//! Set `RUST_LOG=debug` to see the cache's own log output.

use std::fs::File;
use std::io::BufWriter;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use kurbo::{Line, Point, Rect};
use parking_lot::Mutex;

use strata_core::compositor::{CompositeReport, CompositorConfig};
use strata_core::error::DrawError;
use strata_core::host::{HostConfig, LayerHost};
use strata_core::layer::{Drawable, LayerStack, Placement, from_fn};
use strata_core::recording::{Color, DrawOp, Recorder, Surface};
use strata_core::scheduler::{SchedulerConfig, SweepReport};
use strata_core::trace::{
    CompositeEvent, LayerRenderEvent, RepaintEvent, SharedSink, SweepBeginEvent, SweepEndEvent,
    TraceSink,
};

use strata_debug::pretty::PrettyPrintSink;
use strata_debug::recorder::RecorderSink;

const TIMEOUT: Duration = Duration::from_secs(5);
const GRID_STEP: f64 = 50.0;

/// Bar series behind the data layer. Taps append a value.
#[derive(Debug)]
struct Series {
    values: Mutex<Vec<f64>>,
}

impl Series {
    fn push(&self, value: f64) {
        self.values.lock().push(value);
    }
}

impl Drawable for Series {
    fn draw(&self, recorder: &mut Recorder, bounds: Rect) -> Result<(), DrawError> {
        let values = self.values.lock();
        if values.is_empty() {
            return Ok(());
        }
        let max = values.iter().copied().fold(f64::EPSILON, f64::max);
        let width = bounds.width() / values.len() as f64;
        for (i, value) in values.iter().enumerate() {
            let x0 = bounds.x0 + width * i as f64;
            let top = bounds.y1 - bounds.height() * (value / max);
            recorder.fill_rect(Rect::new(x0 + 2.0, top, x0 + width - 2.0, bounds.y1), Color::CYAN);
        }
        Ok(())
    }
}

/// Forwards every event to a pretty printer and a recorder.
#[derive(Debug)]
struct Tee {
    pretty: PrettyPrintSink,
    recorder: RecorderSink,
}

impl TraceSink for Tee {
    fn on_sweep_begin(&mut self, e: &SweepBeginEvent) {
        self.pretty.on_sweep_begin(e);
        self.recorder.on_sweep_begin(e);
    }

    fn on_layer_render(&mut self, e: &LayerRenderEvent) {
        self.pretty.on_layer_render(e);
        self.recorder.on_layer_render(e);
    }

    fn on_sweep_end(&mut self, e: &SweepEndEvent) {
        self.pretty.on_sweep_end(e);
        self.recorder.on_sweep_end(e);
    }

    fn on_repaint(&mut self, e: &RepaintEvent) {
        self.pretty.on_repaint(e);
        self.recorder.on_repaint(e);
    }

    fn on_composite(&mut self, e: &CompositeEvent) {
        self.pretty.on_composite(e);
        self.recorder.on_composite(e);
    }
}

/// Stand-in for a real canvas: counts ops and echoes overlay text.
#[derive(Debug, Default)]
struct ConsoleSurface {
    ops: usize,
    /// Ops whose effective alpha rounded to zero.
    invisible: usize,
}

impl Surface for ConsoleSurface {
    fn clear(&mut self, _color: Color) {
        self.ops = 0;
        self.invisible = 0;
    }

    fn draw(&mut self, op: &DrawOp, opacity: f32) {
        self.ops += 1;
        if op.color().with_opacity(opacity).a == 0 {
            self.invisible += 1;
            return;
        }
        if let DrawOp::Text { text, .. } = op {
            println!("    {text}");
        }
    }
}

fn chart(series: Arc<Series>) -> Arc<LayerStack> {
    let stack = Arc::new(LayerStack::new());
    stack
        .add(
            "background",
            from_fn(|rec, bounds| {
                rec.fill_rect(bounds, Color::WHITE);
                Ok(())
            }),
            Placement::Top,
        )
        .expect("add background");
    stack
        .add(
            "grid",
            from_fn(|rec, bounds| {
                let mut x = bounds.x0;
                while x <= bounds.x1 {
                    rec.line(Line::new((x, bounds.y0), (x, bounds.y1)), 1.0, Color::DARK_GRAY);
                    x += GRID_STEP;
                }
                let mut y = bounds.y0;
                while y <= bounds.y1 {
                    rec.line(Line::new((bounds.x0, y), (bounds.x1, y)), 1.0, Color::DARK_GRAY);
                    y += GRID_STEP;
                }
                Ok(())
            }),
            Placement::Top,
        )
        .expect("add grid");
    stack
        .add_shared("data", series, Placement::Top)
        .expect("add data");
    stack
        .add(
            "legend",
            from_fn(|rec, bounds| {
                let origin = Point::new(bounds.x1 - 120.0, bounds.y0 + 20.0);
                let frame = Rect::new(
                    origin.x - 4.0,
                    origin.y - 16.0,
                    bounds.x1 - 4.0,
                    origin.y + 4.0,
                );
                rec.push(DrawOp::StrokeRect {
                    rect: frame,
                    width: 1.0,
                    color: Color::BLUE,
                });
                rec.text(origin, "requests/s", 14.0, Color::BLUE);
                Ok(())
            }),
            Placement::Top,
        )
        .expect("add legend");
    stack
}

/// Waits for the worker to settle, then paints once if it asked for a repaint.
fn settle_and_paint(
    host: &mut LayerHost,
    repaints: &Receiver<u64>,
    surface: &mut ConsoleSurface,
    bounds: Rect,
) {
    assert!(host.scheduler().wait_idle(TIMEOUT), "worker did not settle");
    let sweeps: Vec<u64> = repaints.try_iter().collect();
    if sweeps.is_empty() {
        println!("  nothing to paint");
        return;
    }
    log::info!("repaint requested by sweeps {sweeps:?}");
    let report = host.on_paint_requested(surface, bounds);
    print_report(&report, surface);
}

fn print_report(report: &CompositeReport, surface: &ConsoleSurface) {
    println!(
        "  frame {}: painted {} hidden {} empty {} ({} ops, {} invisible)",
        report.frame_index,
        report.painted,
        report.hidden,
        report.empty,
        surface.ops,
        surface.invisible,
    );
}

fn main() {
    env_logger::init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "layer_trace.json".to_owned());

    let series = Arc::new(Series {
        values: Mutex::new(vec![3.0, 5.0, 2.0, 8.0]),
    });
    let stack = chart(Arc::clone(&series));

    let sink = SharedSink::new(Tee {
        pretty: PrettyPrintSink::stderr(),
        recorder: RecorderSink::new(),
    });

    let (tx, rx) = mpsc::channel();
    let repaint = move |report: &SweepReport| {
        // The receiver only goes away when the demo is done.
        let _ = tx.send(report.index);
    };

    let mut bounds = Rect::new(0.0, 0.0, 640.0, 480.0);
    let config = HostConfig::new()
        .with_initial_bounds(bounds)
        .with_scheduler(SchedulerConfig::paced_60hz())
        .with_compositor(CompositorConfig::diagnostic());
    let mut host = LayerHost::with_trace_sink(Arc::clone(&stack), repaint, config, sink.clone())
        .expect("failed to start render worker");
    let mut surface = ConsoleSurface::default();

    println!("initial paint:");
    settle_and_paint(&mut host, &rx, &mut surface, bounds);

    println!("resize:");
    bounds = Rect::new(0.0, 0.0, 800.0, 600.0);
    host.on_bounds_changed(bounds);
    settle_and_paint(&mut host, &rx, &mut surface, bounds);

    println!("tap:");
    series.push(6.0);
    host.on_input_event(["data"]).expect("data layer exists");
    settle_and_paint(&mut host, &rx, &mut surface, bounds);

    // Visibility is a paint attribute: no sweep, just another composite.
    println!("hide grid:");
    let visible = stack.toggle_visibility("grid").expect("grid layer exists");
    debug_assert!(!visible, "grid starts visible");
    let report = host.on_paint_requested(&mut surface, bounds);
    print_report(&report, &surface);

    // Fading the legend out is paint-time too.
    println!("fade legend:");
    stack.set_opacity("legend", 0.0).expect("legend layer exists");
    let report = host.on_paint_requested(&mut surface, bounds);
    print_report(&report, &surface);

    let sweeps = host.scheduler().sweep_count();
    host.shutdown();

    let tee = sink.lock();
    let file = File::create(&path).expect("failed to create trace file");
    let mut writer = BufWriter::new(file);
    strata_debug::chrome::export(tee.recorder.as_bytes(), &mut writer)
        .expect("failed to write Chrome trace");

    println!("Wrote {path} ({sweeps} sweeps)");
}
