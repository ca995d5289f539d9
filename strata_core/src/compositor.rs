// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Foreground replay of cached recordings.
//!
//! The [`Compositor`] runs in the host's paint callback. It never renders: it
//! takes the stack's current snapshot and replays each layer's published
//! recording onto the output [`Surface`], bottom layer first, so later layers
//! draw over earlier ones. Layers that have not rendered yet are skipped.
//!
//! The compositor never waits on the render worker. It holds the stack lock
//! only to clone the snapshot and each record's lock only to clone its
//! recording handle.

use kurbo::{Point, Rect};

use crate::layer::{LayerStack, PaintOutcome};
use crate::recording::{Color, DrawOp, Surface};
use crate::time::HostClock;
use crate::trace::{CompositeEvent, Tracer};

/// Horizontal offset of the diagnostic overlay from the paint bounds.
const OVERLAY_X: f64 = 10.0;
/// Baseline of the first overlay line.
const OVERLAY_Y: f64 = 10.0;
/// Distance between overlay lines.
const OVERLAY_LINE_HEIGHT: f64 = 15.0;
/// Overlay font size.
const OVERLAY_TEXT_SIZE: f32 = 12.0;

/// Configuration for the [`Compositor`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompositorConfig {
    /// Draw one line of render/paint counters per layer over the output.
    pub overlay: bool,
    /// Clear the surface to this color before painting layers.
    pub clear: Option<Color>,
}

impl CompositorConfig {
    /// Layers only; the surface is not cleared.
    #[must_use]
    pub const fn plain() -> Self {
        Self {
            overlay: false,
            clear: None,
        }
    }

    /// Clears to black and draws the counter overlay.
    #[must_use]
    pub const fn diagnostic() -> Self {
        Self {
            overlay: true,
            clear: Some(Color::BLACK),
        }
    }
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self::plain()
    }
}

/// What one composite did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompositeReport {
    /// Composite counter.
    pub frame_index: u64,
    /// Layers whose recording was replayed.
    pub painted: u32,
    /// Layers with a recording that are hidden.
    pub hidden: u32,
    /// Layers without a recording.
    pub empty: u32,
    /// Overlay lines drawn.
    pub overlay_lines: u32,
}

/// Replays a [`LayerStack`] onto a [`Surface`].
#[derive(Debug)]
pub struct Compositor {
    config: CompositorConfig,
    clock: HostClock,
    frames: u64,
}

impl Compositor {
    /// Creates a compositor with its own clock.
    #[must_use]
    pub fn new(config: CompositorConfig) -> Self {
        Self::with_clock(config, HostClock::new())
    }

    /// Creates a compositor stamping trace events with `clock`.
    #[must_use]
    pub fn with_clock(config: CompositorConfig, clock: HostClock) -> Self {
        Self {
            config,
            clock,
            frames: 0,
        }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> CompositorConfig {
        self.config
    }

    /// Replaces the configuration, e.g. to toggle the overlay.
    pub fn set_config(&mut self, config: CompositorConfig) {
        self.config = config;
    }

    /// Number of composites so far.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Paints every layer of `stack` onto `surface`.
    pub fn paint(
        &mut self,
        stack: &LayerStack,
        surface: &mut dyn Surface,
        bounds: Rect,
    ) -> CompositeReport {
        self.paint_traced(stack, surface, bounds, &mut Tracer::none())
    }

    /// Like [`paint`](Self::paint), emitting a [`CompositeEvent`].
    pub fn paint_traced(
        &mut self,
        stack: &LayerStack,
        surface: &mut dyn Surface,
        bounds: Rect,
        tracer: &mut Tracer<'_>,
    ) -> CompositeReport {
        let snapshot = stack.snapshot();
        let begin = self.clock.now();
        let mut report = CompositeReport {
            frame_index: self.frames,
            ..CompositeReport::default()
        };

        if let Some(color) = self.config.clear {
            surface.clear(color);
        }

        for record in snapshot.iter() {
            match record.paint(surface) {
                PaintOutcome::Drawn => report.painted += 1,
                PaintOutcome::Hidden => report.hidden += 1,
                PaintOutcome::Empty => report.empty += 1,
            }
        }

        if self.config.overlay {
            for (i, record) in snapshot.iter().enumerate() {
                let text = format!(
                    "{} - Renders = {}, Paints = {}",
                    record.name(),
                    record.render_count(),
                    record.paint_count(),
                );
                let origin = Point::new(
                    bounds.x0 + OVERLAY_X,
                    bounds.y0 + OVERLAY_Y + OVERLAY_LINE_HEIGHT * i as f64,
                );
                surface.draw(
                    &DrawOp::Text {
                        origin,
                        text,
                        size: OVERLAY_TEXT_SIZE,
                        color: Color::LIME_GREEN,
                    },
                    1.0,
                );
                report.overlay_lines += 1;
            }
        }

        tracer.composite(&CompositeEvent {
            frame_index: report.frame_index,
            begin,
            end: self.clock.now(),
            painted: report.painted,
            hidden: report.hidden,
            empty: report.empty,
        });
        self.frames += 1;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DrawError;
    use crate::layer::{Placement, from_fn};
    use crate::recording::Recorder;

    const BOUNDS: Rect = Rect::new(0.0, 0.0, 400.0, 300.0);

    #[derive(Default)]
    struct LogSurface {
        cleared: Vec<Color>,
        ops: Vec<(DrawOp, f32)>,
    }

    impl Surface for LogSurface {
        fn clear(&mut self, color: Color) {
            self.cleared.push(color);
        }

        fn draw(&mut self, op: &DrawOp, opacity: f32) {
            self.ops.push((op.clone(), opacity));
        }
    }

    impl LogSurface {
        fn colors(&self) -> Vec<Color> {
            self.ops.iter().map(|(op, _)| op.color()).collect()
        }

        fn texts(&self) -> Vec<String> {
            self.ops
                .iter()
                .filter_map(|(op, _)| match op {
                    DrawOp::Text { text, .. } => Some(text.clone()),
                    _ => None,
                })
                .collect()
        }
    }

    fn solid(color: Color) -> impl Fn(&mut Recorder, Rect) -> Result<(), DrawError> {
        move |rec, bounds| {
            rec.fill_rect(bounds, color);
            Ok(())
        }
    }

    fn render_all(stack: &LayerStack) {
        for record in stack.snapshot().iter() {
            record.render(BOUNDS).expect("render");
        }
    }

    #[test]
    fn paints_bottom_first() {
        let stack = LayerStack::new();
        stack.add("red", solid(Color::RED), Placement::Top).expect("add");
        stack.add("blue", solid(Color::BLUE), Placement::Top).expect("add");
        render_all(&stack);

        let mut compositor = Compositor::new(CompositorConfig::plain());
        let mut surface = LogSurface::default();
        let report = compositor.paint(&stack, &mut surface, BOUNDS);

        assert_eq!(surface.colors(), [Color::RED, Color::BLUE]);
        assert!(surface.cleared.is_empty());
        assert_eq!(report.painted, 2);

        stack.swap("red", "blue").expect("swap");
        let mut surface = LogSurface::default();
        compositor.paint(&stack, &mut surface, BOUNDS);
        assert_eq!(surface.colors(), [Color::BLUE, Color::RED]);
        assert_eq!(compositor.frame_count(), 2);
    }

    #[test]
    fn skips_unrendered_and_hidden() {
        let stack = LayerStack::new();
        stack.add("shown", solid(Color::RED), Placement::Top).expect("add");
        stack.add("hidden", solid(Color::BLUE), Placement::Top).expect("add");
        render_all(&stack);
        stack
            .add("pending", solid(Color::YELLOW), Placement::Top)
            .expect("add");
        stack.set_visibility("hidden", false).expect("hide");

        let mut surface = LogSurface::default();
        let report = Compositor::new(CompositorConfig::plain()).paint(&stack, &mut surface, BOUNDS);

        assert_eq!(surface.colors(), [Color::RED]);
        assert_eq!((report.painted, report.hidden, report.empty), (1, 1, 1));
        assert_eq!(stack.get("hidden").expect("hidden").paint_count(), 1);
        assert_eq!(stack.get("pending").expect("pending").paint_count(), 0);
    }

    #[test]
    fn applies_layer_opacity() {
        let stack = LayerStack::new();
        stack.add("a", solid(Color::RED), Placement::Top).expect("add");
        render_all(&stack);
        stack.set_opacity("a", 0.5).expect("opacity");

        let mut surface = LogSurface::default();
        Compositor::new(CompositorConfig::plain()).paint(&stack, &mut surface, BOUNDS);
        assert_eq!(surface.ops[0].1, 0.5);
    }

    #[test]
    fn diagnostic_overlay_lists_counters() {
        let stack = LayerStack::new();
        stack.add("background", solid(Color::BLACK), Placement::Top).expect("add");
        stack.add("grid", solid(Color::DARK_GRAY), Placement::Top).expect("add");
        render_all(&stack);

        let mut compositor = Compositor::new(CompositorConfig::diagnostic());
        let mut surface = LogSurface::default();
        let report = compositor.paint(&stack, &mut surface, BOUNDS);

        assert_eq!(surface.cleared, [Color::BLACK]);
        assert_eq!(report.overlay_lines, 2);
        assert_eq!(
            surface.texts(),
            [
                "background - Renders = 1, Paints = 1",
                "grid - Renders = 1, Paints = 1",
            ]
        );

        let origins: Vec<(Point, Color)> = surface
            .ops
            .iter()
            .filter_map(|(op, _)| match op {
                DrawOp::Text { origin, color, .. } => Some((*origin, *color)),
                _ => None,
            })
            .collect();
        assert_eq!(
            origins,
            [
                (Point::new(10.0, 10.0), Color::LIME_GREEN),
                (Point::new(10.0, 25.0), Color::LIME_GREEN),
            ]
        );
    }

    #[test]
    fn empty_stack_paints_nothing() {
        let stack = LayerStack::new();
        let mut surface = LogSurface::default();
        let report =
            Compositor::new(CompositorConfig::diagnostic()).paint(&stack, &mut surface, BOUNDS);
        assert_eq!(report, CompositeReport::default());
        assert!(surface.ops.is_empty());
    }

    #[test]
    fn draw_from_fn_layers() {
        let stack = LayerStack::new();
        stack
            .add(
                "lines",
                from_fn(|rec, bounds| {
                    rec.stroke_rect(bounds, 1.0, Color::CYAN);
                    Ok(())
                }),
                Placement::Top,
            )
            .expect("add");
        render_all(&stack);
        let mut surface = LogSurface::default();
        Compositor::new(CompositorConfig::plain()).paint(&stack, &mut surface, BOUNDS);
        assert!(matches!(surface.ops[0].0, DrawOp::StrokeRect { .. }));
    }
}
