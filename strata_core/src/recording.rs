// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recorded drawing operations.
//!
//! A draw callback never touches the output directly. It receives a
//! [`Recorder`] for the layer bounds, issues operations into it, and the
//! finished [`Recording`] is published as an immutable snapshot. The
//! compositor later replays that snapshot onto a [`Surface`] as many times as
//! it likes.
//!
//! A `Recording` can only be obtained by [finishing](Recorder::finish) a
//! recorder, so a half-built recording is never observable.

use core::fmt;

use kurbo::{Line, Point, Rect};

/// Straight-alpha RGBA color, 8 bits per channel.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha; 255 is opaque.
    pub a: u8,
}

impl Color {
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    /// Fully transparent.
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);
    /// Opaque red.
    pub const RED: Self = Self::rgb(255, 0, 0);
    /// Opaque blue.
    pub const BLUE: Self = Self::rgb(0, 0, 255);
    /// Opaque yellow.
    pub const YELLOW: Self = Self::rgb(255, 255, 0);
    /// Opaque cyan.
    pub const CYAN: Self = Self::rgb(0, 255, 255);
    /// Opaque lime green, used by the diagnostic overlay.
    pub const LIME_GREEN: Self = Self::rgb(50, 205, 50);
    /// Opaque dark gray.
    pub const DARK_GRAY: Self = Self::rgb(64, 64, 64);

    /// Creates an opaque color.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Creates a color with explicit alpha.
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Returns this color with its alpha multiplied by `opacity`.
    ///
    /// `opacity` is clamped to `[0, 1]`.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "product of a u8 alpha and a [0, 1] factor is rounded back into u8 range"
    )]
    pub fn with_opacity(self, opacity: f32) -> Self {
        let factor = opacity.clamp(0.0, 1.0);
        let a = (f32::from(self.a) * factor).round() as u8;
        Self { a, ..self }
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Color(#{:02x}{:02x}{:02x}{:02x})",
            self.r, self.g, self.b, self.a
        )
    }
}

/// A single recorded drawing operation.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    /// Fill an axis-aligned rectangle.
    FillRect {
        /// Rectangle to fill.
        rect: Rect,
        /// Fill color.
        color: Color,
    },
    /// Stroke the outline of an axis-aligned rectangle.
    StrokeRect {
        /// Rectangle to outline.
        rect: Rect,
        /// Stroke width.
        width: f64,
        /// Stroke color.
        color: Color,
    },
    /// Stroke a line segment.
    Line {
        /// Segment to stroke.
        line: Line,
        /// Stroke width.
        width: f64,
        /// Stroke color.
        color: Color,
    },
    /// Draw a run of text with its baseline starting at `origin`.
    Text {
        /// Baseline origin.
        origin: Point,
        /// The text.
        text: String,
        /// Font size in surface units.
        size: f32,
        /// Text color.
        color: Color,
    },
}

impl DrawOp {
    /// Returns the op's color.
    #[must_use]
    pub fn color(&self) -> Color {
        match self {
            Self::FillRect { color, .. }
            | Self::StrokeRect { color, .. }
            | Self::Line { color, .. }
            | Self::Text { color, .. } => *color,
        }
    }
}

/// The output collaborator recordings replay onto.
///
/// Implementations own rasterization, GPU submission and pixel formats; the
/// cache only hands them operations.
pub trait Surface {
    /// Clears the whole surface to `color`.
    fn clear(&mut self, color: Color);

    /// Draws one operation, multiplying its alpha by `opacity` (in `[0, 1]`).
    fn draw(&mut self, op: &DrawOp, opacity: f32);
}

/// Builder that captures drawing operations for one render of one layer.
///
/// Created by the layer for the bounds of the current render and handed to
/// the layer's [`Drawable`](crate::layer::Drawable).
#[derive(Debug)]
pub struct Recorder {
    bounds: Rect,
    ops: Vec<DrawOp>,
}

impl Recorder {
    /// Starts a recording for `bounds`.
    #[must_use]
    pub fn new(bounds: Rect) -> Self {
        Self {
            bounds,
            ops: Vec::new(),
        }
    }

    /// The bounds this recording is made for.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Records a rectangle fill.
    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.ops.push(DrawOp::FillRect { rect, color });
    }

    /// Records a rectangle outline.
    pub fn stroke_rect(&mut self, rect: Rect, width: f64, color: Color) {
        self.ops.push(DrawOp::StrokeRect { rect, width, color });
    }

    /// Records a line segment.
    pub fn line(&mut self, line: Line, width: f64, color: Color) {
        self.ops.push(DrawOp::Line { line, width, color });
    }

    /// Records a run of text.
    pub fn text(&mut self, origin: Point, text: impl Into<String>, size: f32, color: Color) {
        self.ops.push(DrawOp::Text {
            origin,
            text: text.into(),
            size,
            color,
        });
    }

    /// Records an arbitrary operation.
    pub fn push(&mut self, op: DrawOp) {
        self.ops.push(op);
    }

    /// Ends recording and returns the immutable result.
    #[must_use]
    pub fn finish(self) -> Recording {
        Recording {
            bounds: self.bounds,
            ops: self.ops.into_boxed_slice(),
        }
    }
}

/// Immutable snapshot of one render of a layer.
#[derive(Clone, Debug, PartialEq)]
pub struct Recording {
    bounds: Rect,
    ops: Box<[DrawOp]>,
}

impl Recording {
    /// The bounds the recording was made for.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// The recorded operations, in issue order.
    #[must_use]
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Number of recorded operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Replays every operation onto `surface` at the given opacity.
    pub fn replay(&self, surface: &mut dyn Surface, opacity: f32) {
        for op in self.ops.iter() {
            surface.draw(op, opacity);
        }
    }
}
