// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! None of these are fatal to the host: draw failures leave the layer dirty
//! for the next sweep, and stack errors leave the stack unchanged.

use std::io;

use thiserror::Error;

/// A layer's draw capability failed to produce a recording.
///
/// The previous recording (if any) stays published and the layer stays dirty,
/// so it is retried on the next sweep.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DrawError {
    /// The drawable reported a failure.
    #[error("draw failed: {0}")]
    Failed(String),
    /// The drawable panicked; the payload message is preserved when it is a
    /// string.
    #[error("draw panicked: {0}")]
    Panicked(String),
}

impl DrawError {
    /// Convenience constructor for [`DrawError::Failed`].
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Structural errors from [`LayerStack`](crate::layer::LayerStack)
/// operations.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum StackError {
    /// No layer with this name exists.
    #[error("layer `{0}` does not exist")]
    NotFound(String),
    /// A layer with this name already exists.
    #[error("layer `{0}` already exists")]
    AlreadyExists(String),
    /// A position fell outside the stack.
    #[error("position {index} is out of range for a stack of {len} layers")]
    IndexOutOfRange {
        /// The requested position.
        index: isize,
        /// The stack length the position was checked against.
        len: usize,
    },
    /// Opacity must be a number.
    #[error("opacity {0} is not a number")]
    InvalidOpacity(f32),
}

/// Errors starting a [`RenderScheduler`](crate::scheduler::RenderScheduler).
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The worker thread could not be spawned.
    #[error("failed to spawn render worker: {0}")]
    Spawn(#[from] io::Error),
}
