// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer identity.

use core::fmt;

/// A handle to a layer in a [`LayerStack`](super::LayerStack).
///
/// Contains both a slot index and a generation counter so that a handle to a
/// removed layer is detected even after its slot is reused by a new layer,
/// including one added under the same name.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerId {
    /// Slot index into the stack's arena.
    pub(crate) idx: u32,
    /// Generation counter; must match the stack's generation for this slot.
    pub(crate) generation: u32,
}

impl LayerId {
    /// Arena slot, shared with whatever layer later reuses it.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// How many times the slot had been released when this handle was issued.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LayerId({}v{})", self.idx, self.generation)
    }
}
