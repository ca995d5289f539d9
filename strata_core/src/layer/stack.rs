// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ordered, name-unique layer storage with generational handles.

use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use parking_lot::{Mutex, MutexGuard};

use super::drawable::Drawable;
use super::id::LayerId;
use super::record::LayerRecord;
use crate::error::StackError;

/// Immutable paint-order view of a stack, bottom first.
///
/// Cloning is a reference-count bump. A snapshot keeps its records (and
/// their recordings) alive after they are removed from the stack.
pub type Snapshot = Arc<[Arc<LayerRecord>]>;

/// Where [`LayerStack::add`] inserts a new layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Placement<'a> {
    /// Above every existing layer.
    #[default]
    Top,
    /// Below every existing layer.
    Bottom,
    /// At this position, `0` being the bottom. `len` is allowed.
    Index(usize),
    /// Directly above the named layer.
    Above(&'a str),
    /// Directly below the named layer.
    Below(&'a str),
}

/// Ordered collection of [`LayerRecord`]s.
///
/// Layers are addressed by name or by [`LayerId`] handle. Internally each
/// layer occupies a slot in an arena; removed slots are recycled through a
/// free list and their generation is bumped, so handles to removed layers
/// never resolve again.
///
/// Every structural change (add, remove, reorder, rename) happens under one
/// mutex and republishes an immutable [`Snapshot`] of the paint order. The
/// render worker and the compositor only ever walk snapshots, so they never
/// observe a half-applied change and hold the mutex only long enough to
/// clone the snapshot handle.
///
/// Every fallible operation validates before mutating: an `Err` leaves the
/// stack exactly as it was.
pub struct LayerStack {
    inner: Mutex<Inner>,
    /// Held for the whole of a sweep; see [`run_sweep`](crate::scheduler::run_sweep).
    sweep: Mutex<()>,
}

struct Inner {
    // -- Arena --
    records: Vec<Option<Arc<LayerRecord>>>,
    generation: Vec<u32>,
    free_list: Vec<u32>,

    // -- Lookup and order --
    names: HashMap<Arc<str>, LayerId>,
    order: Vec<LayerId>,

    // -- Published paint order --
    published: Snapshot,
}

impl core::fmt::Debug for LayerStack {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("LayerStack")
            .field("order", &inner.order)
            .field("free", &inner.free_list.len())
            .finish_non_exhaustive()
    }
}

impl Default for LayerStack {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                records: Vec::new(),
                generation: Vec::new(),
                free_list: Vec::new(),
                names: HashMap::new(),
                order: Vec::new(),
                published: Arc::from(Vec::new()),
            }),
            sweep: Mutex::new(()),
        }
    }

    // -- Membership --

    /// Adds a new layer, dirty and without a recording.
    ///
    /// Fails with [`StackError::AlreadyExists`] if the name is taken,
    /// [`StackError::NotFound`] if a placement target is unknown, and
    /// [`StackError::IndexOutOfRange`] if a placement index exceeds the
    /// current length.
    pub fn add(
        &self,
        name: &str,
        drawable: impl Drawable + 'static,
        placement: Placement<'_>,
    ) -> Result<LayerId, StackError> {
        self.add_shared(name, Arc::new(drawable), placement)
    }

    /// Like [`add`](Self::add), for an already shared drawable.
    pub fn add_shared(
        &self,
        name: &str,
        drawable: Arc<dyn Drawable>,
        placement: Placement<'_>,
    ) -> Result<LayerId, StackError> {
        let mut inner = self.inner.lock();
        if inner.names.contains_key(name) {
            return Err(StackError::AlreadyExists(name.to_owned()));
        }
        let at = inner.insertion_index(placement)?;
        let id = inner.allocate(Arc::from(name), drawable);
        inner.order.insert(at, id);
        inner.publish();
        log::debug!("added layer `{name}` at {at}");
        Ok(id)
    }

    /// Adds several layers on top, in iteration order.
    ///
    /// All-or-nothing: a name that already exists, or appears twice in the
    /// batch, fails the whole call with [`StackError::AlreadyExists`].
    pub fn add_many<'n, I>(&self, layers: I) -> Result<Vec<LayerId>, StackError>
    where
        I: IntoIterator<Item = (&'n str, Arc<dyn Drawable>)>,
    {
        let layers: Vec<_> = layers.into_iter().collect();
        let mut inner = self.inner.lock();

        let mut seen = HashSet::with_capacity(layers.len());
        for (name, _) in &layers {
            if inner.names.contains_key(*name) || !seen.insert(*name) {
                return Err(StackError::AlreadyExists((*name).to_owned()));
            }
        }

        let mut ids = Vec::with_capacity(layers.len());
        for (name, drawable) in layers {
            let id = inner.allocate(Arc::from(name), drawable);
            inner.order.push(id);
            ids.push(id);
        }
        inner.publish();
        log::debug!("added {} layers", ids.len());
        Ok(ids)
    }

    /// Removes a layer.
    ///
    /// The stack drops its reference to the record; snapshots taken earlier
    /// keep it alive until they are dropped. The layer's [`LayerId`] becomes
    /// stale, even if a new layer reuses the name or slot.
    pub fn remove(&self, name: &str) -> Result<(), StackError> {
        let mut inner = self.inner.lock();
        let id = inner.lookup(name)?;
        inner.release(id);
        inner.publish();
        log::debug!("removed layer `{name}`");
        Ok(())
    }

    /// Removes several layers. All-or-nothing; repeated names are removed once.
    pub fn remove_many<'n>(
        &self,
        names: impl IntoIterator<Item = &'n str>,
    ) -> Result<(), StackError> {
        let mut inner = self.inner.lock();
        let mut ids = HashSet::new();
        for name in names {
            ids.insert(inner.lookup(name)?);
        }
        for &id in &ids {
            inner.release(id);
        }
        inner.publish();
        Ok(())
    }

    /// Removes every layer.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        let ids = core::mem::take(&mut inner.order);
        for id in ids {
            inner.release(id);
        }
        inner.publish();
    }

    // -- Ordering --

    /// Moves a layer to `index`, `0` being the bottom.
    ///
    /// `index` is the layer's position after the move and must be less than
    /// [`len`](Self::len).
    pub fn move_to(&self, name: &str, index: usize) -> Result<(), StackError> {
        let mut inner = self.inner.lock();
        let id = inner.lookup(name)?;
        let len = inner.order.len();
        if index >= len {
            return Err(StackError::IndexOutOfRange {
                index: signed(index),
                len,
            });
        }
        inner.reposition(id, index);
        Ok(())
    }

    /// Moves a layer above every other layer.
    pub fn move_to_top(&self, name: &str) -> Result<(), StackError> {
        let mut inner = self.inner.lock();
        let id = inner.lookup(name)?;
        let top = inner.order.len() - 1;
        inner.reposition(id, top);
        Ok(())
    }

    /// Moves a layer below every other layer.
    pub fn move_to_bottom(&self, name: &str) -> Result<(), StackError> {
        let mut inner = self.inner.lock();
        let id = inner.lookup(name)?;
        inner.reposition(id, 0);
        Ok(())
    }

    /// Moves a layer `delta` positions; positive moves toward the top.
    ///
    /// Fails with [`StackError::IndexOutOfRange`] if the destination falls
    /// outside the stack. There is no clamping.
    pub fn shift(&self, name: &str, delta: isize) -> Result<(), StackError> {
        let mut inner = self.inner.lock();
        let id = inner.lookup(name)?;
        let len = inner.order.len();
        let index = shifted(inner.position(id), delta, len)?;
        inner.reposition(id, index);
        Ok(())
    }

    /// Moves several layers above every other layer.
    ///
    /// All-or-nothing. The moved layers end up on top in iteration order,
    /// so the last name is topmost.
    pub fn move_many_to_top<'n>(
        &self,
        names: impl IntoIterator<Item = &'n str>,
    ) -> Result<(), StackError> {
        let mut inner = self.inner.lock();
        let ids = inner.lookup_all(names)?;
        for id in ids {
            let from = inner.position(id);
            inner.order.remove(from);
            inner.order.push(id);
        }
        inner.publish();
        Ok(())
    }

    /// Moves several layers below every other layer.
    ///
    /// All-or-nothing. The moved layers end up at the bottom in iteration
    /// order, so the first name is bottommost.
    pub fn move_many_to_bottom<'n>(
        &self,
        names: impl IntoIterator<Item = &'n str>,
    ) -> Result<(), StackError> {
        let mut inner = self.inner.lock();
        let ids = inner.lookup_all(names)?;
        for id in ids.into_iter().rev() {
            let from = inner.position(id);
            inner.order.remove(from);
            inner.order.insert(0, id);
        }
        inner.publish();
        Ok(())
    }

    /// Shifts several layers by `delta`, one after another in iteration
    /// order, as [`shift`](Self::shift) would.
    ///
    /// All-or-nothing: if any shift would leave the stack, the order is
    /// left untouched.
    pub fn shift_many<'n>(
        &self,
        names: impl IntoIterator<Item = &'n str>,
        delta: isize,
    ) -> Result<(), StackError> {
        let mut inner = self.inner.lock();
        let ids = inner.lookup_all(names)?;
        let mut order = inner.order.clone();
        for id in ids {
            let from = position_in(&order, id);
            let index = shifted(from, delta, order.len())?;
            order.remove(from);
            order.insert(index, id);
        }
        inner.order = order;
        inner.publish();
        Ok(())
    }

    /// Exchanges the positions of two layers.
    pub fn swap(&self, a: &str, b: &str) -> Result<(), StackError> {
        let mut inner = self.inner.lock();
        let a = inner.lookup(a)?;
        let b = inner.lookup(b)?;
        if a != b {
            let pa = inner.position(a);
            let pb = inner.position(b);
            inner.order.swap(pa, pb);
            inner.publish();
        }
        Ok(())
    }

    // -- Identity --

    /// Renames a layer, keeping its record, recording and handle.
    ///
    /// Fails with [`StackError::AlreadyExists`] if `new` is taken, including
    /// by the layer itself.
    pub fn rename(&self, old: &str, new: &str) -> Result<(), StackError> {
        let mut inner = self.inner.lock();
        let id = inner.lookup(old)?;
        if inner.names.contains_key(new) {
            return Err(StackError::AlreadyExists(new.to_owned()));
        }
        let new: Arc<str> = Arc::from(new);
        inner.names.remove(old);
        inner.names.insert(Arc::clone(&new), id);
        inner.record_at(id).set_name(new);
        Ok(())
    }

    // -- Paint-time modifiers --

    /// Shows or hides a layer. Never re-renders.
    pub fn set_visibility(&self, name: &str, visible: bool) -> Result<(), StackError> {
        self.get(name)?.set_visible(visible);
        Ok(())
    }

    /// Flips a layer's visibility and returns the new value.
    pub fn toggle_visibility(&self, name: &str) -> Result<bool, StackError> {
        Ok(self.get(name)?.toggle_visible())
    }

    /// Shows or hides several layers. All-or-nothing.
    pub fn set_visibility_many<'n>(
        &self,
        names: impl IntoIterator<Item = &'n str>,
        visible: bool,
    ) -> Result<(), StackError> {
        for record in self.records(names)? {
            record.set_visible(visible);
        }
        Ok(())
    }

    /// Flips the visibility of several layers. All-or-nothing; a name listed
    /// twice flips twice.
    pub fn toggle_visibility_many<'n>(
        &self,
        names: impl IntoIterator<Item = &'n str>,
    ) -> Result<(), StackError> {
        for record in self.records(names)? {
            record.toggle_visible();
        }
        Ok(())
    }

    /// Flips the visibility of every layer independently.
    pub fn toggle_all_visibility(&self) {
        for record in self.snapshot().iter() {
            record.toggle_visible();
        }
    }

    /// Sets a layer's paint opacity, clamped to `[0, 1]`. Never re-renders.
    ///
    /// NaN is rejected with [`StackError::InvalidOpacity`].
    pub fn set_opacity(&self, name: &str, opacity: f32) -> Result<(), StackError> {
        if opacity.is_nan() {
            return Err(StackError::InvalidOpacity(opacity));
        }
        self.get(name)?.set_opacity(opacity.clamp(0.0, 1.0));
        Ok(())
    }

    /// Sets the paint opacity of several layers, clamped to `[0, 1]`.
    /// All-or-nothing.
    pub fn set_opacity_many<'n>(
        &self,
        names: impl IntoIterator<Item = &'n str>,
        opacity: f32,
    ) -> Result<(), StackError> {
        if opacity.is_nan() {
            return Err(StackError::InvalidOpacity(opacity));
        }
        let opacity = opacity.clamp(0.0, 1.0);
        for record in self.records(names)? {
            record.set_opacity(opacity);
        }
        Ok(())
    }

    /// Replaces a layer's drawable and marks it dirty.
    pub fn set_drawable(
        &self,
        name: &str,
        drawable: impl Drawable + 'static,
    ) -> Result<(), StackError> {
        self.get(name)?.set_drawable(Arc::new(drawable));
        Ok(())
    }

    // -- Invalidation --

    /// Marks one layer dirty.
    pub fn invalidate(&self, name: &str) -> Result<(), StackError> {
        self.get(name)?.invalidate();
        Ok(())
    }

    /// Marks several layers dirty.
    ///
    /// Every name is resolved before any layer is touched, so an unknown
    /// name invalidates nothing.
    pub fn invalidate_many<'n>(
        &self,
        names: impl IntoIterator<Item = &'n str>,
    ) -> Result<(), StackError> {
        for record in self.records(names)? {
            record.invalidate();
        }
        Ok(())
    }

    /// Marks every layer dirty.
    pub fn invalidate_all(&self) {
        for record in self.snapshot().iter() {
            record.invalidate();
        }
    }

    // -- Queries --

    /// Returns the record for `name`.
    pub fn get(&self, name: &str) -> Result<Arc<LayerRecord>, StackError> {
        let inner = self.inner.lock();
        let id = inner.lookup(name)?;
        Ok(Arc::clone(inner.record_at(id)))
    }

    /// Returns the handle for `name`.
    pub fn id(&self, name: &str) -> Result<LayerId, StackError> {
        self.inner.lock().lookup(name)
    }

    /// Resolves a handle, or `None` if the layer was removed.
    #[must_use]
    pub fn record(&self, id: LayerId) -> Option<Arc<LayerRecord>> {
        self.inner.lock().resolve(id).cloned()
    }

    /// Returns the paint position of `name`, `0` being the bottom.
    pub fn index_of(&self, name: &str) -> Result<usize, StackError> {
        let inner = self.inner.lock();
        let id = inner.lookup(name)?;
        Ok(inner.position(id))
    }

    /// Whether a layer named `name` exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.lock().names.contains_key(name)
    }

    /// Number of layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().order.len()
    }

    /// Whether the stack has no layers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().order.is_empty()
    }

    /// Layer names in paint order, bottom first.
    #[must_use]
    pub fn names(&self) -> Vec<Arc<str>> {
        self.snapshot().iter().map(|record| record.name()).collect()
    }

    /// The current paint order, bottom first.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Arc::clone(&self.inner.lock().published)
    }

    /// Resolves every name before returning any record.
    fn records<'n>(
        &self,
        names: impl IntoIterator<Item = &'n str>,
    ) -> Result<Vec<Arc<LayerRecord>>, StackError> {
        let inner = self.inner.lock();
        let ids = inner.lookup_all(names)?;
        Ok(ids
            .into_iter()
            .map(|id| Arc::clone(inner.record_at(id)))
            .collect())
    }

    /// Excludes other sweeps of this stack until the guard is dropped.
    /// Structural changes are not blocked.
    pub(crate) fn lock_sweep(&self) -> MutexGuard<'_, ()> {
        self.sweep.lock()
    }
}

impl Inner {
    fn lookup(&self, name: &str) -> Result<LayerId, StackError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| StackError::NotFound(name.to_owned()))
    }

    fn lookup_all<'n>(
        &self,
        names: impl IntoIterator<Item = &'n str>,
    ) -> Result<Vec<LayerId>, StackError> {
        names.into_iter().map(|name| self.lookup(name)).collect()
    }

    fn resolve(&self, id: LayerId) -> Option<&Arc<LayerRecord>> {
        let idx = id.idx as usize;
        if self.generation.get(idx) != Some(&id.generation) {
            return None;
        }
        self.records.get(idx)?.as_ref()
    }

    /// Record for a handle obtained from `names` or `order`.
    fn record_at(&self, id: LayerId) -> &Arc<LayerRecord> {
        match &self.records[id.idx as usize] {
            Some(record) => record,
            None => unreachable!("live layer {id:?} has no record"),
        }
    }

    fn position(&self, id: LayerId) -> usize {
        position_in(&self.order, id)
    }

    fn insertion_index(&self, placement: Placement<'_>) -> Result<usize, StackError> {
        let len = self.order.len();
        match placement {
            Placement::Top => Ok(len),
            Placement::Bottom => Ok(0),
            Placement::Index(index) if index <= len => Ok(index),
            Placement::Index(index) => Err(StackError::IndexOutOfRange {
                index: signed(index),
                len,
            }),
            Placement::Above(target) => Ok(self.position(self.lookup(target)?) + 1),
            Placement::Below(target) => Ok(self.position(self.lookup(target)?)),
        }
    }

    fn allocate(&mut self, name: Arc<str>, drawable: Arc<dyn Drawable>) -> LayerId {
        let record = Arc::new(LayerRecord::with_shared(Arc::clone(&name), drawable));
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot; its generation was bumped on release.
            self.records[idx as usize] = Some(record);
            idx
        } else {
            let idx = u32::try_from(self.records.len()).unwrap_or(u32::MAX);
            self.records.push(Some(record));
            self.generation.push(0);
            idx
        };
        let id = LayerId {
            idx,
            generation: self.generation[idx as usize],
        };
        self.names.insert(name, id);
        id
    }

    /// Drops a live layer from the arena, the name map and the order.
    /// Does not republish.
    fn release(&mut self, id: LayerId) {
        let idx = id.idx as usize;
        if let Some(record) = self.records[idx].take() {
            self.names.remove(&*record.name());
        }
        self.order.retain(|&other| other != id);
        // Bump generation so old handles immediately fail validation.
        self.generation[idx] = self.generation[idx].wrapping_add(1);
        self.free_list.push(id.idx);
    }

    fn reposition(&mut self, id: LayerId, index: usize) {
        let from = self.position(id);
        if from != index {
            let id = self.order.remove(from);
            self.order.insert(index, id);
            self.publish();
        }
    }

    fn publish(&mut self) {
        self.published = self
            .order
            .iter()
            .map(|&id| Arc::clone(self.record_at(id)))
            .collect();
    }
}

fn position_in(order: &[LayerId], id: LayerId) -> usize {
    match order.iter().position(|&other| other == id) {
        Some(position) => position,
        None => unreachable!("live layer {id:?} missing from order"),
    }
}

/// Destination of a layer at `from` moved by `delta` in a stack of `len`.
fn shifted(from: usize, delta: isize, len: usize) -> Result<usize, StackError> {
    let target = signed(from).saturating_add(delta);
    usize::try_from(target)
        .ok()
        .filter(|&index| index < len)
        .ok_or(StackError::IndexOutOfRange { index: target, len })
}

fn signed(index: usize) -> isize {
    isize::try_from(index).unwrap_or(isize::MAX)
}
