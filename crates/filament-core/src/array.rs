use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::{
    ChangeArgs, Identity, Notifier, ObjectId, Observable, ObservableState, Splice, Subscriber,
    SubscriberSet, calc_splices, project_splices, queue_update, track,
};

/// Name under which the length of an [`ObservableVec`] is tracked.
pub const LENGTH_PROPERTY: &str = "length";

struct Pending<T> {
    /// Raw records, each in the coordinates of the vec at the time it was made.
    splices: Vec<Splice<T>>,
    /// Contents before the first pending mutation, once a reordering happened.
    reset: Option<Vec<T>>,
}

struct VecInner<T> {
    this: Weak<VecInner<T>>,
    state: ObservableState,
    items: RefCell<Vec<T>>,
    subscribers: SubscriberSet,
    pending: RefCell<Pending<T>>,
    needs_queue: Cell<bool>,
    flushed_len: Cell<usize>,
}

impl<T: 'static> Observable for VecInner<T> {
    fn observable_state(&self) -> &ObservableState {
        &self.state
    }
}

impl<T: Clone + Identity + 'static> VecInner<T> {
    fn record(&self, splice: Splice<T>) {
        {
            let mut pending = self.pending.borrow_mut();
            if pending.reset.is_none() {
                pending.splices.push(splice);
            }
        }
        self.enqueue();
    }

    /// Snapshot the contents as they were before any pending change.
    fn record_reset(&self) {
        {
            let mut pending = self.pending.borrow_mut();
            if pending.reset.is_none() {
                let mut snapshot = self.items.borrow().clone();
                for splice in pending.splices.drain(..).rev() {
                    let end = (splice.index + splice.added_count).min(snapshot.len());
                    snapshot.splice(splice.index..end, splice.removed);
                }
                pending.reset = Some(snapshot);
            }
        }
        self.enqueue();
    }

    fn enqueue(&self) {
        if self.needs_queue.replace(false) {
            let this = self.this.clone();
            queue_update(move || {
                if let Some(inner) = this.upgrade() {
                    inner.flush();
                }
            });
        }
    }

    fn flush(&self) {
        let (records, reset) = {
            let mut pending = self.pending.borrow_mut();
            (std::mem::take(&mut pending.splices), pending.reset.take())
        };
        self.needs_queue.set(true);
        if records.is_empty() && reset.is_none() {
            return;
        }

        let (splices, len) = {
            let items = self.items.borrow();
            let splices = match reset {
                Some(old) => calc_splices(&items, 0, items.len(), &old, 0, old.len()),
                None => project_splices(&items, records),
            };
            (splices, items.len())
        };

        if !splices.is_empty() {
            log::trace!(
                "observable vec {:?} flushed {} splices",
                self.subscribers.source(),
                splices.len()
            );
            self.subscribers.notify(ChangeArgs::Splices(&splices));
        }
        if self.flushed_len.replace(len) != len {
            let notifier = self.state.existing_notifier().cloned();
            if let Some(notifier) = notifier {
                notifier.notify_property(LENGTH_PROPERTY);
            }
        }
    }
}

/// A vector whose mutations are reported to subscribers as splices, batched
/// into one notification per update pass.
///
/// Subscribers receive [`ChangeArgs::Splices`] holding a `Vec<Splice<T>>`.
/// [`len`](Self::len) and [`is_empty`](Self::is_empty) are tracked reads of the
/// `length` property; element reads are not tracked.
pub struct ObservableVec<T> {
    inner: Rc<VecInner<T>>,
}

impl<T> Clone for ObservableVec<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + Identity + 'static> Default for ObservableVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Identity + 'static> From<Vec<T>> for ObservableVec<T> {
    fn from(items: Vec<T>) -> Self {
        let len = items.len();
        let inner = Rc::new_cyclic(|this: &Weak<VecInner<T>>| VecInner {
            this: this.clone(),
            state: ObservableState::new(),
            items: RefCell::new(items),
            subscribers: SubscriberSet::new(ObjectId::of(this.as_ptr())),
            pending: RefCell::new(Pending {
                splices: Vec::new(),
                reset: None,
            }),
            needs_queue: Cell::new(true),
            flushed_len: Cell::new(len),
        });
        Self { inner }
    }
}

impl<T: Clone + Identity + 'static> FromIterator<T> for ObservableVec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl<T: Clone + Identity + 'static> ObservableVec<T> {
    pub fn new() -> Self {
        Self::from(Vec::new())
    }

    pub fn id(&self) -> ObjectId {
        Observable::object_id(&*self.inner)
    }

    pub fn len(&self) -> usize {
        track(&*self.inner, LENGTH_PROPERTY, None);
        self.inner.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.inner.items.borrow().get(index).cloned()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.inner.items.borrow().clone()
    }

    /// Read the items through a snapshot; `f` may mutate the vec.
    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        let items = self.to_vec();
        f(&items)
    }

    /// Remove `delete_count` items at `index` and insert `items` in their
    /// place. Out-of-range arguments are clamped. Returns the removed items.
    pub fn splice(
        &self,
        index: usize,
        delete_count: usize,
        items: impl IntoIterator<Item = T>,
    ) -> Vec<T> {
        let added: Vec<T> = items.into_iter().collect();
        let added_count = added.len();
        let (start, removed) = {
            let mut current = self.inner.items.borrow_mut();
            let start = index.min(current.len());
            let end = start.saturating_add(delete_count).min(current.len());
            let removed: Vec<T> = current.splice(start..end, added).collect();
            (start, removed)
        };
        if !removed.is_empty() || added_count > 0 {
            self.inner
                .record(Splice::new(start, removed.clone(), added_count));
        }
        removed
    }

    pub fn push(&self, item: T) {
        let len = self.inner.items.borrow().len();
        self.splice(len, 0, [item]);
    }

    pub fn pop(&self) -> Option<T> {
        let len = self.inner.items.borrow().len();
        let last = len.checked_sub(1)?;
        self.splice(last, 1, []).pop()
    }

    pub fn insert(&self, index: usize, item: T) {
        self.splice(index, 0, [item]);
    }

    pub fn remove(&self, index: usize) -> Option<T> {
        if index >= self.inner.items.borrow().len() {
            return None;
        }
        self.splice(index, 1, []).pop()
    }

    pub fn shift(&self) -> Option<T> {
        self.remove(0)
    }

    pub fn unshift(&self, item: T) {
        self.insert(0, item);
    }

    /// Replace the item at `index`, returning the previous one.
    pub fn set(&self, index: usize, item: T) -> Option<T> {
        if index >= self.inner.items.borrow().len() {
            return None;
        }
        self.splice(index, 1, [item]).pop()
    }

    pub fn clear(&self) {
        let len = self.inner.items.borrow().len();
        self.splice(0, len, []);
    }

    pub fn extend(&self, items: impl IntoIterator<Item = T>) {
        let len = self.inner.items.borrow().len();
        self.splice(len, 0, items);
    }

    pub fn reverse(&self) {
        self.inner.record_reset();
        self.inner.items.borrow_mut().reverse();
    }

    pub fn sort_by(&self, compare: impl FnMut(&T, &T) -> Ordering) {
        self.inner.record_reset();
        self.inner.items.borrow_mut().sort_by(compare);
    }

    /// Swap in entirely new contents. Subscribers get the minimal diff.
    pub fn replace(&self, items: impl IntoIterator<Item = T>) {
        let items: Vec<T> = items.into_iter().collect();
        self.inner.record_reset();
        *self.inner.items.borrow_mut() = items;
    }

    /// Deliver pending changes now instead of waiting for the update pass.
    pub fn flush(&self) {
        self.inner.flush();
    }

    pub fn has_pending_changes(&self) -> bool {
        let pending = self.inner.pending.borrow();
        !pending.splices.is_empty() || pending.reset.is_some()
    }

    /// Subscribe to splice notifications. Pending changes are flushed first.
    pub fn subscribe(&self, subscriber: &Rc<dyn Subscriber>) {
        self.inner.flush();
        self.inner.subscribers.subscribe(subscriber);
    }

    pub fn unsubscribe(&self, subscriber: &Rc<dyn Subscriber>) {
        self.inner.subscribers.unsubscribe(subscriber);
    }
}

impl<T: Clone + Identity + 'static> Notifier for ObservableVec<T> {
    fn subscribe(&self, subscriber: &Rc<dyn Subscriber>, _property: Option<&'static str>) {
        ObservableVec::subscribe(self, subscriber);
    }

    fn unsubscribe(&self, subscriber: &Rc<dyn Subscriber>, _property: Option<&'static str>) {
        ObservableVec::unsubscribe(self, subscriber);
    }

    fn notify(&self, args: ChangeArgs<'_>) {
        self.inner.subscribers.notify(args);
    }
}

impl<T> Identity for ObservableVec<T> {
    fn identical(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn object_id(&self) -> Option<ObjectId> {
        Some(ObjectId::of(Rc::as_ptr(&self.inner)))
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.inner.items.borrow().iter()).finish()
    }
}
