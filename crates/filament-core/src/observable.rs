use std::any::{TypeId, type_name};
use std::cell::{OnceCell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use crate::{FilamentError, Identity, ObjectId, PropertyChangeNotifier};

/// Receives the reads performed while it is the active collector.
pub(crate) trait Watcher {
    fn watch(
        &self,
        source: ObjectId,
        property: &'static str,
        notifier: Rc<PropertyChangeNotifier>,
        value: Option<ObjectId>,
    );

    /// The current evaluation read something whose dependencies may vary.
    fn watch_volatile(&self);
}

thread_local! {
    static WATCHER: RefCell<Option<Rc<dyn Watcher>>> = const { RefCell::new(None) };
}

/// Restores the previous collector on drop, including during unwinding.
pub(crate) struct WatcherGuard {
    previous: Option<Rc<dyn Watcher>>,
}

impl Drop for WatcherGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        WATCHER.with(|slot| *slot.borrow_mut() = previous);
    }
}

pub(crate) fn install_watcher(watcher: Option<Rc<dyn Watcher>>) -> WatcherGuard {
    let previous = WATCHER.with(|slot| slot.replace(watcher));
    WatcherGuard { previous }
}

fn current_watcher() -> Option<Rc<dyn Watcher>> {
    WATCHER.with(|slot| slot.borrow().clone())
}

/// Whether a collector is currently recording reads.
pub fn is_tracking() -> bool {
    WATCHER.with(|slot| slot.borrow().is_some())
}

/// Report a read of `owner.property` to the active collector, if any.
pub fn track<O: Observable + ?Sized>(owner: &O, property: &'static str, value: Option<ObjectId>) {
    if let Some(watcher) = current_watcher() {
        watcher.watch(owner.object_id(), property, owner.notifier(), value);
    }
}

/// Force the active collector to rediscover its dependencies next time.
pub fn track_volatile() {
    if let Some(watcher) = current_watcher() {
        watcher.watch_volatile();
    }
}

/// Run `f` with no active collector; its reads are not attributed to anyone.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _guard = install_watcher(None);
    f()
}

/// Per-object bookkeeping embedded in every observable type.
#[derive(Default)]
pub struct ObservableState {
    notifier: OnceCell<Rc<PropertyChangeNotifier>>,
}

impl ObservableState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The object's notifier, created on first use.
    pub fn notifier(&self, source: ObjectId) -> Rc<PropertyChangeNotifier> {
        self.notifier
            .get_or_init(|| Rc::new(PropertyChangeNotifier::new(source)))
            .clone()
    }

    pub fn existing_notifier(&self) -> Option<&Rc<PropertyChangeNotifier>> {
        self.notifier.get()
    }
}

impl fmt::Debug for ObservableState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableState")
            .field("has_notifier", &self.notifier.get().is_some())
            .finish()
    }
}

/// An object with observable properties.
///
/// Implementors only embed an [`ObservableState`]; identity and the notifier
/// come from the default methods.
pub trait Observable: 'static {
    fn observable_state(&self) -> &ObservableState;

    fn object_id(&self) -> ObjectId {
        ObjectId::of(self as *const Self)
    }

    fn notifier(&self) -> Rc<PropertyChangeNotifier> {
        self.observable_state().notifier(self.object_id())
    }
}

/// Storage slot of one observable field. Read and write it through an [`Accessor`].
pub struct Observed<T> {
    value: RefCell<T>,
}

impl<T> Observed<T> {
    pub const fn new(value: T) -> Self {
        Self {
            value: RefCell::new(value),
        }
    }

    /// Reads without reporting to the collector.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.value.borrow().clone()
    }
}

impl<T: Default> Default for Observed<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Observed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Observed").field(&*self.value.borrow()).finish()
    }
}

/// Describes one observable field of `O`.
pub struct Accessor<O, T> {
    name: &'static str,
    slot: fn(&O) -> &Observed<T>,
    changed: Option<fn(&O, &T, &T)>,
}

impl<O, T> Clone for Accessor<O, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<O, T> Copy for Accessor<O, T> {}

impl<O: Observable, T: Clone + Identity + 'static> Accessor<O, T> {
    pub const fn new(name: &'static str, slot: fn(&O) -> &Observed<T>) -> Self {
        Self {
            name,
            slot,
            changed: None,
        }
    }

    /// Hook invoked as `changed(owner, old, new)` after a write that changed the value.
    pub const fn with_changed(self, changed: fn(&O, &T, &T)) -> Self {
        Self {
            name: self.name,
            slot: self.slot,
            changed: Some(changed),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self, owner: &O) -> T {
        let value = (self.slot)(owner).value.borrow().clone();
        track(owner, self.name, value.object_id());
        value
    }

    /// Tracked read by reference. `f` sees a snapshot, so it may write the
    /// field itself.
    pub fn with<R>(&self, owner: &O, f: impl FnOnce(&T) -> R) -> R {
        let value = (self.slot)(owner).value.borrow().clone();
        track(owner, self.name, value.object_id());
        f(&value)
    }

    pub fn set(&self, owner: &O, value: T) {
        let slot = (self.slot)(owner);
        if slot.value.borrow().identical(&value) {
            return;
        }
        let old = slot.value.replace(value);
        if let Some(changed) = self.changed {
            let new = slot.value.borrow().clone();
            changed(owner, &old, &new);
        }
        let notifier = owner.observable_state().existing_notifier().cloned();
        if let Some(notifier) = notifier {
            notifier.notify_property(self.name);
        }
    }

    pub fn info(&self) -> AccessorInfo {
        AccessorInfo {
            name: self.name,
            has_changed_callback: self.changed.is_some(),
            computed: false,
            volatile: false,
        }
    }
}

/// A derived getter. Its own reads are tracked like any other code; a volatile
/// one also forces the reading binding to rediscover its dependencies on every
/// evaluation, for getters whose read set depends on runtime branches.
pub struct ComputedAccessor<O, T> {
    name: &'static str,
    compute: fn(&O) -> T,
    volatile: bool,
}

impl<O, T> Clone for ComputedAccessor<O, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<O, T> Copy for ComputedAccessor<O, T> {}

impl<O: Observable, T> ComputedAccessor<O, T> {
    pub const fn new(name: &'static str, compute: fn(&O) -> T) -> Self {
        Self {
            name,
            compute,
            volatile: false,
        }
    }

    pub const fn volatile(self) -> Self {
        Self {
            name: self.name,
            compute: self.compute,
            volatile: true,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_volatile(&self) -> bool {
        self.volatile
    }

    pub fn get(&self, owner: &O) -> T {
        if self.volatile {
            track_volatile();
        }
        (self.compute)(owner)
    }

    pub fn info(&self) -> AccessorInfo {
        AccessorInfo {
            name: self.name,
            has_changed_callback: false,
            computed: true,
            volatile: self.volatile,
        }
    }
}

/// Builds an [`Accessor`] for a field of type `Observed<T>`.
#[macro_export]
macro_rules! accessor {
    ($owner:ty, $field:ident : $ty:ty) => {
        $crate::Accessor::<$owner, $ty>::new(stringify!($field), |owner| &owner.$field)
    };
    ($owner:ty, $field:ident : $ty:ty, changed = $changed:expr) => {
        $crate::accessor!($owner, $field: $ty).with_changed($changed)
    };
}

/// Registered metadata of one accessor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessorInfo {
    pub name: &'static str,
    pub has_changed_callback: bool,
    pub computed: bool,
    pub volatile: bool,
}

struct TypeEntry {
    type_name: &'static str,
    parent: Option<TypeId>,
    own: Vec<AccessorInfo>,
    resolved: Option<Rc<[AccessorInfo]>>,
}

#[derive(Default)]
struct Registry {
    types: HashMap<TypeId, TypeEntry>,
}

thread_local! {
    static REGISTRY: RefCell<Registry> = RefCell::new(Registry::default());
}

impl Registry {
    fn entry(&mut self, id: TypeId, type_name: &'static str) -> &mut TypeEntry {
        self.types.entry(id).or_insert_with(|| TypeEntry {
            type_name,
            parent: None,
            own: Vec::new(),
            resolved: None,
        })
    }

    fn define(&mut self, id: TypeId, type_name: &'static str, info: AccessorInfo) {
        let entry = self.entry(id, type_name);
        match entry.own.iter_mut().find(|a| a.name == info.name) {
            Some(existing) => *existing = info,
            None => entry.own.push(info),
        }
        self.invalidate();
    }

    fn invalidate(&mut self) {
        for entry in self.types.values_mut() {
            entry.resolved = None;
        }
    }

    fn resolve(&mut self, id: TypeId) -> Option<Rc<[AccessorInfo]>> {
        let entry = self.types.get(&id)?;
        if let Some(resolved) = &entry.resolved {
            return Some(resolved.clone());
        }

        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if !seen.insert(current) {
                log::warn!("accessor inheritance cycle at {}", entry.type_name);
                break;
            }
            match self.types.get(&current) {
                Some(e) => {
                    chain.push(current);
                    cursor = e.parent;
                }
                None => break,
            }
        }

        // Base types first so derived definitions override by name.
        let mut resolved: Vec<AccessorInfo> = Vec::new();
        for ty in chain.iter().rev() {
            let Some(e) = self.types.get(ty) else {
                continue;
            };
            for info in &e.own {
                match resolved.iter_mut().find(|a| a.name == info.name) {
                    Some(slot) => *slot = info.clone(),
                    None => resolved.push(info.clone()),
                }
            }
        }

        let resolved: Rc<[AccessorInfo]> = resolved.into();
        if let Some(e) = self.types.get_mut(&id) {
            e.resolved = Some(resolved.clone());
        }
        Some(resolved)
    }
}

/// Register an observable field of `O`.
pub fn define_property<O: Observable, T: Clone + Identity + 'static>(accessor: &Accessor<O, T>) {
    REGISTRY.with(|r| {
        r.borrow_mut()
            .define(TypeId::of::<O>(), type_name::<O>(), accessor.info())
    });
}

/// Register a computed accessor of `O`.
pub fn define_computed<O: Observable, T>(accessor: &ComputedAccessor<O, T>) {
    REGISTRY.with(|r| {
        r.borrow_mut()
            .define(TypeId::of::<O>(), type_name::<O>(), accessor.info())
    });
}

/// Declare that `O` inherits the accessors registered for `P`.
pub fn extend<O: 'static, P: 'static>() {
    REGISTRY.with(|r| {
        let mut r = r.borrow_mut();
        r.entry(TypeId::of::<P>(), type_name::<P>());
        r.entry(TypeId::of::<O>(), type_name::<O>()).parent = Some(TypeId::of::<P>());
        r.invalidate();
    });
}

/// All accessors of `O`, inherited ones first.
pub fn accessors<O: 'static>() -> Result<Rc<[AccessorInfo]>, FilamentError> {
    REGISTRY
        .with(|r| r.borrow_mut().resolve(TypeId::of::<O>()))
        .ok_or(FilamentError::UnknownType(type_name::<O>()))
}
