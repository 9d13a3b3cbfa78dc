use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use bitflags::bitflags;

use crate::observable::{Watcher, install_watcher};
use crate::{
    ChangeArgs, ExecutionContext, Notifier, ObjectId, PropertyChangeNotifier, Subscriber,
    SubscriberSet, queue_update,
};

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ObserverFlags: u8 {
        /// Dependencies must be rediscovered on the next `observe`.
        const NEEDS_REFRESH = 1 << 0;
        /// The next change may enqueue the observer.
        const NEEDS_QUEUE = 1 << 1;
    }
}

/// A function from a source object and an execution context to a value.
pub struct Binding<S, V> {
    eval: Rc<dyn Fn(&S, &ExecutionContext) -> V>,
    volatile: bool,
}

impl<S, V> Clone for Binding<S, V> {
    fn clone(&self) -> Self {
        Self {
            eval: self.eval.clone(),
            volatile: self.volatile,
        }
    }
}

impl<S: 'static, V: 'static> Binding<S, V> {
    pub fn new(f: impl Fn(&S, &ExecutionContext) -> V + 'static) -> Self {
        Self {
            eval: Rc::new(f),
            volatile: false,
        }
    }

    /// A binding whose read set may change between evaluations (branches,
    /// short-circuits). Its dependencies are rediscovered every time.
    pub fn volatile(f: impl Fn(&S, &ExecutionContext) -> V + 'static) -> Self {
        Self {
            eval: Rc::new(f),
            volatile: true,
        }
    }

    pub fn is_volatile(&self) -> bool {
        self.volatile
    }

    /// Evaluate without touching the active collector.
    pub fn evaluate(&self, source: &S, context: &ExecutionContext) -> V {
        (self.eval)(source, context)
    }

    pub fn map<W: 'static>(self, f: impl Fn(V) -> W + 'static) -> Binding<S, W> {
        let eval = self.eval;
        Binding {
            eval: Rc::new(move |s: &S, c: &ExecutionContext| f(eval(s, c))),
            volatile: self.volatile,
        }
    }
}

impl<S, V> fmt::Debug for Binding<S, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("volatile", &self.volatile)
            .finish_non_exhaustive()
    }
}

struct Dependency {
    property: &'static str,
    notifier: Rc<PropertyChangeNotifier>,
    /// Object returned by the read, used to detect `a.b.c` chains.
    value: Option<ObjectId>,
}

struct ObserverCore<S, V> {
    this: Weak<ObserverCore<S, V>>,
    binding: Binding<S, V>,
    flags: Cell<ObserverFlags>,
    dependencies: RefCell<Vec<Dependency>>,
    subscribers: SubscriberSet,
}

impl<S: 'static, V: 'static> ObserverCore<S, V> {
    fn id(&self) -> ObjectId {
        ObjectId::of(self as *const Self)
    }

    fn as_subscriber(&self) -> Option<Rc<dyn Subscriber>> {
        self.this.upgrade().map(|me| me as Rc<dyn Subscriber>)
    }

    fn set_flag(&self, flag: ObserverFlags, on: bool) {
        let mut flags = self.flags.get();
        flags.set(flag, on);
        self.flags.set(flags);
    }

    fn disconnect(&self) {
        let dependencies = std::mem::take(&mut *self.dependencies.borrow_mut());
        if let Some(me) = self.as_subscriber() {
            for dep in &dependencies {
                dep.notifier.unsubscribe(&me, Some(dep.property));
            }
        }
        self.set_flag(ObserverFlags::NEEDS_REFRESH, true);
    }

    fn call(&self) {
        self.set_flag(ObserverFlags::NEEDS_QUEUE, true);
        if !self.dependencies.borrow().is_empty() {
            self.subscribers.notify(ChangeArgs::Binding);
        }
    }
}

impl<S: 'static, V: 'static> Watcher for ObserverCore<S, V> {
    fn watch(
        &self,
        source: ObjectId,
        property: &'static str,
        notifier: Rc<PropertyChangeNotifier>,
        value: Option<ObjectId>,
    ) {
        {
            let mut dependencies = self.dependencies.borrow_mut();
            if !self.flags.get().contains(ObserverFlags::NEEDS_REFRESH)
                && dependencies
                    .last()
                    .is_some_and(|prev| prev.value == Some(source))
            {
                self.set_flag(ObserverFlags::NEEDS_REFRESH, true);
            }
            dependencies.push(Dependency {
                property,
                notifier: notifier.clone(),
                value,
            });
        }
        if let Some(me) = self.as_subscriber() {
            notifier.subscribe(&me, Some(property));
        }
    }

    fn watch_volatile(&self) {
        self.set_flag(ObserverFlags::NEEDS_REFRESH, true);
    }
}

impl<S: 'static, V: 'static> Subscriber for ObserverCore<S, V> {
    fn handle_change(&self, _source: ObjectId, _args: ChangeArgs<'_>) {
        if !self.flags.get().contains(ObserverFlags::NEEDS_QUEUE) {
            return;
        }
        self.set_flag(ObserverFlags::NEEDS_QUEUE, false);
        let this = self.this.clone();
        queue_update(move || {
            if let Some(core) = this.upgrade() {
                core.call();
            }
        });
    }
}

/// Evaluates a binding while recording the observable reads it performs, and
/// tells its own subscribers (once per flush) when any of them changes.
///
/// Subscribers re-pull the value by calling [`observe`](Self::observe) again;
/// the observer never caches it.
pub struct BindingObserver<S, V> {
    core: Rc<ObserverCore<S, V>>,
}

impl<S, V> Clone for BindingObserver<S, V> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<S: 'static, V: 'static> BindingObserver<S, V> {
    pub fn new(binding: Binding<S, V>) -> Self {
        let core = Rc::new_cyclic(|this| ObserverCore {
            this: this.clone(),
            binding,
            flags: Cell::new(ObserverFlags::NEEDS_REFRESH | ObserverFlags::NEEDS_QUEUE),
            dependencies: RefCell::new(Vec::new()),
            subscribers: SubscriberSet::new(ObjectId::of(this.as_ptr())),
        });
        Self { core }
    }

    pub fn id(&self) -> ObjectId {
        self.core.id()
    }

    pub fn flags(&self) -> ObserverFlags {
        self.core.flags.get()
    }

    pub fn is_volatile(&self) -> bool {
        self.core.binding.is_volatile()
    }

    pub fn dependency_count(&self) -> usize {
        self.core.dependencies.borrow().len()
    }

    pub fn binding(&self) -> &Binding<S, V> {
        &self.core.binding
    }

    pub fn observe(&self, source: &S, context: &ExecutionContext) -> V {
        let core = &self.core;
        let refreshing = core.flags.get().contains(ObserverFlags::NEEDS_REFRESH);
        if refreshing && !core.dependencies.borrow().is_empty() {
            core.disconnect();
        }

        // A non-refreshing evaluation installs no collector at all, so its
        // reads cannot leak into an enclosing one.
        let watcher = refreshing.then(|| core.clone() as Rc<dyn Watcher>);
        let _guard = install_watcher(watcher);
        core.set_flag(ObserverFlags::NEEDS_REFRESH, core.binding.is_volatile());
        core.binding.evaluate(source, context)
    }

    /// Drop every dependency. The observer stays inert until the next `observe`.
    pub fn disconnect(&self) {
        self.core.disconnect();
    }

    pub fn subscribe(&self, subscriber: &Rc<dyn Subscriber>) {
        self.core.subscribers.subscribe(subscriber);
    }

    pub fn unsubscribe(&self, subscriber: &Rc<dyn Subscriber>) {
        self.core.subscribers.unsubscribe(subscriber);
    }
}

impl<S: 'static, V: 'static> Notifier for BindingObserver<S, V> {
    fn subscribe(&self, subscriber: &Rc<dyn Subscriber>, _property: Option<&'static str>) {
        BindingObserver::subscribe(self, subscriber);
    }

    fn unsubscribe(&self, subscriber: &Rc<dyn Subscriber>, _property: Option<&'static str>) {
        BindingObserver::unsubscribe(self, subscriber);
    }

    fn notify(&self, args: ChangeArgs<'_>) {
        self.core.subscribers.notify(args);
    }
}

impl<S, V> fmt::Debug for BindingObserver<S, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingObserver")
            .field("flags", &self.core.flags.get())
            .field("dependencies", &self.core.dependencies.borrow().len())
            .finish()
    }
}

pub fn create_binding_observer<S: 'static, V: 'static>(
    binding: Binding<S, V>,
    initial_subscriber: Option<&Rc<dyn Subscriber>>,
) -> BindingObserver<S, V> {
    let observer = BindingObserver::new(binding);
    if let Some(subscriber) = initial_subscriber {
        observer.subscribe(subscriber);
    }
    observer
}
