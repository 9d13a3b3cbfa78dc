use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use crate::ObjectId;

/// Payload delivered with a change notification.
#[derive(Clone, Copy, Debug)]
pub enum ChangeArgs<'a> {
    /// An observable property of the source changed.
    Property(&'a str),
    /// A binding observer is asking its subscribers to re-pull its value.
    Binding,
    /// A collection flushed; holds a `Vec<Splice<T>>`.
    Splices(&'a dyn Any),
}

pub trait Subscriber {
    fn handle_change(&self, source: ObjectId, args: ChangeArgs<'_>);
}

/// Anything offering subscribe/unsubscribe/notify.
///
/// `property` narrows a subscription to one property where the notifier
/// supports it; plain subscriber sets ignore it.
pub trait Notifier {
    fn subscribe(&self, subscriber: &Rc<dyn Subscriber>, property: Option<&'static str>);
    fn unsubscribe(&self, subscriber: &Rc<dyn Subscriber>, property: Option<&'static str>);
    fn notify(&self, args: ChangeArgs<'_>);
}

type SubscriberRef = Weak<dyn Subscriber>;

enum Slots {
    Inline {
        first: Option<SubscriberRef>,
        second: Option<SubscriberRef>,
    },
    Spillover(Vec<SubscriberRef>),
}

fn same(slot: &SubscriberRef, subscriber: &Rc<dyn Subscriber>) -> bool {
    std::ptr::addr_eq(slot.as_ptr(), Rc::as_ptr(subscriber))
}

fn is_live(slot: &Option<SubscriberRef>) -> bool {
    slot.as_ref().is_some_and(|s| s.strong_count() > 0)
}

/// Subscriber set tuned for the common zero-to-two subscriber case.
///
/// The first two subscribers live in inline slots. The third subscription moves
/// everything into a growable list, and the set never moves back. Subscribers
/// are held weakly: dropping a subscriber is enough to stop its notifications.
pub struct SubscriberSet {
    source: ObjectId,
    slots: RefCell<Slots>,
}

impl SubscriberSet {
    pub fn new(source: ObjectId) -> Self {
        Self {
            source,
            slots: RefCell::new(Slots::Inline {
                first: None,
                second: None,
            }),
        }
    }

    pub fn source(&self) -> ObjectId {
        self.source
    }

    pub fn is_spillover(&self) -> bool {
        matches!(&*self.slots.borrow(), Slots::Spillover(_))
    }

    /// Number of live subscribers.
    pub fn len(&self) -> usize {
        match &*self.slots.borrow() {
            Slots::Inline { first, second } => {
                usize::from(is_live(first)) + usize::from(is_live(second))
            }
            Slots::Spillover(list) => list.iter().filter(|s| s.strong_count() > 0).count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has(&self, subscriber: &Rc<dyn Subscriber>) -> bool {
        match &*self.slots.borrow() {
            Slots::Inline { first, second } => first
                .iter()
                .chain(second.iter())
                .any(|s| same(s, subscriber)),
            Slots::Spillover(list) => list.iter().any(|s| same(s, subscriber)),
        }
    }

    pub fn subscribe(&self, subscriber: &Rc<dyn Subscriber>) {
        let mut slots = self.slots.borrow_mut();
        let spilled = match &mut *slots {
            Slots::Inline { first, second } => {
                if first.as_ref().is_some_and(|s| same(s, subscriber))
                    || second.as_ref().is_some_and(|s| same(s, subscriber))
                {
                    return;
                }
                if !is_live(first) {
                    *first = Some(Rc::downgrade(subscriber));
                    return;
                }
                if !is_live(second) {
                    *second = Some(Rc::downgrade(subscriber));
                    return;
                }
                let mut list = Vec::with_capacity(4);
                list.extend(first.take());
                list.extend(second.take());
                list.push(Rc::downgrade(subscriber));
                list
            }
            Slots::Spillover(list) => {
                if !list.iter().any(|s| same(s, subscriber)) {
                    list.retain(|s| s.strong_count() > 0);
                    list.push(Rc::downgrade(subscriber));
                }
                return;
            }
        };
        log::trace!("subscriber set of {:?} spilled over", self.source);
        *slots = Slots::Spillover(spilled);
    }

    pub fn unsubscribe(&self, subscriber: &Rc<dyn Subscriber>) {
        match &mut *self.slots.borrow_mut() {
            Slots::Inline { first, second } => {
                if first.as_ref().is_some_and(|s| same(s, subscriber)) {
                    *first = None;
                } else if second.as_ref().is_some_and(|s| same(s, subscriber)) {
                    *second = None;
                }
            }
            Slots::Spillover(list) => {
                if let Some(pos) = list.iter().position(|s| same(s, subscriber)) {
                    list.remove(pos);
                }
            }
        }
    }

    pub fn notify(&self, args: ChangeArgs<'_>) {
        // Snapshot first so handlers may subscribe/unsubscribe re-entrantly.
        let targets: SmallVec<[Rc<dyn Subscriber>; 2]> = match &*self.slots.borrow() {
            Slots::Inline { first, second } => first
                .iter()
                .chain(second.iter())
                .filter_map(Weak::upgrade)
                .collect(),
            Slots::Spillover(list) => list.iter().filter_map(Weak::upgrade).collect(),
        };
        for target in targets {
            target.handle_change(self.source, args);
        }
    }
}

impl Notifier for SubscriberSet {
    fn subscribe(&self, subscriber: &Rc<dyn Subscriber>, _property: Option<&'static str>) {
        SubscriberSet::subscribe(self, subscriber);
    }

    fn unsubscribe(&self, subscriber: &Rc<dyn Subscriber>, _property: Option<&'static str>) {
        SubscriberSet::unsubscribe(self, subscriber);
    }

    fn notify(&self, args: ChangeArgs<'_>) {
        SubscriberSet::notify(self, args);
    }
}

/// Per-object notifier: one lazily created [`SubscriberSet`] per property,
/// plus a set for subscribers interested in every property.
pub struct PropertyChangeNotifier {
    source: ObjectId,
    object: SubscriberSet,
    properties: RefCell<HashMap<&'static str, Rc<SubscriberSet>>>,
}

impl PropertyChangeNotifier {
    pub fn new(source: ObjectId) -> Self {
        Self {
            source,
            object: SubscriberSet::new(source),
            properties: RefCell::new(HashMap::new()),
        }
    }

    pub fn source(&self) -> ObjectId {
        self.source
    }

    pub fn has(&self, subscriber: &Rc<dyn Subscriber>, property: Option<&str>) -> bool {
        match property {
            Some(name) => self
                .properties
                .borrow()
                .get(name)
                .is_some_and(|set| set.has(subscriber)),
            None => self.object.has(subscriber),
        }
    }

    pub fn subscribe(&self, subscriber: &Rc<dyn Subscriber>, property: Option<&'static str>) {
        match property {
            Some(name) => {
                let set = self
                    .properties
                    .borrow_mut()
                    .entry(name)
                    .or_insert_with(|| Rc::new(SubscriberSet::new(self.source)))
                    .clone();
                set.subscribe(subscriber);
            }
            None => self.object.subscribe(subscriber),
        }
    }

    pub fn unsubscribe(&self, subscriber: &Rc<dyn Subscriber>, property: Option<&'static str>) {
        match property {
            Some(name) => {
                let set = self.properties.borrow().get(name).cloned();
                if let Some(set) = set {
                    set.unsubscribe(subscriber);
                }
            }
            None => self.object.unsubscribe(subscriber),
        }
    }

    pub fn notify_property(&self, name: &str) {
        let set = self.properties.borrow().get(name).cloned();
        if let Some(set) = set {
            set.notify(ChangeArgs::Property(name));
        }
        self.object.notify(ChangeArgs::Property(name));
    }
}

impl Notifier for PropertyChangeNotifier {
    fn subscribe(&self, subscriber: &Rc<dyn Subscriber>, property: Option<&'static str>) {
        PropertyChangeNotifier::subscribe(self, subscriber, property);
    }

    fn unsubscribe(&self, subscriber: &Rc<dyn Subscriber>, property: Option<&'static str>) {
        PropertyChangeNotifier::unsubscribe(self, subscriber, property);
    }

    fn notify(&self, args: ChangeArgs<'_>) {
        match args {
            ChangeArgs::Property(name) => self.notify_property(name),
            other => self.object.notify(other),
        }
    }
}
