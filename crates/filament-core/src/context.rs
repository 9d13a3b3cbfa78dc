use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::{Accessor, Observable, ObservableState, Observed, accessor};

thread_local! {
    static CURRENT_EVENT: RefCell<Option<Rc<dyn Any>>> = const { RefCell::new(None) };
}

struct EventGuard {
    previous: Option<Rc<dyn Any>>,
}

impl Drop for EventGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT_EVENT.with(|slot| *slot.borrow_mut() = previous);
    }
}

/// Make `event` visible through [`ExecutionContext::event`] while `f` runs.
pub fn with_event<R>(event: Rc<dyn Any>, f: impl FnOnce() -> R) -> R {
    let previous = CURRENT_EVENT.with(|slot| slot.replace(Some(event)));
    let _guard = EventGuard { previous };
    f()
}

/// Ambient information passed to every binding evaluation.
///
/// Views rendered by a repeat get their position here; nested views can reach
/// the source object and context of the view that created them.
pub struct ExecutionContext {
    state: ObservableState,
    index: Observed<usize>,
    length: Observed<usize>,
    parent: Option<Rc<dyn Any>>,
    parent_context: Option<Rc<ExecutionContext>>,
}

impl Observable for ExecutionContext {
    fn observable_state(&self) -> &ObservableState {
        &self.state
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionContext {
    pub const INDEX: Accessor<ExecutionContext, usize> = accessor!(ExecutionContext, index: usize);
    pub const LENGTH: Accessor<ExecutionContext, usize> =
        accessor!(ExecutionContext, length: usize);

    pub fn new() -> Self {
        Self {
            state: ObservableState::new(),
            index: Observed::new(0),
            length: Observed::new(0),
            parent: None,
            parent_context: None,
        }
    }

    /// Context for a view created on behalf of `parent`.
    pub fn child(parent: Rc<dyn Any>, parent_context: Rc<ExecutionContext>) -> Self {
        Self {
            parent: Some(parent),
            parent_context: Some(parent_context),
            ..Self::new()
        }
    }

    pub fn index(&self) -> usize {
        Self::INDEX.get(self)
    }

    pub fn length(&self) -> usize {
        Self::LENGTH.get(self)
    }

    pub fn update_position(&self, index: usize, length: usize) {
        Self::INDEX.set(self, index);
        Self::LENGTH.set(self, length);
    }

    /// The parent source, if it is a `P`.
    pub fn parent<P: 'static>(&self) -> Option<Rc<P>> {
        self.parent.clone()?.downcast::<P>().ok()
    }

    pub fn parent_context(&self) -> Option<&Rc<ExecutionContext>> {
        self.parent_context.as_ref()
    }

    /// The event being dispatched, if a handler is running for one of type `E`.
    pub fn event<E: 'static>(&self) -> Option<Rc<E>> {
        CURRENT_EVENT
            .with(|slot| slot.borrow().clone())?
            .downcast::<E>()
            .ok()
    }

    pub fn is_even(&self) -> bool {
        self.index() % 2 == 0
    }

    pub fn is_odd(&self) -> bool {
        !self.is_even()
    }

    pub fn is_first(&self) -> bool {
        self.index() == 0
    }

    pub fn is_last(&self) -> bool {
        self.length().checked_sub(1) == Some(self.index())
    }

    pub fn is_in_middle(&self) -> bool {
        !self.is_first() && !self.is_last()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("index", &self.index)
            .field("length", &self.length)
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}
