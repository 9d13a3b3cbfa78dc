use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use filament_core::{
    Binding, BindingObserver, ChangeArgs, ExecutionContext, ObjectId, Subscriber, untracked,
    with_event,
};
use filament_dom::{DomValue, ListenerId};

use crate::{Behavior, Directive, Target, markers};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BindingMode {
    /// Re-evaluated whenever an observable it read changes.
    #[default]
    Observed,
    /// Like `Observed`, but dependencies are rediscovered on every evaluation.
    Volatile,
    /// Evaluated once when the view binds.
    OneTime,
}

/// What a binding writes to, chosen by the attribute it was placed in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Aspect {
    /// Text content of a text node.
    Content,
    /// Plain attribute. `Null` removes it.
    Attribute(String),
    /// `?name`: present when the value is truthy.
    BooleanAttribute(String),
    /// `:name`: a node property.
    Property(String),
    /// `class` or `:classList`: whitespace separated tokens merged into the
    /// class list, leaving tokens owned by others alone.
    TokenList,
    /// `@name`: event listener. The handler's result must be `true` to keep
    /// the default action.
    Event(String),
}

impl Aspect {
    pub fn parse(name: Option<&str>) -> Self {
        let Some(name) = name else {
            return Aspect::Content;
        };
        if let Some(property) = name.strip_prefix(':') {
            if property == "classList" {
                Aspect::TokenList
            } else {
                Aspect::Property(property.to_string())
            }
        } else if let Some(attribute) = name.strip_prefix('?') {
            Aspect::BooleanAttribute(attribute.to_string())
        } else if let Some(event) = name.strip_prefix('@') {
            Aspect::Event(event.to_string())
        } else if name == "class" {
            Aspect::TokenList
        } else {
            Aspect::Attribute(name.to_string())
        }
    }
}

/// A directive writing the result of a binding into its target.
pub struct BindingDirective<S> {
    binding: Binding<S, DomValue>,
    mode: BindingMode,
}

impl<S> Clone for BindingDirective<S> {
    fn clone(&self) -> Self {
        Self {
            binding: self.binding.clone(),
            mode: self.mode,
        }
    }
}

impl<S: 'static> BindingDirective<S> {
    pub fn new<V: Into<DomValue>>(
        mode: BindingMode,
        f: impl Fn(&S, &ExecutionContext) -> V + 'static,
    ) -> Self {
        let eval = move |s: &S, c: &ExecutionContext| -> DomValue { f(s, c).into() };
        let binding = match mode {
            BindingMode::Volatile => Binding::volatile(eval),
            BindingMode::Observed | BindingMode::OneTime => Binding::new(eval),
        };
        Self { binding, mode }
    }

    pub fn from_binding(binding: Binding<S, DomValue>, mode: BindingMode) -> Self {
        Self { binding, mode }
    }

    pub fn mode(&self) -> BindingMode {
        self.mode
    }

    pub fn binding(&self) -> &Binding<S, DomValue> {
        &self.binding
    }

    /// One binding concatenating literal text and the text of each part.
    pub(crate) fn aggregate(parts: Vec<AggregatePart<S>>) -> Self {
        let bindings = || {
            parts.iter().filter_map(|p| match p {
                AggregatePart::Binding(d) => Some(d),
                AggregatePart::Literal(_) => None,
            })
        };
        let mode = if bindings().all(|d| d.mode == BindingMode::OneTime) {
            BindingMode::OneTime
        } else if bindings().any(|d| d.mode == BindingMode::Volatile || d.binding.is_volatile()) {
            BindingMode::Volatile
        } else {
            BindingMode::Observed
        };

        let parts: Rc<[AggregatePart<S>]> = parts.into();
        Self::new(mode, move |s: &S, c: &ExecutionContext| {
            let mut out = String::new();
            for part in parts.iter() {
                match part {
                    AggregatePart::Literal(text) => out.push_str(text),
                    AggregatePart::Binding(d) => out.push_str(&d.binding.evaluate(s, c).to_text()),
                }
            }
            DomValue::Text(out)
        })
    }
}

pub(crate) enum AggregatePart<S> {
    Literal(String),
    Binding(BindingDirective<S>),
}

impl<S: 'static> Directive<S> for BindingDirective<S> {
    fn create_placeholder(&self, index: usize) -> String {
        markers::interpolation(index)
    }

    fn create_behavior(&self, target: Target) -> Box<dyn Behavior<S>> {
        let aspect = Aspect::parse(target.aspect.as_deref());
        match (aspect, self.mode) {
            (Aspect::Event(event), _) => Box::new(EventBehavior {
                target,
                event,
                binding: self.binding.clone(),
                listener: Cell::new(None),
            }),
            (aspect, BindingMode::OneTime) => Box::new(OneTimeBehavior {
                updater: Updater::new(target, aspect),
                binding: self.binding.clone(),
            }),
            (aspect, _) => Box::new(ObservedBehavior::new(
                Updater::new(target, aspect),
                self.binding.clone(),
            )),
        }
    }

    fn as_binding(&self) -> Option<&BindingDirective<S>> {
        Some(self)
    }
}

impl<S> fmt::Debug for BindingDirective<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingDirective")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

struct Updater {
    target: Target,
    aspect: Aspect,
    tokens: RefCell<Vec<String>>,
}

impl Updater {
    fn new(target: Target, aspect: Aspect) -> Self {
        Self {
            target,
            aspect,
            tokens: RefCell::new(Vec::new()),
        }
    }

    fn apply(&self, value: DomValue) {
        let Target { doc, node, .. } = &self.target;
        match &self.aspect {
            Aspect::Content => doc.set_text(*node, &value.to_text()),
            Aspect::Attribute(name) => {
                if value.is_null() {
                    doc.remove_attribute(*node, name);
                } else {
                    doc.set_attribute(*node, name, &value.to_text());
                }
            }
            Aspect::BooleanAttribute(name) => {
                doc.set_boolean_attribute(*node, name, value.is_truthy())
            }
            Aspect::Property(name) => doc.set_property(*node, name, value),
            Aspect::TokenList => self.apply_tokens(&value.to_text()),
            Aspect::Event(_) => {}
        }
    }

    fn apply_tokens(&self, value: &str) {
        let Target { doc, node, .. } = &self.target;
        let next: Vec<String> = value.split_whitespace().map(str::to_string).collect();
        for token in &next {
            doc.add_class(*node, token);
        }
        let previous = self.tokens.replace(next);
        let current = self.tokens.borrow();
        for token in previous.iter().filter(|t| !current.contains(*t)) {
            doc.remove_class(*node, token);
        }
    }
}

struct OneTimeBehavior<S> {
    updater: Updater,
    binding: Binding<S, DomValue>,
}

impl<S: 'static> Behavior<S> for OneTimeBehavior<S> {
    fn bind(&self, source: &Rc<S>, context: &Rc<ExecutionContext>) {
        let value = untracked(|| self.binding.evaluate(source, context));
        self.updater.apply(value);
    }

    fn unbind(&self, _source: &Rc<S>) {}
}

struct ObservedState<S> {
    updater: Updater,
    observer: BindingObserver<S, DomValue>,
    bound: RefCell<Option<(Rc<S>, Rc<ExecutionContext>)>>,
}

impl<S: 'static> ObservedState<S> {
    fn refresh(&self) {
        let bound = self.bound.borrow().clone();
        if let Some((source, context)) = bound {
            let value = self.observer.observe(&source, &context);
            self.updater.apply(value);
        }
    }
}

impl<S: 'static> Subscriber for ObservedState<S> {
    fn handle_change(&self, _source: ObjectId, _args: ChangeArgs<'_>) {
        self.refresh();
    }
}

struct ObservedBehavior<S> {
    state: Rc<ObservedState<S>>,
}

impl<S: 'static> ObservedBehavior<S> {
    fn new(updater: Updater, binding: Binding<S, DomValue>) -> Self {
        let state = Rc::new(ObservedState {
            updater,
            observer: BindingObserver::new(binding),
            bound: RefCell::new(None),
        });
        let subscriber: Rc<dyn Subscriber> = state.clone();
        state.observer.subscribe(&subscriber);
        Self { state }
    }
}

impl<S: 'static> Behavior<S> for ObservedBehavior<S> {
    fn bind(&self, source: &Rc<S>, context: &Rc<ExecutionContext>) {
        *self.state.bound.borrow_mut() = Some((source.clone(), context.clone()));
        self.state.refresh();
    }

    fn unbind(&self, _source: &Rc<S>) {
        self.state.bound.borrow_mut().take();
        self.state.observer.disconnect();
    }
}

struct EventBehavior<S> {
    target: Target,
    event: String,
    binding: Binding<S, DomValue>,
    listener: Cell<Option<ListenerId>>,
}

impl<S: 'static> Behavior<S> for EventBehavior<S> {
    fn bind(&self, source: &Rc<S>, context: &Rc<ExecutionContext>) {
        self.unbind(source);
        let binding = self.binding.clone();
        let source = source.clone();
        let context = context.clone();
        let listener = self
            .target
            .doc
            .add_event_listener(self.target.node, &self.event, move |event| {
                let event_any: Rc<dyn Any> = event.clone();
                let result = with_event(event_any, || {
                    untracked(|| binding.evaluate(&source, &context))
                });
                if result != DomValue::Bool(true) {
                    event.prevent_default();
                }
            });
        self.listener.set(listener);
    }

    fn unbind(&self, _source: &Rc<S>) {
        if let Some(listener) = self.listener.take() {
            self.target
                .doc
                .remove_event_listener(self.target.node, listener);
        }
    }
}
