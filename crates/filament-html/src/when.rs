use std::cell::{Cell, RefCell};
use std::rc::Rc;

use filament_core::{Binding, BindingObserver, ChangeArgs, ExecutionContext, ObjectId, Subscriber};

use crate::{Behavior, Directive, Target, View, ViewTemplate, markers};

/// Renders `template` before the directive's position while a condition
/// holds, and the `otherwise` template, if any, while it does not.
pub struct WhenDirective<S: 'static> {
    condition: Binding<S, bool>,
    template: ViewTemplate<S>,
    otherwise: Option<ViewTemplate<S>>,
}

pub fn when<S: 'static>(
    condition: impl Fn(&S, &ExecutionContext) -> bool + 'static,
    template: &ViewTemplate<S>,
) -> WhenDirective<S> {
    WhenDirective {
        condition: Binding::new(condition),
        template: template.clone(),
        otherwise: None,
    }
}

/// Like [`when`], for conditions whose reads vary between evaluations.
pub fn when_volatile<S: 'static>(
    condition: impl Fn(&S, &ExecutionContext) -> bool + 'static,
    template: &ViewTemplate<S>,
) -> WhenDirective<S> {
    WhenDirective {
        condition: Binding::volatile(condition),
        template: template.clone(),
        otherwise: None,
    }
}

impl<S: 'static> WhenDirective<S> {
    pub fn otherwise(mut self, template: &ViewTemplate<S>) -> Self {
        self.otherwise = Some(template.clone());
        self
    }
}

impl<S: 'static> Directive<S> for WhenDirective<S> {
    fn create_placeholder(&self, index: usize) -> String {
        markers::block_placeholder(index)
    }

    fn create_behavior(&self, target: Target) -> Box<dyn Behavior<S>> {
        let state = Rc::new(WhenState {
            anchor: target,
            observer: BindingObserver::new(self.condition.clone()),
            templates: [Some(self.template.clone()), self.otherwise.clone()],
            views: Default::default(),
            shown: Cell::new(None),
            bound: RefCell::new(None),
        });
        let subscriber: Rc<dyn Subscriber> = state.clone();
        state.observer.subscribe(&subscriber);
        Box::new(WhenBehavior { state })
    }
}

const THEN: usize = 0;
const OTHERWISE: usize = 1;

struct WhenState<S: 'static> {
    anchor: Target,
    observer: BindingObserver<S, bool>,
    templates: [Option<ViewTemplate<S>>; 2],
    /// Views are created on first use and kept while hidden.
    views: [RefCell<Option<View<S>>>; 2],
    shown: Cell<Option<usize>>,
    bound: RefCell<Option<(Rc<S>, Rc<ExecutionContext>)>>,
}

impl<S: 'static> WhenState<S> {
    fn refresh(&self) {
        let bound = self.bound.borrow().clone();
        let Some((source, context)) = bound else {
            return;
        };
        let branch = if self.observer.observe(&source, &context) {
            THEN
        } else {
            OTHERWISE
        };
        self.show(branch, &source, &context);
    }

    fn show(&self, branch: usize, source: &Rc<S>, context: &Rc<ExecutionContext>) {
        if self.shown.get() == Some(branch) {
            if let Some(view) = self.views[branch].borrow().as_ref() {
                view.bind(source, context);
            }
            return;
        }

        if let Some(hidden) = self.shown.take()
            && let Some(view) = self.views[hidden].borrow().as_ref()
        {
            view.remove();
            view.unbind();
        }

        let Some(template) = &self.templates[branch] else {
            return;
        };
        let view = self.views[branch]
            .take()
            .unwrap_or_else(|| template.create(None));
        view.bind(source, context);
        view.insert_before(self.anchor.node);
        *self.views[branch].borrow_mut() = Some(view);
        self.shown.set(Some(branch));
    }
}

impl<S: 'static> Subscriber for WhenState<S> {
    fn handle_change(&self, _source: ObjectId, _args: ChangeArgs<'_>) {
        self.refresh();
    }
}

impl<S: 'static> Drop for WhenState<S> {
    fn drop(&mut self) {
        let shown = self.shown.get();
        for (branch, slot) in self.views.iter().enumerate() {
            if shown != Some(branch)
                && let Some(view) = slot.borrow_mut().take()
            {
                view.dispose();
            }
        }
    }
}

struct WhenBehavior<S: 'static> {
    state: Rc<WhenState<S>>,
}

impl<S: 'static> Behavior<S> for WhenBehavior<S> {
    fn bind(&self, source: &Rc<S>, context: &Rc<ExecutionContext>) {
        *self.state.bound.borrow_mut() = Some((source.clone(), context.clone()));
        self.state.refresh();
    }

    fn unbind(&self, _source: &Rc<S>) {
        self.state.bound.borrow_mut().take();
        self.state.observer.disconnect();
        if let Some(shown) = self.state.shown.get()
            && let Some(view) = self.state.views[shown].borrow().as_ref()
        {
            view.unbind();
        }
    }
}
