use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use filament_core::{
    Binding, BindingObserver, ChangeArgs, ExecutionContext, Identity, ObjectId, ObservableVec,
    Splice, Subscriber,
};

use crate::{Behavior, Directive, Target, View, ViewTemplate, markers};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RepeatOptions {
    /// Keep each view's context `index` and `length` in step with the list.
    pub positioning: bool,
    /// Rebind views of removed items to added ones instead of recreating them.
    pub recycle: bool,
}

impl Default for RepeatOptions {
    fn default() -> Self {
        Self {
            positioning: false,
            recycle: true,
        }
    }
}

/// Renders a view per item of an [`ObservableVec`], before the directive's
/// position.
pub struct RepeatDirective<S, T: 'static> {
    items: Binding<S, ObservableVec<Rc<T>>>,
    template: Binding<S, ViewTemplate<T>>,
    options: RepeatOptions,
}

pub fn repeat<S: 'static, T: 'static>(
    items: impl Fn(&S, &ExecutionContext) -> ObservableVec<Rc<T>> + 'static,
    template: &ViewTemplate<T>,
) -> RepeatDirective<S, T> {
    let template = template.clone();
    repeat_with(
        Binding::new(items),
        Binding::new(move |_: &S, _| template.clone()),
        RepeatOptions::default(),
    )
}

/// Repeat with explicit bindings for both the items and the template.
pub fn repeat_with<S: 'static, T: 'static>(
    items: Binding<S, ObservableVec<Rc<T>>>,
    template: Binding<S, ViewTemplate<T>>,
    options: RepeatOptions,
) -> RepeatDirective<S, T> {
    RepeatDirective {
        items,
        template,
        options,
    }
}

impl<S: 'static, T: 'static> RepeatDirective<S, T> {
    pub fn positioning(mut self, on: bool) -> Self {
        self.options.positioning = on;
        self
    }

    pub fn recycle(mut self, on: bool) -> Self {
        self.options.recycle = on;
        self
    }

    pub fn options(&self) -> RepeatOptions {
        self.options
    }
}

impl<S: 'static, T: 'static> Directive<S> for RepeatDirective<S, T> {
    fn create_placeholder(&self, index: usize) -> String {
        markers::block_placeholder(index)
    }

    fn create_behavior(&self, target: Target) -> Box<dyn Behavior<S>> {
        Box::new(RepeatBehavior::new(
            target,
            self.items.clone(),
            self.template.clone(),
            self.options,
        ))
    }
}

struct Bound<S> {
    source: Rc<S>,
    context: Rc<ExecutionContext>,
    /// Shared by every item view unless positioning is on.
    child_context: Rc<ExecutionContext>,
}

impl<S> Clone for Bound<S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            context: self.context.clone(),
            child_context: self.child_context.clone(),
        }
    }
}

struct RepeatState<S: 'static, T: 'static> {
    this: Weak<RepeatState<S, T>>,
    location: Target,
    options: RepeatOptions,
    items_observer: BindingObserver<S, ObservableVec<Rc<T>>>,
    template_observer: BindingObserver<S, ViewTemplate<T>>,
    bound: RefCell<Option<Bound<S>>>,
    items: RefCell<Option<ObservableVec<Rc<T>>>>,
    template: RefCell<Option<ViewTemplate<T>>>,
    views: RefCell<Vec<View<T>>>,
}

impl<S: 'static, T: 'static> RepeatState<S, T> {
    fn as_subscriber(&self) -> Option<Rc<dyn Subscriber>> {
        self.this.upgrade().map(|me| me as Rc<dyn Subscriber>)
    }

    fn bound(&self) -> Option<Bound<S>> {
        self.bound.borrow().clone()
    }

    fn bind(&self, source: &Rc<S>, context: &Rc<ExecutionContext>) {
        let parent: Rc<dyn Any> = source.clone();
        *self.bound.borrow_mut() = Some(Bound {
            source: source.clone(),
            context: context.clone(),
            child_context: Rc::new(ExecutionContext::child(parent, context.clone())),
        });
        let items = self.items_observer.observe(source, context);
        let template = self.template_observer.observe(source, context);
        *self.template.borrow_mut() = Some(template);
        self.observe_items(items, true);
        self.refresh_all_views(false);
    }

    fn unbind(&self) {
        self.bound.borrow_mut().take();
        let items = self.items.borrow_mut().take();
        if let (Some(items), Some(me)) = (items, self.as_subscriber()) {
            items.unsubscribe(&me);
        }
        let views = self.views.take();
        for view in &views {
            view.unbind();
        }
        *self.views.borrow_mut() = views;
        self.items_observer.disconnect();
        self.template_observer.disconnect();
    }

    fn observe_items(&self, items: ObservableVec<Rc<T>>, force: bool) {
        let Some(me) = self.as_subscriber() else {
            return;
        };
        let previous = self.items.replace(Some(items.clone()));
        let changed = previous.as_ref().is_none_or(|p| !p.identical(&items));
        if changed && let Some(previous) = previous {
            previous.unsubscribe(&me);
        }
        if changed || force {
            items.subscribe(&me);
        }
    }

    fn current_items(&self) -> Vec<Rc<T>> {
        self.items
            .borrow()
            .as_ref()
            .map(ObservableVec::to_vec)
            .unwrap_or_default()
    }

    fn bind_view(&self, bound: &Bound<S>, view: &View<T>, item: &Rc<T>, index: usize, length: usize) {
        if !self.options.positioning {
            view.bind(item, &bound.child_context);
            return;
        }
        if view.source().is_some_and(|s| Rc::ptr_eq(&s, item)) {
            return;
        }
        let parent: Rc<dyn Any> = bound.source.clone();
        let context = Rc::new(ExecutionContext::child(parent, bound.context.clone()));
        context.update_position(index, length);
        view.bind(item, &context);
    }

    fn update_positions(&self, views: &[View<T>]) {
        if !self.options.positioning {
            return;
        }
        for (index, view) in views.iter().enumerate() {
            if let Some(context) = view.context() {
                context.update_position(index, views.len());
            }
        }
    }

    fn refresh_all_views(&self, template_changed: bool) {
        let (Some(bound), Some(template)) = (self.bound(), self.template.borrow().clone()) else {
            return;
        };
        let items = self.current_items();
        let anchor = self.location.node;
        let mut views = self.views.take();

        if items.is_empty() || template_changed || !self.options.recycle {
            View::dispose_contiguous_batch(&views);
            views.clear();
        }

        let existing = views.len();
        for (index, item) in items.iter().enumerate() {
            if index < existing {
                self.bind_view(&bound, &views[index], item, index, items.len());
            } else {
                let view = template.create(None);
                self.bind_view(&bound, &view, item, index, items.len());
                view.insert_before(anchor);
                views.push(view);
            }
        }
        if existing > items.len() {
            for view in views.drain(items.len()..) {
                view.dispose();
            }
        }

        self.update_positions(&views);
        *self.views.borrow_mut() = views;
    }

    fn update_views(&self, splices: &[Splice<Rc<T>>]) {
        let (Some(bound), Some(template)) = (self.bound(), self.template.borrow().clone()) else {
            return;
        };
        let items = self.current_items();
        let anchor = self.location.node;
        let mut views = self.views.take();
        let mut leftover: VecDeque<View<T>> = VecDeque::new();

        for splice in splices {
            let start = splice.index.min(views.len());
            let end = (start + splice.removed.len()).min(views.len());
            let mut removed: VecDeque<View<T>> = views.drain(start..end).collect();

            for index in splice.index..splice.index + splice.added_count {
                let Some(item) = items.get(index) else {
                    break;
                };
                let recycled = if self.options.recycle {
                    removed.pop_front().or_else(|| leftover.pop_front())
                } else {
                    None
                };
                let view = recycled.unwrap_or_else(|| template.create(None));
                self.bind_view(&bound, &view, item, index, items.len());

                let at = index.min(views.len());
                let reference = views[at..]
                    .iter()
                    .find_map(View::first_node)
                    .unwrap_or(anchor);
                view.insert_before(reference);
                views.insert(at, view);
            }
            leftover.extend(removed);
        }

        if !leftover.is_empty() {
            log::trace!("repeat disposing {} views", leftover.len());
        }
        for view in leftover {
            view.dispose();
        }

        self.update_positions(&views);
        *self.views.borrow_mut() = views;
    }
}

impl<S: 'static, T: 'static> Subscriber for RepeatState<S, T> {
    fn handle_change(&self, source: ObjectId, args: ChangeArgs<'_>) {
        let Some(bound) = self.bound() else {
            return;
        };
        match args {
            ChangeArgs::Binding if source == self.items_observer.id() => {
                let items = self.items_observer.observe(&bound.source, &bound.context);
                self.observe_items(items, false);
                self.refresh_all_views(false);
            }
            ChangeArgs::Binding if source == self.template_observer.id() => {
                let template = self.template_observer.observe(&bound.source, &bound.context);
                let previous = self.template.replace(Some(template.clone()));
                if !previous.is_some_and(|p| p.ptr_eq(&template)) {
                    self.refresh_all_views(true);
                }
            }
            ChangeArgs::Splices(splices) => {
                if let Some(splices) = splices.downcast_ref::<Vec<Splice<Rc<T>>>>() {
                    self.update_views(splices);
                }
            }
            _ => {}
        }
    }
}

/// Behavior of a [`RepeatDirective`] at its anchor node.
pub struct RepeatBehavior<S: 'static, T: 'static> {
    state: Rc<RepeatState<S, T>>,
}

impl<S: 'static, T: 'static> RepeatBehavior<S, T> {
    fn new(
        location: Target,
        items: Binding<S, ObservableVec<Rc<T>>>,
        template: Binding<S, ViewTemplate<T>>,
        options: RepeatOptions,
    ) -> Self {
        let state = Rc::new_cyclic(|this| RepeatState {
            this: this.clone(),
            location,
            options,
            items_observer: BindingObserver::new(items),
            template_observer: BindingObserver::new(template),
            bound: RefCell::new(None),
            items: RefCell::new(None),
            template: RefCell::new(None),
            views: RefCell::new(Vec::new()),
        });
        let me: Rc<dyn Subscriber> = state.clone();
        state.items_observer.subscribe(&me);
        state.template_observer.subscribe(&me);
        Self { state }
    }
}

impl<S: 'static, T: 'static> Behavior<S> for RepeatBehavior<S, T> {
    fn bind(&self, source: &Rc<S>, context: &Rc<ExecutionContext>) {
        self.state.bind(source, context);
    }

    fn unbind(&self, _source: &Rc<S>) {
        self.state.unbind();
    }
}
