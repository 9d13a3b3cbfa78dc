use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use filament_core::ExecutionContext;
use filament_dom::{Document, NodeId};

use crate::Behavior;

/// One live instance of a [`ViewTemplate`](crate::ViewTemplate).
///
/// A view owns the run of sibling nodes cloned from the template skeleton,
/// from its first to its last node. While detached those nodes sit in the
/// view's own fragment.
pub struct View<S: 'static> {
    doc: Document,
    fragment: NodeId,
    first: Option<NodeId>,
    last: Option<NodeId>,
    behaviors: Vec<Box<dyn Behavior<S>>>,
    source: RefCell<Option<Rc<S>>>,
    context: RefCell<Option<Rc<ExecutionContext>>>,
    disposed: Cell<bool>,
}

impl<S: 'static> View<S> {
    pub(crate) fn new(doc: Document, fragment: NodeId, behaviors: Vec<Box<dyn Behavior<S>>>) -> Self {
        let first = doc.first_child(fragment);
        let last = doc.last_child(fragment);
        Self {
            doc,
            fragment,
            first,
            last,
            behaviors,
            source: RefCell::new(None),
            context: RefCell::new(None),
            disposed: Cell::new(false),
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn first_node(&self) -> Option<NodeId> {
        self.first
    }

    pub fn last_node(&self) -> Option<NodeId> {
        self.last
    }

    /// The view's top-level nodes, first to last.
    pub fn nodes(&self) -> Vec<NodeId> {
        let mut nodes = Vec::new();
        let mut cursor = self.first;
        while let Some(node) = cursor {
            nodes.push(node);
            if Some(node) == self.last {
                break;
            }
            cursor = self.doc.next_sibling(node);
        }
        nodes
    }

    pub fn source(&self) -> Option<Rc<S>> {
        self.source.borrow().clone()
    }

    pub fn context(&self) -> Option<Rc<ExecutionContext>> {
        self.context.borrow().clone()
    }

    pub fn is_bound(&self) -> bool {
        self.source.borrow().is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    pub fn behavior_count(&self) -> usize {
        self.behaviors.len()
    }

    /// Serialized markup of the view's nodes.
    pub fn html(&self) -> String {
        self.nodes()
            .into_iter()
            .map(|node| self.doc.outer_html(node))
            .collect()
    }

    /// Bind every behavior to `source`. Binding the source that is already
    /// bound does nothing; binding another one unbinds the previous first.
    pub fn bind(&self, source: &Rc<S>, context: &Rc<ExecutionContext>) {
        let previous = self.source.borrow().clone();
        if let Some(previous) = &previous
            && Rc::ptr_eq(previous, source)
        {
            return;
        }

        *self.source.borrow_mut() = Some(source.clone());
        *self.context.borrow_mut() = Some(context.clone());
        for behavior in &self.behaviors {
            if let Some(previous) = &previous {
                behavior.unbind(previous);
            }
            behavior.bind(source, context);
        }
    }

    pub fn unbind(&self) {
        let Some(previous) = self.source.borrow_mut().take() else {
            return;
        };
        for behavior in &self.behaviors {
            behavior.unbind(&previous);
        }
    }

    pub fn append_to(&self, parent: NodeId) {
        if self.doc.has_child_nodes(self.fragment) {
            self.doc.append_child(parent, self.fragment);
        } else {
            for node in self.nodes() {
                self.doc.append_child(parent, node);
            }
        }
    }

    /// Move the view's nodes in front of `reference`.
    pub fn insert_before(&self, reference: NodeId) {
        let Some(parent) = self.doc.parent(reference) else {
            log::warn!("cannot insert a view before a detached node");
            return;
        };
        if self.doc.has_child_nodes(self.fragment) {
            self.doc.insert_before(parent, self.fragment, Some(reference));
            return;
        }
        if self.last.is_some() && self.doc.prev_sibling(reference) == self.last {
            return;
        }
        for node in self.nodes() {
            self.doc.insert_before(parent, node, Some(reference));
        }
    }

    /// Take the nodes out of the tree, back into the view's fragment. The view
    /// stays bound and can be inserted again.
    pub fn remove(&self) {
        for node in self.nodes() {
            self.doc.append_child(self.fragment, node);
        }
    }

    /// Detach, unbind and free the view's nodes. Disposing twice is a no-op.
    pub fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        let nodes = self.nodes();
        for &node in &nodes {
            self.doc.remove(node);
        }
        self.unbind();
        for node in nodes {
            self.doc.destroy(node);
        }
        self.doc.destroy(self.fragment);
    }

    /// Dispose views that sit next to each other in the tree, in order, with
    /// a single range deletion.
    pub fn dispose_contiguous_batch(views: &[View<S>]) {
        let live: Vec<&View<S>> = views.iter().filter(|v| !v.disposed.get()).collect();
        let first = live.iter().find_map(|v| v.first);
        let last = live.iter().rev().find_map(|v| v.last);
        if let (Some(first), Some(last), Some(view)) = (first, last, live.first()) {
            view.doc.remove_range(first, last);
        }
        for view in live {
            view.disposed.set(true);
            view.unbind();
            view.doc.destroy(view.fragment);
        }
    }
}

impl<S: 'static> fmt::Debug for View<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("first", &self.first)
            .field("last", &self.last)
            .field("behaviors", &self.behaviors.len())
            .field("bound", &self.source.borrow().is_some())
            .field("disposed", &self.disposed.get())
            .finish()
    }
}
