use std::rc::Rc;

use filament_core::ExecutionContext;
use filament_dom::{Document, NodeId};

use crate::BindingDirective;

/// The node a behavior acts on.
#[derive(Clone, Debug)]
pub struct Target {
    pub doc: Document,
    pub node: NodeId,
    /// Attribute name the placeholder sat in, prefix included. `None` for
    /// text and block placeholders.
    pub aspect: Option<String>,
}

/// Live state a directive attaches to one node of one view.
///
/// `bind` and `unbind` are called in target order by the owning view. A
/// behavior must tolerate `unbind` without a preceding `bind`.
pub trait Behavior<S: 'static> {
    fn bind(&self, source: &Rc<S>, context: &Rc<ExecutionContext>);
    fn unbind(&self, source: &Rc<S>);
}

/// A compiled placeholder: what goes into the markup, and how to create a
/// behavior for the node found at its position.
pub trait Directive<S: 'static> {
    fn create_placeholder(&self, index: usize) -> String;

    fn create_behavior(&self, target: Target) -> Box<dyn Behavior<S>>;

    /// The underlying binding, for directives that can be merged into an
    /// aggregate attribute or text binding.
    fn as_binding(&self) -> Option<&BindingDirective<S>> {
        None
    }
}
