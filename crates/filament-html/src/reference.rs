use std::rc::Rc;

use filament_core::ExecutionContext;
use filament_dom::NodeId;

use crate::{Behavior, Directive, Target, markers};

/// Hands the element it is placed on to `setter` whenever the view binds.
pub struct RefDirective<S> {
    setter: Rc<dyn Fn(&S, NodeId)>,
}

pub fn reference<S: 'static>(setter: impl Fn(&S, NodeId) + 'static) -> RefDirective<S> {
    RefDirective {
        setter: Rc::new(setter),
    }
}

impl<S: 'static> Directive<S> for RefDirective<S> {
    fn create_placeholder(&self, index: usize) -> String {
        format!(" {}", markers::attribute_placeholder("ref", index))
    }

    fn create_behavior(&self, target: Target) -> Box<dyn Behavior<S>> {
        Box::new(RefBehavior {
            node: target.node,
            setter: self.setter.clone(),
        })
    }
}

struct RefBehavior<S> {
    node: NodeId,
    setter: Rc<dyn Fn(&S, NodeId)>,
}

impl<S: 'static> Behavior<S> for RefBehavior<S> {
    fn bind(&self, source: &Rc<S>, _context: &Rc<ExecutionContext>) {
        (self.setter)(&**source, self.node);
    }

    fn unbind(&self, _source: &Rc<S>) {}
}
