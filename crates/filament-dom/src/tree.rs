use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::{DomValue, Event, ParseError, parse, serialize};

slotmap::new_key_type! {
    /// Handle to a node of a [`Document`]. Stale handles are tolerated.
    pub struct NodeId;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeType {
    Element,
    Text,
    Comment,
    Fragment,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type Handler = Rc<dyn Fn(&Rc<Event>)>;

struct Listener {
    id: ListenerId,
    event_type: String,
    handler: Handler,
}

pub(crate) struct ElementData {
    pub(crate) tag: String,
    pub(crate) attributes: Vec<(String, String)>,
    properties: HashMap<String, DomValue>,
}

pub(crate) enum NodeData {
    Element(ElementData),
    Text(String),
    Comment(String),
    Fragment,
}

pub(crate) struct Node {
    pub(crate) data: NodeData,
    parent: Option<NodeId>,
    pub(crate) first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    pub(crate) next_sibling: Option<NodeId>,
    listeners: Vec<Listener>,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            listeners: Vec::new(),
        }
    }

    fn node_type(&self) -> NodeType {
        match self.data {
            NodeData::Element(_) => NodeType::Element,
            NodeData::Text(_) => NodeType::Text,
            NodeData::Comment(_) => NodeType::Comment,
            NodeData::Fragment => NodeType::Fragment,
        }
    }

    fn element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    fn element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Default)]
pub(crate) struct Tree {
    pub(crate) nodes: SlotMap<NodeId, Node>,
    next_listener: u64,
}

impl Tree {
    fn insert(&mut self, data: NodeData) -> NodeId {
        self.nodes.insert(Node::new(data))
    }

    pub(crate) fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.nodes.get(id).and_then(|n| n.first_child);
        while let Some(child) = cursor {
            out.push(child);
            cursor = self.nodes.get(child).and_then(|n| n.next_sibling);
        }
        out
    }

    /// Whether `ancestor` is `node` or one of its ancestors.
    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.nodes.get(current).and_then(|n| n.parent);
        }
        false
    }

    fn detach(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        let (parent, prev, next) = (node.parent, node.prev_sibling, node.next_sibling);
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
        let Some(parent) = parent else {
            return;
        };

        match prev.and_then(|p| self.nodes.get_mut(p)) {
            Some(prev) => prev.next_sibling = next,
            None => {
                if let Some(p) = self.nodes.get_mut(parent) {
                    p.first_child = next;
                }
            }
        }
        match next.and_then(|n| self.nodes.get_mut(n)) {
            Some(next) => next.prev_sibling = prev,
            None => {
                if let Some(p) = self.nodes.get_mut(parent) {
                    p.last_child = prev;
                }
            }
        }
    }

    /// Link a detached `child` under `parent`, before `reference` or last.
    fn link(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        let prev = match reference {
            Some(r) => self.nodes.get(r).and_then(|n| n.prev_sibling),
            None => self.nodes.get(parent).and_then(|n| n.last_child),
        };

        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
            node.prev_sibling = prev;
            node.next_sibling = reference;
        }
        match prev.and_then(|p| self.nodes.get_mut(p)) {
            Some(prev) => prev.next_sibling = Some(child),
            None => {
                if let Some(p) = self.nodes.get_mut(parent) {
                    p.first_child = Some(child);
                }
            }
        }
        match reference.and_then(|r| self.nodes.get_mut(r)) {
            Some(next) => next.prev_sibling = Some(child),
            None => {
                if let Some(p) = self.nodes.get_mut(parent) {
                    p.last_child = Some(child);
                }
            }
        }
    }

    fn destroy(&mut self, id: NodeId) {
        self.detach(id);
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            stack.extend(self.children(current));
            self.nodes.remove(current);
        }
    }

    fn clone_data(&self, id: NodeId) -> Option<NodeData> {
        Some(match &self.nodes.get(id)?.data {
            NodeData::Element(e) => NodeData::Element(ElementData {
                tag: e.tag.clone(),
                attributes: e.attributes.clone(),
                properties: HashMap::new(),
            }),
            NodeData::Text(t) => NodeData::Text(t.clone()),
            NodeData::Comment(c) => NodeData::Comment(c.clone()),
            NodeData::Fragment => NodeData::Fragment,
        })
    }

    fn clone_node(&mut self, id: NodeId, deep: bool) -> Option<NodeId> {
        let copy = self.insert(self.clone_data(id)?);
        if deep {
            for child in self.children(id) {
                if let Some(child_copy) = self.clone_node(child, true) {
                    self.link(copy, child_copy, None);
                }
            }
        }
        Some(copy)
    }
}

/// A render tree. Cloning the handle shares the tree.
///
/// Nodes live in an arena and are addressed by [`NodeId`]. Every operation
/// accepts stale ids: lookups return `None` and mutations do nothing.
#[derive(Clone, Default)]
pub struct Document {
    tree: Rc<RefCell<Tree>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ptr_eq(&self, other: &Document) -> bool {
        Rc::ptr_eq(&self.tree, &other.tree)
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.tree.borrow().nodes.len()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.tree.borrow().nodes.contains_key(id)
    }

    pub fn create_element(&self, tag: &str) -> NodeId {
        self.tree.borrow_mut().insert(NodeData::Element(ElementData {
            tag: tag.to_string(),
            attributes: Vec::new(),
            properties: HashMap::new(),
        }))
    }

    pub fn create_text(&self, text: &str) -> NodeId {
        self.tree
            .borrow_mut()
            .insert(NodeData::Text(text.to_string()))
    }

    pub fn create_comment(&self, data: &str) -> NodeId {
        self.tree
            .borrow_mut()
            .insert(NodeData::Comment(data.to_string()))
    }

    pub fn create_fragment(&self) -> NodeId {
        self.tree.borrow_mut().insert(NodeData::Fragment)
    }

    pub fn node_type(&self, id: NodeId) -> Option<NodeType> {
        self.tree.borrow().nodes.get(id).map(Node::node_type)
    }

    pub fn tag_name(&self, id: NodeId) -> Option<String> {
        let tree = self.tree.borrow();
        tree.nodes.get(id)?.element().map(|e| e.tag.clone())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.tree.borrow().nodes.get(id)?.parent
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.tree.borrow().nodes.get(id)?.first_child
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.tree.borrow().nodes.get(id)?.last_child
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.tree.borrow().nodes.get(id)?.next_sibling
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.tree.borrow().nodes.get(id)?.prev_sibling
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.tree.borrow().children(id)
    }

    pub fn has_child_nodes(&self, id: NodeId) -> bool {
        self.first_child(id).is_some()
    }

    pub fn append_child(&self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    /// Insert `child` under `parent` before `reference` (last when `None`).
    ///
    /// A fragment is not inserted itself: its children move over, in order,
    /// and the fragment is left empty.
    pub fn insert_before(&self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        let mut tree = self.tree.borrow_mut();
        let Some(child_node) = tree.nodes.get(child) else {
            return;
        };
        let child_is_fragment = matches!(child_node.data, NodeData::Fragment);
        if !tree.nodes.contains_key(parent) {
            return;
        }
        if tree.is_inclusive_ancestor(child, parent) {
            log::warn!("refusing to insert a node into itself or its descendant");
            return;
        }

        let mut reference = reference;
        if let Some(r) = reference {
            if r == child {
                reference = tree.nodes.get(child).and_then(|n| n.next_sibling);
            } else if tree.nodes.get(r).and_then(|n| n.parent) != Some(parent) {
                log::warn!("insert_before reference is not a child of the parent; appending");
                reference = None;
            }
        }

        if child_is_fragment {
            for moved in tree.children(child) {
                tree.detach(moved);
                tree.link(parent, moved, reference);
            }
        } else {
            tree.detach(child);
            tree.link(parent, child, reference);
        }
    }

    /// Detach `id` from its parent. The node stays alive and can be re-inserted.
    pub fn remove(&self, id: NodeId) {
        self.tree.borrow_mut().detach(id);
    }

    /// Detach and free `id` with its whole subtree.
    pub fn destroy(&self, id: NodeId) {
        self.tree.borrow_mut().destroy(id);
    }

    /// Free the sibling run `first..=last` in one edit.
    pub fn remove_range(&self, first: NodeId, last: NodeId) {
        let mut tree = self.tree.borrow_mut();
        let mut run: SmallVec<[NodeId; 8]> = SmallVec::new();
        let mut cursor = Some(first);
        while let Some(current) = cursor {
            if !tree.nodes.contains_key(current) {
                break;
            }
            run.push(current);
            if current == last {
                break;
            }
            cursor = tree.nodes.get(current).and_then(|n| n.next_sibling);
        }
        if run.last() != Some(&last) {
            log::warn!("remove_range end is not a following sibling of its start");
        }
        for id in run {
            tree.destroy(id);
        }
    }

    pub fn clone_node(&self, id: NodeId, deep: bool) -> Option<NodeId> {
        self.tree.borrow_mut().clone_node(id, deep)
    }

    /// The node after `current` in a depth-first preorder walk of `root`.
    pub fn next_in_preorder(&self, root: NodeId, current: NodeId) -> Option<NodeId> {
        let tree = self.tree.borrow();
        let node = tree.nodes.get(current)?;
        if let Some(child) = node.first_child {
            return Some(child);
        }
        let mut cursor = current;
        loop {
            if cursor == root {
                return None;
            }
            let node = tree.nodes.get(cursor)?;
            if let Some(next) = node.next_sibling {
                return Some(next);
            }
            cursor = node.parent?;
        }
    }

    /// Data of a text or comment node.
    pub fn text(&self, id: NodeId) -> Option<String> {
        match &self.tree.borrow().nodes.get(id)?.data {
            NodeData::Text(t) | NodeData::Comment(t) => Some(t.clone()),
            _ => None,
        }
    }

    pub fn set_text(&self, id: NodeId, text: &str) {
        if let Some(node) = self.tree.borrow_mut().nodes.get_mut(id) {
            match &mut node.data {
                NodeData::Text(t) | NodeData::Comment(t) => {
                    t.clear();
                    t.push_str(text);
                }
                _ => {}
            }
        }
    }

    /// Concatenated text of `id` and its descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        let tree = self.tree.borrow();
        match tree.nodes.get(id).map(|n| &n.data) {
            Some(NodeData::Text(t) | NodeData::Comment(t)) => t.clone(),
            Some(_) => {
                let mut out = String::new();
                let mut stack = tree.children(id);
                stack.reverse();
                while let Some(current) = stack.pop() {
                    if let Some(NodeData::Text(t)) = tree.nodes.get(current).map(|n| &n.data) {
                        out.push_str(t);
                    }
                    let mut children = tree.children(current);
                    children.reverse();
                    stack.extend(children);
                }
                out
            }
            None => String::new(),
        }
    }

    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<String> {
        let tree = self.tree.borrow();
        let element = tree.nodes.get(id)?.element()?;
        element
            .attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.get_attribute(id, name).is_some()
    }

    pub fn attribute_names(&self, id: NodeId) -> Vec<String> {
        let tree = self.tree.borrow();
        tree.nodes
            .get(id)
            .and_then(Node::element)
            .map(|e| e.attributes.iter().map(|(n, _)| n.clone()).collect())
            .unwrap_or_default()
    }

    pub fn set_attribute(&self, id: NodeId, name: &str, value: &str) {
        let mut tree = self.tree.borrow_mut();
        let Some(element) = tree.nodes.get_mut(id).and_then(Node::element_mut) else {
            return;
        };
        match element.attributes.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => {
                v.clear();
                v.push_str(value);
            }
            None => element
                .attributes
                .push((name.to_string(), value.to_string())),
        }
    }

    pub fn remove_attribute(&self, id: NodeId, name: &str) {
        let mut tree = self.tree.borrow_mut();
        if let Some(element) = tree.nodes.get_mut(id).and_then(Node::element_mut) {
            element.attributes.retain(|(n, _)| n != name);
        }
    }

    /// Present with an empty value when `on`, absent otherwise.
    pub fn set_boolean_attribute(&self, id: NodeId, name: &str, on: bool) {
        if on {
            self.set_attribute(id, name, "");
        } else {
            self.remove_attribute(id, name);
        }
    }

    pub fn set_property(&self, id: NodeId, name: &str, value: DomValue) {
        let mut tree = self.tree.borrow_mut();
        if let Some(element) = tree.nodes.get_mut(id).and_then(Node::element_mut) {
            element.properties.insert(name.to_string(), value);
        }
    }

    pub fn property(&self, id: NodeId, name: &str) -> Option<DomValue> {
        let tree = self.tree.borrow();
        tree.nodes.get(id)?.element()?.properties.get(name).cloned()
    }

    pub fn class_list(&self, id: NodeId) -> Vec<String> {
        self.get_attribute(id, "class")
            .map(|c| c.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, id: NodeId, token: &str) -> bool {
        self.class_list(id).iter().any(|c| c == token)
    }

    pub fn add_class(&self, id: NodeId, token: &str) {
        if token.is_empty() || self.has_class(id, token) {
            return;
        }
        let mut classes = self.class_list(id);
        classes.push(token.to_string());
        self.set_attribute(id, "class", &classes.join(" "));
    }

    pub fn remove_class(&self, id: NodeId, token: &str) {
        if !self.has_class(id, token) {
            return;
        }
        let classes: Vec<String> = self
            .class_list(id)
            .into_iter()
            .filter(|c| c != token)
            .collect();
        self.set_attribute(id, "class", &classes.join(" "));
    }

    pub fn add_event_listener(
        &self,
        id: NodeId,
        event_type: &str,
        handler: impl Fn(&Rc<Event>) + 'static,
    ) -> Option<ListenerId> {
        let mut tree = self.tree.borrow_mut();
        let listener_id = ListenerId(tree.next_listener);
        let node = tree.nodes.get_mut(id)?;
        node.listeners.push(Listener {
            id: listener_id,
            event_type: event_type.to_string(),
            handler: Rc::new(handler),
        });
        tree.next_listener += 1;
        Some(listener_id)
    }

    pub fn remove_event_listener(&self, id: NodeId, listener: ListenerId) {
        if let Some(node) = self.tree.borrow_mut().nodes.get_mut(id) {
            node.listeners.retain(|l| l.id != listener);
        }
    }

    pub fn listener_count(&self, id: NodeId) -> usize {
        self.tree
            .borrow()
            .nodes
            .get(id)
            .map_or(0, |n| n.listeners.len())
    }

    /// Deliver `event` to `target` and then, if it bubbles, to each ancestor.
    /// Returns `false` when a handler called `prevent_default`.
    pub fn dispatch_event(&self, target: NodeId, event: &Rc<Event>) -> bool {
        event.set_target(Some(target));
        let path: Vec<NodeId> = {
            let tree = self.tree.borrow();
            let mut path = Vec::new();
            let mut cursor = tree.nodes.contains_key(target).then_some(target);
            while let Some(current) = cursor {
                path.push(current);
                if !event.bubbles() {
                    break;
                }
                cursor = tree.nodes.get(current).and_then(|n| n.parent);
            }
            path
        };

        for node in path {
            if event.propagation_stopped() {
                break;
            }
            // Handlers may edit the tree, so none of it stays borrowed while they run.
            let handlers: SmallVec<[Handler; 2]> = {
                let tree = self.tree.borrow();
                match tree.nodes.get(node) {
                    Some(n) => n
                        .listeners
                        .iter()
                        .filter(|l| l.event_type == event.event_type())
                        .map(|l| l.handler.clone())
                        .collect(),
                    None => continue,
                }
            };
            event.set_current_target(Some(node));
            for handler in handlers {
                handler(event);
            }
        }
        event.set_current_target(None);
        !event.default_prevented()
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        serialize::outer_html(&self.tree.borrow(), id)
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        serialize::inner_html(&self.tree.borrow(), id)
    }

    /// Parse `markup` into a new fragment.
    pub fn parse_fragment(&self, markup: &str) -> Result<NodeId, ParseError> {
        let fragment = self.create_fragment();
        match parse::parse_into(self, fragment, markup) {
            Ok(()) => Ok(fragment),
            Err(err) => {
                self.destroy(fragment);
                Err(err)
            }
        }
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.node_count())
            .finish()
    }
}
