use std::fmt;
use std::rc::Rc;

use filament_dom::{Document, NodeId, NodeType, ParseError};

use crate::binding::AggregatePart;
use crate::markers::{self, Part};
use crate::{Behavior, BindingDirective, BindingMode, Directive, Target};

/// A directive placed at a structural position of the skeleton.
pub struct ViewFactory<S> {
    target_index: isize,
    aspect: Option<String>,
    directive: Rc<dyn Directive<S>>,
}

impl<S: 'static> ViewFactory<S> {
    /// Position in the preorder walk of a cloned skeleton, counting from the
    /// template's `target_offset`.
    pub fn target_index(&self) -> isize {
        self.target_index
    }

    pub fn aspect(&self) -> Option<&str> {
        self.aspect.as_deref()
    }

    pub(crate) fn create_behavior(&self, doc: &Document, node: NodeId) -> Box<dyn Behavior<S>> {
        self.directive.create_behavior(Target {
            doc: doc.clone(),
            node,
            aspect: self.aspect.clone(),
        })
    }
}

impl<S> fmt::Debug for ViewFactory<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewFactory")
            .field("target_index", &self.target_index)
            .field("aspect", &self.aspect)
            .finish_non_exhaustive()
    }
}

/// Output of compiling template markup.
///
/// `skeleton` is a detached fragment that is deep-cloned for every view.
/// `view_factories` are sorted by target index; `host_factories` apply to the
/// node a view is created for.
pub struct CompiledTemplate<S> {
    skeleton: NodeId,
    view_factories: Vec<ViewFactory<S>>,
    host_factories: Vec<ViewFactory<S>>,
    target_offset: isize,
}

impl<S> CompiledTemplate<S> {
    pub fn skeleton(&self) -> NodeId {
        self.skeleton
    }

    pub fn view_factories(&self) -> &[ViewFactory<S>] {
        &self.view_factories
    }

    pub fn host_factories(&self) -> &[ViewFactory<S>] {
        &self.host_factories
    }

    /// `-1` when a stable leading comment was inserted before the first node.
    pub fn target_offset(&self) -> isize {
        self.target_offset
    }
}

impl<S> fmt::Debug for CompiledTemplate<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledTemplate")
            .field("skeleton", &self.skeleton)
            .field("view_factories", &self.view_factories)
            .field("host_factories", &self.host_factories)
            .field("target_offset", &self.target_offset)
            .finish()
    }
}

struct CompilationContext<'a, S> {
    doc: &'a Document,
    directives: &'a [Rc<dyn Directive<S>>],
    target_index: isize,
    factories: Vec<ViewFactory<S>>,
}

impl<S: 'static> CompilationContext<'_, S> {
    fn add_factory(&mut self, directive: Rc<dyn Directive<S>>, aspect: Option<String>) {
        self.factories.push(ViewFactory {
            target_index: self.target_index,
            aspect,
            directive,
        });
    }

    fn directive(&self, index: usize) -> Option<Rc<dyn Directive<S>>> {
        let directive = self.directives.get(index).cloned();
        if directive.is_none() {
            log::warn!("template markup refers to unknown directive {index}");
        }
        directive
    }

    /// One directive for an attribute value: the directive itself when the
    /// value is a lone placeholder, an aggregate binding otherwise.
    fn attribute_directive(&self, parts: &[Part<'_>]) -> Option<Rc<dyn Directive<S>>> {
        if let [Part::Directive(index)] = parts {
            return self.directive(*index);
        }

        let mut aggregate = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                Part::Literal(text) => aggregate.push(AggregatePart::Literal(text.to_string())),
                Part::Directive(index) => {
                    let Some(directive) = self.directive(*index) else {
                        continue;
                    };
                    match directive.as_binding() {
                        Some(binding) => aggregate.push(AggregatePart::Binding(binding.clone())),
                        None => log::warn!(
                            "directive {index} cannot share an attribute with other content"
                        ),
                    }
                }
            }
        }
        Some(Rc::new(BindingDirective::aggregate(aggregate)))
    }

    fn compile_attributes(&mut self, node: NodeId, include_basic_values: bool) {
        let doc = self.doc;
        for name in doc.attribute_names(node) {
            let Some(value) = doc.get_attribute(node, &name) else {
                continue;
            };
            let directive = match markers::parse_interpolation(&value) {
                Some(parts) => self.attribute_directive(&parts),
                None if include_basic_values => {
                    let constant = value.clone();
                    let directive: Rc<dyn Directive<S>> = Rc::new(BindingDirective::new(
                        BindingMode::OneTime,
                        move |_: &S, _| constant.clone(),
                    ));
                    Some(directive)
                }
                None => None,
            };
            if let Some(directive) = directive {
                doc.remove_attribute(node, &name);
                self.add_factory(directive, Some(name));
            }
        }
    }

    /// Split an interpolated text node into one node per part. Returns the
    /// last node of the run so the walk continues after it.
    fn compile_content(&mut self, node: NodeId) -> NodeId {
        let doc = self.doc;
        let Some(text) = doc.text(node) else {
            return node;
        };
        let Some(parts) = markers::parse_interpolation(&text) else {
            return node;
        };

        let mut last = node;
        let mut first = true;
        for part in parts {
            let directive = match part {
                Part::Literal(_) => None,
                Part::Directive(index) => match self.directive(index) {
                    Some(directive) => Some(directive),
                    None => continue,
                },
            };
            let current = if first {
                node
            } else {
                let created = doc.create_text("");
                if let Some(parent) = doc.parent(last) {
                    doc.insert_before(parent, created, doc.next_sibling(last));
                }
                self.target_index += 1;
                created
            };
            first = false;

            match (part, directive) {
                (_, Some(directive)) => {
                    doc.set_text(current, " ");
                    self.add_factory(directive, None);
                }
                (Part::Literal(literal), None) => doc.set_text(current, literal),
                (Part::Directive(_), None) => {}
            }
            last = current;
        }

        if first {
            doc.set_text(node, "");
        }
        last
    }
}

fn is_block_marker(doc: &Document, node: NodeId) -> bool {
    doc.node_type(node) == Some(NodeType::Comment)
        && doc.text(node).is_some_and(|data| markers::is_block_marker(&data))
}

/// A lone `<template>` root whose attributes target the host.
fn template_root(doc: &Document, fragment: NodeId) -> Option<NodeId> {
    let mut elements = doc.children(fragment).into_iter().filter(|&child| {
        doc.node_type(child) != Some(NodeType::Text)
            || doc.text(child).is_some_and(|t| !t.trim().is_empty())
    });
    let root = elements.next()?;
    if elements.next().is_some() {
        return None;
    }
    doc.tag_name(root)
        .is_some_and(|tag| tag.eq_ignore_ascii_case("template"))
        .then_some(root)
}

pub(crate) fn compile<S: 'static>(
    doc: &Document,
    markup: &str,
    directives: &[Rc<dyn Directive<S>>],
) -> Result<CompiledTemplate<S>, ParseError> {
    let fragment = doc.parse_fragment(markup)?;
    let mut context = CompilationContext {
        doc,
        directives,
        target_index: -1,
        factories: Vec::new(),
    };

    let (skeleton, host_factories) = match template_root(doc, fragment) {
        Some(root) => {
            context.compile_attributes(root, true);
            let host_factories = std::mem::take(&mut context.factories);
            let skeleton = doc.create_fragment();
            for child in doc.children(root) {
                doc.append_child(skeleton, child);
            }
            doc.destroy(fragment);
            (skeleton, host_factories)
        }
        None => (fragment, Vec::new()),
    };

    let mut cursor = doc.next_in_preorder(skeleton, skeleton);
    while let Some(node) = cursor {
        context.target_index += 1;
        let mut last = node;
        match doc.node_type(node) {
            Some(NodeType::Element) => context.compile_attributes(node, false),
            Some(NodeType::Text) => last = context.compile_content(node),
            Some(NodeType::Comment) => {
                let index = doc.text(node).as_deref().and_then(markers::block_index);
                if let Some(directive) = index.and_then(|i| context.directive(i)) {
                    context.add_factory(directive, None);
                }
            }
            _ => {}
        }
        cursor = doc.next_in_preorder(skeleton, last);
    }

    let mut target_offset = 0;
    let first = doc.first_child(skeleton);
    let only_child = first.is_some() && first == doc.last_child(skeleton);
    if first.is_some_and(|node| is_block_marker(doc, node))
        || (only_child && !directives.is_empty())
    {
        let leading = doc.create_comment("");
        doc.insert_before(skeleton, leading, first);
        target_offset = -1;
    }

    log::debug!(
        "compiled template: {} view factories, {} host factories, offset {}",
        context.factories.len(),
        host_factories.len(),
        target_offset
    );
    Ok(CompiledTemplate {
        skeleton,
        view_factories: context.factories,
        host_factories,
        target_offset,
    })
}
