use std::fmt;
use std::rc::Rc;

use filament_core::{ExecutionContext, Identity};
use filament_dom::{Document, DomValue, NodeId};

use crate::compiler::{self, CompiledTemplate};
use crate::policy::apply_policy;
use crate::{BindingDirective, BindingMode, Directive, TemplateError, View};

/// A compiled template from which any number of [`View`]s are created.
///
/// Cloning shares the compiled skeleton.
pub struct ViewTemplate<S: 'static> {
    inner: Rc<TemplateInner<S>>,
}

struct TemplateInner<S: 'static> {
    doc: Document,
    compiled: CompiledTemplate<S>,
}

impl<S: 'static> Clone for ViewTemplate<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: 'static> ViewTemplate<S> {
    /// Compile `markup`, whose placeholders refer to `directives` by index.
    /// The markup policy, if one is installed, runs first.
    pub fn compile(
        doc: &Document,
        markup: &str,
        directives: Vec<Rc<dyn Directive<S>>>,
    ) -> Result<Self, TemplateError> {
        let markup = apply_policy(markup.to_string());
        let compiled = compiler::compile(doc, &markup, &directives)?;
        Ok(Self {
            inner: Rc::new(TemplateInner {
                doc: doc.clone(),
                compiled,
            }),
        })
    }

    pub fn document(&self) -> &Document {
        &self.inner.doc
    }

    pub fn compiled(&self) -> &CompiledTemplate<S> {
        &self.inner.compiled
    }

    pub fn ptr_eq(&self, other: &ViewTemplate<S>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Clone the skeleton and attach a behavior to every target. Host
    /// directives act on `host`.
    pub fn create(&self, host: Option<NodeId>) -> View<S> {
        let doc = &self.inner.doc;
        let compiled = &self.inner.compiled;
        let fragment = doc
            .clone_node(compiled.skeleton(), true)
            .unwrap_or_else(|| doc.create_fragment());

        let view_factories = compiled.view_factories();
        let host_factories = compiled.host_factories();
        let mut behaviors = Vec::with_capacity(view_factories.len() + host_factories.len());

        let mut target_index = compiled.target_offset();
        let mut node = doc.next_in_preorder(fragment, fragment);
        for factory in view_factories {
            while let Some(current) = node {
                if target_index == factory.target_index() {
                    behaviors.push(factory.create_behavior(doc, current));
                    break;
                }
                node = doc.next_in_preorder(fragment, current);
                target_index += 1;
            }
        }
        if behaviors.len() < view_factories.len() {
            log::warn!(
                "view resolved {} of {} template targets",
                behaviors.len(),
                view_factories.len()
            );
        }

        match host {
            Some(host) => {
                behaviors.extend(host_factories.iter().map(|f| f.create_behavior(doc, host)));
            }
            None if !host_factories.is_empty() => {
                log::warn!(
                    "template has {} host directives but the view has no host",
                    host_factories.len()
                );
            }
            None => {}
        }

        View::new(doc.clone(), fragment, behaviors)
    }

    /// Create a view for `host`, bind it to `source` and append it to `host`.
    pub fn render(&self, source: &Rc<S>, host: NodeId) -> View<S> {
        let view = self.create(Some(host));
        view.bind(source, &Rc::new(ExecutionContext::new()));
        view.append_to(host);
        view
    }
}

impl<S: 'static> Identity for ViewTemplate<S> {
    fn identical(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<S: 'static> fmt::Debug for ViewTemplate<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewTemplate")
            .field("compiled", &self.inner.compiled)
            .finish()
    }
}

/// Start a template whose bindings read from a source of type `S`.
///
/// ```ignore
/// let row = html::<Todo>(&doc)
///     .markup("<li class=\"")
///     .bind(|t, _| if t.done() { "done" } else { "" })
///     .markup("\">")
///     .bind(|t, _| t.title())
///     .markup("</li>")
///     .build()?;
/// ```
pub fn html<S: 'static>(doc: &Document) -> TemplateBuilder<S> {
    TemplateBuilder {
        doc: doc.clone(),
        markup: String::new(),
        directives: Vec::new(),
    }
}

pub struct TemplateBuilder<S: 'static> {
    doc: Document,
    markup: String,
    directives: Vec<Rc<dyn Directive<S>>>,
}

impl<S: 'static> TemplateBuilder<S> {
    pub fn markup(mut self, markup: &str) -> Self {
        self.markup.push_str(markup);
        self
    }

    pub fn bind<V: Into<DomValue>>(self, f: impl Fn(&S, &ExecutionContext) -> V + 'static) -> Self {
        self.directive(BindingDirective::new(BindingMode::Observed, f))
    }

    pub fn bind_volatile<V: Into<DomValue>>(
        self,
        f: impl Fn(&S, &ExecutionContext) -> V + 'static,
    ) -> Self {
        self.directive(BindingDirective::new(BindingMode::Volatile, f))
    }

    pub fn once<V: Into<DomValue>>(self, f: impl Fn(&S, &ExecutionContext) -> V + 'static) -> Self {
        self.directive(BindingDirective::new(BindingMode::OneTime, f))
    }

    pub fn directive(mut self, directive: impl Directive<S> + 'static) -> Self {
        let index = self.directives.len();
        self.markup.push_str(&directive.create_placeholder(index));
        self.directives.push(Rc::new(directive));
        self
    }

    pub fn build(self) -> Result<ViewTemplate<S>, TemplateError> {
        ViewTemplate::compile(&self.doc, &self.markup, self.directives)
    }
}
