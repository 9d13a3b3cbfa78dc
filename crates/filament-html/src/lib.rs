//! # Templates and views
//!
//! `filament-html` turns markup with placeholders into reusable
//! [`ViewTemplate`]s and renders them onto a [`filament_dom::Document`].
//!
//! A template is built from literal markup and directives. Each directive
//! leaves a placeholder in the markup; compiling records where in the tree it
//! ended up, so creating a view is a deep clone plus one walk.
//!
//! ```ignore
//! use filament_core::*;
//! use filament_dom::Document;
//! use filament_html::*;
//!
//! let doc = Document::new();
//! let item = html::<Todo>(&doc)
//!     .markup("<li ?hidden=\"")
//!     .bind(|t, _| t.done())
//!     .markup("\">")
//!     .bind(|t, _| t.title())
//!     .markup("</li>")
//!     .build()?;
//!
//! let list = html::<App>(&doc)
//!     .markup("<ul>")
//!     .directive(repeat(|app, _| app.todos.clone(), &item))
//!     .markup("</ul>")
//!     .build()?;
//!
//! let host = doc.create_element("main");
//! let view = list.render(&app, host);
//!
//! app.todos.push(Rc::new(Todo::new("write docs")));
//! process_updates(); // one new <li>, nothing else touched
//! ```
//!
//! ## Binding targets
//!
//! Where a binding placeholder sits decides what it writes:
//!
//! | placeholder              | writes                                   |
//! |--------------------------|------------------------------------------|
//! | text                     | the text node's content                  |
//! | `name="…"`               | attribute, removed when the value is null |
//! | `?name="…"`              | boolean attribute                        |
//! | `:name="…"`              | node property                            |
//! | `class="…"`, `:classList` | class tokens                            |
//! | `@name="…"`              | event handler                            |
//!
//! Several placeholders, or placeholders mixed with text, in one attribute
//! value form a single binding producing the concatenation.
//!
//! A lone `<template>` root is not part of the view: its attributes are
//! applied to the host node passed to [`ViewTemplate::create`].

pub mod binding;
pub mod compiler;
pub mod directive;
pub mod error;
pub mod markers;
pub mod policy;
pub mod reference;
pub mod repeat;
pub mod template;
pub mod view;
pub mod when;

pub use binding::{Aspect, BindingDirective, BindingMode};
pub use compiler::{CompiledTemplate, ViewFactory};
pub use directive::*;
pub use error::*;
pub use policy::{MarkupPolicy, set_markup_policy};
pub use reference::*;
pub use repeat::*;
pub use template::*;
pub use view::*;
pub use when::*;
