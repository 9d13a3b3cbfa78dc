//! # Render tree
//!
//! `filament-dom` is the node tree Filament templates are cloned into and
//! views are rendered onto. It is deliberately small: an arena of elements,
//! text and comments linked as siblings, with the handful of DOM operations a
//! template runtime needs.
//!
//! ```rust
//! use filament_dom::*;
//!
//! let doc = Document::new();
//! let list = doc.parse_fragment("<ul><li>one</li></ul>").unwrap();
//! let ul = doc.first_child(list).unwrap();
//!
//! let item = doc.create_element("li");
//! let text = doc.create_text("two");
//! doc.append_child(item, text);
//! doc.append_child(ul, item);
//!
//! assert_eq!(doc.outer_html(ul), "<ul><li>one</li><li>two</li></ul>");
//! ```
//!
//! Stale ids are harmless: a destroyed node simply stops resolving, and every
//! operation on it is a no-op.

pub mod error;
pub mod event;
mod parse;
mod serialize;
pub mod tree;
pub mod value;

pub use error::*;
pub use event::*;
pub use tree::*;
pub use value::*;
