use crate::NodeId;
use crate::tree::{NodeData, Tree};

pub(crate) const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

pub(crate) const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

pub(crate) fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(tag))
}

pub(crate) fn is_raw_text(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(tag))
}

fn escape_into(out: &mut String, text: &str, attribute: bool) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}

fn write_children(tree: &Tree, id: NodeId, raw: bool, out: &mut String) {
    let mut cursor = tree.nodes.get(id).and_then(|n| n.first_child);
    while let Some(child) = cursor {
        write_node(tree, child, raw, out);
        cursor = tree.nodes.get(child).and_then(|n| n.next_sibling);
    }
}

fn write_node(tree: &Tree, id: NodeId, raw: bool, out: &mut String) {
    let Some(node) = tree.nodes.get(id) else {
        return;
    };
    match &node.data {
        NodeData::Text(t) if raw => out.push_str(t),
        NodeData::Text(t) => escape_into(out, t, false),
        NodeData::Comment(c) => {
            out.push_str("<!--");
            out.push_str(c);
            out.push_str("-->");
        }
        NodeData::Fragment => write_children(tree, id, raw, out),
        NodeData::Element(e) => {
            out.push('<');
            out.push_str(&e.tag);
            for (name, value) in &e.attributes {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                escape_into(out, value, true);
                out.push('"');
            }
            out.push('>');
            if is_void(&e.tag) {
                return;
            }
            write_children(tree, id, is_raw_text(&e.tag), out);
            out.push_str("</");
            out.push_str(&e.tag);
            out.push('>');
        }
    }
}

pub(crate) fn outer_html(tree: &Tree, id: NodeId) -> String {
    let mut out = String::new();
    write_node(tree, id, false, &mut out);
    out
}

pub(crate) fn inner_html(tree: &Tree, id: NodeId) -> String {
    let raw = tree
        .nodes
        .get(id)
        .is_some_and(|n| matches!(&n.data, NodeData::Element(e) if is_raw_text(&e.tag)));
    let mut out = String::new();
    write_children(tree, id, raw, &mut out);
    out
}
