//! Graphviz export of a trie, for debugging rule sets. Wildcard boundaries are
//! drawn as double circles; entry maps are not shown.

use std::fmt::Write;

use crate::authz::trie::{Branching, NodeId, PrefixTrie, ROOT};

pub fn render<V: Clone, B: Branching>(trie: &PrefixTrie<V, B>) -> String {
    let mut edges = String::new();
    let mut wildcards = Vec::new();

    // iterative walk, resource paths can be arbitrarily deep
    let mut stack: Vec<NodeId> = vec![ROOT];
    while let Some(id) = stack.pop() {
        if trie.is_wildcard_boundary(id) {
            wildcards.push(format!("\"n{id}\""));
        }
        let children = trie.children_of(id);
        for (byte, child) in &children {
            let _ = writeln!(
                edges,
                "  \"n{id}\" -> \"n{child}\" [ label = \"{}\" ];",
                edge_label(*byte)
            );
        }
        stack.extend(children.iter().rev().map(|(_, child)| *child));
    }

    let mut out = String::from("digraph G {\n  size=\"8,5\"\n");
    if !wildcards.is_empty() {
        let _ = writeln!(out, "  node [shape = doublecircle]; {};", wildcards.join(" "));
    }
    out.push_str("  node [shape = circle];\n");
    out.push_str(&edges);
    out.push_str("}\n");
    out
}

fn edge_label(byte: u8) -> String {
    match byte {
        b'"' => "\\\"".to_string(),
        b'\\' => "\\\\".to_string(),
        b if b.is_ascii_graphic() || b == b' ' => (b as char).to_string(),
        b => format!("0x{b:02x}"),
    }
}
