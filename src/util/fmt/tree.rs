use std::io::Write;

use crate::ast::{Event, NodeId, Tree};

const INDENT_WIDTH: usize = 2;

pub fn print_tree_string(tree: &Tree) -> String {
    let mut buf = Vec::with_capacity(tree.node_count() * 16);
    print_tree(&mut buf, tree).unwrap();
    String::from_utf8(buf).unwrap()
}

/// Prints one node per line as `kind (line:column)`, children indented under
/// their container.
pub fn print_tree(w: &mut impl Write, tree: &Tree) -> std::io::Result<()> {
    let mut depth = 0;
    for event in tree.events() {
        match event {
            Event::Enter(id) => {
                print_node(w, tree, depth, id)?;
                if tree.kind(id).is_container() {
                    depth += 1;
                }
            }
            Event::Exit(_) => depth -= 1,
        }
    }
    Ok(())
}

fn print_node(w: &mut impl Write, tree: &Tree, i: usize, id: NodeId) -> std::io::Result<()> {
    sp(w, i)?;
    writeln!(w, "{} ({})", tree.kind(id), tree.pos(id))
}

fn sp(w: &mut impl Write, i: usize) -> std::io::Result<()> {
    write!(w, "{:width$}", "", width = i * INDENT_WIDTH)
}
