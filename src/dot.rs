//! Graphviz dump of a queue's internal forest
//!
//! For testing and debugging only. Child edges are drawn red, parent edges
//! blue, and the root list is written last-to-first so that larger trees
//! tend to appear on the left.

use crate::element::ElemRef;
use crate::priqueue::PriQueue;
use std::io::{self, Write};
use std::rc::Rc;

impl<T, C> PriQueue<T, C> {
    /// Writes a DOT digraph of the queue's trees to `out`
    ///
    /// `label` renders each record; double quotes and backslashes in the
    /// result are escaped.
    ///
    /// # Example
    ///
    /// ```rust
    /// use intrusive_priqueue::{Element, PriQueue};
    ///
    /// let mut queue = PriQueue::default();
    /// let a = Element::new(1);
    /// let b = Element::new(2);
    /// queue.insert(&a);
    /// queue.insert(&b);
    ///
    /// let mut out = Vec::new();
    /// queue.write_dot(&mut out, |v: &i32| v.to_string()).unwrap();
    /// let dot = String::from_utf8(out).unwrap();
    /// assert!(dot.starts_with("digraph priqueue {"));
    /// ```
    pub fn write_dot<W, F>(&self, out: &mut W, mut label: F) -> io::Result<()>
    where
        W: Write,
        F: FnMut(&T) -> String,
    {
        writeln!(out, "digraph priqueue {{")?;

        let mut roots = Vec::new();
        let mut current = self.head.clone();
        while let Some(root) = current {
            current = root.link.borrow().next.clone();
            roots.push(root);
        }

        for root in roots.iter().rev() {
            write_node(out, root, &mut label)?;
            write_children(out, root, &mut label)?;
        }

        writeln!(out, "}}")
    }
}

fn node_id<T>(node: &ElemRef<T>) -> usize {
    Rc::as_ptr(node) as usize
}

fn write_node<T, W, F>(out: &mut W, node: &ElemRef<T>, label: &mut F) -> io::Result<()>
where
    W: Write,
    F: FnMut(&T) -> String,
{
    let text = label(&*node.borrow());
    let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
    writeln!(out, "  {} [label=\"{}\"];", node_id(node), escaped)
}

fn write_children<T, W, F>(out: &mut W, root: &ElemRef<T>, label: &mut F) -> io::Result<()>
where
    W: Write,
    F: FnMut(&T) -> String,
{
    let children = root.link.borrow().children.clone();
    for child in &children {
        write_node(out, child, label)?;
        writeln!(out, "  {} -> {} [color=red];", node_id(root), node_id(child))?;

        let parent = child.link.borrow().parent.upgrade();
        if let Some(parent) = parent {
            writeln!(
                out,
                "  {} -> {} [color=blue];",
                node_id(child),
                node_id(&parent)
            )?;
        }

        write_children(out, child, label)?;
    }
    Ok(())
}
