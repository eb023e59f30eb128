//! Persistent n-ary tree abstraction.
//!
//! Both expressions and instructions are immutable trees of reference-counted
//! nodes. Updates rebuild only the touched path and share every untouched
//! subtree. Change detection is by reference identity (`Rc::ptr_eq`), never
//! by deep comparison: a rewrite that produced nothing new hands back the
//! exact node it was given.

use smallvec::SmallVec;
use std::rc::Rc;

/// Ordered child list of a tree node.
///
/// Inline capacity of four covers every fixed-arity variant; only blocks
/// spill to the heap.
pub type Children<T> = SmallVec<[Rc<T>; 4]>;

/// A node in a persistent tree.
///
/// Implementors supply `children` and the variant-specific
/// `rebuild_from_children`; `replace_child` and `descendants` are derived.
pub trait TreeNode: Sized {
    /// The ordered (possibly empty) list of child nodes.
    fn children(&self) -> Children<Self>;

    /// Variant-specific reconstruction from a full child list.
    ///
    /// The caller must supply exactly the node's current child count for its
    /// current shape.
    fn rebuild_from_children(self: &Rc<Self>, children: Children<Self>) -> Rc<Self>;

    /// Returns a node with the child at `index` swapped for `node`.
    ///
    /// Returns the same instance when `node` is reference-identical to the
    /// existing child, so callers can test "did anything change" with
    /// `Rc::ptr_eq` alone.
    fn replace_child(self: &Rc<Self>, index: usize, node: Rc<Self>) -> Rc<Self> {
        let mut children = self.children();
        if Rc::ptr_eq(&children[index], &node) {
            return Rc::clone(self);
        }
        children[index] = node;
        self.rebuild_from_children(children)
    }

    /// Lazy pre-order traversal of every node strictly below this one.
    fn descendants(self: &Rc<Self>) -> Descendants<Self> {
        let mut stack: Vec<Rc<Self>> = self.children().into_vec();
        stack.reverse();
        Descendants { stack }
    }
}

/// Iterator state for [`TreeNode::descendants`].
pub struct Descendants<T> {
    stack: Vec<Rc<T>>,
}

impl<T: TreeNode> Iterator for Descendants<T> {
    type Item = Rc<T>;

    fn next(&mut self) -> Option<Rc<T>> {
        let node = self.stack.pop()?;
        for child in node.children().into_iter().rev() {
            self.stack.push(child);
        }
        Some(node)
    }
}
