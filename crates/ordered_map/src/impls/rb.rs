use std::cmp::Ordering;

use crate::OrderedMap;
use crate::error::Result;
use crate::impls::bst::{RawBst, binary_reads};
use crate::impls::node::{Id, LEFT, RIGHT};
use crate::record::{Comparator, Destructor};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    Red,
    Black,
}

/// Red-black tree.
///
/// Classic (not left-leaning) formulation: insert and delete fix-ups walk
/// upward through parent links, looking at parent, uncle and sibling only.
pub struct RbTree {
    raw: RawBst<Color>,
}

impl RbTree {
    pub fn new(
        record_size: usize,
        cmp: impl Fn(&[u8], &[u8]) -> Ordering + 'static,
    ) -> Result<Self> {
        Self::build(record_size, Box::new(cmp), None)
    }

    pub fn with_destructor(
        record_size: usize,
        cmp: impl Fn(&[u8], &[u8]) -> Ordering + 'static,
        dtor: impl FnMut(&[u8]) + 'static,
    ) -> Result<Self> {
        Self::build(record_size, Box::new(cmp), Some(Box::new(dtor)))
    }

    pub(crate) fn build(
        record_size: usize,
        cmp: Comparator,
        dtor: Option<Destructor>,
    ) -> Result<Self> {
        let raw = RawBst::new(record_size, cmp, dtor)?;
        tracing::debug!(record_size, "created red-black tree");
        Ok(Self { raw })
    }

    /// Height of the tree, counted in nodes. Recursive; at most `2 * log2(n + 1)`
    /// deep.
    pub fn height(&self) -> usize {
        self.subtree_height(self.raw.root)
    }

    fn subtree_height(&self, x: Id) -> usize {
        if x.is_nil() {
            return 0;
        }
        let left = self.subtree_height(self.raw.arena.ch(x, LEFT));
        let right = self.subtree_height(self.raw.arena.ch(x, RIGHT));
        1 + left.max(right)
    }

    /// Nil children count as black.
    #[inline(always)]
    fn is_red(&self, x: Id) -> bool {
        !x.is_nil() && self.raw.arena.meta(x) == Color::Red
    }

    #[inline(always)]
    fn paint(&mut self, x: Id, color: Color) {
        self.raw.arena.set_meta(x, color);
    }

    fn fix_after_insert(&mut self, mut z: Id) {
        loop {
            let p = self.raw.arena.parent(z);
            if !self.is_red(p) {
                break;
            }
            // A red parent is never the root, so the grandparent exists.
            let g = self.raw.arena.parent(p);
            let side = self.raw.arena.side(p);
            let uncle = self.raw.arena.ch(g, side ^ 1);

            if self.is_red(uncle) {
                self.paint(p, Color::Black);
                self.paint(uncle, Color::Black);
                self.paint(g, Color::Red);
                z = g;
                continue;
            }

            let mut p = p;
            if self.raw.arena.side(z) != side {
                // Triangle: rotate into a line.
                self.raw.rotate(p, side);
                z = p;
                p = self.raw.arena.parent(z);
            }
            self.paint(p, Color::Black);
            self.paint(g, Color::Red);
            self.raw.rotate(g, side ^ 1);
            break;
        }
        let root = self.raw.root;
        self.paint(root, Color::Black);
    }

    /// `x` (possibly nil) hangs from `parent`'s `side` and is one black short.
    fn fix_after_delete(&mut self, mut x: Id, mut parent: Id, mut side: usize) {
        while !parent.is_nil() && !self.is_red(x) {
            let mut w = self.raw.arena.ch(parent, side ^ 1);
            if self.is_red(w) {
                self.paint(w, Color::Black);
                self.paint(parent, Color::Red);
                self.raw.rotate(parent, side);
                w = self.raw.arena.ch(parent, side ^ 1);
            }

            let near = self.raw.arena.ch(w, side);
            let far = self.raw.arena.ch(w, side ^ 1);
            if !self.is_red(near) && !self.is_red(far) {
                self.paint(w, Color::Red);
                x = parent;
                parent = self.raw.arena.parent(x);
                if !parent.is_nil() {
                    side = self.raw.arena.side(x);
                }
                continue;
            }

            if !self.is_red(far) {
                self.paint(near, Color::Black);
                self.paint(w, Color::Red);
                self.raw.rotate(w, side ^ 1);
                w = self.raw.arena.ch(parent, side ^ 1);
            }
            let parent_color = self.raw.arena.meta(parent);
            self.paint(w, parent_color);
            self.paint(parent, Color::Black);
            let far = self.raw.arena.ch(w, side ^ 1);
            self.paint(far, Color::Black);
            self.raw.rotate(parent, side);
            x = self.raw.root;
            break;
        }
        if !x.is_nil() {
            self.paint(x, Color::Black);
        }
    }

    fn remove(&mut self, key: &[u8], destroy: bool) -> Result<()> {
        let splice = self.raw.unlink(key, destroy)?;
        if splice.meta == Color::Black {
            self.fix_after_delete(splice.child, splice.parent, splice.side);
        }
        Ok(())
    }
}

impl OrderedMap for RbTree {
    binary_reads!(Color);

    fn insert(&mut self, record: &[u8]) -> Result<()> {
        let x = self.raw.link(record, Color::Red)?;
        self.fix_after_insert(x);
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.remove(key, false)
    }

    fn delete_with_entry(&mut self, key: &[u8]) -> Result<()> {
        self.remove(key, true)
    }
}
