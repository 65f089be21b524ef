use std::cmp::Ordering;

use crate::OrderedMap;
use crate::error::Result;
use crate::impls::bst::{RawBst, binary_reads};
use crate::impls::node::{Id, LEFT, RIGHT};
use crate::record::{Comparator, Destructor};

/// Height-balanced binary search tree.
///
/// Each node stores `height(right) - height(left)` in `{-1, 0, 1}`. Insert and
/// delete walk upward from the modified spot through parent links and rotate
/// where a factor reaches `±2`.
pub struct AvlTree {
    raw: RawBst<i8>,
}

/// `+1` for the right side, `-1` for the left.
#[inline(always)]
fn sign(dir: usize) -> i8 {
    if dir == RIGHT { 1 } else { -1 }
}

impl AvlTree {
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
        tracing::debug!(record_size, "created avl tree");
        Ok(Self { raw })
    }

    /// Height of the tree, counted in nodes.
    ///
    /// Recomputed by a full recursive walk on every call instead of being
    /// maintained per node; the recursion is bounded by `1.44 * log2(n)`.
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

    #[inline(always)]
    fn bf(&self, x: Id) -> i8 {
        self.raw.arena.meta(x)
    }

    #[inline(always)]
    fn set_bf(&mut self, x: Id, bf: i8) {
        self.raw.arena.set_meta(x, bf);
    }

    /// Restores balance at `x`, whose factor is `±2`.
    ///
    /// Returns the new subtree root and whether the subtree got shorter than
    /// it was before `x` went out of balance by one extra level. Only a single
    /// rotation over a perfectly balanced heavy child (possible after delete)
    /// keeps the height.
    fn rebalance(&mut self, x: Id) -> (Id, bool) {
        let bf = self.bf(x);
        debug_assert!(bf == 2 || bf == -2);
        let heavy = if bf > 0 { RIGHT } else { LEFT };
        let s = sign(heavy);
        let c = self.raw.arena.ch(x, heavy);
        let cbf = self.bf(c);

        if cbf == -s {
            // Zig-zag: lift the inner grandchild over both.
            let g = self.raw.arena.ch(c, heavy ^ 1);
            let gbf = self.bf(g);
            self.raw.rotate(c, heavy);
            let top = self.raw.rotate(x, heavy ^ 1);
            let (xbf, cbf) = if gbf == s {
                (-s, 0)
            } else if gbf == -s {
                (0, s)
            } else {
                (0, 0)
            };
            self.set_bf(x, xbf);
            self.set_bf(c, cbf);
            self.set_bf(g, 0);
            return (top, true);
        }

        let top = self.raw.rotate(x, heavy ^ 1);
        if cbf == 0 {
            self.set_bf(x, s);
            self.set_bf(c, -s);
            (top, false)
        } else {
            self.set_bf(x, 0);
            self.set_bf(c, 0);
            (top, true)
        }
    }

    /// The subtree rooted at `child` grew by one level; propagate upward.
    fn fix_after_insert(&mut self, mut child: Id) {
        let mut x = self.raw.arena.parent(child);
        while !x.is_nil() {
            let side = self.raw.arena.side(child);
            let bf = self.bf(x) + sign(side);
            self.set_bf(x, bf);
            match bf {
                0 => return,
                2 | -2 => {
                    self.rebalance(x);
                    return;
                }
                _ => {
                    child = x;
                    x = self.raw.arena.parent(x);
                }
            }
        }
    }

    /// The `side` subtree of `x` lost one level; propagate upward.
    fn fix_after_delete(&mut self, mut x: Id, mut side: usize) {
        while !x.is_nil() {
            let bf = self.bf(x) - sign(side);
            self.set_bf(x, bf);
            let top = match bf {
                1 | -1 => return,
                0 => x,
                _ => {
                    let (top, shorter) = self.rebalance(x);
                    if !shorter {
                        return;
                    }
                    top
                }
            };
            x = self.raw.arena.parent(top);
            if !x.is_nil() {
                side = self.raw.arena.side(top);
            }
        }
    }

    fn remove(&mut self, key: &[u8], destroy: bool) -> Result<()> {
        let splice = self.raw.unlink(key, destroy)?;
        self.fix_after_delete(splice.parent, splice.side);
        Ok(())
    }
}

impl OrderedMap for AvlTree {
    binary_reads!(i8);

    fn insert(&mut self, record: &[u8]) -> Result<()> {
        let x = self.raw.link(record, 0)?;
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
