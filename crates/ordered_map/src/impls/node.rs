//! Node layout shared by the binary backends.
//!
//! Nodes live in an arena and refer to each other by [`Id`]. Child links own
//! their subtree in the logical sense; the parent link is a plain index used
//! only to walk upward, so rotations can rewire it freely. Records are stored
//! inline in a flat byte slab, one `record_size` stride per slot.

use crate::cursor::RecordCursor;
use crate::error::{Error, Result};

#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Id(u32);

impl Id {
    pub(crate) const NIL: Self = Self(u32::MAX);

    #[inline(always)]
    pub(crate) fn is_nil(self) -> bool {
        self.0 == u32::MAX
    }

    #[inline(always)]
    pub(crate) fn idx(self) -> usize {
        self.0 as usize
    }
}

#[inline(always)]
pub(crate) fn id(v: usize) -> Id {
    debug_assert!(v < u32::MAX as usize);
    Id(v as u32)
}

/// Largest number of slots an arena may hold; `u32::MAX` itself is `NIL`.
pub(crate) const MAX_NODES: usize = u32::MAX as usize;

/// Fails when `extra` new slots on top of `len` would not all get an [`Id`].
pub(crate) fn check_room(len: usize, extra: usize) -> Result<()> {
    match len.checked_add(extra) {
        Some(total) if total <= MAX_NODES => Ok(()),
        _ => Err(Error::Capacity { max: MAX_NODES }),
    }
}

pub(crate) const LEFT: usize = 0;
pub(crate) const RIGHT: usize = 1;

#[derive(Clone, Copy, Debug)]
struct Node<M> {
    ch: [Id; 2],
    p: Id,
    meta: M,
}

/// Result of physically removing a node with at most one child.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Splice<M> {
    /// Former parent of the removed node (`NIL` if it was the root).
    pub(crate) parent: Id,
    /// Side of `parent` the removed node hung from.
    pub(crate) side: usize,
    /// The child that took its place, possibly `NIL`.
    pub(crate) child: Id,
    /// Balancing metadata the removed node carried.
    pub(crate) meta: M,
}

pub(crate) struct Arena<M> {
    nodes: Vec<Node<M>>,
    records: Vec<u8>,
    record_size: usize,
    // Vacant slots, threaded through `Node::p`.
    free: Id,
}

impl<M: Copy> Arena<M> {
    pub(crate) fn new(record_size: usize) -> Self {
        Self {
            nodes: Vec::new(),
            records: Vec::new(),
            record_size,
            free: Id::NIL,
        }
    }

    /// Secures room for one more node so the following `alloc` cannot fail.
    pub(crate) fn reserve(&mut self) -> Result<()> {
        if self.free.is_nil() {
            check_room(self.nodes.len(), 1)?;
            self.nodes.try_reserve(1)?;
            self.records.try_reserve(self.record_size)?;
        }
        Ok(())
    }

    pub(crate) fn alloc(&mut self, record: &[u8], meta: M) -> Id {
        debug_assert_eq!(record.len(), self.record_size);
        let node = Node {
            ch: [Id::NIL, Id::NIL],
            p: Id::NIL,
            meta,
        };
        if !self.free.is_nil() {
            let x = self.free;
            self.free = self.nodes[x.idx()].p;
            self.nodes[x.idx()] = node;
            self.record_mut(x).copy_from_slice(record);
            return x;
        }
        let x = id(self.nodes.len());
        self.nodes.push(node);
        self.records.extend_from_slice(record);
        x
    }

    #[cfg(test)]
    pub(crate) fn slots(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn release(&mut self, x: Id) {
        let node = &mut self.nodes[x.idx()];
        node.ch = [Id::NIL, Id::NIL];
        node.p = self.free;
        self.free = x;
    }

    #[inline(always)]
    pub(crate) fn record(&self, x: Id) -> &[u8] {
        let start = x.idx() * self.record_size;
        &self.records[start..start + self.record_size]
    }

    #[inline(always)]
    fn record_mut(&mut self, x: Id) -> &mut [u8] {
        let start = x.idx() * self.record_size;
        &mut self.records[start..start + self.record_size]
    }

    /// Overwrites the record stored at `to` with the one stored at `from`.
    pub(crate) fn copy_record(&mut self, from: Id, to: Id) {
        let src = from.idx() * self.record_size;
        self.records
            .copy_within(src..src + self.record_size, to.idx() * self.record_size);
    }

    #[inline(always)]
    pub(crate) fn ch(&self, x: Id, dir: usize) -> Id {
        self.nodes[x.idx()].ch[dir]
    }

    #[inline(always)]
    pub(crate) fn set_ch(&mut self, x: Id, dir: usize, c: Id) {
        self.nodes[x.idx()].ch[dir] = c;
    }

    #[inline(always)]
    pub(crate) fn parent(&self, x: Id) -> Id {
        self.nodes[x.idx()].p
    }

    #[inline(always)]
    pub(crate) fn set_parent(&mut self, x: Id, p: Id) {
        self.nodes[x.idx()].p = p;
    }

    #[inline(always)]
    pub(crate) fn meta(&self, x: Id) -> M {
        self.nodes[x.idx()].meta
    }

    #[inline(always)]
    pub(crate) fn set_meta(&mut self, x: Id, meta: M) {
        self.nodes[x.idx()].meta = meta;
    }

    /// Which side of its (non-nil) parent `x` hangs from.
    #[inline(always)]
    pub(crate) fn side(&self, x: Id) -> usize {
        let p = self.parent(x);
        debug_assert!(!p.is_nil());
        if self.ch(p, LEFT) == x { LEFT } else { RIGHT }
    }

    /// Last node reached by following `dir` links from `x`.
    pub(crate) fn extreme(&self, mut x: Id, dir: usize) -> Id {
        debug_assert!(!x.is_nil());
        loop {
            let c = self.ch(x, dir);
            if c.is_nil() {
                return x;
            }
            x = c;
        }
    }

    /// In-order neighbour of `x`: the successor for `RIGHT`, the predecessor
    /// for `LEFT`. Returns `NIL` past either edge.
    pub(crate) fn step(&self, x: Id, dir: usize) -> Id {
        let c = self.ch(x, dir);
        if !c.is_nil() {
            return self.extreme(c, dir ^ 1);
        }
        let mut x = x;
        let mut p = self.parent(x);
        while !p.is_nil() && self.ch(p, dir) == x {
            x = p;
            p = self.parent(p);
        }
        p
    }

    pub(crate) fn replace_child(&mut self, root: &mut Id, p: Id, old: Id, new: Id) {
        if p.is_nil() {
            *root = new;
        } else if self.ch(p, LEFT) == old {
            self.set_ch(p, LEFT, new);
        } else {
            debug_assert_eq!(self.ch(p, RIGHT), old);
            self.set_ch(p, RIGHT, new);
        }
    }

    /// Rotates `x` toward `dir`: its child on the opposite side takes its
    /// place and `x` becomes that child's `dir` child. Returns the new
    /// subtree root.
    pub(crate) fn rotate(&mut self, root: &mut Id, x: Id, dir: usize) -> Id {
        let y = self.ch(x, dir ^ 1);
        debug_assert!(!y.is_nil());
        let inner = self.ch(y, dir);
        self.set_ch(x, dir ^ 1, inner);
        if !inner.is_nil() {
            self.set_parent(inner, x);
        }
        let p = self.parent(x);
        self.set_parent(y, p);
        self.replace_child(root, p, x, y);
        self.set_ch(y, dir, x);
        self.set_parent(x, y);
        y
    }

    /// Removes `y`, which must have at most one child, lifting that child
    /// into its place.
    pub(crate) fn splice(&mut self, root: &mut Id, y: Id) -> Splice<M> {
        let left = self.ch(y, LEFT);
        let child = if left.is_nil() { self.ch(y, RIGHT) } else { left };
        debug_assert!(left.is_nil() || self.ch(y, RIGHT).is_nil());

        let parent = self.parent(y);
        let side = if parent.is_nil() { LEFT } else { self.side(y) };
        self.replace_child(root, parent, y, child);
        if !child.is_nil() {
            self.set_parent(child, parent);
        }

        let meta = self.meta(y);
        self.release(y);
        Splice {
            parent,
            side,
            child,
            meta,
        }
    }
}

/// Cursor over any of the binary backends, stepping through parent links.
pub struct BinaryCursor<'a, M> {
    arena: &'a Arena<M>,
    cur: Id,
}

impl<'a, M: Copy> BinaryCursor<'a, M> {
    pub(crate) fn new(arena: &'a Arena<M>, cur: Id) -> Self {
        Self { arena, cur }
    }
}

impl<'a, M: Copy> RecordCursor<'a> for BinaryCursor<'a, M> {
    fn current(&self) -> Option<&'a [u8]> {
        if self.cur.is_nil() {
            None
        } else {
            Some(self.arena.record(self.cur))
        }
    }

    fn move_next(&mut self) {
        if !self.cur.is_nil() {
            self.cur = self.arena.step(self.cur, RIGHT);
        }
    }

    fn move_prev(&mut self) {
        if !self.cur.is_nil() {
            self.cur = self.arena.step(self.cur, LEFT);
        }
    }
}
