use std::cmp::Ordering;

use crate::OrderedMap;
use crate::error::{Error, Result};
use crate::impls::node::{Arena, BinaryCursor, Id, LEFT, RIGHT, Splice};
use crate::record::{Comparator, Destructor, check_len, check_record_size};

/// Where a key sits relative to the tree.
pub(crate) enum Probe {
    Found(Id),
    /// Absent; it would be attached as `parent`'s `side` child.
    Vacant { parent: Id, side: usize },
}

/// Unbalanced binary search tree over an arena of parent-linked nodes.
///
/// Every walk is a loop that remembers the parent it came from; nothing
/// recurses. The balanced backends wrap this type and repair their invariant
/// after `link` / `unlink`.
pub(crate) struct RawBst<M> {
    pub(crate) arena: Arena<M>,
    pub(crate) root: Id,
    len: usize,
    record_size: usize,
    cmp: Comparator,
    dtor: Option<Destructor>,
}

impl<M: Copy> RawBst<M> {
    pub(crate) fn new(
        record_size: usize,
        cmp: Comparator,
        dtor: Option<Destructor>,
    ) -> Result<Self> {
        check_record_size(record_size)?;
        Ok(Self {
            arena: Arena::new(record_size),
            root: Id::NIL,
            len: 0,
            record_size,
            cmp,
            dtor,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn record_size(&self) -> usize {
        self.record_size
    }

    pub(crate) fn find(&self, key: &[u8]) -> Probe {
        let mut parent = Id::NIL;
        let mut side = LEFT;
        let mut cur = self.root;
        while !cur.is_nil() {
            match (self.cmp)(key, self.arena.record(cur)) {
                Ordering::Less => side = LEFT,
                Ordering::Greater => side = RIGHT,
                Ordering::Equal => return Probe::Found(cur),
            }
            parent = cur;
            cur = self.arena.ch(cur, side);
        }
        Probe::Vacant { parent, side }
    }

    pub(crate) fn search(&self, key: &[u8]) -> Result<&[u8]> {
        check_len(self.record_size, key)?;
        match self.find(key) {
            Probe::Found(x) => Ok(self.arena.record(x)),
            Probe::Vacant { .. } => Err(Error::NotFound),
        }
    }

    pub(crate) fn edge(&self, dir: usize) -> Result<&[u8]> {
        if self.root.is_nil() {
            return Err(Error::Empty);
        }
        Ok(self.arena.record(self.arena.extreme(self.root, dir)))
    }

    /// Smallest node whose record is `>= key`, or `NIL`.
    pub(crate) fn lower_bound(&self, key: &[u8]) -> Id {
        let mut cur = self.root;
        let mut candidate = Id::NIL;
        while !cur.is_nil() {
            match (self.cmp)(key, self.arena.record(cur)) {
                Ordering::Less | Ordering::Equal => {
                    candidate = cur;
                    cur = self.arena.ch(cur, LEFT);
                }
                Ordering::Greater => cur = self.arena.ch(cur, RIGHT),
            }
        }
        candidate
    }

    /// Attaches a new leaf holding `record`. Fails without touching the tree
    /// if the key is already present or the arena cannot grow.
    pub(crate) fn link(&mut self, record: &[u8], meta: M) -> Result<Id> {
        check_len(self.record_size, record)?;
        let Probe::Vacant { parent, side } = self.find(record) else {
            return Err(Error::DuplicateKey);
        };
        self.arena.reserve()?;

        let x = self.arena.alloc(record, meta);
        self.arena.set_parent(x, parent);
        if parent.is_nil() {
            self.root = x;
        } else {
            self.arena.set_ch(parent, side, x);
        }
        self.len += 1;
        Ok(x)
    }

    /// Removes the record matching `key`.
    ///
    /// A node with two children takes over its in-order successor's record
    /// and the successor is spliced out instead, so the returned [`Splice`]
    /// always describes the node that physically left the tree.
    pub(crate) fn unlink(&mut self, key: &[u8], destroy: bool) -> Result<Splice<M>> {
        check_len(self.record_size, key)?;
        let Probe::Found(z) = self.find(key) else {
            return Err(Error::NotFound);
        };
        if destroy && let Some(dtor) = self.dtor.as_mut() {
            dtor(self.arena.record(z));
        }

        let right = self.arena.ch(z, RIGHT);
        let y = if self.arena.ch(z, LEFT).is_nil() || right.is_nil() {
            z
        } else {
            let succ = self.arena.extreme(right, LEFT);
            self.arena.copy_record(succ, z);
            succ
        };
        let splice = self.arena.splice(&mut self.root, y);
        self.len -= 1;
        Ok(splice)
    }

    #[inline]
    pub(crate) fn rotate(&mut self, x: Id, dir: usize) -> Id {
        self.arena.rotate(&mut self.root, x, dir)
    }

    pub(crate) fn cursor_at(&self, dir: usize) -> BinaryCursor<'_, M> {
        let start = if self.root.is_nil() {
            Id::NIL
        } else {
            self.arena.extreme(self.root, dir)
        };
        BinaryCursor::new(&self.arena, start)
    }

    pub(crate) fn cursor_lower_bound(&self, key: &[u8]) -> Result<BinaryCursor<'_, M>> {
        check_len(self.record_size, key)?;
        Ok(BinaryCursor::new(&self.arena, self.lower_bound(key)))
    }

    pub(crate) fn destroy_with_entries(mut self) {
        tracing::debug!(len = self.len, "destroying binary tree with entries");
        let Some(mut dtor) = self.dtor.take() else {
            return;
        };
        if self.root.is_nil() {
            return;
        }
        let mut x = self.arena.extreme(self.root, LEFT);
        while !x.is_nil() {
            dtor(self.arena.record(x));
            x = self.arena.step(x, RIGHT);
        }
    }
}

/// Implements the read-only half of [`OrderedMap`] for a wrapper with a
/// `raw: RawBst<_>` field.
macro_rules! binary_reads {
    ($meta:ty) => {
        type Cursor<'a> = $crate::impls::node::BinaryCursor<'a, $meta>;

        fn record_size(&self) -> usize {
            self.raw.record_size()
        }

        fn len(&self) -> usize {
            self.raw.len()
        }

        fn search(&self, key: &[u8]) -> $crate::error::Result<&[u8]> {
            self.raw.search(key)
        }

        fn min(&self) -> $crate::error::Result<&[u8]> {
            self.raw.edge($crate::impls::node::LEFT)
        }

        fn max(&self) -> $crate::error::Result<&[u8]> {
            self.raw.edge($crate::impls::node::RIGHT)
        }

        fn cursor_front(&self) -> Self::Cursor<'_> {
            self.raw.cursor_at($crate::impls::node::LEFT)
        }

        fn cursor_back(&self) -> Self::Cursor<'_> {
            self.raw.cursor_at($crate::impls::node::RIGHT)
        }

        fn cursor_lower_bound(&self, key: &[u8]) -> $crate::error::Result<Self::Cursor<'_>> {
            self.raw.cursor_lower_bound(key)
        }

        fn destroy_with_entries(self) {
            self.raw.destroy_with_entries();
        }
    };
}

pub(crate) use binary_reads;

/// Unbalanced binary search tree.
///
/// Height depends entirely on insertion order; sorted input degrades it into
/// a list. Kept as the baseline the balanced backends are measured against.
pub struct BstTree {
    raw: RawBst<()>,
}

impl BstTree {
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
        tracing::debug!(record_size, "created bst");
        Ok(Self { raw })
    }

    /// Number of nodes on the longest root-to-leaf path.
    ///
    /// Uses an explicit stack: a degenerate tree is as deep as it is long.
    pub fn height(&self) -> usize {
        if self.raw.root.is_nil() {
            return 0;
        }
        let arena = &self.raw.arena;
        let mut best = 0;
        let mut stack = vec![(self.raw.root, 1usize)];
        while let Some((x, depth)) = stack.pop() {
            best = best.max(depth);
            for dir in [LEFT, RIGHT] {
                let c = arena.ch(x, dir);
                if !c.is_nil() {
                    stack.push((c, depth + 1));
                }
            }
        }
        best
    }
}

impl OrderedMap for BstTree {
    binary_reads!(());

    fn insert(&mut self, record: &[u8]) -> Result<()> {
        self.raw.link(record, ()).map(|_| ())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.raw.unlink(key, false).map(|_| ())
    }

    fn delete_with_entry(&mut self, key: &[u8]) -> Result<()> {
        self.raw.unlink(key, true).map(|_| ())
    }
}
