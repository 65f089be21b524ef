use std::cmp::Ordering;

use crate::OrderedMap;
use crate::cursor::RecordCursor;
use crate::error::{Error, Result};
use crate::impls::node::{Id, check_room, id};
use crate::record::{Comparator, Destructor, check_len, check_record_size};

pub const DEFAULT_FANOUT: usize = 64;
pub const MIN_FANOUT: usize = 3;

/// Slots every node reserves beyond the fanout. The entry that overflows a
/// full node is placed in the slack before the node splits, so a split never
/// reallocates and both halves come out at least half full.
pub const SPLIT_SLACK: usize = 1;
const _: () = assert!(SPLIT_SLACK >= 1);

/// Bytes a leaf reserves for its records, or `None` when that overflows.
fn leaf_bytes(fanout: usize, record_size: usize) -> Option<usize> {
    fanout.checked_add(SPLIT_SLACK)?.checked_mul(record_size)
}

struct Leaf {
    records: Vec<u8>,
    prev: Id,
    next: Id,
}

struct Internal {
    /// `keys[i]` is the smallest record under `children[i + 1]`.
    keys: Vec<u8>,
    children: Vec<Id>,
}

enum Kind {
    Leaf(Leaf),
    Internal(Internal),
    Vacant { next_free: Id },
}

struct Node {
    parent: Id,
    kind: Kind,
}

impl Node {
    fn leaf(&self) -> &Leaf {
        match &self.kind {
            Kind::Leaf(leaf) => leaf,
            _ => unreachable!("expected a leaf"),
        }
    }

    fn leaf_mut(&mut self) -> &mut Leaf {
        match &mut self.kind {
            Kind::Leaf(leaf) => leaf,
            _ => unreachable!("expected a leaf"),
        }
    }

    fn internal(&self) -> &Internal {
        match &self.kind {
            Kind::Internal(node) => node,
            _ => unreachable!("expected an internal node"),
        }
    }

    fn internal_mut(&mut self) -> &mut Internal {
        match &mut self.kind {
            Kind::Internal(node) => node,
            _ => unreachable!("expected an internal node"),
        }
    }
}

#[inline(always)]
fn slot(buf: &[u8], rs: usize, i: usize) -> &[u8] {
    &buf[i * rs..(i + 1) * rs]
}

/// Shifts the tail right by one stride and writes `record` at slot `i`.
/// Never reallocates while the buffer has a spare stride of capacity.
fn insert_slot(buf: &mut Vec<u8>, rs: usize, i: usize, record: &[u8]) {
    let end = buf.len();
    debug_assert!(buf.capacity() >= end + rs);
    buf.resize(end + rs, 0);
    buf.copy_within(i * rs..end, (i + 1) * rs);
    buf[i * rs..(i + 1) * rs].copy_from_slice(record);
}

fn remove_slot(buf: &mut Vec<u8>, rs: usize, i: usize) {
    buf.drain(i * rs..(i + 1) * rs);
}

fn pair_mut(nodes: &mut [Node], a: Id, b: Id) -> (&mut Node, &mut Node) {
    debug_assert_ne!(a, b);
    let (a, b) = (a.idx(), b.idx());
    if a < b {
        let (lo, hi) = nodes.split_at_mut(b);
        (&mut lo[a], &mut hi[0])
    } else {
        let (lo, hi) = nodes.split_at_mut(a);
        (&mut hi[0], &mut lo[b])
    }
}

/// B+Tree with a fixed fanout and a doubly linked chain across its leaves.
///
/// All records live in the leaves; internal nodes hold copies of the first
/// record of each right-hand subtree as separators. Every node other than the
/// root keeps between `ceil(F / 2)` and `F` entries (leaves) or children
/// (internal nodes).
pub struct BPlusTree {
    nodes: Vec<Node>,
    free: Id,
    root: Id,
    head: Id,
    tail: Id,
    len: usize,
    fanout: usize,
    record_size: usize,
    // `(fanout + SPLIT_SLACK) * record_size`, checked once at construction.
    leaf_bytes: usize,
    cmp: Comparator,
    dtor: Option<Destructor>,
    // One record; shuttles separators between nodes without allocating.
    scratch: Vec<u8>,
}

impl BPlusTree {
    pub fn new(
        fanout: usize,
        record_size: usize,
        cmp: impl Fn(&[u8], &[u8]) -> Ordering + 'static,
    ) -> Result<Self> {
        Self::build(fanout, record_size, Box::new(cmp), None)
    }

    pub fn with_destructor(
        fanout: usize,
        record_size: usize,
        cmp: impl Fn(&[u8], &[u8]) -> Ordering + 'static,
        dtor: impl FnMut(&[u8]) + 'static,
    ) -> Result<Self> {
        Self::build(fanout, record_size, Box::new(cmp), Some(Box::new(dtor)))
    }

    pub(crate) fn build(
        fanout: usize,
        record_size: usize,
        cmp: Comparator,
        dtor: Option<Destructor>,
    ) -> Result<Self> {
        check_record_size(record_size)?;
        let leaf_bytes = match leaf_bytes(fanout, record_size) {
            Some(bytes) if fanout >= MIN_FANOUT => bytes,
            _ => {
                return Err(Error::InvalidFanout {
                    fanout,
                    min: MIN_FANOUT,
                });
            }
        };
        let mut scratch = Vec::new();
        scratch.try_reserve_exact(record_size)?;
        tracing::debug!(fanout, record_size, "created b+tree");
        Ok(Self {
            nodes: Vec::new(),
            free: Id::NIL,
            root: Id::NIL,
            head: Id::NIL,
            tail: Id::NIL,
            len: 0,
            fanout,
            record_size,
            leaf_bytes,
            cmp,
            dtor,
            scratch,
        })
    }

    pub fn fanout(&self) -> usize {
        self.fanout
    }

    /// Number of levels, leaves included. Zero for an empty tree.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut x = self.root;
        while !x.is_nil() {
            depth += 1;
            x = match &self.node(x).kind {
                Kind::Internal(node) => node.children[0],
                _ => Id::NIL,
            };
        }
        depth
    }

    #[inline(always)]
    fn min_fill(&self) -> usize {
        self.fanout.div_ceil(2)
    }

    #[inline(always)]
    fn node(&self, x: Id) -> &Node {
        &self.nodes[x.idx()]
    }

    #[inline(always)]
    fn node_mut(&mut self, x: Id) -> &mut Node {
        &mut self.nodes[x.idx()]
    }

    fn count(&self, x: Id) -> usize {
        match &self.node(x).kind {
            Kind::Leaf(leaf) => leaf.records.len() / self.record_size,
            Kind::Internal(node) => node.children.len(),
            Kind::Vacant { .. } => 0,
        }
    }

    fn child_index(&self, parent: Id, child: Id) -> usize {
        self.node(parent)
            .internal()
            .children
            .iter()
            .position(|&c| c == child)
            .expect("child is linked under its parent")
    }

    /// Binary search over a run of records: `Ok` on an exact match, otherwise
    /// the slot where `key` would go.
    fn search_slots(&self, buf: &[u8], key: &[u8]) -> std::result::Result<usize, usize> {
        let rs = self.record_size;
        let (mut lo, mut hi) = (0, buf.len() / rs);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match (self.cmp)(slot(buf, rs, mid), key) {
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
                Ordering::Equal => return Ok(mid),
            }
        }
        Err(lo)
    }

    fn find_leaf(&self, key: &[u8]) -> Id {
        debug_assert!(!self.root.is_nil());
        let mut x = self.root;
        while let Kind::Internal(node) = &self.node(x).kind {
            let i = match self.search_slots(&node.keys, key) {
                Ok(i) => i + 1,
                Err(i) => i,
            };
            x = node.children[i];
        }
        x
    }

    fn new_leaf(&self) -> Result<Leaf> {
        let mut records = Vec::new();
        records.try_reserve_exact(self.leaf_bytes)?;
        Ok(Leaf {
            records,
            prev: Id::NIL,
            next: Id::NIL,
        })
    }

    fn new_internal(&self) -> Result<Internal> {
        let mut keys = Vec::new();
        // One separator fewer than children. Neither size can overflow once
        // `leaf_bytes` was computed.
        keys.try_reserve_exact(self.leaf_bytes - self.record_size)?;
        let mut children = Vec::new();
        children.try_reserve_exact(self.fanout + SPLIT_SLACK)?;
        Ok(Internal { keys, children })
    }

    /// Stores `kind` in a vacant slot or at the end of the arena. The caller
    /// must have reserved arena capacity.
    fn place(&mut self, kind: Kind, parent: Id) -> Id {
        let node = Node { parent, kind };
        if !self.free.is_nil() {
            let x = self.free;
            let Kind::Vacant { next_free } = self.node(x).kind else {
                unreachable!("free list points at a live node");
            };
            self.free = next_free;
            *self.node_mut(x) = node;
            return x;
        }
        debug_assert!(self.nodes.len() < self.nodes.capacity());
        let x = id(self.nodes.len());
        self.nodes.push(node);
        x
    }

    fn release(&mut self, x: Id) {
        let free = self.free;
        *self.node_mut(x) = Node {
            parent: Id::NIL,
            kind: Kind::Vacant { next_free: free },
        };
        self.free = x;
    }

    fn load_scratch_from_leaf(&mut self, leaf: Id, i: usize) {
        let rs = self.record_size;
        let Self { nodes, scratch, .. } = self;
        scratch.clear();
        scratch.extend_from_slice(slot(&nodes[leaf.idx()].leaf().records, rs, i));
    }

    fn load_scratch_from_key(&mut self, x: Id, i: usize) {
        let rs = self.record_size;
        let Self { nodes, scratch, .. } = self;
        scratch.clear();
        scratch.extend_from_slice(slot(&nodes[x.idx()].internal().keys, rs, i));
    }

    fn store_scratch_as_key(&mut self, x: Id, i: usize) {
        let rs = self.record_size;
        let Self { nodes, scratch, .. } = self;
        nodes[x.idx()].internal_mut().keys[i * rs..(i + 1) * rs].copy_from_slice(scratch);
    }

    // ---- insert ----

    fn insert_record(&mut self, record: &[u8]) -> Result<()> {
        check_len(self.record_size, record)?;
        if self.root.is_nil() {
            if self.free.is_nil() {
                check_room(self.nodes.len(), 1)?;
            }
            self.nodes.try_reserve(1)?;
            let mut leaf = self.new_leaf()?;
            leaf.records.extend_from_slice(record);
            let x = self.place(Kind::Leaf(leaf), Id::NIL);
            self.root = x;
            self.head = x;
            self.tail = x;
            self.len = 1;
            return Ok(());
        }

        let leaf = self.find_leaf(record);
        let pos = match self.search_slots(&self.node(leaf).leaf().records, record) {
            Ok(_) => return Err(Error::DuplicateKey),
            Err(pos) => pos,
        };

        // Work out how far the split will climb and secure every buffer it
        // needs before the first byte moves.
        let mut levels = 0;
        let mut grows_root = false;
        let mut x = leaf;
        while self.count(x) == self.fanout {
            levels += 1;
            let p = self.node(x).parent;
            if p.is_nil() {
                grows_root = true;
                break;
            }
            x = p;
        }
        let mut spare = Vec::new();
        spare.try_reserve_exact(levels + usize::from(grows_root))?;
        for level in 0..levels {
            spare.push(if level == 0 {
                Kind::Leaf(self.new_leaf()?)
            } else {
                Kind::Internal(self.new_internal()?)
            });
        }
        if grows_root {
            spare.push(Kind::Internal(self.new_internal()?));
        }
        // Counts vacant slots as unavailable, so this may refuse early.
        check_room(self.nodes.len(), spare.len())?;
        self.nodes.try_reserve(spare.len())?;

        let rs = self.record_size;
        insert_slot(&mut self.node_mut(leaf).leaf_mut().records, rs, pos, record);
        self.len += 1;

        let mut spare = spare.into_iter();
        let mut x = leaf;
        while self.count(x) > self.fanout {
            let right = match spare.next().expect("split buffers reserved") {
                Kind::Leaf(buf) => self.split_leaf(x, buf),
                Kind::Internal(buf) => self.split_internal(x, buf),
                Kind::Vacant { .. } => unreachable!("vacant split buffer"),
            };
            self.link_split(x, right, &mut spare);
            x = self.node(x).parent;
        }
        Ok(())
    }

    /// Moves the upper half of overflowing leaf `x` into `right`, splices it
    /// into the leaf chain and leaves its first record in `scratch`.
    fn split_leaf(&mut self, x: Id, mut right: Leaf) -> Id {
        let rs = self.record_size;
        let leaf = self.node_mut(x).leaf_mut();
        let keep = (leaf.records.len() / rs).div_ceil(2);
        right.records.extend_from_slice(&leaf.records[keep * rs..]);
        leaf.records.truncate(keep * rs);
        let next = leaf.next;
        right.prev = x;
        right.next = next;

        let parent = self.node(x).parent;
        let r = self.place(Kind::Leaf(right), parent);
        self.node_mut(x).leaf_mut().next = r;
        if next.is_nil() {
            self.tail = r;
        } else {
            self.node_mut(next).leaf_mut().prev = r;
        }
        self.load_scratch_from_leaf(r, 0);
        tracing::trace!(?x, ?r, kept = keep, "split leaf");
        r
    }

    /// Moves the upper half of overflowing internal node `x` into `right` and
    /// leaves the promoted middle separator in `scratch`.
    fn split_internal(&mut self, x: Id, mut right: Internal) -> Id {
        let rs = self.record_size;
        let Self { nodes, scratch, .. } = self;
        let node = nodes[x.idx()].internal_mut();
        let keep = node.children.len().div_ceil(2);
        right.children.extend_from_slice(&node.children[keep..]);
        node.children.truncate(keep);
        right.keys.extend_from_slice(&node.keys[keep * rs..]);
        scratch.clear();
        scratch.extend_from_slice(slot(&node.keys, rs, keep - 1));
        node.keys.truncate((keep - 1) * rs);

        let parent = self.node(x).parent;
        let r = self.place(Kind::Internal(right), parent);
        for j in 0..self.count(r) {
            let c = self.node(r).internal().children[j];
            self.node_mut(c).parent = r;
        }
        tracing::trace!(?x, ?r, kept = keep, "split internal node");
        r
    }

    /// Hooks `right`, freshly split off `left`, into the parent using the
    /// separator in `scratch`, growing a new root if `left` was the root.
    fn link_split(&mut self, left: Id, right: Id, spare: &mut impl Iterator<Item = Kind>) {
        let rs = self.record_size;
        let parent = self.node(left).parent;
        if parent.is_nil() {
            let Some(Kind::Internal(mut root)) = spare.next() else {
                unreachable!("root buffer reserved");
            };
            root.keys.extend_from_slice(&self.scratch);
            root.children.push(left);
            root.children.push(right);
            let r = self.place(Kind::Internal(root), Id::NIL);
            self.node_mut(left).parent = r;
            self.node_mut(right).parent = r;
            self.root = r;
            tracing::trace!(root = ?r, depth = self.depth(), "grew new root");
            return;
        }

        let i = self.child_index(parent, left);
        let Self { nodes, scratch, .. } = self;
        let node = nodes[parent.idx()].internal_mut();
        insert_slot(&mut node.keys, rs, i, scratch);
        node.children.insert(i + 1, right);
    }

    // ---- delete ----

    fn remove(&mut self, key: &[u8], destroy: bool) -> Result<()> {
        check_len(self.record_size, key)?;
        if self.root.is_nil() {
            return Err(Error::NotFound);
        }
        let leaf = self.find_leaf(key);
        let pos = match self.search_slots(&self.node(leaf).leaf().records, key) {
            Ok(pos) => pos,
            Err(_) => return Err(Error::NotFound),
        };

        let rs = self.record_size;
        if destroy && let Some(dtor) = self.dtor.as_mut() {
            dtor(slot(&self.nodes[leaf.idx()].leaf().records, rs, pos));
        }
        remove_slot(&mut self.node_mut(leaf).leaf_mut().records, rs, pos);
        self.len -= 1;

        if leaf == self.root {
            if self.len == 0 {
                self.release(leaf);
                self.root = Id::NIL;
                self.head = Id::NIL;
                self.tail = Id::NIL;
            }
            return Ok(());
        }

        if pos == 0 {
            self.refresh_separator(leaf);
        }
        if self.count(leaf) < self.min_fill() {
            self.rebalance_leaf(leaf);
        }
        Ok(())
    }

    /// Rewrites the separator that bounds `leaf` from the left after its
    /// first record changed.
    fn refresh_separator(&mut self, leaf: Id) {
        let mut child = leaf;
        let mut parent = self.node(leaf).parent;
        while !parent.is_nil() {
            let i = self.child_index(parent, child);
            if i > 0 {
                self.load_scratch_from_leaf(leaf, 0);
                self.store_scratch_as_key(parent, i - 1);
                return;
            }
            child = parent;
            parent = self.node(parent).parent;
        }
    }

    fn rebalance_leaf(&mut self, x: Id) {
        let rs = self.record_size;
        let min = self.min_fill();
        let parent = self.node(x).parent;
        let i = self.child_index(parent, x);
        let siblings = &self.node(parent).internal().children;
        let left = if i > 0 { siblings[i - 1] } else { Id::NIL };
        let right = siblings.get(i + 1).copied().unwrap_or(Id::NIL);

        if !left.is_nil() && self.count(left) > min {
            let (l, n) = pair_mut(&mut self.nodes, left, x);
            let (l, n) = (l.leaf_mut(), n.leaf_mut());
            let last = l.records.len() - rs;
            insert_slot(&mut n.records, rs, 0, &l.records[last..]);
            l.records.truncate(last);
            self.load_scratch_from_leaf(x, 0);
            self.store_scratch_as_key(parent, i - 1);
            tracing::trace!(?x, from = ?left, "leaf borrowed from left sibling");
            return;
        }

        if !right.is_nil() && self.count(right) > min {
            let (n, r) = pair_mut(&mut self.nodes, x, right);
            let (n, r) = (n.leaf_mut(), r.leaf_mut());
            n.records.extend_from_slice(&r.records[..rs]);
            remove_slot(&mut r.records, rs, 0);
            self.load_scratch_from_leaf(right, 0);
            self.store_scratch_as_key(parent, i);
            tracing::trace!(?x, from = ?right, "leaf borrowed from right sibling");
            return;
        }

        if left.is_nil() {
            self.merge_leaves(x, right, parent, i);
        } else {
            self.merge_leaves(left, x, parent, i - 1);
        }
        self.rebalance_internal(parent);
    }

    /// Folds leaf `right` into `left` and drops separator `sep` of `parent`.
    fn merge_leaves(&mut self, left: Id, right: Id, parent: Id, sep: usize) {
        let rs = self.record_size;
        let (l, r) = pair_mut(&mut self.nodes, left, right);
        let (l, r) = (l.leaf_mut(), r.leaf_mut());
        l.records.extend_from_slice(&r.records);
        let next = r.next;
        l.next = next;
        if next.is_nil() {
            self.tail = left;
        } else {
            self.node_mut(next).leaf_mut().prev = left;
        }

        let node = self.node_mut(parent).internal_mut();
        remove_slot(&mut node.keys, rs, sep);
        node.children.remove(sep + 1);
        self.release(right);
        tracing::trace!(into = ?left, merged = ?right, "merged leaves");
    }

    /// Walks upward from `x`, which just lost a child, borrowing or merging
    /// until every node is back within bounds.
    fn rebalance_internal(&mut self, mut x: Id) {
        let min = self.min_fill();
        loop {
            if x == self.root {
                if self.count(x) == 1 {
                    let child = self.node(x).internal().children[0];
                    self.node_mut(child).parent = Id::NIL;
                    self.root = child;
                    self.release(x);
                    tracing::trace!(root = ?child, "collapsed root");
                }
                return;
            }
            if self.count(x) >= min {
                return;
            }

            let parent = self.node(x).parent;
            let i = self.child_index(parent, x);
            let siblings = &self.node(parent).internal().children;
            let left = if i > 0 { siblings[i - 1] } else { Id::NIL };
            let right = siblings.get(i + 1).copied().unwrap_or(Id::NIL);

            if !left.is_nil() && self.count(left) > min {
                self.borrow_from_left(left, x, parent, i - 1);
                return;
            }
            if !right.is_nil() && self.count(right) > min {
                self.borrow_from_right(x, right, parent, i);
                return;
            }
            if left.is_nil() {
                self.merge_internal(x, right, parent, i);
            } else {
                self.merge_internal(left, x, parent, i - 1);
            }
            x = parent;
        }
    }

    /// Rotates the last child of `left` through separator `sep` into `x`.
    fn borrow_from_left(&mut self, left: Id, x: Id, parent: Id, sep: usize) {
        let rs = self.record_size;
        self.load_scratch_from_key(parent, sep);
        let Self { nodes, scratch, .. } = self;
        let (l, n) = pair_mut(nodes, left, x);
        let (l, n) = (l.internal_mut(), n.internal_mut());
        let moved = l.children.pop().expect("sibling above minimum fill");
        n.children.insert(0, moved);
        insert_slot(&mut n.keys, rs, 0, scratch);
        let last = l.keys.len() - rs;
        scratch.clear();
        scratch.extend_from_slice(&l.keys[last..]);
        l.keys.truncate(last);
        self.store_scratch_as_key(parent, sep);
        self.node_mut(moved).parent = x;
        tracing::trace!(?x, from = ?left, "internal node borrowed from left sibling");
    }

    /// Rotates the first child of `right` through separator `sep` into `x`.
    fn borrow_from_right(&mut self, x: Id, right: Id, parent: Id, sep: usize) {
        let rs = self.record_size;
        self.load_scratch_from_key(parent, sep);
        let Self { nodes, scratch, .. } = self;
        let (n, r) = pair_mut(nodes, x, right);
        let (n, r) = (n.internal_mut(), r.internal_mut());
        let moved = r.children.remove(0);
        n.children.push(moved);
        n.keys.extend_from_slice(scratch);
        scratch.clear();
        scratch.extend_from_slice(&r.keys[..rs]);
        remove_slot(&mut r.keys, rs, 0);
        self.store_scratch_as_key(parent, sep);
        self.node_mut(moved).parent = x;
        tracing::trace!(?x, from = ?right, "internal node borrowed from right sibling");
    }

    /// Folds internal node `right` into `left`, pulling separator `sep` of
    /// `parent` down between them.
    fn merge_internal(&mut self, left: Id, right: Id, parent: Id, sep: usize) {
        let rs = self.record_size;
        self.load_scratch_from_key(parent, sep);
        let Self { nodes, scratch, .. } = self;
        let (l, r) = pair_mut(nodes, left, right);
        let (l, r) = (l.internal_mut(), r.internal_mut());
        let start = l.children.len();
        l.keys.extend_from_slice(scratch);
        l.keys.extend_from_slice(&r.keys);
        l.children.extend_from_slice(&r.children);
        for j in start..self.count(left) {
            let c = self.node(left).internal().children[j];
            self.node_mut(c).parent = left;
        }

        let node = self.node_mut(parent).internal_mut();
        remove_slot(&mut node.keys, rs, sep);
        node.children.remove(sep + 1);
        self.release(right);
        tracing::trace!(into = ?left, merged = ?right, "merged internal nodes");
    }

    fn destroy_subtree(nodes: &[Node], rs: usize, x: Id, dtor: &mut Destructor) {
        match &nodes[x.idx()].kind {
            Kind::Leaf(leaf) => {
                for record in leaf.records.chunks_exact(rs) {
                    dtor(record);
                }
            }
            Kind::Internal(node) => {
                for &c in &node.children {
                    Self::destroy_subtree(nodes, rs, c, dtor);
                }
            }
            Kind::Vacant { .. } => {}
        }
    }
}

/// Cursor stepping along the leaf chain.
pub struct LeafCursor<'a> {
    tree: &'a BPlusTree,
    leaf: Id,
    pos: usize,
}

impl<'a> RecordCursor<'a> for LeafCursor<'a> {
    fn current(&self) -> Option<&'a [u8]> {
        if self.leaf.is_nil() {
            return None;
        }
        let tree = self.tree;
        Some(slot(
            &tree.node(self.leaf).leaf().records,
            tree.record_size,
            self.pos,
        ))
    }

    fn move_next(&mut self) {
        if self.leaf.is_nil() {
            return;
        }
        self.pos += 1;
        if self.pos == self.tree.count(self.leaf) {
            self.leaf = self.tree.node(self.leaf).leaf().next;
            self.pos = 0;
        }
    }

    fn move_prev(&mut self) {
        if self.leaf.is_nil() {
            return;
        }
        if self.pos > 0 {
            self.pos -= 1;
            return;
        }
        self.leaf = self.tree.node(self.leaf).leaf().prev;
        if !self.leaf.is_nil() {
            self.pos = self.tree.count(self.leaf) - 1;
        }
    }
}

impl OrderedMap for BPlusTree {
    type Cursor<'a> = LeafCursor<'a>;

    fn record_size(&self) -> usize {
        self.record_size
    }

    fn len(&self) -> usize {
        self.len
    }

    fn insert(&mut self, record: &[u8]) -> Result<()> {
        self.insert_record(record)
    }

    fn search(&self, key: &[u8]) -> Result<&[u8]> {
        check_len(self.record_size, key)?;
        if self.root.is_nil() {
            return Err(Error::NotFound);
        }
        let records = &self.node(self.find_leaf(key)).leaf().records;
        match self.search_slots(records, key) {
            Ok(pos) => Ok(slot(records, self.record_size, pos)),
            Err(_) => Err(Error::NotFound),
        }
    }

    fn min(&self) -> Result<&[u8]> {
        if self.head.is_nil() {
            return Err(Error::Empty);
        }
        Ok(slot(&self.node(self.head).leaf().records, self.record_size, 0))
    }

    fn max(&self) -> Result<&[u8]> {
        if self.tail.is_nil() {
            return Err(Error::Empty);
        }
        let last = self.count(self.tail) - 1;
        Ok(slot(&self.node(self.tail).leaf().records, self.record_size, last))
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.remove(key, false)
    }

    fn delete_with_entry(&mut self, key: &[u8]) -> Result<()> {
        self.remove(key, true)
    }

    fn to_array(&self) -> Result<Vec<u8>> {
        if self.len == 0 {
            return Err(Error::Empty);
        }
        let mut out = Vec::new();
        out.try_reserve_exact(self.len * self.record_size)?;
        let mut x = self.head;
        while !x.is_nil() {
            let leaf = self.node(x).leaf();
            out.extend_from_slice(&leaf.records);
            x = leaf.next;
        }
        Ok(out)
    }

    fn cursor_front(&self) -> Self::Cursor<'_> {
        LeafCursor {
            tree: self,
            leaf: self.head,
            pos: 0,
        }
    }

    fn cursor_back(&self) -> Self::Cursor<'_> {
        let pos = if self.tail.is_nil() {
            0
        } else {
            self.count(self.tail) - 1
        };
        LeafCursor {
            tree: self,
            leaf: self.tail,
            pos,
        }
    }

    fn cursor_lower_bound(&self, key: &[u8]) -> Result<Self::Cursor<'_>> {
        check_len(self.record_size, key)?;
        let mut cursor = LeafCursor {
            tree: self,
            leaf: Id::NIL,
            pos: 0,
        };
        if self.root.is_nil() {
            return Ok(cursor);
        }
        let leaf = self.find_leaf(key);
        let pos = match self.search_slots(&self.node(leaf).leaf().records, key) {
            Ok(pos) | Err(pos) => pos,
        };
        if pos < self.count(leaf) {
            cursor.leaf = leaf;
            cursor.pos = pos;
        } else {
            cursor.leaf = self.node(leaf).leaf().next;
        }
        Ok(cursor)
    }

    fn destroy_with_entries(mut self) {
        tracing::debug!(len = self.len, "destroying b+tree with entries");
        if let Some(mut dtor) = self.dtor.take()
            && !self.root.is_nil()
        {
            Self::destroy_subtree(&self.nodes, self.record_size, self.root, &mut dtor);
        }
    }
}
