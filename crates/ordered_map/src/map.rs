//! Backend selection behind a single handle type.

use std::cmp::Ordering;

use crate::OrderedMap;
use crate::cursor::RecordCursor;
use crate::error::Result;
use crate::impls::{
    AvlTree, BPlusTree, BinaryCursor, BstTree, Color, DEFAULT_FANOUT, LeafCursor, RbTree,
};
use crate::record::{Comparator, Destructor};

/// Which structure a [`SortedMap`] is built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Unbalanced binary search tree.
    Bst,
    /// Height-balanced binary tree.
    Avl,
    /// Red-black tree.
    #[default]
    RedBlack,
    /// B+Tree with the given fanout (at least [`crate::MIN_FANOUT`]).
    BPlusTree { fanout: usize },
}

impl Backend {
    /// B+Tree with [`DEFAULT_FANOUT`].
    pub fn bplus_tree() -> Self {
        Self::BPlusTree {
            fanout: DEFAULT_FANOUT,
        }
    }
}

/// An ordered map whose backend is picked at run time.
pub enum SortedMap {
    Bst(BstTree),
    Avl(AvlTree),
    RedBlack(RbTree),
    BPlusTree(BPlusTree),
}

macro_rules! dispatch {
    ($map:expr, $tree:ident => $body:expr) => {
        match $map {
            SortedMap::Bst($tree) => $body,
            SortedMap::Avl($tree) => $body,
            SortedMap::RedBlack($tree) => $body,
            SortedMap::BPlusTree($tree) => $body,
        }
    };
}

impl SortedMap {
    pub fn new(
        backend: Backend,
        record_size: usize,
        cmp: impl Fn(&[u8], &[u8]) -> Ordering + 'static,
    ) -> Result<Self> {
        Self::build(backend, record_size, Box::new(cmp), None)
    }

    pub fn with_destructor(
        backend: Backend,
        record_size: usize,
        cmp: impl Fn(&[u8], &[u8]) -> Ordering + 'static,
        dtor: impl FnMut(&[u8]) + 'static,
    ) -> Result<Self> {
        Self::build(backend, record_size, Box::new(cmp), Some(Box::new(dtor)))
    }

    pub(crate) fn build(
        backend: Backend,
        record_size: usize,
        cmp: Comparator,
        dtor: Option<Destructor>,
    ) -> Result<Self> {
        Ok(match backend {
            Backend::Bst => Self::Bst(BstTree::build(record_size, cmp, dtor)?),
            Backend::Avl => Self::Avl(AvlTree::build(record_size, cmp, dtor)?),
            Backend::RedBlack => Self::RedBlack(RbTree::build(record_size, cmp, dtor)?),
            Backend::BPlusTree { fanout } => {
                Self::BPlusTree(BPlusTree::build(fanout, record_size, cmp, dtor)?)
            }
        })
    }

    pub fn backend(&self) -> Backend {
        match self {
            Self::Bst(_) => Backend::Bst,
            Self::Avl(_) => Backend::Avl,
            Self::RedBlack(_) => Backend::RedBlack,
            Self::BPlusTree(tree) => Backend::BPlusTree {
                fanout: tree.fanout(),
            },
        }
    }
}

/// Cursor over whichever backend a [`SortedMap`] holds.
pub enum AnyCursor<'a> {
    Bst(BinaryCursor<'a, ()>),
    Avl(BinaryCursor<'a, i8>),
    RedBlack(BinaryCursor<'a, Color>),
    BPlusTree(LeafCursor<'a>),
}

macro_rules! dispatch_cursor {
    ($cursor:expr, $c:ident => $body:expr) => {
        match $cursor {
            AnyCursor::Bst($c) => $body,
            AnyCursor::Avl($c) => $body,
            AnyCursor::RedBlack($c) => $body,
            AnyCursor::BPlusTree($c) => $body,
        }
    };
}

impl<'a> RecordCursor<'a> for AnyCursor<'a> {
    fn current(&self) -> Option<&'a [u8]> {
        dispatch_cursor!(self, c => c.current())
    }

    fn move_next(&mut self) {
        dispatch_cursor!(self, c => c.move_next())
    }

    fn move_prev(&mut self) {
        dispatch_cursor!(self, c => c.move_prev())
    }
}

impl OrderedMap for SortedMap {
    type Cursor<'a> = AnyCursor<'a>;

    fn record_size(&self) -> usize {
        dispatch!(self, tree => tree.record_size())
    }

    fn len(&self) -> usize {
        dispatch!(self, tree => tree.len())
    }

    fn insert(&mut self, record: &[u8]) -> Result<()> {
        dispatch!(self, tree => tree.insert(record))
    }

    fn search(&self, key: &[u8]) -> Result<&[u8]> {
        dispatch!(self, tree => tree.search(key))
    }

    fn min(&self) -> Result<&[u8]> {
        dispatch!(self, tree => tree.min())
    }

    fn max(&self) -> Result<&[u8]> {
        dispatch!(self, tree => tree.max())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        dispatch!(self, tree => tree.delete(key))
    }

    fn delete_with_entry(&mut self, key: &[u8]) -> Result<()> {
        dispatch!(self, tree => tree.delete_with_entry(key))
    }

    fn to_array(&self) -> Result<Vec<u8>> {
        dispatch!(self, tree => tree.to_array())
    }

    fn cursor_front(&self) -> Self::Cursor<'_> {
        match self {
            Self::Bst(tree) => AnyCursor::Bst(tree.cursor_front()),
            Self::Avl(tree) => AnyCursor::Avl(tree.cursor_front()),
            Self::RedBlack(tree) => AnyCursor::RedBlack(tree.cursor_front()),
            Self::BPlusTree(tree) => AnyCursor::BPlusTree(tree.cursor_front()),
        }
    }

    fn cursor_back(&self) -> Self::Cursor<'_> {
        match self {
            Self::Bst(tree) => AnyCursor::Bst(tree.cursor_back()),
            Self::Avl(tree) => AnyCursor::Avl(tree.cursor_back()),
            Self::RedBlack(tree) => AnyCursor::RedBlack(tree.cursor_back()),
            Self::BPlusTree(tree) => AnyCursor::BPlusTree(tree.cursor_back()),
        }
    }

    fn cursor_lower_bound(&self, key: &[u8]) -> Result<Self::Cursor<'_>> {
        Ok(match self {
            Self::Bst(tree) => AnyCursor::Bst(tree.cursor_lower_bound(key)?),
            Self::Avl(tree) => AnyCursor::Avl(tree.cursor_lower_bound(key)?),
            Self::RedBlack(tree) => AnyCursor::RedBlack(tree.cursor_lower_bound(key)?),
            Self::BPlusTree(tree) => AnyCursor::BPlusTree(tree.cursor_lower_bound(key)?),
        })
    }

    fn destroy_with_entries(self) {
        dispatch!(self, tree => tree.destroy_with_entries())
    }
}
