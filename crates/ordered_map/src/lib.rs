pub mod cursor;
pub mod error;
pub mod impls;
pub mod map;
pub mod record;

use crate::cursor::Iter;

/// Ordered map over fixed-size byte records.
///
/// - Keys are unique under the handle's comparator; a record is its own key.
/// - Every call checks the record length first and fails without mutating.
/// - `lower_bound` returns the smallest record `>= key`.
/// - Cursors borrow the handle, so no mutation can happen while one is live.
pub trait OrderedMap {
    type Cursor<'a>: RecordCursor<'a>
    where
        Self: 'a;

    fn record_size(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies `record` into the tree. Fails with [`Error::DuplicateKey`] if an
    /// equal record is already stored.
    fn insert(&mut self, record: &[u8]) -> Result<()>;

    fn search(&self, key: &[u8]) -> Result<&[u8]>;

    fn contains_key(&self, key: &[u8]) -> bool {
        self.search(key).is_ok()
    }

    fn min(&self) -> Result<&[u8]>;

    fn max(&self) -> Result<&[u8]>;

    fn lower_bound(&self, key: &[u8]) -> Result<&[u8]> {
        self.cursor_lower_bound(key)?
            .current()
            .ok_or(Error::NotFound)
    }

    /// Removes the matching record without calling the destructor.
    fn delete(&mut self, key: &[u8]) -> Result<()>;

    /// Removes the matching record, handing it to the destructor first.
    fn delete_with_entry(&mut self, key: &[u8]) -> Result<()>;

    /// All records in ascending order, concatenated.
    fn to_array(&self) -> Result<Vec<u8>> {
        if self.is_empty() {
            return Err(Error::Empty);
        }
        let mut out = Vec::new();
        out.try_reserve_exact(self.len() * self.record_size())?;
        for record in self.iter() {
            out.extend_from_slice(record);
        }
        Ok(out)
    }

    fn cursor_front(&self) -> Self::Cursor<'_>;

    fn cursor_back(&self) -> Self::Cursor<'_>;

    /// Cursor on the smallest record `>= key`, at the end if there is none.
    fn cursor_lower_bound(&self, key: &[u8]) -> Result<Self::Cursor<'_>>;

    fn iter(&self) -> Iter<'_, Self::Cursor<'_>> {
        Iter::new(self.cursor_front(), self.cursor_back(), self.len())
    }

    /// Tears the tree down, passing every remaining record to the destructor.
    /// Plain `drop` frees the nodes without calling it.
    fn destroy_with_entries(self)
    where
        Self: Sized;
}

pub use cursor::RecordCursor;
pub use error::{Error, Result};
pub use impls::{
    AvlTree, BPlusTree, BinaryCursor, BstTree, Color, DEFAULT_FANOUT, LeafCursor, MIN_FANOUT,
    RbTree, SPLIT_SLACK,
};
pub use map::{AnyCursor, Backend, SortedMap};
pub use record::{Comparator, Destructor, cmp_bytes, cmp_i64_le, cmp_u32_le, cmp_u64_le};
