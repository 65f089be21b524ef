//! Record model shared by every backend.
//!
//! A record is an opaque run of `record_size` bytes. Trees never interpret
//! the bytes themselves: ordering comes from an injected three-way comparator
//! and cleanup from an optional destructor.

use std::cmp::Ordering;

use crate::error::{Error, Result};

/// Three-way comparator over two records (or a record and a search key of the
/// same size).
pub type Comparator = Box<dyn Fn(&[u8], &[u8]) -> Ordering>;

/// Called once per record when it leaves the tree through
/// `delete_with_entry` or `destroy_with_entries`.
pub type Destructor = Box<dyn FnMut(&[u8])>;

pub(crate) fn check_record_size(record_size: usize) -> Result<()> {
    if record_size == 0 {
        return Err(Error::ZeroRecordSize);
    }
    Ok(())
}

#[inline]
pub(crate) fn check_len(record_size: usize, record: &[u8]) -> Result<()> {
    if record.len() != record_size {
        return Err(Error::RecordSize {
            expected: record_size,
            actual: record.len(),
        });
    }
    Ok(())
}

/// Lexicographic byte order over the whole record.
pub fn cmp_bytes(a: &[u8], b: &[u8]) -> Ordering {
    a.cmp(b)
}

/// Orders records by a little-endian `u32` in their first four bytes.
pub fn cmp_u32_le(a: &[u8], b: &[u8]) -> Ordering {
    read_u32_le(a).cmp(&read_u32_le(b))
}

/// Orders records by a little-endian `u64` in their first eight bytes.
pub fn cmp_u64_le(a: &[u8], b: &[u8]) -> Ordering {
    read_u64_le(a).cmp(&read_u64_le(b))
}

/// Orders records by a little-endian `i64` in their first eight bytes.
pub fn cmp_i64_le(a: &[u8], b: &[u8]) -> Ordering {
    (read_u64_le(a) as i64).cmp(&(read_u64_le(b) as i64))
}

#[inline]
fn read_u32_le(record: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    let n = record.len().min(4);
    buf[..n].copy_from_slice(&record[..n]);
    u32::from_le_bytes(buf)
}

#[inline]
fn read_u64_le(record: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    let n = record.len().min(8);
    buf[..n].copy_from_slice(&record[..n]);
    u64::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_comparators_ignore_payload() {
        let mut a = 7u64.to_le_bytes().to_vec();
        a.extend_from_slice(&[0xFF; 4]);
        let mut b = 7u64.to_le_bytes().to_vec();
        b.extend_from_slice(&[0x00; 4]);
        assert_eq!(cmp_u64_le(&a, &b), Ordering::Equal);
        assert_eq!(cmp_bytes(&a, &b), Ordering::Greater);

        assert_eq!(cmp_u32_le(&3u32.to_le_bytes(), &300u32.to_le_bytes()), Ordering::Less);
        assert_eq!(
            cmp_i64_le(&(-5i64).to_le_bytes(), &4i64.to_le_bytes()),
            Ordering::Less
        );
    }

    #[test]
    fn size_checks() {
        assert!(matches!(check_record_size(0), Err(Error::ZeroRecordSize)));
        assert!(check_record_size(1).is_ok());
        assert!(matches!(
            check_len(8, &[0; 4]),
            Err(Error::RecordSize {
                expected: 8,
                actual: 4
            })
        ));
    }
}
