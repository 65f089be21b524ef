use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use ordered_map::{Backend, Error, OrderedMap, RecordCursor, SortedMap, cmp_u32_le};
use proptest::prelude::*;

const RECORD_SIZE: usize = 8;

#[derive(Clone, Debug)]
enum Op {
    Insert(u32, u32),
    Delete(u32),
    DeleteWithEntry(u32),
    Search(u32),
    LowerBound(u32),
}

/// Four-byte key followed by a four-byte payload.
fn record(key: u32, payload: u32) -> [u8; RECORD_SIZE] {
    let mut out = [0u8; RECORD_SIZE];
    out[..4].copy_from_slice(&key.to_le_bytes());
    out[4..].copy_from_slice(&payload.to_le_bytes());
    out
}

fn split(record: &[u8]) -> (u32, u32) {
    (
        u32::from_le_bytes(record[..4].try_into().unwrap()),
        u32::from_le_bytes(record[4..].try_into().unwrap()),
    )
}

fn backend_strategy() -> impl Strategy<Value = Backend> {
    prop_oneof![
        Just(Backend::Bst),
        Just(Backend::Avl),
        Just(Backend::RedBlack),
        (3usize..=9).prop_map(|fanout| Backend::BPlusTree { fanout }),
    ]
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    // A narrow key range keeps duplicate inserts and hits on delete frequent.
    let key = 0u32..300;
    let op = prop_oneof![
        45 => (key.clone(), any::<u32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        20 => key.clone().prop_map(Op::Delete),
        10 => key.clone().prop_map(Op::DeleteWithEntry),
        15 => key.clone().prop_map(Op::Search),
        10 => key.clone().prop_map(Op::LowerBound),
    ];
    prop::collection::vec(op, 0..=1500)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(backend in backend_strategy(), ops in ops_strategy()) {
        let dropped = Rc::new(Cell::new(0usize));
        let seen = dropped.clone();
        let mut t = SortedMap::with_destructor(backend, RECORD_SIZE, cmp_u32_le, move |_| {
            seen.set(seen.get() + 1)
        })
        .unwrap();
        let mut m: BTreeMap<u32, u32> = BTreeMap::new();
        let mut expected_drops = 0;

        for op in ops {
            match op {
                Op::Insert(k, v) => {
                    let got = t.insert(&record(k, v));
                    if m.contains_key(&k) {
                        prop_assert!(matches!(got, Err(Error::DuplicateKey)));
                    } else {
                        prop_assert!(got.is_ok());
                        m.insert(k, v);
                    }
                }
                Op::Delete(k) => {
                    prop_assert_eq!(t.delete(&record(k, 0)).is_ok(), m.remove(&k).is_some());
                }
                Op::DeleteWithEntry(k) => {
                    let removed = m.remove(&k).is_some();
                    prop_assert_eq!(t.delete_with_entry(&record(k, 0)).is_ok(), removed);
                    expected_drops += usize::from(removed);
                }
                Op::Search(k) => {
                    let got = t.search(&record(k, u32::MAX)).ok().map(split);
                    prop_assert_eq!(got, m.get(&k).map(|&v| (k, v)));
                }
                Op::LowerBound(k) => {
                    let got = t.lower_bound(&record(k, 0)).ok().map(split);
                    prop_assert_eq!(got, m.range(k..).next().map(|(&k, &v)| (k, v)));
                }
            }
            prop_assert_eq!(t.len(), m.len());
            prop_assert_eq!(dropped.get(), expected_drops);
        }

        let got: Vec<(u32, u32)> = t.iter().map(split).collect();
        let expected: Vec<(u32, u32)> = m.iter().map(|(&k, &v)| (k, v)).collect();
        prop_assert_eq!(&got, &expected);

        let mut reversed = Vec::new();
        let mut cursor = t.cursor_back();
        while let Some(r) = cursor.current() {
            reversed.push(split(r));
            cursor.move_prev();
        }
        reversed.reverse();
        prop_assert_eq!(&reversed, &expected);

        match t.to_array() {
            Ok(flat) => {
                let flat: Vec<(u32, u32)> = flat.chunks_exact(RECORD_SIZE).map(split).collect();
                prop_assert_eq!(&flat, &expected);
            }
            Err(Error::Empty) => {
                prop_assert!(expected.is_empty());
            }
            Err(e) => {
                prop_assert!(false, "unexpected error: {}", e);
            }
        }

        t.destroy_with_entries();
        prop_assert_eq!(dropped.get(), expected_drops + m.len());
    }

    #[test]
    fn prop_insert_delete_all(
        backend in backend_strategy(),
        keys in prop::collection::hash_set(any::<u32>(), 0..400),
    ) {
        let mut t = SortedMap::new(backend, RECORD_SIZE, cmp_u32_le).unwrap();
        let keys: Vec<u32> = keys.into_iter().collect();
        for &k in &keys {
            prop_assert!(t.insert(&record(k, k)).is_ok());
        }
        prop_assert_eq!(t.len(), keys.len());
        if let Some(&lo) = keys.iter().min() {
            prop_assert_eq!(split(t.min().unwrap()).0, lo);
            prop_assert_eq!(split(t.max().unwrap()).0, *keys.iter().max().unwrap());
        }
        for &k in keys.iter().rev() {
            prop_assert!(t.delete(&record(k, 0)).is_ok());
        }
        prop_assert!(t.is_empty());
        prop_assert!(matches!(t.min(), Err(Error::Empty)));
        prop_assert!(matches!(t.max(), Err(Error::Empty)));
    }
}
