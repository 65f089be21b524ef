use std::hint::black_box;
use std::time::{Duration, Instant};

use criterion::measurement::Measurement;
use criterion::{BenchmarkGroup, BenchmarkId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ordered_map::{Backend, OrderedMap, SortedMap, cmp_u64_le};

const SIZES: [usize; 4] = [1_000, 8_000, 64_000, 256_000];
const OPS_PER_ITER: usize = 200;
const SEARCH_HIT_RATE_PERCENT: u64 = 80;
const MIXED_INSERTS_PER_ITER: usize = OPS_PER_ITER / 10; // 10% inserts, 10% deletes, 80% reads.
const RECORD_SIZE: usize = 16;

const BACKENDS: [(&str, Backend); 6] = [
    ("bst", Backend::Bst),
    ("avl", Backend::Avl),
    ("rb", Backend::RedBlack),
    ("bplus_8", Backend::BPlusTree { fanout: 8 }),
    ("bplus_64", Backend::BPlusTree { fanout: 64 }),
    ("bplus_256", Backend::BPlusTree { fanout: 256 }),
];

#[derive(Clone)]
enum ReadOp {
    Search { key: u64 },
    LowerBound { key: u64 },
}

#[derive(Clone)]
enum UpdateOp {
    Insert { key: u64 },
    Delete { key: u64 },
}

#[derive(Clone)]
enum MixedOp {
    Read(ReadOp),
    Update(UpdateOp),
}

/// Each group sweeps every backend at every size, so points get a short
/// sampling window.
fn quick_sampling<T: Measurement>(group: &mut BenchmarkGroup<'_, T>) {
    group
        .sample_size(15)
        .warm_up_time(Duration::from_millis(100))
        .measurement_time(Duration::from_millis(200));
}

/// Key in the first eight bytes, the rest is payload.
fn record(key: u64) -> [u8; RECORD_SIZE] {
    let mut out = [0u8; RECORD_SIZE];
    out[..8].copy_from_slice(&key.to_le_bytes());
    out[8..].copy_from_slice(&(!key).to_le_bytes());
    out
}

fn build_map(backend: Backend, keys: &[u64]) -> SortedMap {
    let mut map = SortedMap::new(backend, RECORD_SIZE, cmp_u64_le).unwrap();
    for &k in keys {
        // Generated keys may collide; duplicates are simply rejected.
        let _ = black_box(map.insert(&record(k)));
    }
    map
}

fn bench_workload<T, O>(
    group: &mut BenchmarkGroup<'_, T>,
    workload_id: u64,
    generate: impl Fn(&[u64], usize, u64, u64, &mut StdRng) -> Vec<O>,
    run: impl Fn(&mut SortedMap, &[O]),
) where
    T: Measurement<Value = Duration>,
{
    for (label, backend) in BACKENDS {
        for &size in &SIZES {
            quick_sampling(group);
            let base_seed = seed_base(workload_id, size as u64);
            let keys = generate_initial_keys(size, base_seed);
            let mut map = build_map(backend, &keys);

            group.bench_function(BenchmarkId::new(label, size), |bencher| {
                bencher.iter_custom(|iters| {
                    let mut total = Duration::ZERO;
                    for iter in 0..iters {
                        let iter_seed = seed_for_iter(base_seed, iter);
                        let mut rng = StdRng::seed_from_u64(iter_seed);
                        let ops = generate(&keys, size, base_seed, iter, &mut rng);
                        let start = Instant::now();
                        run(&mut map, &ops);
                        black_box(map.len());
                        total += start.elapsed();
                    }
                    total
                })
            });
        }
    }
}

pub fn bench_all_read<T>(group: &mut BenchmarkGroup<'_, T>)
where
    T: Measurement<Value = Duration>,
{
    bench_workload(group, 1, generate_read_ops, |map, ops| {
        for op in ops {
            run_read(map, op);
        }
    });
}

pub fn bench_all_update<T>(group: &mut BenchmarkGroup<'_, T>)
where
    T: Measurement<Value = Duration>,
{
    bench_workload(group, 2, generate_update_ops, |map, ops| {
        for op in ops {
            run_update(map, op);
        }
    });
}

pub fn bench_all_mixed<T>(group: &mut BenchmarkGroup<'_, T>)
where
    T: Measurement<Value = Duration>,
{
    bench_workload(group, 3, generate_mixed_ops, |map, ops| {
        for op in ops {
            match op {
                MixedOp::Read(op) => run_read(map, op),
                MixedOp::Update(op) => run_update(map, op),
            }
        }
    });
}

pub fn bench_all_scan<T>(group: &mut BenchmarkGroup<'_, T>)
where
    T: Measurement<Value = Duration>,
{
    for (label, backend) in BACKENDS {
        for &size in &SIZES {
            quick_sampling(group);
            let keys = generate_initial_keys(size, seed_base(4, size as u64));
            let map = build_map(backend, &keys);
            group.bench_function(BenchmarkId::new(label, size), |bencher| {
                bencher.iter(|| {
                    let mut sum = 0u64;
                    for r in map.iter() {
                        sum = sum.wrapping_add(r[0] as u64);
                    }
                    black_box(sum)
                })
            });
        }
    }
}

fn generate_initial_keys(size: usize, base_seed: u64) -> Vec<u64> {
    (0..size)
        .map(|i| mix_seed(base_seed ^ (i as u64)))
        .collect()
}

fn read_op(keys: &[u64], rng: &mut StdRng) -> ReadOp {
    if rng.random::<u64>() & 1 == 0 {
        let hit = rng.random_range(0..100) < SEARCH_HIT_RATE_PERCENT;
        let key = if hit {
            keys[rng.random_range(0..keys.len())]
        } else {
            rng.random()
        };
        ReadOp::Search { key }
    } else {
        ReadOp::LowerBound { key: rng.random() }
    }
}

fn generate_read_ops(
    keys: &[u64],
    _size: usize,
    _base_seed: u64,
    _iter: u64,
    rng: &mut StdRng,
) -> Vec<ReadOp> {
    (0..OPS_PER_ITER).map(|_| read_op(keys, rng)).collect()
}

fn fresh_key(size: usize, base_seed: u64, iter: u64, per_iter: usize, index: usize) -> u64 {
    let id = (size as u64)
        .wrapping_add(iter.wrapping_mul(per_iter as u64))
        .wrapping_add(index as u64);
    mix_seed(base_seed ^ id)
}

fn generate_update_ops(
    _keys: &[u64],
    size: usize,
    base_seed: u64,
    iter: u64,
    rng: &mut StdRng,
) -> Vec<UpdateOp> {
    let inserts = OPS_PER_ITER / 2;
    let mut inserted = Vec::with_capacity(inserts);
    let mut ops = Vec::with_capacity(OPS_PER_ITER);
    for i in 0..OPS_PER_ITER {
        if i % 2 == 0 {
            let key = fresh_key(size, base_seed, iter, inserts, i / 2);
            inserted.push(key);
            ops.push(UpdateOp::Insert { key });
        } else {
            let idx = rng.random_range(0..inserted.len());
            let key = inserted.swap_remove(idx);
            ops.push(UpdateOp::Delete { key });
        }
    }
    debug_assert!(inserted.is_empty());
    ops
}

fn generate_mixed_ops(
    keys: &[u64],
    size: usize,
    base_seed: u64,
    iter: u64,
    rng: &mut StdRng,
) -> Vec<MixedOp> {
    let mut remaining_inserts = MIXED_INSERTS_PER_ITER;
    let mut remaining_deletes = MIXED_INSERTS_PER_ITER;
    let mut remaining_reads = OPS_PER_ITER - 2 * MIXED_INSERTS_PER_ITER;

    let mut live_inserted: Vec<u64> = Vec::with_capacity(MIXED_INSERTS_PER_ITER);
    let mut ops = Vec::with_capacity(OPS_PER_ITER);

    while ops.len() < OPS_PER_ITER {
        let remaining_slots = OPS_PER_ITER - ops.len();
        let do_read = if remaining_reads == 0 {
            false
        } else if remaining_inserts + remaining_deletes == 0 {
            true
        } else {
            rng.random_range(0..remaining_slots) < remaining_reads
        };

        if do_read {
            ops.push(MixedOp::Read(read_op(keys, rng)));
            remaining_reads -= 1;
            continue;
        }

        let can_insert = remaining_inserts > 0;
        let can_delete = remaining_deletes > 0 && !live_inserted.is_empty();
        let do_delete = if !can_delete {
            false
        } else if !can_insert {
            true
        } else {
            rng.random_range(0..(remaining_inserts + remaining_deletes)) < remaining_deletes
        };

        if do_delete {
            let idx = rng.random_range(0..live_inserted.len());
            let key = live_inserted.swap_remove(idx);
            ops.push(MixedOp::Update(UpdateOp::Delete { key }));
            remaining_deletes -= 1;
        } else {
            let index = MIXED_INSERTS_PER_ITER - remaining_inserts;
            let key = fresh_key(size, base_seed, iter, MIXED_INSERTS_PER_ITER, index);
            live_inserted.push(key);
            ops.push(MixedOp::Update(UpdateOp::Insert { key }));
            remaining_inserts -= 1;
        }
    }

    debug_assert!(live_inserted.is_empty());
    ops
}

fn run_read(map: &SortedMap, op: &ReadOp) {
    match *op {
        ReadOp::Search { key } => {
            black_box(map.search(&record(key)).ok());
        }
        ReadOp::LowerBound { key } => {
            black_box(map.lower_bound(&record(key)).ok());
        }
    }
}

fn run_update(map: &mut SortedMap, op: &UpdateOp) {
    match *op {
        UpdateOp::Insert { key } => {
            let _ = black_box(map.insert(&record(key)));
        }
        UpdateOp::Delete { key } => {
            let _ = black_box(map.delete(&record(key)));
        }
    }
}

fn seed_base(workload_id: u64, size: u64) -> u64 {
    mix_seed(0x0DDB_A11A_2026_0000_u64 ^ (workload_id << 48) ^ size)
}

fn seed_for_iter(base: u64, iter: u64) -> u64 {
    mix_seed(base ^ iter.wrapping_mul(SEED_MIX))
}

const SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

fn mix_seed(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
