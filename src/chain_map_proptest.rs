#![cfg(test)]

// Property tests for ChainMap kept inside the crate so they can check the
// chain structure directly.

use crate::capabilities::StdCapabilities;
use crate::chain_map::{ChainMap, Insertion};
use crate::error::MapError;
use core::hash::{BuildHasher, Hasher};
use proptest::prelude::*;
use std::collections::{BTreeMap, HashMap};

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum Op {
    Insert(usize, i32),
    Remove(usize),
    Get(usize),
    Mutate(usize, i32),
    Iterate,
    Walk,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::vec("[a-z]{0,4}", 1..=24).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Insert(i, v)),
            3 => idx.clone().prop_map(Op::Remove),
            2 => idx.clone().prop_map(Op::Get),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| Op::Mutate(i, d)),
            1 => Just(Op::Iterate),
            1 => Just(Op::Walk),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Drives one scenario against std::collections::HashMap as the model.
// Invariants exercised after every step:
// - `insert` reports Inserted for new keys and Replaced for present ones.
// - `get`/`remove` return NotFound exactly when the model lacks the key.
// - `iter` and the cursor protocol each yield every live pair exactly once.
// - An insert that pushes the load factor past the maximum adds buckets;
//   any other insert leaves the geometry alone.
// - `len` equals both the model's size and the entries reachable through chains.
// - The bucket array never drops below one bucket.
fn run_scenario<S: BuildHasher>(
    mut sut: ChainMap<StdCapabilities<String, i32, S>>,
    pool: &[String],
    ops: Vec<Op>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<String, i32> = HashMap::new();

    for op in ops {
        match op {
            Op::Insert(i, v) => {
                let k = &pool[i];
                let already = model.contains_key(k);
                let before = sut.bucket_count();
                let outcome = sut.insert(k, &v).expect("insert succeeds");
                let expected = if already {
                    Insertion::Replaced
                } else {
                    Insertion::Inserted
                };
                prop_assert_eq!(outcome, expected);
                model.insert(k.clone(), v);
                if !already && model.len() as f64 / before as f64 > sut.config().max_load_factor {
                    prop_assert!(sut.bucket_count() > before, "grow stalled at {} buckets", before);
                } else {
                    prop_assert_eq!(sut.bucket_count(), before);
                }
            }
            Op::Remove(i) => {
                let k = &pool[i];
                let before = sut.bucket_count();
                match sut.remove(k) {
                    Ok(()) => {
                        prop_assert!(model.remove(k).is_some());
                    }
                    Err(MapError::NotFound) => {
                        prop_assert!(!model.contains_key(k));
                        prop_assert_eq!(sut.bucket_count(), before);
                    }
                    Err(e) => prop_assert!(false, "unexpected error: {}", e),
                }
            }
            Op::Get(i) => {
                let k = &pool[i];
                match (sut.get(k), model.get(k)) {
                    (Ok(v), Some(mv)) => prop_assert_eq!(v, mv),
                    (Err(MapError::NotFound), None) => {}
                    (got, want) => prop_assert!(false, "get mismatch: {:?} vs {:?}", got, want),
                }
            }
            Op::Mutate(i, d) => {
                let k = &pool[i];
                if let Some(mv) = model.get_mut(k) {
                    let v = sut.get_mut(k).expect("live key resolves");
                    *v = v.saturating_add(d);
                    *mv = mv.saturating_add(d);
                } else {
                    prop_assert!(matches!(sut.get_mut(k), Err(MapError::NotFound)));
                }
            }
            Op::Iterate => {
                let seen: BTreeMap<String, i32> =
                    sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
                let want: BTreeMap<String, i32> =
                    model.iter().map(|(k, v)| (k.clone(), *v)).collect();
                prop_assert_eq!(sut.iter().count(), model.len());
                prop_assert_eq!(seen, want);
            }
            Op::Walk => {
                let mut walked = Vec::new();
                match sut.iter_start() {
                    Ok(mut cur) => {
                        while let Ok((k, _)) = sut.iter_next(&mut cur) {
                            walked.push(k.clone());
                        }
                        prop_assert!(matches!(sut.iter_next(&mut cur), Err(MapError::EndOfMap)));
                    }
                    Err(MapError::EndOfMap) => prop_assert!(model.is_empty()),
                    Err(e) => prop_assert!(false, "unexpected error: {}", e),
                }
                let via_iter: Vec<String> = sut.iter().map(|(k, _)| k.clone()).collect();
                prop_assert_eq!(walked, via_iter);
            }
        }

        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert_eq!(sut.buckets.reachable(), model.len());
        prop_assert!(sut.bucket_count() >= 1);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        let sut = ChainMap::new(StdCapabilities::new()).unwrap();
        run_scenario(sut, &pool, ops)?;
    }
}

// Collision variant using a constant hasher to stress compare-driven chain scans.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        let sut = ChainMap::new(StdCapabilities::with_hasher(ConstBuildHasher)).unwrap();
        run_scenario(sut, &pool, ops)?;
    }
}

// Small tables with aggressive factors resize on nearly every operation.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_tight_factors(
        (pool, ops) in arb_scenario(),
        grow in 1.1f64..4.0,
        max in 0.5f64..3.0,
    ) {
        let mut sut: ChainMap<StdCapabilities<String, i32>> =
            ChainMap::new(StdCapabilities::new()).unwrap();
        sut.configure(max, max / 4.0, grow).unwrap();
        sut.resize(0.1).unwrap();
        prop_assert_eq!(sut.bucket_count(), 1);
        run_scenario(sut, &pool, ops)?;
    }
}
