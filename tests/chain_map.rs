use chain_map::{
    AllocError, Capabilities, ChainMap, Insertion, MapConfig, MapError, StdCapabilities,
};
use std::collections::BTreeSet;

type IntMap = ChainMap<StdCapabilities<i32, i32>>;

fn int_map() -> IntMap {
    ChainMap::new(StdCapabilities::new()).unwrap()
}

/// Integer keys with a caller-chosen hash and compare result.
struct Rigged {
    hash: fn(&i32) -> u64,
    compare: fn(&i32, &i32) -> i32,
}

impl Capabilities for Rigged {
    type Key = i32;
    type Value = i32;

    fn clone_key(&self, key: &i32) -> Result<i32, AllocError> {
        Ok(*key)
    }
    fn clone_value(&self, value: &i32) -> Result<i32, AllocError> {
        Ok(*value)
    }
    fn hash(&self, key: &i32) -> u64 {
        (self.hash)(key)
    }
    fn stringify(&self, key: &i32, value: &i32) -> Option<String> {
        Some(format!("({}, {})", key, value))
    }
    fn compare(&self, a: &i32, b: &i32) -> i32 {
        (self.compare)(a, b)
    }
    fn free_key(&self, _key: i32) {}
    fn free_value(&self, _value: i32) {}
}

fn ordered(a: &i32, b: &i32) -> i32 {
    a.cmp(b) as i32
}

/// Scenario: 1000 keys in, the middle 500 out; iteration sees exactly the
/// survivors with their original values.
#[test]
fn insert_thousand_remove_middle_half() {
    let mut m = int_map();
    for k in 0..1000 {
        assert_eq!(m.insert(&k, &(k * k)).unwrap(), Insertion::Inserted);
    }
    assert_eq!(m.len(), 1000);
    for k in 0..1000 {
        assert_eq!(m.get(&k).unwrap(), &(k * k));
    }

    for k in 250..750 {
        m.remove(&k).unwrap();
    }
    assert_eq!(m.len(), 500);

    let mut seen = BTreeSet::new();
    let mut cur = m.iter_start().unwrap();
    while let Ok((k, v)) = m.iter_next(&mut cur) {
        assert_eq!(*v, k * k);
        assert!(seen.insert(*k), "key {} yielded twice", k);
    }
    let expected: BTreeSet<i32> = (0..250).chain(750..1000).collect();
    assert_eq!(seen, expected);
}

/// Scenario: a constant hash puts every key in one chain, and each key is
/// still found. Five entries in ten buckets never triggers a resize.
#[test]
fn constant_hash_single_chain() {
    let mut m = ChainMap::new(Rigged {
        hash: |_| 0,
        compare: ordered,
    })
    .unwrap();
    for k in 0..5 {
        m.insert(&k, &(k + 100)).unwrap();
    }
    assert_eq!(m.len(), 5);
    assert_eq!(m.bucket_count(), 10);
    for k in 0..5 {
        assert_eq!(m.get(&k).unwrap(), &(k + 100));
    }
    let text = m.render().unwrap();
    assert!(text.contains("Buckets 0: (4, 104)(3, 103)(2, 102)(1, 101)(0, 100)\n"));
}

/// Scenario: compare answering 42 fails the lookup with `Unknown`, not a
/// false hit or a false miss.
#[test]
fn broken_compare_fails_lookup_with_unknown() {
    let mut m = ChainMap::new(Rigged {
        hash: |_| 0,
        compare: |_, _| 42,
    })
    .unwrap();
    m.insert(&1, &1).unwrap();
    assert!(matches!(m.get(&1), Err(MapError::Unknown(_))));
    assert!(matches!(m.get(&2), Err(MapError::Unknown(_))));
}

/// Scenario: `min >= max` is rejected and the previous factors stay.
#[test]
fn configure_rejects_inverted_factors() {
    let mut m = int_map();
    let before = *m.config();
    assert!(matches!(
        m.configure(1.0, 1.0, 2.0),
        Err(MapError::InvalidArgument(_))
    ));
    assert!(matches!(
        m.configure(1.0, 3.0, 2.0),
        Err(MapError::InvalidArgument(_))
    ));
    assert_eq!(*m.config(), before);

    // Tables keep working with the untouched factors.
    for k in 0..21 {
        m.insert(&k, &k).unwrap();
    }
    assert_eq!(m.bucket_count(), 20);
}

#[test]
fn replacing_keeps_size_and_original_key() {
    let mut m = int_map();
    m.insert(&7, &1).unwrap();
    assert_eq!(m.insert(&7, &2).unwrap(), Insertion::Replaced);
    assert_eq!(m.len(), 1);
    assert_eq!(m.get(&7).unwrap(), &2);
}

#[test]
fn remove_absent_is_not_found() {
    let mut m = int_map();
    assert!(matches!(m.remove(&1), Err(MapError::NotFound)));
    m.insert(&1, &1).unwrap();
    m.remove(&1).unwrap();
    assert!(matches!(m.remove(&1), Err(MapError::NotFound)));
    assert!(m.is_empty());
}

/// Grow multiplies by `grow_factor`; shrink multiplies by `shrink_factor`
/// and bottoms out at one bucket.
#[test]
fn bucket_count_follows_factors() {
    let mut m = int_map();
    m.configure(1.0, 0.25, 3.0).unwrap();
    for k in 0..11 {
        m.insert(&k, &k).unwrap();
    }
    assert_eq!(m.bucket_count(), 30);

    let mut counts = vec![m.bucket_count()];
    for k in 0..11 {
        m.remove(&k).unwrap();
        if counts.last() != Some(&m.bucket_count()) {
            counts.push(m.bucket_count());
        }
    }
    assert_eq!(counts, vec![30, 15, 7, 3, 1]);
}

#[test]
fn custom_initial_geometry() {
    let m = ChainMap::with_config(
        StdCapabilities::<String, String>::new(),
        MapConfig {
            initial_buckets: 1,
            ..MapConfig::default()
        },
    )
    .unwrap();
    assert_eq!(m.bucket_count(), 1);
    assert!(matches!(m.iter_start(), Err(MapError::EndOfMap)));
}

#[test]
fn string_keys_by_reference() {
    let mut m: ChainMap<StdCapabilities<String, Vec<u8>>> =
        ChainMap::new(StdCapabilities::new()).unwrap();
    let key = "apple".to_string();
    let value = vec![1, 2, 3];
    m.insert(&key, &value).unwrap();
    // The caller still owns its arguments.
    assert_eq!(key, "apple");
    assert_eq!(value, vec![1, 2, 3]);
    assert_eq!(m.get(&"apple".to_string()).unwrap(), &vec![1, 2, 3]);
}

#[test]
fn for_loop_over_reference() {
    let mut m = int_map();
    for k in 0..30 {
        m.insert(&k, &(k * 2)).unwrap();
    }
    let mut total = 0;
    for (k, v) in &m {
        assert_eq!(*v, k * 2);
        total += 1;
    }
    assert_eq!(total, 30);
}
