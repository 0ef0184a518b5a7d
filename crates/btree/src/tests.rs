use super::*;
use buffer::MemPager;
use common::Config;
use types::Value;

fn row(i: i64) -> Row {
    Row(vec![Value::Integer(i), Value::Text(format!("row-{i}"))])
}

#[test]
fn search_on_empty_tree_returns_none() {
    let mut pager = MemPager::default();
    let tree = BTree::create(&mut pager, 4).unwrap();
    assert_eq!(tree.search(&mut pager, 1).unwrap(), None);
}

#[test]
fn insert_then_search_round_trips() {
    let mut pager = MemPager::default();
    let mut tree = BTree::create(&mut pager, 4).unwrap();
    tree.insert(&mut pager, 5, row(5)).unwrap();
    tree.insert(&mut pager, 1, row(1)).unwrap();
    tree.insert(&mut pager, 3, row(3)).unwrap();

    assert_eq!(tree.search(&mut pager, 5).unwrap(), Some(row(5)));
    assert_eq!(tree.search(&mut pager, 1).unwrap(), Some(row(1)));
    assert_eq!(tree.search(&mut pager, 3).unwrap(), Some(row(3)));
    assert_eq!(tree.search(&mut pager, 99).unwrap(), None);
}

#[test]
fn insert_same_key_twice_overwrites() {
    let mut pager = MemPager::default();
    let mut tree = BTree::create(&mut pager, 4).unwrap();
    tree.insert(&mut pager, 1, row(1)).unwrap();
    tree.insert(&mut pager, 1, row(100)).unwrap();
    assert_eq!(tree.search(&mut pager, 1).unwrap(), Some(row(100)));
}

#[test]
fn many_inserts_force_splits_and_all_remain_searchable() {
    let mut pager = MemPager::default();
    let mut tree = BTree::create(&mut pager, 4).unwrap();

    for key in (0..200).rev() {
        tree.insert(&mut pager, key, row(key as i64)).unwrap();
    }

    for key in 0..200u64 {
        assert_eq!(
            tree.search(&mut pager, key).unwrap(),
            Some(row(key as i64)),
            "key {key} missing after splits"
        );
    }
}

#[test]
fn scan_all_returns_ascending_key_order() {
    let mut pager = MemPager::default();
    let mut tree = BTree::create(&mut pager, 4).unwrap();
    for key in [50, 10, 30, 90, 20, 70, 40, 60, 80, 100] {
        tree.insert(&mut pager, key, row(key as i64)).unwrap();
    }

    let scanned = tree.scan_all(&mut pager).unwrap();
    let keys: Vec<u64> = scanned.iter().map(|(k, _)| *k).collect();
    let mut sorted = keys.clone();
    sorted.sort_unstable();
    assert_eq!(keys, sorted);
    assert_eq!(keys.len(), 10);
}

#[test]
fn update_replaces_row_and_reports_presence() {
    let mut pager = MemPager::default();
    let mut tree = BTree::create(&mut pager, 4).unwrap();
    tree.insert(&mut pager, 1, row(1)).unwrap();

    assert!(tree.update(&mut pager, 1, row(42)).unwrap());
    assert_eq!(tree.search(&mut pager, 1).unwrap(), Some(row(42)));
    assert!(!tree.update(&mut pager, 99, row(0)).unwrap());
}

#[test]
fn delete_removes_key_and_is_idempotent_false_on_missing() {
    let mut pager = MemPager::default();
    let mut tree = BTree::create(&mut pager, 4).unwrap();
    tree.insert(&mut pager, 1, row(1)).unwrap();
    tree.insert(&mut pager, 2, row(2)).unwrap();

    assert!(tree.delete(&mut pager, 1).unwrap());
    assert_eq!(tree.search(&mut pager, 1).unwrap(), None);
    assert_eq!(tree.search(&mut pager, 2).unwrap(), Some(row(2)));
    assert!(!tree.delete(&mut pager, 1).unwrap());
}

#[test]
fn delete_after_splits_still_finds_survivors() {
    let mut pager = MemPager::default();
    let mut tree = BTree::create(&mut pager, 4).unwrap();
    for key in 0..50u64 {
        tree.insert(&mut pager, key, row(key as i64)).unwrap();
    }
    for key in (0..50u64).step_by(2) {
        assert!(tree.delete(&mut pager, key).unwrap());
    }
    for key in 0..50u64 {
        let expected = if key % 2 == 0 { None } else { Some(row(key as i64)) };
        assert_eq!(tree.search(&mut pager, key).unwrap(), expected);
    }
}

#[test]
fn default_order_survives_a_larger_workload() {
    let config = Config::default();
    let mut pager = MemPager::new(&config);
    let mut tree = BTree::create(&mut pager, DEFAULT_ORDER).unwrap();

    for key in 0..2000u64 {
        tree.insert(&mut pager, key, row(key as i64)).unwrap();
    }
    let scanned = tree.scan_all(&mut pager).unwrap();
    assert_eq!(scanned.len(), 2000);
    for (i, (key, r)) in scanned.iter().enumerate() {
        assert_eq!(*key, i as u64);
        assert_eq!(*r, row(i as i64));
    }
}

proptest::proptest! {
    #[test]
    fn arbitrary_insert_order_is_always_searchable(mut keys in proptest::collection::vec(0u64..500, 1..200)) {
        keys.sort_unstable();
        keys.dedup();
        let mut pager = MemPager::default();
        let mut tree = BTree::create(&mut pager, 4).unwrap();
        for &key in &keys {
            tree.insert(&mut pager, key, row(key as i64)).unwrap();
        }
        for &key in &keys {
            prop_assert_eq!(tree.search(&mut pager, key).unwrap(), Some(row(key as i64)));
        }
        let scanned = tree.scan_all(&mut pager).unwrap();
        let scanned_keys: Vec<u64> = scanned.iter().map(|(k, _)| *k).collect();
        prop_assert_eq!(scanned_keys, keys);
    }
}
