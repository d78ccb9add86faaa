// SyncMap model test.
//
// A random sequence of operations is applied both to a SyncMap and to a plain
// HashMap model. Every operation must report the same result on both, whether
// it goes through the SyncMap directly or through the LockedMap inside
// run_exclusive.
use proptest::prelude::*;
use std::collections::HashMap;
use std::ops::ControlFlow;
use syncmap::{LockedMap, SyncMap};

#[derive(Clone, Debug)]
enum Op {
    Store(u8, u32),
    Load(u8),
    LoadOrStore(u8, u32),
    LoadAndDelete(u8),
    Remove(u8),
    Purge,
    Len,
    Filter(u32),
    Map(u32),
    RangeFirst(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..16, any::<u32>()).prop_map(|(k, v)| Op::Store(k, v)),
        3 => (0u8..16).prop_map(Op::Load),
        2 => (0u8..16, any::<u32>()).prop_map(|(k, v)| Op::LoadOrStore(k, v)),
        2 => (0u8..16).prop_map(Op::LoadAndDelete),
        2 => (0u8..16).prop_map(Op::Remove),
        1 => Just(Op::Purge),
        1 => Just(Op::Len),
        1 => any::<u32>().prop_map(Op::Filter),
        1 => (1u32..8).prop_map(Op::Map),
        1 => (0usize..20).prop_map(Op::RangeFirst),
    ]
}

/// Observable outcome of one operation.
#[derive(Debug, PartialEq)]
enum Outcome {
    Unit,
    Value(Option<u32>),
    Pair(u32, bool),
    Flag(bool),
    Count(usize),
    Entries(Vec<(u8, u32)>),
}

fn sorted(map: impl IntoIterator<Item = (u8, u32)>) -> Outcome {
    let mut entries = map.into_iter().collect::<Vec<_>>();
    entries.sort_unstable();
    Outcome::Entries(entries)
}

fn apply_model(model: &mut HashMap<u8, u32>, op: &Op) -> Outcome {
    match *op {
        Op::Store(k, v) => {
            model.insert(k, v);
            Outcome::Unit
        }
        Op::Load(k) => Outcome::Value(model.get(&k).copied()),
        Op::LoadOrStore(k, v) => match model.get(&k) {
            Some(existing) => Outcome::Pair(*existing, true),
            None => {
                model.insert(k, v);
                Outcome::Pair(v, false)
            }
        },
        Op::LoadAndDelete(k) => Outcome::Value(model.remove(&k)),
        Op::Remove(k) => Outcome::Flag(model.remove(&k).is_some()),
        Op::Purge => {
            model.clear();
            Outcome::Unit
        }
        Op::Len => Outcome::Count(model.len()),
        Op::Filter(t) => sorted(model.iter().filter(|(_, v)| **v >= t).map(|(k, v)| (*k, *v))),
        Op::Map(m) => sorted(model.iter().map(|(k, v)| (*k, v.wrapping_mul(m)))),
        Op::RangeFirst(n) => Outcome::Count(n.min(model.len())),
    }
}

fn apply_map(map: &SyncMap<u8, u32>, op: &Op) -> Outcome {
    match *op {
        Op::Store(k, v) => {
            map.store(k, v);
            Outcome::Unit
        }
        Op::Load(k) => Outcome::Value(map.load(&k)),
        Op::LoadOrStore(k, v) => {
            let (value, loaded) = map.load_or_store(k, v);
            Outcome::Pair(value, loaded)
        }
        Op::LoadAndDelete(k) => Outcome::Value(map.load_and_delete(&k)),
        Op::Remove(k) => Outcome::Flag(map.remove(&k)),
        Op::Purge => {
            map.purge();
            Outcome::Unit
        }
        Op::Len => Outcome::Count(map.len()),
        Op::Filter(t) => sorted(map.filter(|_, v| *v >= t)),
        Op::Map(m) => sorted(map.map(|_, v| v.wrapping_mul(m))),
        Op::RangeFirst(n) => {
            let mut visited = 0;
            map.range(|_, _| {
                if visited == n {
                    return ControlFlow::Break(());
                }
                visited += 1;
                ControlFlow::Continue(())
            });
            Outcome::Count(visited)
        }
    }
}

fn apply_locked(locked: &mut LockedMap<'_, u8, u32>, op: &Op) -> Outcome {
    match *op {
        Op::Store(k, v) => {
            locked.store(k, v);
            Outcome::Unit
        }
        Op::Load(k) => Outcome::Value(locked.load(&k)),
        Op::LoadOrStore(k, v) => {
            let (value, loaded) = locked.load_or_store(k, v);
            Outcome::Pair(value, loaded)
        }
        Op::LoadAndDelete(k) => Outcome::Value(locked.load_and_delete(&k)),
        Op::Remove(k) => Outcome::Flag(locked.remove(&k)),
        Op::Purge => {
            locked.purge();
            Outcome::Unit
        }
        Op::Len => Outcome::Count(locked.len()),
        Op::Filter(t) => sorted(locked.filter(|_, v| *v >= t)),
        Op::Map(m) => sorted(locked.map(|_, v| v.wrapping_mul(m))),
        Op::RangeFirst(n) => {
            let mut visited = 0;
            locked.range(|_, _| {
                if visited == n {
                    return ControlFlow::Break(());
                }
                visited += 1;
                ControlFlow::Continue(())
            });
            Outcome::Count(visited)
        }
    }
}

proptest! {
    #[test]
    fn prop_syncmap_matches_model(ops in proptest::collection::vec(op_strategy(), 1..200)) {
        let map = SyncMap::<u8, u32>::new();
        let mut model = HashMap::new();

        for op in &ops {
            let expected = apply_model(&mut model, op);
            prop_assert_eq!(apply_map(&map, op), expected, "op {:?}", op);
            prop_assert_eq!(map.len(), model.len());
        }

        let mut entries = map.into_inner().into_iter().collect::<Vec<_>>();
        entries.sort_unstable();
        let mut expected = model.into_iter().collect::<Vec<_>>();
        expected.sort_unstable();
        prop_assert_eq!(entries, expected);
    }

    #[test]
    fn prop_locked_map_matches_model(
        batches in proptest::collection::vec(proptest::collection::vec(op_strategy(), 0..20), 1..20)
    ) {
        let map = SyncMap::<u8, u32>::new();
        let mut model = HashMap::new();

        for batch in &batches {
            let expected = batch
                .iter()
                .map(|op| apply_model(&mut model, op))
                .collect::<Vec<_>>();
            let actual = map.run_exclusive_with_result(|locked| {
                batch
                    .iter()
                    .map(|op| apply_locked(locked, op))
                    .collect::<Vec<_>>()
            });
            prop_assert_eq!(actual, expected);
            prop_assert_eq!(map.len(), model.len());
        }
    }
}
