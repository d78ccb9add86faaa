use foldhash::fast::RandomState;
use std::borrow::Borrow;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;
use std::ops::ControlFlow;

/// The `HashMap` flavour stored inside a `SyncMap` and returned by its bulk operations.
///
/// The hasher is `foldhash::fast::RandomState`, so it is part of this crate's
/// public API: a major version bump of `foldhash` is a breaking change here.
/// The hasher implements `Default`, so callers can build one without naming it.
///
/// # Examples
/// ```
/// use syncmap::{FoldHashMap, SyncMap};
///
/// let mut initial = FoldHashMap::default();
/// initial.insert("a", 1);
/// let map = SyncMap::from(initial);
///
/// let copy: FoldHashMap<&str, i32> = map.filter(|_, v| *v > 0);
/// assert_eq!(copy.get("a"), Some(&1));
/// ```
pub type FoldHashMap<K, V> = HashMap<K, V, RandomState>;

/// The data behind a `SyncMap`.
///
/// Never locks. The owning `SyncMap` guards it with its `RwLock`, and a
/// `LockedMap` borrows it while the write lock is held, so both share the
/// operations below.
#[derive(Debug)]
pub struct Table<K, V> {
    map: FoldHashMap<K, V>,
}

impl<K, V> Table<K, V>
where
    K: Eq + Hash,
{
    /// Creates a new `Table` with the specified initial capacity.
    ///
    /// # Arguments
    ///
    /// * `capacity` - The initial capacity of the hashmap.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: HashMap::with_capacity_and_hasher(capacity, RandomState::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.contains_key(key)
    }

    pub fn load<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        V: Clone,
        Q: Eq + Hash + ?Sized,
    {
        self.map.get(key).cloned()
    }

    pub fn load_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.get_mut(key)
    }

    pub fn store(&mut self, key: K, value: V) {
        self.map.insert(key, value);
    }

    /// Returns the existing value and `true`, or stores `value` and returns it with `false`.
    pub fn load_or_store(&mut self, key: K, value: V) -> (V, bool)
    where
        V: Clone,
    {
        match self.map.entry(key) {
            Entry::Occupied(entry) => (entry.get().clone(), true),
            Entry::Vacant(entry) => (entry.insert(value).clone(), false),
        }
    }

    pub fn load_and_delete<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.remove(key)
    }

    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.remove(key).is_some()
    }

    /// Drops every entry but keeps the allocation. Returns how many entries were dropped.
    pub fn purge(&mut self) -> usize {
        let dropped = self.map.len();
        self.map.clear();
        dropped
    }

    /// Visits entries until `visit` breaks.
    pub fn range<F>(&self, mut visit: F)
    where
        F: FnMut(&K, &V) -> ControlFlow<()>,
    {
        for (key, value) in &self.map {
            if visit(key, value).is_break() {
                break;
            }
        }
    }

    pub fn filter<F>(&self, mut predicate: F) -> FoldHashMap<K, V>
    where
        K: Clone,
        V: Clone,
        F: FnMut(&K, &V) -> bool,
    {
        self.map
            .iter()
            .filter(|&(key, value)| predicate(key, value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub fn map<U, F>(&self, mut transform: F) -> FoldHashMap<K, U>
    where
        K: Clone,
        F: FnMut(&K, &V) -> U,
    {
        let mut data = HashMap::with_capacity_and_hasher(self.map.len(), RandomState::default());
        for (key, value) in &self.map {
            data.insert(key.clone(), transform(key, value));
        }
        data
    }
}

impl<K, V> Table<K, V> {
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.map.iter()
    }

    pub fn as_map_mut(&mut self) -> &mut FoldHashMap<K, V> {
        &mut self.map
    }

    pub fn into_map(self) -> FoldHashMap<K, V> {
        self.map
    }
}

impl<K, V> From<FoldHashMap<K, V>> for Table<K, V> {
    fn from(map: FoldHashMap<K, V>) -> Self {
        Self { map }
    }
}
