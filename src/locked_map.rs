use crate::{FoldHashMap, Table};
use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::ops::ControlFlow;

/// Access to the contents of a [`SyncMap`](crate::SyncMap) while its write lock is held.
///
/// A `LockedMap` is only ever lent to the callback of
/// [`SyncMap::run_exclusive`](crate::SyncMap::run_exclusive) or
/// [`SyncMap::run_exclusive_with_result`](crate::SyncMap::run_exclusive_with_result).
/// Its methods mirror the `SyncMap` ones but never lock: the enclosing call
/// already holds the write lock for the whole callback. Every sequence of
/// operations performed through it is therefore atomic with respect to all
/// other users of the map.
///
/// It cannot be constructed outside this crate and cannot escape the callback
/// that received it.
///
/// **Locking behaviour:** calling methods of the owning `SyncMap` from inside
/// the callback deadlocks (debug builds panic instead). Use the `LockedMap`.
///
/// # Examples
/// ```
/// use syncmap::SyncMap;
///
/// let map = SyncMap::<&str, u32>::new();
/// map.run_exclusive(|locked| {
///     match locked.load_mut("hits") {
///         Some(hits) => *hits += 1,
///         None => locked.store("hits", 1),
///     }
///     // let _ = map.load("hits"); // DEADLOCK!
/// });
/// assert_eq!(map.load("hits"), Some(1));
/// ```
pub struct LockedMap<'a, K, V> {
    table: &'a mut Table<K, V>,
}

impl<'a, K, V> LockedMap<'a, K, V>
where
    K: Eq + Hash,
{
    pub(crate) fn new(table: &'a mut Table<K, V>) -> Self {
        Self { table }
    }

    /// Returns a copy of the value stored for `key`, or `None` if absent.
    pub fn load<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        V: Clone,
        Q: Eq + Hash + ?Sized,
    {
        self.table.load(key)
    }

    /// Returns a mutable reference to the value stored for `key`.
    ///
    /// Only available on the locked view, where the write lock makes in-place
    /// updates safe.
    pub fn load_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.table.load_mut(key)
    }

    /// Inserts or overwrites the value for `key`.
    pub fn store(&mut self, key: K, value: V) {
        self.table.store(key, value);
    }

    /// Returns the existing value and `true` if `key` is present. Otherwise
    /// stores `value` and returns it with `false`.
    pub fn load_or_store(&mut self, key: K, value: V) -> (V, bool)
    where
        V: Clone,
    {
        self.table.load_or_store(key, value)
    }

    /// Removes `key`, returning its value if it was present.
    pub fn load_and_delete<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.table.load_and_delete(key)
    }

    /// Removes `key`. Returns `true` if it was present.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.table.remove(key)
    }

    /// Removes every entry.
    pub fn purge(&mut self) {
        let dropped = self.table.purge();
        tracing::trace!(dropped, "purged locked map");
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.table.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Calls `visit` for each entry until it returns [`ControlFlow::Break`].
    pub fn range<F>(&self, visit: F)
    where
        F: FnMut(&K, &V) -> ControlFlow<()>,
    {
        self.table.range(visit)
    }

    /// Returns a new map holding copies of the entries matching `predicate`.
    pub fn filter<F>(&self, predicate: F) -> FoldHashMap<K, V>
    where
        K: Clone,
        V: Clone,
        F: FnMut(&K, &V) -> bool,
    {
        self.table.filter(predicate)
    }

    /// Returns a new map with `transform` applied to every entry.
    pub fn map<U, F>(&self, transform: F) -> FoldHashMap<K, U>
    where
        K: Clone,
        F: FnMut(&K, &V) -> U,
    {
        self.table.map(transform)
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for LockedMap<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.table.iter()).finish()
    }
}
