use crate::{FoldHashMap, LockedMap, RwLock, Table};
use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::ops::ControlFlow;

/// A thread-safe hashmap guarded by a single reader-writer lock.
///
/// Lookups and bulk reads take the lock in shared mode, mutations take it in
/// exclusive mode. Compound operations that must be atomic run through
/// [`run_exclusive`](Self::run_exclusive) against a [`LockedMap`].
pub struct SyncMap<K, V> {
    table: RwLock<Table<K, V>>,
}

impl<K: Eq + Hash, V> Default for SyncMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// The main thread-safe map type.
impl<K: Eq + Hash, V> SyncMap<K, V> {
    /// Creates an empty `SyncMap`.
    ///
    /// # Returns
    ///
    /// A new `SyncMap` instance.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty `SyncMap` with room for at least `capacity` entries.
    ///
    /// The capacity is only a hint, the map grows as needed.
    ///
    /// # Arguments
    ///
    /// * `capacity` - The initial capacity of the hashmap.
    ///
    /// # Returns
    ///
    /// A new `SyncMap` instance.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            table: RwLock::new(Table::with_capacity(capacity)),
        }
    }

    /// Sets a value in the map, overwriting any previous value.
    ///
    /// **Locking behaviour:** exclusive.
    ///
    /// # Examples
    /// ```
    /// use syncmap::SyncMap;
    ///
    /// let map = SyncMap::<String, u32>::new();
    /// map.store("key".to_string(), 42);
    /// map.store("key".to_string(), 123);
    /// assert_eq!(map.load("key"), Some(123));
    /// ```
    pub fn store(&self, key: K, value: V) {
        self.table.write().store(key, value);
    }

    /// Gets a copy of the value associated with the given key.
    ///
    /// # Returns
    /// * `Some(V)` if the key exists, even when the value is a "zero" like `0` or `""`
    /// * `None` if the key doesn't exist
    ///
    /// **Locking behaviour:** shared.
    ///
    /// # Examples
    /// ```
    /// use syncmap::SyncMap;
    ///
    /// let map = SyncMap::<String, u32>::new();
    /// map.store("zero".to_string(), 0);
    /// assert_eq!(map.load("zero"), Some(0));
    /// assert_eq!(map.load("missing"), None);
    /// ```
    pub fn load<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        V: Clone,
        Q: Eq + Hash + ?Sized,
    {
        self.table.read().load(key)
    }

    /// Returns `true` if the map holds a value for `key`.
    ///
    /// **Locking behaviour:** shared.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.table.read().contains_key(key)
    }

    /// Returns the existing value for the key if present. Otherwise stores and
    /// returns the given value.
    ///
    /// # Returns
    /// * `(existing, true)` if the key was already present; the map is unchanged
    /// * `(value, false)` if `value` was stored
    ///
    /// **Locking behaviour:** exclusive.
    ///
    /// # Examples
    /// ```
    /// use syncmap::SyncMap;
    ///
    /// let map = SyncMap::<&str, u32>::new();
    /// assert_eq!(map.load_or_store("key", 1), (1, false));
    /// assert_eq!(map.load_or_store("key", 2), (1, true));
    /// ```
    pub fn load_or_store(&self, key: K, value: V) -> (V, bool)
    where
        V: Clone,
    {
        self.table.write().load_or_store(key, value)
    }

    /// Removes a key from the map, returning its value if it was present.
    ///
    /// **Locking behaviour:** exclusive.
    ///
    /// # Examples
    /// ```
    /// use syncmap::SyncMap;
    ///
    /// let map = SyncMap::<&str, u32>::new();
    /// map.store("key", 42);
    /// assert_eq!(map.load_and_delete("key"), Some(42));
    /// assert_eq!(map.load_and_delete("key"), None);
    /// ```
    pub fn load_and_delete<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.table.write().load_and_delete(key)
    }

    /// Removes a key from the map.
    ///
    /// # Returns
    /// `true` if the key was present and has been removed.
    ///
    /// **Locking behaviour:** exclusive.
    pub fn remove<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.table.write().remove(key)
    }

    /// Removes every entry. The map stays usable and keeps its allocation.
    ///
    /// **Locking behaviour:** exclusive.
    pub fn purge(&self) {
        let dropped = self.table.write().purge();
        tracing::trace!(dropped, "purged sync map");
    }

    /// Returns the number of entries at the instant the lock was held.
    ///
    /// **Locking behaviour:** shared.
    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    /// **Locking behaviour:** shared.
    pub fn is_empty(&self) -> bool {
        self.table.read().is_empty()
    }

    /// Calls `visit` for each entry until it returns [`ControlFlow::Break`].
    ///
    /// Iteration order is unspecified. The entries visited are those present
    /// when the lock was taken.
    ///
    /// **Locking behaviour:** shared for the whole iteration. Calling any
    /// mutating method of this map from `visit` deadlocks (debug builds panic
    /// instead). A panic in `visit` releases the lock before it propagates.
    ///
    /// # Examples
    /// ```
    /// use std::ops::ControlFlow;
    /// use syncmap::SyncMap;
    ///
    /// let map = SyncMap::<u32, u32>::new();
    /// for i in 0..10 {
    ///     map.store(i, i);
    /// }
    ///
    /// let mut visited = 0;
    /// map.range(|_, _| {
    ///     visited += 1;
    ///     if visited < 4 {
    ///         ControlFlow::Continue(())
    ///     } else {
    ///         ControlFlow::Break(())
    ///     }
    /// });
    /// assert_eq!(visited, 4);
    /// ```
    pub fn range<F>(&self, visit: F)
    where
        F: FnMut(&K, &V) -> ControlFlow<()>,
    {
        self.table.read().range(visit)
    }

    /// Returns a new map with `transform` applied to every entry.
    ///
    /// The `SyncMap` itself is not modified, and the result is independent of it.
    ///
    /// **Locking behaviour:** shared. `transform` must not call back into this map's mutating methods
    /// (deadlock, or a panic in debug builds).
    ///
    /// # Examples
    /// ```
    /// use syncmap::SyncMap;
    ///
    /// let map = SyncMap::<&str, u32>::new();
    /// map.store("a", 1);
    /// map.store("b", 2);
    /// let scaled = map.map(|_, v| v * 10);
    /// assert_eq!(scaled["a"], 10);
    /// assert_eq!(scaled["b"], 20);
    /// assert_eq!(map.load("a"), Some(1));
    /// ```
    pub fn map<U, F>(&self, transform: F) -> FoldHashMap<K, U>
    where
        K: Clone,
        F: FnMut(&K, &V) -> U,
    {
        self.table.read().map(transform)
    }

    /// Returns a new map holding copies of the entries for which `predicate` holds.
    ///
    /// **Locking behaviour:** shared. `predicate` must not call back into this map's mutating methods
    /// (deadlock, or a panic in debug builds).
    pub fn filter<F>(&self, predicate: F) -> FoldHashMap<K, V>
    where
        K: Clone,
        V: Clone,
        F: FnMut(&K, &V) -> bool,
    {
        self.table.read().filter(predicate)
    }

    /// Runs `f` with exclusive access to the map.
    ///
    /// Everything `f` does through the [`LockedMap`] is atomic with respect to
    /// every other operation on this map. The lock is released when `f`
    /// returns or panics; a panic then propagates to the caller.
    ///
    /// **Locking behaviour:** exclusive for the whole callback, readers
    /// included, so keep `f` short. Deadlock if `f` calls methods of this map
    /// instead of the `LockedMap` it was given.
    ///
    /// # Examples
    /// ```
    /// use syncmap::SyncMap;
    ///
    /// let accounts = SyncMap::<&str, i64>::new();
    /// accounts.store("alice", 100);
    /// accounts.store("bob", 0);
    ///
    /// // Move money without anyone observing the intermediate state.
    /// accounts.run_exclusive(|locked| {
    ///     let alice = locked.load("alice").unwrap_or_default();
    ///     let bob = locked.load("bob").unwrap_or_default();
    ///     locked.store("alice", alice - 30);
    ///     locked.store("bob", bob + 30);
    /// });
    /// assert_eq!(accounts.load("alice"), Some(70));
    /// assert_eq!(accounts.load("bob"), Some(30));
    /// ```
    pub fn run_exclusive<F>(&self, f: F)
    where
        F: FnOnce(&mut LockedMap<'_, K, V>),
    {
        self.run_exclusive_with_result(f)
    }

    /// Runs `f` with exclusive access to the map and returns its result unchanged.
    ///
    /// See [`run_exclusive`](Self::run_exclusive) for the locking behaviour.
    /// A callback returning a `Result` gets it back as-is, errors included.
    ///
    /// # Examples
    /// ```
    /// use syncmap::SyncMap;
    ///
    /// let stock = SyncMap::<&str, u32>::new();
    /// stock.store("apple", 2);
    ///
    /// let take = |count: u32| {
    ///     stock.run_exclusive_with_result(|locked| {
    ///         let left = locked.load("apple").unwrap_or(0);
    ///         if left < count {
    ///             return Err(left);
    ///         }
    ///         locked.store("apple", left - count);
    ///         Ok(left - count)
    ///     })
    /// };
    /// assert_eq!(take(1), Ok(1));
    /// assert_eq!(take(5), Err(1));
    /// ```
    pub fn run_exclusive_with_result<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut LockedMap<'_, K, V>) -> R,
    {
        let mut guard = self.table.write();
        tracing::trace!("entered exclusive section");
        let mut locked = LockedMap::new(&mut *guard);
        let result = f(&mut locked);
        tracing::trace!(len = locked.len(), "leaving exclusive section");
        result
    }

    /// Returns the underlying map. No locking needed, `&mut self` proves exclusive access.
    pub fn get_mut(&mut self) -> &mut FoldHashMap<K, V> {
        self.table.get_mut().as_map_mut()
    }

    /// Consumes the `SyncMap`, returning the underlying map.
    pub fn into_inner(self) -> FoldHashMap<K, V> {
        self.table.into_inner().into_map()
    }
}

impl<K, V> From<FoldHashMap<K, V>> for SyncMap<K, V> {
    fn from(map: FoldHashMap<K, V>) -> Self {
        Self {
            table: RwLock::new(Table::from(map)),
        }
    }
}

impl<K: Eq + Hash, V> FromIterator<(K, V)> for SyncMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<FoldHashMap<K, V>>())
    }
}

/// Stores every pair under a single exclusive lock.
///
/// The iterator is driven while the lock is held, so it must not touch this map.
impl<K: Eq + Hash, V> Extend<(K, V)> for &SyncMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let mut table = self.table.write();
        for (key, value) in iter {
            table.store(key, value);
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for SyncMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.table.read().iter()).finish()
    }
}
