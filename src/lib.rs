//! A thread-safe hashmap guarded by a single reader-writer lock, with scoped exclusive access.
//!
//! # Overview
//! `syncmap` wraps a hashmap in one reader-writer lock. Every method locks for the
//! duration of one operation, and [`SyncMap::run_exclusive`] holds the write lock
//! across a whole callback so that several operations can be composed atomically.
//!
//! # Features
//! - Thread-safe access, shared lock for reads and exclusive lock for writes
//! - Locked view API for atomic multi-step updates (check-then-act, multi-key)
//! - Bulk `map`/`filter`/`range` over a consistent snapshot
//! - No poisoning, the lock is released normally on panic
//!
//! # Examples
//! ```
//! use syncmap::SyncMap;
//!
//! let map = SyncMap::<String, u32>::with_capacity(10);
//!
//! // Basic operations
//! map.store("key1".into(), 42);
//! assert_eq!(map.load("key1"), Some(42));
//! assert_eq!(map.load_or_store("key1".into(), 7), (42, true));
//!
//! // Locked view for atomic compound updates
//! let total = map.run_exclusive_with_result(|locked| {
//!     let (current, _) = locked.load_or_store("key2".into(), 0);
//!     locked.store("key2".into(), current + 1);
//!     locked.len()
//! });
//! assert_eq!(total, 2);
//!
//! // Remove a value
//! assert!(map.remove("key1"));
//! assert_eq!(map.load("key1"), None);
//! ```
mod locked_map;
mod rwlock;
#[doc = include_str!("../README.md")]
mod syncmap;
mod table;

pub use locked_map::*;
use rwlock::*;
pub use syncmap::*;
pub use table::FoldHashMap;
use table::Table;
