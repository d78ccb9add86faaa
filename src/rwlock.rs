// Simplified from https://github.com/rust-lang/rust/blob/master/library/std/src/sys/sync/rwlock/futex.rs
use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{
    AtomicU32,
    Ordering::{Acquire, Relaxed, Release},
};

/// A reader-writer lock without poisoning, built on futex wait/wake.
///
/// The whole state lives in one `AtomicU32`:
/// * bits 0..31: number of readers, or `WRITE_LOCKED` when a writer holds the lock.
/// * bit 31: set when at least one thread is parked waiting for the lock.
///
/// Releasing the lock with the waiting bit set clears it and wakes every parked
/// thread; they race for the lock again and re-park if they lose. Readers are
/// admitted as long as no writer holds the lock, so the lock is not fair.
pub struct RwLock<T: ?Sized> {
    state: AtomicU32,
    /// Token of the thread holding the write lock, zero when none.
    #[cfg(debug_assertions)]
    owner: std::sync::atomic::AtomicUsize,
    data: UnsafeCell<T>,
}

const MASK: u32 = (1 << 31) - 1;
const WRITE_LOCKED: u32 = MASK;
const MAX_READERS: u32 = MASK - 1;
const WAITING: u32 = 1 << 31;

#[inline]
fn is_unlocked(state: u32) -> bool {
    state & MASK == 0
}

#[inline]
fn is_read_lockable(state: u32) -> bool {
    state & MASK < MAX_READERS
}

// Safety: the lock hands out `&T` to many threads at once and `&mut T` to one
// thread at a time, the same contract as `std::sync::RwLock`.
unsafe impl<T: ?Sized + Send> Send for RwLock<T> {}
unsafe impl<T: ?Sized + Send + Sync> Sync for RwLock<T> {}

impl<T> RwLock<T> {
    #[inline]
    pub const fn new(value: T) -> Self {
        Self {
            state: AtomicU32::new(0),
            #[cfg(debug_assertions)]
            owner: std::sync::atomic::AtomicUsize::new(0),
            data: UnsafeCell::new(value),
        }
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: ?Sized> RwLock<T> {
    /// Acquires the lock in shared mode, blocking while a writer holds it.
    #[inline]
    pub fn read(&self) -> ReadGuard<'_, T> {
        self.check_reentrancy();
        let state = self.state.load(Relaxed);
        if !is_read_lockable(state)
            || self
                .state
                .compare_exchange_weak(state, state + 1, Acquire, Relaxed)
                .is_err()
        {
            self.read_contended();
        }
        self.note_read_held();
        ReadGuard { lock: self }
    }

    /// Acquires the lock in exclusive mode, blocking while anyone else holds it.
    #[inline]
    pub fn write(&self) -> WriteGuard<'_, T> {
        self.check_reentrancy();
        self.check_not_read_held();
        if self
            .state
            .compare_exchange(0, WRITE_LOCKED, Acquire, Relaxed)
            .is_err()
        {
            self.write_contended();
        }
        self.set_owner();
        WriteGuard { lock: self }
    }

    /// No locking needed: `&mut self` already proves exclusive access.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    #[cold]
    fn read_contended(&self) {
        let mut state = self.spin(is_read_lockable);
        loop {
            if is_read_lockable(state) {
                match self
                    .state
                    .compare_exchange_weak(state, state + 1, Acquire, Relaxed)
                {
                    Ok(_) => return, // Locked!
                    Err(s) => {
                        state = s;
                        continue;
                    }
                }
            }
            state = self.park(state, is_read_lockable);
        }
    }

    #[cold]
    fn write_contended(&self) {
        let mut state = self.spin(is_unlocked);
        loop {
            if is_unlocked(state) {
                // Keep the waiting bit: our own unlock must wake the parked threads.
                match self
                    .state
                    .compare_exchange_weak(state, state | WRITE_LOCKED, Acquire, Relaxed)
                {
                    Ok(_) => return, // Locked!
                    Err(s) => {
                        state = s;
                        continue;
                    }
                }
            }
            state = self.park(state, is_unlocked);
        }
    }

    /// Sets the waiting bit and sleeps until the state changes.
    ///
    /// Returns the freshly observed state.
    fn park(&self, state: u32, ready: fn(u32) -> bool) -> u32 {
        if state & WAITING == 0 {
            if let Err(s) = self
                .state
                .compare_exchange(state, state | WAITING, Relaxed, Relaxed)
            {
                return s;
            }
        }

        // Returns immediately if the state no longer matches.
        atomic_wait::wait(&self.state, state | WAITING);

        self.spin(ready)
    }

    fn spin(&self, ready: fn(u32) -> bool) -> u32 {
        let mut spin = 100;
        loop {
            // Only `load` while spinning, to be easier on the caches.
            let state = self.state.load(Relaxed);

            // Stop once the lock is available, or when others are already parked.
            if ready(state) || state & WAITING != 0 || spin == 0 {
                return state;
            }

            std::hint::spin_loop();
            spin -= 1;
        }
    }

    #[inline]
    fn read_unlock(&self) {
        self.note_read_released();
        let state = self.state.fetch_sub(1, Release) - 1;
        debug_assert!(state & MASK < MAX_READERS, "read unlock of a write-locked RwLock");

        // The last reader out wakes whoever parked behind the readers.
        if state == WAITING {
            self.wake_all();
        }
    }

    #[inline]
    fn write_unlock(&self) {
        self.clear_owner();
        let state = self.state.fetch_sub(WRITE_LOCKED, Release) - WRITE_LOCKED;
        debug_assert!(is_unlocked(state), "write unlock of a read-locked RwLock");

        if state & WAITING != 0 {
            self.wake_all();
        }
    }

    #[cold]
    fn wake_all(&self) {
        // Anyone still blocked after this sets the bit again before parking.
        self.state.fetch_and(!WAITING, Relaxed);
        atomic_wait::wake_all(&self.state);
    }

    #[inline]
    fn check_reentrancy(&self) {
        #[cfg(debug_assertions)]
        assert!(
            self.owner.load(Relaxed) != thread_token(),
            "reentrant lock acquisition: this thread already holds the lock exclusively"
        );
    }

    /// Upgrading a read lock to a write lock on the same thread never succeeds.
    #[inline]
    fn check_not_read_held(&self) {
        #[cfg(debug_assertions)]
        {
            let addr = self.addr();
            assert!(
                !READ_HELD.with(|held| held.borrow().contains(&addr)),
                "reentrant lock acquisition: this thread already holds the lock in shared mode"
            );
        }
    }

    #[inline]
    fn note_read_held(&self) {
        #[cfg(debug_assertions)]
        {
            let addr = self.addr();
            READ_HELD.with(|held| held.borrow_mut().push(addr));
        }
    }

    #[inline]
    fn note_read_released(&self) {
        #[cfg(debug_assertions)]
        {
            let addr = self.addr();
            // `try_with`: guards may still be dropped while thread-locals are torn down.
            let _ = READ_HELD.try_with(|held| {
                let mut held = held.borrow_mut();
                if let Some(pos) = held.iter().rposition(|a| *a == addr) {
                    held.swap_remove(pos);
                }
            });
        }
    }

    #[cfg(debug_assertions)]
    fn addr(&self) -> usize {
        (self as *const Self).cast::<()>() as usize
    }

    #[inline]
    fn set_owner(&self) {
        #[cfg(debug_assertions)]
        self.owner.store(thread_token(), Relaxed);
    }

    #[inline]
    fn clear_owner(&self) {
        #[cfg(debug_assertions)]
        self.owner.store(0, Relaxed);
    }
}

#[cfg(debug_assertions)]
thread_local! {
    /// Addresses of the locks this thread holds in shared mode, one per guard.
    static READ_HELD: std::cell::RefCell<Vec<usize>> = const { std::cell::RefCell::new(Vec::new()) };
}

/// Returns a non-zero number unique to the calling thread.
#[cfg(debug_assertions)]
fn thread_token() -> usize {
    use std::sync::atomic::AtomicUsize;

    static NEXT: AtomicUsize = AtomicUsize::new(1);
    thread_local! {
        static TOKEN: usize = NEXT.fetch_add(1, Relaxed);
    }
    TOKEN.with(|token| *token)
}

/// RAII guard for shared access, released on drop.
pub struct ReadGuard<'a, T: ?Sized> {
    lock: &'a RwLock<T>,
}

impl<T: ?Sized> Deref for ReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Safety: the read lock is held, writers are excluded.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for ReadGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.read_unlock();
    }
}

/// RAII guard for exclusive access, released on drop (also while unwinding).
pub struct WriteGuard<'a, T: ?Sized> {
    lock: &'a RwLock<T>,
}

impl<T: ?Sized> Deref for WriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Safety: the write lock is held, everyone else is excluded.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> DerefMut for WriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // Safety: the write lock is held, everyone else is excluded.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for WriteGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.write_unlock();
    }
}
