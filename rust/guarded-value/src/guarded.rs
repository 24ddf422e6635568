use core::fmt;

use crate::error::WouldBlock;
use crate::sync::RwLock;

/// A value that can only be reached through a reader-writer lock.
///
/// Reads (`get`, `with_read_lock`) take the lock in shared mode and run
/// concurrently with each other. Writes (`set`, `replace`, `update`,
/// `with_lock`) take it in exclusive mode. Every operation acquires and
/// releases the lock within the call; no guard is ever handed out, so the
/// lock cannot outlive the call that took it.
///
/// The lock does not poison. If a callback panics the guard is dropped
/// during unwinding and the next caller gets the lock as usual.
///
/// Callbacks must not call back into the same `GuardedValue`. A blocking
/// operation would deadlock; a `try_*` operation returns [`WouldBlock`].
///
/// Share it between threads with `Arc<GuardedValue<T>>`.
pub struct GuardedValue<T> {
    lock: RwLock<T>,
}

impl<T> GuardedValue<T> {
    /// Wrap `initial`. The lock starts unheld.
    pub fn new(initial: T) -> Self {
        Self {
            lock: RwLock::new(initial),
        }
    }

    /// Overwrite the value.
    ///
    /// The previous value is dropped after the lock has been released.
    pub fn set(&self, value: T) {
        drop(self.replace(value));
    }

    /// Overwrite the value and return the previous one.
    pub fn replace(&self, value: T) -> T {
        let mut guard = self.lock.write();
        core::mem::replace(&mut *guard, value)
    }

    /// Replace the value with `f(current)` under the exclusive lock.
    ///
    /// `f` receives a copy of the current value. If it panics, the stored
    /// value is left as it was.
    pub fn update(&self, f: impl FnOnce(T) -> T)
    where
        T: Clone,
    {
        let mut guard = self.lock.write();
        let _unwind = UnwindNotice::new("update", Access::Replacing);
        let next = f(T::clone(&guard));
        *guard = next;
    }

    /// Run `f` with exclusive, mutable access to the value.
    ///
    /// The reference handed to `f` cannot escape the call. Changes made
    /// before a panic in `f` are kept.
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.lock.write();
        let _unwind = UnwindNotice::new("with_lock", Access::Exclusive);
        f(&mut *guard)
    }

    /// Run `f` with shared, read-only access to the value.
    pub fn with_read_lock<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.lock.read();
        let _unwind = UnwindNotice::new("with_read_lock", Access::Shared);
        f(&*guard)
    }

    /// Like [`with_lock`](Self::with_lock), but fails instead of waiting if
    /// the lock is held in any mode.
    pub fn try_with_lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, WouldBlock> {
        let Some(mut guard) = self.lock.try_write() else {
            return Err(contended("try_with_lock"));
        };
        let _unwind = UnwindNotice::new("try_with_lock", Access::Exclusive);
        Ok(f(&mut *guard))
    }

    /// Like [`with_read_lock`](Self::with_read_lock), but fails instead of
    /// waiting if the lock is held exclusively.
    pub fn try_with_read_lock<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, WouldBlock> {
        let Some(guard) = self.lock.try_read() else {
            return Err(contended("try_with_read_lock"));
        };
        let _unwind = UnwindNotice::new("try_with_read_lock", Access::Shared);
        Ok(f(&*guard))
    }

    /// Consume the container and return the value. No locking is needed
    /// since nobody else can hold a reference.
    #[cfg(not(feature = "loom"))]
    pub fn into_inner(self) -> T {
        self.lock.into_inner()
    }

    /// Mutable access without locking, guaranteed unique by `&mut self`.
    #[cfg(not(feature = "loom"))]
    pub fn get_mut(&mut self) -> &mut T {
        self.lock.get_mut()
    }
}

impl<T: Clone> GuardedValue<T> {
    /// Return a copy of the value, taken under the shared lock.
    pub fn get(&self) -> T {
        let guard = self.lock.read();
        T::clone(&guard)
    }

    /// Like [`get`](Self::get), but fails instead of waiting if the lock is
    /// held exclusively.
    pub fn try_get(&self) -> Result<T, WouldBlock> {
        match self.lock.try_read() {
            Some(guard) => Ok(T::clone(&guard)),
            None => Err(contended("try_get")),
        }
    }
}

impl<T: Default> Default for GuardedValue<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> From<T> for GuardedValue<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for GuardedValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("GuardedValue");
        match self.lock.try_read() {
            Some(guard) => d.field("value", &&*guard),
            None => d.field("value", &format_args!("<locked>")),
        };
        d.finish()
    }
}

fn contended(operation: &'static str) -> WouldBlock {
    tracing::trace!(operation, "lock contended, not waiting");
    WouldBlock
}

#[derive(Clone, Copy)]
enum Access {
    Shared,
    /// Exclusive, callback mutates in place.
    Exclusive,
    /// Exclusive, callback result is stored only on success.
    Replacing,
}

/// Reports a callback unwinding out of a locked section.
///
/// Must be declared after the guard so it drops first, while the lock is
/// still held.
struct UnwindNotice {
    operation: &'static str,
    access: Access,
    already_panicking: bool,
}

impl UnwindNotice {
    fn new(operation: &'static str, access: Access) -> Self {
        Self {
            operation,
            access,
            already_panicking: std::thread::panicking(),
        }
    }
}

impl Drop for UnwindNotice {
    fn drop(&mut self) {
        if self.already_panicking || !std::thread::panicking() {
            return;
        }
        let operation = self.operation;
        match self.access {
            Access::Exclusive => tracing::warn!(
                operation,
                "callback panicked under exclusive lock, value may be partially modified"
            ),
            Access::Replacing => tracing::debug!(
                operation,
                "callback panicked under exclusive lock, value left unchanged"
            ),
            Access::Shared => {
                tracing::debug!(operation, "callback panicked under shared lock")
            }
        }
    }
}
