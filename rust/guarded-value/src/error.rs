use core::fmt;

/// Returned by the `try_*` operations when the lock could not be taken
/// without waiting.
///
/// For `try_get` and `try_with_read_lock` this means an exclusive holder was
/// present; for `try_with_lock` it means any holder was present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WouldBlock;

impl fmt::Display for WouldBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lock is held, acquiring it would block")
    }
}

impl std::error::Error for WouldBlock {}
