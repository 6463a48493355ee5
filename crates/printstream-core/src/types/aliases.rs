//! Type aliases for shared collaborator state.
//!
//! Settings and hardware status are written by the consumer (or a UI) and
//! read by the stream filters on every pull. These aliases name that pattern
//! once so both sides agree on the lock type.
//!
//! ## Usage
//!
//! ```rust
//! use printstream_core::types::*;
//!
//! let temps: ThreadSafeRw<Vec<f64>> = thread_safe_rw(vec![21.0]);
//! temps.write()[0] = 200.0;
//! assert_eq!(temps.read()[0], 200.0);
//! ```

use parking_lot::RwLock;
use std::sync::Arc;

/// A thread-safe reader-writer lock wrapper for read-heavy workloads.
///
/// Uses `parking_lot::RwLock` for better performance than `std::sync::RwLock`.
/// Filters read settings and temperatures on every pull while writers only
/// touch them when the printer reports or the user changes something.
pub type ThreadSafeRw<T> = Arc<RwLock<T>>;

/// Create a new `ThreadSafeRw<T>` from a value.
#[inline]
pub fn thread_safe_rw<T>(value: T) -> ThreadSafeRw<T> {
    Arc::new(RwLock::new(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_safe_rw() {
        let value: ThreadSafeRw<i32> = thread_safe_rw(42);

        // Multiple readers
        assert_eq!(*value.read(), 42);
        assert_eq!(*value.read(), 42);

        // Writer
        *value.write() = 100;
        assert_eq!(*value.read(), 100);
    }

    #[test]
    fn test_thread_safe_rw_across_threads() {
        let value: ThreadSafeRw<f64> = thread_safe_rw(20.0);
        let writer = Arc::clone(&value);

        std::thread::spawn(move || {
            *writer.write() = 215.0;
        })
        .join()
        .unwrap();

        assert_eq!(*value.read(), 215.0);
    }
}
