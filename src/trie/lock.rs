//! Per-node read/write spin lock packed into a single `AtomicU32`.
//!
//! Critical sections only ever touch the fields of one node, so waiting is a
//! short busy loop instead of parking the thread. Once a trie is compressed
//! every lock is deactivated and all operations return immediately.

use std::hint;
use std::sync::atomic::{AtomicU32, Ordering};

const UNUSED: u32 = 0;
const INACTIVE: u32 = 1 << 31;
const WRITE: u32 = 1 << 30;
const COORDINATION: u32 = 1 << 29;
/// Failed read attempts tolerated before the tally is reset.
const READ_RESET_THRESHOLD: u32 = 1 << 26;
const READS_MASK: u32 = COORDINATION - 1;

#[derive(Debug, Default)]
pub(crate) struct NodeLock {
    state: AtomicU32,
}

impl NodeLock {
    pub(crate) const fn new() -> Self {
        Self {
            state: AtomicU32::new(UNUSED),
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.state.load(Ordering::Acquire) & INACTIVE == 0
    }

    pub(crate) fn start_read(&self) {
        if !self.is_active() {
            return;
        }
        let mut previous = self.state.fetch_add(1, Ordering::Acquire);
        while previous >= WRITE {
            // Failed attempts stay in the tally until the writer resets it.
            if previous & READS_MASK > READ_RESET_THRESHOLD && self.reset_read_tally() {
                tracing::debug!("Reset stalled read attempts of a write-locked node");
            }
            hint::spin_loop();
            previous = self.state.fetch_add(1, Ordering::Acquire);
        }
    }

    /// Clears the failed read attempts while a writer holds the lock.
    ///
    /// The coordination bit is only claimed from a state that still carries
    /// the write bit, so a writer that already released leaves nothing to reset.
    fn reset_read_tally(&self) -> bool {
        let current = self.state.load(Ordering::Acquire);
        if current & WRITE == 0 || current & COORDINATION != 0 {
            return false;
        }
        if self
            .state
            .compare_exchange(current, current | COORDINATION, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.state.store(WRITE, Ordering::Release);
        true
    }

    pub(crate) fn end_read(&self) {
        if !self.is_active() {
            return;
        }
        let previous = self.state.fetch_sub(1, Ordering::Release);
        assert!(
            previous & READS_MASK != 0 && previous < WRITE,
            "released a read lock that was not held (state {:#x})",
            previous
        );
    }

    pub(crate) fn start_write(&self) {
        loop {
            match self
                .state
                .compare_exchange_weak(UNUSED, WRITE, Ordering::Acquire, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(current) if current & INACTIVE != 0 => return,
                Err(_) => hint::spin_loop(),
            }
        }
    }

    pub(crate) fn end_write(&self) {
        if !self.is_active() {
            return;
        }
        // wait for a reader that is resetting the tally, the write bit keeps
        // every other reader from claiming it
        while self.state.fetch_or(COORDINATION, Ordering::AcqRel) & COORDINATION != 0 {
            hint::spin_loop();
        }
        let previous = self.state.swap(UNUSED, Ordering::Release);
        assert!(
            previous >= WRITE,
            "released a write lock that was not held (state {:#x})",
            previous
        );
    }

    /// Permanently disables the lock. It must not be held.
    pub(crate) fn deactivate(&self) {
        if let Err(current) =
            self.state
                .compare_exchange(UNUSED, INACTIVE, Ordering::AcqRel, Ordering::Acquire)
        {
            assert!(
                current & INACTIVE != 0,
                "deactivated a lock that is still held (state {:#x})",
                current
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_readers_share_the_lock() {
        let lock = NodeLock::new();
        lock.start_read();
        lock.start_read();
        check!(lock.state.load(Ordering::Relaxed) == 2);
        lock.end_read();
        lock.end_read();
        check!(lock.state.load(Ordering::Relaxed) == UNUSED);
    }

    #[test]
    fn test_write_then_read() {
        let lock = NodeLock::new();
        lock.start_write();
        check!(lock.state.load(Ordering::Relaxed) == WRITE);
        lock.end_write();
        lock.start_read();
        lock.end_read();
        check!(lock.state.load(Ordering::Relaxed) == UNUSED);
    }

    #[test]
    #[should_panic(expected = "released a read lock that was not held")]
    fn test_unbalanced_read_release_panics() {
        NodeLock::new().end_read();
    }

    #[test]
    #[should_panic(expected = "released a write lock that was not held")]
    fn test_unbalanced_write_release_panics() {
        NodeLock::new().end_write();
    }

    #[test]
    #[should_panic(expected = "deactivated a lock that is still held")]
    fn test_deactivate_held_lock_panics() {
        let lock = NodeLock::new();
        lock.start_read();
        lock.deactivate();
    }

    #[test]
    fn test_deactivated_lock_is_a_no_op() {
        let lock = NodeLock::new();
        lock.deactivate();
        check!(!lock.is_active());

        lock.start_write();
        lock.start_read();
        lock.end_read();
        lock.end_read();
        lock.end_write();
        lock.deactivate();
        check!(!lock.is_active());
    }

    #[test]
    fn test_writers_exclude_each_other() {
        let lock = Arc::new(NodeLock::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let lock = Arc::clone(&lock);
                let inside = Arc::clone(&inside);
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        lock.start_write();
                        check!(inside.fetch_add(1, Ordering::SeqCst) == 0);
                        inside.fetch_sub(1, Ordering::SeqCst);
                        lock.end_write();

                        lock.start_read();
                        lock.end_read();
                    }
                })
            })
            .collect();
        for handle in handles {
            check!(handle.join().is_ok());
        }
        check!(lock.state.load(Ordering::Relaxed) == UNUSED);
    }

    #[test]
    fn test_tally_is_not_reset_after_the_writer_released() {
        let lock = NodeLock::new();
        lock.state.store(READ_RESET_THRESHOLD + 3, Ordering::Relaxed);
        check!(!lock.reset_read_tally());
        check!(lock.state.load(Ordering::Relaxed) == READ_RESET_THRESHOLD + 3);

        lock.state.store(3, Ordering::Relaxed);
        check!(!lock.reset_read_tally());
        check!(lock.state.load(Ordering::Relaxed) == 3);
    }

    #[test]
    fn test_tally_reset_keeps_the_write_bit() {
        let lock = NodeLock::new();
        lock.state.store(WRITE | (READ_RESET_THRESHOLD + 3), Ordering::Relaxed);
        check!(lock.reset_read_tally());
        check!(lock.state.load(Ordering::Relaxed) == WRITE);

        lock.state.store(WRITE | COORDINATION | 5, Ordering::Relaxed);
        check!(!lock.reset_read_tally());
        check!(lock.state.load(Ordering::Relaxed) == WRITE | COORDINATION | 5);
    }

    #[test]
    fn test_stalled_reader_enters_after_write_release() {
        let lock = Arc::new(NodeLock::new());
        lock.state.store(WRITE | (READ_RESET_THRESHOLD + 1), Ordering::Relaxed);
        let reader = {
            let lock = Arc::clone(&lock);
            thread::spawn(move || {
                lock.start_read();
                lock.end_read();
            })
        };
        thread::sleep(Duration::from_millis(20));
        lock.end_write();
        check!(reader.join().is_ok());
        check!(lock.state.load(Ordering::Relaxed) == UNUSED);

        lock.start_write();
        check!(lock.state.load(Ordering::Relaxed) == WRITE);
        lock.end_write();
        check!(lock.state.load(Ordering::Relaxed) == UNUSED);
    }
}
