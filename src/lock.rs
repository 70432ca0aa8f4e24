// src/lock.rs
//
// Shared locking of buffer records.
//
// scsynth runs all unit generators on one audio thread, so its buffers are
// never locked. supernova runs DSP on several threads and embeds a
// reader/writer spinlock in every SndBuf: buffer commands hold it
// exclusively while reallocating, readers hold it shared.

use crate::sndbuf::SndBuf;

/// Locking strategy applied when a buffer is resolved and released.
pub trait BufferLock: Clone + Default {
    fn lock_shared(&self, buf: &SndBuf);
    fn unlock_shared(&self, buf: &SndBuf);
}

/// scsynth: nothing to lock.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLock;

impl BufferLock for NoLock {
    #[inline]
    fn lock_shared(&self, _buf: &SndBuf) {}

    #[inline]
    fn unlock_shared(&self, _buf: &SndBuf) {}
}

/// supernova: take the lock word embedded in the record.
#[cfg(feature = "supernova")]
#[derive(Debug, Default, Clone, Copy)]
pub struct SharedSpinLock;

#[cfg(feature = "supernova")]
impl BufferLock for SharedSpinLock {
    #[inline]
    fn lock_shared(&self, buf: &SndBuf) {
        buf.lock.lock_shared();
    }

    #[inline]
    fn unlock_shared(&self, buf: &SndBuf) {
        buf.lock.unlock_shared();
    }
}

/// Strategy matching the host this library is built for.
#[cfg(feature = "supernova")]
pub type HostLock = SharedSpinLock;

/// Strategy matching the host this library is built for.
#[cfg(not(feature = "supernova"))]
pub type HostLock = NoLock;

#[cfg(feature = "supernova")]
pub use spinlock::RwSpinlock;

#[cfg(feature = "supernova")]
mod spinlock {
    use std::hint;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Layout mirror of supernova's `rw_spinlock`.
    ///
    /// One state word: the top bit marks a writer, the low 31 bits count
    /// readers.
    #[repr(C)]
    #[derive(Debug, Default)]
    pub struct RwSpinlock {
        state: AtomicU32,
    }

    impl RwSpinlock {
        const UNLOCKED: u32 = 0;
        const WRITER: u32 = 0x8000_0000;
        const READERS: u32 = 0x7fff_ffff;

        pub const fn new() -> Self {
            Self {
                state: AtomicU32::new(Self::UNLOCKED),
            }
        }

        pub fn lock_shared(&self) {
            loop {
                while self.state.load(Ordering::Relaxed) & Self::WRITER != 0 {
                    hint::spin_loop();
                }
                if self.try_lock_shared() {
                    return;
                }
            }
        }

        pub fn try_lock_shared(&self) -> bool {
            let previous = self.state.fetch_add(1, Ordering::Acquire);
            if previous & Self::WRITER == 0 {
                return true;
            }
            self.state.fetch_sub(1, Ordering::Release);
            false
        }

        pub fn unlock_shared(&self) {
            self.state.fetch_sub(1, Ordering::Release);
        }

        /// Exclusive acquire. Only the host's buffer commands do this.
        pub fn try_lock(&self) -> bool {
            self.state
                .compare_exchange(
                    Self::UNLOCKED,
                    Self::WRITER,
                    Ordering::Acquire,
                    Ordering::Relaxed,
                )
                .is_ok()
        }

        pub fn unlock(&self) {
            self.state.fetch_and(!Self::WRITER, Ordering::Release);
        }

        pub fn readers(&self) -> u32 {
            self.state.load(Ordering::Acquire) & Self::READERS
        }

        pub fn is_write_locked(&self) -> bool {
            self.state.load(Ordering::Acquire) & Self::WRITER != 0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::HostFixture;

    #[test]
    fn test_no_lock_is_inert() {
        let host = HostFixture::new(&[Some((1, vec![0.0; 4]))]);
        let buf = host.record(0);

        NoLock.lock_shared(buf);
        NoLock.lock_shared(buf);
        NoLock.unlock_shared(buf);
    }

    #[cfg(feature = "supernova")]
    #[test]
    fn test_shared_lock_counts_readers() {
        let host = HostFixture::new(&[Some((1, vec![0.0; 4]))]);
        let buf = host.record(0);

        SharedSpinLock.lock_shared(buf);
        SharedSpinLock.lock_shared(buf);
        assert_eq!(buf.lock.readers(), 2);

        SharedSpinLock.unlock_shared(buf);
        SharedSpinLock.unlock_shared(buf);
        assert_eq!(buf.lock.readers(), 0);
    }

    #[cfg(feature = "supernova")]
    #[test]
    fn test_writer_excludes_readers() {
        let lock = RwSpinlock::new();

        assert!(lock.try_lock_shared());
        assert!(!lock.try_lock());
        lock.unlock_shared();

        assert!(lock.try_lock());
        assert!(lock.is_write_locked());
        assert!(!lock.try_lock_shared());
        assert_eq!(lock.readers(), 0);

        lock.unlock();
        assert!(lock.try_lock_shared());
        assert_eq!(lock.readers(), 1);
    }
}
