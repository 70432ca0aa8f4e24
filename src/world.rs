// src/world.rs
//
// Borrowed access to the host's world and its global buffer table.
//
// The host hands every plugin a `World*` at load time. Only the leading
// fields up to the buffer table are mirrored here; the rest of the struct
// is never touched, so the prefix is all the layout this crate depends on.

use std::ffi::{c_int, c_void};
use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use crate::buffer::BufferView;
use crate::lock::{BufferLock, HostLock};
use crate::sndbuf::SndBuf;

/// Leading fields of the host's `World`.
#[repr(C)]
#[derive(Debug)]
pub struct World {
    pub hidden_world: *mut c_void,
    pub interface_table: *mut c_void,
    pub sample_rate: f64,
    pub buf_length: c_int,
    pub buf_counter: c_int,
    pub num_audio_bus_channels: u32,
    pub num_control_bus_channels: u32,
    pub num_inputs: u32,
    pub num_outputs: u32,
    pub audio_bus: *mut f32,
    pub control_bus: *mut f32,
    pub audio_bus_touched: *mut i32,
    pub control_bus_touched: *mut i32,
    /// Capacity of `snd_bufs`. Buffer numbers at or above this are local buffers.
    pub num_snd_bufs: u32,
    pub snd_bufs: *mut SndBuf,
}

/// Error during buffer resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveError {
    /// No world was supplied.
    NullWorld,

    /// The table slot exists but holds no sample data.
    Unallocated { bufnum: u32 },

    /// The number addresses a unit-local buffer, which needs the owning
    /// unit to resolve.
    LocalBuffer { bufnum: u32 },
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::NullWorld => write!(f, "Invalid world"),
            ResolveError::Unallocated { bufnum } => write!(f, "Invalid buffer: {}", bufnum),
            ResolveError::LocalBuffer { bufnum } => {
                write!(f, "local buffers are not yet supported (buffer {})", bufnum)
            }
        }
    }
}

impl std::error::Error for ResolveError {}

/// Result of buffer resolution.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Truncate a control-rate buffer number to a table index.
///
/// Follows C conversion to `int` then `uint32`: fractions drop, negative
/// numbers wrap into the local range, NaN becomes 0.
#[inline]
pub fn buffer_index(fbufnum: f32) -> u32 {
    fbufnum as i32 as u32
}

/// Borrowed handle to the host world, threaded through each call.
#[derive(Debug, Clone)]
pub struct WorldRef<'w, L: BufferLock = HostLock> {
    world: NonNull<World>,
    lock: L,
    _host: PhantomData<&'w World>,
}

impl<'w, L: BufferLock> WorldRef<'w, L> {
    /// Wrap a world pointer. Returns `None` for null.
    ///
    /// # Safety
    /// `world` must point to a live host `World` whose buffer table holds
    /// `num_snd_bufs` records for the whole of `'w`.
    pub unsafe fn from_raw(world: *mut World, lock: L) -> Option<Self> {
        NonNull::new(world).map(|world| Self {
            world,
            lock,
            _host: PhantomData,
        })
    }

    pub fn as_ptr(&self) -> *mut World {
        self.world.as_ptr()
    }

    fn header(&self) -> &World {
        unsafe { self.world.as_ref() }
    }

    pub fn sample_rate(&self) -> f64 {
        self.header().sample_rate
    }

    /// Capacity of the global buffer table.
    pub fn num_buffers(&self) -> u32 {
        self.header().num_snd_bufs
    }

    /// Look up a global buffer and take a shared lock on it.
    pub fn resolve(&self, fbufnum: f32) -> ResolveResult<SharedBuffer<'w, L>> {
        let bufnum = buffer_index(fbufnum);
        let world = self.header();

        if bufnum >= world.num_snd_bufs {
            return Err(ResolveError::LocalBuffer { bufnum });
        }

        let record = unsafe { world.snd_bufs.add(bufnum as usize) };
        let view = unsafe { BufferView::from_raw(record) }
            .ok_or(ResolveError::Unallocated { bufnum })?;

        if !view.record().is_allocated() {
            return Err(ResolveError::Unallocated { bufnum });
        }

        self.lock.lock_shared(view.record());
        Ok(SharedBuffer {
            view,
            lock: self.lock.clone(),
        })
    }
}

/// A resolved buffer holding its shared lock until dropped.
#[derive(Debug)]
pub struct SharedBuffer<'w, L: BufferLock = HostLock> {
    view: BufferView<'w>,
    lock: L,
}

impl<'w, L: BufferLock> SharedBuffer<'w, L> {
    /// Give up the guard without unlocking.
    ///
    /// The caller owns the shared lock and must release it with the same
    /// strategy (`unlock_buffer_SC` across the C boundary).
    pub fn into_raw(self) -> *mut SndBuf {
        let this = ManuallyDrop::new(self);
        this.view.as_ptr()
    }
}

impl<'w, L: BufferLock> Deref for SharedBuffer<'w, L> {
    type Target = BufferView<'w>;

    fn deref(&self) -> &Self::Target {
        &self.view
    }
}

impl<'w, L: BufferLock> DerefMut for SharedBuffer<'w, L> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.view
    }
}

impl<L: BufferLock> Drop for SharedBuffer<'_, L> {
    fn drop(&mut self) {
        self.lock.unlock_shared(self.view.record());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::NoLock;
    use crate::test::HostFixture;

    #[test]
    fn test_buffer_index_truncates() {
        assert_eq!(buffer_index(0.0), 0);
        assert_eq!(buffer_index(3.9), 3);
        assert_eq!(buffer_index(-1.0), u32::MAX);
        assert_eq!(buffer_index(f32::NAN), 0);
    }

    #[test]
    fn test_resolve_allocated_buffer() {
        let host = HostFixture::new(&[Some((1, vec![0.0; 4])), Some((2, vec![0.0; 8]))]);
        let world = host.world_ref(NoLock);

        let buf = world.resolve(1.7).unwrap();
        assert_eq!(buf.as_ptr(), host.record_ptr(1));
        assert_eq!(buf.channels(), 2);
    }

    #[test]
    fn test_resolve_unallocated_buffer() {
        let host = HostFixture::new(&[Some((1, vec![0.0; 4])), None]);
        let world = host.world_ref(NoLock);

        let err = world.resolve(1.0).unwrap_err();
        assert_eq!(err, ResolveError::Unallocated { bufnum: 1 });
    }

    #[test]
    fn test_resolve_local_buffer_range() {
        let host = HostFixture::new(&[Some((1, vec![0.0; 4]))]);
        let world = host.world_ref(NoLock);

        assert_eq!(
            world.resolve(1.0).unwrap_err(),
            ResolveError::LocalBuffer { bufnum: 1 }
        );
        assert_eq!(
            world.resolve(-1.0).unwrap_err(),
            ResolveError::LocalBuffer { bufnum: u32::MAX }
        );
    }

    #[test]
    fn test_null_world() {
        let world = unsafe { WorldRef::from_raw(std::ptr::null_mut(), NoLock) };
        assert!(world.is_none());
    }

    #[test]
    fn test_world_metadata() {
        let host = HostFixture::new(&[None, None, None]);
        let world = host.world_ref(NoLock);

        assert_eq!(world.num_buffers(), 3);
        assert_eq!(world.sample_rate(), HostFixture::SAMPLE_RATE);
    }

    #[cfg(feature = "supernova")]
    #[test]
    fn test_guard_releases_shared_lock() {
        use crate::lock::SharedSpinLock;

        let host = HostFixture::new(&[Some((1, vec![0.0; 4]))]);
        let world = host.world_ref(SharedSpinLock);

        {
            let _buf = world.resolve(0.0).unwrap();
            assert_eq!(host.record(0).lock.readers(), 1);
        }
        assert_eq!(host.record(0).lock.readers(), 0);

        let raw = world.resolve(0.0).unwrap().into_raw();
        assert_eq!(raw, host.record_ptr(0));
        assert_eq!(host.record(0).lock.readers(), 1);
        SharedSpinLock.unlock_shared(host.record(0));
    }
}
