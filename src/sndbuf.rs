// src/sndbuf.rs
//
// C layout of the host's buffer record.
//
// Mirrors `SndBuf` from the SuperCollider plugin interface. Every instance
// lives in the host's buffer table; this crate only sees them through
// pointers handed out by the world.

use std::ffi::{c_int, c_void};

#[cfg(feature = "supernova")]
use crate::lock::RwSpinlock;

#[repr(C)]
#[derive(Debug)]
pub struct SndBuf {
    pub samplerate: f64,
    /// Reciprocal of `samplerate`.
    pub sampledur: f64,
    /// Interleaved storage, `samples` floats long. Null while unallocated.
    pub data: *mut f32,
    pub channels: c_int,
    /// `frames * channels`
    pub samples: c_int,
    pub frames: c_int,
    /// Delay line mask.
    pub mask: c_int,
    /// Interpolating oscillator mask.
    pub mask1: c_int,
    /// FFT coordinate system.
    pub coord: c_int,
    pub sndfile: *mut c_void,
    #[cfg(feature = "supernova")]
    pub is_local: bool,
    #[cfg(feature = "supernova")]
    pub lock: RwSpinlock,
}

impl SndBuf {
    #[inline]
    pub fn is_allocated(&self) -> bool {
        !self.data.is_null()
    }
}
