// src/lib.rs
//
// Library entry point for compiled Omni modules running inside
// scsynth/supernova.

mod buffer;
mod lock;
mod logging;
mod sndbuf;
mod world;

pub mod ffi;


// Re-export key types for Rust consumers
pub use buffer::{BufferView, interleaved_offset};
#[cfg(feature = "supernova")]
pub use lock::{RwSpinlock, SharedSpinLock};
pub use lock::{BufferLock, HostLock, NoLock};
pub use sndbuf::SndBuf;
pub use world::{ResolveError, ResolveResult, SharedBuffer, World, WorldRef, buffer_index};
