// C-compatible FFI bindings for compiled Omni modules.
//
// Symbol names match what the generated modules link against.
//
// Safety requirements:
// - World pointers must come from the host (scsynth/supernova) or be null
// - Buffer pointers must come from `get_buffer_SC` and be checked for null
//   by the caller at the start of each perform call
// - A buffer pointer is only valid for the perform call that resolved it

use std::ffi::{c_int, c_long, c_void};
use std::sync::atomic::{AtomicPtr, Ordering};

use crate::buffer::BufferView;
use crate::lock::HostLock;
use crate::logging;
use crate::sndbuf::SndBuf;
use crate::world::{ResolveError, World, WorldRef};

use log::{LevelFilter, debug, error, info, warn};

#[cfg(feature = "supernova")]
use crate::lock::BufferLock;

// Default log level: info
const DEFAULT_LOG_LEVEL: u32 = 3;

// ═══════════════════════════════════════════════════════════════════════════
// Configuration
// ═══════════════════════════════════════════════════════════════════════════

/// Configuration for logger initialization.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct OmniConfig {
    /// 0 = off, 1 = error, 2 = warn, 3 = info, 4 = debug, 5 = trace.
    /// Larger values are treated as trace.
    pub log_level: u32,
}

impl OmniConfig {
    pub fn level_filter(&self) -> LevelFilter {
        match self.log_level {
            0 => LevelFilter::Off,
            1 => LevelFilter::Error,
            2 => LevelFilter::Warn,
            3 => LevelFilter::Info,
            4 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

impl Default for OmniConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL,
        }
    }
}

/// Get the default configuration values.
#[unsafe(no_mangle)]
pub extern "C" fn omni_default_config() -> OmniConfig {
    OmniConfig::default()
}

/// Install the platform logger.
///
/// Call once from the host's plugin load hook. Later calls are ignored.
///
/// # Safety
/// `config` must be a valid pointer to an `OmniConfig` or NULL (defaults).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn omni_init_logger(config: *const OmniConfig) {
    let cfg = if config.is_null() {
        OmniConfig::default()
    } else {
        unsafe { std::ptr::read(config) }
    };
    logging::init(cfg.level_filter());
}

// ═══════════════════════════════════════════════════════════════════════════
// World
// ═══════════════════════════════════════════════════════════════════════════

// Written once by the host at load time, before any perform call.
static SC_WORLD: AtomicPtr<c_void> = AtomicPtr::new(std::ptr::null_mut());

/// Cache the host world for modules that cannot receive it per call.
#[unsafe(export_name = "init_sc_world")]
pub extern "C" fn omni_init_world(world: *mut c_void) {
    info!("Calling init_world");

    if world.is_null() {
        error!("Invalid SCWorld");
    }

    SC_WORLD.store(world, Ordering::Release);
}

/// The cached host world, or NULL before `init_sc_world`.
#[unsafe(export_name = "get_sc_world")]
pub extern "C" fn omni_get_world() -> *mut c_void {
    SC_WORLD.load(Ordering::Acquire)
}

// ═══════════════════════════════════════════════════════════════════════════
// Buffer Resolution
// ═══════════════════════════════════════════════════════════════════════════

/// Resolve a buffer number to its record. Called at the start of perform.
///
/// Returns NULL for a null world, an unallocated buffer, or a local buffer.
/// Under supernova the returned record is share-locked; release it with
/// `unlock_buffer_SC`.
///
/// # Safety
/// `world` must be NULL or a live host `World*`.
#[unsafe(export_name = "get_buffer_SC")]
pub unsafe extern "C" fn omni_resolve_buffer(world: *mut c_void, fbufnum: f32) -> *mut c_void {
    let Some(world) = (unsafe { WorldRef::from_raw(world.cast::<World>(), HostLock::default()) })
    else {
        debug!("get_buffer_SC: {}", ResolveError::NullWorld);
        return std::ptr::null_mut();
    };

    match world.resolve(fbufnum) {
        Ok(buf) => buf.into_raw().cast(),
        Err(e) => {
            warn!("{}", e);
            std::ptr::null_mut()
        }
    }
}

/// Take a shared lock on a resolved buffer.
///
/// # Safety
/// `buf` must be a non-null record returned by `get_buffer_SC`.
#[cfg(feature = "supernova")]
#[unsafe(export_name = "lock_buffer_SC")]
pub unsafe extern "C" fn omni_lock_buffer(buf: *mut c_void) {
    if let Some(view) = unsafe { BufferView::from_raw(buf.cast::<SndBuf>()) } {
        HostLock::default().lock_shared(view.record());
    }
}

/// Release a shared lock taken by `get_buffer_SC` or `lock_buffer_SC`.
///
/// # Safety
/// `buf` must be a non-null record currently share-locked by this caller.
#[cfg(feature = "supernova")]
#[unsafe(export_name = "unlock_buffer_SC")]
pub unsafe extern "C" fn omni_unlock_buffer(buf: *mut c_void) {
    if let Some(view) = unsafe { BufferView::from_raw(buf.cast::<SndBuf>()) } {
        HostLock::default().unlock_shared(view.record());
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Samples
// ═══════════════════════════════════════════════════════════════════════════

// Every function below takes a record the caller already checked for null
// at the start of perform.

unsafe fn view<'a>(buf: *mut c_void) -> BufferView<'a> {
    unsafe { BufferView::from_raw(buf.cast::<SndBuf>()).unwrap_unchecked() }
}

/// Read the sample at `(index, channel)`. Out of range reads 0.
///
/// # Safety
/// `buf` must be a non-null record returned by `get_buffer_SC`.
#[unsafe(export_name = "get_float_value_buffer_SC")]
pub unsafe extern "C" fn omni_read_sample(buf: *mut c_void, index: c_long, channel: c_long) -> f32 {
    unsafe { view(buf) }.read(index, channel)
}

/// Write the sample at `(index, channel)`. Out of range is a no-op.
///
/// # Safety
/// `buf` must be a non-null record returned by `get_buffer_SC`.
#[unsafe(export_name = "set_float_value_buffer_SC")]
pub unsafe extern "C" fn omni_write_sample(
    buf: *mut c_void,
    value: f32,
    index: c_long,
    channel: c_long,
) {
    unsafe { view(buf) }.write(value, index, channel);
}

// ═══════════════════════════════════════════════════════════════════════════
// Metadata
// ═══════════════════════════════════════════════════════════════════════════

/// Length of each channel.
///
/// # Safety
/// `buf` must be a non-null record returned by `get_buffer_SC`.
#[unsafe(export_name = "get_frames_buffer_SC")]
pub unsafe extern "C" fn omni_buffer_frames(buf: *mut c_void) -> c_int {
    unsafe { view(buf) }.frames()
}

/// Total allocated length.
///
/// # Safety
/// `buf` must be a non-null record returned by `get_buffer_SC`.
#[unsafe(export_name = "get_samples_buffer_SC")]
pub unsafe extern "C" fn omni_buffer_samples(buf: *mut c_void) -> c_int {
    unsafe { view(buf) }.samples()
}

/// # Safety
/// `buf` must be a non-null record returned by `get_buffer_SC`.
#[unsafe(export_name = "get_channels_buffer_SC")]
pub unsafe extern "C" fn omni_buffer_channels(buf: *mut c_void) -> c_int {
    unsafe { view(buf) }.channels()
}

/// # Safety
/// `buf` must be a non-null record returned by `get_buffer_SC`.
#[unsafe(export_name = "get_samplerate_buffer_SC")]
pub unsafe extern "C" fn omni_buffer_sample_rate(buf: *mut c_void) -> f64 {
    unsafe { view(buf) }.sample_rate()
}

/// # Safety
/// `buf` must be a non-null record returned by `get_buffer_SC`.
#[unsafe(export_name = "get_sampledur_buffer_SC")]
pub unsafe extern "C" fn omni_buffer_sample_dur(buf: *mut c_void) -> f64 {
    unsafe { view(buf) }.sample_dur()
}
