// src/buffer.rs
//
// Typed, non-owning view over a host buffer record.
//
// Samples are interleaved: frame by frame, ch0..chN. Addressing outside
// the record yields silence on read and is dropped on write; signal code
// hits those edges routinely, so nothing here logs.

use std::ffi::{c_int, c_long};
use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::sndbuf::SndBuf;

/// Borrowed view of one `SndBuf`, valid for the enclosing processing call.
#[derive(Debug)]
pub struct BufferView<'a> {
    buf: NonNull<SndBuf>,
    _host: PhantomData<&'a SndBuf>,
}

impl<'a> BufferView<'a> {
    /// Wrap a record pointer. Returns `None` for null.
    ///
    /// # Safety
    /// `buf` must point to a live `SndBuf` whose `data` holds at least
    /// `samples` floats, and the host must not reallocate it during `'a`.
    #[inline]
    pub unsafe fn from_raw(buf: *mut SndBuf) -> Option<Self> {
        NonNull::new(buf).map(|buf| Self {
            buf,
            _host: PhantomData,
        })
    }

    #[inline]
    pub fn as_ptr(&self) -> *mut SndBuf {
        self.buf.as_ptr()
    }

    #[inline]
    pub fn record(&self) -> &SndBuf {
        unsafe { self.buf.as_ref() }
    }

    /// Samples per channel.
    #[inline]
    pub fn frames(&self) -> c_int {
        self.record().frames
    }

    /// Total interleaved samples.
    #[inline]
    pub fn samples(&self) -> c_int {
        self.record().samples
    }

    #[inline]
    pub fn channels(&self) -> c_int {
        self.record().channels
    }

    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.record().samplerate
    }

    #[inline]
    pub fn sample_dur(&self) -> f64 {
        self.record().sampledur
    }

    /// Storage offset of `(frame, channel)` if it lies inside the record.
    #[inline]
    pub fn offset(&self, frame: c_long, channel: c_long) -> Option<usize> {
        let record = self.record();
        if record.data.is_null() {
            return None;
        }
        interleaved_offset(record.channels, record.samples, frame, channel)
    }

    /// Read one sample, or 0.0 when out of range.
    #[inline]
    pub fn read(&self, frame: c_long, channel: c_long) -> f32 {
        match self.offset(frame, channel) {
            Some(offset) => unsafe { *self.record().data.add(offset) },
            None => 0.0,
        }
    }

    /// Write one sample. Out-of-range writes are dropped.
    #[inline]
    pub fn write(&mut self, value: f32, frame: c_long, channel: c_long) {
        if let Some(offset) = self.offset(frame, channel) {
            unsafe { *self.record().data.add(offset) = value };
        }
    }
}

/// Offset of `(frame, channel)` in interleaved storage of `samples` floats.
///
/// Mono buffers ignore `channel`. Negative frames, negative offsets and
/// arithmetic overflow are all out of range.
#[inline]
pub fn interleaved_offset(
    channels: c_int,
    samples: c_int,
    frame: c_long,
    channel: c_long,
) -> Option<usize> {
    let frame = i64::from(frame);
    if frame < 0 {
        return None;
    }

    let offset = if channels == 1 {
        frame
    } else {
        frame
            .checked_mul(i64::from(channels))?
            .checked_add(i64::from(channel))?
    };

    if offset < 0 || offset >= i64::from(samples) {
        return None;
    }
    usize::try_from(offset).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::HostFixture;

    #[test]
    fn test_mono_offset_ignores_channel() {
        assert_eq!(interleaved_offset(1, 8, 5, 0), Some(5));
        assert_eq!(interleaved_offset(1, 8, 5, 3), Some(5));
        assert_eq!(interleaved_offset(1, 8, 8, 0), None);
    }

    #[test]
    fn test_interleaved_offset() {
        assert_eq!(interleaved_offset(2, 8, 0, 0), Some(0));
        assert_eq!(interleaved_offset(2, 8, 2, 1), Some(5));
        assert_eq!(interleaved_offset(3, 12, 3, 2), Some(11));
        assert_eq!(interleaved_offset(3, 12, 4, 0), None);
    }

    #[test]
    fn test_offset_rejects_negative_and_overflow() {
        assert_eq!(interleaved_offset(2, 8, -1, 0), None);
        assert_eq!(interleaved_offset(2, 8, 0, -1), None);
        assert_eq!(interleaved_offset(2, 8, c_long::MAX, 1), None);
        assert_eq!(interleaved_offset(1, 0, 0, 0), None);
    }

    #[test]
    fn test_read_out_of_range_is_silent() {
        let host = HostFixture::new(&[Some((2, vec![1.0; 8]))]);
        let view = host.view(0);

        assert_eq!(view.read(-1, 0), 0.0);
        assert_eq!(view.read(4, 0), 0.0);
        assert_eq!(view.read(3, 2), 0.0);
        assert_eq!(view.read(3, 1), 1.0);
    }

    #[test]
    fn test_write_out_of_range_is_dropped() {
        let host = HostFixture::new(&[Some((2, vec![0.5; 8]))]);
        let mut view = host.view(0);

        view.write(7.0, 4, 0);
        view.write(7.0, -2, 1);
        view.write(7.0, 0, -1);

        assert!(host.data(0).iter().all(|&s| s == 0.5));
    }

    #[test]
    fn test_mono_write_then_read() {
        let host = HostFixture::new(&[Some((1, vec![0.0; 4]))]);
        let mut view = host.view(0);

        view.write(0.25, 3, 0);
        assert_eq!(view.read(3, 0), 0.25);
        assert_eq!(host.data(0), &[0.0, 0.0, 0.0, 0.25]);
    }

    #[test]
    fn test_null_data_reads_silence() {
        let host = HostFixture::new(&[None]);
        let mut view = host.view(0);

        view.write(1.0, 0, 0);
        assert_eq!(view.read(0, 0), 0.0);
    }

    #[test]
    fn test_metadata_passthrough() {
        let host = HostFixture::new(&[Some((3, vec![0.0; 30]))]);
        let view = host.view(0);

        assert_eq!(view.frames(), 10);
        assert_eq!(view.samples(), 30);
        assert_eq!(view.channels(), 3);
        assert_eq!(view.sample_rate(), HostFixture::SAMPLE_RATE);
        assert_eq!(view.sample_dur(), 1.0 / HostFixture::SAMPLE_RATE);
    }
}
