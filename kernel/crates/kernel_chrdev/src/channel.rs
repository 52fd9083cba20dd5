use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec;

use kernel_abi::{SEEK_CUR, SEEK_END, SEEK_SET};
use kernel_led::{Actuator, Level};
use log::{debug, error, trace, warn};

use crate::ChannelError;
use crate::ptr::{UserRead, UserWrite};

/// The origin a seek delta is applied to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Whence {
    Start,
    Current,
    /// The end of the buffer's capacity, not the end of the valid data.
    End,
}

impl TryFrom<i32> for Whence {
    type Error = ChannelError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            SEEK_SET => Ok(Whence::Start),
            SEEK_CUR => Ok(Whence::Current),
            SEEK_END => Ok(Whence::End),
            other => Err(ChannelError::InvalidWhence(other)),
        }
    }
}

/// The fixed-capacity byte store shared by every open session.
///
/// Bytes in `0..valid_length` are what readers see. Writes extend the valid
/// region but never shrink it; only [`DataChannel::clear`] and
/// [`DataChannel::force_valid_length`] can do that.
///
/// A write that covers the first byte forwards that byte to the actuator,
/// if there is one. `1` switches the LED on and `0` switches it off. Other
/// values are stored but do nothing else.
pub struct DataChannel {
    storage: Box<[u8]>,
    valid_length: usize,
    actuator: Option<Arc<dyn Actuator>>,
}

impl DataChannel {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            storage: vec![0; capacity].into_boxed_slice(),
            valid_length: 0,
            actuator: None,
        }
    }

    #[must_use]
    pub fn with_actuator(capacity: usize, actuator: Arc<dyn Actuator>) -> Self {
        Self {
            actuator: Some(actuator),
            ..Self::new(capacity)
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    #[must_use]
    pub fn valid_length(&self) -> usize {
        self.valid_length
    }

    #[must_use]
    pub fn has_actuator(&self) -> bool {
        self.actuator.is_some()
    }

    /// The valid region of the buffer.
    #[must_use]
    pub fn contents(&self) -> &[u8] {
        &self.storage[..self.valid_length]
    }

    /// Copies as much of `src` as fits between `at` and the end of the
    /// buffer, and returns the number of bytes stored.
    ///
    /// # Errors
    /// Returns [`ChannelError::CapacityExhausted`] if nothing fits, and
    /// [`ChannelError::CopyFault`] if `src` cannot be read. In both cases
    /// the valid length is unchanged.
    pub fn write(&mut self, src: &(impl UserRead + ?Sized), at: usize) -> Result<usize, ChannelError> {
        let n = src.len().min(self.capacity().saturating_sub(at));
        if n == 0 {
            warn!(
                "no space to write {} bytes at offset {at} (capacity {})",
                src.len(),
                self.capacity()
            );
            return Err(ChannelError::CapacityExhausted);
        }

        src.copy_to_kernel(&mut self.storage[at..at + n])?;
        self.valid_length = self.valid_length.max(at + n);
        trace!("wrote {n} bytes at offset {at}, valid length {}", self.valid_length);

        if at == 0 {
            self.actuate(self.storage[0]);
        }

        Ok(n)
    }

    /// Copies valid bytes starting at `at` into `dst` and returns how many
    /// were copied. Returns `0` at or past the end of the valid data.
    ///
    /// # Errors
    /// Returns an error if `dst` cannot be written.
    pub fn read(&self, dst: &mut (impl UserWrite + ?Sized), at: usize) -> Result<usize, ChannelError> {
        let n = dst.len().min(self.valid_length.saturating_sub(at));
        if n == 0 {
            debug!("end of data at offset {at}");
            return Ok(0);
        }

        dst.copy_from_kernel(&self.storage[at..at + n])?;
        trace!("read {n} bytes at offset {at}");
        Ok(n)
    }

    /// Computes the position a seek from `current` lands on.
    ///
    /// # Errors
    /// Returns an error if `current` or the result fall outside
    /// `0..=capacity`.
    pub fn seek(&self, current: i64, delta: i64, whence: Whence) -> Result<i64, ChannelError> {
        let capacity = i64::try_from(self.capacity()).map_err(|_| ChannelError::InvalidOffset(delta))?;
        if !(0..=capacity).contains(&current) {
            warn!("seeking from position {current}, which is outside the buffer");
            return Err(ChannelError::InvalidOffset(current));
        }
        let base = match whence {
            Whence::Start => 0,
            Whence::Current => current,
            Whence::End => capacity,
        };
        let target = base
            .checked_add(delta)
            .ok_or(ChannelError::InvalidOffset(delta))?;
        if !(0..=capacity).contains(&target) {
            debug!("rejecting seek to {target} ({whence:?} {delta:+})");
            return Err(ChannelError::InvalidOffset(target));
        }
        Ok(target)
    }

    /// Zeroes the whole buffer and forgets all valid data.
    pub fn clear(&mut self) {
        self.storage.fill(0);
        self.valid_length = 0;
    }

    /// Overrides the valid length without touching the bytes.
    ///
    /// Returns `false` and changes nothing if `len` exceeds the capacity.
    pub fn force_valid_length(&mut self, len: usize) -> bool {
        if len > self.capacity() {
            return false;
        }
        self.valid_length = len;
        true
    }

    fn actuate(&self, byte: u8) {
        let Some(actuator) = &self.actuator else {
            return;
        };
        match Level::try_from(byte) {
            Ok(level) => {
                if let Err(e) = actuator.actuate(level) {
                    error!("failed to switch the LED {level}: {e}");
                }
            }
            Err(other) => warn!("ignoring actuation request {other:#04x}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use kernel_led::ActuatorError;
    use spin::Mutex;

    use super::*;
    use crate::ptr::CopyFault;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Level>>);

    impl Actuator for Recorder {
        fn actuate(&self, level: Level) -> Result<(), ActuatorError> {
            self.0.lock().push(level);
            Ok(())
        }
    }

    struct Unreadable(usize);

    impl UserRead for Unreadable {
        fn len(&self) -> usize {
            self.0
        }

        fn copy_to_kernel(&self, dst: &mut [u8]) -> Result<(), CopyFault> {
            Err(CopyFault {
                addr: 0xdead_0000,
                len: dst.len(),
            })
        }
    }

    #[test]
    fn test_write_then_read() {
        let mut channel = DataChannel::new(16);
        assert_eq!(Ok(5), channel.write(&b"hello"[..], 0));
        assert_eq!(5, channel.valid_length());

        let mut out = [0u8; 16];
        assert_eq!(Ok(5), channel.read(&mut out[..], 0));
        assert_eq!(b"hello", &out[..5]);
        assert_eq!(Ok(3), channel.read(&mut out[..], 2));
        assert_eq!(b"llo", &out[..3]);
        assert_eq!(Ok(0), channel.read(&mut out[..], 5));
        assert_eq!(Ok(0), channel.read(&mut out[..], 12));
    }

    #[test]
    fn test_round_trip_any_length() {
        let capacity = 64;
        for n in 1..=capacity {
            let mut channel = DataChannel::new(capacity);
            let data: Vec<u8> = (0..n).map(|i| (i * 7 + n) as u8).collect();
            assert_eq!(Ok(n), channel.write(&data[..], 0));

            let mut out = vec![0u8; n];
            assert_eq!(Ok(n), channel.read(&mut out[..], 0));
            assert_eq!(data, out);
        }
    }

    #[test]
    fn test_write_is_truncated_at_capacity() {
        let mut channel = DataChannel::new(8);
        assert_eq!(Ok(2), channel.write(&b"abcdef"[..], 6));
        assert_eq!(8, channel.valid_length());
        assert_eq!([0, 0, 0, 0, 0, 0, b'a', b'b'], channel.contents());

        assert_eq!(Err(ChannelError::CapacityExhausted), channel.write(&b"x"[..], 8));
        assert_eq!(Err(ChannelError::CapacityExhausted), channel.write(&b"x"[..], 9));
        assert_eq!(Err(ChannelError::CapacityExhausted), channel.write(&b"xyz"[..], usize::MAX));
        assert_eq!(Err(ChannelError::CapacityExhausted), channel.write(&b""[..], 0));
        assert_eq!(8, channel.valid_length());
        assert_eq!([0, 0, 0, 0, 0, 0, b'a', b'b'], channel.contents());
    }

    #[test]
    fn test_write_past_capacity_keeps_partial_data() {
        let mut channel = DataChannel::new(8);
        channel.write(&b"abc"[..], 0).unwrap();
        assert_eq!(Err(ChannelError::CapacityExhausted), channel.write(&b"zz"[..], 9));
        assert_eq!(3, channel.valid_length());
        assert_eq!(b"abc", channel.contents());
    }

    #[test]
    fn test_overwrite_keeps_valid_length() {
        let mut channel = DataChannel::new(16);
        channel.write(&b"0123456789"[..], 0).unwrap();
        channel.write(&b"ab"[..], 2).unwrap();
        assert_eq!(10, channel.valid_length());
        assert_eq!(b"01ab456789", channel.contents());
    }

    #[test]
    fn test_copy_fault_leaves_state_alone() {
        let mut channel = DataChannel::new(16);
        channel.write(&b"abc"[..], 0).unwrap();
        assert!(matches!(
            channel.write(&Unreadable(10), 0),
            Err(ChannelError::CopyFault(_))
        ));
        assert_eq!(b"abc", channel.contents());

        let mut short = [0u8; 0];
        assert_eq!(Ok(0), channel.read(&mut short[..], 0));
    }

    #[test]
    fn test_clear() {
        let mut channel = DataChannel::new(4);
        channel.write(&b"abcd"[..], 0).unwrap();
        channel.clear();
        assert_eq!(0, channel.valid_length());
        assert!(channel.force_valid_length(4));
        assert_eq!([0, 0, 0, 0], channel.contents());
    }

    #[test]
    fn test_force_valid_length() {
        let mut channel = DataChannel::new(4);
        assert!(!channel.force_valid_length(5));
        assert_eq!(0, channel.valid_length());
        assert!(channel.force_valid_length(3));
        assert_eq!(3, channel.valid_length());
    }

    #[test]
    fn test_seek() {
        let channel = DataChannel::new(100);
        assert_eq!(Ok(10), channel.seek(50, 10, Whence::Start));
        assert_eq!(Ok(60), channel.seek(50, 10, Whence::Current));
        assert_eq!(Ok(100), channel.seek(50, 0, Whence::End));
        assert_eq!(Ok(90), channel.seek(50, -10, Whence::End));
        assert_eq!(Err(ChannelError::InvalidOffset(101)), channel.seek(0, 1, Whence::End));
        assert_eq!(Err(ChannelError::InvalidOffset(-1)), channel.seek(0, -1, Whence::Current));
        assert!(channel.seek(50, i64::MAX, Whence::Current).is_err());
        assert_eq!(Err(ChannelError::InvalidOffset(101)), channel.seek(101, 0, Whence::Start));
        assert_eq!(Err(ChannelError::InvalidOffset(-4)), channel.seek(-4, 0, Whence::End));
    }

    #[test]
    fn test_seek_end_ignores_valid_length() {
        let mut channel = DataChannel::new(100);
        channel.write(&b"partial"[..], 0).unwrap();
        assert_eq!(7, channel.valid_length());

        assert_eq!(Ok(100), channel.seek(0, 0, Whence::End));
        assert_eq!(Ok(95), channel.seek(3, -5, Whence::End));
        assert_eq!(Err(ChannelError::InvalidOffset(101)), channel.seek(0, 1, Whence::End));
        assert_eq!(7, channel.valid_length());
    }

    #[test]
    fn test_whence_from_raw() {
        assert_eq!(Ok(Whence::Start), Whence::try_from(0));
        assert_eq!(Ok(Whence::Current), Whence::try_from(1));
        assert_eq!(Ok(Whence::End), Whence::try_from(2));
        assert_eq!(Err(ChannelError::InvalidWhence(3)), Whence::try_from(3));
    }

    #[test]
    fn test_first_byte_drives_actuator() {
        let recorder = Arc::new(Recorder::default());
        let mut channel = DataChannel::with_actuator(8, recorder.clone());

        channel.write(&[1u8][..], 0).unwrap();
        channel.write(&[0u8, 1, 1][..], 0).unwrap();
        channel.write(&[7u8][..], 0).unwrap();
        channel.write(&[1u8][..], 1).unwrap();

        assert_eq!(&[Level::On, Level::Off], &recorder.0.lock()[..]);
        assert_eq!([7, 1, 1], channel.contents());
    }
}
