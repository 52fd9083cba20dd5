use alloc::sync::Arc;
use core::fmt::{Display, Formatter};

use log::trace;

use crate::ptr::{UserRead, UserWrite};
use crate::{ChannelError, CharDevice, ControlCommand, ControlError, ControlReply, Whence};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SessionId(u64);

impl SessionId {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One open handle on a [`CharDevice`].
///
/// A session owns nothing but its position. All data lives in the device's
/// shared channel, so what one session writes another one reads.
pub struct Session {
    id: SessionId,
    device: Arc<CharDevice>,
    offset: i64,
}

impl Session {
    pub(crate) fn new(id: SessionId, device: Arc<CharDevice>) -> Self {
        Self {
            id,
            device,
            offset: 0,
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        self.offset
    }

    #[must_use]
    pub fn device(&self) -> &Arc<CharDevice> {
        &self.device
    }

    fn position(&self) -> Result<usize, ChannelError> {
        usize::try_from(self.offset).map_err(|_| ChannelError::InvalidOffset(self.offset))
    }

    fn advance(&mut self, n: usize) {
        // n never exceeds the capacity, which fits in an i32
        self.offset += n as i64;
    }

    /// Reads from the current position and advances past what was read.
    ///
    /// # Errors
    /// Returns an error if `dst` cannot be written. The position is
    /// unchanged in that case.
    pub fn read(&mut self, dst: &mut (impl UserWrite + ?Sized)) -> Result<usize, ChannelError> {
        let at = self.position()?;
        let n = self.device.channel().read(dst, at)?;
        self.advance(n);
        trace!("session {} read {n} bytes, now at {}", self.id, self.offset);
        Ok(n)
    }

    /// Writes at the current position and advances past what was written.
    ///
    /// # Errors
    /// Returns an error if the buffer is full from the current position on,
    /// or if `src` cannot be read. The position is unchanged in both cases.
    pub fn write(&mut self, src: &(impl UserRead + ?Sized)) -> Result<usize, ChannelError> {
        let at = self.position()?;
        let n = self.device.channel().write(src, at)?;
        self.advance(n);
        trace!("session {} wrote {n} bytes, now at {}", self.id, self.offset);
        Ok(n)
    }

    /// Moves the position and returns the new one.
    ///
    /// # Errors
    /// Returns an error if the target lies outside the buffer's capacity.
    /// The position is unchanged in that case.
    pub fn seek(&mut self, delta: i64, whence: Whence) -> Result<i64, ChannelError> {
        let target = self.device.channel().seek(self.offset, delta, whence)?;
        self.offset = target;
        Ok(target)
    }

    /// Runs an already decoded control command.
    ///
    /// # Errors
    /// See [`crate::DataChannel::control`].
    pub fn control(&mut self, command: ControlCommand) -> Result<ControlReply, ControlError> {
        trace!("session {} control {command:?}", self.id);
        self.device.channel().control(command)
    }

    /// Decodes and runs a raw control command, copying any reply value back
    /// into `arg`.
    ///
    /// # Errors
    /// Returns an error if the command is not supported, if it fails, or if
    /// `arg` cannot be accessed. A reply that cannot be copied back is
    /// reported as a fault even though the command itself took effect.
    pub fn ioctl<A>(&mut self, raw: u32, arg: &mut A) -> Result<ControlReply, ControlError>
    where
        A: UserRead + UserWrite + ?Sized,
    {
        let command = ControlCommand::decode(raw, &*arg)?;
        let reply = self.control(command)?;
        if let ControlReply::Value(value) = reply {
            arg.copy_from_kernel(&value.to_ne_bytes())?;
        }
        Ok(reply)
    }

    /// Closes the session. Dropping it has the same effect.
    pub fn release(self) {}
}

impl Drop for Session {
    fn drop(&mut self) {
        self.device.session_closed(self.id);
    }
}
