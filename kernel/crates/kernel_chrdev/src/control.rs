//! The out-of-band control interface.
//!
//! Commands are raw ioctl numbers in the `'k'` domain. A number is only
//! accepted if its domain, sequence number, direction and argument size all
//! match one of the commands below.

use alloc::format;
use core::ffi::c_int;

use itertools::Itertools;
use kernel_abi::{IoctlCmd, io, ior, iowr};
use log::{debug, info};

use crate::ptr::UserRead;
use crate::{ControlError, DataChannel};

pub const CHRDEV_IOC_MAGIC: u8 = b'k';

const ARG_SIZE: u32 = size_of::<c_int>() as u32;

pub const CLEAR_BUF: u32 = io(CHRDEV_IOC_MAGIC, 0);
pub const GET_BUF_SIZE: u32 = ior(CHRDEV_IOC_MAGIC, 1, ARG_SIZE);
pub const GET_DATA_LEN: u32 = ior(CHRDEV_IOC_MAGIC, 2, ARG_SIZE);
pub const UPDATE_DATA_LEN: u32 = iowr(CHRDEV_IOC_MAGIC, 3, ARG_SIZE);
pub const DUMP_BUF: u32 = io(CHRDEV_IOC_MAGIC, 4);

/// The highest sequence number in use.
pub const CHRDEV_IOC_MAXNR: u8 = 4;

/// Written back to the caller after a successful [`UPDATE_DATA_LEN`].
pub const UPDATE_ACK: c_int = 12_345_678;

const DUMP_TARGET: &str = "kernel_chrdev::dump";
const DUMP_LINE: usize = 16;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ControlCommand {
    ClearBuffer,
    GetCapacity,
    GetValidLength,
    SetValidLength(c_int),
    DumpBuffer,
}

impl ControlCommand {
    /// Decodes a raw command number, reading the input argument from `arg`
    /// where the command takes one.
    ///
    /// # Errors
    /// Returns [`ControlError::Unsupported`] for numbers outside the domain
    /// or with the wrong shape, and [`ControlError::CopyFault`] if the
    /// argument cannot be read.
    pub fn decode(raw: u32, arg: &(impl UserRead + ?Sized)) -> Result<Self, ControlError> {
        let cmd = IoctlCmd::from(raw);
        if cmd.kind() != CHRDEV_IOC_MAGIC || cmd.nr() > CHRDEV_IOC_MAXNR {
            debug!("rejecting control command {cmd:?}");
            return Err(ControlError::Unsupported(raw));
        }

        Ok(match raw {
            CLEAR_BUF => Self::ClearBuffer,
            GET_BUF_SIZE => Self::GetCapacity,
            GET_DATA_LEN => Self::GetValidLength,
            UPDATE_DATA_LEN => {
                let mut bytes = [0; size_of::<c_int>()];
                arg.copy_to_kernel(&mut bytes)?;
                Self::SetValidLength(c_int::from_ne_bytes(bytes))
            }
            DUMP_BUF => Self::DumpBuffer,
            _ => {
                debug!("control command {cmd:?} has the wrong direction or size");
                return Err(ControlError::Unsupported(raw));
            }
        })
    }

    #[must_use]
    pub fn raw(self) -> u32 {
        match self {
            Self::ClearBuffer => CLEAR_BUF,
            Self::GetCapacity => GET_BUF_SIZE,
            Self::GetValidLength => GET_DATA_LEN,
            Self::SetValidLength(_) => UPDATE_DATA_LEN,
            Self::DumpBuffer => DUMP_BUF,
        }
    }
}

/// What a command hands back to the caller.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ControlReply {
    Done,
    /// Copied to the caller's argument.
    Value(c_int),
}

impl DataChannel {
    /// # Errors
    /// Returns [`ControlError::InvalidLength`] if a new valid length is
    /// negative or larger than the capacity. Nothing changes in that case.
    pub fn control(&mut self, command: ControlCommand) -> Result<ControlReply, ControlError> {
        match command {
            ControlCommand::ClearBuffer => {
                self.clear();
                debug!("buffer cleared");
                Ok(ControlReply::Done)
            }
            ControlCommand::GetCapacity => Ok(ControlReply::Value(saturate(self.capacity()))),
            ControlCommand::GetValidLength => {
                Ok(ControlReply::Value(saturate(self.valid_length())))
            }
            ControlCommand::SetValidLength(len) => {
                let accepted = usize::try_from(len).is_ok_and(|len| self.force_valid_length(len));
                if !accepted {
                    return Err(ControlError::InvalidLength(len));
                }
                debug!("valid length forced to {len}");
                Ok(ControlReply::Value(UPDATE_ACK))
            }
            ControlCommand::DumpBuffer => {
                self.dump();
                Ok(ControlReply::Done)
            }
        }
    }

    fn dump(&self) {
        let contents = self.contents();
        info!(
            target: DUMP_TARGET,
            "{} of {} bytes valid",
            contents.len(),
            self.capacity()
        );
        for (line, chunk) in contents.chunks(DUMP_LINE).enumerate() {
            info!(
                target: DUMP_TARGET,
                "{:08x}: {}",
                line * DUMP_LINE,
                chunk.iter().map(|b| format!("{b:02x}")).join(" ")
            );
        }
    }
}

fn saturate(value: usize) -> c_int {
    c_int::try_from(value).unwrap_or(c_int::MAX)
}

#[cfg(test)]
mod tests {
    use kernel_abi::{IoctlDir, ioc, iow};

    use super::*;

    const NO_ARG: [u8; 0] = [];

    #[test]
    fn test_command_numbers() {
        assert_eq!(0x0000_6b00, CLEAR_BUF);
        assert_eq!(0x8004_6b01, GET_BUF_SIZE);
        assert_eq!(0x8004_6b02, GET_DATA_LEN);
        assert_eq!(0xc004_6b03, UPDATE_DATA_LEN);
        assert_eq!(0x0000_6b04, DUMP_BUF);
    }

    #[test]
    fn test_decode() {
        assert_eq!(Ok(ControlCommand::ClearBuffer), ControlCommand::decode(CLEAR_BUF, &NO_ARG[..]));
        assert_eq!(Ok(ControlCommand::DumpBuffer), ControlCommand::decode(DUMP_BUF, &NO_ARG[..]));
        assert_eq!(
            Ok(ControlCommand::SetValidLength(20)),
            ControlCommand::decode(UPDATE_DATA_LEN, &20i32.to_ne_bytes()[..])
        );
        for command in [
            ControlCommand::ClearBuffer,
            ControlCommand::GetCapacity,
            ControlCommand::GetValidLength,
            ControlCommand::DumpBuffer,
        ] {
            assert_eq!(Ok(command), ControlCommand::decode(command.raw(), &NO_ARG[..]));
        }
    }

    #[test]
    fn test_decode_rejects() {
        let other_domain = io(b'x', 0);
        assert_eq!(
            Err(ControlError::Unsupported(other_domain)),
            ControlCommand::decode(other_domain, &NO_ARG[..])
        );

        let past_max = io(CHRDEV_IOC_MAGIC, CHRDEV_IOC_MAXNR + 1);
        assert_eq!(
            Err(ControlError::Unsupported(past_max)),
            ControlCommand::decode(past_max, &NO_ARG[..])
        );

        let wrong_dir = iow(CHRDEV_IOC_MAGIC, 1, ARG_SIZE);
        assert_eq!(
            Err(ControlError::Unsupported(wrong_dir)),
            ControlCommand::decode(wrong_dir, &NO_ARG[..])
        );

        let wrong_size = ioc(IoctlDir::READ, CHRDEV_IOC_MAGIC, 2, 8);
        assert_eq!(
            Err(ControlError::Unsupported(wrong_size)),
            ControlCommand::decode(wrong_size, &NO_ARG[..])
        );

        assert!(matches!(
            ControlCommand::decode(UPDATE_DATA_LEN, &[1u8, 2][..]),
            Err(ControlError::CopyFault(_))
        ));
    }

    #[test]
    fn test_getters() {
        let mut channel = DataChannel::new(64);
        channel.write(&b"abc"[..], 0).unwrap();
        assert_eq!(Ok(ControlReply::Value(64)), channel.control(ControlCommand::GetCapacity));
        assert_eq!(Ok(ControlReply::Value(3)), channel.control(ControlCommand::GetValidLength));
    }

    #[test]
    fn test_clear_command() {
        let mut channel = DataChannel::new(8);
        channel.write(&b"abcdefgh"[..], 0).unwrap();
        assert_eq!(Ok(ControlReply::Done), channel.control(ControlCommand::ClearBuffer));
        assert_eq!(0, channel.valid_length());
        assert_eq!(Ok(ControlReply::Done), channel.control(ControlCommand::DumpBuffer));
    }

    #[test]
    fn test_set_valid_length() {
        let mut channel = DataChannel::new(40);
        assert_eq!(
            Ok(ControlReply::Value(UPDATE_ACK)),
            channel.control(ControlCommand::SetValidLength(20))
        );
        assert_eq!(20, channel.valid_length());
        assert_eq!(
            Ok(ControlReply::Value(UPDATE_ACK)),
            channel.control(ControlCommand::SetValidLength(40))
        );

        assert_eq!(
            Err(ControlError::InvalidLength(41)),
            channel.control(ControlCommand::SetValidLength(41))
        );
        assert_eq!(
            Err(ControlError::InvalidLength(-1)),
            channel.control(ControlCommand::SetValidLength(-1))
        );
        assert_eq!(40, channel.valid_length());
    }
}
