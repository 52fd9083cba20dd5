use kernel_abi::{EFAULT, EINVAL, ENOSPC, ENOTTY, Errno};
use thiserror::Error;

use crate::ptr::CopyFault;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
pub enum ChannelError {
    #[error("no space left in the buffer")]
    CapacityExhausted,
    #[error("offset {0} is outside the buffer")]
    InvalidOffset(i64),
    #[error("unknown seek origin {0}")]
    InvalidWhence(i32),
    #[error("copy fault")]
    CopyFault(#[from] CopyFault),
}

impl From<ChannelError> for Errno {
    fn from(e: ChannelError) -> Self {
        match e {
            ChannelError::CapacityExhausted => ENOSPC,
            ChannelError::InvalidOffset(_) | ChannelError::InvalidWhence(_) => EINVAL,
            ChannelError::CopyFault(_) => EFAULT,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
pub enum ControlError {
    #[error("unsupported control command {0:#010x}")]
    Unsupported(u32),
    #[error("valid length {0} is outside the buffer")]
    InvalidLength(i32),
    #[error("copy fault")]
    CopyFault(#[from] CopyFault),
}

impl From<ControlError> for Errno {
    fn from(e: ControlError) -> Self {
        match e {
            ControlError::Unsupported(_) => ENOTTY,
            ControlError::InvalidLength(_) => EINVAL,
            ControlError::CopyFault(_) => EFAULT,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
pub enum ConfigError {
    #[error("the buffer capacity must not be zero")]
    ZeroCapacity,
    #[error("a buffer capacity of {0} bytes cannot be reported to callers")]
    CapacityTooLarge(usize),
    #[error("the device needs at least one minor number")]
    NoMinors,
}

impl From<ConfigError> for Errno {
    fn from(_: ConfigError) -> Self {
        EINVAL
    }
}
