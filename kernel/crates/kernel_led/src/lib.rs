#![no_std]
extern crate alloc;

use core::fmt::{Display, Formatter};

use kernel_abi::{EINVAL, ENODEV, Errno};
use kernel_mmio::ResolveError;
use thiserror::Error;

mod controller;

pub use controller::*;

/// The logical state of the LED, independent of how it is wired.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Level {
    On,
    Off,
}

impl Level {
    pub const ON_BYTE: u8 = 1;
    pub const OFF_BYTE: u8 = 0;
}

impl TryFrom<u8> for Level {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            Self::ON_BYTE => Ok(Level::On),
            Self::OFF_BYTE => Ok(Level::Off),
            other => Err(other),
        }
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Level::On => f.write_str("on"),
            Level::Off => f.write_str("off"),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
pub enum ActuatorError {
    #[error("hardware unavailable: {0}")]
    HardwareUnavailable(#[from] ResolveError),
    #[error("the actuator is already initialized")]
    AlreadyInitialized,
    #[error("the actuator is not initialized")]
    NotInitialized,
    #[error("pin {0} does not exist on this port")]
    InvalidPin(u8),
    #[error("clock enable bit {0} does not exist")]
    InvalidClockBit(u8),
}

impl From<ActuatorError> for Errno {
    fn from(e: ActuatorError) -> Self {
        match e {
            ActuatorError::HardwareUnavailable(_) => ENODEV,
            ActuatorError::AlreadyInitialized
            | ActuatorError::NotInitialized
            | ActuatorError::InvalidPin(_)
            | ActuatorError::InvalidClockBit(_) => EINVAL,
        }
    }
}

/// Something that can drive the LED to a [`Level`].
pub trait Actuator: Send + Sync {
    /// # Errors
    /// Returns an error if the output is not ready to be driven.
    fn actuate(&self, level: Level) -> Result<(), ActuatorError>;
}
