#![no_std]

mod errno;
mod ioctl;
mod seek;

pub use errno::*;
pub use ioctl::*;
pub use seek::*;
