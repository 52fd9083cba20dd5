#![no_std]
extern crate alloc;

mod channel;
mod config;
mod control;
mod device;
mod error;
pub mod fops;
pub mod ptr;
mod session;

pub use channel::*;
pub use config::*;
pub use control::*;
pub use device::*;
pub use error::*;
pub use session::*;
