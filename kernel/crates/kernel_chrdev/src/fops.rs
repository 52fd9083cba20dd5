//! The entry points the host's file layer calls.
//!
//! Each one returns a byte count, a position or `0` on success and a
//! negated errno on failure.

use alloc::sync::Arc;

use kernel_abi::Errno;
use log::debug;

use crate::ptr::{UserRead, UserWrite};
use crate::{CharDevice, Session, Whence};

fn ret<T, E>(result: Result<T, E>, ok: impl FnOnce(T) -> isize) -> isize
where
    E: Into<Errno> + core::fmt::Display,
{
    match result {
        Ok(v) => ok(v),
        Err(e) => {
            debug!("{e}");
            let errno: Errno = e.into();
            isize::from(errno)
        }
    }
}

fn count(n: usize) -> isize {
    // bounded by the buffer capacity
    n as isize
}

#[must_use]
pub fn open(device: &Arc<CharDevice>) -> Session {
    device.open()
}

pub fn read(session: &mut Session, buf: &mut (impl UserWrite + ?Sized)) -> isize {
    ret(session.read(buf), count)
}

pub fn write(session: &mut Session, buf: &(impl UserRead + ?Sized)) -> isize {
    ret(session.write(buf), count)
}

pub fn llseek(session: &mut Session, offset: i64, whence: i32) -> i64 {
    let result = Whence::try_from(whence).and_then(|whence| session.seek(offset, whence));
    match result {
        Ok(position) => position,
        Err(e) => {
            debug!("{e}");
            i64::from(Errno::from(e))
        }
    }
}

pub fn unlocked_ioctl<A>(session: &mut Session, cmd: u32, arg: &mut A) -> isize
where
    A: UserRead + UserWrite + ?Sized,
{
    ret(session.ioctl(cmd, arg), |_| 0)
}

pub fn release(session: Session) -> isize {
    session.release();
    0
}
