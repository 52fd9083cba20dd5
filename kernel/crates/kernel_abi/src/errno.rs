use core::ffi::c_int;
use core::fmt::{Display, Formatter};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(transparent)]
pub struct Errno(c_int);

impl Errno {
    #[must_use]
    pub const fn raw(self) -> c_int {
        self.0
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        errno_name(self.0)
    }
}

/// Errors travel back to the caller negated, the way a `read`/`write`
/// entry point reports them.
impl From<Errno> for isize {
    fn from(errno: Errno) -> Self {
        -(errno.0 as isize)
    }
}

impl From<Errno> for i64 {
    fn from(errno: Errno) -> Self {
        -i64::from(errno.0)
    }
}

impl Display for Errno {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} ({})", self.name(), self.0)
    }
}

macro_rules! n {
    ($($name:ident = $val:expr),*,) => {
        $(pub const $name: Errno = Errno($val);)*

        #[must_use]
        pub fn errno_name(n: c_int) -> &'static str {
            match n {
                $( $val => stringify!($name), )*
                _ => "<unknown>",
            }
        }
    };
}

n! {
    EPERM = 1,
    ENOENT = 2,
    EIO = 5,
    ENXIO = 6,
    EBADF = 9,
    EAGAIN = 11,
    ENOMEM = 12,
    EFAULT = 14,
    EBUSY = 16,
    ENODEV = 19,
    EINVAL = 22,
    ENOTTY = 25,
    ENOSPC = 28,
    ESPIPE = 29,
    ERANGE = 34,
}
