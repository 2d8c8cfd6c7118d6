//! Decoding of raw system call results.
//!
//! The kernel returns a single register: non-negative values are results, values in
//! `-4095..=-1` are negated `errno` codes. Raw wrappers in [`crate::raw`] hand that value back
//! untouched; [`check`] splits it into Rust's `Result`.
//!
//! Errno values below are identical on x86_64, aarch64 and riscv64 (asm-generic `errno-base.h`
//! and `errno.h`).

/// Largest errno the kernel encodes in a syscall return value.
const MAX_ERRNO: isize = 4095;

/// Type alias for Result with [`Errno`] as the default error type.
pub type Result<T, E = Errno> = core::result::Result<T, E>;

/// A Linux `errno` value, always positive.
#[derive(Copy, Clone, Eq, PartialEq, thiserror::Error)]
#[error("{} ({})", errno_name(.0), .0)]
#[repr(transparent)]
pub struct Errno(i32);

impl Errno {
    /// Operation not permitted
    pub const EPERM: Errno = Errno(1);
    /// Interrupted system call
    pub const EINTR: Errno = Errno(4);
    /// Try again
    pub const EAGAIN: Errno = Errno(11);
    /// Bad address
    pub const EFAULT: Errno = Errno(14);
    /// Invalid argument
    pub const EINVAL: Errno = Errno(22);
    /// Function not implemented
    pub const ENOSYS: Errno = Errno(38);
    /// Connection timed out
    pub const ETIMEDOUT: Errno = Errno(110);

    /// Creates an [`Errno`] from a positive errno value.
    #[inline]
    pub const fn from_raw(value: i32) -> Self {
        Self(value)
    }

    /// Returns the positive errno value.
    #[inline]
    pub const fn to_raw(self) -> i32 {
        self.0
    }

    /// Returns the symbolic name for the errno values the stub distinguishes.
    pub const fn name(&self) -> &'static str {
        errno_name(&self.0)
    }
}

impl core::fmt::Debug for Errno {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Errno")
            .field(&format_args!("{}", self.name()))
            .field(&self.0)
            .finish()
    }
}

const fn errno_name(value: &i32) -> &'static str {
    match *value {
        1 => "EPERM",
        4 => "EINTR",
        11 => "EAGAIN",
        14 => "EFAULT",
        22 => "EINVAL",
        38 => "ENOSYS",
        110 => "ETIMEDOUT",
        _ => "errno",
    }
}

/// Splits a raw syscall return value into a result or an [`Errno`].
#[inline]
pub const fn check(ret: isize) -> Result<usize> {
    if ret < 0 && ret >= -MAX_ERRNO {
        Err(Errno((-ret) as i32))
    } else {
        Ok(ret as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_errno_range_is_an_error() {
        assert_eq!(check(-11), Err(Errno::EAGAIN));
        assert_eq!(check(-4095), Err(Errno::from_raw(4095)));
    }

    #[test]
    fn values_outside_errno_range_are_results() {
        assert_eq!(check(0), Ok(0));
        assert_eq!(check(42), Ok(42));
        // mmap can legitimately return addresses that look negative
        assert_eq!(check(-4096), Ok((-4096isize) as usize));
    }

    #[test]
    fn display_includes_name_and_value() {
        assert_eq!(format!("{}", Errno::ENOSYS), "ENOSYS (38)");
        assert_eq!(format!("{}", Errno::from_raw(99)), "errno (99)");
    }
}
