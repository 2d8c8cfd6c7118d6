//! x86_64 `fs` base access through `arch_prctl(2)`.
//!
//! Fallback for CPUs or kernels without usable `FSGSBASE` instructions. aarch64 and riscv64 have a
//! user-writable thread pointer register and never need this.
//!
//! Ref: <https://man7.org/linux/man-pages/man2/arch_prctl.2.html>

use crate::{
    nr, raw,
    result::{Errno, check},
};

/// `ARCH_SET_FS` sub-function
const ARCH_SET_FS: usize = 0x1002;

/// `ARCH_GET_FS` sub-function
const ARCH_GET_FS: usize = 0x1003;

/// Reads the `fs` base of the calling thread.
pub fn get_fs_base() -> Result<u64, ArchPrctlError> {
    let mut base: u64 = 0;
    let ret = unsafe { raw::syscall2(nr::ARCH_PRCTL, ARCH_GET_FS, &mut base as *mut u64 as usize) };
    check(ret).map(|_| base).map_err(Into::into)
}

/// Sets the `fs` base of the calling thread.
///
/// # Safety
///
/// Every TLS access after this call resolves against `base`; see
/// `sysmsg_cpu::tls::write_thread_pointer`.
pub unsafe fn set_fs_base(base: u64) -> Result<(), ArchPrctlError> {
    let ret = unsafe { raw::syscall2(nr::ARCH_PRCTL, ARCH_SET_FS, base as usize) };
    check(ret).map(|_| ()).map_err(Into::into)
}

/// Error type for [`get_fs_base`] and [`set_fs_base`]
#[derive(Debug, thiserror::Error)]
pub enum ArchPrctlError {
    /// The output pointer or the new base is not a valid user address (`EFAULT`/`EPERM`).
    #[error("Invalid address")]
    InvalidAddress,
    /// Unknown sub-function (`EINVAL`).
    #[error("Invalid code")]
    InvalidCode,
    /// Any other kernel error. Contains the original [`Errno`].
    #[error("Unknown error: {0}")]
    Unknown(Errno),
}

impl From<Errno> for ArchPrctlError {
    fn from(errno: Errno) -> Self {
        match errno {
            Errno::EFAULT | Errno::EPERM => ArchPrctlError::InvalidAddress,
            Errno::EINVAL => ArchPrctlError::InvalidCode,
            _ => ArchPrctlError::Unknown(errno),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_base_is_set_for_std_threads() {
        // The Rust runtime installs a TLS block for every thread it spawns.
        let base = get_fs_base().unwrap();
        assert_ne!(base, 0);
    }

    #[test]
    fn set_fs_base_round_trips() {
        let base = get_fs_base().unwrap();
        unsafe { set_fs_base(base).unwrap() };
        assert_eq!(get_fs_base().unwrap(), base);
    }
}
