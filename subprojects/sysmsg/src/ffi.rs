//! C ABI entry points for a stub runtime written in another language.

use core::ffi::{c_int, c_void};

use crate::{
    descriptor::ArchDescriptor,
    install::{InstallError, install},
    linux::RegisterThreadFn,
};

const EINVAL: c_int = 22;
const EBUSY: c_int = 16;

/// Exported alias of [`sighandler`](crate::sighandler).
#[unsafe(no_mangle)]
unsafe extern "C" fn __sysmsg_sighandler(signo: c_int, info: *mut c_void, ucontext: *mut c_void) {
    unsafe { crate::entry::sighandler(signo, info, ucontext) }
}

/// Installs the handler configuration.
///
/// Returns `0` on success, `-EINVAL` for a null or invalid descriptor and `-EBUSY` when already
/// installed.
#[unsafe(no_mangle)]
unsafe extern "C" fn __sysmsg_install(
    descriptor: *const ArchDescriptor,
    register_thread: RegisterThreadFn,
) -> c_int {
    let Some(descriptor) = (unsafe { descriptor.as_ref() }) else {
        return -EINVAL;
    };

    match install(*descriptor, register_thread) {
        Ok(()) => 0,
        Err(InstallError::InvalidDescriptor(_)) => -EINVAL,
        Err(InstallError::AlreadyInstalled) => -EBUSY,
    }
}
