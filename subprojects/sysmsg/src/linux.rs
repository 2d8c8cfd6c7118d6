//! The real [`Host`]: raw Linux syscalls and the CPU's thread-pointer register.

use core::sync::atomic::{AtomicU32, Ordering};

use sysmsg_cpu::{barrier::memory_barrier, tls};
use sysmsg_sys::{
    debug,
    futex::{self, FutexFlags, FutexWaitError},
    process,
};

use crate::{
    arch::{Arch, Native},
    descriptor::ArchDescriptor,
    error::StubError,
    host::Host,
    slot::ThreadSlot,
};

/// Monitor hook invoked once per slot, on the first signal a new stub thread handles.
pub type RegisterThreadFn = unsafe extern "C" fn(slot: *mut ThreadSlot);

/// Host backed by the running kernel, configured by [`install`](crate::install).
#[derive(Debug)]
pub struct LinuxHost {
    descriptor: ArchDescriptor,
    register_thread: RegisterThreadFn,
}

impl LinuxHost {
    pub const fn new(descriptor: ArchDescriptor, register_thread: RegisterThreadFn) -> Self {
        Self {
            descriptor,
            register_thread,
        }
    }

    #[inline]
    pub fn descriptor(&self) -> &ArchDescriptor {
        &self.descriptor
    }
}

impl Host<Native> for LinuxHost {
    #[inline]
    fn read_tls(&self) -> Result<u64, StubError> {
        #[cfg(target_arch = "x86_64")]
        if !self.descriptor.fsgsbase() {
            return sysmsg_sys::tls::get_fs_base().map_err(|_| StubError::ArchPrctl);
        }

        // SAFETY: rdfsbase is only reached when the descriptor advertises FSGSBASE.
        Ok(unsafe { tls::read_thread_pointer() })
    }

    #[inline]
    unsafe fn write_tls(&self, tp: u64) -> Result<(), StubError> {
        #[cfg(target_arch = "x86_64")]
        if !self.descriptor.fsgsbase() {
            return unsafe { sysmsg_sys::tls::set_fs_base(tp) }.map_err(|_| StubError::ArchPrctl);
        }

        unsafe { tls::write_thread_pointer(tp) };
        Ok(())
    }

    fn wait(&self, word: &AtomicU32, expected: u32) -> Result<(), StubError> {
        match futex::wait(word, expected, FutexFlags::empty()) {
            Ok(())
            | Err(FutexWaitError::WouldBlock)
            | Err(FutexWaitError::Interrupted)
            | Err(FutexWaitError::TimedOut) => Ok(()),
            Err(FutexWaitError::Unknown(_)) => Err(StubError::Futex),
        }
    }

    fn wake(&self, word: &AtomicU32) -> Result<(), StubError> {
        futex::wake(word, i32::MAX as u32, FutexFlags::empty())
            .map(|_| ())
            .map_err(|_| StubError::Futex)
    }

    fn register_thread(&self, slot: &ThreadSlot) {
        unsafe { (self.register_thread)(slot as *const ThreadSlot as *mut ThreadSlot) };
    }

    fn fatal(&self, slot: Option<&ThreadSlot>, err: StubError) -> ! {
        abort(slot, err)
    }
}

/// Reports `err` and terminates the stub's thread group.
///
/// With a trusted `slot`, the error code is stored into its `err` word and the monitor is woken
/// on the state word before the process exits.
pub fn abort<A: Arch>(slot: Option<&ThreadSlot<A>>, err: StubError) -> ! {
    if let Some(slot) = slot {
        slot.err.store(err.code(), Ordering::Release);
        memory_barrier();
        let _ = futex::wake(slot.state_word(), i32::MAX as u32, FutexFlags::empty());
    }

    debug::write_fmt(format_args!(
        "sysmsg: fatal stub error {:#010x} on {}: {}\n",
        err.code(),
        A::NAME,
        err
    ));
    process::exit_group(err.exit_status())
}
