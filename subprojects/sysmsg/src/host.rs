//! The hardware seam of the signal state machine.

use core::sync::atomic::AtomicU32;

use crate::{arch::Arch, error::StubError, slot::ThreadSlot};

/// Everything the dispatch path does to the machine besides reading and writing the signal frame.
///
/// [`LinuxHost`](crate::LinuxHost) is the real implementation; tests substitute a host that plays
/// the monitor's part of the protocol.
pub trait Host<A: Arch> {
    /// Reads the thread-pointer register of the interrupted thread.
    fn read_tls(&self) -> Result<u64, StubError>;

    /// Writes the thread-pointer register the thread resumes with.
    ///
    /// # Safety
    ///
    /// Changes the TLS base of the calling thread. Only sound as the last step before returning
    /// from the signal handler.
    unsafe fn write_tls(&self, tls: u64) -> Result<(), StubError>;

    /// Sleeps while `word` still holds `expected`. May return spuriously.
    fn wait(&self, word: &AtomicU32, expected: u32) -> Result<(), StubError>;

    /// Wakes whoever sleeps on `word`.
    fn wake(&self, word: &AtomicU32) -> Result<(), StubError>;

    /// Hands a freshly provisioned slot to the monitor's thread registration hook.
    fn register_thread(&self, slot: &ThreadSlot<A>);

    /// Ends the stub process. `slot` is `None` when it cannot be trusted.
    fn fatal(&self, slot: Option<&ThreadSlot<A>>, err: StubError) -> !;
}
