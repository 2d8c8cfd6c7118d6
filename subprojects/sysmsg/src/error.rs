use thiserror::Error;

/// Unrecoverable conditions detected inside the stub signal handler.
///
/// The handler cannot return an error to anyone: each of these ends the stub process. The
/// numeric [code](StubError::code) is what the monitor finds in the slot's `err` word, and its
/// low byte is the stub's exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[repr(u32)]
pub enum StubError {
    /// The slot found from the stack pointer does not point at itself.
    #[error("thread slot self-reference mismatch")]
    BadSlot = 0x0ead_0001,

    /// The slot's state word holds an unknown value.
    #[error("thread slot state is not a known value")]
    BadThreadState = 0x0ead_0002,

    /// Reading or writing the FS base through `arch_prctl` failed.
    #[error("arch_prctl on the FS base failed")]
    ArchPrctl = 0x0ead_0003,

    /// A futex wait or wake failed with an unexpected errno.
    #[error("futex operation failed")]
    Futex = 0x0ead_0004,

    /// The slot has no context assigned where one is required.
    #[error("no context assigned to the thread slot")]
    BadContext = 0x0ead_0005,

    /// The signal frame carries no floating-point area.
    #[error("signal frame has no floating-point state")]
    FpStateMissing = 0x0ead_0006,

    /// A signal arrived before the handler was installed.
    #[error("signal handler used before installation")]
    NotInstalled = 0x0ead_0007,

    /// The stub panicked.
    #[error("stub panicked")]
    Panic = 0x0ead_00ff,
}

impl StubError {
    const ALL: [StubError; 8] = [
        StubError::BadSlot,
        StubError::BadThreadState,
        StubError::ArchPrctl,
        StubError::Futex,
        StubError::BadContext,
        StubError::FpStateMissing,
        StubError::NotInstalled,
        StubError::Panic,
    ];

    /// The value stored into the slot's `err` word.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// The stub's exit status for this error.
    pub const fn exit_status(self) -> i32 {
        (self.code() & 0xff) as i32
    }

    /// Decodes an `err` word written by the stub.
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|err| err.code() == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_decode_back_to_errors() {
        for err in StubError::ALL {
            assert_eq!(StubError::from_code(err.code()), Some(err));
        }
        assert_eq!(StubError::from_code(0), None);
    }

    #[test]
    fn exit_status_is_the_low_byte() {
        assert_eq!(StubError::BadSlot.exit_status(), 1);
        assert_eq!(StubError::Panic.exit_status(), 0xff);
    }
}
