//! Per-process architecture description, supplied by the monitor at installation.

use static_assertions::const_assert_eq;
use thiserror::Error;

use crate::arch::Arch;

/// Architecture parameters the stub cannot discover on its own.
///
/// The monitor measures these once (XSAVE area size, CPU features, where it mapped the stub
/// code) and hands them to [`install`](crate::install) before any intercepted signal can fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct ArchDescriptor {
    /// Number of bytes of floating-point state copied between the signal frame and a context.
    pub fp_len: u32,
    /// Nonzero when the CPU supports `rdfsbase`/`wrfsbase` and the kernel enabled them
    /// (x86_64 only). A byte rather than a `bool` since C fills it in; read it through
    /// [`ArchDescriptor::fsgsbase`].
    pub fsgsbase: u8,
    /// First byte of the stub code mapping.
    pub stub_start: u64,
    /// One past the last byte of the stub code mapping.
    pub stub_end: u64,
}

/// A descriptor rejected by [`ArchDescriptor::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidDescriptor {
    #[error("floating-point state length is zero")]
    EmptyFpState,

    #[error("floating-point state length {len} exceeds the {capacity}-byte context buffer")]
    FpStateTooLarge { len: usize, capacity: usize },

    #[error("stub region {start:#x}..{end:#x} is empty")]
    EmptyStubRegion { start: u64, end: u64 },
}

impl ArchDescriptor {
    /// Checks the descriptor against the layout of architecture `A`.
    pub fn validate<A: Arch>(&self) -> Result<(), InvalidDescriptor> {
        let len = self.fp_len();
        let capacity = A::FP_STATE_CAPACITY;

        if len == 0 {
            return Err(InvalidDescriptor::EmptyFpState);
        }
        if len > capacity {
            return Err(InvalidDescriptor::FpStateTooLarge { len, capacity });
        }
        if self.stub_start >= self.stub_end {
            return Err(InvalidDescriptor::EmptyStubRegion {
                start: self.stub_start,
                end: self.stub_end,
            });
        }

        Ok(())
    }

    #[inline]
    pub fn fp_len(&self) -> usize {
        self.fp_len as usize
    }

    /// Whether the thread pointer may be accessed with `rdfsbase`/`wrfsbase`.
    #[inline]
    pub fn fsgsbase(&self) -> bool {
        self.fsgsbase != 0
    }
}

const_assert_eq!(core::mem::size_of::<ArchDescriptor>(), 24);
const_assert_eq!(core::mem::offset_of!(ArchDescriptor, fsgsbase), 4);
const_assert_eq!(core::mem::offset_of!(ArchDescriptor, stub_start), 8);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::{aarch64::Aarch64, riscv64::Riscv64, x86_64::X86_64};

    fn descriptor(fp_len: u32) -> ArchDescriptor {
        ArchDescriptor {
            fp_len,
            fsgsbase: 0,
            stub_start: 0x7000_0000,
            stub_end: 0x7000_4000,
        }
    }

    #[test]
    fn fp_len_is_bounded_by_each_layout() {
        assert_eq!(descriptor(528).validate::<Riscv64>(), Ok(()));
        assert_eq!(
            descriptor(529).validate::<Riscv64>(),
            Err(InvalidDescriptor::FpStateTooLarge {
                len: 529,
                capacity: 528
            })
        );
        assert_eq!(descriptor(0x210).validate::<Aarch64>(), Ok(()));
        assert_eq!(descriptor(2696).validate::<X86_64>(), Ok(()));
        assert_eq!(
            descriptor(0).validate::<X86_64>(),
            Err(InvalidDescriptor::EmptyFpState)
        );
    }

    #[test]
    fn empty_stub_region_is_rejected() {
        let mut desc = descriptor(512);
        desc.stub_end = desc.stub_start;

        assert!(matches!(
            desc.validate::<X86_64>(),
            Err(InvalidDescriptor::EmptyStubRegion { .. })
        ));
    }

    #[test]
    fn any_nonzero_fsgsbase_byte_enables_fsgsbase() {
        let mut desc = descriptor(512);
        assert!(!desc.fsgsbase());

        for byte in [1, 2, 0x80, 0xff] {
            desc.fsgsbase = byte;
            assert!(desc.fsgsbase());
        }
    }

    #[test]
    fn descriptor_read_from_foreign_bytes() {
        let mut bytes = [0u8; core::mem::size_of::<ArchDescriptor>()];
        bytes[0..4].copy_from_slice(&512u32.to_ne_bytes());
        bytes[4] = 7;
        bytes[8..16].copy_from_slice(&0x7000_0000u64.to_ne_bytes());
        bytes[16..24].copy_from_slice(&0x7000_4000u64.to_ne_bytes());

        let desc = unsafe { bytes.as_ptr().cast::<ArchDescriptor>().read_unaligned() };

        assert_eq!(desc.fp_len(), 512);
        assert!(desc.fsgsbase());
        assert_eq!(desc.validate::<X86_64>(), Ok(()));
    }
}
