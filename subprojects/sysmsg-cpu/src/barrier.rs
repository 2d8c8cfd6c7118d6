//! Memory barriers
//!
//! Four ordering primitives, each lowered to the cheapest instruction that provides the required
//! ordering class on the target:
//!
//! | Function           | x86_64        | aarch64     | riscv64        |
//! |--------------------|---------------|-------------|----------------|
//! | [`barrier`]        | compiler only | compiler only | compiler only |
//! | [`memory_barrier`] | `mfence`      | `dmb ish`   | `fence rw, rw` |
//! | [`read_barrier`]   | compiler only | `dmb ishld` | `fence r, r`   |
//! | [`write_barrier`]  | compiler only | `dmb ishst` | `fence w, w`   |
//!
//! x86_64 is TSO: loads are not reordered with older loads and stores are not reordered with
//! older stores, so the read and write fences only need to stop the compiler.
//!
//! All sequences omit `nomem`, so the compiler treats each one as a full memory clobber.
//!
//! ## References
//! - [Linux: arch/x86/include/asm/barrier.h](https://github.com/torvalds/linux/blob/master/arch/x86/include/asm/barrier.h)
//! - [Linux: arch/arm64/include/asm/barrier.h](https://github.com/torvalds/linux/blob/master/arch/arm64/include/asm/barrier.h)
//! - [Linux: arch/riscv/include/asm/barrier.h](https://github.com/torvalds/linux/blob/master/arch/riscv/include/asm/barrier.h)

use core::arch::asm;

/// Compiler optimization barrier.
///
/// Emits no instruction. Memory accesses are not moved across it by the compiler.
#[inline(always)]
pub fn barrier() {
    unsafe {
        asm!("", options(nostack, preserves_flags));
    }
}

/// Full bidirectional memory fence.
///
/// Orders every load and store before the fence against every load and store after it, including
/// the store-to-load case.
#[inline(always)]
pub fn memory_barrier() {
    #[cfg(target_arch = "x86_64")]
    unsafe {
        asm!("mfence", options(nostack, preserves_flags));
    }

    #[cfg(target_arch = "aarch64")]
    unsafe {
        asm!("dmb ish", options(nostack, preserves_flags));
    }

    #[cfg(target_arch = "riscv64")]
    unsafe {
        asm!("fence rw, rw", options(nostack, preserves_flags));
    }
}

/// Acquire-style read fence.
///
/// Loads before the fence are ordered before loads after it.
#[inline(always)]
pub fn read_barrier() {
    #[cfg(target_arch = "x86_64")]
    barrier();

    #[cfg(target_arch = "aarch64")]
    unsafe {
        asm!("dmb ishld", options(nostack, preserves_flags));
    }

    #[cfg(target_arch = "riscv64")]
    unsafe {
        asm!("fence r, r", options(nostack, preserves_flags));
    }
}

/// Release-style write fence.
///
/// Stores before the fence are ordered before stores after it.
#[inline(always)]
pub fn write_barrier() {
    #[cfg(target_arch = "x86_64")]
    barrier();

    #[cfg(target_arch = "aarch64")]
    unsafe {
        asm!("dmb ishst", options(nostack, preserves_flags));
    }

    #[cfg(target_arch = "riscv64")]
    unsafe {
        asm!("fence w, w", options(nostack, preserves_flags));
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicU32, AtomicU64, Ordering},
        },
        thread,
    };

    use super::*;

    #[test]
    fn fences_order_message_passing() {
        const ROUNDS: u64 = 10_000;

        let data = Arc::new(AtomicU64::new(0));
        let flag = Arc::new(AtomicU32::new(0));

        let producer = {
            let data = Arc::clone(&data);
            let flag = Arc::clone(&flag);
            thread::spawn(move || {
                for round in 1..=ROUNDS {
                    while flag.load(Ordering::Relaxed) != 0 {
                        thread::yield_now();
                    }
                    read_barrier();
                    data.store(round, Ordering::Relaxed);
                    write_barrier();
                    flag.store(1, Ordering::Relaxed);
                }
            })
        };

        for round in 1..=ROUNDS {
            while flag.load(Ordering::Relaxed) != 1 {
                thread::yield_now();
            }
            read_barrier();
            assert_eq!(data.load(Ordering::Relaxed), round);
            memory_barrier();
            flag.store(0, Ordering::Relaxed);
        }

        producer.join().unwrap();
    }

    #[test]
    fn compiler_barrier_is_callable_anywhere() {
        let mut value = 1;
        barrier();
        value += 1;
        barrier();
        assert_eq!(value, 2);
    }
}
