//! Typed cells for memory shared between the stub and the monitor.
//!
//! Every field of a [`ThreadSlot`](crate::ThreadSlot) or [`ThreadContext`](crate::ThreadContext)
//! has exactly one writer at any point in time. The wrappers here encode which side that is:
//!
//! - [`SharedEnum`], [`SharedFlag`] and [`SharedAddr`] are written by one side and polled by the
//!   other, so they are atomics with Acquire loads and Release stores.
//! - [`OwnedCell`] is bulk data (registers, FP state, `siginfo`) that is only touched by whoever
//!   currently owns the enclosing record. Ownership is handed over through the atomic fields and
//!   the explicit barriers in [`switch`](crate::switch).
//!
//! All wrappers are `repr(transparent)` so the records keep their C layout.

use core::{
    cell::UnsafeCell,
    marker::PhantomData,
    sync::atomic::{AtomicU32, AtomicU64, Ordering},
};

/// A `u32`-coded enum stored in shared memory.
pub trait SharedRepr: Copy {
    fn into_raw(self) -> u32;
    fn from_raw(raw: u32) -> Option<Self>;
}

/// An enum published through a 32-bit atomic word.
///
/// The word is also a futex, see [`SharedEnum::word`].
#[repr(transparent)]
pub struct SharedEnum<T> {
    raw: AtomicU32,
    _marker: PhantomData<T>,
}

impl<T> SharedEnum<T> {
    /// Wraps a raw word; undecodable values surface through [`SharedEnum::load`].
    pub const fn from_raw_word(raw: u32) -> Self {
        Self {
            raw: AtomicU32::new(raw),
            _marker: PhantomData,
        }
    }
}

impl<T: SharedRepr> SharedEnum<T> {
    pub fn new(value: T) -> Self {
        Self {
            raw: AtomicU32::new(value.into_raw()),
            _marker: PhantomData,
        }
    }

    /// Loads the value, returning the raw word if it does not decode.
    #[inline]
    pub fn load(&self) -> Result<T, u32> {
        let raw = self.raw.load(Ordering::Acquire);
        T::from_raw(raw).ok_or(raw)
    }

    #[inline]
    pub fn store(&self, value: T) {
        self.raw.store(value.into_raw(), Ordering::Release);
    }

    /// The underlying word, for futex waits and wakes.
    #[inline]
    pub fn word(&self) -> &AtomicU32 {
        &self.raw
    }
}

/// A boolean stored as a 32-bit word.
#[repr(transparent)]
pub struct SharedFlag(AtomicU32);

impl SharedFlag {
    pub const fn new(set: bool) -> Self {
        Self(AtomicU32::new(set as u32))
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire) != 0
    }

    #[inline]
    pub fn set(&self) {
        self.0.store(1, Ordering::Release);
    }

    #[inline]
    pub fn clear(&self) {
        self.0.store(0, Ordering::Release);
    }
}

/// A pointer stored as a 64-bit address, regardless of the reader's pointer width.
#[repr(transparent)]
pub struct SharedAddr<T> {
    addr: AtomicU64,
    _marker: PhantomData<*mut T>,
}

// SAFETY: the cell only stores an address; dereferencing it is the reader's responsibility.
unsafe impl<T> Send for SharedAddr<T> {}
unsafe impl<T> Sync for SharedAddr<T> {}

impl<T> SharedAddr<T> {
    pub const fn null() -> Self {
        Self {
            addr: AtomicU64::new(0),
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn load(&self) -> *mut T {
        self.addr.load(Ordering::Acquire) as usize as *mut T
    }

    #[inline]
    pub fn store(&self, ptr: *mut T) {
        self.addr.store(ptr as usize as u64, Ordering::Release);
    }
}

/// Bulk data owned by one side at a time.
#[repr(transparent)]
pub struct OwnedCell<T>(UnsafeCell<T>);

// SAFETY: access is serialized by the ownership handoff protocol, see the module docs.
unsafe impl<T: Send> Sync for OwnedCell<T> {}

impl<T> OwnedCell<T> {
    pub const fn new(value: T) -> Self {
        Self(UnsafeCell::new(value))
    }

    /// # Safety
    ///
    /// The caller must currently own the enclosing record.
    #[inline]
    pub unsafe fn get(&self) -> &T {
        unsafe { &*self.0.get() }
    }

    /// # Safety
    ///
    /// The caller must currently own the enclosing record, and no other reference obtained from
    /// this cell may be alive.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn get_mut(&self) -> &mut T {
        unsafe { &mut *self.0.get() }
    }

    #[inline]
    pub fn as_ptr(&self) -> *mut T {
        self.0.get()
    }
}

impl<T: Copy> OwnedCell<T> {
    /// # Safety
    ///
    /// See [`OwnedCell::get`].
    #[inline]
    pub unsafe fn read(&self) -> T {
        unsafe { *self.0.get() }
    }

    /// # Safety
    ///
    /// See [`OwnedCell::get_mut`].
    #[inline]
    pub unsafe fn write(&self, value: T) {
        unsafe { *self.0.get() = value }
    }
}
