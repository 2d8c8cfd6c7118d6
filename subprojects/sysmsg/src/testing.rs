//! Test doubles for driving the signal state machine without a kernel or a monitor process.

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    panic::{self, AssertUnwindSafe},
    ptr, slice,
    sync::atomic::AtomicU32,
    time::{Duration, Instant},
};

use crate::{
    ArchDescriptor, ThreadContext,
    arch::{Arch, RegisterFile, aarch64::Aarch64, riscv64::Riscv64, x86_64::X86_64},
    error::StubError,
    host::Host,
    monitor,
    slot::{ThreadSlot, ThreadState},
};

/// FP bytes moved by every test descriptor; fits all three layouts.
pub const TEST_FP_LEN: usize = 256;

pub fn descriptor() -> ArchDescriptor {
    ArchDescriptor {
        fp_len: TEST_FP_LEN as u32,
        fsgsbase: 0,
        stub_start: 0x7f00_0000_0000,
        stub_end: 0x7f00_0001_0000,
    }
}

/// Frame construction for layouts whose FP area lives outside the `ucontext`.
pub trait TestArch: Arch {
    fn new_ucontext() -> Box<Self::UContext>;
    fn attach_fp(uc: &mut Self::UContext, area: *mut u8);
}

impl TestArch for X86_64 {
    fn new_ucontext() -> Box<Self::UContext> {
        Box::new(crate::arch::x86_64::UContext::zeroed())
    }

    fn attach_fp(uc: &mut Self::UContext, area: *mut u8) {
        uc.uc_mcontext.fpregs = area as u64;
    }
}

impl TestArch for Aarch64 {
    fn new_ucontext() -> Box<Self::UContext> {
        Box::new(crate::arch::aarch64::UContext::zeroed())
    }

    fn attach_fp(_uc: &mut Self::UContext, _area: *mut u8) {}
}

impl TestArch for Riscv64 {
    fn new_ucontext() -> Box<Self::UContext> {
        Box::new(crate::arch::riscv64::UContext::zeroed())
    }

    fn attach_fp(_uc: &mut Self::UContext, _area: *mut u8) {}
}

/// A signal frame as the kernel would hand it to the handler.
pub struct Frame<A: TestArch> {
    pub uc: Box<A::UContext>,
    _xsave: Vec<u8>,
}

impl<A: TestArch> Frame<A> {
    pub fn new() -> Self {
        let mut xsave = vec![0u8; A::FP_STATE_CAPACITY];
        let mut uc = A::new_ucontext();
        A::attach_fp(&mut uc, xsave.as_mut_ptr());
        Self { uc, _xsave: xsave }
    }

    /// A frame whose registers and FP bytes are derived from `seed`.
    pub fn seeded(seed: u64) -> Self {
        let mut frame = Self::new();
        frame.set_regs(&seeded_regs::<A>(seed));
        frame.fp().copy_from_slice(&seeded_fp(seed));
        frame
    }

    pub fn regs(&self) -> A::Regs {
        let mut regs = A::Regs::zeroed();
        A::save_regs(&self.uc, &mut regs);
        regs
    }

    pub fn set_regs(&mut self, regs: &A::Regs) {
        A::load_regs(&mut self.uc, regs);
    }

    pub fn set_syscall_nr(&mut self, nr: u64) {
        let mut regs = self.regs();
        *A::syscall_nr(&mut regs) = nr;
        self.set_regs(&regs);
    }

    /// The first [`TEST_FP_LEN`] bytes of the frame's FP area.
    pub fn fp(&mut self) -> &mut [u8] {
        &mut self.fp_area()[..TEST_FP_LEN]
    }

    /// The whole FP area, `A::FP_STATE_CAPACITY` bytes.
    pub fn fp_area(&mut self) -> &mut [u8] {
        let area = A::fp_area(&mut self.uc).expect("test frame has an FP area");
        unsafe { slice::from_raw_parts_mut(area.as_ptr(), A::FP_STATE_CAPACITY) }
    }
}

pub fn seeded_regs<A: Arch>(seed: u64) -> A::Regs {
    let mut regs = A::Regs::zeroed();
    for (i, reg) in regs.as_mut_slice().iter_mut().enumerate() {
        *reg = (seed << 16) | i as u64;
    }
    regs
}

pub fn seeded_fp(seed: u64) -> Vec<u8> {
    seeded_bytes(seed, TEST_FP_LEN)
}

pub fn seeded_bytes(seed: u64, len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| (seed as u8).wrapping_mul(31).wrapping_add((i ^ (i >> 8)) as u8))
        .collect()
}

/// Leaks a provisioned slot so that its address stays fixed.
pub fn provisioned_slot<A: Arch>() -> &'static ThreadSlot<A> {
    let slot: &'static mut ThreadSlot<A> = Box::leak(Box::new(ThreadSlot::zeroed()));
    unsafe { monitor::provision(slot) };
    slot
}

/// Leaks a zeroed context so that monitor steps can hold on to it.
pub fn leaked_context<A: Arch>() -> &'static ThreadContext<A> {
    Box::leak(Box::new(ThreadContext::zeroed()))
}

/// [`monitor::assign`] for a context held by shared reference.
pub fn assign<A: Arch>(slot: &ThreadSlot<A>, context: &ThreadContext<A>) {
    monitor::assign(slot, ptr::from_ref(context).cast_mut());
}

/// Something the stub did to the outside world, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Register,
    /// The monitor was woken; carries the slot state it would observe.
    Publish(Result<ThreadState, u32>),
    Wait,
    ReadTls,
    WriteTls(u64),
}

/// Panic payload raised by [`Host::fatal`] on the test hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fatal {
    pub err: StubError,
    pub slot_trusted: bool,
}

/// Runs `f` and returns the fatal error it ended with.
pub fn expect_fatal(f: impl FnOnce()) -> Fatal {
    let payload = panic::catch_unwind(AssertUnwindSafe(f)).expect_err("stub did not abort");
    *payload
        .downcast::<Fatal>()
        .expect("stub panicked with something other than a fatal error")
}

type Step<A> = Box<dyn FnOnce(&ThreadSlot<A>)>;

/// A host whose futex waits run scripted monitor steps.
///
/// Each time the stub parks, the next queued step runs with the stub's slot. A step that does
/// not [`monitor::assign`] anything behaves as a spurious wakeup.
pub struct ScriptedHost<A: Arch> {
    slot: &'static ThreadSlot<A>,
    tls: Cell<u64>,
    steps: RefCell<VecDeque<Step<A>>>,
    events: RefCell<Vec<Event>>,
    thread_id: u32,
}

impl<A: Arch> ScriptedHost<A> {
    pub fn new(slot: &'static ThreadSlot<A>, tls: u64) -> Self {
        Self {
            slot,
            tls: Cell::new(tls),
            steps: RefCell::new(VecDeque::new()),
            events: RefCell::new(Vec::new()),
            thread_id: 7,
        }
    }

    pub fn on_wait(&self, step: impl FnOnce(&ThreadSlot<A>) + 'static) -> &Self {
        self.steps.borrow_mut().push_back(Box::new(step));
        self
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn tls(&self) -> u64 {
        self.tls.get()
    }

    pub fn steps_left(&self) -> usize {
        self.steps.borrow().len()
    }

    /// The id handed out by thread registration.
    pub fn thread_id(&self) -> u32 {
        self.thread_id
    }

    fn record(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }
}

impl<A: Arch> Host<A> for ScriptedHost<A> {
    fn read_tls(&self) -> Result<u64, StubError> {
        self.record(Event::ReadTls);
        Ok(self.tls.get())
    }

    unsafe fn write_tls(&self, tls: u64) -> Result<(), StubError> {
        self.record(Event::WriteTls(tls));
        self.tls.set(tls);
        Ok(())
    }

    fn wait(&self, _word: &AtomicU32, _expected: u32) -> Result<(), StubError> {
        self.record(Event::Wait);
        let step = self
            .steps
            .borrow_mut()
            .pop_front()
            .expect("stub parked with no monitor step left");
        step(self.slot);
        Ok(())
    }

    fn wake(&self, _word: &AtomicU32) -> Result<(), StubError> {
        self.record(Event::Publish(self.slot.state()));
        Ok(())
    }

    fn register_thread(&self, slot: &ThreadSlot<A>) {
        self.record(Event::Register);
        monitor::set_thread_id(slot, self.thread_id);
    }

    fn fatal(&self, slot: Option<&ThreadSlot<A>>, err: StubError) -> ! {
        panic::panic_any(Fatal {
            err,
            slot_trusted: slot.is_some(),
        })
    }
}

/// A host for real threads: waits spin until the monitor thread moves the word.
pub struct SpinHost {
    tls: Cell<u64>,
    thread_id: u32,
    deadline: Instant,
}

impl SpinHost {
    pub fn new(thread_id: u32) -> Self {
        Self {
            tls: Cell::new(0),
            thread_id,
            deadline: Instant::now() + Duration::from_secs(30),
        }
    }
}

impl<A: Arch> Host<A> for SpinHost {
    fn read_tls(&self) -> Result<u64, StubError> {
        Ok(self.tls.get())
    }

    unsafe fn write_tls(&self, tls: u64) -> Result<(), StubError> {
        self.tls.set(tls);
        Ok(())
    }

    fn wait(&self, _word: &AtomicU32, _expected: u32) -> Result<(), StubError> {
        assert!(Instant::now() < self.deadline, "monitor never assigned a context");
        std::thread::yield_now();
        Ok(())
    }

    fn wake(&self, _word: &AtomicU32) -> Result<(), StubError> {
        Ok(())
    }

    fn register_thread(&self, slot: &ThreadSlot<A>) {
        monitor::set_thread_id(slot, self.thread_id);
    }

    fn fatal(&self, slot: Option<&ThreadSlot<A>>, err: StubError) -> ! {
        panic::panic_any(Fatal {
            err,
            slot_trusted: slot.is_some(),
        })
    }
}
