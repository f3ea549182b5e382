//! The boundary between the scheduler and the machine. The scheduler never
//! switches contexts by itself: it decides which task runs next, and hands
//! that task to a [`Hardware`] implementation that saves and restores the
//! registers, reloads the privilege-level descriptors and resumes it.
//!
//! Keeping this boundary narrow allows the whole scheduling core to run on
//! the host in tests, with a recording implementation of [`Hardware`].
use crate::task::Task;
use alloc::boxed::Box;

/// The address of the first instruction executed by a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Entry(usize);

impl Entry {
    #[must_use]
    pub const fn new(address: usize) -> Self {
        Self(address)
    }

    /// The raw address of the entry point.
    #[must_use]
    pub const fn address(self) -> usize {
        self.0
    }
}

/// The machine state of a task, as far as the scheduler is concerned. The
/// register file itself belongs to the [`Hardware`] implementation, which
/// keeps it alongside the task; the scheduler only needs the entry point
/// to start a task and the syscall return slot to deliver results to a task
/// that is not currently running.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// The entry point of the task.
    entry: Entry,

    /// The value returned to the task by its last syscall. The hardware
    /// copies it into the return register when the task is resumed.
    syscall_return: usize,
}

impl Context {
    #[must_use]
    pub const fn new(entry: Entry) -> Self {
        Self {
            entry,
            syscall_return: 0,
        }
    }

    /// The entry point of the task.
    #[must_use]
    pub const fn entry(&self) -> Entry {
        self.entry
    }

    /// The value returned by the last syscall of the task.
    #[must_use]
    pub const fn syscall_return(&self) -> usize {
        self.syscall_return
    }

    /// Set the value that will be returned to the task when it resumes.
    pub fn set_syscall_return(&mut self, value: usize) {
        self.syscall_return = value;
    }
}

/// The context switch primitives provided by the architecture.
///
/// Both [`Hardware::run`] and [`Hardware::load`] are called with the kernel
/// locked. They must only record the task to resume and return: the switch
/// itself happens when the platform leaves the interrupt or trap handler,
/// or in the closure given to [`crate::kernel::launch`] for the first task.
pub trait Hardware {
    /// Record the first task to execute. This is only called once, when the
    /// scheduler is launched.
    fn run(&mut self, task: &Task);

    /// Record the task to switch to. This is called on every dispatch after
    /// the launch, including when the task chosen is the one that was already
    /// running.
    fn load(&mut self, task: &Task);

    /// The amount of memory available to the system, in bytes.
    fn memory_size(&self) -> usize {
        0
    }
}

impl<H: Hardware + ?Sized> Hardware for Box<H> {
    fn run(&mut self, task: &Task) {
        (**self).run(task);
    }

    fn load(&mut self, task: &Task) {
        (**self).load(task);
    }

    fn memory_size(&self) -> usize {
        (**self).memory_size()
    }
}
