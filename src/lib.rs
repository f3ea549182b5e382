//! A small multitasking core for a single CPU machine: a bounded round-robin
//! scheduler over a fixed pool of tasks, and the wait/notify machinery used
//! to block tasks on mutexes, on the termination of other tasks and on
//! keyboard input.
//!
//! The core never touches the machine directly. Context switches are
//! delegated to an [`arch::Hardware`] implementation, and the platform calls
//! the entry points of [`irq`] from its interrupt and trap handlers.
#![no_std]

extern crate alloc;

#[cfg(test)]
extern crate std;

pub mod arch;
pub mod event;
pub mod irq;
pub mod kernel;
pub mod keyboard;
pub mod logging;
pub mod sched;
pub mod sync;
pub mod task;
pub mod time;
pub mod user;

#[cfg(test)]
mod testing;

pub use kernel::Kernel;
