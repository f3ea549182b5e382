//! Entry points called by the platform interrupt and trap handlers. They
//! operate on the global kernel instance installed by [`kernel::setup`], and
//! do nothing if no kernel was installed.
use crate::{
    kernel::{self, Fault},
    keyboard::KeyCode,
    user::syscall::{self, Resume},
};

/// Handle a timer interrupt.
pub fn timer() {
    kernel::with(|kernel| kernel.timer_tick());
}

/// Handle a keyboard interrupt carrying an already decoded key.
pub fn keyboard(code: KeyCode) {
    kernel::with(|kernel| kernel.deliver_key(code));
}

/// Handle a fatal exception raised by the current task.
pub fn fault(fault: Fault) {
    kernel::with(|kernel| kernel.fault(fault));
}

/// Handle a syscall raised by the current task.
#[must_use]
pub fn syscall(id: usize, args: [usize; 2], payload: &[u8]) -> Resume {
    kernel::with(|kernel| syscall::handle(kernel, id, args, payload)).unwrap_or(Resume::Continue)
}
