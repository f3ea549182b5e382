use crate::{
    arch::Hardware,
    event::{Action, Event, Outcome},
    kernel::Kernel,
};

/// A decoded key code, as produced by the keyboard driver.
pub type KeyCode = u32;

impl<H: Hardware> Kernel<H> {
    /// Block the current task until a key is pressed. The code of the key
    /// is written into the syscall return slot of the task before it is
    /// woken up.
    pub fn read_key(&mut self) -> Outcome {
        self.route(Action::Wait, Event::Key(None))
    }

    /// Deliver a key to every task waiting for one. A key pressed while no
    /// task is reading is lost. Returns the number of readers woken up.
    pub fn deliver_key(&mut self, code: KeyCode) -> usize {
        match self.route(Action::Notify, Event::Key(Some(code))) {
            Outcome::Woken(0) => {
                log::trace!("Key {:#x} discarded, no reader", code);
                0
            }
            Outcome::Woken(readers) => readers,
            Outcome::Blocked | Outcome::Refused => 0,
        }
    }

    /// The number of tasks waiting for a key.
    #[must_use]
    pub fn key_readers(&self) -> usize {
        self.keys.len()
    }
}
