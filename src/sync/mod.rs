//! Mutexes shared between tasks. A task that finds a mutex held blocks on
//! the wait queue of the mutex; every release wakes up all the waiters,
//! which then race to acquire the mutex again.
use crate::{
    arch::Hardware,
    event::{Action, Event, Outcome},
    kernel::Kernel,
};
use mutex::{Enter, Error, Handle, Policy};

pub mod mutex;

/// The result of entering a mutex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    /// The caller holds the mutex.
    Acquired,

    /// The mutex was held by another task. The caller was blocked until
    /// the mutex is released, and must try to enter it again once it runs.
    Blocked,
}

impl<H: Hardware> Kernel<H> {
    /// Create a free mutex.
    ///
    /// # Errors
    /// Returns [`Error::TableFull`] if no more mutexes can be created.
    pub fn mutex_create(&mut self, policy: Policy) -> Result<Handle, Error> {
        let handle = self.mutexes.create(policy)?;
        log::trace!("Mutex {:#x} created ({:?})", handle.into_raw(), policy);
        Ok(handle)
    }

    /// Enter a mutex on behalf of the current task, blocking it if the
    /// mutex is held by another task.
    ///
    /// # Errors
    /// Returns [`Error::InvalidHandle`] if the mutex does not exist.
    pub fn mutex_enter(&mut self, handle: Handle) -> Result<Acquire, Error> {
        let caller = self.scheduler.current().id();
        match self.mutexes.enter(handle, caller)? {
            Enter::Acquired | Enter::Reentered => Ok(Acquire::Acquired),
            Enter::MustWait => {
                // The idle task cannot block, it tries again the next time
                // it runs like any woken waiter.
                self.route(Action::Wait, Event::Mutex(handle));
                Ok(Acquire::Blocked)
            }
        }
    }

    /// Release a mutex on behalf of the current task and wake up all the
    /// tasks waiting for it. Returns the number of tasks woken up.
    ///
    /// Releasing a strict mutex that the current task does not own is a
    /// protocol violation: the current task is terminated and the mutex is
    /// left untouched.
    ///
    /// # Errors
    /// Returns [`Error::InvalidHandle`] if the mutex does not exist, or
    /// [`Error::NotOwner`] if the current task was terminated.
    pub fn mutex_exit(&mut self, handle: Handle) -> Result<usize, Error> {
        let caller = self.scheduler.current().id();
        match self.mutexes.exit(handle, caller) {
            Ok(()) => match self.route(Action::Notify, Event::Mutex(handle)) {
                Outcome::Woken(woken) => Ok(woken),
                Outcome::Blocked | Outcome::Refused => Ok(0),
            },
            Err(Error::NotOwner) => {
                log::error!(
                    "Task {} released mutex {:#x} without owning it",
                    caller,
                    handle.into_raw()
                );
                self.exit_current();
                Err(Error::NotOwner)
            }
            Err(error) => Err(error),
        }
    }

    /// Destroy a mutex that is not held.
    ///
    /// # Errors
    /// Returns [`Error::InvalidHandle`] if the mutex does not exist, or
    /// [`Error::Busy`] if it is held.
    pub fn mutex_destroy(&mut self, handle: Handle) -> Result<(), Error> {
        self.mutexes.destroy(handle)?;
        log::trace!("Mutex {:#x} destroyed", handle.into_raw());
        Ok(())
    }
}
