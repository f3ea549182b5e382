//! Wait/notify routing. Every blocking operation and every wake-up goes
//! through [`Kernel::route`], which picks the wait queue owned by the
//! resource designated by the event and hands it to the scheduler.
use crate::{
    arch::Hardware,
    kernel::Kernel,
    keyboard::KeyCode,
    sync::mutex::Handle,
    task::Slot,
};
use usize_cast::IntoUsize;

/// What to do with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Block the current task until the event occurs.
    Wait,

    /// Signal that the event occurred, waking every task waiting for it.
    Notify,
}

/// Something a task can wait for. An event is created when a task blocks
/// and is owned by that task until it is woken up.
#[derive(Debug, PartialEq, Eq)]
pub enum Event {
    /// The release of a mutex.
    Mutex(Handle),

    /// The termination of the task in the given slot.
    Task(Slot),

    /// A key press. When notifying, the payload is the code of the key
    /// delivered to every reader.
    Key(Option<KeyCode>),
}

/// The result of routing an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The current task was blocked and another task was dispatched.
    Blocked,

    /// The event was dropped: the current task cannot block, or the event
    /// designates a resource that does not exist.
    Refused,

    /// The given number of tasks were moved to the ready set.
    Woken(usize),
}

impl<H: Hardware> Kernel<H> {
    /// Route an action on an event to the resource it designates.
    pub fn route(&mut self, action: Action, event: Event) -> Outcome {
        match event {
            Event::Mutex(handle) => {
                let Some(mutex) = self.mutexes.get_mut(handle) else {
                    log::warn!("Dropping {:?} on a stale mutex handle", action);
                    return Outcome::Refused;
                };
                match action {
                    Action::Wait => blocked(self.scheduler.wait_event(&mut mutex.waiters, event)),
                    Action::Notify => Outcome::Woken(self.scheduler.wake_all(&mut mutex.waiters)),
                }
            }
            Event::Task(target) => match action {
                Action::Wait => blocked(self.scheduler.wait_task(target, event)),
                Action::Notify => Outcome::Woken(self.scheduler.wake_task_waiters(target)),
            },
            Event::Key(code) => match action {
                Action::Wait => blocked(self.scheduler.wait_event(&mut self.keys, event)),
                Action::Notify => {
                    if let Some(code) = code {
                        for slot in self.keys.iter() {
                            self.scheduler
                                .task_mut(slot)
                                .context_mut()
                                .set_syscall_return(code.into_usize());
                        }
                    }
                    Outcome::Woken(self.scheduler.wake_all(&mut self.keys))
                }
            },
        }
    }
}

fn blocked(success: bool) -> Outcome {
    if success {
        Outcome::Blocked
    } else {
        Outcome::Refused
    }
}
