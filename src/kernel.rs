//! The kernel context. It owns the scheduler and every resource a task can
//! wait on, so that each operation relocating tasks between queues happens
//! under a single exclusive borrow.
use crate::{
    arch::{Context, Entry, Hardware},
    event::{Action, Event, Outcome},
    sched::{IDLE, Scheduler, queue::Queue},
    sync::mutex,
    task::{AppRequest, Identifier, State, Task},
    time::TickDivider,
};
use alloc::boxed::Box;
use config::{INITIAL_APP_NAME, INITIAL_APP_PRIORITY, TASK_POOL_SIZE};

/// The hardware of the global kernel instance.
pub type Platform = Box<dyn Hardware + Send>;

/// The kernel instance used by interrupt and trap entry points.
static KERNEL: spin::Once<spin::Mutex<Kernel<Platform>>> = spin::Once::new();

/// Errors that can occur when joining a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinError {
    /// No live task has the requested name.
    NotFound,

    /// The current task tried to wait for its own termination.
    SelfJoin,
}

/// The kind of a fatal exception raised by a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    PageFault,
    SegmentFault,
}

/// A snapshot of where every task slot is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Census {
    pub free: usize,
    pub ready: usize,
    pub running: usize,

    /// Tasks blocked on any wait queue.
    pub waiting: usize,

    /// True if the idle task is outside the running set.
    pub idle_parked: bool,

    /// True if every slot is stored exactly once and its state matches the
    /// queue it is stored in.
    consistent: bool,
}

impl Census {
    /// The number of slots accounted for, the parked idle task included.
    #[must_use]
    pub fn total(&self) -> usize {
        self.free + self.ready + self.running + self.waiting + usize::from(self.idle_parked)
    }

    /// Returns true if the queues partition the task pool.
    #[must_use]
    pub fn is_partition(&self) -> bool {
        self.consistent && self.total() == TASK_POOL_SIZE
    }
}

/// The scheduler together with the resources tasks can block on.
pub struct Kernel<H> {
    pub(crate) scheduler: Scheduler<H>,
    pub(crate) mutexes: mutex::Table,

    /// Tasks waiting for a key press.
    pub(crate) keys: Queue,

    ticks: TickDivider,
}

impl<H: Hardware> Kernel<H> {
    /// Creates a kernel with no application. Only the idle task exists.
    pub fn new(hardware: H) -> Self {
        Self {
            scheduler: Scheduler::new(hardware),
            mutexes: mutex::Table::new(),
            keys: Queue::new(),
            ticks: TickDivider::new(),
        }
    }

    /// Creates a kernel with the initial application queued, ready to be
    /// started by [`Kernel::launch`].
    pub fn boot(hardware: H, main: Entry) -> Self {
        let kernel = Self::new(hardware);
        kernel.submit(AppRequest::new(
            INITIAL_APP_NAME,
            main,
            INITIAL_APP_PRIORITY,
        ));
        kernel
    }

    /// Queue an application to be started.
    pub fn submit(&self, request: AppRequest) {
        self.scheduler.submit(request);
    }

    /// Start executing tasks. This must be called once, after the initial
    /// application was submitted.
    pub fn launch(&mut self) {
        self.scheduler.launch();
    }

    /// Demote the current task if it exhausted its quantum, then dispatch
    /// the next task of the running set.
    pub fn schedule(&mut self) {
        self.scheduler.schedule();
    }

    /// Handle a raw timer interrupt. Returns true if a scheduling decision
    /// was taken.
    pub fn timer_tick(&mut self) -> bool {
        let due = self.ticks.tick();
        if due {
            self.schedule();
        }
        due
    }

    /// Terminate the current task: wake up every task joined on it, return
    /// its slot to the free pool and dispatch another task. Returns the
    /// identifier of the terminated task, or `None` if the current task is
    /// the idle task, which cannot be terminated.
    pub fn exit_current(&mut self) -> Option<Identifier> {
        let slot = self.scheduler.retire_current()?;
        self.route(Action::Notify, Event::Task(slot));
        let id = self.scheduler.release(slot);
        self.scheduler.schedule_next();
        Some(id)
    }

    /// Block the current task until the task named `name` terminates.
    ///
    /// # Errors
    /// Returns [`JoinError::NotFound`] if no live task has this name, or
    /// [`JoinError::SelfJoin`] if the current task is the only one with
    /// this name.
    pub fn join(&mut self, name: &str) -> Result<Outcome, JoinError> {
        let current = self.scheduler.current_slot();
        match self.scheduler.find_other_by_name(name, current) {
            Some(target) => Ok(self.route(Action::Wait, Event::Task(target))),
            None if self.scheduler.find_by_name(name) == Some(current) => {
                Err(JoinError::SelfJoin)
            }
            None => Err(JoinError::NotFound),
        }
    }

    /// Handle a fatal exception raised by the current task by terminating
    /// it.
    pub fn fault(&mut self, fault: Fault) -> Option<Identifier> {
        let task = self.scheduler.current();
        log::error!("{:?} in task {} ({})", fault, task.id(), task.name());
        self.exit_current()
    }

    /// Set the value returned to the current task by its syscall.
    pub fn set_syscall_return(&mut self, value: usize) {
        let slot = self.scheduler.current_slot();
        self.scheduler
            .task_mut(slot)
            .context_mut()
            .set_syscall_return(value);
    }

    /// The identifier of the current task.
    #[must_use]
    pub fn current_id(&self) -> Identifier {
        self.scheduler.current().id()
    }

    /// The name of the current task.
    #[must_use]
    pub fn current_name(&self) -> &str {
        self.scheduler.current().name()
    }

    /// The control block of a live task.
    #[must_use]
    pub fn task(&self, id: Identifier) -> Option<&Task> {
        self.scheduler.find(id).map(|slot| self.scheduler.task(slot))
    }

    #[must_use]
    pub const fn scheduler(&self) -> &Scheduler<H> {
        &self.scheduler
    }

    #[must_use]
    pub const fn mutexes(&self) -> &mutex::Table {
        &self.mutexes
    }

    /// Count where every task slot is stored, checking that the queues
    /// partition the task pool.
    #[must_use]
    pub fn census(&self) -> Census {
        let mut seen = [0_u8; TASK_POOL_SIZE];
        let mut consistent = true;
        let mut visit = |queue: &Queue, state: State| {
            for slot in queue.iter() {
                seen[slot.index()] += 1;
                consistent &= self.scheduler.task(slot).state() == state;
            }
            queue.len()
        };

        let [free, ready, running] = self.scheduler.queues();
        let free = visit(free, State::Free);
        let ready = visit(ready, State::Ready);
        let running = visit(running, State::Running);

        let mut waiting = visit(&self.keys, State::Blocked);
        for mutex in self.mutexes.iter() {
            waiting += visit(&mutex.waiters, State::Blocked);
        }
        for task in self.scheduler.tasks() {
            waiting += visit(&task.waiters, State::Blocked);
        }

        let idle_parked = self.scheduler.task(IDLE).state() == State::Parked;
        if idle_parked {
            seen[IDLE.index()] += 1;
        }

        Census {
            free,
            ready,
            running,
            waiting,
            idle_parked,
            consistent: consistent && seen.iter().all(|&count| count == 1),
        }
    }
}

impl<H> core::fmt::Debug for Kernel<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Kernel")
            .field("scheduler", &self.scheduler)
            .field("mutexes", &self.mutexes.len())
            .field("keys", &self.keys)
            .field("ticks", &self.ticks.ticks())
            .finish()
    }
}

/// Install the global kernel instance, with the initial application queued.
/// Returns false if a kernel was already installed, in which case nothing is
/// done.
pub fn setup(hardware: Platform, main: Entry) -> bool {
    if KERNEL.is_completed() {
        return false;
    }
    KERNEL.call_once(|| spin::Mutex::new(Kernel::boot(hardware, main)));
    true
}

/// Run `f` with exclusive access to the global kernel instance. Returns
/// `None` if [`setup`] was never called.
pub fn with<R>(f: impl FnOnce(&mut Kernel<Platform>) -> R) -> Option<R> {
    KERNEL.get().map(|kernel| f(&mut *kernel.lock()))
}

/// Launch the global kernel instance, then hand the first task over to
/// `enter` once the kernel lock is released. `enter` is where the platform
/// jumps to user mode, and usually never returns. Returns `None` if
/// [`setup`] was never called.
pub fn launch<R>(enter: impl FnOnce(Identifier, Context) -> R) -> Option<R> {
    let (id, context) = with(|kernel| {
        kernel.launch();
        let task = kernel.scheduler.current();
        (task.id(), task.context().clone())
    })?;
    Some(enter(id, context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Recorder;
    use config::{IDLE_TASK_NAME, MAX_TASK_NUM, PID_BASE};

    #[test]
    fn boot_launches_the_initial_application() {
        let mut kernel = Kernel::boot(Recorder::default(), Entry::new(0x40_0000));
        assert_eq!(kernel.current_name(), IDLE_TASK_NAME);

        kernel.launch();
        assert_eq!(kernel.current_name(), INITIAL_APP_NAME);
        assert_eq!(kernel.current_id(), Identifier::from(PID_BASE));
        let main = kernel.task(Identifier::from(PID_BASE)).unwrap();
        assert_eq!(main.total_quantum(), 60);
        assert_eq!(main.context().entry(), Entry::new(0x40_0000));
        assert!(kernel.census().is_partition());
    }

    #[test]
    fn fresh_kernel_census() {
        let kernel = Kernel::new(Recorder::default());
        let census = kernel.census();
        assert_eq!(census.free, MAX_TASK_NUM);
        assert_eq!(census.running, 1);
        assert!(!census.idle_parked);
        assert!(census.is_partition());
    }

    #[test]
    fn timer_schedules_every_fifth_tick() {
        let mut kernel = Kernel::new(Recorder::default());
        kernel.submit(AppRequest::new("a", Entry::new(0), 0));
        kernel.submit(AppRequest::new("b", Entry::new(0), 0));
        kernel.launch();

        for _ in 0..4 {
            assert!(!kernel.timer_tick());
        }
        assert!(kernel.scheduler().hardware().loaded.is_empty());
        assert!(kernel.timer_tick());
        assert_eq!(kernel.scheduler().hardware().loaded.len(), 1);
    }

    #[test]
    fn exit_wakes_joiners_and_frees_the_slot() {
        let mut kernel = Kernel::new(Recorder::default());
        kernel.submit(AppRequest::new("joiner", Entry::new(0), 0));
        kernel.submit(AppRequest::new("worker", Entry::new(0), 0));
        kernel.launch();

        assert_eq!(kernel.current_name(), "joiner");
        assert_eq!(kernel.join("worker"), Ok(Outcome::Blocked));
        assert_eq!(kernel.current_name(), "worker");
        assert_eq!(kernel.census().waiting, 1);

        let worker = kernel.current_id();
        assert_eq!(kernel.exit_current(), Some(worker));
        assert!(kernel.task(worker).is_none());
        assert_eq!(kernel.current_name(), "joiner");
        assert!(kernel.census().is_partition());
    }

    #[test]
    fn join_errors() {
        let mut kernel = Kernel::new(Recorder::default());
        kernel.submit(AppRequest::new("solo", Entry::new(0), 0));
        kernel.launch();

        assert_eq!(kernel.join("nobody"), Err(JoinError::NotFound));
        assert_eq!(kernel.join(IDLE_TASK_NAME), Err(JoinError::NotFound));
        assert_eq!(kernel.join("solo"), Err(JoinError::SelfJoin));
        assert_eq!(kernel.current_name(), "solo");
    }

    #[test]
    fn join_skips_the_caller_among_namesakes() {
        let mut kernel = Kernel::new(Recorder::default());
        kernel.submit(AppRequest::new("twin", Entry::new(0), 0));
        kernel.submit(AppRequest::new("twin", Entry::new(0), 0));
        kernel.launch();

        let first = kernel.current_id();
        assert_eq!(kernel.join("twin"), Ok(Outcome::Blocked));
        let second = kernel.current_id();
        assert_ne!(first, second);
        assert_eq!(kernel.current_name(), "twin");

        assert_eq!(kernel.exit_current(), Some(second));
        assert_eq!(kernel.current_id(), first);
        assert_eq!(kernel.join("twin"), Err(JoinError::SelfJoin));
    }

    #[test]
    fn idle_cannot_be_terminated() {
        let mut kernel = Kernel::new(Recorder::default());
        assert_eq!(kernel.exit_current(), None);
        assert_eq!(kernel.fault(Fault::PageFault), None);
        assert_eq!(kernel.current_name(), IDLE_TASK_NAME);
        assert!(kernel.census().is_partition());
    }

    #[test]
    fn faulting_task_is_terminated() {
        let mut kernel = Kernel::new(Recorder::default());
        kernel.submit(AppRequest::new("crasher", Entry::new(0), 0));
        kernel.launch();

        let id = kernel.current_id();
        assert_eq!(kernel.fault(Fault::SegmentFault), Some(id));
        assert_eq!(kernel.current_name(), IDLE_TASK_NAME);
        assert_eq!(kernel.scheduler().free_len(), MAX_TASK_NUM);
    }
}
