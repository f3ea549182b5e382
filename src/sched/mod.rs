//! The round-robin scheduler. Tasks live in a fixed pool of control blocks
//! and move between four kinds of queues: the free pool, the ready set, the
//! running set, and the wait queue of whatever resource they are blocked on.
//!
//! The running set is a small group of tasks sharing the CPU: every
//! scheduling decision rotates it and dispatches its new front. A task
//! leaves the running set when it has received as many dispatch turns as
//! its priority allows, when it blocks, or when it terminates. The ready set
//! holds tasks waiting for a place in the running set, and is itself fed
//! from the queue of pending application requests.
use crate::{
    arch::{Entry, Hardware},
    event::Event,
    task::{AppRequest, Identifier, Slot, State, Task},
};
use config::{
    IDLE_PRIORITY, IDLE_TASK_NAME, MAX_READY_TASK, MAX_RUNNING_TASK, MAX_TASK_NUM, PID_BASE,
    TASK_POOL_SIZE,
};
use crossbeam::queue::SegQueue;
use queue::Queue;

pub mod queue;

/// The slot of the idle task. It is the last slot of the pool and is never
/// part of the free pool.
pub const IDLE: Slot = Slot::new(MAX_TASK_NUM);

/// Errors that can occur when admitting a new task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitError {
    /// All task slots are in use.
    NoFreeSlot,

    /// No application request is pending.
    NoPendingRequest,
}

/// The scheduler state: the task pool, the queues partitioning it and the
/// queue of applications waiting to be started.
pub struct Scheduler<H> {
    /// The task control blocks. The slot [`IDLE`] holds the idle task.
    tasks: [Task; TASK_POOL_SIZE],

    /// Slots that are not used by any task.
    free: Queue,

    /// Tasks waiting for a place in the running set.
    ready: Queue,

    /// Tasks sharing the CPU. The front of the queue is the current task.
    running: Queue,

    /// Applications waiting for a free slot to be started. Requests can be
    /// submitted without exclusive access to the scheduler.
    pending: SegQueue<AppRequest>,

    /// The identifier that will be given to the next task created.
    next_id: u32,

    /// The context switch primitives.
    hardware: H,
}

impl<H: Hardware> Scheduler<H> {
    /// Create a new scheduler. All application slots are free and the idle
    /// task is the only member of the running set.
    pub fn new(hardware: H) -> Self {
        let mut scheduler = Self {
            tasks: core::array::from_fn(|_| Task::new()),
            free: Queue::new(),
            ready: Queue::new(),
            running: Queue::new(),
            pending: SegQueue::new(),
            next_id: PID_BASE,
            hardware,
        };

        for index in 0..MAX_TASK_NUM {
            scheduler.free.push(Slot::new(index));
        }

        let idle = &mut scheduler.tasks[IDLE.index()];
        idle.init(
            Identifier::IDLE,
            AppRequest::new(IDLE_TASK_NAME, Entry::new(0), IDLE_PRIORITY),
        );
        idle.set_state(State::Parked);
        scheduler.check_running();
        scheduler
    }

    /// Queue an application to be started as soon as a task slot and a
    /// place in the ready set are available.
    pub fn submit(&self, request: AppRequest) {
        log::debug!("Application {} submitted", request.name);
        self.pending.push(request);
    }

    /// Start executing the front of the running set for the first time.
    pub fn launch(&mut self) {
        self.ready_to_running();
        self.check_running();

        let slot = self.current_slot();
        self.tasks[slot.index()].consume_turn();
        log::info!("Launching task {}", self.tasks[slot.index()].name());
        self.hardware.run(&self.tasks[slot.index()]);
    }

    /// The periodic scheduling decision: demote the current task if it has
    /// consumed its quantum, then dispatch the next task.
    pub fn schedule(&mut self) {
        self.running_to_ready();
        self.schedule_next();
    }

    /// Dispatch the next task of the running set, admitting new tasks first
    /// if there is room for them.
    pub fn schedule_next(&mut self) {
        self.ready_to_running();
        self.check_running();
        self.running.rotate();

        let slot = self.current_slot();
        let task = &mut self.tasks[slot.index()];
        task.consume_turn();
        log::trace!("Dispatching task {} ({})", task.id(), task.name());
        self.hardware.load(&self.tasks[slot.index()]);
    }

    /// Take a free slot and initialize it from the next pending request.
    ///
    /// # Errors
    /// Returns [`AdmitError::NoFreeSlot`] if the pool is exhausted, or
    /// [`AdmitError::NoPendingRequest`] if there is nothing to admit. The
    /// pending queue is left untouched when no slot is available.
    pub fn admit_from_free(&mut self) -> Result<Slot, AdmitError> {
        let slot = self.free.pop().ok_or(AdmitError::NoFreeSlot)?;
        let Some(request) = self.pending.pop() else {
            self.free.push(slot);
            return Err(AdmitError::NoPendingRequest);
        };

        let id = Identifier::from(self.next_id);
        self.next_id += 1;
        self.tasks[slot.index()].init(id, request);
        log::debug!("Task {} ({}) created", id, self.tasks[slot.index()].name());
        Ok(slot)
    }

    /// Create tasks from pending requests while the ready set has room.
    fn create_tasks(&mut self) {
        while !self.pending.is_empty() && self.ready.len() < MAX_READY_TASK {
            match self.admit_from_free() {
                Ok(slot) => self.move_to_ready(slot),
                Err(_) => break,
            }
        }
    }

    /// Admit new tasks into the ready set, then fill the running set from
    /// the ready set. The idle task does not count toward the capacity of
    /// the running set since it leaves it as soon as another task is there.
    fn ready_to_running(&mut self) {
        if self.ready.len() < MAX_READY_TASK {
            self.create_tasks();
        }

        while self.running_load() < MAX_RUNNING_TASK {
            let Some(slot) = self.ready.pop() else {
                break;
            };
            let task = &mut self.tasks[slot.index()];
            task.reset_quantum();
            task.set_state(State::Running);
            self.running.push(slot);
            log::trace!("Task {} admitted into the running set", task.id());
        }
    }

    /// Keep the idle task in the running set if and only if no other task
    /// is running, so that there is always something to dispatch.
    fn check_running(&mut self) {
        if self.running.is_empty() {
            self.tasks[IDLE.index()].set_state(State::Running);
            self.running.push(IDLE);
        } else if self.running.len() > 1 && self.running.front() == Some(IDLE) {
            self.running.pop();
            self.tasks[IDLE.index()].set_state(State::Parked);
        }
    }

    /// Demote the current task to the ready set if it has received all the
    /// dispatch turns its priority allows.
    fn running_to_ready(&mut self) {
        let Some(slot) = self.running.front() else {
            return;
        };

        if slot != IDLE && self.tasks[slot.index()].quantum_exhausted() {
            self.running.pop();
            self.move_to_ready(slot);
            log::trace!("Task {} demoted", self.tasks[slot.index()].id());
        }
    }

    /// Append a task that is not part of any queue to the ready set.
    fn move_to_ready(&mut self, slot: Slot) {
        self.tasks[slot.index()].set_state(State::Ready);
        self.ready.push(slot);
    }

    /// Remove the current task from the running set and store the event it
    /// is waiting for. The caller must then insert the returned slot into
    /// the wait queue of the resource and dispatch another task.
    ///
    /// The idle task never blocks: if it is the current task, nothing is
    /// done and the event is dropped.
    pub(crate) fn block_current(&mut self, event: Event) -> Option<Slot> {
        let slot = self.current_slot();
        if slot == IDLE {
            log::warn!("The idle task cannot wait for {:?}", event);
            return None;
        }

        self.running.pop();
        let task = &mut self.tasks[slot.index()];
        task.pending = Some(event);
        task.set_state(State::Blocked);
        log::trace!("Task {} blocked", task.id());
        Some(slot)
    }

    /// Block the current task on the given wait queue and dispatch another
    /// task. Returns false if the current task could not be blocked.
    pub(crate) fn wait_event(&mut self, queue: &mut Queue, event: Event) -> bool {
        let Some(slot) = self.block_current(event) else {
            return false;
        };
        queue.push(slot);
        self.schedule_next();
        true
    }

    /// Block the current task until the task in `target` terminates.
    pub(crate) fn wait_task(&mut self, target: Slot, event: Event) -> bool {
        let Some(slot) = self.block_current(event) else {
            return false;
        };
        self.tasks[target.index()].waiters.push(slot);
        self.schedule_next();
        true
    }

    /// Move every task of the wait queue to the ready set, in order, and
    /// drop the event each of them was waiting for. Returns the number of
    /// tasks woken up.
    pub(crate) fn wake_all(&mut self, queue: &mut Queue) -> usize {
        let mut woken = 0;
        while let Some(slot) = queue.pop() {
            let task = &mut self.tasks[slot.index()];
            let event = task.pending.take();
            debug_assert!(event.is_some(), "Task {} woken without event", task.id());
            drop(event);

            log::trace!("Task {} woken up", task.id());
            self.move_to_ready(slot);
            woken += 1;
        }
        woken
    }

    /// Wake every task waiting for the termination of the task in `target`.
    pub(crate) fn wake_task_waiters(&mut self, target: Slot) -> usize {
        let mut waiters = core::mem::take(&mut self.tasks[target.index()].waiters);
        self.wake_all(&mut waiters)
    }

    /// Remove the current task from the running set before terminating it.
    /// The idle task cannot be terminated.
    pub(crate) fn retire_current(&mut self) -> Option<Slot> {
        let slot = self.current_slot();
        if slot == IDLE {
            log::warn!("Refusing to terminate the idle task");
            return None;
        }
        self.running.pop();
        Some(slot)
    }

    /// Return a retired task to the free pool, clearing its identifier.
    /// Returns the identifier the task had.
    pub(crate) fn release(&mut self, slot: Slot) -> Identifier {
        let task = &mut self.tasks[slot.index()];
        let id = task.id();
        task.clear();
        self.free.push(slot);
        log::debug!("Task {} terminated", id);
        id
    }

    /// The number of tasks in the running set, not counting the idle task.
    fn running_load(&self) -> usize {
        self.running.len() - usize::from(self.running.contains(IDLE))
    }

    /// The slot of the current task, which is always the front of the
    /// running set.
    #[must_use]
    pub fn current_slot(&self) -> Slot {
        self.running.front().unwrap_or(IDLE)
    }

    /// The current task.
    #[must_use]
    pub fn current(&self) -> &Task {
        &self.tasks[self.current_slot().index()]
    }

    #[must_use]
    pub fn task(&self, slot: Slot) -> &Task {
        &self.tasks[slot.index()]
    }

    pub(crate) fn task_mut(&mut self, slot: Slot) -> &mut Task {
        &mut self.tasks[slot.index()]
    }

    /// Find the slot of a live task by its identifier.
    #[must_use]
    pub fn find(&self, id: Identifier) -> Option<Slot> {
        self.live().find(|&slot| self.tasks[slot.index()].id() == id)
    }

    /// Find the slot of the first live task with the given name. The idle
    /// task is never found.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<Slot> {
        self.named(name).next()
    }

    /// Find the slot of the first live task with the given name, skipping
    /// the task in `except`.
    #[must_use]
    pub fn find_other_by_name(&self, name: &str, except: Slot) -> Option<Slot> {
        self.named(name).find(|&slot| slot != except)
    }

    fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = Slot> + 'a {
        let idle = name == IDLE_TASK_NAME;
        self.live()
            .filter(move |&slot| !idle && self.tasks[slot.index()].name() == name)
    }

    /// Iterate over the slots of all tasks that are not free, idle excluded.
    fn live(&self) -> impl Iterator<Item = Slot> + '_ {
        (0..MAX_TASK_NUM)
            .map(Slot::new)
            .filter(|&slot| self.tasks[slot.index()].state() != State::Free)
    }

    /// The identifiers of the running set, front to back.
    pub fn running(&self) -> impl Iterator<Item = Identifier> + '_ {
        self.running.iter().map(|slot| self.tasks[slot.index()].id())
    }

    /// The identifiers of the ready set, front to back.
    pub fn ready(&self) -> impl Iterator<Item = Identifier> + '_ {
        self.ready.iter().map(|slot| self.tasks[slot.index()].id())
    }

    pub(crate) fn queues(&self) -> [&Queue; 3] {
        [&self.free, &self.ready, &self.running]
    }

    pub(crate) fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    #[must_use]
    pub fn running_len(&self) -> usize {
        self.running.len()
    }

    #[must_use]
    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    #[must_use]
    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    /// The number of application requests not yet turned into tasks.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub const fn hardware(&self) -> &H {
        &self.hardware
    }
}

impl<H> core::fmt::Debug for Scheduler<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Scheduler")
            .field("free", &self.free)
            .field("ready", &self.ready)
            .field("running", &self.running)
            .field("pending", &self.pending.len())
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Priority;
    use crate::testing::Recorder;
    use alloc::vec::Vec;

    fn app(name: &str, priority: u8) -> AppRequest {
        AppRequest::new(name, Entry::new(0x1000), priority)
    }

    fn running(scheduler: &Scheduler<Recorder>) -> Vec<u32> {
        scheduler.running().map(u32::from).collect()
    }

    #[test]
    fn starts_with_idle_running() {
        let scheduler = Scheduler::new(Recorder::default());
        assert_eq!(scheduler.current_slot(), IDLE);
        assert_eq!(scheduler.current().name(), IDLE_TASK_NAME);
        assert_eq!(scheduler.free_len(), MAX_TASK_NUM);
        assert_eq!(scheduler.running_len(), 1);
    }

    #[test]
    fn launch_runs_the_first_application() {
        let mut scheduler = Scheduler::new(Recorder::default());
        scheduler.submit(app("AppMain", 200));
        scheduler.launch();

        assert_eq!(scheduler.hardware().launched, Some(Identifier::from(PID_BASE)));
        assert_eq!(scheduler.current().name(), "AppMain");
        assert_eq!(scheduler.current().used_quantum(), 1);
        assert_eq!(scheduler.task(IDLE).state(), State::Parked);
    }

    #[test]
    fn identifiers_are_monotonic() {
        let mut scheduler = Scheduler::new(Recorder::default());
        for name in ["a", "b", "c"] {
            scheduler.submit(app(name, 0));
        }
        scheduler.schedule_next();
        assert_eq!(running(&scheduler), [0x11, 0x12, 0x10]);
    }

    #[test]
    fn admission_without_request_keeps_the_slot() {
        let mut scheduler = Scheduler::new(Recorder::default());
        assert_eq!(scheduler.admit_from_free(), Err(AdmitError::NoPendingRequest));
        assert_eq!(scheduler.free_len(), MAX_TASK_NUM);
    }

    #[test]
    fn round_robin_rotation() {
        let mut scheduler = Scheduler::new(Recorder::default());
        for name in ["a", "b", "c"] {
            scheduler.submit(app(name, 0));
        }
        for _ in 0..9 {
            scheduler.schedule();
        }

        let dispatched: Vec<u32> = scheduler
            .hardware()
            .loaded
            .iter()
            .map(|&id| u32::from(id))
            .collect();
        assert_eq!(dispatched, [0x11, 0x12, 0x10, 0x11, 0x12, 0x10, 0x11, 0x12, 0x10]);
    }

    #[test]
    fn exhausted_task_is_demoted_then_readmitted() {
        let mut scheduler = Scheduler::new(Recorder::default());
        scheduler.submit(app("solo", 255));
        let quantum = Priority::from(255).quantum();

        for turn in 1..=quantum {
            scheduler.schedule();
            assert_eq!(scheduler.current().used_quantum(), turn);
        }

        // The next decision demotes the task, then admits it again with a
        // fresh quantum since it is the only candidate.
        scheduler.schedule();
        assert_eq!(scheduler.current().name(), "solo");
        assert_eq!(scheduler.current().used_quantum(), 1);
    }

    #[test]
    fn idle_is_never_demoted() {
        let mut scheduler = Scheduler::new(Recorder::default());
        for _ in 0..20 {
            scheduler.schedule();
            assert_eq!(scheduler.current_slot(), IDLE);
            assert_eq!(scheduler.running_len(), 1);
        }
    }

    #[test]
    fn idle_cannot_block_or_retire() {
        let mut scheduler = Scheduler::new(Recorder::default());
        let mut queue = Queue::new();
        assert!(!scheduler.wait_event(&mut queue, Event::Key(None)));
        assert!(queue.is_empty());
        assert_eq!(scheduler.retire_current(), None);
        assert_eq!(scheduler.current_slot(), IDLE);
    }

    #[test]
    fn blocked_task_leaves_running_until_woken() {
        let mut scheduler = Scheduler::new(Recorder::default());
        scheduler.submit(app("a", 0));
        scheduler.submit(app("b", 0));
        scheduler.schedule();

        let mut queue = Queue::new();
        let blocked = scheduler.current_slot();
        assert!(scheduler.wait_event(&mut queue, Event::Key(None)));
        assert_eq!(scheduler.task(blocked).state(), State::Blocked);
        assert!(scheduler.task(blocked).is_blocked());
        assert_eq!(scheduler.running_len(), 1);

        assert_eq!(scheduler.wake_all(&mut queue), 1);
        assert_eq!(scheduler.task(blocked).state(), State::Ready);
        assert!(!scheduler.task(blocked).is_blocked());

        scheduler.schedule();
        assert_eq!(scheduler.task(blocked).state(), State::Running);
        assert_eq!(scheduler.running_len(), 2);
    }

    #[test]
    fn release_recycles_the_slot() {
        let mut scheduler = Scheduler::new(Recorder::default());
        scheduler.submit(app("a", 0));
        scheduler.schedule();

        let slot = scheduler.retire_current().unwrap();
        let id = scheduler.release(slot);
        assert_eq!(id, Identifier::from(PID_BASE));
        assert_eq!(scheduler.task(slot).state(), State::Free);
        assert_eq!(scheduler.find(id), None);
        assert_eq!(scheduler.free_len(), MAX_TASK_NUM);
    }

    #[test]
    fn find_by_name_skips_idle_and_free_slots() {
        let mut scheduler = Scheduler::new(Recorder::default());
        assert_eq!(scheduler.find_by_name(IDLE_TASK_NAME), None);
        assert_eq!(scheduler.find_by_name(""), None);

        scheduler.submit(app("worker", 0));
        scheduler.schedule();
        let slot = scheduler.find_by_name("worker").unwrap();
        assert_eq!(scheduler.task(slot).name(), "worker");
    }
}
