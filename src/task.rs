use crate::{
    arch::{Context, Entry},
    event::Event,
    sched::queue::Queue,
};
use config::{MAX_TIME_SLICE, TASK_NAME_CAPACITY};

/// A fixed-capacity task name. Names longer than [`TASK_NAME_CAPACITY`]
/// bytes are truncated on a character boundary.
pub type Name = heapless::String<TASK_NAME_CAPACITY>;

/// The position of a task control block inside the task pool. Slots are
/// stable for the whole kernel lifetime, contrary to task identifiers that
/// change every time a slot is recycled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot(usize);

impl Slot {
    #[must_use]
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    /// The index of the slot in the task pool.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A unique identifier for a task.
#[derive(Debug, Clone, Copy, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct Identifier(u32);

impl Identifier {
    /// The identifier of the idle task, also carried by free slots.
    pub const IDLE: Self = Self(0);
}

impl From<u32> for Identifier {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<Identifier> for u32 {
    fn from(id: Identifier) -> u32 {
        id.0
    }
}

impl core::fmt::Display for Identifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The priority of a task. Numerically larger values receive a smaller
/// quantum, so a task of priority 0 is the most favored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(u8);

impl Priority {
    /// The number of dispatch turns a task with this priority may receive
    /// in the running set before being demoted back to the ready set.
    #[must_use]
    pub const fn quantum(self) -> u16 {
        MAX_TIME_SLICE - self.0 as u16
    }
}

impl From<u8> for Priority {
    fn from(priority: u8) -> Self {
        Self(priority)
    }
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> u8 {
        priority.0
    }
}

/// A request to start a new application. Requests are queued until a free
/// task slot and a place in the ready set are available.
#[derive(Debug, Clone)]
pub struct AppRequest {
    /// The name of the future task.
    pub name: Name,

    /// The entry point of the application.
    pub entry: Entry,

    /// The priority of the future task.
    pub priority: Priority,
}

impl AppRequest {
    /// Creates a new request. The name is truncated if it does not fit in a
    /// task name.
    #[must_use]
    pub fn new(name: &str, entry: Entry, priority: u8) -> Self {
        Self {
            name: truncated_name(name),
            entry,
            priority: Priority::from(priority),
        }
    }
}

/// Copy as many characters of `name` as fit in a task name.
#[must_use]
pub fn truncated_name(name: &str) -> Name {
    let mut truncated = Name::new();
    for c in name.chars() {
        if truncated.push(c).is_err() {
            break;
        }
    }
    truncated
}

/// The task's state. It always mirrors the queue the task is stored in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    /// The slot is not used and can be reclaimed to start a new task.
    Free,

    /// The task is ready to run and is waiting for a place in the running
    /// set.
    Ready,

    /// The task is in the running set and receives dispatch turns.
    Running,

    /// The task is blocked on a wait queue and waits for an event to occur.
    Blocked,

    /// Only used by the idle task when it was removed from the running set
    /// because another task is available.
    Parked,
}

/// A task control block.
#[derive(Debug)]
pub struct Task {
    /// The identifier of the task, or [`Identifier::IDLE`] for the idle
    /// task and free slots.
    id: Identifier,

    /// The name of the task, used to join a task by name.
    name: Name,

    /// The priority the task was created with.
    priority: Priority,

    /// The number of dispatch turns received since the task was admitted
    /// into the running set.
    used_quantum: u16,

    /// The number of dispatch turns the task may receive before being
    /// demoted back to the ready set.
    total_quantum: u16,

    /// The state of the task.
    state: State,

    /// Tasks waiting for this task to terminate.
    pub(crate) waiters: Queue,

    /// The event blocking the task. It is set when the task blocks and is
    /// dropped when the task is woken up.
    pub(crate) pending: Option<Event>,

    /// The hardware context of the task.
    context: Context,
}

impl Task {
    /// Creates a free task control block.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            id: Identifier::IDLE,
            name: Name::new(),
            priority: Priority(0),
            used_quantum: 0,
            total_quantum: 0,
            state: State::Free,
            waiters: Queue::new(),
            pending: None,
            context: Context::new(Entry::new(0)),
        }
    }

    /// Initializes the control block from an application request.
    pub(crate) fn init(&mut self, id: Identifier, request: AppRequest) {
        debug_assert!(self.waiters.is_empty());
        debug_assert!(self.pending.is_none());
        self.id = id;
        self.name = request.name;
        self.priority = request.priority;
        self.used_quantum = 0;
        self.total_quantum = request.priority.quantum();
        self.context = Context::new(request.entry);
    }

    /// Clears the identifier of the task before returning its slot to the
    /// free pool.
    pub(crate) fn clear(&mut self) {
        debug_assert!(self.waiters.is_empty());
        self.id = Identifier::IDLE;
        self.pending = None;
        self.state = State::Free;
    }

    /// Counts one more dispatch turn.
    pub(crate) fn consume_turn(&mut self) {
        self.used_quantum = self.used_quantum.saturating_add(1);
    }

    /// Resets the dispatch turn counter on admission into the running set.
    pub(crate) fn reset_quantum(&mut self) {
        self.used_quantum = 0;
    }

    /// Returns true if the task has consumed its whole quantum.
    #[must_use]
    pub(crate) fn quantum_exhausted(&self) -> bool {
        self.used_quantum >= self.total_quantum
    }

    pub(crate) fn set_state(&mut self, state: State) {
        self.state = state;
    }

    pub(crate) fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    /// The task's identifier.
    #[must_use]
    pub const fn id(&self) -> Identifier {
        self.id
    }

    /// The task's name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// The task's priority.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// The number of dispatch turns received since the last admission into
    /// the running set.
    #[must_use]
    pub const fn used_quantum(&self) -> u16 {
        self.used_quantum
    }

    /// The number of dispatch turns allowed in the running set.
    #[must_use]
    pub const fn total_quantum(&self) -> u16 {
        self.total_quantum
    }

    /// The task's state.
    #[must_use]
    pub const fn state(&self) -> State {
        self.state
    }

    /// The task's hardware context.
    #[must_use]
    pub const fn context(&self) -> &Context {
        &self.context
    }

    /// Returns true if the task is blocked on an event.
    #[must_use]
    pub const fn is_blocked(&self) -> bool {
        self.pending.is_some()
    }
}
