#![no_std]

/// The number of task control blocks available to applications. The pool is
/// allocated once at startup and never grows: a new task can only be created
/// by recycling a slot freed by a terminated task. Requests submitted while
/// the pool is exhausted are queued until a slot becomes free.
pub const MAX_TASK_NUM: usize = 16;

/// The maximum number of tasks that can share the CPU in the running set at
/// the same time. Each of them receives one dispatch turn per rotation of
/// the set, so this value bounds the latency seen by any running task.
pub const MAX_RUNNING_TASK: usize = 8;

/// The maximum number of tasks waiting in the ready set for a place in the
/// running set.
pub const MAX_READY_TASK: usize = MAX_TASK_NUM - MAX_RUNNING_TASK;

/// The total number of task slots, including the slot reserved for the
/// idle task.
pub const TASK_POOL_SIZE: usize = MAX_TASK_NUM + 1;

/// The first identifier handed out to an application task. Identifiers are
/// assigned in increasing order and are never reused. The value 0 is
/// reserved for the idle task and for free slots.
pub const PID_BASE: u32 = 0x10;

/// The number of dispatch turns a task of priority 0 may receive before
/// being demoted back to the ready set. A task of priority `p` receives
/// `MAX_TIME_SLICE - p` turns.
pub const MAX_TIME_SLICE: u16 = 260;

/// The maximum length in bytes of a task name. Longer names are truncated.
pub const TASK_NAME_CAPACITY: usize = 15;

/// The number of raw timer interrupts between two scheduling decisions.
/// Scheduling on every tick would spend too much time switching between
/// tasks, so only every fifth tick triggers the scheduler.
pub const SCHEDULE_TICK_DIVISOR: u32 = 5;

/// The name of the idle task. A join on this name never blocks.
pub const IDLE_TASK_NAME: &str = "IdleTask";

/// The priority of the idle task. It is never demoted, so the value only
/// matters for diagnostics.
pub const IDLE_PRIORITY: u8 = 255;

/// The name of the first application submitted at boot.
pub const INITIAL_APP_NAME: &str = "AppMain";

/// The priority of the first application submitted at boot.
pub const INITIAL_APP_PRIORITY: u8 = 200;
