use crate::task::Slot;
use config::TASK_POOL_SIZE;

/// A FIFO queue of tasks. It is used for the free, ready and running sets,
/// and as the wait queue of every resource a task can block on.
///
/// A task is stored in at most one queue at any time, so a queue never holds
/// more than [`TASK_POOL_SIZE`] tasks and can be allocated inline.
#[derive(Debug)]
pub struct Queue {
    slots: heapless::Deque<Slot, TASK_POOL_SIZE>,
}

impl Queue {
    /// Creates a new empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: heapless::Deque::new(),
        }
    }

    /// Append a task at the back of the queue.
    ///
    /// # Panics
    /// Panics if the queue is full. This can only happen if a task was
    /// inserted in two queues at the same time, which is a serious bug.
    pub fn push(&mut self, slot: Slot) {
        assert!(
            self.slots.push_back(slot).is_ok(),
            "Queue larger than the task pool"
        );
    }

    /// Remove the task at the front of the queue.
    pub fn pop(&mut self) -> Option<Slot> {
        self.slots.pop_front()
    }

    /// The task at the front of the queue.
    #[must_use]
    pub fn front(&self) -> Option<Slot> {
        self.slots.front().copied()
    }

    /// Move the task at the front of the queue to its back.
    pub fn rotate(&mut self) {
        if let Some(slot) = self.slots.pop_front() {
            self.push(slot);
        }
    }

    #[must_use]
    pub fn contains(&self, slot: Slot) -> bool {
        self.slots.iter().any(|&s| s == slot)
    }

    /// Iterate over the tasks of the queue, front to back.
    pub fn iter(&self) -> impl Iterator<Item = Slot> + '_ {
        self.slots.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Default for Queue {
    fn default() -> Self {
        Self::new()
    }
}
