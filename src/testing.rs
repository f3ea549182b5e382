use crate::{
    arch::Hardware,
    task::{Identifier, Task},
};
use alloc::vec::Vec;

/// A [`Hardware`] implementation recording the tasks it is asked to run.
#[derive(Debug, Default)]
pub struct Recorder {
    /// The task started by the launch.
    pub launched: Option<Identifier>,

    /// The tasks dispatched after the launch, in order.
    pub loaded: Vec<Identifier>,

    memory: usize,
}

impl Recorder {
    pub fn with_memory(memory: usize) -> Self {
        Self {
            memory,
            ..Self::default()
        }
    }
}

impl Hardware for Recorder {
    fn run(&mut self, task: &Task) {
        self.launched = Some(task.id());
    }

    fn load(&mut self, task: &Task) {
        self.loaded.push(task.id());
    }

    fn memory_size(&self) -> usize {
        self.memory
    }
}
