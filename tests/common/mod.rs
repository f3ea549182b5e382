#![allow(dead_code)]

use taskcore::{
    Kernel,
    arch::{Entry, Hardware},
    task::{AppRequest, Identifier, Task},
};

/// A [`Hardware`] implementation that only records dispatches.
#[derive(Debug, Default)]
pub struct Recorder {
    pub launched: Option<Identifier>,
    pub loaded: Vec<Identifier>,
}

impl Hardware for Recorder {
    fn run(&mut self, task: &Task) {
        self.launched = Some(task.id());
    }

    fn load(&mut self, task: &Task) {
        self.loaded.push(task.id());
    }
}

/// Build a kernel running the given applications, all with priority 0.
pub fn launched(names: &[&str]) -> Kernel<Recorder> {
    let mut kernel = Kernel::new(Recorder::default());
    for name in names {
        kernel.submit(AppRequest::new(name, Entry::new(0x1000), 0));
    }
    kernel.launch();
    kernel
}

/// Dispatch tasks until the task named `name` is the current one.
///
/// # Panics
/// Panics if the task is not reached within a full rotation of the pool.
pub fn switch_to(kernel: &mut Kernel<Recorder>, name: &str) {
    for _ in 0..=config::TASK_POOL_SIZE {
        if kernel.current_name() == name {
            return;
        }
        kernel.schedule();
    }
    panic!("task {name} is not running");
}
