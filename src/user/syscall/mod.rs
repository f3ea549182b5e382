use crate::{arch::Hardware, kernel::Kernel};
use syscall::SyscallOp;

pub mod mutex;
pub mod task;

/// What the trap handler must do once a syscall has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    /// The caller is still the current task and can be resumed.
    Continue,

    /// The caller blocked or terminated, and another task was dispatched.
    Switched,
}

/// Handles a syscall invoked by the current task. The trap collaborator
/// provides the syscall number, its two word arguments and a copy of the
/// payload buffer of the caller, if any.
///
/// The result of the syscall is written into the syscall return slot of
/// the caller: the value on success, or the negated error code on failure.
/// Nothing is written if the caller was terminated.
#[allow(clippy::cast_sign_loss)]
pub fn handle<H: Hardware>(
    kernel: &mut Kernel<H>,
    id: usize,
    args: [usize; 2],
    payload: &[u8],
) -> Resume {
    let caller = kernel.scheduler().current_slot();
    let caller_id = kernel.current_id();

    log::trace!("Handling syscall ID: {}", id);
    let result = match SyscallOp::from(id) {
        SyscallOp::Nop => Ok(0),
        SyscallOp::TaskExit => Ok(task::exit(kernel)),
        SyscallOp::TaskJoin => task::join(kernel, payload).map_err(isize::from),
        SyscallOp::TaskRegister => task::register(kernel, payload).map_err(isize::from),
        SyscallOp::MutexCreate => mutex::create(kernel, args[0]).map_err(isize::from),
        SyscallOp::MutexEnter => mutex::enter(kernel, args[0]).map_err(isize::from),
        SyscallOp::MutexExit => mutex::exit(kernel, args[0]).map_err(isize::from),
        SyscallOp::MutexDestroy => mutex::destroy(kernel, args[0]).map_err(isize::from),
        SyscallOp::KeyRead => {
            // The key code replaces this value when it is delivered.
            kernel.read_key();
            Ok(0)
        }
        SyscallOp::MemorySize => Ok(kernel.scheduler().hardware().memory_size()),
        SyscallOp::Unknown => {
            log::warn!("Unknown syscall ID: {}", id);
            Ok(0)
        }
    };

    let value = match result {
        Ok(value) => {
            log::trace!("Syscall completed successfully.");
            value
        }
        Err(e) => {
            log::trace!("Syscall failed with error code: {}", e);
            (-e) as usize
        }
    };

    // The slot of a terminated caller may already host a new task.
    if kernel.scheduler().task(caller).id() == caller_id {
        kernel
            .scheduler
            .task_mut(caller)
            .context_mut()
            .set_syscall_return(value);
    }

    if kernel.scheduler().current_slot() == caller && kernel.current_id() == caller_id {
        Resume::Continue
    } else {
        Resume::Switched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{arch::Entry, task::AppRequest, testing::Recorder};
    use syscall::{SyscallCode, failed, mutex::MutexError};

    fn kernel() -> Kernel<Recorder> {
        let mut kernel = Kernel::new(Recorder::with_memory(64 << 20));
        kernel.submit(AppRequest::new("shell", Entry::new(0x1000), 0));
        kernel.launch();
        kernel
    }

    fn returned(kernel: &Kernel<Recorder>) -> usize {
        kernel.scheduler().current().context().syscall_return()
    }

    #[test]
    fn nop_and_unknown_continue() {
        let mut kernel = kernel();
        assert_eq!(handle(&mut kernel, SyscallOp::Nop as usize, [0; 2], &[]), Resume::Continue);
        assert_eq!(returned(&kernel), 0);
        assert_eq!(handle(&mut kernel, 1234, [0; 2], &[]), Resume::Continue);
        assert_eq!(returned(&kernel), 0);
    }

    #[test]
    fn memory_size_comes_from_the_hardware() {
        let mut kernel = kernel();
        handle(&mut kernel, SyscallOp::MemorySize as usize, [0; 2], &[]);
        assert_eq!(returned(&kernel), 64 << 20);
    }

    #[test]
    fn errors_are_written_negated() {
        let mut kernel = kernel();
        let resume = handle(&mut kernel, SyscallOp::MutexEnter as usize, [0xDEAD, 0], &[]);
        assert_eq!(resume, Resume::Continue);

        let code = returned(&kernel);
        assert!(failed(code));
        #[allow(clippy::cast_possible_wrap)]
        let error = MutexError::from_syscall_code(code as isize);
        assert_eq!(error, MutexError::InvalidHandle);
    }

    #[test]
    fn exit_switches_away_from_the_caller() {
        let mut kernel = kernel();
        let resume = handle(&mut kernel, SyscallOp::TaskExit as usize, [0; 2], &[]);
        assert_eq!(resume, Resume::Switched);
        assert_eq!(kernel.current_name(), config::IDLE_TASK_NAME);
    }

    #[test]
    fn key_read_blocks_the_caller() {
        let mut kernel = kernel();
        let reader = kernel.scheduler().current_slot();
        let resume = handle(&mut kernel, SyscallOp::KeyRead as usize, [0; 2], &[]);
        assert_eq!(resume, Resume::Switched);

        kernel.deliver_key(b'q'.into());
        let task = kernel.scheduler().task(reader);
        assert_eq!(task.context().syscall_return(), usize::from(b'q'));
    }
}
