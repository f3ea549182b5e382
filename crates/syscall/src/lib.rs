//! System call definitions shared by the kernel and by user-space
//! applications. Keeping the numbering, payload layouts and error codes in
//! a single crate prevents the two sides from drifting apart, which would
//! otherwise lead to subtle bugs that are hard to track down.
#![no_std]

pub mod mutex;
pub mod task;

/// Enumeration of supported syscall operations by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum SyscallOp {
    /// No operation syscall, used for testing purposes.
    Nop = 0,

    /// Terminate the calling task. This syscall never returns.
    TaskExit = 1,

    /// Block until the task with the given name terminates.
    TaskJoin = 2,

    /// Submit a new application to be started as a task.
    TaskRegister = 3,

    /// Create a new mutex.
    MutexCreate = 4,

    /// Try to acquire a mutex, blocking if it is held.
    MutexEnter = 5,

    /// Release a mutex.
    MutexExit = 6,

    /// Destroy a mutex that is not held.
    MutexDestroy = 7,

    /// Block until a key is pressed and return its code.
    KeyRead = 8,

    /// Return the amount of memory available to the system.
    MemorySize = 9,

    /// Used for representing an unknown or unsupported syscall operation. It
    /// cannot be used in actual syscalls.
    Unknown = u32::MAX,
}

impl From<usize> for SyscallOp {
    fn from(value: usize) -> Self {
        match u32::try_from(value).unwrap_or(u32::MAX) {
            0 => SyscallOp::Nop,
            1 => SyscallOp::TaskExit,
            2 => SyscallOp::TaskJoin,
            3 => SyscallOp::TaskRegister,
            4 => SyscallOp::MutexCreate,
            5 => SyscallOp::MutexEnter,
            6 => SyscallOp::MutexExit,
            7 => SyscallOp::MutexDestroy,
            8 => SyscallOp::KeyRead,
            9 => SyscallOp::MemorySize,
            _ => SyscallOp::Unknown,
        }
    }
}

/// A trait that help to convert syscall return codes into specific error
/// types for better error handling.
pub trait SyscallCode {
    /// Converts a syscall error code into a specific error type. Unknown
    /// codes are mapped to a generic unknown error.
    fn from_syscall_code(code: isize) -> Self;
}

/// Checks if the given syscall return code indicates a failure. Code between
/// -1 and -255 (inclusive) are considered error codes.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn failed(code: usize) -> bool {
    (code as isize) < 0 && (code as isize) >= -255
}
