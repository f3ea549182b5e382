/// The ownership policy requested when creating a mutex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// A binary lock without ownership tracking: any task may release it.
    Normal = 0,

    /// An ownership-tracked lock: only the task that acquired it may
    /// release it, and the owner may enter it again without blocking.
    Strict = 1,
}

impl TryFrom<usize> for Policy {
    type Error = MutexError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Policy::Normal),
            1 => Ok(Policy::Strict),
            _ => Err(MutexError::BadPolicy),
        }
    }
}

/// Value returned by the `MutexEnter` syscall when the mutex was acquired.
pub const ENTER_ACQUIRED: usize = 0;

/// Value returned by the `MutexEnter` syscall when the caller was blocked.
/// The caller must retry once it is running again, since all waiters are
/// woken up when the mutex is released and only one of them will win.
pub const ENTER_BLOCKED: usize = 1;

/// Errors that can occur when operating on a mutex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutexError {
    /// An unknown error occurred.
    Unknown = 0,

    /// The handle does not designate a live mutex.
    InvalidHandle = 1,

    /// The mutex is held and cannot be destroyed.
    Busy = 2,

    /// The caller does not own the strict mutex it tried to release.
    NotOwner = 3,

    /// The requested policy does not exist.
    BadPolicy = 4,

    /// No more mutexes can be created.
    Exhausted = 5,
}

impl From<MutexError> for isize {
    fn from(error: MutexError) -> Self {
        match error {
            MutexError::Unknown => 0,
            MutexError::InvalidHandle => 1,
            MutexError::Busy => 2,
            MutexError::NotOwner => 3,
            MutexError::BadPolicy => 4,
            MutexError::Exhausted => 5,
        }
    }
}

impl crate::SyscallCode for MutexError {
    fn from_syscall_code(code: isize) -> Self {
        match -code {
            1 => MutexError::InvalidHandle,
            2 => MutexError::Busy,
            3 => MutexError::NotOwner,
            4 => MutexError::BadPolicy,
            5 => MutexError::Exhausted,
            _ => MutexError::Unknown,
        }
    }
}
