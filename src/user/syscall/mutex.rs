use crate::{
    arch::Hardware,
    kernel::Kernel,
    sync::{
        Acquire,
        mutex::{self, Handle},
    },
};
use syscall::mutex::{ENTER_ACQUIRED, ENTER_BLOCKED, MutexError, Policy};

impl From<mutex::Error> for MutexError {
    fn from(error: mutex::Error) -> Self {
        match error {
            mutex::Error::InvalidHandle => MutexError::InvalidHandle,
            mutex::Error::Busy => MutexError::Busy,
            mutex::Error::NotOwner => MutexError::NotOwner,
            mutex::Error::TableFull => MutexError::Exhausted,
        }
    }
}

/// Unpacks a handle received from user space.
fn unpack(raw: usize) -> Result<Handle, MutexError> {
    Handle::from_raw(raw).ok_or(MutexError::InvalidHandle)
}

/// Creates a mutex with the policy encoded in `policy` and returns its
/// handle.
///
/// # Errors
/// Returns [`MutexError::BadPolicy`] if the policy is unknown, or
/// [`MutexError::Exhausted`] if no more mutexes can be created.
pub fn create<H: Hardware>(kernel: &mut Kernel<H>, policy: usize) -> Result<usize, MutexError> {
    let policy = Policy::try_from(policy)?;
    let handle = kernel.mutex_create(policy)?;
    Ok(handle.into_raw())
}

/// Enters the mutex. Returns [`ENTER_BLOCKED`] if the caller was blocked, in
/// which case it must enter the mutex again once it runs.
///
/// # Errors
/// Returns [`MutexError::InvalidHandle`] if the mutex does not exist.
pub fn enter<H: Hardware>(kernel: &mut Kernel<H>, handle: usize) -> Result<usize, MutexError> {
    match kernel.mutex_enter(unpack(handle)?)? {
        Acquire::Acquired => Ok(ENTER_ACQUIRED),
        Acquire::Blocked => Ok(ENTER_BLOCKED),
    }
}

/// Releases the mutex. A caller releasing a strict mutex it does not own is
/// terminated, and never sees the result of the syscall.
///
/// # Errors
/// Returns [`MutexError::InvalidHandle`] if the mutex does not exist.
pub fn exit<H: Hardware>(kernel: &mut Kernel<H>, handle: usize) -> Result<usize, MutexError> {
    match kernel.mutex_exit(unpack(handle)?) {
        Ok(_) | Err(mutex::Error::NotOwner) => Ok(0),
        Err(error) => Err(MutexError::from(error)),
    }
}

/// Destroys the mutex.
///
/// # Errors
/// Returns [`MutexError::InvalidHandle`] if the mutex does not exist, or
/// [`MutexError::Busy`] if it is held.
pub fn destroy<H: Hardware>(kernel: &mut Kernel<H>, handle: usize) -> Result<usize, MutexError> {
    kernel.mutex_destroy(unpack(handle)?)?;
    Ok(0)
}
