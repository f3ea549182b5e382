use crate::{
    arch::{Entry, Hardware},
    kernel::{self, Kernel},
    task::AppRequest,
};
use syscall::task::{AppInfo, JoinError, RegisterError, name_from_bytes};
use zerocopy::FromBytes;

impl From<kernel::JoinError> for JoinError {
    fn from(error: kernel::JoinError) -> Self {
        match error {
            kernel::JoinError::NotFound => JoinError::NotFound,
            kernel::JoinError::SelfJoin => JoinError::SelfJoin,
        }
    }
}

/// Terminates the calling task. The idle task cannot be terminated, in
/// which case the syscall simply returns.
pub fn exit<H: Hardware>(kernel: &mut Kernel<H>) -> usize {
    kernel.exit_current();
    0
}

/// Blocks the calling task until the task whose name is in `payload`
/// terminates. The name may be padded with NUL bytes.
///
/// # Errors
/// Returns [`JoinError::BadName`] if the name is not valid UTF-8,
/// [`JoinError::NotFound`] if no live task has this name and
/// [`JoinError::SelfJoin`] if the caller has this name. The caller is not
/// blocked in any of these cases.
pub fn join<H: Hardware>(kernel: &mut Kernel<H>, payload: &[u8]) -> Result<usize, JoinError> {
    let name = name_from_bytes(payload).ok_or(JoinError::BadName)?;
    kernel.join(name)?;
    Ok(0)
}

/// Submits the application described by the [`AppInfo`] in `payload`. The
/// application is started once a task slot is available.
///
/// # Errors
/// Returns [`RegisterError::BadAppInfo`] if the payload does not have the
/// size of an [`AppInfo`], if the name is not valid UTF-8 or if the
/// priority does not fit in 8 bits.
pub fn register<H: Hardware>(
    kernel: &mut Kernel<H>,
    payload: &[u8],
) -> Result<usize, RegisterError> {
    let info = AppInfo::read_from_bytes(payload).map_err(|_| RegisterError::BadAppInfo)?;
    let name = name_from_bytes(&info.name).ok_or(RegisterError::BadAppInfo)?;
    let priority = u8::try_from(info.priority).map_err(|_| RegisterError::BadAppInfo)?;

    kernel.submit(AppRequest::new(name, Entry::new(info.entry), priority));
    Ok(0)
}
