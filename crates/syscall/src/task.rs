use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Maximum length of a task name carried in a syscall payload, including
/// the terminating NUL bytes used as padding.
pub const NAME_SIZE: usize = 16;

/// The description of an application submitted with the `TaskRegister`
/// syscall. We use the C representation to ensure a predictable layout
/// compatible with the kernel.
#[derive(Debug, Clone, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct AppInfo {
    /// The address of the application entry point.
    pub entry: usize,

    /// The priority of the application. Only the lowest 8 bits are
    /// meaningful, larger values are rejected by the kernel.
    pub priority: usize,

    /// The application name, padded with NUL bytes.
    pub name: [u8; NAME_SIZE],
}

impl AppInfo {
    /// Creates a new application description. The name is truncated if it
    /// does not fit in the payload.
    #[must_use]
    pub fn new(name: &str, entry: usize, priority: u8) -> Self {
        let mut buffer = [0; NAME_SIZE];
        let len = name.len().min(NAME_SIZE);
        buffer[..len].copy_from_slice(&name.as_bytes()[..len]);
        Self {
            entry,
            priority: usize::from(priority),
            name: buffer,
        }
    }
}

/// Extracts a name from a NUL padded byte buffer. Returns `None` if the
/// bytes before the first NUL are not valid UTF-8.
#[must_use]
pub fn name_from_bytes(bytes: &[u8]) -> Option<&str> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    core::str::from_utf8(&bytes[..end]).ok()
}

/// Errors that can occur when joining a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinError {
    /// An unknown error occurred.
    Unknown = 0,

    /// An invalid name was provided. It could be due to an invalid pointer,
    /// length, or the name not being valid UTF-8.
    BadName = 1,

    /// No live task has the given name.
    NotFound = 2,

    /// A task cannot wait for its own termination.
    SelfJoin = 3,
}

impl From<JoinError> for isize {
    fn from(error: JoinError) -> Self {
        match error {
            JoinError::Unknown => 0,
            JoinError::BadName => 1,
            JoinError::NotFound => 2,
            JoinError::SelfJoin => 3,
        }
    }
}

impl crate::SyscallCode for JoinError {
    fn from_syscall_code(code: isize) -> Self {
        match -code {
            1 => JoinError::BadName,
            2 => JoinError::NotFound,
            3 => JoinError::SelfJoin,
            _ => JoinError::Unknown,
        }
    }
}

/// Errors that can occur when registering an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterError {
    /// An unknown error occurred.
    Unknown = 0,

    /// The payload does not describe a valid application: wrong size, a
    /// name that is not valid UTF-8 or a priority out of range.
    BadAppInfo = 1,
}

impl From<RegisterError> for isize {
    fn from(error: RegisterError) -> Self {
        match error {
            RegisterError::Unknown => 0,
            RegisterError::BadAppInfo => 1,
        }
    }
}

impl crate::SyscallCode for RegisterError {
    fn from_syscall_code(code: isize) -> Self {
        match -code {
            1 => RegisterError::BadAppInfo,
            _ => RegisterError::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SyscallCode;

    #[test]
    fn app_info_survives_the_payload_layout() {
        let info = AppInfo::new("shell", 0x8000, 12);
        let parsed = AppInfo::read_from_bytes(info.as_bytes()).unwrap();
        assert_eq!(parsed.entry, 0x8000);
        assert_eq!(parsed.priority, 12);
        assert_eq!(name_from_bytes(&parsed.name), Some("shell"));
    }

    #[test]
    fn long_names_are_truncated_to_the_payload() {
        let info = AppInfo::new("a-very-long-application-name", 0, 0);
        assert_eq!(name_from_bytes(&info.name), Some("a-very-long-appl"));
    }

    #[test]
    fn invalid_utf8_names_are_rejected() {
        assert_eq!(name_from_bytes(&[0xFF, 0xFE, 0]), None);
        assert_eq!(name_from_bytes(b"init\0\0\0"), Some("init"));
    }

    #[test]
    fn join_error_codes_round_trip() {
        let code = isize::from(JoinError::NotFound);
        assert_eq!(JoinError::from_syscall_code(-code), JoinError::NotFound);
        assert_eq!(JoinError::from_syscall_code(-42), JoinError::Unknown);
    }
}
