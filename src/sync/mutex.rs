use crate::{sched::queue::Queue, task::Identifier};
use alloc::vec::Vec;

pub use syscall::mutex::Policy;

/// An opaque handle to a mutex. Handles cross the user/kernel boundary, so
/// they carry a generation number: a handle to a destroyed mutex stays
/// invalid even if its slot is reused by a new mutex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: u16,
    generation: u16,
}

impl Handle {
    /// Pack the handle into a single word. The packed value of a valid
    /// handle is never 0, since generations start at 1.
    #[must_use]
    pub fn into_raw(self) -> usize {
        (usize::from(self.generation) << 16) | usize::from(self.index)
    }

    /// Unpack a handle received from user space. Returns `None` if `raw`
    /// has bits set above the 32 bits of a packed handle. Whether the
    /// handle designates a live mutex is checked by every mutex operation.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_raw(raw: usize) -> Option<Self> {
        let raw = u32::try_from(raw).ok()?;
        Some(Self {
            index: (raw & 0xFFFF) as u16,
            generation: (raw >> 16) as u16,
        })
    }
}

/// The lock state of a mutex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lock {
    /// Nobody holds the mutex.
    Free,

    /// A normal mutex is held. The holder is not tracked.
    Held,

    /// A strict mutex is held by the given task.
    Owned(Identifier),
}

/// A mutual exclusion resource.
#[derive(Debug)]
pub struct Mutex {
    policy: Policy,
    lock: Lock,

    /// Tasks blocked until the mutex is released.
    pub(crate) waiters: Queue,
}

impl Mutex {
    #[must_use]
    pub fn policy(&self) -> Policy {
        self.policy
    }

    #[must_use]
    pub fn lock(&self) -> Lock {
        self.lock
    }
}

/// The outcome of an attempt to acquire a mutex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enter {
    /// The mutex was free and is now held by the caller.
    Acquired,

    /// The caller already owns the strict mutex. Nesting is not counted: a
    /// single exit releases the mutex.
    Reentered,

    /// The mutex is held by someone else, the caller must wait.
    MustWait,
}

/// Errors that can occur when operating on a mutex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The handle does not designate a live mutex.
    InvalidHandle,

    /// The mutex is held and cannot be destroyed.
    Busy,

    /// The caller does not own the strict mutex it tried to release.
    NotOwner,

    /// Every possible handle index is in use.
    TableFull,
}

/// A slot of the mutex table.
#[derive(Debug)]
struct Entry {
    generation: u16,
    mutex: Option<Mutex>,
}

/// The registry of live mutexes. Destroyed slots are recycled with a new
/// generation.
#[derive(Debug, Default)]
pub struct Table {
    entries: Vec<Entry>,
    free: Vec<u16>,
}

impl Table {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new free mutex with the given policy.
    ///
    /// # Errors
    /// Returns [`Error::TableFull`] if every handle index is in use.
    pub fn create(&mut self, policy: Policy) -> Result<Handle, Error> {
        let mutex = Mutex {
            policy,
            lock: Lock::Free,
            waiters: Queue::new(),
        };

        let index = if let Some(index) = self.free.pop() {
            index
        } else {
            let index = u16::try_from(self.entries.len()).map_err(|_| Error::TableFull)?;
            self.entries.push(Entry {
                generation: 1,
                mutex: None,
            });
            index
        };

        let entry = &mut self.entries[usize::from(index)];
        entry.mutex = Some(mutex);
        Ok(Handle {
            index,
            generation: entry.generation,
        })
    }

    /// Get the mutex designated by the handle, if it is still alive.
    #[must_use]
    pub fn get(&self, handle: Handle) -> Option<&Mutex> {
        self.entries
            .get(usize::from(handle.index))
            .filter(|entry| entry.generation == handle.generation)
            .and_then(|entry| entry.mutex.as_ref())
    }

    pub(crate) fn get_mut(&mut self, handle: Handle) -> Option<&mut Mutex> {
        self.entries
            .get_mut(usize::from(handle.index))
            .filter(|entry| entry.generation == handle.generation)
            .and_then(|entry| entry.mutex.as_mut())
    }

    /// Try to acquire the mutex on behalf of `caller`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidHandle`] if the mutex does not exist.
    pub fn enter(&mut self, handle: Handle, caller: Identifier) -> Result<Enter, Error> {
        let mutex = self.get_mut(handle).ok_or(Error::InvalidHandle)?;
        Ok(match (mutex.policy, mutex.lock) {
            (Policy::Normal, Lock::Free) => {
                mutex.lock = Lock::Held;
                Enter::Acquired
            }
            (Policy::Strict, Lock::Free) => {
                mutex.lock = Lock::Owned(caller);
                Enter::Acquired
            }
            (Policy::Strict, Lock::Owned(owner)) if owner == caller => Enter::Reentered,
            _ => Enter::MustWait,
        })
    }

    /// Release the mutex on behalf of `caller`. A normal mutex can be
    /// released by anyone, a strict mutex only by its owner. The caller is
    /// responsible for waking up the tasks waiting on the mutex.
    ///
    /// # Errors
    /// Returns [`Error::InvalidHandle`] if the mutex does not exist, or
    /// [`Error::NotOwner`] if the mutex is strict and the caller does not
    /// own it. The mutex is left untouched on error.
    pub fn exit(&mut self, handle: Handle, caller: Identifier) -> Result<(), Error> {
        let mutex = self.get_mut(handle).ok_or(Error::InvalidHandle)?;
        match (mutex.policy, mutex.lock) {
            (Policy::Normal, _) => {
                mutex.lock = Lock::Free;
                Ok(())
            }
            (Policy::Strict, Lock::Owned(owner)) if owner == caller => {
                mutex.lock = Lock::Free;
                Ok(())
            }
            (Policy::Strict, _) => Err(Error::NotOwner),
        }
    }

    /// Destroy a free mutex.
    ///
    /// # Errors
    /// Returns [`Error::InvalidHandle`] if the mutex does not exist, or
    /// [`Error::Busy`] if it is held.
    pub fn destroy(&mut self, handle: Handle) -> Result<(), Error> {
        let mutex = self.get(handle).ok_or(Error::InvalidHandle)?;
        if mutex.lock != Lock::Free {
            return Err(Error::Busy);
        }
        debug_assert!(mutex.waiters.is_empty());

        let entry = &mut self.entries[usize::from(handle.index)];
        entry.mutex = None;
        entry.generation = entry.generation.wrapping_add(1).max(1);
        self.free.push(handle.index);
        Ok(())
    }

    /// The number of live mutexes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len() - self.free.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over the live mutexes.
    pub fn iter(&self) -> impl Iterator<Item = &Mutex> + '_ {
        self.entries.iter().filter_map(|entry| entry.mutex.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: Identifier = Identifier::IDLE;

    fn task(id: u32) -> Identifier {
        Identifier::from(id)
    }

    #[test]
    fn raw_handles_round_trip_and_are_never_zero() {
        let mut table = Table::new();
        let handle = table.create(Policy::Normal).unwrap();
        assert_ne!(handle.into_raw(), 0);
        assert_eq!(Handle::from_raw(handle.into_raw()), Some(handle));
        assert!(table.get(Handle::from_raw(0).unwrap()).is_none());
    }

    #[test]
    fn normal_mutex_has_no_owner() {
        let mut table = Table::new();
        let m = table.create(Policy::Normal).unwrap();

        assert_eq!(table.enter(m, task(0x10)), Ok(Enter::Acquired));
        assert_eq!(table.enter(m, task(0x10)), Ok(Enter::MustWait));
        assert_eq!(table.enter(m, task(0x11)), Ok(Enter::MustWait));

        // Anyone can release a normal mutex, even if it never acquired it.
        assert_eq!(table.exit(m, task(0x12)), Ok(()));
        assert_eq!(table.get(m).unwrap().lock(), Lock::Free);
        assert_eq!(table.exit(m, task(0x12)), Ok(()));
    }

    #[test]
    fn strict_mutex_tracks_its_owner() {
        let mut table = Table::new();
        let m = table.create(Policy::Strict).unwrap();

        assert_eq!(table.enter(m, task(0x10)), Ok(Enter::Acquired));
        assert_eq!(table.enter(m, task(0x10)), Ok(Enter::Reentered));
        assert_eq!(table.enter(m, task(0x11)), Ok(Enter::MustWait));

        assert_eq!(table.exit(m, task(0x11)), Err(Error::NotOwner));
        assert_eq!(table.get(m).unwrap().lock(), Lock::Owned(task(0x10)));

        // Re-entry is not counted.
        assert_eq!(table.exit(m, task(0x10)), Ok(()));
        assert_eq!(table.get(m).unwrap().lock(), Lock::Free);
        assert_eq!(table.exit(m, task(0x10)), Err(Error::NotOwner));
        assert_eq!(table.exit(m, A), Err(Error::NotOwner));
    }

    #[test]
    fn destroy_requires_a_free_mutex() {
        let mut table = Table::new();
        let m = table.create(Policy::Normal).unwrap();
        table.enter(m, task(0x10)).unwrap();

        assert_eq!(table.destroy(m), Err(Error::Busy));
        assert_eq!(table.len(), 1);

        table.exit(m, task(0x10)).unwrap();
        assert_eq!(table.destroy(m), Ok(()));
        assert!(table.is_empty());
        assert_eq!(table.destroy(m), Err(Error::InvalidHandle));
    }

    #[test]
    fn stale_handles_are_rejected_after_reuse() {
        let mut table = Table::new();
        let old = table.create(Policy::Normal).unwrap();
        table.destroy(old).unwrap();

        let new = table.create(Policy::Strict).unwrap();
        assert_ne!(old, new);
        assert_eq!(table.enter(old, task(0x10)), Err(Error::InvalidHandle));
        assert_eq!(table.exit(old, task(0x10)), Err(Error::InvalidHandle));
        assert_eq!(table.get(new).unwrap().policy(), Policy::Strict);
    }

    #[test]
    fn forged_handles_are_rejected() {
        let mut table = Table::new();
        let forged = Handle::from_raw(0x0005_0003).unwrap();
        assert_eq!(table.enter(forged, task(0x10)), Err(Error::InvalidHandle));
        assert_eq!(table.destroy(forged), Err(Error::InvalidHandle));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn handles_with_high_bits_do_not_alias() {
        let mut table = Table::new();
        let m = table.create(Policy::Normal).unwrap();
        let raw = m.into_raw();

        assert_eq!(Handle::from_raw(raw | 1 << 40), None);
        assert_eq!(Handle::from_raw(raw | 1 << 32), None);
        assert_eq!(Handle::from_raw(usize::MAX), None);
        assert_eq!(table.get(m).unwrap().lock(), Lock::Free);
    }
}
