//! Per-project serialization of mutating operations
//!
//! At most one mutating operation is in flight per project path. A second
//! caller fails immediately with `Busy`; there is no queueing, the caller
//! retries. Distinct projects are fully independent. The guard is
//! process-local; concurrent operations from separate processes on the same
//! path are not protected.

use dashmap::DashMap;
use forge_api::CoreError;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Exclusive per-project lock table
#[derive(Debug, Clone, Default)]
pub struct ConcurrencyGuard {
    held: Arc<DashMap<PathBuf, ()>>,
}

impl ConcurrencyGuard {
    /// Empty guard table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the exclusive lock for a project path
    ///
    /// # Errors
    /// `CoreError::Busy` when another operation holds the lock.
    pub fn acquire(&self, path: &Path) -> Result<ProjectLock, CoreError> {
        use dashmap::mapref::entry::Entry;

        match self.held.entry(path.to_path_buf()) {
            Entry::Occupied(_) => Err(CoreError::Busy {
                path: path.to_path_buf(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(());
                Ok(ProjectLock {
                    held: Arc::clone(&self.held),
                    path: path.to_path_buf(),
                })
            }
        }
    }

    /// Whether the lock for a path is currently held
    #[must_use]
    pub fn is_held(&self, path: &Path) -> bool {
        self.held.contains_key(path)
    }
}

/// RAII lock over one project; released unconditionally on drop
#[derive(Debug)]
pub struct ProjectLock {
    held: Arc<DashMap<PathBuf, ()>>,
    path: PathBuf,
}

impl Drop for ProjectLock {
    fn drop(&mut self) {
        self.held.remove(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_busy() {
        let guard = ConcurrencyGuard::new();
        let path = Path::new("/tmp/project-a");

        let lock = guard.acquire(path).unwrap();
        assert!(matches!(
            guard.acquire(path),
            Err(CoreError::Busy { .. })
        ));

        drop(lock);
        assert!(guard.acquire(path).is_ok());
    }

    #[test]
    fn released_on_drop_even_after_failure_path() {
        let guard = ConcurrencyGuard::new();
        let path = Path::new("/tmp/project-b");

        {
            let _lock = guard.acquire(path).unwrap();
            assert!(guard.is_held(path));
            // simulated operation failure: lock still dropped at scope end
        }
        assert!(!guard.is_held(path));
    }

    #[test]
    fn distinct_projects_are_independent() {
        let guard = ConcurrencyGuard::new();
        let _a = guard.acquire(Path::new("/tmp/a")).unwrap();
        let _b = guard.acquire(Path::new("/tmp/b")).unwrap();
        assert!(guard.is_held(Path::new("/tmp/a")));
        assert!(guard.is_held(Path::new("/tmp/b")));
    }
}
