//! Single-instance guard.
//!
//! A pidfile written at startup and removed on every exit path. If the
//! marker already exists the process refuses to start; it never deletes
//! a marker it did not create.

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::error::RelayError;

/// RAII guard for the pidfile. Dropping it removes the marker.
#[derive(Debug)]
pub struct InstanceGuard {
    path: PathBuf,
}

impl InstanceGuard {
    /// Claim the marker, refusing if another instance holds it.
    pub fn acquire(path: PathBuf) -> Result<Self, RelayError> {
        if path.exists() {
            let holder = std::fs::read_to_string(&path)
                .map(|s| s.trim().to_owned())
                .unwrap_or_else(|_| "unknown".to_owned());
            return Err(RelayError::AlreadyRunning { path, holder });
        }

        std::fs::write(&path, format!("{}\n", std::process::id())).map_err(|source| {
            RelayError::Pidfile {
                path: path.clone(),
                source,
            }
        })?;
        debug!(path = %path.display(), "pidfile written");
        Ok(Self { path })
    }

    /// The marker path.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove pidfile");
        } else {
            debug!(path = %self.path.display(), "pidfile removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_writes_pid_and_drop_removes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("udpircd.pid");

        {
            let guard = InstanceGuard::acquire(path.clone()).unwrap();
            assert_eq!(guard.path(), path);
            let contents = std::fs::read_to_string(&path).unwrap();
            assert_eq!(contents.trim(), std::process::id().to_string());
        }
        assert!(!path.exists());
    }

    #[test]
    fn second_acquire_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("udpircd.pid");

        let _guard = InstanceGuard::acquire(path.clone()).unwrap();
        let err = InstanceGuard::acquire(path.clone()).unwrap_err();
        match err {
            RelayError::AlreadyRunning { holder, .. } => {
                assert_eq!(holder, std::process::id().to_string());
            }
            other => panic!("expected AlreadyRunning, got {other:?}"),
        }
        // The failed attempt must not have clobbered the marker.
        assert!(path.exists());
    }

    #[test]
    fn stale_marker_is_still_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("udpircd.pid");
        std::fs::write(&path, "").unwrap();

        let err = InstanceGuard::acquire(path).unwrap_err();
        assert!(matches!(err, RelayError::AlreadyRunning { .. }));
    }
}
