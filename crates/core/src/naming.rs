//! Per-run resource naming
//!
//! External state (the Docker daemon, the Ceph cluster) is shared between
//! concurrent harness runs and between parallel scenarios within one run, so
//! every resource name is suffixed with a run identifier and a worker
//! discriminator before it reaches an external command.

use std::collections::HashSet;
use std::sync::Mutex;

use uuid::Uuid;

use crate::error::{Error, Result};

/// Issues collision-checked resource names scoped to one run
#[derive(Debug)]
pub struct RunNamer {
    run_id: String,
    issued: Mutex<HashSet<String>>,
}

impl RunNamer {
    /// Create a namer with an explicit run identifier
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            issued: Mutex::new(HashSet::new()),
        }
    }

    /// Create a namer with a random run identifier
    pub fn generate() -> Self {
        let uuid = Uuid::new_v4();
        Self::new(&uuid.to_string()[..8])
    }

    /// The run identifier baked into every issued name
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Scope `base` to this run and to one worker
    ///
    /// Issuing the same scoped name twice within a run is a harness bug and
    /// is reported as a naming collision rather than silently reusing the
    /// name against shared external state.
    pub fn scoped(&self, base: &str, worker: usize) -> Result<String> {
        let name = format!("{base}-{run_id}-w{worker}", run_id = self.run_id);
        let mut issued = self
            .issued
            .lock()
            .map_err(|_| Error::internal("namer lock poisoned"))?;
        if !issued.insert(name.clone()) {
            return Err(Error::NamingCollision(name));
        }
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_names_carry_run_id() {
        let namer = RunNamer::new("abc123");
        let name = namer.scoped("docker-test-volume", 0).unwrap();
        assert_eq!(name, "docker-test-volume-abc123-w0");
    }

    #[test]
    fn test_same_base_different_workers_do_not_collide() {
        let namer = RunNamer::new("abc123");
        let a = namer.scoped("docker-test-volume", 0).unwrap();
        let b = namer.scoped("docker-test-volume", 1).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_collision_detected() {
        let namer = RunNamer::new("abc123");
        namer.scoped("vol", 0).unwrap();
        let err = namer.scoped("vol", 0).unwrap_err();
        assert!(matches!(err, Error::NamingCollision(_)));
    }

    #[test]
    fn test_pool_qualified_and_bare_names_are_independent() {
        let namer = RunNamer::new("r1");
        let bare = namer.scoped("docker-test-volume", 0).unwrap();
        let pooled = namer.scoped("rbd/docker-test-volume", 1).unwrap();
        assert_ne!(bare, pooled);
        assert!(pooled.starts_with("rbd/"));
    }
}
