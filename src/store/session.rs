//! Annotation session: who is signed in and which store they work on.

use super::{validate_worker_name, AnnotationStore};
use crate::models::{CorpusError, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Session state.
#[derive(Debug, Default)]
pub enum SessionState {
    #[default]
    SignedOut,
    Working {
        worker: String,
        store: AnnotationStore,
    },
}

/// Explicit session owning the current worker's store.
#[derive(Debug)]
pub struct Session {
    dir: PathBuf,
    roster: Vec<String>,
    state: SessionState,
}

impl Session {
    /// New signed-out session over stores in `dir`.
    ///
    /// An empty `roster` admits any valid worker name.
    pub fn new(dir: &Path, roster: Vec<String>) -> Self {
        Self {
            dir: dir.to_path_buf(),
            roster,
            state: SessionState::SignedOut,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn worker(&self) -> Option<&str> {
        match &self.state {
            SessionState::Working { worker, .. } => Some(worker),
            SessionState::SignedOut => None,
        }
    }

    /// Sign in as `worker`, loading their store. Replaces any current session.
    pub fn sign_in(&mut self, worker: &str) -> Result<&mut AnnotationStore> {
        let worker = validate_worker_name(worker)?;
        if !self.roster.is_empty() && !self.roster.iter().any(|w| w == worker) {
            return Err(CorpusError::validation(format!(
                "worker '{worker}' is not on the roster"
            )));
        }

        let store = AnnotationStore::load(&self.dir, worker)?;
        info!(worker = worker, "Signed in");
        self.state = SessionState::Working {
            worker: worker.to_string(),
            store,
        };
        self.store_mut()
    }

    pub fn sign_out(&mut self) {
        if let Some(worker) = self.worker() {
            info!(worker = worker, "Signed out");
        }
        self.state = SessionState::SignedOut;
    }

    pub fn store(&self) -> Result<&AnnotationStore> {
        match &self.state {
            SessionState::Working { store, .. } => Ok(store),
            SessionState::SignedOut => Err(CorpusError::NotSignedIn),
        }
    }

    pub fn store_mut(&mut self) -> Result<&mut AnnotationStore> {
        match &mut self.state {
            SessionState::Working { store, .. } => Ok(store),
            SessionState::SignedOut => Err(CorpusError::NotSignedIn),
        }
    }
}
