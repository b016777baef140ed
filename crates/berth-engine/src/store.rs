//! Persisted server state store.

use std::fs;
use std::io;
use std::path::PathBuf;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

use berth_types::{ErrorCode, ServerState};

/// Errors raised by a state store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state i/o failure: {0}")]
    Io(#[from] io::Error),

    #[error("state encoding failure: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl ErrorCode for StoreError {
    fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "STORE_IO",
            Self::Encoding(_) => "STORE_ENCODING",
        }
    }

    fn is_recoverable(&self) -> bool {
        // A full disk clears up; a corrupt document does not.
        matches!(self, Self::Io(_))
    }
}

/// Persistence seam for the authoritative server state.
///
/// Contract: `store` is atomic with respect to concurrent `load`. A load
/// observes either the prior complete document or the new complete document,
/// never a partial write. Loading an unknown server id yields a freshly
/// initialized empty state.
pub trait StateStore: Send + Sync {
    /// Loads the state document for a server id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when an existing document cannot be read or
    /// decoded. Absence is not an error.
    fn load(&self, server_id: &str) -> Result<ServerState, StoreError>;

    /// Replaces the state document for a server id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the document cannot be written.
    fn store(&self, server_id: &str, state: &ServerState) -> Result<(), StoreError>;
}

/// Default store: one JSON document per server id in a base directory.
///
/// Writes land in a temp file in the same directory followed by a rename, so
/// readers outside this process see whole documents only. An internal mutex
/// serializes writers within the process.
pub struct FileStateStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStateStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn document_path(&self, server_id: &str) -> PathBuf {
        self.dir.join(format!("{server_id}.json"))
    }
}

impl StateStore for FileStateStore {
    fn load(&self, server_id: &str) -> Result<ServerState, StoreError> {
        let _guard = self.write_lock.lock();
        match fs::read(self.document_path(server_id)) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(server_id, "no persisted state, starting empty");
                Ok(ServerState::new(server_id))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn store(&self, server_id: &str, state: &ServerState) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        fs::create_dir_all(&self.dir)?;

        let bytes = serde_json::to_vec_pretty(state)?;
        let staging = self.dir.join(format!(".{server_id}.json.tmp"));
        fs::write(&staging, bytes)?;
        fs::rename(&staging, self.document_path(server_id))?;

        debug!(server_id, containers = state.containers.len(), "state stored");
        Ok(())
    }
}
