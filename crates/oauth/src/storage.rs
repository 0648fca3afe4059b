use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::RwLock,
};

use {
    secrecy::ExposeSecret,
    tempfile::NamedTempFile,
    tracing::{debug, warn},
};

use crate::types::TokenRecord;

/// Durable home of the single token record.
///
/// Implementations fail soft: unreadable or missing storage loads as "absent",
/// and write or delete failures are logged rather than returned.
///
/// The methods are synchronous and may block on small file I/O; callers on an
/// async runtime call them inline.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Option<TokenRecord>;

    fn save(&self, record: &TokenRecord);

    fn clear(&self);

    /// A record with a non-empty refresh token is on file.
    fn is_authenticated(&self) -> bool {
        self.load()
            .is_some_and(|r| !r.refresh_token.expose_secret().is_empty())
    }
}

/// What the process knows beyond the file when the file could not be updated.
enum Overlay {
    /// The file is authoritative.
    Disk,
    /// A save failed; this record is newer than the file.
    Record(TokenRecord),
    /// A delete failed; the file content is stale and must not be served.
    Cleared,
}

/// JSON file store.
///
/// Writes go to a uniquely named sibling temp file that is renamed over the
/// target, so readers see either the old or the new record. On unix the file is
/// `0600`.
pub struct FileTokenStore {
    path: PathBuf,
    overlay: RwLock<Overlay>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            overlay: RwLock::new(Overlay::Disk),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> Option<TokenRecord> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no token file");
                return None;
            },
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read token file");
                return None;
            },
        };
        match serde_json::from_str(&data) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unparsable token file");
                None
            },
        }
    }

    fn write_file(&self, record: &TokenRecord) -> io::Result<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let data = serde_json::to_vec_pretty(record)?;

        // Each save gets its own temp file, so concurrent writers never share one.
        let mut tmp = NamedTempFile::new_in(parent)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(0o600))?;
        }
        tmp.write_all(&data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)?;
        Ok(())
    }

    fn set_overlay(&self, overlay: Overlay) {
        *self.overlay.write().unwrap_or_else(|e| e.into_inner()) = overlay;
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<TokenRecord> {
        match &*self.overlay.read().unwrap_or_else(|e| e.into_inner()) {
            Overlay::Record(record) => return Some(record.clone()),
            Overlay::Cleared => return None,
            Overlay::Disk => {},
        }
        self.read_file()
    }

    fn save(&self, record: &TokenRecord) {
        match self.write_file(record) {
            Ok(()) => self.set_overlay(Overlay::Disk),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "failed to persist tokens; keeping them in memory only"
                );
                self.set_overlay(Overlay::Record(record.clone()));
            },
        }
    }

    fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => self.set_overlay(Overlay::Disk),
            Err(e) if e.kind() == io::ErrorKind::NotFound => self.set_overlay(Overlay::Disk),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to delete token file");
                self.set_overlay(Overlay::Cleared);
            },
        }
    }
}

/// Process-local store, for tests and ephemeral deployments.
#[derive(Default)]
pub struct MemoryTokenStore {
    record: RwLock<Option<TokenRecord>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: TokenRecord) -> Self {
        Self {
            record: RwLock::new(Some(record)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<TokenRecord> {
        self.record
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn save(&self, record: &TokenRecord) {
        *self.record.write().unwrap_or_else(|e| e.into_inner()) = Some(record.clone());
    }

    fn clear(&self) {
        *self.record.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}
