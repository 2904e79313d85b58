//! Durable storage seam for key material.
//!
//! The storage medium is a collaborator decision (file, keychain,
//! encrypted store); this crate only requires persist/load semantics.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Abstraction over durable storage for named key entries.
pub trait KeyStore: Send + Sync {
    fn persist(&self, name: &str, bytes: &[u8]) -> Result<()>;
    fn load(&self, name: &str) -> Result<Option<Vec<u8>>>;
}

/// File-backed keystore. Writes go through a temp file and rename so a
/// crash never leaves a half-written entry behind.
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    base_dir: PathBuf,
}

impl FileKeyStore {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    fn entry_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }
}

impl KeyStore for FileKeyStore {
    fn persist(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.entry_path(name);
        let tmp_path = self.base_dir.join(format!("{name}.tmp"));
        fs::create_dir_all(&self.base_dir)
            .with_context(|| format!("creating keystore dir {}", self.base_dir.display()))?;
        {
            let mut f = fs::File::create(&tmp_path)
                .with_context(|| format!("creating {}", tmp_path.display()))?;
            f.write_all(bytes)?;
            f.flush()?;
            f.sync_all()?;
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o600))?;
        }
        fs::rename(&tmp_path, &path)
            .with_context(|| format!("publishing {}", path.display()))?;
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.entry_path(name);
        if !path.exists() {
            return Ok(None);
        }
        let bytes =
            fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
        Ok(Some(bytes))
    }
}
