//! Secret persistence
//!
//! `SecretStore` is the narrow boundary the manager persists through: raw
//! bytes under a fixed key. The file implementation keeps one file per key
//! in the program's data directory, written atomically with owner-only
//! permissions since the payload is an OAuth credential.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tracing::debug;

use crate::error::{Error, Result};

/// Keyed byte storage for serialized credentials.
///
/// Methods return boxed futures so the trait stays object-safe and the
/// manager can hold an `Arc<dyn SecretStore>`.
pub trait SecretStore: Send + Sync {
    /// Fetch the bytes stored under `key`.
    ///
    /// Absence is [`Error::NotFound`]; any other failure is
    /// [`Error::Storage`].
    fn get(&self, key: &str) -> Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + '_>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(
        &self,
        key: &str,
        value: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// File-backed store: one `<key>.json` file per key under `dir`.
pub struct FileSecretStore {
    dir: PathBuf,
}

impl FileSecretStore {
    /// Store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SecretStore for FileSecretStore {
    fn get(&self, key: &str) -> Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + '_>> {
        let path = self.key_path(key);
        Box::pin(async move {
            match tokio::fs::read(&path).await {
                Ok(bytes) => Ok(bytes),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound(
                    format!("no secret stored at {}", path.display()),
                )),
                Err(e) => Err(Error::Storage(format!("reading {}: {e}", path.display()))),
            }
        })
    }

    fn set(
        &self,
        key: &str,
        value: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let dir = self.dir.clone();
        let path = self.key_path(key);
        Box::pin(async move {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| Error::Storage(format!("creating {}: {e}", dir.display())))?;
            write_atomic(&dir, &path, &value).await
        })
    }
}

/// Write to a temp file in the same directory, then rename over the target,
/// so a crash mid-write can never leave a torn secret file. Permissions are
/// restricted to the owner before the rename.
async fn write_atomic(dir: &Path, path: &Path, data: &[u8]) -> Result<()> {
    let tmp_path = dir.join(format!(".secret.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, data)
        .await
        .map_err(|e| Error::Storage(format!("writing temp file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Storage(format!("setting permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Storage(format!("renaming temp file: {e}")))?;

    debug!(path = %path.display(), "persisted secret");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let store = FileSecretStore::new(dir.path().to_path_buf());

        store.set("token", b"secret bytes".to_vec()).await.unwrap();
        let bytes = store.get("token").await.unwrap();
        assert_eq!(bytes, b"secret bytes");
    }

    #[tokio::test]
    async fn get_missing_key_is_not_found() {
        let dir = tempdir().unwrap();
        let store = FileSecretStore::new(dir.path().to_path_buf());

        let err = store.get("token").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn set_creates_missing_directories() {
        let dir = tempdir().unwrap();
        let store = FileSecretStore::new(dir.path().join("nested").join("data"));

        store.set("token", b"v".to_vec()).await.unwrap();
        assert_eq!(store.get("token").await.unwrap(), b"v");
    }

    #[tokio::test]
    async fn set_overwrites_previous_value() {
        let dir = tempdir().unwrap();
        let store = FileSecretStore::new(dir.path().to_path_buf());

        store.set("token", b"first".to_vec()).await.unwrap();
        store.set("token", b"second".to_vec()).await.unwrap();
        assert_eq!(store.get("token").await.unwrap(), b"second");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn secret_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let store = FileSecretStore::new(dir.path().to_path_buf());
        store.set("token", b"secret".to_vec()).await.unwrap();

        let metadata = std::fs::metadata(dir.path().join("token.json")).unwrap();
        assert_eq!(metadata.permissions().mode() & 0o777, 0o600);
    }

    #[tokio::test]
    async fn no_temp_file_left_behind() {
        let dir = tempdir().unwrap();
        let store = FileSecretStore::new(dir.path().to_path_buf());
        store.set("token", b"secret".to_vec()).await.unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["token.json".to_string()]);
    }
}
