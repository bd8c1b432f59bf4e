// # File Token Store
//
// File-based implementation of TokenStore with crash recovery.
//
// - Atomic writes: write to `<path>.tmp`, then rename
// - Backup: the previous file is copied to `<path>.backup` before each write
// - Recovery: a corrupted file falls back to the backup, then to "no token"
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "token": {
//     "access_token": "...",
//     "token_type": "Bearer",
//     "refresh_token": "...",
//     "expires_at": "2026-01-09T12:00:00Z"
//   }
// }
// ```
//
// The file holds live credentials. On unix it is created with mode 0600.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::Error;
use crate::auth::Token;
use crate::traits::TokenStore;

/// Token file format version
const TOKEN_FILE_VERSION: &str = "1.0";

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct TokenFileFormat {
    version: String,
    token: Option<Token>,
}

/// File-based token store with crash recovery
///
/// # Example
///
/// ```rust,no_run
/// use nicdns_core::store::FileTokenStore;
/// use nicdns_core::traits::TokenStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileTokenStore::new("/var/lib/nicdns/token.json").await?;
///     if let Some(token) = store.load().await? {
///         println!("saved token expires at {:?}", token.expires_at);
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    // Serializes writers so temp/backup files are not interleaved
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    /// Create a store at `path`, creating parent directories if needed
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::config(format!(
                        "Failed to create token directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the token file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_file(path: &Path) -> Result<Option<Token>, Error> {
        if !path.exists() {
            tracing::debug!("Token file does not exist: {}", path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::token_store(format!(
                "Failed to read token file {}: {}",
                path.display(),
                e
            ))
        })?;

        let file: TokenFileFormat = serde_json::from_str(&content).map_err(|e| {
            Error::token_store(format!(
                "Failed to parse token file {}: {}",
                path.display(),
                e
            ))
        })?;

        if file.version != TOKEN_FILE_VERSION {
            tracing::warn!(
                "Token file version mismatch: expected {}, got {}. Attempting to load anyway.",
                TOKEN_FILE_VERSION,
                file.version
            );
        }

        Ok(file.token)
    }

    async fn write_file(&self, token: Option<&Token>) -> Result<(), Error> {
        let _guard = self.write_lock.lock().await;

        let json = serde_json::to_string_pretty(&TokenFileFormat {
            version: TOKEN_FILE_VERSION.to_string(),
            token: token.cloned(),
        })?;

        let temp_path = Self::sibling(&self.path, "tmp");
        {
            let mut options = fs::OpenOptions::new();
            options.write(true).create(true).truncate(true);
            #[cfg(unix)]
            options.mode(0o600);

            let mut file = options.open(&temp_path).await.map_err(|e| {
                Error::token_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            file.write_all(json.as_bytes()).await?;
            file.flush().await?;
        }

        if self.path.exists() {
            let backup_path = Self::sibling(&self.path, "backup");
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create token backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::token_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Token written to file: {}", self.path.display());
        Ok(())
    }

    fn sibling(path: &Path, extension: &str) -> PathBuf {
        let mut sibling = path.to_path_buf();
        sibling.set_extension(extension);
        sibling
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Result<Option<Token>, Error> {
        match Self::read_file(&self.path).await {
            Ok(token) => Ok(token),
            Err(Error::TokenStore(msg)) if msg.contains("parse") => {
                tracing::warn!("{}. Attempting recovery from backup.", msg);
                let backup_path = Self::sibling(&self.path, "backup");
                match Self::read_file(&backup_path).await {
                    Ok(token) => {
                        tracing::info!("Recovered token from backup");
                        Ok(token)
                    }
                    Err(e) => {
                        tracing::error!("Token backup unusable: {}. Starting without a token.", e);
                        Ok(None)
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn save(&self, token: &Token) -> Result<(), Error> {
        self.write_file(Some(token)).await
    }

    async fn clear(&self) -> Result<(), Error> {
        self.write_file(None).await
    }

    fn store_name(&self) -> &'static str {
        "file"
    }
}
