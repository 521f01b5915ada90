use async_trait::async_trait;
use log::trace;
use std::path::{Path, PathBuf};
use tokio::{fs, io::AsyncWriteExt};

/// Published station listing
pub const LISTING_PAGE: &str = "index.html";
/// Machine readable copy of the station listing
pub const LISTING_JSON: &str = "stations.json";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to append to {path}: {source}")]
    Append {
        path: String,
        source: std::io::Error,
    },
}

#[async_trait]
pub trait FileData: Send + Sync {
    /// Replace the named artifact in the static directory. Readers see either
    /// the old or the new file, never a partial one.
    async fn write_artifact(&self, name: &str, contents: &[u8]) -> Result<PathBuf, Error>;
    /// Append one line to the registration record log, if one is configured.
    async fn append_line(&self, line: &str) -> Result<(), Error>;
    fn artifact_path(&self, name: &str) -> PathBuf;
}

pub struct FileAccess {
    static_dir: PathBuf,
    record_log: Option<PathBuf>,
}

impl FileAccess {
    pub fn new(static_dir: impl Into<PathBuf>, record_log: Option<PathBuf>) -> Self {
        Self {
            static_dir: static_dir.into(),
            record_log,
        }
    }
}

#[async_trait]
impl FileData for FileAccess {
    async fn write_artifact(&self, name: &str, contents: &[u8]) -> Result<PathBuf, Error> {
        let path = self.artifact_path(name);
        let staging = self
            .static_dir
            .join(format!(".{}.tmp", sanitize_name(name)));
        let write_err = |source| Error::Write {
            path: path.display().to_string(),
            source,
        };

        fs::create_dir_all(&self.static_dir)
            .await
            .map_err(write_err)?;
        fs::write(&staging, contents).await.map_err(write_err)?;
        fs::rename(&staging, &path).await.map_err(write_err)?;

        trace!("wrote {} bytes to {}", contents.len(), path.display());
        Ok(path)
    }

    async fn append_line(&self, line: &str) -> Result<(), Error> {
        let Some(log_path) = &self.record_log else {
            return Ok(());
        };
        let append_err = |source| Error::Append {
            path: log_path.display().to_string(),
            source,
        };

        if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(append_err)?;
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .await
            .map_err(append_err)?;
        file.write_all(format!("{}\n", line.trim_end()).as_bytes())
            .await
            .map_err(append_err)?;
        file.flush().await.map_err(append_err)?;
        Ok(())
    }

    fn artifact_path(&self, name: &str) -> PathBuf {
        self.static_dir.join(sanitize_name(name))
    }
}

/// Artifacts always land directly inside the static directory.
fn sanitize_name(name: &str) -> &str {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(LISTING_PAGE)
}
