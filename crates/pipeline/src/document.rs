//! Document source reading uploaded files from a local directory.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use hrhub_core::collaborators::{DocumentSource, IngestionJob};
use hrhub_core::error::DocumentError;

/// Resolves a job's `file_path` against a fixed root directory.
#[derive(Debug, Clone)]
pub struct LocalDirectoryDocumentSource {
    root: PathBuf,
}

impl LocalDirectoryDocumentSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of a job's document. Only plain relative paths are accepted.
    fn resolve(&self, file_path: &str) -> Result<PathBuf, DocumentError> {
        let relative = Path::new(file_path);
        let plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if file_path.is_empty() || !plain {
            return Err(DocumentError::Io(format!(
                "file path '{file_path}' is not inside the document root"
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl DocumentSource for LocalDirectoryDocumentSource {
    async fn fetch(&self, job: &IngestionJob) -> Result<Vec<u8>, DocumentError> {
        let path = self.resolve(&job.file_path)?;
        tracing::debug!(job_id = job.id, path = %path.display(), "Reading uploaded document");
        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => DocumentError::NotFound { job_id: job.id },
            ErrorKind::TimedOut => DocumentError::IoTimeout { job_id: job.id },
            _ => DocumentError::Io(format!("{}: {e}", path.display())),
        })
    }
}
