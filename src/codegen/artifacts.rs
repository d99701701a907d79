use std::path::{Path, PathBuf};

use crate::error::RecorderError;

/// Writes generated sources under an output root:
/// `tests/<slug>.spec.ts`, `pages/<Name>.ts` and `reports/<slug>.json`
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    root: PathBuf,
}

impl ArtifactWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn test_path(&self, test_name: &str) -> PathBuf {
        self.root.join("tests").join(format!("{}.spec.ts", slug(test_name)))
    }

    pub fn page_object_path(&self, file_name: &str) -> PathBuf {
        self.root.join("pages").join(file_name)
    }

    pub fn report_path(&self, test_name: &str) -> PathBuf {
        self.root.join("reports").join(format!("{}.json", slug(test_name)))
    }

    /// Write one artifact, creating its directory. Failures are reported
    /// for this path only.
    pub async fn write(&self, path: &Path, contents: &str) -> Result<PathBuf, RecorderError> {
        let persistence = |e: std::io::Error| RecorderError::Persistence {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(persistence)?;
        }
        tokio::fs::write(path, contents).await.map_err(persistence)?;

        tracing::info!("Wrote {}", path.display());
        Ok(path.to_path_buf())
    }
}

/// File-system friendly form of a test name
pub fn slug(name: &str) -> String {
    let mut out = String::new();
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    let trimmed = out.trim_end_matches('-');
    if trimmed.is_empty() {
        "recording".to_string()
    } else {
        trimmed.to_string()
    }
}
