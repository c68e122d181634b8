use crate::error::{Result, TranscriptError};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Where an export lands on disk
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPaths {
    pub markdown: PathBuf,
    pub json: PathBuf,
}

impl OutputPaths {
    /// Returns the explicit output path, or `slack_export_{channel}.md` in the working directory
    pub fn resolve(output: Option<&Path>, channel_stem: &str) -> Self {
        let markdown = match output {
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(format!("slack_export_{}.md", channel_stem)),
        };
        let json = markdown.with_extension("json");

        Self { markdown, json }
    }
}

/// Replace `path` with `contents` without ever exposing a partially written file
///
/// Writes a temp file next to the target, syncs it, then renames it over
/// the target. Parent directories are created as needed.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path)
        .map_err(|e| TranscriptError::Io(e.error))?;

    tracing::debug!(path = %path.display(), bytes = contents.len(), "File written");
    Ok(())
}
