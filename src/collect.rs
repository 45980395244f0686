use std::path::Component;
use std::path::Path;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use tracing::debug;
use tracing::instrument;
use walkdir::WalkDir;

// -----------------------------------------------------------------------------
// Types

/// A single file in the shape the `push_files` tool expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    /// Path of the file inside the remote repository.
    pub path: String,
    /// UTF-8 text, or base64 of the raw bytes when `encoding` is set.
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<Encoding>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Base64,
}

// -----------------------------------------------------------------------------
// FileRecord impl

impl FileRecord {
    pub fn text(path: String, content: String) -> Self {
        Self {
            path,
            content,
            encoding: None,
        }
    }

    pub fn binary(path: String, raw: &[u8]) -> Self {
        Self {
            path,
            content: STANDARD.encode(raw),
            encoding: Some(Encoding::Base64),
        }
    }

    /// Build a record from raw file contents.
    ///
    /// Only files whose name guesses to a `text/*` MIME type are sent as text,
    /// and only if they decode as UTF-8. Everything else is base64.
    pub fn from_bytes(path: String, file_name: &str, raw: Vec<u8>) -> Self {
        if !is_text_file_name(file_name) {
            return Self::binary(path, &raw);
        }
        match String::from_utf8(raw) {
            Ok(text) => Self::text(path, text),
            Err(err) => Self::binary(path, err.as_bytes()),
        }
    }

    pub fn is_binary(&self) -> bool {
        self.encoding.is_some()
    }

    /// Size of the original file contents in bytes.
    pub fn byte_len(&self) -> usize {
        match self.encoding {
            None => self.content.len(),
            // Padded base64: every 4 chars carry 3 bytes, minus padding.
            Some(Encoding::Base64) => {
                let padding = self.content.bytes().rev().take_while(|b| *b == b'=').count();
                self.content.len() / 4 * 3 - padding
            }
        }
    }
}

fn is_text_file_name(file_name: &str) -> bool {
    mime_guess::from_path(file_name)
        .first_raw()
        .is_some_and(|mime| mime.starts_with("text/"))
}

// -----------------------------------------------------------------------------
// Collection

/// Join a remote prefix and a local relative path with `/` separators.
///
/// The prefix is normalized as a POSIX path: repeated slashes collapse, `.`
/// segments are dropped and a leading `/` is kept.
pub fn remote_path(prefix: &str, relative: &Path) -> Result<String> {
    let mut parts: Vec<&str> = prefix
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            let part = part
                .to_str()
                .with_context(|| format!("Path is not valid UTF-8: {}", relative.display()))?;
            parts.push(part);
        }
    }

    let joined = parts.join("/");
    if prefix.starts_with('/') {
        Ok(format!("/{}", joined))
    } else {
        Ok(joined)
    }
}

/// Collect every regular file under `root` into records for upload.
///
/// Records come out in traversal order.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn collect_files(root: &Path, remote_prefix: &str) -> Result<Vec<FileRecord>> {
    if !root.is_dir() {
        bail!("Local directory {} does not exist", root.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).min_depth(1) {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let relative = path.strip_prefix(root)?;
        let remote = remote_path(remote_prefix, relative)?;
        let raw = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file_name = entry.file_name().to_string_lossy();

        let record = FileRecord::from_bytes(remote, &file_name, raw);
        debug!(path = %record.path, binary = record.is_binary(), "collected file");
        files.push(record);
    }

    Ok(files)
}
