//! Writing converted notes to disk.
//!
//! Layout of the output directory, with `folders` off:
//!
//! ```text
//! out/
//! ├── Note_title.md
//! ├── image/
//! │   └── photo.png
//! └── file/
//!     └── document.pdf
//! ```
//!
//! With `folders` on, every note gets its own directory holding a
//! `README.md` and the `image/` and `file/` directories of that note.
//! Either way the relative links produced by the converter resolve.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, warn};

use crate::convert::MarkdownNote;
use crate::error::Result;

/// Configuration for [`NoteWriter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterConfig {
    /// Put every note in its own directory, as `README.md`.
    pub folders: bool,
    /// Set the modification time of the markdown file to the note's update
    /// time.
    pub timestamps: bool,
}

/// Saves notes and their media under a root directory.
#[derive(Debug, Clone)]
pub struct NoteWriter {
    root: PathBuf,
    config: WriterConfig,
}

impl NoteWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_config(root, WriterConfig::default())
    }

    pub fn with_config(root: impl Into<PathBuf>, config: WriterConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Save `note` under the file name `name` (without extension) and return
    /// the path of the markdown file.
    ///
    /// `name` must already be unique within the output directory, see
    /// [`Converter::unique_note_name`](crate::Converter::unique_note_name).
    pub fn save(&self, name: &str, note: &MarkdownNote) -> Result<PathBuf> {
        let (dir, file_name) = if self.config.folders {
            (self.root.join(name), "README.md".to_string())
        } else {
            (self.root.clone(), format!("{name}.md"))
        };

        fs::create_dir_all(&dir)?;
        let path = dir.join(file_name);
        debug!(path = %path.display(), "saving note");
        fs::write(&path, &note.content)?;

        if self.config.timestamps
            && let Err(e) = set_modified(&path, note.updated.into())
        {
            warn!(path = %path.display(), error = %e, "failed to update file time");
        }

        let mut media: Vec<_> = note.media.values().collect();
        media.sort_by(|a, b| a.name.cmp(&b.name));
        for resource in media {
            let media_dir = dir.join(resource.kind.as_str());
            fs::create_dir_all(&media_dir)?;
            let media_path = media_dir.join(&resource.name);
            debug!(path = %media_path.display(), "saving attachment");
            fs::write(&media_path, &resource.content)?;
        }

        Ok(path)
    }
}

fn set_modified(path: &Path, time: SystemTime) -> std::io::Result<()> {
    File::options().write(true).open(path)?.set_modified(time)
}
