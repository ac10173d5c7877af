//! Game sources handed to the engine at load time

use std::path::PathBuf;
use std::sync::Arc;

/// In-memory named buffer presented to the engine as a file.
///
/// Cloning shares the buffer; the engine only reads it during load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualFile {
    name: String,
    data: Arc<[u8]>,
}

impl VirtualFile {
    pub fn new(name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// What to load into the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameSource {
    /// File on real storage
    Path(PathBuf),
    /// Whole image already in memory
    Bytes(Vec<u8>),
    /// Ordered set of in-memory files (e.g. disc images with companions)
    VirtualFiles(Vec<VirtualFile>),
}

impl GameSource {
    /// Short label for logs, never the payload itself.
    pub fn describe(&self) -> String {
        match self {
            Self::Path(path) => format!("path {}", path.display()),
            Self::Bytes(bytes) => format!("{} bytes", bytes.len()),
            Self::VirtualFiles(files) => format!("{} virtual files", files.len()),
        }
    }

    /// Structural checks done before the engine sees the source.
    ///
    /// Returns a reason when the source cannot possibly load.
    pub(crate) fn validate(&self, virtual_fs_enabled: bool) -> Result<(), String> {
        match self {
            Self::Path(path) if path.as_os_str().is_empty() => Err("empty game path".into()),
            Self::Path(_) => Ok(()),
            Self::Bytes(bytes) if bytes.is_empty() => Err("empty game image".into()),
            Self::Bytes(_) => Ok(()),
            Self::VirtualFiles(_) if !virtual_fs_enabled => {
                Err("virtual files require the virtual_file_system feature".into())
            }
            Self::VirtualFiles(files) => {
                if files.is_empty() {
                    return Err("no virtual files given".into());
                }
                let mut names = hashbrown::HashSet::with_capacity(files.len());
                for file in files {
                    if file.name.is_empty() {
                        return Err("virtual file with empty name".into());
                    }
                    if !names.insert(file.name.as_str()) {
                        return Err(format!("duplicate virtual file '{}'", file.name));
                    }
                }
                Ok(())
            }
        }
    }
}

impl From<PathBuf> for GameSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&str> for GameSource {
    fn from(path: &str) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

impl From<Vec<u8>> for GameSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}
