//! Временная директория одного прогона
//!
//! Every intermediate artifact of a run lives under its own directory so
//! concurrent runs never collide. The directory is removed on drop unless
//! cleanup is disabled.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use tempfile::TempDir;

use crate::errors::AppResult;

pub struct ScratchDir {
    path: PathBuf,
    /// Держит директорию, пока нужна очистка; `None` если файлы сохраняем
    temp_dir: Option<TempDir>,
}

impl ScratchDir {
    /// Create `<root>/run-XXXXXX`
    pub fn new(root: &Path, cleanup: bool) -> AppResult<Self> {
        fs::create_dir_all(root)?;
        let temp_dir = tempfile::Builder::new().prefix("run-").tempdir_in(root)?;
        debug!("Created scratch directory {}", temp_dir.path().display());

        if cleanup {
            Ok(Self {
                path: temp_dir.path().to_path_buf(),
                temp_dir: Some(temp_dir),
            })
        } else {
            let path = temp_dir.keep();
            debug!("Keeping scratch directory {}", path.display());
            Ok(Self {
                path,
                temp_dir: None,
            })
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of an artifact inside the scratch directory
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    pub fn is_kept(&self) -> bool {
        self.temp_dir.is_none()
    }
}
